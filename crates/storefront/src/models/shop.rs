//! Seller shops: profile records and the requests that create or edit them.

use bazaar_core::{SellerId, ShopCategoryId, ShopProfileId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::catalog::{Seller, ShopCategory};
use crate::payload::lenient_id;

/// A seller's public shop profile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShopProfile {
    #[serde(rename = "ID", alias = "id")]
    pub id: ShopProfileId,
    #[serde(default)]
    pub shop_name: String,
    #[serde(default)]
    pub shop_description: String,
    #[serde(default)]
    pub open_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub logo_path: String,
    #[serde(default)]
    pub slogan: String,
    #[serde(default, deserialize_with = "lenient_id")]
    pub address_id: Option<u64>,
    #[serde(rename = "ShopAddress", alias = "shop_address", default)]
    pub address: Option<ShopAddress>,
    #[serde(
        rename = "shopCategoryID",
        alias = "shop_category_id",
        default,
        deserialize_with = "lenient_id"
    )]
    pub shop_category_id: Option<ShopCategoryId>,
    #[serde(rename = "Category", alias = "category", default)]
    pub category: Option<ShopCategory>,
    #[serde(default, deserialize_with = "lenient_id")]
    pub seller_id: Option<SellerId>,
    #[serde(rename = "Seller", alias = "seller", default)]
    pub seller: Option<Seller>,
}

/// Postal address of a shop.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShopAddress {
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub sub_district: String,
    #[serde(default)]
    pub district: String,
    #[serde(default)]
    pub province: String,
}

impl ShopAddress {
    /// Single-line rendering, skipping blank parts.
    #[must_use]
    pub fn one_line(&self) -> String {
        [
            self.address.as_str(),
            self.sub_district.as_str(),
            self.district.as_str(),
            self.province.as_str(),
        ]
        .iter()
        .map(|part| part.trim())
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(", ")
    }
}

/// Address fields for a profile update; absent fields are left unchanged.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ShopAddressInput {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sub_district: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub district: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub province: Option<String>,
}

/// Body of `POST /api/seller-shop`: registers the member as a seller and
/// opens their shop in one step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NewSellerShop {
    pub seller_name: String,
    pub seller_address: String,
    pub shop_name: String,
    pub slogan: String,
    pub shop_description: String,
    pub category_id: ShopCategoryId,
    pub logo_path: String,
    pub address: ShopAddress,
}

/// Response of `POST /api/seller-shop`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SellerShopCreated {
    #[serde(default)]
    pub message: String,
    pub seller: Seller,
    pub shop: ShopProfile,
}

/// Body of `PUT /api/UpdateShopProfile`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ShopProfileUpdate {
    pub seller_id: SellerId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shop_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub slogan: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shop_description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub logo_path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category_id: Option<ShopCategoryId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<ShopAddressInput>,
}

impl ShopProfileUpdate {
    /// An update for `seller_id` that changes nothing yet.
    #[must_use]
    pub const fn new(seller_id: SellerId) -> Self {
        Self {
            seller_id,
            shop_name: None,
            slogan: None,
            shop_description: None,
            logo_path: None,
            category_id: None,
            address: None,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_profile_parses_backend_shape() {
        let profile: ShopProfile = serde_json::from_value(json!({
            "ID": 3,
            "shop_name": "Nok's Kitchen",
            "shop_description": "Thai desserts",
            "open_date": "2025-01-05T00:00:00Z",
            "logo_path": "/uploads/logo.png",
            "slogan": "Sweet",
            "address_id": 8,
            "ShopAddress": {"ID": 8, "address": "1 Rd", "sub_district": "A", "district": "B", "province": "C"},
            "shopCategoryID": 2,
            "Category": {"ID": 2, "category_name": "Food"},
            "seller_id": 4,
            "Seller": null
        }))
        .unwrap();
        assert_eq!(profile.shop_category_id, Some(ShopCategoryId::new(2)));
        assert_eq!(profile.address.unwrap().one_line(), "1 Rd, A, B, C");
        assert!(profile.seller.is_none());
    }

    #[test]
    fn test_profile_update_only_sends_changes() {
        let mut update = ShopProfileUpdate::new(SellerId::new(4));
        update.slogan = Some("New".to_string());
        assert_eq!(
            serde_json::to_value(&update).unwrap(),
            json!({"seller_id": 4, "slogan": "New"})
        );
    }
}

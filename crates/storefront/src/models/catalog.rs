//! Product listings, categories and sellers.

use bazaar_core::{CategoryId, MemberId, PostId, ProductId, SellerId, ShopCategoryId};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::payload::lenient_id;

/// A product listing ("post"): the product plus the category and seller it
/// is listed under. This is the record buyers add to their cart.
///
/// Fields the client does not model are kept in `extra` so a listing
/// serializes back to the shape it arrived in.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductListing {
    #[serde(rename = "ID", alias = "id")]
    pub id: PostId,
    #[serde(default, deserialize_with = "lenient_id")]
    pub product_id: Option<ProductId>,
    #[serde(rename = "Product", alias = "product", default)]
    pub product: Option<Product>,
    #[serde(default, deserialize_with = "lenient_id")]
    pub category_id: Option<CategoryId>,
    #[serde(rename = "Category", alias = "category", default)]
    pub category: Option<Category>,
    #[serde(default, deserialize_with = "lenient_id")]
    pub seller_id: Option<SellerId>,
    #[serde(rename = "Seller", alias = "seller", default)]
    pub seller: Option<Seller>,
    #[serde(
        rename = "CreatedAt",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ProductListing {
    /// Display name of the listed product.
    #[must_use]
    pub fn name(&self) -> &str {
        self.product.as_ref().map_or("", |p| p.name.as_str())
    }

    /// Unit price of the listed product.
    #[must_use]
    pub fn price(&self) -> Decimal {
        self.product.as_ref().map_or(Decimal::ZERO, |p| p.price)
    }
}

/// A product record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    #[serde(rename = "ID", alias = "id")]
    pub id: ProductId,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub price: Decimal,
    #[serde(default)]
    pub quantity: i64,
    #[serde(default, deserialize_with = "lenient_id")]
    pub seller_id: Option<SellerId>,
    #[serde(
        rename = "ProductImage",
        alias = "product_images",
        alias = "images",
        default
    )]
    pub images: Vec<ProductImage>,
}

/// An uploaded product image.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductImage {
    #[serde(rename = "ID", alias = "id", default)]
    pub id: Option<u64>,
    #[serde(default, alias = "url")]
    pub image_path: String,
}

/// A product category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    #[serde(rename = "ID", alias = "id")]
    pub id: CategoryId,
    #[serde(default)]
    pub name: String,
}

/// A shop category (what kind of shop a seller runs).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShopCategory {
    #[serde(rename = "ID", alias = "id")]
    pub id: ShopCategoryId,
    #[serde(default)]
    pub category_name: String,
}

/// A seller account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Seller {
    #[serde(rename = "ID", alias = "id")]
    pub id: SellerId,
    #[serde(rename = "Name", alias = "name", default)]
    pub name: String,
    #[serde(rename = "Address", alias = "address", default)]
    pub address: String,
    #[serde(
        rename = "MemberID",
        alias = "memberID",
        alias = "member_id",
        default,
        deserialize_with = "lenient_id"
    )]
    pub member_id: Option<MemberId>,
}

/// Body of `POST /api/post-Product`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NewProduct {
    pub name: String,
    pub description: String,
    pub price: i64,
    pub quantity: i64,
    pub category_id: CategoryId,
    pub seller_id: SellerId,
    /// Paths returned by the product image upload.
    pub images: Vec<String>,
}

/// Body of `PUT /api/UpdateProduct`. Absent fields are left unchanged;
/// `images`, when present, replaces the whole set.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ProductUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quantity: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category_id: Option<CategoryId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub images: Option<Vec<String>>,
}

impl ProductUpdate {
    /// Whether the update would change nothing.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.description.is_none()
            && self.price.is_none()
            && self.quantity.is_none()
            && self.category_id.is_none()
            && self.images.is_none()
    }
}

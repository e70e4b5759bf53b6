//! Member identity as returned by the authentication endpoints.

use bazaar_core::{MemberId, SellerId};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};

use crate::payload::lenient_id;

/// The signed-in member.
///
/// `sellerID` is normalized to a number or `null` no matter which spelling
/// the backend used.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    #[serde(alias = "ID")]
    pub id: MemberId,
    #[serde(default, alias = "UserName", alias = "userName")]
    pub username: String,
    #[serde(
        rename = "sellerID",
        alias = "sellerId",
        alias = "seller_id",
        default,
        deserialize_with = "lenient_id"
    )]
    pub seller_id: Option<SellerId>,
    #[serde(rename = "hasShop", default, skip_serializing_if = "Option::is_none")]
    pub has_shop: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub people: Option<People>,
}

impl User {
    /// A member known only by id and username.
    #[must_use]
    pub fn new(id: MemberId, username: impl Into<String>) -> Self {
        Self {
            id,
            username: username.into(),
            seller_id: None,
            has_shop: None,
            people: None,
        }
    }

    /// Whether the member owns a shop: the explicit flag when the backend sent
    /// one, otherwise whether they are registered as a seller.
    #[must_use]
    pub const fn owns_shop(&self) -> bool {
        match self.has_shop {
            Some(flag) => flag,
            None => self.seller_id.is_some(),
        }
    }
}

/// Personal details attached to a member.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct People {
    #[serde(default, alias = "ID")]
    pub id: Option<u64>,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub age: Option<i64>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub birthday: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default, rename = "genderID")]
    pub gender_id: Option<u64>,
}

/// Fields accepted by `POST /api/register`.
///
/// Implements `Debug` manually to redact the password.
#[derive(Clone)]
pub struct RegisterRequest {
    pub username: String,
    pub password: SecretString,
    pub first_name: String,
    pub last_name: String,
    pub email: Option<String>,
    pub age: Option<i64>,
    pub phone: Option<String>,
    /// `YYYY-MM-DD` or RFC 3339.
    pub birthday: Option<String>,
    pub address: Option<String>,
    pub gender_id: Option<u64>,
}

impl std::fmt::Debug for RegisterRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegisterRequest")
            .field("username", &self.username)
            .field("password", &"[REDACTED]")
            .field("first_name", &self.first_name)
            .field("last_name", &self.last_name)
            .field("email", &self.email)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_user_accepts_seller_id_spellings() {
        for key in ["sellerID", "sellerId", "seller_id"] {
            let raw = format!(r#"{{"id": 1, "username": "a", "{key}": 5}}"#);
            let user: User = serde_json::from_str(&raw).unwrap();
            assert_eq!(user.seller_id, Some(SellerId::new(5)));
        }

        let user: User =
            serde_json::from_value(json!({"ID": 2, "UserName": "b", "sellerID": "7"})).unwrap();
        assert_eq!(user.id, MemberId::new(2));
        assert_eq!(user.username, "b");
        assert_eq!(user.seller_id, Some(SellerId::new(7)));
    }

    #[test]
    fn test_user_serializes_null_seller_id() {
        let user: User = serde_json::from_value(json!({"id": 7, "username": "alice"})).unwrap();
        let value = serde_json::to_value(&user).unwrap();
        assert_eq!(value["sellerID"], serde_json::Value::Null);
        assert!(value.get("hasShop").is_none());
    }

    #[test]
    fn test_owns_shop_prefers_explicit_flag() {
        let mut user: User =
            serde_json::from_value(json!({"id": 1, "sellerID": 3, "hasShop": false})).unwrap();
        assert!(!user.owns_shop());
        user.has_shop = None;
        assert!(user.owns_shop());
        user.seller_id = None;
        assert!(!user.owns_shop());
    }

    #[test]
    fn test_register_request_debug_redacts_password() {
        let req = RegisterRequest {
            username: "alice".to_string(),
            password: SecretString::from("hunter2"),
            first_name: "Alice".to_string(),
            last_name: "Liddell".to_string(),
            email: None,
            age: None,
            phone: None,
            birthday: None,
            address: None,
            gender_id: None,
        };
        let debug = format!("{req:?}");
        assert!(debug.contains("[REDACTED]"));
        assert!(!debug.contains("hunter2"));
    }
}

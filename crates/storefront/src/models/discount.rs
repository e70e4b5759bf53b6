//! Discount codes managed by the admin panel.

use bazaar_core::DiscountCodeId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A discount code record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscountCode {
    #[serde(rename = "ID", alias = "id")]
    pub id: DiscountCodeId,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub amount: i64,
    #[serde(default)]
    pub min_order: i64,
    #[serde(default)]
    pub usage_limit: i64,
    #[serde(default)]
    pub times_used: i64,
    #[serde(default)]
    pub starts_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub expires_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub image_url: String,
}

impl DiscountCode {
    /// Whether the code can still be redeemed at `now`.
    #[must_use]
    pub fn is_active(&self, now: DateTime<Utc>) -> bool {
        let started = self.starts_at.is_none_or(|at| at <= now);
        let not_expired = self.expires_at.is_none_or(|at| now < at);
        let has_uses = self.usage_limit <= 0 || self.times_used < self.usage_limit;
        started && not_expired && has_uses
    }
}

/// Multipart fields for creating or updating a discount code.
///
/// Dates are sent as `YYYY-MM-DD` or RFC 3339 strings; blank means unset.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DiscountCodeForm {
    pub name: String,
    pub amount: i64,
    pub min_order: i64,
    pub usage_limit: i64,
    pub starts_at: Option<String>,
    pub expires_at: Option<String>,
    /// Local image file to upload with the code.
    pub image: Option<std::path::PathBuf>,
}

impl DiscountCodeForm {
    /// Text fields in the order the backend's form binding expects.
    #[must_use]
    pub fn text_fields(&self) -> Vec<(&'static str, String)> {
        vec![
            ("name", self.name.clone()),
            ("amount", self.amount.to_string()),
            ("min_order", self.min_order.to_string()),
            ("usage_limit", self.usage_limit.to_string()),
            ("starts_at", self.starts_at.clone().unwrap_or_default()),
            ("expires_at", self.expires_at.clone().unwrap_or_default()),
        ]
    }
}

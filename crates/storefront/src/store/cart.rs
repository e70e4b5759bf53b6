//! Cart lines and the pure operations the store applies to them.
//!
//! A cart line holds a snapshot of the listing record taken when it was
//! added, plus a count. Lines are identified by the listing's id.

use std::str::FromStr;

use bazaar_core::PostId;
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;
use thiserror::Error;

use crate::models::ProductListing;
use crate::payload::{self, str_field, u64_field};

/// Why a record cannot be put in the cart.
#[derive(Debug, Error)]
pub enum ProductRefError {
    /// Snapshot is not a JSON object.
    #[error("product record must be a JSON object")]
    NotAnObject,

    /// Record carries no `ID`/`id`.
    #[error("product record has no id")]
    MissingKey,

    /// Record carries no usable price.
    #[error("product record {0} has no price")]
    MissingPrice(PostId),

    /// Listing could not be captured as JSON.
    #[error("failed to capture product record: {0}")]
    Snapshot(#[from] serde_json::Error),
}

/// Snapshot of a product listing at the time it was added to the cart.
///
/// Only constructible from a record that has an id and a price.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProductRef {
    key: PostId,
    price: Decimal,
    raw: Value,
}

impl ProductRef {
    /// Listing id this snapshot was taken from.
    #[must_use]
    pub const fn key(&self) -> PostId {
        self.key
    }

    /// Unit price at the time of the snapshot.
    #[must_use]
    pub const fn price(&self) -> Decimal {
        self.price
    }

    /// Product name, if the snapshot carries one.
    #[must_use]
    pub fn name(&self) -> Option<String> {
        nested_product(&self.raw)
            .and_then(|p| str_field(p, &["name", "Name"]))
            .or_else(|| str_field(&self.raw, &["name", "Name"]))
    }

    /// The snapshot as received.
    #[must_use]
    pub const fn raw(&self) -> &Value {
        &self.raw
    }
}

impl TryFrom<Value> for ProductRef {
    type Error = ProductRefError;

    fn try_from(raw: Value) -> Result<Self, Self::Error> {
        if !raw.is_object() {
            return Err(ProductRefError::NotAnObject);
        }
        let key = u64_field(&raw, &["ID", "id"])
            .map(PostId::new)
            .ok_or(ProductRefError::MissingKey)?;
        let price = nested_product(&raw)
            .and_then(|p| payload::field(p, &["price", "Price"]))
            .or_else(|| payload::field(&raw, &["price", "Price"]))
            .and_then(parse_price)
            .ok_or(ProductRefError::MissingPrice(key))?;
        Ok(Self { key, price, raw })
    }
}

impl TryFrom<&ProductListing> for ProductRef {
    type Error = ProductRefError;

    fn try_from(listing: &ProductListing) -> Result<Self, Self::Error> {
        Self::try_from(serde_json::to_value(listing)?)
    }
}

impl Serialize for ProductRef {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.raw.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for ProductRef {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = Value::deserialize(deserializer)?;
        Self::try_from(raw).map_err(serde::de::Error::custom)
    }
}

fn nested_product(raw: &Value) -> Option<&Value> {
    payload::field(raw, &["Product", "product"]).filter(|p| p.is_object())
}

fn parse_price(value: &Value) -> Option<Decimal> {
    match value {
        Value::Number(n) => {
            let text = n.to_string();
            Decimal::from_str(&text)
                .or_else(|_| Decimal::from_scientific(&text))
                .ok()
        }
        Value::String(s) => Decimal::from_str(s.trim()).ok(),
        _ => None,
    }
}

/// One entry in the cart.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CartLine {
    pub product: ProductRef,
    /// Always at least 1.
    pub count: u64,
}

impl CartLine {
    /// A fresh line with a count of one.
    #[must_use]
    pub const fn new(product: ProductRef) -> Self {
        Self { product, count: 1 }
    }

    /// Listing id of this line.
    #[must_use]
    pub const fn key(&self) -> PostId {
        self.product.key
    }

    /// `price * count`, saturating at the bounds of [`Decimal`].
    #[must_use]
    pub fn subtotal(&self) -> Decimal {
        self.product.price.saturating_mul(Decimal::from(self.count))
    }
}

impl Serialize for CartLine {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        #[derive(Serialize)]
        struct Wire<'a> {
            product: &'a ProductRef,
            count: u64,
        }
        Wire {
            product: &self.product,
            count: self.count,
        }
        .serialize(serializer)
    }
}

/// Accepts `{product, count}` as well as the older flattened shape where the
/// listing record itself carries a `count` field.
impl<'de> Deserialize<'de> for CartLine {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let Value::Object(mut map) = Value::deserialize(deserializer)? else {
            return Err(serde::de::Error::custom("cart line must be a JSON object"));
        };
        let count = map
            .remove("count")
            .as_ref()
            .and_then(payload::as_u64)
            .map_or(1, clamp_count);
        let wrapped = map.len() == 1 && map.get("product").is_some_and(Value::is_object);
        let raw = if wrapped {
            map.remove("product").unwrap_or(Value::Null)
        } else {
            Value::Object(map)
        };
        let product = ProductRef::try_from(raw).map_err(serde::de::Error::custom)?;
        Ok(Self { product, count })
    }
}

fn clamp_count(n: u64) -> u64 {
    n.max(1)
}

/// Append a fresh line for `product`, then drop lines that are structurally
/// identical (snapshot and count) to an earlier one.
pub fn add_line(lines: &mut Vec<CartLine>, product: ProductRef) {
    lines.push(CartLine::new(product));
    let mut unique: Vec<CartLine> = Vec::with_capacity(lines.len());
    for line in lines.drain(..) {
        if !unique.contains(&line) {
            unique.push(line);
        }
    }
    *lines = unique;
}

/// Set the count of every line for `key` to `max(1, count)`.
///
/// Returns whether any line matched.
pub fn update_quantity(lines: &mut [CartLine], key: PostId, count: i64) -> bool {
    let clamped = u64::try_from(count).map_or(1, clamp_count);
    let mut matched = false;
    for line in lines.iter_mut().filter(|line| line.key() == key) {
        line.count = clamped;
        matched = true;
    }
    matched
}

/// Remove every line for `key`, keeping the others in order.
///
/// Returns the number of lines removed.
pub fn remove_lines(lines: &mut Vec<CartLine>, key: PostId) -> usize {
    let before = lines.len();
    lines.retain(|line| line.key() != key);
    before - lines.len()
}

/// Sum of `price * count` over all lines; zero when empty.
#[must_use]
pub fn total(lines: &[CartLine]) -> Decimal {
    lines
        .iter()
        .map(CartLine::subtotal)
        .fold(Decimal::ZERO, Decimal::saturating_add)
}

//! Cache types for reference-data responses.

use crate::models::{Category, ShopCategory};

/// Cache key for reference lists.
#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq)]
pub enum CacheKey {
    Categories,
    ShopCategories,
}

/// Cached value types.
#[derive(Debug, Clone)]
pub enum CacheValue {
    Categories(Vec<Category>),
    ShopCategories(Vec<ShopCategory>),
}

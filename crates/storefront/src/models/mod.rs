//! Typed backend payloads.
//!
//! Record types mirror the backend's JSON shapes, including its mixed key
//! casing. Request bodies live next to the records they create or update.

pub mod catalog;
pub mod discount;
pub mod session;
pub mod shop;
pub mod user;

pub use catalog::{
    Category, NewProduct, Product, ProductImage, ProductListing, ProductUpdate, Seller,
    ShopCategory,
};
pub use discount::{DiscountCode, DiscountCodeForm};
pub use shop::{
    NewSellerShop, SellerShopCreated, ShopAddress, ShopAddressInput, ShopProfile,
    ShopProfileUpdate,
};
pub use user::{People, RegisterRequest, User};

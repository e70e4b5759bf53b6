//! Bazaar storefront client library.
//!
//! Talks to the marketplace REST backend and keeps the signed-in session and
//! the cart in a persisted [`store::Store`]. Front ends build one
//! [`state::AppContext`] and go through it for everything.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod api;
pub mod config;
pub mod error;
pub mod messaging;
pub mod models;
pub mod payload;
pub mod services;
pub mod state;
pub mod store;

pub use config::StorefrontConfig;
pub use error::{AppError, Result};
pub use state::AppContext;

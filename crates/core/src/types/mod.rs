//! Core types for Bazaar.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod file_type;
pub mod id;
pub mod price;

pub use file_type::FileType;
pub use id::*;
pub use price::{CurrencyCode, Price};

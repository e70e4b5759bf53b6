//! Durable storage keys for the session/cart record.

/// Key under which the session/cart record is persisted.
pub const STORE_KEY: &str = "ecom-store";

/// Schema version written alongside the persisted record.
pub const STORE_VERSION: u32 = 0;

/// Keys written by older clients, read only when [`STORE_KEY`] is absent.
pub mod legacy {
    /// Member records, in lookup order.
    pub const USER_KEYS: &[&str] = &["auth:user", "currentUser", "user"];

    /// Bare member id.
    pub const UID: &str = "uid";

    /// Credential strings, in lookup order.
    pub const TOKEN_KEYS: &[&str] = &["token", "auth:token"];

    /// Every legacy key, for wiping.
    pub const ALL: &[&str] = &["auth:user", "currentUser", "user", "uid", "token", "auth:token"];
}

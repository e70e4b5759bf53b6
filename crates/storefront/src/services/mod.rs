//! Operations that span the backend and the local store.

mod account;

pub use account::{AccountService, Credentials, RegisterOutcome};

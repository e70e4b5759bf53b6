//! Signed-in session state.

use bazaar_core::MemberId;
use secrecy::{ExposeSecret, SecretString};

use crate::models::User;

/// Who is signed in, and with which credential.
///
/// A token is only ever committed together with a user. The reverse does not
/// hold: a legacy record may resolve a user without a usable token.
#[derive(Clone, Default)]
pub struct Session {
    pub user: Option<User>,
    pub token: Option<SecretString>,
    /// `None` whenever no user is held.
    pub has_shop: Option<bool>,
}

impl Session {
    /// A session for `user`, deriving the shop flag from the user record.
    #[must_use]
    pub fn signed_in(user: User, token: SecretString) -> Self {
        let has_shop = Some(user.owns_shop());
        Self {
            user: Some(user),
            token: Some(token),
            has_shop,
        }
    }

    /// Whether a credential is held.
    #[must_use]
    pub const fn is_authenticated(&self) -> bool {
        self.token.is_some()
    }

    /// Id of the signed-in member.
    #[must_use]
    pub fn member_id(&self) -> Option<MemberId> {
        self.user.as_ref().map(|u| u.id)
    }

    /// Whether the member owns a shop; `false` when signed out.
    #[must_use]
    pub fn has_shop(&self) -> bool {
        self.has_shop.unwrap_or(false)
    }

    /// The raw credential, for building request headers.
    #[must_use]
    pub fn token_str(&self) -> Option<&str> {
        self.token.as_ref().map(|t| t.expose_secret())
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("user", &self.user)
            .field("token", &self.token.as_ref().map(|_| "[REDACTED]"))
            .field("has_shop", &self.has_shop)
            .finish()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_signed_in_derives_shop_flag() {
        let user: User = serde_json::from_value(json!({"id": 7, "username": "alice"})).unwrap();
        let session = Session::signed_in(user, SecretString::from("tok123"));
        assert_eq!(session.has_shop, Some(false));
        assert_eq!(session.member_id(), Some(MemberId::new(7)));
        assert_eq!(session.token_str(), Some("tok123"));
    }

    #[test]
    fn test_default_is_signed_out() {
        let session = Session::default();
        assert!(!session.is_authenticated());
        assert!(!session.has_shop());
        assert!(session.member_id().is_none());
    }

    #[test]
    fn test_debug_redacts_token() {
        let user: User = serde_json::from_value(json!({"id": 1})).unwrap();
        let session = Session::signed_in(user, SecretString::from("super-secret"));
        let debug = format!("{session:?}");
        assert!(!debug.contains("super-secret"));
        assert!(debug.contains("[REDACTED]"));
    }
}

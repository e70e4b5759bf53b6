//! Session/cart store.
//!
//! The store is the single owner of the signed-in user, their credential,
//! the shop flag and the cart. Every mutation builds a new immutable
//! [`StoreState`] snapshot, publishes it on a watch channel and writes it
//! through to durable storage.

pub mod cart;
pub mod persist;
pub mod session;

use std::sync::Arc;

use bazaar_core::{PostId, Price};
use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderValue};
use rust_decimal::Decimal;
use secrecy::SecretString;
use tokio::sync::watch;
use tracing::{debug, warn};

use crate::api::AuthSession;
use crate::error::{add_breadcrumb, clear_sentry_user};
use cart::{CartLine, ProductRef};
use persist::{KeyValueStorage, Persistence};
use session::Session;

/// One committed snapshot of the store.
#[derive(Debug, Clone, Default)]
pub struct StoreState {
    pub session: Session,
    pub carts: Vec<CartLine>,
}

impl StoreState {
    /// Sum of `price * count` over the cart.
    #[must_use]
    pub fn total_price(&self) -> Decimal {
        cart::total(&self.carts)
    }
}

/// Process-wide session/cart store.
#[derive(Clone)]
pub struct Store {
    inner: Arc<StoreInner>,
}

struct StoreInner {
    state: watch::Sender<Arc<StoreState>>,
    persistence: Persistence,
}

impl Store {
    /// Open the store over `storage`, rehydrating any persisted session.
    #[must_use]
    pub fn open(storage: Arc<dyn KeyValueStorage>) -> Self {
        let persistence = Persistence::new(storage);
        let initial = persistence.load();
        debug!(
            signed_in = initial.session.user.is_some(),
            cart_lines = initial.carts.len(),
            "Store opened"
        );
        let (state, _) = watch::channel(Arc::new(initial));
        Self {
            inner: Arc::new(StoreInner { state, persistence }),
        }
    }

    /// The latest committed snapshot.
    #[must_use]
    pub fn snapshot(&self) -> Arc<StoreState> {
        self.inner.state.borrow().clone()
    }

    /// Receive every future snapshot.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<Arc<StoreState>> {
        self.inner.state.subscribe()
    }

    /// Replace the current snapshot with `f(current)` and persist it.
    fn commit(&self, f: impl FnOnce(&mut StoreState)) {
        self.inner.state.send_modify(|current| {
            let mut next = StoreState::clone(current);
            f(&mut next);
            *current = Arc::new(next);
        });
        self.write_through();
    }

    fn write_through(&self) {
        if let Err(e) = self
            .inner
            .persistence
            .save_latest(|| self.inner.state.borrow().clone())
        {
            warn!(error = %e, "Failed to persist store snapshot");
        }
    }

    // -------------------------------------------------------------------------
    // Session
    // -------------------------------------------------------------------------

    /// Commit `session` as the signed-in session.
    pub(crate) fn commit_session(&self, session: Session) {
        self.commit(|state| state.session = session);
    }

    /// Replace the user record, keeping the credential.
    pub(crate) fn commit_user(&self, user: crate::models::User, has_shop: bool) {
        self.commit(|state| {
            state.session.user = Some(user);
            state.session.has_shop = Some(has_shop);
        });
    }

    /// Drop the session fields without touching the cart.
    pub(crate) fn reset_session(&self) {
        self.commit(|state| state.session = Session::default());
    }

    /// Clear the session fields in memory and in storage. The cart is kept.
    pub fn logout(&self) {
        self.reset_session();
        clear_sentry_user();
        add_breadcrumb("auth", "Signed out", None);
    }

    /// Wipe the durable record (and legacy keys), then clear the session.
    /// The cart is kept and written back. Used on 401 and by
    /// logout-with-wipe.
    pub fn clear_persisted_store(&self) {
        if let Err(e) = self.inner.persistence.wipe() {
            warn!(error = %e, "Failed to wipe persisted store");
        }
        self.reset_session();
        clear_sentry_user();
    }

    /// The current user's credential, if any.
    #[must_use]
    pub fn token(&self) -> Option<SecretString> {
        self.snapshot().session.token.clone()
    }

    /// `Authorization: Bearer <token>` when a credential is held, else empty.
    #[must_use]
    pub fn auth_header(&self) -> HeaderMap {
        let mut headers = HeaderMap::new();
        let snapshot = self.snapshot();
        if let Some(token) = snapshot.session.token_str() {
            match HeaderValue::from_str(&format!("Bearer {token}")) {
                Ok(mut value) => {
                    value.set_sensitive(true);
                    headers.insert(AUTHORIZATION, value);
                }
                Err(e) => warn!(error = %e, "Stored token is not a valid header value"),
            }
        }
        headers
    }

    // -------------------------------------------------------------------------
    // Cart
    // -------------------------------------------------------------------------

    /// Add `product` with a count of one, coalescing exact duplicates.
    pub fn add_to_cart(&self, product: ProductRef) {
        let key = product.key().to_string();
        self.commit(|state| cart::add_line(&mut state.carts, product));
        add_breadcrumb("cart", "Added to cart", Some(&[("post_id", key.as_str())]));
    }

    /// Set the count of every line for `key` to `max(1, count)`.
    pub fn update_quantity(&self, key: PostId, count: i64) {
        self.commit(|state| {
            cart::update_quantity(&mut state.carts, key, count);
        });
    }

    /// Remove every line for `key`.
    pub fn remove_product(&self, key: PostId) {
        let key_text = key.to_string();
        self.commit(|state| {
            cart::remove_lines(&mut state.carts, key);
        });
        add_breadcrumb(
            "cart",
            "Removed from cart",
            Some(&[("post_id", key_text.as_str())]),
        );
    }

    /// Sum of `price * count`; zero for an empty cart.
    #[must_use]
    pub fn total_price(&self) -> Decimal {
        self.snapshot().total_price()
    }

    /// Cart total formatted for display.
    #[must_use]
    pub fn total_display(&self) -> String {
        Price::from_amount(self.total_price()).display()
    }

    /// Number of cart lines.
    #[must_use]
    pub fn cart_count(&self) -> usize {
        self.snapshot().carts.len()
    }

    /// The first cart line for `key`.
    #[must_use]
    pub fn line(&self, key: PostId) -> Option<CartLine> {
        self.snapshot()
            .carts
            .iter()
            .find(|line| line.key() == key)
            .cloned()
    }
}

impl AuthSession for Store {
    fn bearer_token(&self) -> Option<SecretString> {
        self.token()
    }

    fn on_unauthorized(&self) {
        warn!("Received 401, clearing session");
        self.clear_persisted_store();
    }
}

impl std::fmt::Debug for Store {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Store")
            .field("state", &self.snapshot())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;
    use crate::models::User;
    use crate::models::session::STORE_KEY;
    use persist::MemoryStorage;
    use serde_json::json;

    fn store() -> (Arc<MemoryStorage>, Store) {
        let storage = Arc::new(MemoryStorage::new());
        let store = Store::open(storage.clone());
        (storage, store)
    }

    fn product(id: u64, price: i64) -> ProductRef {
        ProductRef::try_from(json!({"ID": id, "Product": {"price": price}})).unwrap()
    }

    fn sign_in(store: &Store) {
        let user: User = serde_json::from_value(json!({"id": 7, "username": "alice"})).unwrap();
        store.commit_session(Session::signed_in(user, SecretString::from("tok123")));
    }

    #[test]
    fn test_auth_header_follows_session() {
        let (_, store) = store();
        assert!(store.auth_header().is_empty());

        sign_in(&store);
        let headers = store.auth_header();
        assert_eq!(headers[AUTHORIZATION], "Bearer tok123");

        store.logout();
        assert!(store.auth_header().is_empty());
    }

    #[test]
    fn test_mutations_write_through() {
        let (storage, store) = store();
        store.add_to_cart(product(1, 300));
        store.update_quantity(PostId::new(1), 2);

        let reopened = Store::open(storage);
        let snapshot = reopened.snapshot();
        assert_eq!(snapshot.carts.len(), 1);
        assert_eq!(snapshot.carts[0].count, 2);
        assert_eq!(reopened.total_price(), Decimal::new(600, 0));
    }

    #[test]
    fn test_logout_keeps_cart() {
        let (storage, store) = store();
        sign_in(&store);
        store.add_to_cart(product(1, 10));
        store.logout();

        let snapshot = store.snapshot();
        assert!(snapshot.session.user.is_none());
        assert!(snapshot.session.has_shop.is_none());
        assert_eq!(snapshot.carts.len(), 1);
        assert!(Store::open(storage).snapshot().session.token.is_none());
    }

    #[test]
    fn test_clear_persisted_store_wipes_session() {
        let (storage, store) = store();
        storage.set("currentUser", r#"{"id": 7}"#).unwrap();
        sign_in(&store);
        store.clear_persisted_store();

        assert!(storage.get("currentUser").unwrap().is_none());
        assert!(store.snapshot().session.user.is_none());
        assert!(store.auth_header().is_empty());
        let record: serde_json::Value =
            serde_json::from_str(&storage.get(STORE_KEY).unwrap().unwrap()).unwrap();
        assert!(record["state"]["token"].is_null());
    }

    #[test]
    fn test_clear_persisted_store_keeps_cart_across_restart() {
        let (storage, store) = store();
        sign_in(&store);
        store.add_to_cart(product(1, 10));
        store.clear_persisted_store();

        let reopened = Store::open(storage);
        assert_eq!(reopened.cart_count(), 1);
        let snapshot = reopened.snapshot();
        assert!(snapshot.session.user.is_none());
        assert!(snapshot.session.token.is_none());
    }

    #[test]
    fn test_on_unauthorized_clears_session() {
        let (_, store) = store();
        sign_in(&store);
        store.on_unauthorized();
        assert!(store.bearer_token().is_none());
        assert!(store.snapshot().session.user.is_none());
    }

    #[test]
    fn test_snapshots_are_immutable() {
        let (_, store) = store();
        let before = store.snapshot();
        store.add_to_cart(product(1, 10));
        assert!(before.carts.is_empty());
        assert_eq!(store.cart_count(), 1);
    }

    #[test]
    fn test_remove_and_total() {
        let (_, store) = store();
        assert_eq!(store.total_price(), Decimal::ZERO);
        store.add_to_cart(product(1, 100));
        store.add_to_cart(product(2, 50));
        store.remove_product(PostId::new(1));
        assert_eq!(store.total_price(), Decimal::new(50, 0));
        assert_eq!(store.total_display(), "฿50.00");
    }

    #[tokio::test]
    async fn test_subscribers_see_commits() {
        let (_, store) = store();
        let mut rx = store.subscribe();
        store.add_to_cart(product(1, 10));
        rx.changed().await.unwrap();
        assert_eq!(rx.borrow().carts.len(), 1);
    }
}

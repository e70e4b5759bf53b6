//! Application context handed to front ends.

use std::sync::Arc;

use crate::api::{AdminClient, ApiClient, ApiError, CatalogClient, SellerClient};
use crate::config::StorefrontConfig;
use crate::messaging::DmClient;
use crate::services::AccountService;
use crate::store::Store;
use crate::store::persist::{FileStorage, KeyValueStorage};

/// Everything a front end needs, wired once at startup.
///
/// This struct is cheaply cloneable via `Arc`. There is no global state:
/// the store, the HTTP client and every per-area client live here.
#[derive(Clone)]
pub struct AppContext {
    inner: Arc<AppContextInner>,
}

struct AppContextInner {
    config: StorefrontConfig,
    store: Store,
    api: ApiClient,
    account: AccountService,
    catalog: CatalogClient,
    seller: SellerClient,
    admin: AdminClient,
    dm: DmClient,
}

impl std::fmt::Debug for AppContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppContext")
            .field("config", &self.inner.config)
            .field("store", &self.inner.store)
            .finish_non_exhaustive()
    }
}

impl AppContext {
    /// Create the context, persisting the store to `config.storage_path`.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client fails to build.
    pub fn new(config: StorefrontConfig) -> Result<Self, ApiError> {
        let storage = Arc::new(FileStorage::new(config.storage_path.clone()));
        Self::with_storage(config, storage)
    }

    /// Create the context over any key-value storage.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client fails to build.
    pub fn with_storage(
        config: StorefrontConfig,
        storage: Arc<dyn KeyValueStorage>,
    ) -> Result<Self, ApiError> {
        let store = Store::open(storage);
        let api = ApiClient::new(&config.api_url, config.http_timeout, Arc::new(store.clone()))?;

        Ok(Self {
            inner: Arc::new(AppContextInner {
                account: AccountService::new(api.clone(), store.clone()),
                catalog: CatalogClient::new(api.clone()),
                seller: SellerClient::new(api.clone()),
                admin: AdminClient::new(api.clone(), config.cache_ttl),
                dm: DmClient::new(api.clone(), store.clone()),
                config,
                store,
                api,
            }),
        })
    }

    /// Get a reference to the client configuration.
    #[must_use]
    pub fn config(&self) -> &StorefrontConfig {
        &self.inner.config
    }

    /// Get a reference to the session and cart store.
    #[must_use]
    pub fn store(&self) -> &Store {
        &self.inner.store
    }

    /// Get a reference to the raw API client.
    #[must_use]
    pub fn api(&self) -> &ApiClient {
        &self.inner.api
    }

    /// Sign-in, registration and profile refresh.
    #[must_use]
    pub fn account(&self) -> &AccountService {
        &self.inner.account
    }

    /// Product listings and shop pages.
    #[must_use]
    pub fn catalog(&self) -> &CatalogClient {
        &self.inner.catalog
    }

    /// Seller shop and listing management.
    #[must_use]
    pub fn seller(&self) -> &SellerClient {
        &self.inner.seller
    }

    /// Category, shop category and discount code administration.
    #[must_use]
    pub fn admin(&self) -> &AdminClient {
        &self.inner.admin
    }

    /// Direct messages.
    #[must_use]
    pub fn dm(&self) -> &DmClient {
        &self.inner.dm
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::store::persist::MemoryStorage;
    use std::path::PathBuf;
    use url::Url;

    #[test]
    fn test_context_shares_one_store() {
        let config = StorefrontConfig::new(
            Url::parse("http://localhost:9/api").unwrap(),
            PathBuf::from("unused.json"),
        );
        let ctx = AppContext::with_storage(config, Arc::new(MemoryStorage::new())).unwrap();
        assert_eq!(ctx.api().base_url().as_str(), "http://localhost:9/api/");
        assert_eq!(ctx.dm().normalizer().host(), "http://localhost:9");

        let clone = ctx.clone();
        assert!(clone.store().snapshot().carts.is_empty());
        assert!(Arc::ptr_eq(&ctx.store().snapshot(), &clone.store().snapshot()));
    }
}

//! Public catalog: product listings and shop pages.

use bazaar_core::{PostId, SellerId};
use tracing::instrument;

use super::{ApiClient, ApiError};
use crate::models::{ProductListing, ShopProfile};

/// Read-only access to listings and shop profiles.
#[derive(Debug, Clone)]
pub struct CatalogClient {
    api: ApiClient,
}

impl CatalogClient {
    /// Create a catalog client over `api`.
    #[must_use]
    pub const fn new(api: ApiClient) -> Self {
        Self { api }
    }

    /// Every active listing on the marketplace.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self))]
    pub async fn list_all_products(&self) -> Result<Vec<ProductListing>, ApiError> {
        self.api.get_list("listAllProducts").await
    }

    /// Listings posted by the signed-in seller.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails or the member is not signed in.
    #[instrument(skip(self))]
    pub async fn my_listings(&self) -> Result<Vec<ProductListing>, ApiError> {
        self.api.get_list("ListMyPostProducts").await
    }

    /// A single listing by id.
    ///
    /// # Errors
    ///
    /// Returns an error if the listing does not exist or the API request fails.
    #[instrument(skip(self), fields(post_id = %id))]
    pub async fn listing(&self, id: PostId) -> Result<ProductListing, ApiError> {
        self.api.get_data(&format!("post-products/{id}")).await
    }

    /// The signed-in seller's own shop profile.
    ///
    /// # Errors
    ///
    /// Returns an error if the member has no shop or the API request fails.
    #[instrument(skip(self))]
    pub async fn my_shop_profile(&self) -> Result<ShopProfile, ApiError> {
        self.api.get_data("ListMyProfile").await
    }

    /// Public profile of a seller's shop.
    ///
    /// # Errors
    ///
    /// Returns an error if the shop does not exist or the API request fails.
    #[instrument(skip(self), fields(seller_id = %seller))]
    pub async fn shop_profile(&self, seller: SellerId) -> Result<ShopProfile, ApiError> {
        self.api.get_data(&format!("shops/{seller}/profile")).await
    }

    /// Listings in a seller's shop.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self), fields(seller_id = %seller))]
    pub async fn shop_listings(&self, seller: SellerId) -> Result<Vec<ProductListing>, ApiError> {
        self.api.get_list(&format!("shops/{seller}/posts")).await
    }
}

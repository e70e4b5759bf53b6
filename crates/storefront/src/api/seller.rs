//! Seller operations: opening a shop, editing it, and managing listings.

use std::path::{Path, PathBuf};

use bazaar_core::PostId;
use reqwest::Method;
use reqwest::multipart::Form;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, instrument};

use super::{ApiClient, ApiError, decode, file_part};
use crate::models::{
    NewProduct, NewSellerShop, Product, ProductListing, ProductUpdate, SellerShopCreated,
    ShopProfile, ShopProfileUpdate,
};
use crate::payload::{str_field, unwrap_data};

/// Response of `POST /api/post-Product`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ProductCreated {
    #[serde(default)]
    pub message: String,
    pub product: Product,
    pub post: ProductListing,
}

#[derive(Serialize)]
struct ProductUpdateBody<'a> {
    post_id: PostId,
    #[serde(flatten)]
    update: &'a ProductUpdate,
}

/// Client for seller-only endpoints.
#[derive(Debug, Clone)]
pub struct SellerClient {
    api: ApiClient,
}

impl SellerClient {
    /// Create a seller client over `api`.
    #[must_use]
    pub const fn new(api: ApiClient) -> Self {
        Self { api }
    }

    /// Register the signed-in member as a seller and open their shop.
    ///
    /// # Errors
    ///
    /// Returns an error if the member is already a seller or the request fails.
    #[instrument(skip(self, shop), fields(shop_name = %shop.shop_name))]
    pub async fn create_seller_shop(
        &self,
        shop: &NewSellerShop,
    ) -> Result<SellerShopCreated, ApiError> {
        let value = self.api.send_json(Method::POST, "seller-shop", shop).await?;
        decode(value)
    }

    /// Apply a partial update to the seller's shop profile.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    #[instrument(skip(self, update), fields(seller_id = %update.seller_id))]
    pub async fn update_shop_profile(
        &self,
        update: &ShopProfileUpdate,
    ) -> Result<ShopProfile, ApiError> {
        let value = self
            .api
            .send_json(Method::PUT, "UpdateShopProfile", update)
            .await?;
        decode(unwrap_data(value))
    }

    /// Upload a shop logo, returning its server path.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or the upload fails.
    #[instrument(skip(self))]
    pub async fn upload_logo(&self, path: &Path) -> Result<String, ApiError> {
        let form = Form::new().part("file", file_part(path).await?);
        let request = self.api.request(Method::POST, "upload-logo")?.multipart(form);
        let value = self.api.send_value(request).await?;
        str_field(&value, &["url"])
            .ok_or_else(|| ApiError::InvalidResponse("upload response has no url".to_string()))
    }

    /// Upload product images, returning their server paths in upload order.
    ///
    /// # Errors
    ///
    /// Returns an error if no files are given, a file cannot be read, or the
    /// upload fails.
    #[instrument(skip(self, paths), fields(count = paths.len()))]
    pub async fn upload_product_images(&self, paths: &[PathBuf]) -> Result<Vec<String>, ApiError> {
        if paths.is_empty() {
            return Err(ApiError::InvalidInput("no images to upload".to_string()));
        }
        let mut form = Form::new();
        for path in paths {
            form = form.part("files", file_part(path).await?);
        }
        let request = self
            .api
            .request(Method::POST, "upload-Product")?
            .multipart(form);
        let value = self.api.send_value(request).await?;
        let urls: Vec<String> = value
            .get("urls")
            .and_then(Value::as_array)
            .map(|urls| {
                urls.iter()
                    .filter_map(|u| u.as_str().map(String::from))
                    .collect()
            })
            .unwrap_or_default();
        if urls.is_empty() {
            return Err(ApiError::InvalidResponse(
                "upload response has no urls".to_string(),
            ));
        }
        debug!(uploaded = urls.len(), "Product images uploaded");
        Ok(urls)
    }

    /// Create a product and list it.
    ///
    /// # Errors
    ///
    /// Returns an error if the listing has no images or the request fails.
    #[instrument(skip(self, product), fields(name = %product.name))]
    pub async fn create_product(&self, product: &NewProduct) -> Result<ProductCreated, ApiError> {
        if product.images.is_empty() {
            return Err(ApiError::InvalidInput(
                "a listing needs at least one image".to_string(),
            ));
        }
        let value = self
            .api
            .send_json(Method::POST, "post-Product", product)
            .await?;
        decode(value)
    }

    /// Apply a partial update to a listing.
    ///
    /// # Errors
    ///
    /// Returns an error if the update is empty or the request fails.
    #[instrument(skip(self, update), fields(post_id = %post_id))]
    pub async fn update_product(
        &self,
        post_id: PostId,
        update: &ProductUpdate,
    ) -> Result<ProductListing, ApiError> {
        if update.is_empty() {
            return Err(ApiError::InvalidInput("nothing to update".to_string()));
        }
        let body = ProductUpdateBody { post_id, update };
        let value = self
            .api
            .send_json(Method::PUT, "UpdateProduct", &body)
            .await?;
        decode(unwrap_data(value))
    }

    /// Delete a listing together with its product and images.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    #[instrument(skip(self), fields(post_id = %post_id))]
    pub async fn delete_listing(&self, post_id: PostId) -> Result<String, ApiError> {
        self.api.delete(&format!("DeletePost/{post_id}")).await
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use bazaar_core::CategoryId;
    use serde_json::json;

    #[test]
    fn test_update_body_flattens_fields() {
        let update = ProductUpdate {
            name: Some("New name".to_string()),
            category_id: Some(CategoryId::new(2)),
            ..ProductUpdate::default()
        };
        let body = ProductUpdateBody {
            post_id: PostId::new(9),
            update: &update,
        };
        assert_eq!(
            serde_json::to_value(&body).unwrap(),
            json!({"post_id": 9, "name": "New name", "category_id": 2})
        );
    }
}

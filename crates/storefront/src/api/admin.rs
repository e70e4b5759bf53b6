//! Admin panel: categories, shop categories and discount codes.
//!
//! Category lists change rarely and are read on every product form, so they
//! are cached in memory (`moka`). Any category mutation made through this
//! client invalidates the affected list.

use std::time::Duration;

use bazaar_core::{CategoryId, DiscountCodeId, ShopCategoryId};
use moka::future::Cache;
use reqwest::Method;
use reqwest::multipart::Form;
use serde_json::{Value, json};
use tracing::{debug, instrument};

use super::cache::{CacheKey, CacheValue};
use super::{ApiClient, ApiError, decode, file_part};
use crate::models::{Category, DiscountCode, DiscountCodeForm, ShopCategory};
use crate::payload::{error_message, field, unwrap_data};

/// Client for admin-only endpoints.
#[derive(Clone)]
pub struct AdminClient {
    api: ApiClient,
    cache: Cache<CacheKey, CacheValue>,
}

impl std::fmt::Debug for AdminClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdminClient")
            .field("api", &self.api)
            .field("cached_entries", &self.cache.entry_count())
            .finish()
    }
}

impl AdminClient {
    /// Create an admin client; reference lists are cached for `cache_ttl`.
    #[must_use]
    pub fn new(api: ApiClient, cache_ttl: Duration) -> Self {
        let cache = Cache::builder()
            .max_capacity(16)
            .time_to_live(cache_ttl)
            .build();
        Self { api, cache }
    }

    // =========================================================================
    // Categories
    // =========================================================================

    /// All product categories.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self))]
    pub async fn categories(&self) -> Result<Vec<Category>, ApiError> {
        if let Some(CacheValue::Categories(list)) = self.cache.get(&CacheKey::Categories).await {
            debug!("Cache hit for categories");
            return Ok(list);
        }
        let list: Vec<Category> = self.api.get_list("listCategory").await?;
        self.cache
            .insert(CacheKey::Categories, CacheValue::Categories(list.clone()))
            .await;
        Ok(list)
    }

    /// Create a product category.
    ///
    /// # Errors
    ///
    /// Returns an error if the name is blank or the request fails.
    #[instrument(skip(self))]
    pub async fn create_category(&self, name: &str) -> Result<Category, ApiError> {
        let name = non_blank(name, "category name")?;
        let value = self
            .api
            .send_json(Method::POST, "CreateCategory", &json!({ "name": name }))
            .await?;
        self.cache.invalidate(&CacheKey::Categories).await;
        created(&value, &["Category", "category", "data"])
    }

    /// Rename a product category.
    ///
    /// # Errors
    ///
    /// Returns an error if the name is blank or the request fails.
    #[instrument(skip(self), fields(category_id = %id))]
    pub async fn update_category(&self, id: CategoryId, name: &str) -> Result<String, ApiError> {
        let name = non_blank(name, "category name")?;
        let value = self
            .api
            .send_json(Method::PUT, &format!("categories/{id}"), &json!({ "name": name }))
            .await?;
        self.cache.invalidate(&CacheKey::Categories).await;
        Ok(error_message(&value).unwrap_or_default())
    }

    /// Delete a product category.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    #[instrument(skip(self), fields(category_id = %id))]
    pub async fn delete_category(&self, id: CategoryId) -> Result<String, ApiError> {
        let message = self.api.delete(&format!("categories/{id}")).await?;
        self.cache.invalidate(&CacheKey::Categories).await;
        Ok(message)
    }

    // =========================================================================
    // Shop categories
    // =========================================================================

    /// All shop categories.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self))]
    pub async fn shop_categories(&self) -> Result<Vec<ShopCategory>, ApiError> {
        if let Some(CacheValue::ShopCategories(list)) =
            self.cache.get(&CacheKey::ShopCategories).await
        {
            debug!("Cache hit for shop categories");
            return Ok(list);
        }
        let list: Vec<ShopCategory> = self.api.get_list("ListCShopCategory").await?;
        self.cache
            .insert(
                CacheKey::ShopCategories,
                CacheValue::ShopCategories(list.clone()),
            )
            .await;
        Ok(list)
    }

    /// Create a shop category.
    ///
    /// # Errors
    ///
    /// Returns an error if the name is blank or the request fails.
    #[instrument(skip(self))]
    pub async fn create_shop_category(&self, name: &str) -> Result<ShopCategory, ApiError> {
        let name = non_blank(name, "shop category name")?;
        let value = self
            .api
            .send_json(
                Method::POST,
                "CreateCShopCategory",
                &json!({ "category_name": name }),
            )
            .await?;
        self.cache.invalidate(&CacheKey::ShopCategories).await;
        created(&value, &["category", "Category", "data"])
    }

    /// Rename a shop category.
    ///
    /// # Errors
    ///
    /// Returns an error if the name is blank or the request fails.
    #[instrument(skip(self), fields(shop_category_id = %id))]
    pub async fn update_shop_category(
        &self,
        id: ShopCategoryId,
        name: &str,
    ) -> Result<String, ApiError> {
        let name = non_blank(name, "shop category name")?;
        let value = self
            .api
            .send_json(
                Method::PUT,
                &format!("shopcategories/{id}"),
                &json!({ "category_name": name }),
            )
            .await?;
        self.cache.invalidate(&CacheKey::ShopCategories).await;
        Ok(error_message(&value).unwrap_or_default())
    }

    /// Delete a shop category.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    #[instrument(skip(self), fields(shop_category_id = %id))]
    pub async fn delete_shop_category(&self, id: ShopCategoryId) -> Result<String, ApiError> {
        let message = self.api.delete(&format!("shopcategories/{id}")).await?;
        self.cache.invalidate(&CacheKey::ShopCategories).await;
        Ok(message)
    }

    // =========================================================================
    // Discount codes
    // =========================================================================

    /// All discount codes.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self))]
    pub async fn discount_codes(&self) -> Result<Vec<DiscountCode>, ApiError> {
        self.api.get_list("discountcodes").await
    }

    /// Create a discount code, uploading its image when one is given.
    ///
    /// # Errors
    ///
    /// Returns an error if the form is invalid, the image cannot be read, or
    /// the request fails.
    #[instrument(skip(self, form), fields(name = %form.name))]
    pub async fn create_discount_code(
        &self,
        form: &DiscountCodeForm,
    ) -> Result<DiscountCode, ApiError> {
        let multipart = discount_form(form).await?;
        let request = self
            .api
            .request(Method::POST, "discountcodes")?
            .multipart(multipart);
        let value = self.api.send_value(request).await?;
        decode(unwrap_data(value))
    }

    /// Replace a discount code's fields. The image is only replaced when the
    /// form carries one.
    ///
    /// # Errors
    ///
    /// Returns an error if the form is invalid, the image cannot be read, or
    /// the request fails.
    #[instrument(skip(self, form), fields(discount_code_id = %id))]
    pub async fn update_discount_code(
        &self,
        id: DiscountCodeId,
        form: &DiscountCodeForm,
    ) -> Result<DiscountCode, ApiError> {
        let multipart = discount_form(form).await?;
        let request = self
            .api
            .request(Method::PUT, &format!("discountcodes/{id}"))?
            .multipart(multipart);
        let value = self.api.send_value(request).await?;
        decode(unwrap_data(value))
    }

    /// Delete a discount code.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    #[instrument(skip(self), fields(discount_code_id = %id))]
    pub async fn delete_discount_code(&self, id: DiscountCodeId) -> Result<String, ApiError> {
        self.api.delete(&format!("discountcodes/{id}")).await
    }
}

fn non_blank<'a>(value: &'a str, what: &str) -> Result<&'a str, ApiError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ApiError::InvalidInput(format!("{what} must not be empty")));
    }
    Ok(trimmed)
}

fn created<T: serde::de::DeserializeOwned>(
    value: &Value,
    candidates: &[&str],
) -> Result<T, ApiError> {
    let record = field(value, candidates)
        .cloned()
        .ok_or_else(|| ApiError::InvalidResponse("response has no created record".to_string()))?;
    decode(record)
}

async fn discount_form(form: &DiscountCodeForm) -> Result<Form, ApiError> {
    non_blank(&form.name, "discount code name")?;
    if form.amount <= 0 {
        return Err(ApiError::InvalidInput(
            "discount amount must be positive".to_string(),
        ));
    }
    let mut multipart = Form::new();
    for (name, value) in form.text_fields() {
        multipart = multipart.text(name, value);
    }
    if let Some(image) = &form.image {
        multipart = multipart.part("image", file_part(image).await?);
    }
    Ok(multipart)
}

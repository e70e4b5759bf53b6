//! REST client for the marketplace backend.
//!
//! [`ApiClient`] is the one place where the bearer credential is attached to
//! outgoing requests and where 401 responses clear the local session. The
//! per-area clients ([`CatalogClient`], [`SellerClient`], [`AdminClient`])
//! and the messenger build on it.

mod admin;
mod cache;
mod catalog;
mod error;
mod seller;

pub use admin::AdminClient;
pub use catalog::CatalogClient;
pub use error::{ApiError, GENERIC_FAILURE};
pub use seller::{ProductCreated, SellerClient};

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use reqwest::multipart::Part;
use reqwest::{Method, RequestBuilder, Response, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, error, warn};
use url::Url;

use crate::payload::{error_message, unwrap_data};

/// The slice of session state the HTTP client needs.
pub trait AuthSession: Send + Sync {
    /// Credential to send as `Authorization: Bearer <token>`, if any.
    fn bearer_token(&self) -> Option<SecretString>;

    /// Called once for every 401 response, before the error is returned.
    fn on_unauthorized(&self);
}

// =============================================================================
// ApiClient
// =============================================================================

/// HTTP client bound to the backend's API base URL.
#[derive(Clone)]
pub struct ApiClient {
    inner: Arc<ApiClientInner>,
}

struct ApiClientInner {
    client: reqwest::Client,
    base_url: Url,
    session: Arc<dyn AuthSession>,
}

impl std::fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiClient")
            .field("base_url", &self.inner.base_url.as_str())
            .finish_non_exhaustive()
    }
}

impl ApiClient {
    /// Create a client for `base_url` (e.g. `http://localhost:8080/api`).
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP client fails to build.
    pub fn new(
        base_url: &Url,
        timeout: Option<Duration>,
        session: Arc<dyn AuthSession>,
    ) -> Result<Self, ApiError> {
        let mut builder = reqwest::Client::builder().user_agent(concat!(
            env!("CARGO_PKG_NAME"),
            "/",
            env!("CARGO_PKG_VERSION")
        ));
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }

        // Joining relative paths needs a trailing slash on the base.
        let mut base_url = base_url.clone();
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }

        Ok(Self {
            inner: Arc::new(ApiClientInner {
                client: builder.build()?,
                base_url,
                session,
            }),
        })
    }

    /// The API base URL, always ending in `/`.
    #[must_use]
    pub fn base_url(&self) -> &Url {
        &self.inner.base_url
    }

    /// Absolute URL for an endpoint path such as `dm/threads`.
    ///
    /// # Errors
    ///
    /// Returns error if `path` cannot be joined onto the base URL.
    pub fn url(&self, path: &str) -> Result<Url, ApiError> {
        Ok(self.inner.base_url.join(path.trim_start_matches('/'))?)
    }

    /// Start a request to `url`, attaching the bearer credential when one is
    /// held.
    #[must_use]
    pub fn request_url(&self, method: Method, url: Url) -> RequestBuilder {
        let builder = self.inner.client.request(method, url);
        match self.inner.session.bearer_token() {
            Some(token) => builder.bearer_auth(token.expose_secret()),
            None => builder,
        }
    }

    /// Start a request to an endpoint path.
    ///
    /// # Errors
    ///
    /// Returns error if `path` cannot be joined onto the base URL.
    pub fn request(&self, method: Method, path: &str) -> Result<RequestBuilder, ApiError> {
        Ok(self.request_url(method, self.url(path)?))
    }

    /// Send a request and check its status.
    ///
    /// A 401 clears the session before [`ApiError::Unauthorized`] is
    /// returned. Other non-success statuses become [`ApiError::Api`] carrying
    /// the backend's `message` or `error` text.
    ///
    /// # Errors
    ///
    /// Returns error on transport failure or a non-success status.
    pub async fn send(&self, request: RequestBuilder) -> Result<Response, ApiError> {
        let response = request.send().await?;
        let status = response.status();
        debug!(path = %response.url().path(), status = %status, "Backend responded");

        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<Value>(&body)
            .ok()
            .as_ref()
            .and_then(error_message);

        if status == StatusCode::UNAUTHORIZED {
            self.inner.session.on_unauthorized();
            return Err(ApiError::Unauthorized(message.unwrap_or_default()));
        }

        error!(
            status = %status,
            body = %body.chars().take(500).collect::<String>(),
            "Backend returned non-success status"
        );
        Err(ApiError::Api {
            status: status.as_u16(),
            message: message.unwrap_or_default(),
        })
    }

    /// Send a request and parse the JSON body.
    ///
    /// # Errors
    ///
    /// Returns error on transport failure, a non-success status, or a body
    /// that is not valid JSON.
    pub async fn send_value(&self, request: RequestBuilder) -> Result<Value, ApiError> {
        let response = self.send(request).await?;
        let text = response.text().await?;
        if text.trim().is_empty() {
            return Ok(Value::Null);
        }
        serde_json::from_str(&text).map_err(|e| {
            error!(
                error = %e,
                body = %text.chars().take(500).collect::<String>(),
                "Failed to parse backend response"
            );
            ApiError::InvalidResponse(format!("malformed JSON: {e}"))
        })
    }

    /// Send a request and decode the `data` member of the response.
    ///
    /// # Errors
    ///
    /// As [`ApiClient::send_value`], plus [`ApiError::InvalidResponse`] when
    /// the payload does not match `T`.
    pub async fn send_data<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
    ) -> Result<T, ApiError> {
        let value = unwrap_data(self.send_value(request).await?);
        decode(value)
    }

    /// `GET path` and decode the `data` member.
    ///
    /// # Errors
    ///
    /// See [`ApiClient::send_data`].
    pub async fn get_data<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        self.send_data(self.request(Method::GET, path)?).await
    }

    /// `GET path` and decode a `data` array, skipping records that do not
    /// match `T`.
    ///
    /// # Errors
    ///
    /// See [`ApiClient::send_value`].
    pub async fn get_list<T: DeserializeOwned>(&self, path: &str) -> Result<Vec<T>, ApiError> {
        let value = unwrap_data(self.send_value(self.request(Method::GET, path)?).await?);
        Ok(decode_list(value))
    }

    /// Send `body` as JSON with `method` and return the raw response body.
    ///
    /// # Errors
    ///
    /// See [`ApiClient::send_value`].
    pub async fn send_json<B: Serialize + ?Sized>(
        &self,
        method: Method,
        path: &str,
        body: &B,
    ) -> Result<Value, ApiError> {
        self.send_value(self.request(method, path)?.json(body)).await
    }

    /// `DELETE path`, returning the backend's confirmation message.
    ///
    /// # Errors
    ///
    /// See [`ApiClient::send_value`].
    pub async fn delete(&self, path: &str) -> Result<String, ApiError> {
        let value = self.send_value(self.request(Method::DELETE, path)?).await?;
        Ok(error_message(&value).unwrap_or_default())
    }
}

/// Decode `value` into `T`, reporting a mismatch as an invalid response.
pub(crate) fn decode<T: DeserializeOwned>(value: Value) -> Result<T, ApiError> {
    serde_json::from_value(value).map_err(|e| ApiError::InvalidResponse(e.to_string()))
}

/// Decode every element of a JSON array that matches `T`.
pub(crate) fn decode_list<T: DeserializeOwned>(value: Value) -> Vec<T> {
    let Value::Array(items) = value else {
        if !value.is_null() {
            warn!("Expected a list from the backend");
        }
        return Vec::new();
    };
    items
        .into_iter()
        .filter_map(|item| match serde_json::from_value(item) {
            Ok(record) => Some(record),
            Err(e) => {
                warn!(error = %e, "Skipping malformed record");
                None
            }
        })
        .collect()
}

/// Multipart part for a local file, named after the file.
pub(crate) async fn file_part(path: &Path) -> Result<Part, ApiError> {
    let bytes = tokio::fs::read(path).await?;
    let file_name = path
        .file_name()
        .map_or_else(|| "upload".to_string(), |n| n.to_string_lossy().into_owned());
    Ok(Part::bytes(bytes).file_name(file_name))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use serde_json::json;

    struct NoSession;

    impl AuthSession for NoSession {
        fn bearer_token(&self) -> Option<SecretString> {
            None
        }

        fn on_unauthorized(&self) {}
    }

    fn client(base: &str) -> ApiClient {
        ApiClient::new(&Url::parse(base).unwrap(), None, Arc::new(NoSession)).unwrap()
    }

    #[test]
    fn test_url_join_keeps_api_prefix() {
        let api = client("http://localhost:8080/api");
        assert_eq!(api.base_url().as_str(), "http://localhost:8080/api/");
        assert_eq!(
            api.url("/listAllProducts").unwrap().as_str(),
            "http://localhost:8080/api/listAllProducts"
        );
        assert_eq!(
            api.url("dm/threads/4/posts").unwrap().as_str(),
            "http://localhost:8080/api/dm/threads/4/posts"
        );
    }

    #[test]
    fn test_decode_list_skips_bad_records() {
        #[derive(serde::Deserialize)]
        struct Row {
            id: u64,
        }
        let rows: Vec<Row> = decode_list(json!([{"id": 1}, {"id": "x"}, {"id": 3}]));
        assert_eq!(rows.iter().map(|r| r.id).collect::<Vec<_>>(), vec![1, 3]);
        assert!(decode_list::<Row>(Value::Null).is_empty());
    }

    #[test]
    fn test_decode_reports_invalid_response() {
        let err = decode::<Vec<u64>>(json!({"oops": true})).unwrap_err();
        assert!(matches!(err, ApiError::InvalidResponse(_)));
    }
}

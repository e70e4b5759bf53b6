//! Unified error handling with Sentry integration.
//!
//! Provides a unified `AppError` type for front ends. Failures that point at
//! the backend or the local disk are captured to Sentry by
//! [`AppError::report`]; input and session problems are not.

use thiserror::Error;

use crate::api::ApiError;
use crate::config::ConfigError;
use crate::store::cart::ProductRefError;
use crate::store::persist::StorageError;

/// Application-level error type for the storefront client.
#[derive(Debug, Error)]
pub enum AppError {
    /// Backend call failed.
    #[error(transparent)]
    Api(#[from] ApiError),

    /// Local storage could not be read or written.
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// Configuration could not be loaded.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// A product record could not be used as a cart line.
    #[error("Product error: {0}")]
    Product(#[from] ProductRefError),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Bad input from the user.
    #[error("Bad request: {0}")]
    BadRequest(String),
}

impl AppError {
    /// Capture the error to Sentry when it points at the backend or the disk.
    ///
    /// Returns whether an event was sent.
    pub fn report(&self) -> bool {
        let capture = match self {
            Self::Api(e) => e.is_network_or_server(),
            Self::Storage(_) => true,
            _ => false,
        };
        if capture {
            let event_id = sentry::capture_error(self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Operation failed"
            );
        }
        capture
    }

    /// Text to show the user.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::Api(e) => e.user_message(),
            other => other.to_string(),
        }
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;

/// Set the Sentry user context from a user ID.
///
/// Call this after successful authentication to associate errors with users.
pub fn set_sentry_user(user_id: &impl ToString, username: Option<&str>) {
    sentry::configure_scope(|scope| {
        scope.set_user(Some(sentry::User {
            id: Some(user_id.to_string()),
            username: username.map(String::from),
            ..Default::default()
        }));
    });
}

/// Clear the Sentry user context.
///
/// Call this on logout to stop associating errors with the user.
pub fn clear_sentry_user() {
    sentry::configure_scope(|scope| {
        scope.set_user(None);
    });
}

/// Add a breadcrumb for user actions.
///
/// Breadcrumbs appear in Sentry error reports to show the trail of user actions
/// leading up to an error.
///
/// # Example
///
/// ```rust,ignore
/// add_breadcrumb("cart", "Added to cart", Some(&[("post_id", "123")]));
/// ```
pub fn add_breadcrumb(category: &str, message: &str, data: Option<&[(&str, &str)]>) {
    let mut breadcrumb = sentry::Breadcrumb {
        category: Some(category.to_string()),
        message: Some(message.to_string()),
        level: sentry::Level::Info,
        ..Default::default()
    };

    if let Some(pairs) = data {
        for (key, value) in pairs {
            breadcrumb.data.insert(
                (*key).to_string(),
                serde_json::Value::String((*value).to_string()),
            );
        }
    }

    sentry::add_breadcrumb(breadcrumb);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_app_error_display() {
        let err = AppError::NotFound("post 12".to_string());
        assert_eq!(err.to_string(), "Not found: post 12");

        let err = AppError::BadRequest("invalid input".to_string());
        assert_eq!(err.to_string(), "Bad request: invalid input");

        let err = AppError::from(ApiError::NotAuthenticated);
        assert_eq!(err.to_string(), "Not signed in");
    }

    #[test]
    fn test_report_only_captures_backend_and_disk_failures() {
        assert!(!AppError::BadRequest("x".to_string()).report());
        assert!(!AppError::from(ApiError::Unauthorized("expired".to_string())).report());
        assert!(
            AppError::from(ApiError::Api {
                status: 500,
                message: String::new(),
            })
            .report()
        );
    }

    #[test]
    fn test_user_message_prefers_backend_text() {
        let err = AppError::from(ApiError::Api {
            status: 409,
            message: "username already exists".to_string(),
        });
        assert_eq!(err.user_message(), "username already exists");
    }
}

//! Errors from backend calls.

use thiserror::Error;

/// Message shown when the backend gave no usable error text.
pub const GENERIC_FAILURE: &str = "Something went wrong, please try again";

/// Errors that can occur when talking to the marketplace backend.
///
/// Callers usually care about three classes: [`ApiError::InvalidResponse`]
/// (success status but an incomplete body), [`ApiError::Unauthorized`] (the
/// session has already been cleared) and network-or-server failures
/// ([`ApiError::Http`] and [`ApiError::Api`]).
#[derive(Debug, Error)]
pub enum ApiError {
    /// HTTP request failed before a response arrived.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Backend answered 401. The local session has been cleared.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Backend answered with another non-success status.
    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    /// Success status, but the body was missing required data.
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// Endpoint path could not be joined onto the base URL.
    #[error("Invalid URL: {0}")]
    Url(#[from] url::ParseError),

    /// A local file for upload could not be read.
    #[error("File error: {0}")]
    Io(#[from] std::io::Error),

    /// The operation needs a signed-in member.
    #[error("Not signed in")]
    NotAuthenticated,

    /// Input rejected before any request was sent.
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl ApiError {
    /// Whether this is a 401 from the backend.
    #[must_use]
    pub const fn is_unauthorized(&self) -> bool {
        matches!(self, Self::Unauthorized(_))
    }

    /// Whether the failure happened on the network or the server side.
    #[must_use]
    pub const fn is_network_or_server(&self) -> bool {
        matches!(self, Self::Http(_) | Self::Api { .. })
    }

    /// HTTP status, when the backend answered.
    #[must_use]
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Unauthorized(_) => Some(401),
            Self::Api { status, .. } => Some(*status),
            Self::Http(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    /// Text suitable for showing to the member: the backend's own message
    /// when it sent one, else a generic fallback.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::Api { message, .. }
            | Self::Unauthorized(message)
            | Self::InvalidResponse(message)
            | Self::InvalidInput(message)
                if !message.trim().is_empty() =>
            {
                message.clone()
            }
            Self::NotAuthenticated => "Please sign in first".to_string(),
            Self::Io(e) => format!("Could not read file: {e}"),
            _ => GENERIC_FAILURE.to_string(),
        }
    }
}

//! Error types for the Shopify runtime.
//!
//! Each concern owns its error type ([`ConfigError`], [`HttpError`],
//! [`GraphqlError`], [`VerificationError`], [`SessionTokenError`],
//! [`OAuthError`]). The crate-level [`Error`] unifies them for operations
//! whose outcomes are shared between concurrent callers (cached and batched
//! operations), which is why it is `Clone`.
//!
//! # Example
//!
//! ```rust
//! use shopify_runtime::{ApiKey, ConfigError};
//!
//! let result = ApiKey::new("");
//! assert!(matches!(result, Err(ConfigError::EmptyApiKey)));
//! ```

use thiserror::Error;

use crate::auth::hmac::VerificationError;
use crate::auth::jwt::SessionTokenError;
use crate::auth::oauth::OAuthError;
use crate::clients::graphql::GraphqlError;
use crate::clients::HttpError;

/// Errors that can occur during runtime configuration.
///
/// Each variant provides a clear, actionable error message.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// API key cannot be empty.
    #[error("API key cannot be empty. Please provide a valid Shopify API key.")]
    EmptyApiKey,

    /// API secret key cannot be empty.
    #[error("API secret key cannot be empty. Please provide a valid Shopify API secret key.")]
    EmptyApiSecretKey,

    /// Shop domain does not match the `{name}.myshopify.{com|io}` shape.
    #[error("Invalid shop domain '{domain}'. Expected format: 'shop-name.myshopify.com'.")]
    InvalidShopDomain {
        /// The invalid domain that was provided.
        domain: String,
    },

    /// API version is invalid.
    #[error("Invalid API version '{version}'. Expected format: 'YYYY-MM' (e.g., '2025-01') or 'unstable'.")]
    InvalidApiVersion {
        /// The invalid version string that was provided.
        version: String,
    },

    /// A required field is missing.
    #[error("Missing required field: '{field}'. This field must be set before building.")]
    MissingRequiredField {
        /// The name of the missing field.
        field: &'static str,
    },

    /// Host URL is invalid.
    #[error("Invalid host URL '{url}'. Please provide a valid URL with scheme (e.g., 'https://myapp.example.com').")]
    InvalidHostUrl {
        /// The invalid URL that was provided.
        url: String,
    },

    /// Global ID does not match `gid://{namespace}/{type}/{id}`.
    #[error("Invalid GID '{gid}'")]
    InvalidGid {
        /// The invalid global ID.
        gid: String,
    },
}

/// Crate-level error for operations built on the runtime.
///
/// Cached and batched operations hand the same outcome to every concurrent
/// caller, so this type is `Clone`; pattern-match on the variants to decide
/// domain-specific recovery.
///
/// # Example
///
/// ```rust
/// use shopify_runtime::Error;
/// use shopify_runtime::clients::{HttpError, HttpResponse, HttpResponseError};
///
/// let response = HttpResponse::new(404, Default::default(), serde_json::json!({}));
/// let error: Error = HttpError::Response(HttpResponseError::from_response(
///     "https://shop.myshopify.com/admin/api/2025-10/themes/1.json",
///     response,
/// ))
/// .into();
///
/// assert_eq!(error.status(), Some(404));
/// ```
#[derive(Debug, Error, Clone)]
pub enum Error {
    /// Invalid configuration or input value.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// REST/HTTP transport failure.
    #[error(transparent)]
    Http(#[from] HttpError),

    /// GraphQL transport, response or user error.
    #[error(transparent)]
    Graphql(#[from] GraphqlError),

    /// HMAC verification failure.
    #[error(transparent)]
    Verification(#[from] VerificationError),

    /// Session token verification failure.
    #[error(transparent)]
    SessionToken(#[from] SessionTokenError),

    /// OAuth flow failure.
    #[error(transparent)]
    OAuth(#[from] OAuthError),

    /// A batch call completed without an outcome for one of its keys.
    #[error("Batch load returned no outcome for key {key}")]
    MissingOutcome {
        /// Debug rendering of the key without an outcome.
        key: String,
    },
}

impl Error {
    /// Returns the HTTP status of the underlying response, if any.
    #[must_use]
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Http(error) => error.status(),
            Self::Graphql(GraphqlError::Http(error)) => error.status(),
            _ => None,
        }
    }

    /// Returns `true` when the underlying response had the given status.
    #[must_use]
    pub fn is_status(&self, status: u16) -> bool {
        self.status() == Some(status)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clients::{HttpResponse, HttpResponseError};
    use std::collections::HashMap;

    #[test]
    fn test_empty_api_key_error_message() {
        let error = ConfigError::EmptyApiKey;
        let message = error.to_string();
        assert!(message.contains("API key cannot be empty"));
        assert!(message.contains("valid Shopify API key"));
    }

    #[test]
    fn test_invalid_shop_domain_error_message() {
        let error = ConfigError::InvalidShopDomain {
            domain: "not-a-shop.com".to_string(),
        };
        let message = error.to_string();
        assert!(message.contains("not-a-shop.com"));
        assert!(message.contains("Expected format"));
    }

    #[test]
    fn test_missing_required_field_error_message() {
        let error = ConfigError::MissingRequiredField { field: "api_key" };
        let message = error.to_string();
        assert!(message.contains("api_key"));
        assert!(message.contains("must be set"));
    }

    #[test]
    fn test_status_reads_through_http_errors() {
        let response = HttpResponse::new(401, HashMap::new(), serde_json::json!({}));
        let error: Error =
            HttpError::Response(HttpResponseError::from_response("https://x", response)).into();

        assert!(error.is_status(401));
        assert!(!error.is_status(404));
    }

    #[test]
    fn test_non_http_errors_have_no_status() {
        let error = Error::MissingOutcome {
            key: "1".to_string(),
        };
        assert_eq!(error.status(), None);
        assert!(error.to_string().contains("no outcome"));
    }

    #[test]
    fn test_error_is_clone_send_sync() {
        fn assert_traits<T: Clone + Send + Sync + std::error::Error>() {}
        assert_traits::<Error>();
    }
}

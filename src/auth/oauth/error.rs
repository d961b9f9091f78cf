//! OAuth-specific error types.

use thiserror::Error;

use crate::clients::HttpError;

/// Errors that can occur during the authorization code exchange.
///
/// # Example
///
/// ```rust
/// use shopify_runtime::auth::oauth::OAuthError;
///
/// let error = OAuthError::InvalidResponse {
///     reason: "missing field `access_token`".to_string(),
/// };
/// assert!(error.to_string().contains("access_token"));
/// ```
#[derive(Debug, Error, Clone)]
pub enum OAuthError {
    /// The token endpoint answered with a non-2xx status or could not be
    /// reached.
    #[error("Failed fetching shopify access token: {0}")]
    Http(#[from] HttpError),

    /// The token endpoint answered 2xx with an unexpected body.
    #[error("Invalid access token response: {reason}")]
    InvalidResponse {
        /// Why the body was rejected.
        reason: String,
    },
}

impl OAuthError {
    /// Returns the HTTP status of a failed exchange, if any.
    #[must_use]
    pub const fn status(&self) -> Option<u16> {
        match self {
            Self::Http(error) => error.status(),
            Self::InvalidResponse { .. } => None,
        }
    }
}

// Verify OAuthError is Send + Sync at compile time
const _: fn() = || {
    const fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<OAuthError>();
};

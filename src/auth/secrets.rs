//! Per-shop secret resolution.
//!
//! Verification needs the API secret of the shop a request claims to come
//! from. A [`SecretProvider`] resolves [`ApiCredentials`] from a validated
//! [`ShopDomain`]; apps serving a single API key use
//! [`StaticSecretProvider`].

use async_trait::async_trait;
use thiserror::Error;

use crate::config::{ApiCredentials, ShopDomain, ShopifyConfig};

/// Failure to resolve the credentials of a shop.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("Could not resolve API credentials for shop '{shop}': {reason}")]
pub struct SecretError {
    /// The shop whose credentials were requested.
    pub shop: String,
    /// Why the lookup failed.
    pub reason: String,
}

impl SecretError {
    /// Creates an error for `shop`.
    #[must_use]
    pub fn new(shop: &ShopDomain, reason: impl Into<String>) -> Self {
        Self {
            shop: shop.as_ref().to_string(),
            reason: reason.into(),
        }
    }
}

/// Resolves API credentials for a shop.
///
/// Implementations may hit a database or a secrets manager; lookups only
/// happen after the shop identity has passed validation.
#[async_trait]
pub trait SecretProvider: Send + Sync {
    /// Returns the credentials `shop` is signed with.
    ///
    /// # Errors
    ///
    /// Returns [`SecretError`] when the shop is unknown or the backing store
    /// fails.
    async fn credentials(&self, shop: &ShopDomain) -> Result<ApiCredentials, SecretError>;
}

/// A provider returning the same credentials for every shop.
///
/// # Example
///
/// ```rust
/// use shopify_runtime::auth::StaticSecretProvider;
/// use shopify_runtime::{ApiKey, ApiSecretKey, ShopifyConfig};
///
/// let config = ShopifyConfig::builder()
///     .api_key(ApiKey::new("key").unwrap())
///     .api_secret_key(ApiSecretKey::new("secret").unwrap())
///     .build()
///     .unwrap();
///
/// let provider = StaticSecretProvider::from_config(&config);
/// assert_eq!(provider.credentials_ref().key.as_ref(), "key");
/// ```
#[derive(Clone, Debug)]
pub struct StaticSecretProvider {
    credentials: ApiCredentials,
}

impl StaticSecretProvider {
    /// Creates a provider for fixed credentials.
    #[must_use]
    pub const fn new(credentials: ApiCredentials) -> Self {
        Self { credentials }
    }

    /// Creates a provider for the credentials of `config`, old secret included.
    #[must_use]
    pub fn from_config(config: &ShopifyConfig) -> Self {
        Self::new(config.credentials().clone())
    }

    /// Returns the wrapped credentials.
    #[must_use]
    pub const fn credentials_ref(&self) -> &ApiCredentials {
        &self.credentials
    }
}

#[async_trait]
impl SecretProvider for StaticSecretProvider {
    async fn credentials(&self, _shop: &ShopDomain) -> Result<ApiCredentials, SecretError> {
        Ok(self.credentials.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ApiKey, ApiSecretKey};

    #[tokio::test]
    async fn test_static_provider_ignores_shop() {
        let credentials = ApiCredentials::new(
            ApiKey::new("key").unwrap(),
            ApiSecretKey::new("secret").unwrap(),
        );
        let provider = StaticSecretProvider::new(credentials.clone());

        let shop = ShopDomain::new("any.myshopify.com").unwrap();
        assert_eq!(provider.credentials(&shop).await.unwrap(), credentials);
    }

    #[test]
    fn test_secret_error_message() {
        let shop = ShopDomain::new("gone.myshopify.com").unwrap();
        let error = SecretError::new(&shop, "uninstalled");
        assert_eq!(
            error.to_string(),
            "Could not resolve API credentials for shop 'gone.myshopify.com': uninstalled"
        );
    }
}

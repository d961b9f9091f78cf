//! App-level settings shared by every shop environment.
//!
//! A [`ShopifyConfig`] holds what does not change per shop: the app's
//! [`ApiCredentials`], the [`ApiVersion`] to call, and the default
//! [`RetryPolicy`]. The shop and its access token live on the
//! [`Session`](crate::auth::Session) instead.

mod newtypes;
mod version;

pub use newtypes::{ApiCredentials, ApiKey, ApiSecretKey, HostUrl, ShopDomain};
pub use version::ApiVersion;

use crate::clients::RetryPolicy;
use crate::error::ConfigError;

/// Built once at startup and cloned into each [`ShopifyEnv`](crate::ShopifyEnv).
///
/// # Example
///
/// ```rust
/// use std::time::Duration;
/// use shopify_runtime::{ShopifyConfig, ApiKey, ApiSecretKey};
/// use shopify_runtime::clients::RetryPolicy;
///
/// let config = ShopifyConfig::builder()
///     .api_key(ApiKey::new("your-api-key").unwrap())
///     .api_secret_key(ApiSecretKey::new("your-secret").unwrap())
///     .retry_policy(RetryPolicy::new(20, Duration::from_secs(1)))
///     .build()
///     .unwrap();
///
/// assert_eq!(config.retry_policy().max_retries(), 20);
/// ```
#[derive(Clone, Debug)]
pub struct ShopifyConfig {
    credentials: ApiCredentials,
    scopes: Vec<String>,
    host: Option<HostUrl>,
    api_version: ApiVersion,
    user_agent_prefix: Option<String>,
    retry_policy: RetryPolicy,
}

impl ShopifyConfig {
    #[must_use]
    pub fn builder() -> ShopifyConfigBuilder {
        ShopifyConfigBuilder::new()
    }

    #[must_use]
    pub const fn api_key(&self) -> &ApiKey {
        &self.credentials.key
    }

    #[must_use]
    pub const fn api_secret_key(&self) -> &ApiSecretKey {
        &self.credentials.secret
    }

    /// The secret still accepted during a rotation.
    #[must_use]
    pub const fn old_api_secret_key(&self) -> Option<&ApiSecretKey> {
        self.credentials.old_secret.as_ref()
    }

    /// What the default secret provider hands to verifiers.
    #[must_use]
    pub const fn credentials(&self) -> &ApiCredentials {
        &self.credentials
    }

    /// Returns the OAuth scopes requested during install.
    #[must_use]
    pub fn scopes(&self) -> &[String] {
        &self.scopes
    }

    #[must_use]
    pub const fn host(&self) -> Option<&HostUrl> {
        self.host.as_ref()
    }

    #[must_use]
    pub const fn api_version(&self) -> ApiVersion {
        self.api_version
    }

    /// Prepended to the `User-Agent` of every request.
    #[must_use]
    pub fn user_agent_prefix(&self) -> Option<&str> {
        self.user_agent_prefix.as_deref()
    }

    /// Used for GraphQL, and for REST unless the environment overrides it.
    #[must_use]
    pub const fn retry_policy(&self) -> RetryPolicy {
        self.retry_policy
    }
}

// Environments share one config across tasks
const _: fn() = || {
    const fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<ShopifyConfig>();
};

/// Builds a [`ShopifyConfig`]; only the key and secret are required.
///
/// Unset, the version is [`ApiVersion::latest`] and the retry policy is
/// [`RetryPolicy::default`].
#[derive(Debug, Default)]
pub struct ShopifyConfigBuilder {
    api_key: Option<ApiKey>,
    api_secret_key: Option<ApiSecretKey>,
    old_api_secret_key: Option<ApiSecretKey>,
    scopes: Vec<String>,
    host: Option<HostUrl>,
    api_version: Option<ApiVersion>,
    user_agent_prefix: Option<String>,
    retry_policy: Option<RetryPolicy>,
}

impl ShopifyConfigBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn api_key(mut self, key: ApiKey) -> Self {
        self.api_key = Some(key);
        self
    }

    #[must_use]
    pub fn api_secret_key(mut self, key: ApiSecretKey) -> Self {
        self.api_secret_key = Some(key);
        self
    }

    /// Keeps accepting signatures made with `key` while it is rotated out.
    #[must_use]
    pub fn old_api_secret_key(mut self, key: ApiSecretKey) -> Self {
        self.old_api_secret_key = Some(key);
        self
    }

    /// Scopes requested by the OAuth authorize URL.
    #[must_use]
    pub fn scopes<I, S>(mut self, scopes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.scopes = scopes.into_iter().map(Into::into).collect();
        self
    }

    #[must_use]
    pub fn host(mut self, host: HostUrl) -> Self {
        self.host = Some(host);
        self
    }

    #[must_use]
    pub const fn api_version(mut self, version: ApiVersion) -> Self {
        self.api_version = Some(version);
        self
    }

    #[must_use]
    pub fn user_agent_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.user_agent_prefix = Some(prefix.into());
        self
    }

    #[must_use]
    pub const fn retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.retry_policy = Some(policy);
        self
    }

    /// # Errors
    ///
    /// [`ConfigError::MissingRequiredField`] naming the first of `api_key`
    /// and `api_secret_key` that is unset.
    pub fn build(self) -> Result<ShopifyConfig, ConfigError> {
        let api_key = self
            .api_key
            .ok_or(ConfigError::MissingRequiredField { field: "api_key" })?;
        let api_secret_key = self
            .api_secret_key
            .ok_or(ConfigError::MissingRequiredField {
                field: "api_secret_key",
            })?;

        let mut credentials = ApiCredentials::new(api_key, api_secret_key);
        credentials.old_secret = self.old_api_secret_key;

        Ok(ShopifyConfig {
            credentials,
            scopes: self.scopes,
            host: self.host,
            api_version: self.api_version.unwrap_or_default(),
            user_agent_prefix: self.user_agent_prefix,
            retry_policy: self.retry_policy.unwrap_or_default(),
        })
    }
}

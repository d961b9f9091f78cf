//! The concrete per-shop environment.

use std::fmt;
use std::sync::Arc;

use crate::auth::{SecretProvider, Session, StaticSecretProvider};
use crate::cache::CacheStore;
use crate::clients::{Fetch, GraphqlClient, HttpClient, ReqwestFetch, RestClient, RetryPolicy};
use crate::config::{ShopDomain, ShopifyConfig};
use crate::env::{HasCacheStore, HasFetch, HasHttpClient, HasLoaderStore, HasSecretProvider};
use crate::error::ConfigError;
use crate::loader::LoaderStore;

/// Every capability an operation can ask for, for one shop session.
///
/// Build one per authenticated shop with [`ShopifyEnv::builder`] and pass
/// it to operations. Cloning is cheap: capabilities are shared, including
/// the cache and loader registries, so clones observe the same cached and
/// batched outcomes.
///
/// # Example
///
/// ```rust
/// use shopify_runtime::env::{HasCacheStore, ShopifyEnv};
/// use shopify_runtime::{ApiKey, ApiSecretKey, Session, ShopDomain, ShopifyConfig};
///
/// let config = ShopifyConfig::builder()
///     .api_key(ApiKey::new("key").unwrap())
///     .api_secret_key(ApiSecretKey::new("secret").unwrap())
///     .build()
///     .unwrap();
/// let session = Session::new(ShopDomain::new("my-store.myshopify.com").unwrap(), "shpat_token");
///
/// let env = ShopifyEnv::builder()
///     .config(config)
///     .session(session)
///     .with_cache()
///     .build()
///     .unwrap();
///
/// assert_eq!(env.shop().as_ref(), "my-store.myshopify.com");
/// assert!(env.cache_store().is_some());
/// ```
#[derive(Clone)]
pub struct ShopifyEnv {
    session: Session,
    fetch: Arc<dyn Fetch>,
    rest_client: RestClient,
    graphql_client: GraphqlClient,
    cache_store: Option<Arc<CacheStore>>,
    loader_store: Arc<LoaderStore>,
    secret_provider: Arc<dyn SecretProvider>,
}

// Verify ShopifyEnv is Send + Sync at compile time
const _: fn() = || {
    const fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<ShopifyEnv>();
};

impl ShopifyEnv {
    /// Creates a new builder.
    #[must_use]
    pub fn builder() -> ShopifyEnvBuilder {
        ShopifyEnvBuilder::default()
    }

    /// Returns the session the environment was built for.
    #[must_use]
    pub const fn session(&self) -> &Session {
        &self.session
    }

    /// Returns the shop the environment talks to.
    #[must_use]
    pub const fn shop(&self) -> &ShopDomain {
        &self.session.shop
    }
}

impl fmt::Debug for ShopifyEnv {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ShopifyEnv")
            .field("session", &self.session)
            .field("rest_client", &self.rest_client)
            .field("cached", &self.cache_store.is_some())
            .finish_non_exhaustive()
    }
}

impl HasFetch for ShopifyEnv {
    fn fetch(&self) -> &Arc<dyn Fetch> {
        &self.fetch
    }
}

impl HasHttpClient for ShopifyEnv {
    fn rest_client(&self) -> &RestClient {
        &self.rest_client
    }

    fn graphql_client(&self) -> &GraphqlClient {
        &self.graphql_client
    }
}

impl HasCacheStore for ShopifyEnv {
    fn cache_store(&self) -> Option<&CacheStore> {
        self.cache_store.as_deref()
    }
}

impl HasLoaderStore for ShopifyEnv {
    fn loader_store(&self) -> &LoaderStore {
        &self.loader_store
    }
}

impl HasSecretProvider for ShopifyEnv {
    fn secret_provider(&self) -> &dyn SecretProvider {
        self.secret_provider.as_ref()
    }
}

/// Builder for [`ShopifyEnv`].
///
/// Only `session` is required.
///
/// # Defaults
///
/// - `fetch`: [`ReqwestFetch`] over a default `reqwest` client
/// - `secret_provider`: a [`StaticSecretProvider`] over the config's
///   credentials; required when no config is given
/// - cache: disabled; see [`with_cache`](Self::with_cache)
/// - retry policy: the config's, or [`RetryPolicy::default`]
#[derive(Default)]
pub struct ShopifyEnvBuilder {
    session: Option<Session>,
    config: Option<ShopifyConfig>,
    fetch: Option<Arc<dyn Fetch>>,
    secret_provider: Option<Arc<dyn SecretProvider>>,
    cache_store: Option<Arc<CacheStore>>,
    rest_retry_policy: Option<RetryPolicy>,
    base_uri: Option<String>,
}

impl fmt::Debug for ShopifyEnvBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ShopifyEnvBuilder")
            .field("session", &self.session)
            .field("config", &self.config)
            .field("rest_retry_policy", &self.rest_retry_policy)
            .field("base_uri", &self.base_uri)
            .finish_non_exhaustive()
    }
}

impl ShopifyEnvBuilder {
    /// Sets the shop session (required).
    #[must_use]
    pub fn session(mut self, session: Session) -> Self {
        self.session = Some(session);
        self
    }

    /// Sets the app configuration.
    #[must_use]
    pub fn config(mut self, config: ShopifyConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Replaces the network capability.
    #[must_use]
    pub fn fetch(mut self, fetch: Arc<dyn Fetch>) -> Self {
        self.fetch = Some(fetch);
        self
    }

    /// Replaces the secret provider.
    #[must_use]
    pub fn secret_provider(mut self, provider: Arc<dyn SecretProvider>) -> Self {
        self.secret_provider = Some(provider);
        self
    }

    /// Enables caching with a fresh, empty registry.
    #[must_use]
    pub fn with_cache(self) -> Self {
        self.cache_store(Arc::new(CacheStore::new()))
    }

    /// Enables caching with an existing registry.
    #[must_use]
    pub fn cache_store(mut self, store: Arc<CacheStore>) -> Self {
        self.cache_store = Some(store);
        self
    }

    /// Overrides the retry policy of the REST transport only.
    #[must_use]
    pub const fn rest_retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.rest_retry_policy = Some(policy);
        self
    }

    /// Sends Admin API calls to another origin, such as a proxy.
    #[must_use]
    pub fn base_uri(mut self, base_uri: impl Into<String>) -> Self {
        self.base_uri = Some(base_uri.into());
        self
    }

    /// Builds the environment.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingRequiredField`] if `session` is not set,
    /// or if neither a secret provider nor a config was given.
    pub fn build(self) -> Result<ShopifyEnv, ConfigError> {
        let session = self
            .session
            .ok_or(ConfigError::MissingRequiredField { field: "session" })?;

        let secret_provider = match (self.secret_provider, &self.config) {
            (Some(provider), _) => provider,
            (None, Some(config)) => {
                Arc::new(StaticSecretProvider::from_config(config)) as Arc<dyn SecretProvider>
            }
            (None, None) => {
                return Err(ConfigError::MissingRequiredField {
                    field: "secret_provider",
                })
            }
        };

        let fetch = self
            .fetch
            .unwrap_or_else(|| Arc::new(ReqwestFetch::default()));

        let mut http_client = HttpClient::new(Arc::clone(&fetch), &session, self.config.as_ref());
        if let Some(base_uri) = self.base_uri {
            http_client = http_client.with_base_uri(base_uri);
        }

        let rest_http_client = match self.rest_retry_policy {
            Some(policy) => http_client.clone().with_retry_policy(policy),
            None => http_client.clone(),
        };

        Ok(ShopifyEnv {
            session,
            fetch,
            rest_client: RestClient::new(rest_http_client),
            graphql_client: GraphqlClient::new(http_client),
            cache_store: self.cache_store,
            loader_store: Arc::new(LoaderStore::new()),
            secret_provider,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::config::{ApiKey, ApiSecretKey};

    fn session() -> Session {
        Session::new(ShopDomain::new("test.myshopify.com").unwrap(), "shpat_token")
    }

    fn config() -> ShopifyConfig {
        ShopifyConfig::builder()
            .api_key(ApiKey::new("key").unwrap())
            .api_secret_key(ApiSecretKey::new("secret").unwrap())
            .build()
            .unwrap()
    }

    #[test]
    fn test_build_requires_session() {
        let result = ShopifyEnv::builder().config(config()).build();
        assert!(matches!(
            result,
            Err(ConfigError::MissingRequiredField { field: "session" })
        ));
    }

    #[test]
    fn test_build_requires_secrets() {
        let result = ShopifyEnv::builder().session(session()).build();
        assert!(matches!(
            result,
            Err(ConfigError::MissingRequiredField {
                field: "secret_provider"
            })
        ));
    }

    #[test]
    fn test_cache_is_disabled_by_default() {
        let env = ShopifyEnv::builder()
            .config(config())
            .session(session())
            .build()
            .unwrap();

        assert!(env.cache_store().is_none());
        assert_eq!(env.rest_client().http_client().base_uri(), "https://test.myshopify.com");
    }

    #[test]
    fn test_rest_retry_policy_is_independent() {
        let policy = RetryPolicy::new(20, Duration::from_secs(1));
        let env = ShopifyEnv::builder()
            .config(config())
            .session(session())
            .rest_retry_policy(policy)
            .base_uri("http://127.0.0.1:9999/")
            .build()
            .unwrap();

        assert_eq!(env.rest_client().http_client().retry_policy(), policy);
        assert_eq!(
            env.graphql_client().http_client().retry_policy(),
            RetryPolicy::default()
        );
        assert_eq!(env.graphql_client().http_client().base_uri(), "http://127.0.0.1:9999");
    }

    #[test]
    fn test_clones_share_registries() {
        let env = ShopifyEnv::builder()
            .config(config())
            .session(session())
            .with_cache()
            .build()
            .unwrap();
        let clone = env.clone();

        assert!(std::ptr::eq(env.loader_store(), clone.loader_store()));
        assert!(std::ptr::eq(
            env.cache_store().unwrap(),
            clone.cache_store().unwrap()
        ));
    }
}

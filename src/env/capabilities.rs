//! Capability traits.
//!
//! Operations bound their environment by the traits below instead of a
//! concrete type, so a test can hand an operation a minimal environment
//! carrying only what it uses.

use std::sync::Arc;

use crate::auth::{SecretProvider, StaticSecretProvider};
use crate::cache::CacheStore;
use crate::clients::{Fetch, GraphqlClient, RestClient};
use crate::loader::LoaderStore;

/// The network capability.
pub trait HasFetch {
    /// Returns the network function.
    fn fetch(&self) -> &Arc<dyn Fetch>;
}

/// Authenticated Admin API transports.
pub trait HasHttpClient {
    /// Returns the REST transport.
    fn rest_client(&self) -> &RestClient;

    /// Returns the GraphQL transport.
    fn graphql_client(&self) -> &GraphqlClient;
}

/// The response cache registry.
///
/// `None` disables caching: cached operations run every time.
pub trait HasCacheStore {
    /// Returns the cache registry, if the environment carries one.
    fn cache_store(&self) -> Option<&CacheStore>;
}

/// The batch loader registry.
pub trait HasLoaderStore {
    /// Returns the loader registry.
    fn loader_store(&self) -> &LoaderStore;
}

/// Per-shop credential resolution for verifiers.
pub trait HasSecretProvider {
    /// Returns the secret provider.
    fn secret_provider(&self) -> &dyn SecretProvider;
}

impl HasSecretProvider for StaticSecretProvider {
    fn secret_provider(&self) -> &dyn SecretProvider {
        self
    }
}

impl<T: HasSecretProvider + ?Sized> HasSecretProvider for Arc<T> {
    fn secret_provider(&self) -> &dyn SecretProvider {
        (**self).secret_provider()
    }
}

//! The per-environment cache registry.

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::hash::Hash;
use std::sync::{Mutex, PoisonError};

use crate::cache::{MemoryCache, Namespace};

/// Owns one [`MemoryCache`] per namespace and value type.
///
/// # Example
///
/// ```rust
/// use shopify_runtime::cache::{Cache, CacheStore, Namespace};
///
/// let store = CacheStore::new();
/// store.get_cache::<u64, String>(Namespace::Theme).set(1, "Dawn".into());
///
/// let themes = store.get_cache::<u64, String>(Namespace::Theme);
/// assert_eq!(themes.get(&1).as_deref(), Some("Dawn"));
///
/// // Other value types live apart, even in the same namespace
/// assert!(store.get_cache::<u64, u32>(Namespace::Theme).is_empty());
/// ```
#[derive(Default)]
pub struct CacheStore {
    caches: Mutex<HashMap<(Namespace, TypeId), Box<dyn Any + Send + Sync>>>,
}

// Verify CacheStore is Send + Sync at compile time
const _: fn() = || {
    const fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<CacheStore>();
};

impl CacheStore {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the cache for `namespace`, creating it on first use.
    #[must_use]
    pub fn get_cache<K, V>(&self, namespace: Namespace) -> MemoryCache<K, V>
    where
        K: Eq + Hash + Send + 'static,
        V: Clone + Send + 'static,
    {
        let mut caches = self.caches.lock().unwrap_or_else(PoisonError::into_inner);
        let entry = caches
            .entry((namespace, TypeId::of::<MemoryCache<K, V>>()))
            .or_insert_with(|| Box::new(MemoryCache::<K, V>::new()));

        if let Some(cache) = entry.downcast_ref::<MemoryCache<K, V>>() {
            return cache.clone();
        }

        let cache = MemoryCache::new();
        *entry = Box::new(cache.clone());
        cache
    }
}

impl std::fmt::Debug for CacheStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let caches = self.caches.lock().unwrap_or_else(PoisonError::into_inner);
        let namespaces: Vec<_> = caches.keys().map(|(namespace, _)| *namespace).collect();
        f.debug_struct("CacheStore")
            .field("namespaces", &namespaces)
            .finish()
    }
}

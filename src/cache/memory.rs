//! Key-value caches.

use std::collections::HashMap;
use std::hash::Hash;
use std::marker::PhantomData;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// A synchronous key-value store.
pub trait Cache<K, V: Clone>: Send + Sync {
    /// Returns the value stored under `key`.
    fn get(&self, key: &K) -> Option<V>;

    /// Stores `value` under `key`, replacing any previous value.
    fn set(&self, key: K, value: V);

    /// Removes `key`, returning whether it was present.
    fn delete(&self, key: &K) -> bool;

    /// Returns the value under `key`, storing `create()` first if absent.
    ///
    /// The default is a `get` followed by a `set`; [`MemoryCache`] does both
    /// under one lock.
    fn get_or_insert_with<F>(&self, key: K, create: F) -> V
    where
        Self: Sized,
        F: FnOnce() -> V,
    {
        if let Some(value) = self.get(&key) {
            return value;
        }
        let value = create();
        self.set(key, value.clone());
        value
    }
}

/// An in-memory [`Cache`] that never evicts on its own.
///
/// Clones share storage.
pub struct MemoryCache<K, V> {
    entries: Arc<Mutex<HashMap<K, V>>>,
}

impl<K, V> Clone for MemoryCache<K, V> {
    fn clone(&self) -> Self {
        Self {
            entries: Arc::clone(&self.entries),
        }
    }
}

impl<K, V> Default for MemoryCache<K, V> {
    fn default() -> Self {
        Self {
            entries: Arc::new(Mutex::new(HashMap::new())),
        }
    }
}

impl<K, V> std::fmt::Debug for MemoryCache<K, V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryCache")
            .field("len", &self.lock().len())
            .finish()
    }
}

impl<K, V> MemoryCache<K, V> {
    /// Creates an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Returns `true` if the cache holds no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Removes every entry.
    pub fn clear(&self) {
        self.lock().clear();
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<K, V>> {
        // Entries stay consistent even if a holder panicked
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<K, V> Cache<K, V> for MemoryCache<K, V>
where
    K: Eq + Hash + Send,
    V: Clone + Send,
{
    fn get(&self, key: &K) -> Option<V> {
        self.lock().get(key).cloned()
    }

    fn set(&self, key: K, value: V) {
        self.lock().insert(key, value);
    }

    fn delete(&self, key: &K) -> bool {
        self.lock().remove(key).is_some()
    }

    fn get_or_insert_with<F>(&self, key: K, create: F) -> V
    where
        F: FnOnce() -> V,
    {
        self.lock().entry(key).or_insert_with(create).clone()
    }
}

/// A cache addressed by a richer key, see [`normalize`].
pub struct Normalized<C, F, K> {
    inner: C,
    key_fn: F,
    _key: PhantomData<fn() -> K>,
}

impl<C: Clone, F: Clone, K> Clone for Normalized<C, F, K> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
            key_fn: self.key_fn.clone(),
            _key: PhantomData,
        }
    }
}

/// Serves lookups keyed by `Q` from a cache keyed by `key_fn(&Q)`.
///
/// # Example
///
/// ```rust
/// use shopify_runtime::cache::{normalize, Cache, MemoryCache};
///
/// let by_string: MemoryCache<String, u32> = MemoryCache::new();
/// let by_pair = normalize(by_string.clone(), |(a, b): &(u32, &str)| format!("{a}_{b}"));
///
/// by_pair.set((1_u32, "layout/theme.liquid"), 7);
/// assert_eq!(by_string.get(&"1_layout/theme.liquid".to_string()), Some(7));
/// ```
pub const fn normalize<C, F, Q, K>(inner: C, key_fn: F) -> Normalized<C, F, K>
where
    F: Fn(&Q) -> K,
{
    Normalized {
        inner,
        key_fn,
        _key: PhantomData,
    }
}

impl<Q, K, V, C, F> Cache<Q, V> for Normalized<C, F, K>
where
    V: Clone,
    C: Cache<K, V>,
    F: Fn(&Q) -> K + Send + Sync,
{
    fn get(&self, key: &Q) -> Option<V> {
        self.inner.get(&(self.key_fn)(key))
    }

    fn set(&self, key: Q, value: V) {
        self.inner.set((self.key_fn)(&key), value);
    }

    fn delete(&self, key: &Q) -> bool {
        self.inner.delete(&(self.key_fn)(key))
    }

    fn get_or_insert_with<G>(&self, key: Q, create: G) -> V
    where
        G: FnOnce() -> V,
    {
        self.inner.get_or_insert_with((self.key_fn)(&key), create)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_cache_operations() {
        let cache: MemoryCache<&str, u32> = MemoryCache::new();
        assert!(cache.is_empty());

        cache.set("a", 1);
        assert_eq!(cache.get(&"a"), Some(1));
        assert_eq!(cache.get_or_insert_with("a", || 2), 1);
        assert_eq!(cache.get_or_insert_with("b", || 2), 2);
        assert_eq!(cache.len(), 2);

        assert!(cache.delete(&"a"));
        assert!(!cache.delete(&"a"));
        assert_eq!(cache.get(&"a"), None);
    }

    #[test]
    fn test_clones_share_entries() {
        let cache: MemoryCache<u32, u32> = MemoryCache::new();
        cache.clone().set(1, 1);
        assert_eq!(cache.get(&1), Some(1));

        cache.clear();
        assert!(cache.is_empty());
    }

    #[test]
    fn test_normalized_delete_reaches_inner() {
        let inner: MemoryCache<String, bool> = MemoryCache::new();
        let cache = normalize(inner.clone(), |key: &(u64, String)| format!("{}_{}", key.0, key.1));

        cache.set((1_u64, "x".to_string()), true);
        assert_eq!(inner.len(), 1);
        assert!(cache.delete(&(1_u64, "x".to_string())));
        assert!(inner.is_empty());
    }
}

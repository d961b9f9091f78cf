//! The per-environment loader registry.

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::cache::Namespace;
use crate::loader::BatchLoader;

type Loaders = HashMap<(Namespace, TypeId), Box<dyn Any + Send + Sync>>;

/// Owns one [`BatchLoader`] per namespace and key/value types.
///
/// Loaders are created lazily the first time an operation asks for them,
/// and live as long as the environment.
#[derive(Default)]
pub struct LoaderStore {
    loaders: Mutex<Loaders>,
}

// Verify LoaderStore is Send + Sync at compile time
const _: fn() = || {
    const fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<LoaderStore>();
};

impl LoaderStore {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the loader for `namespace`, building it with `create` on
    /// first use.
    ///
    /// `create` runs without the registry locked, so it may look up other
    /// loaders. If two callers race, the first one stored wins.
    pub fn get_or_create<K, V, C, F>(&self, namespace: Namespace, create: F) -> BatchLoader<K, V, C>
    where
        K: Send + Sync + 'static,
        V: Send + Sync + 'static,
        C: Send + Sync + 'static,
        F: FnOnce() -> BatchLoader<K, V, C>,
    {
        let key = (namespace, TypeId::of::<BatchLoader<K, V, C>>());
        if let Some(loader) = self.lock().get(&key).and_then(|l| l.downcast_ref()).cloned() {
            return loader;
        }

        let created = create();
        tracing::debug!(%namespace, "Created batch loader");

        let mut loaders = self.lock();
        let stored = loaders
            .entry(key)
            .or_insert_with(|| Box::new(created.clone()));
        stored
            .downcast_ref::<BatchLoader<K, V, C>>()
            .cloned()
            .unwrap_or(created)
    }

    /// Returns whether a loader exists for `namespace` and these types.
    #[must_use]
    pub fn contains<K: 'static, V: 'static, C: 'static>(&self, namespace: Namespace) -> bool {
        self.lock()
            .contains_key(&(namespace, TypeId::of::<BatchLoader<K, V, C>>()))
    }

    fn lock(&self) -> MutexGuard<'_, Loaders> {
        self.loaders.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl std::fmt::Debug for LoaderStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let namespaces: Vec<_> = self.lock().keys().map(|(namespace, _)| *namespace).collect();
        f.debug_struct("LoaderStore")
            .field("namespaces", &namespaces)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::Arc;

    use super::*;
    use crate::error::Error;

    fn loader(offset: u64) -> BatchLoader<u64, u64> {
        BatchLoader::new(move |ids: Vec<u64>| async move {
            ids.into_iter()
                .map(|id| (id, Ok(id + offset)))
                .collect::<HashMap<u64, Result<u64, Error>>>()
        })
    }

    #[tokio::test]
    async fn test_loader_is_created_once() {
        let store = LoaderStore::new();
        assert!(!store.contains::<u64, u64, u64>(Namespace::Theme));

        let first = store.get_or_create(Namespace::Theme, || loader(100));
        let second = store.get_or_create(Namespace::Theme, || loader(200));

        assert!(store.contains::<u64, u64, u64>(Namespace::Theme));
        assert_eq!(first.load(1).await.unwrap(), 101);
        assert_eq!(second.load(2).await.unwrap(), 102);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_loader_is_shared_across_tasks() {
        let store = Arc::new(LoaderStore::new());
        let worker = Arc::clone(&store);

        let value = tokio::spawn(async move {
            worker
                .get_or_create(Namespace::Theme, || loader(10))
                .load(1)
                .await
        })
        .await
        .unwrap();

        assert_eq!(value.unwrap(), 11);
        assert!(store.contains::<u64, u64, u64>(Namespace::Theme));
    }

    #[test]
    fn test_create_may_reenter_store() {
        let store = LoaderStore::new();

        let outer = store.get_or_create(Namespace::ThemeList, || {
            let _inner = store.get_or_create(Namespace::Theme, || loader(0));
            loader(1)
        });

        assert!(store.contains::<u64, u64, u64>(Namespace::Theme));
        assert!(outer.prime(&1, Ok(1)));
    }
}

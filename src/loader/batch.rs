//! Request batching and deduplication.

use std::collections::{HashMap, HashSet};
use std::fmt::Debug;
use std::future::Future;
use std::hash::Hash;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use futures::future::{self, BoxFuture, Shared};
use futures::FutureExt;

use crate::error::Error;
use crate::loader::window::NextTurn;

/// The shared outcome of loading one key.
///
/// Every caller loading the same key gets a clone of the same future.
pub type LoadOutcome<V> = Shared<BoxFuture<'static, Result<V, Error>>>;

type BatchResults<C, V> = Arc<HashMap<C, Result<V, Error>>>;
type BatchFn<K, C, V> =
    Arc<dyn Fn(Vec<K>) -> BoxFuture<'static, HashMap<C, Result<V, Error>>> + Send + Sync>;
type KeyFn<K, C> = Arc<dyn Fn(&K) -> C + Send + Sync>;

struct PendingBatch<K, C, V> {
    id: u64,
    keys: Vec<K>,
    identities: HashSet<C>,
    results: Shared<BoxFuture<'static, BatchResults<C, V>>>,
}

struct State<K, C, V> {
    outcomes: HashMap<C, LoadOutcome<V>>,
    pending: Option<PendingBatch<K, C, V>>,
    next_id: u64,
}

/// Coalesces loads issued in the same scheduler turn into one batch call.
///
/// Keys loaded before the task next yields to the scheduler are collected
/// into a single call of the batch function, which returns one outcome per
/// cache key. Inside a Tokio runtime the batch is spawned as soon as its
/// first key is loaded, so the window closes at that yield whether or not
/// anyone awaits; elsewhere it starts on the first await.
///
/// Outcomes are cached until [`clear`](Self::clear)ed, so a key is fetched
/// at most once per loader however many callers ask for it.
///
/// Cloning is cheap; clones share pending keys and cached outcomes.
///
/// # Example
///
/// ```rust
/// use std::collections::{HashMap, HashSet};
/// use std::sync::atomic::{AtomicUsize, Ordering};
/// use std::sync::Arc;
///
/// use futures::future::join_all;
/// use shopify_runtime::loader::BatchLoader;
/// use shopify_runtime::Error;
///
/// # tokio_test::block_on(async {
/// let calls = Arc::new(AtomicUsize::new(0));
/// let counter = Arc::clone(&calls);
/// let loader = BatchLoader::new(move |ids: Vec<u64>| {
///     counter.fetch_add(1, Ordering::SeqCst);
///     async move {
///         ids.into_iter()
///             .map(|id| (id, Ok(id * 10)))
///             .collect::<HashMap<u64, Result<u64, Error>>>()
///     }
/// });
///
/// let values = join_all([loader.load(1), loader.load(2), loader.load(1)]).await;
///
/// assert_eq!(values.into_iter().map(Result::unwrap).collect::<Vec<_>>(), vec![10, 20, 10]);
/// assert_eq!(calls.load(Ordering::SeqCst), 1);
/// # });
/// ```
pub struct BatchLoader<K, V, C = K> {
    batch_fn: BatchFn<K, C, V>,
    key_fn: KeyFn<K, C>,
    state: Arc<Mutex<State<K, C, V>>>,
}

impl<K, V, C> Clone for BatchLoader<K, V, C> {
    fn clone(&self) -> Self {
        Self {
            batch_fn: Arc::clone(&self.batch_fn),
            key_fn: Arc::clone(&self.key_fn),
            state: Arc::clone(&self.state),
        }
    }
}

impl<K, V, C> std::fmt::Debug for BatchLoader<K, V, C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = lock(&self.state);
        f.debug_struct("BatchLoader")
            .field("cached", &state.outcomes.len())
            .field("pending", &state.pending.as_ref().map_or(0, |batch| batch.keys.len()))
            .finish_non_exhaustive()
    }
}

impl<K, V> BatchLoader<K, V, K>
where
    K: Clone + Eq + Hash + Debug + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    /// Creates a loader whose keys are their own cache keys.
    pub fn new<F, Fut>(batch_fn: F) -> Self
    where
        F: Fn(Vec<K>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HashMap<K, Result<V, Error>>> + Send + 'static,
    {
        Self::with_cache_key(batch_fn, K::clone)
    }
}

impl<K, V, C> BatchLoader<K, V, C>
where
    K: Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
    C: Clone + Eq + Hash + Debug + Send + Sync + 'static,
{
    /// Creates a loader that identifies keys by `key_fn(&key)`.
    ///
    /// Keys with equal cache keys share one outcome and are sent to the
    /// batch function once per batch.
    pub fn with_cache_key<F, Fut, KF>(batch_fn: F, key_fn: KF) -> Self
    where
        F: Fn(Vec<K>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HashMap<C, Result<V, Error>>> + Send + 'static,
        KF: Fn(&K) -> C + Send + Sync + 'static,
    {
        Self {
            batch_fn: Arc::new(move |keys: Vec<K>| batch_fn(keys).boxed()),
            key_fn: Arc::new(key_fn),
            state: Arc::new(Mutex::new(State {
                outcomes: HashMap::new(),
                pending: None,
                next_id: 0,
            })),
        }
    }

    /// Returns the outcome for `key`.
    ///
    /// A cached or pending outcome is returned as is. Otherwise `key` joins
    /// the current batch, which is dispatched when the scheduler turn ends.
    /// A key cleared and loaded again in the same window is sent once.
    #[must_use]
    pub fn load(&self, key: K) -> LoadOutcome<V> {
        let cache_key = (self.key_fn)(&key);

        let mut guard = lock(&self.state);
        let state = &mut *guard;
        if let Some(outcome) = state.outcomes.get(&cache_key) {
            return outcome.clone();
        }

        let results = if let Some(batch) = state.pending.as_mut() {
            if batch.identities.insert(cache_key.clone()) {
                batch.keys.push(key);
            }
            batch.results.clone()
        } else {
            let id = state.next_id;
            state.next_id += 1;
            let results = self.dispatch(id);
            state.pending = Some(PendingBatch {
                id,
                keys: vec![key],
                identities: HashSet::from([cache_key.clone()]),
                results: results.clone(),
            });
            results
        };

        let outcome_key = cache_key.clone();
        let outcome = results
            .map(move |results| {
                results.get(&outcome_key).cloned().unwrap_or_else(|| {
                    Err(Error::MissingOutcome {
                        key: format!("{outcome_key:?}"),
                    })
                })
            })
            .boxed()
            .shared();
        state.outcomes.insert(cache_key, outcome.clone());
        outcome
    }

    /// Loads several keys into the current batch.
    #[must_use]
    pub fn load_many(&self, keys: impl IntoIterator<Item = K>) -> Vec<LoadOutcome<V>> {
        keys.into_iter().map(|key| self.load(key)).collect()
    }

    /// Seeds the outcome of `key` without a batch call.
    ///
    /// Does nothing if `key` already has an outcome; returns whether the
    /// value was stored.
    pub fn prime(&self, key: &K, value: Result<V, Error>) -> bool {
        let cache_key = (self.key_fn)(key);
        let mut state = lock(&self.state);
        if state.outcomes.contains_key(&cache_key) {
            return false;
        }
        state
            .outcomes
            .insert(cache_key, future::ready(value).boxed().shared());
        true
    }

    /// Evicts the outcome of `key`; the next load fetches it again.
    ///
    /// An in-flight batch still completes for the callers already holding
    /// its outcome.
    pub fn clear(&self, key: &K) -> bool {
        let cache_key = (self.key_fn)(key);
        lock(&self.state).outcomes.remove(&cache_key).is_some()
    }

    /// Evicts every outcome.
    pub fn clear_all(&self) {
        lock(&self.state).outcomes.clear();
    }

    fn dispatch(&self, id: u64) -> Shared<BoxFuture<'static, BatchResults<C, V>>> {
        let state = Arc::downgrade(&self.state);
        let batch_fn = Arc::clone(&self.batch_fn);

        let batch = async move {
            NextTurn::default().await;

            let keys = take_pending(&state, id);
            if keys.is_empty() {
                return Arc::new(HashMap::new());
            }

            tracing::debug!(keys = keys.len(), "Dispatching batch load");
            Arc::new(batch_fn(keys).await)
        };

        match tokio::runtime::Handle::try_current() {
            Ok(runtime) => runtime
                .spawn(batch)
                .map(|joined| {
                    joined.unwrap_or_else(|error| {
                        tracing::warn!(%error, "Batch load task failed");
                        Arc::new(HashMap::new())
                    })
                })
                .boxed()
                .shared(),
            Err(_) => batch.boxed().shared(),
        }
    }
}

fn take_pending<K, C, V>(state: &Weak<Mutex<State<K, C, V>>>, id: u64) -> Vec<K> {
    let Some(state) = state.upgrade() else {
        return Vec::new();
    };
    let mut state = lock(&state);
    match state.pending.take() {
        Some(batch) if batch.id == id => batch.keys,
        other => {
            state.pending = other;
            Vec::new()
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

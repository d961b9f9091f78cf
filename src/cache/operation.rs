//! Caching and invalidating operation wrappers.

use std::sync::Arc;

use async_trait::async_trait;
use futures::future::{BoxFuture, Shared};
use futures::FutureExt;

use crate::cache::{Cache, CacheStore};
use crate::env::{HasCacheStore, Operation};

/// The cached value of an operation: its outcome, possibly still pending.
///
/// Every caller for the same input awaits the same future, so concurrent
/// first calls share one execution.
pub type CachedOutcome<O> = Shared<BoxFuture<'static, O>>;

/// An operation whose outcomes are cached per input, see [`with_cache`].
pub struct WithCache<Op, G> {
    op: Arc<Op>,
    get_cache: G,
}

impl<Op, G: Clone> Clone for WithCache<Op, G> {
    fn clone(&self) -> Self {
        Self {
            op: Arc::clone(&self.op),
            get_cache: self.get_cache.clone(),
        }
    }
}

/// Caches the outcome of `op` by input.
///
/// `get_cache` picks the cache out of the environment's [`CacheStore`].
/// The first call for an input runs `op` and stores its pending outcome;
/// later and concurrent calls await the stored outcome. Failed outcomes are
/// cached too, until deleted. Without a cache store, `op` runs every time.
///
/// # Example
///
/// ```rust
/// use std::sync::atomic::{AtomicUsize, Ordering};
/// use std::sync::Arc;
///
/// use async_trait::async_trait;
/// use shopify_runtime::cache::{with_cache, CacheStore, CachedOutcome, MemoryCache, Namespace};
/// use shopify_runtime::env::{HasCacheStore, Operation};
///
/// #[derive(Clone)]
/// struct Env {
///     cache: Arc<CacheStore>,
///     calls: Arc<AtomicUsize>,
/// }
///
/// impl HasCacheStore for Env {
///     fn cache_store(&self) -> Option<&CacheStore> {
///         Some(&self.cache)
///     }
/// }
///
/// struct Square;
///
/// #[async_trait]
/// impl Operation<Env> for Square {
///     type Input = u64;
///     type Output = u64;
///
///     async fn call(&self, env: &Env, n: u64) -> u64 {
///         env.calls.fetch_add(1, Ordering::SeqCst);
///         n * n
///     }
/// }
///
/// # tokio_test::block_on(async {
/// let env = Env { cache: Arc::new(CacheStore::new()), calls: Arc::default() };
/// fn squares(store: &CacheStore) -> MemoryCache<u64, CachedOutcome<u64>> {
///     store.get_cache(Namespace::Custom("square"))
/// }
///
/// let square = with_cache(squares, Square);
///
/// assert_eq!(square.call(&env, 3).await, 9);
/// assert_eq!(square.call(&env, 3).await, 9);
/// assert_eq!(env.calls.load(Ordering::SeqCst), 1);
/// # });
/// ```
pub fn with_cache<Op, G>(get_cache: G, op: Op) -> WithCache<Op, G> {
    WithCache {
        op: Arc::new(op),
        get_cache,
    }
}

#[async_trait]
impl<E, Op, G, C> Operation<E> for WithCache<Op, G>
where
    E: HasCacheStore + Clone + Send + Sync + 'static,
    Op: Operation<E> + 'static,
    Op::Input: Clone + 'static,
    Op::Output: Clone + Sync + 'static,
    G: Fn(&CacheStore) -> C + Send + Sync,
    C: Cache<Op::Input, CachedOutcome<Op::Output>>,
{
    type Input = Op::Input;
    type Output = Op::Output;

    async fn call(&self, env: &E, input: Op::Input) -> Op::Output {
        let Some(store) = env.cache_store() else {
            return self.op.call(env, input).await;
        };

        let mut missed = false;
        let outcome = (self.get_cache)(store).get_or_insert_with(input.clone(), || {
            missed = true;
            let op = Arc::clone(&self.op);
            let env = env.clone();
            async move { op.call(&env, input).await }.boxed().shared()
        });
        tracing::debug!(hit = !missed, "Cache lookup");

        outcome.await
    }
}

/// An operation that invalidates caches on success, see
/// [`with_cache_effect`].
#[derive(Clone, Debug)]
pub struct WithCacheEffect<Op, F> {
    op: Op,
    effect: F,
}

/// Runs `effect` after each successful call of `op`.
///
/// The effect receives the environment's [`CacheStore`], the input and the
/// success value, and typically deletes the entries the call made stale.
/// It runs before the call returns, and only when the environment has a
/// cache store. Failed calls leave caches untouched.
pub const fn with_cache_effect<Op, F>(op: Op, effect: F) -> WithCacheEffect<Op, F> {
    WithCacheEffect { op, effect }
}

#[async_trait]
impl<E, Op, F, T, Err> Operation<E> for WithCacheEffect<Op, F>
where
    E: HasCacheStore + ?Sized + Sync,
    Op: Operation<E, Output = Result<T, Err>>,
    Op::Input: Clone,
    F: Fn(&CacheStore, &Op::Input, &T) + Send + Sync,
    T: Send,
    Err: Send,
{
    type Input = Op::Input;
    type Output = Result<T, Err>;

    async fn call(&self, env: &E, input: Op::Input) -> Result<T, Err> {
        let output = self.op.call(env, input.clone()).await;
        if let (Ok(value), Some(store)) = (&output, env.cache_store()) {
            (self.effect)(store, &input, value);
        }
        output
    }
}

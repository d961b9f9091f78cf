//! Operations as functions of an environment and an input.

use std::marker::PhantomData;

use async_trait::async_trait;
use futures::future::BoxFuture;

/// An asynchronous function of an environment `E` and an input.
///
/// `E` states exactly which capabilities the operation needs, usually as
/// a set of `Has*` trait bounds on a generic implementation. Operations are
/// stateless values; cloning or defaulting one is cheap.
///
/// # Example
///
/// ```rust
/// use async_trait::async_trait;
/// use shopify_runtime::env::Operation;
///
/// struct Greeting {
///     name: String,
/// }
///
/// struct Greet;
///
/// #[async_trait]
/// impl Operation<Greeting> for Greet {
///     type Input = &'static str;
///     type Output = String;
///
///     async fn call(&self, env: &Greeting, salutation: &'static str) -> String {
///         format!("{salutation}, {}!", env.name)
///     }
/// }
///
/// # tokio_test::block_on(async {
/// let env = Greeting { name: "Dawn".to_string() };
/// assert_eq!(Greet.call(&env, "Hello").await, "Hello, Dawn!");
/// # });
/// ```
#[async_trait]
pub trait Operation<E: ?Sized + Sync>: Send + Sync {
    /// The input of one call.
    type Input: Send;
    /// The outcome of one call.
    type Output: Send;

    /// Runs the operation against `env`.
    async fn call(&self, env: &E, input: Self::Input) -> Self::Output;
}

/// An operation backed by a closure, see [`op_fn`].
pub struct FnOperation<F, E: ?Sized, I, O> {
    f: F,
    _marker: PhantomData<fn(&E, I) -> O>,
}

impl<F: Clone, E: ?Sized, I, O> Clone for FnOperation<F, E, I, O> {
    fn clone(&self) -> Self {
        Self {
            f: self.f.clone(),
            _marker: PhantomData,
        }
    }
}

/// Lifts a closure returning a boxed future into an [`Operation`].
///
/// # Example
///
/// ```rust
/// use futures::FutureExt;
/// use shopify_runtime::env::{op_fn, Operation};
///
/// let double = op_fn(|factor: &u32, x: u32| async move { x * factor }.boxed());
///
/// # tokio_test::block_on(async {
/// assert_eq!(double.call(&2, 21).await, 42);
/// # });
/// ```
pub const fn op_fn<F, E, I, O>(f: F) -> FnOperation<F, E, I, O>
where
    E: ?Sized,
    F: for<'a> Fn(&'a E, I) -> BoxFuture<'a, O>,
{
    FnOperation {
        f,
        _marker: PhantomData,
    }
}

#[async_trait]
impl<F, E, I, O> Operation<E> for FnOperation<F, E, I, O>
where
    E: ?Sized + Sync,
    I: Send + 'static,
    O: Send + 'static,
    F: for<'a> Fn(&'a E, I) -> BoxFuture<'a, O> + Send + Sync,
{
    type Input = I;
    type Output = O;

    async fn call(&self, env: &E, input: I) -> O {
        (self.f)(env, input).await
    }
}

/// An operation whose environment is derived from another one, see
/// [`with_env`].
pub struct MapEnv<Op, F, R2> {
    op: Op,
    reduce: F,
    _env: PhantomData<fn() -> R2>,
}

impl<Op: Clone, F: Clone, R2> Clone for MapEnv<Op, F, R2> {
    fn clone(&self) -> Self {
        Self {
            op: self.op.clone(),
            reduce: self.reduce.clone(),
            _env: PhantomData,
        }
    }
}

/// Adapts an operation requiring environment `R2` into one requiring `R1`,
/// given a pure mapping `R1 -> R2`.
///
/// # Example
///
/// ```rust
/// use futures::FutureExt;
/// use shopify_runtime::env::{op_fn, with_env, Operation};
///
/// struct AppEnv {
///     prefix: String,
/// }
///
/// let label = op_fn(|prefix: &String, id: u64| async move { format!("{prefix}{id}") }.boxed());
/// let label = with_env(label, |env: &AppEnv| env.prefix.clone());
///
/// # tokio_test::block_on(async {
/// let env = AppEnv { prefix: "theme-".to_string() };
/// assert_eq!(label.call(&env, 7).await, "theme-7");
/// # });
/// ```
pub const fn with_env<Op, F, R1, R2>(op: Op, reduce: F) -> MapEnv<Op, F, R2>
where
    R1: ?Sized,
    F: Fn(&R1) -> R2,
{
    MapEnv {
        op,
        reduce,
        _env: PhantomData,
    }
}

#[async_trait]
impl<Op, F, R1, R2> Operation<R1> for MapEnv<Op, F, R2>
where
    R1: ?Sized + Sync,
    R2: Send + Sync,
    Op: Operation<R2>,
    F: Fn(&R1) -> R2 + Send + Sync,
{
    type Input = Op::Input;
    type Output = Op::Output;

    async fn call(&self, env: &R1, input: Op::Input) -> Op::Output {
        let reduced = (self.reduce)(env);
        self.op.call(&reduced, input).await
    }
}

/// An operation whose output is transformed, see [`map_output`].
#[derive(Clone, Debug)]
pub struct MapOutput<Op, F> {
    op: Op,
    f: F,
}

/// Transforms the output of an operation.
pub const fn map_output<Op, F>(op: Op, f: F) -> MapOutput<Op, F> {
    MapOutput { op, f }
}

#[async_trait]
impl<E, Op, F, O> Operation<E> for MapOutput<Op, F>
where
    E: ?Sized + Sync,
    Op: Operation<E>,
    F: Fn(Op::Output) -> O + Send + Sync,
    O: Send,
{
    type Input = Op::Input;
    type Output = O;

    async fn call(&self, env: &E, input: Op::Input) -> O {
        (self.f)(self.op.call(env, input).await)
    }
}

/// An operation closed over its environment.
///
/// The residual call takes only the input; the environment requirement
/// was discharged when the value was built. See [`apply_env`] and
/// [`compose_capabilities!`](crate::compose_capabilities).
pub struct Bound<'e, Op, E: ?Sized> {
    op: Op,
    env: &'e E,
}

impl<Op: Clone, E: ?Sized> Clone for Bound<'_, Op, E> {
    fn clone(&self) -> Self {
        Self {
            op: self.op.clone(),
            env: self.env,
        }
    }
}

impl<'e, Op, E> Bound<'e, Op, E>
where
    E: ?Sized + Sync,
    Op: Operation<E>,
{
    /// Binds `op` to `env`.
    pub const fn new(op: Op, env: &'e E) -> Self {
        Self { op, env }
    }

    /// Runs the bound operation.
    pub async fn call(&self, input: Op::Input) -> Op::Output {
        self.op.call(self.env, input).await
    }

    /// Returns the environment the operation is bound to.
    pub const fn env(&self) -> &'e E {
        self.env
    }
}

/// Closes `op` over `env`.
pub const fn apply_env<Op, E>(op: Op, env: &E) -> Bound<'_, Op, E>
where
    E: ?Sized + Sync,
    Op: Operation<E>,
{
    Bound::new(op, env)
}

/// Declares a record of operations closed over one environment.
///
/// Each field names an operation type implementing [`Default`]. The
/// generated `Name<'e, E>` has a `new(env: &'e E)` constructor that only
/// exists when every listed operation implements [`Operation<E>`], so an
/// environment missing a capability is rejected at compile time. Fields are
/// [`Bound`] operations called with just their input.
///
/// # Example
///
/// ```rust
/// use async_trait::async_trait;
/// use shopify_runtime::compose_capabilities;
/// use shopify_runtime::env::Operation;
///
/// trait HasCounter {
///     fn counter(&self) -> u32;
/// }
///
/// #[derive(Default)]
/// struct Add;
///
/// #[async_trait]
/// impl<E: HasCounter + Sync> Operation<E> for Add {
///     type Input = u32;
///     type Output = u32;
///
///     async fn call(&self, env: &E, input: u32) -> u32 {
///         env.counter() + input
///     }
/// }
///
/// compose_capabilities! {
///     struct CounterOps {
///         add: Add,
///     }
/// }
///
/// struct Env;
///
/// impl HasCounter for Env {
///     fn counter(&self) -> u32 {
///         40
///     }
/// }
///
/// # tokio_test::block_on(async {
/// let env = Env;
/// let ops = CounterOps::new(&env);
/// assert_eq!(ops.add.call(2).await, 42);
/// # });
/// ```
#[macro_export]
macro_rules! compose_capabilities {
    (
        $(#[$meta:meta])*
        $vis:vis struct $name:ident {
            $(
                $(#[$field_meta:meta])*
                $field:ident : $op:ty
            ),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        $vis struct $name<'e, E: ?Sized> {
            $(
                $(#[$field_meta])*
                pub $field: $crate::env::Bound<'e, $op, E>,
            )+
        }

        impl<'e, E> $name<'e, E>
        where
            E: ?Sized + Sync,
            $( $op: $crate::env::Operation<E> + ::core::default::Default, )+
        {
            /// Binds every operation to `env`.
            #[allow(dead_code)]
            pub fn new(env: &'e E) -> Self {
                Self {
                    $(
                        $field: $crate::env::Bound::new(
                            <$op as ::core::default::Default>::default(),
                            env,
                        ),
                    )+
                }
            }
        }
    };
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use futures::FutureExt;

    use super::*;

    struct CountingEnv {
        calls: AtomicUsize,
        base: u32,
    }

    #[derive(Clone, Copy, Default)]
    struct AddBase;

    #[async_trait]
    impl Operation<u32> for AddBase {
        type Input = u32;
        type Output = u32;

        async fn call(&self, base: &u32, input: u32) -> u32 {
            base + input
        }
    }

    #[derive(Clone, Copy, Default)]
    struct Count;

    #[async_trait]
    impl Operation<CountingEnv> for Count {
        type Input = ();
        type Output = usize;

        async fn call(&self, env: &CountingEnv, (): ()) -> usize {
            env.calls.fetch_add(1, Ordering::SeqCst) + 1
        }
    }

    compose_capabilities! {
        struct Both {
            count: Count,
            add: MapEnv<AddBase, fn(&CountingEnv) -> u32, u32>,
        }
    }

    impl Default for MapEnv<AddBase, fn(&CountingEnv) -> u32, u32> {
        fn default() -> Self {
            with_env(AddBase, |env: &CountingEnv| env.base)
        }
    }

    fn env() -> CountingEnv {
        CountingEnv {
            calls: AtomicUsize::new(0),
            base: 40,
        }
    }

    #[tokio::test]
    async fn test_with_env_reduces_environment() {
        let op = with_env(AddBase, |env: &CountingEnv| env.base);
        assert_eq!(op.call(&env(), 2).await, 42);
    }

    #[tokio::test]
    async fn test_map_output() {
        let op = map_output(AddBase, |sum: u32| sum.to_string());
        assert_eq!(op.call(&1, 1).await, "2");
    }

    #[tokio::test]
    async fn test_apply_env_binds_environment() {
        let env = env();
        let bound = apply_env(Count, &env);

        assert_eq!(bound.call(()).await, 1);
        assert_eq!(bound.call(()).await, 2);
        assert_eq!(bound.env().calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_composed_operations_share_environment() {
        let env = env();
        let ops = Both::new(&env);

        ops.count.call(()).await;
        assert_eq!(ops.add.call(2).await, 42);
        assert_eq!(ops.count.call(()).await, 2);
    }

    #[tokio::test]
    async fn test_op_fn_borrows_environment() {
        let op = op_fn(|env: &CountingEnv, n: usize| {
            async move { env.calls.fetch_add(n, Ordering::SeqCst) + n }.boxed()
        });

        let env = env();
        assert_eq!(op.call(&env, 3).await, 3);
        assert_eq!(op.call(&env, 3).await, 6);
    }
}

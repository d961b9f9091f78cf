//! Capability environments and operation composition.
//!
//! # Overview
//!
//! An operation is an async function of an environment and an input
//! ([`Operation`]). The environment is an explicit record of capabilities
//! (network, transports, cache and loader registries, secrets) passed to
//! every call; nothing is looked up from global state.
//!
//! - [`with_env`] adapts an operation to a different environment shape
//! - [`apply_env`] closes an operation over an environment
//! - [`compose_capabilities!`](crate::compose_capabilities) binds a record
//!   of operations to one environment, checked at compile time
//! - [`ShopifyEnv`] is the concrete environment for one shop session
//!
//! Operations state what they need through the `Has*` traits, so tests can
//! pass small hand-written environments instead of a full [`ShopifyEnv`].

mod capabilities;
mod operation;
mod shopify_env;

pub use capabilities::{HasCacheStore, HasFetch, HasHttpClient, HasLoaderStore, HasSecretProvider};
pub use operation::{
    apply_env, map_output, op_fn, with_env, Bound, FnOperation, MapEnv, MapOutput, Operation,
};
pub use shopify_env::{ShopifyEnv, ShopifyEnvBuilder};

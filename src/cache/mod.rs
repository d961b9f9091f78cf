//! Namespaced response caches.
//!
//! # Overview
//!
//! - [`CacheStore`]: the registry an environment owns, one [`MemoryCache`]
//!   per [`Namespace`] and value type
//! - [`Cache`]: `get`/`set`/`delete` plus get-or-create
//! - [`normalize`]: addresses a cache by a structured key
//! - [`with_cache`]: caches an operation's pending outcome by input
//! - [`with_cache_effect`]: deletes stale entries after a successful write
//!
//! Caches never expire on their own. An operation that makes entries stale
//! deletes them itself, before it returns.

mod memory;
mod namespace;
mod operation;
mod store;

pub use memory::{normalize, Cache, MemoryCache, Normalized};
pub use namespace::Namespace;
pub use operation::{with_cache, with_cache_effect, CachedOutcome, WithCache, WithCacheEffect};
pub use store::CacheStore;

//! Batched, deduplicated loading.
//!
//! A [`BatchLoader`] turns many concurrent single-key loads into one call
//! of a batch function, and keeps each key's outcome until it is cleared.
//! Loaders live in the environment's [`LoaderStore`], one per
//! [`Namespace`](crate::cache::Namespace).
//!
//! Mutations clear the keys they change; nothing expires on its own.

mod batch;
mod store;
mod window;

pub use batch::{BatchLoader, LoadOutcome};
pub use store::LoaderStore;

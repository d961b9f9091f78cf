//! Trust verification for inbound requests and OAuth plumbing.
//!
//! # Overview
//!
//! - [`hmac`]: signed OAuth callback and app proxy query strings
//! - [`jwt`]: embedded-app session tokens (`Authorization: Bearer`)
//! - [`oauth`]: authorization URL, state and code exchange
//! - [`SecretProvider`]: per-shop API credential resolution
//! - [`Session`]: a shop and its access token
//!
//! Webhook bodies are verified by [`crate::webhooks`].
//!
//! Every verifier validates the claimed shop against the shop domain shape
//! before resolving its secret, and compares signatures in constant time.
//! A verified shop is what an app uses to build its
//! [`ShopifyEnv`](crate::env::ShopifyEnv).

pub mod hmac;
pub mod jwt;
pub mod oauth;
mod secrets;
pub mod session;

pub use secrets::{SecretError, SecretProvider, StaticSecretProvider};
pub use session::Session;

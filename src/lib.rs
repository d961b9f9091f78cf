//! # Shopify Runtime
//!
//! A capability-injected request runtime for Shopify apps: batched and
//! cached Admin API operations, a retrying REST and GraphQL transport, and
//! trust verification for everything the platform sends an app.
//!
//! ## Overview
//!
//! - [`env`]: operations as async functions of an explicit environment,
//!   with [`env::with_env`] and [`compose_capabilities!`] to combine them
//! - [`loader`]: per-environment batch loaders that coalesce concurrent
//!   single-key reads into one batch
//! - [`cache`]: namespaced response caches and the [`cache::with_cache`]
//!   and [`cache::with_cache_effect`] wrappers
//! - [`clients`]: [`clients::Fetch`], retries, REST and GraphQL clients
//! - [`auth`]: HMAC query verification, session tokens, OAuth
//! - [`webhooks`]: webhook body verification
//! - [`api`]: themes and theme assets built on all of the above
//! - [`Gid`]: validated global IDs
//!
//! ## Quick Start
//!
//! ```rust
//! use shopify_runtime::{ApiKey, ApiSecretKey, Session, ShopDomain, ShopifyConfig, ShopifyEnv};
//!
//! let config = ShopifyConfig::builder()
//!     .api_key(ApiKey::new("your-api-key").unwrap())
//!     .api_secret_key(ApiSecretKey::new("your-api-secret").unwrap())
//!     .build()
//!     .unwrap();
//!
//! let session = Session::new(ShopDomain::new("my-store.myshopify.com").unwrap(), "shpat_token");
//! let env = ShopifyEnv::builder()
//!     .config(config)
//!     .session(session)
//!     .with_cache()
//!     .build()
//!     .unwrap();
//! # let _ = env;
//! ```
//!
//! ## Calling Operations
//!
//! ```rust,ignore
//! use shopify_runtime::api::{asset, theme};
//!
//! let themes = theme::list(&env).await?;
//! let main = themes.iter().find(|t| t.role == theme::ThemeRole::Main).unwrap();
//!
//! let key = asset::AssetKey::new(main.admin_graphql_api_id.clone(), "layout/theme.liquid");
//! asset::modify(&env, asset::ModifyInput::new(key, |liquid| liquid.replace("old", "new"))).await?;
//! ```
//!
//! Concurrent `theme::get` calls in the same scheduler turn share one
//! batch; `asset::get` results stay cached in the environment until a
//! write to the same asset invalidates them.
//!
//! ## Verifying Inbound Requests
//!
//! ```rust,ignore
//! use shopify_runtime::auth::{hmac, jwt};
//!
//! // OAuth callbacks and embedded app loads
//! let shop = hmac::verify_hmac(&env, &hmac::QueryParams::parse(query)).await?;
//!
//! // Session tokens from App Bridge
//! let token = jwt::verify_auth_header(&env, Some(authorization)).await?;
//! ```
//!
//! ## Design Principles
//!
//! - **No global state**: every capability comes from the environment
//! - **Fail-fast validation**: newtypes and GIDs validate on construction
//! - **Thread-safe**: all environments and registries are `Send + Sync`
//! - **Async-first**: built for the Tokio runtime

pub mod api;
pub mod auth;
pub mod cache;
pub mod clients;
pub mod config;
pub mod env;
pub mod error;
pub mod gid;
pub mod loader;
pub mod webhooks;

pub use auth::Session;
pub use config::{
    ApiCredentials, ApiKey, ApiSecretKey, ApiVersion, HostUrl, ShopDomain, ShopifyConfig,
    ShopifyConfigBuilder,
};
pub use env::ShopifyEnv;
pub use error::{ConfigError, Error};
pub use gid::Gid;

// Re-export HTTP client types
pub use clients::{
    Fetch, FetchRequest, HttpClient, HttpError, HttpMethod, HttpResponse, ReqwestFetch,
    RetryPolicy,
};

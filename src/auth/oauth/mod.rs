//! OAuth authorization code grant.
//!
//! 1. [`gen_auth_state`] creates a nonce the app stores for the merchant.
//! 2. [`create_auth_url`] builds the authorize URL to redirect to.
//! 3. The callback query string is checked with
//!    [`verify_hmac`](crate::auth::hmac::verify_hmac), which yields the shop.
//! 4. [`get_access_token`] exchanges the callback's `code` for an
//!    [`AccessToken`], which becomes a [`Session`](crate::Session).
//!
//! # Example
//!
//! ```rust,ignore
//! use shopify_runtime::auth::hmac::{verify_hmac, QueryParams};
//! use shopify_runtime::auth::oauth::{get_access_token, AccessTokenInput};
//!
//! let params = QueryParams::parse(callback_query);
//! let shop = verify_hmac(&env, &params).await?;
//! let code = params.get("code").unwrap_or_default();
//!
//! let token = get_access_token(
//!     env.fetch(),
//!     &AccessTokenInput { credentials: &credentials, shop: &shop, code },
//! )
//! .await?;
//! let session = token.into_session(shop);
//! ```

mod access_token;
mod authorize;
mod error;

pub use access_token::{get_access_token, AccessToken, AccessTokenInput};
pub use authorize::{create_auth_url, gen_auth_state, AccessMode, AuthUrlInput};
pub use error::OAuthError;

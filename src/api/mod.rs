//! Admin API operations built on the runtime.
//!
//! Each operation is a unit struct implementing
//! [`Operation`](crate::env::Operation) for any environment with the
//! capabilities it needs, plus a free function calling it:
//!
//! ```rust,ignore
//! use shopify_runtime::api::{asset, theme};
//!
//! let themes = theme::list(&env).await?;
//! let main = themes.iter().find(|t| t.role == theme::ThemeRole::Main);
//! ```
//!
//! - [`theme`]: themes, batched through a loader
//! - [`asset`]: theme assets, cached per environment

pub mod asset;
pub mod theme;

use crate::error::Error;

/// Turns a failure with `status` into `Ok(None)`.
pub(crate) fn absent_on<T>(status: u16, result: Result<T, Error>) -> Result<Option<T>, Error> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(error) if error.is_status(status) => Ok(None),
        Err(error) => Err(error),
    }
}

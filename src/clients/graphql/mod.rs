//! GraphQL Admin API client.
//!
//! - [`GraphqlRequest`]: a document tagged by [`OperationKind`]
//! - [`GraphqlClient`]: executes requests and decodes `data`
//! - [`GraphqlError`]: transport, response, missing-data and user errors
//! - [`Connection`] and [`nodes_from_connection`]: uniform pagination
//!
//! # Response Handling
//!
//! The platform answers business-rule violations with HTTP 200. The client
//! treats a non-empty top-level `errors` array as [`GraphqlError::Response`]
//! and, through [`GraphqlClient::mutate_with_user_errors`], a non-empty
//! `userErrors` list or a null mutation result as
//! [`GraphqlError::UserErrors`].
//!
//! # Example
//!
//! ```rust,ignore
//! use serde_json::json;
//! use shopify_runtime::clients::graphql::{GraphqlClient, GraphqlRequest};
//!
//! let request = GraphqlRequest::mutation(THEME_DELETE)
//!     .operation_name("themeDelete")
//!     .variables(json!({"id": "gid://shopify/OnlineStoreTheme/1"}));
//!
//! let deleted_id: String = client
//!     .mutate_with_user_errors(
//!         &request,
//!         |data: &ThemeDeleteData| Some(data.theme_delete.user_errors.clone()),
//!         |data| data.theme_delete.deleted_theme_id,
//!     )
//!     .await?;
//! ```

mod client;
mod errors;
mod pagination;

pub use client::{handle_user_errors, GraphqlClient, GraphqlRequest};
pub use errors::{GraphqlError, OperationKind, RequestContext, ResponseError, UserError};
pub use pagination::{nodes_from_connection, Connection, Edge, PageInfo};

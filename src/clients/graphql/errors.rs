//! GraphQL-specific error types.
//!
//! - [`GraphqlError::Http`]: transport failures, including non-2xx statuses
//! - [`GraphqlError::Response`]: top-level `errors` in the response body
//! - [`GraphqlError::MissingData`]: a response without `data`
//! - [`GraphqlError::UserErrors`]: a 2xx mutation payload reporting a
//!   business-rule violation through `userErrors`, or a null result
//!
//! Every non-transport variant carries the [`RequestContext`] so the failure
//! can be logged without re-issuing the request.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::clients::HttpError;

/// Whether a document is a query or a mutation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OperationKind {
    /// A read operation.
    Query,
    /// A write operation.
    Mutation,
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Query => f.write_str("query"),
            Self::Mutation => f.write_str("mutation"),
        }
    }
}

/// Identifies the request behind a GraphQL failure.
#[derive(Clone, Debug, PartialEq)]
pub struct RequestContext {
    /// Operation kind.
    pub kind: OperationKind,
    /// Operation name, or `<no name>` for anonymous documents.
    pub name: String,
    /// Variables the request was sent with.
    pub variables: serde_json::Value,
}

impl fmt::Display for RequestContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.kind, self.name)
    }
}

/// One entry of a response's top-level `errors` array.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ResponseError {
    /// Human-readable description.
    pub message: String,
    /// Response path the error applies to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<Vec<serde_json::Value>>,
    /// Vendor extensions such as the error code.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extensions: Option<serde_json::Value>,
}

/// A business-rule violation reported inside a mutation payload.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserError {
    /// Human-readable description.
    pub message: String,
    /// Input field path the error applies to.
    #[serde(default)]
    pub field: Option<Vec<String>>,
}

/// Error type for GraphQL API operations.
#[derive(Clone, Debug, Error)]
pub enum GraphqlError {
    /// An HTTP-level error occurred.
    #[error(transparent)]
    Http(#[from] HttpError),

    /// The response carried top-level `errors`.
    #[error("{request}: {}", response_messages(.errors))]
    Response {
        /// The failed request.
        request: RequestContext,
        /// The reported errors.
        errors: Vec<ResponseError>,
    },

    /// The response carried neither `errors` nor `data`.
    #[error("{request}: No data in GraphQL response")]
    MissingData {
        /// The failed request.
        request: RequestContext,
    },

    /// A 2xx payload reported user errors or a null result.
    #[error("{request}: {}", user_error_messages(.user_errors))]
    UserErrors {
        /// The failed request.
        request: RequestContext,
        /// The reported user errors; empty when only the result was null.
        user_errors: Vec<UserError>,
    },
}

impl GraphqlError {
    /// Returns the request context for non-transport failures.
    #[must_use]
    pub const fn request(&self) -> Option<&RequestContext> {
        match self {
            Self::Http(_) => None,
            Self::Response { request, .. }
            | Self::MissingData { request }
            | Self::UserErrors { request, .. } => Some(request),
        }
    }
}

fn response_messages(errors: &[ResponseError]) -> String {
    join_messages(errors.iter().map(|e| e.message.as_str()))
}

fn user_error_messages(errors: &[UserError]) -> String {
    join_messages(errors.iter().map(|e| e.message.as_str()))
}

fn join_messages<'a>(messages: impl Iterator<Item = &'a str>) -> String {
    let joined = messages.collect::<Vec<_>>().join("\n");
    if joined.is_empty() {
        "Unknown GraphQL Error".to_string()
    } else {
        joined
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clients::InvalidHttpRequestError;
    use serde_json::json;

    fn context() -> RequestContext {
        RequestContext {
            kind: OperationKind::Mutation,
            name: "themeDelete".to_string(),
            variables: json!({"id": "gid://shopify/OnlineStoreTheme/1"}),
        }
    }

    #[test]
    fn test_response_error_joins_messages() {
        let error = GraphqlError::Response {
            request: context(),
            errors: vec![
                ResponseError {
                    message: "Field 'x' doesn't exist".to_string(),
                    path: None,
                    extensions: None,
                },
                ResponseError {
                    message: "Throttled".to_string(),
                    path: None,
                    extensions: Some(json!({"code": "THROTTLED"})),
                },
            ],
        };

        assert_eq!(
            error.to_string(),
            "mutation themeDelete: Field 'x' doesn't exist\nThrottled"
        );
        assert_eq!(error.request().map(|r| r.name.as_str()), Some("themeDelete"));
    }

    #[test]
    fn test_user_errors_without_messages_are_unknown() {
        let error = GraphqlError::UserErrors {
            request: context(),
            user_errors: vec![],
        };
        assert!(error.to_string().ends_with("Unknown GraphQL Error"));
    }

    #[test]
    fn test_missing_data_message() {
        let error = GraphqlError::MissingData { request: context() };
        assert!(error.to_string().contains("No data in GraphQL response"));
    }

    #[test]
    fn test_user_error_field_may_be_null() {
        let error: UserError =
            serde_json::from_value(json!({"message": "Title can't be blank", "field": null}))
                .unwrap();
        assert!(error.field.is_none());
    }

    #[test]
    fn test_http_errors_have_no_request_context() {
        let error: GraphqlError = HttpError::from(InvalidHttpRequestError::MissingBodyType).into();
        assert!(error.request().is_none());
    }
}

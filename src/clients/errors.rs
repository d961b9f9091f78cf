//! HTTP-specific error types.
//!
//! - [`HttpResponseError`]: non-2xx HTTP responses from the API
//! - [`MaxHttpRetriesExceededError`]: retry budget exhausted on a retryable status
//! - [`InvalidHttpRequestError`]: a request failed validation before sending
//! - [`HttpError`]: unified error type encompassing all HTTP-related errors
//!
//! All of them are `Clone` so a failed outcome can be shared between
//! concurrent callers.
//!
//! # Example
//!
//! ```rust,ignore
//! use shopify_runtime::clients::HttpError;
//!
//! match client.request(request).await {
//!     Ok(response) => println!("Success: {}", response.body),
//!     Err(HttpError::Response(e)) => println!("API error {}: {}", e.code, e.message),
//!     Err(HttpError::MaxRetries(e)) => println!("Retries exhausted after {} tries", e.tries),
//!     Err(other) => println!("{other}"),
//! }
//! ```

use std::sync::Arc;

use thiserror::Error;

use crate::clients::http_response::HttpResponse;

/// Error returned when an HTTP request receives a non-successful response.
///
/// The `message` field is a JSON object assembled from the body's `errors`,
/// `error` and `error_description` fields plus an `error_reference` built from
/// the `X-Request-Id` header.
#[derive(Clone, Debug, Error)]
#[error("{code} {url}: {message}")]
pub struct HttpResponseError {
    /// The HTTP status code of the response.
    pub code: u16,
    /// The requested URL.
    pub url: String,
    /// Serialized error message in JSON format.
    pub message: String,
    /// Reference ID for error reporting (from X-Request-Id header).
    pub error_reference: Option<String>,
    /// The full response.
    pub response: Box<HttpResponse>,
}

impl HttpResponseError {
    /// Builds the error from a non-2xx response.
    #[must_use]
    pub fn from_response(url: impl Into<String>, response: HttpResponse) -> Self {
        Self {
            code: response.code,
            url: url.into(),
            message: serialize_error(&response),
            error_reference: response.request_id().map(String::from),
            response: Box::new(response),
        }
    }
}

/// Error returned when maximum retry attempts have been exhausted.
#[derive(Clone, Debug, Error)]
#[error("Exceeded maximum retry count of {retries} for {url}. Last status {code}: {message}")]
pub struct MaxHttpRetriesExceededError {
    /// The HTTP status code of the last response.
    pub code: u16,
    /// The number of retries made after the first attempt.
    pub retries: u32,
    /// The requested URL.
    pub url: String,
    /// Serialized error message from the last response.
    pub message: String,
    /// The last response received.
    pub response: Box<HttpResponse>,
}

impl MaxHttpRetriesExceededError {
    /// Builds the error from the last retryable response.
    #[must_use]
    pub fn from_response(url: impl Into<String>, retries: u32, response: HttpResponse) -> Self {
        Self {
            code: response.code,
            retries,
            url: url.into(),
            message: serialize_error(&response),
            response: Box::new(response),
        }
    }
}

/// Error returned when an HTTP request fails validation.
///
/// # Example
///
/// ```rust
/// use shopify_runtime::clients::InvalidHttpRequestError;
///
/// let error = InvalidHttpRequestError::MissingBody {
///     method: "post".to_string(),
/// };
///
/// assert_eq!(error.to_string(), "Cannot use post without specifying data.");
/// ```
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum InvalidHttpRequestError {
    /// A request body was provided without specifying the body type.
    #[error("Cannot set a body without also setting body_type.")]
    MissingBodyType,

    /// A POST, PUT or PATCH request was made without a body.
    #[error("Cannot use {method} without specifying data.")]
    MissingBody {
        /// The HTTP method that requires a body.
        method: String,
    },

    /// A GET or DELETE request carried a body.
    #[error("Cannot use {method} with a request body.")]
    UnexpectedBody {
        /// The HTTP method that forbids a body.
        method: String,
    },

    /// The request path was empty.
    #[error("Request path cannot be empty.")]
    EmptyPath,
}

/// Unified error type for all HTTP-related errors.
#[derive(Clone, Debug, Error)]
pub enum HttpError {
    /// An HTTP response error (non-2xx status code).
    #[error(transparent)]
    Response(#[from] HttpResponseError),

    /// Maximum retry attempts exhausted.
    #[error(transparent)]
    MaxRetries(#[from] MaxHttpRetriesExceededError),

    /// Request validation failed.
    #[error(transparent)]
    InvalidRequest(#[from] InvalidHttpRequestError),

    /// Network or connection error; no response was received.
    #[error("Network error: {0}")]
    Network(Arc<reqwest::Error>),

    /// A 2xx response whose body did not have the expected shape.
    #[error("Invalid payload from {url}: {reason}")]
    InvalidPayload {
        /// The requested URL.
        url: String,
        /// What was wrong with the body.
        reason: String,
    },
}

impl HttpError {
    /// Returns the status of the response behind this error, if any.
    #[must_use]
    pub const fn status(&self) -> Option<u16> {
        match self {
            Self::Response(e) => Some(e.code),
            Self::MaxRetries(e) => Some(e.code),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for HttpError {
    fn from(error: reqwest::Error) -> Self {
        Self::Network(Arc::new(error))
    }
}

fn serialize_error(response: &HttpResponse) -> String {
    let mut error_body = serde_json::Map::new();

    if let Some(errors) = response.body.get("errors") {
        error_body.insert("errors".to_string(), errors.clone());
    }
    if let Some(error) = response.body.get("error") {
        error_body.insert("error".to_string(), error.clone());
        if let Some(desc) = response.body.get("error_description") {
            error_body.insert("error_description".to_string(), desc.clone());
        }
    }

    if let Some(request_id) = response.request_id() {
        error_body.insert(
            "error_reference".to_string(),
            serde_json::json!(format!(
                "If you report this error, please include this id: {request_id}."
            )),
        );
    }

    serde_json::Value::Object(error_body).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::collections::HashMap;

    fn response(code: u16, body: serde_json::Value) -> HttpResponse {
        let mut headers = HashMap::new();
        headers.insert("x-request-id".to_string(), vec!["abc-123".to_string()]);
        HttpResponse::new(code, headers, body)
    }

    #[test]
    fn test_response_error_carries_status_url_and_reference() {
        let error = HttpResponseError::from_response(
            "https://shop.myshopify.com/admin/api/2025-10/themes.json",
            response(404, json!({"errors": "Not Found"})),
        );

        assert_eq!(error.code, 404);
        assert_eq!(error.error_reference.as_deref(), Some("abc-123"));
        assert!(error.message.contains("Not Found"));
        assert!(error.message.contains("abc-123"));
        assert!(error.to_string().starts_with("404 https://shop.myshopify.com"));
        assert_eq!(error.response.body, json!({"errors": "Not Found"}));
    }

    #[test]
    fn test_error_description_only_with_error() {
        let error = HttpResponseError::from_response(
            "https://x",
            HttpResponse::new(400, HashMap::new(), json!({"error_description": "ignored"})),
        );
        assert_eq!(error.message, "{}");

        let error = HttpResponseError::from_response(
            "https://x",
            HttpResponse::new(
                400,
                HashMap::new(),
                json!({"error": "invalid_request", "error_description": "bad code"}),
            ),
        );
        assert!(error.message.contains("bad code"));
    }

    #[test]
    fn test_max_retries_error_keeps_last_response() {
        let error = MaxHttpRetriesExceededError::from_response(
            "https://x",
            10,
            response(503, json!({"errors": "Unavailable"})),
        );

        assert_eq!(error.retries, 10);
        assert_eq!(error.response.code, 503);
        assert!(error.to_string().contains("Exceeded maximum retry count of 10"));
        assert_eq!(HttpError::from(error).status(), Some(503));
    }

    #[test]
    fn test_invalid_request_errors_have_no_status() {
        let error: HttpError = InvalidHttpRequestError::MissingBodyType.into();
        assert_eq!(error.status(), None);
        assert_eq!(
            error.to_string(),
            "Cannot set a body without also setting body_type."
        );
    }
}

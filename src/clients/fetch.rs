//! The network capability.
//!
//! Everything that talks to the network goes through a [`Fetch`]
//! implementation, so tests can swap in an in-memory fake and count calls.
//! A `Fetch` returns every response it receives, whatever the status; the
//! layers above decide what is an error.

use std::collections::HashMap;
use std::fmt;

use async_trait::async_trait;

use crate::clients::errors::HttpError;
use crate::clients::http_request::HttpMethod;
use crate::clients::http_response::HttpResponse;

/// Header carrying the shop access token on every Admin API call.
pub const ACCESS_TOKEN_HEADER: &str = "X-Shopify-Access-Token";

/// A fully resolved outgoing request.
#[derive(Clone, PartialEq, Eq)]
pub struct FetchRequest {
    /// HTTP method.
    pub method: HttpMethod,
    /// Absolute URL including the query string.
    pub url: String,
    /// Request headers.
    pub headers: Vec<(String, String)>,
    /// Serialized body.
    pub body: Option<String>,
}

impl FetchRequest {
    /// Creates a request without headers or body.
    #[must_use]
    pub fn new(method: HttpMethod, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            headers: Vec::new(),
            body: None,
        }
    }

    /// Adds a header.
    #[must_use]
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Sets a JSON body and its content type.
    #[must_use]
    pub fn json_body(mut self, body: &serde_json::Value) -> Self {
        self.headers
            .push(("Content-Type".to_string(), "application/json".to_string()));
        self.body = Some(body.to_string());
        self
    }

    /// Returns the first value of a header, case-insensitively.
    #[must_use]
    pub fn header_value(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }
}

impl fmt::Debug for FetchRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let headers: Vec<(&str, &str)> = self
            .headers
            .iter()
            .map(|(key, value)| {
                if key.eq_ignore_ascii_case(ACCESS_TOKEN_HEADER) {
                    (key.as_str(), "*****")
                } else {
                    (key.as_str(), value.as_str())
                }
            })
            .collect();

        f.debug_struct("FetchRequest")
            .field("method", &self.method)
            .field("url", &self.url)
            .field("headers", &headers)
            .field("body", &self.body)
            .finish()
    }
}

/// Network capability: performs one HTTP exchange.
#[async_trait]
pub trait Fetch: Send + Sync {
    /// Sends `request` and returns the response, whatever its status.
    ///
    /// # Errors
    ///
    /// Returns [`HttpError::Network`] when no response was received.
    async fn fetch(&self, request: FetchRequest) -> Result<HttpResponse, HttpError>;
}

/// [`Fetch`] over a shared `reqwest` client with rustls.
#[derive(Clone, Debug, Default)]
pub struct ReqwestFetch {
    client: reqwest::Client,
}

// Verify ReqwestFetch is Send + Sync at compile time
const _: fn() = || {
    const fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<ReqwestFetch>();
};

impl ReqwestFetch {
    /// Creates a fetcher with a fresh rustls client.
    ///
    /// # Errors
    ///
    /// Returns [`HttpError::Network`] if the TLS backend cannot be initialized.
    pub fn new() -> Result<Self, HttpError> {
        let client = reqwest::Client::builder().use_rustls_tls().build()?;
        Ok(Self { client })
    }

    /// Wraps an existing `reqwest` client.
    #[must_use]
    pub const fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }

    fn parse_response_headers(
        headers: &reqwest::header::HeaderMap,
    ) -> HashMap<String, Vec<String>> {
        let mut result: HashMap<String, Vec<String>> = HashMap::new();
        for (name, value) in headers {
            let value = value.to_str().unwrap_or_default().to_string();
            result.entry(name.as_str().to_string()).or_default().push(value);
        }
        result
    }

    fn parse_body(code: u16, body_text: String) -> serde_json::Value {
        if body_text.trim().is_empty() {
            return serde_json::json!({});
        }

        serde_json::from_str(&body_text).unwrap_or_else(|_| {
            // Keep the raw body of server errors for diagnosis
            if code >= 500 {
                serde_json::json!({ "raw_body": body_text })
            } else {
                serde_json::json!({})
            }
        })
    }
}

#[async_trait]
impl Fetch for ReqwestFetch {
    async fn fetch(&self, request: FetchRequest) -> Result<HttpResponse, HttpError> {
        let method = match request.method {
            HttpMethod::Get => reqwest::Method::GET,
            HttpMethod::Post => reqwest::Method::POST,
            HttpMethod::Put => reqwest::Method::PUT,
            HttpMethod::Patch => reqwest::Method::PATCH,
            HttpMethod::Delete => reqwest::Method::DELETE,
        };

        let mut builder = self.client.request(method, &request.url);
        for (key, value) in &request.headers {
            builder = builder.header(key, value);
        }
        if let Some(body) = request.body {
            builder = builder.body(body);
        }

        let res = builder.send().await?;

        let code = res.status().as_u16();
        let headers = Self::parse_response_headers(res.headers());
        let body_text = res.text().await.unwrap_or_default();

        Ok(HttpResponse::new(code, headers, Self::parse_body(code, body_text)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_debug_masks_access_token() {
        let request = FetchRequest::new(HttpMethod::Get, "https://x")
            .header(ACCESS_TOKEN_HEADER, "shpat_secret");

        let debug = format!("{request:?}");
        assert!(!debug.contains("shpat_secret"));
        assert_eq!(request.header_value("x-shopify-access-token"), Some("shpat_secret"));
    }

    #[test]
    fn test_json_body_sets_content_type() {
        let request = FetchRequest::new(HttpMethod::Post, "https://x").json_body(&json!({"a": 1}));
        assert_eq!(request.header_value("content-type"), Some("application/json"));
        assert_eq!(request.body.as_deref(), Some(r#"{"a":1}"#));
    }

    #[test]
    fn test_parse_body_handles_empty_and_invalid() {
        assert_eq!(ReqwestFetch::parse_body(200, String::new()), json!({}));
        assert_eq!(ReqwestFetch::parse_body(200, "not json".into()), json!({}));
        assert_eq!(
            ReqwestFetch::parse_body(502, "Bad Gateway".into()),
            json!({"raw_body": "Bad Gateway"})
        );
    }
}

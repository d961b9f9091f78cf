//! Parsed HTTP responses.
//!
//! [`HttpResponse`] is what every [`Fetch`](super::Fetch) capability returns.
//! Header names are stored lowercased.

use std::collections::HashMap;
use std::time::Duration;

/// Rate limit information parsed from the `X-Shopify-Shop-Api-Call-Limit` header.
///
/// # Example
///
/// ```rust
/// use shopify_runtime::clients::ApiCallLimit;
///
/// let limit = ApiCallLimit::parse("40/80").unwrap();
/// assert_eq!(limit.request_count, 40);
/// assert_eq!(limit.bucket_size, 80);
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ApiCallLimit {
    /// Requests made in the current bucket.
    pub request_count: u32,
    /// Bucket capacity.
    pub bucket_size: u32,
}

impl ApiCallLimit {
    /// Parses an `X/Y` header value.
    #[must_use]
    pub fn parse(header_value: &str) -> Option<Self> {
        let (count, size) = header_value.split_once('/')?;
        Some(Self {
            request_count: count.trim().parse().ok()?,
            bucket_size: size.trim().parse().ok()?,
        })
    }
}

/// Cursor values parsed from a REST `Link` header.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct LinkPageInfo {
    /// `page_info` of the previous page.
    pub previous: Option<String>,
    /// `page_info` of the next page.
    pub next: Option<String>,
}

impl LinkPageInfo {
    /// Parses `<url>; rel="next", <url>; rel="previous"`.
    #[must_use]
    pub fn parse(header_value: &str) -> Self {
        let mut result = Self::default();

        for link in header_value.split(',') {
            let mut parts = link.split(';').map(str::trim);
            let Some(url) = parts.next() else { continue };
            let url = url.trim_start_matches('<').trim_end_matches('>');

            let rel = parts.find_map(|part| part.strip_prefix("rel=").map(|r| r.trim_matches('"')));
            let page_info = url
                .split_once('?')
                .and_then(|(_, query)| {
                    query
                        .split('&')
                        .filter_map(|pair| pair.split_once('='))
                        .find(|(key, _)| *key == "page_info")
                })
                .map(|(_, value)| value.to_string());

            match (rel, page_info) {
                (Some("next"), Some(value)) => result.next = Some(value),
                (Some("previous"), Some(value)) => result.previous = Some(value),
                _ => {}
            }
        }

        result
    }
}

/// An HTTP response with its JSON body and parsed platform headers.
#[derive(Clone, Debug)]
pub struct HttpResponse {
    /// The HTTP status code.
    pub code: u16,
    /// Response headers keyed by lowercased name.
    pub headers: HashMap<String, Vec<String>>,
    /// The parsed response body (`{}` for an empty body).
    pub body: serde_json::Value,
    /// Cursor pagination from the `Link` header.
    pub page_info: LinkPageInfo,
    /// Rate limit bucket state.
    pub api_call_limit: Option<ApiCallLimit>,
    /// Seconds to wait before retrying (from `Retry-After`).
    pub retry_request_after: Option<f64>,
}

impl HttpResponse {
    /// Creates a response, parsing `Link`, `X-Shopify-Shop-Api-Call-Limit`
    /// and `Retry-After` from `headers`.
    #[must_use]
    pub fn new(code: u16, headers: HashMap<String, Vec<String>>, body: serde_json::Value) -> Self {
        let headers: HashMap<String, Vec<String>> = headers
            .into_iter()
            .map(|(name, values)| (name.to_ascii_lowercase(), values))
            .collect();

        let first = |name: &str| headers.get(name).and_then(|values| values.first());

        let page_info = first("link").map(|link| LinkPageInfo::parse(link)).unwrap_or_default();
        let api_call_limit =
            first("x-shopify-shop-api-call-limit").and_then(|v| ApiCallLimit::parse(v));
        let retry_request_after = first("retry-after").and_then(|v| v.trim().parse::<f64>().ok());

        Self {
            code,
            headers,
            body,
            page_info,
            api_call_limit,
            retry_request_after,
        }
    }

    /// Returns `true` if the status code is in the 2xx range.
    #[must_use]
    pub const fn is_ok(&self) -> bool {
        self.code >= 200 && self.code <= 299
    }

    /// Returns the first value of a header.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .and_then(|values| values.first())
            .map(String::as_str)
    }

    /// Returns the `X-Request-Id` header value, if present.
    #[must_use]
    pub fn request_id(&self) -> Option<&str> {
        self.header("x-request-id")
    }

    /// Returns the `X-Shopify-API-Deprecated-Reason` header value, if present.
    #[must_use]
    pub fn deprecation_reason(&self) -> Option<&str> {
        self.header("x-shopify-api-deprecated-reason")
    }

    /// Returns the `Retry-After` delay, if the server sent a valid one.
    #[must_use]
    pub fn retry_after(&self) -> Option<Duration> {
        self.retry_request_after
            .filter(|secs| secs.is_finite() && *secs >= 0.0)
            .map(Duration::from_secs_f64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn headers(pairs: &[(&str, &str)]) -> HashMap<String, Vec<String>> {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), vec![(*v).to_string()]))
            .collect()
    }

    #[test]
    fn test_is_ok_only_for_2xx() {
        assert!(HttpResponse::new(200, HashMap::new(), json!({})).is_ok());
        assert!(HttpResponse::new(204, HashMap::new(), json!({})).is_ok());
        for code in [301, 400, 404, 429, 500] {
            assert!(!HttpResponse::new(code, HashMap::new(), json!({})).is_ok());
        }
    }

    #[test]
    fn test_api_call_limit_parsing() {
        assert_eq!(
            ApiCallLimit::parse("1/40"),
            Some(ApiCallLimit {
                request_count: 1,
                bucket_size: 40
            })
        );
        assert!(ApiCallLimit::parse("40").is_none());
        assert!(ApiCallLimit::parse("/80").is_none());
        assert!(ApiCallLimit::parse("abc/def").is_none());
    }

    #[test]
    fn test_link_header_parsing() {
        let link = r#"<https://shop.myshopify.com/admin/api/2025-10/themes.json?limit=5&page_info=abc123>; rel="next", <https://shop.myshopify.com/admin/api/2025-10/themes.json?page_info=xyz789>; rel="previous""#;
        let info = LinkPageInfo::parse(link);
        assert_eq!(info.next.as_deref(), Some("abc123"));
        assert_eq!(info.previous.as_deref(), Some("xyz789"));

        let info = LinkPageInfo::parse(r#"<https://x/y.json>; rel="next""#);
        assert_eq!(info, LinkPageInfo::default());
    }

    #[test]
    fn test_headers_are_case_insensitive() {
        let response = HttpResponse::new(
            429,
            headers(&[
                ("Retry-After", "2.5"),
                ("X-Request-Id", "abc-123"),
                ("X-Shopify-Shop-Api-Call-Limit", "39/40"),
            ]),
            json!({}),
        );

        assert_eq!(response.request_id(), Some("abc-123"));
        assert_eq!(response.header("x-request-id"), Some("abc-123"));
        assert_eq!(response.retry_after(), Some(Duration::from_millis(2500)));
        assert_eq!(response.api_call_limit.map(|l| l.request_count), Some(39));
    }

    #[test]
    fn test_negative_retry_after_is_ignored() {
        let response = HttpResponse::new(429, headers(&[("retry-after", "-1")]), json!({}));
        assert_eq!(response.retry_after(), None);
    }

    #[test]
    fn test_deprecation_reason_extraction() {
        let response = HttpResponse::new(
            200,
            headers(&[("x-shopify-api-deprecated-reason", "Removed in 2026-01")]),
            json!({}),
        );
        assert_eq!(response.deprecation_reason(), Some("Removed in 2026-01"));
    }
}

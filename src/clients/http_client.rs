//! Authenticated transport to one shop's Admin API.

use std::sync::Arc;

use crate::auth::Session;
use crate::clients::errors::{HttpError, HttpResponseError};
use crate::clients::fetch::{Fetch, FetchRequest, ACCESS_TOKEN_HEADER};
use crate::clients::http_request::HttpRequest;
use crate::clients::http_response::HttpResponse;
use crate::clients::retry::{fetch_with_retry, RetryPolicy};
use crate::config::{ApiVersion, ShopifyConfig};

/// Crate version from Cargo.toml.
pub const SDK_VERSION: &str = env!("CARGO_PKG_VERSION");

/// HTTP client bound to one shop session.
///
/// The client handles:
/// - Base URI `https://{shop}` and base path `/admin/api/{version}`
/// - Default headers including User-Agent and access token
/// - Routing every call through the [`RetryPolicy`]
/// - Mapping non-2xx responses to [`HttpResponseError`]
///
/// Cloning is cheap; the network capability is shared.
///
/// # Example
///
/// ```rust,ignore
/// use std::sync::Arc;
/// use shopify_runtime::clients::{HttpClient, HttpRequest, HttpMethod, ReqwestFetch};
///
/// let client = HttpClient::new(Arc::new(ReqwestFetch::new()?), &session, Some(&config));
///
/// let request = HttpRequest::builder(HttpMethod::Get, "themes.json").build()?;
/// let response = client.request(&request).await?;
/// ```
#[derive(Clone)]
pub struct HttpClient {
    fetch: Arc<dyn Fetch>,
    base_uri: String,
    base_path: String,
    default_headers: Vec<(String, String)>,
    retry_policy: RetryPolicy,
}

// Verify HttpClient is Send + Sync at compile time
const _: fn() = || {
    const fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<HttpClient>();
};

impl std::fmt::Debug for HttpClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpClient")
            .field("base_uri", &self.base_uri)
            .field("base_path", &self.base_path)
            .field("retry_policy", &self.retry_policy)
            .finish_non_exhaustive()
    }
}

impl HttpClient {
    /// Creates a client for `session`.
    ///
    /// `config` supplies the API version, user agent prefix and retry
    /// policy; without it the latest version and default policy are used.
    #[must_use]
    pub fn new(fetch: Arc<dyn Fetch>, session: &Session, config: Option<&ShopifyConfig>) -> Self {
        let api_version = config.map_or_else(ApiVersion::latest, ShopifyConfig::api_version);
        let retry_policy = config.map_or_else(RetryPolicy::default, ShopifyConfig::retry_policy);

        let user_agent_prefix = config
            .and_then(ShopifyConfig::user_agent_prefix)
            .map_or(String::new(), |prefix| format!("{prefix} | "));
        let rust_version = env!("CARGO_PKG_RUST_VERSION");
        let user_agent =
            format!("{user_agent_prefix}Shopify Runtime v{SDK_VERSION} | Rust {rust_version}");

        let mut default_headers = vec![
            ("User-Agent".to_string(), user_agent),
            ("Accept".to_string(), "application/json".to_string()),
        ];
        if !session.access_token.is_empty() {
            default_headers.push((
                ACCESS_TOKEN_HEADER.to_string(),
                session.access_token.clone(),
            ));
        }

        Self {
            fetch,
            base_uri: format!("https://{}", session.shop),
            base_path: format!("/admin/api/{api_version}"),
            default_headers,
            retry_policy,
        }
    }

    /// Points the client at another origin, such as a proxy.
    #[must_use]
    pub fn with_base_uri(mut self, base_uri: impl Into<String>) -> Self {
        self.base_uri = base_uri.into().trim_end_matches('/').to_string();
        self
    }

    /// Replaces the retry policy.
    #[must_use]
    pub const fn with_retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.retry_policy = policy;
        self
    }

    /// Returns the base URI for this client.
    #[must_use]
    pub fn base_uri(&self) -> &str {
        &self.base_uri
    }

    /// Returns the base path for this client.
    #[must_use]
    pub fn base_path(&self) -> &str {
        &self.base_path
    }

    /// Returns the default headers for this client.
    #[must_use]
    pub fn default_headers(&self) -> &[(String, String)] {
        &self.default_headers
    }

    /// Returns the retry policy in force.
    #[must_use]
    pub const fn retry_policy(&self) -> RetryPolicy {
        self.retry_policy
    }

    /// Returns the absolute URL for a path relative to the base path.
    #[must_use]
    pub fn url(&self, path_and_query: &str) -> String {
        format!(
            "{}{}/{}",
            self.base_uri,
            self.base_path,
            path_and_query.trim_start_matches('/')
        )
    }

    /// Sends a request to the Admin API.
    ///
    /// # Errors
    ///
    /// Returns [`HttpError`] if:
    /// - Request validation fails (`InvalidRequest`)
    /// - Network error occurs (`Network`)
    /// - Non-2xx response received (`Response`)
    /// - Retry budget exhausted on a retryable status (`MaxRetries`)
    pub async fn request(&self, request: &HttpRequest) -> Result<HttpResponse, HttpError> {
        request.verify()?;

        let fetch_request = self.to_fetch_request(request);
        let response = fetch_with_retry(&*self.fetch, self.retry_policy, &fetch_request).await?;

        if let Some(reason) = response.deprecation_reason() {
            tracing::warn!(
                "Deprecated request to Shopify API at {}, received reason: {}",
                request.path,
                reason
            );
        }

        if response.is_ok() {
            return Ok(response);
        }

        tracing::debug!(
            status = response.code,
            url = %fetch_request.url,
            "Admin API returned an error status"
        );
        Err(HttpResponseError::from_response(fetch_request.url, response).into())
    }

    fn to_fetch_request(&self, request: &HttpRequest) -> FetchRequest {
        let mut fetch_request = FetchRequest::new(
            request.http_method,
            self.url(&request.path_and_query()),
        );
        fetch_request.headers = self.default_headers.clone();

        if let Some(body_type) = request.body_type {
            fetch_request
                .headers
                .push(("Content-Type".to_string(), body_type.as_content_type().to_string()));
        }
        fetch_request
            .headers
            .extend(request.extra_headers.iter().cloned());
        fetch_request.body = request.body.as_ref().map(ToString::to_string);

        fetch_request
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clients::{DataType, HttpMethod, ReqwestFetch};
    use crate::config::{ApiKey, ApiSecretKey, ShopDomain};
    use serde_json::json;

    fn create_test_session() -> Session {
        Session::new(
            ShopDomain::new("test-shop.myshopify.com").unwrap(),
            "test-access-token",
        )
    }

    fn client(config: Option<&ShopifyConfig>) -> HttpClient {
        HttpClient::new(
            Arc::new(ReqwestFetch::default()),
            &create_test_session(),
            config,
        )
    }

    #[test]
    fn test_client_construction_with_session() {
        let client = client(None);

        assert_eq!(client.base_uri(), "https://test-shop.myshopify.com");
        assert_eq!(
            client.base_path(),
            format!("/admin/api/{}", ApiVersion::latest())
        );
        assert_eq!(
            client.url("/themes.json"),
            format!(
                "https://test-shop.myshopify.com/admin/api/{}/themes.json",
                ApiVersion::latest()
            )
        );
    }

    #[test]
    fn test_default_headers() {
        let client = client(None);
        let headers = client.default_headers();

        let get = |name: &str| {
            headers
                .iter()
                .find(|(k, _)| k == name)
                .map(|(_, v)| v.as_str())
        };
        assert_eq!(get("Accept"), Some("application/json"));
        assert_eq!(get(ACCESS_TOKEN_HEADER), Some("test-access-token"));
        assert!(get("User-Agent").unwrap().contains("Shopify Runtime v"));
    }

    #[test]
    fn test_no_access_token_header_when_empty() {
        let session = Session::new(ShopDomain::new("test-shop.myshopify.com").unwrap(), "");
        let client = HttpClient::new(Arc::new(ReqwestFetch::default()), &session, None);

        assert!(client
            .default_headers()
            .iter()
            .all(|(k, _)| k != ACCESS_TOKEN_HEADER));
    }

    #[test]
    fn test_config_sets_version_prefix_and_policy() {
        let config = ShopifyConfig::builder()
            .api_key(ApiKey::new("test-key").unwrap())
            .api_secret_key(ApiSecretKey::new("test-secret").unwrap())
            .api_version(ApiVersion::Unstable)
            .user_agent_prefix("MyApp/1.0")
            .retry_policy(RetryPolicy::none())
            .build()
            .unwrap();

        let client = client(Some(&config));

        assert_eq!(client.base_path(), "/admin/api/unstable");
        assert_eq!(client.retry_policy(), RetryPolicy::none());
        let user_agent = &client.default_headers()[0].1;
        assert!(user_agent.starts_with("MyApp/1.0 | "));
    }

    #[test]
    fn test_fetch_request_merges_headers_and_body() {
        let client = client(None).with_base_uri("http://127.0.0.1:9999/");
        let request = HttpRequest::builder(HttpMethod::Put, "themes/1/assets.json")
            .body(json!({"asset": {"key": "a"}}))
            .body_type(DataType::Json)
            .header("X-Custom", "1")
            .build()
            .unwrap();

        let fetch_request = client.to_fetch_request(&request);

        assert!(fetch_request.url.starts_with("http://127.0.0.1:9999/admin/api/"));
        assert_eq!(fetch_request.header_value("content-type"), Some("application/json"));
        assert_eq!(fetch_request.header_value("x-custom"), Some("1"));
        assert_eq!(fetch_request.body.as_deref(), Some(r#"{"asset":{"key":"a"}}"#));
    }
}

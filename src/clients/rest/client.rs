//! REST client implementation.

use serde::de::DeserializeOwned;

use crate::clients::{DataType, HttpClient, HttpError, HttpMethod, HttpRequest, HttpResponse};

/// REST client for the Admin API.
///
/// Wraps an [`HttpClient`] and decodes JSON envelopes into caller types.
/// Cloning is cheap.
///
/// # Thread Safety
///
/// `RestClient` is `Send + Sync`, making it safe to share across async tasks.
///
/// # Example
///
/// ```rust,ignore
/// use serde::Deserialize;
/// use shopify_runtime::clients::RestClient;
///
/// #[derive(Deserialize)]
/// struct ShopEnvelope { shop: serde_json::Value }
///
/// let client = RestClient::new(http_client);
/// let envelope: ShopEnvelope = client.get("shop", &[]).await?;
/// ```
#[derive(Clone, Debug)]
pub struct RestClient {
    http_client: HttpClient,
}

// Verify RestClient is Send + Sync at compile time
const _: fn() = || {
    const fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<RestClient>();
};

impl RestClient {
    /// Creates a REST client over `http_client`.
    #[must_use]
    pub const fn new(http_client: HttpClient) -> Self {
        Self { http_client }
    }

    /// Returns the underlying HTTP client.
    #[must_use]
    pub const fn http_client(&self) -> &HttpClient {
        &self.http_client
    }

    /// Sends a GET request and decodes the envelope.
    ///
    /// # Errors
    ///
    /// Returns [`HttpError`] for transport failures, non-2xx statuses and
    /// bodies that do not decode into `T`.
    pub async fn get<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, &str)],
    ) -> Result<T, HttpError> {
        let response = self.request_raw(HttpMethod::Get, path, None, query).await?;
        decode(&self.http_client, path, response)
    }

    /// Sends a POST request with a JSON body and decodes the envelope.
    ///
    /// # Errors
    ///
    /// Returns [`HttpError`] for transport failures, non-2xx statuses and
    /// bodies that do not decode into `T`.
    pub async fn post<T: DeserializeOwned>(
        &self,
        path: &str,
        body: serde_json::Value,
    ) -> Result<T, HttpError> {
        let response = self
            .request_raw(HttpMethod::Post, path, Some(body), &[])
            .await?;
        decode(&self.http_client, path, response)
    }

    /// Sends a PUT request with a JSON body and decodes the envelope.
    ///
    /// # Errors
    ///
    /// Returns [`HttpError`] for transport failures, non-2xx statuses and
    /// bodies that do not decode into `T`.
    pub async fn put<T: DeserializeOwned>(
        &self,
        path: &str,
        body: serde_json::Value,
    ) -> Result<T, HttpError> {
        let response = self
            .request_raw(HttpMethod::Put, path, Some(body), &[])
            .await?;
        decode(&self.http_client, path, response)
    }

    /// Sends a DELETE request, discarding the body.
    ///
    /// # Errors
    ///
    /// Returns [`HttpError`] for transport failures and non-2xx statuses.
    pub async fn delete(&self, path: &str, query: &[(&str, &str)]) -> Result<(), HttpError> {
        self.request_raw(HttpMethod::Delete, path, None, query)
            .await
            .map(|_| ())
    }

    /// Sends a request and returns the raw response.
    ///
    /// The path is normalized: leading slashes are stripped and `.json` is
    /// appended when missing.
    ///
    /// # Errors
    ///
    /// Returns [`HttpError`] for invalid requests, transport failures and
    /// non-2xx statuses.
    pub async fn request_raw(
        &self,
        method: HttpMethod,
        path: &str,
        body: Option<serde_json::Value>,
        query: &[(&str, &str)],
    ) -> Result<HttpResponse, HttpError> {
        let mut builder = HttpRequest::builder(method, normalize_path(path));

        if let Some(body_value) = body {
            builder = builder.body(body_value).body_type(DataType::Json);
        }
        for (key, value) in query {
            builder = builder.query_param(*key, *value);
        }

        let request = builder.build()?;
        self.http_client.request(&request).await
    }
}

fn decode<T: DeserializeOwned>(
    http_client: &HttpClient,
    path: &str,
    response: HttpResponse,
) -> Result<T, HttpError> {
    serde_json::from_value(response.body).map_err(|e| HttpError::InvalidPayload {
        url: http_client.url(&normalize_path(path)),
        reason: e.to_string(),
    })
}

/// Strips leading slashes and a trailing `.json`, then re-appends `.json`.
///
/// An empty result stays empty so request validation rejects it.
fn normalize_path(path: &str) -> String {
    let path = path.trim_start_matches('/');
    let path = path.strip_suffix(".json").unwrap_or(path);

    if path.is_empty() {
        return String::new();
    }
    format!("{path}.json")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_path() {
        assert_eq!(normalize_path("themes"), "themes.json");
        assert_eq!(normalize_path("/themes"), "themes.json");
        assert_eq!(normalize_path("themes.json"), "themes.json");
        assert_eq!(normalize_path("/themes/1/assets.json"), "themes/1/assets.json");
        assert_eq!(normalize_path("//themes"), "themes.json");
    }

    #[test]
    fn test_normalize_path_keeps_empty_paths_empty() {
        assert_eq!(normalize_path(""), "");
        assert_eq!(normalize_path("/"), "");
        assert_eq!(normalize_path(".json"), "");
    }
}

//! GraphQL client implementation for the Admin API.

use serde::de::DeserializeOwned;
use serde::Deserialize;

use crate::clients::graphql::errors::{
    GraphqlError, OperationKind, RequestContext, ResponseError, UserError,
};
use crate::clients::{DataType, HttpClient, HttpError, HttpMethod, HttpRequest};

/// A GraphQL document with its variables, tagged by operation kind.
///
/// # Example
///
/// ```rust
/// use serde_json::json;
/// use shopify_runtime::clients::graphql::{GraphqlRequest, OperationKind};
///
/// let request = GraphqlRequest::query("query shop { shop { name } }")
///     .operation_name("shop")
///     .variables(json!({}));
///
/// assert_eq!(request.kind(), OperationKind::Query);
/// assert_eq!(request.body()["operationName"], "shop");
/// ```
#[derive(Clone, Debug, PartialEq)]
pub struct GraphqlRequest {
    kind: OperationKind,
    document: String,
    operation_name: Option<String>,
    variables: serde_json::Value,
}

impl GraphqlRequest {
    /// Creates a query request.
    #[must_use]
    pub fn query(document: impl Into<String>) -> Self {
        Self::new(OperationKind::Query, document)
    }

    /// Creates a mutation request.
    #[must_use]
    pub fn mutation(document: impl Into<String>) -> Self {
        Self::new(OperationKind::Mutation, document)
    }

    fn new(kind: OperationKind, document: impl Into<String>) -> Self {
        Self {
            kind,
            document: document.into(),
            operation_name: None,
            variables: serde_json::Value::Object(serde_json::Map::new()),
        }
    }

    /// Sets the operation name.
    #[must_use]
    pub fn operation_name(mut self, name: impl Into<String>) -> Self {
        self.operation_name = Some(name.into());
        self
    }

    /// Sets the variables.
    #[must_use]
    pub fn variables(mut self, variables: serde_json::Value) -> Self {
        self.variables = variables;
        self
    }

    /// Returns the operation kind.
    #[must_use]
    pub const fn kind(&self) -> OperationKind {
        self.kind
    }

    /// Returns the document text.
    #[must_use]
    pub fn document(&self) -> &str {
        &self.document
    }

    /// Returns the wire body `{query, variables, operationName?}`.
    #[must_use]
    pub fn body(&self) -> serde_json::Value {
        let mut body = serde_json::json!({
            "query": self.document,
            "variables": self.variables,
        });
        if let Some(name) = &self.operation_name {
            body["operationName"] = serde_json::Value::String(name.clone());
        }
        body
    }

    /// Returns the context attached to errors for this request.
    #[must_use]
    pub fn context(&self) -> RequestContext {
        RequestContext {
            kind: self.kind,
            name: self
                .operation_name
                .clone()
                .unwrap_or_else(|| "<no name>".to_string()),
            variables: self.variables.clone(),
        }
    }
}

#[derive(Deserialize)]
struct Envelope<T> {
    data: Option<T>,
    #[serde(default)]
    errors: Option<Vec<ResponseError>>,
}

/// GraphQL client for the Admin API.
///
/// Sends every request as a POST to `graphql.json` through the wrapped
/// [`HttpClient`], so it shares its retry policy. Cloning is cheap.
///
/// # Thread Safety
///
/// `GraphqlClient` is `Send + Sync`, making it safe to share across async tasks.
///
/// # Example
///
/// ```rust,ignore
/// use serde::Deserialize;
/// use shopify_runtime::clients::graphql::{GraphqlClient, GraphqlRequest};
///
/// #[derive(Deserialize)]
/// struct ShopData { shop: Shop }
/// #[derive(Deserialize)]
/// struct Shop { name: String }
///
/// let client = GraphqlClient::new(http_client);
/// let data: ShopData = client
///     .request(&GraphqlRequest::query("query { shop { name } }"))
///     .await?;
/// ```
#[derive(Clone, Debug)]
pub struct GraphqlClient {
    http_client: HttpClient,
}

// Verify GraphqlClient is Send + Sync at compile time
const _: fn() = || {
    const fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<GraphqlClient>();
};

impl GraphqlClient {
    /// Creates a GraphQL client over `http_client`.
    #[must_use]
    pub const fn new(http_client: HttpClient) -> Self {
        Self { http_client }
    }

    /// Returns the underlying HTTP client.
    #[must_use]
    pub const fn http_client(&self) -> &HttpClient {
        &self.http_client
    }

    /// Executes a request and decodes its `data`.
    ///
    /// # Errors
    ///
    /// - [`GraphqlError::Http`] for transport failures and non-2xx statuses
    /// - [`GraphqlError::Response`] when the body carries top-level `errors`
    /// - [`GraphqlError::MissingData`] when the body has no `data`
    pub async fn request<T: DeserializeOwned>(
        &self,
        request: &GraphqlRequest,
    ) -> Result<T, GraphqlError> {
        let http_request = HttpRequest::builder(HttpMethod::Post, "graphql.json")
            .body(request.body())
            .body_type(DataType::Json)
            .build()
            .map_err(HttpError::from)?;

        let response = self.http_client.request(&http_request).await?;

        let envelope: Envelope<T> =
            serde_json::from_value(response.body).map_err(|e| HttpError::InvalidPayload {
                url: self.http_client.url("graphql.json"),
                reason: e.to_string(),
            })?;

        handle_result(request, envelope)
    }

    /// Executes a mutation whose payload reports `userErrors`.
    ///
    /// `get_errors` extracts the user errors and `get_result` the domain
    /// result from the decoded data.
    ///
    /// # Errors
    ///
    /// Everything [`request`](Self::request) returns, plus
    /// [`GraphqlError::UserErrors`] when the user errors are non-empty or the
    /// result is absent.
    pub async fn mutate_with_user_errors<T, R, E, G>(
        &self,
        request: &GraphqlRequest,
        get_errors: E,
        get_result: G,
    ) -> Result<R, GraphqlError>
    where
        T: DeserializeOwned,
        E: FnOnce(&T) -> Option<Vec<UserError>>,
        G: FnOnce(T) -> Option<R>,
    {
        let data: T = self.request(request).await?;
        let errors = get_errors(&data);
        handle_user_errors(request, errors, get_result(data))
    }
}

fn handle_result<T>(request: &GraphqlRequest, envelope: Envelope<T>) -> Result<T, GraphqlError> {
    if let Some(errors) = envelope.errors.filter(|errors| !errors.is_empty()) {
        return Err(GraphqlError::Response {
            request: request.context(),
            errors,
        });
    }

    envelope.data.ok_or_else(|| GraphqlError::MissingData {
        request: request.context(),
    })
}

/// Turns a mutation payload into its result or a user error.
///
/// # Errors
///
/// Returns [`GraphqlError::UserErrors`] when `errors` is non-empty or
/// `result` is `None`.
pub fn handle_user_errors<R>(
    request: &GraphqlRequest,
    errors: Option<Vec<UserError>>,
    result: Option<R>,
) -> Result<R, GraphqlError> {
    let errors = errors.unwrap_or_default();
    match result {
        Some(result) if errors.is_empty() => Ok(result),
        _ => Err(GraphqlError::UserErrors {
            request: request.context(),
            user_errors: errors,
        }),
    }
}

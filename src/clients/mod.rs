//! REST and GraphQL transport for the Admin API.
//!
//! # Overview
//!
//! - [`Fetch`]: the network capability; [`ReqwestFetch`] is the default
//! - [`RetryPolicy`], [`RetryFetch`], [`retry_async`]: bounded, constant-delay retries
//! - [`HttpClient`]: authenticated, versioned transport for one shop
//! - [`HttpRequest`]: a validated request descriptor
//! - [`HttpResponse`]: a parsed response with platform headers
//! - [`rest::RestClient`]: REST calls decoding JSON envelopes
//! - [`graphql::GraphqlClient`]: GraphQL calls with error and user-error handling
//!
//! # Retry Behavior
//!
//! Every call made through [`HttpClient`] is retried when the status is one
//! of [`RETRYABLE_STATUSES`] (408, 413, 429, 500, 502, 503, 504, 521, 522,
//! 524), with a constant delay between attempts. Once the budget is spent,
//! the call fails with [`HttpError::MaxRetries`] carrying the last response.
//! Network errors are not retried.

mod errors;
mod fetch;
pub mod graphql;
mod http_client;
mod http_request;
mod http_response;
pub mod rest;
mod retry;

pub use errors::{
    HttpError, HttpResponseError, InvalidHttpRequestError, MaxHttpRetriesExceededError,
};
pub use fetch::{Fetch, FetchRequest, ReqwestFetch, ACCESS_TOKEN_HEADER};
pub use http_client::{HttpClient, SDK_VERSION};
pub use http_request::{DataType, HttpMethod, HttpRequest, HttpRequestBuilder};
pub use http_response::{ApiCallLimit, HttpResponse, LinkPageInfo};
pub use retry::{
    fetch_with_retry, retry_async, RetriesExhausted, RetryFetch, RetryPolicy,
    DEFAULT_MAX_RETRIES, RETRYABLE_STATUSES, RETRY_WAIT_TIME,
};

pub use graphql::{GraphqlClient, GraphqlError};
pub use rest::RestClient;

//! Bounded, constant-delay retries for transient failures.

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;

use crate::clients::errors::{HttpError, MaxHttpRetriesExceededError};
use crate::clients::fetch::{Fetch, FetchRequest};
use crate::clients::http_response::HttpResponse;

/// Statuses treated as transient: request timeout, payload too large,
/// rate limited, and the 5xx family including common edge proxy codes.
pub const RETRYABLE_STATUSES: [u16; 10] = [408, 413, 429, 500, 502, 503, 504, 521, 522, 524];

/// Default number of retries after the first attempt.
pub const DEFAULT_MAX_RETRIES: u32 = 10;

/// Default delay between attempts.
pub const RETRY_WAIT_TIME: Duration = Duration::from_secs(1);

/// Retry budget and the constant delay between attempts.
///
/// # Example
///
/// ```rust
/// use std::time::Duration;
/// use shopify_runtime::clients::RetryPolicy;
///
/// let policy = RetryPolicy::default();
/// assert_eq!(policy.max_retries(), 10);
/// assert_eq!(policy.delay(), Duration::from_secs(1));
/// assert!(RetryPolicy::is_retryable(429));
/// assert!(!RetryPolicy::is_retryable(404));
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RetryPolicy {
    max_retries: u32,
    delay: Duration,
}

impl RetryPolicy {
    /// Creates a policy allowing `max_retries` retries `delay` apart.
    #[must_use]
    pub const fn new(max_retries: u32, delay: Duration) -> Self {
        Self { max_retries, delay }
    }

    /// A policy that never retries.
    #[must_use]
    pub const fn none() -> Self {
        Self::new(0, Duration::ZERO)
    }

    /// Returns the number of retries allowed after the first attempt.
    #[must_use]
    pub const fn max_retries(&self) -> u32 {
        self.max_retries
    }

    /// Returns the delay between attempts.
    #[must_use]
    pub const fn delay(&self) -> Duration {
        self.delay
    }

    /// Returns `true` if `status` is in [`RETRYABLE_STATUSES`].
    #[must_use]
    pub fn is_retryable(status: u16) -> bool {
        RETRYABLE_STATUSES.contains(&status)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_RETRIES, RETRY_WAIT_TIME)
    }
}

/// The retry budget ran out while `check` still asked for another attempt.
#[derive(Debug)]
pub struct RetriesExhausted<T> {
    /// The last result produced.
    pub last: T,
    /// Retries made after the first attempt.
    pub retries: u32,
}

/// Runs `attempt` until `check` accepts its result or the budget runs out.
///
/// `check` returns `true` when the result should be retried. Attempts are
/// separated by the policy's constant delay.
///
/// # Errors
///
/// Returns [`RetriesExhausted`] carrying the last result when the final
/// allowed attempt is still rejected by `check`.
pub async fn retry_async<T, F, Fut, C>(
    policy: RetryPolicy,
    mut attempt: F,
    check: C,
) -> Result<T, RetriesExhausted<T>>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = T>,
    C: Fn(&T) -> bool,
{
    let mut retries: u32 = 0;
    loop {
        let result = attempt().await;
        if !check(&result) {
            return Ok(result);
        }
        if retries >= policy.max_retries {
            return Err(RetriesExhausted {
                last: result,
                retries,
            });
        }

        retries += 1;
        tracing::debug!(
            retry = retries,
            max_retries = policy.max_retries,
            delay_ms = u64::try_from(policy.delay.as_millis()).unwrap_or(u64::MAX),
            "Retrying transient failure"
        );
        tokio::time::sleep(policy.delay).await;
    }
}

/// Sends `request` through `fetch`, retrying retryable statuses.
///
/// Network errors are returned immediately. Non-retryable responses,
/// successful or not, are returned as `Ok`.
///
/// # Errors
///
/// Returns [`HttpError::MaxRetries`] carrying the last response when the
/// budget is exhausted, or the network error from `fetch`.
pub async fn fetch_with_retry<F>(
    fetch: &F,
    policy: RetryPolicy,
    request: &FetchRequest,
) -> Result<HttpResponse, HttpError>
where
    F: Fetch + ?Sized,
{
    let outcome = retry_async(
        policy,
        || fetch.fetch(request.clone()),
        |result: &Result<HttpResponse, HttpError>| {
            matches!(result, Ok(response) if RetryPolicy::is_retryable(response.code))
        },
    )
    .await;

    match outcome {
        Ok(result) => result,
        Err(RetriesExhausted { last, retries }) => {
            let response = last?;
            tracing::warn!(
                url = %request.url,
                status = response.code,
                retries,
                "Retry budget exhausted"
            );
            Err(MaxHttpRetriesExceededError::from_response(&request.url, retries, response).into())
        }
    }
}

/// A [`Fetch`] that retries its inner fetcher under a [`RetryPolicy`].
#[derive(Clone, Debug)]
pub struct RetryFetch<F> {
    inner: F,
    policy: RetryPolicy,
}

impl<F> RetryFetch<F> {
    /// Wraps `inner` with `policy`.
    #[must_use]
    pub const fn new(inner: F, policy: RetryPolicy) -> Self {
        Self { inner, policy }
    }

    /// Returns the policy in force.
    #[must_use]
    pub const fn policy(&self) -> RetryPolicy {
        self.policy
    }
}

#[async_trait]
impl<F: Fetch> Fetch for RetryFetch<F> {
    async fn fetch(&self, request: FetchRequest) -> Result<HttpResponse, HttpError> {
        fetch_with_retry(&self.inner, self.policy, &request).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clients::HttpMethod;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Mutex;

    struct Scripted {
        statuses: Mutex<Vec<u16>>,
        calls: AtomicU32,
    }

    impl Scripted {
        fn new(mut statuses: Vec<u16>) -> Self {
            statuses.reverse();
            Self {
                statuses: Mutex::new(statuses),
                calls: AtomicU32::new(0),
            }
        }
    }

    #[async_trait]
    impl Fetch for Scripted {
        async fn fetch(&self, _request: FetchRequest) -> Result<HttpResponse, HttpError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let code = self.statuses.lock().unwrap().pop().unwrap_or(200);
            Ok(HttpResponse::new(code, HashMap::new(), serde_json::json!({})))
        }
    }

    fn request() -> FetchRequest {
        FetchRequest::new(HttpMethod::Get, "https://test.myshopify.com/admin/api/2025-10/shop.json")
    }

    #[test]
    fn test_retryable_statuses() {
        for status in RETRYABLE_STATUSES {
            assert!(RetryPolicy::is_retryable(status));
        }
        for status in [200, 400, 401, 403, 404, 422, 501] {
            assert!(!RetryPolicy::is_retryable(status));
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_retries_then_succeeds_with_constant_delay() {
        let fetch = Scripted::new(vec![429, 503, 500]);
        let started = tokio::time::Instant::now();

        let response = fetch_with_retry(&fetch, RetryPolicy::default(), &request())
            .await
            .unwrap();

        assert_eq!(response.code, 200);
        assert_eq!(fetch.calls.load(Ordering::SeqCst), 4);
        assert_eq!(started.elapsed(), Duration::from_secs(3));
    }

    #[tokio::test(start_paused = true)]
    async fn test_exhaustion_wraps_last_response() {
        let fetch = Scripted::new(vec![502; 20]);

        let policy = RetryPolicy::new(3, Duration::from_secs(1));
        let error = fetch_with_retry(&fetch, policy, &request())
            .await
            .unwrap_err();

        assert_eq!(fetch.calls.load(Ordering::SeqCst), 4);
        match error {
            HttpError::MaxRetries(e) => {
                assert_eq!(e.retries, 3);
                assert_eq!(e.response.code, 502);
            }
            other => panic!("expected MaxRetries, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_non_retryable_status_returns_immediately() {
        let fetch = Scripted::new(vec![404]);
        let response = fetch_with_retry(&fetch, RetryPolicy::default(), &request())
            .await
            .unwrap();

        assert_eq!(response.code, 404);
        assert_eq!(fetch.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_none_policy_never_retries() {
        let fetch = RetryFetch::new(Scripted::new(vec![500]), RetryPolicy::none());
        let error = fetch.fetch(request()).await.unwrap_err();

        assert_eq!(error.status(), Some(500));
        assert_eq!(fetch.inner.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_async_is_generic() {
        let mut attempts = 0;
        let result = retry_async(
            RetryPolicy::new(5, Duration::from_millis(10)),
            || {
                attempts += 1;
                let value = attempts;
                async move { value }
            },
            |value| *value < 3,
        )
        .await;

        assert!(matches!(result, Ok(3)));
    }
}

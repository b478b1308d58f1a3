use std::time::Duration;

use reqwest::StatusCode;
use reqwest::header::{HeaderMap, RETRY_AFTER};
use serde::Serialize;
use tokio::time::sleep;

use crate::llm::provider::{ModelOptions, Provider, ProviderError};

const MAX_BACKOFF: Duration = Duration::from_secs(30);

/// One provider endpoint with the transport options it is called with.
pub(crate) struct ChatEndpoint<'a> {
    pub provider: Provider,
    pub url: &'a str,
    pub headers: HeaderMap,
    pub options: &'a ModelOptions,
}

impl ChatEndpoint<'_> {
    /// Posts `payload`, retrying rate limits, server errors and transport failures.
    ///
    /// A `Retry-After` header in seconds replaces the computed backoff; both
    /// are capped at 30 seconds.
    pub(crate) async fn post<T: Serialize + ?Sized>(
        &self,
        client: &reqwest::Client,
        payload: &T,
    ) -> Result<reqwest::Response, ProviderError> {
        let provider = self.provider;
        let max_attempts = self.options.retries.saturating_add(1);
        let mut attempt = 0;

        loop {
            let mut request = client
                .post(self.url)
                .headers(self.headers.clone())
                .json(payload);
            if let Some(timeout_secs) = self.options.timeout_secs {
                request = request.timeout(Duration::from_secs(timeout_secs));
            }
            let last_attempt = attempt + 1 >= max_attempts;

            let wait = match request.send().await {
                Ok(response) if response.status().is_success() => return Ok(response),
                Ok(response) => {
                    let status = response.status();
                    let hinted = retry_after(response.headers());
                    let body = response.text().await.unwrap_or_default();
                    if last_attempt || !is_retryable_status(status) {
                        return Err(ProviderError::Api {
                            provider,
                            status,
                            body,
                        });
                    }
                    let wait = hinted
                        .unwrap_or_else(|| backoff(attempt, self.options.retry_delay_ms))
                        .min(MAX_BACKOFF);
                    tracing::warn!(
                        %provider,
                        %status,
                        attempt = attempt + 1,
                        wait_ms = wait.as_millis() as u64,
                        "model API rejected the request, retrying"
                    );
                    wait
                }
                Err(source) => {
                    if last_attempt || !is_retryable_request_error(&source) {
                        return Err(ProviderError::Request { provider, source });
                    }
                    let wait = backoff(attempt, self.options.retry_delay_ms);
                    tracing::warn!(
                        %provider,
                        error = %source,
                        attempt = attempt + 1,
                        wait_ms = wait.as_millis() as u64,
                        "model API unreachable, retrying"
                    );
                    wait
                }
            };
            sleep(wait).await;
            attempt += 1;
        }
    }
}

fn is_retryable_status(status: StatusCode) -> bool {
    status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error()
}

fn is_retryable_request_error(err: &reqwest::Error) -> bool {
    err.is_timeout() || err.is_connect() || err.is_request()
}

/// Delay-seconds form of `Retry-After`; HTTP dates are ignored.
fn retry_after(headers: &HeaderMap) -> Option<Duration> {
    headers
        .get(RETRY_AFTER)?
        .to_str()
        .ok()?
        .trim()
        .parse::<u64>()
        .ok()
        .map(Duration::from_secs)
}

fn backoff(attempt: u32, base_ms: u64) -> Duration {
    let factor = 1u64.checked_shl(attempt).unwrap_or(u64::MAX);
    Duration::from_millis(base_ms.saturating_mul(factor)).min(MAX_BACKOFF)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::Router;
    use axum::http::HeaderValue;
    use axum::routing::post;
    use serde_json::json;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn backoff_doubles_and_caps_at_thirty_seconds() {
        assert_eq!(backoff(0, 250), Duration::from_millis(250));
        assert_eq!(backoff(3, 250), Duration::from_millis(2_000));
        assert_eq!(backoff(12, 500), MAX_BACKOFF);
        assert_eq!(backoff(64, 1), MAX_BACKOFF);
    }

    #[test]
    fn overloaded_and_rate_limited_are_retried() {
        assert!(is_retryable_status(StatusCode::TOO_MANY_REQUESTS));
        assert!(is_retryable_status(StatusCode::from_u16(529).unwrap()));
        assert!(!is_retryable_status(StatusCode::BAD_REQUEST));
        assert!(!is_retryable_status(StatusCode::UNAUTHORIZED));
    }

    #[test]
    fn retry_after_reads_delay_seconds_only() {
        let mut headers = HeaderMap::new();
        headers.insert(RETRY_AFTER, HeaderValue::from_static("7"));
        assert_eq!(retry_after(&headers), Some(Duration::from_secs(7)));

        headers.insert(
            RETRY_AFTER,
            HeaderValue::from_static("Wed, 21 Oct 2026 07:28:00 GMT"),
        );
        assert_eq!(retry_after(&headers), None);
    }

    /// Answers 429 `failures` times, then 200.
    async fn flaky_server(failures: usize) -> (String, Arc<AtomicUsize>) {
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = hits.clone();
        let app = Router::new().route(
            "/",
            post(move || {
                let counter = counter.clone();
                async move {
                    let seen = counter.fetch_add(1, Ordering::SeqCst);
                    if seen < failures {
                        (StatusCode::TOO_MANY_REQUESTS, [(RETRY_AFTER, "0")], "slow down")
                    } else {
                        (StatusCode::OK, [(RETRY_AFTER, "0")], "ok")
                    }
                }
            }),
        );
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        (format!("http://{addr}/"), hits)
    }

    #[tokio::test]
    async fn rate_limits_are_retried_until_success() {
        let (url, hits) = flaky_server(2).await;
        let options = ModelOptions {
            retries: 2,
            retry_delay_ms: 1,
            ..ModelOptions::default()
        };
        let endpoint = ChatEndpoint {
            provider: Provider::Fireworks,
            url: &url,
            headers: HeaderMap::new(),
            options: &options,
        };
        let response = endpoint
            .post(&reqwest::Client::new(), &json!({}))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(hits.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn exhausted_retries_report_the_last_status() {
        let (url, hits) = flaky_server(usize::MAX).await;
        let options = ModelOptions {
            retries: 1,
            retry_delay_ms: 1,
            ..ModelOptions::default()
        };
        let endpoint = ChatEndpoint {
            provider: Provider::Anthropic,
            url: &url,
            headers: HeaderMap::new(),
            options: &options,
        };
        let err = endpoint
            .post(&reqwest::Client::new(), &json!({}))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ProviderError::Api { provider: Provider::Anthropic, status, .. }
                if status == StatusCode::TOO_MANY_REQUESTS
        ));
        assert_eq!(hits.load(Ordering::SeqCst), 2);
    }
}

//! HTTP transport shared by the GQL client and the watch-pulse sender.
//!
//! Centralizes the backoff/retry policy so a flaky network doesn't need to be reinvented in
//! every caller: connect/timeout and 5xx responses retry with jittered exponential backoff,
//! 4xx responses pass straight through to the caller, and a fixed deadline turns a stale
//! session into `MinerError::RequestInvalid` instead of retrying forever.

use std::time::{Duration, Instant};

use rand::Rng;
use reqwest::{Method, RequestBuilder, Response};

use crate::constants::BACKOFF_MAX;
use crate::error::{MinerError, Result};

/// Exponential backoff with jitter, capped at `BACKOFF_MAX`.
///
/// `delay(n) = min(BACKOFF_MAX, base^n * U(1-variance, 1+variance) + shift)`
pub struct ExponentialBackoff {
    base: f64,
    shift: f64,
    variance: f64,
    attempt: u32,
}

impl ExponentialBackoff {
    pub fn new() -> Self {
        Self {
            base: 2.0,
            shift: 0.0,
            variance: 0.1,
            attempt: 0,
        }
    }

    /// Number of `next()` calls made so far.
    pub fn steps(&self) -> u32 {
        self.attempt
    }

    /// Compute and consume the next delay.
    pub fn next(&mut self) -> Duration {
        let exp = self.base.powi(self.attempt as i32);
        self.attempt += 1;
        let jitter = rand::thread_rng().gen_range((1.0 - self.variance)..(1.0 + self.variance));
        let secs = (exp * jitter + self.shift).min(BACKOFF_MAX.as_secs_f64());
        Duration::from_secs_f64(secs.max(0.0))
    }
}

impl Default for ExponentialBackoff {
    fn default() -> Self {
        Self::new()
    }
}

/// Build a `reqwest::Client`, honoring an optional proxy URL.
pub fn build_client(proxy_url: Option<&str>) -> reqwest::Client {
    let mut builder = reqwest::Client::builder()
        .connect_timeout(Duration::from_secs(10))
        .timeout(Duration::from_secs(10));

    if let Some(url) = proxy_url {
        if let Ok(proxy) = reqwest::Proxy::all(url) {
            builder = builder.proxy(proxy);
        }
    }

    builder.build().expect("failed to build HTTP client")
}

/// Issue `request` (built fresh each attempt by `rebuild`), retrying 5xx responses and
/// connect/timeout errors with exponential backoff, up to `deadline` from now. 4xx and below
/// responses (and successes) are returned immediately without inspecting the body.
///
/// `rebuild` exists because `reqwest::RequestBuilder` is consumed by `send()` and cannot be
/// cloned across retries; callers pass a closure that constructs an equivalent builder.
pub async fn request_with_retry<F>(mut rebuild: F, deadline: Option<Instant>) -> Result<Response>
where
    F: FnMut() -> RequestBuilder,
{
    let mut backoff = ExponentialBackoff::new();
    loop {
        if let Some(deadline) = deadline {
            if Instant::now() >= deadline {
                return Err(MinerError::RequestInvalid);
            }
        }

        match rebuild().send().await {
            Ok(resp) if resp.status().is_server_error() => {
                tracing::warn!("transport: {} from server, retrying", resp.status());
                tokio::time::sleep(backoff.next()).await;
            }
            Ok(resp) => return Ok(resp),
            Err(e) if e.is_connect() || e.is_timeout() => {
                tracing::warn!("transport: connection issue ({}), retrying", e);
                tokio::time::sleep(backoff.next()).await;
            }
            Err(e) => return Err(MinerError::Request(e.to_string())),
        }
    }
}

/// Convenience wrapper for simple GET/POST calls that don't need a fully custom builder.
pub async fn simple_request_with_retry(
    client: &reqwest::Client,
    method: Method,
    url: &str,
    headers: Vec<(&'static str, String)>,
) -> Result<Response> {
    request_with_retry(
        || {
            let mut req = client.request(method.clone(), url);
            for (k, v) in &headers {
                req = req.header(*k, v);
            }
            req
        },
        None,
    )
    .await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backoff_grows_and_caps() {
        let mut b = ExponentialBackoff::new();
        let first = b.next();
        let second = b.next();
        assert!(first.as_secs_f64() < second.as_secs_f64() * 1.5);
        assert_eq!(b.steps(), 2);

        // Drive it far enough to hit the cap.
        for _ in 0..20 {
            let d = b.next();
            assert!(d.as_secs_f64() <= BACKOFF_MAX.as_secs_f64() + 1.0);
        }
    }

    #[test]
    fn test_backoff_never_negative() {
        let mut b = ExponentialBackoff::new();
        for _ in 0..5 {
            assert!(b.next().as_secs_f64() >= 0.0);
        }
    }
}

//! Call spacing, timeouts and retry with exponential backoff
//!
//! Every outbound request of the resolver goes through one
//! `RateLimitedClient`. The only shared mutable state is the next free call
//! slot, kept behind an async mutex, so any number of concurrent callers
//! still start at most one request per `min_interval`.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use super::{HttpError, HttpResponse, HttpTransport};
use crate::config::ResolverConfig;
use crate::error::LookupError;

const TRACING_TARGET: &str = "chemres::http";

/// Bounded retry budget with exponential backoff
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first
    pub max_attempts: u32,
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
}

impl RetryPolicy {
    /// Wait before retry number `retry` (1-based): initial * 2^(retry-1), capped.
    pub fn backoff_for(&self, retry: u32) -> Duration {
        let factor = 2u32.saturating_pow(retry.saturating_sub(1));
        self.initial_backoff
            .saturating_mul(factor)
            .min(self.max_backoff)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        let config = crate::config::RateLimitConfig::default();
        Self {
            max_attempts: config.max_attempts,
            initial_backoff: config.initial_backoff(),
            max_backoff: config.max_backoff(),
        }
    }
}

/// Failure of a single attempt, before the retry decision
enum AttemptError {
    Transport(HttpError),
    Status(u16, Option<Duration>),
}

pub struct RateLimitedClient<T> {
    transport: T,
    min_interval: Duration,
    request_timeout: Duration,
    retry: RetryPolicy,
    next_slot: Mutex<Option<Instant>>,
    /// Set once any response, of any status, has come back
    reached: AtomicBool,
    calls: AtomicUsize,
}

impl<T: HttpTransport> RateLimitedClient<T> {
    pub fn new(
        transport: T,
        min_interval: Duration,
        request_timeout: Duration,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            transport,
            min_interval,
            request_timeout,
            retry,
            next_slot: Mutex::new(None),
            reached: AtomicBool::new(false),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn from_config(transport: T, config: &ResolverConfig) -> Self {
        Self::new(
            transport,
            config.rate_limit.min_interval(),
            config.service.request_timeout(),
            RetryPolicy {
                max_attempts: config.rate_limit.max_attempts,
                initial_backoff: config.rate_limit.initial_backoff(),
                max_backoff: config.rate_limit.max_backoff(),
            },
        )
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Number of requests handed to the transport so far, retries included
    pub fn calls_made(&self) -> usize {
        self.calls.load(Ordering::Relaxed)
    }

    /// Whether the service has answered at least once
    pub fn has_reached_service(&self) -> bool {
        self.reached.load(Ordering::Relaxed)
    }

    /// GET with spacing, timeout and retries.
    ///
    /// Returns the response for any non-retryable status, leaving its
    /// interpretation to the caller. Throttling, 5xx, timeouts and transport
    /// errors are retried until the budget runs out.
    pub async fn get(
        &self,
        url: &str,
        cancel: &CancellationToken,
    ) -> Result<HttpResponse, LookupError> {
        let mut connect_failures_only = true;
        let mut last_error = String::new();

        for attempt in 1..=self.retry.max_attempts {
            self.wait_for_slot(cancel).await?;
            self.calls.fetch_add(1, Ordering::Relaxed);

            let result = tokio::select! {
                _ = cancel.cancelled() => return Err(LookupError::Cancelled),
                r = tokio::time::timeout(self.request_timeout, self.transport.get(url)) => r,
            };

            let failure = match result {
                Ok(Ok(resp)) => {
                    self.reached.store(true, Ordering::Relaxed);
                    if !resp.is_retryable() {
                        return Ok(resp);
                    }
                    let retry_after = resp.retry_after();
                    AttemptError::Status(resp.status, retry_after)
                }
                Ok(Err(e)) => AttemptError::Transport(e),
                Err(_) => AttemptError::Transport(HttpError::Timeout),
            };

            let retry_after = match &failure {
                AttemptError::Transport(HttpError::RateLimited { retry_after }) => {
                    self.reached.store(true, Ordering::Relaxed);
                    connect_failures_only = false;
                    *retry_after
                }
                AttemptError::Transport(e) if !e.is_transient() => {
                    return Err(LookupError::Service {
                        message: e.to_string(),
                        attempts: attempt,
                    });
                }
                AttemptError::Transport(e) => {
                    if !matches!(e, HttpError::Connect { .. }) {
                        connect_failures_only = false;
                    }
                    None
                }
                AttemptError::Status(_, retry_after) => {
                    connect_failures_only = false;
                    *retry_after
                }
            };

            last_error = match failure {
                AttemptError::Transport(e) => e.to_string(),
                AttemptError::Status(status, _) => format!("HTTP status {}", status),
            };

            if attempt == self.retry.max_attempts {
                break;
            }

            let backoff = retry_after
                .unwrap_or_default()
                .max(self.retry.backoff_for(attempt))
                .min(self.retry.max_backoff);

            tracing::debug!(
                target: TRACING_TARGET,
                url = %url,
                attempt,
                backoff_ms = backoff.as_millis() as u64,
                error = %last_error,
                "Request failed, retrying"
            );

            tokio::select! {
                _ = cancel.cancelled() => return Err(LookupError::Cancelled),
                _ = tokio::time::sleep(backoff) => {}
            }
        }

        tracing::warn!(
            target: TRACING_TARGET,
            url = %url,
            attempts = self.retry.max_attempts,
            error = %last_error,
            "Request failed after exhausting retries"
        );

        if connect_failures_only && !self.has_reached_service() {
            Err(LookupError::Unreachable(last_error))
        } else {
            Err(LookupError::Service {
                message: last_error,
                attempts: self.retry.max_attempts,
            })
        }
    }

    /// Reserve the next call slot and sleep until it opens.
    ///
    /// The lock is held only while reserving, never while sleeping.
    async fn wait_for_slot(&self, cancel: &CancellationToken) -> Result<(), LookupError> {
        if cancel.is_cancelled() {
            return Err(LookupError::Cancelled);
        }

        let wait = {
            let mut slot = self.next_slot.lock().await;
            let now = Instant::now();
            let start = match *slot {
                Some(next) if next > now => next,
                _ => now,
            };
            *slot = Some(start + self.min_interval);
            start - now
        };

        if wait.is_zero() {
            return Ok(());
        }

        tokio::select! {
            _ = cancel.cancelled() => Err(LookupError::Cancelled),
            _ = tokio::time::sleep(wait) => Ok(()),
        }
    }
}

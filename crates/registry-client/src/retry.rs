//! Bounded immediate retry shared by metadata and archive fetches.

use std::fmt::Debug;
use std::future::Future;
use std::sync::atomic::{AtomicU32, Ordering};

use tracing::{trace, warn};

use crate::error::RegistryError;

/// Attempts per network operation, including the first one.
pub const MAX_TRIES: u32 = 10;

/// Receives attempt outcomes of every retried operation.
pub trait RetryObserver: Debug + Send + Sync {
    /// Called for each failed attempt that will be (or could have been) retried.
    fn failed_attempt(&self, url: &str, attempt: u32, reason: &str);

    /// Called once when an operation gives up.
    fn exhausted(&self, url: &str, attempts: u32) {
        let _ = (url, attempts);
    }

    /// Called once when an operation succeeds on attempt `attempt`.
    fn succeeded(&self, url: &str, attempt: u32) {
        let _ = (url, attempt);
    }
}

/// Default observer, logs through `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingObserver;

impl RetryObserver for TracingObserver {
    fn failed_attempt(&self, url: &str, attempt: u32, reason: &str) {
        warn!("attempt {} for {} failed: {}", attempt, url, reason);
    }

    fn exhausted(&self, url: &str, attempts: u32) {
        warn!("giving up on {} after {} attempts", url, attempts);
    }

    fn succeeded(&self, url: &str, attempt: u32) {
        trace!("{} succeeded on attempt {}", url, attempt);
    }
}

/// Observer that counts attempts across all operations of a client.
#[derive(Debug, Default)]
pub struct AttemptCounter {
    failed: AtomicU32,
    exhausted: AtomicU32,
    succeeded: AtomicU32,
}

impl AttemptCounter {
    pub fn failed(&self) -> u32 {
        self.failed.load(Ordering::SeqCst)
    }

    pub fn exhausted_count(&self) -> u32 {
        self.exhausted.load(Ordering::SeqCst)
    }

    pub fn succeeded_count(&self) -> u32 {
        self.succeeded.load(Ordering::SeqCst)
    }
}

impl RetryObserver for AttemptCounter {
    fn failed_attempt(&self, url: &str, attempt: u32, reason: &str) {
        self.failed.fetch_add(1, Ordering::SeqCst);
        TracingObserver.failed_attempt(url, attempt, reason);
    }

    fn exhausted(&self, url: &str, attempts: u32) {
        self.exhausted.fetch_add(1, Ordering::SeqCst);
        TracingObserver.exhausted(url, attempts);
    }

    fn succeeded(&self, _url: &str, _attempt: u32) {
        self.succeeded.fetch_add(1, Ordering::SeqCst);
    }
}

/// Outcome of a single attempt that did not produce a value.
#[derive(Debug)]
pub(crate) enum AttemptError {
    /// Stop retrying and surface this error as is
    Fatal(RegistryError),
    /// Count as a failed attempt and try again
    Retry(String),
}

/// Run `op` until it succeeds, fails fatally, or `max_tries` attempts have
/// failed. Retries are immediate, without backoff.
pub(crate) async fn with_retry<T, F, Fut>(
    url: &str,
    max_tries: u32,
    observer: &dyn RetryObserver,
    mut op: F,
) -> Result<T, RegistryError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, AttemptError>>,
{
    let max_tries = max_tries.max(1);
    let mut last = String::new();

    for attempt in 1..=max_tries {
        trace!("{} attempt {}/{}", url, attempt, max_tries);
        match op().await {
            Ok(value) => {
                observer.succeeded(url, attempt);
                return Ok(value);
            }
            Err(AttemptError::Fatal(e)) => return Err(e),
            Err(AttemptError::Retry(reason)) => {
                observer.failed_attempt(url, attempt, &reason);
                last = reason;
            }
        }
    }

    observer.exhausted(url, max_tries);
    Err(RegistryError::TooManyFailures {
        url: url.to_string(),
        attempts: max_tries,
        last,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_gives_up_after_max_tries() {
        let counter = AttemptCounter::default();
        let mut calls = 0;
        let res: Result<(), _> = with_retry("http://registry/x/", 4, &counter, || {
            calls += 1;
            let n = calls;
            async move { Err(AttemptError::Retry(format!("boom {}", n))) }
        })
        .await;

        assert_eq!(calls, 4);
        assert_eq!(counter.failed(), 4);
        assert_eq!(counter.exhausted_count(), 1);
        assert_eq!(
            res,
            Err(RegistryError::TooManyFailures {
                url: "http://registry/x/".to_string(),
                attempts: 4,
                last: "boom 4".to_string(),
            })
        );
    }

    #[tokio::test]
    async fn test_succeeds_after_failures() {
        let counter = AttemptCounter::default();
        let mut calls = 0;
        let res = with_retry("u", MAX_TRIES, &counter, || {
            calls += 1;
            let n = calls;
            async move {
                if n < 3 {
                    Err(AttemptError::Retry("not yet".to_string()))
                } else {
                    Ok(n)
                }
            }
        })
        .await;

        assert_eq!(res, Ok(3));
        assert_eq!(counter.failed(), 2);
        assert_eq!(counter.succeeded_count(), 1);
        assert_eq!(counter.exhausted_count(), 0);
    }

    #[tokio::test]
    async fn test_fatal_stops_immediately() {
        let counter = AttemptCounter::default();
        let mut calls = 0;
        let res: Result<(), _> = with_retry("u", MAX_TRIES, &counter, || {
            calls += 1;
            async { Err(AttemptError::Fatal(RegistryError::not_found("x", None))) }
        })
        .await;

        assert_eq!(calls, 1);
        assert!(res.unwrap_err().is_not_found());
        assert_eq!(counter.failed(), 0);
    }

    #[tokio::test]
    async fn test_zero_max_tries_still_attempts_once() {
        let counter = AttemptCounter::default();
        let res: Result<(), _> = with_retry("u", 0, &counter, || async {
            Err(AttemptError::Retry("down".to_string()))
        })
        .await;
        assert!(matches!(
            res,
            Err(RegistryError::TooManyFailures { attempts: 1, .. })
        ));
    }
}

//! Backoff for transient transfer errors, and log throttling for poll loops.

use std::future::Future;
use std::time::Duration;

use tracing::{debug, warn};

/// Exponential backoff policy for one kind of transfer.
#[derive(Debug, Clone)]
pub struct Backoff {
    /// Total attempts, including the first one
    pub attempts: u32,
    pub initial_delay: Duration,
    pub max_delay: Duration,
    /// Shown in retry logs
    pub label: String,
}

/// The last error once every attempt was used.
#[derive(Debug)]
pub struct Exhausted<E> {
    pub error: E,
    pub attempts: u32,
}

impl Backoff {
    /// Three attempts starting at 500ms, capped at 10s.
    pub fn transfer(label: impl Into<String>) -> Self {
        Self {
            attempts: 3,
            initial_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(10),
            label: label.into(),
        }
    }

    pub fn with_attempts(mut self, attempts: u32) -> Self {
        self.attempts = attempts.max(1);
        self
    }

    pub fn with_initial_delay(mut self, delay: Duration) -> Self {
        self.initial_delay = delay;
        self
    }

    /// Pause before retry number `retry` (1-based).
    pub fn delay(&self, retry: u32) -> Duration {
        let factor = 2u32.saturating_pow(retry.saturating_sub(1));
        self.initial_delay.saturating_mul(factor).min(self.max_delay)
    }

    /// Run `op` until it succeeds, fails with an error `retryable` rejects,
    /// or the attempts are used up.
    pub async fn run<T, E, F, Fut, P>(&self, retryable: P, op: F) -> Result<T, Exhausted<E>>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        P: Fn(&E) -> bool,
        E: std::fmt::Display,
    {
        let mut attempt = 1;
        loop {
            let error = match op().await {
                Ok(value) => return Ok(value),
                Err(e) => e,
            };

            if attempt >= self.attempts || !retryable(&error) {
                return Err(Exhausted { error, attempts: attempt });
            }

            let pause = self.delay(attempt);
            debug!(
                label = %self.label,
                attempt,
                pause_ms = pause.as_millis() as u64,
                error = %error,
                "Transient failure, retrying"
            );
            tokio::time::sleep(pause).await;
            attempt += 1;
        }
    }
}

/// Decides which failures of a repeating check are worth logging.
///
/// The first `loud_limit` consecutive failures are logged, then a single
/// notice, then silence until the check recovers.
#[derive(Debug)]
pub struct PollFailureLog {
    streak: u32,
    loud_limit: u32,
}

impl PollFailureLog {
    pub fn new(loud_limit: u32) -> Self {
        Self { streak: 0, loud_limit }
    }

    /// Count a failure; `true` when the caller should log it.
    pub fn failed(&mut self) -> bool {
        self.streak += 1;
        if self.streak == self.loud_limit + 1 {
            warn!(
                failures = self.streak,
                "Check keeps failing, muting further failure logs"
            );
        }
        self.streak <= self.loud_limit
    }

    pub fn recovered(&mut self) {
        if self.streak > self.loud_limit {
            debug!(failures = self.streak, "Check recovered");
        }
        self.streak = 0;
    }

    pub fn streak(&self) -> u32 {
        self.streak
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[test]
    fn test_delay_doubles_up_to_cap() {
        let backoff = Backoff::transfer("download").with_initial_delay(Duration::from_millis(100));

        assert_eq!(backoff.delay(1), Duration::from_millis(100));
        assert_eq!(backoff.delay(2), Duration::from_millis(200));
        assert_eq!(backoff.delay(3), Duration::from_millis(400));
        assert_eq!(backoff.delay(64), Duration::from_secs(10));
    }

    #[test]
    fn test_poll_log_mutes_then_resets() {
        let mut log = PollFailureLog::new(2);

        assert!(log.failed());
        assert!(log.failed());
        assert!(!log.failed());
        assert!(!log.failed());
        assert_eq!(log.streak(), 4);

        log.recovered();
        assert_eq!(log.streak(), 0);
        assert!(log.failed());
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_retries_transient_errors() {
        let calls = AtomicU32::new(0);

        let result = Backoff::transfer("download")
            .run(|_: &&str| true, || {
                let n = calls.fetch_add(1, Ordering::SeqCst);
                async move {
                    if n < 2 {
                        Err("connection reset")
                    } else {
                        Ok(7u64)
                    }
                }
            })
            .await;

        assert_eq!(result.unwrap(), 7);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_run_stops_on_permanent_error() {
        let calls = AtomicU32::new(0);

        let result = Backoff::transfer("download")
            .run(|_: &&str| false, || {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err::<u64, _>("404") }
            })
            .await;

        let exhausted = result.unwrap_err();
        assert_eq!(exhausted.error, "404");
        assert_eq!(exhausted.attempts, 1);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_gives_up_after_attempts() {
        let calls = AtomicU32::new(0);

        let result = Backoff::transfer("download")
            .with_attempts(2)
            .run(|_: &&str| true, || {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err::<u64, _>("timeout") }
            })
            .await;

        assert_eq!(result.unwrap_err().attempts, 2);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }
}

//! Bounded retry with a fixed backoff schedule
//!
//! Every call to the lease API goes through this policy. Transient
//! infrastructure errors are retried a bounded number of times; anything
//! else propagates on first sight. A call site can also veto retrying a
//! specific error it considers an answer, like the create conflict that
//! decides an election.

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;
use tracing::warn;

use lw_common::Retryable;

/// Default schedule, roughly doubling from 100ms to 4s.
pub fn default_backoffs() -> Vec<Duration> {
    vec![
        Duration::from_millis(100),
        Duration::from_millis(500),
        Duration::from_millis(1000),
        Duration::from_millis(2000),
        Duration::from_millis(4000),
    ]
}

#[derive(Debug, Clone)]
pub struct RetryPolicy {
    backoffs: Vec<Duration>,
    max_retries: usize,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(default_backoffs())
    }
}

impl RetryPolicy {
    /// Retry once per schedule entry by default.
    pub fn new(backoffs: Vec<Duration>) -> Self {
        let max_retries = backoffs.len();
        RetryPolicy {
            backoffs,
            max_retries,
        }
    }

    /// Cap retries independently of the schedule length. A budget longer
    /// than the schedule keeps sleeping the last entry.
    pub fn with_max_retries(mut self, max_retries: usize) -> Self {
        self.max_retries = max_retries;
        self
    }

    fn backoff_for(&self, attempt: usize) -> Duration {
        self.backoffs
            .get(attempt)
            .or_else(|| self.backoffs.last())
            .copied()
            .unwrap_or(Duration::ZERO)
    }

    /// Run `action` until it succeeds or the retry budget is spent.
    pub async fn run<T, E, F, Fut>(&self, what: &str, action: F) -> Result<T, E>
    where
        E: Retryable + Display,
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        self.run_unless(what, |_| false, action).await
    }

    /// Like [`run`](Self::run), but an error matching `no_retry`
    /// propagates immediately even when transient.
    pub async fn run_unless<T, E, P, F, Fut>(
        &self,
        what: &str,
        no_retry: P,
        mut action: F,
    ) -> Result<T, E>
    where
        E: Retryable + Display,
        P: Fn(&E) -> bool,
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let mut attempt = 0;
        loop {
            match action().await {
                Ok(value) => return Ok(value),
                Err(err) => {
                    if !err.is_transient() || no_retry(&err) || attempt >= self.max_retries {
                        return Err(err);
                    }
                    warn!(
                        call = what,
                        error = %err,
                        remaining = self.max_retries - attempt,
                        "Retryable error"
                    );
                    tokio::time::sleep(self.backoff_for(attempt)).await;
                    attempt += 1;
                }
            }
        }
    }
}

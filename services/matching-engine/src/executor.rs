//! Retry executor
//!
//! Re-runs a whole transaction when it fails on store contention. The
//! policy is explicit configuration; the executor keeps no state between
//! calls.

use std::thread;

use tracing::{error, warn};
use types::errors::ExchangeError;

use crate::config::RetryPolicy;

#[derive(Debug, Clone)]
pub struct RetryExecutor {
    policy: RetryPolicy,
}

impl RetryExecutor {
    pub fn new(policy: RetryPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Run `attempt` until it succeeds, fails for good, or the retry budget
    /// runs out. Blocks the calling thread during backoff.
    pub fn run<T>(
        &self,
        operation: &'static str,
        mut attempt: impl FnMut() -> Result<T, ExchangeError>,
    ) -> Result<T, ExchangeError> {
        let mut retries = 0u32;
        loop {
            match attempt() {
                Err(err) if err.is_retryable() => {
                    if retries >= self.policy.max_retries {
                        error!(operation, attempts = retries + 1, error = %err, "Retries exhausted");
                        return Err(ExchangeError::RetriesExhausted {
                            attempts: retries + 1,
                            reason: err.to_string(),
                        });
                    }
                    retries += 1;
                    warn!(operation, attempt = retries, error = %err, "Store contention, retrying");
                    thread::sleep(self.policy.backoff());
                }
                outcome => return outcome,
            }
        }
    }
}

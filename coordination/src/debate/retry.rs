//! Transport retry for outbound role calls.
//!
//! This budget covers transport failures only. Content retries (the
//! architect's single re-prompt) are counted separately by the orchestrator.

use std::future::Future;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::warn;

use super::error::{DebateError, TransportError};
use super::state::ParticipantRole;

/// Retry policy for transient transport failures.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    /// Maximum number of retry attempts after the first call (0 = no retries).
    pub max_retries: u32,
    /// Initial backoff delay in milliseconds.
    pub initial_backoff_ms: u64,
    /// Backoff multiplier (e.g., 2.0 for exponential).
    pub backoff_multiplier: f64,
    /// Maximum backoff delay in milliseconds.
    pub max_backoff_ms: u64,
}

impl RetryPolicy {
    /// Calculate the backoff delay for a given attempt number (0-indexed).
    pub fn backoff_ms(&self, attempt: u32) -> u64 {
        if attempt == 0 {
            return 0;
        }
        let delay =
            self.initial_backoff_ms as f64 * self.backoff_multiplier.powi(attempt as i32 - 1);
        (delay as u64).min(self.max_backoff_ms)
    }

    /// Whether another retry is allowed given the retries already spent.
    pub fn should_retry(&self, retries: u32) -> bool {
        retries < self.max_retries
    }

    /// Get the backoff as a Duration for a given attempt.
    pub fn backoff_duration(&self, attempt: u32) -> Duration {
        Duration::from_millis(self.backoff_ms(attempt))
    }

    /// No retries, no delay.
    pub fn none() -> Self {
        Self {
            max_retries: 0,
            initial_backoff_ms: 0,
            backoff_multiplier: 1.0,
            max_backoff_ms: 0,
        }
    }
}

impl Default for RetryPolicy {
    /// Default: 3 retries, 2s initial backoff, 2x multiplier, 16s max.
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_backoff_ms: 2_000,
            backoff_multiplier: 2.0,
            max_backoff_ms: 16_000,
        }
    }
}

/// Run `call` until it succeeds, fails permanently, or exhausts the policy.
///
/// Non-retryable transport errors escalate immediately.
pub async fn call_with_retry<T, F, Fut>(
    policy: &RetryPolicy,
    role: ParticipantRole,
    mut call: F,
) -> Result<T, DebateError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, TransportError>>,
{
    let mut attempt: u32 = 0;
    loop {
        if attempt > 0 {
            tokio::time::sleep(policy.backoff_duration(attempt)).await;
        }
        match call().await {
            Ok(value) => return Ok(value),
            Err(err) if err.retryable && policy.should_retry(attempt) => {
                attempt += 1;
                warn!(
                    %role,
                    attempt,
                    max_retries = policy.max_retries,
                    backoff_ms = policy.backoff_ms(attempt),
                    error = %err,
                    "Transient transport error, retrying"
                );
            }
            Err(err) => {
                return Err(DebateError::Transport {
                    role,
                    attempts: attempt + 1,
                    source: err,
                })
            }
        }
    }
}

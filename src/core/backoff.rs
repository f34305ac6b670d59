//! Polling engine for remote render jobs.
//!
//! Turns the tri-state stream of [`JobOutcome`]s into one result. Two wait
//! curves are kept apart on purpose:
//! - `NotReady` (cold start): wait `base_wait * attempt`, growing linearly
//! - `Failed` or a timed-out call: wait a flat `base_wait`
//!
//! Both share one attempt budget. The loop never makes more than
//! `max_attempts` calls and stops early on cancellation.

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::adapters::{JobOutcome, RemoteJobClient};
use crate::config::RetrySettings;
use crate::domain::{GenerationPrompt, RenderedMedia};

/// Reason reported when the budget runs out on a job that never loaded
pub const NOT_READY_EXHAUSTED: &str = "exhausted retries while job not ready";

/// Retry budget and pacing for one render
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackoffPolicy {
    /// Maximum number of remote calls, including the first
    pub max_attempts: u32,

    /// Unit of wait between attempts
    pub base_wait: Duration,

    /// Hard limit on a single remote call
    pub call_timeout: Duration,
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self::from(&RetrySettings::default())
    }
}

impl From<&RetrySettings> for BackoffPolicy {
    fn from(settings: &RetrySettings) -> Self {
        Self {
            max_attempts: settings.max_attempts,
            base_wait: settings.base_wait(),
            call_timeout: settings.timeout(),
        }
    }
}

impl BackoffPolicy {
    /// Wait after the `attempt`-th not-ready answer (1-indexed)
    pub fn not_ready_delay(&self, attempt: u32) -> Duration {
        self.base_wait.saturating_mul(attempt)
    }

    /// Wait after a failed or timed-out call
    pub fn failure_delay(&self) -> Duration {
        self.base_wait
    }

    /// Effective budget; a zero budget still makes one call
    pub fn attempt_budget(&self) -> u32 {
        self.max_attempts.max(1)
    }
}

/// Why no media came back
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BackoffError {
    #[error("video generation failed after {attempts} attempts: {reason}")]
    Exhausted { attempts: u32, reason: String },

    #[error("cancelled after {attempts} attempts")]
    Cancelled { attempts: u32 },
}

/// Bounded, cancellable polling over a [`RemoteJobClient`]
pub struct PollingBackoffEngine {
    client: Arc<dyn RemoteJobClient>,
    policy: BackoffPolicy,
}

impl PollingBackoffEngine {
    pub fn new(client: Arc<dyn RemoteJobClient>, policy: BackoffPolicy) -> Self {
        Self { client, policy }
    }

    pub fn policy(&self) -> &BackoffPolicy {
        &self.policy
    }

    /// Poll until media is ready, the budget is spent, or `cancel` fires
    pub async fn await_media(
        &self,
        prompt: &GenerationPrompt,
        cancel: &CancellationToken,
    ) -> Result<RenderedMedia, BackoffError> {
        let max_attempts = self.policy.attempt_budget();
        let mut attempt = 0u32;

        info!(prompt = %prompt.preview(80), max_attempts, "Generating video");

        loop {
            if cancel.is_cancelled() {
                return Err(BackoffError::Cancelled { attempts: attempt });
            }

            let outcome = tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    return Err(BackoffError::Cancelled { attempts: attempt });
                }
                result = timeout(self.policy.call_timeout, self.client.submit_or_poll(prompt)) => {
                    result.unwrap_or_else(|_| {
                        JobOutcome::Failed(format!(
                            "remote call timed out after {}s",
                            self.policy.call_timeout.as_secs_f64()
                        ))
                    })
                }
            };

            let delay = match outcome {
                JobOutcome::Ready(media) => {
                    info!(
                        attempts = attempt + 1,
                        size_bytes = media.len(),
                        "Video generated"
                    );
                    return Ok(media);
                }
                JobOutcome::NotReady => {
                    attempt += 1;
                    if attempt == max_attempts {
                        warn!(attempt, "Giving up: job never became ready");
                        return Err(BackoffError::Exhausted {
                            attempts: attempt,
                            reason: NOT_READY_EXHAUSTED.to_string(),
                        });
                    }
                    let delay = self.policy.not_ready_delay(attempt);
                    info!(
                        attempt,
                        max_attempts,
                        wait_secs = delay.as_secs_f64(),
                        "Model loading, retrying"
                    );
                    delay
                }
                JobOutcome::Failed(reason) => {
                    attempt += 1;
                    if attempt == max_attempts {
                        warn!(attempt, %reason, "Giving up after repeated failures");
                        return Err(BackoffError::Exhausted {
                            attempts: attempt,
                            reason,
                        });
                    }
                    let delay = self.policy.failure_delay();
                    warn!(
                        attempt,
                        max_attempts,
                        wait_secs = delay.as_secs_f64(),
                        %reason,
                        "Render call failed, retrying"
                    );
                    delay
                }
            };

            tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    debug!(attempt, "Cancelled during backoff");
                    return Err(BackoffError::Cancelled { attempts: attempt });
                }
                _ = tokio::time::sleep(delay) => {}
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_ready_delay_is_linear() {
        let policy = BackoffPolicy {
            max_attempts: 10,
            base_wait: Duration::from_secs(20),
            call_timeout: Duration::from_secs(300),
        };

        assert_eq!(policy.not_ready_delay(1), Duration::from_secs(20));
        assert_eq!(policy.not_ready_delay(2), Duration::from_secs(40));
        assert_eq!(policy.not_ready_delay(5), Duration::from_secs(100));
    }

    #[test]
    fn test_failure_delay_is_flat() {
        let policy = BackoffPolicy::default();
        assert_eq!(policy.failure_delay(), policy.base_wait);
    }

    #[test]
    fn test_policy_from_settings() {
        let policy = BackoffPolicy::from(&RetrySettings {
            max_attempts: 4,
            base_wait_secs: 3,
            timeout_secs: 30,
        });

        assert_eq!(policy.max_attempts, 4);
        assert_eq!(policy.base_wait, Duration::from_secs(3));
        assert_eq!(policy.call_timeout, Duration::from_secs(30));
    }

    #[test]
    fn test_zero_budget_still_tries_once() {
        let policy = BackoffPolicy {
            max_attempts: 0,
            ..Default::default()
        };
        assert_eq!(policy.attempt_budget(), 1);
    }
}

//! Per-attempt timeout and bounded retry of transient failures.

use std::time::Duration;

use async_trait::async_trait;
use tokio::time::{sleep, timeout};
use tracing::{debug, warn};

use crate::client::TextGenerator;
use crate::error::LlmError;

/// How a [`Retrying`] generator times out and retries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries after the first attempt.
    pub max_retries: u32,
    /// Delay before the first retry.
    pub base_delay: Duration,
    /// Upper bound on any single delay.
    pub max_delay: Duration,
    /// Time allowed for each attempt.
    pub attempt_timeout: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 2,
            base_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(10),
            attempt_timeout: Duration::from_secs(30),
        }
    }
}

impl RetryPolicy {
    /// A policy that makes exactly one attempt.
    pub fn no_retries() -> Self {
        Self {
            max_retries: 0,
            ..Default::default()
        }
    }

    /// Builder method to set the retry count.
    pub fn with_max_retries(mut self, retries: u32) -> Self {
        self.max_retries = retries;
        self
    }

    /// Builder method to set the first retry delay.
    pub fn with_base_delay(mut self, delay: Duration) -> Self {
        self.base_delay = delay;
        self
    }

    /// Builder method to cap the retry delay.
    pub fn with_max_delay(mut self, delay: Duration) -> Self {
        self.max_delay = delay;
        self
    }

    /// Builder method to set the per-attempt timeout.
    pub fn with_attempt_timeout(mut self, limit: Duration) -> Self {
        self.attempt_timeout = limit;
        self
    }

    /// Delay before retry number `retry` (1-based): `base * 2^(retry-1)`,
    /// capped at `max_delay`.
    pub fn backoff(&self, retry: u32) -> Duration {
        let factor = 2u32.checked_pow(retry.saturating_sub(1)).unwrap_or(u32::MAX);
        self.base_delay
            .checked_mul(factor)
            .unwrap_or(self.max_delay)
            .min(self.max_delay)
    }
}

/// Wraps a generator with a timeout per attempt and bounded retries.
///
/// Only errors for which [`LlmError::is_transient`] holds are retried. The
/// final error is returned unchanged.
#[derive(Debug, Clone)]
pub struct Retrying<G> {
    inner: G,
    policy: RetryPolicy,
}

impl<G: TextGenerator> Retrying<G> {
    /// Wrap `inner` with `policy`.
    pub fn new(inner: G, policy: RetryPolicy) -> Self {
        Self { inner, policy }
    }

    /// The wrapped generator.
    pub fn inner(&self) -> &G {
        &self.inner
    }

    /// The retry policy.
    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    async fn attempt(&self, prompt: &str) -> Result<String, LlmError> {
        match timeout(self.policy.attempt_timeout, self.inner.generate(prompt)).await {
            Ok(result) => result,
            Err(_) => Err(LlmError::Timeout),
        }
    }
}

#[async_trait]
impl<G: TextGenerator> TextGenerator for Retrying<G> {
    async fn generate(&self, prompt: &str) -> Result<String, LlmError> {
        let mut retries = 0;
        loop {
            match self.attempt(prompt).await {
                Ok(reply) => {
                    if retries > 0 {
                        debug!(retries, "Collaborator call succeeded after retry");
                    }
                    return Ok(reply);
                }
                Err(err) if err.is_transient() && retries < self.policy.max_retries => {
                    retries += 1;
                    let delay = self.policy.backoff(retries);
                    warn!(
                        error = %err,
                        retry = retries,
                        delay_ms = delay.as_millis() as u64,
                        "Transient collaborator failure, retrying"
                    );
                    sleep(delay).await;
                }
                Err(err) => return Err(err),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scripted::ScriptedGenerator;

    fn fast_policy() -> RetryPolicy {
        RetryPolicy::default()
            .with_base_delay(Duration::from_millis(1))
            .with_attempt_timeout(Duration::from_secs(5))
    }

    #[test]
    fn test_backoff_doubles_and_caps() {
        let policy = RetryPolicy::default()
            .with_base_delay(Duration::from_millis(100))
            .with_max_delay(Duration::from_millis(350));

        assert_eq!(policy.backoff(1), Duration::from_millis(100));
        assert_eq!(policy.backoff(2), Duration::from_millis(200));
        assert_eq!(policy.backoff(3), Duration::from_millis(350));
        assert_eq!(policy.backoff(60), Duration::from_millis(350));
    }

    #[tokio::test]
    async fn test_retries_transient_then_succeeds() {
        let generator = Retrying::new(
            ScriptedGenerator::new()
                .error(LlmError::Timeout)
                .error(LlmError::Status(502))
                .reply("A3"),
            fast_policy(),
        );

        assert_eq!(generator.generate("classify").await.unwrap(), "A3");
        assert_eq!(generator.inner().calls(), 3);
    }

    #[tokio::test]
    async fn test_gives_up_after_bound() {
        let generator = Retrying::new(
            ScriptedGenerator::new()
                .error(LlmError::Timeout)
                .error(LlmError::Timeout)
                .error(LlmError::Timeout)
                .reply("too late"),
            fast_policy(),
        );

        assert_eq!(generator.generate("p").await, Err(LlmError::Timeout));
        assert_eq!(generator.inner().calls(), 3);
    }

    #[tokio::test]
    async fn test_permanent_errors_are_not_retried() {
        let generator = Retrying::new(
            ScriptedGenerator::new()
                .error(LlmError::Status(401))
                .reply("unused"),
            fast_policy(),
        );

        assert_eq!(generator.generate("p").await, Err(LlmError::Status(401)));
        assert_eq!(generator.inner().calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_attempt_times_out_and_is_retried() {
        let generator = Retrying::new(
            ScriptedGenerator::new()
                .delayed_reply(Duration::from_secs(60), "slow")
                .reply("fast"),
            RetryPolicy::default().with_attempt_timeout(Duration::from_secs(1)),
        );

        assert_eq!(generator.generate("p").await.unwrap(), "fast");
        assert_eq!(generator.inner().calls(), 2);
    }
}

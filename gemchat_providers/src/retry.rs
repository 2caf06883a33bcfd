use async_trait::async_trait;
use gemchat_core::{AnswerSource, GenerateFailure, GenerationError, TextGenerator};
use std::time::Duration;
use tokio::time::sleep;
use tracing::{error, info, warn};

/// Bounded retry policy for rate-limited generation calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total number of calls allowed, including the first.
    pub max_attempts: u32,
    /// Wait before retrying after an HTTP 429.
    pub rate_limit_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            rate_limit_delay: Duration::from_secs(15),
        }
    }
}

/// Sends one message to a [`TextGenerator`] and retries only on rate limits.
///
/// Every other failure ends the request immediately. The wait between
/// attempts is an awaited timer, so dropping the future cancels it and only
/// the calling task is suspended.
pub struct AnswerFetcher<G> {
    generator: G,
    policy: RetryPolicy,
}

impl<G: TextGenerator> AnswerFetcher<G> {
    pub fn new(generator: G) -> Self {
        Self {
            generator,
            policy: RetryPolicy::default(),
        }
    }

    #[must_use]
    pub const fn with_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub const fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    pub const fn generator(&self) -> &G {
        &self.generator
    }

    /// Obtain the generated text for `message`.
    pub async fn fetch_answer(&self, message: &str) -> Result<String, GenerationError> {
        let max_attempts = self.policy.max_attempts;
        let mut attempts = 0u32;

        while attempts < max_attempts {
            match self.generator.generate(message).await {
                Ok(text) if !text.is_empty() => {
                    info!(
                        "Received answer from {} after {} rate-limited attempt(s)",
                        self.generator.model(),
                        attempts
                    );
                    return Ok(text);
                }
                Ok(_) | Err(GenerateFailure::InvalidPayload) => {
                    error!("Generation API returned an invalid or empty response");
                    return Err(GenerationError::InvalidResponse);
                }
                Err(GenerateFailure::RateLimited) => {
                    attempts += 1;
                    if attempts < max_attempts {
                        warn!(
                            "Rate limit exceeded (attempt {attempts}/{max_attempts}). Waiting {}s...",
                            self.policy.rate_limit_delay.as_secs()
                        );
                        sleep(self.policy.rate_limit_delay).await;
                    } else {
                        warn!("Rate limit exceeded (attempt {attempts}/{max_attempts}). No attempts left");
                    }
                }
                Err(e @ GenerateFailure::Transport { .. }) => {
                    error!("Connection error with generation API: {e}");
                    return Err(GenerationError::Connection);
                }
                Err(GenerateFailure::Other(e)) => {
                    error!("Error communicating with generation API: {e}");
                    return Err(GenerationError::Communication);
                }
            }
        }

        error!("Failed to obtain an answer after {attempts} attempts");
        Err(GenerationError::RetriesExhausted { attempts })
    }
}

#[async_trait]
impl<G: TextGenerator> AnswerSource for AnswerFetcher<G> {
    async fn fetch_answer(&self, message: &str) -> Result<String, GenerationError> {
        Self::fetch_answer(self, message).await
    }
}

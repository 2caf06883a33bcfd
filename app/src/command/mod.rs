//! Static strategy pattern for CLI commands.
//!
//! Each command is a separate strategy type with its own input, dispatched
//! statically from `main`.

use anyhow::Context;
use gemchat_config::Config;
use gemchat_providers::{AnswerFetcher, GeminiProvider, RetryPolicy};
use tracing::info;

mod ask;
mod info;
mod init;
mod serve;
mod version;

pub use ask::{AskInput, AskStrategy};
pub use info::InfoStrategy;
pub use init::InitStrategy;
pub use serve::{ServeInput, ServeStrategy};
pub use version::VersionStrategy;

/// Contract for all command strategies.
pub trait CommandStrategy: Send + Sync + 'static {
    /// The input type this strategy accepts.
    type Input;

    /// Execute the command with the given input.
    async fn execute(&self, input: Self::Input) -> anyhow::Result<()>;
}

/// Build the retrying answer fetcher from configuration.
///
/// Fails when the API key is missing or the client cannot be constructed;
/// both are fatal at startup.
fn build_answer_fetcher(config: &Config) -> anyhow::Result<AnswerFetcher<GeminiProvider>> {
    let api_key = config.require_api_key()?.to_string();

    let provider = GeminiProvider::new(api_key, Some(config.provider.model.clone()))
        .context("Failed to create Gemini client")?
        .with_base_url(config.provider.base_url.clone());

    let policy = RetryPolicy {
        max_attempts: config.retry.max_attempts,
        rate_limit_delay: config.retry.rate_limit_delay(),
    };
    info!(
        "Retry policy: {} attempts, {}s rate-limit delay",
        policy.max_attempts,
        policy.rate_limit_delay.as_secs()
    );

    Ok(AnswerFetcher::new(provider).with_policy(policy))
}

/// Load configuration and apply an optional model override.
fn load_config(model: Option<String>) -> anyhow::Result<Config> {
    let mut config = Config::load()?;
    if let Some(model) = model {
        config.provider.model = model;
    }
    config.validate()?;
    Ok(config)
}

use gemchat_core::util::escape_html;

use super::{build_answer_fetcher, load_config};

/// Input for the Ask command.
#[derive(Debug, Clone)]
pub struct AskInput {
    /// Message to send
    pub message: String,
    /// Optional model override
    pub model: Option<String>,
}

/// Strategy for sending one message from the command line.
///
/// Goes through the same escaping and retry policy as the web handler, but
/// keeps no transcript.
#[derive(Debug, Clone, Copy)]
pub struct AskStrategy;

impl super::CommandStrategy for AskStrategy {
    type Input = AskInput;

    async fn execute(&self, input: Self::Input) -> anyhow::Result<()> {
        if input.message.is_empty() {
            anyhow::bail!("Message must not be empty");
        }

        let config = load_config(input.model)?;
        let fetcher = build_answer_fetcher(&config)?;

        let answer = fetcher.fetch_answer(&escape_html(&input.message)).await?;
        println!("{answer}");
        Ok(())
    }
}

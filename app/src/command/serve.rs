use gemchat_web::ChatServer;
use std::sync::Arc;
use tracing::info;

use super::{build_answer_fetcher, load_config};

/// Input for the Serve command.
#[derive(Debug, Clone)]
pub struct ServeInput {
    /// Optional listen address override
    pub bind: Option<String>,
    /// Optional model override
    pub model: Option<String>,
}

/// Strategy for running the web chat server.
#[derive(Debug, Clone, Copy)]
pub struct ServeStrategy;

impl super::CommandStrategy for ServeStrategy {
    type Input = ServeInput;

    async fn execute(&self, input: Self::Input) -> anyhow::Result<()> {
        let mut config = load_config(input.model)?;
        if let Some(bind) = input.bind {
            config.server.bind = bind;
        }
        let addr = config.server.bind_addr()?;

        let fetcher = build_answer_fetcher(&config)?;
        info!("Using model {}", config.provider.model);

        let server = ChatServer::new(Arc::new(fetcher), config.session.clone());
        server.run(addr).await?;

        Ok(())
    }
}

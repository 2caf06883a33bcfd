use thiserror::Error;

/// Recoverable failure while obtaining an answer for a user message.
///
/// The `Display` text is the reason shown to the user.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GenerationError {
    #[error("invalid or empty response")]
    InvalidResponse,

    #[error("connection error")]
    Connection,

    #[error("communication error")]
    Communication,

    #[error("failed after multiple attempts")]
    RetriesExhausted { attempts: u32 },
}

/// Fatal startup failure: the process cannot serve without a working
/// credential and generation client.
#[derive(Debug, Error)]
pub enum ConfigurationError {
    #[error("{0} is not set; add it to the environment or a .env file")]
    MissingApiKey(&'static str),

    #[error("Invalid configuration value for `{field}`: {reason}")]
    InvalidValue { field: &'static str, reason: String },

    #[error("Failed to build generation client: {0}")]
    ClientBuild(String),

    #[error("Failed to parse config file: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

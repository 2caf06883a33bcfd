#![deny(
    clippy::all,
    clippy::nursery,
    clippy::pedantic,
    clippy::style,
    clippy::complexity,
    clippy::perf,
    clippy::correctness,
    clippy::suspicious,
    clippy::unwrap_used,
    clippy::expect_used
)]
#![allow(
    clippy::similar_names,
    clippy::missing_safety_doc,
    clippy::missing_panics_doc,
    clippy::missing_errors_doc
)]

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

pub mod conversation;
pub mod error;
pub mod transcript;
pub mod util;

pub use conversation::{Submission, handle_submission, reset};
pub use error::{ConfigurationError, GenerationError};
pub use transcript::{MessageEntry, Transcript};

/// Outcome of a single remote generation call, classified as data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GenerateFailure {
    /// HTTP 429 from the provider.
    RateLimited,
    /// Transport-level failure; `status` is `None` when no response arrived.
    Transport {
        status: Option<u16>,
        message: String,
    },
    /// The provider answered but without usable text.
    InvalidPayload,
    /// Anything else, such as an undecodable body.
    Other(String),
}

impl std::fmt::Display for GenerateFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::RateLimited => write!(f, "rate limited (HTTP 429)"),
            Self::Transport {
                status: Some(code),
                message,
            } => write!(f, "transport error (HTTP {code}): {message}"),
            Self::Transport {
                status: None,
                message,
            } => write!(f, "transport error: {message}"),
            Self::InvalidPayload => write!(f, "invalid or empty payload"),
            Self::Other(message) => write!(f, "{message}"),
        }
    }
}

/// A remote text-in/text-out generation service.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate(&self, text: &str) -> Result<String, GenerateFailure>;
    fn model(&self) -> &str;
}

/// Something that turns one user message into one answer.
#[async_trait]
pub trait AnswerSource: Send + Sync {
    async fn fetch_answer(&self, message: &str) -> Result<String, GenerationError>;
}

/// Serialized view of a transcript handed to renderers and API clients.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChatView {
    pub messages: Vec<MessageEntry>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

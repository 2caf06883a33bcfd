//! Per-session chat transcript.
//!
//! A transcript only grows in question/answer pairs, so the type exposes no
//! way to push a lone entry.

use serde::{Deserialize, Serialize};

/// One unit of transcript content.
///
/// Serialized as `{"is_user": true, "q": ...}` or `{"is_user": false, "a": ...}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "RawEntry", try_from = "RawEntry")]
pub enum MessageEntry {
    Question { question: String },
    Answer { answer: String },
}

impl MessageEntry {
    #[must_use]
    pub const fn is_user(&self) -> bool {
        matches!(self, Self::Question { .. })
    }

    #[must_use]
    pub fn text(&self) -> &str {
        match self {
            Self::Question { question } => question,
            Self::Answer { answer } => answer,
        }
    }
}

#[derive(Serialize, Deserialize)]
struct RawEntry {
    is_user: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    q: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    a: Option<String>,
}

impl From<MessageEntry> for RawEntry {
    fn from(entry: MessageEntry) -> Self {
        match entry {
            MessageEntry::Question { question } => Self {
                is_user: true,
                q: Some(question),
                a: None,
            },
            MessageEntry::Answer { answer } => Self {
                is_user: false,
                q: None,
                a: Some(answer),
            },
        }
    }
}

impl TryFrom<RawEntry> for MessageEntry {
    type Error = String;

    fn try_from(raw: RawEntry) -> Result<Self, Self::Error> {
        match (raw.is_user, raw.q, raw.a) {
            (true, Some(question), _) => Ok(Self::Question { question }),
            (false, _, Some(answer)) => Ok(Self::Answer { answer }),
            (true, None, _) => Err("user entry without `q`".to_string()),
            (false, _, None) => Err("answer entry without `a`".to_string()),
        }
    }
}

/// Ordered question/answer history of one session.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Transcript {
    entries: Vec<MessageEntry>,
}

impl Transcript {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    #[must_use]
    pub fn entries(&self) -> &[MessageEntry] {
        &self.entries
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Text of the most recent answer, if any.
    #[must_use]
    pub fn last_answer(&self) -> Option<&str> {
        self.entries.iter().rev().find_map(|entry| match entry {
            MessageEntry::Answer { answer } => Some(answer.as_str()),
            MessageEntry::Question { .. } => None,
        })
    }

    /// Append a question followed by its answer.
    pub fn push_exchange(&mut self, question: String, answer: String) {
        self.entries.reserve(2);
        self.entries.push(MessageEntry::Question { question });
        self.entries.push(MessageEntry::Answer { answer });
    }

    pub fn into_entries(self) -> Vec<MessageEntry> {
        self.entries
    }
}

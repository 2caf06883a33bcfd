//! Conversation store operations.
//!
//! The transcript is passed in and handed back explicitly; the hosting layer
//! decides where it lives between requests.

use tracing::{debug, error, info};

use crate::util::escape_html;
use crate::{AnswerSource, ChatView, Transcript};

/// Result of handling one chat submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Submission {
    /// Transcript after the submission.
    pub transcript: Transcript,
    /// User-facing error text when no answer could be produced.
    pub error: Option<String>,
    /// Whether the transcript was changed and must be stored back.
    pub modified: bool,
}

impl Submission {
    const fn unchanged(transcript: Transcript) -> Self {
        Self {
            transcript,
            error: None,
            modified: false,
        }
    }

    #[must_use]
    pub fn into_view(self) -> ChatView {
        ChatView {
            messages: self.transcript.into_entries(),
            error: self.error,
        }
    }
}

/// Handle a chat submission against a session transcript.
///
/// An absent or empty message leaves the transcript untouched. Otherwise the
/// message is HTML-escaped and sent to `source`. A successful answer is
/// appended together with its question, unless it equals the last stored
/// answer: a repeated identical answer is absorbed, which covers a form
/// submitted twice but also hides a genuinely repeated answer to a different
/// question.
pub async fn handle_submission<S>(
    transcript: Transcript,
    raw_message: Option<&str>,
    source: &S,
) -> Submission
where
    S: AnswerSource + ?Sized,
{
    let Some(raw) = raw_message.filter(|m| !m.is_empty()) else {
        return Submission::unchanged(transcript);
    };

    let question = escape_html(raw);

    match source.fetch_answer(&question).await {
        Ok(answer) => {
            let mut transcript = transcript;
            if transcript.last_answer() == Some(answer.as_str()) {
                debug!("Answer identical to the previous one, not appending");
                return Submission::unchanged(transcript);
            }
            transcript.push_exchange(question, answer);
            info!("Transcript now holds {} entries", transcript.len());
            Submission {
                transcript,
                error: None,
                modified: true,
            }
        }
        Err(e) => {
            error!("Chat submission failed: {e}");
            Submission {
                transcript,
                error: Some(format!("An error occurred: {e}")),
                modified: false,
            }
        }
    }
}

/// Clear a transcript.
#[must_use]
pub fn reset(transcript: Transcript) -> Transcript {
    if !transcript.is_empty() {
        info!("Resetting transcript with {} entries", transcript.len());
    }
    Transcript::new()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::GenerationError;
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Replays scripted answers in order.
    struct ScriptedSource {
        replies: Mutex<VecDeque<Result<String, GenerationError>>>,
        calls: AtomicUsize,
        seen: Mutex<Vec<String>>,
    }

    impl ScriptedSource {
        fn new(replies: Vec<Result<String, GenerationError>>) -> Self {
            Self {
                replies: Mutex::new(replies.into()),
                calls: AtomicUsize::new(0),
                seen: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl AnswerSource for ScriptedSource {
        async fn fetch_answer(&self, message: &str) -> Result<String, GenerationError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.seen.lock().unwrap().push(message.to_string());
            self.replies
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or(Err(GenerationError::Communication))
        }
    }

    #[tokio::test]
    async fn successful_submission_appends_one_pair() {
        let source = ScriptedSource::new(vec![Ok("Paris".to_string())]);

        let result = handle_submission(Transcript::new(), Some("capital?"), &source).await;

        assert!(result.modified);
        assert!(result.error.is_none());
        assert_eq!(result.transcript.len(), 2);
        assert_eq!(result.transcript.entries()[0].text(), "capital?");
        assert_eq!(result.transcript.entries()[1].text(), "Paris");
    }

    #[tokio::test]
    async fn empty_or_absent_message_is_a_no_op() {
        let source = ScriptedSource::new(vec![]);
        let mut transcript = Transcript::new();
        transcript.push_exchange("a".to_string(), "b".to_string());

        let result = handle_submission(transcript.clone(), None, &source).await;
        assert_eq!(result.transcript, transcript);
        assert!(!result.modified);

        let result = handle_submission(transcript.clone(), Some(""), &source).await;
        assert_eq!(result.transcript, transcript);
        assert!(!result.modified);

        assert_eq!(source.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn message_is_escaped_before_fetching_and_storing() {
        let source = ScriptedSource::new(vec![Ok("ok".to_string())]);

        let result = handle_submission(Transcript::new(), Some("<script>"), &source).await;

        assert_eq!(source.seen.lock().unwrap()[0], "&lt;script&gt;");
        assert_eq!(result.transcript.entries()[0].text(), "&lt;script&gt;");
    }

    #[tokio::test]
    async fn identical_consecutive_answer_is_absorbed() {
        let source = ScriptedSource::new(vec![Ok("same".to_string()), Ok("same".to_string())]);

        let first = handle_submission(Transcript::new(), Some("hello"), &source).await;
        let second = handle_submission(first.transcript, Some("hello"), &source).await;

        assert_eq!(second.transcript.len(), 2);
        assert!(!second.modified);
        assert!(second.error.is_none());
    }

    #[tokio::test]
    async fn different_answer_is_appended_after_existing_pairs() {
        let source = ScriptedSource::new(vec![Ok("one".to_string()), Ok("two".to_string())]);

        let first = handle_submission(Transcript::new(), Some("q1"), &source).await;
        let second = handle_submission(first.transcript, Some("q2"), &source).await;

        assert_eq!(second.transcript.len(), 4);
        assert_eq!(second.transcript.last_answer(), Some("two"));
    }

    #[tokio::test]
    async fn generation_error_leaves_transcript_unchanged() {
        let source = ScriptedSource::new(vec![Err(GenerationError::Connection)]);
        let mut transcript = Transcript::new();
        transcript.push_exchange("a".to_string(), "b".to_string());

        let result = handle_submission(transcript.clone(), Some("q"), &source).await;

        assert_eq!(result.transcript, transcript);
        assert!(!result.modified);
        assert_eq!(
            result.error.as_deref(),
            Some("An error occurred: connection error")
        );
    }

    #[test]
    fn reset_empties_transcript() {
        let mut transcript = Transcript::new();
        for i in 0..3 {
            transcript.push_exchange(format!("q{i}"), format!("a{i}"));
        }
        assert_eq!(transcript.len(), 6);

        assert!(reset(transcript).is_empty());
    }

    #[test]
    fn view_carries_entries_and_error() {
        let mut transcript = Transcript::new();
        transcript.push_exchange("q".to_string(), "a".to_string());
        let submission = Submission {
            transcript,
            error: Some("boom".to_string()),
            modified: false,
        };

        let view = submission.into_view();
        assert_eq!(view.messages.len(), 2);
        assert_eq!(view.error.as_deref(), Some("boom"));
    }
}

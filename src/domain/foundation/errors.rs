//! Error types for the domain layer.

use thiserror::Error;

use super::{ConversationId, QuestionId};

/// Errors raised when an operation would break a conversation invariant,
/// or when caller-supplied identifiers do not line up with the aggregate.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Field '{field}' cannot be empty")]
    EmptyField { field: String },

    #[error("Field '{field}' has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },

    #[error("conversation_id {actual} doesn't match conversation {expected} of the current interview")]
    ConversationMismatch {
        expected: ConversationId,
        actual: ConversationId,
    },

    #[error("Topic {topic} not found")]
    TopicNotFound { topic: u32 },

    #[error("Question {question_id} not found in topic {topic}")]
    QuestionNotFound { topic: u32, question_id: QuestionId },

    #[error("Question number {question_number} not found in topic {topic}")]
    QuestionNumberNotFound { topic: u32, question_number: u32 },

    #[error("Question {question_id} is number {actual}, not {expected}")]
    QuestionNumberMismatch {
        question_id: QuestionId,
        expected: u32,
        actual: u32,
    },

    #[error("{kind} numbering must be contiguous: expected {expected}, got {actual}")]
    NonContiguousNumbering {
        kind: &'static str,
        expected: u32,
        actual: u32,
    },

    #[error("Question {question_id} must open with the interviewer's prompt")]
    PromptRequired { question_id: QuestionId },

    #[error("Message belongs to question {actual}, not {expected}")]
    ForeignMessage {
        expected: QuestionId,
        actual: QuestionId,
    },

    #[error("Expected {expected} message ids, got {actual}")]
    MessageIdCountMismatch { expected: usize, actual: usize },
}

impl ValidationError {
    /// Creates an empty field validation error.
    pub fn empty_field(field: impl Into<String>) -> Self {
        ValidationError::EmptyField {
            field: field.into(),
        }
    }

    /// Creates an invalid format validation error.
    pub fn invalid_format(field: impl Into<String>, reason: impl Into<String>) -> Self {
        ValidationError::InvalidFormat {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// Fails with `EmptyField` when `value` is blank.
    pub fn require_text(field: &str, value: &str) -> Result<(), ValidationError> {
        if value.trim().is_empty() {
            return Err(Self::empty_field(field));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_field_displays_correctly() {
        let err = ValidationError::empty_field("content");
        assert_eq!(err.to_string(), "Field 'content' cannot be empty");
    }

    #[test]
    fn conversation_mismatch_names_both_ids() {
        let err = ValidationError::ConversationMismatch {
            expected: ConversationId::new(1),
            actual: ConversationId::new(2),
        };
        assert_eq!(
            err.to_string(),
            "conversation_id 2 doesn't match conversation 1 of the current interview"
        );
    }

    #[test]
    fn require_text_rejects_whitespace() {
        assert!(ValidationError::require_text("prompt", "  \n\t").is_err());
        assert!(ValidationError::require_text("prompt", "What is a heap?").is_ok());
    }
}

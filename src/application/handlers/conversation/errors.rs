//! Errors surfaced by the conversation handlers.

use std::time::Duration;
use thiserror::Error;

use crate::domain::conversation::TranscriptError;
use crate::domain::foundation::ValidationError;
use crate::ports::{AIError, RepositoryError};

/// Handler step names, attached to repository failures and log events.
pub mod step {
    pub const CHECK_FOR_CONVERSATION: &str = "check_for_conversation";
    pub const CREATE_CONVERSATION: &str = "create_conversation";
    pub const CREATE_QUESTION: &str = "create_question";
    pub const CREATE_MESSAGES: &str = "create_messages";
    pub const ADD_MESSAGE: &str = "add_message";
    pub const GET_CONVERSATION: &str = "get_conversation";
    pub const GET_QUESTION: &str = "get_question";
    pub const GET_MESSAGES: &str = "get_messages";
}

/// Errors that can occur while creating, appending to, or loading a conversation.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConversationError {
    /// Persistence collaborator failed; `step` names the call that failed.
    #[error("repository error during {step}: {source}")]
    Repository {
        step: &'static str,
        source: RepositoryError,
    },

    /// Caller-supplied identifiers or content do not fit the aggregate.
    #[error("validation failed: {0}")]
    Validation(#[from] ValidationError),

    /// The requested topic/question does not exist when building history.
    #[error("transcript error: {0}")]
    Transcript(#[from] TranscriptError),

    /// The completion API could not be reached.
    #[error("completion transport error: {0}")]
    CompletionTransport(String),

    /// The completion API answered, but not with a usable question.
    #[error("completion protocol error: {0}")]
    CompletionProtocol(String),

    /// No answer arrived before the deadline; the request was cancelled.
    #[error("completion timed out after {0:?}")]
    CompletionTimeout(Duration),
}

impl ConversationError {
    pub fn repository(step: &'static str, source: RepositoryError) -> Self {
        Self::Repository { step, source }
    }

    /// Stable code for the HTTP layer.
    pub fn code(&self) -> &'static str {
        match self {
            ConversationError::Repository { .. } => "REPOSITORY_ERROR",
            ConversationError::Validation(_) => "VALIDATION_FAILED",
            ConversationError::Transcript(_) => "TRANSCRIPT_ERROR",
            ConversationError::CompletionTransport(_) => "COMPLETION_TRANSPORT",
            ConversationError::CompletionProtocol(_) => "COMPLETION_PROTOCOL",
            ConversationError::CompletionTimeout(_) => "COMPLETION_TIMEOUT",
        }
    }

    /// Returns true if the completion call failed.
    pub fn is_completion_failure(&self) -> bool {
        matches!(
            self,
            ConversationError::CompletionTransport(_)
                | ConversationError::CompletionProtocol(_)
                | ConversationError::CompletionTimeout(_)
        )
    }
}

impl From<AIError> for ConversationError {
    fn from(err: AIError) -> Self {
        match err {
            AIError::Network(_) | AIError::InvalidRequest(_) => {
                ConversationError::CompletionTransport(err.to_string())
            }
            AIError::Timeout { timeout_ms } => {
                ConversationError::CompletionTimeout(Duration::from_millis(timeout_ms))
            }
            AIError::Status { .. } | AIError::Parse(_) => {
                ConversationError::CompletionProtocol(err.to_string())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::foundation::ConversationId;

    #[test]
    fn codes_are_stable() {
        let mismatch = ConversationError::from(ValidationError::ConversationMismatch {
            expected: ConversationId::new(1),
            actual: ConversationId::new(2),
        });
        assert_eq!(mismatch.code(), "VALIDATION_FAILED");
        assert_eq!(
            ConversationError::repository(step::ADD_MESSAGE, RepositoryError::database("down")).code(),
            "REPOSITORY_ERROR"
        );
        assert_eq!(
            ConversationError::CompletionTimeout(Duration::from_secs(1)).code(),
            "COMPLETION_TIMEOUT"
        );
    }

    #[test]
    fn repository_error_names_the_step() {
        let err = ConversationError::repository(step::CREATE_QUESTION, RepositoryError::database("pool closed"));
        assert_eq!(
            err.to_string(),
            "repository error during create_question: database error: pool closed"
        );
    }

    #[test]
    fn provider_errors_map_to_completion_kinds() {
        let status: ConversationError = AIError::status(500, "boom").into();
        assert_eq!(
            status,
            ConversationError::CompletionProtocol("API call failed with status code: 500".to_string())
        );

        let parse: ConversationError = AIError::parse("no choices").into();
        assert!(matches!(parse, ConversationError::CompletionProtocol(_)));

        let network: ConversationError = AIError::network("dns").into();
        assert!(matches!(network, ConversationError::CompletionTransport(_)));

        let timeout: ConversationError = AIError::Timeout { timeout_ms: 1500 }.into();
        assert_eq!(timeout, ConversationError::CompletionTimeout(Duration::from_millis(1500)));
        assert!(timeout.is_completion_failure());
    }
}

//! Conversation repository port.
//!
//! Durable persistence for conversations, questions and messages.
//!
//! # Design
//!
//! - **Identity**: the repository assigns every id
//! - **Minimal shape**: only the conversation shell, question records and
//!   messages are stored; topic scaffolding comes from the catalog on load
//! - **Ordering**: messages of a question are returned oldest first
//! - **Serialization**: implementations must serialize concurrent appends to
//!   the same question so no message is lost and positions stay unique

use crate::domain::conversation::{Conversation, Message, NewMessage};
use crate::domain::foundation::{
    ConversationId, InterviewId, MessageId, QuestionId, Timestamp,
};
use async_trait::async_trait;
use thiserror::Error;

/// Repository port for the conversation aggregate.
#[async_trait]
pub trait ConversationRepository: Send + Sync {
    /// Check if a conversation already exists for an interview.
    async fn exists_for_interview(&self, interview_id: InterviewId) -> Result<bool, RepositoryError>;

    /// Persist the conversation shell and return its new id.
    ///
    /// # Errors
    ///
    /// - `Conflict` if the interview already has a conversation
    async fn create_conversation(
        &self,
        conversation: &Conversation,
    ) -> Result<ConversationId, RepositoryError>;

    /// Persist a question record and return its new id.
    async fn create_question(
        &self,
        conversation: &Conversation,
        topic_number: u32,
        question_number: u32,
        prompt: &str,
    ) -> Result<QuestionId, RepositoryError>;

    /// Persist an ordered batch of messages for a question.
    ///
    /// Returns the assigned ids in the same order as `messages`.
    async fn create_messages(
        &self,
        conversation: &Conversation,
        question_id: QuestionId,
        messages: &[Message],
    ) -> Result<Vec<MessageId>, RepositoryError>;

    /// Append one message to a question.
    ///
    /// Returns the stored message with its assigned id and timestamp.
    ///
    /// # Errors
    ///
    /// - `NotFound` if the question doesn't exist
    async fn add_message(
        &self,
        question_id: QuestionId,
        message: &NewMessage,
    ) -> Result<Message, RepositoryError>;

    /// Fetch the conversation shell for an interview.
    ///
    /// # Errors
    ///
    /// - `NotFound` if the interview has no conversation
    async fn get_conversation(
        &self,
        interview_id: InterviewId,
    ) -> Result<ConversationRecord, RepositoryError>;

    /// Fetch the (opening) question record of a conversation.
    async fn get_question(
        &self,
        conversation_id: ConversationId,
    ) -> Result<QuestionRecord, RepositoryError>;

    /// Fetch all messages of a question, oldest first.
    async fn get_messages(&self, question_id: QuestionId) -> Result<Vec<Message>, RepositoryError>;
}

/// Persisted conversation shell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversationRecord {
    pub id: ConversationId,
    pub interview_id: InterviewId,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// Persisted question record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuestionRecord {
    pub id: QuestionId,
    pub conversation_id: ConversationId,
    pub topic_number: u32,
    pub question_number: u32,
    pub prompt: String,
    pub created_at: Timestamp,
}

/// Errors from the persistence collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RepositoryError {
    #[error("database error: {0}")]
    Database(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

impl RepositoryError {
    pub fn database(message: impl Into<String>) -> Self {
        Self::Database(message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound(message.into())
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, RepositoryError::NotFound(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn conversation_repository_is_object_safe() {
        fn _accepts_dyn(_repo: &dyn ConversationRepository) {}
    }

    #[test]
    fn not_found_is_classified() {
        assert!(RepositoryError::not_found("conversation for interview 3").is_not_found());
        assert!(!RepositoryError::database("pool closed").is_not_found());
    }
}

//! GetConversationHandler - Query handler that rebuilds a conversation.
//!
//! The store keeps only the conversation shell, question records and
//! messages. Loading re-applies the topic catalog, installs the opening
//! question and attaches its messages in repository order.

use std::sync::Arc;

use super::errors::{step, ConversationError};
use crate::domain::conversation::{Conversation, Question, TopicCatalog};
use crate::domain::foundation::{InterviewId, QuestionId, ValidationError};
use crate::ports::ConversationRepository;

/// Query to load the conversation of an interview.
#[derive(Debug, Clone)]
pub struct GetConversationQuery {
    pub interview_id: InterviewId,
    /// Question whose messages are loaded.
    pub question_id: QuestionId,
}

/// Handler for loading conversations.
pub struct GetConversationHandler {
    repository: Arc<dyn ConversationRepository>,
    catalog: Arc<TopicCatalog>,
}

impl GetConversationHandler {
    pub fn new(repository: Arc<dyn ConversationRepository>, catalog: Arc<TopicCatalog>) -> Self {
        Self {
            repository,
            catalog,
        }
    }

    pub async fn handle(&self, query: GetConversationQuery) -> Result<Conversation, ConversationError> {
        let record = self
            .repository
            .get_conversation(query.interview_id)
            .await
            .map_err(|e| ConversationError::repository(step::GET_CONVERSATION, e))?;

        let (question, messages) = tokio::try_join!(
            async {
                self.repository
                    .get_question(record.id)
                    .await
                    .map_err(|e| ConversationError::repository(step::GET_QUESTION, e))
            },
            async {
                self.repository
                    .get_messages(query.question_id)
                    .await
                    .map_err(|e| ConversationError::repository(step::GET_MESSAGES, e))
            },
        )
        .map_err(|e| {
            tracing::warn!(
                interview_id = %query.interview_id,
                conversation_id = %record.id,
                error = %e,
                "Failed to load conversation"
            );
            e
        })?;

        if question.id != query.question_id {
            return Err(ValidationError::QuestionNotFound {
                topic: question.topic_number,
                question_id: query.question_id,
            }
            .into());
        }

        let mut conversation = Conversation::reconstitute(
            record.id,
            record.interview_id,
            &self.catalog,
            record.created_at,
            record.updated_at,
        );
        conversation.add_question(
            question.topic_number,
            Question::reconstitute(question.id, question.question_number, question.prompt, messages),
        )?;

        tracing::debug!(
            interview_id = %query.interview_id,
            conversation_id = %record.id,
            question_id = %question.id,
            "Conversation loaded"
        );

        Ok(conversation)
    }
}

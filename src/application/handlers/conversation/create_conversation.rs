//! CreateConversation command handler.
//!
//! Opens the conversation of an interview: persists the shell and the opening
//! question, seeds the prompt/reply pair, asks the completion API for the
//! interviewer's follow-up and persists all three messages.
//!
//! A failure at any step aborts creation. Earlier writes are not rolled back;
//! [`CreateConversationHandler::exists`] lets callers detect a half-created
//! conversation.

use std::sync::Arc;

use super::errors::{step, ConversationError};
use super::next_question::NextQuestionGenerator;
use crate::domain::conversation::{
    build_history, Conversation, NewMessage, Question, TopicCatalog, FIRST_QUESTION, FIRST_TOPIC,
};
use crate::domain::foundation::{InterviewId, ValidationError};
use crate::ports::ConversationRepository;

/// Command to open the conversation of an interview.
#[derive(Debug, Clone)]
pub struct CreateConversationCommand {
    pub interview_id: InterviewId,
    /// Opening prompt configured for the interview.
    pub first_question: String,
    /// The candidate's answer to the opening prompt.
    pub candidate_reply: String,
}

impl CreateConversationCommand {
    pub fn new(
        interview_id: InterviewId,
        first_question: impl Into<String>,
        candidate_reply: impl Into<String>,
    ) -> Self {
        Self {
            interview_id,
            first_question: first_question.into(),
            candidate_reply: candidate_reply.into(),
        }
    }

    fn validate(&self) -> Result<(), ValidationError> {
        ValidationError::require_text("first_question", &self.first_question)?;
        ValidationError::require_text("candidate_reply", &self.candidate_reply)
    }
}

/// Handler for opening conversations.
pub struct CreateConversationHandler {
    repository: Arc<dyn ConversationRepository>,
    generator: NextQuestionGenerator,
    catalog: Arc<TopicCatalog>,
}

impl CreateConversationHandler {
    pub fn new(
        repository: Arc<dyn ConversationRepository>,
        generator: NextQuestionGenerator,
        catalog: Arc<TopicCatalog>,
    ) -> Self {
        Self {
            repository,
            generator,
            catalog,
        }
    }

    /// Returns true if the interview already has a conversation.
    pub async fn exists(&self, interview_id: InterviewId) -> Result<bool, ConversationError> {
        self.repository
            .exists_for_interview(interview_id)
            .await
            .map_err(|e| ConversationError::repository(step::CHECK_FOR_CONVERSATION, e))
    }

    pub async fn handle(
        &self,
        cmd: CreateConversationCommand,
    ) -> Result<Conversation, ConversationError> {
        cmd.validate()?;
        let interview_id = cmd.interview_id;

        let mut conversation = Conversation::new(interview_id, &self.catalog);

        let conversation_id = self
            .repository
            .create_conversation(&conversation)
            .await
            .map_err(|e| fail(interview_id, step::CREATE_CONVERSATION, e))?;
        conversation.assign_id(conversation_id);

        let question_id = self
            .repository
            .create_question(&conversation, FIRST_TOPIC, FIRST_QUESTION, &cmd.first_question)
            .await
            .map_err(|e| fail(interview_id, step::CREATE_QUESTION, e))?;

        conversation.add_question(
            FIRST_TOPIC,
            Question::new(question_id, FIRST_QUESTION, cmd.first_question.clone()),
        )?;
        conversation.push_message(
            FIRST_TOPIC,
            FIRST_QUESTION,
            NewMessage::interviewer(cmd.first_question),
        )?;
        conversation.push_message(
            FIRST_TOPIC,
            FIRST_QUESTION,
            NewMessage::candidate(cmd.candidate_reply),
        )?;

        let follow_up = {
            let history = build_history(&conversation, FIRST_TOPIC, FIRST_QUESTION)?;
            self.generator
                .request_next_question(history, conversation_id, question_id)
                .await
                .map_err(|e| {
                    tracing::warn!(
                        %interview_id,
                        %conversation_id,
                        %question_id,
                        error = %e,
                        "Follow-up generation failed; question left without follow-up"
                    );
                    e
                })?
        };

        conversation.push_message(FIRST_TOPIC, FIRST_QUESTION, NewMessage::interviewer(follow_up))?;

        let messages = conversation
            .question(FIRST_TOPIC, FIRST_QUESTION)?
            .messages()
            .to_vec();
        let message_ids = self
            .repository
            .create_messages(&conversation, question_id, &messages)
            .await
            .map_err(|e| fail(interview_id, step::CREATE_MESSAGES, e))?;
        conversation.assign_message_ids(FIRST_TOPIC, FIRST_QUESTION, &message_ids)?;

        tracing::info!(
            %interview_id,
            %conversation_id,
            %question_id,
            messages = message_ids.len(),
            "Conversation created"
        );

        Ok(conversation)
    }
}

fn fail(
    interview_id: InterviewId,
    step: &'static str,
    source: crate::ports::RepositoryError,
) -> ConversationError {
    tracing::error!(%interview_id, step, error = %source, "Repository call failed");
    ConversationError::repository(step, source)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::ai::MockAIProvider;
    use crate::adapters::memory::{InMemoryConversationRepository, RepositoryOperation};
    use crate::application::handlers::conversation::NextQuestionConfig;
    use crate::domain::conversation::Author;
    use crate::ports::RepositoryError;

    fn handler(
        repo: &InMemoryConversationRepository,
        provider: MockAIProvider,
    ) -> CreateConversationHandler {
        CreateConversationHandler::new(
            Arc::new(repo.clone()),
            NextQuestionGenerator::new(Arc::new(provider), NextQuestionConfig::default()),
            Arc::new(TopicCatalog::backend_interview()),
        )
    }

    fn command() -> CreateConversationCommand {
        CreateConversationCommand::new(
            InterviewId::new(42),
            "What is a linked list?",
            "A sequence of nodes...",
        )
    }

    #[tokio::test]
    async fn creates_three_message_opening_exchange() {
        // Given
        let repo = InMemoryConversationRepository::new();
        let provider = MockAIProvider::new().with_response("How would you detect a cycle in one?");
        let handler = handler(&repo, provider);

        // When
        let conversation = handler.handle(command()).await.unwrap();

        // Then
        let question = conversation.question(1, 1).unwrap();
        let messages = question.messages();
        assert_eq!(messages.len(), 3);
        assert_eq!(
            (messages[0].author, messages[0].content.as_str()),
            (Author::Interviewer, "What is a linked list?")
        );
        assert_eq!(
            (messages[1].author, messages[1].content.as_str()),
            (Author::Candidate, "A sequence of nodes...")
        );
        assert_eq!(
            (messages[2].author, messages[2].content.as_str()),
            (Author::Interviewer, "How would you detect a cycle in one?")
        );
        assert_eq!(question.prompt(), "What is a linked list?");
        assert!(conversation.id().is_assigned());
    }

    #[tokio::test]
    async fn message_ids_come_from_repository() {
        let repo = InMemoryConversationRepository::new();
        let handler = handler(&repo, MockAIProvider::new());

        let conversation = handler.handle(command()).await.unwrap();

        let question = conversation.question(1, 1).unwrap();
        let stored = repo.get_messages(question.id()).await.unwrap();
        assert_eq!(question.messages(), stored.as_slice());
    }

    #[tokio::test]
    async fn calls_repository_in_order() {
        let repo = InMemoryConversationRepository::new();
        let handler = handler(&repo, MockAIProvider::new());

        handler.handle(command()).await.unwrap();

        assert_eq!(
            repo.calls().await,
            vec![
                RepositoryOperation::CreateConversation,
                RepositoryOperation::CreateQuestion,
                RepositoryOperation::CreateMessages,
            ]
        );
    }

    #[tokio::test]
    async fn completion_failure_aborts_before_persisting_messages() {
        // Given
        let repo = InMemoryConversationRepository::new();
        let handler = handler(&repo, MockAIProvider::new().with_status_error(500));

        // When
        let err = handler.handle(command()).await.unwrap_err();

        // Then
        assert!(matches!(err, ConversationError::CompletionProtocol(_)));
        assert!(!repo.calls().await.contains(&RepositoryOperation::CreateMessages));
        assert!(handler.exists(InterviewId::new(42)).await.unwrap());
    }

    #[tokio::test]
    async fn repository_failure_is_tagged_with_step() {
        let repo = InMemoryConversationRepository::new();
        repo.fail_on(RepositoryOperation::CreateQuestion).await;
        let provider = MockAIProvider::new();
        let handler = handler(&repo, provider.clone());

        let err = handler.handle(command()).await.unwrap_err();

        assert!(matches!(
            err,
            ConversationError::Repository {
                step: step::CREATE_QUESTION,
                source: RepositoryError::Database(_)
            }
        ));
        assert_eq!(provider.call_count(), 0);
    }

    #[tokio::test]
    async fn blank_reply_is_rejected_before_any_write() {
        let repo = InMemoryConversationRepository::new();
        let handler = handler(&repo, MockAIProvider::new());

        let err = handler
            .handle(CreateConversationCommand::new(InterviewId::new(1), "Prompt", "  "))
            .await
            .unwrap_err();

        assert!(matches!(err, ConversationError::Validation(_)));
        assert!(repo.calls().await.is_empty());
    }

    #[tokio::test]
    async fn second_conversation_for_interview_conflicts() {
        let repo = InMemoryConversationRepository::new();
        let handler = handler(&repo, MockAIProvider::new());
        handler.handle(command()).await.unwrap();

        let err = handler.handle(command()).await.unwrap_err();

        assert!(matches!(
            err,
            ConversationError::Repository {
                source: RepositoryError::Conflict(_),
                ..
            }
        ));
    }
}

//! AppendConversation command handler.
//!
//! Appends one message to a question of a loaded conversation. The target is
//! resolved and checked before the repository is called, so a rejected
//! append writes nothing and leaves the aggregate untouched. Once the
//! repository has stored the message it is attached to the aggregate with the
//! assigned id.

use std::sync::Arc;

use super::errors::{step, ConversationError};
use super::next_question::NextQuestionGenerator;
use crate::domain::conversation::{build_history, Conversation, Message, NewMessage};
use crate::domain::foundation::{ConversationId, QuestionId, ValidationError};
use crate::ports::ConversationRepository;

/// Command to append a message to a question.
#[derive(Debug, Clone)]
pub struct AppendConversationCommand {
    /// Must equal the id of the loaded conversation.
    pub conversation_id: ConversationId,
    pub topic_number: u32,
    pub question_id: QuestionId,
    pub question_number: u32,
    pub message: NewMessage,
}

/// Messages written by [`AppendConversationHandler::handle_with_follow_up`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppendOutcome {
    /// The appended message as stored.
    pub appended: Message,
    /// The interviewer's generated follow-up.
    pub follow_up: Message,
}

/// Handler for appending messages.
pub struct AppendConversationHandler {
    repository: Arc<dyn ConversationRepository>,
    generator: Option<NextQuestionGenerator>,
}

impl AppendConversationHandler {
    pub fn new(repository: Arc<dyn ConversationRepository>) -> Self {
        Self {
            repository,
            generator: None,
        }
    }

    /// Enables [`Self::handle_with_follow_up`].
    pub fn with_generator(mut self, generator: NextQuestionGenerator) -> Self {
        self.generator = Some(generator);
        self
    }

    /// Persists `cmd.message` and appends it to `conversation`.
    ///
    /// The aggregate is mutated in place: on success `conversation` holds the
    /// new message as the last one of the target question. The return value
    /// is that stored message, with its repository id. On error the aggregate
    /// is left unchanged.
    ///
    /// # Errors
    ///
    /// - `Validation` if the conversation id does not match, the target
    ///   question does not exist or has another number, or the message
    ///   is empty or would open the question as the candidate
    /// - `Repository` if the write fails
    pub async fn handle(
        &self,
        conversation: &mut Conversation,
        cmd: AppendConversationCommand,
    ) -> Result<Message, ConversationError> {
        check_target(conversation, &cmd)?;

        let stored = self
            .repository
            .add_message(cmd.question_id, &cmd.message)
            .await
            .map_err(|e| {
                tracing::error!(
                    conversation_id = %cmd.conversation_id,
                    question_id = %cmd.question_id,
                    step = step::ADD_MESSAGE,
                    error = %e,
                    "Repository call failed"
                );
                ConversationError::repository(step::ADD_MESSAGE, e)
            })?;

        conversation.attach_message(cmd.topic_number, cmd.question_id, stored)?;

        let appended = conversation
            .find_question(cmd.topic_number, cmd.question_id)?
            .last_message()
            .cloned()
            .ok_or(ValidationError::QuestionNotFound {
                topic: cmd.topic_number,
                question_id: cmd.question_id,
            })?;

        tracing::debug!(
            conversation_id = %cmd.conversation_id,
            question_id = %cmd.question_id,
            message_id = %appended.id,
            author = %appended.author,
            "Message appended"
        );

        Ok(appended)
    }

    /// Appends `cmd.message`, then generates and appends the interviewer's
    /// next question for the same question.
    ///
    /// If generation fails the appended message stays persisted and attached.
    pub async fn handle_with_follow_up(
        &self,
        conversation: &mut Conversation,
        cmd: AppendConversationCommand,
    ) -> Result<AppendOutcome, ConversationError> {
        let generator = self.generator.as_ref().ok_or_else(|| {
            ConversationError::CompletionTransport("no completion provider configured".to_string())
        })?;

        let topic_number = cmd.topic_number;
        let question_id = cmd.question_id;
        let question_number = cmd.question_number;
        let conversation_id = cmd.conversation_id;

        let appended = self.handle(conversation, cmd).await?;

        let next = {
            let history = build_history(conversation, topic_number, question_number)?;
            generator
                .request_next_question(history, conversation_id, question_id)
                .await?
        };

        let follow_up = self
            .handle(
                conversation,
                AppendConversationCommand {
                    conversation_id,
                    topic_number,
                    question_id,
                    question_number,
                    message: NewMessage::interviewer(next),
                },
            )
            .await?;

        Ok(AppendOutcome {
            appended,
            follow_up,
        })
    }
}

/// Checks the target question without touching the repository.
fn check_target(
    conversation: &Conversation,
    cmd: &AppendConversationCommand,
) -> Result<(), ValidationError> {
    if conversation.id() != cmd.conversation_id {
        return Err(ValidationError::ConversationMismatch {
            expected: conversation.id(),
            actual: cmd.conversation_id,
        });
    }

    let question = conversation.find_question(cmd.topic_number, cmd.question_id)?;
    if question.number() != cmd.question_number {
        return Err(ValidationError::QuestionNumberMismatch {
            question_id: cmd.question_id,
            expected: cmd.question_number,
            actual: question.number(),
        });
    }

    question.check_append(&cmd.message)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::ai::MockAIProvider;
    use crate::adapters::memory::{InMemoryConversationRepository, RepositoryOperation};
    use crate::application::handlers::conversation::{
        CreateConversationCommand, CreateConversationHandler, NextQuestionConfig,
    };
    use crate::domain::conversation::{Author, TopicCatalog};
    use crate::domain::foundation::InterviewId;
    use proptest::prelude::*;

    struct Fixture {
        repo: InMemoryConversationRepository,
        provider: MockAIProvider,
        conversation: Conversation,
    }

    impl Fixture {
        async fn new() -> Self {
            let repo = InMemoryConversationRepository::new();
            let provider = MockAIProvider::new().with_response("What is a doubly linked list?");
            let create = CreateConversationHandler::new(
                Arc::new(repo.clone()),
                generator(&provider),
                Arc::new(TopicCatalog::backend_interview()),
            );
            let conversation = create
                .handle(CreateConversationCommand::new(
                    InterviewId::new(1),
                    "What is a linked list?",
                    "A sequence of nodes...",
                ))
                .await
                .unwrap();
            repo.clear_calls().await;
            provider.clear_calls();

            Self {
                repo,
                provider,
                conversation,
            }
        }

        fn handler(&self) -> AppendConversationHandler {
            AppendConversationHandler::new(Arc::new(self.repo.clone()))
                .with_generator(generator(&self.provider))
        }

        fn command(&self, message: NewMessage) -> AppendConversationCommand {
            let question = self.conversation.question(1, 1).unwrap();
            AppendConversationCommand {
                conversation_id: self.conversation.id(),
                topic_number: 1,
                question_id: question.id(),
                question_number: 1,
                message,
            }
        }
    }

    fn generator(provider: &MockAIProvider) -> NextQuestionGenerator {
        NextQuestionGenerator::new(Arc::new(provider.clone()), NextQuestionConfig::default())
    }

    #[tokio::test]
    async fn appends_after_existing_messages() {
        // Given
        let mut fx = Fixture::new().await;
        let cmd = fx.command(NewMessage::candidate("Each node points to the next and previous."));

        // When
        let stored = fx.handler().handle(&mut fx.conversation, cmd).await.unwrap();

        // Then
        let question = fx.conversation.question(1, 1).unwrap();
        assert_eq!(question.message_count(), 4);
        assert_eq!(question.last_message(), Some(&stored));
        assert_eq!(stored.author, Author::Candidate);
        assert_eq!(fx.repo.message_count(question.id()).await, 4);
    }

    #[tokio::test]
    async fn mismatched_conversation_id_touches_nothing() {
        // Given
        let mut fx = Fixture::new().await;
        let before = fx.conversation.clone();
        let mut cmd = fx.command(NewMessage::candidate("hello"));
        cmd.conversation_id = ConversationId::new(999);

        // When
        let err = fx.handler().handle(&mut fx.conversation, cmd).await.unwrap_err();

        // Then
        assert_eq!(
            err,
            ConversationError::Validation(ValidationError::ConversationMismatch {
                expected: before.id(),
                actual: ConversationId::new(999),
            })
        );
        assert_eq!(fx.conversation, before);
        assert!(fx.repo.calls().await.is_empty());
    }

    #[tokio::test]
    async fn unknown_question_is_rejected_before_write() {
        let mut fx = Fixture::new().await;
        let before = fx.conversation.clone();
        let mut cmd = fx.command(NewMessage::candidate("hello"));
        cmd.question_id = QuestionId::new(12345);

        let err = fx.handler().handle(&mut fx.conversation, cmd).await.unwrap_err();

        assert!(matches!(
            err,
            ConversationError::Validation(ValidationError::QuestionNotFound { .. })
        ));
        assert_eq!(fx.conversation, before);
        assert!(fx.repo.calls().await.is_empty());
    }

    #[tokio::test]
    async fn wrong_question_number_is_rejected() {
        let mut fx = Fixture::new().await;
        let mut cmd = fx.command(NewMessage::candidate("hello"));
        cmd.question_number = 2;

        let err = fx.handler().handle(&mut fx.conversation, cmd).await.unwrap_err();

        assert!(matches!(
            err,
            ConversationError::Validation(ValidationError::QuestionNumberMismatch { .. })
        ));
    }

    #[tokio::test]
    async fn repository_failure_leaves_aggregate_unchanged() {
        let mut fx = Fixture::new().await;
        fx.repo.fail_on(RepositoryOperation::AddMessage).await;
        let before = fx.conversation.clone();
        let cmd = fx.command(NewMessage::candidate("hello"));

        let err = fx.handler().handle(&mut fx.conversation, cmd).await.unwrap_err();

        assert_eq!(err.code(), "REPOSITORY_ERROR");
        assert_eq!(fx.conversation, before);
    }

    #[tokio::test]
    async fn follow_up_is_generated_from_updated_history() {
        // Given
        let mut fx = Fixture::new().await;
        let provider = MockAIProvider::new().with_response("How would you insert in O(1)?");
        let handler = AppendConversationHandler::new(Arc::new(fx.repo.clone()))
            .with_generator(generator(&provider));
        let cmd = fx.command(NewMessage::candidate("Nodes link both ways."));

        // When
        let outcome = handler
            .handle_with_follow_up(&mut fx.conversation, cmd)
            .await
            .unwrap();

        // Then
        assert_eq!(outcome.appended.content, "Nodes link both ways.");
        assert_eq!(outcome.follow_up.author, Author::Interviewer);
        assert_eq!(outcome.follow_up.content, "How would you insert in O(1)?");
        assert_eq!(fx.conversation.question(1, 1).unwrap().message_count(), 5);
        let sent = provider.last_call().unwrap();
        assert_eq!(sent.messages.len(), 4);
        assert_eq!(sent.messages[3].content, "Nodes link both ways.");
    }

    #[tokio::test]
    async fn follow_up_failure_keeps_appended_message() {
        let mut fx = Fixture::new().await;
        let provider = MockAIProvider::new().with_status_error(503);
        let handler = AppendConversationHandler::new(Arc::new(fx.repo.clone()))
            .with_generator(generator(&provider));
        let cmd = fx.command(NewMessage::candidate("Nodes link both ways."));

        let err = handler
            .handle_with_follow_up(&mut fx.conversation, cmd)
            .await
            .unwrap_err();

        assert!(matches!(err, ConversationError::CompletionProtocol(_)));
        assert_eq!(fx.conversation.question(1, 1).unwrap().message_count(), 4);
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(16))]

        #[test]
        fn appends_preserve_call_order(replies in proptest::collection::vec("[a-z]{1,12}", 1..8)) {
            let runtime = tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
                .unwrap();

            runtime.block_on(async {
                let mut fx = Fixture::new().await;
                let handler = fx.handler();
                for reply in &replies {
                    let cmd = fx.command(NewMessage::candidate(reply.clone()));
                    handler.handle(&mut fx.conversation, cmd).await.unwrap();
                }

                let question = fx.conversation.question(1, 1).unwrap();
                let tail: Vec<&str> = question.messages()[3..]
                    .iter()
                    .map(|m| m.content.as_str())
                    .collect();
                let expected: Vec<&str> = replies.iter().map(String::as_str).collect();
                assert_eq!(tail, expected);

                let stored = fx.repo.get_messages(question.id()).await.unwrap();
                assert_eq!(stored.as_slice(), question.messages());
            });
        }
    }
}

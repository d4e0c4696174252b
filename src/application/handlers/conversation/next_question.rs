//! Next-question generation.
//!
//! Sends a question's transcript to the completion API and returns the
//! interviewer's follow-up. The provider call runs on its own task and is
//! raced against a deadline; on expiry the task is aborted, which drops the
//! in-flight HTTP request.

use std::sync::Arc;
use std::time::Duration;

use uuid::Uuid;

use super::errors::ConversationError;
use crate::config::{AiConfig, DEFAULT_SYSTEM_PROMPT};
use crate::domain::conversation::{Transcript, TranscriptRole};
use crate::domain::foundation::{ConversationId, QuestionId};
use crate::ports::{AIProvider, CompletionRequest, MessageRole, RequestMetadata};

/// Fixed request parameters for follow-up questions.
#[derive(Debug, Clone)]
pub struct NextQuestionConfig {
    pub system_prompt: String,
    pub max_tokens: u32,
    pub temperature: f32,
    /// Overall deadline for one request.
    pub deadline: Duration,
}

impl Default for NextQuestionConfig {
    fn default() -> Self {
        Self {
            system_prompt: DEFAULT_SYSTEM_PROMPT.to_string(),
            max_tokens: 150,
            temperature: 0.7,
            deadline: Duration::from_secs(30),
        }
    }
}

impl From<&AiConfig> for NextQuestionConfig {
    fn from(config: &AiConfig) -> Self {
        Self {
            system_prompt: config.system_prompt.clone(),
            max_tokens: config.max_tokens,
            temperature: config.temperature,
            deadline: config.deadline(),
        }
    }
}

impl NextQuestionConfig {
    pub fn with_deadline(mut self, deadline: Duration) -> Self {
        self.deadline = deadline;
        self
    }
}

/// Requests the interviewer's next question from the completion API.
#[derive(Clone)]
pub struct NextQuestionGenerator {
    provider: Arc<dyn AIProvider>,
    config: NextQuestionConfig,
}

impl NextQuestionGenerator {
    pub fn new(provider: Arc<dyn AIProvider>, config: NextQuestionConfig) -> Self {
        Self { provider, config }
    }

    pub fn config(&self) -> &NextQuestionConfig {
        &self.config
    }

    /// Generates one follow-up question for `history`.
    ///
    /// # Errors
    ///
    /// - `CompletionTransport` if the API cannot be reached or the task dies
    /// - `CompletionProtocol` for non-success statuses and unusable bodies
    /// - `CompletionTimeout` if the deadline passes first
    pub async fn request_next_question(
        &self,
        history: Transcript<'_>,
        conversation_id: ConversationId,
        question_id: QuestionId,
    ) -> Result<String, ConversationError> {
        let trace_id = Uuid::new_v4().to_string();
        let request = self.build_request(history, conversation_id, question_id, &trace_id);

        tracing::debug!(
            %trace_id,
            %conversation_id,
            %question_id,
            messages = request.messages.len(),
            "Requesting next question"
        );

        let provider = Arc::clone(&self.provider);
        let mut task = tokio::spawn(async move { provider.complete(request).await });

        let response = match tokio::time::timeout(self.config.deadline, &mut task).await {
            Ok(Ok(result)) => result?,
            Ok(Err(join_error)) => {
                return Err(ConversationError::CompletionTransport(format!(
                    "completion task failed: {}",
                    join_error
                )))
            }
            Err(_) => {
                task.abort();
                tracing::warn!(
                    %trace_id,
                    %conversation_id,
                    deadline_ms = self.config.deadline.as_millis() as u64,
                    "Next question request exceeded deadline"
                );
                return Err(ConversationError::CompletionTimeout(self.config.deadline));
            }
        };

        let question = response.content.trim();
        if question.is_empty() {
            return Err(ConversationError::CompletionProtocol(
                "no question generated".to_string(),
            ));
        }

        tracing::debug!(
            %trace_id,
            model = %response.model,
            total_tokens = response.usage.total_tokens,
            "Next question received"
        );

        Ok(question.to_string())
    }

    fn build_request(
        &self,
        history: Transcript<'_>,
        conversation_id: ConversationId,
        question_id: QuestionId,
        trace_id: &str,
    ) -> CompletionRequest {
        let request = CompletionRequest::new(RequestMetadata::new(
            conversation_id,
            question_id,
            trace_id,
        ))
        .with_system_prompt(&self.config.system_prompt)
        .with_max_tokens(self.config.max_tokens)
        .with_temperature(self.config.temperature);

        history.iter().fold(request, |request, entry| {
            request.with_message(completion_role(entry.role), entry.content)
        })
    }
}

/// The completion API only knows system, user and assistant.
fn completion_role(role: TranscriptRole) -> MessageRole {
    match role {
        TranscriptRole::Assistant => MessageRole::Assistant,
        TranscriptRole::Candidate => MessageRole::User,
    }
}

//! In-Memory Conversation Repository
//!
//! Stores conversation shells, question records and messages in memory.
//! Every operation is recorded, and any operation can be made to fail, so
//! handler tests can assert exactly which calls were made.

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::domain::conversation::{Conversation, Message, NewMessage};
use crate::domain::foundation::{
    ConversationId, InterviewId, MessageId, QuestionId, Timestamp,
};
use crate::ports::{ConversationRecord, ConversationRepository, QuestionRecord, RepositoryError};

/// Repository operations, for call recording and failure injection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RepositoryOperation {
    ExistsForInterview,
    CreateConversation,
    CreateQuestion,
    CreateMessages,
    AddMessage,
    GetConversation,
    GetQuestion,
    GetMessages,
}

#[derive(Debug, Default)]
struct Store {
    conversations: HashMap<ConversationId, ConversationRecord>,
    by_interview: HashMap<InterviewId, ConversationId>,
    questions: HashMap<QuestionId, QuestionRecord>,
    messages: HashMap<QuestionId, Vec<Message>>,
    last_conversation_id: i64,
    last_question_id: i64,
    last_message_id: i64,
}

impl Store {
    fn next_conversation_id(&mut self) -> ConversationId {
        self.last_conversation_id += 1;
        ConversationId::new(self.last_conversation_id)
    }

    fn next_question_id(&mut self) -> QuestionId {
        self.last_question_id += 1;
        QuestionId::new(self.last_question_id)
    }

    fn next_message_id(&mut self) -> MessageId {
        self.last_message_id += 1;
        MessageId::new(self.last_message_id)
    }

    fn require_conversation(&self, id: ConversationId) -> Result<&ConversationRecord, RepositoryError> {
        self.conversations
            .get(&id)
            .ok_or_else(|| RepositoryError::not_found(format!("conversation {}", id)))
    }

    fn require_question(&self, id: QuestionId) -> Result<&QuestionRecord, RepositoryError> {
        self.questions
            .get(&id)
            .ok_or_else(|| RepositoryError::not_found(format!("question {}", id)))
    }

    fn touch_conversation(&mut self, id: ConversationId) {
        if let Some(record) = self.conversations.get_mut(&id) {
            record.updated_at = Timestamp::now().not_before(record.updated_at);
        }
    }
}

/// In-memory implementation of [`ConversationRepository`].
///
/// A single write lock guards the store, which serializes concurrent
/// appends to the same question.
#[derive(Debug, Clone, Default)]
pub struct InMemoryConversationRepository {
    store: Arc<RwLock<Store>>,
    calls: Arc<RwLock<Vec<RepositoryOperation>>>,
    failing: Arc<RwLock<HashSet<RepositoryOperation>>>,
}

impl InMemoryConversationRepository {
    /// Create a new in-memory repository
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every future call of `operation` fail with a database error.
    pub async fn fail_on(&self, operation: RepositoryOperation) {
        self.failing.write().await.insert(operation);
    }

    /// Stop failing `operation`.
    pub async fn recover(&self, operation: RepositoryOperation) {
        self.failing.write().await.remove(&operation);
    }

    /// Operations invoked so far, in call order.
    pub async fn calls(&self) -> Vec<RepositoryOperation> {
        self.calls.read().await.clone()
    }

    /// Clear the call history
    pub async fn clear_calls(&self) {
        self.calls.write().await.clear();
    }

    /// Number of stored conversations
    pub async fn conversation_count(&self) -> usize {
        self.store.read().await.conversations.len()
    }

    /// Number of stored messages for a question
    pub async fn message_count(&self, question_id: QuestionId) -> usize {
        self.store
            .read()
            .await
            .messages
            .get(&question_id)
            .map_or(0, Vec::len)
    }

    async fn record(&self, operation: RepositoryOperation) -> Result<(), RepositoryError> {
        self.calls.write().await.push(operation);
        if self.failing.read().await.contains(&operation) {
            return Err(RepositoryError::database(format!(
                "injected failure for {:?}",
                operation
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl ConversationRepository for InMemoryConversationRepository {
    async fn exists_for_interview(&self, interview_id: InterviewId) -> Result<bool, RepositoryError> {
        self.record(RepositoryOperation::ExistsForInterview).await?;
        Ok(self.store.read().await.by_interview.contains_key(&interview_id))
    }

    async fn create_conversation(
        &self,
        conversation: &Conversation,
    ) -> Result<ConversationId, RepositoryError> {
        self.record(RepositoryOperation::CreateConversation).await?;
        let mut store = self.store.write().await;

        if store.by_interview.contains_key(&conversation.interview_id()) {
            return Err(RepositoryError::Conflict(format!(
                "interview {} already has a conversation",
                conversation.interview_id()
            )));
        }

        let id = store.next_conversation_id();
        store.conversations.insert(
            id,
            ConversationRecord {
                id,
                interview_id: conversation.interview_id(),
                created_at: *conversation.created_at(),
                updated_at: *conversation.updated_at(),
            },
        );
        store.by_interview.insert(conversation.interview_id(), id);
        Ok(id)
    }

    async fn create_question(
        &self,
        conversation: &Conversation,
        topic_number: u32,
        question_number: u32,
        prompt: &str,
    ) -> Result<QuestionId, RepositoryError> {
        self.record(RepositoryOperation::CreateQuestion).await?;
        let mut store = self.store.write().await;
        store.require_conversation(conversation.id())?;

        let duplicate = store.questions.values().any(|q| {
            q.conversation_id == conversation.id()
                && q.topic_number == topic_number
                && q.question_number == question_number
        });
        if duplicate {
            return Err(RepositoryError::Conflict(format!(
                "question {}.{} already exists in conversation {}",
                topic_number,
                question_number,
                conversation.id()
            )));
        }

        let id = store.next_question_id();
        store.questions.insert(
            id,
            QuestionRecord {
                id,
                conversation_id: conversation.id(),
                topic_number,
                question_number,
                prompt: prompt.to_string(),
                created_at: Timestamp::now(),
            },
        );
        store.messages.insert(id, Vec::new());
        store.touch_conversation(conversation.id());
        Ok(id)
    }

    async fn create_messages(
        &self,
        conversation: &Conversation,
        question_id: QuestionId,
        messages: &[Message],
    ) -> Result<Vec<MessageId>, RepositoryError> {
        self.record(RepositoryOperation::CreateMessages).await?;
        let mut store = self.store.write().await;

        if store.require_question(question_id)?.conversation_id != conversation.id() {
            return Err(RepositoryError::not_found(format!(
                "question {} in conversation {}",
                question_id,
                conversation.id()
            )));
        }

        let mut stored = Vec::with_capacity(messages.len());
        for message in messages {
            let mut message = message.clone();
            message.id = store.next_message_id();
            message.question_id = question_id;
            stored.push(message);
        }
        let ids = stored.iter().map(|m| m.id).collect();

        store.messages.entry(question_id).or_default().extend(stored);
        store.touch_conversation(conversation.id());
        Ok(ids)
    }

    async fn add_message(
        &self,
        question_id: QuestionId,
        message: &NewMessage,
    ) -> Result<Message, RepositoryError> {
        self.record(RepositoryOperation::AddMessage).await?;
        let mut store = self.store.write().await;
        let conversation_id = store.require_question(question_id)?.conversation_id;

        let floor = store
            .messages
            .get(&question_id)
            .and_then(|messages| messages.last())
            .map(|last| last.created_at);
        let created_at = match floor {
            Some(floor) => Timestamp::now().not_before(floor),
            None => Timestamp::now(),
        };

        let stored = Message::reconstitute(
            store.next_message_id(),
            question_id,
            message.author,
            message.content.clone(),
            created_at,
        );
        store
            .messages
            .entry(question_id)
            .or_default()
            .push(stored.clone());
        store.touch_conversation(conversation_id);
        Ok(stored)
    }

    async fn get_conversation(
        &self,
        interview_id: InterviewId,
    ) -> Result<ConversationRecord, RepositoryError> {
        self.record(RepositoryOperation::GetConversation).await?;
        let store = self.store.read().await;
        let id = store.by_interview.get(&interview_id).ok_or_else(|| {
            RepositoryError::not_found(format!("conversation for interview {}", interview_id))
        })?;
        store.require_conversation(*id).cloned()
    }

    async fn get_question(
        &self,
        conversation_id: ConversationId,
    ) -> Result<QuestionRecord, RepositoryError> {
        self.record(RepositoryOperation::GetQuestion).await?;
        let store = self.store.read().await;
        store
            .questions
            .values()
            .filter(|q| q.conversation_id == conversation_id)
            .min_by_key(|q| (q.topic_number, q.question_number))
            .cloned()
            .ok_or_else(|| {
                RepositoryError::not_found(format!("question for conversation {}", conversation_id))
            })
    }

    async fn get_messages(&self, question_id: QuestionId) -> Result<Vec<Message>, RepositoryError> {
        self.record(RepositoryOperation::GetMessages).await?;
        Ok(self
            .store
            .read()
            .await
            .messages
            .get(&question_id)
            .cloned()
            .unwrap_or_default())
    }
}

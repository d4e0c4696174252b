//! Conversation aggregate.
//!
//! A conversation is the complete dialogue record of one interview. It owns
//! its topics, which own their questions, which own their messages.
//!
//! # Aggregate Boundary
//!
//! - Exactly one conversation exists per interview
//! - Topics come from the shared [`TopicCatalog`] and are numbered `1..=n`
//! - All mutation goes through the aggregate so `updated_at` stays current

use crate::domain::foundation::{
    ConversationId, InterviewId, MessageId, QuestionId, Timestamp, ValidationError,
};
use serde::{Deserialize, Serialize};

use super::catalog::TopicCatalog;
use super::message::{Message, NewMessage};
use super::question::Question;
use super::topic::Topic;

/// Conversation aggregate root.
///
/// # Invariants
///
/// - `interview_id` is immutable
/// - `topics[i].number() == i + 1`
/// - `updated_at` is refreshed on every mutation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Conversation {
    id: ConversationId,
    interview_id: InterviewId,
    topics: Vec<Topic>,
    created_at: Timestamp,
    updated_at: Timestamp,
}

impl Conversation {
    /// Creates a new, not yet persisted conversation scaffolded from `catalog`.
    ///
    /// The id stays [`ConversationId::UNASSIGNED`] until [`Self::assign_id`].
    pub fn new(interview_id: InterviewId, catalog: &TopicCatalog) -> Self {
        let now = Timestamp::now();
        Self::reconstitute(ConversationId::UNASSIGNED, interview_id, catalog, now, now)
    }

    /// Reconstitutes a conversation shell from persistence.
    ///
    /// The durable store keeps only the shell, so the topic scaffolding is
    /// re-applied from the catalog on every load.
    pub fn reconstitute(
        id: ConversationId,
        interview_id: InterviewId,
        catalog: &TopicCatalog,
        created_at: Timestamp,
        updated_at: Timestamp,
    ) -> Self {
        let topics = catalog
            .topics()
            .iter()
            .map(|definition| Topic::from_definition(definition, id))
            .collect();

        Self {
            id,
            interview_id,
            topics,
            created_at,
            updated_at,
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Accessors
    // ─────────────────────────────────────────────────────────────────────────

    pub fn id(&self) -> ConversationId {
        self.id
    }

    pub fn interview_id(&self) -> InterviewId {
        self.interview_id
    }

    pub fn topics(&self) -> &[Topic] {
        &self.topics
    }

    pub fn created_at(&self) -> &Timestamp {
        &self.created_at
    }

    pub fn updated_at(&self) -> &Timestamp {
        &self.updated_at
    }

    /// Returns the topic with the given 1-based number.
    pub fn topic(&self, number: u32) -> Result<&Topic, ValidationError> {
        number
            .checked_sub(1)
            .and_then(|index| self.topics.get(index as usize))
            .ok_or(ValidationError::TopicNotFound { topic: number })
    }

    fn topic_mut(&mut self, number: u32) -> Result<&mut Topic, ValidationError> {
        number
            .checked_sub(1)
            .and_then(|index| self.topics.get_mut(index as usize))
            .ok_or(ValidationError::TopicNotFound { topic: number })
    }

    /// Returns a question by topic and question number.
    pub fn question(&self, topic: u32, question_number: u32) -> Result<&Question, ValidationError> {
        self.topic(topic)?
            .question(question_number)
            .ok_or(ValidationError::QuestionNumberNotFound {
                topic,
                question_number,
            })
    }

    /// Returns a question by topic number and repository id.
    pub fn find_question(&self, topic: u32, question_id: QuestionId) -> Result<&Question, ValidationError> {
        self.topic(topic)?
            .find_question(question_id)
            .ok_or(ValidationError::QuestionNotFound { topic, question_id })
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Mutations
    // ─────────────────────────────────────────────────────────────────────────

    /// Records the id assigned by the repository.
    pub fn assign_id(&mut self, id: ConversationId) {
        self.id = id;
        for topic in &mut self.topics {
            topic.set_conversation_id(id);
        }
        self.touch();
    }

    /// Adds a question to a topic.
    pub fn add_question(&mut self, topic: u32, question: Question) -> Result<(), ValidationError> {
        self.topic_mut(topic)?.add_question(question)?;
        self.touch();
        Ok(())
    }

    /// Appends a not-yet-persisted message to the question with the given number.
    pub fn push_message(
        &mut self,
        topic: u32,
        question_number: u32,
        message: NewMessage,
    ) -> Result<&Message, ValidationError> {
        let question = self
            .topic_mut(topic)?
            .question_mut(question_number)
            .ok_or(ValidationError::QuestionNumberNotFound {
                topic,
                question_number,
            })?;
        question.push_message(message)?;
        self.touch();

        // The question exists: it was just pushed to.
        self.question(topic, question_number)
            .map(|q| &q.messages()[q.message_count() - 1])
    }

    /// Appends an already persisted message to the question with the given id.
    pub fn attach_message(
        &mut self,
        topic: u32,
        question_id: QuestionId,
        message: Message,
    ) -> Result<(), ValidationError> {
        self.topic_mut(topic)?
            .find_question_mut(question_id)
            .ok_or(ValidationError::QuestionNotFound { topic, question_id })?
            .attach_message(message)?;
        self.touch();
        Ok(())
    }

    /// Replaces the provisional message ids of a question.
    pub fn assign_message_ids(
        &mut self,
        topic: u32,
        question_number: u32,
        ids: &[MessageId],
    ) -> Result<(), ValidationError> {
        self.topic_mut(topic)?
            .question_mut(question_number)
            .ok_or(ValidationError::QuestionNumberNotFound {
                topic,
                question_number,
            })?
            .assign_message_ids(ids)?;
        self.touch();
        Ok(())
    }

    fn touch(&mut self) {
        self.updated_at = Timestamp::now().not_before(self.updated_at);
    }
}

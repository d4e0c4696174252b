//! Topic entity: a thematic section of the interview.

use crate::domain::foundation::{ConversationId, QuestionId, ValidationError};
use serde::{Deserialize, Serialize};

use super::catalog::TopicDefinition;
use super::question::Question;

/// A topic and the questions asked within it.
///
/// Questions are stored in order; question number `n` lives at index `n - 1`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Topic {
    number: u32,
    name: String,
    /// Back-reference to the owning conversation.
    conversation_id: ConversationId,
    questions: Vec<Question>,
}

impl Topic {
    /// Scaffolds an empty topic from its catalog definition.
    pub fn from_definition(definition: &TopicDefinition, conversation_id: ConversationId) -> Self {
        Self {
            number: definition.number,
            name: definition.name.clone(),
            conversation_id,
            questions: Vec::new(),
        }
    }

    pub fn number(&self) -> u32 {
        self.number
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn conversation_id(&self) -> ConversationId {
        self.conversation_id
    }

    pub fn questions(&self) -> &[Question] {
        &self.questions
    }

    /// Number the next added question must carry.
    pub fn next_question_number(&self) -> u32 {
        self.questions.len() as u32 + 1
    }

    /// Looks up a question by its 1-based number.
    pub fn question(&self, number: u32) -> Option<&Question> {
        number
            .checked_sub(1)
            .and_then(|index| self.questions.get(index as usize))
    }

    pub(crate) fn question_mut(&mut self, number: u32) -> Option<&mut Question> {
        number
            .checked_sub(1)
            .and_then(|index| self.questions.get_mut(index as usize))
    }

    /// Looks up a question by its repository id.
    pub fn find_question(&self, id: QuestionId) -> Option<&Question> {
        self.questions.iter().find(|q| q.id() == id)
    }

    pub(crate) fn find_question_mut(&mut self, id: QuestionId) -> Option<&mut Question> {
        self.questions.iter_mut().find(|q| q.id() == id)
    }

    /// Adds a question; its number must be the next in sequence.
    pub fn add_question(&mut self, question: Question) -> Result<(), ValidationError> {
        let expected = self.next_question_number();
        if question.number() != expected {
            return Err(ValidationError::NonContiguousNumbering {
                kind: "question",
                expected,
                actual: question.number(),
            });
        }
        self.questions.push(question);
        Ok(())
    }

    pub(crate) fn set_conversation_id(&mut self, conversation_id: ConversationId) {
        self.conversation_id = conversation_id;
    }
}

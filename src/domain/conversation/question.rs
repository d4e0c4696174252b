//! Question entity: one interview prompt and its message exchange.

use crate::domain::foundation::{MessageId, QuestionId, Timestamp, ValidationError};
use serde::{Deserialize, Serialize};

use super::message::{Author, Message, NewMessage};

/// One question within a topic.
///
/// # Invariants
///
/// - `messages` is append-only and chronological (`created_at` never decreases)
/// - the first message is always authored by the interviewer
/// - every message belongs to this question
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Question {
    id: QuestionId,
    number: u32,
    prompt: String,
    messages: Vec<Message>,
}

impl Question {
    /// Creates a question with no messages yet.
    pub fn new(id: QuestionId, number: u32, prompt: impl Into<String>) -> Self {
        Self {
            id,
            number,
            prompt: prompt.into(),
            messages: Vec::new(),
        }
    }

    /// Reconstitutes a question from persistence.
    ///
    /// Messages are kept in the order given; the repository is trusted to
    /// return them chronologically.
    pub fn reconstitute(
        id: QuestionId,
        number: u32,
        prompt: String,
        messages: Vec<Message>,
    ) -> Self {
        Self {
            id,
            number,
            prompt,
            messages,
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Accessors
    // ─────────────────────────────────────────────────────────────────────────

    pub fn id(&self) -> QuestionId {
        self.id
    }

    /// 1-based position within the topic.
    pub fn number(&self) -> u32 {
        self.number
    }

    pub fn prompt(&self) -> &str {
        &self.prompt
    }

    /// Messages in chronological order.
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn message_count(&self) -> usize {
        self.messages.len()
    }

    pub fn last_message(&self) -> Option<&Message> {
        self.messages.last()
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Mutations
    // ─────────────────────────────────────────────────────────────────────────

    /// Checks whether `message` could be appended, without changing anything.
    pub fn check_append(&self, message: &NewMessage) -> Result<(), ValidationError> {
        message.validate()?;
        if self.messages.is_empty() && message.author != Author::Interviewer {
            return Err(ValidationError::PromptRequired {
                question_id: self.id,
            });
        }
        Ok(())
    }

    /// Appends a not-yet-persisted message with a provisional id.
    pub fn push_message(&mut self, message: NewMessage) -> Result<&Message, ValidationError> {
        self.check_append(&message)?;

        let message = Message {
            id: MessageId::provisional(self.messages.len() + 1),
            question_id: self.id,
            author: message.author,
            content: message.content,
            created_at: self.next_timestamp(Timestamp::now()),
        };
        self.messages.push(message);
        Ok(&self.messages[self.messages.len() - 1])
    }

    /// Appends a message that the repository has already persisted.
    pub fn attach_message(&mut self, mut message: Message) -> Result<(), ValidationError> {
        if message.question_id != self.id {
            return Err(ValidationError::ForeignMessage {
                expected: self.id,
                actual: message.question_id,
            });
        }
        self.check_append(&NewMessage::new(message.author, message.content.clone()))?;

        message.created_at = self.next_timestamp(message.created_at);
        self.messages.push(message);
        Ok(())
    }

    /// Replaces provisional ids with the ones assigned by the repository.
    pub fn assign_message_ids(&mut self, ids: &[MessageId]) -> Result<(), ValidationError> {
        if ids.len() != self.messages.len() {
            return Err(ValidationError::MessageIdCountMismatch {
                expected: self.messages.len(),
                actual: ids.len(),
            });
        }
        for (message, id) in self.messages.iter_mut().zip(ids) {
            message.id = *id;
        }
        Ok(())
    }

    fn next_timestamp(&self, candidate: Timestamp) -> Timestamp {
        match self.messages.last() {
            Some(last) => candidate.not_before(last.created_at),
            None => candidate,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn question() -> Question {
        Question::new(QuestionId::new(10), 1, "What is a linked list?")
    }

    #[test]
    fn first_message_must_come_from_interviewer() {
        let mut q = question();
        let err = q
            .push_message(NewMessage::candidate("A sequence of nodes..."))
            .unwrap_err();
        assert_eq!(
            err,
            ValidationError::PromptRequired {
                question_id: QuestionId::new(10)
            }
        );
        assert_eq!(q.message_count(), 0);
    }

    #[test]
    fn push_assigns_provisional_ids_by_position() {
        let mut q = question();
        q.push_message(NewMessage::interviewer("What is a linked list?"))
            .unwrap();
        q.push_message(NewMessage::candidate("A sequence of nodes..."))
            .unwrap();

        let ids: Vec<_> = q.messages().iter().map(|m| m.id).collect();
        assert_eq!(ids, vec![MessageId::new(1), MessageId::new(2)]);
        assert!(q.messages().iter().all(|m| m.question_id == q.id()));
    }

    #[test]
    fn rejects_blank_content() {
        let mut q = question();
        assert!(q.push_message(NewMessage::interviewer("  ")).is_err());
    }

    #[test]
    fn attach_rejects_message_of_other_question() {
        let mut q = question();
        let foreign = Message::reconstitute(
            MessageId::new(99),
            QuestionId::new(11),
            Author::Interviewer,
            "Hi".to_string(),
            Timestamp::now(),
        );
        assert!(matches!(
            q.attach_message(foreign),
            Err(ValidationError::ForeignMessage { .. })
        ));
    }

    #[test]
    fn attach_clamps_created_at_to_previous_message() {
        let mut q = question();
        q.push_message(NewMessage::interviewer("What is a linked list?"))
            .unwrap();
        let first_at = q.messages()[0].created_at;

        let stale = Message::reconstitute(
            MessageId::new(7),
            q.id(),
            Author::Candidate,
            "Nodes with pointers".to_string(),
            first_at.plus_millis(-1_000),
        );
        q.attach_message(stale).unwrap();

        assert_eq!(q.messages()[1].created_at, first_at);
        assert_eq!(q.messages()[1].id, MessageId::new(7));
    }

    #[test]
    fn assign_message_ids_requires_matching_count() {
        let mut q = question();
        q.push_message(NewMessage::interviewer("Prompt")).unwrap();

        assert!(q.assign_message_ids(&[]).is_err());
        q.assign_message_ids(&[MessageId::new(501)]).unwrap();
        assert_eq!(q.messages()[0].id, MessageId::new(501));
    }

    proptest! {
        #[test]
        fn appends_preserve_call_order(contents in proptest::collection::vec("[a-z]{1,12}", 1..30)) {
            let mut q = question();
            q.push_message(NewMessage::interviewer("Prompt")).unwrap();
            for (i, content) in contents.iter().enumerate() {
                let author = if i % 2 == 0 { Author::Candidate } else { Author::Interviewer };
                q.push_message(NewMessage::new(author, content.clone())).unwrap();
            }

            let stored: Vec<&str> = q.messages()[1..].iter().map(|m| m.content.as_str()).collect();
            let expected: Vec<&str> = contents.iter().map(|c| c.as_str()).collect();
            prop_assert_eq!(stored, expected);
            prop_assert!(q.messages().windows(2).all(|w| w[0].created_at <= w[1].created_at));
        }
    }
}

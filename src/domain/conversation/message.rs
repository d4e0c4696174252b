//! Message entity for interview conversations.
//!
//! A message is one turn of the dialogue, attributed to either the
//! interviewer or the candidate.

use crate::domain::foundation::{MessageId, QuestionId, Timestamp, ValidationError};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Who authored a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Author {
    /// The (AI) interviewer asking questions.
    Interviewer,
    /// The candidate answering them.
    Candidate,
}

impl Author {
    /// Returns the storage representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Author::Interviewer => "interviewer",
            Author::Candidate => "candidate",
        }
    }
}

impl fmt::Display for Author {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Author {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "interviewer" => Ok(Author::Interviewer),
            "candidate" => Ok(Author::Candidate),
            other => Err(ValidationError::invalid_format(
                "author",
                format!("unknown author '{}'", other),
            )),
        }
    }
}

/// A message that has not been attached to a question yet.
///
/// This is what callers submit; the question (or the repository) gives it
/// an id, an owning question and a timestamp.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewMessage {
    pub author: Author,
    pub content: String,
}

impl NewMessage {
    /// Creates a new message draft.
    pub fn new(author: Author, content: impl Into<String>) -> Self {
        Self {
            author,
            content: content.into(),
        }
    }

    /// Creates an interviewer message draft.
    pub fn interviewer(content: impl Into<String>) -> Self {
        Self::new(Author::Interviewer, content)
    }

    /// Creates a candidate message draft.
    pub fn candidate(content: impl Into<String>) -> Self {
        Self::new(Author::Candidate, content)
    }

    /// Ensures the content is not blank.
    pub fn validate(&self) -> Result<(), ValidationError> {
        ValidationError::require_text("content", &self.content)
    }
}

/// One turn in the dialogue of a question.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    /// Repository-assigned id, or a provisional position before persistence.
    pub id: MessageId,
    /// Owning question.
    pub question_id: QuestionId,
    pub author: Author,
    pub content: String,
    pub created_at: Timestamp,
}

impl Message {
    /// Reconstitutes a message from persistence (no validation).
    pub fn reconstitute(
        id: MessageId,
        question_id: QuestionId,
        author: Author,
        content: String,
        created_at: Timestamp,
    ) -> Self {
        Self {
            id,
            question_id,
            author,
            content,
            created_at,
        }
    }

    /// Returns true if the interviewer wrote this message.
    pub fn is_interviewer(&self) -> bool {
        self.author == Author::Interviewer
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn author_round_trips_through_storage_string() {
        for author in [Author::Interviewer, Author::Candidate] {
            assert_eq!(author.as_str().parse::<Author>().unwrap(), author);
        }
    }

    #[test]
    fn unknown_author_is_rejected() {
        assert!("assistant".parse::<Author>().is_err());
    }

    #[test]
    fn author_serializes_lowercase() {
        let json = serde_json::to_string(&Author::Interviewer).unwrap();
        assert_eq!(json, "\"interviewer\"");
    }

    #[test]
    fn blank_draft_fails_validation() {
        assert!(NewMessage::candidate("   ").validate().is_err());
        assert!(NewMessage::candidate("A linked list is...").validate().is_ok());
    }
}

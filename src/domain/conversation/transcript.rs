//! Transcript builder.
//!
//! Turns the messages of one question into the role-tagged sequence sent to
//! the completion API. Building a transcript is pure: it borrows the
//! conversation, performs no I/O, and can be iterated any number of times.

use serde::Serialize;
use thiserror::Error;

use super::conversation::Conversation;
use super::message::{Author, Message};

/// Role of a transcript entry.
///
/// Interviewer turns are the model's own and become `assistant`; every other
/// author keeps its own name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TranscriptRole {
    /// Messages written by the interviewer.
    Assistant,
    /// Messages written by the candidate.
    Candidate,
}

impl From<Author> for TranscriptRole {
    fn from(author: Author) -> Self {
        match author {
            Author::Interviewer => TranscriptRole::Assistant,
            Author::Candidate => TranscriptRole::Candidate,
        }
    }
}

/// One role-tagged turn, borrowing its content from the conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TranscriptEntry<'a> {
    pub role: TranscriptRole,
    pub content: &'a str,
}

/// Errors raised when the requested question does not exist.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TranscriptError {
    #[error("topic {topic} not found")]
    TopicNotFound { topic: u32 },

    #[error("question {question_number} not found in topic {topic}")]
    QuestionNotFound { topic: u32, question_number: u32 },
}

/// Lazily mapped view over one question's messages.
#[derive(Debug, Clone, Copy)]
pub struct Transcript<'a> {
    messages: &'a [Message],
}

impl<'a> Transcript<'a> {
    /// Iterates the transcript from the start.
    pub fn iter(&self) -> impl Iterator<Item = TranscriptEntry<'a>> + Clone + 'a {
        let messages: &'a [Message] = self.messages;
        messages.iter().map(|message| TranscriptEntry {
            role: message.author.into(),
            content: &message.content,
        })
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}

/// Builds the transcript of `topics[topic].questions[question_number]`.
pub fn build_history(
    conversation: &Conversation,
    topic: u32,
    question_number: u32,
) -> Result<Transcript<'_>, TranscriptError> {
    let question = conversation
        .topic(topic)
        .map_err(|_| TranscriptError::TopicNotFound { topic })?
        .question(question_number)
        .ok_or(TranscriptError::QuestionNotFound {
            topic,
            question_number,
        })?;

    Ok(Transcript {
        messages: question.messages(),
    })
}

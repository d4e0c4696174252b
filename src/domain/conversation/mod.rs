//! Conversation domain module.
//!
//! Models the dialogue of one interview as topics, questions and messages,
//! and builds the transcripts handed to the completion API.

mod catalog;
mod conversation;
mod message;
mod question;
mod topic;
mod transcript;

pub use catalog::{TopicCatalog, TopicDefinition};
pub use conversation::Conversation;
pub use message::{Author, Message, NewMessage};
pub use question::Question;
pub use topic::Topic;
pub use transcript::{build_history, Transcript, TranscriptEntry, TranscriptError, TranscriptRole};

/// Topic that holds the opening question of every interview.
pub const FIRST_TOPIC: u32 = 1;

/// Number of the opening question within [`FIRST_TOPIC`].
pub const FIRST_QUESTION: u32 = 1;

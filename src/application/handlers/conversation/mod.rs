//! Conversation command and query handlers.
//!
//! - `CreateConversationHandler` - opens an interview's conversation
//! - `AppendConversationHandler` - appends a message to a question
//! - `GetConversationHandler` - rebuilds a conversation from the store
//! - `NextQuestionGenerator` - asks the completion API for a follow-up

mod append_conversation;
mod create_conversation;
mod errors;
mod get_conversation;
mod next_question;

pub use append_conversation::{
    AppendConversationCommand, AppendConversationHandler, AppendOutcome,
};
pub use create_conversation::{CreateConversationCommand, CreateConversationHandler};
pub use errors::{step, ConversationError};
pub use get_conversation::{GetConversationHandler, GetConversationQuery};
pub use next_question::{NextQuestionConfig, NextQuestionGenerator};

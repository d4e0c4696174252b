//! Application handlers.
//!
//! Command and query handlers that orchestrate domain operations.

pub mod conversation;

pub use conversation::{
    AppendConversationCommand, AppendConversationHandler, AppendOutcome, ConversationError,
    CreateConversationCommand, CreateConversationHandler, GetConversationHandler,
    GetConversationQuery, NextQuestionConfig, NextQuestionGenerator,
};

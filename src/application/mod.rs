//! Application layer - Commands, Queries, and Handlers.
//!
//! This layer orchestrates domain operations and coordinates between ports.
//! Commands (create, append) write through the repository before the
//! aggregate changes; the query (get) only reads.

pub mod handlers;

pub use handlers::{
    AppendConversationCommand, AppendConversationHandler, AppendOutcome, ConversationError,
    CreateConversationCommand, CreateConversationHandler, GetConversationHandler,
    GetConversationQuery, NextQuestionConfig, NextQuestionGenerator,
};

//! Ports - Interfaces for external dependencies.
//!
//! Following hexagonal architecture, ports define the contracts between
//! the domain and the outside world. Adapters implement these ports.
//!
//! - `ConversationRepository` - Durable storage of conversations, questions and messages
//! - `AIProvider` - Remote chat-completion service

mod ai_provider;
mod conversation_repository;

pub use ai_provider::{
    AIError, AIProvider, ChatMessage, CompletionRequest, CompletionResponse, FinishReason,
    MessageRole, RequestMetadata, TokenUsage,
};
pub use conversation_repository::{
    ConversationRecord, ConversationRepository, QuestionRecord, RepositoryError,
};

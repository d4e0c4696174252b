//! In-memory adapters.
//!
//! Used by tests and local development where no database is available.

mod conversation_repository;

pub use conversation_repository::{InMemoryConversationRepository, RepositoryOperation};

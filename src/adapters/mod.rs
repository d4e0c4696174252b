//! Adapters - Implementations of port interfaces.
//!
//! Adapters connect the domain to external systems:
//! - `ai` - Completion API clients (OpenAI, mock)
//! - `memory` - In-memory conversation store
//! - `postgres` - PostgreSQL conversation store

pub mod ai;
pub mod memory;
pub mod postgres;

pub use ai::{MockAIProvider, OpenAIConfig, OpenAIProvider};
pub use memory::InMemoryConversationRepository;
pub use postgres::PostgresConversationRepository;

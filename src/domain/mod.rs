//! Domain layer containing business logic and domain types.
//!
//! # Module Organization
//!
//! - `foundation` - Shared domain primitives (identifiers, timestamps, errors)
//! - `conversation` - Conversation aggregate, topic catalog and transcript builder

pub mod conversation;
pub mod foundation;

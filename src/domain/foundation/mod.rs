//! Foundation module - Shared domain primitives.
//!
//! Contains identifiers, timestamps, and the validation error type
//! that form the vocabulary of the interview domain.

mod errors;
mod ids;
mod timestamp;

pub use errors::ValidationError;
pub use ids::{ConversationId, InterviewId, MessageId, QuestionId};
pub use timestamp::Timestamp;

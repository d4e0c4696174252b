//! Strongly-typed identifier value objects.
//!
//! Identifiers are assigned by the repository (database sequences), so they
//! wrap an `i64` rather than being generated locally.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::num::ParseIntError;
use std::str::FromStr;

macro_rules! repository_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(i64);

        impl $name {
            /// Wraps a raw repository-assigned value.
            pub fn new(value: i64) -> Self {
                Self(value)
            }

            /// Returns the raw value.
            pub fn value(&self) -> i64 {
                self.0
            }
        }

        impl From<i64> for $name {
            fn from(value: i64) -> Self {
                Self(value)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl FromStr for $name {
            type Err = ParseIntError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Ok(Self(s.trim().parse()?))
            }
        }
    };
}

repository_id!(
    /// Identifier of the interview that owns a conversation.
    InterviewId
);

repository_id!(
    /// Identifier of a conversation (one per interview).
    ConversationId
);

repository_id!(
    /// Identifier of a persisted question record.
    QuestionId
);

repository_id!(
    /// Identifier of a message.
    ///
    /// Messages that have not been persisted yet carry a provisional id equal
    /// to their 1-based position within the question.
    MessageId
);

impl ConversationId {
    /// Placeholder used before the repository has assigned an id.
    pub const UNASSIGNED: ConversationId = ConversationId(0);

    /// Returns true once the repository has assigned this id.
    pub fn is_assigned(&self) -> bool {
        self.0 > 0
    }
}

impl MessageId {
    /// Provisional id for a message at the given 1-based position.
    pub fn provisional(position: usize) -> Self {
        Self(position as i64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_from_string() {
        let id: QuestionId = " 42 ".parse().unwrap();
        assert_eq!(id.value(), 42);
        assert_eq!(id.to_string(), "42");
    }

    #[test]
    fn rejects_non_numeric_string() {
        assert!("abc".parse::<InterviewId>().is_err());
    }

    #[test]
    fn serializes_transparently() {
        let json = serde_json::to_string(&ConversationId::new(7)).unwrap();
        assert_eq!(json, "7");
    }

    #[test]
    fn unassigned_conversation_id_is_not_assigned() {
        assert!(!ConversationId::UNASSIGNED.is_assigned());
        assert!(ConversationId::new(1).is_assigned());
    }

    #[test]
    fn provisional_message_id_uses_position() {
        assert_eq!(MessageId::provisional(3), MessageId::new(3));
    }
}

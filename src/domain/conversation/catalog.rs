//! Predefined topic catalog.
//!
//! Topics are not user-created: every conversation is scaffolded from the
//! same immutable catalog, which is built once per process and shared.

use crate::domain::foundation::ValidationError;
use serde::{Deserialize, Serialize};

/// Definition of one interview topic.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopicDefinition {
    /// 1-based position of the topic in the interview.
    pub number: u32,
    /// Human readable label.
    pub name: String,
}

impl TopicDefinition {
    pub fn new(number: u32, name: impl Into<String>) -> Self {
        Self {
            number,
            name: name.into(),
        }
    }
}

/// Ordered, immutable set of topic definitions.
///
/// # Invariants
///
/// - Non-empty
/// - Numbered `1..=n` in order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopicCatalog {
    topics: Vec<TopicDefinition>,
}

impl TopicCatalog {
    /// Builds a catalog, validating that numbering is contiguous from 1.
    pub fn new(topics: Vec<TopicDefinition>) -> Result<Self, ValidationError> {
        if topics.is_empty() {
            return Err(ValidationError::empty_field("topics"));
        }

        for (index, topic) in topics.iter().enumerate() {
            let expected = index as u32 + 1;
            if topic.number != expected {
                return Err(ValidationError::NonContiguousNumbering {
                    kind: "topic",
                    expected,
                    actual: topic.number,
                });
            }
            ValidationError::require_text("topic name", &topic.name)?;
        }

        Ok(Self { topics })
    }

    /// The catalog used for backend development interviews.
    pub fn backend_interview() -> Self {
        let topics = [
            "Introduction",
            "Coding",
            "System Design",
            "Databases",
            "Behavioral",
            "Closing",
        ]
        .into_iter()
        .enumerate()
        .map(|(index, name)| TopicDefinition::new(index as u32 + 1, name))
        .collect();

        Self { topics }
    }

    /// Returns all topic definitions in order.
    pub fn topics(&self) -> &[TopicDefinition] {
        &self.topics
    }

    /// Returns the definition with the given number.
    pub fn get(&self, number: u32) -> Option<&TopicDefinition> {
        number
            .checked_sub(1)
            .and_then(|index| self.topics.get(index as usize))
    }

    pub fn len(&self) -> usize {
        self.topics.len()
    }

    pub fn is_empty(&self) -> bool {
        self.topics.is_empty()
    }
}

impl Default for TopicCatalog {
    fn default() -> Self {
        Self::backend_interview()
    }
}

//! Task data structure and id generation.
//!
//! This module defines the `Task` struct that represents a single to-do entry
//! and the `IdGenerator` that hands out unique, strictly increasing ids.

use chrono::Utc;
use serde::{Deserialize, Serialize};

/// A single to-do entry.
///
/// The serialized form is exactly `{"id": number, "title": string, "completed": bool}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub id: u64,
    pub title: String,
    pub completed: bool,
}

impl Task {
    /// Create a new, not yet completed task.
    pub fn new(id: u64, title: impl Into<String>) -> Self {
        Task {
            id,
            title: title.into(),
            completed: false,
        }
    }
}

/// Millisecond-timestamp id source with a per-process tie breaker.
///
/// Each id is `max(now_ms, last + 1)`, so ids strictly increase even when two
/// tasks are created within the same millisecond or the wall clock steps back.
#[derive(Debug, Default)]
pub struct IdGenerator {
    last: u64,
}

impl IdGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the generator so every future id is above `floor`.
    pub fn seeded(floor: u64) -> Self {
        IdGenerator { last: floor }
    }

    /// Seed from an existing list.
    pub fn after(tasks: &[Task]) -> Self {
        Self::seeded(tasks.iter().map(|t| t.id).max().unwrap_or(0))
    }

    /// Produce the next id, or `None` once the id space above the seed is
    /// used up.
    pub fn next_id(&mut self) -> Option<u64> {
        let now = u64::try_from(Utc::now().timestamp_millis()).unwrap_or(0);
        let id = now.max(self.last.checked_add(1)?);
        self.last = id;
        Some(id)
    }

    /// The last id handed out (or the seed).
    pub fn last(&self) -> u64 {
        self.last
    }
}

//! Record of fired transitions.
//!
//! The machine itself keeps no per-call state. Callers who want a trail of
//! what happened pass a `StateHistory` in and get an extended one back,
//! following the same immutable `record` style throughout.

use crate::engine::TransitionKind;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// One transition that fired while processing an event.
///
/// # Example
///
/// ```rust
/// use chrono::Utc;
/// use statechart::core::TransitionRecord;
/// use statechart::engine::TransitionKind;
///
/// let record = TransitionRecord {
///     from: "idle",
///     source: "idle",
///     target: "running",
///     to: "running",
///     kind: TransitionKind::External,
///     step: 0,
///     timestamp: Utc::now(),
/// };
/// assert_eq!(record.to, "running");
/// ```
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TransitionRecord<U> {
    /// The active leaf state before the transition
    pub from: U,
    /// The transition's declared source, the active state or an ancestor
    pub source: U,
    /// The transition's declared target
    pub target: U,
    /// The leaf state the machine settled in after the initial cascade
    pub to: U,
    /// External or local
    pub kind: TransitionKind,
    /// Position of the transition within the processing of one event
    pub step: usize,
    /// When the transition completed
    pub timestamp: DateTime<Utc>,
}

/// Ordered history of fired transitions.
///
/// `record` returns a new history and leaves the original untouched.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StateHistory<U> {
    transitions: Vec<TransitionRecord<U>>,
}

impl<U> StateHistory<U> {
    /// Create an empty history.
    pub fn new() -> Self {
        Self {
            transitions: Vec::new(),
        }
    }

    /// Return a new history with `record` appended.
    pub fn record(&self, record: TransitionRecord<U>) -> Self
    where
        U: Clone,
    {
        let mut transitions = self.transitions.clone();
        transitions.push(record);
        Self { transitions }
    }

    /// Leaf states visited: the state before the first transition, then
    /// the settled state after each one.
    pub fn get_path(&self) -> Vec<&U> {
        let mut path = Vec::new();
        if let Some(first) = self.transitions.first() {
            path.push(&first.from);
        }
        for record in &self.transitions {
            path.push(&record.to);
        }
        path
    }

    /// Time between the first and the last recorded transition.
    pub fn duration(&self) -> Option<Duration> {
        if let (Some(first), Some(last)) = (self.transitions.first(), self.transitions.last()) {
            let duration = last.timestamp.signed_duration_since(first.timestamp);
            duration.to_std().ok()
        } else {
            None
        }
    }

    /// All records in firing order.
    pub fn transitions(&self) -> &[TransitionRecord<U>] {
        &self.transitions
    }

    pub fn len(&self) -> usize {
        self.transitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.transitions.is_empty()
    }
}

impl<U> Default for StateHistory<U> {
    fn default() -> Self {
        Self::new()
    }
}

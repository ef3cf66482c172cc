//! Build errors for machine and transition builders.

use thiserror::Error;

/// A whole-graph structural problem found by `build()`.
///
/// `build()` reports every violation it finds, not just the first.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum Violation {
    #[error("local transition from {from} to {to} joins unrelated states")]
    UnrelatedLocalTransition { from: String, to: String },

    #[error("state {0} is unreachable from the initial state")]
    UnreachableState(String),

    #[error("final state {0} has an outgoing transition")]
    FinalStateTransition(String),

    #[error("final state {0} has substates")]
    CompositeFinalState(String),

    #[error("initial transition from {from} targets {to}, which is not its direct substate")]
    StrayInitialTransition { from: String, to: String },
}

/// Errors that can occur when building machines and transitions.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum BuildError {
    #[error("Top-level initial transition not specified. Call .with_initial_transition(state) before .build()")]
    MissingInitialTransition,

    #[error("Initial state {state} is nested in {superstate}; the top-level initial transition must target a top-level state")]
    NestedInitialTarget { state: String, superstate: String },

    #[error("State {substate} cannot be a substate of {superstate}: it is {superstate} or one of its ancestors")]
    CyclicNesting { superstate: String, substate: String },

    #[error("State {state} is already a substate of {existing}, cannot also nest it in {requested}")]
    ConflictingSuperstate {
        state: String,
        existing: String,
        requested: String,
    },

    #[error("State {0} already has a behaviour")]
    DuplicateState(String),

    #[error("State {0} already has an initial transition")]
    DuplicateInitialTransition(String),

    #[error("Maximum transitions per event must be greater than zero")]
    InvalidMaxTransitions,

    #[error("Transition source state not specified. Call .from(state)")]
    MissingSource,

    #[error("Transition target state not specified. Call .to(state)")]
    MissingTarget,

    #[error("Initial transition from {0} cannot have a trigger")]
    TriggeredInitialTransition(String),

    #[error("Initial transition from {0} cannot have a guard")]
    GuardedInitialTransition(String),

    #[error("Invalid machine definition: {}", .0.iter().map(ToString::to_string).collect::<Vec<_>>().join("; "))]
    Invalid(Vec<Violation>),
}

impl BuildError {
    /// The structural violations, if this is an `Invalid` error.
    pub fn violations(&self) -> &[Violation] {
        match self {
            Self::Invalid(violations) => violations,
            _ => &[],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_lists_every_violation() {
        let error = BuildError::Invalid(vec![
            Violation::UnreachableState("\"a\"".to_string()),
            Violation::FinalStateTransition("\"done\"".to_string()),
        ]);

        assert_eq!(
            error.to_string(),
            "Invalid machine definition: state \"a\" is unreachable from the initial state; \
             final state \"done\" has an outgoing transition"
        );
        assert_eq!(error.violations().len(), 2);
    }

    #[test]
    fn other_errors_have_no_violations() {
        assert!(BuildError::MissingInitialTransition.violations().is_empty());
    }
}

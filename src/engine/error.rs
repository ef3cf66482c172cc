//! Errors raised while a built machine runs.

use crate::core::{CallbackError, UnrelatedStates};
use std::fmt;
use thiserror::Error;

/// Which caller callback failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Callback {
    Entry,
    Exit,
    Event,
    Guard,
    Action,
    InitialAction,
    Resolver,
}

impl fmt::Display for Callback {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Entry => "on_entry",
            Self::Exit => "on_exit",
            Self::Event => "on_event",
            Self::Guard => "guard",
            Self::Action => "action",
            Self::InitialAction => "initial action",
            Self::Resolver => "transition resolver",
        };
        f.write_str(name)
    }
}

/// A caller callback failed while the machine was running.
///
/// Callbacks that ran before the failure are not undone.
#[derive(Debug, Error)]
#[error("{callback} failed at {location}: {source}")]
pub struct ExecutionError {
    pub callback: Callback,
    /// The state, or `source -> target` of the transition, being processed
    pub location: String,
    #[source]
    pub source: CallbackError,
}

/// Errors that can occur during `start` and `process_event`.
#[derive(Debug, Error)]
pub enum MachineError {
    #[error("Unknown state {0}")]
    UnknownState(String),

    #[error("Transition limit of {max} per event reached in state {state}")]
    MaxTransitionsExceeded { max: usize, state: String },

    #[error(transparent)]
    Execution(#[from] ExecutionError),

    #[error(transparent)]
    Hierarchy(#[from] UnrelatedStates),
}

impl MachineError {
    /// The failed callback, if this error wraps one.
    pub fn execution(&self) -> Option<&ExecutionError> {
        match self {
            Self::Execution(error) => Some(error),
            _ => None,
        }
    }
}

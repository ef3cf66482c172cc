//! The built machine and its interpreter.
//!
//! A [`StateMachine`] is immutable: the tree, the transition table and the
//! configuration are frozen by the builder. All per-run state lives in the
//! caller's context and the state id the caller passes in.
//!
//! # Key Concepts
//!
//! - **Steps**: one step offers the pending signal to the active state
//!   and its superstates, selects one transition, runs exits, the action
//!   and entries, then cascades through initial transitions to a leaf
//! - **Follow-up steps**: after a transition fires, triggerless
//!   transitions and completion signals may fire more, bounded per event
//! - **Resolvers**: decide between several transitions firing at once

mod describe;
mod error;
pub(crate) mod machine;
mod resolver;
mod transition;

pub use describe::{MachineDescription, StateDescription, TransitionDescription};
pub use error::{Callback, ExecutionError, MachineError};
pub use machine::StateMachine;
pub use resolver::{AmbiguousTransitions, MultipleTransitionsResolver, NearestFirst, RejectAmbiguity};
pub use transition::{Transition, TransitionKind, TransitionTable};

//! Builder API for machine definitions.
//!
//! Definitions are accumulated by a fluent [`StateMachineBuilder`] and
//! validated as a whole by `build()`, which freezes them into an immutable
//! [`StateMachine`](crate::engine::StateMachine).

mod composite;
pub mod error;
mod machine;
pub mod macros;
mod transition;
mod validation;

pub use composite::CompositeState;
pub use error::{BuildError, Violation};
pub use machine::{StateMachineBuilder, DEFAULT_MAX_TRANSITIONS_PER_EVENT};
pub use transition::{TransitionBuilder, TransitionDefinition};

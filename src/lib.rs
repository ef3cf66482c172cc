//! Statechart: hierarchical state machines with UML semantics
//!
//! A machine is a tree of states plus a table of guarded transitions. It
//! drives a caller-owned context through entry, exit and event callbacks,
//! honouring composite-state semantics: nested states, initial
//! transitions, local versus external transitions and completion events.
//!
//! # Core Concepts
//!
//! - **State**: behaviour attached to a caller-chosen identity
//! - **Composite state**: a state with substates and a default substate
//! - **Transition**: external or local, optionally triggered, guarded and
//!   carrying an action
//! - **Builder**: accumulates a definition and validates it as a whole
//! - **Machine**: immutable and shareable; `start` and `process_event`
//!   take the context and the current state id on every call
//!
//! # Example
//!
//! ```rust
//! use statechart::builder::StateMachineBuilder;
//! use statechart::core::{CallbackError, State};
//! use statechart::event_enum;
//!
//! event_enum! {
//!     pub enum Door {
//!         Open,
//!         Close,
//!     }
//! }
//!
//! struct Announce(&'static str);
//!
//! impl State<&'static str, Vec<String>, Door> for Announce {
//!     fn on_entry(&self, log: &mut Vec<String>) -> Result<(), CallbackError> {
//!         log.push(format!("enter {}", self.0));
//!         Ok(())
//!     }
//! }
//!
//! let machine = StateMachineBuilder::<&str, Vec<String>, Door>::new()
//!     .with_state("closed", Announce("closed"))
//!     .with_state("open", Announce("open"))
//!     .with_initial_transition("closed")
//!     .with_transition_on("closed", "open", Door::Open)
//!     .with_transition_on("open", "closed", Door::Close)
//!     .build()
//!     .unwrap();
//!
//! let mut log = Vec::new();
//! let state = machine.start(&mut log).unwrap();
//! let state = machine.process_event(&mut log, &state, Door::Open).unwrap();
//!
//! assert_eq!(state, "open");
//! assert_eq!(log, vec!["enter closed", "enter open"]);
//! ```

pub mod builder;
pub mod core;
pub mod engine;

// Re-export commonly used types
pub use builder::{BuildError, StateMachineBuilder, TransitionBuilder};
pub use core::{Event, Guard, Signal, State, StateId};
pub use engine::{MachineError, StateMachine, TransitionKind};

//! Core model types.
//!
//! This module contains the pieces a machine definition is made of:
//! - State identities and behaviour via the `State` trait
//! - Events, completion signals and triggers
//! - Guards and actions
//! - The state hierarchy (`StateTree`)
//! - Immutable history of fired transitions

mod action;
mod event;
mod guard;
mod history;
mod state;
mod tree;

pub use action::{Action, CallbackError, InitialAction};
pub use event::{Event, Signal, Trigger};
pub use guard::Guard;
pub use history::{StateHistory, TransitionRecord};
pub use state::{Passive, State, StateId};
pub use tree::{StateKey, StateTree, UnrelatedStates};

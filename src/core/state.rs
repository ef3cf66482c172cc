//! State identities and state behaviour.
//!
//! A state is named by a caller-chosen identity (`StateId`) and carries
//! behaviour through the `State` trait. The machine never inspects the
//! behaviour beyond the three callbacks defined here.

use super::action::CallbackError;
use super::event::{Event, Signal};
use std::fmt::Debug;
use std::hash::Hash;

/// Identity of a state.
///
/// Any cloneable, hashable, debuggable value works: `&'static str`,
/// a unit enum, an integer. Two states are the same state exactly when
/// their identities compare equal.
pub trait StateId: Clone + Eq + Hash + Debug + Send + Sync + 'static {}

impl<T> StateId for T where T: Clone + Eq + Hash + Debug + Send + Sync + 'static {}

/// Behaviour attached to a state.
///
/// All callbacks receive the caller-owned context. Every method has a
/// no-op default, so a behaviour only overrides what it needs.
///
/// # Example
///
/// ```rust
/// use statechart::core::{CallbackError, Signal, State};
/// use statechart::event_enum;
///
/// event_enum! {
///     pub enum Switch {
///         Toggle,
///     }
/// }
///
/// struct Lamp;
///
/// impl State<&'static str, Vec<String>, Switch> for Lamp {
///     fn on_entry(&self, log: &mut Vec<String>) -> Result<(), CallbackError> {
///         log.push("lamp on".to_string());
///         Ok(())
///     }
///
///     fn on_exit(&self, log: &mut Vec<String>) -> Result<(), CallbackError> {
///         log.push("lamp off".to_string());
///         Ok(())
///     }
/// }
///
/// let mut log = Vec::new();
/// Lamp.on_entry(&mut log).unwrap();
/// assert_eq!(log, vec!["lamp on".to_string()]);
/// ```
pub trait State<U, C, E: Event>: Send + Sync {
    /// Called when the state is entered.
    fn on_entry(&self, _context: &mut C) -> Result<(), CallbackError> {
        Ok(())
    }

    /// Called when the state is exited.
    fn on_exit(&self, _context: &mut C) -> Result<(), CallbackError> {
        Ok(())
    }

    /// Called while a signal bubbles from the active state towards the root.
    ///
    /// Returning `Ok(true)` consumes the signal: its superstates are not
    /// called. Returning `Ok(false)` passes it on to the superstate.
    /// Consumption only stops the bubbling; transitions are still selected.
    fn on_event(&self, _context: &mut C, _signal: &Signal<E, U>) -> Result<bool, CallbackError> {
        Ok(false)
    }
}

/// Behaviour that does nothing.
///
/// States that are only named by transitions or composite registrations
/// are given this behaviour.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Passive;

impl<U, C, E: Event> State<U, C, E> for Passive {}

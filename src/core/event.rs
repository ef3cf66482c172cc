//! Events, the signals delivered to callbacks, and transition triggers.

use serde::{Deserialize, Serialize};
use std::fmt::Debug;

/// A caller-defined event.
///
/// Transitions are triggered by the event's kind rather than by the
/// event value, so events may carry payloads while transitions match on
/// a plain discriminant. Unit enums can use [`event_enum!`](crate::event_enum),
/// which makes the kind the event itself.
pub trait Event: Debug + Send + Sync {
    /// Discriminant that transitions are triggered by.
    type Kind: Clone + Eq + Debug + Send + Sync + 'static;

    /// The kind of this event.
    fn kind(&self) -> Self::Kind;
}

/// What a callback is handed while the machine processes an event.
///
/// Either the caller's event, or the completion signal the machine
/// synthesises after settling in a final state that has a superstate.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Signal<E, U> {
    /// An event passed to `process_event`.
    Event(E),

    /// A final substate of a composite state was reached. Carries the
    /// identity of that final state.
    CompositeStateCompleted(U),
}

impl<E: Event, U> Signal<E, U> {
    /// Check whether this signal fires the given trigger.
    pub fn matches(&self, trigger: &Trigger<E::Kind>) -> bool {
        match (self, trigger) {
            (Signal::Event(event), Trigger::Event(kind)) => event.kind() == *kind,
            (Signal::CompositeStateCompleted(_), Trigger::CompositeStateCompleted) => true,
            _ => false,
        }
    }

    /// The caller event, if this is not a completion signal.
    pub fn event(&self) -> Option<&E> {
        match self {
            Signal::Event(event) => Some(event),
            Signal::CompositeStateCompleted(_) => None,
        }
    }

    /// The final state that was reached, if this is a completion signal.
    pub fn completed_state(&self) -> Option<&U> {
        match self {
            Signal::Event(_) => None,
            Signal::CompositeStateCompleted(state) => Some(state),
        }
    }
}

/// What a transition is triggered by.
///
/// A transition without a trigger is triggerless: it is only eligible
/// while no signal is pending.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Trigger<K> {
    /// Caller events of this kind.
    Event(K),

    /// Any completion signal. Pair with
    /// [`Guard::on_completion_of`](crate::core::Guard::on_completion_of)
    /// to react to one particular final state.
    CompositeStateCompleted,
}

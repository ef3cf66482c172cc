//! Frozen transitions and the table indexing them by source state.

use crate::core::{Action, CallbackError, Event, Guard, Signal, StateKey, Trigger};
use serde::{Deserialize, Serialize};
use std::fmt;

/// How a transition treats the boundary of its lowest common ancestor.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TransitionKind {
    /// Exits and re-enters the common ancestor when it is one of the
    /// endpoints, so a self-transition runs exit and entry.
    External,
    /// Never exits or enters the common ancestor.
    Local,
    /// The default edge from a composite state, or the root, into one of
    /// its direct substates.
    Initial,
}

/// A transition of a built machine.
pub struct Transition<U, C, E: Event> {
    pub(crate) source: Option<U>,
    pub(crate) target: U,
    pub(crate) source_key: StateKey,
    pub(crate) target_key: StateKey,
    pub(crate) kind: TransitionKind,
    pub(crate) trigger: Option<Trigger<E::Kind>>,
    pub(crate) guard: Option<Guard<U, C, E>>,
    pub(crate) action: Option<Action<U, C, E>>,
}

impl<U, C, E: Event> Transition<U, C, E> {
    /// Declared source; `None` for the top-level initial transition, whose
    /// source is the root.
    pub fn source(&self) -> Option<&U> {
        self.source.as_ref()
    }

    /// Declared target.
    pub fn target(&self) -> &U {
        &self.target
    }

    pub fn source_key(&self) -> StateKey {
        self.source_key
    }

    pub fn target_key(&self) -> StateKey {
        self.target_key
    }

    pub fn kind(&self) -> TransitionKind {
        self.kind
    }

    pub fn trigger(&self) -> Option<&Trigger<E::Kind>> {
        self.trigger.as_ref()
    }

    pub fn is_guarded(&self) -> bool {
        self.guard.is_some()
    }

    pub fn has_action(&self) -> bool {
        self.action.is_some()
    }

    /// Whether the trigger matches the pending signal.
    ///
    /// A triggered transition needs a signal that matches; a triggerless
    /// one needs the absence of any signal.
    pub fn is_triggered_by(&self, signal: Option<&Signal<E, U>>) -> bool {
        match (&self.trigger, signal) {
            (Some(trigger), Some(signal)) => signal.matches(trigger),
            (None, None) => true,
            _ => false,
        }
    }

    /// Evaluate the guard; an unguarded transition always passes.
    pub fn guard_allows(&self, context: &C, signal: Option<&Signal<E, U>>) -> Result<bool, CallbackError> {
        match &self.guard {
            Some(guard) => guard.evaluate(context, signal),
            None => Ok(true),
        }
    }
}

impl<U: fmt::Debug, C, E: Event> fmt::Debug for Transition<U, C, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Transition")
            .field("source", &self.source)
            .field("target", &self.target)
            .field("kind", &self.kind)
            .field("trigger", &self.trigger)
            .field("guarded", &self.guard.is_some())
            .finish()
    }
}

/// Transitions of a machine, indexed by source state.
pub struct TransitionTable<U, C, E: Event> {
    transitions: Vec<Transition<U, C, E>>,
    outgoing: Vec<Vec<usize>>,
    initial: Vec<Option<usize>>,
}

impl<U, C, E: Event> TransitionTable<U, C, E> {
    /// Index `transitions` for a tree of `state_count` states, root included.
    ///
    /// Each source has at most one initial transition; the builder rejects
    /// a second one before it gets here.
    pub(crate) fn new(transitions: Vec<Transition<U, C, E>>, state_count: usize) -> Self {
        let mut outgoing = vec![Vec::new(); state_count];
        let mut initial = vec![None; state_count];

        for (position, transition) in transitions.iter().enumerate() {
            let source = transition.source_key.index();
            if source >= state_count {
                continue;
            }
            match transition.kind {
                TransitionKind::Initial => initial[source] = Some(position),
                TransitionKind::External | TransitionKind::Local => outgoing[source].push(position),
            }
        }

        Self {
            transitions,
            outgoing,
            initial,
        }
    }

    /// Ordinary transitions leaving `state`, in registration order.
    pub fn transitions_from(&self, state: StateKey) -> impl Iterator<Item = &Transition<U, C, E>> + '_ {
        self.outgoing
            .get(state.index())
            .into_iter()
            .flatten()
            .map(move |&position| &self.transitions[position])
    }

    /// The initial transition of a composite state or the root.
    pub fn initial_transition_from(&self, state: StateKey) -> Option<&Transition<U, C, E>> {
        self.initial
            .get(state.index())
            .copied()
            .flatten()
            .map(|position| &self.transitions[position])
    }

    /// Every transition, initial ones included, in registration order.
    pub fn all(&self) -> &[Transition<U, C, E>] {
        &self.transitions
    }

    pub fn len(&self) -> usize {
        self.transitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.transitions.is_empty()
    }
}

impl<U: fmt::Debug, C, E: Event> fmt::Debug for TransitionTable<U, C, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(&self.transitions).finish()
    }
}

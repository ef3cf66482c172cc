//! Builder for defining transitions.

use crate::builder::error::BuildError;
use crate::core::{Action, CallbackError, Event, Guard, Signal, StateId, Trigger};
use crate::engine::TransitionKind;

/// A validated transition definition, ready to be added to a
/// [`StateMachineBuilder`](crate::builder::StateMachineBuilder).
pub struct TransitionDefinition<U, C, E: Event> {
    pub(crate) from: U,
    pub(crate) to: U,
    pub(crate) kind: TransitionKind,
    pub(crate) trigger: Option<Trigger<E::Kind>>,
    pub(crate) guard: Option<Guard<U, C, E>>,
    pub(crate) action: Option<Action<U, C, E>>,
}

impl<U, C, E: Event> TransitionDefinition<U, C, E> {
    pub fn from(&self) -> &U {
        &self.from
    }

    pub fn to(&self) -> &U {
        &self.to
    }

    pub fn kind(&self) -> TransitionKind {
        self.kind
    }
}

/// Builder for transitions with a fluent API.
///
/// Transitions are external and triggerless unless configured otherwise.
pub struct TransitionBuilder<U, C, E: Event> {
    from: Option<U>,
    to: Option<U>,
    kind: TransitionKind,
    trigger: Option<Trigger<E::Kind>>,
    guard: Option<Guard<U, C, E>>,
    action: Option<Action<U, C, E>>,
}

impl<U: StateId, C, E: Event> TransitionBuilder<U, C, E> {
    /// Create a new transition builder.
    pub fn new() -> Self {
        Self {
            from: None,
            to: None,
            kind: TransitionKind::External,
            trigger: None,
            guard: None,
            action: None,
        }
    }

    /// Set the source state (required).
    pub fn from(mut self, state: U) -> Self {
        self.from = Some(state);
        self
    }

    /// Set the target state (required).
    pub fn to(mut self, state: U) -> Self {
        self.to = Some(state);
        self
    }

    /// Make this a local transition.
    pub fn local(self) -> Self {
        self.kind(TransitionKind::Local)
    }

    /// Make this an external transition (the default).
    pub fn external(self) -> Self {
        self.kind(TransitionKind::External)
    }

    /// Set the kind explicitly. An initial transition may carry neither a
    /// trigger nor a guard, which `build()` checks.
    ///
    /// Composite registration already creates the initial transition to the
    /// default substate, and a state has at most one. An explicit
    /// [`TransitionKind::Initial`] definition added to a
    /// [`StateMachineBuilder`](crate::builder::StateMachineBuilder) is
    /// therefore always rejected by `build()`: as a duplicate when its source
    /// is composite, otherwise because its target is not a direct substate.
    /// Use [`CompositeState`](crate::builder::CompositeState) to attach an
    /// initial action instead.
    pub fn kind(mut self, kind: TransitionKind) -> Self {
        self.kind = kind;
        self
    }

    /// Trigger on caller events of `kind`.
    pub fn on(mut self, kind: E::Kind) -> Self {
        self.trigger = Some(Trigger::Event(kind));
        self
    }

    /// Trigger on completion signals.
    pub fn on_completion(mut self) -> Self {
        self.trigger = Some(Trigger::CompositeStateCompleted);
        self
    }

    /// Add a guard.
    pub fn guard(mut self, guard: Guard<U, C, E>) -> Self {
        self.guard = Some(guard);
        self
    }

    /// Add a guard using a closure.
    pub fn when<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&C, Option<&Signal<E, U>>) -> bool + Send + Sync + 'static,
    {
        self.guard = Some(Guard::new(predicate));
        self
    }

    /// Set the action run between exits and entries.
    pub fn action(mut self, action: Action<U, C, E>) -> Self {
        self.action = Some(action);
        self
    }

    /// Set the action using a closure.
    pub fn then<F>(mut self, effect: F) -> Self
    where
        F: Fn(&mut C, Option<&Signal<E, U>>) -> Result<(), CallbackError> + Send + Sync + 'static,
    {
        self.action = Some(Action::fallible(effect));
        self
    }

    /// Build the transition definition.
    pub fn build(self) -> Result<TransitionDefinition<U, C, E>, BuildError> {
        let from = self.from.ok_or(BuildError::MissingSource)?;
        let to = self.to.ok_or(BuildError::MissingTarget)?;

        if self.kind == TransitionKind::Initial {
            if self.trigger.is_some() {
                return Err(BuildError::TriggeredInitialTransition(format!("{from:?}")));
            }
            if self.guard.is_some() {
                return Err(BuildError::GuardedInitialTransition(format!("{from:?}")));
            }
        }

        Ok(TransitionDefinition {
            from,
            to,
            kind: self.kind,
            trigger: self.trigger,
            guard: self.guard,
            action: self.action,
        })
    }
}

impl<U: StateId, C, E: Event> Default for TransitionBuilder<U, C, E> {
    fn default() -> Self {
        Self::new()
    }
}

//! Side-effecting callbacks run while a transition fires.

use super::event::{Event, Signal};
use std::fmt;
use std::sync::Arc;

/// Error a caller callback may return.
///
/// Any error type converts into it with `?` or `.into()`, including
/// plain strings.
pub type CallbackError = Box<dyn std::error::Error + Send + Sync + 'static>;

type ActionFn<U, C, E> =
    Arc<dyn Fn(&mut C, Option<&Signal<E, U>>) -> Result<(), CallbackError> + Send + Sync>;

/// Procedure executed between the exits and the entries of a transition.
///
/// Receives the signal that triggered the transition, or `None` for a
/// triggerless transition.
pub struct Action<U, C, E: Event> {
    effect: ActionFn<U, C, E>,
}

impl<U, C, E: Event> Action<U, C, E> {
    /// Create an action that cannot fail.
    pub fn new<F>(effect: F) -> Self
    where
        F: Fn(&mut C, Option<&Signal<E, U>>) + Send + Sync + 'static,
    {
        Self {
            effect: Arc::new(move |context, signal| {
                effect(context, signal);
                Ok(())
            }),
        }
    }

    /// Create an action that may fail.
    pub fn fallible<F>(effect: F) -> Self
    where
        F: Fn(&mut C, Option<&Signal<E, U>>) -> Result<(), CallbackError> + Send + Sync + 'static,
    {
        Self {
            effect: Arc::new(effect),
        }
    }

    /// Run the action.
    pub fn execute(&self, context: &mut C, signal: Option<&Signal<E, U>>) -> Result<(), CallbackError> {
        (self.effect)(context, signal)
    }
}

impl<U, C, E: Event> Clone for Action<U, C, E> {
    fn clone(&self) -> Self {
        Self {
            effect: Arc::clone(&self.effect),
        }
    }
}

impl<U, C, E: Event> fmt::Debug for Action<U, C, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Action")
    }
}

/// Procedure executed by an initial transition while cascading into a
/// composite state. Never sees a signal.
pub struct InitialAction<C> {
    effect: Arc<dyn Fn(&mut C) -> Result<(), CallbackError> + Send + Sync>,
}

impl<C> InitialAction<C> {
    /// Create an initial action that cannot fail.
    pub fn new<F>(effect: F) -> Self
    where
        F: Fn(&mut C) + Send + Sync + 'static,
    {
        Self {
            effect: Arc::new(move |context| {
                effect(context);
                Ok(())
            }),
        }
    }

    /// Create an initial action that may fail.
    pub fn fallible<F>(effect: F) -> Self
    where
        F: Fn(&mut C) -> Result<(), CallbackError> + Send + Sync + 'static,
    {
        Self {
            effect: Arc::new(effect),
        }
    }

    /// Run the action.
    pub fn execute(&self, context: &mut C) -> Result<(), CallbackError> {
        (self.effect)(context)
    }
}

impl<C> Clone for InitialAction<C> {
    fn clone(&self) -> Self {
        Self {
            effect: Arc::clone(&self.effect),
        }
    }
}

impl<C> fmt::Debug for InitialAction<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("InitialAction")
    }
}

impl<U, C: 'static, E: Event> From<InitialAction<C>> for Action<U, C, E> {
    fn from(initial: InitialAction<C>) -> Self {
        Self {
            effect: Arc::new(move |context, _signal| initial.execute(context)),
        }
    }
}

//! Guard predicates for controlling transitions.
//!
//! A guard is evaluated after a transition's trigger matched. It sees the
//! caller's context read-only and the pending signal, if any. Guards may
//! fail; a failure aborts the step instead of counting as `false`.

use super::action::CallbackError;
use super::event::{Event, Signal};
use std::fmt;

type Predicate<U, C, E> =
    Box<dyn Fn(&C, Option<&Signal<E, U>>) -> Result<bool, CallbackError> + Send + Sync>;

/// Predicate that decides whether a matching transition may fire.
///
/// # Example
///
/// ```rust
/// use statechart::core::{Guard, Signal};
/// use statechart::event_enum;
///
/// event_enum! {
///     pub enum Coin {
///         Insert,
///     }
/// }
///
/// struct Turnstile {
///     credit: u32,
/// }
///
/// let paid: Guard<&str, Turnstile, Coin> = Guard::new(|t: &Turnstile, _| t.credit > 0);
///
/// assert!(paid.evaluate(&Turnstile { credit: 1 }, None).unwrap());
/// assert!(!paid.evaluate(&Turnstile { credit: 0 }, Some(&Signal::Event(Coin::Insert))).unwrap());
/// ```
pub struct Guard<U, C, E: Event> {
    predicate: Predicate<U, C, E>,
}

impl<U, C, E: Event> Guard<U, C, E> {
    /// Create a guard from a predicate that cannot fail.
    pub fn new<F>(predicate: F) -> Self
    where
        F: Fn(&C, Option<&Signal<E, U>>) -> bool + Send + Sync + 'static,
    {
        Self {
            predicate: Box::new(move |context, signal| Ok(predicate(context, signal))),
        }
    }

    /// Create a guard from a predicate that may fail.
    pub fn fallible<F>(predicate: F) -> Self
    where
        F: Fn(&C, Option<&Signal<E, U>>) -> Result<bool, CallbackError> + Send + Sync + 'static,
    {
        Self {
            predicate: Box::new(predicate),
        }
    }

    /// Evaluate the guard.
    pub fn evaluate(&self, context: &C, signal: Option<&Signal<E, U>>) -> Result<bool, CallbackError> {
        (self.predicate)(context, signal)
    }
}

impl<U, C, E> Guard<U, C, E>
where
    U: PartialEq + Send + Sync + 'static,
    E: Event,
{
    /// Guard that holds only for the completion signal of `final_state`.
    pub fn on_completion_of(final_state: U) -> Self {
        Self::new(move |_, signal| {
            matches!(signal, Some(Signal::CompositeStateCompleted(state)) if *state == final_state)
        })
    }
}

impl<U, C, E: Event> fmt::Debug for Guard<U, C, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Guard")
    }
}

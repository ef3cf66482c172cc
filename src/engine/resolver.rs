//! Choosing among several transitions that fire for the same signal.

use super::transition::Transition;
use crate::core::{CallbackError, Event, Signal};
use std::fmt::Debug;
use thiserror::Error;

/// Picks one transition when more than one matched in a step.
///
/// Candidates are ordered nearest-first: transitions leaving the active
/// state come before those leaving its superstate, and so on up to the
/// top level. The chosen transition must be one of the candidates.
pub trait MultipleTransitionsResolver<U, C, E: Event>: Send + Sync {
    fn resolve<'t>(
        &self,
        state: &U,
        context: &C,
        signal: Option<&Signal<E, U>>,
        candidates: &[&'t Transition<U, C, E>],
    ) -> Result<&'t Transition<U, C, E>, CallbackError>;
}

/// Several transitions matched and the resolver refused to choose.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{} transitions triggered in state {state}: {}", .candidates.len(), .candidates.join(", "))]
pub struct AmbiguousTransitions {
    pub state: String,
    /// One `source -> target` entry per matching transition, nearest first
    pub candidates: Vec<String>,
}

/// Default resolver: ambiguity is an error.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RejectAmbiguity;

impl<U: Debug, C, E: Event> MultipleTransitionsResolver<U, C, E> for RejectAmbiguity {
    fn resolve<'t>(
        &self,
        state: &U,
        _context: &C,
        _signal: Option<&Signal<E, U>>,
        candidates: &[&'t Transition<U, C, E>],
    ) -> Result<&'t Transition<U, C, E>, CallbackError> {
        let candidates = candidates
            .iter()
            .map(|transition| describe(*transition))
            .collect::<Vec<_>>();
        tracing::warn!(state = ?state, ?candidates, "ambiguous transitions");

        Err(Box::new(AmbiguousTransitions {
            state: format!("{state:?}"),
            candidates,
        }))
    }
}

/// Resolver that takes the transition declared closest to the active state,
/// the first registered one among equals.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NearestFirst;

impl<U: Debug, C, E: Event> MultipleTransitionsResolver<U, C, E> for NearestFirst {
    fn resolve<'t>(
        &self,
        state: &U,
        _context: &C,
        _signal: Option<&Signal<E, U>>,
        candidates: &[&'t Transition<U, C, E>],
    ) -> Result<&'t Transition<U, C, E>, CallbackError> {
        candidates
            .first()
            .copied()
            .ok_or_else(|| format!("no candidate transitions in state {state:?}").into())
    }
}

pub(crate) fn describe<U: Debug, C, E: Event>(transition: &Transition<U, C, E>) -> String {
    match transition.source() {
        Some(source) => format!("{:?} -> {:?}", source, transition.target()),
        None => format!("<root> -> {:?}", transition.target()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::StateKey;
    use crate::engine::TransitionKind;
    use crate::event_enum;

    event_enum! {
        enum Go {
            Go,
        }
    }

    fn transition(source: &'static str, target: &'static str) -> Transition<&'static str, (), Go> {
        Transition {
            source: Some(source),
            target,
            source_key: StateKey::new(1),
            target_key: StateKey::new(2),
            kind: TransitionKind::External,
            trigger: None,
            guard: None,
            action: None,
        }
    }

    #[test]
    fn reject_ambiguity_lists_candidates() {
        let first = transition("a", "b");
        let second = transition("parent", "c");

        let error = RejectAmbiguity
            .resolve(&"a", &(), None, &[&first, &second])
            .unwrap_err();
        let ambiguous = error.downcast_ref::<AmbiguousTransitions>().unwrap();

        assert_eq!(ambiguous.state, "\"a\"");
        assert_eq!(
            ambiguous.candidates,
            vec!["\"a\" -> \"b\"".to_string(), "\"parent\" -> \"c\"".to_string()]
        );
    }

    #[test]
    fn nearest_first_picks_first_candidate() {
        let first = transition("a", "b");
        let second = transition("parent", "c");

        let chosen = NearestFirst
            .resolve(&"a", &(), None, &[&first, &second])
            .unwrap();

        assert_eq!(chosen.target(), &"b");
    }

    #[test]
    fn nearest_first_without_candidates_fails() {
        let candidates: [&Transition<&'static str, (), Go>; 0] = [];

        assert!(NearestFirst.resolve(&"a", &(), None, &candidates).is_err());
    }
}

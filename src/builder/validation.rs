//! Whole-graph checks run by `build()`.
//!
//! Every check contributes its violations to one `Validation`, so a
//! broken definition is reported in full rather than one problem at a time.

use crate::builder::error::Violation;
use crate::core::{Event, StateKey, StateTree};
use crate::engine::{TransitionKind, TransitionTable};
use std::collections::{HashSet, VecDeque};
use stillwater::validation::Validation;
use stillwater::NonEmptyVec;

type Checked = Validation<(), NonEmptyVec<Violation>>;

/// Display names and finality of every state, indexed by key; slot zero is
/// the root.
pub(crate) struct Layout {
    pub(crate) names: Vec<String>,
    pub(crate) finals: Vec<bool>,
}

impl Layout {
    fn name(&self, key: StateKey) -> String {
        self.names
            .get(key.index())
            .cloned()
            .unwrap_or_else(|| format!("{key:?}"))
    }

    fn is_final(&self, key: StateKey) -> bool {
        self.finals.get(key.index()).copied().unwrap_or(false)
    }
}

/// Run every structural check, accumulating all violations.
pub(crate) fn validate<U, C, E: Event>(
    tree: &StateTree,
    table: &TransitionTable<U, C, E>,
    layout: &Layout,
    initial: StateKey,
) -> Checked {
    let violations = local_transitions(tree, table, layout)
        .into_iter()
        .chain(initial_transitions(tree, table, layout))
        .chain(final_states(tree, table, layout))
        .chain(unreachable_states(tree, table, layout, initial));

    let mut checks: Vec<Checked> = vec![Validation::success(())];
    checks.extend(violations.map(|violation| Validation::fail(violation)));

    Validation::all_vec(checks).map(|_| ())
}

/// Local transitions only make sense along one ancestor chain.
fn local_transitions<U, C, E: Event>(
    tree: &StateTree,
    table: &TransitionTable<U, C, E>,
    layout: &Layout,
) -> Vec<Violation> {
    table
        .all()
        .iter()
        .filter(|t| t.kind() == TransitionKind::Local)
        .filter(|t| !tree.are_related(t.source_key(), t.target_key()))
        .map(|t| Violation::UnrelatedLocalTransition {
            from: layout.name(t.source_key()),
            to: layout.name(t.target_key()),
        })
        .collect()
}

fn initial_transitions<U, C, E: Event>(
    tree: &StateTree,
    table: &TransitionTable<U, C, E>,
    layout: &Layout,
) -> Vec<Violation> {
    table
        .all()
        .iter()
        .filter(|t| t.kind() == TransitionKind::Initial)
        .filter(|t| tree.parent(t.target_key()) != Some(t.source_key()))
        .map(|t| Violation::StrayInitialTransition {
            from: layout.name(t.source_key()),
            to: layout.name(t.target_key()),
        })
        .collect()
}

fn final_states<U, C, E: Event>(
    tree: &StateTree,
    table: &TransitionTable<U, C, E>,
    layout: &Layout,
) -> Vec<Violation> {
    let mut violations = Vec::new();
    for state in tree.states().filter(|state| layout.is_final(*state)) {
        if table.transitions_from(state).next().is_some() {
            violations.push(Violation::FinalStateTransition(layout.name(state)));
        }
        if tree.is_composite(state) {
            violations.push(Violation::CompositeFinalState(layout.name(state)));
        }
    }
    violations
}

/// Breadth-first search from the initial state. Being in a state makes the
/// transitions of all its superstates available, and entering a composite
/// state lands in its default substate.
fn unreachable_states<U, C, E: Event>(
    tree: &StateTree,
    table: &TransitionTable<U, C, E>,
    layout: &Layout,
    initial: StateKey,
) -> Vec<Violation> {
    let mut visited = HashSet::new();
    let mut queue = VecDeque::from([initial]);

    while let Some(state) = queue.pop_front() {
        if !visited.insert(state) {
            continue;
        }
        if let Some(default) = table.initial_transition_from(state) {
            queue.push_back(default.target_key());
        }
        for active in tree.path_to_root(state) {
            queue.extend(table.transitions_from(active).map(|t| t.target_key()));
        }
    }

    tree.states()
        .filter(|state| tree.is_leaf(*state) && !visited.contains(state))
        .map(|state| Violation::UnreachableState(layout.name(state)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::{BuildError, StateMachineBuilder};
    use crate::event_enum;

    event_enum! {
        enum Flow {
            Next,
        }
    }

    type Builder = StateMachineBuilder<&'static str, (), Flow>;

    fn violations(builder: Builder) -> Vec<Violation> {
        match builder.build() {
            Err(BuildError::Invalid(violations)) => violations,
            Err(other) => panic!("unexpected error: {other}"),
            Ok(_) => Vec::new(),
        }
    }

    #[test]
    fn substates_reached_through_composite_target() {
        let found = violations(
            Builder::new()
                .with_initial_transition("a")
                .with_composite_state("b", "c", [])
                .with_transition_on("a", "b", Flow::Next),
        );

        assert!(found.is_empty());
    }

    #[test]
    fn superstate_transitions_count_for_substates() {
        let found = violations(
            Builder::new()
                .with_initial_transition("p")
                .with_composite_state("p", "x", [])
                .with_transition_on("p", "y", Flow::Next),
        );

        assert!(found.is_empty());
    }

    #[test]
    fn peer_substate_without_incoming_transition_is_unreachable() {
        let found = violations(
            Builder::new()
                .with_initial_transition("p")
                .with_composite_state("p", "x", ["orphan"]),
        );

        assert_eq!(found, vec![Violation::UnreachableState("\"orphan\"".to_string())]);
    }

    #[test]
    fn unreached_composite_is_not_reported_itself() {
        let found = violations(
            Builder::new()
                .with_initial_transition("a")
                .with_composite_state("island", "shore", []),
        );

        assert_eq!(found, vec![Violation::UnreachableState("\"shore\"".to_string())]);
    }

    #[test]
    fn final_state_with_substates_is_reported() {
        let found = violations(
            Builder::new()
                .with_initial_transition("end")
                .with_final_state("end")
                .with_composite_state("end", "inside", []),
        );

        assert!(found.contains(&Violation::CompositeFinalState("\"end\"".to_string())));
    }

    #[test]
    fn related_local_transitions_pass() {
        let found = violations(
            Builder::new()
                .with_initial_transition("p")
                .with_composite_state("p", "x", ["y"])
                .with_local_transition_on("p", "y", Flow::Next)
                .with_local_transition("y", "p")
                .with_local_transition_on("x", "x", Flow::Next),
        );

        assert!(found.is_empty());
    }
}

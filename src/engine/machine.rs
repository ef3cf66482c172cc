//! The built machine and the event-processing algorithm.

use super::error::{Callback, ExecutionError, MachineError};
use super::resolver::{describe, MultipleTransitionsResolver};
use super::transition::{Transition, TransitionKind, TransitionTable};
use crate::core::{
    CallbackError, Event, Signal, State, StateHistory, StateId, StateKey, StateTree,
    TransitionRecord,
};
use chrono::Utc;
use std::collections::HashMap;

/// A registered state: identity plus behaviour.
pub(crate) struct StateEntry<U, C, E: Event> {
    pub(crate) id: U,
    pub(crate) behavior: Box<dyn State<U, C, E>>,
    pub(crate) is_final: bool,
}

/// Outcome of a single step.
enum Step {
    /// A transition fired; try a follow-up step from this state.
    Continue(StateKey),
    /// Nothing fired; processing ends in this state.
    Stop(StateKey),
}

/// A transition that fired, as handed to history recording.
struct Fired<'a, U> {
    from: &'a U,
    source: &'a U,
    target: &'a U,
    to: &'a U,
    kind: TransitionKind,
    step: usize,
}

/// A validated, immutable hierarchical state machine.
///
/// Built by [`StateMachineBuilder`](crate::builder::StateMachineBuilder).
/// The machine holds no per-run state: the caller owns the context and
/// the current state id, and passes both in on every call. One machine can
/// therefore drive any number of contexts, from any number of threads.
pub struct StateMachine<U: StateId, C, E: Event> {
    pub(crate) entries: Vec<StateEntry<U, C, E>>,
    pub(crate) index: HashMap<U, StateKey>,
    pub(crate) tree: StateTree,
    pub(crate) table: TransitionTable<U, C, E>,
    pub(crate) max_transitions: usize,
    pub(crate) resolver: Box<dyn MultipleTransitionsResolver<U, C, E>>,
}

impl<U: StateId, C, E: Event> StateMachine<U, C, E> {
    /// Enter the machine: run the initial-transition cascade from the root
    /// and return the leaf state it lands in.
    pub fn start(&self, context: &mut C) -> Result<U, MachineError> {
        let settled = self.cascade(context, StateKey::ROOT)?;
        let id = &self.entry(settled)?.id;
        tracing::debug!(state = ?id, "machine started");
        Ok(id.clone())
    }

    /// Process `event` with the machine in `current` and return the state
    /// it settles in.
    ///
    /// After the first step, triggerless transitions and completion
    /// signals may fire further transitions without new input, up to the
    /// configured maximum per event.
    pub fn process_event(&self, context: &mut C, current: &U, event: E) -> Result<U, MachineError> {
        self.run(context, current, event, &mut |_| {})
    }

    /// Like [`process_event`](Self::process_event), additionally recording
    /// every fired transition into `history`.
    ///
    /// Transitions that fired before a failure are not recorded, as the
    /// extended history is only returned on success.
    pub fn process_event_with_history(
        &self,
        context: &mut C,
        current: &U,
        event: E,
        history: StateHistory<U>,
    ) -> Result<(U, StateHistory<U>), MachineError> {
        let mut history = history;
        let state = self.run(context, current, event, &mut |fired| {
            history = history.record(TransitionRecord {
                from: fired.from.clone(),
                source: fired.source.clone(),
                target: fired.target.clone(),
                to: fired.to.clone(),
                kind: fired.kind,
                step: fired.step,
                timestamp: Utc::now(),
            });
        })?;
        Ok((state, history))
    }

    fn run(
        &self,
        context: &mut C,
        current: &U,
        event: E,
        observer: &mut dyn FnMut(Fired<'_, U>),
    ) -> Result<U, MachineError> {
        let start = self
            .key(current)
            .ok_or_else(|| MachineError::UnknownState(format!("{current:?}")))?;
        let _span = tracing::debug_span!("process_event", state = ?current).entered();

        let signal = Signal::Event(event);
        let mut count = 0;
        let mut outcome = self.step(context, start, Some(&signal), count, observer)?;
        let settled = loop {
            match outcome {
                Step::Stop(state) => break state,
                Step::Continue(state) => {
                    count += 1;
                    let completion = self.completion_signal(state)?;
                    outcome = self.step(context, state, completion.as_ref(), count, observer)?;
                }
            }
        };

        Ok(self.entry(settled)?.id.clone())
    }

    /// The completion signal owed after settling in `state`: only final
    /// states nested in a composite state produce one.
    fn completion_signal(&self, state: StateKey) -> Result<Option<Signal<E, U>>, MachineError> {
        let entry = self.entry(state)?;
        let nested = self.tree.parent(state).is_some_and(|parent| !parent.is_root());
        Ok((entry.is_final && nested).then(|| Signal::CompositeStateCompleted(entry.id.clone())))
    }

    fn step(
        &self,
        context: &mut C,
        state: StateKey,
        signal: Option<&Signal<E, U>>,
        count: usize,
        observer: &mut dyn FnMut(Fired<'_, U>),
    ) -> Result<Step, MachineError> {
        if count >= self.max_transitions {
            let state = self.name(state);
            tracing::warn!(max = self.max_transitions, %state, "transition limit reached");
            return Err(MachineError::MaxTransitionsExceeded {
                max: self.max_transitions,
                state,
            });
        }

        let current = self.entry(state)?;
        if let Some(signal) = signal {
            self.bubble(context, state, signal)?;
        }

        let Some(transition) = self.select(context, state, signal)? else {
            return Ok(Step::Stop(state));
        };
        let settled = self.fire(context, state, transition, signal)?;

        observer(Fired {
            from: &current.id,
            source: &self.entry(transition.source_key)?.id,
            target: &transition.target,
            to: &self.entry(settled)?.id,
            kind: transition.kind,
            step: count,
        });
        Ok(Step::Continue(settled))
    }

    /// Offer the signal to the active state and then its superstates until
    /// one consumes it. The root never sees signals; final states consume
    /// everything.
    fn bubble(&self, context: &mut C, state: StateKey, signal: &Signal<E, U>) -> Result<(), MachineError> {
        let mut cursor = Some(state);
        while let Some(key) = cursor.filter(|key| !key.is_root()) {
            let entry = self.entry(key)?;
            let consumed = entry.is_final
                || entry
                    .behavior
                    .on_event(context, signal)
                    .map_err(|source| self.failure(Callback::Event, key, source))?;
            tracing::trace!(state = ?entry.id, consumed, "signal offered");
            if consumed {
                break;
            }
            cursor = self.tree.parent(key);
        }
        Ok(())
    }

    /// Find the transition to fire: every ordinary transition leaving the
    /// active state or an ancestor whose trigger and guard both pass.
    fn select(
        &self,
        context: &mut C,
        state: StateKey,
        signal: Option<&Signal<E, U>>,
    ) -> Result<Option<&Transition<U, C, E>>, MachineError> {
        let mut candidates = Vec::new();
        let mut cursor = Some(state);
        while let Some(key) = cursor.filter(|key| !key.is_root()) {
            for transition in self.table.transitions_from(key) {
                if !transition.is_triggered_by(signal) {
                    continue;
                }
                let allowed = transition
                    .guard_allows(context, signal)
                    .map_err(|source| transition_failure(Callback::Guard, transition, source))?;
                if allowed {
                    candidates.push(transition);
                }
            }
            cursor = self.tree.parent(key);
        }

        match candidates.as_slice() {
            [] => Ok(None),
            [only] => Ok(Some(*only)),
            _ => {
                let id = &self.entry(state)?.id;
                self.resolver
                    .resolve(id, context, signal, &candidates)
                    .map(Some)
                    .map_err(|source| {
                        ExecutionError {
                            callback: Callback::Resolver,
                            location: format!("{id:?}"),
                            source,
                        }
                        .into()
                    })
            }
        }
    }

    /// Run exits, the action and entries of `transition`, then cascade
    /// into the target. Returns the settled leaf.
    fn fire(
        &self,
        context: &mut C,
        state: StateKey,
        transition: &Transition<U, C, E>,
        signal: Option<&Signal<E, U>>,
    ) -> Result<StateKey, MachineError> {
        let (source, target) = (transition.source_key, transition.target_key);
        let lca = self.tree.lowest_common_ancestor(source, target);

        let mut exits = self.tree.path_to_ancestor(state, lca, false)?;
        let mut entries = self.tree.path_to_ancestor(target, lca, false)?;
        if transition.kind == TransitionKind::External && (source == lca || target == lca) {
            exits.push(lca);
            entries.push(lca);
        }
        entries.reverse();

        tracing::debug!(
            source = %self.name(source),
            target = %self.name(target),
            kind = ?transition.kind,
            "firing transition"
        );

        for key in exits {
            self.exit(context, key)?;
        }
        if let Some(action) = &transition.action {
            action
                .execute(context, signal)
                .map_err(|source| transition_failure(Callback::Action, transition, source))?;
        }
        for key in entries {
            self.enter(context, key)?;
        }
        self.cascade(context, target)
    }

    /// Follow initial transitions down from `state` until a leaf.
    fn cascade(&self, context: &mut C, state: StateKey) -> Result<StateKey, MachineError> {
        let mut state = state;
        while let Some(initial) = self.table.initial_transition_from(state) {
            if let Some(action) = &initial.action {
                action
                    .execute(context, None)
                    .map_err(|source| transition_failure(Callback::InitialAction, initial, source))?;
            }
            state = initial.target_key;
            self.enter(context, state)?;
            tracing::trace!(state = %self.name(state), "entered default substate");
        }
        Ok(state)
    }

    fn enter(&self, context: &mut C, key: StateKey) -> Result<(), MachineError> {
        self.entry(key)?
            .behavior
            .on_entry(context)
            .map_err(|source| self.failure(Callback::Entry, key, source).into())
    }

    fn exit(&self, context: &mut C, key: StateKey) -> Result<(), MachineError> {
        let entry = self.entry(key)?;
        if entry.is_final {
            return Ok(());
        }
        entry
            .behavior
            .on_exit(context)
            .map_err(|source| self.failure(Callback::Exit, key, source).into())
    }

    fn entry(&self, key: StateKey) -> Result<&StateEntry<U, C, E>, MachineError> {
        key.index()
            .checked_sub(1)
            .and_then(|position| self.entries.get(position))
            .ok_or_else(|| MachineError::UnknownState(format!("{key:?}")))
    }

    fn name(&self, key: StateKey) -> String {
        match self.id(key) {
            Some(id) => format!("{id:?}"),
            None => format!("{key:?}"),
        }
    }

    fn failure(&self, callback: Callback, key: StateKey, source: CallbackError) -> ExecutionError {
        ExecutionError {
            callback,
            location: self.name(key),
            source,
        }
    }

    /// Arena key of a state id.
    pub fn key(&self, id: &U) -> Option<StateKey> {
        self.index.get(id).copied()
    }

    /// State id of an arena key; `None` for the root and unknown keys.
    pub fn id(&self, key: StateKey) -> Option<&U> {
        key.index()
            .checked_sub(1)
            .and_then(|position| self.entries.get(position))
            .map(|entry| &entry.id)
    }

    /// The implicit root.
    pub fn root(&self) -> StateKey {
        StateKey::ROOT
    }

    /// Every registered state, in registration order.
    pub fn states(&self) -> impl Iterator<Item = &U> + '_ {
        self.entries.iter().map(|entry| &entry.id)
    }

    /// Every transition, initial ones included.
    pub fn transitions(&self) -> &[Transition<U, C, E>] {
        self.table.all()
    }

    /// The composite state `id` is nested in; `None` for top-level and
    /// unknown states.
    pub fn superstate(&self, id: &U) -> Option<&U> {
        let key = self.key(id)?;
        self.tree.parent(key).and_then(|parent| self.id(parent))
    }

    /// Whether `id` names a final state.
    pub fn is_final(&self, id: &U) -> bool {
        self.key(id)
            .and_then(|key| self.entry(key).ok())
            .is_some_and(|entry| entry.is_final)
    }

    /// Whether `id` names a state with substates.
    pub fn is_composite(&self, id: &U) -> bool {
        self.key(id).is_some_and(|key| self.tree.is_composite(key))
    }

    /// Target of the top-level initial transition.
    pub fn initial_state(&self) -> Option<&U> {
        self.table
            .initial_transition_from(StateKey::ROOT)
            .map(|transition| transition.target())
    }

    pub fn tree(&self) -> &StateTree {
        &self.tree
    }

    pub fn table(&self) -> &TransitionTable<U, C, E> {
        &self.table
    }

    pub fn max_transitions_per_event(&self) -> usize {
        self.max_transitions
    }
}

fn transition_failure<U: StateId, C, E: Event>(
    callback: Callback,
    transition: &Transition<U, C, E>,
    source: CallbackError,
) -> ExecutionError {
    ExecutionError {
        callback,
        location: describe(transition),
        source,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::StateMachineBuilder;
    use crate::core::{Guard, Passive};
    use crate::engine::{AmbiguousTransitions, NearestFirst};
    use crate::event_enum;

    event_enum! {
        enum Input {
            Next,
            Back,
            Reset,
        }
    }

    /// Context that records callback order.
    #[derive(Default)]
    struct Trail {
        log: Vec<String>,
    }

    struct Logged(&'static str);

    impl State<&'static str, Trail, Input> for Logged {
        fn on_entry(&self, trail: &mut Trail) -> Result<(), CallbackError> {
            trail.log.push(format!("enter {}", self.0));
            Ok(())
        }

        fn on_exit(&self, trail: &mut Trail) -> Result<(), CallbackError> {
            trail.log.push(format!("exit {}", self.0));
            Ok(())
        }
    }

    type Builder = StateMachineBuilder<&'static str, Trail, Input>;

    fn logged(builder: Builder, ids: &[&'static str]) -> Builder {
        ids.iter()
            .fold(builder, |builder, &id| builder.with_state(id, Logged(id)))
    }

    #[test]
    fn start_cascades_to_leaf() {
        let machine = logged(Builder::new(), &["a", "a1", "a11"])
            .with_initial_transition("a")
            .with_composite_state("a", "a1", [])
            .with_composite_state("a1", "a11", [])
            .build()
            .unwrap();
        let mut trail = Trail::default();

        let state = machine.start(&mut trail).unwrap();

        assert_eq!(state, "a11");
        assert_eq!(trail.log, vec!["enter a", "enter a1", "enter a11"]);
    }

    #[test]
    fn external_self_transition_exits_and_reenters() {
        let machine = logged(Builder::new(), &["a"])
            .with_initial_transition("a")
            .with_transition_on("a", "a", Input::Next)
            .build()
            .unwrap();
        let mut trail = Trail::default();

        let state = machine.process_event(&mut trail, &"a", Input::Next).unwrap();

        assert_eq!(state, "a");
        assert_eq!(trail.log, vec!["exit a", "enter a"]);
    }

    #[test]
    fn local_self_transition_stays_put() {
        let machine = logged(Builder::new(), &["a"])
            .with_initial_transition("a")
            .with_local_transition_on("a", "a", Input::Next)
            .build()
            .unwrap();
        let mut trail = Trail::default();

        let state = machine.process_event(&mut trail, &"a", Input::Next).unwrap();

        assert_eq!(state, "a");
        assert!(trail.log.is_empty());
    }

    #[test]
    fn transition_from_superstate_exits_active_leaf() {
        let machine = logged(Builder::new(), &["p", "x", "y", "z"])
            .with_initial_transition("p")
            .with_composite_state("p", "x", ["y"])
            .with_transition_on("x", "y", Input::Next)
            .with_transition_on("p", "z", Input::Reset)
            .with_transition_on("z", "p", Input::Back)
            .build()
            .unwrap();
        let mut trail = Trail::default();

        let state = machine.process_event(&mut trail, &"y", Input::Reset).unwrap();

        assert_eq!(state, "z");
        assert_eq!(trail.log, vec!["exit y", "exit p", "enter z"]);
    }

    #[test]
    fn external_transition_to_substate_reenters_parent() {
        let machine = logged(Builder::new(), &["p", "x", "y"])
            .with_initial_transition("p")
            .with_composite_state("p", "x", ["y"])
            .with_transition_on("p", "y", Input::Next)
            .build()
            .unwrap();
        let mut trail = Trail::default();

        let state = machine.process_event(&mut trail, &"x", Input::Next).unwrap();

        assert_eq!(state, "y");
        assert_eq!(trail.log, vec!["exit x", "exit p", "enter p", "enter y"]);
    }

    #[test]
    fn local_transition_to_substate_keeps_parent() {
        let machine = logged(Builder::new(), &["p", "x", "y"])
            .with_initial_transition("p")
            .with_composite_state("p", "x", ["y"])
            .with_local_transition_on("p", "y", Input::Next)
            .build()
            .unwrap();
        let mut trail = Trail::default();

        let state = machine.process_event(&mut trail, &"x", Input::Next).unwrap();

        assert_eq!(state, "y");
        assert_eq!(trail.log, vec!["exit x", "enter y"]);
    }

    #[test]
    fn local_transition_to_superstate_recascades() {
        let machine = logged(Builder::new(), &["p", "x", "y"])
            .with_initial_transition("p")
            .with_composite_state("p", "x", ["y"])
            .with_transition_on("x", "y", Input::Next)
            .with_local_transition_on("y", "p", Input::Back)
            .build()
            .unwrap();
        let mut trail = Trail::default();

        let state = machine.process_event(&mut trail, &"y", Input::Back).unwrap();

        assert_eq!(state, "x");
        assert_eq!(trail.log, vec!["exit y", "enter x"]);
    }

    #[test]
    fn unmatched_event_keeps_state() {
        let machine = logged(Builder::new(), &["a", "b"])
            .with_initial_transition("a")
            .with_transition_on("a", "b", Input::Next)
            .build()
            .unwrap();
        let mut trail = Trail::default();

        let state = machine.process_event(&mut trail, &"a", Input::Back).unwrap();

        assert_eq!(state, "a");
        assert!(trail.log.is_empty());
    }

    #[test]
    fn triggerless_transition_follows_event() {
        let machine = logged(Builder::new(), &["a", "b", "c"])
            .with_initial_transition("a")
            .with_transition_on("a", "b", Input::Next)
            .with_transition("b", "c")
            .build()
            .unwrap();
        let mut trail = Trail::default();

        let state = machine.process_event(&mut trail, &"a", Input::Next).unwrap();

        assert_eq!(state, "c");
        assert_eq!(trail.log, vec!["exit a", "enter b", "exit b", "enter c"]);
    }

    #[test]
    fn unknown_state_is_reported() {
        let machine = Builder::new()
            .with_initial_transition("a")
            .build()
            .unwrap();

        let error = machine
            .process_event(&mut Trail::default(), &"nowhere", Input::Next)
            .unwrap_err();

        assert!(matches!(error, MachineError::UnknownState(ref id) if id == "\"nowhere\""));
    }

    #[test]
    fn ambiguous_transitions_fail_by_default() {
        let machine = Builder::new()
            .with_initial_transition("a")
            .with_transition_on("a", "b", Input::Next)
            .with_transition_on("a", "c", Input::Next)
            .build()
            .unwrap();

        let error = machine
            .process_event(&mut Trail::default(), &"a", Input::Next)
            .unwrap_err();
        let execution = error.execution().unwrap();

        assert_eq!(execution.callback, Callback::Resolver);
        let ambiguous = execution.source.downcast_ref::<AmbiguousTransitions>().unwrap();
        assert_eq!(ambiguous.candidates.len(), 2);
    }

    #[test]
    fn nearest_first_resolver_prefers_active_state() {
        let machine = Builder::new()
            .with_initial_transition("p")
            .with_composite_state("p", "x", [])
            .with_transition_on("p", "y", Input::Next)
            .with_transition_on("x", "z", Input::Next)
            .resolver(NearestFirst)
            .build()
            .unwrap();

        let state = machine
            .process_event(&mut Trail::default(), &"x", Input::Next)
            .unwrap();

        assert_eq!(state, "z");
    }

    #[test]
    fn failing_guard_aborts_step() {
        let machine = logged(Builder::new(), &["a", "b"])
            .with_initial_transition("a")
            .transition(
                crate::builder::TransitionBuilder::new()
                    .from("a")
                    .to("b")
                    .on(Input::Next)
                    .guard(Guard::fallible(|_, _| Err("guard exploded".into()))),
            )
            .build()
            .unwrap();
        let mut trail = Trail::default();

        let error = machine.process_event(&mut trail, &"a", Input::Next).unwrap_err();

        let execution = error.execution().unwrap();
        assert_eq!(execution.callback, Callback::Guard);
        assert_eq!(execution.location, "\"a\" -> \"b\"");
        assert!(trail.log.is_empty());
    }

    #[test]
    fn history_records_each_fired_transition() {
        let machine = Builder::new()
            .with_state("a", Passive)
            .with_initial_transition("a")
            .with_transition_on("a", "b", Input::Next)
            .with_transition("b", "c")
            .build()
            .unwrap();

        let (state, history) = machine
            .process_event_with_history(&mut Trail::default(), &"a", Input::Next, StateHistory::new())
            .unwrap();

        assert_eq!(state, "c");
        assert_eq!(history.get_path(), vec![&"a", &"b", &"c"]);
        assert_eq!(history.transitions()[1].step, 1);
        assert_eq!(history.transitions()[1].source, "b");
    }

    #[test]
    fn introspection_reports_structure() {
        let machine = Builder::new()
            .with_initial_transition("p")
            .with_composite_state("p", "x", ["y"])
            .with_transition_on("x", "y", Input::Next)
            .build()
            .unwrap();

        assert_eq!(machine.states().count(), 3);
        assert_eq!(machine.superstate(&"x"), Some(&"p"));
        assert_eq!(machine.superstate(&"p"), None);
        assert!(machine.is_composite(&"p"));
        assert!(!machine.is_final(&"x"));
        assert_eq!(machine.initial_state(), Some(&"p"));
        assert_eq!(machine.id(machine.root()), None);
        assert_eq!(machine.max_transitions_per_event(), 50);
        assert_eq!(machine.transitions().len(), 3);
    }

    #[test]
    fn machine_is_shareable_across_threads() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<StateMachine<&'static str, Trail, Input>>();
    }
}

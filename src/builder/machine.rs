//! Builder for constructing state machines.

use crate::builder::composite::CompositeState;
use crate::builder::error::BuildError;
use crate::builder::transition::{TransitionBuilder, TransitionDefinition};
use crate::builder::validation::{self, Layout};
use crate::core::{Action, Event, InitialAction, Passive, State, StateId, StateKey, StateTree, Trigger};
use crate::engine::machine::StateEntry;
use crate::engine::{
    MultipleTransitionsResolver, RejectAmbiguity, StateMachine, Transition, TransitionKind,
    TransitionTable,
};
use std::collections::HashMap;
use stillwater::validation::Validation;

/// Default bound on transitions fired while processing one event.
pub const DEFAULT_MAX_TRANSITIONS_PER_EVENT: usize = 50;

struct PendingState<U, C, E: Event> {
    id: U,
    behavior: Option<Box<dyn State<U, C, E>>>,
    is_final: bool,
}

/// Builder for constructing state machines with a fluent API.
///
/// States are created the first time they are mentioned, by a behaviour
/// registration, a composite registration or a transition endpoint.
/// Registration mistakes are remembered and reported by [`build`](Self::build),
/// which also validates the whole graph before freezing it.
///
/// # Example
///
/// ```rust
/// use statechart::builder::StateMachineBuilder;
/// use statechart::event_enum;
///
/// event_enum! {
///     pub enum Call {
///         Dial,
///         Answer,
///         HangUp,
///     }
/// }
///
/// let phone = StateMachineBuilder::<&str, (), Call>::new()
///     .with_initial_transition("idle")
///     .with_composite_state("in_call", "ringing", ["talking"])
///     .with_transition_on("idle", "in_call", Call::Dial)
///     .with_transition_on("ringing", "talking", Call::Answer)
///     .with_transition_on("in_call", "idle", Call::HangUp)
///     .build()
///     .unwrap();
///
/// let state = phone.process_event(&mut (), &"idle", Call::Dial).unwrap();
/// assert_eq!(state, "ringing");
/// let state = phone.process_event(&mut (), &state, Call::HangUp).unwrap();
/// assert_eq!(state, "idle");
/// ```
pub struct StateMachineBuilder<U: StateId, C, E: Event> {
    states: Vec<PendingState<U, C, E>>,
    index: HashMap<U, StateKey>,
    tree: StateTree,
    transitions: Vec<Transition<U, C, E>>,
    max_transitions: usize,
    resolver: Box<dyn MultipleTransitionsResolver<U, C, E>>,
    rejected: Option<BuildError>,
}

impl<U: StateId, C: 'static, E: Event + 'static> StateMachineBuilder<U, C, E> {
    /// Create a new builder.
    pub fn new() -> Self {
        Self {
            states: Vec::new(),
            index: HashMap::new(),
            tree: StateTree::new(),
            transitions: Vec::new(),
            max_transitions: DEFAULT_MAX_TRANSITIONS_PER_EVENT,
            resolver: Box::new(RejectAmbiguity),
            rejected: None,
        }
    }

    /// Attach behaviour to a state.
    pub fn with_state<S>(self, id: U, behavior: S) -> Self
    where
        S: State<U, C, E> + 'static,
    {
        self.register(id, Some(Box::new(behavior)), false)
    }

    /// Declare a final state. Final states consume every signal, do no
    /// work on exit and may not have outgoing transitions.
    pub fn with_final_state(self, id: U) -> Self {
        self.register(id, None, true)
    }

    /// Declare a final state whose `on_entry` runs when it is entered.
    /// Its `on_exit` and `on_event` are never called.
    pub fn with_final_state_behavior<S>(self, id: U, behavior: S) -> Self
    where
        S: State<U, C, E> + 'static,
    {
        self.register(id, Some(Box::new(behavior)), true)
    }

    /// Nest `default_substate` and `substates` in `superstate`, entering
    /// `default_substate` whenever `superstate` is entered.
    pub fn with_composite_state(
        self,
        superstate: U,
        default_substate: U,
        substates: impl IntoIterator<Item = U>,
    ) -> Self {
        self.composite(CompositeState::new(superstate, default_substate).substates(substates))
    }

    /// Register a composite state, possibly with an initial action.
    pub fn composite(mut self, composite: CompositeState<U, C>) -> Self {
        let superstate = self.slot(composite.superstate.clone());
        let default_substate = self.slot(composite.default_substate.clone());

        let mut nested = vec![default_substate];
        for substate in composite.substates {
            let key = self.slot(substate);
            if !nested.contains(&key) {
                nested.push(key);
            }
        }
        for substate in nested {
            if let Err(error) = self.nest(superstate, substate) {
                return self.reject(error);
            }
        }

        self.add_initial(Transition {
            source: Some(composite.superstate),
            target: composite.default_substate,
            source_key: superstate,
            target_key: default_substate,
            kind: TransitionKind::Initial,
            trigger: None,
            guard: None,
            action: composite.initial_action.map(Action::from),
        })
    }

    /// Set the top-level initial transition, entered by `start`.
    pub fn with_initial_transition(self, target: U) -> Self {
        self.top_level_initial(target, None)
    }

    /// Set the top-level initial transition with an action run before
    /// `target` is entered.
    pub fn with_initial_transition_action<F>(self, target: U, effect: F) -> Self
    where
        F: Fn(&mut C) + Send + Sync + 'static,
    {
        self.top_level_initial(target, Some(InitialAction::new(effect)))
    }

    /// Set the top-level initial transition with a prepared action, e.g. a
    /// fallible one.
    pub fn initial_transition(self, target: U, action: InitialAction<C>) -> Self {
        self.top_level_initial(target, Some(action))
    }

    /// External triggerless transition.
    pub fn with_transition(self, from: U, to: U) -> Self {
        self.define(from, to, TransitionKind::External, None)
    }

    /// External transition triggered by events of `kind`.
    pub fn with_transition_on(self, from: U, to: U, kind: E::Kind) -> Self {
        self.define(from, to, TransitionKind::External, Some(Trigger::Event(kind)))
    }

    /// Local triggerless transition.
    pub fn with_local_transition(self, from: U, to: U) -> Self {
        self.define(from, to, TransitionKind::Local, None)
    }

    /// Local transition triggered by events of `kind`.
    pub fn with_local_transition_on(self, from: U, to: U, kind: E::Kind) -> Self {
        self.define(from, to, TransitionKind::Local, Some(Trigger::Event(kind)))
    }

    /// Add a transition using a builder, for guards and actions.
    pub fn transition(self, builder: TransitionBuilder<U, C, E>) -> Self {
        match builder.build() {
            Ok(definition) => self.add_transition(definition),
            Err(error) => self.reject(error),
        }
    }

    /// Add a pre-built transition definition.
    pub fn add_transition(mut self, definition: TransitionDefinition<U, C, E>) -> Self {
        let source_key = self.slot(definition.from.clone());
        let target_key = self.slot(definition.to.clone());
        let transition = Transition {
            source: Some(definition.from),
            target: definition.to,
            source_key,
            target_key,
            kind: definition.kind,
            trigger: definition.trigger,
            guard: definition.guard,
            action: definition.action,
        };

        if transition.kind == TransitionKind::Initial {
            self.add_initial(transition)
        } else {
            self.transitions.push(transition);
            self
        }
    }

    /// Bound the transitions fired while processing one event (default 50).
    pub fn max_transitions_per_event(mut self, max: usize) -> Self {
        if max == 0 {
            return self.reject(BuildError::InvalidMaxTransitions);
        }
        self.max_transitions = max;
        self
    }

    /// Choose among several transitions that fire together. By default
    /// that situation is an error.
    pub fn resolver<R>(mut self, resolver: R) -> Self
    where
        R: MultipleTransitionsResolver<U, C, E> + 'static,
    {
        self.resolver = Box::new(resolver);
        self
    }

    /// Validate the definition and freeze it into a machine.
    pub fn build(self) -> Result<StateMachine<U, C, E>, BuildError> {
        if let Some(error) = self.rejected {
            return Err(error);
        }

        let initial_target = self
            .transitions
            .iter()
            .find(|t| t.kind == TransitionKind::Initial && t.source_key.is_root())
            .map(|t| t.target_key)
            .ok_or(BuildError::MissingInitialTransition)?;
        if let Some(superstate) = self.tree.parent(initial_target).filter(|key| !key.is_root()) {
            return Err(BuildError::NestedInitialTarget {
                state: name_of(&self.states, initial_target),
                superstate: name_of(&self.states, superstate),
            });
        }

        let transition_count = self.transitions.len();
        let table = TransitionTable::new(self.transitions, self.tree.len());
        let layout = Layout {
            names: std::iter::once("<root>".to_string())
                .chain(self.states.iter().map(|state| format!("{:?}", state.id)))
                .collect(),
            finals: std::iter::once(false)
                .chain(self.states.iter().map(|state| state.is_final))
                .collect(),
        };

        if let Validation::Failure(violations) =
            validation::validate(&self.tree, &table, &layout, initial_target)
        {
            return Err(BuildError::Invalid(violations.iter().cloned().collect()));
        }

        let entries = self
            .states
            .into_iter()
            .map(|state| StateEntry {
                id: state.id,
                behavior: state.behavior.unwrap_or_else(|| Box::new(Passive)),
                is_final: state.is_final,
            })
            .collect::<Vec<_>>();

        tracing::debug!(
            states = entries.len(),
            transitions = transition_count,
            max_transitions = self.max_transitions,
            "state machine built"
        );

        Ok(StateMachine {
            entries,
            index: self.index,
            tree: self.tree,
            table,
            max_transitions: self.max_transitions,
            resolver: self.resolver,
        })
    }

    /// Key of `id`, creating a top-level state on first mention.
    fn slot(&mut self, id: U) -> StateKey {
        if let Some(key) = self.index.get(&id) {
            return *key;
        }
        let key = self.tree.insert();
        self.index.insert(id.clone(), key);
        self.states.push(PendingState {
            id,
            behavior: None,
            is_final: false,
        });
        key
    }

    fn register(mut self, id: U, behavior: Option<Box<dyn State<U, C, E>>>, is_final: bool) -> Self {
        let key = self.slot(id);
        let Some(state) = key.index().checked_sub(1).and_then(|i| self.states.get_mut(i)) else {
            return self;
        };

        state.is_final |= is_final;
        if let Some(behavior) = behavior {
            if state.behavior.is_some() {
                let error = BuildError::DuplicateState(format!("{:?}", state.id));
                return self.reject(error);
            }
            state.behavior = Some(behavior);
        }
        self
    }

    /// Move `substate` under `superstate`, refusing cycles and a second
    /// superstate.
    fn nest(&mut self, superstate: StateKey, substate: StateKey) -> Result<(), BuildError> {
        if substate == superstate || self.tree.is_ancestor_of(substate, superstate) {
            return Err(BuildError::CyclicNesting {
                superstate: name_of(&self.states, superstate),
                substate: name_of(&self.states, substate),
            });
        }
        match self.tree.parent(substate) {
            Some(existing) if !existing.is_root() && existing != superstate => {
                Err(BuildError::ConflictingSuperstate {
                    state: name_of(&self.states, substate),
                    existing: name_of(&self.states, existing),
                    requested: name_of(&self.states, superstate),
                })
            }
            _ => {
                self.tree.attach(substate, superstate);
                Ok(())
            }
        }
    }

    fn top_level_initial(mut self, target: U, action: Option<InitialAction<C>>) -> Self {
        let target_key = self.slot(target.clone());
        self.add_initial(Transition {
            source: None,
            target,
            source_key: StateKey::ROOT,
            target_key,
            kind: TransitionKind::Initial,
            trigger: None,
            guard: None,
            action: action.map(Action::from),
        })
    }

    fn add_initial(mut self, transition: Transition<U, C, E>) -> Self {
        let duplicate = self
            .transitions
            .iter()
            .any(|t| t.kind == TransitionKind::Initial && t.source_key == transition.source_key);
        if duplicate {
            let error = BuildError::DuplicateInitialTransition(name_of(&self.states, transition.source_key));
            return self.reject(error);
        }
        self.transitions.push(transition);
        self
    }

    fn define(mut self, from: U, to: U, kind: TransitionKind, trigger: Option<Trigger<E::Kind>>) -> Self {
        let source_key = self.slot(from.clone());
        let target_key = self.slot(to.clone());
        self.transitions.push(Transition {
            source: Some(from),
            target: to,
            source_key,
            target_key,
            kind,
            trigger,
            guard: None,
            action: None,
        });
        self
    }

    /// Remember the first registration error for `build`.
    fn reject(mut self, error: BuildError) -> Self {
        tracing::debug!(%error, "machine definition rejected");
        self.rejected.get_or_insert(error);
        self
    }
}

impl<U: StateId, C: 'static, E: Event + 'static> Default for StateMachineBuilder<U, C, E> {
    fn default() -> Self {
        Self::new()
    }
}

fn name_of<U: StateId, C, E: Event>(states: &[PendingState<U, C, E>], key: StateKey) -> String {
    match key.index().checked_sub(1).and_then(|i| states.get(i)) {
        Some(state) => format!("{:?}", state.id),
        None => "<root>".to_string(),
    }
}

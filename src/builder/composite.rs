//! Definition of a composite state.

use crate::core::InitialAction;

/// A superstate, its default substate and its other substates.
///
/// Registering it creates the initial transition from the superstate to
/// the default substate.
///
/// # Example
///
/// ```rust
/// use statechart::builder::CompositeState;
///
/// let session: CompositeState<&str, Vec<String>> = CompositeState::new("session", "idle")
///     .substates(["typing", "sending"])
///     .initial_action(|log: &mut Vec<String>| log.push("session opened".to_string()));
///
/// assert_eq!(session.superstate(), &"session");
/// ```
pub struct CompositeState<U, C> {
    pub(crate) superstate: U,
    pub(crate) default_substate: U,
    pub(crate) substates: Vec<U>,
    pub(crate) initial_action: Option<InitialAction<C>>,
}

impl<U, C> CompositeState<U, C> {
    pub fn new(superstate: U, default_substate: U) -> Self {
        Self {
            superstate,
            default_substate,
            substates: Vec::new(),
            initial_action: None,
        }
    }

    /// Add peer substates next to the default one.
    pub fn substates(mut self, substates: impl IntoIterator<Item = U>) -> Self {
        self.substates.extend(substates);
        self
    }

    /// Action run by the initial transition, before the default substate
    /// is entered.
    pub fn initial_action<F>(mut self, effect: F) -> Self
    where
        F: Fn(&mut C) + Send + Sync + 'static,
    {
        self.initial_action = Some(InitialAction::new(effect));
        self
    }

    /// Use a prepared initial action, e.g. a fallible one.
    pub fn with_initial_action(mut self, action: InitialAction<C>) -> Self {
        self.initial_action = Some(action);
        self
    }

    pub fn superstate(&self) -> &U {
        &self.superstate
    }

    pub fn default_substate(&self) -> &U {
        &self.default_substate
    }
}

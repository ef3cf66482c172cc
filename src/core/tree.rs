//! The state hierarchy.
//!
//! States live in an arena and are addressed by [`StateKey`]. The tree is a
//! parent vector indexed by key; slot zero is the implicit root, which has
//! no caller-visible identity and no parent. Every other state has exactly
//! one parent, the root when it is not nested in a composite state.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Handle of a state in the machine's arena.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct StateKey(usize);

impl StateKey {
    /// The implicit root.
    pub const ROOT: StateKey = StateKey(0);

    pub(crate) fn new(index: usize) -> Self {
        Self(index)
    }

    pub(crate) fn index(self) -> usize {
        self.0
    }

    /// Whether this is the implicit root.
    pub fn is_root(self) -> bool {
        self == Self::ROOT
    }
}

impl fmt::Debug for StateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_root() {
            f.write_str("<root>")
        } else {
            write!(f, "#{}", self.0)
        }
    }
}

/// A path was requested between two states where the second one is not
/// an ancestor of the first.
#[derive(Debug, Clone, Copy, Error, PartialEq, Eq)]
#[error("state {ancestor:?} is not an ancestor of {state:?}")]
pub struct UnrelatedStates {
    pub state: StateKey,
    pub ancestor: StateKey,
}

/// Parent map over all states of a machine.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StateTree {
    parents: Vec<Option<StateKey>>,
}

impl StateTree {
    /// A tree holding only the root.
    pub(crate) fn new() -> Self {
        Self {
            parents: vec![None],
        }
    }

    /// Add a state under the root.
    pub(crate) fn insert(&mut self) -> StateKey {
        let key = StateKey::new(self.parents.len());
        self.parents.push(Some(StateKey::ROOT));
        key
    }

    /// Move `state` under `parent`. Callers rule out cycles beforehand.
    pub(crate) fn attach(&mut self, state: StateKey, parent: StateKey) {
        if let Some(slot) = self.parents.get_mut(state.index()) {
            *slot = Some(parent);
        }
    }

    /// Number of states, the root included.
    pub fn len(&self) -> usize {
        self.parents.len()
    }

    /// Whether the tree holds only the root.
    pub fn is_empty(&self) -> bool {
        self.parents.len() <= 1
    }

    /// Whether `state` belongs to this tree.
    pub fn contains(&self, state: StateKey) -> bool {
        state.index() < self.parents.len()
    }

    /// Every state except the root, in registration order.
    pub fn states(&self) -> impl Iterator<Item = StateKey> + '_ {
        (1..self.parents.len()).map(StateKey::new)
    }

    /// The superstate of `state`; `None` only for the root.
    pub fn parent(&self, state: StateKey) -> Option<StateKey> {
        self.parents.get(state.index()).copied().flatten()
    }

    /// Direct substates of `state`.
    pub fn children(&self, state: StateKey) -> impl Iterator<Item = StateKey> + '_ {
        self.parents
            .iter()
            .enumerate()
            .filter(move |(_, parent)| **parent == Some(state))
            .map(|(index, _)| StateKey::new(index))
    }

    /// Whether `state` has substates.
    pub fn is_composite(&self, state: StateKey) -> bool {
        self.parents.iter().any(|parent| *parent == Some(state))
    }

    /// Whether `state` has no substates.
    pub fn is_leaf(&self, state: StateKey) -> bool {
        !self.is_composite(state)
    }

    /// Number of proper ancestors of `state`; zero for the root.
    pub fn depth(&self, state: StateKey) -> usize {
        let mut depth = 0;
        let mut cursor = self.parent(state);
        while let Some(parent) = cursor {
            depth += 1;
            cursor = self.parent(parent);
        }
        depth
    }

    /// Whether `ancestor` is a proper ancestor of `state`.
    pub fn is_ancestor_of(&self, ancestor: StateKey, state: StateKey) -> bool {
        let mut cursor = self.parent(state);
        while let Some(parent) = cursor {
            if parent == ancestor {
                return true;
            }
            cursor = self.parent(parent);
        }
        false
    }

    /// Whether `state` is a proper descendant of `ancestor`.
    pub fn is_descendant_of(&self, state: StateKey, ancestor: StateKey) -> bool {
        self.is_ancestor_of(ancestor, state)
    }

    /// Whether the two states are equal or one contains the other.
    pub fn are_related(&self, a: StateKey, b: StateKey) -> bool {
        a == b || self.is_ancestor_of(a, b) || self.is_ancestor_of(b, a)
    }

    /// The deepest state that is an ancestor-or-self of both `a` and `b`.
    ///
    /// `lowest_common_ancestor(s, s)` is `s`; unrelated top-level states
    /// meet at the root.
    pub fn lowest_common_ancestor(&self, a: StateKey, b: StateKey) -> StateKey {
        let (mut a, mut b) = (a, b);
        let (mut depth_a, mut depth_b) = (self.depth(a), self.depth(b));

        while depth_a > depth_b {
            a = self.parent(a).unwrap_or(StateKey::ROOT);
            depth_a -= 1;
        }
        while depth_b > depth_a {
            b = self.parent(b).unwrap_or(StateKey::ROOT);
            depth_b -= 1;
        }
        while a != b {
            match (self.parent(a), self.parent(b)) {
                (Some(parent_a), Some(parent_b)) => {
                    a = parent_a;
                    b = parent_b;
                }
                _ => return StateKey::ROOT,
            }
        }
        a
    }

    /// States from `state` up to `ancestor`, nearest first.
    ///
    /// `ancestor` itself is included only when `include_ancestor` is set.
    /// `state` may equal `ancestor`, in which case the path is empty or
    /// holds just that state.
    pub fn path_to_ancestor(
        &self,
        state: StateKey,
        ancestor: StateKey,
        include_ancestor: bool,
    ) -> Result<Vec<StateKey>, UnrelatedStates> {
        if state != ancestor && !self.is_ancestor_of(ancestor, state) {
            return Err(UnrelatedStates { state, ancestor });
        }

        let mut path = Vec::new();
        let mut cursor = state;
        while cursor != ancestor {
            path.push(cursor);
            match self.parent(cursor) {
                Some(parent) => cursor = parent,
                None => return Err(UnrelatedStates { state, ancestor }),
            }
        }
        if include_ancestor {
            path.push(ancestor);
        }
        Ok(path)
    }

    /// States from `state` up to and including the root.
    pub fn path_to_root(&self, state: StateKey) -> Vec<StateKey> {
        let mut path = vec![state];
        let mut cursor = self.parent(state);
        while let Some(parent) = cursor {
            path.push(parent);
            cursor = self.parent(parent);
        }
        path
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// root ── a ── a1 ── a11
    ///      │     └ a2
    ///      └ b
    fn sample() -> (StateTree, [StateKey; 5]) {
        let mut tree = StateTree::new();
        let a = tree.insert();
        let a1 = tree.insert();
        let a11 = tree.insert();
        let a2 = tree.insert();
        let b = tree.insert();
        tree.attach(a1, a);
        tree.attach(a11, a1);
        tree.attach(a2, a);
        (tree, [a, a1, a11, a2, b])
    }

    #[test]
    fn inserted_states_hang_off_root() {
        let mut tree = StateTree::new();
        let s = tree.insert();

        assert_eq!(tree.parent(s), Some(StateKey::ROOT));
        assert_eq!(tree.parent(StateKey::ROOT), None);
        assert!(!tree.is_empty());
    }

    #[test]
    fn ancestry_queries() {
        let (tree, [a, a1, a11, a2, b]) = sample();

        assert!(tree.is_ancestor_of(a, a11));
        assert!(tree.is_ancestor_of(StateKey::ROOT, b));
        assert!(!tree.is_ancestor_of(a11, a));
        assert!(!tree.is_ancestor_of(a, a));
        assert!(tree.is_descendant_of(a2, a));
        assert!(!tree.is_descendant_of(b, a));
        assert!(tree.are_related(a1, a1));
        assert!(tree.are_related(a, a11));
        assert!(!tree.are_related(a2, a11));
    }

    #[test]
    fn composite_and_leaf() {
        let (tree, [a, a1, a11, _, b]) = sample();

        assert!(tree.is_composite(a));
        assert!(tree.is_composite(a1));
        assert!(tree.is_leaf(a11));
        assert!(tree.is_leaf(b));
        assert_eq!(tree.children(a).count(), 2);
        assert_eq!(tree.depth(a11), 3);
    }

    #[test]
    fn lowest_common_ancestor_cases() {
        let (tree, [a, a1, a11, a2, b]) = sample();

        assert_eq!(tree.lowest_common_ancestor(a11, a11), a11);
        assert_eq!(tree.lowest_common_ancestor(a11, a2), a);
        assert_eq!(tree.lowest_common_ancestor(a1, a11), a1);
        assert_eq!(tree.lowest_common_ancestor(a11, a1), a1);
        assert_eq!(tree.lowest_common_ancestor(a11, b), StateKey::ROOT);
    }

    #[test]
    fn path_to_ancestor_orders_nearest_first() {
        let (tree, [a, a1, a11, _, _]) = sample();

        assert_eq!(tree.path_to_ancestor(a11, a, false).unwrap(), vec![a11, a1]);
        assert_eq!(tree.path_to_ancestor(a11, a, true).unwrap(), vec![a11, a1, a]);
        assert!(tree.path_to_ancestor(a1, a1, false).unwrap().is_empty());
        assert_eq!(tree.path_to_ancestor(a1, a1, true).unwrap(), vec![a1]);
    }

    #[test]
    fn path_to_unrelated_state_fails() {
        let (tree, [a, _, a11, _, b]) = sample();

        let error = tree.path_to_ancestor(a11, b, false).unwrap_err();
        assert_eq!(error, UnrelatedStates { state: a11, ancestor: b });
        assert!(tree.path_to_ancestor(a, a11, false).is_err());
    }

    #[test]
    fn path_to_root_ends_at_root() {
        let (tree, [a, a1, a11, _, _]) = sample();

        assert_eq!(tree.path_to_root(a11), vec![a11, a1, a, StateKey::ROOT]);
        assert_eq!(tree.path_to_root(StateKey::ROOT), vec![StateKey::ROOT]);
    }
}

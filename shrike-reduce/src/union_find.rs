// Merge mapping - disjoint-set forest over states
//
// Every merge decision is a union; the representative of a state is the
// root of its tree, so resolving a state always yields its final
// representative and a mapping like {b -> a, c -> b} reads as
// {b -> a, c -> a}. A pinned state (the initial state) is never placed
// below another root.

use ahash::AHashMap;
use shrike_automaton::{StateId, StateMapping};
use smallvec::SmallVec;
use std::collections::BTreeMap;

/// Members of one merge class, ascending
pub type Class = SmallVec<[StateId; 4]>;

/// Union-find merge mapping with path compression
#[derive(Debug, Clone, Default)]
pub struct MergeMap {
    parent: AHashMap<StateId, StateId>,
    pinned: Option<StateId>,
}

impl MergeMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mapping in which `state` always represents its own class
    pub fn pinned(state: StateId) -> Self {
        Self {
            parent: AHashMap::default(),
            pinned: Some(state),
        }
    }

    /// Build a mapping from `(member, target)` merge requests
    pub fn from_pairs<I>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (StateId, StateId)>,
    {
        let mut map = Self::new();
        for (member, target) in pairs {
            map.union(member, target);
        }
        map
    }

    /// Root of `state`, compressing the path behind it
    pub fn find(&mut self, state: StateId) -> StateId {
        let mut root = *self.parent.entry(state).or_insert(state);
        while let Some(&parent) = self.parent.get(&root) {
            if parent == root {
                break;
            }
            root = parent;
        }

        let mut current = state;
        while current != root {
            let next = self.parent[&current];
            self.parent.insert(current, root);
            current = next;
        }

        root
    }

    /// Root of `state` without compressing; unknown states are their own root
    pub fn resolve(&self, state: StateId) -> StateId {
        let mut current = state;
        while let Some(&parent) = self.parent.get(&current) {
            if parent == current {
                break;
            }
            current = parent;
        }
        current
    }

    /// Merge the class of `member` into the class of `target`
    ///
    /// The root of `target` stays the representative unless the class of
    /// `member` holds the pinned state. Returns the representative.
    pub fn union(&mut self, member: StateId, target: StateId) -> StateId {
        let member_root = self.find(member);
        let target_root = self.find(target);
        if member_root == target_root {
            return target_root;
        }

        if self.pinned == Some(member_root) {
            self.parent.insert(target_root, member_root);
            member_root
        } else {
            self.parent.insert(member_root, target_root);
            target_root
        }
    }

    /// Make `state` the representative of its class
    ///
    /// Returns false when the class is represented by the pinned state.
    pub fn promote(&mut self, state: StateId) -> bool {
        let root = self.find(state);
        if root == state {
            return true;
        }
        if self.pinned == Some(root) {
            return false;
        }

        self.parent.insert(root, state);
        self.parent.insert(state, state);
        true
    }

    /// Classes keyed by representative; every known state appears once
    pub fn classes(&self) -> BTreeMap<StateId, Class> {
        let mut members: Vec<StateId> = self.parent.keys().copied().collect();
        members.sort_unstable();

        let mut classes: BTreeMap<StateId, Class> = BTreeMap::new();
        for state in members {
            classes.entry(self.resolve(state)).or_default().push(state);
        }
        classes
    }

    /// Flat member -> representative mapping, representatives excluded
    pub fn to_mapping(&self) -> BTreeMap<StateId, StateId> {
        self.parent
            .keys()
            .filter_map(|&state| {
                let representative = self.resolve(state);
                (representative != state).then_some((state, representative))
            })
            .collect()
    }

    /// `(member, representative)` pairs in ascending member order
    pub fn iter(&self) -> impl Iterator<Item = (StateId, StateId)> {
        self.to_mapping().into_iter()
    }

    /// Number of states merged into another state
    pub fn len(&self) -> usize {
        self.parent
            .keys()
            .filter(|&&state| self.resolve(state) != state)
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl StateMapping for MergeMap {
    fn representative(&self, state: StateId) -> StateId {
        self.resolve(state)
    }
}

impl FromIterator<(StateId, StateId)> for MergeMap {
    fn from_iter<T: IntoIterator<Item = (StateId, StateId)>>(iter: T) -> Self {
        Self::from_pairs(iter)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn s(id: u32) -> StateId {
        StateId(id)
    }

    #[test]
    fn test_chain_is_normalized() {
        // {b -> a, c -> b} resolves to {b -> a, c -> a}
        let map = MergeMap::from_pairs([(s(2), s(1)), (s(3), s(2))]);

        assert_eq!(
            map.to_mapping(),
            BTreeMap::from([(s(2), s(1)), (s(3), s(1))])
        );
        assert_eq!(map.len(), 2);
        assert_eq!(map.iter().collect::<Vec<_>>(), vec![(s(2), s(1)), (s(3), s(1))]);
    }

    #[test]
    fn test_resolve_is_idempotent() {
        let map: MergeMap = [(s(5), s(4)), (s(4), s(3)), (s(3), s(2)), (s(7), s(5))]
            .into_iter()
            .collect();

        for state in [s(2), s(3), s(4), s(5), s(7), s(99)] {
            let once = map.resolve(state);
            assert_eq!(map.resolve(once), once);
        }
        assert_eq!(map.resolve(s(7)), s(2));
        assert_eq!(map.resolve(s(99)), s(99));
    }

    #[test]
    fn test_representatives_never_chain() {
        let map = MergeMap::from_pairs([(s(1), s(2)), (s(3), s(4)), (s(2), s(4)), (s(6), s(5))]);
        let mapping = map.to_mapping();

        for representative in mapping.values() {
            assert!(!mapping.contains_key(representative));
        }
    }

    #[test]
    fn test_find_compresses_paths() {
        let mut map = MergeMap::from_pairs([(s(1), s(2)), (s(2), s(3)), (s(3), s(4))]);

        assert_eq!(map.find(s(1)), s(4));
        assert_eq!(map.parent[&s(1)], s(4));
        assert_eq!(map.parent[&s(2)], s(4));
    }

    #[test]
    fn test_pinned_state_stays_representative() {
        let mut map = MergeMap::pinned(s(0));
        map.union(s(3), s(4));
        map.union(s(0), s(3));

        assert_eq!(map.resolve(s(3)), s(0));
        assert_eq!(map.resolve(s(4)), s(0));
        assert!(!map.promote(s(4)));
        assert_eq!(map.resolve(s(4)), s(0));
    }

    #[test]
    fn test_promote() {
        let mut map = MergeMap::from_pairs([(s(1), s(2)), (s(3), s(2))]);
        assert!(map.promote(s(3)));

        assert_eq!(map.resolve(s(1)), s(3));
        assert_eq!(map.resolve(s(2)), s(3));
        assert_eq!(map.resolve(s(3)), s(3));
    }

    #[test]
    fn test_classes() {
        let map = MergeMap::from_pairs([(s(1), s(2)), (s(5), s(6)), (s(3), s(1))]);
        let classes = map.classes();

        assert_eq!(classes.len(), 2);
        assert_eq!(classes[&s(2)].as_slice(), &[s(1), s(2), s(3)]);
        assert_eq!(classes[&s(6)].as_slice(), &[s(5), s(6)]);
        assert!(MergeMap::new().is_empty());
    }
}

//! # Disjoint Set Union
//!
//! Union-Find over entity identifiers with path halving and union by rank.
//!
//! Used in two places: expanding raw unilateral duplicate pairs into their
//! transitive closure when constructing ground truth, and by the reference
//! clustering strategy in [`crate::test_support`].

use crate::model::EntityId;
use rustc_hash::FxHashMap;

/// Union-Find over entity identifiers
#[derive(Debug, Clone, Default)]
pub struct UnionFind {
    parent: FxHashMap<EntityId, EntityId>,
    rank: FxHashMap<EntityId, u32>,
    component_count: usize,
}

impl UnionFind {
    /// Create an empty union-find
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an entity as its own singleton component. No-op if present.
    pub fn insert(&mut self, id: EntityId) {
        if self.parent.contains_key(&id) {
            return;
        }
        self.parent.insert(id, id);
        self.rank.insert(id, 0);
        self.component_count += 1;
    }

    /// Check if an entity has been inserted.
    pub fn contains(&self, id: EntityId) -> bool {
        self.parent.contains_key(&id)
    }

    /// Find the root of an entity's component.
    /// Returns the entity itself if it was never inserted (self-root).
    ///
    /// Compresses with path halving: every visited node is pointed at its
    /// grandparent on the way up.
    pub fn find(&mut self, id: EntityId) -> EntityId {
        let Some(&initial_parent) = self.parent.get(&id) else {
            return id;
        };
        if initial_parent == id {
            return id;
        }

        let mut current = id;
        let mut parent = initial_parent;
        loop {
            let grandparent = self.parent.get(&parent).copied().unwrap_or(parent);
            if grandparent == parent {
                break;
            }

            self.parent.insert(current, grandparent);
            current = grandparent;

            parent = self.parent.get(&current).copied().unwrap_or(current);
            if parent == current {
                break;
            }
        }

        parent
    }

    /// Check if two entities share a component.
    pub fn same_set(&mut self, a: EntityId, b: EntityId) -> bool {
        self.find(a) == self.find(b)
    }

    /// Merge the components of `a` and `b`, inserting either if absent.
    /// Returns true if two distinct components were joined.
    pub fn union(&mut self, a: EntityId, b: EntityId) -> bool {
        self.insert(a);
        self.insert(b);

        let root_a = self.find(a);
        let root_b = self.find(b);
        if root_a == root_b {
            return false;
        }

        let rank_a = self.rank.get(&root_a).copied().unwrap_or(0);
        let rank_b = self.rank.get(&root_b).copied().unwrap_or(0);

        if rank_a < rank_b {
            self.parent.insert(root_a, root_b);
        } else if rank_a > rank_b {
            self.parent.insert(root_b, root_a);
        } else {
            self.parent.insert(root_a, root_b);
            self.rank.insert(root_b, rank_b + 1);
        }
        self.component_count -= 1;
        true
    }

    /// Number of inserted entities.
    pub fn len(&self) -> usize {
        self.parent.len()
    }

    pub fn is_empty(&self) -> bool {
        self.parent.is_empty()
    }

    /// Number of components.
    pub fn component_count(&self) -> usize {
        self.component_count
    }

    /// Extract all components as sorted member lists, ordered by their
    /// smallest member. Deterministic across runs.
    pub fn components(&mut self) -> Vec<Vec<EntityId>> {
        let ids: Vec<EntityId> = self.parent.keys().copied().collect();

        let mut by_root: FxHashMap<EntityId, Vec<EntityId>> = FxHashMap::default();
        for id in ids {
            let root = self.find(id);
            by_root.entry(root).or_default().push(id);
        }

        let mut components: Vec<Vec<EntityId>> = by_root.into_values().collect();
        for members in &mut components {
            members.sort_unstable();
        }
        components.sort_unstable_by_key(|members| members[0]);
        components
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_singletons() {
        let mut uf = UnionFind::new();
        uf.insert(EntityId(1));
        uf.insert(EntityId(2));
        assert_eq!(uf.find(EntityId(1)), EntityId(1));
        assert_eq!(uf.component_count(), 2);
        assert!(!uf.same_set(EntityId(1), EntityId(2)));
    }

    #[test]
    fn test_union_merges_components() {
        let mut uf = UnionFind::new();
        assert!(uf.union(EntityId(1), EntityId(2)));
        assert!(uf.same_set(EntityId(1), EntityId(2)));
        assert_eq!(uf.component_count(), 1);
        // Repeated union of the same pair is a no-op
        assert!(!uf.union(EntityId(2), EntityId(1)));
        assert_eq!(uf.component_count(), 1);
    }

    #[test]
    fn test_transitive_chain() {
        let mut uf = UnionFind::new();
        uf.union(EntityId(1), EntityId(2));
        uf.union(EntityId(2), EntityId(3));
        uf.union(EntityId(4), EntityId(5));
        assert!(uf.same_set(EntityId(1), EntityId(3)));
        assert!(!uf.same_set(EntityId(1), EntityId(4)));
        assert_eq!(uf.component_count(), 2);
    }

    #[test]
    fn test_find_on_absent_entity_is_self_root() {
        let mut uf = UnionFind::new();
        assert_eq!(uf.find(EntityId(42)), EntityId(42));
        assert!(!uf.contains(EntityId(42)));
    }

    #[test]
    fn test_components_are_deterministic() {
        let mut uf = UnionFind::new();
        uf.union(EntityId(5), EntityId(3));
        uf.union(EntityId(3), EntityId(9));
        uf.union(EntityId(2), EntityId(7));
        uf.insert(EntityId(1));

        let components = uf.components();
        assert_eq!(
            components,
            vec![
                vec![EntityId(1)],
                vec![EntityId(2), EntityId(7)],
                vec![EntityId(3), EntityId(5), EntityId(9)],
            ]
        );
    }
}

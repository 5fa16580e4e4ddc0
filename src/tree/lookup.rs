//! Shown-order lookup over the node arena.
//!
//! The lookup is the flat sequence the engine actually operates on: the ids
//! of every shown node in display order. It is kept sorted by
//! [`Arena::is_front`], which lets [`TreeStore::find`] locate a node by binary
//! search instead of a scan.

use super::arena::Arena;
use super::NodeId;
use crate::slot::{Slot, SlotStore};
use crate::validate::InvariantViolation;

pub(crate) struct TreeStore<T> {
    pub arena: Arena<T>,
    pub lookup: Vec<NodeId>,
}

impl<T> TreeStore<T> {
    pub fn new() -> Self {
        Self {
            arena: Arena::new(),
            lookup: Vec::new(),
        }
    }

    /// Lookup position of a shown node, O(log n · depth).
    pub fn find(&self, id: NodeId) -> Option<usize> {
        if !self.arena.contains(id) {
            return None;
        }
        let at = self.insertion_point(id);
        (self.lookup.get(at) == Some(&id)).then_some(at)
    }

    /// Position at which `id` belongs in display order.
    pub fn insertion_point(&self, id: NodeId) -> usize {
        self.lookup.partition_point(|&x| self.arena.is_front(x, id))
    }

    /// Checks the lookup against a full fold-aware traversal, and that hidden
    /// nodes carry no layout state.
    pub fn validate_lookup(&self) -> Result<(), InvariantViolation> {
        let expected = self.arena.shown_descendants(None);
        if expected.len() != self.lookup.len() {
            return Err(InvariantViolation::LookupLength {
                expected: expected.len(),
                found: self.lookup.len(),
            });
        }
        if let Some(position) = (0..expected.len()).find(|&i| expected[i] != self.lookup[i]) {
            return Err(InvariantViolation::LookupMismatch { position });
        }

        let mut hidden = Vec::new();
        for &id in &expected {
            let node = self.arena.node(id);
            if node.folded {
                for &child in &node.children {
                    self.arena.collect_subtree(child, &mut hidden);
                }
            }
        }
        for id in hidden {
            let slot = &self.arena.node(id).slot;
            if slot.materialized || slot.offset.value().is_some() || slot.height.is_measured() {
                return Err(InvariantViolation::HiddenBookkeeping { node: id.index() });
            }
        }
        Ok(())
    }
}

impl<T> SlotStore for TreeStore<T> {
    type Item = T;

    fn len(&self) -> usize {
        self.lookup.len()
    }

    fn item(&self, at: usize) -> &T {
        &self.arena.node(self.lookup[at]).payload
    }

    fn slot(&self, at: usize) -> &Slot {
        &self.arena.node(self.lookup[at]).slot
    }

    fn slot_mut(&mut self, at: usize) -> &mut Slot {
        let id = self.lookup[at];
        &mut self.arena.node_mut(id).slot
    }
}

//! Node arena for the hierarchical index.
//!
//! Nodes live in a slab addressed by generational [`NodeId`]s. Parent links
//! are ids, so there are no ownership cycles; a freed slot bumps its
//! generation and every id still pointing at it goes stale.
//!
//! Top-level nodes hang off an implicit, never-shown root.

use crate::slot::Slot;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Stable handle to a tree node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId {
    index: u32,
    generation: u32,
}

impl NodeId {
    /// Slab index (reused after the node is erased).
    pub fn index(&self) -> usize {
        self.index as usize
    }

    pub fn generation(&self) -> u32 {
        self.generation
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}v{}", self.index, self.generation)
    }
}

pub(crate) struct Node<T> {
    pub payload: T,
    pub parent: Option<NodeId>,
    pub children: Vec<NodeId>,
    /// Position among the parent's children.
    pub sibling_index: usize,
    /// 0 for top-level nodes.
    pub depth: usize,
    pub folded: bool,
    /// Whether the node may hold children.
    pub branch: bool,
    pub slot: Slot,
}

enum Entry<T> {
    Occupied { generation: u32, node: Node<T> },
    Vacant { generation: u32 },
}

pub(crate) struct Arena<T> {
    entries: Vec<Entry<T>>,
    free: Vec<u32>,
    roots: Vec<NodeId>,
    len: usize,
}

impl<T> Arena<T> {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
            free: Vec::new(),
            roots: Vec::new(),
            len: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn roots(&self) -> &[NodeId] {
        &self.roots
    }

    // ===== Access =====

    pub fn get(&self, id: NodeId) -> Option<&Node<T>> {
        match self.entries.get(id.index()) {
            Some(Entry::Occupied { generation, node }) if *generation == id.generation => Some(node),
            _ => None,
        }
    }

    pub fn get_mut(&mut self, id: NodeId) -> Option<&mut Node<T>> {
        match self.entries.get_mut(id.index()) {
            Some(Entry::Occupied { generation, node }) if *generation == id.generation => Some(node),
            _ => None,
        }
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.get(id).is_some()
    }

    /// Live node; a stale id is a caller bug.
    pub fn node(&self, id: NodeId) -> &Node<T> {
        match self.get(id) {
            Some(node) => node,
            None => panic!("stale or unknown node id {id}"),
        }
    }

    pub fn node_mut(&mut self, id: NodeId) -> &mut Node<T> {
        match self.get_mut(id) {
            Some(node) => node,
            None => panic!("stale or unknown node id {id}"),
        }
    }

    /// Children of `parent`, or the top-level nodes for `None`.
    pub fn siblings(&self, parent: Option<NodeId>) -> &[NodeId] {
        match parent {
            Some(parent) => &self.node(parent).children,
            None => &self.roots,
        }
    }

    fn siblings_mut(&mut self, parent: Option<NodeId>) -> &mut Vec<NodeId> {
        match parent {
            Some(parent) => &mut self.node_mut(parent).children,
            None => &mut self.roots,
        }
    }

    /// Replaces a sibling list after reordering it and renumbers it.
    pub fn set_siblings(&mut self, parent: Option<NodeId>, order: Vec<NodeId>) {
        *self.siblings_mut(parent) = order;
        self.renumber(parent, 0);
    }

    pub fn take_siblings(&mut self, parent: Option<NodeId>) -> Vec<NodeId> {
        std::mem::take(self.siblings_mut(parent))
    }

    fn renumber(&mut self, parent: Option<NodeId>, from: usize) {
        let siblings: Vec<NodeId> = self.siblings(parent)[from..].to_vec();
        for (offset, id) in siblings.into_iter().enumerate() {
            self.node_mut(id).sibling_index = from + offset;
        }
    }

    // ===== Allocation =====

    /// Allocates a detached node and links it under `parent` at `index`.
    pub fn attach(&mut self, parent: Option<NodeId>, index: usize, payload: T, branch: bool) -> NodeId {
        let depth = parent.map_or(0, |p| self.node(p).depth + 1);
        let node = Node {
            payload,
            parent,
            children: Vec::new(),
            sibling_index: index,
            depth,
            folded: false,
            branch,
            slot: Slot::new(),
        };

        let id = match self.free.pop() {
            Some(index) => {
                let slot = &mut self.entries[index as usize];
                let generation = match slot {
                    Entry::Vacant { generation } => *generation,
                    Entry::Occupied { generation, .. } => *generation,
                };
                *slot = Entry::Occupied { generation, node };
                NodeId { index, generation }
            }
            None => {
                let index = self.entries.len() as u32;
                self.entries.push(Entry::Occupied { generation: 0, node });
                NodeId { index, generation: 0 }
            }
        };
        self.len += 1;

        self.siblings_mut(parent).insert(index, id);
        self.renumber(parent, index);
        id
    }

    /// Unlinks `id` from its parent and frees its whole subtree.
    ///
    /// # Returns
    /// The payload of `id` and the ids of every freed node (including `id`).
    pub fn remove_subtree(&mut self, id: NodeId) -> (T, Vec<NodeId>) {
        let (parent, index) = {
            let node = self.node(id);
            (node.parent, node.sibling_index)
        };
        self.siblings_mut(parent).remove(index);
        self.renumber(parent, index);

        let mut freed = Vec::new();
        self.collect_subtree(id, &mut freed);
        let mut root_payload = None;
        for &gone in freed.iter() {
            if let Some(node) = self.free_entry(gone) {
                if gone == id {
                    root_payload = Some(node.payload);
                }
            }
        }
        match root_payload {
            Some(payload) => (payload, freed),
            None => panic!("stale or unknown node id {id}"),
        }
    }

    fn free_entry(&mut self, id: NodeId) -> Option<Node<T>> {
        let entry = self.entries.get_mut(id.index())?;
        let vacant = Entry::Vacant {
            generation: id.generation.wrapping_add(1),
        };
        match std::mem::replace(entry, vacant) {
            Entry::Occupied { node, .. } => {
                self.free.push(id.index);
                self.len -= 1;
                Some(node)
            }
            previous => {
                *entry = previous;
                None
            }
        }
    }

    /// Frees every node; slots are kept so their generations keep counting.
    pub fn clear(&mut self) {
        self.free.clear();
        for (index, entry) in self.entries.iter_mut().enumerate().rev() {
            let generation = match entry {
                Entry::Occupied { generation, .. } => generation.wrapping_add(1),
                Entry::Vacant { generation } => *generation,
            };
            *entry = Entry::Vacant { generation };
            self.free.push(index as u32);
        }
        self.roots.clear();
        self.len = 0;
    }

    // ===== Traversal =====

    /// Pre-order ids of the subtree rooted at `id` (including `id`).
    pub fn collect_subtree(&self, id: NodeId, out: &mut Vec<NodeId>) {
        let mut stack = vec![id];
        while let Some(next) = stack.pop() {
            out.push(next);
            stack.extend(self.node(next).children.iter().rev());
        }
    }

    /// Pre-order descendants of `parent` that are shown when `parent` is:
    /// children of folded nodes are skipped. `None` walks from the root.
    pub fn shown_descendants(&self, parent: Option<NodeId>) -> Vec<NodeId> {
        let mut out = Vec::new();
        if matches!(parent, Some(p) if self.node(p).folded) {
            return out;
        }
        let mut stack: Vec<NodeId> = self.siblings(parent).iter().rev().copied().collect();
        while let Some(next) = stack.pop() {
            out.push(next);
            let node = self.node(next);
            if !node.folded {
                stack.extend(node.children.iter().rev());
            }
        }
        out
    }

    // ===== Ordering =====

    /// True when `ancestor` is a strict ancestor of `id`.
    pub fn is_descendant(&self, id: NodeId, ancestor: NodeId) -> bool {
        let mut cursor = self.node(id).parent;
        while let Some(current) = cursor {
            if current == ancestor {
                return true;
            }
            cursor = self.node(current).parent;
        }
        false
    }

    /// No ancestor of `id` is folded.
    pub fn is_shown(&self, id: NodeId) -> bool {
        self.topmost_folded_ancestor(id).is_none()
    }

    /// Folded ancestor closest to the root, if any.
    pub fn topmost_folded_ancestor(&self, id: NodeId) -> Option<NodeId> {
        let mut found = None;
        let mut cursor = self.node(id).parent;
        while let Some(current) = cursor {
            let node = self.node(current);
            if node.folded {
                found = Some(current);
            }
            cursor = node.parent;
        }
        found
    }

    /// Every folded ancestor of `id`, topmost first.
    pub fn folded_ancestors(&self, id: NodeId) -> Vec<NodeId> {
        let mut found = Vec::new();
        let mut cursor = self.node(id).parent;
        while let Some(current) = cursor {
            let node = self.node(current);
            if node.folded {
                found.push(current);
            }
            cursor = node.parent;
        }
        found.reverse();
        found
    }

    /// Display order: ancestors before descendants, earlier siblings (and
    /// their subtrees) before later ones.
    pub fn is_front(&self, a: NodeId, b: NodeId) -> bool {
        if a == b {
            return false;
        }
        let (depth_a, depth_b) = (self.node(a).depth, self.node(b).depth);
        let (mut x, mut y) = (a, b);
        while self.node(x).depth > self.node(y).depth {
            match self.node(x).parent {
                Some(parent) => x = parent,
                None => break,
            }
        }
        while self.node(y).depth > self.node(x).depth {
            match self.node(y).parent {
                Some(parent) => y = parent,
                None => break,
            }
        }
        if x == y {
            return depth_a < depth_b;
        }
        loop {
            let (px, py) = (self.node(x).parent, self.node(y).parent);
            if px == py {
                return self.node(x).sibling_index < self.node(y).sibling_index;
            }
            match (px, py) {
                (Some(px), Some(py)) => {
                    x = px;
                    y = py;
                }
                _ => return self.node(x).sibling_index < self.node(y).sibling_index,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// a(b(d, e), c)
    fn sample() -> (Arena<&'static str>, [NodeId; 5]) {
        let mut arena = Arena::new();
        let a = arena.attach(None, 0, "a", true);
        let b = arena.attach(Some(a), 0, "b", true);
        let c = arena.attach(Some(a), 1, "c", false);
        let d = arena.attach(Some(b), 0, "d", false);
        let e = arena.attach(Some(b), 1, "e", false);
        (arena, [a, b, c, d, e])
    }

    #[test]
    fn test_is_front_matches_preorder() {
        let (arena, [a, b, c, d, e]) = sample();
        let order = [a, b, d, e, c];
        for (i, &x) in order.iter().enumerate() {
            for (j, &y) in order.iter().enumerate() {
                assert_eq!(arena.is_front(x, y), i < j, "{} vs {}", arena.node(x).payload, arena.node(y).payload);
            }
        }
    }

    #[test]
    fn test_attach_renumbers_siblings() {
        let (mut arena, [a, b, c, ..]) = sample();
        let x = arena.attach(Some(a), 1, "x", false);

        assert_eq!(arena.node(a).children, vec![b, x, c]);
        assert_eq!(arena.node(x).sibling_index, 1);
        assert_eq!(arena.node(c).sibling_index, 2);
        assert_eq!(arena.node(x).depth, 1);
    }

    #[test]
    fn test_shown_descendants_skip_folded() {
        let (mut arena, [a, b, c, d, e]) = sample();
        assert_eq!(arena.shown_descendants(Some(a)), vec![b, d, e, c]);

        arena.node_mut(b).folded = true;
        assert_eq!(arena.shown_descendants(Some(a)), vec![b, c]);
        assert_eq!(arena.shown_descendants(None), vec![a, b, c]);
        assert!(!arena.is_shown(d));
        assert_eq!(arena.topmost_folded_ancestor(e), Some(b));
    }

    #[test]
    fn test_remove_subtree_invalidates_ids() {
        let (mut arena, [a, b, c, d, e]) = sample();
        let (payload, freed) = arena.remove_subtree(b);

        assert_eq!(payload, "b");
        assert_eq!(freed, vec![b, d, e]);
        assert_eq!(arena.len(), 2);
        assert!(!arena.contains(d));
        assert_eq!(arena.node(c).sibling_index, 0);

        let reused = arena.attach(Some(a), 0, "z", false);
        assert_ne!(reused, b);
        assert!(!arena.contains(b));
    }

    #[test]
    fn test_clear_keeps_generations() {
        let (mut arena, [a, _, _, d, _]) = sample();
        arena.clear();
        assert_eq!(arena.len(), 0);
        assert!(arena.roots().is_empty());

        let fresh = arena.attach(None, 0, "f", false);
        assert_ne!(fresh, a);
        assert!(!arena.contains(a));
        assert!(!arena.contains(d));
        assert!(arena.contains(fresh));
        assert_eq!(fresh.generation(), 1);
    }

    #[test]
    fn test_is_descendant() {
        let (arena, [a, b, c, d, _]) = sample();
        assert!(arena.is_descendant(d, a));
        assert!(arena.is_descendant(d, b));
        assert!(!arena.is_descendant(c, b));
        assert!(!arena.is_descendant(a, a));
    }
}

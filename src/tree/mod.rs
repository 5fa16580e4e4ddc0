//! Foldable virtual tree.
//!
//! [`VirtualTree`] keeps its nodes in an arena and maintains a flat lookup of
//! the shown nodes in display order. The engine windows over that lookup:
//! - inserting or erasing a shown subtree is an insert/erase on the lookup
//! - folding a node erases its shown descendants right after it
//! - unfolding inserts them back, unmeasured
//!
//! Nodes become shown or hidden only through these entry points, and a node
//! leaving the lookup loses its memoized height.

mod arena;
mod lookup;

pub use arena::NodeId;

use crate::config::EngineConfig;
use crate::engine::Engine;
use crate::events::{EventQueue, TreeEvent};
use crate::host::ItemHost;
use crate::slot::{Extent, Slot};
use crate::validate::InvariantViolation;
use crate::window::{Viewport, WindowDelta};
use lookup::TreeStore;
use std::cmp::Ordering;
use tracing::debug;

/// Windowed tree of variable-height nodes.
pub struct VirtualTree<T, H> {
    store: TreeStore<T>,
    host: H,
    engine: Engine,
    selected: Option<NodeId>,
    events: EventQueue<TreeEvent>,
    keep_anchor_on_sort: bool,
}

impl<T, H: ItemHost<T>> VirtualTree<T, H> {
    pub fn new(host: H) -> Self {
        Self::with_config(host, &EngineConfig::default())
    }

    pub fn with_config(host: H, config: &EngineConfig) -> Self {
        Self {
            store: TreeStore::new(),
            host,
            engine: Engine::new(config),
            selected: None,
            events: EventQueue::new(),
            keep_anchor_on_sort: config.keep_anchor_on_sort,
        }
    }

    // ===== Node queries =====

    /// Number of live nodes, shown or not.
    pub fn len(&self) -> usize {
        self.store.arena.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of shown nodes (the lookup length).
    pub fn shown_len(&self) -> usize {
        self.store.lookup.len()
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.store.arena.contains(id)
    }

    pub fn get(&self, id: NodeId) -> Option<&T> {
        self.store.arena.get(id).map(|node| &node.payload)
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.store.arena.node(id).parent
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.store.arena.node(id).children
    }

    /// Top-level nodes.
    pub fn roots(&self) -> &[NodeId] {
        self.store.arena.roots()
    }

    pub fn depth(&self, id: NodeId) -> usize {
        self.store.arena.node(id).depth
    }

    pub fn is_folded(&self, id: NodeId) -> bool {
        self.store.arena.node(id).folded
    }

    pub fn is_branch(&self, id: NodeId) -> bool {
        self.store.arena.node(id).branch
    }

    /// True when no ancestor of `id` is folded.
    pub fn is_shown(&self, id: NodeId) -> bool {
        self.store.arena.is_shown(id)
    }

    pub fn is_descendant(&self, id: NodeId, ancestor: NodeId) -> bool {
        self.store.arena.is_descendant(id, ancestor)
    }

    /// Display-order comparison.
    pub fn is_front(&self, a: NodeId, b: NodeId) -> bool {
        self.store.arena.is_front(a, b)
    }

    /// Lookup position of a shown node (binary search).
    pub fn find(&self, id: NodeId) -> Option<usize> {
        self.store.find(id)
    }

    /// Node at lookup position `at`.
    pub fn node_at(&self, at: usize) -> Option<NodeId> {
        self.store.lookup.get(at).copied()
    }

    /// Shown nodes in display order.
    pub fn shown(&self) -> &[NodeId] {
        &self.store.lookup
    }

    pub fn slot(&self, id: NodeId) -> &Slot {
        &self.store.arena.node(id).slot
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn host_mut(&mut self) -> &mut H {
        &mut self.host
    }

    pub fn engine(&self) -> &Engine {
        &self.engine
    }

    // ===== Window queries =====

    pub fn visible_range(&self) -> Option<(usize, usize)> {
        self.engine.visible_range()
    }

    pub fn total_extent(&self) -> Extent {
        self.engine.total_extent(&self.store)
    }

    pub fn offset_of(&self, id: NodeId) -> Option<Extent> {
        let at = self.find(id)?;
        self.engine.offset_of(&self.store, at)
    }

    /// Node under content distance `distance`, for hit-testing.
    pub fn node_at_distance(&self, distance: Extent) -> Option<NodeId> {
        self.engine
            .item_at(&self.store, distance)
            .and_then(|at| self.node_at(at))
    }

    pub fn next_precise(&self) -> usize {
        self.engine.next_precise()
    }

    pub fn viewport(&self) -> Viewport {
        self.engine.viewport()
    }

    /// Ledger/window invariants plus lookup order and hidden-node state.
    pub fn validate(&self) -> Result<(), InvariantViolation> {
        self.engine.validate(&self.store)?;
        self.store.validate_lookup()
    }

    pub fn drain_events(&mut self) -> Vec<TreeEvent> {
        self.events.drain()
    }

    // ===== Window =====

    /// Moves the viewport to `[offset, offset + extent)` and returns the window change.
    ///
    /// When the content ends inside the requested viewport, the viewport is
    /// pulled back to show the last screenful, so [`viewport()`](Self::viewport)
    /// may report a smaller offset than the one requested.
    pub fn set_viewport(&mut self, offset: Extent, extent: Extent) -> WindowDelta {
        self.engine
            .set_viewport(&mut self.store, &mut self.host, Viewport::new(offset, extent))
    }

    /// Changes the layout width. Every shown node is measured again (expensive).
    pub fn set_width(&mut self, width: Extent) -> WindowDelta {
        self.engine.set_width(&mut self.store, &mut self.host, width)
    }

    /// Scrolls a shown node into view; `None` when it is hidden.
    pub fn scroll_to(&mut self, id: NodeId) -> Option<WindowDelta> {
        let at = self.find(id)?;
        Some(self.engine.scroll_to(&mut self.store, &mut self.host, at))
    }

    /// Drops the memoized height of a node after its content changed.
    pub fn invalidate(&mut self, id: NodeId) {
        if let Some(at) = self.find(id) {
            self.engine.invalidate(&mut self.store, &mut self.host, at);
        }
    }

    /// Edits a payload in place and invalidates its height.
    pub fn update_node<R>(&mut self, id: NodeId, edit: impl FnOnce(&mut T) -> R) -> R {
        let result = edit(&mut self.store.arena.node_mut(id).payload);
        self.invalidate(id);
        result
    }

    // ===== Structure =====

    /// Inserts a node under `parent` (top level for `None`) at child `index`.
    ///
    /// The node enters the lookup when its parent is shown and unfolded.
    pub fn insert_node(&mut self, parent: Option<NodeId>, index: usize, payload: T, branch: bool) -> NodeId {
        if let Some(parent) = parent {
            assert!(self.store.arena.node(parent).branch, "node {parent} cannot hold children");
        }
        let siblings = self.store.arena.siblings(parent).len();
        assert!(index <= siblings, "child index {index} out of range ({siblings} siblings)");

        let id = self.store.arena.attach(parent, index, payload, branch);
        let shown = match parent {
            None => true,
            Some(parent) => !self.store.arena.node(parent).folded && self.store.arena.is_shown(parent),
        };
        if shown {
            let at = self.store.insertion_point(id);
            self.engine
                .insert(&mut self.store, &mut self.host, at, 1, |store: &mut TreeStore<T>| {
                    store.lookup.insert(at, id)
                });
        }
        id
    }

    /// Appends a node as the last child of `parent`.
    pub fn push_node(&mut self, parent: Option<NodeId>, payload: T, branch: bool) -> NodeId {
        let index = self.store.arena.siblings(parent).len();
        self.insert_node(parent, index, payload, branch)
    }

    /// Erases a node and its whole subtree; returns the node's payload.
    pub fn erase_node(&mut self, id: NodeId) -> T {
        if let Some(at) = self.find(id) {
            let count = 1 + self.store.arena.shown_descendants(Some(id)).len();
            self.engine
                .erase(&mut self.store, &mut self.host, at, count, |store: &mut TreeStore<T>| {
                    store.lookup.drain(at..at + count).for_each(drop)
                });
        }

        let (payload, freed) = self.store.arena.remove_subtree(id);
        if let Some(selected) = self.selected.filter(|s| freed.contains(s)) {
            self.selected = None;
            self.events.push(TreeEvent::SelectionChanged {
                previous: Some(selected),
                current: None,
            });
        }
        payload
    }

    /// Removes every node.
    pub fn clear(&mut self) {
        self.engine
            .clear(&mut self.store, &mut self.host, |store: &mut TreeStore<T>| {
                store.lookup.clear();
                store.arena.clear();
            });
        if let Some(previous) = self.selected.take() {
            self.events.push(TreeEvent::SelectionChanged {
                previous: Some(previous),
                current: None,
            });
        }
    }

    // ===== Folding =====

    /// Hides the descendants of `id`.
    ///
    /// A selection inside the folded subtree moves to `id`.
    pub fn fold(&mut self, id: NodeId) {
        assert!(!self.store.arena.node(id).folded, "node {id} is already folded");

        if let Some(at) = self.find(id) {
            let hidden = self.store.arena.shown_descendants(Some(id));
            let count = hidden.len();
            self.engine
                .erase(&mut self.store, &mut self.host, at + 1, count, |store: &mut TreeStore<T>| {
                    store.lookup.drain(at + 1..at + 1 + count).for_each(drop)
                });
            for gone in hidden {
                self.store.arena.node_mut(gone).slot.reset();
            }
            debug!(node = %id, position = at, hidden = count, "folded");
        }
        self.store.arena.node_mut(id).folded = true;

        if let Some(selected) = self.selected {
            if self.store.arena.is_descendant(selected, id) {
                self.set_selection(Some(id));
            }
        }
        self.events.push(TreeEvent::FoldChanged { node: id, folded: true });
    }

    /// Shows the descendants of `id` again (unmeasured).
    pub fn unfold(&mut self, id: NodeId) {
        assert!(self.store.arena.node(id).folded, "node {id} is not folded");
        self.store.arena.node_mut(id).folded = false;

        if let Some(at) = self.find(id) {
            let shown = self.store.arena.shown_descendants(Some(id));
            let count = shown.len();
            self.engine
                .insert(&mut self.store, &mut self.host, at + 1, count, |store: &mut TreeStore<T>| {
                    store.lookup.splice(at + 1..at + 1, shown).for_each(drop)
                });
            debug!(node = %id, position = at, shown = count, "unfolded");
        }
        self.events.push(TreeEvent::FoldChanged { node: id, folded: false });
    }

    /// Folds an unfolded node or unfolds a folded one.
    pub fn toggle(&mut self, id: NodeId) {
        if self.is_folded(id) {
            self.unfold(id);
        } else {
            self.fold(id);
        }
    }

    /// Folds every unfolded branch child of `id`.
    pub fn fold_children(&mut self, id: NodeId) {
        for child in self.children(id).to_vec() {
            let node = self.store.arena.node(child);
            if node.branch && !node.folded {
                self.fold(child);
            }
        }
    }

    /// Unfolds every folded child of `id`.
    pub fn unfold_children(&mut self, id: NodeId) {
        for child in self.children(id).to_vec() {
            if self.is_folded(child) {
                self.unfold(child);
            }
        }
    }

    /// Unfolds every folded ancestor so that `id` becomes shown.
    pub fn reveal(&mut self, id: NodeId) {
        for ancestor in self.store.arena.folded_ancestors(id) {
            self.unfold(ancestor);
        }
    }

    // ===== Sorting =====

    /// Stable sort of the children of `parent` (top level for `None`).
    pub fn sort_children(&mut self, parent: Option<NodeId>, mut compare: impl FnMut(&T, &T) -> Ordering) -> WindowDelta {
        self.engine.reorder(
            &mut self.store,
            &mut self.host,
            self.keep_anchor_on_sort,
            |store: &mut TreeStore<T>, anchor| {
                let anchor = anchor.map(|at| store.lookup[at]);
                sort_group(&mut store.arena, parent, &mut compare);

                let segment = match parent {
                    None => Some(0),
                    Some(p) if !store.arena.node(p).folded => store.find(p).map(|at| at + 1),
                    Some(_) => None,
                };
                if let Some(start) = segment {
                    let shown = store.arena.shown_descendants(parent);
                    let end = start + shown.len();
                    store.lookup.splice(start..end, shown).for_each(drop);
                }
                anchor.and_then(|id| store.find(id))
            },
        )
    }

    /// Stable sort of every sibling group in the tree.
    pub fn sort(&mut self, mut compare: impl FnMut(&T, &T) -> Ordering) -> WindowDelta {
        self.engine.reorder(
            &mut self.store,
            &mut self.host,
            self.keep_anchor_on_sort,
            |store: &mut TreeStore<T>, anchor| {
                let anchor = anchor.map(|at| store.lookup[at]);
                let mut groups = vec![None];
                while let Some(parent) = groups.pop() {
                    sort_group(&mut store.arena, parent, &mut compare);
                    groups.extend(store.arena.siblings(parent).iter().map(|&id| Some(id)));
                }
                store.lookup = store.arena.shown_descendants(None);
                anchor.and_then(|id| store.find(id))
            },
        )
    }

    // ===== Selection =====

    pub fn selected(&self) -> Option<NodeId> {
        self.selected
    }

    /// Selects a node, or clears the selection with `None`.
    ///
    /// A hidden node redirects to its topmost folded ancestor. Returns
    /// `false` when the (redirected) node is not selectable.
    pub fn select(&mut self, id: Option<NodeId>) -> bool {
        let target = id.map(|id| self.store.arena.topmost_folded_ancestor(id).unwrap_or(id));
        if let Some(target) = target {
            if !self.host.selectable(&self.store.arena.node(target).payload) {
                return false;
            }
        }
        self.set_selection(target);
        true
    }

    fn set_selection(&mut self, target: Option<NodeId>) {
        if target == self.selected {
            return;
        }
        let previous = self.selected;
        if let Some(previous) = previous {
            if let Some(node) = self.store.arena.get_mut(previous) {
                node.slot.selected = false;
            }
        }
        if let Some(target) = target {
            self.store.arena.node_mut(target).slot.selected = true;
        }
        self.selected = target;
        self.events.push(TreeEvent::SelectionChanged {
            previous,
            current: target,
        });
    }
}

/// Stable sort of one sibling group by payload.
fn sort_group<T>(
    arena: &mut arena::Arena<T>,
    parent: Option<NodeId>,
    compare: &mut impl FnMut(&T, &T) -> Ordering,
) {
    let mut group = arena.take_siblings(parent);
    group.sort_by(|&a, &b| compare(&arena.node(a).payload, &arena.node(b).payload));
    arena.set_siblings(parent, group);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::{MeasureHost, RecordingHost};

    type TestTree = VirtualTree<u64, RecordingHost<MeasureHost>>;

    fn tree() -> TestTree {
        VirtualTree::new(RecordingHost::measurable())
    }

    /// Five top-level leaves, then a branch with `children` leaves, then more leaves.
    fn wide_tree(children: usize) -> (TestTree, NodeId) {
        let mut t = tree();
        for _ in 0..5 {
            t.push_node(None, 10, false);
        }
        let branch = t.push_node(None, 10, true);
        for _ in 0..children {
            t.push_node(Some(branch), 10, false);
        }
        for _ in 0..20 {
            t.push_node(None, 10, false);
        }
        (t, branch)
    }

    fn check(t: &TestTree) {
        if let Err(violation) = t.validate() {
            panic!("invariant broken: {violation}");
        }
    }

    #[test]
    fn test_fold_scenario() {
        let (mut t, branch) = wide_tree(40);
        t.set_viewport(0, 100);
        assert_eq!(t.visible_range(), Some((0, 9)));
        assert_eq!(t.find(branch), Some(5));
        let shown = t.shown_len();

        t.fold(branch);
        check(&t);
        assert_eq!(t.shown_len(), shown - 40);
        assert_eq!(t.visible_range(), Some((0, 5)));
        assert_eq!(t.host().stats().released, 4);
        assert_eq!(
            t.drain_events(),
            vec![TreeEvent::FoldChanged { node: branch, folded: true }]
        );
    }

    #[test]
    fn test_unfold_restores_lookup() {
        let (mut t, branch) = wide_tree(40);
        t.set_viewport(0, 100);
        let before = t.shown().to_vec();

        t.fold(branch);
        t.unfold(branch);
        check(&t);
        assert_eq!(t.shown(), &before[..]);
        assert_eq!(t.visible_range(), Some((0, 5)));

        t.set_viewport(0, 100);
        assert_eq!(t.visible_range(), Some((0, 9)));
        check(&t);
    }

    #[test]
    fn test_insert_under_folded_parent_stays_hidden() {
        let (mut t, branch) = wide_tree(3);
        t.fold(branch);
        let shown = t.shown_len();

        let child = t.push_node(Some(branch), 10, false);
        assert_eq!(t.shown_len(), shown);
        assert_eq!(t.find(child), None);
        assert!(!t.is_shown(child));

        t.unfold(branch);
        assert_eq!(t.find(child), Some(9));
        check(&t);
    }

    #[test]
    fn test_nested_fold_keeps_inner_state() {
        let mut t = tree();
        let a = t.push_node(None, 10, true);
        let b = t.push_node(Some(a), 10, true);
        let c = t.push_node(Some(b), 10, false);
        t.set_viewport(0, 100);

        t.fold(b);
        t.fold(a);
        t.unfold(a);
        check(&t);
        assert_eq!(t.shown(), &[a, b]);
        assert!(t.is_folded(b));
        assert!(!t.is_shown(c));
    }

    #[test]
    fn test_fold_moves_selection_to_folded_node() {
        let (mut t, branch) = wide_tree(5);
        let inner = t.children(branch)[2];
        assert!(t.select(Some(inner)));
        t.drain_events();

        t.fold(branch);
        assert_eq!(t.selected(), Some(branch));
        assert!(t.slot(branch).selected);
        assert!(!t.slot(inner).selected);
        assert_eq!(
            t.drain_events(),
            vec![
                TreeEvent::SelectionChanged { previous: Some(inner), current: Some(branch) },
                TreeEvent::FoldChanged { node: branch, folded: true },
            ]
        );
        check(&t);
    }

    #[test]
    fn test_select_hidden_redirects_to_topmost_folded() {
        let mut t = tree();
        let a = t.push_node(None, 10, true);
        let b = t.push_node(Some(a), 10, true);
        let c = t.push_node(Some(b), 10, false);
        t.fold(b);
        t.fold(a);

        assert!(t.select(Some(c)));
        assert_eq!(t.selected(), Some(a));
    }

    #[test]
    fn test_erase_subtree_clears_selection() {
        let (mut t, branch) = wide_tree(10);
        t.set_viewport(0, 200);
        let inner = t.children(branch)[4];
        t.select(Some(inner));
        t.drain_events();
        let shown = t.shown_len();

        assert_eq!(t.erase_node(branch), 10);
        check(&t);
        assert_eq!(t.shown_len(), shown - 11);
        assert_eq!(t.selected(), None);
        assert!(!t.contains(inner));
        assert_eq!(
            t.drain_events(),
            vec![TreeEvent::SelectionChanged { previous: Some(inner), current: None }]
        );
    }

    #[test]
    fn test_sort_children_reorders_lookup() {
        let mut t = tree();
        let root = t.push_node(None, 1, true);
        for h in [30, 10, 20] {
            let child = t.push_node(Some(root), h, true);
            t.push_node(Some(child), 5, false);
        }
        t.set_viewport(0, 1000);

        t.sort_children(Some(root), |a, b| a.cmp(b));
        check(&t);
        let heights: Vec<u64> = t.shown().iter().map(|&id| *t.get(id).unwrap()).collect();
        assert_eq!(heights, vec![1, 10, 5, 20, 5, 30, 5]);
        assert_eq!(t.visible_range(), Some((0, 6)));
    }

    #[test]
    fn test_sort_whole_tree() {
        let mut t = tree();
        let b = t.push_node(None, 2, true);
        let a = t.push_node(None, 1, true);
        t.push_node(Some(a), 9, false);
        t.push_node(Some(a), 8, false);
        t.push_node(Some(b), 7, false);
        t.fold(b);

        t.sort(|x, y| x.cmp(y));
        check(&t);
        let payloads: Vec<u64> = t.shown().iter().map(|&id| *t.get(id).unwrap()).collect();
        assert_eq!(payloads, vec![1, 8, 9, 2]);
    }

    #[test]
    fn test_reveal_and_scroll_to() {
        let mut t = tree();
        let mut parent = None;
        let mut path = Vec::new();
        for _ in 0..4 {
            let id = t.push_node(parent, 10, true);
            path.push(id);
            parent = Some(id);
        }
        for _ in 0..50 {
            t.push_node(None, 10, false);
        }
        let deep = t.push_node(parent, 10, false);
        t.fold(path[1]);
        t.fold(path[0]);
        t.set_viewport(0, 30);

        assert!(t.scroll_to(deep).is_none());
        t.reveal(deep);
        check(&t);
        assert!(t.is_shown(deep));

        let delta = t.scroll_to(deep).unwrap();
        assert_eq!(delta.range.map(|(_, last)| last), t.find(deep));
        check(&t);
    }

    #[test]
    fn test_fold_children_and_toggle() {
        let mut t = tree();
        let root = t.push_node(None, 10, true);
        let kids: Vec<NodeId> = (0..3).map(|_| t.push_node(Some(root), 10, true)).collect();
        for &k in &kids {
            t.push_node(Some(k), 10, false);
        }
        assert_eq!(t.shown_len(), 7);

        t.fold_children(root);
        assert_eq!(t.shown_len(), 4);
        t.toggle(kids[1]);
        assert_eq!(t.shown_len(), 5);
        t.unfold_children(root);
        assert_eq!(t.shown_len(), 7);
        check(&t);
    }

    #[test]
    fn test_clear_invalidates_old_ids() {
        let mut t = tree();
        let old = t.push_node(None, 10, false);
        t.set_viewport(0, 100);
        t.clear();
        assert!(t.is_empty());

        let fresh = t.push_node(None, 20, false);
        assert_ne!(fresh, old);
        assert!(!t.contains(old));
        assert_eq!(t.get(old), None);
        assert_eq!(t.get(fresh), Some(&20));
        t.validate().unwrap();
    }

    #[test]
    #[should_panic(expected = "already folded")]
    fn test_double_fold_panics() {
        let (mut t, branch) = wide_tree(2);
        t.fold(branch);
        t.fold(branch);
    }
}

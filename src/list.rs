//! Flat virtual list.
//!
//! [`VirtualList`] owns an ordered sequence of payloads and a host, and routes
//! every structural change through the [`Engine`] so that only the items in
//! the window are ever materialized.

use crate::config::EngineConfig;
use crate::engine::Engine;
use crate::events::{EventQueue, ListEvent};
use crate::host::ItemHost;
use crate::slot::{Extent, Slot, SlotStore};
use crate::validate::InvariantViolation;
use crate::window::{Viewport, WindowDelta};
use std::cmp::Ordering;
use std::ops::Range;

struct Row<T> {
    item: T,
    slot: Slot,
}

impl<T> Row<T> {
    fn new(item: T) -> Self {
        Self {
            item,
            slot: Slot::new(),
        }
    }
}

struct Rows<T>(Vec<Row<T>>);

impl<T> SlotStore for Rows<T> {
    type Item = T;

    fn len(&self) -> usize {
        self.0.len()
    }

    fn item(&self, at: usize) -> &T {
        &self.0[at].item
    }

    fn slot(&self, at: usize) -> &Slot {
        &self.0[at].slot
    }

    fn slot_mut(&mut self, at: usize) -> &mut Slot {
        &mut self.0[at].slot
    }
}

/// Windowed list of variable-height items.
pub struct VirtualList<T, H> {
    rows: Rows<T>,
    host: H,
    engine: Engine,
    selected: Option<usize>,
    events: EventQueue<ListEvent>,
    keep_anchor_on_sort: bool,
}

impl<T, H: ItemHost<T>> VirtualList<T, H> {
    /// Creates an empty list with the default configuration.
    pub fn new(host: H) -> Self {
        Self::with_config(host, &EngineConfig::default())
    }

    pub fn with_config(host: H, config: &EngineConfig) -> Self {
        Self {
            rows: Rows(Vec::new()),
            host,
            engine: Engine::new(config),
            selected: None,
            events: EventQueue::new(),
            keep_anchor_on_sort: config.keep_anchor_on_sort,
        }
    }

    // ===== Queries =====

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn get(&self, at: usize) -> Option<&T> {
        self.rows.0.get(at).map(|row| &row.item)
    }

    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.rows.0.iter().map(|row| &row.item)
    }

    /// Engine bookkeeping of item `at`.
    pub fn slot(&self, at: usize) -> &Slot {
        self.rows.slot(at)
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

    /// Window as `(first_shown, last_shown)`; `None` when nothing is shown.
    pub fn visible_range(&self) -> Option<(usize, usize)> {
        self.engine.visible_range()
    }

    /// Best-known total extent, for sizing a scrollbar.
    pub fn total_extent(&self) -> Extent {
        self.engine.total_extent(&self.rows)
    }

    pub fn offset_of(&self, at: usize) -> Option<Extent> {
        self.engine.offset_of(&self.rows, at)
    }

    /// Item under content distance `distance`, for hit-testing.
    pub fn item_at(&self, distance: Extent) -> Option<usize> {
        self.engine.item_at(&self.rows, distance)
    }

    pub fn next_precise(&self) -> usize {
        self.engine.next_precise()
    }

    pub fn viewport(&self) -> Viewport {
        self.engine.viewport()
    }

    pub fn validate(&self) -> Result<(), InvariantViolation> {
        self.engine.validate(&self.rows)
    }

    /// Takes the queued events.
    pub fn drain_events(&mut self) -> Vec<ListEvent> {
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
            .set_viewport(&mut self.rows, &mut self.host, Viewport::new(offset, extent))
    }

    /// Changes the layout width. Every item is measured again (expensive).
    pub fn set_width(&mut self, width: Extent) -> WindowDelta {
        self.engine.set_width(&mut self.rows, &mut self.host, width)
    }

    pub fn scroll_to(&mut self, at: usize) -> WindowDelta {
        self.engine.scroll_to(&mut self.rows, &mut self.host, at)
    }

    /// Drops the memoized height of item `at`.
    pub fn invalidate(&mut self, at: usize) {
        self.engine.invalidate(&mut self.rows, &mut self.host, at);
    }

    /// Edits an item in place and invalidates its height.
    pub fn update_item<R>(&mut self, at: usize, edit: impl FnOnce(&mut T) -> R) -> R {
        let len = self.len();
        assert!(at < len, "update position {at} out of range (len {len})");
        let result = edit(&mut self.rows.0[at].item);
        self.invalidate(at);
        result
    }

    // ===== Structure =====

    /// Appends an item and returns its position.
    pub fn push(&mut self, item: T) -> usize {
        let at = self.len();
        self.insert(at, item);
        at
    }

    pub fn insert(&mut self, at: usize, item: T) {
        self.insert_many(at, std::iter::once(item));
    }

    /// Inserts several items at `at` in one mutation. Returns how many.
    pub fn insert_many(&mut self, at: usize, items: impl IntoIterator<Item = T>) -> usize {
        let rows: Vec<Row<T>> = items.into_iter().map(Row::new).collect();
        let count = rows.len();
        self.engine
            .insert(&mut self.rows, &mut self.host, at, count, |store: &mut Rows<T>| {
                store.0.splice(at..at, rows).for_each(drop);
            });
        if let Some(selected) = self.selected.filter(|&s| s >= at) {
            self.selected = Some(selected + count);
        }
        count
    }

    /// Removes and returns item `at`.
    ///
    /// Erasing the selected item leaves no selection; use
    /// [`next_selectable`](Self::next_selectable) to pick another.
    pub fn erase(&mut self, at: usize) -> T {
        let item = self
            .engine
            .erase(&mut self.rows, &mut self.host, at, 1, |store: &mut Rows<T>| {
                store.0.remove(at).item
            });
        self.selection_after_erase(at, 1);
        item
    }

    /// Removes a contiguous range of items.
    pub fn erase_range(&mut self, range: Range<usize>) -> Vec<T> {
        let (at, count) = (range.start, range.end.saturating_sub(range.start));
        let removed = self
            .engine
            .erase(&mut self.rows, &mut self.host, at, count, |store: &mut Rows<T>| {
                store.0.drain(range).map(|row| row.item).collect::<Vec<_>>()
            });
        self.selection_after_erase(at, count);
        removed
    }

    fn selection_after_erase(&mut self, at: usize, count: usize) {
        let Some(selected) = self.selected else {
            return;
        };
        if selected >= at && selected < at + count {
            self.selected = None;
            self.events.push(ListEvent::SelectionChanged {
                previous: Some(selected),
                current: None,
            });
        } else if selected >= at + count {
            self.selected = Some(selected - count);
        }
    }

    /// Removes every item.
    pub fn clear(&mut self) {
        self.engine
            .clear(&mut self.rows, &mut self.host, |store: &mut Rows<T>| store.0.clear());
        if let Some(previous) = self.selected.take() {
            self.events.push(ListEvent::SelectionChanged {
                previous: Some(previous),
                current: None,
            });
        }
    }

    /// Stable sort. The selection follows its item.
    pub fn sort_by(&mut self, mut compare: impl FnMut(&T, &T) -> Ordering) -> WindowDelta {
        let selected = self.selected;
        let mut moved_selection = None;
        let delta = self.engine.reorder(
            &mut self.rows,
            &mut self.host,
            self.keep_anchor_on_sort,
            |store: &mut Rows<T>, anchor| {
                let mut order: Vec<usize> = (0..store.0.len()).collect();
                order.sort_by(|&a, &b| compare(&store.0[a].item, &store.0[b].item));

                let mut new_position = vec![0; order.len()];
                for (new, &old) in order.iter().enumerate() {
                    new_position[old] = new;
                }
                let mut old_rows: Vec<Option<Row<T>>> = store.0.drain(..).map(Some).collect();
                store.0 = order.iter().filter_map(|&old| old_rows[old].take()).collect();

                moved_selection = selected.map(|s| new_position[s]);
                anchor.map(|a| new_position[a])
            },
        );
        self.selected = moved_selection;
        delta
    }

    // ===== Selection =====

    pub fn selected(&self) -> Option<usize> {
        self.selected
    }

    /// Selects item `at`, or clears the selection with `None`.
    ///
    /// Returns `false` (and changes nothing) for a non-selectable item.
    pub fn select(&mut self, at: Option<usize>) -> bool {
        if let Some(at) = at {
            let len = self.len();
            assert!(at < len, "select position {at} out of range (len {len})");
            if !self.host.selectable(self.rows.item(at)) {
                return false;
            }
        }
        if at == self.selected {
            return true;
        }

        let previous = self.selected;
        if let Some(prev) = previous {
            self.rows.slot_mut(prev).selected = false;
        }
        if let Some(at) = at {
            self.rows.slot_mut(at).selected = true;
        }
        self.selected = at;
        self.events.push(ListEvent::SelectionChanged {
            previous,
            current: at,
        });
        true
    }

    /// First selectable item starting at `from`, scanning forward or backward.
    pub fn next_selectable(&self, from: usize, backward: bool) -> Option<usize> {
        let len = self.len();
        if len == 0 {
            return None;
        }
        let selectable = |i: &usize| self.host.selectable(self.rows.item(*i));
        if backward {
            (0..=from.min(len - 1)).rev().find(selectable)
        } else {
            (from..len).find(selectable)
        }
    }
}

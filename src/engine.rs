//! Mutation protocol.
//!
//! [`Engine`] owns the offset ledger and the window manager and is the only
//! place where either is changed. Containers call its entry points with their
//! store, their host and a `splice` closure that performs the structural
//! change itself:
//! - `insert`/`erase` keep the window and the precise prefix valid in time
//!   proportional to the window, not the collection
//! - `reorder` (sort) releases everything and restarts from an anchor
//! - `set_viewport`/`set_width`/`scroll_to` drive the window manager
//!
//! Out-of-range positions and reentrant calls are caller bugs and panic.

use crate::config::EngineConfig;
use crate::host::ItemHost;
use crate::ledger::OffsetLedger;
use crate::slot::{Extent, HeightState, OffsetState, SlotStore};
use crate::validate::{validate_store, InvariantViolation};
use crate::window::{Viewport, WindowDelta, WindowManager};
use tracing::debug;

/// Single-threaded reentrancy guard.
///
/// A mutation that panics halfway leaves the guard held, so any later
/// mutation on the same container fails fast instead of running on corrupt
/// bounds.
#[derive(Debug, Default)]
pub struct MutationLock {
    held: bool,
}

impl MutationLock {
    pub fn acquire(&mut self) {
        assert!(
            !self.held,
            "structural mutation started while another one is in progress"
        );
        self.held = true;
    }

    pub fn release(&mut self) {
        self.held = false;
    }

    pub fn is_held(&self) -> bool {
        self.held
    }
}

/// Item under the viewport offset, remembered across a reorder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Anchor {
    pub position: usize,
    /// Distance from the item's top to the viewport offset.
    pub delta: Extent,
}

/// Ledger + window state for one container.
#[derive(Debug)]
pub struct Engine {
    ledger: OffsetLedger,
    window: WindowManager,
    lock: MutationLock,
}

fn offset_value<S: SlotStore>(store: &S, at: usize) -> Extent {
    store.slot(at).offset.value().unwrap_or(0)
}

impl Engine {
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            ledger: OffsetLedger::new(config.fallback_height),
            window: WindowManager::new(config.overscan),
            lock: MutationLock::default(),
        }
    }

    // ===== Queries =====

    pub fn ledger(&self) -> &OffsetLedger {
        &self.ledger
    }

    pub fn window(&self) -> &WindowManager {
        &self.window
    }

    pub fn visible_range(&self) -> Option<(usize, usize)> {
        self.window.range()
    }

    pub fn next_precise(&self) -> usize {
        self.ledger.next_precise()
    }

    pub fn viewport(&self) -> Viewport {
        self.window.viewport()
    }

    pub fn is_locked(&self) -> bool {
        self.lock.is_held()
    }

    pub fn total_extent<S: SlotStore>(&self, store: &S) -> Extent {
        self.ledger.total_extent(store, self.window.range())
    }

    /// Known offset of an item: precise, or estimated inside the window.
    pub fn offset_of<S: SlotStore>(&self, store: &S, at: usize) -> Option<Extent> {
        store.slot(at).offset.value()
    }

    /// Item covering content distance `distance`, if its offset is known.
    pub fn item_at<S: SlotStore>(&self, store: &S, distance: Extent) -> Option<usize> {
        if let Some(found) = self.ledger.find_precise(store, distance) {
            return Some(found);
        }
        let (first, last) = self.window.range()?;
        (first..=last).find(|&i| {
            let slot = store.slot(i);
            matches!((slot.offset.value(), slot.end()), (Some(top), Some(end)) if top <= distance && distance < end)
        })
    }

    pub fn validate<S: SlotStore>(&self, store: &S) -> Result<(), InvariantViolation> {
        validate_store(store, &self.ledger, self.window.range())
    }

    // ===== Window entry points =====

    pub fn set_viewport<S, H>(&mut self, store: &mut S, host: &mut H, viewport: Viewport) -> WindowDelta
    where
        S: SlotStore,
        H: ItemHost<S::Item>,
    {
        self.lock.acquire();
        let delta = self.window.update(&mut self.ledger, store, host, viewport);
        self.lock.release();
        delta
    }

    /// Changes the layout width. Drops every memoized height (O(N)).
    pub fn set_width<S, H>(&mut self, store: &mut S, host: &mut H, width: Extent) -> WindowDelta
    where
        S: SlotStore,
        H: ItemHost<S::Item>,
    {
        self.lock.acquire();
        let delta = self.window.set_width(&mut self.ledger, store, host, width);
        self.lock.release();
        delta
    }

    /// Scrolls the minimum distance that makes item `at` fully visible.
    ///
    /// Items taller than the viewport are aligned to its top.
    pub fn scroll_to<S, H>(&mut self, store: &mut S, host: &mut H, at: usize) -> WindowDelta
    where
        S: SlotStore,
        H: ItemHost<S::Item>,
    {
        let len = store.len();
        assert!(at < len, "scroll_to position {at} out of range (len {len})");
        self.lock.acquire();

        self.window.ensure_precise(&mut self.ledger, store, host, at + 1);
        let top = offset_value(store, at);
        let height = store.slot(at).height.value().unwrap_or(0);
        let mut viewport = self.window.viewport();
        if top < viewport.offset || height > viewport.extent {
            viewport.offset = top;
        } else if top + height > viewport.bottom() {
            viewport.offset = top + height - viewport.extent;
        }

        let delta = self.window.update(&mut self.ledger, store, host, viewport);
        self.lock.release();
        delta
    }

    // ===== Structural entry points =====

    /// Inserts `count` items at `at`; `splice` must put them into the store.
    ///
    /// The new items are unmeasured. A window containing `at` is shrunk from
    /// the nearer side (ties release the trailing side); a window after `at`
    /// shifts without remeasuring.
    pub fn insert<S, H, R>(
        &mut self,
        store: &mut S,
        host: &mut H,
        at: usize,
        count: usize,
        splice: impl FnOnce(&mut S) -> R,
    ) -> R
    where
        S: SlotStore,
        H: ItemHost<S::Item>,
    {
        let len = store.len();
        assert!(at <= len, "insert position {at} out of range (len {len})");
        if count == 0 {
            return splice(store);
        }
        self.lock.acquire();

        let estimate = self.ledger.estimate(count);
        let plan = match self.window.range() {
            None => None,
            Some((first, last)) if at <= first => {
                Some((first + count, last + count, offset_value(store, first) + estimate))
            }
            Some((first, last)) if at <= last => {
                if at - first < last + 1 - at {
                    let head = offset_value(store, at) + estimate;
                    WindowManager::release_span(store, host, first, at - 1);
                    Some((at + count, last + count, head))
                } else {
                    let head = offset_value(store, first);
                    WindowManager::release_span(store, host, at, last);
                    Some((first, at - 1, head))
                }
            }
            Some((first, last)) => Some((first, last, offset_value(store, first))),
        };

        let result = splice(store);
        debug_assert_eq!(store.len(), len + count, "insert splice changed the length incorrectly");

        self.ledger.shift_on_insert(store, at, count);
        self.window.set_range(plan.map(|(first, last, _)| (first, last)));
        if let Some((first, last, head)) = plan {
            self.ledger.mark_window(store, (first, last), head);
        }
        debug!(at, count, range = ?self.window.range(), next_precise = self.ledger.next_precise(), "inserted");

        self.lock.release();
        result
    }

    /// Erases `count` items at `at`; `splice` must take them out of the store.
    ///
    /// Materialized items among them are released first. When the erased
    /// range lies inside the precise prefix the prefix stays precise.
    pub fn erase<S, H, R>(
        &mut self,
        store: &mut S,
        host: &mut H,
        at: usize,
        count: usize,
        splice: impl FnOnce(&mut S) -> R,
    ) -> R
    where
        S: SlotStore,
        H: ItemHost<S::Item>,
    {
        let len = store.len();
        assert!(
            at.checked_add(count).is_some_and(|end| end <= len),
            "erase of {count} items at {at} out of range (len {len})"
        );
        if count == 0 {
            return splice(store);
        }
        self.lock.acquire();

        let end = at + count;
        let average = self.ledger.average_height();
        let removed_extent: Extent = (at..end)
            .map(|i| store.slot(i).height.value().unwrap_or(average))
            .sum();

        let plan = match self.window.range() {
            None => None,
            Some((first, last)) if last < at => Some((first, last, offset_value(store, first))),
            Some((first, last)) => {
                let (lo, hi) = (at.max(first), (end - 1).min(last));
                let removed_inside = if lo <= hi {
                    WindowManager::release_span(store, host, lo, hi);
                    hi - lo + 1
                } else {
                    0
                };
                let survivors = last - first + 1 - removed_inside;
                if survivors == 0 {
                    None
                } else {
                    let removed_before = first.min(end).saturating_sub(at);
                    let new_first = first - removed_before;
                    let (survivor, head) = if first < at {
                        (first, offset_value(store, first))
                    } else {
                        let survivor = first.max(end);
                        (survivor, offset_value(store, survivor).saturating_sub(removed_extent))
                    };
                    debug_assert!(survivor <= last);
                    Some((new_first, new_first + survivors - 1, head))
                }
            }
        };

        let result = splice(store);
        debug_assert_eq!(store.len(), len - count, "erase splice changed the length incorrectly");

        self.ledger.shift_on_erase(store, at, count, removed_extent);
        self.window.set_range(plan.map(|(first, last, _)| (first, last)));
        if let Some((first, last, head)) = plan {
            self.ledger.mark_window(store, (first, last), head);
        }
        debug!(at, count, range = ?self.window.range(), next_precise = self.ledger.next_precise(), "erased");

        self.lock.release();
        result
    }

    /// Reorders the store.
    ///
    /// Every materialized item is released and all offsets are forgotten
    /// (heights stay memoized). `permute` reorders the store and maps the
    /// anchor's old position to its new one. With `keep_anchor` the viewport
    /// is moved so the anchor stays at the same screen distance.
    pub fn reorder<S, H>(
        &mut self,
        store: &mut S,
        host: &mut H,
        keep_anchor: bool,
        permute: impl FnOnce(&mut S, Option<usize>) -> Option<usize>,
    ) -> WindowDelta
    where
        S: SlotStore,
        H: ItemHost<S::Item>,
    {
        self.lock.acquire();
        let len = store.len();
        let viewport = self.window.viewport();
        let anchor = self.item_at(store, viewport.offset).map(|position| Anchor {
            position,
            delta: viewport.offset - offset_value(store, position),
        });

        let released = self.window.release_all(store, host);
        self.ledger.reset(store);
        for i in 0..len {
            store.slot_mut(i).offset = OffsetState::Unknown;
        }

        let moved = permute(store, anchor.map(|a| a.position));
        debug_assert_eq!(store.len(), len, "reorder must not change the length");

        let mut target = viewport;
        if let (true, Some(anchor), Some(position)) = (keep_anchor, anchor, moved) {
            self.window.ensure_precise(&mut self.ledger, store, host, position + 1);
            target.offset = offset_value(store, position) + anchor.delta;
            debug!(from = anchor.position, to = position, offset = target.offset, "kept sort anchor");
        }
        let mut delta = self.window.update(&mut self.ledger, store, host, target);
        delta.released = released;

        self.lock.release();
        delta
    }

    /// Drops the memoized height of item `at` after its content changed.
    ///
    /// A materialized item is remeasured immediately.
    pub fn invalidate<S, H>(&mut self, store: &mut S, host: &mut H, at: usize)
    where
        S: SlotStore,
        H: ItemHost<S::Item>,
    {
        let len = store.len();
        assert!(at < len, "invalidate position {at} out of range (len {len})");
        self.lock.acquire();

        let range = self.window.range();
        let head = range.map(|(first, _)| offset_value(store, first));
        store.slot_mut(at).height = HeightState::Unmeasured;
        if self.window.contains(at) {
            self.window.ensure_measured(store, host, at);
        }
        self.ledger.truncate(store, at);
        if let (Some(range), Some(head)) = (range, head) {
            self.ledger.mark_window(store, range, head);
        }

        self.lock.release();
    }

    /// Releases the window and forgets all offsets; `splice` empties the store.
    pub fn clear<S, H, R>(&mut self, store: &mut S, host: &mut H, splice: impl FnOnce(&mut S) -> R) -> R
    where
        S: SlotStore,
        H: ItemHost<S::Item>,
    {
        self.lock.acquire();
        self.window.release_all(store, host);
        self.ledger.reset(store);
        let result = splice(store);
        self.lock.release();
        result
    }
}

//! Window manager: decides which items are materialized for a viewport.
//!
//! Given a scroll offset and a viewport extent, the window manager finds the
//! minimal contiguous range `[first_shown, last_shown]` whose cumulative height
//! spans `[offset, offset + extent)`:
//! - offsets inside the precise prefix are located by binary search
//! - offsets past it are reached by walking forward from the boundary,
//!   measuring on demand and growing the precise prefix
//! - the new range is diffed against the previous one, releasing leavers and
//!   materializing entrants through the [`ItemHost`]

use crate::host::ItemHost;
use crate::ledger::OffsetLedger;
use crate::slot::{Extent, HeightState, OffsetState, SlotStore};
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

/// Scroll position and visible extent along the scroll axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Viewport {
    pub offset: Extent,
    pub extent: Extent,
}

impl Viewport {
    pub fn new(offset: Extent, extent: Extent) -> Self {
        Self { offset, extent }
    }

    /// First distance past the viewport.
    pub fn bottom(&self) -> Extent {
        self.offset.saturating_add(self.extent)
    }
}

/// Items that entered or left the window during one operation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WindowDelta {
    /// Window after the operation.
    pub range: Option<(usize, usize)>,
    /// Positions (after the operation) that were materialized.
    pub entered: Vec<usize>,
    /// Positions (before the operation) that were released.
    pub released: Vec<usize>,
}

impl WindowDelta {
    /// True when nothing was materialized or released.
    pub fn is_quiet(&self) -> bool {
        self.entered.is_empty() && self.released.is_empty()
    }
}

/// Owns the materialized range and the last viewport it was computed for.
#[derive(Debug, Clone)]
pub struct WindowManager {
    range: Option<(usize, usize)>,
    width: Extent,
    viewport: Viewport,
    overscan: usize,
}

impl WindowManager {
    pub fn new(overscan: usize) -> Self {
        Self {
            range: None,
            width: 0,
            viewport: Viewport::default(),
            overscan,
        }
    }

    // ===== Queries =====

    /// Current window as `(first_shown, last_shown)`.
    pub fn range(&self) -> Option<(usize, usize)> {
        self.range
    }

    pub fn contains(&self, at: usize) -> bool {
        matches!(self.range, Some((first, last)) if first <= at && at <= last)
    }

    pub fn width(&self) -> Extent {
        self.width
    }

    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    pub fn overscan(&self) -> usize {
        self.overscan
    }

    // ===== Mutation-protocol hooks =====

    pub(crate) fn set_range(&mut self, range: Option<(usize, usize)>) {
        self.range = range;
    }

    // ===== Measurement =====

    /// Measures the item at `at` unless a height is memoized.
    pub(crate) fn ensure_measured<S, H>(&self, store: &mut S, host: &mut H, at: usize) -> Extent
    where
        S: SlotStore,
        H: ItemHost<S::Item>,
    {
        if let HeightState::Measured(h) = store.slot(at).height {
            return h;
        }
        let h = host.measure(store.item(at), self.width);
        trace!(position = at, height = h, "measured item");
        store.slot_mut(at).height = HeightState::Measured(h);
        h
    }

    /// Makes every item below `to` precise, measuring as needed.
    pub(crate) fn ensure_precise<S, H>(
        &self,
        ledger: &mut OffsetLedger,
        store: &mut S,
        host: &mut H,
        to: usize,
    ) where
        S: SlotStore,
        H: ItemHost<S::Item>,
    {
        let to = to.min(store.len());
        for i in ledger.next_precise()..to {
            self.ensure_measured(store, host, i);
        }
        ledger.extend_precise(store, to);
    }

    /// Releases `[from, to]` without touching the stored range.
    pub(crate) fn release_span<S, H>(store: &mut S, host: &mut H, from: usize, to: usize) -> Vec<usize>
    where
        S: SlotStore,
        H: ItemHost<S::Item>,
    {
        let mut released = Vec::new();
        for i in from..=to {
            if !store.slot(i).materialized {
                continue;
            }
            host.release(store.item(i));
            let slot = store.slot_mut(i);
            slot.materialized = false;
            if slot.offset.is_estimated() {
                slot.offset = OffsetState::Unknown;
            }
            released.push(i);
        }
        released
    }

    /// Releases the whole window and clears it.
    pub fn release_all<S, H>(&mut self, store: &mut S, host: &mut H) -> Vec<usize>
    where
        S: SlotStore,
        H: ItemHost<S::Item>,
    {
        match self.range.take() {
            Some((first, last)) => Self::release_span(store, host, first, last),
            None => Vec::new(),
        }
    }

    // ===== Window computation =====

    /// Recomputes the window for `viewport`.
    ///
    /// A viewport past the end of the content is clamped so that it shows the
    /// last screenful; the clamped offset is remembered.
    pub fn update<S, H>(
        &mut self,
        ledger: &mut OffsetLedger,
        store: &mut S,
        host: &mut H,
        viewport: Viewport,
    ) -> WindowDelta
    where
        S: SlotStore,
        H: ItemHost<S::Item>,
    {
        self.viewport = viewport;
        let len = store.len();
        if len == 0 || viewport.extent == 0 {
            return self.apply(ledger, store, host, None);
        }

        let start = match self.locate(ledger, store, host, viewport.offset) {
            Some(start) => start,
            None => {
                let clamped = ledger.precise_extent().saturating_sub(viewport.extent);
                debug!(requested = viewport.offset, clamped, "viewport past content end");
                self.viewport.offset = clamped;
                match ledger.find_precise(store, clamped) {
                    Some(start) => start,
                    None => return self.apply(ledger, store, host, None),
                }
            }
        };

        let mut start = start;
        let mut last = start;
        while last + 1 < len && store.slot(last).end().unwrap_or(0) < self.viewport.bottom() {
            last += 1;
            self.ensure_precise(ledger, store, host, last + 1);
        }

        // Content ends inside the viewport: show the last screenful instead.
        if last + 1 == len && store.slot(last).end().unwrap_or(0) < self.viewport.bottom() {
            let clamped = ledger.precise_extent().saturating_sub(viewport.extent);
            if clamped < self.viewport.offset {
                self.viewport.offset = clamped;
                start = ledger.find_precise(store, clamped).unwrap_or(start);
            }
        }

        let first = start.saturating_sub(self.overscan);
        let last = last.saturating_add(self.overscan).min(len - 1);
        self.ensure_precise(ledger, store, host, last + 1);

        self.apply(ledger, store, host, Some((first, last)))
    }

    /// Finds the first item whose end exceeds `offset`, growing the precise
    /// prefix as far as needed. `None` when the content ends before `offset`.
    fn locate<S, H>(
        &self,
        ledger: &mut OffsetLedger,
        store: &mut S,
        host: &mut H,
        offset: Extent,
    ) -> Option<usize>
    where
        S: SlotStore,
        H: ItemHost<S::Item>,
    {
        if let Some(found) = ledger.find_precise(store, offset) {
            return Some(found);
        }
        while ledger.next_precise() < store.len() {
            let at = ledger.next_precise();
            self.ensure_measured(store, host, at);
            ledger.extend_precise(store, at + 1);
            if ledger.precise_extent() > offset {
                return Some(at);
            }
        }
        None
    }

    /// Moves the window to `new_range`, releasing and materializing the difference.
    fn apply<S, H>(
        &mut self,
        ledger: &mut OffsetLedger,
        store: &mut S,
        host: &mut H,
        new_range: Option<(usize, usize)>,
    ) -> WindowDelta
    where
        S: SlotStore,
        H: ItemHost<S::Item>,
    {
        let inside = |range: Option<(usize, usize)>, at: usize| {
            matches!(range, Some((first, last)) if first <= at && at <= last)
        };

        let mut released = Vec::new();
        if let Some((first, last)) = self.range {
            for i in first..=last {
                if !inside(new_range, i) {
                    released.extend(Self::release_span(store, host, i, i));
                }
            }
        }

        let mut entered = Vec::new();
        if let Some((first, last)) = new_range {
            for i in first..=last {
                if !store.slot(i).materialized {
                    self.ensure_measured(store, host, i);
                    host.materialize(store.item(i));
                    store.slot_mut(i).materialized = true;
                    entered.push(i);
                }
            }
            let head = store.slot(first).offset.value().unwrap_or(ledger.precise_extent());
            ledger.mark_window(store, (first, last), head);
        }

        if !entered.is_empty() || !released.is_empty() {
            debug!(
                range = ?new_range,
                entered = entered.len(),
                released = released.len(),
                "window moved"
            );
        }
        self.range = new_range;
        WindowDelta {
            range: new_range,
            entered,
            released,
        }
    }

    /// Changes the cross-axis width.
    ///
    /// This is the expensive path: every memoized height and offset in the
    /// store is dropped (O(N)) and the window is rebuilt from scratch for the
    /// last viewport.
    pub fn set_width<S, H>(
        &mut self,
        ledger: &mut OffsetLedger,
        store: &mut S,
        host: &mut H,
        width: Extent,
    ) -> WindowDelta
    where
        S: SlotStore,
        H: ItemHost<S::Item>,
    {
        if width == self.width {
            return self.update(ledger, store, host, self.viewport);
        }
        debug!(old = self.width, new = width, items = store.len(), "width changed, resetting layout");
        let released = self.release_all(store, host);
        for i in 0..store.len() {
            store.slot_mut(i).reset();
        }
        ledger.reset(store);
        self.width = width;

        let mut delta = self.update(ledger, store, host, self.viewport);
        delta.released = released;
        delta
    }
}

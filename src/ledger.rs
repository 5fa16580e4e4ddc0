//! Sparse cumulative-offset bookkeeping.
//!
//! The ledger tracks the boundary `next_precise`: every item below it has an
//! exact ([`OffsetState::Precise`]) offset equal to the sum of the heights
//! before it. Above the boundary offsets are unknown, except inside the
//! materialized window where [`OffsetLedger::mark_window`] assigns
//! provisional ([`OffsetState::Estimated`]) values chained from a known
//! anchor.

use crate::slot::{Extent, OffsetState, SlotStore};
use tracing::trace;

/// Precise-prefix boundary plus the extent it covers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OffsetLedger {
    next_precise: usize,
    precise_extent: Extent,
    fallback_height: Extent,
}

impl OffsetLedger {
    /// Creates an empty ledger.
    ///
    /// # Arguments
    /// * `fallback_height` - Height assumed for unmeasured items while no item is precise
    pub fn new(fallback_height: Extent) -> Self {
        Self {
            next_precise: 0,
            precise_extent: 0,
            fallback_height,
        }
    }

    // ===== Queries =====

    /// First position whose offset is not known exactly.
    pub fn next_precise(&self) -> usize {
        self.next_precise
    }

    /// Sum of the heights of all precise items.
    pub fn precise_extent(&self) -> Extent {
        self.precise_extent
    }

    pub fn fallback_height(&self) -> Extent {
        self.fallback_height
    }

    /// Average height of the precise prefix, used for every estimate.
    pub fn average_height(&self) -> Extent {
        if self.next_precise == 0 {
            self.fallback_height
        } else {
            self.precise_extent / self.next_precise as Extent
        }
    }

    /// Estimated extent of `count` items that were never measured.
    pub fn estimate(&self, count: usize) -> Extent {
        self.average_height() * count as Extent
    }

    // ===== Precise prefix =====

    /// Grows the precise prefix up to (not including) `to`.
    ///
    /// Returns `false` and changes nothing when any crossed item is unmeasured.
    pub fn extend_precise<S: SlotStore>(&mut self, store: &mut S, to: usize) -> bool {
        let to = to.min(store.len());
        if to <= self.next_precise {
            return true;
        }
        if (self.next_precise..to).any(|i| !store.slot(i).height.is_measured()) {
            return false;
        }

        let mut distance = self.precise_extent;
        for i in self.next_precise..to {
            let slot = store.slot_mut(i);
            slot.offset = OffsetState::Precise(distance);
            distance += slot.height.value().unwrap_or(0);
        }
        trace!(from = self.next_precise, to, extent = distance, "extended precise prefix");
        self.next_precise = to;
        self.precise_extent = distance;
        true
    }

    /// Pulls the boundary back to `to`; offsets in `[to, old boundary)` become unknown.
    pub fn truncate<S: SlotStore>(&mut self, store: &mut S, to: usize) {
        if to >= self.next_precise {
            return;
        }
        for i in to..self.next_precise.min(store.len()) {
            store.slot_mut(i).offset = OffsetState::Unknown;
        }
        self.next_precise = to;
        self.precise_extent = if to == 0 {
            0
        } else {
            store.slot(to - 1).end().unwrap_or(0)
        };
    }

    /// Forgets every precise offset.
    pub fn reset<S: SlotStore>(&mut self, store: &mut S) {
        self.truncate(store, 0);
        self.next_precise = 0;
        self.precise_extent = 0;
    }

    /// Binary search for the precise item covering `distance`.
    ///
    /// # Returns
    /// The first position below `next_precise` whose end exceeds `distance`,
    /// or `None` when `distance` lies at or past the precise extent.
    pub fn find_precise<S: SlotStore>(&self, store: &S, distance: Extent) -> Option<usize> {
        if distance >= self.precise_extent {
            return None;
        }
        let (mut lo, mut hi) = (0, self.next_precise);
        while lo < hi {
            let mid = lo + (hi - lo) / 2;
            if store.slot(mid).end().unwrap_or(0) <= distance {
                lo = mid + 1;
            } else {
                hi = mid;
            }
        }
        (lo < self.next_precise).then_some(lo)
    }

    // ===== Window tagging =====

    /// Assigns offsets to the window items at or past the boundary.
    ///
    /// The first such item chains from the precise extent when it sits on the
    /// boundary, from its predecessor when that is inside the window, and from
    /// `head` otherwise. Items below the boundary are left untouched.
    pub fn mark_window<S: SlotStore>(&self, store: &mut S, range: (usize, usize), head: Extent) {
        let (first, last) = range;
        for i in first.max(self.next_precise)..=last {
            let value = if i == self.next_precise {
                self.precise_extent
            } else if i > first {
                store.slot(i - 1).end().unwrap_or(head)
            } else {
                head
            };
            store.slot_mut(i).offset = OffsetState::Estimated(value);
        }
    }

    // ===== Structural shifts =====

    /// Applies an insertion of `count` items at `at` (already spliced in).
    pub fn shift_on_insert<S: SlotStore>(&mut self, store: &mut S, at: usize, count: usize) {
        if at >= self.next_precise {
            return;
        }
        let old_end = (self.next_precise + count).min(store.len());
        for i in at..old_end {
            store.slot_mut(i).offset = OffsetState::Unknown;
        }
        self.next_precise = at;
        self.precise_extent = if at == 0 {
            0
        } else {
            store.slot(at - 1).end().unwrap_or(0)
        };
    }

    /// Applies an erase of `count` items at `at` (already spliced out).
    ///
    /// `removed_extent` must be exact when the whole erased range was precise;
    /// the surviving precise items are then shifted down and stay precise.
    pub fn shift_on_erase<S: SlotStore>(
        &mut self,
        store: &mut S,
        at: usize,
        count: usize,
        removed_extent: Extent,
    ) {
        if at >= self.next_precise {
            return;
        }
        if at + count <= self.next_precise {
            let new_boundary = self.next_precise - count;
            for i in at..new_boundary {
                let slot = store.slot_mut(i);
                if let OffsetState::Precise(d) = slot.offset {
                    slot.offset = OffsetState::Precise(d.saturating_sub(removed_extent));
                }
            }
            self.next_precise = new_boundary;
            self.precise_extent = self.precise_extent.saturating_sub(removed_extent);
        } else {
            self.next_precise = at;
            self.precise_extent = if at == 0 {
                0
            } else {
                store.slot(at - 1).end().unwrap_or(0)
            };
        }
    }

    // ===== Totals =====

    /// Best-known total extent of the sequence.
    ///
    /// Exact once the whole sequence is precise; otherwise the furthest known
    /// end (precise prefix or estimated window) plus the average height for
    /// each remaining item.
    pub fn total_extent<S: SlotStore>(&self, store: &S, window: Option<(usize, usize)>) -> Extent {
        let len = store.len();
        if self.next_precise >= len {
            return self.precise_extent;
        }
        let (known_end, known_count) = match window {
            Some((_, last)) if last >= self.next_precise => {
                (store.slot(last).end().unwrap_or(self.precise_extent), last + 1)
            }
            _ => (self.precise_extent, self.next_precise),
        };
        known_end + self.estimate(len - known_count)
    }
}

//! Per-item bookkeeping shared by the list and tree containers.
//!
//! Every item the engine manages carries a [`Slot`]:
//! - a height state (memoized measurement for the current width)
//! - an offset state (exact, provisional, or unknown cumulative extent)
//! - whether the item currently holds external resources
//! - whether it is the selected item
//!
//! Containers expose their items through [`SlotStore`] so the ledger, window
//! manager and mutation protocol are written once for both variants.

use serde::{Deserialize, Serialize};

/// Extent along the scroll axis (pixels, rows, or any caller unit).
pub type Extent = u64;

/// Memoized measurement of an item for the current width.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum HeightState {
    #[default]
    Unmeasured,
    Measured(Extent),
}

impl HeightState {
    /// Returns the measured height, if any.
    pub fn value(&self) -> Option<Extent> {
        match self {
            HeightState::Unmeasured => None,
            HeightState::Measured(h) => Some(*h),
        }
    }

    pub fn is_measured(&self) -> bool {
        matches!(self, HeightState::Measured(_))
    }
}

/// Cumulative extent of all items before this one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum OffsetState {
    #[default]
    Unknown,
    /// Exact prefix sum, valid below `next_precise`.
    Precise(Extent),
    /// Provisional value, only inside the materialized window.
    Estimated(Extent),
}

impl OffsetState {
    /// Returns the offset value regardless of its precision.
    pub fn value(&self) -> Option<Extent> {
        match self {
            OffsetState::Unknown => None,
            OffsetState::Precise(d) | OffsetState::Estimated(d) => Some(*d),
        }
    }

    pub fn is_precise(&self) -> bool {
        matches!(self, OffsetState::Precise(_))
    }

    pub fn is_estimated(&self) -> bool {
        matches!(self, OffsetState::Estimated(_))
    }
}

/// Engine-owned state attached to each item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Slot {
    pub height: HeightState,
    pub offset: OffsetState,
    pub materialized: bool,
    pub selected: bool,
}

impl Slot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Forgets measurement and offset. Selection is kept.
    pub fn reset(&mut self) {
        self.height = HeightState::Unmeasured;
        self.offset = OffsetState::Unknown;
        self.materialized = false;
    }

    /// End of the item (offset + height) when both are known.
    pub fn end(&self) -> Option<Extent> {
        Some(self.offset.value()? + self.height.value()?)
    }
}

/// Ordered storage the engine operates on.
///
/// Positions are contiguous in `0..len()`. Implementations must not reorder
/// or resize themselves outside the engine's mutation entry points.
pub trait SlotStore {
    type Item;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn item(&self, at: usize) -> &Self::Item;

    fn slot(&self, at: usize) -> &Slot;

    fn slot_mut(&mut self, at: usize) -> &mut Slot;
}

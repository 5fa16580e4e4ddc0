//! Invariant checker used by tests, script replay and debug assertions.

use crate::ledger::OffsetLedger;
use crate::slot::{Extent, OffsetState, SlotStore};
use thiserror::Error;

/// A broken bookkeeping invariant.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InvariantViolation {
    #[error("window {first}..={last} out of bounds for {len} items")]
    WindowOutOfBounds { first: usize, last: usize, len: usize },

    #[error("precise boundary {next_precise} past the end of {len} items")]
    BoundaryOutOfBounds { next_precise: usize, len: usize },

    #[error("item {position} below the precise boundary is unmeasured")]
    PreciseUnmeasured { position: usize },

    #[error("item {position} has offset {found:?}, expected Precise({expected})")]
    PrefixMismatch {
        position: usize,
        expected: Extent,
        found: OffsetState,
    },

    #[error("precise extent {found} differs from the prefix sum {expected}")]
    PreciseExtentMismatch { expected: Extent, found: Extent },

    #[error("window item {position} is unmeasured")]
    WindowUnmeasured { position: usize },

    #[error("window item {position} past the precise boundary has offset {found:?}")]
    WindowOffsetUntagged { position: usize, found: OffsetState },

    #[error("window offsets break at item {position}: expected {expected}, found {found}")]
    WindowDiscontinuous {
        position: usize,
        expected: Extent,
        found: Extent,
    },

    #[error("item {position} has materialized={materialized} but window membership is {in_window}")]
    MaterializedMismatch {
        position: usize,
        materialized: bool,
        in_window: bool,
    },

    #[error("item {position} outside the window past the boundary has offset {found:?}")]
    StrayOffset { position: usize, found: OffsetState },

    #[error("{count} items are selected")]
    MultipleSelection { count: usize },

    #[error("lookup entry {position} does not match the fold-aware traversal")]
    LookupMismatch { position: usize },

    #[error("lookup holds {found} entries, traversal yields {expected}")]
    LookupLength { expected: usize, found: usize },

    #[error("hidden node {node} still carries layout state")]
    HiddenBookkeeping { node: usize },
}

/// Checks every ledger/window invariant over `store`.
///
/// O(N); meant for tests and replay, not for the layout pass.
pub fn validate_store<S: SlotStore>(
    store: &S,
    ledger: &OffsetLedger,
    window: Option<(usize, usize)>,
) -> Result<(), InvariantViolation> {
    let len = store.len();
    let next_precise = ledger.next_precise();

    if next_precise > len {
        return Err(InvariantViolation::BoundaryOutOfBounds { next_precise, len });
    }
    if let Some((first, last)) = window {
        if first > last || last >= len {
            return Err(InvariantViolation::WindowOutOfBounds { first, last, len });
        }
    }
    let in_window = |at: usize| matches!(window, Some((first, last)) if first <= at && at <= last);

    // Precise prefix
    let mut distance: Extent = 0;
    for position in 0..next_precise {
        let slot = store.slot(position);
        if slot.offset != OffsetState::Precise(distance) {
            return Err(InvariantViolation::PrefixMismatch {
                position,
                expected: distance,
                found: slot.offset,
            });
        }
        match slot.height.value() {
            Some(h) => distance += h,
            None => return Err(InvariantViolation::PreciseUnmeasured { position }),
        }
    }
    if distance != ledger.precise_extent() {
        return Err(InvariantViolation::PreciseExtentMismatch {
            expected: distance,
            found: ledger.precise_extent(),
        });
    }

    // Window and everything past the boundary
    for position in 0..len {
        let slot = store.slot(position);
        let inside = in_window(position);
        if slot.materialized != inside {
            return Err(InvariantViolation::MaterializedMismatch {
                position,
                materialized: slot.materialized,
                in_window: inside,
            });
        }
        if inside {
            if !slot.height.is_measured() {
                return Err(InvariantViolation::WindowUnmeasured { position });
            }
            if position >= next_precise && !slot.offset.is_estimated() {
                return Err(InvariantViolation::WindowOffsetUntagged {
                    position,
                    found: slot.offset,
                });
            }
        } else if position >= next_precise && slot.offset != OffsetState::Unknown {
            return Err(InvariantViolation::StrayOffset {
                position,
                found: slot.offset,
            });
        }
    }

    if let Some((first, last)) = window {
        for position in first + 1..=last {
            let expected = store.slot(position - 1).end().unwrap_or(0);
            let found = store.slot(position).offset.value().unwrap_or(0);
            if expected != found {
                return Err(InvariantViolation::WindowDiscontinuous {
                    position,
                    expected,
                    found,
                });
            }
        }
    }

    let count = (0..len).filter(|&i| store.slot(i).selected).count();
    if count > 1 {
        return Err(InvariantViolation::MultipleSelection { count });
    }
    Ok(())
}

//! Capabilities the engine consumes from its collaborators.
//!
//! The engine never draws anything. It asks an [`ItemHost`] to measure an
//! item for a width, and tells it when an item enters (materialize) or leaves
//! (release) the window.

use crate::slot::Extent;
use serde::Serialize;

/// External measure/materialize/release capability.
pub trait ItemHost<T> {
    /// Measures `item` for the given cross-axis width.
    ///
    /// Called at most once per item per width; the engine memoizes the result.
    fn measure(&mut self, item: &T, width: Extent) -> Extent;

    /// Acquires resources for an item entering the window.
    fn materialize(&mut self, _item: &T) {}

    /// Frees resources of an item leaving the window.
    fn release(&mut self, _item: &T) {}

    /// Whether the item may become the selection.
    fn selectable(&self, _item: &T) -> bool {
        true
    }
}

/// Payloads that know their own extent.
pub trait Measurable {
    fn extent_at(&self, width: Extent) -> Extent;
}

impl Measurable for Extent {
    fn extent_at(&self, _width: Extent) -> Extent {
        *self
    }
}

/// Host for [`Measurable`] payloads with no external resources.
#[derive(Debug, Default, Clone, Copy)]
pub struct MeasureHost;

impl<T: Measurable> ItemHost<T> for MeasureHost {
    fn measure(&mut self, item: &T, width: Extent) -> Extent {
        item.extent_at(width)
    }
}

/// Host built from a measuring closure and an optional selectability predicate.
pub struct FnHost<F, S = AllSelectable> {
    measure: F,
    selectable: S,
}

/// Predicate deciding whether an item may be selected.
pub trait Selectable<T> {
    fn selectable(&self, item: &T) -> bool;
}

/// Every item is selectable.
#[derive(Debug, Default, Clone, Copy)]
pub struct AllSelectable;

impl<T> Selectable<T> for AllSelectable {
    fn selectable(&self, _item: &T) -> bool {
        true
    }
}

impl<T, P> Selectable<T> for P
where
    P: Fn(&T) -> bool,
{
    fn selectable(&self, item: &T) -> bool {
        self(item)
    }
}

impl<F> FnHost<F> {
    pub fn new(measure: F) -> Self {
        Self {
            measure,
            selectable: AllSelectable,
        }
    }
}

impl<F, S> FnHost<F, S> {
    /// Replaces the selectability predicate.
    pub fn with_selectable<P>(self, selectable: P) -> FnHost<F, P> {
        FnHost {
            measure: self.measure,
            selectable,
        }
    }
}

impl<T, F, S> ItemHost<T> for FnHost<F, S>
where
    F: FnMut(&T, Extent) -> Extent,
    S: Selectable<T>,
{
    fn measure(&mut self, item: &T, width: Extent) -> Extent {
        (self.measure)(item, width)
    }

    fn selectable(&self, item: &T) -> bool {
        self.selectable.selectable(item)
    }
}

/// Call counters collected by [`RecordingHost`].
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct HostStats {
    pub measured: usize,
    pub materialized: usize,
    pub released: usize,
    /// Items currently holding resources.
    pub live: usize,
}

/// Wraps another host and counts every call made to it.
#[derive(Debug, Default, Clone)]
pub struct RecordingHost<H> {
    inner: H,
    stats: HostStats,
}

impl RecordingHost<MeasureHost> {
    /// Recording host for [`Measurable`] payloads.
    pub fn measurable() -> Self {
        Self::new(MeasureHost)
    }
}

impl<H> RecordingHost<H> {
    pub fn new(inner: H) -> Self {
        Self {
            inner,
            stats: HostStats::default(),
        }
    }

    pub fn stats(&self) -> HostStats {
        self.stats
    }

    /// Clears call counters. The live count is kept.
    pub fn reset_counters(&mut self) {
        self.stats = HostStats {
            live: self.stats.live,
            ..HostStats::default()
        };
    }

    pub fn inner(&self) -> &H {
        &self.inner
    }

    pub fn inner_mut(&mut self) -> &mut H {
        &mut self.inner
    }
}

impl<T, H: ItemHost<T>> ItemHost<T> for RecordingHost<H> {
    fn measure(&mut self, item: &T, width: Extent) -> Extent {
        self.stats.measured += 1;
        self.inner.measure(item, width)
    }

    fn materialize(&mut self, item: &T) {
        self.stats.materialized += 1;
        self.stats.live += 1;
        self.inner.materialize(item);
    }

    fn release(&mut self, item: &T) {
        self.stats.released += 1;
        self.stats.live = self.stats.live.saturating_sub(1);
        self.inner.release(item);
    }

    fn selectable(&self, item: &T) -> bool {
        self.inner.selectable(item)
    }
}

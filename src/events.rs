//! Notifications queued by the containers.
//!
//! Nothing is called back during a mutation. Each container appends events to
//! an [`EventQueue`] and the caller drains it once the call has returned, so
//! reacting to an event (for example reselecting after an erase) can never
//! re-enter a mutation that is still running.

use crate::tree::NodeId;

/// Event emitted by a [`VirtualList`](crate::list::VirtualList).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListEvent {
    /// Positions are as of the moment the event was queued.
    SelectionChanged {
        previous: Option<usize>,
        current: Option<usize>,
    },
}

/// Event emitted by a [`VirtualTree`](crate::tree::VirtualTree).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TreeEvent {
    SelectionChanged {
        previous: Option<NodeId>,
        current: Option<NodeId>,
    },
    FoldChanged { node: NodeId, folded: bool },
}

/// FIFO of pending events.
#[derive(Debug, Clone)]
pub struct EventQueue<E> {
    pending: Vec<E>,
}

impl<E> Default for EventQueue<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E> EventQueue<E> {
    pub fn new() -> Self {
        Self { pending: Vec::new() }
    }

    pub fn push(&mut self, event: E) {
        self.pending.push(event);
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Takes every pending event in emission order.
    pub fn drain(&mut self) -> Vec<E> {
        std::mem::take(&mut self.pending)
    }
}

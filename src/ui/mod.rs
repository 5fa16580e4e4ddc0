//! UI panel rendering
//!
//! - Header panel (script loading, demo, sorting, panel switch)
//! - List panel and tree panel (windowed rows)
//! - Status bar (memory, window and host counters, event log)
//! - Panel manager (panel orchestration and layout)

pub mod header;
pub mod list_panel;
pub mod tree_panel;
pub mod status_bar;
pub mod panel_manager;

//! Centralized application state for the viewer.

use rvlist::{EngineConfig, Extent, MeasureHost, RecordingHost, VirtualList, VirtualTree};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Host used by both panels: payloads are row heights in pixels.
pub type RowHost = RecordingHost<MeasureHost>;

/// Which container the central panel shows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum PanelMode {
    #[default]
    List,
    Tree,
}

/// Maximum number of event lines kept for the status bar.
const EVENT_LOG_LEN: usize = 8;

pub struct AppState {
    pub list: VirtualList<Extent, RowHost>,
    pub tree: VirtualTree<Extent, RowHost>,
    pub mode: PanelMode,
    pub config: EngineConfig,

    /// Scroll offsets from the previous frame
    pub list_scroll: f32,
    pub tree_scroll: f32,

    /// Script currently shown, `None` for a generated demo
    pub source: Option<PathBuf>,
    /// Seed of the generated demo
    pub seed: Option<u64>,
    /// Most recent container events, newest last
    pub event_log: Vec<String>,
    pub error_message: Option<String>,
}

impl AppState {
    pub fn new(config: EngineConfig, mode: PanelMode) -> Self {
        Self {
            list: VirtualList::with_config(RecordingHost::measurable(), &config),
            tree: VirtualTree::with_config(RecordingHost::measurable(), &config),
            mode,
            config,
            list_scroll: 0.0,
            tree_scroll: 0.0,
            source: None,
            seed: None,
            event_log: Vec::new(),
            error_message: None,
        }
    }

    /// Replaces both containers with empty ones.
    pub fn reset_containers(&mut self) {
        self.list = VirtualList::with_config(RecordingHost::measurable(), &self.config);
        self.tree = VirtualTree::with_config(RecordingHost::measurable(), &self.config);
        self.list_scroll = 0.0;
        self.tree_scroll = 0.0;
        self.source = None;
        self.seed = None;
        self.event_log.clear();
        self.error_message = None;
    }

    pub fn log_event(&mut self, line: String) {
        self.event_log.push(line);
        if self.event_log.len() > EVENT_LOG_LEN {
            self.event_log.remove(0);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_log_is_bounded() {
        let mut state = AppState::new(EngineConfig::default(), PanelMode::List);
        for i in 0..20 {
            state.log_event(format!("event {i}"));
        }
        assert_eq!(state.event_log.len(), EVENT_LOG_LEN);
        assert_eq!(state.event_log.last().map(String::as_str), Some("event 19"));
    }

    #[test]
    fn test_reset_drops_content() {
        let mut state = AppState::new(EngineConfig::default(), PanelMode::Tree);
        state.list.push(20);
        state.tree.push_node(None, 20, false);
        state.error_message = Some("boom".into());

        state.reset_containers();
        assert!(state.list.is_empty());
        assert!(state.tree.is_empty());
        assert_eq!(state.error_message, None);
        assert_eq!(state.mode, PanelMode::Tree);
    }
}

//! Interactive viewer for the virtualized list and tree.
//!
//! The viewer drives a [`rvlist::VirtualList`] and a [`rvlist::VirtualTree`]
//! from an egui scroll area: only the rows in the engine's window are laid
//! out, the rest of the content is represented by padding computed from the
//! offset ledger. Operation scripts can be loaded and replayed into the
//! panels.
//!
//! - `app/` - Application state and coordination
//! - `ui/` - Panel rendering and interaction

#![cfg_attr(not(debug_assertions), windows_subsystem = "windows")]

use eframe::egui;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

mod app;
mod ui;

use app::{AppState, ApplicationCoordinator, PanelMode, SettingsCoordinator};
use ui::panel_manager::{PanelInteraction, PanelManager};

const PANEL_MODE_KEY: &str = "panel_mode";

fn main() -> eframe::Result {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    // Optional script to replay on the first frame
    let initial_script = std::env::args().nth(1).map(PathBuf::from);

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([900.0, 800.0])
            .with_title("rvlist viewer"),
        ..Default::default()
    };

    eframe::run_native(
        "rvlist viewer",
        options,
        Box::new(move |cc| Ok(Box::new(ViewerApp::new(cc, initial_script)))),
    )
}

struct ViewerApp {
    state: AppState,
    /// Script to load on the first frame
    pending_script: Option<PathBuf>,
}

impl ViewerApp {
    fn new(cc: &eframe::CreationContext, initial_script: Option<PathBuf>) -> Self {
        let mode: PanelMode = SettingsCoordinator::load_setting_or(cc.storage, PANEL_MODE_KEY, PanelMode::List);
        let mut state = AppState::new(rvlist::EngineConfig::load_or_default(), mode);
        if initial_script.is_none() {
            ApplicationCoordinator::open_demo(&mut state, 42);
        }
        Self {
            state,
            pending_script: initial_script,
        }
    }

    fn handle_panel_interaction(&mut self, interaction: PanelInteraction) {
        match interaction {
            PanelInteraction::LoadScriptRequested(path) => {
                ApplicationCoordinator::open_script(&mut self.state, &path);
            }
            PanelInteraction::DemoRequested => {
                ApplicationCoordinator::open_demo(&mut self.state, rand::random());
            }
            PanelInteraction::SortRequested { descending } => {
                ApplicationCoordinator::sort(&mut self.state, descending);
            }
            PanelInteraction::RowClicked(at) => {
                ApplicationCoordinator::select_row(&mut self.state, at);
            }
            PanelInteraction::SelectionStep { backward } => {
                ApplicationCoordinator::step_selection(&mut self.state, backward);
            }
            PanelInteraction::NodeClicked(id) => {
                ApplicationCoordinator::select_node(&mut self.state, id);
            }
            PanelInteraction::NodeFoldToggled(id) => {
                ApplicationCoordinator::toggle_node(&mut self.state, id);
            }
        }
    }
}

impl eframe::App for ViewerApp {
    fn save(&mut self, storage: &mut dyn eframe::Storage) {
        SettingsCoordinator::save_setting(storage, PANEL_MODE_KEY, &self.state.mode);
    }

    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        if let Some(path) = self.pending_script.take() {
            ApplicationCoordinator::open_script(&mut self.state, &path);
        }

        if let Some(interaction) = PanelManager::render_all_panels(ctx, &mut self.state) {
            self.handle_panel_interaction(interaction);
        }
        ApplicationCoordinator::collect_events(&mut self.state);
    }
}

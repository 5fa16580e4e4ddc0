//! Panel orchestration and layout management.

use crate::app::{AppState, PanelMode};
use crate::ui::{header, list_panel, status_bar, tree_panel};
use rvlist::NodeId;

/// Result of panel interactions that need to be handled by the application coordinator.
pub enum PanelInteraction {
    LoadScriptRequested(std::path::PathBuf),
    DemoRequested,
    SortRequested { descending: bool },
    RowClicked(usize),
    SelectionStep { backward: bool },
    NodeClicked(NodeId),
    NodeFoldToggled(NodeId),
}

pub struct PanelManager;

impl PanelManager {
    /// Renders every panel, called from `eframe::App::update()`.
    pub fn render_all_panels(ctx: &egui::Context, state: &mut AppState) -> Option<PanelInteraction> {
        let mut interaction: Option<PanelInteraction> = None;

        egui::TopBottomPanel::top("header").show(ctx, |ui| {
            if let Some(header_interaction) = header::render_header(ui, state) {
                interaction = Some(match header_interaction {
                    header::HeaderInteraction::LoadScriptRequested(path) => {
                        PanelInteraction::LoadScriptRequested(path)
                    }
                    header::HeaderInteraction::DemoRequested => PanelInteraction::DemoRequested,
                    header::HeaderInteraction::SortRequested { descending } => {
                        PanelInteraction::SortRequested { descending }
                    }
                });
            }
        });

        egui::TopBottomPanel::bottom("status_panel").show(ctx, |ui| {
            status_bar::render_status_bar(ui, state);
        });

        let content_frame = egui::Frame::default()
            .inner_margin(egui::Margin::same(4))
            .fill(ctx.style().visuals.panel_fill);

        egui::CentralPanel::default()
            .frame(content_frame)
            .show(ctx, |ui| match state.mode {
                PanelMode::List => {
                    ui.heading("Rows");
                    ui.separator();
                    if let Some(list_interaction) = list_panel::render_list_panel(ui, state) {
                        interaction = Some(match list_interaction {
                            list_panel::ListPanelInteraction::RowClicked(at) => PanelInteraction::RowClicked(at),
                            list_panel::ListPanelInteraction::SelectionStep { backward } => {
                                PanelInteraction::SelectionStep { backward }
                            }
                        });
                    }
                }
                PanelMode::Tree => {
                    ui.heading("Nodes");
                    ui.separator();
                    if let Some(tree_interaction) = tree_panel::render_tree_panel(ui, state) {
                        interaction = Some(match tree_interaction {
                            tree_panel::TreePanelInteraction::NodeClicked(id) => PanelInteraction::NodeClicked(id),
                            tree_panel::TreePanelInteraction::NodeFoldToggled(id) => {
                                PanelInteraction::NodeFoldToggled(id)
                            }
                        });
                    }
                }
            });

        interaction
    }
}

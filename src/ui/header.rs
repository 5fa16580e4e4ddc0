//! Header panel UI rendering

use crate::app::{AppState, PanelMode};
use eframe::egui;
use egui::Color32;
use std::path::PathBuf;

/// Result of user interaction with the header panel
pub enum HeaderInteraction {
    LoadScriptRequested(PathBuf),
    DemoRequested,
    SortRequested { descending: bool },
}

pub fn render_header(ui: &mut egui::Ui, state: &mut AppState) -> Option<HeaderInteraction> {
    let mut interaction = None;

    ui.horizontal(|ui| {
        if ui.button("📁 Load Script").clicked() {
            let mut dialog = rfd::FileDialog::new()
                .add_filter("Operation Scripts", &["json", "br"]);

            if let Ok(cwd) = std::env::current_dir() {
                dialog = dialog.set_directory(cwd);
            }

            if let Some(path) = dialog.pick_file() {
                interaction = Some(HeaderInteraction::LoadScriptRequested(path));
            }
        }

        if ui.button("🔮 Random Demo").clicked() {
            interaction = Some(HeaderInteraction::DemoRequested);
        }

        ui.separator();

        ui.selectable_value(&mut state.mode, PanelMode::List, "List");
        ui.selectable_value(&mut state.mode, PanelMode::Tree, "Tree");

        ui.separator();

        if ui.button("Sort ⬆").clicked() {
            interaction = Some(HeaderInteraction::SortRequested { descending: false });
        }
        if ui.button("Sort ⬇").clicked() {
            interaction = Some(HeaderInteraction::SortRequested { descending: true });
        }

        ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
            match (&state.source, state.seed) {
                (Some(path), _) => ui.label(format!("Script: {}", path.display())),
                (None, Some(seed)) => ui.label(format!("Demo seed: {seed}")),
                (None, None) => ui.label("Empty"),
            };
        });
    });

    if let Some(err) = &state.error_message {
        ui.colored_label(Color32::RED, err);
    }

    interaction
}

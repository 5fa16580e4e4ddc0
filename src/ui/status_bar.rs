//! Status bar UI rendering
//!
//! Shows process memory, the active container's window and host counters, and
//! the most recent container event.

use crate::app::{AppState, PanelMode};
use eframe::egui;
use egui::RichText;
use rvlist::HostStats;
use sysinfo::{Pid, ProcessRefreshKind, RefreshKind, System};

/// Resident memory of this process in MB.
fn current_memory_mb() -> f64 {
    let mut sys = System::new_with_specifics(
        RefreshKind::new().with_processes(ProcessRefreshKind::new().with_memory())
    );
    sys.refresh_processes_specifics(ProcessRefreshKind::new().with_memory());

    sys.process(Pid::from_u32(std::process::id()))
        .map(|process| process.memory() as f64 / (1024.0 * 1024.0))
        .unwrap_or(0.0)
}

fn format_memory_mb(memory_mb: f64) -> String {
    if memory_mb > 1024.0 {
        format!("Memory: {:.2} GB", memory_mb / 1024.0)
    } else {
        format!("Memory: {:.1} MB", memory_mb)
    }
}

fn format_window(range: Option<(usize, usize)>) -> String {
    match range {
        Some((first, last)) => format!("Window: {first}..={last}"),
        None => "Window: empty".to_string(),
    }
}

fn format_stats(stats: HostStats) -> String {
    format!(
        "Measured: {} | Materialized: {} | Released: {} | Live: {}",
        stats.measured, stats.materialized, stats.released, stats.live
    )
}

pub fn render_status_bar(ui: &mut egui::Ui, state: &AppState) {
    ui.horizontal(|ui| {
        ui.label(RichText::new(format_memory_mb(current_memory_mb())).strong());
        ui.label(RichText::new("|").strong());

        let (items, range, next_precise, extent, stats) = match state.mode {
            PanelMode::List => (
                format!("Rows: {}", state.list.len()),
                state.list.visible_range(),
                state.list.next_precise(),
                state.list.total_extent(),
                state.list.host().stats(),
            ),
            PanelMode::Tree => (
                format!("Nodes: {} shown / {}", state.tree.shown_len(), state.tree.len()),
                state.tree.visible_range(),
                state.tree.next_precise(),
                state.tree.total_extent(),
                state.tree.host().stats(),
            ),
        };
        ui.label(RichText::new(format!(
            "{items} | {} | Precise: {next_precise} | Extent: {extent}px",
            format_window(range)
        )).strong());
        ui.label(RichText::new("|").strong());
        ui.label(format_stats(stats));

        if let Some(last) = state.event_log.last() {
            ui.label(RichText::new("|").strong());
            ui.label(RichText::new(last).color(egui::Color32::YELLOW))
                .on_hover_text(state.event_log.join("\n"));
        }
    });
}

//! List panel UI rendering
//!
//! Only the rows inside the engine's window are allocated; everything above
//! and below is padding taken from the offset ledger, so the scroll area has
//! the full content height without laying out every row.

use crate::app::AppState;
use eframe::egui;
use egui::{Align2, FontId, Rect, ScrollArea, Sense};
use rvlist::Extent;

pub enum ListPanelInteraction {
    RowClicked(usize),
    SelectionStep { backward: bool },
}

/// Paints one row background and label.
pub fn paint_row(ui: &egui::Ui, rect: Rect, indent: f32, selected: bool, hovered: bool, text: String) {
    let visuals = ui.visuals();
    if selected {
        ui.painter().rect_filled(rect, 0.0, visuals.selection.bg_fill);
    } else if hovered {
        ui.painter().rect_filled(rect, 0.0, visuals.faint_bg_color);
    }
    ui.painter()
        .line_segment([rect.left_bottom(), rect.right_bottom()], visuals.widgets.noninteractive.bg_stroke);
    ui.painter().text(
        rect.left_center() + egui::vec2(4.0 + indent, 0.0),
        Align2::LEFT_CENTER,
        text,
        FontId::monospace(12.0),
        visuals.text_color(),
    );
}

pub fn render_list_panel(ui: &mut egui::Ui, state: &mut AppState) -> Option<ListPanelInteraction> {
    if state.list.is_empty() {
        ui.label("No rows to display");
        return None;
    }

    let mut interaction = None;
    if ui.input(|i| i.key_pressed(egui::Key::ArrowDown)) {
        interaction = Some(ListPanelInteraction::SelectionStep { backward: false });
    } else if ui.input(|i| i.key_pressed(egui::Key::ArrowUp)) {
        interaction = Some(ListPanelInteraction::SelectionStep { backward: true });
    }

    let viewport_height = ui.available_height().max(0.0) as Extent;
    let width = ui.available_width().max(0.0) as Extent;
    if width != state.list.engine().window().width() {
        state.list.set_width(width);
    }
    state.list.set_viewport(state.list_scroll.max(0.0) as Extent, viewport_height);

    let scroll_area = ScrollArea::vertical()
        .id_salt("list_scroll_area")
        .auto_shrink([false, false])
        .show(ui, |ui| {
            let list = &state.list;
            let Some((first, last)) = list.visible_range() else {
                return;
            };

            let top_padding = list.offset_of(first).unwrap_or(0);
            if top_padding > 0 {
                ui.add_space(top_padding as f32);
            }

            let mut bottom = top_padding;
            for at in first..=last {
                let slot = list.slot(at);
                let height = slot.height.value().unwrap_or(0);
                bottom += height;

                let (rect, response) =
                    ui.allocate_exact_size(egui::vec2(ui.available_width(), height as f32), Sense::click());
                let text = format!("#{at:<6} height {height}");
                paint_row(ui, rect, 0.0, slot.selected, response.hovered(), text);
                if response.clicked() {
                    interaction = Some(ListPanelInteraction::RowClicked(at));
                }
            }

            let bottom_padding = list.total_extent().saturating_sub(bottom);
            if bottom_padding > 0 {
                ui.add_space(bottom_padding as f32);
            }
        });

    state.list_scroll = scroll_area.state.offset.y;
    interaction
}

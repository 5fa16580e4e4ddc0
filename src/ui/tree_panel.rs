//! Tree panel UI rendering
//!
//! Same windowing as the list panel, over the tree's shown nodes. Clicking
//! the fold marker folds or unfolds a branch.

use crate::app::AppState;
use crate::ui::list_panel::paint_row;
use eframe::egui;
use egui::{ScrollArea, Sense};
use rvlist::{Extent, NodeId};

/// Horizontal indent per depth level
const INDENT: f32 = 16.0;

pub enum TreePanelInteraction {
    NodeClicked(NodeId),
    NodeFoldToggled(NodeId),
}

pub fn render_tree_panel(ui: &mut egui::Ui, state: &mut AppState) -> Option<TreePanelInteraction> {
    if state.tree.is_empty() {
        ui.label("No nodes to display");
        return None;
    }

    let viewport_height = ui.available_height().max(0.0) as Extent;
    let width = ui.available_width().max(0.0) as Extent;
    if width != state.tree.engine().window().width() {
        state.tree.set_width(width);
    }
    state.tree.set_viewport(state.tree_scroll.max(0.0) as Extent, viewport_height);

    let mut interaction = None;
    let scroll_area = ScrollArea::vertical()
        .id_salt("tree_scroll_area")
        .auto_shrink([false, false])
        .show(ui, |ui| {
            let tree = &state.tree;
            let Some((first, last)) = tree.visible_range() else {
                return;
            };

            let top_padding = tree.offset_of(tree.shown()[first]).unwrap_or(0);
            if top_padding > 0 {
                ui.add_space(top_padding as f32);
            }

            let mut bottom = top_padding;
            for id in tree.shown()[first..=last].iter().copied() {
                let slot = tree.slot(id);
                let height = slot.height.value().unwrap_or(0);
                bottom += height;

                let (rect, response) =
                    ui.allocate_exact_size(egui::vec2(ui.available_width(), height as f32), Sense::click());
                let indent = tree.depth(id) as f32 * INDENT;
                let marker = match (tree.is_branch(id), tree.is_folded(id)) {
                    (false, _) => " ",
                    (true, true) => "▶",
                    (true, false) => "▼",
                };
                let text = format!("{marker} node {id}  height {height}");
                paint_row(ui, rect, indent, slot.selected, response.hovered(), text);

                if response.clicked() {
                    let on_marker = response
                        .interact_pointer_pos()
                        .is_some_and(|pos| pos.x < rect.left() + indent + INDENT + 4.0);
                    interaction = Some(if on_marker && tree.is_branch(id) {
                        TreePanelInteraction::NodeFoldToggled(id)
                    } else {
                        TreePanelInteraction::NodeClicked(id)
                    });
                }
            }

            let bottom_padding = tree.total_extent().saturating_sub(bottom);
            if bottom_padding > 0 {
                ui.add_space(bottom_padding as f32);
            }
        });

    state.tree_scroll = scroll_area.state.offset.y;
    interaction
}

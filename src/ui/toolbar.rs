// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Toolbar and tool selection UI.
//!
//! This module provides the toolbar interface for selecting the
//! annotation tool and launching SAM runs.

use crate::ui::scene::Tool;

/// Result of toolbar interaction.
pub enum ToolbarAction {
    None,
    RunSam,
}

/// Display the toolbar with tool selection buttons.
pub fn show(ui: &mut egui::Ui, current_tool: &mut Tool, sam_busy: bool) -> ToolbarAction {
    let mut action = ToolbarAction::None;

    ui.horizontal(|ui| {
        ui.spacing_mut().item_spacing.x = 8.0;

        ui.label("Tools:");

        ui.separator();

        // Selection tool
        if ui.selectable_label(*current_tool == Tool::Selection, "⬆ Select").clicked() {
            *current_tool = Tool::Selection;
        }

        // Anchor tool
        if ui.selectable_label(*current_tool == Tool::Anchor, "📌 Anchor").clicked() {
            *current_tool = Tool::Anchor;
        }

        // Box tool
        if ui.selectable_label(*current_tool == Tool::Box, "▭ Box").clicked() {
            *current_tool = Tool::Box;
        }

        ui.separator();

        if sam_busy {
            ui.add_enabled(false, egui::Button::new("⚙ Running..."));
            ui.spinner();
        } else if ui.button("▶ Run SAM").clicked() {
            action = ToolbarAction::RunSam;
        }

        ui.separator();

        // Tool description
        let tool_text = match current_tool {
            Tool::Selection => "Click to select and drag annotations, drag edges to resize boxes",
            Tool::Anchor => "Left-click for foreground, right-click for background anchors",
            Tool::Box => "Right-drag to draw a bounding box",
        };

        ui.label(egui::RichText::new(tool_text).italics().weak());
    });

    action
}

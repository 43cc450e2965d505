// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Project and annotation properties panel.
//!
//! This module provides the side panel listing the project's images
//! and, for the selected image, its anchors and boxes. Rows support
//! visibility toggling, deletion, and box label renaming; every
//! mutation is returned as a [`PropertiesAction`] for the app to apply
//! to the store.

use crate::models::project::ProjectStore;
use uuid::Uuid;

/// Result of properties panel interaction.
pub enum PropertiesAction {
    None,
    SelectImage(Uuid),
    DeleteItem(Uuid),
    SetAnchorActive { id: Uuid, active: bool },
    SetBoxActive { id: Uuid, active: bool },
    RenameBox { id: Uuid, name: String },
}

/// In-progress label edit, kept across frames until committed.
#[derive(Default)]
pub struct LabelEdit {
    pub target: Option<Uuid>,
    pub buffer: String,
}

/// Display the properties panel.
pub fn show(
    ui: &mut egui::Ui,
    store: &ProjectStore,
    selected_image: Option<Uuid>,
    label_edit: &mut LabelEdit,
) -> PropertiesAction {
    let mut action = PropertiesAction::None;

    ui.heading("Images");
    ui.separator();

    egui::ScrollArea::vertical()
        .id_source("image_list")
        .max_height(ui.available_height() * 0.4)
        .show(ui, |ui| {
            for entry in store.entries() {
                let is_selected = selected_image == Some(entry.id);
                ui.horizontal(|ui| {
                    if ui.selectable_label(is_selected, &entry.file_name).clicked() {
                        action = PropertiesAction::SelectImage(entry.id);
                    }
                    ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                        if ui.small_button("🗑").on_hover_text("Delete image").clicked() {
                            action = PropertiesAction::DeleteItem(entry.id);
                        }
                    });
                });
            }

            if store.is_empty() {
                ui.label(egui::RichText::new("No images in the project").weak());
            }
        });

    ui.add_space(8.0);
    ui.heading("Annotations");
    ui.separator();

    let Some(entry) = selected_image.and_then(|id| store.entry(id)) else {
        ui.label(egui::RichText::new("Select an image to view annotations").weak());
        return action;
    };

    egui::ScrollArea::vertical()
        .id_source("annotation_list")
        .show(ui, |ui| {
            for anchor in &entry.anchors {
                ui.horizontal(|ui| {
                    let mut active = anchor.active;
                    if ui.checkbox(&mut active, "").changed() {
                        action = PropertiesAction::SetAnchorActive {
                            id: anchor.id,
                            active,
                        };
                    }
                    ui.label(format!(
                        "{:?} anchor ({:.0}, {:.0})",
                        anchor.label, anchor.x, anchor.y
                    ));
                    ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                        if ui.small_button("🗑").clicked() {
                            action = PropertiesAction::DeleteItem(anchor.id);
                        }
                    });
                });
            }

            for bbox in &entry.bboxes {
                ui.horizontal(|ui| {
                    let mut active = bbox.active;
                    if ui.checkbox(&mut active, "").changed() {
                        action = PropertiesAction::SetBoxActive {
                            id: bbox.id,
                            active,
                        };
                    }

                    if label_edit.target == Some(bbox.id) {
                        let response = ui.text_edit_singleline(&mut label_edit.buffer);
                        let committed = response.lost_focus()
                            && ui.input(|i| i.key_pressed(egui::Key::Enter));
                        if committed || response.clicked_elsewhere() {
                            action = PropertiesAction::RenameBox {
                                id: bbox.id,
                                name: label_edit.buffer.trim().to_string(),
                            };
                            label_edit.target = None;
                        }
                    } else {
                        let label = ui.label(format!(
                            "{} [{:.0}×{:.0}]",
                            bbox.name, bbox.rect.w, bbox.rect.h
                        ));
                        if label.double_clicked() {
                            label_edit.target = Some(bbox.id);
                            label_edit.buffer = bbox.name.clone();
                        }
                    }

                    ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                        if ui.small_button("🗑").clicked() {
                            action = PropertiesAction::DeleteItem(bbox.id);
                        }
                    });
                });
            }

            if entry.anchors.is_empty() && entry.bboxes.is_empty() {
                ui.label(egui::RichText::new("No annotations yet").weak());
            }
        });

    action
}

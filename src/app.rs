// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Main application state and egui App implementation.
//!
//! This module contains the main application structure that implements
//! the egui::App trait, coordinating the project store, the annotation
//! scene, the SAM worker, and the UI panels.

use crate::config::{SamSettings, SETTINGS_FILE};
use crate::inference::runner::{spawn_run, validate_run, RunMessage, RunRequest};
use crate::inference::SamMode;
use crate::io::media::{self, LoadedImage};
use crate::io::yolo;
use crate::models::project::{Notice, ProjectStore};
use crate::ui::scene::{SceneEvent, SceneState};
use crate::ui::{canvas, properties, toolbar};
use std::path::Path;
use std::sync::mpsc::{channel, Receiver};
use uuid::Uuid;

/// Main application state.
pub struct SamApp {
    /// Project data store
    store: ProjectStore,

    /// Scene controller for the selected image
    scene: SceneState,

    /// Persistent SAM run configuration
    settings: SamSettings,

    /// Currently selected image
    selected_image: Option<Uuid>,

    /// Texture of the selected image
    image_texture: Option<egui::TextureHandle>,

    /// Red overlay texture of the selected image's mask
    mask_texture: Option<egui::TextureHandle>,

    /// Receiver for background image loading, tagged with the image id
    image_loader: Option<(Uuid, Receiver<Result<LoadedImage, String>>)>,

    /// Receiver for the in-flight SAM run
    run_receiver: Option<Receiver<RunMessage>>,

    /// A SAM run is in flight; a second one cannot start
    sam_busy: bool,

    /// Pending user-facing notification, shown as a modal
    notice: Option<Notice>,

    /// In-progress box label edit in the properties panel
    label_edit: properties::LabelEdit,

    /// Settings window visibility
    settings_open: bool,
}

impl Default for SamApp {
    fn default() -> Self {
        Self::new()
    }
}

impl SamApp {
    /// Create a new application instance, loading persisted settings.
    pub fn new() -> Self {
        let settings = match SamSettings::load(Path::new(SETTINGS_FILE)) {
            Ok(settings) => settings,
            Err(e) => {
                log::error!("Failed to load settings, using defaults: {e}");
                SamSettings::default()
            }
        };

        Self {
            store: ProjectStore::new(),
            scene: SceneState::new(),
            settings,
            selected_image: None,
            image_texture: None,
            mask_texture: None,
            image_loader: None,
            run_receiver: None,
            sam_busy: false,
            notice: None,
            label_edit: properties::LabelEdit::default(),
            settings_open: false,
        }
    }

    /// Open a file picker and add the chosen images to the project.
    fn add_images(&mut self) {
        let Some(paths) = rfd::FileDialog::new()
            .add_filter("Images", &["jpg", "jpeg", "png", "bmp", "tiff", "tif"])
            .pick_files()
        else {
            return;
        };

        let entries = paths
            .into_iter()
            .map(crate::models::project::ImageEntry::new)
            .collect();
        self.store.add_entries(entries);

        // Auto-select the first image if nothing is selected yet
        if self.selected_image.is_none() {
            let first = self.store.entries().next().map(|e| e.id);
            if let Some(first) = first {
                self.select_image(first);
            }
        }
    }

    /// Import a YOLO dataset directory (images/ + annotations/ plus a
    /// class file).
    fn import_dataset(&mut self) {
        let Some(root) = rfd::FileDialog::new()
            .set_title("Select import directory")
            .pick_folder()
        else {
            return;
        };
        let Some(classes_path) = rfd::FileDialog::new()
            .set_title("Select class file")
            .add_filter("Class list", &["txt"])
            .pick_file()
        else {
            return;
        };

        match yolo::import_dataset(&root, &classes_path) {
            Ok((entries, classes)) => {
                log::info!("Imported {} images from {}", entries.len(), root.display());
                self.store.import_entries(entries, classes);
            }
            Err(notice) => self.notice = Some(notice),
        }
    }

    /// Select an image: rebuild the scene and kick off the background
    /// texture load.
    fn select_image(&mut self, id: Uuid) {
        let Some(entry) = self.store.entry(id) else {
            return;
        };

        self.selected_image = Some(id);
        self.scene.load_entry(entry);
        self.image_texture = None;
        self.mask_texture = None;
        self.label_edit = properties::LabelEdit::default();

        let path = entry.file_path.clone();
        let (sender, receiver) = channel();
        self.image_loader = Some((id, receiver));

        std::thread::spawn(move || {
            let result = media::load_image(&path).map_err(|e| e.to_string());
            let _ = sender.send(result);
        });
    }

    /// Reload the scene and mask overlay from the store after a
    /// store-side mutation of the selected image.
    fn refresh_selected(&mut self, ctx: &egui::Context) {
        let Some(entry) = self.selected_image.and_then(|id| self.store.entry(id)) else {
            self.selected_image = None;
            self.scene.clear();
            self.image_texture = None;
            self.mask_texture = None;
            return;
        };

        self.scene.load_entry(entry);
        self.mask_texture = entry.mask.image.as_ref().map(|mask| {
            let overlay = media::mask_overlay(mask);
            upload_texture(ctx, "mask_overlay", &overlay)
        });
    }

    /// Validate and launch a SAM run for the selected image.
    fn run_sam(&mut self) {
        if self.sam_busy {
            return;
        }

        let entry = self.selected_image.and_then(|id| self.store.entry(id));
        if let Err(notice) = validate_run(entry, self.settings.mode) {
            self.notice = Some(notice);
            return;
        }

        if !self.settings.models_exist() {
            self.notice = Some(Notice::new(
                "Model Error",
                "The SAM encoder or decoder model file could not be found. \
                 Set the model paths in the SAM settings.",
            ));
            return;
        }

        // validate_run guarantees the entry exists
        let Some(entry) = entry.cloned() else {
            return;
        };

        log::info!("Starting SAM run for {} in {:?} mode", entry.file_name, self.settings.mode);
        self.run_receiver = Some(spawn_run(RunRequest {
            entry,
            mode: self.settings.mode,
            adjust_bbox: self.settings.adjust_bbox,
            encoder_path: self.settings.encoder_path.clone(),
            decoder_path: self.settings.decoder_path.clone(),
        }));
        self.sam_busy = true;
    }

    /// Drain worker messages into the store.
    fn poll_run(&mut self, ctx: &egui::Context) {
        let Some(receiver) = &self.run_receiver else {
            return;
        };

        let mut refresh = false;
        let mut finished = false;
        while let Ok(message) = receiver.try_recv() {
            match message {
                RunMessage::Result(result) => {
                    self.store.apply_sam_result(result);
                    refresh = true;
                }
                RunMessage::BatchResult(result) => {
                    self.store.apply_sam_batch_result(result);
                    refresh = true;
                }
                RunMessage::Error(notice) => {
                    self.notice = Some(notice);
                }
                RunMessage::Finished => {
                    finished = true;
                }
            }
        }

        if refresh {
            self.refresh_selected(ctx);
        }
        if finished {
            self.sam_busy = false;
            self.run_receiver = None;
        }
    }

    /// Poll the background image loader and upload the texture once
    /// the selected image's pixels arrive.
    fn poll_image_loader(&mut self, ctx: &egui::Context) {
        let Some((id, receiver)) = &self.image_loader else {
            return;
        };

        let Ok(result) = receiver.try_recv() else {
            return;
        };
        let id = *id;
        self.image_loader = None;

        // The user may have switched images while the load ran
        if self.selected_image != Some(id) {
            return;
        }

        match result {
            Ok(loaded) => {
                self.image_texture = Some(upload_texture(ctx, "selected_image", &loaded));
                self.refresh_selected(ctx);
            }
            Err(e) => {
                log::error!("Failed to load image: {e}");
                self.notice = Some(Notice::new("Image Error", e));
            }
        }
    }

    /// Apply scene controller events to the store.
    fn apply_scene_events(&mut self) {
        let Some(image_id) = self.selected_image else {
            return;
        };
        let mask_id = self.store.entry(image_id).map(|e| e.mask.id);

        for event in self.scene.take_events() {
            match event {
                SceneEvent::AnchorAdded(anchor) => self.store.add_anchor(image_id, anchor),
                SceneEvent::BoxAdded(bbox) => self.store.add_bbox(image_id, bbox),
                SceneEvent::AnchorMoved { id, x, y } => {
                    self.store.update_anchor_position(image_id, id, x, y)
                }
                SceneEvent::BoxMoved { id, rect } => {
                    self.store.update_bbox_geometry(image_id, id, rect)
                }
                SceneEvent::ImageMoved { x, y } => {
                    // The mask overlay tracks the image once both have
                    // been zeroed by an inference run.
                    self.store.update_image_position(image_id, x, y);
                    if let Some(mask_id) = mask_id {
                        self.store.update_mask_position(mask_id, x, y);
                    }
                }
                SceneEvent::ZoomChanged(zoom) => self.store.update_zoom(image_id, zoom),
            }
        }
    }

    fn apply_properties_action(&mut self, action: properties::PropertiesAction, ctx: &egui::Context) {
        let selected = self.selected_image;
        match action {
            properties::PropertiesAction::None => {}
            properties::PropertiesAction::SelectImage(id) => {
                if selected != Some(id) {
                    self.select_image(id);
                }
            }
            properties::PropertiesAction::DeleteItem(id) => {
                self.delete_item(id, ctx);
            }
            properties::PropertiesAction::SetAnchorActive { id, active } => {
                if let Some(image_id) = self.store.owner_of(id) {
                    self.store.set_anchor_active(image_id, id, active);
                    if selected == Some(image_id) {
                        self.scene.set_visible(id, active);
                    }
                }
            }
            properties::PropertiesAction::SetBoxActive { id, active } => {
                if let Some(image_id) = self.store.owner_of(id) {
                    self.store.set_bbox_active(image_id, id, active);
                }
            }
            properties::PropertiesAction::RenameBox { id, name } => {
                if let (Some(image_id), false) = (self.store.owner_of(id), name.is_empty()) {
                    self.store.rename_bbox(image_id, id, &name);
                }
            }
        }
    }

    /// Delete an image, anchor, or box by id.
    fn delete_item(&mut self, id: Uuid, ctx: &egui::Context) {
        let deleting_selected_image = self.selected_image == Some(id);
        self.store.delete_item(id);

        if deleting_selected_image {
            self.selected_image = None;
            self.scene.clear();
            self.image_texture = None;
            self.mask_texture = None;
        } else {
            self.scene.remove(id);
            self.refresh_selected(ctx);
        }
    }

    fn export_annotations(&mut self) {
        let Some(entry) = self.selected_image.and_then(|id| self.store.entry(id)) else {
            return;
        };
        let Some(dir) = rfd::FileDialog::new().pick_folder() else {
            return;
        };

        match yolo::export_annotations(&dir, entry, self.store.classes()) {
            Ok(true) => {}
            Ok(false) => {
                self.notice = Some(Notice::new(
                    "No BBox annotations",
                    "The selected image contains no BBox information that could be \
                     exported in YOLO format.",
                ));
            }
            Err(e) => {
                log::error!("Annotation export failed: {e}");
                self.notice = Some(Notice::new("Export Error", e.to_string()));
            }
        }
    }

    fn export_project(&mut self) {
        if self.store.is_empty() {
            self.notice = Some(Notice::new(
                "No BBoxes found",
                "There aren't any BBoxes in the project. To export YOLO annotations, \
                 you have to place BBoxes first.",
            ));
            return;
        }
        let Some(dir) = rfd::FileDialog::new()
            .set_title("Set save directory")
            .pick_folder()
        else {
            return;
        };

        match yolo::export_project(&dir, self.store.entries(), self.store.classes()) {
            Ok(0) => {
                self.notice = Some(Notice::new(
                    "No BBoxes found",
                    "There aren't any BBoxes in the project. To export YOLO annotations, \
                     you have to place BBoxes first.",
                ));
            }
            Ok(_) => {}
            Err(e) => {
                log::error!("Project export failed: {e}");
                self.notice = Some(Notice::new("Export Error", e.to_string()));
            }
        }
    }

    fn export_mask(&mut self) {
        let Some(entry) = self.selected_image.and_then(|id| self.store.entry(id)) else {
            return;
        };
        if entry.mask.image.is_none() {
            self.notice = Some(Notice::new(
                "No Mask",
                "The selected image has no generated mask. Run SAM first.",
            ));
            return;
        }
        let Some(dir) = rfd::FileDialog::new().pick_folder() else {
            return;
        };

        if let Err(e) = media::export_mask(&dir, entry) {
            log::error!("Mask export failed: {e}");
            self.notice = Some(Notice::new("Export Error", e.to_string()));
        }
    }

    fn export_crops(&mut self) {
        let Some(entry) = self.selected_image.and_then(|id| self.store.entry(id)) else {
            return;
        };
        if entry.mask.image.is_none() {
            self.notice = Some(Notice::new(
                "No Mask",
                "The selected image has no generated mask. Run SAM first.",
            ));
            return;
        }
        if entry.bboxes.is_empty() {
            self.notice = Some(Notice::new(
                "No BBoxes found",
                "No BBoxes are associated with this mask, so you might want to add \
                 at least one.",
            ));
            return;
        }
        let Some(dir) = rfd::FileDialog::new().pick_folder() else {
            return;
        };

        if let Err(e) = media::export_crops(&dir, entry) {
            log::error!("Crop export failed: {e}");
            self.notice = Some(Notice::new("Export Error", e.to_string()));
        }
    }

    fn show_menu_bar(&mut self, ctx: &egui::Context) {
        egui::TopBottomPanel::top("menu_bar").show(ctx, |ui| {
            egui::menu::bar(ui, |ui| {
                ui.menu_button("File", |ui| {
                    if ui.button("New Project").clicked() {
                        self.store.flush();
                        self.selected_image = None;
                        self.scene.clear();
                        self.image_texture = None;
                        self.mask_texture = None;
                        ui.close_menu();
                    }
                    ui.separator();
                    if ui.button("Add Images...").clicked() {
                        self.add_images();
                        ui.close_menu();
                    }
                    if ui.button("Import YOLO Dataset...").clicked() {
                        self.import_dataset();
                        ui.close_menu();
                    }
                    ui.separator();
                    ui.menu_button("Export", |ui| {
                        if ui.button("Annotations (YOLO)...").clicked() {
                            self.export_annotations();
                            ui.close_menu();
                        }
                        if ui.button("Mask...").clicked() {
                            self.export_mask();
                            ui.close_menu();
                        }
                        if ui.button("Cropped Regions...").clicked() {
                            self.export_crops();
                            ui.close_menu();
                        }
                        ui.separator();
                        if ui.button("Whole Project (YOLO)...").clicked() {
                            self.export_project();
                            ui.close_menu();
                        }
                    });
                    ui.separator();
                    if ui.button("Quit").clicked() {
                        ctx.send_viewport_cmd(egui::ViewportCommand::Close);
                    }
                });

                ui.menu_button("Edit", |ui| {
                    let has_selection = self.scene.selected.is_some();
                    if ui
                        .add_enabled(has_selection, egui::Button::new("Delete Selected"))
                        .clicked()
                    {
                        if let Some(id) = self.scene.selected {
                            self.delete_item(id, ctx);
                        }
                        ui.close_menu();
                    }

                    let has_image = self.selected_image.is_some();
                    if ui
                        .add_enabled(has_image, egui::Button::new("Clear Annotations"))
                        .clicked()
                    {
                        if let Some(id) = self.selected_image {
                            self.store.delete_annotations(id);
                            self.refresh_selected(ctx);
                        }
                        ui.close_menu();
                    }

                    ui.separator();
                    if ui.button("Remove All Images").clicked() {
                        self.store.delete_all_images();
                        self.selected_image = None;
                        self.scene.clear();
                        self.image_texture = None;
                        self.mask_texture = None;
                        ui.close_menu();
                    }
                });

                ui.menu_button("SAM", |ui| {
                    if ui
                        .add_enabled(!self.sam_busy, egui::Button::new("Run"))
                        .clicked()
                    {
                        self.run_sam();
                        ui.close_menu();
                    }
                    if ui.button("Settings...").clicked() {
                        self.settings_open = true;
                        ui.close_menu();
                    }
                });
            });
        });
    }

    fn show_settings_window(&mut self, ctx: &egui::Context) {
        if !self.settings_open {
            return;
        }

        let mut open = self.settings_open;
        egui::Window::new("SAM Settings")
            .open(&mut open)
            .resizable(false)
            .show(ctx, |ui| {
                ui.horizontal(|ui| {
                    ui.label("Mode:");
                    ui.selectable_value(&mut self.settings.mode, SamMode::Anchors, "Anchors");
                    ui.selectable_value(&mut self.settings.mode, SamMode::Boxes, "Boxes");
                });

                ui.checkbox(
                    &mut self.settings.adjust_bbox,
                    "Refit boxes to the generated mask",
                );

                ui.separator();

                ui.horizontal(|ui| {
                    ui.label("Encoder:");
                    ui.monospace(self.settings.encoder_path.display().to_string());
                    if ui.button("...").clicked() {
                        if let Some(path) = rfd::FileDialog::new()
                            .add_filter("ONNX model", &["onnx"])
                            .pick_file()
                        {
                            self.settings.encoder_path = path;
                        }
                    }
                });
                ui.horizontal(|ui| {
                    ui.label("Decoder:");
                    ui.monospace(self.settings.decoder_path.display().to_string());
                    if ui.button("...").clicked() {
                        if let Some(path) = rfd::FileDialog::new()
                            .add_filter("ONNX model", &["onnx"])
                            .pick_file()
                        {
                            self.settings.decoder_path = path;
                        }
                    }
                });

                ui.separator();
                if ui.button("Save").clicked() {
                    if let Err(e) = self.settings.save(Path::new(SETTINGS_FILE)) {
                        log::error!("Failed to save settings: {e}");
                    }
                }
            });
        self.settings_open = open;
    }

    fn show_notice(&mut self, ctx: &egui::Context) {
        let Some(notice) = self.notice.clone() else {
            return;
        };

        let mut dismissed = false;
        egui::Window::new(notice.title.clone())
            .collapsible(false)
            .resizable(false)
            .anchor(egui::Align2::CENTER_CENTER, egui::vec2(0.0, 0.0))
            .show(ctx, |ui| {
                ui.label(&notice.message);
                ui.add_space(8.0);
                ui.vertical_centered(|ui| {
                    if ui.button("OK").clicked() {
                        dismissed = true;
                    }
                });
            });

        if dismissed {
            self.notice = None;
        }
    }
}

/// Upload raw RGBA pixels as an egui texture.
fn upload_texture(ctx: &egui::Context, name: &str, image: &LoadedImage) -> egui::TextureHandle {
    let size = [image.width as usize, image.height as usize];
    let color_image = egui::ColorImage::from_rgba_unmultiplied(size, &image.pixels);
    ctx.load_texture(name, color_image, egui::TextureOptions::LINEAR)
}

impl eframe::App for SamApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.poll_image_loader(ctx);
        self.poll_run(ctx);

        // Keep polling while background work is in flight
        if self.sam_busy || self.image_loader.is_some() {
            ctx.request_repaint();
        }

        self.show_menu_bar(ctx);

        let mut toolbar_action = toolbar::ToolbarAction::None;
        egui::TopBottomPanel::top("toolbar").show(ctx, |ui| {
            let mut tool = self.scene.tool;
            toolbar_action = toolbar::show(ui, &mut tool, self.sam_busy);
            if tool != self.scene.tool {
                self.scene.set_tool(tool);
            }
        });
        if let toolbar::ToolbarAction::RunSam = toolbar_action {
            self.run_sam();
        }

        let properties_action = egui::SidePanel::right("properties")
            .default_width(280.0)
            .show(ctx, |ui| {
                properties::show(ui, &self.store, self.selected_image, &mut self.label_edit)
            })
            .inner;
        self.apply_properties_action(properties_action, ctx);

        let mask_offset = self
            .selected_image
            .and_then(|id| self.store.entry(id))
            .map(|e| (e.mask.x, e.mask.y))
            .unwrap_or((0.0, 0.0));

        egui::CentralPanel::default().show(ctx, |ui| {
            canvas::show(
                ui,
                &mut self.scene,
                &self.image_texture,
                &self.mask_texture,
                mask_offset,
            );
        });

        self.apply_scene_events();

        // Delete key removes the selected primitive, unless a text
        // field owns the keyboard
        if !ctx.wants_keyboard_input()
            && ctx.input(|i| i.key_pressed(egui::Key::Delete) || i.key_pressed(egui::Key::Backspace))
        {
            if let Some(id) = self.scene.selected {
                self.delete_item(id, ctx);
            }
        }

        self.show_settings_window(ctx);
        self.show_notice(ctx);
    }
}

// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Drawing canvas for image display and annotation.
//!
//! This module provides the main canvas area where users can view the
//! selected image, place anchors, draw boxes, and inspect the
//! generated mask overlay. All pointer input is translated into scene
//! coordinates and forwarded to the [`SceneState`] controller; the
//! resulting store updates are drained by the app as scene events.

use crate::models::annotation::{PointLabel, Rect};
use crate::ui::scene::{PrimitiveKind, SceneState};

/// Scroll-to-zoom sensitivity.
const ZOOM_PER_SCROLL_UNIT: f32 = 0.002;

/// Display the main canvas area and handle mouse interactions.
pub fn show(
    ui: &mut egui::Ui,
    scene: &mut SceneState,
    image_texture: &Option<egui::TextureHandle>,
    mask_texture: &Option<egui::TextureHandle>,
    mask_offset: (f32, f32),
) {
    // Set background color
    ui.style_mut().visuals.extreme_bg_color = egui::Color32::from_gray(40);

    let available_size = ui.available_size();

    egui::Frame::canvas(ui.style()).show(ui, |ui| {
        ui.set_min_size(available_size);

        if image_texture.is_none() {
            show_welcome(ui);
            return;
        }

        let canvas_rect = ui.min_rect();
        let response = ui.allocate_rect(canvas_rect, egui::Sense::click_and_drag());

        let zoom = scene.zoom;
        let to_screen = |p: (f32, f32)| -> egui::Pos2 {
            egui::pos2(
                canvas_rect.min.x + p.0 * zoom,
                canvas_rect.min.y + p.1 * zoom,
            )
        };
        let to_scene = |p: egui::Pos2| -> (f32, f32) {
            (
                (p.x - canvas_rect.min.x) / zoom,
                (p.y - canvas_rect.min.y) / zoom,
            )
        };

        handle_input(ui, scene, &response, to_scene);

        let painter = ui.painter_at(canvas_rect);

        // Draw the image at its scene offset
        if let Some(texture) = image_texture {
            let size = texture.size_vec2() * zoom;
            let image_rect =
                egui::Rect::from_min_size(to_screen(scene.image_offset), size);
            painter.image(
                texture.id(),
                image_rect,
                egui::Rect::from_min_max(egui::pos2(0.0, 0.0), egui::pos2(1.0, 1.0)),
                egui::Color32::WHITE,
            );
        }

        // Mask overlay, semi-transparent on top of the image
        if let Some(texture) = mask_texture {
            let size = texture.size_vec2() * zoom;
            let mask_rect = egui::Rect::from_min_size(to_screen(mask_offset), size);
            painter.image(
                texture.id(),
                mask_rect,
                egui::Rect::from_min_max(egui::pos2(0.0, 0.0), egui::pos2(1.0, 1.0)),
                egui::Color32::from_rgba_unmultiplied(255, 255, 255, 110),
            );
        }

        draw_primitives(&painter, scene, to_screen);

        // In-progress rubber band box
        if let Some(start) = scene.rubber_band_start() {
            if let Some(pos) = response.hover_pos() {
                let rect = Rect::from_corners(start, to_scene(pos));
                draw_box(&painter, &rect, to_screen, egui::Color32::LIGHT_BLUE);
            }
        }
    });

    // Display current tool info at the bottom
    ui.separator();
    ui.horizontal(|ui| {
        ui.label(format!("Current tool: {:?}", scene.tool));
        ui.separator();
        if image_texture.is_some() {
            ui.label(format!("Zoom: {:.0}%", scene.zoom * 100.0));
        } else {
            ui.label("No image selected");
        }
    });
}

/// Forward pointer and scroll input to the scene controller.
fn handle_input(
    ui: &egui::Ui,
    scene: &mut SceneState,
    response: &egui::Response,
    to_scene: impl Fn(egui::Pos2) -> (f32, f32),
) {
    let pointer = response.interact_pointer_pos().map(&to_scene);

    if let Some(pos) = pointer {
        if response.drag_started_by(egui::PointerButton::Primary) {
            scene.on_primary_press(pos);
        }
        if response.drag_started_by(egui::PointerButton::Secondary) {
            scene.on_secondary_press(pos);
        }
        if response.dragged_by(egui::PointerButton::Primary) {
            scene.on_pointer_drag(pos);
        }
        if response.drag_stopped_by(egui::PointerButton::Primary) {
            scene.on_primary_release();
        }
        if response.drag_stopped_by(egui::PointerButton::Secondary) {
            scene.on_secondary_release(pos);
        }
        // Quick clicks never enter egui's drag state
        if response.clicked() {
            scene.on_primary_press(pos);
            scene.on_primary_release();
        }
        if response.secondary_clicked() {
            scene.on_secondary_press(pos);
            scene.on_secondary_release(pos);
        }
    }

    if response.hovered() {
        let scroll = ui.input(|i| i.raw_scroll_delta.y);
        if scroll != 0.0 {
            scene.on_zoom((scroll * ZOOM_PER_SCROLL_UNIT).exp());
        }
    }
}

/// Draw all visible anchors and boxes from the scene arena.
fn draw_primitives(
    painter: &egui::Painter,
    scene: &SceneState,
    to_screen: impl Fn((f32, f32)) -> egui::Pos2 + Copy,
) {
    for primitive in scene.primitives() {
        if !primitive.visible {
            continue;
        }
        let selected = scene.selected == Some(primitive.id);

        match &primitive.kind {
            PrimitiveKind::Anchor { label, x, y } => {
                let center = to_screen((*x, *y));
                let fill = match label {
                    PointLabel::Foreground => egui::Color32::from_rgb(60, 200, 60),
                    PointLabel::Background => egui::Color32::from_rgb(220, 60, 60),
                };
                painter.circle_filled(center, 5.0, fill);
                let ring = if selected {
                    egui::Color32::WHITE
                } else {
                    egui::Color32::BLACK
                };
                painter.circle_stroke(center, 5.0, egui::Stroke::new(1.5, ring));
            }
            PrimitiveKind::Box { rect } => {
                let color = if selected {
                    egui::Color32::WHITE
                } else {
                    egui::Color32::YELLOW
                };
                draw_box(painter, rect, to_screen, color);
            }
        }
    }
}

fn draw_box(
    painter: &egui::Painter,
    rect: &Rect,
    to_screen: impl Fn((f32, f32)) -> egui::Pos2,
    color: egui::Color32,
) {
    let screen_rect = egui::Rect::from_min_max(
        to_screen((rect.x, rect.y)),
        to_screen((rect.right(), rect.bottom())),
    );
    painter.rect_stroke(screen_rect, 0.0, egui::Stroke::new(2.0, color));
}

/// Welcome message shown before any image is selected.
fn show_welcome(ui: &mut egui::Ui) {
    ui.centered_and_justified(|ui| {
        ui.vertical_centered(|ui| {
            ui.add_space(20.0);
            ui.heading(
                egui::RichText::new("SAMLAB")
                    .size(32.0)
                    .color(egui::Color32::from_gray(200)),
            );
            ui.label(
                egui::RichText::new("SAM-Assisted Image Annotation")
                    .size(14.0)
                    .color(egui::Color32::from_gray(150)),
            );
            ui.add_space(20.0);
            ui.label(
                egui::RichText::new("Add images to begin annotating")
                    .color(egui::Color32::from_gray(180)),
            );
            ui.add_space(10.0);
            ui.label(
                egui::RichText::new("File → Add Images...")
                    .weak()
                    .color(egui::Color32::from_gray(130)),
            );
        });
    });
}

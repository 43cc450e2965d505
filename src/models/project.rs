// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Project state management.
//!
//! The project store owns all imported images and their annotations.
//! It is mutated only from the UI thread; the inference worker hands
//! results back as immutable payloads which are applied here.

use super::annotation::{Anchor, BBox, Mask, Rect};
use image::GrayImage;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use uuid::Uuid;

/// One imported image with its annotations and display placement.
#[derive(Debug, Clone)]
pub struct ImageEntry {
    pub id: Uuid,
    pub file_path: PathBuf,
    pub file_name: String,
    /// Display offset on the canvas. Co-normalized to (0,0) with the
    /// mask offset whenever an inference result is written.
    pub x: f32,
    pub y: f32,
    pub zoom: f32,
    pub anchors: Vec<Anchor>,
    pub bboxes: Vec<BBox>,
    pub mask: Mask,
}

impl ImageEntry {
    pub fn new(file_path: impl Into<PathBuf>) -> Self {
        let file_path = file_path.into();
        let file_name = file_path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();

        Self {
            id: Uuid::new_v4(),
            file_path,
            file_name,
            x: 0.0,
            y: 0.0,
            zoom: 1.0,
            anchors: Vec::new(),
            bboxes: Vec::new(),
            mask: Mask::empty(),
        }
    }

    pub fn active_boxes(&self) -> impl Iterator<Item = &BBox> {
        self.bboxes.iter().filter(|b| b.active)
    }
}

/// Result of a single-prompt SAM run, in original-image coordinates.
#[derive(Debug, Clone)]
pub struct SamResult {
    pub image_id: Uuid,
    pub mask: GrayImage,
    pub bbox: Option<BBox>,
    pub anchors: Vec<Anchor>,
}

/// Result of a multi-box SAM run: one combined mask plus all
/// (possibly refit) box rectangles.
#[derive(Debug, Clone)]
pub struct BatchSamResult {
    pub image_id: Uuid,
    pub mask: GrayImage,
    pub bboxes: Vec<BBox>,
}

/// A user-facing title/message pair shown as a notification dialog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub title: String,
    pub message: String,
}

impl Notice {
    pub fn new(title: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            message: message.into(),
        }
    }
}

/// Complete in-memory project: class list plus all image entries.
#[derive(Debug, Clone)]
pub struct Project {
    pub id: Uuid,
    pub name: String,
    pub classes: Vec<String>,
    entries: HashMap<Uuid, ImageEntry>,
    /// Insertion order of entries, for stable listing in the UI.
    order: Vec<Uuid>,
}

const DEFAULT_PROJECT_NAME: &str = "Default Segmentation Project";

impl Project {
    fn new() -> Self {
        Self {
            id: Uuid::new_v4(),
            name: DEFAULT_PROJECT_NAME.to_string(),
            classes: Vec::new(),
            entries: HashMap::new(),
            order: Vec::new(),
        }
    }
}

/// Owner of the project data; every mutation goes through here.
#[derive(Debug)]
pub struct ProjectStore {
    project: Project,
}

impl Default for ProjectStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ProjectStore {
    pub fn new() -> Self {
        Self {
            project: Project::new(),
        }
    }

    /// Discard everything and start a fresh project.
    pub fn flush(&mut self) {
        self.project = Project::new();
    }

    pub fn classes(&self) -> &[String] {
        &self.project.classes
    }

    pub fn set_classes(&mut self, classes: Vec<String>) {
        self.project.classes = classes;
    }

    pub fn is_empty(&self) -> bool {
        self.project.entries.is_empty()
    }

    pub fn image_exists(&self, path: &Path) -> bool {
        self.project.entries.values().any(|e| e.file_path == path)
    }

    /// Add entries, rejecting any whose file path is already present.
    /// Re-importing the same path is a no-op.
    pub fn add_entries(&mut self, entries: Vec<ImageEntry>) {
        for entry in entries {
            if self.image_exists(&entry.file_path) {
                log::info!("Skipping duplicate image: {}", entry.file_path.display());
                continue;
            }
            self.project.order.push(entry.id);
            self.project.entries.insert(entry.id, entry);
        }
    }

    /// Add entries and replace the project class list (YOLO dataset import).
    pub fn import_entries(&mut self, entries: Vec<ImageEntry>, classes: Vec<String>) {
        self.add_entries(entries);
        self.set_classes(classes);
    }

    pub fn entry(&self, id: Uuid) -> Option<&ImageEntry> {
        self.project.entries.get(&id)
    }

    /// Entries in insertion order.
    pub fn entries(&self) -> impl Iterator<Item = &ImageEntry> {
        self.project
            .order
            .iter()
            .filter_map(|id| self.project.entries.get(id))
    }

    pub fn add_anchor(&mut self, image_id: Uuid, anchor: Anchor) {
        if let Some(entry) = self.project.entries.get_mut(&image_id) {
            entry.anchors.push(anchor);
        }
    }

    pub fn add_bbox(&mut self, image_id: Uuid, bbox: BBox) {
        if let Some(entry) = self.project.entries.get_mut(&image_id) {
            entry.bboxes.push(bbox);
        }
    }

    pub fn set_anchor_active(&mut self, image_id: Uuid, anchor_id: Uuid, active: bool) {
        if let Some(entry) = self.project.entries.get_mut(&image_id) {
            for anchor in &mut entry.anchors {
                if anchor.id == anchor_id {
                    anchor.active = active;
                }
            }
        }
    }

    pub fn set_bbox_active(&mut self, image_id: Uuid, bbox_id: Uuid, active: bool) {
        if let Some(entry) = self.project.entries.get_mut(&image_id) {
            for bbox in &mut entry.bboxes {
                if bbox.id == bbox_id {
                    bbox.active = active;
                }
            }
        }
    }

    /// Rename a box label and recompute the project class list.
    ///
    /// The class list is always rebuilt from the full set of labels in
    /// use; incremental bookkeeping drifts when labels are renamed away.
    pub fn rename_bbox(&mut self, image_id: Uuid, bbox_id: Uuid, label: &str) {
        let Some(entry) = self.project.entries.get_mut(&image_id) else {
            return;
        };

        for bbox in &mut entry.bboxes {
            if bbox.id == bbox_id {
                bbox.name = label.to_string();
                self.recompute_classes();
                return;
            }
        }
    }

    /// Rebuild the class list as the dedup of every box label in use.
    pub fn recompute_classes(&mut self) {
        let mut classes: Vec<String> = Vec::new();
        for id in &self.project.order {
            if let Some(entry) = self.project.entries.get(id) {
                for bbox in &entry.bboxes {
                    if !classes.contains(&bbox.name) {
                        classes.push(bbox.name.clone());
                    }
                }
            }
        }
        self.project.classes = classes;
    }

    // Position updates are matched by id; a missing id means the
    // primitive was already deleted, so the update is dropped silently.

    pub fn update_image_position(&mut self, image_id: Uuid, x: f32, y: f32) {
        if let Some(entry) = self.project.entries.get_mut(&image_id) {
            entry.x = x;
            entry.y = y;
        }
    }

    pub fn update_mask_position(&mut self, mask_id: Uuid, x: f32, y: f32) {
        for entry in self.project.entries.values_mut() {
            if entry.mask.id == mask_id {
                entry.mask.x = x;
                entry.mask.y = y;
            }
        }
    }

    pub fn update_anchor_position(&mut self, image_id: Uuid, anchor_id: Uuid, x: f32, y: f32) {
        if let Some(entry) = self.project.entries.get_mut(&image_id) {
            for anchor in &mut entry.anchors {
                if anchor.id == anchor_id {
                    anchor.x = x;
                    anchor.y = y;
                }
            }
        }
    }

    pub fn update_bbox_geometry(&mut self, image_id: Uuid, bbox_id: Uuid, rect: Rect) {
        if let Some(entry) = self.project.entries.get_mut(&image_id) {
            for bbox in &mut entry.bboxes {
                if bbox.id == bbox_id {
                    bbox.rect = rect;
                }
            }
        }
    }

    pub fn update_zoom(&mut self, image_id: Uuid, factor: f32) {
        if let Some(entry) = self.project.entries.get_mut(&image_id) {
            entry.zoom = factor;
        }
    }

    /// Apply a single-prompt result: overwrite the matching box geometry,
    /// refresh anchor positions by id, replace the mask, and zero both
    /// the mask offset and the image offset so placement drift cannot
    /// accumulate between the two layers.
    pub fn apply_sam_result(&mut self, result: SamResult) {
        let Some(entry) = self.project.entries.get_mut(&result.image_id) else {
            log::warn!("SAM result for unknown image: {}", result.image_id);
            return;
        };

        if let Some(result_bbox) = &result.bbox {
            for bbox in &mut entry.bboxes {
                if bbox.id == result_bbox.id {
                    bbox.rect = result_bbox.rect;
                }
            }
        }

        for anchor in &mut entry.anchors {
            for result_anchor in &result.anchors {
                if result_anchor.id == anchor.id {
                    anchor.x = result_anchor.x;
                    anchor.y = result_anchor.y;
                }
            }
        }

        entry.mask.x = 0.0;
        entry.mask.y = 0.0;
        entry.mask.image = Some(result.mask);
        entry.x = 0.0;
        entry.y = 0.0;
    }

    /// Apply a multi-box result, same offset co-normalization as
    /// [`apply_sam_result`].
    pub fn apply_sam_batch_result(&mut self, result: BatchSamResult) {
        let Some(entry) = self.project.entries.get_mut(&result.image_id) else {
            log::warn!("SAM batch result for unknown image: {}", result.image_id);
            return;
        };

        for bbox in &mut entry.bboxes {
            for result_bbox in &result.bboxes {
                if result_bbox.id == bbox.id {
                    bbox.rect = result_bbox.rect;
                }
            }
        }

        entry.mask.x = 0.0;
        entry.mask.y = 0.0;
        entry.mask.image = Some(result.mask);
        entry.x = 0.0;
        entry.y = 0.0;
    }

    /// Delete by id: an image entry (cascading to its anchors, boxes and
    /// mask) or an individual anchor/box.
    pub fn delete_item(&mut self, id: Uuid) {
        if self.project.entries.remove(&id).is_some() {
            self.project.order.retain(|entry_id| *entry_id != id);
            return;
        }

        for entry in self.project.entries.values_mut() {
            let anchors_before = entry.anchors.len();
            entry.anchors.retain(|a| a.id != id);
            if entry.anchors.len() != anchors_before {
                return;
            }

            let bboxes_before = entry.bboxes.len();
            entry.bboxes.retain(|b| b.id != id);
            if entry.bboxes.len() != bboxes_before {
                return;
            }
        }

        log::warn!("Tried to delete a non-existing item: {id}");
    }

    /// Remove every anchor and box from one image, keeping the image.
    pub fn delete_annotations(&mut self, image_id: Uuid) {
        match self.project.entries.get_mut(&image_id) {
            Some(entry) => {
                entry.anchors.clear();
                entry.bboxes.clear();
            }
            None => {
                log::warn!("Tried to delete annotations for non-existing image: {image_id}")
            }
        }
    }

    pub fn delete_all_images(&mut self) {
        self.project.entries.clear();
        self.project.order.clear();
    }

    /// Find an annotation's owning image.
    pub fn owner_of(&self, id: Uuid) -> Option<Uuid> {
        for entry in self.project.entries.values() {
            if entry.anchors.iter().any(|a| a.id == id) || entry.bboxes.iter().any(|b| b.id == id) {
                return Some(entry.id);
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::annotation::PointLabel;

    fn store_with_image(path: &str) -> (ProjectStore, Uuid) {
        let mut store = ProjectStore::new();
        let entry = ImageEntry::new(path);
        let id = entry.id;
        store.add_entries(vec![entry]);
        (store, id)
    }

    fn gray(w: u32, h: u32) -> GrayImage {
        GrayImage::new(w, h)
    }

    #[test]
    fn test_duplicate_paths_rejected() {
        let (mut store, first_id) = store_with_image("/data/cat.png");
        store.add_entries(vec![ImageEntry::new("/data/cat.png")]);

        assert_eq!(store.entries().count(), 1);
        assert_eq!(store.entries().next().unwrap().id, first_id);

        store.add_entries(vec![ImageEntry::new("/data/dog.png")]);
        assert_eq!(store.entries().count(), 2);
    }

    #[test]
    fn test_delete_image_cascades() {
        let (mut store, image_id) = store_with_image("/data/cat.png");
        let anchor = Anchor::new(PointLabel::Foreground, 5.0, 5.0);
        let bbox = BBox::new(Rect::new(0.0, 0.0, 10.0, 10.0));
        let (anchor_id, bbox_id) = (anchor.id, bbox.id);

        store.add_anchor(image_id, anchor);
        store.add_bbox(image_id, bbox);
        store.delete_item(image_id);

        assert!(store.entry(image_id).is_none());
        assert!(store.owner_of(anchor_id).is_none());
        assert!(store.owner_of(bbox_id).is_none());
    }

    #[test]
    fn test_position_update_for_missing_id_is_noop() {
        let (mut store, image_id) = store_with_image("/data/cat.png");
        let bbox = BBox::new(Rect::new(1.0, 2.0, 3.0, 4.0));
        let bbox_id = bbox.id;
        store.add_bbox(image_id, bbox);

        // Unknown id: nothing changes, nothing panics.
        store.update_bbox_geometry(image_id, Uuid::new_v4(), Rect::new(9.0, 9.0, 9.0, 9.0));
        assert_eq!(
            store.entry(image_id).unwrap().bboxes[0].rect,
            Rect::new(1.0, 2.0, 3.0, 4.0)
        );

        store.update_bbox_geometry(image_id, bbox_id, Rect::new(9.0, 9.0, 9.0, 9.0));
        assert_eq!(
            store.entry(image_id).unwrap().bboxes[0].rect,
            Rect::new(9.0, 9.0, 9.0, 9.0)
        );
    }

    #[test]
    fn test_class_list_recomputed_on_rename() {
        let (mut store, image_id) = store_with_image("/data/cat.png");
        let a = BBox::new(Rect::new(0.0, 0.0, 1.0, 1.0));
        let b = BBox::new(Rect::new(2.0, 2.0, 1.0, 1.0));
        let (a_id, b_id) = (a.id, b.id);
        store.add_bbox(image_id, a);
        store.add_bbox(image_id, b);

        store.rename_bbox(image_id, a_id, "cat");
        assert_eq!(store.classes(), &["cat".to_string(), "BBox".to_string()]);

        // Renaming the last "BBox" away must drop it from the class list.
        store.rename_bbox(image_id, b_id, "cat");
        assert_eq!(store.classes(), &["cat".to_string()]);
    }

    #[test]
    fn test_sam_result_zeroes_offsets() {
        let (mut store, image_id) = store_with_image("/data/cat.png");
        store.update_image_position(image_id, 40.0, -12.5);
        let mask_id = store.entry(image_id).unwrap().mask.id;
        store.update_mask_position(mask_id, 3.0, 7.0);

        store.apply_sam_result(SamResult {
            image_id,
            mask: gray(8, 8),
            bbox: None,
            anchors: Vec::new(),
        });

        let entry = store.entry(image_id).unwrap();
        assert_eq!((entry.x, entry.y), (0.0, 0.0));
        assert_eq!((entry.mask.x, entry.mask.y), (0.0, 0.0));
        assert!(entry.mask.image.is_some());
    }

    #[test]
    fn test_batch_result_overwrites_matching_boxes() {
        let (mut store, image_id) = store_with_image("/data/cat.png");
        let bbox = BBox::new(Rect::new(0.0, 0.0, 10.0, 10.0));
        let bbox_id = bbox.id;
        store.add_bbox(image_id, bbox);

        let mut refit = store.entry(image_id).unwrap().bboxes[0].clone();
        refit.rect = Rect::new(2.0, 3.0, 6.0, 5.0);

        store.apply_sam_batch_result(BatchSamResult {
            image_id,
            mask: gray(8, 8),
            bboxes: vec![refit],
        });

        let entry = store.entry(image_id).unwrap();
        assert_eq!(entry.bboxes[0].id, bbox_id);
        assert_eq!(entry.bboxes[0].rect, Rect::new(2.0, 3.0, 6.0, 5.0));
    }

    #[test]
    fn test_delete_individual_annotation_by_id() {
        let (mut store, image_id) = store_with_image("/data/cat.png");
        let anchor = Anchor::new(PointLabel::Background, 1.0, 1.0);
        let anchor_id = anchor.id;
        store.add_anchor(image_id, anchor);

        store.delete_item(anchor_id);
        assert!(store.entry(image_id).unwrap().anchors.is_empty());
        assert!(store.entry(image_id).is_some());
    }
}

// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Inference request builder and background run worker.
//!
//! One worker thread per invocation, no pooling: the worker sends back
//! exactly one of single-result, batch-result, or error, followed
//! unconditionally by a completion message so the UI can release its
//! busy state even when the run failed.

use super::contour::largest_contour_rect;
use super::preprocess::{image_tensor, rescale_point};
use super::sam::SamSession;
use super::{InferenceError, SamMode};
use crate::models::annotation::{Anchor, BBox, Rect};
use crate::models::project::{BatchSamResult, ImageEntry, Notice, SamResult};
use image::GrayImage;
use ndarray::{Array2, Array3};
use std::path::PathBuf;
use std::sync::mpsc::{channel, Receiver};

/// Everything the worker needs, captured by value so the project store
/// is never touched off the UI thread.
#[derive(Debug, Clone)]
pub struct RunRequest {
    pub entry: ImageEntry,
    pub mode: SamMode,
    pub adjust_bbox: bool,
    pub encoder_path: PathBuf,
    pub decoder_path: PathBuf,
}

/// Messages from the worker back to the UI thread.
#[derive(Debug)]
pub enum RunMessage {
    Result(SamResult),
    BatchResult(BatchSamResult),
    Error(Notice),
    Finished,
}

/// Pre-run validation, in the order users see the notices: empty
/// selection, no annotations at all, then mode-specific mismatch.
pub fn validate_run(entry: Option<&ImageEntry>, mode: SamMode) -> Result<(), Notice> {
    let Some(entry) = entry else {
        return Err(Notice::new(
            "Project is empty",
            "The project contains no data to run SAM on.",
        ));
    };

    if entry.anchors.is_empty() && entry.bboxes.is_empty() {
        return Err(Notice::new(
            "No Annotations",
            "The selected image has no annotations.",
        ));
    }

    match mode {
        SamMode::Anchors if entry.anchors.is_empty() => Err(Notice::new(
            "Invalid SAM Mode",
            "Anchor mode is selected, but no anchors have been placed.",
        )),
        SamMode::Boxes if entry.active_boxes().count() == 0 => Err(Notice::new(
            "Invalid SAM Mode",
            "BBox mode is selected, but no active BBoxes have been placed.",
        )),
        _ => Ok(()),
    }
}

/// Spawn the worker thread for one run and hand back its channel.
pub fn spawn_run(request: RunRequest) -> Receiver<RunMessage> {
    let (sender, receiver) = channel();

    std::thread::spawn(move || {
        let outcome = match execute(&request) {
            Ok(message) => message,
            Err(e) => {
                log::error!("SAM run failed: {e}");
                RunMessage::Error(Notice::new(e.kind(), e.to_string()))
            }
        };

        let _ = sender.send(outcome);
        // Completion is decoupled from success: this always fires.
        let _ = sender.send(RunMessage::Finished);
    });

    receiver
}

fn execute(request: &RunRequest) -> Result<RunMessage, InferenceError> {
    let entry = &request.entry;
    let image = image::open(&entry.file_path)?.to_rgb8();
    let orig = image.dimensions();

    let (tensor, resized) = image_tensor(&image);
    let session = SamSession::load(&request.encoder_path, &request.decoder_path)?;
    let embeddings = session.embed(tensor)?;

    let offset = (entry.x, entry.y);
    // Anchors translated back by the image's display offset; these are
    // echoed to the store so their data positions match the reset image.
    let norm_anchors: Vec<Anchor> = entry
        .anchors
        .iter()
        .map(|a| Anchor {
            x: a.x - offset.0,
            y: a.y - offset.1,
            ..a.clone()
        })
        .collect();

    match request.mode {
        SamMode::Anchors => {
            let (coords, labels) = anchor_prompt(&norm_anchors, resized, orig);
            let mask = session.decode(&embeddings, coords, labels, orig)?;

            Ok(RunMessage::Result(SamResult {
                image_id: entry.id,
                mask,
                bbox: None,
                anchors: norm_anchors,
            }))
        }
        SamMode::Boxes => {
            let boxes: Vec<BBox> = entry
                .active_boxes()
                .map(|b| BBox {
                    rect: b.rect.translated(-offset.0, -offset.1),
                    ..b.clone()
                })
                .collect();

            let mut masks: Vec<GrayImage> = Vec::with_capacity(boxes.len());
            let mut out_boxes = Vec::with_capacity(boxes.len());

            for bbox in &boxes {
                let (coords, labels) = box_prompt(&bbox.rect, resized, orig);
                let mask = session.decode(&embeddings, coords, labels, orig)?;

                let out = if request.adjust_bbox {
                    BBox {
                        rect: largest_contour_rect(&mask)?,
                        active: true,
                        ..bbox.clone()
                    }
                } else {
                    bbox.clone()
                };

                masks.push(mask);
                out_boxes.push(out);
            }

            if masks.len() == 1 {
                Ok(RunMessage::Result(SamResult {
                    image_id: entry.id,
                    mask: masks.swap_remove(0),
                    bbox: out_boxes.into_iter().next(),
                    anchors: norm_anchors,
                }))
            } else {
                Ok(RunMessage::BatchResult(BatchSamResult {
                    image_id: entry.id,
                    mask: union_masks(&masks),
                    bboxes: out_boxes,
                }))
            }
        }
    }
}

/// Point prompt for anchor mode: every anchor plus the SAM padding
/// point (0, 0) with label -1, all rescaled into model input space.
/// Anchor positions are expected to be offset-normalized already.
pub fn anchor_prompt(
    anchors: &[Anchor],
    resized: (u32, u32),
    orig: (u32, u32),
) -> (Array3<f32>, Array2<f32>) {
    let n = anchors.len() + 1;
    let mut coords = Array3::<f32>::zeros((1, n, 2));
    let mut labels = Array2::<f32>::zeros((1, n));

    for (i, anchor) in anchors.iter().enumerate() {
        let (x, y) = rescale_point((anchor.x, anchor.y), (0.0, 0.0), resized, orig);
        coords[[0, i, 0]] = x;
        coords[[0, i, 1]] = y;
        labels[[0, i]] = anchor.label.as_f32();
    }
    labels[[0, n - 1]] = -1.0;

    (coords, labels)
}

/// Box prompt: top-left and bottom-right corners with the SAM box
/// labels 2 and 3. The rect is expected to be offset-normalized.
pub fn box_prompt(rect: &Rect, resized: (u32, u32), orig: (u32, u32)) -> (Array3<f32>, Array2<f32>) {
    let (x0, y0) = rescale_point((rect.x, rect.y), (0.0, 0.0), resized, orig);
    let (x1, y1) = rescale_point((rect.right(), rect.bottom()), (0.0, 0.0), resized, orig);

    let mut coords = Array3::<f32>::zeros((1, 2, 2));
    coords[[0, 0, 0]] = x0;
    coords[[0, 0, 1]] = y0;
    coords[[0, 1, 0]] = x1;
    coords[[0, 1, 1]] = y1;

    let mut labels = Array2::<f32>::zeros((1, 2));
    labels[[0, 0]] = 2.0;
    labels[[0, 1]] = 3.0;

    (coords, labels)
}

/// OR-union of per-box binary masks: any pixel that is foreground in
/// any mask is foreground in the result. Accumulation is boolean, so
/// overlap counts cannot overflow regardless of how many boxes stack.
pub fn union_masks(masks: &[GrayImage]) -> GrayImage {
    assert!(!masks.is_empty(), "cannot union zero masks");
    let (width, height) = masks[0].dimensions();

    GrayImage::from_fn(width, height, |x, y| {
        let foreground = masks.iter().any(|m| m.get_pixel(x, y)[0] > 0);
        image::Luma([if foreground { 255 } else { 0 }])
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::annotation::PointLabel;

    fn entry_with(path: &str, anchors: usize, boxes: usize) -> ImageEntry {
        let mut entry = ImageEntry::new(path);
        for i in 0..anchors {
            entry
                .anchors
                .push(Anchor::new(PointLabel::Foreground, i as f32, i as f32));
        }
        for i in 0..boxes {
            entry
                .bboxes
                .push(BBox::new(Rect::new(i as f32, 0.0, 10.0, 10.0)));
        }
        entry
    }

    #[test]
    fn test_validate_rejects_missing_image_first() {
        let err = validate_run(None, SamMode::Anchors).unwrap_err();
        assert_eq!(err.title, "Project is empty");
    }

    #[test]
    fn test_validate_rejects_empty_annotations() {
        let entry = entry_with("/data/a.png", 0, 0);
        let err = validate_run(Some(&entry), SamMode::Anchors).unwrap_err();
        assert_eq!(err.title, "No Annotations");
    }

    #[test]
    fn test_validate_mode_mismatch() {
        let entry = entry_with("/data/a.png", 0, 1);
        let err = validate_run(Some(&entry), SamMode::Anchors).unwrap_err();
        assert_eq!(err.title, "Invalid SAM Mode");

        let entry = entry_with("/data/a.png", 1, 0);
        let err = validate_run(Some(&entry), SamMode::Boxes).unwrap_err();
        assert_eq!(err.title, "Invalid SAM Mode");

        // A box that exists but is deactivated does not satisfy box mode.
        let mut entry = entry_with("/data/a.png", 0, 1);
        entry.bboxes[0].active = false;
        let err = validate_run(Some(&entry), SamMode::Boxes).unwrap_err();
        assert_eq!(err.title, "Invalid SAM Mode");
    }

    #[test]
    fn test_validate_accepts_matching_mode() {
        let entry = entry_with("/data/a.png", 1, 0);
        assert!(validate_run(Some(&entry), SamMode::Anchors).is_ok());

        let entry = entry_with("/data/a.png", 0, 2);
        assert!(validate_run(Some(&entry), SamMode::Boxes).is_ok());
    }

    fn mask_with_block(x: u32, y: u32, w: u32, h: u32) -> GrayImage {
        let mut mask = GrayImage::new(32, 32);
        for py in y..y + h {
            for px in x..x + w {
                mask.put_pixel(px, py, image::Luma([255]));
            }
        }
        mask
    }

    #[test]
    fn test_union_of_disjoint_masks_is_exact_union() {
        let a = mask_with_block(0, 0, 4, 4);
        let b = mask_with_block(10, 10, 4, 4);
        let combined = union_masks(&[a.clone(), b.clone()]);

        for (x, y, pixel) in combined.enumerate_pixels() {
            let expected = a.get_pixel(x, y)[0] > 0 || b.get_pixel(x, y)[0] > 0;
            assert_eq!(pixel[0] > 0, expected, "mismatch at ({x}, {y})");
        }
    }

    #[test]
    fn test_union_overlap_stays_binary() {
        // Many overlapping masks: the result must stay exactly 255,
        // never wrap an accumulator.
        let masks: Vec<GrayImage> = (0..300).map(|_| mask_with_block(5, 5, 8, 8)).collect();
        let combined = union_masks(&masks);

        assert_eq!(combined.get_pixel(6, 6)[0], 255);
        assert_eq!(combined.get_pixel(0, 0)[0], 0);
    }

    #[test]
    fn test_anchor_prompt_appends_padding_point() {
        let anchors = vec![
            Anchor::new(PointLabel::Foreground, 100.0, 50.0),
            Anchor::new(PointLabel::Background, 10.0, 20.0),
        ];
        let (coords, labels) = anchor_prompt(&anchors, (1024, 512), (2000, 1000));

        assert_eq!(coords.shape(), &[1, 3, 2]);
        assert_eq!(labels.shape(), &[1, 3]);
        assert!((coords[[0, 0, 0]] - 100.0 * 1024.0 / 2000.0).abs() < 1e-4);
        assert!((coords[[0, 0, 1]] - 50.0 * 512.0 / 1000.0).abs() < 1e-4);
        assert_eq!(labels[[0, 0]], 1.0);
        assert_eq!(labels[[0, 1]], 0.0);
        assert_eq!(coords[[0, 2, 0]], 0.0);
        assert_eq!(labels[[0, 2]], -1.0);
    }

    #[test]
    fn test_box_prompt_corner_labels() {
        let rect = Rect::new(100.0, 100.0, 200.0, 100.0);
        let (coords, labels) = box_prompt(&rect, (1024, 1024), (1024, 1024));

        assert_eq!(coords[[0, 0, 0]], 100.0);
        assert_eq!(coords[[0, 1, 0]], 300.0);
        assert_eq!(coords[[0, 1, 1]], 200.0);
        assert_eq!(labels[[0, 0]], 2.0);
        assert_eq!(labels[[0, 1]], 3.0);
    }
}

// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! YOLO annotation format read and write.
//!
//! One text file per image, one line per box in the form
//! `class_id center_x center_y width height` with the four geometry
//! values normalized to [0, 1], plus a sibling `classes.txt` listing
//! one class name per line in index order.

use crate::models::annotation::{BBox, Rect, DEFAULT_BOX_LABEL};
use crate::models::project::{ImageEntry, Notice};
use anyhow::{bail, Context, Result};
use std::cmp::Ordering;
use std::fmt;
use std::path::Path;

/// Class index written for a box whose label is not in the class list.
pub const UNKNOWN_CLASS_ID: usize = 999;

/// One line of a YOLO annotation file.
#[derive(Debug, Clone, PartialEq)]
pub struct YoloAnnotation {
    pub class_id: usize,
    pub center_x: f32,
    pub center_y: f32,
    pub width: f32,
    pub height: f32,
}

impl fmt::Display for YoloAnnotation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} {} {} {}",
            self.class_id, self.center_x, self.center_y, self.width, self.height
        )
    }
}

/// Encode a box against the project class list and the source image
/// dimensions.
pub fn encode_box(bbox: &BBox, classes: &[String], img_w: u32, img_h: u32) -> YoloAnnotation {
    let class_id = classes
        .iter()
        .position(|c| c == &bbox.name)
        .unwrap_or(UNKNOWN_CLASS_ID);

    let (w, h) = (img_w as f32, img_h as f32);
    YoloAnnotation {
        class_id,
        center_x: (bbox.rect.x + bbox.rect.w / 2.0) / w,
        center_y: (bbox.rect.y + bbox.rect.h / 2.0) / h,
        width: bbox.rect.w / w,
        height: bbox.rect.h / h,
    }
}

/// Expand a YOLO line back to an absolute-coordinate box. The sentinel
/// class index, or any index past the end of the class list, maps to
/// the default label.
pub fn decode_annotation(
    annotation: &YoloAnnotation,
    classes: &[String],
    img_w: u32,
    img_h: u32,
) -> BBox {
    let name = classes
        .get(annotation.class_id)
        .map(String::as_str)
        .unwrap_or(DEFAULT_BOX_LABEL);

    let (w, h) = (img_w as f32, img_h as f32);
    let box_w = annotation.width * w;
    let box_h = annotation.height * h;
    let rect = Rect::new(
        annotation.center_x * w - box_w / 2.0,
        annotation.center_y * h - box_h / 2.0,
        box_w,
        box_h,
    );

    BBox::with_name(rect, name)
}

/// Parse one annotation line; exactly five space-separated fields.
pub fn parse_line(line: &str) -> Result<YoloAnnotation> {
    let fields: Vec<&str> = line.split_whitespace().collect();
    if fields.len() != 5 {
        bail!("expected 5 fields, found {}: {line:?}", fields.len());
    }

    Ok(YoloAnnotation {
        class_id: fields[0].parse().context("bad class id")?,
        center_x: fields[1].parse().context("bad center x")?,
        center_y: fields[2].parse().context("bad center y")?,
        width: fields[3].parse().context("bad width")?,
        height: fields[4].parse().context("bad height")?,
    })
}

/// Read a classes.txt file, one class name per line.
pub fn read_classes(path: &Path) -> Result<Vec<String>> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("reading class file {}", path.display()))?;
    Ok(text.lines().map(str::to_string).collect())
}

/// Write a classes.txt file, one class name per line in index order.
pub fn write_classes(path: &Path, classes: &[String]) -> Result<()> {
    let mut text = String::new();
    for class in classes {
        text.push_str(class);
        text.push('\n');
    }
    std::fs::write(path, text)?;
    Ok(())
}

/// Encode all boxes of one image. Returns `None` when the image has no
/// boxes; callers surface that to the user instead of writing an empty
/// file.
pub fn build_annotations(entry: &ImageEntry, classes: &[String]) -> Result<Option<Vec<YoloAnnotation>>> {
    if entry.bboxes.is_empty() {
        return Ok(None);
    }

    let (img_w, img_h) = image::image_dimensions(&entry.file_path)
        .with_context(|| format!("reading dimensions of {}", entry.file_path.display()))?;

    let annotations = entry
        .bboxes
        .iter()
        .map(|bbox| encode_box(bbox, classes, img_w, img_h))
        .collect();
    Ok(Some(annotations))
}

fn write_annotation_file(path: &Path, annotations: &[YoloAnnotation]) -> Result<()> {
    let mut text = String::new();
    for annotation in annotations {
        text.push_str(&annotation.to_string());
        text.push('\n');
    }
    std::fs::write(path, text)?;
    Ok(())
}

/// Export one image's annotations as `<file_name>.txt` plus
/// `classes.txt` into `dir`.
pub fn export_annotations(dir: &Path, entry: &ImageEntry, classes: &[String]) -> Result<bool> {
    let Some(annotations) = build_annotations(entry, classes)? else {
        return Ok(false);
    };

    write_annotation_file(&dir.join(format!("{}.txt", entry.file_name)), &annotations)?;
    write_classes(&dir.join("classes.txt"), classes)?;
    log::info!("Exported {} YOLO annotations for {}", annotations.len(), entry.file_name);
    Ok(true)
}

/// Export the whole project as a YOLO dataset: source images copied to
/// `images/`, one label file per image under `annotations/`, and
/// `classes.txt` at the root. Images without boxes are skipped.
/// Returns the number of images exported.
pub fn export_project<'a>(
    dir: &Path,
    entries: impl Iterator<Item = &'a ImageEntry>,
    classes: &[String],
) -> Result<usize> {
    let images_dir = dir.join("images");
    let annotations_dir = dir.join("annotations");
    std::fs::create_dir_all(&images_dir)?;
    std::fs::create_dir_all(&annotations_dir)?;

    let mut exported = 0;
    for entry in entries {
        let Some(annotations) = build_annotations(entry, classes)? else {
            continue;
        };

        write_annotation_file(
            &annotations_dir.join(format!("{}.txt", entry.file_name)),
            &annotations,
        )?;

        let target = match entry.file_path.file_name() {
            Some(name) => images_dir.join(name),
            None => images_dir.join(&entry.file_name),
        };
        std::fs::copy(&entry.file_path, target)?;
        exported += 1;
    }

    write_classes(&dir.join("classes.txt"), classes)?;
    log::info!("Exported YOLO dataset with {exported} images to {}", dir.display());
    Ok(exported)
}

/// Import a YOLO dataset directory.
///
/// The root must contain `images/` and `annotations/` subdirectories
/// with matching file counts; files are paired positionally after
/// natural-sort ordering. Structural problems abort the whole import;
/// an unreadable image or label pair is skipped and the rest of the
/// batch continues.
pub fn import_dataset(
    root: &Path,
    classes_path: &Path,
) -> std::result::Result<(Vec<ImageEntry>, Vec<String>), Notice> {
    let classes = read_classes(classes_path).map_err(|e| {
        Notice::new(
            "Error importing dataset",
            format!("The class file could not be read: {e}."),
        )
    })?;

    let images_dir = root.join("images");
    let annotations_dir = root.join("annotations");
    if !images_dir.is_dir() || !annotations_dir.is_dir() {
        return Err(Notice::new(
            "Invalid Directory structure",
            "The selected directory has an invalid folder structure. \
             Images need to be in /images, labels in /annotations.",
        ));
    }

    let images = sorted_dir_entries(&images_dir, None).map_err(structural_error)?;
    let labels = sorted_dir_entries(&annotations_dir, Some("txt")).map_err(structural_error)?;

    if images.len() != labels.len() {
        return Err(Notice::new(
            "Images and Labels don't match",
            "The number of images and labels don't match.",
        ));
    }

    let mut entries = Vec::new();
    for (image_path, label_path) in images.iter().zip(&labels) {
        match import_pair(image_path, label_path, &classes) {
            Ok(entry) => entries.push(entry),
            Err(e) => log::warn!("Skipping {}: {e}", image_path.display()),
        }
    }

    Ok((entries, classes))
}

fn structural_error(e: anyhow::Error) -> Notice {
    Notice::new("Error importing dataset", format!("{e}."))
}

fn import_pair(image_path: &Path, label_path: &Path, classes: &[String]) -> Result<ImageEntry> {
    let (img_w, img_h) = image::image_dimensions(image_path)?;
    let text = std::fs::read_to_string(label_path)?;

    let mut entry = ImageEntry::new(image_path);
    for line in text.lines().filter(|l| !l.trim().is_empty()) {
        let annotation = parse_line(line)?;
        entry
            .bboxes
            .push(decode_annotation(&annotation, classes, img_w, img_h));
    }
    Ok(entry)
}

fn sorted_dir_entries(dir: &Path, extension: Option<&str>) -> Result<Vec<std::path::PathBuf>> {
    let mut paths = Vec::new();
    for item in std::fs::read_dir(dir)? {
        let path = item?.path();
        if !path.is_file() {
            continue;
        }
        if let Some(wanted) = extension {
            if path.extension().and_then(|e| e.to_str()) != Some(wanted) {
                continue;
            }
        }
        paths.push(path);
    }

    paths.sort_by(|a, b| natural_cmp(&a.to_string_lossy(), &b.to_string_lossy()));
    Ok(paths)
}

/// Compare strings so that embedded numbers order numerically:
/// `img2 < img10`.
pub fn natural_cmp(a: &str, b: &str) -> Ordering {
    let mut ca = a.chars().peekable();
    let mut cb = b.chars().peekable();

    loop {
        match (ca.peek().copied(), cb.peek().copied()) {
            (None, None) => return Ordering::Equal,
            (None, Some(_)) => return Ordering::Less,
            (Some(_), None) => return Ordering::Greater,
            (Some(x), Some(y)) => {
                if x.is_ascii_digit() && y.is_ascii_digit() {
                    let na = take_number(&mut ca);
                    let nb = take_number(&mut cb);
                    match na.cmp(&nb) {
                        Ordering::Equal => {}
                        other => return other,
                    }
                } else {
                    match x.cmp(&y) {
                        Ordering::Equal => {
                            ca.next();
                            cb.next();
                        }
                        other => return other,
                    }
                }
            }
        }
    }
}

fn take_number(chars: &mut std::iter::Peekable<std::str::Chars>) -> u64 {
    let mut value: u64 = 0;
    while let Some(c) = chars.peek().copied() {
        if let Some(digit) = c.to_digit(10) {
            value = value.saturating_mul(10).saturating_add(digit as u64);
            chars.next();
        } else {
            break;
        }
    }
    value
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classes() -> Vec<String> {
        vec!["cat".to_string(), "dog".to_string()]
    }

    #[test]
    fn test_encode_known_and_unknown_labels() {
        let known = BBox::with_name(Rect::new(10.0, 20.0, 100.0, 50.0), "dog");
        let encoded = encode_box(&known, &classes(), 640, 480);
        assert_eq!(encoded.class_id, 1);

        let unknown = BBox::with_name(Rect::new(10.0, 20.0, 100.0, 50.0), "giraffe");
        let encoded = encode_box(&unknown, &classes(), 640, 480);
        assert_eq!(encoded.class_id, UNKNOWN_CLASS_ID);
    }

    #[test]
    fn test_encode_normalizes_center_and_size() {
        let bbox = BBox::with_name(Rect::new(160.0, 120.0, 320.0, 240.0), "cat");
        let encoded = encode_box(&bbox, &classes(), 640, 480);

        assert_eq!(encoded.center_x, 0.5);
        assert_eq!(encoded.center_y, 0.5);
        assert_eq!(encoded.width, 0.5);
        assert_eq!(encoded.height, 0.5);
    }

    #[test]
    fn test_round_trip_preserves_rect_and_label() {
        let original = BBox::with_name(Rect::new(17.0, 43.0, 211.0, 98.0), "cat");
        let line = encode_box(&original, &classes(), 1920, 1080).to_string();
        let decoded = decode_annotation(&parse_line(&line).unwrap(), &classes(), 1920, 1080);

        assert_eq!(decoded.name, "cat");
        assert!((decoded.rect.x - original.rect.x).abs() < 1e-2);
        assert!((decoded.rect.y - original.rect.y).abs() < 1e-2);
        assert!((decoded.rect.w - original.rect.w).abs() < 1e-2);
        assert!((decoded.rect.h - original.rect.h).abs() < 1e-2);
    }

    #[test]
    fn test_decode_sentinel_and_out_of_range_fall_back() {
        let annotation = YoloAnnotation {
            class_id: UNKNOWN_CLASS_ID,
            center_x: 0.5,
            center_y: 0.5,
            width: 0.1,
            height: 0.1,
        };
        assert_eq!(
            decode_annotation(&annotation, &classes(), 100, 100).name,
            DEFAULT_BOX_LABEL
        );

        let out_of_range = YoloAnnotation {
            class_id: 7,
            ..annotation
        };
        assert_eq!(
            decode_annotation(&out_of_range, &classes(), 100, 100).name,
            DEFAULT_BOX_LABEL
        );

        // With no class list at all, everything falls back.
        let zero = YoloAnnotation {
            class_id: 0,
            ..annotation
        };
        assert_eq!(
            decode_annotation(&zero, &[], 100, 100).name,
            DEFAULT_BOX_LABEL
        );
    }

    #[test]
    fn test_parse_line_rejects_malformed_input() {
        assert!(parse_line("0 0.5 0.5 0.1").is_err());
        assert!(parse_line("0 0.5 0.5 0.1 0.1 0.9").is_err());
        assert!(parse_line("x 0.5 0.5 0.1 0.1").is_err());
        assert!(parse_line("").is_err());

        let parsed = parse_line("999 0.5 0.25 0.1 0.2").unwrap();
        assert_eq!(parsed.class_id, UNKNOWN_CLASS_ID);
        assert_eq!(parsed.height, 0.2);
    }

    #[test]
    fn test_natural_sort_orders_numbers_numerically() {
        let mut names = vec!["img10.png", "img2.png", "img1.png", "other.png"];
        names.sort_by(|a, b| natural_cmp(a, b));
        assert_eq!(names, vec!["img1.png", "img2.png", "img10.png", "other.png"]);
    }

    #[test]
    fn test_natural_sort_plain_strings() {
        assert_eq!(natural_cmp("abc", "abd"), Ordering::Less);
        assert_eq!(natural_cmp("abc", "abc"), Ordering::Equal);
        assert_eq!(natural_cmp("abcd", "abc"), Ordering::Greater);
    }
}

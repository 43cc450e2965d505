// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Media file loading and mask/crop export.
//!
//! This module handles loading image files into a form suitable for
//! egui texture upload, and writing inference results back to disk as
//! full masks or per-box cropped image/mask pairs.

use crate::models::annotation::Rect;
use crate::models::project::ImageEntry;
use anyhow::{Context, Result};
use image::{DynamicImage, GenericImageView, GrayImage, RgbaImage};
use std::path::Path;

/// Raw RGBA pixels ready for texture upload.
pub struct LoadedImage {
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<u8>,
}

/// Load an image file as RGBA for display.
pub fn load_image(path: &Path) -> Result<LoadedImage> {
    let image = image::open(path)
        .with_context(|| format!("loading image {}", path.display()))?
        .to_rgba8();

    Ok(LoadedImage {
        width: image.width(),
        height: image.height(),
        pixels: image.into_raw(),
    })
}

/// Convert a binary mask into a red RGBA overlay: opaque where the
/// mask is set, fully transparent elsewhere.
pub fn mask_overlay(mask: &GrayImage) -> LoadedImage {
    let mut overlay = RgbaImage::new(mask.width(), mask.height());
    for (src, dst) in mask.pixels().zip(overlay.pixels_mut()) {
        if src.0[0] > 0 {
            dst.0 = [220, 40, 40, 255];
        }
    }

    LoadedImage {
        width: overlay.width(),
        height: overlay.height(),
        pixels: overlay.into_raw(),
    }
}

/// Save an image's mask as `<file_name>_mask.jpg` in `dir`. Returns
/// false when the image has no generated mask.
pub fn export_mask(dir: &Path, entry: &ImageEntry) -> Result<bool> {
    let Some(mask) = &entry.mask.image else {
        return Ok(false);
    };

    let target = dir.join(format!("{}_mask.jpg", entry.file_name));
    mask.save(&target)
        .with_context(|| format!("saving mask to {}", target.display()))?;
    log::info!("Exported mask for {} to {}", entry.file_name, target.display());
    Ok(true)
}

/// Crop the region a box covers out of an image. The box rectangle is
/// in canvas coordinates; `offset` is the image's canvas position, so
/// the image-local origin is `rect - offset`, clamped to the image
/// bounds.
pub fn create_crop(image: &DynamicImage, rect: &Rect, offset: (f32, f32)) -> DynamicImage {
    let x = (rect.x - offset.0).max(0.0) as u32;
    let y = (rect.y - offset.1).max(0.0) as u32;
    let x = x.min(image.width().saturating_sub(1));
    let y = y.min(image.height().saturating_sub(1));
    let w = (rect.w as u32).min(image.width() - x).max(1);
    let h = (rect.h as u32).min(image.height() - y).max(1);

    image.crop_imm(x, y, w, h)
}

/// Export per-box crops of an image and its mask as
/// `<file_name>_<idx>.jpg` / `<file_name>_<idx>_mask.jpg` pairs.
/// Returns the number of crops written; zero when the image has no
/// mask or no boxes.
pub fn export_crops(dir: &Path, entry: &ImageEntry) -> Result<usize> {
    let Some(mask) = &entry.mask.image else {
        return Ok(0);
    };
    if entry.bboxes.is_empty() {
        return Ok(0);
    }

    let image = image::open(&entry.file_path)
        .with_context(|| format!("loading image {}", entry.file_path.display()))?;
    let mask = DynamicImage::ImageLuma8(mask.clone());
    let offset = (entry.x, entry.y);

    for (idx, bbox) in entry.bboxes.iter().enumerate() {
        let crop = create_crop(&image, &bbox.rect, offset);
        crop.to_rgb8()
            .save(dir.join(format!("{}_{idx}.jpg", entry.file_name)))?;

        let mask_crop = create_crop(&mask, &bbox.rect, (entry.mask.x, entry.mask.y));
        mask_crop
            .to_luma8()
            .save(dir.join(format!("{}_{idx}_mask.jpg", entry.file_name)))?;
    }

    log::info!(
        "Exported {} crop pairs for {}",
        entry.bboxes.len(),
        entry.file_name
    );
    Ok(entry.bboxes.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Luma;

    #[test]
    fn test_mask_overlay_is_transparent_outside_mask() {
        let mut mask = GrayImage::new(2, 1);
        mask.put_pixel(0, 0, Luma([255]));

        let overlay = mask_overlay(&mask);
        assert_eq!(overlay.width, 2);
        assert_eq!(overlay.height, 1);
        // First pixel opaque red, second fully transparent.
        assert_eq!(overlay.pixels[3], 255);
        assert_eq!(overlay.pixels[7], 0);
    }

    #[test]
    fn test_create_crop_respects_image_offset() {
        let image = DynamicImage::new_rgb8(100, 100);
        // Image drawn at canvas (30, 40); a box at canvas (50, 60)
        // maps to image-local (20, 20).
        let rect = Rect::new(50.0, 60.0, 10.0, 20.0);
        let crop = create_crop(&image, &rect, (30.0, 40.0));
        assert_eq!(crop.dimensions(), (10, 20));
    }

    #[test]
    fn test_create_crop_clamps_to_bounds() {
        let image = DynamicImage::new_rgb8(50, 50);
        // Box extends past the right and bottom image edges.
        let rect = Rect::new(40.0, 45.0, 30.0, 30.0);
        let crop = create_crop(&image, &rect, (0.0, 0.0));
        assert_eq!(crop.dimensions(), (10, 5));

        // Box entirely above-left of the image clamps to origin.
        let rect = Rect::new(-100.0, -100.0, 20.0, 20.0);
        let crop = create_crop(&image, &rect, (0.0, 0.0));
        assert_eq!(crop.dimensions(), (20, 20));
    }
}

// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Coordinate transform engine for the SAM encoder input.
//!
//! The encoder expects a fixed 1024x1024 CHW tensor: the image is
//! resized so its longer side is 1024 (aspect preserved), normalized
//! per channel, and zero-padded on the bottom or right to square.
//! Prompt coordinates are translated by the entry's display offset and
//! rescaled into the resized (pre-padding) space.

use image::{imageops, RgbImage};
use ndarray::Array4;

/// Side length of the square encoder input.
pub const MODEL_INPUT_SIDE: u32 = 1024;

/// Per-channel pixel mean the SAM encoder was trained with.
pub const PIXEL_MEAN: [f32; 3] = [123.675, 116.28, 103.53];
/// Per-channel pixel standard deviation.
pub const PIXEL_STD: [f32; 3] = [58.395, 57.12, 57.375];

/// Resized dimensions for an original (w, h): the longer side becomes
/// [`MODEL_INPUT_SIDE`], the shorter is `round(1024 / long * short)`.
///
/// A zero-sized original violates the caller's contract.
pub fn resized_dims(orig_w: u32, orig_h: u32) -> (u32, u32) {
    assert!(
        orig_w > 0 && orig_h > 0,
        "image dimensions must be non-zero, got {orig_w}x{orig_h}"
    );

    let side = MODEL_INPUT_SIDE as f32;
    if orig_w > orig_h {
        let h = (side / orig_w as f32 * orig_h as f32).round() as u32;
        (MODEL_INPUT_SIDE, h)
    } else {
        let w = (side / orig_h as f32 * orig_w as f32).round() as u32;
        (w, MODEL_INPUT_SIDE)
    }
}

/// Build the normalized, padded `1x3x1024x1024` encoder input tensor.
///
/// Returns the tensor together with the resized (pre-padding)
/// dimensions needed to rescale prompt coordinates.
pub fn image_tensor(image: &RgbImage) -> (Array4<f32>, (u32, u32)) {
    let (orig_w, orig_h) = image.dimensions();
    let (resized_w, resized_h) = resized_dims(orig_w, orig_h);

    let resized = imageops::resize(image, resized_w, resized_h, imageops::FilterType::Triangle);

    // Zero-initialized, so the bottom/right padding stays zero after
    // only the resized region is filled (the padding is applied after
    // normalization, not before).
    let side = MODEL_INPUT_SIDE as usize;
    let mut tensor = Array4::<f32>::zeros((1, 3, side, side));

    for (x, y, pixel) in resized.enumerate_pixels() {
        for channel in 0..3 {
            tensor[[0, channel, y as usize, x as usize]] =
                (pixel[channel] as f32 - PIXEL_MEAN[channel]) / PIXEL_STD[channel];
        }
    }

    (tensor, (resized_w, resized_h))
}

/// Map a canvas-space point into the resized model input space.
///
/// `offset` is the image entry's display offset; the point is first
/// translated back by it, then scaled per axis by `resized / original`.
pub fn rescale_point(
    point: (f32, f32),
    offset: (f32, f32),
    resized: (u32, u32),
    original: (u32, u32),
) -> (f32, f32) {
    assert!(
        original.0 > 0 && original.1 > 0,
        "image dimensions must be non-zero"
    );

    let x = point.0 - offset.0;
    let y = point.1 - offset.1;
    (
        x * resized.0 as f32 / original.0 as f32,
        y * resized.1 as f32 / original.1 as f32,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resized_dims_landscape() {
        // 2000x1000: long side pinned to 1024, short side rounded.
        assert_eq!(resized_dims(2000, 1000), (1024, 512));
        // 1920x1080: 1024/1920*1080 = 576.0
        assert_eq!(resized_dims(1920, 1080), (1024, 576));
    }

    #[test]
    fn test_resized_dims_portrait_and_square() {
        assert_eq!(resized_dims(1000, 2000), (512, 1024));
        assert_eq!(resized_dims(640, 640), (1024, 1024));
    }

    #[test]
    fn test_resized_dims_rounds_not_truncates() {
        // 1024/1000*999 = 1022.976 -> 1023 (truncation would give 1022).
        assert_eq!(resized_dims(1000, 999), (1024, 1023));
    }

    #[test]
    #[should_panic(expected = "non-zero")]
    fn test_zero_dimension_fails_fast() {
        resized_dims(0, 100);
    }

    #[test]
    fn test_tensor_shape_and_padding() {
        let image = RgbImage::from_pixel(100, 50, image::Rgb([255, 255, 255]));
        let (tensor, (rw, rh)) = image_tensor(&image);

        assert_eq!(tensor.shape(), &[1, 3, 1024, 1024]);
        assert_eq!((rw, rh), (1024, 512));

        // Inside the resized region: normalized white.
        let expected = (255.0 - PIXEL_MEAN[0]) / PIXEL_STD[0];
        assert!((tensor[[0, 0, 0, 0]] - expected).abs() < 1e-5);

        // Below the resized region: zero padding, not normalized black.
        assert_eq!(tensor[[0, 0, 512, 0]], 0.0);
        assert_eq!(tensor[[0, 1, 1023, 1023]], 0.0);
    }

    #[test]
    fn test_rescale_point_undoes_offset_then_scales() {
        // Image dragged to (+30, -10); an anchor at canvas (130, 40)
        // sits at image pixel (100, 50).
        let (x, y) = rescale_point((130.0, 40.0), (30.0, -10.0), (1024, 512), (2000, 1000));
        assert!((x - 100.0 * 1024.0 / 2000.0).abs() < 1e-4);
        assert!((y - 50.0 * 512.0 / 1000.0).abs() < 1e-4);
    }
}

// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Mask-to-box fitting via contour extraction.
//!
//! When "auto-fit box" is enabled, the box returned for a run is the
//! bounding rectangle of the largest-area contour of the thresholded
//! mask, rather than the user's hand-drawn prompt rectangle.

use super::InferenceError;
use crate::models::annotation::Rect;
use image::GrayImage;
use imageproc::contours::{find_contours, Contour};
use imageproc::point::Point;

/// Fit a rectangle to the largest foreground region of `mask`.
///
/// Pixels > 0 count as foreground. Largest means strictly greatest
/// contour area; an all-background mask is an explicit error, never a
/// silent fallback box.
pub fn largest_contour_rect(mask: &GrayImage) -> Result<Rect, InferenceError> {
    let binary = GrayImage::from_fn(mask.width(), mask.height(), |x, y| {
        if mask.get_pixel(x, y)[0] > 0 {
            image::Luma([255u8])
        } else {
            image::Luma([0u8])
        }
    });

    let contours: Vec<Contour<i32>> = find_contours(&binary);
    let largest = contours
        .iter()
        .max_by(|a, b| {
            contour_area(&a.points)
                .partial_cmp(&contour_area(&b.points))
                .unwrap_or(std::cmp::Ordering::Equal)
        })
        .ok_or(InferenceError::EmptyMask)?;

    Ok(bounding_rect(&largest.points))
}

/// Polygon area of a contour via the shoelace formula.
fn contour_area(points: &[Point<i32>]) -> f64 {
    if points.len() < 3 {
        return 0.0;
    }

    let mut sum = 0i64;
    for i in 0..points.len() {
        let a = points[i];
        let b = points[(i + 1) % points.len()];
        sum += a.x as i64 * b.y as i64 - b.x as i64 * a.y as i64;
    }
    (sum.abs() as f64) / 2.0
}

/// Pixel-inclusive bounding rectangle of a point set.
fn bounding_rect(points: &[Point<i32>]) -> Rect {
    let mut min_x = i32::MAX;
    let mut min_y = i32::MAX;
    let mut max_x = i32::MIN;
    let mut max_y = i32::MIN;

    for p in points {
        min_x = min_x.min(p.x);
        min_y = min_y.min(p.y);
        max_x = max_x.max(p.x);
        max_y = max_y.max(p.y);
    }

    Rect::new(
        min_x as f32,
        min_y as f32,
        (max_x - min_x + 1) as f32,
        (max_y - min_y + 1) as f32,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mask_with_blocks(blocks: &[(u32, u32, u32, u32)]) -> GrayImage {
        let mut mask = GrayImage::new(64, 64);
        for &(x, y, w, h) in blocks {
            for py in y..y + h {
                for px in x..x + w {
                    mask.put_pixel(px, py, image::Luma([255]));
                }
            }
        }
        mask
    }

    #[test]
    fn test_empty_mask_is_an_error() {
        let mask = GrayImage::new(32, 32);
        assert!(matches!(
            largest_contour_rect(&mask),
            Err(InferenceError::EmptyMask)
        ));
    }

    #[test]
    fn test_single_block_bounding_rect() {
        let mask = mask_with_blocks(&[(10, 12, 20, 8)]);
        let rect = largest_contour_rect(&mask).unwrap();
        assert_eq!((rect.x, rect.y), (10.0, 12.0));
        assert_eq!((rect.w, rect.h), (20.0, 8.0));
    }

    #[test]
    fn test_largest_of_two_regions_wins() {
        let mask = mask_with_blocks(&[(2, 2, 4, 4), (20, 20, 16, 12)]);
        let rect = largest_contour_rect(&mask).unwrap();
        assert_eq!((rect.x, rect.y), (20.0, 20.0));
        assert_eq!((rect.w, rect.h), (16.0, 12.0));
    }
}

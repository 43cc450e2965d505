// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Annotation data structures.
//!
//! This module defines the core data structures for representing
//! anchor points, bounding boxes, and generated masks.

use image::GrayImage;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// SAM point class for anchor prompts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PointLabel {
    Background,
    Foreground,
}

impl PointLabel {
    /// Numeric label the decoder expects (0 = background, 1 = foreground).
    pub fn as_f32(self) -> f32 {
        match self {
            PointLabel::Background => 0.0,
            PointLabel::Foreground => 1.0,
        }
    }
}

/// An axis-aligned rectangle in canvas pixel coordinates.
///
/// Width and height are always non-negative; construct with
/// [`Rect::from_corners`] to get that guarantee regardless of drag
/// direction.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub w: f32,
    pub h: f32,
}

impl Rect {
    pub fn new(x: f32, y: f32, w: f32, h: f32) -> Self {
        Self { x, y, w, h }
    }

    /// Build a rectangle from two opposite corners, reordering so that
    /// start <= end on both axes.
    pub fn from_corners(a: (f32, f32), b: (f32, f32)) -> Self {
        Self {
            x: a.0.min(b.0),
            y: a.1.min(b.1),
            w: (a.0 - b.0).abs(),
            h: (a.1 - b.1).abs(),
        }
    }

    pub fn right(&self) -> f32 {
        self.x + self.w
    }

    pub fn bottom(&self) -> f32 {
        self.y + self.h
    }

    pub fn contains(&self, px: f32, py: f32) -> bool {
        px >= self.x && px <= self.right() && py >= self.y && py <= self.bottom()
    }

    /// Same rectangle shifted by (dx, dy).
    pub fn translated(&self, dx: f32, dy: f32) -> Self {
        Self {
            x: self.x + dx,
            y: self.y + dy,
            ..*self
        }
    }
}

/// A labeled point prompt placed on an image.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Anchor {
    pub id: Uuid,
    pub label: PointLabel,
    pub active: bool,
    pub x: f32,
    pub y: f32,
}

impl Anchor {
    pub fn new(label: PointLabel, x: f32, y: f32) -> Self {
        Self {
            id: Uuid::new_v4(),
            label,
            active: true,
            x,
            y,
        }
    }
}

pub const DEFAULT_BOX_LABEL: &str = "BBox";

/// A rectangular annotation, drawn by the user or fitted from a mask.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BBox {
    pub id: Uuid,
    pub name: String,
    pub active: bool,
    pub rect: Rect,
}

impl BBox {
    pub fn new(rect: Rect) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: DEFAULT_BOX_LABEL.to_string(),
            active: true,
            rect,
        }
    }

    pub fn with_name(rect: Rect, name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::new(rect)
        }
    }
}

/// The generated segmentation mask for one image.
///
/// Replaced wholesale on each inference run; there is no per-box mask
/// history. The raster is `None` until the first run.
#[derive(Debug, Clone)]
pub struct Mask {
    pub id: Uuid,
    pub x: f32,
    pub y: f32,
    pub image: Option<GrayImage>,
}

impl Mask {
    pub fn empty() -> Self {
        Self {
            id: Uuid::new_v4(),
            x: 0.0,
            y: 0.0,
            image: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rect_from_corners_normalizes_drag_direction() {
        // Drag from bottom-right to top-left must match top-left to
        // bottom-right exactly.
        let forward = Rect::from_corners((10.0, 20.0), (110.0, 70.0));
        let backward = Rect::from_corners((110.0, 70.0), (10.0, 20.0));

        assert_eq!(forward, backward);
        assert_eq!(forward.x, 10.0);
        assert_eq!(forward.y, 20.0);
        assert_eq!(forward.w, 100.0);
        assert_eq!(forward.h, 50.0);
    }

    #[test]
    fn test_rect_from_corners_never_negative() {
        let r = Rect::from_corners((5.0, 5.0), (5.0, 5.0));
        assert_eq!(r.w, 0.0);
        assert_eq!(r.h, 0.0);

        let r = Rect::from_corners((50.0, 10.0), (10.0, 40.0));
        assert!(r.w >= 0.0 && r.h >= 0.0);
        assert_eq!((r.x, r.y), (10.0, 10.0));
    }

    #[test]
    fn test_rect_contains_edges() {
        let r = Rect::new(0.0, 0.0, 10.0, 10.0);
        assert!(r.contains(0.0, 0.0));
        assert!(r.contains(10.0, 10.0));
        assert!(!r.contains(10.1, 5.0));
    }
}

// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Geometric utility functions.
//!
//! Shared helpers for hit testing annotation primitives on the canvas.

use crate::models::annotation::Rect;

/// Squared distance between two points; avoids the sqrt for radius checks.
pub fn distance_sq(a: (f32, f32), b: (f32, f32)) -> f32 {
    let dx = a.0 - b.0;
    let dy = a.1 - b.1;
    dx * dx + dy * dy
}

/// True if `p` lies within `radius` of `center`.
pub fn within_radius(p: (f32, f32), center: (f32, f32), radius: f32) -> bool {
    distance_sq(p, center) <= radius * radius
}

/// Distance from a point to each rectangle edge, as (left, right, bottom, top).
pub fn edge_distances(rect: &Rect, px: f32, py: f32) -> (f32, f32, f32, f32) {
    (
        (rect.x - px).abs(),
        (rect.right() - px).abs(),
        (rect.bottom() - py).abs(),
        (rect.y - py).abs(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_within_radius() {
        assert!(within_radius((3.0, 4.0), (0.0, 0.0), 5.0));
        assert!(!within_radius((3.0, 4.0), (0.0, 0.0), 4.9));
    }

    #[test]
    fn test_edge_distances() {
        let rect = Rect::new(10.0, 20.0, 100.0, 50.0);
        let (left, right, bottom, top) = edge_distances(&rect, 12.0, 68.0);
        assert_eq!(left, 2.0);
        assert_eq!(right, 98.0);
        assert_eq!(bottom, 2.0);
        assert_eq!(top, 48.0);
    }
}

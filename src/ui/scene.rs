// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Annotation scene controller.
//!
//! Holds the live interaction state for the one selected image: the
//! active tool, the primitive arena (anchors/boxes with visibility and
//! highlight flags), the in-progress box drag, and the per-box
//! edge-resize state machine. The controller is independent of egui;
//! the canvas translates pointer events into calls here and the app
//! drains the emitted [`SceneEvent`]s into the project store.

use crate::models::annotation::{Anchor, BBox, PointLabel, Rect};
use crate::models::project::ImageEntry;
use crate::util::geometry::{edge_distances, within_radius};
use uuid::Uuid;

/// Pixel distance within which a press grabs a box edge.
pub const EDGE_GRAB_PX: f32 = 10.0;
/// Minimum box extent in a resized dimension.
pub const MIN_BOX_SIDE: f32 = EDGE_GRAB_PX + 1.0;
/// Hit radius for anchor markers.
pub const ANCHOR_HIT_PX: f32 = 6.0;

/// Current annotation tool.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tool {
    Selection,
    Anchor,
    Box,
}

/// A grabbed box edge during resize.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Edge {
    Left,
    Right,
    Bottom,
    Top,
}

/// One displayed primitive in the scene arena. Deactivated anchors
/// keep their slot with `visible = false` instead of being removed and
/// resurrected later.
#[derive(Debug, Clone)]
pub struct ScenePrimitive {
    pub id: Uuid,
    pub kind: PrimitiveKind,
    pub visible: bool,
}

#[derive(Debug, Clone)]
pub enum PrimitiveKind {
    Anchor { label: PointLabel, x: f32, y: f32 },
    Box { rect: Rect },
}

/// Typed events emitted for the project store. Geometry updates carry
/// the full replacement value, never a delta.
#[derive(Debug, Clone, PartialEq)]
pub enum SceneEvent {
    AnchorAdded(Anchor),
    BoxAdded(BBox),
    AnchorMoved { id: Uuid, x: f32, y: f32 },
    BoxMoved { id: Uuid, rect: Rect },
    ImageMoved { x: f32, y: f32 },
    ZoomChanged(f32),
}

#[derive(Debug, Clone)]
enum DragState {
    Idle,
    /// Box-tool rubber band between right-press and right-release.
    RubberBand { start: (f32, f32) },
    MoveAnchor {
        id: Uuid,
        grab: (f32, f32),
        origin: (f32, f32),
    },
    MoveBox {
        id: Uuid,
        grab: (f32, f32),
        origin: Rect,
    },
    ResizeBox {
        id: Uuid,
        edge: Edge,
        grab: (f32, f32),
        origin: Rect,
    },
    MoveImage {
        grab: (f32, f32),
        origin: (f32, f32),
    },
}

/// Scene state for the currently selected image.
pub struct SceneState {
    pub image_id: Option<Uuid>,
    pub tool: Tool,
    pub zoom: f32,
    pub image_offset: (f32, f32),
    pub selected: Option<Uuid>,
    primitives: Vec<ScenePrimitive>,
    drag: DragState,
    events: Vec<SceneEvent>,
}

impl Default for SceneState {
    fn default() -> Self {
        Self::new()
    }
}

impl SceneState {
    pub fn new() -> Self {
        Self {
            image_id: None,
            tool: Tool::Selection,
            zoom: 1.0,
            image_offset: (0.0, 0.0),
            selected: None,
            primitives: Vec::new(),
            drag: DragState::Idle,
            events: Vec::new(),
        }
    }

    /// Clear and fully repopulate from store data for one image.
    /// No incremental diffing: selection resets, hidden-state is
    /// rebuilt from the anchors' active flags.
    pub fn load_entry(&mut self, entry: &ImageEntry) {
        self.clear();
        self.image_id = Some(entry.id);
        self.zoom = entry.zoom;
        self.image_offset = (entry.x, entry.y);

        for anchor in &entry.anchors {
            self.primitives.push(ScenePrimitive {
                id: anchor.id,
                kind: PrimitiveKind::Anchor {
                    label: anchor.label,
                    x: anchor.x,
                    y: anchor.y,
                },
                visible: anchor.active,
            });
        }

        for bbox in &entry.bboxes {
            self.primitives.push(ScenePrimitive {
                id: bbox.id,
                kind: PrimitiveKind::Box { rect: bbox.rect },
                visible: true,
            });
        }
    }

    /// Drop everything, including invisible (deactivated) primitives.
    pub fn clear(&mut self) {
        self.image_id = None;
        self.selected = None;
        self.primitives.clear();
        self.drag = DragState::Idle;
        self.image_offset = (0.0, 0.0);
        self.zoom = 1.0;
    }

    pub fn set_tool(&mut self, tool: Tool) {
        self.tool = tool;
        self.drag = DragState::Idle;
    }

    pub fn primitives(&self) -> &[ScenePrimitive] {
        &self.primitives
    }

    pub fn take_events(&mut self) -> Vec<SceneEvent> {
        std::mem::take(&mut self.events)
    }

    /// A box-tool drag is in progress; existing primitives are frozen.
    pub fn is_rubber_banding(&self) -> bool {
        matches!(self.drag, DragState::RubberBand { .. })
    }

    /// Start corner of the in-progress box drag, for drawing the
    /// rubber band.
    pub fn rubber_band_start(&self) -> Option<(f32, f32)> {
        match self.drag {
            DragState::RubberBand { start } => Some(start),
            _ => None,
        }
    }

    pub fn set_visible(&mut self, id: Uuid, visible: bool) {
        for primitive in &mut self.primitives {
            if primitive.id == id {
                primitive.visible = visible;
            }
        }
    }

    pub fn remove(&mut self, id: Uuid) {
        self.primitives.retain(|p| p.id != id);
        if self.selected == Some(id) {
            self.selected = None;
        }
    }

    pub fn select(&mut self, id: Option<Uuid>) {
        self.selected = id;
    }

    // --- pointer input, all positions in scene (canvas) coordinates ---

    /// Left button pressed.
    pub fn on_primary_press(&mut self, pos: (f32, f32)) {
        match self.tool {
            Tool::Anchor => {
                // Left click places a foreground anchor at the press point.
                self.add_anchor(PointLabel::Foreground, pos);
            }
            Tool::Selection => self.begin_selection_drag(pos),
            Tool::Box => {}
        }
    }

    /// Right button pressed.
    pub fn on_secondary_press(&mut self, pos: (f32, f32)) {
        if self.tool == Tool::Box {
            // Freeze everything else for the duration of the drag.
            self.drag = DragState::RubberBand { start: pos };
        }
    }

    /// Pointer moved with a button held.
    pub fn on_pointer_drag(&mut self, pos: (f32, f32)) {
        match self.drag.clone() {
            DragState::Idle | DragState::RubberBand { .. } => {}
            DragState::MoveAnchor { id, grab, origin } => {
                let (x, y) = (origin.0 + pos.0 - grab.0, origin.1 + pos.1 - grab.1);
                self.set_anchor_position(id, x, y);
                self.events.push(SceneEvent::AnchorMoved { id, x, y });
            }
            DragState::MoveBox { id, grab, origin } => {
                let rect = origin.translated(pos.0 - grab.0, pos.1 - grab.1);
                self.set_box_rect(id, rect);
                self.events.push(SceneEvent::BoxMoved { id, rect });
            }
            DragState::ResizeBox {
                id,
                edge,
                grab,
                origin,
            } => {
                let rect = resize_edge(&origin, edge, grab, pos);
                self.set_box_rect(id, rect);
                self.events.push(SceneEvent::BoxMoved { id, rect });
            }
            DragState::MoveImage { grab, origin } => {
                let (x, y) = (origin.0 + pos.0 - grab.0, origin.1 + pos.1 - grab.1);
                self.image_offset = (x, y);
                self.events.push(SceneEvent::ImageMoved { x, y });
            }
        }
    }

    /// Left button released.
    pub fn on_primary_release(&mut self) {
        if !matches!(self.drag, DragState::RubberBand { .. }) {
            self.drag = DragState::Idle;
        }
    }

    /// Right button released.
    pub fn on_secondary_release(&mut self, pos: (f32, f32)) {
        match self.tool {
            Tool::Anchor => {
                // Right release places a background anchor; the
                // asymmetry matches the two SAM point classes.
                self.add_anchor(PointLabel::Background, pos);
            }
            Tool::Box => {
                if let DragState::RubberBand { start } = self.drag {
                    let rect = Rect::from_corners(start, pos);
                    let bbox = BBox::new(rect);
                    self.primitives.push(ScenePrimitive {
                        id: bbox.id,
                        kind: PrimitiveKind::Box { rect },
                        visible: true,
                    });
                    self.events.push(SceneEvent::BoxAdded(bbox));
                }
                self.drag = DragState::Idle;
            }
            Tool::Selection => {}
        }
    }

    pub fn on_zoom(&mut self, factor: f32) {
        self.zoom = (self.zoom * factor).clamp(0.05, 20.0);
        self.events.push(SceneEvent::ZoomChanged(self.zoom));
    }

    fn add_anchor(&mut self, label: PointLabel, pos: (f32, f32)) {
        let anchor = Anchor::new(label, pos.0, pos.1);
        self.primitives.push(ScenePrimitive {
            id: anchor.id,
            kind: PrimitiveKind::Anchor {
                label,
                x: pos.0,
                y: pos.1,
            },
            visible: true,
        });
        self.events.push(SceneEvent::AnchorAdded(anchor));
    }

    /// Hit-test for a selection-tool press: anchors first (they sit on
    /// top), then box edges, then box interiors, then the base image.
    fn begin_selection_drag(&mut self, pos: (f32, f32)) {
        for primitive in self.primitives.iter().rev() {
            if !primitive.visible {
                continue;
            }

            match &primitive.kind {
                PrimitiveKind::Anchor { x, y, .. } => {
                    if within_radius(pos, (*x, *y), ANCHOR_HIT_PX) {
                        self.selected = Some(primitive.id);
                        self.drag = DragState::MoveAnchor {
                            id: primitive.id,
                            grab: pos,
                            origin: (*x, *y),
                        };
                        return;
                    }
                }
                PrimitiveKind::Box { rect } => {
                    if let Some(edge) = hit_edge(rect, pos) {
                        self.selected = Some(primitive.id);
                        self.drag = DragState::ResizeBox {
                            id: primitive.id,
                            edge,
                            grab: pos,
                            origin: *rect,
                        };
                        return;
                    }
                    if rect.contains(pos.0, pos.1) {
                        self.selected = Some(primitive.id);
                        self.drag = DragState::MoveBox {
                            id: primitive.id,
                            grab: pos,
                            origin: *rect,
                        };
                        return;
                    }
                }
            }
        }

        self.selected = None;
        self.drag = DragState::MoveImage {
            grab: pos,
            origin: self.image_offset,
        };
    }

    fn set_anchor_position(&mut self, id: Uuid, x: f32, y: f32) {
        for primitive in &mut self.primitives {
            if primitive.id == id {
                if let PrimitiveKind::Anchor {
                    x: px, y: py, ..
                } = &mut primitive.kind
                {
                    *px = x;
                    *py = y;
                }
            }
        }
    }

    fn set_box_rect(&mut self, id: Uuid, rect: Rect) {
        for primitive in &mut self.primitives {
            if primitive.id == id {
                if let PrimitiveKind::Box { rect: r } = &mut primitive.kind {
                    *r = rect;
                }
            }
        }
    }
}

/// Which edge, if any, a press at `pos` grabs. Checked in a fixed
/// priority order (left, right, bottom, top); the first edge within
/// [`EDGE_GRAB_PX`] wins.
pub fn hit_edge(rect: &Rect, pos: (f32, f32)) -> Option<Edge> {
    let (left, right, bottom, top) = edge_distances(rect, pos.0, pos.1);
    let within_y = pos.1 >= rect.y - EDGE_GRAB_PX && pos.1 <= rect.bottom() + EDGE_GRAB_PX;
    let within_x = pos.0 >= rect.x - EDGE_GRAB_PX && pos.0 <= rect.right() + EDGE_GRAB_PX;

    if left < EDGE_GRAB_PX && within_y {
        Some(Edge::Left)
    } else if right < EDGE_GRAB_PX && within_y {
        Some(Edge::Right)
    } else if bottom < EDGE_GRAB_PX && within_x {
        Some(Edge::Bottom)
    } else if top < EDGE_GRAB_PX && within_x {
        Some(Edge::Top)
    } else {
        None
    }
}

/// Apply an edge drag: only the coordinate(s) governing the grabbed
/// edge change, clamped so the box keeps at least [`MIN_BOX_SIDE`] in
/// the affected dimension.
pub fn resize_edge(origin: &Rect, edge: Edge, grab: (f32, f32), pos: (f32, f32)) -> Rect {
    let dx = pos.0 - grab.0;
    let dy = pos.1 - grab.1;

    match edge {
        Edge::Left => {
            let x = (origin.x + dx).min(origin.right() - MIN_BOX_SIDE);
            Rect::new(x, origin.y, origin.right() - x, origin.h)
        }
        Edge::Right => {
            let right = (origin.right() + dx).max(origin.x + MIN_BOX_SIDE);
            Rect::new(origin.x, origin.y, right - origin.x, origin.h)
        }
        Edge::Top => {
            let y = (origin.y + dy).min(origin.bottom() - MIN_BOX_SIDE);
            Rect::new(origin.x, y, origin.w, origin.bottom() - y)
        }
        Edge::Bottom => {
            let bottom = (origin.bottom() + dy).max(origin.y + MIN_BOX_SIDE);
            Rect::new(origin.x, origin.y, origin.w, bottom - origin.y)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rect() -> Rect {
        Rect::new(10.0, 10.0, 100.0, 50.0)
    }

    #[test]
    fn test_hit_edge_priority_order() {
        // Near the left edge.
        assert_eq!(hit_edge(&rect(), (12.0, 30.0)), Some(Edge::Left));
        // Near the right edge.
        assert_eq!(hit_edge(&rect(), (105.0, 30.0)), Some(Edge::Right));
        // Near the bottom edge.
        assert_eq!(hit_edge(&rect(), (50.0, 58.0)), Some(Edge::Bottom));
        // Near the top edge.
        assert_eq!(hit_edge(&rect(), (50.0, 12.0)), Some(Edge::Top));
        // Interior, far from all edges.
        assert_eq!(hit_edge(&rect(), (60.0, 35.0)), None);
    }

    #[test]
    fn test_resize_right_edge_by_delta() {
        // Grab within 10px of the right edge, move the pointer right
        // by 20px: width grows to 120, everything else unchanged.
        let resized = resize_edge(&rect(), Edge::Right, (105.0, 30.0), (125.0, 30.0));
        assert_eq!(resized, Rect::new(10.0, 10.0, 120.0, 50.0));
    }

    #[test]
    fn test_resize_left_edge_moves_origin() {
        let resized = resize_edge(&rect(), Edge::Left, (12.0, 30.0), (2.0, 30.0));
        assert_eq!(resized, Rect::new(0.0, 10.0, 110.0, 50.0));
    }

    #[test]
    fn test_resize_clamps_to_minimum_size() {
        // Dragging the right edge far past the left edge clamps to the
        // minimum width instead of going negative.
        let resized = resize_edge(&rect(), Edge::Right, (110.0, 30.0), (-500.0, 30.0));
        assert_eq!(resized.w, MIN_BOX_SIDE);
        assert_eq!(resized.x, 10.0);

        let resized = resize_edge(&rect(), Edge::Top, (50.0, 10.0), (50.0, 500.0));
        assert_eq!(resized.h, MIN_BOX_SIDE);
        assert_eq!(resized.bottom(), 60.0);
    }

    #[test]
    fn test_resize_only_affects_grabbed_edge() {
        let resized = resize_edge(&rect(), Edge::Bottom, (50.0, 58.0), (45.0, 78.0));
        assert_eq!(resized.x, 10.0);
        assert_eq!(resized.y, 10.0);
        assert_eq!(resized.w, 100.0);
        assert_eq!(resized.h, 70.0);
    }

    #[test]
    fn test_anchor_tool_click_classes() {
        let mut scene = SceneState::new();
        scene.set_tool(Tool::Anchor);
        scene.on_primary_press((5.0, 6.0));
        scene.on_secondary_release((7.0, 8.0));

        let events = scene.take_events();
        assert_eq!(events.len(), 2);
        match &events[0] {
            SceneEvent::AnchorAdded(a) => {
                assert_eq!(a.label, PointLabel::Foreground);
                assert_eq!((a.x, a.y), (5.0, 6.0));
            }
            other => panic!("expected AnchorAdded, got {other:?}"),
        }
        match &events[1] {
            SceneEvent::AnchorAdded(a) => assert_eq!(a.label, PointLabel::Background),
            other => panic!("expected AnchorAdded, got {other:?}"),
        }
    }

    #[test]
    fn test_box_tool_drag_normalizes_direction() {
        let mut scene = SceneState::new();
        scene.set_tool(Tool::Box);

        // Drag bottom-right to top-left.
        scene.on_secondary_press((110.0, 70.0));
        assert!(scene.is_rubber_banding());
        scene.on_secondary_release((10.0, 20.0));

        let events = scene.take_events();
        match &events[0] {
            SceneEvent::BoxAdded(b) => {
                assert_eq!(b.rect, Rect::new(10.0, 20.0, 100.0, 50.0));
                assert!(b.rect.w >= 0.0 && b.rect.h >= 0.0);
            }
            other => panic!("expected BoxAdded, got {other:?}"),
        }
    }

    #[test]
    fn test_selection_drag_moves_box_as_full_rect() {
        let mut scene = SceneState::new();
        let bbox = BBox::new(rect());
        let id = bbox.id;
        scene.primitives.push(ScenePrimitive {
            id,
            kind: PrimitiveKind::Box { rect: rect() },
            visible: true,
        });

        // Interior grab falls through to a move, not a resize.
        scene.on_primary_press((60.0, 35.0));
        scene.on_pointer_drag((65.0, 40.0));

        let events = scene.take_events();
        assert_eq!(
            events.last(),
            Some(&SceneEvent::BoxMoved {
                id,
                rect: Rect::new(15.0, 15.0, 100.0, 50.0)
            })
        );
    }

    #[test]
    fn test_selection_edge_grab_resizes() {
        let mut scene = SceneState::new();
        let id = Uuid::new_v4();
        scene.primitives.push(ScenePrimitive {
            id,
            kind: PrimitiveKind::Box { rect: rect() },
            visible: true,
        });

        scene.on_primary_press((105.0, 30.0));
        scene.on_pointer_drag((125.0, 30.0));

        let events = scene.take_events();
        assert_eq!(
            events.last(),
            Some(&SceneEvent::BoxMoved {
                id,
                rect: Rect::new(10.0, 10.0, 120.0, 50.0)
            })
        );
    }

    #[test]
    fn test_empty_press_drags_image() {
        let mut scene = SceneState::new();
        scene.on_primary_press((200.0, 200.0));
        scene.on_pointer_drag((210.0, 195.0));

        let events = scene.take_events();
        assert_eq!(
            events.last(),
            Some(&SceneEvent::ImageMoved { x: 10.0, y: -5.0 })
        );
        assert_eq!(scene.image_offset, (10.0, -5.0));
    }

    #[test]
    fn test_hidden_anchor_keeps_identity() {
        let mut scene = SceneState::new();
        let anchor = Anchor::new(PointLabel::Foreground, 3.0, 3.0);
        let id = anchor.id;
        scene.primitives.push(ScenePrimitive {
            id,
            kind: PrimitiveKind::Anchor {
                label: anchor.label,
                x: 3.0,
                y: 3.0,
            },
            visible: true,
        });

        scene.set_visible(id, false);
        assert_eq!(scene.primitives().len(), 1);
        assert!(!scene.primitives()[0].visible);

        // Hidden primitives are not selectable.
        scene.on_primary_press((3.0, 3.0));
        assert_ne!(scene.selected, Some(id));

        scene.set_visible(id, true);
        assert_eq!(scene.primitives()[0].id, id);
        assert!(scene.primitives()[0].visible);
    }
}

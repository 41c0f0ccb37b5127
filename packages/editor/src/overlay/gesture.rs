//! Pointer gesture state machine.
//!
//! Exactly one gesture is active at a time:
//!
//! ```text
//! Idle ──pointer_down(target)──▶ DragImage | ResizeImage | ResizeRegion | Marquee
//!   ▲                                          │ pointer_move (preview)
//!   └──────────── pointer_up / cancel ─────────┘
//! ```
//!
//! Pointer input arrives in viewport coordinates and is divided by the
//! zoom, so a drag moves content 1:1 with the pointer at any zoom.

use super::floating::{resize_with_aspect, FloatingImageId, FloatingLayer};
use super::geometry::{Point, Rect, Size};
use super::handles::{resize_from_handle, HandlePosition, ResizePreview};
use super::layout::LayoutProvider;
use vellum_parser::NodeId;

const MIN_ZOOM: f64 = 0.05;

/// What the pointer went down on
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PointerTarget {
    /// Empty canvas: starts a marquee
    Canvas,
    /// An editable region: text selection, not a gesture
    Region(NodeId),
    Image(FloatingImageId),
    ImageResizeHandle(FloatingImageId),
    RegionHandle(NodeId, HandlePosition),
}

#[derive(Debug, Clone, PartialEq, Default)]
pub enum Gesture {
    #[default]
    Idle,
    DragImage {
        id: FloatingImageId,
        origin: Point,
        start: Point,
    },
    ResizeImage {
        id: FloatingImageId,
        origin: Point,
        start: Size,
    },
    ResizeRegion {
        node: NodeId,
        handle: HandlePosition,
        origin: Point,
        start: Size,
        preview: ResizePreview,
    },
    Marquee {
        origin: Point,
        current: Point,
    },
}

/// Result of releasing the pointer
#[derive(Debug, Clone, PartialEq)]
pub enum GestureOutcome {
    None,
    ImageMoved(FloatingImageId),
    ImageResized(FloatingImageId),
    RegionResized { node: NodeId, preview: ResizePreview },
    Marquee(Rect),
}

#[derive(Debug)]
pub struct GestureMachine {
    state: Gesture,
    zoom: f64,
}

impl Default for GestureMachine {
    fn default() -> Self {
        Self::new()
    }
}

impl GestureMachine {
    pub fn new() -> Self {
        Self {
            state: Gesture::Idle,
            zoom: 1.0,
        }
    }

    pub fn zoom(&self) -> f64 {
        self.zoom
    }

    pub fn set_zoom(&mut self, zoom: f64) {
        if zoom.is_finite() {
            self.zoom = zoom.max(MIN_ZOOM);
        }
    }

    pub fn to_document(&self, viewport: Point) -> Point {
        Point::new(viewport.x / self.zoom, viewport.y / self.zoom)
    }

    pub fn state(&self) -> &Gesture {
        &self.state
    }

    pub fn is_active(&self) -> bool {
        self.state != Gesture::Idle
    }

    /// Start a gesture. Ignored (returns false) while another gesture is
    /// active, and for targets that do not start one.
    pub fn pointer_down(
        &mut self,
        target: PointerTarget,
        viewport: Point,
        floating: &FloatingLayer,
        layout: &dyn LayoutProvider,
    ) -> bool {
        if self.is_active() {
            return false;
        }
        let origin = self.to_document(viewport);
        let next = match target {
            PointerTarget::Canvas => Gesture::Marquee {
                origin,
                current: origin,
            },
            PointerTarget::Region(_) => return false,
            PointerTarget::Image(id) => match floating.get(id) {
                Some(image) => Gesture::DragImage {
                    id,
                    origin,
                    start: image.position,
                },
                None => return false,
            },
            PointerTarget::ImageResizeHandle(id) => match floating.get(id) {
                Some(image) => Gesture::ResizeImage {
                    id,
                    origin,
                    start: image.size,
                },
                None => return false,
            },
            PointerTarget::RegionHandle(node, handle) => match layout.bounds(node) {
                Some(bounds) => Gesture::ResizeRegion {
                    node,
                    handle,
                    origin,
                    start: bounds.size(),
                    preview: resize_from_handle(bounds.size(), handle, 0.0, 0.0),
                },
                None => return false,
            },
        };
        self.state = next;
        true
    }

    /// Update the active gesture. Image gestures move the image directly;
    /// region resizes only update the preview.
    pub fn pointer_move(&mut self, viewport: Point, floating: &mut FloatingLayer) -> bool {
        let point = self.to_document(viewport);
        match &mut self.state {
            Gesture::Idle => false,
            Gesture::DragImage { id, origin, start } => {
                let position = start.offset(point.x - origin.x, point.y - origin.y);
                floating.set_position(*id, position)
            }
            Gesture::ResizeImage { id, origin, start } => {
                let Some(mode) = floating.get(*id).map(|image| image.aspect_mode) else {
                    return false;
                };
                let size = resize_with_aspect(*start, point.x - origin.x, point.y - origin.y, mode);
                floating.set_size(*id, size)
            }
            Gesture::ResizeRegion {
                handle,
                origin,
                start,
                preview,
                ..
            } => {
                *preview = resize_from_handle(*start, *handle, point.x - origin.x, point.y - origin.y);
                true
            }
            Gesture::Marquee { current, .. } => {
                *current = point;
                true
            }
        }
    }

    /// Finish the active gesture
    pub fn pointer_up(&mut self, viewport: Point, floating: &mut FloatingLayer) -> GestureOutcome {
        self.pointer_move(viewport, floating);
        match std::mem::take(&mut self.state) {
            Gesture::Idle => GestureOutcome::None,
            Gesture::DragImage { id, .. } => GestureOutcome::ImageMoved(id),
            Gesture::ResizeImage { id, .. } => GestureOutcome::ImageResized(id),
            Gesture::ResizeRegion { node, preview, .. } => GestureOutcome::RegionResized { node, preview },
            Gesture::Marquee { origin, current } => GestureOutcome::Marquee(Rect::from_points(origin, current)),
        }
    }

    /// Abandon the active gesture, putting images back where they started
    pub fn cancel(&mut self, floating: &mut FloatingLayer) {
        match std::mem::take(&mut self.state) {
            Gesture::DragImage { id, start, .. } => {
                floating.set_position(id, start);
            }
            Gesture::ResizeImage { id, start, .. } => {
                floating.set_size(id, start);
            }
            _ => {}
        }
    }

    /// Live preview of a region resize
    pub fn region_preview(&self) -> Option<(NodeId, ResizePreview)> {
        match &self.state {
            Gesture::ResizeRegion { node, preview, .. } => Some((*node, *preview)),
            _ => None,
        }
    }

    /// Live marquee rectangle in document coordinates
    pub fn marquee_rect(&self) -> Option<Rect> {
        match &self.state {
            Gesture::Marquee { origin, current } => Some(Rect::from_points(*origin, *current)),
            _ => None,
        }
    }
}

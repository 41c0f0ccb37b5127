//! Eight-point resize handles for the focused text region.
//!
//! Dragging previews a new size; north and west handles also shift the
//! element so the opposite edge stays put. Nothing is written until the
//! pointer is released.

use super::geometry::{Point, Rect, Size};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;
use vellum_parser::{Dom, NodeId};

use crate::style::format_px;

pub const MIN_REGION_WIDTH: f64 = 20.0;
pub const MIN_REGION_HEIGHT: f64 = 14.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum HandlePosition {
    North,
    NorthEast,
    East,
    SouthEast,
    South,
    SouthWest,
    West,
    NorthWest,
}

impl HandlePosition {
    pub const ALL: [HandlePosition; 8] = [
        HandlePosition::NorthWest,
        HandlePosition::North,
        HandlePosition::NorthEast,
        HandlePosition::East,
        HandlePosition::SouthEast,
        HandlePosition::South,
        HandlePosition::SouthWest,
        HandlePosition::West,
    ];

    fn moves_left(&self) -> bool {
        matches!(self, HandlePosition::West | HandlePosition::NorthWest | HandlePosition::SouthWest)
    }

    fn moves_right(&self) -> bool {
        matches!(self, HandlePosition::East | HandlePosition::NorthEast | HandlePosition::SouthEast)
    }

    fn moves_top(&self) -> bool {
        matches!(self, HandlePosition::North | HandlePosition::NorthEast | HandlePosition::NorthWest)
    }

    fn moves_bottom(&self) -> bool {
        matches!(self, HandlePosition::South | HandlePosition::SouthEast | HandlePosition::SouthWest)
    }

    /// Where the handle is drawn on a rectangle
    pub fn point_on(&self, rect: &Rect) -> Point {
        let x = if self.moves_left() {
            rect.x
        } else if self.moves_right() {
            rect.right()
        } else {
            rect.x + rect.width / 2.0
        };
        let y = if self.moves_top() {
            rect.y
        } else if self.moves_bottom() {
            rect.bottom()
        } else {
            rect.y + rect.height / 2.0
        };
        Point::new(x, y)
    }
}

/// Handle points for a region's bounding box
pub fn handle_points(rect: &Rect) -> Vec<(HandlePosition, Point)> {
    HandlePosition::ALL
        .iter()
        .map(|handle| (*handle, handle.point_on(rect)))
        .collect()
}

/// Uncommitted resize state
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResizePreview {
    pub width: f64,
    pub height: f64,
    /// Translation keeping the opposite edge anchored
    pub offset_x: f64,
    pub offset_y: f64,
}

/// Preview for dragging `handle` by `(dx, dy)` from the starting size
pub fn resize_from_handle(origin: Size, handle: HandlePosition, dx: f64, dy: f64) -> ResizePreview {
    let width = if handle.moves_right() {
        origin.width + dx
    } else if handle.moves_left() {
        origin.width - dx
    } else {
        origin.width
    }
    .max(MIN_REGION_WIDTH);

    let height = if handle.moves_bottom() {
        origin.height + dy
    } else if handle.moves_top() {
        origin.height - dy
    } else {
        origin.height
    }
    .max(MIN_REGION_HEIGHT);

    ResizePreview {
        width,
        height,
        offset_x: if handle.moves_left() { origin.width - width } else { 0.0 },
        offset_y: if handle.moves_top() { origin.height - height } else { 0.0 },
    }
}

fn translate_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"translate\(\s*(-?[\d.]+)(?:px)?\s*(?:,\s*(-?[\d.]+)(?:px)?)?\s*\)")
            .expect("translate regex is valid")
    })
}

/// Existing `translate(x, y)` of a transform value
pub fn parse_translate(transform: &str) -> Option<(f64, f64)> {
    let caps = translate_regex().captures(transform)?;
    let x = caps.get(1)?.as_str().parse::<f64>().ok()?;
    let y = caps
        .get(2)
        .and_then(|m| m.as_str().parse::<f64>().ok())
        .unwrap_or(0.0);
    Some((x, y))
}

/// Write a finished resize onto the element: width, height and an
/// accumulated translate. Returns false for stale nodes.
pub fn commit_region_resize(dom: &mut Dom, node: NodeId, preview: &ResizePreview) -> bool {
    if !dom.is_attached(node) {
        return false;
    }
    let Some(element) = dom.element_mut(node) else {
        return false;
    };
    element.set_style_property("width", format_px(preview.width));
    element.set_style_property("height", format_px(preview.height));

    let existing = element.style_property("transform");
    let (x, y) = existing
        .as_deref()
        .and_then(parse_translate)
        .unwrap_or((0.0, 0.0));
    let (x, y) = (x + preview.offset_x, y + preview.offset_y);
    if x == 0.0 && y == 0.0 && existing.is_none() {
        return true;
    }

    let translate = format!("translate({}, {})", format_px(x), format_px(y));
    let transform = match existing {
        Some(value) if translate_regex().is_match(&value) => {
            translate_regex().replace(&value, translate.as_str()).into_owned()
        }
        Some(value) => format!("{} {}", translate, value),
        None => translate,
    };
    element.set_style_property("transform", transform);
    true
}

use super::geometry::Rect;
use std::collections::HashMap;
use vellum_parser::NodeId;

/// Bounding boxes in document coordinates, supplied by whatever renders
/// the document
pub trait LayoutProvider {
    fn bounds(&self, node: NodeId) -> Option<Rect>;
}

/// Fixed boxes, for hosts that measure once and for tests
#[derive(Debug, Clone, Default)]
pub struct StaticLayout {
    boxes: HashMap<NodeId, Rect>,
}

impl StaticLayout {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, node: NodeId, rect: Rect) {
        self.boxes.insert(node, rect);
    }

    pub fn with(mut self, node: NodeId, rect: Rect) -> Self {
        self.insert(node, rect);
        self
    }
}

impl LayoutProvider for StaticLayout {
    fn bounds(&self, node: NodeId) -> Option<Rect> {
        self.boxes.get(&node).copied()
    }
}

use super::geometry::Rect;
use super::layout::LayoutProvider;
use crate::bindings::EditableRegion;
use vellum_parser::NodeId;

/// Regions whose boxes intersect the marquee, in document order.
/// Regions without a box are never hit.
pub fn marquee_hits(rect: &Rect, regions: &[EditableRegion], layout: &dyn LayoutProvider) -> Vec<NodeId> {
    regions
        .iter()
        .filter(|region| {
            layout
                .bounds(region.node)
                .map(|bounds| bounds.intersects(rect))
                .unwrap_or(false)
        })
        .map(|region| region.node)
        .collect()
}

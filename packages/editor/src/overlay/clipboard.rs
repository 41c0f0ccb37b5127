//! Single-slot clipboard for structural elements.
//!
//! The selected element carries `SELECTED_MARKER` so the host can style
//! it; the marker never reaches snapshots or the clipboard buffer.

use tracing::debug;
use vellum_parser::{parse_fragment, serialize_node, tags, Dom, NodeId, SerializeOptions};

/// Attribute marking the selected structural element
pub const SELECTED_MARKER: &str = "data-vellum-selected";

/// Serializer options that keep UI markers out of the output
pub fn clean_options() -> SerializeOptions {
    SerializeOptions::omitting(&[SELECTED_MARKER])
}

#[derive(Debug, Default)]
pub struct ElementClipboard {
    selected: Option<NodeId>,
    buffer: Option<String>,
}

impl ElementClipboard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Select an element, moving the marker from any previous one
    pub fn select(&mut self, dom: &mut Dom, node: NodeId) -> bool {
        if !dom.is_attached(node) || dom.element(node).is_none() || node == dom.root() {
            return false;
        }
        self.clear_selection(dom);
        if let Some(element) = dom.element_mut(node) {
            element.set_attr(SELECTED_MARKER, "");
        }
        self.selected = Some(node);
        true
    }

    /// The selected element, if still attached. A detached selection is
    /// dropped here.
    pub fn selected(&mut self, dom: &Dom) -> Option<NodeId> {
        match self.selected {
            Some(node) if dom.is_attached(node) => Some(node),
            Some(_) => {
                self.selected = None;
                None
            }
            None => None,
        }
    }

    pub fn clear_selection(&mut self, dom: &mut Dom) {
        if let Some(node) = self.selected.take() {
            if let Some(element) = dom.element_mut(node) {
                element.remove_attr(SELECTED_MARKER);
            }
        }
    }

    /// Forget the selection without touching the document (after a reparse)
    pub fn reset_selection(&mut self) {
        self.selected = None;
    }

    pub fn buffer(&self) -> Option<&str> {
        self.buffer.as_deref()
    }

    /// Copy the selected element's markup
    pub fn copy(&mut self, dom: &Dom) -> bool {
        let Some(node) = self.selected(dom) else {
            return false;
        };
        let markup = serialize_node(dom, node, &clean_options());
        debug!(bytes = markup.len(), "Copied element");
        self.buffer = Some(markup);
        true
    }

    /// Insert a copy of the buffer after the selected element, or at the
    /// end of the document. Returns the inserted top-level nodes.
    pub fn paste(&mut self, dom: &mut Dom) -> Vec<NodeId> {
        let Some(markup) = self.buffer.clone() else {
            return Vec::new();
        };
        let fragment = parse_fragment(&markup);
        let mut inserted = Vec::new();
        let mut anchor = self.selected(dom);
        for child in fragment.children(fragment.root()).to_vec() {
            let Some(copy) = dom.adopt_from(&fragment, child) else {
                continue;
            };
            if let Some(element) = dom.element_mut(copy) {
                element.remove_attr(SELECTED_MARKER);
            }
            let placed = match anchor.map(|reference| insertion_point(dom, reference, copy)) {
                Some(reference) => dom.insert_after(reference, copy),
                None => {
                    let root = dom.root();
                    dom.append(root, copy)
                }
            };
            if placed {
                anchor = Some(copy);
                inserted.push(copy);
            }
        }
        inserted
    }

    /// Remove the selected element from its parent
    pub fn delete(&mut self, dom: &mut Dom) -> bool {
        let Some(node) = self.selected(dom) else {
            return false;
        };
        if let Some(element) = dom.element_mut(node) {
            element.remove_attr(SELECTED_MARKER);
        }
        self.selected = None;
        dom.detach(node)
    }
}

/// Where `node` can go after `reference` without the markup reparsing
/// differently: a paragraph closer never lands inside a `<p>`.
fn insertion_point(dom: &Dom, reference: NodeId, node: NodeId) -> NodeId {
    let closes_paragraph = dom
        .element(node)
        .map(|element| tags::closes_paragraph(&element.tag))
        .unwrap_or(false);
    if !closes_paragraph {
        return reference;
    }
    dom.ancestors(reference)
        .into_iter()
        .filter(|ancestor| dom.is_element(*ancestor, "p"))
        .last()
        .unwrap_or(reference)
}

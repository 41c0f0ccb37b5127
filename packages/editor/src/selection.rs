//! # Selection Model
//!
//! Three sources feed a formatting operation:
//!
//! 1. the live text range reported by the host
//! 2. a `LastKnownSelection` captured before focus moved into a
//!    formatting control
//! 3. an explicit multi-region set (modifier-click or marquee)
//!
//! Saved ranges are validated lazily: a range whose nodes are detached,
//! or belong to an older parse, simply stops resolving.

use std::cmp::Ordering;
use vellum_parser::dom::char_len;
use vellum_parser::{Dom, NodeId};

/// Character offset inside a text node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TextPosition {
    pub node: NodeId,
    pub offset: usize,
}

impl TextPosition {
    pub fn new(node: NodeId, offset: usize) -> Self {
        Self { node, offset }
    }

    /// Attached text node with the offset in bounds
    pub fn is_valid(&self, dom: &Dom) -> bool {
        dom.is_attached(self.node)
            && dom
                .text(self.node)
                .map(|text| self.offset <= char_len(text))
                .unwrap_or(false)
    }
}

/// Anchor/focus pair as reported by the host. The anchor may come after
/// the focus.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextRange {
    pub anchor: TextPosition,
    pub focus: TextPosition,
}

impl TextRange {
    pub fn new(anchor: TextPosition, focus: TextPosition) -> Self {
        Self { anchor, focus }
    }

    pub fn caret(position: TextPosition) -> Self {
        Self::new(position, position)
    }

    pub fn is_collapsed(&self) -> bool {
        self.anchor == self.focus
    }

    pub fn is_valid(&self, dom: &Dom) -> bool {
        self.anchor.is_valid(dom) && self.focus.is_valid(dom)
    }

    /// Start and end in document order. `None` when either end is invalid.
    pub fn ordered(&self, dom: &Dom) -> Option<(TextPosition, TextPosition)> {
        if !self.is_valid(dom) {
            return None;
        }
        let order = if self.anchor.node == self.focus.node {
            self.anchor.offset.cmp(&self.focus.offset)
        } else {
            dom.compare_order(self.anchor.node, self.focus.node)?
        };
        Some(match order {
            Ordering::Greater => (self.focus, self.anchor),
            _ => (self.anchor, self.focus),
        })
    }

    /// Range spanning all text under `node`
    pub fn covering(dom: &Dom, node: NodeId) -> Option<TextRange> {
        let texts = dom.text_descendants(node);
        let first = *texts.first()?;
        let last = *texts.last()?;
        let end = dom.text(last).map(char_len)?;
        Some(TextRange::new(
            TextPosition::new(first, 0),
            TextPosition::new(last, end),
        ))
    }
}

/// A range remembered across focus changes. Invalid once its nodes leave
/// the document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LastKnownSelection {
    range: TextRange,
}

impl LastKnownSelection {
    pub fn capture(range: TextRange) -> Self {
        Self { range }
    }

    pub fn get(&self, dom: &Dom) -> Option<TextRange> {
        self.range.is_valid(dom).then_some(self.range)
    }
}

/// Ordered set of region elements selected as a group
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MultiSelection {
    nodes: Vec<NodeId>,
}

impl MultiSelection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or remove a region. Returns whether it is now selected.
    pub fn toggle(&mut self, node: NodeId) -> bool {
        match self.nodes.iter().position(|n| *n == node) {
            Some(index) => {
                self.nodes.remove(index);
                false
            }
            None => {
                self.nodes.push(node);
                true
            }
        }
    }

    pub fn replace(&mut self, nodes: Vec<NodeId>) {
        self.nodes.clear();
        for node in nodes {
            if !self.nodes.contains(&node) {
                self.nodes.push(node);
            }
        }
    }

    pub fn clear(&mut self) {
        self.nodes.clear();
    }

    pub fn contains(&self, node: NodeId) -> bool {
        self.nodes.contains(&node)
    }

    pub fn nodes(&self) -> &[NodeId] {
        &self.nodes
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Drop members no longer in the document
    pub fn prune(&mut self, dom: &Dom) {
        self.nodes.retain(|node| dom.is_attached(*node));
    }
}

/// What a formatting operation applies to
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedSelection {
    /// Non-collapsed primary range, in document order
    pub primary: Option<(TextPosition, TextPosition)>,
    /// Caret or anchor used for the format summary
    pub anchor: Option<TextPosition>,
    /// Regions receiving the operation on their full content
    pub secondary: Vec<NodeId>,
}

impl ResolvedSelection {
    pub fn is_empty(&self) -> bool {
        self.primary.is_none() && self.secondary.is_empty()
    }
}

#[derive(Debug, Default)]
pub struct SelectionState {
    live: Option<TextRange>,
    saved: Option<LastKnownSelection>,
    focus_in_control: bool,
    multi: MultiSelection,
}

impl SelectionState {
    pub fn new() -> Self {
        Self::default()
    }

    /// The host reported a new selection inside the canvas
    pub fn set_live(&mut self, range: TextRange) {
        self.live = Some(range);
        self.saved = Some(LastKnownSelection::capture(range));
        self.focus_in_control = false;
    }

    /// Focus moved into a toolbar control; the live range is gone but the
    /// saved one stays usable
    pub fn focus_control(&mut self) {
        self.live = None;
        self.focus_in_control = true;
    }

    pub fn focus_canvas(&mut self) {
        self.focus_in_control = false;
    }

    pub fn is_control_focused(&self) -> bool {
        self.focus_in_control
    }

    pub fn live(&self) -> Option<TextRange> {
        self.live
    }

    pub fn saved(&self) -> Option<LastKnownSelection> {
        self.saved
    }

    pub fn multi(&self) -> &MultiSelection {
        &self.multi
    }

    pub fn multi_mut(&mut self) -> &mut MultiSelection {
        &mut self.multi
    }

    /// Forget the text selection (escape, document replaced)
    pub fn clear_text(&mut self) {
        self.live = None;
        self.saved = None;
    }

    pub fn clear(&mut self) {
        self.clear_text();
        self.multi.clear();
        self.focus_in_control = false;
    }

    /// Drop anything that no longer resolves
    pub fn prune(&mut self, dom: &Dom) {
        if self.live.map(|r| !r.is_valid(dom)).unwrap_or(false) {
            self.live = None;
        }
        if self.saved.map(|s| s.get(dom).is_none()).unwrap_or(false) {
            self.saved = None;
        }
        self.multi.prune(dom);
    }

    /// Active range: the live one, else the saved one while focus sits in
    /// a formatting control
    pub fn active_range(&self, dom: &Dom) -> Option<TextRange> {
        match self.live {
            Some(range) if range.is_valid(dom) => Some(range),
            Some(_) => None,
            None if self.focus_in_control => self.saved.and_then(|saved| saved.get(dom)),
            None => None,
        }
    }

    /// Resolve the operation scope. `region_of` maps a text node to the
    /// region element containing it.
    pub fn resolve(&self, dom: &Dom, region_of: impl Fn(NodeId) -> Option<NodeId>) -> ResolvedSelection {
        let range = self.active_range(dom);
        let ordered = range.and_then(|r| r.ordered(dom));
        let anchor = range.map(|r| r.anchor);
        let primary = ordered.filter(|(start, end)| start != end);

        // Every region the primary range passes through, not just its ends
        let primary_regions: Vec<NodeId> = primary
            .map(|(start, end)| text_nodes_between(dom, start.node, end.node))
            .unwrap_or_default()
            .into_iter()
            .filter_map(&region_of)
            .collect();

        let secondary = self
            .multi
            .nodes()
            .iter()
            .copied()
            .filter(|node| dom.is_attached(*node) && !primary_regions.contains(node))
            .collect();

        ResolvedSelection {
            primary,
            anchor,
            secondary,
        }
    }
}

/// Text nodes from `start` through `end` in document order
pub(crate) fn text_nodes_between(dom: &Dom, start: NodeId, end: NodeId) -> Vec<NodeId> {
    let all = dom.text_descendants(dom.root());
    let (Some(first), Some(last)) = (
        all.iter().position(|n| *n == start),
        all.iter().position(|n| *n == end),
    ) else {
        return Vec::new();
    };
    if first > last {
        return Vec::new();
    }
    all[first..=last].to_vec()
}

#[cfg(test)]
mod tests {
    use super::*;
    use vellum_parser::parse_fragment;

    fn texts(dom: &Dom) -> Vec<NodeId> {
        dom.text_descendants(dom.root())
    }

    #[test]
    fn test_ordered_normalizes_backwards_range() {
        let dom = parse_fragment("<p>one</p><p>two</p>");
        let t = texts(&dom);
        let range = TextRange::new(TextPosition::new(t[1], 2), TextPosition::new(t[0], 1));
        let (start, end) = range.ordered(&dom).unwrap();
        assert_eq!(start, TextPosition::new(t[0], 1));
        assert_eq!(end, TextPosition::new(t[1], 2));
    }

    #[test]
    fn test_out_of_bounds_offset_invalid() {
        let dom = parse_fragment("<p>one</p>");
        let t = texts(&dom);
        assert!(!TextRange::caret(TextPosition::new(t[0], 4)).is_valid(&dom));
        assert!(TextRange::caret(TextPosition::new(t[0], 3)).is_valid(&dom));
    }

    #[test]
    fn test_saved_range_survives_focus_change() {
        let dom = parse_fragment("<p>hello</p>");
        let t = texts(&dom);
        let range = TextRange::new(TextPosition::new(t[0], 0), TextPosition::new(t[0], 5));

        let mut state = SelectionState::new();
        state.set_live(range);
        state.focus_control();
        assert_eq!(state.active_range(&dom), Some(range));

        state.focus_canvas();
        assert_eq!(state.active_range(&dom), None);
    }

    #[test]
    fn test_saved_range_invalidated_by_detach() {
        let mut dom = parse_fragment("<p>hello</p><p>bye</p>");
        let paragraph = dom.element_children(dom.root())[0];
        let t = texts(&dom);
        let mut state = SelectionState::new();
        state.set_live(TextRange::new(TextPosition::new(t[0], 0), TextPosition::new(t[0], 2)));
        state.focus_control();

        dom.detach(paragraph);
        assert_eq!(state.active_range(&dom), None);
        state.prune(&dom);
        assert!(state.saved().is_none());
    }

    #[test]
    fn test_saved_range_does_not_resolve_in_reparsed_document() {
        let dom = parse_fragment("<p>hello</p>");
        let t = texts(&dom);
        let saved = LastKnownSelection::capture(TextRange::caret(TextPosition::new(t[0], 1)));
        let reparsed = parse_fragment("<p>hello</p>");
        assert!(saved.get(&dom).is_some());
        assert!(saved.get(&reparsed).is_none());
    }

    #[test]
    fn test_resolve_excludes_primary_region_from_secondary() {
        let dom = parse_fragment("<p>one</p><p>two</p>");
        let paragraphs = dom.element_children(dom.root());
        let t = texts(&dom);

        let mut state = SelectionState::new();
        state.multi_mut().replace(paragraphs.clone());
        state.set_live(TextRange::new(TextPosition::new(t[0], 0), TextPosition::new(t[0], 2)));

        let resolved = state.resolve(&dom, |node| dom.parent(node));
        assert!(resolved.primary.is_some());
        assert_eq!(resolved.secondary, vec![paragraphs[1]]);
    }

    #[test]
    fn test_resolve_excludes_regions_inside_primary_range() {
        let dom = parse_fragment("<p>Alpha</p><p>Beta</p><p>Gamma</p><p>Delta</p>");
        let paragraphs = dom.element_children(dom.root());
        let t = texts(&dom);

        let mut state = SelectionState::new();
        state.multi_mut().replace(paragraphs.clone());
        state.set_live(TextRange::new(TextPosition::new(t[0], 0), TextPosition::new(t[2], 5)));

        let resolved = state.resolve(&dom, |node| dom.parent(node));
        assert_eq!(resolved.secondary, vec![paragraphs[3]]);
    }

    #[test]
    fn test_collapsed_primary_is_skipped() {
        let dom = parse_fragment("<p>one</p><p>two</p>");
        let paragraphs = dom.element_children(dom.root());
        let t = texts(&dom);

        let mut state = SelectionState::new();
        state.multi_mut().replace(paragraphs.clone());
        state.set_live(TextRange::caret(TextPosition::new(t[0], 1)));

        let resolved = state.resolve(&dom, |node| dom.parent(node));
        assert!(resolved.primary.is_none());
        assert_eq!(resolved.anchor, Some(TextPosition::new(t[0], 1)));
        assert_eq!(resolved.secondary, paragraphs);
    }

    #[test]
    fn test_multi_toggle() {
        let dom = parse_fragment("<p>one</p>");
        let p = dom.element_children(dom.root())[0];
        let mut multi = MultiSelection::new();
        assert!(multi.toggle(p));
        assert!(!multi.toggle(p));
        assert!(multi.is_empty());
    }
}

//! # Live DOM
//!
//! Arena-backed document tree used as the editable surface.
//!
//! Every `Dom` is stamped with a fresh epoch and every `NodeId` carries the
//! epoch of the tree that created it. Reparsing markup (undo, redo, restore)
//! produces a new `Dom`, so ids held from before the reparse simply stop
//! resolving instead of silently pointing at unrelated nodes.
//!
//! Detached nodes stay in the arena but are unreachable from the root;
//! `is_attached` is the only reliable liveness check. Slots are never
//! reused, so text splits and span wraps grow the arena until the next
//! reparse builds a fresh one. Compacting in place would renumber ids a
//! caller may still hold (selections, bindings), so the arena is bounded
//! by the edits made since the last undo, redo or restore.

use crate::css;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::sync::atomic::{AtomicU32, Ordering as AtomicOrdering};

static NEXT_EPOCH: AtomicU32 = AtomicU32::new(1);

/// Handle to a node inside a specific `Dom`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId {
    epoch: u32,
    index: u32,
}

impl NodeId {
    pub fn index(&self) -> usize {
        self.index as usize
    }
}

/// Node payload
#[derive(Debug, Clone, PartialEq)]
pub enum NodeData {
    /// Root container (never serialized itself)
    Document,
    Element(Element),
    Text(String),
    Comment(String),
    Doctype(String),
}

/// Element node payload. Tag and attribute names keep their source case
/// (SVG needs `viewBox`); comparisons are ASCII case-insensitive.
#[derive(Debug, Clone, PartialEq)]
pub struct Element {
    pub tag: String,
    pub attributes: Vec<(String, String)>,
}

impl Element {
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            attributes: Vec::new(),
        }
    }

    /// Lower-cased tag name
    pub fn name(&self) -> String {
        self.tag.to_ascii_lowercase()
    }

    pub fn is(&self, tag: &str) -> bool {
        self.tag.eq_ignore_ascii_case(tag)
    }

    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    pub fn has_attr(&self, name: &str) -> bool {
        self.attr(name).is_some()
    }

    pub fn set_attr(&mut self, name: &str, value: impl Into<String>) {
        let value = value.into();
        match self
            .attributes
            .iter_mut()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
        {
            Some((_, existing)) => *existing = value,
            None => self.attributes.push((name.to_string(), value)),
        }
    }

    pub fn remove_attr(&mut self, name: &str) -> Option<String> {
        let pos = self
            .attributes
            .iter()
            .position(|(key, _)| key.eq_ignore_ascii_case(name))?;
        Some(self.attributes.remove(pos).1)
    }

    pub fn classes(&self) -> impl DoubleEndedIterator<Item = &str> + '_ {
        self.attr("class").unwrap_or("").split_whitespace()
    }

    pub fn has_class(&self, class: &str) -> bool {
        self.classes().any(|c| c == class)
    }

    /// Replace the class list, dropping the attribute when empty
    pub fn set_classes<'a>(&mut self, classes: impl IntoIterator<Item = &'a str>) {
        let joined = classes.into_iter().collect::<Vec<_>>().join(" ");
        if joined.is_empty() {
            self.remove_attr("class");
        } else {
            self.set_attr("class", joined);
        }
    }

    /// Inline style declarations in source order
    pub fn style_declarations(&self) -> Vec<(String, String)> {
        self.attr("style")
            .map(css::parse_declarations)
            .unwrap_or_default()
    }

    pub fn style_property(&self, property: &str) -> Option<String> {
        self.style_declarations()
            .into_iter()
            .rev()
            .find(|(name, _)| name == property)
            .map(|(_, value)| value)
    }

    pub fn set_style_property(&mut self, property: &str, value: impl Into<String>) {
        let value = value.into();
        let mut decls = self.style_declarations();
        match decls.iter_mut().find(|(name, _)| name == property) {
            Some((_, existing)) => *existing = value,
            None => decls.push((property.to_string(), value)),
        }
        self.set_attr("style", css::serialize_declarations(&decls));
    }

    pub fn remove_style_property(&mut self, property: &str) {
        let mut decls = self.style_declarations();
        let before = decls.len();
        decls.retain(|(name, _)| name != property);
        if decls.len() == before {
            return;
        }
        if decls.is_empty() {
            self.remove_attr("style");
        } else {
            self.set_attr("style", css::serialize_declarations(&decls));
        }
    }
}

#[derive(Debug)]
struct Slot {
    data: NodeData,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

/// Arena document tree
#[derive(Debug)]
pub struct Dom {
    epoch: u32,
    slots: Vec<Slot>,
    root: NodeId,
}

impl Default for Dom {
    fn default() -> Self {
        Self::new()
    }
}

impl Dom {
    /// Create an empty tree holding only the document root
    pub fn new() -> Self {
        let epoch = NEXT_EPOCH.fetch_add(1, AtomicOrdering::Relaxed);
        let root = NodeId { epoch, index: 0 };
        Self {
            epoch,
            slots: vec![Slot {
                data: NodeData::Document,
                parent: None,
                children: Vec::new(),
            }],
            root,
        }
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    fn slot(&self, id: NodeId) -> Option<&Slot> {
        if id.epoch != self.epoch {
            return None;
        }
        self.slots.get(id.index())
    }

    fn slot_mut(&mut self, id: NodeId) -> Option<&mut Slot> {
        if id.epoch != self.epoch {
            return None;
        }
        self.slots.get_mut(id.index())
    }

    fn alloc(&mut self, data: NodeData) -> NodeId {
        let id = NodeId {
            epoch: self.epoch,
            index: self.slots.len() as u32,
        };
        self.slots.push(Slot {
            data,
            parent: None,
            children: Vec::new(),
        });
        id
    }

    /// Number of slots ever allocated, detached ones included
    pub fn arena_len(&self) -> usize {
        self.slots.len()
    }

    /// Whether the id was issued by this tree (attached or not)
    pub fn owns(&self, id: NodeId) -> bool {
        self.slot(id).is_some()
    }

    pub fn get(&self, id: NodeId) -> Option<&NodeData> {
        self.slot(id).map(|slot| &slot.data)
    }

    pub fn get_mut(&mut self, id: NodeId) -> Option<&mut NodeData> {
        self.slot_mut(id).map(|slot| &mut slot.data)
    }

    pub fn element(&self, id: NodeId) -> Option<&Element> {
        match self.get(id)? {
            NodeData::Element(element) => Some(element),
            _ => None,
        }
    }

    pub fn element_mut(&mut self, id: NodeId) -> Option<&mut Element> {
        match self.get_mut(id)? {
            NodeData::Element(element) => Some(element),
            _ => None,
        }
    }

    pub fn is_element(&self, id: NodeId, tag: &str) -> bool {
        self.element(id).map(|e| e.is(tag)).unwrap_or(false)
    }

    pub fn text(&self, id: NodeId) -> Option<&str> {
        match self.get(id)? {
            NodeData::Text(text) => Some(text),
            _ => None,
        }
    }

    /// Replace the content of a text node. Returns false for non-text nodes.
    pub fn set_text(&mut self, id: NodeId, content: impl Into<String>) -> bool {
        match self.get_mut(id) {
            Some(NodeData::Text(text)) => {
                *text = content.into();
                true
            }
            _ => false,
        }
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.slot(id)?.parent
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.slot(id).map(|slot| slot.children.as_slice()).unwrap_or(&[])
    }

    pub fn element_children(&self, id: NodeId) -> Vec<NodeId> {
        self.children(id)
            .iter()
            .copied()
            .filter(|child| self.element(*child).is_some())
            .collect()
    }

    pub fn create_element(&mut self, tag: impl Into<String>) -> NodeId {
        self.alloc(NodeData::Element(Element::new(tag)))
    }

    pub fn create_element_with(&mut self, element: Element) -> NodeId {
        self.alloc(NodeData::Element(element))
    }

    pub fn create_text(&mut self, content: impl Into<String>) -> NodeId {
        self.alloc(NodeData::Text(content.into()))
    }

    pub fn create_comment(&mut self, content: impl Into<String>) -> NodeId {
        self.alloc(NodeData::Comment(content.into()))
    }

    pub fn create_doctype(&mut self, content: impl Into<String>) -> NodeId {
        self.alloc(NodeData::Doctype(content.into()))
    }

    /// Whether `node` is `ancestor` or lies beneath it
    pub fn contains(&self, ancestor: NodeId, node: NodeId) -> bool {
        let mut current = Some(node);
        while let Some(id) = current {
            if id == ancestor {
                return true;
            }
            current = self.parent(id);
        }
        false
    }

    /// Whether the node is reachable from the document root
    pub fn is_attached(&self, id: NodeId) -> bool {
        self.owns(id) && self.contains(self.root, id)
    }

    /// Remove a node from its parent. The subtree stays intact but detached.
    pub fn detach(&mut self, id: NodeId) -> bool {
        let Some(parent) = self.parent(id) else {
            return false;
        };
        if let Some(slot) = self.slot_mut(parent) {
            slot.children.retain(|child| *child != id);
        }
        if let Some(slot) = self.slot_mut(id) {
            slot.parent = None;
        }
        true
    }

    fn can_adopt(&self, parent: NodeId, child: NodeId) -> bool {
        self.owns(parent)
            && self.owns(child)
            && child != self.root
            && !self.contains(child, parent)
            && !matches!(self.get(parent), Some(NodeData::Text(_)))
    }

    pub fn append(&mut self, parent: NodeId, child: NodeId) -> bool {
        if !self.can_adopt(parent, child) {
            return false;
        }
        self.detach(child);
        if let Some(slot) = self.slot_mut(parent) {
            slot.children.push(child);
        }
        if let Some(slot) = self.slot_mut(child) {
            slot.parent = Some(parent);
        }
        true
    }

    fn insert_at(&mut self, parent: NodeId, index: usize, child: NodeId) -> bool {
        if !self.can_adopt(parent, child) {
            return false;
        }
        self.detach(child);
        if let Some(slot) = self.slot_mut(parent) {
            let index = index.min(slot.children.len());
            slot.children.insert(index, child);
        }
        if let Some(slot) = self.slot_mut(child) {
            slot.parent = Some(parent);
        }
        true
    }

    pub fn insert_before(&mut self, reference: NodeId, child: NodeId) -> bool {
        if reference == child {
            return false;
        }
        let Some(parent) = self.parent(reference) else {
            return false;
        };
        self.detach(child);
        match self.index_in_parent(reference) {
            Some(index) => self.insert_at(parent, index, child),
            None => false,
        }
    }

    pub fn insert_after(&mut self, reference: NodeId, child: NodeId) -> bool {
        if reference == child {
            return false;
        }
        let Some(parent) = self.parent(reference) else {
            return false;
        };
        self.detach(child);
        match self.index_in_parent(reference) {
            Some(index) => self.insert_at(parent, index + 1, child),
            None => false,
        }
    }

    pub fn index_in_parent(&self, id: NodeId) -> Option<usize> {
        let parent = self.parent(id)?;
        self.children(parent).iter().position(|child| *child == id)
    }

    pub fn next_sibling(&self, id: NodeId) -> Option<NodeId> {
        let parent = self.parent(id)?;
        let index = self.index_in_parent(id)?;
        self.children(parent).get(index + 1).copied()
    }

    pub fn previous_sibling(&self, id: NodeId) -> Option<NodeId> {
        let parent = self.parent(id)?;
        let index = self.index_in_parent(id)?;
        index
            .checked_sub(1)
            .and_then(|i| self.children(parent).get(i).copied())
    }

    /// Ancestors from the parent up to (and including) the root
    pub fn ancestors(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut current = self.parent(id);
        while let Some(node) = current {
            out.push(node);
            current = self.parent(node);
        }
        out
    }

    /// Nearest ancestor-or-self element matching the predicate
    pub fn closest(&self, id: NodeId, mut predicate: impl FnMut(&Element) -> bool) -> Option<NodeId> {
        let mut current = Some(id);
        while let Some(node) = current {
            if let Some(element) = self.element(node) {
                if predicate(element) {
                    return Some(node);
                }
            }
            current = self.parent(node);
        }
        None
    }

    /// Descendants in document order, excluding `id` itself
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack: Vec<NodeId> = self.children(id).iter().rev().copied().collect();
        while let Some(node) = stack.pop() {
            out.push(node);
            stack.extend(self.children(node).iter().rev().copied());
        }
        out
    }

    /// Text node descendants in document order
    pub fn text_descendants(&self, id: NodeId) -> Vec<NodeId> {
        if self.text(id).is_some() {
            return vec![id];
        }
        self.descendants(id)
            .into_iter()
            .filter(|node| self.text(*node).is_some())
            .collect()
    }

    /// Concatenated text of all descendant text nodes
    pub fn text_content(&self, id: NodeId) -> String {
        self.text_descendants(id)
            .into_iter()
            .filter_map(|node| self.text(node))
            .collect()
    }

    /// Child-index path from the root. Empty for the root itself.
    pub fn path(&self, id: NodeId) -> Option<Vec<usize>> {
        if !self.is_attached(id) {
            return None;
        }
        let mut path = Vec::new();
        let mut current = id;
        while let Some(parent) = self.parent(current) {
            path.push(self.index_in_parent(current)?);
            current = parent;
        }
        path.reverse();
        Some(path)
    }

    pub fn node_at_path(&self, path: &[usize]) -> Option<NodeId> {
        let mut current = self.root;
        for index in path {
            current = *self.children(current).get(*index)?;
        }
        Some(current)
    }

    /// Document-order comparison of two attached nodes. An ancestor sorts
    /// before its descendants.
    pub fn compare_order(&self, a: NodeId, b: NodeId) -> Option<Ordering> {
        Some(self.path(a)?.cmp(&self.path(b)?))
    }

    /// Deep copy of a subtree. The copy is detached.
    pub fn deep_clone(&mut self, id: NodeId) -> Option<NodeId> {
        let data = self.get(id)?.clone();
        let copy = self.alloc(data);
        let children = self.children(id).to_vec();
        for child in children {
            if let Some(child_copy) = self.deep_clone(child) {
                self.append(copy, child_copy);
            }
        }
        Some(copy)
    }

    /// Deep copy a subtree from another tree into this one. The copy is
    /// detached.
    pub fn adopt_from(&mut self, other: &Dom, id: NodeId) -> Option<NodeId> {
        let data = other.get(id)?.clone();
        let copy = self.alloc(data);
        for child in other.children(id) {
            if let Some(child_copy) = self.adopt_from(other, *child) {
                self.append(copy, child_copy);
            }
        }
        Some(copy)
    }

    /// Split a text node at a character offset. The original keeps the
    /// leading part; the returned node holds the rest and follows it.
    pub fn split_text(&mut self, id: NodeId, char_offset: usize) -> Option<NodeId> {
        let text = self.text(id)?.to_string();
        let at = byte_offset(&text, char_offset);
        let (head, tail) = text.split_at(at);
        let (head, tail) = (head.to_string(), tail.to_string());
        let tail_node = self.create_text(tail);
        if self.parent(id).is_some() {
            self.insert_after(id, tail_node);
        }
        self.set_text(id, head);
        Some(tail_node)
    }

    /// Wrap a node in a new element placed where the node was
    pub fn wrap(&mut self, id: NodeId, element: Element) -> Option<NodeId> {
        self.parent(id)?;
        let wrapper = self.create_element_with(element);
        if !self.insert_before(id, wrapper) {
            return None;
        }
        self.append(wrapper, id);
        Some(wrapper)
    }

    /// Replace an element by its children
    pub fn unwrap(&mut self, id: NodeId) -> bool {
        if self.parent(id).is_none() || self.element(id).is_none() {
            return false;
        }
        for child in self.children(id).to_vec() {
            self.insert_before(id, child);
        }
        self.detach(id)
    }

    /// Detach every child of `id`
    pub fn clear_children(&mut self, id: NodeId) {
        for child in self.children(id).to_vec() {
            self.detach(child);
        }
    }

    /// Merge adjacent text siblings and drop empty text nodes under `id`
    pub fn normalize(&mut self, id: NodeId) {
        let children = self.children(id).to_vec();
        let mut previous_text: Option<NodeId> = None;
        for child in children {
            if let Some(text) = self.text(child).map(str::to_string) {
                if text.is_empty() {
                    self.detach(child);
                    continue;
                }
                match previous_text {
                    Some(prev) => {
                        let merged = format!("{}{}", self.text(prev).unwrap_or(""), text);
                        self.set_text(prev, merged);
                        self.detach(child);
                    }
                    None => previous_text = Some(child),
                }
            } else {
                previous_text = None;
                if self.element(child).is_some() {
                    self.normalize(child);
                }
            }
        }
    }

    /// Elements under `id` (document order) matching the predicate
    pub fn find_elements(&self, id: NodeId, mut predicate: impl FnMut(&Element) -> bool) -> Vec<NodeId> {
        self.descendants(id)
            .into_iter()
            .filter(|node| self.element(*node).map(&mut predicate).unwrap_or(false))
            .collect()
    }

    /// First element under the root with the given tag
    pub fn first_element(&self, tag: &str) -> Option<NodeId> {
        self.descendants(self.root)
            .into_iter()
            .find(|node| self.is_element(*node, tag))
    }
}

/// Number of characters in a string
pub fn char_len(text: &str) -> usize {
    text.chars().count()
}

/// Byte index of a character offset, clamped to the string length
pub fn byte_offset(text: &str, char_offset: usize) -> usize {
    text.char_indices()
        .nth(char_offset)
        .map(|(index, _)| index)
        .unwrap_or(text.len())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> (Dom, NodeId, NodeId, NodeId) {
        let mut dom = Dom::new();
        let div = dom.create_element("div");
        let p = dom.create_element("p");
        let text = dom.create_text("Hello world");
        let root = dom.root();
        dom.append(root, div);
        dom.append(div, p);
        dom.append(p, text);
        (dom, div, p, text)
    }

    #[test]
    fn test_attach_and_detach() {
        let (mut dom, div, p, text) = sample();
        assert!(dom.is_attached(text));
        assert!(dom.detach(p));
        assert!(!dom.is_attached(text));
        assert!(dom.is_attached(div));
        assert_eq!(dom.children(div).len(), 0);
    }

    #[test]
    fn test_ids_from_other_tree_do_not_resolve() {
        let (dom, _, p, _) = sample();
        let (other, _, _, _) = sample();
        assert!(dom.owns(p));
        assert!(!other.owns(p));
        assert!(other.get(p).is_none());
        assert!(!other.is_attached(p));
    }

    #[test]
    fn test_detached_slots_released_by_reparse() {
        let (mut dom, _, p, text) = sample();
        let before = dom.arena_len();
        dom.split_text(text, 6);
        dom.detach(p);
        assert_eq!(dom.arena_len(), before + 1);
        assert!(dom.owns(p));

        let markup = crate::serialize_children(&dom, dom.root(), &crate::SerializeOptions::default());
        let reparsed = crate::parse_fragment(&markup);
        assert_eq!(markup, "<div></div>");
        assert!(reparsed.arena_len() < before);
    }

    #[test]
    fn test_append_rejects_cycles() {
        let (mut dom, div, p, _) = sample();
        assert!(!dom.append(p, div));
        assert!(dom.contains(div, p));
    }

    #[test]
    fn test_split_text_by_chars() {
        let (mut dom, _, p, text) = sample();
        let tail = dom.split_text(text, 6).unwrap();
        assert_eq!(dom.text(text), Some("Hello "));
        assert_eq!(dom.text(tail), Some("world"));
        assert_eq!(dom.children(p), &[text, tail]);
    }

    #[test]
    fn test_split_multibyte() {
        let mut dom = Dom::new();
        let text = dom.create_text("héllo");
        let root = dom.root();
        dom.append(root, text);
        let tail = dom.split_text(text, 2).unwrap();
        assert_eq!(dom.text(text), Some("hé"));
        assert_eq!(dom.text(tail), Some("llo"));
    }

    #[test]
    fn test_wrap_and_unwrap() {
        let (mut dom, _, p, text) = sample();
        let b = dom.wrap(text, Element::new("b")).unwrap();
        assert_eq!(dom.children(p), &[b]);
        assert_eq!(dom.parent(text), Some(b));
        assert!(dom.unwrap(b));
        assert_eq!(dom.children(p), &[text]);
        assert!(!dom.is_attached(b));
    }

    #[test]
    fn test_deep_clone_is_detached_copy() {
        let (mut dom, div, _, _) = sample();
        let copy = dom.deep_clone(div).unwrap();
        assert!(!dom.is_attached(copy));
        assert_eq!(dom.text_content(copy), "Hello world");
        assert_ne!(copy, div);
    }

    #[test]
    fn test_adopt_from_other_tree() {
        let (source, div, _, _) = sample();
        let mut target = Dom::new();
        let copy = target.adopt_from(&source, div).unwrap();
        let root = target.root();
        target.append(root, copy);
        assert_eq!(target.text_content(root), "Hello world");
        assert!(target.element(copy).map(|e| e.is("div")).unwrap_or(false));
    }

    #[test]
    fn test_document_order() {
        let (mut dom, div, p, _) = sample();
        let second = dom.create_element("p");
        dom.append(div, second);
        assert_eq!(dom.compare_order(p, second), Some(Ordering::Less));
        assert_eq!(dom.compare_order(div, p), Some(Ordering::Less));
    }

    #[test]
    fn test_style_property_roundtrip() {
        let mut element = Element::new("span");
        element.set_style_property("font-size", "18px");
        element.set_style_property("color", "#112233");
        element.set_style_property("font-size", "20px");
        assert_eq!(element.attr("style"), Some("font-size: 20px; color: #112233"));
        element.remove_style_property("font-size");
        element.remove_style_property("color");
        assert!(element.attr("style").is_none());
    }

    #[test]
    fn test_normalize_merges_text() {
        let (mut dom, _, p, text) = sample();
        let extra = dom.create_text(" again");
        let empty = dom.create_text("");
        dom.append(p, extra);
        dom.append(p, empty);
        dom.normalize(dom.root());
        assert_eq!(dom.children(p), &[text]);
        assert_eq!(dom.text(text), Some("Hello world again"));
    }
}

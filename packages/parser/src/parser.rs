//! Tolerant tree builder.
//!
//! Consumes tokenizer events and builds a `Dom`. Recovery rules:
//! - close tags without a matching open element are dropped
//! - elements still open at end of input are closed implicitly
//! - `<p>` is closed by a block-level start tag
//! - `<li>`, `<td>`, `<th>`, `<tr>`, `<dt>`, `<dd>`, `<option>` close an open
//!   sibling of the same family within their list/table scope
//! - void elements and explicitly self-closed elements take no children

use crate::dom::{Dom, Element, NodeData, NodeId};
use crate::error::{ParseError, ParseResult};
use crate::tags;
use crate::tokenizer::{tokenize, MarkupEvent};
use tracing::debug;

/// Builds a `Dom` from markup events
pub struct TreeBuilder {
    dom: Dom,
    open: Vec<NodeId>,
    issues: Vec<ParseError>,
}

impl Default for TreeBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl TreeBuilder {
    pub fn new() -> Self {
        let dom = Dom::new();
        let root = dom.root();
        Self {
            dom,
            open: vec![root],
            issues: Vec::new(),
        }
    }

    fn current(&self) -> NodeId {
        self.open.last().copied().unwrap_or_else(|| self.dom.root())
    }

    fn current_is(&self, tag: &str) -> bool {
        self.open.len() > 1 && self.dom.is_element(self.current(), tag)
    }

    /// Index in the open stack of the nearest element named in `targets`,
    /// searching down from the top and stopping at any `boundary` element.
    fn find_open(&self, targets: &[&str], boundary: &[&str]) -> Option<usize> {
        for (index, id) in self.open.iter().enumerate().skip(1).rev() {
            let element = self.dom.element(*id)?;
            if targets.iter().any(|t| element.is(t)) {
                return Some(index);
            }
            if boundary.iter().any(|b| element.is(b)) {
                return None;
            }
        }
        None
    }

    pub fn start_tag(&mut self, name: &str, attributes: Vec<(String, String)>, self_closing: bool) {
        let lower = name.to_ascii_lowercase();

        if tags::closes_paragraph(&lower) && self.current_is("p") {
            self.open.pop();
        }
        if let Some((siblings, boundary)) = tags::implicit_close_scope(&lower) {
            if let Some(index) = self.find_open(siblings, boundary) {
                self.open.truncate(index);
            }
        }

        let element = Element {
            tag: name.to_string(),
            attributes,
        };
        let id = self.dom.create_element_with(element);
        let parent = self.current();
        self.dom.append(parent, id);

        if !self_closing && !tags::is_void(&lower) {
            self.open.push(id);
        }
    }

    pub fn end_tag(&mut self, name: &str, pos: usize) {
        match self.find_open(&[name], &[]) {
            Some(index) => self.open.truncate(index),
            None => {
                if !tags::is_void(name) {
                    self.issues.push(ParseError::unmatched_close_tag(pos, name));
                }
            }
        }
    }

    pub fn text(&mut self, content: &str) {
        if content.is_empty() {
            return;
        }
        let parent = self.current();
        if let Some(last) = self.dom.children(parent).last().copied() {
            if let Some(NodeData::Text(existing)) = self.dom.get_mut(last) {
                existing.push_str(content);
                return;
            }
        }
        let id = self.dom.create_text(content);
        self.dom.append(parent, id);
    }

    pub fn comment(&mut self, content: &str) {
        let id = self.dom.create_comment(content);
        let parent = self.current();
        self.dom.append(parent, id);
    }

    pub fn doctype(&mut self, content: &str) {
        let id = self.dom.create_doctype(content);
        let parent = self.current();
        self.dom.append(parent, id);
    }

    pub fn finish(self) -> (Dom, Vec<ParseError>) {
        (self.dom, self.issues)
    }
}

fn build(source: &str) -> (Dom, Vec<ParseError>) {
    let tokenized = tokenize(source);
    let mut builder = TreeBuilder::new();
    builder.issues.extend(tokenized.issues);

    for (event, span) in tokenized.events {
        match event {
            MarkupEvent::StartTag {
                name,
                attributes,
                self_closing,
            } => builder.start_tag(&name, attributes, self_closing),
            MarkupEvent::EndTag(name) => builder.end_tag(&name, span.start),
            MarkupEvent::Text(text) | MarkupEvent::RawText(text) => builder.text(&text),
            MarkupEvent::Comment(text) => builder.comment(&text),
            MarkupEvent::Doctype(text) => builder.doctype(&text),
        }
    }

    let (dom, issues) = builder.finish();
    if !issues.is_empty() {
        debug!(issues = issues.len(), "Recovered from malformed markup");
    }
    (dom, issues)
}

/// Parse markup into a tree. Never fails: malformed input degrades to the
/// closest sensible tree.
pub fn parse_fragment(source: &str) -> Dom {
    build(source).0
}

/// Parse markup, reporting the first structural problem instead of
/// recovering from it
pub fn parse_fragment_strict(source: &str) -> ParseResult<Dom> {
    let (dom, mut issues) = build(source);
    if issues.is_empty() {
        Ok(dom)
    } else {
        issues.sort_by_key(ParseError::pos);
        Err(issues.remove(0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::serializer::{serialize_children, SerializeOptions};

    fn roundtrip(source: &str) -> String {
        let dom = parse_fragment(source);
        serialize_children(&dom, dom.root(), &SerializeOptions::default())
    }

    #[test]
    fn test_simple_tree() {
        let dom = parse_fragment("<div><h1>Title</h1><p>Body</p></div>");
        let div = dom.children(dom.root())[0];
        assert!(dom.is_element(div, "div"));
        assert_eq!(dom.element_children(div).len(), 2);
        assert_eq!(dom.text_content(div), "TitleBody");
    }

    #[test]
    fn test_paragraph_closed_by_block() {
        assert_eq!(roundtrip("<p>one<div>two</div>"), "<p>one</p><div>two</div>");
    }

    #[test]
    fn test_list_items_close_siblings() {
        assert_eq!(
            roundtrip("<ul><li>a<li>b</ul>"),
            "<ul><li>a</li><li>b</li></ul>"
        );
    }

    #[test]
    fn test_nested_lists_keep_scope() {
        assert_eq!(
            roundtrip("<ul><li>a<ul><li>b</ul></ul>"),
            "<ul><li>a<ul><li>b</li></ul></li></ul>"
        );
    }

    #[test]
    fn test_table_cells_close_siblings() {
        assert_eq!(
            roundtrip("<table><tr><td>a<td>b<tr><td>c</table>"),
            "<table><tr><td>a</td><td>b</td></tr><tr><td>c</td></tr></table>"
        );
    }

    #[test]
    fn test_stray_close_tags_ignored() {
        assert_eq!(roundtrip("<div>a</span></div>"), "<div>a</div>");
    }

    #[test]
    fn test_unclosed_at_eof() {
        assert_eq!(roundtrip("<div><span>text"), "<div><span>text</span></div>");
    }

    #[test]
    fn test_void_elements() {
        assert_eq!(
            roundtrip(r#"<p>a<br>b<img src="x.png"></p>"#),
            r#"<p>a<br>b<img src="x.png"></p>"#
        );
    }

    #[test]
    fn test_svg_case_preserved() {
        let source = r#"<svg viewBox="0 0 36 36"><circle stroke-dasharray="40, 100"/></svg>"#;
        assert_eq!(
            roundtrip(source),
            r#"<svg viewBox="0 0 36 36"><circle stroke-dasharray="40, 100"></circle></svg>"#
        );
    }

    #[test]
    fn test_serialization_is_fixed_point() {
        let source = "<div class=a>Tom &amp; Jerry&nbsp;<b>bold<i>both</b></div><!-- c -->";
        let once = roundtrip(source);
        assert_eq!(roundtrip(&once), once);
    }

    #[test]
    fn test_strict_reports_problems() {
        assert!(parse_fragment_strict("<p>fine</p>").is_ok());
        let err = parse_fragment_strict("<p>fine</p></section>").unwrap_err();
        assert_eq!(err, ParseError::unmatched_close_tag(11, "section"));
    }
}

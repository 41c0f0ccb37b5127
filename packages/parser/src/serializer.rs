//! Markup serializer for the live DOM

use crate::dom::{Dom, NodeData, NodeId};
use crate::entities::{escape_attribute, escape_text};
use crate::tags;

/// Serialization options
#[derive(Debug, Clone, Default)]
pub struct SerializeOptions {
    /// Attribute names left out of the output (editor chrome such as
    /// selection markers)
    pub omit_attributes: Vec<String>,
}

impl SerializeOptions {
    pub fn omitting(attributes: &[&str]) -> Self {
        Self {
            omit_attributes: attributes.iter().map(|a| a.to_string()).collect(),
        }
    }

    fn omits(&self, name: &str) -> bool {
        self.omit_attributes
            .iter()
            .any(|omitted| omitted.eq_ignore_ascii_case(name))
    }
}

/// Serialize the children of a node (the node's "inner markup")
pub fn serialize_children(dom: &Dom, id: NodeId, options: &SerializeOptions) -> String {
    let mut out = String::new();
    let raw = dom
        .element(id)
        .map(|element| tags::is_raw_text(&element.tag))
        .unwrap_or(false);
    for child in dom.children(id) {
        write_node(dom, *child, options, raw, &mut out);
    }
    out
}

/// Serialize a node including itself (the node's "outer markup")
pub fn serialize_node(dom: &Dom, id: NodeId, options: &SerializeOptions) -> String {
    let mut out = String::new();
    write_node(dom, id, options, false, &mut out);
    out
}

fn write_node(dom: &Dom, id: NodeId, options: &SerializeOptions, raw_parent: bool, out: &mut String) {
    match dom.get(id) {
        Some(NodeData::Document) => {
            for child in dom.children(id) {
                write_node(dom, *child, options, false, out);
            }
        }
        Some(NodeData::Element(element)) => {
            out.push('<');
            out.push_str(&element.tag);
            for (name, value) in &element.attributes {
                if options.omits(name) {
                    continue;
                }
                out.push(' ');
                out.push_str(name);
                out.push_str("=\"");
                out.push_str(&escape_attribute(value));
                out.push('"');
            }
            out.push('>');

            if tags::is_void(&element.tag) {
                return;
            }

            let raw = tags::is_raw_text(&element.tag);
            for child in dom.children(id) {
                write_node(dom, *child, options, raw, out);
            }
            out.push_str("</");
            out.push_str(&element.tag);
            out.push('>');
        }
        Some(NodeData::Text(text)) => {
            if raw_parent {
                out.push_str(text);
            } else {
                out.push_str(&escape_text(text));
            }
        }
        Some(NodeData::Comment(text)) => {
            out.push_str("<!--");
            out.push_str(text);
            out.push_str("-->");
        }
        Some(NodeData::Doctype(text)) => {
            out.push_str("<!");
            out.push_str(text);
            out.push('>');
        }
        None => {}
    }
}

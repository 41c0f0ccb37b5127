//! # Template Documents
//!
//! Splits a raw template into the pieces the editor works with: scoped
//! style text, the editable body fragment, the body class, external
//! stylesheets, head scripts and the color variables a color editor can
//! offer.
//!
//! ```text
//! raw markup ──tokenize/build──▶ Dom ──split──▶ Template
//!                                   ├─ head: style / link / script / title
//!                                   └─ body: serialized fragment + class
//! ```
//!
//! Parsing never fails. A template without `<head>` or `<body>` is treated
//! as a bare fragment whose top-level style, link and script elements act
//! as head content.

use crate::css::{discover_color_variables, scope_root_selectors, ColorVariable};
use crate::dom::{Dom, NodeData, NodeId};
use crate::parser::parse_fragment;
use crate::serializer::{serialize_children, SerializeOptions};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

/// Body class used when the template does not declare one
pub const DEFAULT_BODY_CLASS: &str = "vellum-body";

/// Elements treated as head content when they appear outside `<body>`
const HEAD_TAGS: &[&str] = &["style", "link", "script", "meta", "title", "base"];

/// Parsed template document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Template {
    pub title: Option<String>,
    /// Concatenated `<style>` contents with root selectors scoped
    pub style_text: String,
    /// Whether styles are written for the utility-class engine
    pub uses_scoped_style_dialect: bool,
    /// Editable body fragment
    pub body_markup: String,
    pub body_class: String,
    pub stylesheet_links: Vec<String>,
    /// Inline head scripts in source order
    pub inline_scripts: Vec<String>,
    pub color_variables: Vec<ColorVariable>,
}

impl Template {
    /// Default value of every color variable, keyed by name
    pub fn default_colors(&self) -> std::collections::BTreeMap<String, String> {
        self.color_variables
            .iter()
            .map(|v| (v.name.clone(), v.default_value.clone()))
            .collect()
    }

    pub fn color_variable(&self, name: &str) -> Option<&ColorVariable> {
        self.color_variables.iter().find(|v| v.name == name)
    }
}

/// Parse a raw template. Malformed or partial markup degrades to defaults.
#[instrument(skip(raw), fields(bytes = raw.len()))]
pub fn parse_template(raw: &str) -> Template {
    let dom = parse_fragment(raw);
    let body = dom.first_element("body");
    let head = dom.first_element("head");

    let head_nodes = collect_head_nodes(&dom, head, body);

    let mut raw_styles = Vec::new();
    let mut stylesheet_links = Vec::new();
    let mut inline_scripts = Vec::new();
    let mut title = None;
    let mut dialect = false;

    for id in &head_nodes {
        let Some(element) = dom.element(*id) else {
            continue;
        };
        match element.name().as_str() {
            "style" => {
                if element
                    .attr("type")
                    .map(|t| t.eq_ignore_ascii_case("text/tailwindcss"))
                    .unwrap_or(false)
                {
                    dialect = true;
                }
                raw_styles.push(dom.text_content(*id));
            }
            "link" => {
                let is_stylesheet = element
                    .attr("rel")
                    .map(|rel| rel.split_whitespace().any(|r| r.eq_ignore_ascii_case("stylesheet")))
                    .unwrap_or(false);
                if let (true, Some(href)) = (is_stylesheet, element.attr("href")) {
                    if href.contains("tailwind") {
                        dialect = true;
                    }
                    stylesheet_links.push(href.to_string());
                }
            }
            "script" => match element.attr("src") {
                Some(src) => {
                    if src.contains("tailwind") {
                        dialect = true;
                    }
                }
                None => {
                    let content = dom.text_content(*id);
                    let content = content.trim();
                    if !content.is_empty() {
                        inline_scripts.push(content.to_string());
                    }
                }
            },
            "title" => {
                let text = dom.text_content(*id).trim().to_string();
                if !text.is_empty() {
                    title = Some(text);
                }
            }
            _ => {}
        }
    }

    let raw_style_text = raw_styles.join("\n");
    let color_variables = discover_color_variables(&raw_style_text);
    let style_text = scope_root_selectors(&raw_style_text);

    let body_class = body
        .and_then(|b| dom.element(b))
        .and_then(|e| e.attr("class"))
        .map(|c| c.split_whitespace().collect::<Vec<_>>().join(" "))
        .filter(|c| !c.is_empty())
        .unwrap_or_else(|| DEFAULT_BODY_CLASS.to_string());

    let body_markup = match body {
        Some(body) => serialize_children(&dom, body, &SerializeOptions::default()),
        None => serialize_fragment_body(&dom, &head_nodes, head),
    }
    .trim()
    .to_string();

    debug!(
        colors = color_variables.len(),
        links = stylesheet_links.len(),
        scripts = inline_scripts.len(),
        dialect,
        "Parsed template"
    );

    Template {
        title,
        style_text,
        uses_scoped_style_dialect: dialect,
        body_markup,
        body_class,
        stylesheet_links,
        inline_scripts,
        color_variables,
    }
}

/// Top-level container: the `<html>` element if present, else the root
fn top_level(dom: &Dom) -> NodeId {
    dom.children(dom.root())
        .iter()
        .copied()
        .find(|id| dom.is_element(*id, "html"))
        .unwrap_or_else(|| dom.root())
}

fn is_head_tag(dom: &Dom, id: NodeId) -> bool {
    dom.element(id)
        .map(|e| HEAD_TAGS.iter().any(|t| e.is(t)))
        .unwrap_or(false)
}

fn collect_head_nodes(dom: &Dom, head: Option<NodeId>, body: Option<NodeId>) -> Vec<NodeId> {
    let mut nodes = Vec::new();
    if let Some(head) = head {
        nodes.extend(
            dom.descendants(head)
                .into_iter()
                .filter(|id| is_head_tag(dom, *id)),
        );
    }
    // Head material outside both <head> and <body> (fragments, sloppy templates)
    let container = top_level(dom);
    for id in dom.children(container) {
        if Some(*id) != head && Some(*id) != body && is_head_tag(dom, *id) {
            nodes.push(*id);
        }
    }
    nodes.sort_by(|a, b| {
        dom.compare_order(*a, *b)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    nodes
}

fn serialize_fragment_body(dom: &Dom, head_nodes: &[NodeId], head: Option<NodeId>) -> String {
    let options = SerializeOptions::default();
    let container = top_level(dom);
    let mut out = String::new();
    for id in dom.children(container) {
        if Some(*id) == head || head_nodes.contains(id) {
            continue;
        }
        if matches!(dom.get(*id), Some(NodeData::Doctype(_))) {
            continue;
        }
        out.push_str(&crate::serializer::serialize_node(dom, *id, &options));
    }
    out
}

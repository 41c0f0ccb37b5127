//! # Classification Pass
//!
//! Pure, total discovery of the typed bindings the rest of the editor
//! works with:
//!
//! - `EditableRegion`: text-bearing elements the user edits in place
//! - `ChartBinding`: an SVG donut whose two arcs encode a percentage
//! - `BarBinding`: a two-cell grid row whose column spans encode a
//!   percentage held in the second cell's text
//!
//! Nothing here mutates the document. Bindings hold `NodeId`s of the
//! `Dom` they were discovered in, so they are rediscovered after every
//! structural change instead of being patched.

use regex::Regex;
use serde::Serialize;
use std::fmt;
use std::sync::OnceLock;
use vellum_parser::tags::is_text_block;
use vellum_parser::{Dom, Element, NodeId};

/// Subtrees never searched for regions
const OPAQUE_TAGS: &[&str] = &["script", "style", "svg", "template", "noscript", "head", "title"];

/// Class names marking a numeric stat container
const STAT_CLASSES: &[&str] = &["stat", "stat-value", "stat-number", "metric", "metric-value", "kpi", "kpi-value"];

/// Total units of the grid a bar row is laid out on
pub const GRID_UNITS: u32 = 12;

/// Path-derived region identifier. Stable across reparses of the same
/// markup.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct RegionId(String);

impl RegionId {
    pub fn from_path(path: &[usize]) -> Self {
        let parts: Vec<String> = path.iter().map(|index| index.to_string()).collect();
        RegionId(format!("r{}", parts.join(".")))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RegionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum RegionKind {
    Heading,
    Paragraph,
    Inline,
    Button,
    ListItem,
    TableCell,
    /// Opt-in numeric stat container
    Stat,
    /// Explicit `data-editable`
    Marked,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EditableRegion {
    pub id: RegionId,
    #[serde(skip)]
    pub node: NodeId,
    pub kind: RegionKind,
    pub tag: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChartBinding {
    #[serde(skip)]
    pub svg: NodeId,
    #[serde(skip)]
    pub primary: NodeId,
    #[serde(skip)]
    pub secondary: NodeId,
    /// Dash length of the primary arc, if it parses
    pub percent: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BarBinding {
    #[serde(skip)]
    pub row: NodeId,
    #[serde(skip)]
    pub fill: NodeId,
    #[serde(skip)]
    pub label: NodeId,
    pub fill_span: Option<u32>,
    pub label_span: Option<u32>,
    /// Percentage held by the label cell, if it parses
    pub percent: Option<f64>,
}

/// Everything discovered in one pass
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Bindings {
    pub regions: Vec<EditableRegion>,
    pub charts: Vec<ChartBinding>,
    pub bars: Vec<BarBinding>,
}

impl Bindings {
    /// Region whose element is `node` or an ancestor of it
    pub fn region_containing(&self, dom: &Dom, node: NodeId) -> Option<&EditableRegion> {
        self.regions.iter().find(|region| dom.contains(region.node, node))
    }

    pub fn region_by_node(&self, node: NodeId) -> Option<&EditableRegion> {
        self.regions.iter().find(|region| region.node == node)
    }

    pub fn region_by_id(&self, id: &str) -> Option<&EditableRegion> {
        self.regions.iter().find(|region| region.id.as_str() == id)
    }
}

/// Run every classifier over the document
pub fn discover(dom: &Dom) -> Bindings {
    Bindings {
        regions: discover_regions(dom),
        charts: discover_charts(dom),
        bars: discover_bars(dom),
    }
}

fn stat_text_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^[+\-]?[$€£¥]?\d[\d,]*(\.\d+)?\s*(%|[kKmMbB]|\+|x)?$")
            .expect("stat text regex is valid")
    })
}

fn col_span_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^col-span-(\d+)$").expect("col-span regex is valid"))
}

fn is_opaque(element: &Element) -> bool {
    OPAQUE_TAGS.iter().any(|tag| element.is(tag))
        || element
            .attr("contenteditable")
            .map(|v| v.eq_ignore_ascii_case("false"))
            .unwrap_or(false)
}

fn has_visible_text(dom: &Dom, node: NodeId) -> bool {
    !dom.text_content(node).trim().is_empty()
}

fn is_stat(dom: &Dom, node: NodeId, element: &Element) -> bool {
    let marked = element.has_attr("data-stat") || STAT_CLASSES.iter().any(|c| element.has_class(c));
    marked && stat_text_regex().is_match(dom.text_content(node).trim())
}

fn classify(dom: &Dom, node: NodeId, element: &Element, inside_text_block: bool) -> Option<RegionKind> {
    if element.has_attr("data-editable") {
        return Some(RegionKind::Marked);
    }
    if is_stat(dom, node, element) {
        return Some(RegionKind::Stat);
    }
    let kind = match element.name().as_str() {
        "h1" | "h2" | "h3" | "h4" | "h5" | "h6" => RegionKind::Heading,
        "p" | "blockquote" | "figcaption" | "label" | "dt" | "dd" => RegionKind::Paragraph,
        "button" => RegionKind::Button,
        "li" => RegionKind::ListItem,
        "td" | "th" => RegionKind::TableCell,
        "span" | "a" | "small" | "strong" | "em" if !inside_text_block && has_visible_text(dom, node) => {
            RegionKind::Inline
        }
        _ => return None,
    };
    Some(kind)
}

/// Editable regions in document order. The outermost candidate wins;
/// nothing inside a region is a region of its own.
pub fn discover_regions(dom: &Dom) -> Vec<EditableRegion> {
    let mut regions = Vec::new();
    visit_regions(dom, dom.root(), false, &mut regions);
    regions
}

fn visit_regions(dom: &Dom, parent: NodeId, inside_text_block: bool, out: &mut Vec<EditableRegion>) {
    for child in dom.children(parent) {
        let Some(element) = dom.element(*child) else {
            continue;
        };
        if is_opaque(element) {
            continue;
        }
        if let Some(kind) = classify(dom, *child, element, inside_text_block) {
            if let Some(path) = dom.path(*child) {
                out.push(EditableRegion {
                    id: RegionId::from_path(&path),
                    node: *child,
                    kind,
                    tag: element.name(),
                });
            }
            continue;
        }
        let nested = inside_text_block || is_text_block(&element.name());
        visit_regions(dom, *child, nested, out);
    }
}

/// Dash array of an arc element, from the attribute or inline style
pub fn dash_array(element: &Element) -> Option<String> {
    element
        .attr("stroke-dasharray")
        .map(str::to_string)
        .or_else(|| element.style_property("stroke-dasharray"))
}

/// First length of a dash array ("25, 100" → 25)
pub fn dash_length(value: &str) -> Option<f64> {
    value
        .split([',', ' '])
        .find(|part| !part.trim().is_empty())
        .and_then(|part| part.trim().trim_end_matches("px").parse::<f64>().ok())
        .filter(|v| v.is_finite())
}

fn is_arc(element: &Element) -> bool {
    ["circle", "path", "ellipse"].iter().any(|tag| element.is(tag)) && dash_array(element).is_some()
}

/// SVGs holding exactly two dashed arcs
pub fn discover_charts(dom: &Dom) -> Vec<ChartBinding> {
    dom.find_elements(dom.root(), |e| e.is("svg"))
        .into_iter()
        .filter_map(|svg| {
            let arcs = dom.find_elements(svg, is_arc);
            if arcs.len() != 2 {
                return None;
            }
            let percent = dom
                .element(arcs[0])
                .and_then(dash_array)
                .and_then(|value| dash_length(&value));
            Some(ChartBinding {
                svg,
                primary: arcs[0],
                secondary: arcs[1],
                percent,
            })
        })
        .collect()
}

/// Column span from a `col-span-N` class
pub fn col_span(element: &Element) -> Option<u32> {
    element.classes().find_map(|class| {
        col_span_regex()
            .captures(class)
            .and_then(|caps| caps[1].parse::<u32>().ok())
    })
}

/// Bare or percent-suffixed number in [0, 100]
pub fn parse_percent(text: &str) -> Option<f64> {
    let trimmed = text.trim();
    let number = trimmed.strip_suffix('%').unwrap_or(trimmed).trim();
    let value = number.parse::<f64>().ok()?;
    (value.is_finite() && (0.0..=100.0).contains(&value)).then_some(value)
}

fn is_grid(element: &Element) -> bool {
    element
        .classes()
        .any(|class| class == "grid" || class.starts_with("grid-cols-"))
}

/// Grid rows with exactly two cells that both carry a column span
pub fn discover_bars(dom: &Dom) -> Vec<BarBinding> {
    dom.find_elements(dom.root(), is_grid)
        .into_iter()
        .filter_map(|row| {
            let cells = dom.element_children(row);
            if cells.len() != 2 {
                return None;
            }
            let (fill, label) = (cells[0], cells[1]);
            let fill_span = dom.element(fill).and_then(col_span);
            let label_span = dom.element(label).and_then(col_span);
            if fill_span.is_none() || label_span.is_none() {
                return None;
            }
            Some(BarBinding {
                row,
                fill,
                label,
                fill_span,
                label_span,
                percent: parse_percent(&dom.text_content(label)),
            })
        })
        .collect()
}

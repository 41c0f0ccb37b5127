//! # Style Resolution
//!
//! Approximates the computed style a browser would report at a node:
//! enough to drive a formatting toolbar and relative font-size steps.
//! Inputs are inline declarations, a small table of utility classes and
//! tag defaults. Stylesheets are not consulted.

use serde::{Deserialize, Serialize};
use vellum_parser::{Dom, Element, NodeId};

/// Root font size in px
pub const ROOT_FONT_SIZE: f64 = 16.0;

/// Reported color when nothing sets one
pub const DEFAULT_TEXT_COLOR: &str = "#000000";

/// Reported family when nothing sets one
pub const DEFAULT_FONT_FAMILY: &str = "Default";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Alignment {
    Left,
    Center,
    Right,
    Justify,
}

impl Alignment {
    pub fn as_css(&self) -> &'static str {
        match self {
            Alignment::Left => "left",
            Alignment::Center => "center",
            Alignment::Right => "right",
            Alignment::Justify => "justify",
        }
    }

    pub fn from_css(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "left" | "start" => Some(Alignment::Left),
            "center" => Some(Alignment::Center),
            "right" | "end" => Some(Alignment::Right),
            "justify" => Some(Alignment::Justify),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComputedStyle {
    pub font_size: f64,
    pub font_family: String,
    pub color: String,
    pub bold: bool,
    pub italic: bool,
    pub underline: bool,
    pub strikethrough: bool,
    pub align: Alignment,
}

/// Element chain from the outermost ancestor down to the node itself
/// (or its parent, for text nodes)
fn element_chain(dom: &Dom, node: NodeId) -> Vec<&Element> {
    let start = if dom.element(node).is_some() {
        Some(node)
    } else {
        dom.parent(node)
    };
    let mut chain = Vec::new();
    let mut current = start;
    while let Some(id) = current {
        if let Some(element) = dom.element(id) {
            chain.push(element);
        }
        current = dom.parent(id);
    }
    chain.reverse();
    chain
}

/// Resolve the style at a node. `None` for ids this tree does not own.
pub fn computed_style(dom: &Dom, node: NodeId) -> Option<ComputedStyle> {
    if !dom.owns(node) {
        return None;
    }
    let chain = element_chain(dom, node);

    let mut style = ComputedStyle {
        font_size: ROOT_FONT_SIZE,
        font_family: DEFAULT_FONT_FAMILY.to_string(),
        color: DEFAULT_TEXT_COLOR.to_string(),
        bold: false,
        italic: false,
        underline: false,
        strikethrough: false,
        align: Alignment::Left,
    };

    for element in chain {
        style.font_size = element_font_size(element, style.font_size);

        if let Some(family) = element.style_property("font-family") {
            if !is_inherit(&family) {
                style.font_family = primary_family(&family);
            }
        }
        if let Some(color) = element.style_property("color") {
            if !is_inherit(&color) {
                style.color = color;
            }
        }
        if let Some(bold) = element_bold(element) {
            style.bold = bold;
        }
        if let Some(italic) = element_italic(element) {
            style.italic = italic;
        }
        let (underline, strike) = element_decoration(element);
        if let Some(underline) = underline {
            style.underline = underline;
        }
        if let Some(strike) = strike {
            style.strikethrough = strike;
        }
        if let Some(align) = element_alignment(element) {
            style.align = align;
        }
    }

    Some(style)
}

/// Resolved font size in px at a node
pub fn resolved_font_size(dom: &Dom, node: NodeId) -> f64 {
    element_chain(dom, node)
        .into_iter()
        .fold(ROOT_FONT_SIZE, |parent, element| element_font_size(element, parent))
}

fn is_inherit(value: &str) -> bool {
    matches!(value.trim(), "inherit" | "initial" | "unset")
}

/// First family in a stack, unquoted
pub fn primary_family(stack: &str) -> String {
    stack
        .split(',')
        .next()
        .unwrap_or("")
        .trim()
        .trim_matches(['"', '\''])
        .to_string()
}

fn element_font_size(element: &Element, parent: f64) -> f64 {
    if let Some(size) = element
        .style_property("font-size")
        .and_then(|value| parse_font_size(&value, parent))
    {
        return size;
    }
    if let Some(size) = element.classes().rev().find_map(utility_font_size) {
        return size;
    }
    tag_font_scale(&element.name())
        .map(|scale| parent * scale)
        .unwrap_or(parent)
}

/// Parse a CSS font-size value relative to the parent size
pub fn parse_font_size(value: &str, parent: f64) -> Option<f64> {
    let value = value.trim().to_ascii_lowercase();
    let keyword = match value.as_str() {
        "xx-small" => Some(9.0),
        "x-small" => Some(10.0),
        "small" => Some(13.0),
        "medium" => Some(16.0),
        "large" => Some(18.0),
        "x-large" => Some(24.0),
        "xx-large" => Some(32.0),
        "smaller" => Some(parent / 1.2),
        "larger" => Some(parent * 1.2),
        _ => None,
    };
    if keyword.is_some() {
        return keyword;
    }

    let (number, multiplier, divisor) = if let Some(n) = value.strip_suffix("px") {
        (n, 1.0, 1.0)
    } else if let Some(n) = value.strip_suffix("pt") {
        (n, 4.0, 3.0)
    } else if let Some(n) = value.strip_suffix("rem") {
        (n, ROOT_FONT_SIZE, 1.0)
    } else if let Some(n) = value.strip_suffix("em") {
        (n, parent, 1.0)
    } else if let Some(n) = value.strip_suffix('%') {
        (n, parent, 100.0)
    } else {
        return None;
    };
    let size = number.trim().parse::<f64>().ok()? * multiplier / divisor;
    (size.is_finite() && size > 0.0).then_some(size)
}

fn utility_font_size(class: &str) -> Option<f64> {
    let size = match class {
        "text-xs" => 12.0,
        "text-sm" => 14.0,
        "text-base" => 16.0,
        "text-lg" => 18.0,
        "text-xl" => 20.0,
        "text-2xl" => 24.0,
        "text-3xl" => 30.0,
        "text-4xl" => 36.0,
        "text-5xl" => 48.0,
        "text-6xl" => 60.0,
        "text-7xl" => 72.0,
        "text-8xl" => 96.0,
        "text-9xl" => 128.0,
        _ => {
            let arbitrary = class.strip_prefix("text-[")?.strip_suffix(']')?;
            return parse_font_size(arbitrary, ROOT_FONT_SIZE);
        }
    };
    Some(size)
}

fn tag_font_scale(tag: &str) -> Option<f64> {
    match tag {
        "h1" => Some(2.0),
        "h2" => Some(1.5),
        "h3" => Some(1.17),
        "h4" => Some(1.0),
        "h5" => Some(0.83),
        "h6" => Some(0.67),
        "small" => Some(0.833),
        _ => None,
    }
}

fn element_bold(element: &Element) -> Option<bool> {
    if let Some(weight) = element.style_property("font-weight") {
        match weight.trim() {
            "bold" | "bolder" => return Some(true),
            "normal" | "lighter" => return Some(false),
            other => {
                if let Ok(numeric) = other.parse::<u32>() {
                    return Some(numeric >= 600);
                }
            }
        }
    }
    for class in element.classes() {
        match class {
            "font-semibold" | "font-bold" | "font-extrabold" | "font-black" => return Some(true),
            "font-normal" | "font-light" | "font-thin" | "font-medium" => return Some(false),
            _ => {}
        }
    }
    let tag = element.name();
    matches!(tag.as_str(), "b" | "strong" | "h1" | "h2" | "h3" | "h4" | "h5" | "h6" | "th").then_some(true)
}

fn element_italic(element: &Element) -> Option<bool> {
    if let Some(style) = element.style_property("font-style") {
        match style.trim() {
            "italic" | "oblique" => return Some(true),
            "normal" => return Some(false),
            _ => {}
        }
    }
    if element.has_class("italic") {
        return Some(true);
    }
    if element.has_class("not-italic") {
        return Some(false);
    }
    let tag = element.name();
    matches!(tag.as_str(), "i" | "em" | "cite").then_some(true)
}

/// (underline, strikethrough) overrides set by this element
fn element_decoration(element: &Element) -> (Option<bool>, Option<bool>) {
    let decoration = element
        .style_property("text-decoration")
        .or_else(|| element.style_property("text-decoration-line"));
    if let Some(value) = decoration {
        let value = value.to_ascii_lowercase();
        if value.split_whitespace().any(|v| v == "none") {
            return (Some(false), Some(false));
        }
        let underline = value.contains("underline");
        let strike = value.contains("line-through");
        if underline || strike {
            return (underline.then_some(true), strike.then_some(true));
        }
    }

    let mut underline = None;
    let mut strike = None;
    for class in element.classes() {
        match class {
            "underline" => underline = Some(true),
            "line-through" => strike = Some(true),
            "no-underline" => {
                underline = Some(false);
                strike = Some(false);
            }
            _ => {}
        }
    }
    match element.name().as_str() {
        "u" | "ins" => underline = Some(true),
        "s" | "strike" | "del" => strike = Some(true),
        _ => {}
    }
    (underline, strike)
}

fn element_alignment(element: &Element) -> Option<Alignment> {
    if let Some(align) = element
        .style_property("text-align")
        .and_then(|value| Alignment::from_css(&value))
    {
        return Some(align);
    }
    element.classes().rev().find_map(|class| match class {
        "text-left" => Some(Alignment::Left),
        "text-center" => Some(Alignment::Center),
        "text-right" => Some(Alignment::Right),
        "text-justify" => Some(Alignment::Justify),
        _ => None,
    })
}

/// Format a px length without a trailing `.0`
pub fn format_px(value: f64) -> String {
    let rounded = (value * 100.0).round() / 100.0;
    if rounded.fract() == 0.0 {
        format!("{}px", rounded as i64)
    } else {
        format!("{}px", rounded)
    }
}

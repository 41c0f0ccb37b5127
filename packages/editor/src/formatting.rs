//! # Formatting Engine
//!
//! Applies a `FormatOp` to a resolved selection.
//!
//! ## Design
//!
//! - The primary range is split at its boundaries and every covered text
//!   segment is styled individually. A segment whose parent is a
//!   single-child `span` gets the style merged into that span instead of
//!   a new wrapper.
//! - Secondary regions (multi-selection) receive the same operation over
//!   their full content. A collapsed primary is skipped.
//! - Toggles (bold, italic, underline, strikethrough) remove the format
//!   when every covered segment already has it, else add it.
//! - Alignment targets the enclosing region element.
//!
//! Invalid positions make the operation a no-op; nothing here panics on
//! stale ids.

use crate::bindings::Bindings;
use crate::selection::{text_nodes_between, ResolvedSelection, TextPosition, TextRange};
use crate::style::{computed_style, format_px, resolved_font_size, Alignment, ComputedStyle};
use serde::{Deserialize, Serialize};
use tracing::debug;
use vellum_parser::dom::char_len;
use vellum_parser::{Dom, Element, NodeId};

/// Curated font families: display name and CSS stack. "Default" clears
/// the override.
pub const FONT_FAMILIES: &[(&str, &str)] = &[
    ("Default", ""),
    ("Inter", "'Inter', sans-serif"),
    ("Roboto", "'Roboto', sans-serif"),
    ("Open Sans", "'Open Sans', sans-serif"),
    ("Lato", "'Lato', sans-serif"),
    ("Montserrat", "'Montserrat', sans-serif"),
    ("Poppins", "'Poppins', sans-serif"),
    ("Playfair Display", "'Playfair Display', serif"),
    ("Merriweather", "'Merriweather', serif"),
    ("Georgia", "Georgia, serif"),
    ("Times New Roman", "'Times New Roman', Times, serif"),
    ("Courier New", "'Courier New', Courier, monospace"),
];

/// Inline elements whose whitespace-only text is still worth styling
const INLINE_TAGS: &[&str] = &[
    "span", "a", "b", "strong", "i", "em", "u", "s", "strike", "del", "ins", "small", "mark", "code",
    "sub", "sup", "label", "font",
];

/// CSS stack for a curated family name
pub fn font_stack(name: &str) -> Option<&'static str> {
    FONT_FAMILIES
        .iter()
        .find(|(family, _)| family.eq_ignore_ascii_case(name))
        .map(|(_, stack)| *stack)
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FontSizeChange {
    /// Relative change in px
    Step(f64),
    /// Target size in px
    Absolute(f64),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ToggleFormat {
    Bold,
    Italic,
    Underline,
    Strikethrough,
}

impl ToggleFormat {
    /// Wrapper element used to add the format
    pub fn tag(&self) -> &'static str {
        match self {
            ToggleFormat::Bold => "b",
            ToggleFormat::Italic => "i",
            ToggleFormat::Underline => "u",
            ToggleFormat::Strikethrough => "s",
        }
    }

    fn wrapper_tags(&self) -> &'static [&'static str] {
        match self {
            ToggleFormat::Bold => &["b", "strong"],
            ToggleFormat::Italic => &["i", "em"],
            ToggleFormat::Underline => &["u", "ins"],
            ToggleFormat::Strikethrough => &["s", "strike", "del"],
        }
    }

    pub fn is_set(&self, style: &ComputedStyle) -> bool {
        match self {
            ToggleFormat::Bold => style.bold,
            ToggleFormat::Italic => style.italic,
            ToggleFormat::Underline => style.underline,
            ToggleFormat::Strikethrough => style.strikethrough,
        }
    }

    /// Declaration that cancels the format while keeping the others
    fn neutralizer(&self, style: &ComputedStyle) -> (&'static str, &'static str) {
        match self {
            ToggleFormat::Bold => ("font-weight", "normal"),
            ToggleFormat::Italic => ("font-style", "normal"),
            ToggleFormat::Underline if style.strikethrough => ("text-decoration", "line-through"),
            ToggleFormat::Strikethrough if style.underline => ("text-decoration", "underline"),
            ToggleFormat::Underline | ToggleFormat::Strikethrough => ("text-decoration", "none"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CaseTransform {
    Upper,
    Lower,
    Title,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "camelCase")]
pub enum FormatOp {
    FontSize { change: FontSizeChange },
    FontFamily { family: String },
    TextColor { color: String },
    Toggle { format: ToggleFormat },
    Case { transform: CaseTransform },
    Align { align: Alignment },
}

/// Font-size clamp
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FormatLimits {
    pub min_font_size: f64,
    pub max_font_size: f64,
}

impl Default for FormatLimits {
    fn default() -> Self {
        Self {
            min_font_size: 10.0,
            max_font_size: 72.0,
        }
    }
}

impl FormatLimits {
    /// Limits from user configuration. Non-finite or non-positive bounds
    /// fall back to the defaults and reversed bounds are swapped.
    pub fn new(min_font_size: f64, max_font_size: f64) -> Self {
        let defaults = Self::default();
        let usable = |value: f64| value.is_finite() && value > 0.0;
        let min = if usable(min_font_size) { min_font_size } else { defaults.min_font_size };
        let max = if usable(max_font_size) { max_font_size } else { defaults.max_font_size };
        Self {
            min_font_size: min.min(max),
            max_font_size: min.max(max),
        }
    }

    pub fn clamp_font_size(&self, size: f64) -> f64 {
        // max/min instead of f64::clamp: public fields may hold anything
        size.max(self.min_font_size).min(self.max_font_size)
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct FormatOutcome {
    pub primary_applied: bool,
    pub regions_applied: usize,
    /// Range over the formatted primary content, for reselecting it
    pub selection: Option<TextRange>,
}

impl FormatOutcome {
    pub fn changed(&self) -> bool {
        self.primary_applied || self.regions_applied > 0
    }
}

/// Toolbar state at the selection anchor
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FormatSummary {
    pub region: String,
    pub font_size: f64,
    pub font_family: String,
    pub color: String,
    pub bold: bool,
    pub italic: bool,
    pub underline: bool,
    pub strikethrough: bool,
    pub align: Alignment,
}

/// Summary at `anchor`, or `None` when it is stale or outside every
/// region
pub fn format_summary(dom: &Dom, bindings: &Bindings, anchor: TextPosition) -> Option<FormatSummary> {
    if !anchor.is_valid(dom) {
        return None;
    }
    let region = bindings.region_containing(dom, anchor.node)?;
    let style = computed_style(dom, anchor.node)?;
    Some(FormatSummary {
        region: region.id.to_string(),
        font_size: style.font_size,
        font_family: style.font_family,
        color: style.color,
        bold: style.bold,
        italic: style.italic,
        underline: style.underline,
        strikethrough: style.strikethrough,
        align: style.align,
    })
}

/// Rejects values that could break out of a style declaration
fn is_safe_css_value(value: &str) -> bool {
    let value = value.trim();
    !value.is_empty() && !value.contains([';', '"', '<', '>', '{', '}'])
}

/// Apply an operation to the resolved selection
pub fn apply_format(
    dom: &mut Dom,
    bindings: &Bindings,
    selection: &ResolvedSelection,
    op: &FormatOp,
    limits: &FormatLimits,
) -> FormatOutcome {
    let mut outcome = FormatOutcome::default();

    match op {
        FormatOp::TextColor { color } if !is_safe_css_value(color) => return outcome,
        FormatOp::FontFamily { family } if font_stack(family).is_none() => return outcome,
        _ => {}
    }

    if let Some((start, end)) = selection.primary {
        if start.is_valid(dom) && end.is_valid(dom) {
            outcome.selection = apply_to_range(dom, bindings, start, end, op, limits);
            outcome.primary_applied = true;
        }
    } else if let (FormatOp::Align { align }, true, Some(anchor)) =
        (op, selection.secondary.is_empty(), selection.anchor)
    {
        // Alignment works on a caret
        if anchor.is_valid(dom) {
            if let Some(block) = alignment_target(dom, bindings, anchor.node) {
                set_alignment(dom, block, *align);
                outcome.primary_applied = true;
            }
        }
    }

    for region in &selection.secondary {
        if !dom.is_attached(*region) {
            continue;
        }
        if let FormatOp::Align { align } = op {
            set_alignment(dom, *region, *align);
            outcome.regions_applied += 1;
            continue;
        }
        let Some((start, end)) = TextRange::covering(dom, *region).and_then(|range| range.ordered(dom)) else {
            continue;
        };
        apply_to_range(dom, bindings, start, end, op, limits);
        outcome.regions_applied += 1;
    }

    debug!(
        primary = outcome.primary_applied,
        regions = outcome.regions_applied,
        "Applied format"
    );
    outcome
}

fn apply_to_range(
    dom: &mut Dom,
    bindings: &Bindings,
    start: TextPosition,
    end: TextPosition,
    op: &FormatOp,
    limits: &FormatLimits,
) -> Option<TextRange> {
    if let FormatOp::Align { align } = op {
        let mut targets = Vec::new();
        for text in text_nodes_between(dom, start.node, end.node) {
            if let Some(block) = alignment_target(dom, bindings, text) {
                if !targets.contains(&block) {
                    targets.push(block);
                }
            }
        }
        for block in targets {
            set_alignment(dom, block, *align);
        }
        return Some(TextRange::new(start, end));
    }

    let preceding = preceding_char(dom, start);
    let segments = split_range(dom, start, end);
    if segments.is_empty() {
        return None;
    }

    match op {
        FormatOp::FontSize { change } => {
            for segment in &segments {
                let current = resolved_font_size(dom, *segment);
                let target = match change {
                    FontSizeChange::Step(delta) => current + delta,
                    FontSizeChange::Absolute(size) => *size,
                };
                let size = limits.clamp_font_size(target);
                style_segment(dom, *segment, "font-size", &format_px(size));
            }
        }
        FormatOp::FontFamily { family } => {
            let stack = font_stack(family).unwrap_or("");
            for segment in &segments {
                if stack.is_empty() {
                    clear_segment_style(dom, *segment, "font-family");
                } else {
                    style_segment(dom, *segment, "font-family", stack);
                }
            }
        }
        FormatOp::TextColor { color } => {
            for segment in &segments {
                style_segment(dom, *segment, "color", color.trim());
            }
        }
        FormatOp::Toggle { format } => toggle_segments(dom, &segments, *format),
        FormatOp::Case { transform } => {
            let mut previous = preceding;
            for segment in &segments {
                let Some(text) = dom.text(*segment).map(str::to_string) else {
                    continue;
                };
                let transformed = transform_case(&text, *transform, previous);
                previous = text.chars().last().or(previous);
                dom.set_text(*segment, transformed);
            }
        }
        FormatOp::Align { .. } => {}
    }

    let first = *segments.first()?;
    let last = *segments.last()?;
    let last_len = dom.text(last).map(char_len)?;
    Some(TextRange::new(
        TextPosition::new(first, 0),
        TextPosition::new(last, last_len),
    ))
}

fn preceding_char(dom: &Dom, position: TextPosition) -> Option<char> {
    if position.offset == 0 {
        return None;
    }
    dom.text(position.node)?.chars().nth(position.offset - 1)
}

/// Split boundary text nodes so the range is covered by whole text nodes,
/// then return those nodes
fn split_range(dom: &mut Dom, start: TextPosition, end: TextPosition) -> Vec<NodeId> {
    let text_len = |dom: &Dom, node: NodeId| dom.text(node).map(char_len).unwrap_or(0);

    if start.node == end.node {
        if start.offset >= end.offset {
            return Vec::new();
        }
        let node = start.node;
        if end.offset < text_len(dom, node) {
            dom.split_text(node, end.offset);
        }
        let segment = if start.offset > 0 {
            match dom.split_text(node, start.offset) {
                Some(tail) => tail,
                None => return Vec::new(),
            }
        } else {
            node
        };
        return vec![segment];
    }

    let end_included = end.offset > 0;
    if end_included && end.offset < text_len(dom, end.node) {
        dom.split_text(end.node, end.offset);
    }

    let start_segment = if start.offset >= text_len(dom, start.node) {
        None
    } else if start.offset > 0 {
        dom.split_text(start.node, start.offset)
    } else {
        Some(start.node)
    };

    let all = dom.text_descendants(dom.root());
    let first = match start_segment {
        Some(segment) => all.iter().position(|n| *n == segment),
        None => all.iter().position(|n| *n == start.node).map(|i| i + 1),
    };
    let last = all.iter().position(|n| *n == end.node).and_then(|i| {
        if end_included {
            Some(i)
        } else {
            i.checked_sub(1)
        }
    });
    let (Some(first), Some(last)) = (first, last) else {
        return Vec::new();
    };
    if first > last {
        return Vec::new();
    }

    all[first..=last]
        .iter()
        .copied()
        .filter(|segment| is_stylable(dom, *segment))
        .collect()
}

fn is_stylable(dom: &Dom, segment: NodeId) -> bool {
    if dom
        .closest(segment, |e| e.is("svg") || e.is("script") || e.is("style"))
        .is_some()
    {
        return false;
    }
    let whitespace_only = dom.text(segment).map(|t| t.trim().is_empty()).unwrap_or(true);
    if !whitespace_only {
        return true;
    }
    dom.parent(segment)
        .and_then(|parent| dom.element(parent))
        .map(|parent| INLINE_TAGS.iter().any(|tag| parent.is(tag)))
        .unwrap_or(false)
}

fn single_child_span(dom: &Dom, segment: NodeId) -> Option<NodeId> {
    let parent = dom.parent(segment)?;
    (dom.is_element(parent, "span") && dom.children(parent).len() == 1).then_some(parent)
}

/// Put `property: value` on the segment, merging into a single-child span
fn style_segment(dom: &mut Dom, segment: NodeId, property: &str, value: &str) -> Option<NodeId> {
    if let Some(span) = single_child_span(dom, segment) {
        dom.element_mut(span)?.set_style_property(property, value);
        return Some(span);
    }
    let mut span = Element::new("span");
    span.set_style_property(property, value);
    dom.wrap(segment, span)
}

fn clear_segment_style(dom: &mut Dom, segment: NodeId, property: &str) {
    if let Some(span) = single_child_span(dom, segment) {
        if let Some(element) = dom.element_mut(span) {
            element.remove_style_property(property);
        }
    }
}

fn toggle_segments(dom: &mut Dom, segments: &[NodeId], format: ToggleFormat) {
    let has_format = |dom: &Dom, segment: NodeId| {
        computed_style(dom, segment)
            .map(|style| format.is_set(&style))
            .unwrap_or(false)
    };
    let remove = segments.iter().all(|segment| has_format(dom, *segment));

    for segment in segments {
        if !remove {
            if !has_format(dom, *segment) {
                dom.wrap(*segment, Element::new(format.tag()));
            }
            continue;
        }

        if let Some(parent) = dom.parent(*segment) {
            let direct_wrapper = dom
                .element(parent)
                .map(|e| format.wrapper_tags().iter().any(|tag| e.is(tag)) && e.attributes.is_empty())
                .unwrap_or(false);
            if direct_wrapper && dom.children(parent).len() == 1 {
                dom.unwrap(parent);
            }
        }
        if let Some(style) = computed_style(dom, *segment) {
            if format.is_set(&style) {
                let (property, value) = format.neutralizer(&style);
                style_segment(dom, *segment, property, value);
            }
        }
    }
}

/// Transform letter case. `previous` is the character before the text,
/// used to find word starts for title case.
pub fn transform_case(text: &str, transform: CaseTransform, previous: Option<char>) -> String {
    match transform {
        CaseTransform::Upper => text.to_uppercase(),
        CaseTransform::Lower => text.to_lowercase(),
        CaseTransform::Title => {
            let mut out = String::with_capacity(text.len());
            let mut word_start = previous.map(char::is_whitespace).unwrap_or(true);
            for ch in text.chars() {
                if word_start {
                    out.extend(ch.to_uppercase());
                } else {
                    out.extend(ch.to_lowercase());
                }
                word_start = ch.is_whitespace();
            }
            out
        }
    }
}

/// Element whose `text-align` controls the text at `node`
fn alignment_target(dom: &Dom, bindings: &Bindings, node: NodeId) -> Option<NodeId> {
    if let Some(region) = bindings.region_containing(dom, node) {
        return Some(region.node);
    }
    dom.closest(node, |e| {
        matches!(
            e.name().as_str(),
            "p" | "div" | "h1" | "h2" | "h3" | "h4" | "h5" | "h6" | "li" | "td" | "th" | "blockquote" | "section"
        )
    })
}

fn set_alignment(dom: &mut Dom, block: NodeId, align: Alignment) {
    if let Some(element) = dom.element_mut(block) {
        element.set_style_property("text-align", align.as_css());
    }
}

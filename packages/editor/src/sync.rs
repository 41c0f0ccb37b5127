//! # Derived-Content Synchronizer
//!
//! Keeps visuals consistent with the numbers they represent.
//!
//! ## Design
//!
//! Derivations are one-way: the text value is the source of truth and
//! the visual is rewritten from it.
//! - **Deterministic**: the same markup always yields the same result
//! - **Idempotent**: running twice equals running once
//! - **Total**: anything that does not match is left alone
//!
//! `BarSync` runs before every commit through the `SyncEngine`. Chart
//! sync and the progress popover are explicit user operations.

use crate::bindings::{dash_array, discover_bars, discover_charts, parse_percent, BarBinding, GRID_UNITS};
use regex::Regex;
use std::sync::OnceLock;
use tracing::debug;
use vellum_parser::{Dom, Element, NodeId};

/// A derivation rerun before each commit
pub trait Derivation: std::fmt::Debug {
    fn name(&self) -> &'static str;

    /// Rewrite derived content. Returns the number of elements changed.
    fn apply(&self, dom: &mut Dom) -> usize;
}

/// Column spans of two-cell grid rows follow the label percentage
#[derive(Debug)]
pub struct BarSync;

impl Derivation for BarSync {
    fn name(&self) -> &'static str {
        "bar-sync"
    }

    fn apply(&self, dom: &mut Dom) -> usize {
        sync_bars(dom)
    }
}

/// Runs every registered derivation in order
#[derive(Debug)]
pub struct SyncEngine {
    derivations: Vec<Box<dyn Derivation>>,
}

impl SyncEngine {
    /// Engine with the default derivations
    pub fn new() -> Self {
        Self {
            derivations: vec![Box::new(BarSync)],
        }
    }

    pub fn empty() -> Self {
        Self {
            derivations: Vec::new(),
        }
    }

    pub fn register(&mut self, derivation: Box<dyn Derivation>) {
        self.derivations.push(derivation);
    }

    pub fn run(&self, dom: &mut Dom) -> usize {
        let mut changed = 0;
        for derivation in &self.derivations {
            let count = derivation.apply(dom);
            if count > 0 {
                debug!(derivation = derivation.name(), changed = count, "Derivation updated document");
            }
            changed += count;
        }
        changed
    }
}

impl Default for SyncEngine {
    fn default() -> Self {
        Self::new()
    }
}

/// Spans for a percentage on the 12-unit grid, `None` when either side
/// would be empty
pub fn bar_spans(percent: f64) -> Option<(u32, u32)> {
    let fill = (GRID_UNITS as f64 * percent / 100.0).round() as u32;
    if fill == 0 || fill >= GRID_UNITS {
        return None;
    }
    Some((fill, GRID_UNITS - fill))
}

/// Replace (in place) or add the `col-span-N` class. Returns whether the
/// class list changed.
pub fn set_col_span(element: &mut Element, span: u32) -> bool {
    let target = format!("col-span-{}", span);
    let before: Vec<String> = element.classes().map(str::to_string).collect();
    let mut after = before.clone();
    match after.iter_mut().find(|class| is_col_span_class(class)) {
        Some(existing) => *existing = target,
        None => after.push(target),
    }
    if after == before {
        return false;
    }
    element.set_classes(after.iter().map(String::as_str));
    true
}

fn is_col_span_class(class: &str) -> bool {
    class
        .strip_prefix("col-span-")
        .map(|n| !n.is_empty() && n.chars().all(|c| c.is_ascii_digit()))
        .unwrap_or(false)
}

fn apply_spans(dom: &mut Dom, bar: &BarBinding, fill: u32, label: u32) -> bool {
    let mut changed = collapse_fill(dom, bar, false);
    if let Some(element) = dom.element_mut(bar.fill) {
        changed |= set_col_span(element, fill);
    }
    if let Some(element) = dom.element_mut(bar.label) {
        changed |= set_col_span(element, label);
    }
    changed
}

/// An empty bar keeps its spans and hides the fill cell with `width: 0%`;
/// any span update clears it again.
fn collapse_fill(dom: &mut Dom, bar: &BarBinding, collapsed: bool) -> bool {
    let Some(element) = dom.element_mut(bar.fill) else {
        return false;
    };
    let is_collapsed = element
        .style_property("width")
        .map(|width| width.trim() == "0%")
        .unwrap_or(false);
    match (collapsed, is_collapsed) {
        (true, false) => element.set_style_property("width", "0%"),
        (false, true) => element.remove_style_property("width"),
        _ => return false,
    }
    true
}

/// Set every bar's spans from its label. Returns the number of rows
/// changed.
pub fn sync_bars(dom: &mut Dom) -> usize {
    let mut changed = 0;
    for bar in discover_bars(dom) {
        let Some((fill, label)) = bar.percent.and_then(bar_spans) else {
            continue;
        };
        if apply_spans(dom, &bar, fill, label) {
            changed += 1;
        }
    }
    changed
}

/// Number formatting used in dash arrays and labels: up to four
/// decimals, no trailing zeros
pub fn format_number(value: f64) -> String {
    let text = format!("{:.4}", value);
    let text = text.trim_end_matches('0').trim_end_matches('.');
    if text == "-0" {
        "0".to_string()
    } else {
        text.to_string()
    }
}

fn percent_label_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^\d+(\.\d+)?%$").expect("percent label regex is valid"))
}

fn section_class_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)(section|card|chart|panel|widget|stat|donut|progress)")
            .expect("section class regex is valid")
    })
}

fn is_percent_label(dom: &Dom, node: NodeId) -> bool {
    dom.text(node)
        .map(|text| percent_label_regex().is_match(text.trim()))
        .unwrap_or(false)
}

/// Percentage labels under the nearest section-like ancestor that has
/// any, in document order
fn chart_labels(dom: &Dom, svg: NodeId) -> Vec<NodeId> {
    for ancestor in dom.ancestors(svg) {
        let Some(element) = dom.element(ancestor) else {
            continue;
        };
        let plausible =
            element.is("section") || element.classes().any(|class| section_class_regex().is_match(class));
        if !plausible {
            continue;
        }
        let labels: Vec<NodeId> = dom
            .text_descendants(ancestor)
            .into_iter()
            .filter(|node| is_percent_label(dom, *node))
            .collect();
        if !labels.is_empty() {
            return labels;
        }
    }
    Vec::new()
}

fn write_dash(element: &mut Element, property: &str, value: String) {
    if element.attr(property).is_none() && element.style_property(property).is_some() {
        element.set_style_property(property, value);
    } else {
        element.set_attr(property, value);
    }
}

/// Result of a chart update
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ChartSyncReport {
    pub charts: usize,
    pub labels: usize,
}

/// Point every two-arc chart at `percent` and update nearby percentage
/// labels: first and second label get `percent`, a third gets the
/// complement. Label discovery is best-effort.
pub fn set_chart_percentage(dom: &mut Dom, percent: f64) -> ChartSyncReport {
    let percent = percent.clamp(0.0, 100.0);
    let complement = 100.0 - percent;
    let mut report = ChartSyncReport::default();

    for chart in discover_charts(dom) {
        if let Some(primary) = dom.element_mut(chart.primary) {
            write_dash(primary, "stroke-dasharray", format!("{}, 100", format_number(percent)));
        }
        if let Some(secondary) = dom.element_mut(chart.secondary) {
            write_dash(
                secondary,
                "stroke-dasharray",
                format!("{}, 100", format_number(complement)),
            );
            let offset = if percent == 0.0 {
                "0".to_string()
            } else {
                format!("-{}", format_number(percent))
            };
            write_dash(secondary, "stroke-dashoffset", offset);
        }
        report.charts += 1;

        let labels = chart_labels(dom, chart.svg);
        for (index, label) in labels.into_iter().take(3).enumerate() {
            let value = if index < 2 { percent } else { complement };
            replace_trimmed(dom, label, &format!("{}%", format_number(value)));
            report.labels += 1;
        }
    }

    debug!(percent, charts = report.charts, labels = report.labels, "Chart percentage set");
    report
}

/// Replace the non-whitespace part of a text node, keeping its padding
fn replace_trimmed(dom: &mut Dom, node: NodeId, replacement: &str) {
    let Some(text) = dom.text(node).map(str::to_string) else {
        return;
    };
    let leading = &text[..text.len() - text.trim_start().len()];
    let trailing = &text[text.trim_end().len()..];
    dom.set_text(node, format!("{}{}{}", leading, replacement, trailing));
}

/// Set one bar from the progress popover: label text, column spans (or
/// a collapsed fill when empty) and any inline percentage width under the
/// fill cell. Returns false when
/// the bar no longer resolves.
pub fn set_bar_percentage(dom: &mut Dom, bar: &BarBinding, percent: f64) -> bool {
    if !dom.is_attached(bar.row) || !dom.is_attached(bar.label) || !dom.is_attached(bar.fill) {
        return false;
    }
    let percent = percent.clamp(0.0, 100.0);
    let label_text = format!("{}%", format_number(percent));

    let existing = dom
        .text_descendants(bar.label)
        .into_iter()
        .find(|node| dom.text(*node).and_then(parse_percent).is_some());
    match existing {
        Some(node) => replace_trimmed(dom, node, &label_text),
        None => {
            dom.clear_children(bar.label);
            let text = dom.create_text(label_text);
            dom.append(bar.label, text);
        }
    }

    // The derivation leaves extremes alone; an explicit value still has
    // to show: a full bar spans the whole row (the label wraps below it)
    // and an empty one collapses its fill cell
    let fill_units = (GRID_UNITS as f64 * percent / 100.0).round() as u32;
    match bar_spans(percent) {
        Some((fill, label)) => {
            apply_spans(dom, bar, fill, label);
        }
        None if fill_units >= GRID_UNITS => {
            apply_spans(dom, bar, GRID_UNITS, GRID_UNITS);
        }
        None => {
            collapse_fill(dom, bar, true);
        }
    }

    let width = format!("{}%", format_number(percent));
    // The fill cell itself is sized by its span
    for node in dom.descendants(bar.fill) {
        if let Some(element) = dom.element_mut(node) {
            let has_percent_width = element
                .style_property("width")
                .map(|w| w.trim().ends_with('%'))
                .unwrap_or(false);
            if has_percent_width {
                element.set_style_property("width", width.clone());
            }
        }
    }
    true
}

/// Current chart percentage read back from the first chart
pub fn chart_percentage(dom: &Dom) -> Option<f64> {
    discover_charts(dom).first().and_then(|chart| chart.percent)
}

/// Dash array of a node, for inspection
pub fn node_dash_array(dom: &Dom, node: NodeId) -> Option<String> {
    dom.element(node).and_then(dash_array)
}

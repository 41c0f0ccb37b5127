//! # Edit Session
//!
//! Top-level controller for one open template. Owns the live document
//! and routes every user action through the subsystems:
//!
//! ```text
//! input ──▶ selection / overlay / formatting ──▶ live Dom
//!                                                  │ commit (blur, release, debounce)
//!                                                  ▼
//!                               Pipeline: derivations ─▶ Snapshot ─▶ History
//!                                                  │
//!                                    autosave (debounced) ─▶ KeyValueStore
//! ```
//!
//! Stale node ids, empty selections and detached elements turn
//! operations into no-ops. Storage and export failures become
//! notifications; neither leaves the document half-applied.

use crate::bindings::{discover, Bindings, EditableRegion};
use crate::config::SessionConfig;
use crate::debounce::{Clock, Debouncer, SystemClock};
use crate::errors::EditorError;
use crate::export::{ExportError, ExportOptions, Exporter, RenderTarget};
use crate::formatting::{apply_format, format_summary, FormatOp, FormatOutcome, FormatSummary};
use crate::history::{History, Snapshot};
use crate::overlay::{
    clean_options, commit_region_resize, handle_points, marquee_hits, AspectMode, ElementClipboard,
    FloatingImageId, FloatingLayer, GestureMachine, GestureOutcome, HandlePosition, LayoutProvider, Point,
    PointerTarget, Size,
};
use crate::pipeline::{CommitResult, Pipeline};
use crate::selection::{SelectionState, TextRange};
use crate::storage::{discard_state, load_saved_state, save_state, KeyValueStore};
use crate::sync::{chart_percentage, set_bar_percentage, set_chart_percentage, ChartSyncReport};
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::{debug, info, instrument, warn};
use vellum_compiler_html::{compile_template, suggested_file_name, CompileOptions};
use vellum_parser::css::{is_hex_color, substitute_color_values};
use vellum_parser::{document_id, parse_fragment, parse_template, serialize_children, Dom, NodeId, Template};

/// Debounced work, one pending timer each
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Concern {
    Autosave,
    ColorCommit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum NotificationLevel {
    Info,
    Error,
}

/// Transient user-visible message
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub level: NotificationLevel,
    pub message: String,
}

impl Notification {
    fn info(message: impl Into<String>) -> Self {
        Self {
            level: NotificationLevel::Info,
            message: message.into(),
        }
    }

    fn error(message: impl Into<String>) -> Self {
        Self {
            level: NotificationLevel::Error,
            message: message.into(),
        }
    }
}

/// Which rasterization an export asks for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportKind {
    Raster,
    Vector,
    Clipboard,
}

/// An export in flight. The session stays busy until it is finished.
#[derive(Debug, Clone, PartialEq)]
pub struct ExportJob {
    pub kind: ExportKind,
    pub target: RenderTarget,
    pub options: ExportOptions,
}

pub struct EditSession {
    config: SessionConfig,
    document_id: String,
    template: Template,
    dom: Dom,
    bindings: Bindings,
    colors: BTreeMap<String, String>,
    pipeline: Pipeline,
    selection: SelectionState,
    summary: Option<FormatSummary>,
    floating: FloatingLayer,
    gestures: GestureMachine,
    clipboard: ElementClipboard,
    debouncer: Debouncer<Concern>,
    clock: Box<dyn Clock>,
    store: Option<Box<dyn KeyValueStore>>,
    saved_state: Option<Snapshot>,
    notifications: Vec<Notification>,
    text_dirty: bool,
    style_engine_ready: bool,
    scripts_released: bool,
    export_busy: bool,
}

impl EditSession {
    /// Open a template. `name` identifies the document for persistence.
    #[instrument(skip(raw, config), fields(bytes = raw.len()))]
    pub fn open(name: &str, raw: &str, config: SessionConfig) -> Self {
        let template = parse_template(raw);
        let mut dom = parse_fragment(&template.body_markup);
        let colors = template.default_colors();
        let mut pipeline = Pipeline::new(config.history_capacity);

        // Baseline entry; never persisted on its own
        pipeline.commit(&mut dom, &colors);
        let bindings = discover(&dom);

        info!(
            regions = bindings.regions.len(),
            charts = bindings.charts.len(),
            bars = bindings.bars.len(),
            "Opened template"
        );

        Self {
            config,
            document_id: document_id(name),
            template,
            dom,
            bindings,
            colors,
            pipeline,
            selection: SelectionState::new(),
            summary: None,
            floating: FloatingLayer::new(),
            gestures: GestureMachine::new(),
            clipboard: ElementClipboard::new(),
            debouncer: Debouncer::new(),
            clock: Box::new(SystemClock),
            store: None,
            saved_state: None,
            notifications: Vec::new(),
            text_dirty: false,
            style_engine_ready: false,
            scripts_released: false,
            export_busy: false,
        }
    }

    pub fn with_clock(mut self, clock: Box<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Attach persistence. A saved state for this document, if any, is
    /// offered but not applied.
    pub fn with_store(mut self, store: Box<dyn KeyValueStore>) -> Self {
        self.saved_state = load_saved_state(store.as_ref(), &self.document_id)
            .filter(|saved| Some(saved) != self.pipeline.history().current());
        self.store = Some(store);
        self
    }

    // Document state

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn document_id(&self) -> &str {
        &self.document_id
    }

    pub fn template(&self) -> &Template {
        &self.template
    }

    pub fn dom(&self) -> &Dom {
        &self.dom
    }

    pub fn bindings(&self) -> &Bindings {
        &self.bindings
    }

    pub fn regions(&self) -> &[EditableRegion] {
        &self.bindings.regions
    }

    pub fn colors(&self) -> &BTreeMap<String, String> {
        &self.colors
    }

    pub fn history(&self) -> &History {
        self.pipeline.history()
    }

    /// Live body markup without UI markers
    pub fn body_markup(&self) -> String {
        serialize_children(&self.dom, self.dom.root(), &clean_options())
    }

    /// Scoped style text with the current color values
    pub fn rendered_style(&self) -> String {
        substitute_color_values(&self.template.style_text, &self.colors)
    }

    /// Pending notifications, oldest first
    pub fn take_notifications(&mut self) -> Vec<Notification> {
        std::mem::take(&mut self.notifications)
    }

    // Saved state

    pub fn saved_state_available(&self) -> bool {
        self.saved_state.is_some()
    }

    /// Replace the document with the saved state. Undo returns to the
    /// freshly opened template.
    pub fn restore_saved_state(&mut self) -> Result<(), EditorError> {
        let snapshot = self.saved_state.take().ok_or(EditorError::NoSavedState)?;
        self.restore_snapshot(&snapshot);
        self.commit();
        info!(document = %self.document_id, "Restored saved state");
        Ok(())
    }

    pub fn discard_saved_state(&mut self) {
        if self.saved_state.take().is_none() {
            return;
        }
        if let Some(store) = self.store.as_mut() {
            if let Err(e) = discard_state(store.as_mut(), &self.document_id) {
                warn!(error = %e, "Failed to discard saved state");
                self.notifications.push(Notification::error("Could not clear the saved copy"));
            }
        }
    }

    // Commit plumbing

    fn commit(&mut self) -> CommitResult {
        self.text_dirty = false;
        self.debouncer.cancel(&Concern::ColorCommit);
        let result = self.pipeline.commit(&mut self.dom, &self.colors);
        self.rebind();
        if result.outcome.is_recorded() {
            let now = self.clock.now();
            self.debouncer
                .schedule(Concern::Autosave, now, self.config.autosave_delay());
        }
        result
    }

    /// Commit anything still pending (uncommitted text, color drag)
    fn settle(&mut self) {
        if self.text_dirty || self.debouncer.is_pending(&Concern::ColorCommit) {
            self.commit();
        }
    }

    /// Rediscover bindings after the document changed
    fn rebind(&mut self) {
        self.bindings = discover(&self.dom);
        self.selection.prune(&self.dom);
        self.refresh_summary();
    }

    fn refresh_summary(&mut self) {
        self.summary = self
            .selection
            .active_range(&self.dom)
            .and_then(|range| format_summary(&self.dom, &self.bindings, range.anchor));
    }

    fn restore_snapshot(&mut self, snapshot: &Snapshot) {
        self.pipeline.history_mut().begin_restore();
        self.dom = parse_fragment(&snapshot.body_markup);
        self.colors = snapshot.colors.clone();
        self.text_dirty = false;
        self.debouncer.cancel(&Concern::ColorCommit);
        self.selection.clear();
        self.clipboard.reset_selection();
        self.gestures.cancel(&mut self.floating);
        self.rebind();
        self.pipeline.history_mut().end_restore();
    }

    fn persist(&mut self) {
        let Some(store) = self.store.as_mut() else {
            return;
        };
        let Some(snapshot) = self.pipeline.history().current() else {
            return;
        };
        if let Err(e) = save_state(store.as_mut(), &self.document_id, snapshot) {
            warn!(error = %e, document = %self.document_id, "Autosave failed");
            self.notifications.push(Notification::error("Could not save your changes locally"));
        }
    }

    /// Fire due debounced work. Returns what fired.
    pub fn tick(&mut self) -> Vec<Concern> {
        let due = self.debouncer.take_due(self.clock.now());
        for concern in &due {
            match concern {
                Concern::ColorCommit => {
                    self.commit();
                }
                Concern::Autosave => self.persist(),
            }
        }
        due
    }

    /// Run all pending debounced work now
    pub fn flush(&mut self) {
        self.settle();
        if self.debouncer.cancel(&Concern::Autosave) {
            self.persist();
        }
    }

    // Text editing

    /// Replace the content of a text node inside an editable region.
    /// Committed when the region loses focus.
    pub fn edit_text(&mut self, node: NodeId, content: &str) -> bool {
        if self.dom.text(node).is_none() || self.bindings.region_containing(&self.dom, node).is_none() {
            return false;
        }
        if !self.dom.set_text(node, content) {
            return false;
        }
        self.text_dirty = true;
        true
    }

    /// Replace a whole region's content with plain text
    pub fn set_region_text(&mut self, region: NodeId, content: &str) -> bool {
        if self.bindings.region_by_node(region).is_none() || !self.dom.is_attached(region) {
            return false;
        }
        self.dom.clear_children(region);
        let text = self.dom.create_text(content);
        self.dom.append(region, text);
        self.text_dirty = true;
        self.selection.prune(&self.dom);
        true
    }

    /// Focus left the edited region
    pub fn blur(&mut self) -> Option<CommitResult> {
        if !self.text_dirty {
            return None;
        }
        Some(self.commit())
    }

    // Selection

    pub fn set_selection(&mut self, range: TextRange) {
        self.selection.set_live(range);
        self.refresh_summary();
    }

    /// Focus moved into a toolbar control; the last selection stays usable
    pub fn focus_control(&mut self) {
        self.selection.focus_control();
    }

    pub fn focus_canvas(&mut self) {
        self.selection.focus_canvas();
    }

    pub fn selection(&self) -> &SelectionState {
        &self.selection
    }

    /// Modifier-click on a region
    pub fn toggle_region(&mut self, region: NodeId) -> bool {
        if self.bindings.region_by_node(region).is_none() {
            return false;
        }
        self.selection.multi_mut().toggle(region)
    }

    pub fn multi_selection(&self) -> &[NodeId] {
        self.selection.multi().nodes()
    }

    // Formatting

    pub fn format_summary(&self) -> Option<&FormatSummary> {
        self.summary.as_ref()
    }

    /// Apply a formatting operation as one undoable step
    pub fn apply_format(&mut self, op: &FormatOp) -> FormatOutcome {
        let region_of = |node: NodeId| self.bindings.region_containing(&self.dom, node).map(|region| region.node);
        let resolved = self.selection.resolve(&self.dom, region_of);
        if resolved.is_empty() && resolved.anchor.is_none() {
            return FormatOutcome::default();
        }

        // Pre-operation state
        self.commit();

        let limits = self.config.format_limits();
        let outcome = apply_format(&mut self.dom, &self.bindings, &resolved, op, &limits);
        if !outcome.changed() {
            return outcome;
        }

        if let Some(range) = outcome.selection {
            let in_control = self.selection.is_control_focused();
            self.selection.set_live(range);
            if in_control {
                self.selection.focus_control();
            }
        }
        self.commit();
        outcome
    }

    // Colors

    /// Live color change; committed after the color debounce window
    pub fn set_color(&mut self, name: &str, value: &str) -> Result<(), EditorError> {
        if self.template.color_variable(name).is_none() {
            return Err(EditorError::UnknownColorVariable(name.to_string()));
        }
        if !is_hex_color(value) {
            return Err(EditorError::InvalidColor(value.to_string()));
        }
        self.colors.insert(name.to_string(), value.to_lowercase());
        let now = self.clock.now();
        self.debouncer
            .schedule(Concern::ColorCommit, now, self.config.color_commit_delay());
        Ok(())
    }

    // History

    pub fn undo(&mut self) -> bool {
        self.settle();
        let Some(snapshot) = self.pipeline.history_mut().undo().cloned() else {
            return false;
        };
        self.restore_snapshot(&snapshot);
        debug!(cursor = ?self.pipeline.history().cursor(), "Undo");
        true
    }

    pub fn redo(&mut self) -> bool {
        self.settle();
        let Some(snapshot) = self.pipeline.history_mut().redo().cloned() else {
            return false;
        };
        self.restore_snapshot(&snapshot);
        debug!(cursor = ?self.pipeline.history().cursor(), "Redo");
        true
    }

    // Derived content

    pub fn chart_percentage(&self) -> Option<f64> {
        chart_percentage(&self.dom)
    }

    pub fn set_chart_percentage(&mut self, percent: f64) -> ChartSyncReport {
        if !percent.is_finite() {
            return ChartSyncReport::default();
        }
        self.settle();
        let report = set_chart_percentage(&mut self.dom, percent.clamp(0.0, 100.0));
        if report.charts > 0 {
            self.commit();
        }
        report
    }

    /// Progress popover: set one bar row's percentage
    pub fn set_bar_percentage(&mut self, row: NodeId, percent: f64) -> bool {
        if !percent.is_finite() {
            return false;
        }
        let Some(bar) = self.bindings.bars.iter().find(|bar| bar.row == row).cloned() else {
            return false;
        };
        self.settle();
        if !set_bar_percentage(&mut self.dom, &bar, percent) {
            return false;
        }
        self.commit();
        true
    }

    // Overlay

    pub fn floating(&self) -> &FloatingLayer {
        &self.floating
    }

    pub fn gestures(&self) -> &GestureMachine {
        &self.gestures
    }

    pub fn set_zoom(&mut self, zoom: f64) {
        self.gestures.set_zoom(zoom);
    }

    pub fn add_image(&mut self, source: &str, natural_size: Size, position: Point) -> FloatingImageId {
        self.floating.add(source, natural_size, position)
    }

    pub fn remove_image(&mut self, id: FloatingImageId) -> bool {
        self.floating.remove(id).is_some()
    }

    pub fn rotate_image(&mut self, id: FloatingImageId) -> Option<u16> {
        self.floating.rotate(id)
    }

    pub fn set_image_aspect(&mut self, id: FloatingImageId, mode: AspectMode) -> bool {
        self.floating.set_aspect_mode(id, mode)
    }

    /// Region holding the active selection; the only one with handles
    pub fn focused_region(&self) -> Option<NodeId> {
        let range = self.selection.active_range(&self.dom)?;
        self.bindings
            .region_containing(&self.dom, range.anchor.node)
            .map(|region| region.node)
    }

    /// Handle positions around the focused region
    pub fn region_handles(&self, layout: &dyn LayoutProvider) -> Vec<(HandlePosition, Point)> {
        self.focused_region()
            .and_then(|node| layout.bounds(node))
            .map(|bounds| handle_points(&bounds))
            .unwrap_or_default()
    }

    pub fn pointer_down(&mut self, target: PointerTarget, point: Point, layout: &dyn LayoutProvider) -> bool {
        if let PointerTarget::RegionHandle(node, _) = target {
            if self.focused_region() != Some(node) {
                return false;
            }
        }
        self.gestures.pointer_down(target, point, &self.floating, layout)
    }

    pub fn pointer_move(&mut self, point: Point) -> bool {
        self.gestures.pointer_move(point, &mut self.floating)
    }

    /// Finish the active gesture, committing region resizes and applying
    /// marquee selections
    pub fn pointer_up(&mut self, point: Point, layout: &dyn LayoutProvider) -> GestureOutcome {
        let outcome = self.gestures.pointer_up(point, &mut self.floating);
        match &outcome {
            GestureOutcome::RegionResized { node, preview } => {
                self.settle();
                if commit_region_resize(&mut self.dom, *node, preview) {
                    self.commit();
                }
            }
            GestureOutcome::Marquee(rect) => {
                let hits = marquee_hits(rect, &self.bindings.regions, layout);
                debug!(hits = hits.len(), "Marquee released");
                if hits.is_empty() {
                    self.selection.multi_mut().clear();
                    self.summary = None;
                } else {
                    self.selection.multi_mut().replace(hits);
                }
            }
            _ => {}
        }
        outcome
    }

    pub fn cancel_gesture(&mut self) {
        self.gestures.cancel(&mut self.floating);
    }

    // Element clipboard

    /// Modifier-click selects a structural element
    pub fn select_element(&mut self, node: NodeId) -> bool {
        self.clipboard.select(&mut self.dom, node)
    }

    pub fn selected_element(&mut self) -> Option<NodeId> {
        self.clipboard.selected(&self.dom)
    }

    pub fn copy_element(&mut self) -> bool {
        self.clipboard.copy(&self.dom)
    }

    /// Paste after the selected element, or at the end of the document
    pub fn paste_element(&mut self) -> Vec<NodeId> {
        self.settle();
        let mut inserted = self.clipboard.paste(&mut self.dom);
        if inserted.is_empty() {
            return inserted;
        }
        if self.reparse_if_unstable() {
            // Node ids from the pre-reparse tree no longer resolve
            inserted.clear();
        }
        self.commit();
        inserted
    }

    /// Keep the live tree equal to what its own markup parses back to, so
    /// undo and redo reproduce it exactly
    fn reparse_if_unstable(&mut self) -> bool {
        let markup = self.body_markup();
        let reparsed = parse_fragment(&markup);
        if serialize_children(&reparsed, reparsed.root(), &clean_options()) == markup {
            return false;
        }
        warn!("Pasted markup does not survive a reparse; normalizing");
        self.dom = reparsed;
        self.clipboard.reset_selection();
        self.selection.clear();
        true
    }

    pub fn delete_element(&mut self) -> bool {
        self.settle();
        if !self.clipboard.delete(&mut self.dom) {
            return false;
        }
        self.commit();
        true
    }

    /// Escape: drop element and multi-region selections
    pub fn escape(&mut self) {
        self.clipboard.clear_selection(&mut self.dom);
        self.selection.multi_mut().clear();
        self.cancel_gesture();
    }

    // Scripts

    pub fn mark_style_engine_ready(&mut self) {
        self.style_engine_ready = true;
    }

    pub fn style_engine_ready(&self) -> bool {
        self.style_engine_ready
    }

    /// Head scripts in source order, handed out once after the style
    /// engine is ready
    pub fn take_runnable_scripts(&mut self) -> Result<Vec<String>, EditorError> {
        if !self.style_engine_ready {
            return Err(EditorError::StyleEngineNotReady);
        }
        if self.scripts_released {
            return Ok(Vec::new());
        }
        self.scripts_released = true;
        Ok(self.template.inline_scripts.clone())
    }

    // Output

    /// Standalone template with the current markup and colors
    pub fn save_as_template(&mut self, options: CompileOptions) -> Result<String, EditorError> {
        self.flush();
        let markup = self.body_markup();
        Ok(compile_template(&self.template, &markup, &self.colors, options)?)
    }

    pub fn suggested_file_name(&self) -> String {
        suggested_file_name(&self.template)
    }

    pub fn is_exporting(&self) -> bool {
        self.export_busy
    }

    /// Settle the document and hand out the render target. The session
    /// stays busy until `finish_export`.
    pub fn begin_export(&mut self, kind: ExportKind, options: ExportOptions) -> Result<ExportJob, EditorError> {
        if self.export_busy {
            return Err(EditorError::ExportBusy);
        }
        if !self.style_engine_ready {
            return Err(EditorError::StyleEngineNotReady);
        }
        self.flush();
        let markup = self.body_markup();
        let standalone = compile_template(
            &self.template,
            &markup,
            &self.colors,
            CompileOptions {
                pretty: false,
                ..CompileOptions::default()
            },
        )?;
        self.export_busy = true;
        Ok(ExportJob {
            kind,
            target: RenderTarget::new(standalone, &self.floating),
            options: options.normalized(),
        })
    }

    /// Clear the busy flag. Failures become a notification.
    pub fn finish_export(&mut self, result: Result<Vec<u8>, ExportError>) -> Result<Vec<u8>, EditorError> {
        self.export_busy = false;
        match result {
            Ok(bytes) => {
                info!(bytes = bytes.len(), "Export finished");
                Ok(bytes)
            }
            Err(e) => {
                warn!(error = %e, "Export failed");
                self.notifications.push(Notification::error(format!("Export failed: {}", e)));
                Err(e.into())
            }
        }
    }

    /// Run a whole export against `exporter`. Clipboard copies return an
    /// empty buffer on success.
    pub fn export(
        &mut self,
        exporter: &mut dyn Exporter,
        kind: ExportKind,
        options: ExportOptions,
    ) -> Result<Vec<u8>, EditorError> {
        let job = self.begin_export(kind, options)?;
        let result = match job.kind {
            ExportKind::Raster => exporter.rasterize(&job.target, &job.options),
            ExportKind::Vector => exporter.rasterize_vector(&job.target, &job.options),
            ExportKind::Clipboard => {
                if exporter.copy_to_clipboard(&job.target, &job.options) {
                    self.notifications.push(Notification::info("Copied to clipboard"));
                    Ok(Vec::new())
                } else {
                    Err(ExportError::Rasterize("clipboard copy failed".into()))
                }
            }
        };
        self.finish_export(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::debounce::ManualClock;
    use crate::formatting::ToggleFormat;
    use crate::selection::TextPosition;
    use crate::storage::MemoryStore;
    use std::time::Duration;

    const TEMPLATE: &str = r#"<html><head><title>Report</title>
<style>:root { --bg: #ffffff; --fg: #000000; }</style>
<script>window.ready = true</script></head>
<body class="p-4"><h1>Revenue</h1><p>Up twelve percent</p></body></html>"#;

    fn session() -> (EditSession, ManualClock) {
        let clock = ManualClock::new();
        let session =
            EditSession::open("report.html", TEMPLATE, SessionConfig::default()).with_clock(Box::new(clock.clone()));
        (session, clock)
    }

    fn first_text(session: &EditSession, tag: &str) -> NodeId {
        let element = session.dom().first_element(tag).unwrap();
        session.dom().text_descendants(element)[0]
    }

    #[test]
    fn test_open_records_baseline() {
        let (session, _) = session();
        assert_eq!(session.history().len(), 1);
        assert_eq!(session.regions().len(), 2);
        assert_eq!(session.colors().get("--fg").map(String::as_str), Some("#000000"));
        assert!(session.rendered_style().contains(".vellum-canvas"));
    }

    #[test]
    fn test_text_commits_on_blur() {
        let (mut session, _) = session();
        let text = first_text(&session, "h1");
        assert!(session.edit_text(text, "Profit"));
        assert!(session.edit_text(text, "Profits"));
        assert_eq!(session.history().len(), 1);

        assert!(session.blur().unwrap().outcome.is_recorded());
        assert_eq!(session.history().len(), 2);
        assert!(session.blur().is_none());
    }

    #[test]
    fn test_edit_outside_region_is_noop() {
        let (mut session, _) = session();
        let stale = first_text(&session, "h1");
        session.set_region_text(session.regions()[0].node, "x");
        session.blur();
        assert!(!session.edit_text(stale, "nope"));
    }

    #[test]
    fn test_color_commit_after_debounce() {
        let (mut session, clock) = session();
        session.set_color("--fg", "#111111").unwrap();
        session.set_color("--fg", "#112233").unwrap();
        assert!(session.tick().is_empty());

        clock.advance(Duration::from_millis(300));
        assert_eq!(session.tick(), vec![Concern::ColorCommit]);
        assert_eq!(session.history().len(), 2);
        assert_eq!(
            session.history().current().unwrap().colors.get("--fg").map(String::as_str),
            Some("#112233")
        );
    }

    #[test]
    fn test_color_validation() {
        let (mut session, _) = session();
        assert!(matches!(
            session.set_color("--nope", "#fff"),
            Err(EditorError::UnknownColorVariable(_))
        ));
        assert!(matches!(
            session.set_color("--fg", "red"),
            Err(EditorError::InvalidColor(_))
        ));
    }

    #[test]
    fn test_handles_only_on_focused_region() {
        use crate::overlay::{Rect, StaticLayout};

        let (mut session, _) = session();
        let heading = session.dom().first_element("h1").unwrap();
        let paragraph = session.dom().first_element("p").unwrap();
        let mut layout = StaticLayout::new();
        layout.insert(heading, Rect::new(0.0, 0.0, 200.0, 40.0));
        layout.insert(paragraph, Rect::new(0.0, 50.0, 200.0, 20.0));

        assert!(session.region_handles(&layout).is_empty());
        let text = first_text(&session, "p");
        session.set_selection(TextRange::caret(TextPosition::new(text, 1)));
        assert_eq!(session.focused_region(), Some(paragraph));
        assert_eq!(session.region_handles(&layout).len(), 8);

        let west = PointerTarget::RegionHandle(heading, HandlePosition::West);
        assert!(!session.pointer_down(west, Point::new(0.0, 20.0), &layout));
        let west = PointerTarget::RegionHandle(paragraph, HandlePosition::West);
        assert!(session.pointer_down(west, Point::new(0.0, 60.0), &layout));
    }

    #[test]
    fn test_format_is_one_undo_step() {
        let (mut session, _) = session();
        let text = first_text(&session, "p");
        let before = session.body_markup();
        session.set_selection(TextRange::new(TextPosition::new(text, 0), TextPosition::new(text, 2)));

        let outcome = session.apply_format(&FormatOp::Toggle {
            format: ToggleFormat::Bold,
        });
        assert!(outcome.primary_applied);
        assert_eq!(session.body_markup(), "<h1>Revenue</h1><p><b>Up</b> twelve percent</p>");
        assert!(session.format_summary().unwrap().bold);

        assert!(session.undo());
        assert_eq!(session.body_markup(), before);
        assert!(session.redo());
        assert_eq!(session.body_markup(), "<h1>Revenue</h1><p><b>Up</b> twelve percent</p>");
    }

    #[test]
    fn test_saved_state_offer() {
        let mut store = MemoryStore::new();
        let saved = Snapshot::new("<p>from before</p>", BTreeMap::new());
        save_state(&mut store, &document_id("report.html"), &saved).unwrap();

        let (session, _) = session();
        let mut session = session.with_store(Box::new(store));
        assert!(session.saved_state_available());

        session.restore_saved_state().unwrap();
        assert_eq!(session.body_markup(), "<p>from before</p>");
        assert!(!session.saved_state_available());
        assert!(session.undo());
        assert!(session.body_markup().contains("Revenue"));
        assert!(matches!(session.restore_saved_state(), Err(EditorError::NoSavedState)));
    }

    #[test]
    fn test_autosave_after_commit() {
        let (session, clock) = session();
        let mut session = session.with_store(Box::new(MemoryStore::new()));
        let region = session.regions()[0].node;
        session.set_region_text(region, "Costs");
        session.blur();

        clock.advance(Duration::from_millis(999));
        assert!(session.tick().is_empty());
        clock.advance(Duration::from_millis(1));
        assert_eq!(session.tick(), vec![Concern::Autosave]);
        assert!(session.take_notifications().is_empty());
    }

    #[test]
    fn test_autosave_failure_notifies() {
        let (session, _) = session();
        let mut session = session.with_store(Box::new(MemoryStore::with_quota(4)));
        let region = session.regions()[0].node;
        session.set_region_text(region, "Costs");
        session.blur();
        session.flush();

        let notes = session.take_notifications();
        assert_eq!(notes.len(), 1);
        assert_eq!(notes[0].level, NotificationLevel::Error);
        assert!(session.body_markup().contains("Costs"));
    }

    #[test]
    fn test_scripts_wait_for_style_engine() {
        let (mut session, _) = session();
        assert!(matches!(
            session.take_runnable_scripts(),
            Err(EditorError::StyleEngineNotReady)
        ));
        session.mark_style_engine_ready();
        assert_eq!(session.take_runnable_scripts().unwrap(), vec!["window.ready = true"]);
        assert!(session.take_runnable_scripts().unwrap().is_empty());
    }

    #[test]
    fn test_export_busy_flag() {
        let (mut session, _) = session();
        session.mark_style_engine_ready();
        let job = session.begin_export(ExportKind::Raster, ExportOptions::default()).unwrap();
        assert!(job.target.markup.contains("<h1>Revenue</h1>"));
        assert!(matches!(
            session.begin_export(ExportKind::Raster, ExportOptions::default()),
            Err(EditorError::ExportBusy)
        ));

        let err = session.finish_export(Err(ExportError::Rasterize("gpu lost".into())));
        assert!(err.is_err());
        assert!(!session.is_exporting());
        assert_eq!(session.take_notifications().len(), 1);
        assert_eq!(session.history().len(), 1);
    }

    #[test]
    fn test_save_as_template_uses_current_colors() {
        let (mut session, _) = session();
        session.set_color("--bg", "#FAFAFA").unwrap();
        let out = session.save_as_template(CompileOptions::default()).unwrap();
        assert!(out.contains("--bg: #fafafa"));
        assert!(out.contains("<title>Report</title>"));
        assert_eq!(session.suggested_file_name(), "report.html");
        // The pending color commit was flushed
        assert_eq!(session.history().len(), 2);
    }
}

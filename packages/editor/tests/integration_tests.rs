//! End-to-end editing scenarios through `EditSession`

use std::time::Duration;
use vellum_editor::overlay::{GestureOutcome, PointerTarget, Point, Rect, Size, StaticLayout};
use vellum_editor::style::resolved_font_size;
use vellum_editor::{
    Background, EditSession, EditorError, ExportError, ExportKind, ExportOptions, ExportScale, Exporter,
    FontSizeChange, FormatOp, ManualClock, NodeId, RenderTarget, SessionConfig, TextPosition, TextRange,
};

const REPORT: &str = r#"<!DOCTYPE html>
<html>
<head>
  <title>Quarterly Report</title>
  <style>:root { --bg: #ffffff; --fg: #000000; } body { color: var(--fg); }</style>
</head>
<body class="p-8"><h1>Quarterly</h1><p>First</p><p>Second</p><p>Third</p><p>Fourth</p></body>
</html>"#;

fn open(raw: &str) -> (EditSession, ManualClock) {
    let clock = ManualClock::new();
    let session = EditSession::open("report.html", raw, SessionConfig::default()).with_clock(Box::new(clock.clone()));
    (session, clock)
}

fn nodes_by_tag(session: &EditSession, tag: &str) -> Vec<NodeId> {
    session
        .regions()
        .iter()
        .filter(|region| region.tag == tag)
        .map(|region| region.node)
        .collect()
}

/// Paragraphs stacked 40px apart
fn layout(session: &EditSession) -> StaticLayout {
    let mut layout = StaticLayout::new();
    for (index, region) in session.regions().iter().enumerate() {
        layout.insert(region.node, Rect::new(20.0, index as f64 * 40.0, 300.0, 30.0));
    }
    layout
}

#[derive(Default)]
struct RecordingExporter {
    targets: Vec<RenderTarget>,
    fail: bool,
}

impl Exporter for RecordingExporter {
    fn rasterize(&mut self, target: &RenderTarget, options: &ExportOptions) -> Result<Vec<u8>, ExportError> {
        if self.fail {
            return Err(ExportError::Rasterize("canvas tainted".into()));
        }
        self.targets.push(target.clone());
        Ok(vec![options.scale.factor()])
    }

    fn rasterize_vector(&mut self, target: &RenderTarget, options: &ExportOptions) -> Result<Vec<u8>, ExportError> {
        self.rasterize(target, options)
    }

    fn copy_to_clipboard(&mut self, target: &RenderTarget, _options: &ExportOptions) -> bool {
        self.targets.push(target.clone());
        !self.fail
    }
}

#[test]
fn test_color_change_committed_after_debounce() {
    let (mut session, clock) = open(REPORT);
    assert_eq!(session.template().color_variables.len(), 2);

    session.set_color("--fg", "#112233").unwrap();
    clock.advance(Duration::from_millis(100));
    assert!(session.tick().is_empty());
    assert_eq!(session.history().len(), 1);

    clock.advance(Duration::from_millis(300));
    session.tick();
    let top = session.history().current().unwrap();
    assert_eq!(top.colors.get("--fg").map(String::as_str), Some("#112233"));
    assert_eq!(top.colors.get("--bg").map(String::as_str), Some("#ffffff"));
    assert!(session.rendered_style().contains("--fg: #112233"));
}

#[test]
fn test_marquee_selects_covered_regions() {
    let (mut session, _) = open(REPORT);
    let layout = layout(&session);
    let paragraphs = nodes_by_tag(&session, "p");

    // Regions sit at y = 0 (h1), 40, 80, 120, 160; cover the first three paragraphs
    assert!(session.pointer_down(PointerTarget::Canvas, Point::new(0.0, 45.0), &layout));
    session.pointer_move(Point::new(100.0, 100.0));
    let outcome = session.pointer_up(Point::new(100.0, 135.0), &layout);

    assert!(matches!(outcome, GestureOutcome::Marquee(_)));
    assert_eq!(session.multi_selection(), &paragraphs[..3]);

    // A marquee over empty space clears the selection
    session.pointer_down(PointerTarget::Canvas, Point::new(400.0, 0.0), &layout);
    session.pointer_up(Point::new(500.0, 300.0), &layout);
    assert!(session.multi_selection().is_empty());
}

#[test]
fn test_marquee_suppressed_on_region() {
    let (mut session, _) = open(REPORT);
    let layout = layout(&session);
    let first = nodes_by_tag(&session, "p")[0];
    assert!(!session.pointer_down(PointerTarget::Region(first), Point::new(30.0, 45.0), &layout));
    assert_eq!(session.pointer_up(Point::new(100.0, 200.0), &layout), GestureOutcome::None);
    assert!(session.multi_selection().is_empty());
}

#[test]
fn test_copy_delete_paste_restores_document() {
    let (mut session, _) = open(
        r#"<body><div class="card"><h2>Alpha</h2></div><div class="card highlight"><h2>Beta</h2><p>Body</p></div></body>"#,
    );
    let card = session.dom().element_children(session.dom().root())[1];
    let pre_delete = session.body_markup();

    assert!(session.select_element(card));
    assert!(session.copy_element());
    assert!(session.delete_element());
    assert_eq!(session.history().len(), 2);
    assert!(!session.body_markup().contains("Beta"));

    let inserted = session.paste_element();
    assert_eq!(inserted.len(), 1);
    assert_eq!(session.history().len(), 3);
    assert_eq!(session.body_markup(), pre_delete);
    assert!(!session.body_markup().contains("data-vellum-selected"));

    // Pasted content is editable like the original
    assert_eq!(nodes_by_tag(&session, "h2").len(), 2);
}

#[test]
fn test_block_pasted_into_paragraph_survives_undo_redo() {
    let (mut session, _) = open(r#"<body><p>One <span>tag</span></p><div class="card">Card</div></body>"#);
    let card = session.dom().element_children(session.dom().root())[1];
    session.select_element(card);
    session.copy_element();
    let span = session.dom().first_element("span").unwrap();
    session.select_element(span);

    assert_eq!(session.paste_element().len(), 1);
    let pasted = session.body_markup();
    assert_eq!(
        pasted,
        r#"<p>One <span>tag</span></p><div class="card">Card</div><div class="card">Card</div>"#
    );
    assert_eq!(session.history().current().unwrap().body_markup, pasted);

    session.undo();
    session.redo();
    assert_eq!(session.body_markup(), pasted);
}

#[test]
fn test_selection_cleared_when_element_detaches() {
    let (mut session, _) = open(r#"<body><div class="card"><h2>Alpha</h2></div></body>"#);
    let card = session.dom().element_children(session.dom().root())[0];
    session.select_element(card);
    session.set_region_text(nodes_by_tag(&session, "h2")[0], "Renamed");
    session.blur();

    session.undo();
    assert!(session.selected_element().is_none());
    assert!(!session.delete_element());
}

#[test]
fn test_floating_image_reaches_export_target() {
    let (mut session, _) = open(REPORT);
    session.mark_style_engine_ready();
    let mut exporter = RecordingExporter::default();

    let id = session.add_image("data:image/png;base64,AAAA", Size::new(200.0, 100.0), Point::new(10.0, 10.0));
    let layout = StaticLayout::new();
    session.pointer_down(PointerTarget::Image(id), Point::new(50.0, 50.0), &layout);
    session.pointer_up(Point::new(80.0, 70.0), &layout);
    session.rotate_image(id);

    let options = ExportOptions::new(ExportScale::X2, Background::White, 1.0);
    let bytes = session.export(&mut exporter, ExportKind::Raster, options).unwrap();
    assert_eq!(bytes, vec![2]);

    let image = &exporter.targets[0].images[0];
    assert_eq!(image.position, Point::new(40.0, 30.0));
    assert_eq!(image.size, Size::new(200.0, 100.0));
    assert_eq!(image.rotation_degrees, 90);
    assert!(exporter.targets[0].markup.contains("<h1>Quarterly</h1>"));
    // Floating images never enter the document or its history
    assert!(!session.body_markup().contains("img"));
    assert_eq!(session.history().len(), 1);

    assert!(session.remove_image(id));
    session.export(&mut exporter, ExportKind::Raster, options).unwrap();
    assert!(exporter.targets[1].images.is_empty());
}

#[test]
fn test_export_failure_is_a_notification() {
    let (mut session, _) = open(REPORT);
    let mut exporter = RecordingExporter {
        fail: true,
        ..Default::default()
    };
    assert!(matches!(
        session.export(&mut exporter, ExportKind::Vector, ExportOptions::default()),
        Err(EditorError::StyleEngineNotReady)
    ));

    session.mark_style_engine_ready();
    let before = session.body_markup();
    assert!(session.export(&mut exporter, ExportKind::Clipboard, ExportOptions::default()).is_err());
    assert!(!session.is_exporting());
    assert_eq!(session.take_notifications().len(), 1);
    assert_eq!(session.body_markup(), before);
}

#[test]
fn test_undo_redo_inverse() {
    let (mut session, _) = open(REPORT);
    let paragraphs = nodes_by_tag(&session, "p");
    let mut states = vec![session.body_markup()];

    for (index, text) in ["One", "Two", "Three"].iter().enumerate() {
        // Region ids are stable paths, node ids are not: look them up again
        let node = nodes_by_tag(&session, "p")[index];
        session.set_region_text(node, text);
        session.blur();
        states.push(session.body_markup());
    }
    assert_eq!(paragraphs.len(), 4);
    assert_eq!(session.history().len(), 4);

    assert!(session.undo());
    assert_eq!(session.body_markup(), states[2]);
    assert!(session.redo());
    assert_eq!(session.body_markup(), states[3]);
    assert!(!session.redo());

    while session.undo() {}
    assert_eq!(session.body_markup(), states[0]);
    assert_eq!(session.history().cursor(), Some(0));

    // Editing after undo drops the redo branch
    session.set_region_text(nodes_by_tag(&session, "p")[0], "Branch");
    session.blur();
    assert_eq!(session.history().len(), 2);
    assert!(!session.redo());
}

#[test]
fn test_identical_commit_is_not_recorded() {
    let (mut session, _) = open(REPORT);
    let node = nodes_by_tag(&session, "p")[0];
    session.set_region_text(node, "First");
    assert!(!session.blur().unwrap().outcome.is_recorded());
    assert_eq!(session.history().len(), 1);
}

#[test]
fn test_multi_region_font_size_step() {
    let (mut session, _) = open(
        r#"<body><p style="font-size: 12px">Small</p><p style="font-size: 20px">Large <b>bold</b></p></body>"#,
    );
    let paragraphs = nodes_by_tag(&session, "p");
    for node in &paragraphs {
        assert!(session.toggle_region(*node));
    }

    let outcome = session.apply_format(&FormatOp::FontSize {
        change: FontSizeChange::Step(2.0),
    });
    assert!(!outcome.primary_applied);
    assert_eq!(outcome.regions_applied, 2);

    let dom = session.dom();
    for (node, expected) in paragraphs.iter().zip([14.0, 22.0]) {
        for text in dom.text_descendants(*node) {
            assert_eq!(resolved_font_size(dom, text), expected);
        }
    }

    // One undo step restores both
    session.undo();
    assert!(session.body_markup().starts_with(r#"<p style="font-size: 12px">Small</p>"#));
}

#[test]
fn test_range_across_selected_regions_steps_each_once() {
    let (mut session, _) = open(
        r#"<body><p style="font-size: 16px">Alpha</p><p style="font-size: 16px">Beta</p><p style="font-size: 16px">Gamma</p></body>"#,
    );
    let paragraphs = nodes_by_tag(&session, "p");
    for node in &paragraphs {
        session.toggle_region(*node);
    }
    let texts: Vec<NodeId> = paragraphs
        .iter()
        .map(|node| session.dom().text_descendants(*node)[0])
        .collect();
    session.set_selection(TextRange::new(TextPosition::new(texts[0], 0), TextPosition::new(texts[2], 5)));

    session.apply_format(&FormatOp::FontSize {
        change: FontSizeChange::Step(2.0),
    });

    let dom = session.dom();
    for node in nodes_by_tag(&session, "p") {
        for text in dom.text_descendants(node) {
            assert_eq!(resolved_font_size(dom, text), 18.0);
        }
    }
}

#[test]
fn test_reversed_font_limits_clamp_instead_of_panicking() {
    let config: SessionConfig = serde_json::from_str(r#"{ "minFontSize": 40, "maxFontSize": 20 }"#).unwrap();
    let mut session = EditSession::open("report.html", r#"<body><p style="font-size: 16px">Alpha</p></body>"#, config);
    let paragraph = nodes_by_tag(&session, "p")[0];
    session.toggle_region(paragraph);

    session.apply_format(&FormatOp::FontSize {
        change: FontSizeChange::Step(2.0),
    });

    let dom = session.dom();
    let text = dom.text_descendants(nodes_by_tag(&session, "p")[0])[0];
    assert_eq!(resolved_font_size(dom, text), 20.0);
}

#[test]
fn test_chart_percentage_through_session() {
    let (mut session, _) = open(
        r#"<body><div class="card"><svg viewBox="0 0 36 36"><circle r="16" stroke-dasharray="40, 100"></circle><circle r="16" stroke-dasharray="60, 100" stroke-dashoffset="-40"></circle></svg><p>40%</p><p>40%</p><p>60%</p></div></body>"#,
    );
    let original = session.body_markup();
    assert_eq!(session.bindings().charts.len(), 1);

    let report = session.set_chart_percentage(65.0);
    assert_eq!(report.charts, 1);
    assert_eq!(report.labels, 3);
    assert_eq!(session.chart_percentage(), Some(65.0));
    assert!(session.body_markup().contains("<p>65%</p><p>65%</p><p>35%</p>"));

    session.set_chart_percentage(60.0);
    session.set_chart_percentage(40.0);
    assert_eq!(session.body_markup(), original);
    assert_eq!(session.history().len(), 4);
}

#[test]
fn test_bar_sync_follows_label_edits() {
    let (mut session, _) = open(
        r#"<body><div class="grid grid-cols-12"><div class="col-span-6 bg-sky-500"></div><div class="col-span-6">50%</div></div></body>"#,
    );
    assert!(nodes_by_tag(&session, "div").is_empty());

    let row = session.bindings().bars[0].row;
    assert!(session.set_bar_percentage(row, 25.0));
    assert!(session.body_markup().contains(r#"<div class="col-span-3 bg-sky-500"></div><div class="col-span-9">25%</div>"#));
    assert_eq!(session.history().len(), 2);

    // A full bar takes the whole row
    assert!(session.set_bar_percentage(row, 100.0));
    assert!(session.body_markup().contains(r#"<div class="col-span-12 bg-sky-500"></div><div class="col-span-12">100%</div>"#));

    // An empty one keeps its spans but hides the fill
    let row = session.bindings().bars[0].row;
    assert!(session.set_bar_percentage(row, 0.0));
    assert!(session
        .body_markup()
        .contains(r#"<div class="col-span-12 bg-sky-500" style="width: 0%"></div><div class="col-span-12">0%</div>"#));
    assert_eq!(session.history().len(), 4);
}

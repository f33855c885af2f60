//! End-to-end behavior of whole content streams run through the processor.

use std::sync::Arc;

use pdfcanvas_core::{Color, Matrix, PaintOperation, ProcessorOptions, WarningCode};
use pdfcanvas_parse::{
    CanvasEvent, CanvasProcessor, CharCode, EventCollector, EventDispatcher, EventListener,
    EventType, FallbackFont, MapResources, PathRenderInfo, PdfFont, ProcessorError,
    TextRenderInfo,
};

/// Two bytes per code, every code 600 units wide, codes decode as
/// Unicode scalar values.
#[derive(Debug)]
struct TwoByteFont;

impl PdfFont for TwoByteFont {
    fn name(&self) -> &str {
        "TwoByte"
    }

    fn is_composite(&self) -> bool {
        true
    }

    fn split_codes(&self, bytes: &[u8]) -> Vec<CharCode> {
        bytes
            .chunks(2)
            .enumerate()
            .map(|(i, chunk)| CharCode {
                code: chunk.iter().fold(0u32, |acc, &b| (acc << 8) | u32::from(b)),
                start: i * 2,
                len: chunk.len(),
            })
            .collect()
    }

    fn glyph_width(&self, _code: u32) -> Option<f64> {
        Some(600.0)
    }

    fn decode(&self, code: u32, _bytes: &[u8]) -> Option<String> {
        char::from_u32(code).map(String::from)
    }
}

fn resources() -> MapResources {
    MapResources::new()
        .with_font("F1", Arc::new(FallbackFont::new("Fixed")))
        .with_font("F2", Arc::new(TwoByteFont))
}

fn run(content: &[u8]) -> EventCollector {
    let mut processor = CanvasProcessor::new(EventCollector::new(), ProcessorOptions::default());
    processor
        .process_content(content, &resources())
        .expect("content stream should process");
    processor.into_listener()
}

fn texts(collector: &EventCollector) -> Vec<&TextRenderInfo> {
    collector
        .events
        .iter()
        .filter_map(|e| match e {
            CanvasEvent::Text(t) => Some(t),
            _ => None,
        })
        .collect()
}

fn paths(collector: &EventCollector) -> Vec<&PathRenderInfo> {
    collector
        .events
        .iter()
        .filter_map(|e| match e {
            CanvasEvent::Path(p) => Some(p),
            _ => None,
        })
        .collect()
}

fn assert_close(actual: f64, expected: f64) {
    assert!(
        (actual - expected).abs() < 1e-9,
        "expected {expected}, got {actual}"
    );
}

#[test]
fn balanced_save_restore_restores_state() {
    let collector = run(b"1 0 0 RG 2 w q 0 0 1 RG 5 w 3 0 0 3 10 10 cm Q 0 0 m 1 1 l S");
    let path = paths(&collector)[0];
    assert_eq!(path.line_width, 2.0);
    assert_eq!(path.stroke_color, Color::Rgb(1.0, 0.0, 0.0));
    assert_eq!(path.ctm, Matrix::identity());
}

#[test]
fn tj_adjustment_moves_next_string() {
    let collector = run(b"BT /F1 12 Tf [(AB) -250 (CD)] TJ ET");
    let shown = texts(&collector);
    assert_eq!(shown.len(), 2);
    let first_advance = shown[0].unscaled_width();
    assert_close(first_advance, 14.4);
    assert_close(shown[1].text_matrix().e, first_advance + 3.0);
    assert_eq!(shown[1].text(), "CD");
}

#[test]
fn word_spacing_applies_to_single_byte_space_only() {
    let collector = run(b"BT /F1 10 Tf 5 Tw (A B) Tj ET");
    assert_close(texts(&collector)[0].unscaled_width(), 3.0 * 6.0 + 5.0);

    let collector = run(b"BT /F2 10 Tf 5 Tw <00410020> Tj ET");
    let shown = texts(&collector)[0];
    assert_eq!(shown.text(), "A ");
    assert_close(shown.unscaled_width(), 12.0);
    assert_close(shown.baseline().length(), 12.0);
}

#[test]
fn baseline_excludes_trailing_spacing() {
    let collector = run(b"BT /F1 10 Tf 1 Tc 2 Tw 72 700 Td (A ) Tj ET");
    let shown = texts(&collector)[0];
    assert_close(shown.unscaled_width(), 7.0 + 9.0);
    assert_close(shown.baseline().length(), 16.0 - (1.0 + 2.0));
    assert_close(shown.baseline().start.x, 72.0);
    assert_close(shown.baseline().start.y, 700.0);

    let collector = run(b"BT /F1 10 Tf 1 Tc 2 Tw 50 Tz (A ) Tj ET");
    let shown = texts(&collector)[0];
    assert_close(shown.unscaled_width(), 8.0);
    assert_close(shown.baseline().length(), 8.0 - 3.0 * 0.5);
}

#[test]
fn character_events_sum_to_parent_width() {
    let collector = run(b"BT /F1 9 Tf 0.5 Tc 80 Tz 100 200 Td (Hello) Tj ET");
    let shown = texts(&collector)[0];
    let parts = shown.character_render_infos();
    assert_eq!(parts.len(), 5);

    let total: f64 = parts.iter().map(TextRenderInfo::unscaled_width).sum();
    assert_close(total, shown.unscaled_width());

    let mut expected_x = shown.text_matrix().e;
    for part in &parts {
        assert_close(part.text_matrix().e, expected_x);
        expected_x += part.unscaled_width();
    }
    let letters: String = parts.iter().map(|p| p.text().to_string()).collect();
    assert_eq!(letters, "Hello");
}

#[test]
fn closed_triangle_then_independent_stroke() {
    let collector = run(b"0 0 m 10 0 l 10 10 l h f 20 20 m 30 30 l S");
    let painted = paths(&collector);
    assert_eq!(painted.len(), 2);

    let fill = painted[0];
    assert_eq!(fill.operation, PaintOperation::Fill);
    let subpaths = fill.path.subpaths();
    assert_eq!(subpaths.len(), 1);
    assert!(subpaths[0].is_closed());
    assert_eq!(subpaths[0].points().len(), 3);

    let stroke = painted[1];
    assert_eq!(stroke.operation, PaintOperation::Stroke);
    assert_eq!(stroke.path.subpaths().len(), 1);
    assert_eq!(stroke.path.subpaths()[0].points().len(), 2);
}

#[test]
fn mcid_falls_through_nested_tags() {
    let collector = run(b"/P <</MCID 3>> BDC /Span BMC BT /F1 10 Tf (x) Tj ET EMC EMC");
    let shown = texts(&collector)[0];
    assert_eq!(shown.mcid(), Some(3));
    assert!(shown.has_mcid(3, false));
    assert!(shown.has_mcid(3, true));
    assert_eq!(
        shown.tags().innermost().map(|t| t.role.as_str()),
        Some("Span")
    );
}

#[test]
fn restore_on_empty_stack_continues() {
    let collector = run(b"Q 0 0 m 5 5 l S");
    assert_eq!(paths(&collector).len(), 1);
    assert_eq!(collector.warnings.len(), 1);
    assert_eq!(collector.warnings[0].code, WarningCode::UnbalancedState);
}

#[test]
fn dispatcher_fans_out_to_filtered_listeners() {
    let mut all = EventCollector::new();
    let mut text_only = EventCollector::new();
    {
        let mut dispatcher = EventDispatcher::new();
        dispatcher
            .attach(&mut all)
            .attach_filtered(&mut text_only, [EventType::RenderText]);
        let mut processor = CanvasProcessor::new(dispatcher, ProcessorOptions::default());
        processor
            .process_content(b"0 0 m 1 1 l S BT /F1 10 Tf (a) Tj ET", &resources())
            .unwrap();
    }
    assert_eq!(all.events.len(), 4);
    assert_eq!(text_only.events.len(), 1);
    assert_eq!(text_only.events[0].event_type(), EventType::RenderText);
}

/// Refuses path events.
struct PathRefuser {
    seen: usize,
}

impl EventListener for PathRefuser {
    fn on_event(&mut self, event: &CanvasEvent) -> Result<(), ProcessorError> {
        self.seen += 1;
        if event.event_type() == EventType::RenderPath {
            return Err(ProcessorError::listener("no paths"));
        }
        Ok(())
    }
}

#[test]
fn listener_error_aborts_processing() {
    let mut processor =
        CanvasProcessor::new(PathRefuser { seen: 0 }, ProcessorOptions::default());
    let err = processor
        .process_content(b"BT ET 0 0 m 1 1 l S BT ET", &resources())
        .unwrap_err();
    assert!(matches!(err, ProcessorError::Listener(_)));
    assert_eq!(processor.listener().seen, 3);
}

#[test]
fn fill_color_survives_into_text_and_paths() {
    let collector = run(b"0.5 g BT /F1 10 Tf (a) Tj ET 0 0 1 1 re f");
    assert_eq!(*texts(&collector)[0].fill_color(), Color::Gray(0.5));
    assert_eq!(paths(&collector)[0].fill_color, Color::Gray(0.5));
}

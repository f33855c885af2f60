//! Text render events and the geometry derived from them.
//!
//! A [`TextRenderInfo`] is emitted for every string shown by `Tj`, `'`, `"`
//! and each string element of `TJ`. It stores the raw operand bytes and a
//! frozen copy of the state; decoded text, widths and line segments are
//! computed on first use and cached.
//!
//! All widths follow the PDF advance rule for horizontal writing:
//!
//! ```text
//! tx = (w0 / 1000 × Tfs + Tc + Tw) × Th
//! ```
//!
//! where `Tw` only applies to the single-byte code 32.

use std::sync::{Arc, OnceLock};

use pdfcanvas_core::{Color, LineSegment, Matrix, TagHierarchy, UnicodeNorm, Vector};

use crate::font::{CharCode, PdfFont, normalized_ascent_descent};
use crate::graphics_state::{GraphicsState, TextRenderMode};

/// One shown string (or, from
/// [`character_render_infos`](Self::character_render_infos), one code).
#[derive(Debug, Clone)]
pub struct TextRenderInfo {
    string: Vec<u8>,
    state: Arc<GraphicsState>,
    font: Arc<dyn PdfFont>,
    text_matrix: Matrix,
    text_to_user: Matrix,
    tags: TagHierarchy,
    unicode_norm: UnicodeNorm,
    codes: OnceLock<Vec<CharCode>>,
    decoded: OnceLock<String>,
    text: OnceLock<String>,
    unscaled_width: OnceLock<f64>,
}

impl TextRenderInfo {
    pub fn new(
        string: Vec<u8>,
        state: Arc<GraphicsState>,
        font: Arc<dyn PdfFont>,
        text_matrix: Matrix,
        tags: TagHierarchy,
        unicode_norm: UnicodeNorm,
    ) -> Self {
        let text_to_user = text_matrix.multiply(&state.ctm);
        Self {
            string,
            state,
            font,
            text_matrix,
            text_to_user,
            tags,
            unicode_norm,
            codes: OnceLock::new(),
            decoded: OnceLock::new(),
            text: OnceLock::new(),
            unscaled_width: OnceLock::new(),
        }
    }

    /// Sub-event for one code of `self`, with its code and advance known.
    fn for_code(&self, code: &CharCode, text_matrix: Matrix, advance: f64) -> Self {
        Self {
            string: code.bytes(&self.string).to_vec(),
            state: Arc::clone(&self.state),
            font: Arc::clone(&self.font),
            text_matrix,
            text_to_user: text_matrix.multiply(&self.state.ctm),
            tags: self.tags.clone(),
            unicode_norm: self.unicode_norm,
            codes: OnceLock::from(vec![CharCode {
                code: code.code,
                start: 0,
                len: code.len,
            }]),
            decoded: OnceLock::new(),
            text: OnceLock::new(),
            unscaled_width: OnceLock::from(advance),
        }
    }

    /// The string operand exactly as it appeared in the content stream.
    pub fn raw_bytes(&self) -> &[u8] {
        &self.string
    }

    pub fn graphics_state(&self) -> &GraphicsState {
        &self.state
    }

    pub fn font(&self) -> &Arc<dyn PdfFont> {
        &self.font
    }

    pub fn font_size(&self) -> f64 {
        self.state.font_size
    }

    pub fn text_matrix(&self) -> Matrix {
        self.text_matrix
    }

    pub fn ctm(&self) -> Matrix {
        self.state.ctm
    }

    /// Text matrix × CTM.
    pub fn text_to_user_space(&self) -> Matrix {
        self.text_to_user
    }

    pub fn tags(&self) -> &TagHierarchy {
        &self.tags
    }

    pub fn text_render_mode(&self) -> TextRenderMode {
        self.state.render_mode
    }

    pub fn fill_color(&self) -> &Color {
        &self.state.fill_color
    }

    pub fn stroke_color(&self) -> &Color {
        &self.state.stroke_color
    }

    /// Character codes of the string, split by the font.
    pub fn codes(&self) -> &[CharCode] {
        self.codes.get_or_init(|| self.font.split_codes(&self.string))
    }

    /// Concatenated Unicode text of every code, before normalization.
    /// Codes without a mapping contribute nothing.
    fn decoded(&self) -> &str {
        self.decoded.get_or_init(|| {
            self.codes()
                .iter()
                .filter_map(|c| self.font.decode(c.code, c.bytes(&self.string)))
                .collect()
        })
    }

    /// Unicode text of the string.
    ///
    /// Normalized per [`UnicodeNorm`]; reversed when shown inside a
    /// `/ReversedChars` marked-content sequence.
    pub fn text(&self) -> &str {
        self.text.get_or_init(|| {
            let normalized = self.unicode_norm.normalize(self.decoded());
            if self.tags.is_reversed_chars() {
                normalized.chars().rev().collect()
            } else {
                normalized
            }
        })
    }

    /// Horizontal advance of one code in text space.
    fn code_advance(&self, code: &CharCode) -> f64 {
        let gs = &*self.state;
        let word_spacing = if code.is_single_byte_space() {
            gs.word_spacing
        } else {
            0.0
        };
        let glyph = self.font.width(code.code) / 1000.0 * gs.font_size;
        (glyph + gs.char_spacing + word_spacing) * gs.horizontal_scaling_factor()
    }

    /// Total advance of the string in text space; the distance the text
    /// matrix moves after showing it.
    pub fn unscaled_width(&self) -> f64 {
        *self
            .unscaled_width
            .get_or_init(|| self.codes().iter().map(|c| self.code_advance(c)).sum())
    }

    /// Width without the spacing that follows the last glyph.
    fn trimmed_width(&self) -> f64 {
        let gs = &*self.state;
        let Some(last) = self.codes().last() else {
            return 0.0;
        };
        let trailing_word = if last.is_single_byte_space() {
            gs.word_spacing
        } else {
            0.0
        };
        self.unscaled_width() - (gs.char_spacing + trailing_word) * gs.horizontal_scaling_factor()
    }

    fn line_at(&self, y: f64) -> LineSegment {
        LineSegment::new(
            Vector::point(0.0, y),
            Vector::point(self.trimmed_width(), y),
        )
        .transform_by(&self.text_to_user)
    }

    /// Baseline in user space, raised by the text rise.
    pub fn baseline(&self) -> LineSegment {
        self.line_at(self.state.rise)
    }

    /// Baseline without the text rise.
    pub fn unscaled_baseline(&self) -> LineSegment {
        self.line_at(0.0)
    }

    pub fn ascent_line(&self) -> LineSegment {
        let (ascent, _) = normalized_ascent_descent(self.font.as_ref());
        self.line_at(ascent * self.state.font_size + self.state.rise)
    }

    pub fn descent_line(&self) -> LineSegment {
        let (_, descent) = normalized_ascent_descent(self.font.as_ref());
        self.line_at(descent * self.state.font_size + self.state.rise)
    }

    /// Width of a space (code 32) in user space, including spacing.
    pub fn single_space_width(&self) -> f64 {
        let gs = &*self.state;
        let space = (self.font.width(0x20) / 1000.0 * gs.font_size
            + gs.char_spacing
            + gs.word_spacing)
            * gs.horizontal_scaling_factor();
        let (dx, dy) = self.text_to_user.transform_delta(space, 0.0);
        dx.hypot(dy)
    }

    /// Text rise in user space; negative for subscripts.
    pub fn rise(&self) -> f64 {
        let rise = self.state.rise;
        if rise == 0.0 {
            return 0.0;
        }
        let (dx, dy) = self.text_to_user.transform_delta(0.0, rise);
        dx.hypot(dy).copysign(rise)
    }

    /// One event per character code, positioned along the string. The
    /// sub-events' widths sum to [`unscaled_width`](Self::unscaled_width).
    pub fn character_render_infos(&self) -> Vec<TextRenderInfo> {
        let mut offset = 0.0;
        self.codes()
            .iter()
            .map(|code| {
                let advance = self.code_advance(code);
                let matrix = Matrix::translation(offset, 0.0).multiply(&self.text_matrix);
                offset += advance;
                self.for_code(code, matrix, advance)
            })
            .collect()
    }

    /// MCID of the innermost enclosing tag that carries one.
    pub fn mcid(&self) -> Option<i64> {
        self.tags.mcid()
    }

    /// See [`TagHierarchy::has_mcid`].
    pub fn has_mcid(&self, mcid: i64, innermost_only: bool) -> bool {
        self.tags.has_mcid(mcid, innermost_only)
    }

    pub fn actual_text(&self) -> Option<&str> {
        self.tags.actual_text()
    }

    pub fn expansion_text(&self) -> Option<&str> {
        self.tags.expansion_text()
    }

    pub fn is_reversed_chars(&self) -> bool {
        self.tags.is_reversed_chars()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pdfcanvas_core::CanvasTag;

    use crate::font::FallbackFont;

    /// Width 500 for every code, two-byte codes when `composite`.
    #[derive(Debug)]
    struct HalfEm {
        composite: bool,
    }

    impl PdfFont for HalfEm {
        fn name(&self) -> &str {
            "HalfEm"
        }
        fn is_composite(&self) -> bool {
            self.composite
        }
        fn split_codes(&self, bytes: &[u8]) -> Vec<CharCode> {
            if !self.composite {
                return FallbackFont::new("x").split_codes(bytes);
            }
            bytes
                .chunks(2)
                .enumerate()
                .map(|(i, c)| CharCode {
                    code: c.iter().fold(0, |a, &b| (a << 8) | u32::from(b)),
                    start: i * 2,
                    len: c.len(),
                })
                .collect()
        }
        fn glyph_width(&self, _code: u32) -> Option<f64> {
            Some(500.0)
        }
        fn ascent(&self) -> f64 {
            800.0
        }
        fn descent(&self) -> f64 {
            -200.0
        }
        fn decode(&self, code: u32, _bytes: &[u8]) -> Option<String> {
            char::from_u32(code).map(String::from)
        }
    }

    fn info(bytes: &[u8], gs: GraphicsState, composite: bool) -> TextRenderInfo {
        TextRenderInfo::new(
            bytes.to_vec(),
            Arc::new(gs),
            Arc::new(HalfEm { composite }),
            Matrix::identity(),
            TagHierarchy::new(),
            UnicodeNorm::None,
        )
    }

    fn state(size: f64, tc: f64, tw: f64) -> GraphicsState {
        let mut gs = GraphicsState::default();
        gs.font_size = size;
        gs.char_spacing = tc;
        gs.word_spacing = tw;
        gs
    }

    #[test]
    fn width_formula() {
        let ti = info(b"AB", state(10.0, 1.0, 0.0), false);
        // 2 × (0.5 × 10 + 1)
        assert!((ti.unscaled_width() - 12.0).abs() < 1e-9);
    }

    #[test]
    fn horizontal_scaling_applies_to_spacing() {
        let mut gs = state(10.0, 1.0, 2.0);
        gs.horizontal_scaling = 50.0;
        let ti = info(b"A ", gs, false);
        // (5 + 1) × 0.5 + (5 + 1 + 2) × 0.5
        assert!((ti.unscaled_width() - 7.0).abs() < 1e-9);
    }

    #[test]
    fn word_spacing_only_for_single_byte_space() {
        let single = info(b"A B", state(10.0, 0.0, 3.0), false);
        assert!((single.unscaled_width() - 18.0).abs() < 1e-9);

        let double = info(&[0x00, 0x20], state(10.0, 0.0, 3.0), true);
        assert_eq!(double.text(), " ");
        assert!((double.unscaled_width() - 5.0).abs() < 1e-9);
    }

    #[test]
    fn baseline_drops_trailing_spacing() {
        let gs = state(10.0, 1.0, 2.0);
        let ti = info(b"A ", gs, false);
        let expected = ti.unscaled_width() - (1.0 + 2.0);
        assert!((ti.baseline().length() - expected).abs() < 1e-9);

        let no_space = info(b"AB", state(10.0, 1.0, 2.0), false);
        let expected = no_space.unscaled_width() - 1.0;
        assert!((no_space.baseline().length() - expected).abs() < 1e-9);
    }

    #[test]
    fn baseline_keeps_composite_trailing_space_extent() {
        // U+0020 from a two-byte code never received Tw, so only Tc is dropped.
        let ti = info(&[0x00, 0x41, 0x00, 0x20], state(10.0, 0.0, 5.0), true);
        assert_eq!(ti.text(), "A ");
        assert!((ti.unscaled_width() - 10.0).abs() < 1e-9);
        assert!((ti.baseline().length() - 10.0).abs() < 1e-9);

        let with_tc = info(&[0x00, 0x41, 0x00, 0x20], state(10.0, 1.0, 5.0), true);
        assert!((with_tc.baseline().length() - 11.0).abs() < 1e-9);
    }

    #[test]
    fn empty_string_has_zero_length_baseline() {
        let ti = info(b"", state(10.0, 1.0, 2.0), false);
        assert_eq!(ti.unscaled_width(), 0.0);
        assert_eq!(ti.baseline().length(), 0.0);
    }

    #[test]
    fn lines_offset_by_ascent_descent_and_rise() {
        let mut gs = state(10.0, 0.0, 0.0);
        gs.rise = 2.0;
        gs.ctm = Matrix::translation(100.0, 200.0);
        let ti = info(b"A", gs, false);
        assert_eq!(ti.baseline().start.y, 202.0);
        assert_eq!(ti.unscaled_baseline().start.y, 200.0);
        assert!((ti.ascent_line().start.y - 210.0).abs() < 1e-9);
        assert!((ti.descent_line().start.y - 200.0).abs() < 1e-9);
        assert_eq!(ti.baseline().start.x, 100.0);
        assert_eq!(ti.rise(), 2.0);
    }

    #[test]
    fn character_infos_sum_to_parent() {
        let ti = info(b"A B", state(12.0, 0.5, 1.5), false);
        let chars = ti.character_render_infos();
        assert_eq!(chars.len(), 3);
        let sum: f64 = chars.iter().map(TextRenderInfo::unscaled_width).sum();
        assert_eq!(sum, ti.unscaled_width());
        assert_eq!(chars[1].text(), " ");
        assert_eq!(chars[0].text_matrix().e, 0.0);
        assert!((chars[1].text_matrix().e - chars[0].unscaled_width()).abs() < 1e-12);
    }

    #[test]
    fn composite_character_infos_keep_codes_whole() {
        let ti = info(&[0x00, 0x41, 0x00, 0x42], state(10.0, 0.0, 0.0), true);
        let chars = ti.character_render_infos();
        assert_eq!(chars.len(), 2);
        assert_eq!(chars[1].raw_bytes(), &[0x00, 0x42]);
        assert_eq!(chars[1].text(), "B");
    }

    #[test]
    fn reversed_chars() {
        let mut tags = TagHierarchy::new();
        tags.push(CanvasTag::new("ReversedChars"));
        let ti = TextRenderInfo::new(
            b"abc".to_vec(),
            Arc::new(state(10.0, 0.0, 0.0)),
            Arc::new(HalfEm { composite: false }),
            Matrix::identity(),
            tags,
            UnicodeNorm::None,
        );
        assert!(ti.is_reversed_chars());
        assert_eq!(ti.text(), "cba");
    }

    #[test]
    fn single_space_width_in_user_space() {
        let mut gs = state(10.0, 0.0, 1.0);
        gs.ctm = Matrix::scaling(2.0, 2.0);
        let ti = info(b"A", gs, false);
        assert!((ti.single_space_width() - 12.0).abs() < 1e-9);
    }

    #[test]
    fn tag_accessors() {
        let mut tags = TagHierarchy::new();
        tags.push(
            CanvasTag::new("Span")
                .with_mcid(4)
                .with_actual_text("x")
                .with_expansion_text("ex"),
        );
        let ti = TextRenderInfo::new(
            b"A".to_vec(),
            Arc::new(state(10.0, 0.0, 0.0)),
            Arc::new(FallbackFont::new("F")),
            Matrix::identity(),
            tags,
            UnicodeNorm::None,
        );
        assert_eq!(ti.mcid(), Some(4));
        assert!(ti.has_mcid(4, true));
        assert_eq!(ti.actual_text(), Some("x"));
        assert_eq!(ti.expansion_text(), Some("ex"));
    }
}

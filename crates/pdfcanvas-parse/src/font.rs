//! Font abstraction used by the text interpreter.
//!
//! The processor never parses font programs. Everything it needs from a
//! font (how to cut a string into character codes, how wide each code is,
//! the vertical extent and the Unicode text) goes through [`PdfFont`].

use std::fmt::Debug;

/// Default glyph width (1/1000 text space units) when nothing better is known.
pub const DEFAULT_WIDTH: f64 = 600.0;
/// Default ascent in glyph space units.
pub const DEFAULT_ASCENT: f64 = 750.0;
/// Default descent in glyph space units.
pub const DEFAULT_DESCENT: f64 = -250.0;

/// One character code cut out of a string operand.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CharCode {
    /// Big-endian value of the code bytes.
    pub code: u32,
    /// Byte offset of the code within the string operand.
    pub start: usize,
    /// Number of bytes (1 to 4).
    pub len: usize,
}

impl CharCode {
    /// The code's bytes inside `string`.
    pub fn bytes<'s>(&self, string: &'s [u8]) -> &'s [u8] {
        &string[self.start..self.start + self.len]
    }

    /// The one-byte code 32, the only code that receives word spacing.
    pub fn is_single_byte_space(&self) -> bool {
        self.len == 1 && self.code == 0x20
    }
}

/// Font information needed to position and decode shown text.
///
/// Widths, ascent and descent are in glyph space units of 1/1000 em.
pub trait PdfFont: Debug + Send + Sync {
    /// Base font name, or the resource name when unknown.
    fn name(&self) -> &str;

    /// Whether this is a composite (Type0) font.
    fn is_composite(&self) -> bool {
        false
    }

    /// Split a string operand into character codes. Simple fonts use one
    /// code per byte.
    fn split_codes(&self, bytes: &[u8]) -> Vec<CharCode> {
        bytes
            .iter()
            .enumerate()
            .map(|(start, &b)| CharCode {
                code: u32::from(b),
                start,
                len: 1,
            })
            .collect()
    }

    /// Width of `code` when the font defines one.
    fn glyph_width(&self, code: u32) -> Option<f64>;

    /// Average of the defined widths, used when a code has no width.
    fn average_width(&self) -> f64 {
        DEFAULT_WIDTH
    }

    /// Width of `code`, falling back to [`average_width`](Self::average_width).
    fn width(&self, code: u32) -> f64 {
        self.glyph_width(code).unwrap_or_else(|| self.average_width())
    }

    fn ascent(&self) -> f64 {
        DEFAULT_ASCENT
    }

    fn descent(&self) -> f64 {
        DEFAULT_DESCENT
    }

    /// Unicode text for one code. `bytes` are the code's raw bytes.
    fn decode(&self, code: u32, bytes: &[u8]) -> Option<String>;

    /// 0 horizontal, 1 vertical. Recorded only; advances stay horizontal.
    fn writing_mode(&self) -> u8 {
        0
    }
}

/// Font used when a `Tf` names a font that cannot be resolved.
///
/// Every code is [`DEFAULT_WIDTH`] wide and decodes as Latin-1.
#[derive(Debug, Clone, PartialEq)]
pub struct FallbackFont {
    name: String,
}

impl FallbackFont {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

impl PdfFont for FallbackFont {
    fn name(&self) -> &str {
        &self.name
    }

    fn glyph_width(&self, _code: u32) -> Option<f64> {
        Some(DEFAULT_WIDTH)
    }

    fn decode(&self, code: u32, _bytes: &[u8]) -> Option<String> {
        char::from_u32(code).map(String::from)
    }
}

/// Normalized `(ascent, descent)` in text space units of one font-size.
///
/// A positive descent is negated. The scale is `ascent - descent` when
/// that is below 700 (fonts reporting metrics in a smaller unit), else 1000.
pub fn normalized_ascent_descent(font: &dyn PdfFont) -> (f64, f64) {
    let ascent = font.ascent();
    let mut descent = font.descent();
    if descent > 0.0 {
        descent = -descent;
    }
    let extent = ascent - descent;
    let scale = if extent < 700.0 { extent } else { 1000.0 };
    if scale <= 0.0 {
        return (DEFAULT_ASCENT / 1000.0, DEFAULT_DESCENT / 1000.0);
    }
    (ascent / scale, descent / scale)
}

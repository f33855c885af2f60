//! [`PdfFont`] implementation backed by a lopdf font dictionary.

use lopdf::{Dictionary, Document, Object};

use crate::cid_font::{
    CidFontMetrics, extract_cid_font_metrics, get_descendant_font, is_type0_font,
    predefined_writing_mode,
};
use crate::cjk_encoding::{CjkScheme, scheme_for_cmap};
use crate::cmap::CMap;
use crate::font::{CharCode, PdfFont};
use crate::font_metrics::{FontMetrics, dict_entry, extract_font_metrics, object_to_f64};
use crate::lopdf_backend::decode_stream;
use crate::simple_encoding::{BaseEncoding, DifferenceItem, SimpleEncoding, apply_differences};

/// Symbolic flag of `/FontDescriptor /Flags`.
const FLAG_SYMBOLIC: i64 = 1 << 2;

#[derive(Debug)]
enum FontKind {
    Simple {
        metrics: FontMetrics,
        encoding: SimpleEncoding,
    },
    Composite {
        metrics: CidFontMetrics,
        /// Encoding CMap: codespace ranges and code → CID.
        cmap: CMap,
        /// Set for predefined legacy CMaps that are not embedded.
        cjk: Option<CjkScheme>,
    },
}

/// A font loaded from its dictionary: simple (Type1, TrueType, Type3) or
/// composite (Type0 with one descendant CIDFont).
#[derive(Debug)]
pub struct LoadedFont {
    name: String,
    kind: FontKind,
    to_unicode: Option<CMap>,
    writing_mode: u8,
}

impl LoadedFont {
    /// Build a font from its dictionary. `resource_name` names the font
    /// when `/BaseFont` is absent.
    pub fn load(doc: &Document, font_dict: &Dictionary, resource_name: &str) -> Self {
        let name = dict_entry(doc, font_dict, b"BaseFont")
            .and_then(|o| o.as_name().ok())
            .map(|n| strip_subset_prefix(&String::from_utf8_lossy(n)).to_string())
            .unwrap_or_else(|| resource_name.to_string());

        let to_unicode = dict_entry(doc, font_dict, b"ToUnicode")
            .and_then(|o| o.as_stream().ok())
            .and_then(|s| decode_stream(s).ok())
            .map(|data| CMap::parse(&data))
            .filter(|cmap| cmap.unicode_len() > 0);

        if is_type0_font(font_dict) {
            let metrics = get_descendant_font(doc, font_dict)
                .map(|desc| extract_cid_font_metrics(doc, desc))
                .unwrap_or_else(CidFontMetrics::default_metrics);
            let (cmap, cjk) = load_encoding_cmap(doc, font_dict);
            let writing_mode = cmap.writing_mode();
            return Self {
                name,
                kind: FontKind::Composite { metrics, cmap, cjk },
                to_unicode,
                writing_mode,
            };
        }

        Self {
            name,
            kind: FontKind::Simple {
                metrics: extract_font_metrics(doc, font_dict),
                encoding: load_simple_encoding(doc, font_dict),
            },
            to_unicode,
            writing_mode: 0,
        }
    }
}

impl PdfFont for LoadedFont {
    fn name(&self) -> &str {
        &self.name
    }

    fn is_composite(&self) -> bool {
        matches!(self.kind, FontKind::Composite { .. })
    }

    fn split_codes(&self, bytes: &[u8]) -> Vec<CharCode> {
        match &self.kind {
            FontKind::Simple { .. } => bytes
                .iter()
                .enumerate()
                .map(|(start, &b)| CharCode {
                    code: u32::from(b),
                    start,
                    len: 1,
                })
                .collect(),
            FontKind::Composite {
                cjk: Some(scheme), ..
            } => scheme.split_codes(bytes),
            FontKind::Composite { cmap, .. } => cmap.split_codes(bytes),
        }
    }

    fn glyph_width(&self, code: u32) -> Option<f64> {
        match &self.kind {
            FontKind::Simple { metrics, .. } => metrics.glyph_width(code),
            FontKind::Composite {
                metrics, cjk: Some(_), ..
            } => Some(metrics.default_width()),
            FontKind::Composite { metrics, cmap, .. } => {
                Some(metrics.width(cmap.cid(code).unwrap_or(code)))
            }
        }
    }

    fn average_width(&self) -> f64 {
        match &self.kind {
            FontKind::Simple { metrics, .. } => metrics.average_width(),
            FontKind::Composite { metrics, .. } => metrics.average_width(),
        }
    }

    fn ascent(&self) -> f64 {
        match &self.kind {
            FontKind::Simple { metrics, .. } => metrics.ascent(),
            FontKind::Composite { metrics, .. } => metrics.ascent(),
        }
    }

    fn descent(&self) -> f64 {
        match &self.kind {
            FontKind::Simple { metrics, .. } => metrics.descent(),
            FontKind::Composite { metrics, .. } => metrics.descent(),
        }
    }

    fn decode(&self, code: u32, bytes: &[u8]) -> Option<String> {
        if let Some(text) = self.to_unicode.as_ref().and_then(|c| c.to_unicode(code)) {
            return Some(text.to_string());
        }
        match &self.kind {
            FontKind::Simple { encoding, .. } => {
                u8::try_from(code).ok().and_then(|b| encoding.decode(b))
            }
            FontKind::Composite {
                cjk: Some(scheme), ..
            } => scheme.decode(bytes),
            FontKind::Composite { .. } => None,
        }
    }

    fn writing_mode(&self) -> u8 {
        self.writing_mode
    }
}

/// Encoding CMap of a Type0 font.
///
/// Identity and unknown predefined names fall back to two-byte codes; an
/// embedded CMap without codespace ranges does too.
fn load_encoding_cmap(doc: &Document, type0: &Dictionary) -> (CMap, Option<CjkScheme>) {
    match dict_entry(doc, type0, b"Encoding") {
        Some(Object::Name(name)) => {
            let name = String::from_utf8_lossy(name);
            let wmode = predefined_writing_mode(&name);
            (CMap::identity(wmode), scheme_for_cmap(&name))
        }
        Some(Object::Stream(stream)) => {
            let parsed = decode_stream(stream)
                .map(|data| CMap::parse(&data))
                .unwrap_or_default();
            if parsed.has_codespace() {
                (parsed, None)
            } else {
                (CMap::identity(parsed.writing_mode()), None)
            }
        }
        _ => (CMap::identity(0), None),
    }
}

fn load_simple_encoding(doc: &Document, font_dict: &Dictionary) -> SimpleEncoding {
    let default_base = default_base_encoding(doc, font_dict);
    match dict_entry(doc, font_dict, b"Encoding") {
        Some(Object::Name(name)) => SimpleEncoding::new(
            BaseEncoding::from_name(&String::from_utf8_lossy(name)).unwrap_or(default_base),
        ),
        Some(Object::Dictionary(enc)) => {
            let base = dict_entry(doc, enc, b"BaseEncoding")
                .and_then(|o| o.as_name().ok())
                .and_then(|n| BaseEncoding::from_name(&String::from_utf8_lossy(n)))
                .unwrap_or(default_base);
            let mut encoding = SimpleEncoding::new(base);
            if let Some(items) = dict_entry(doc, enc, b"Differences").and_then(|o| o.as_array().ok())
            {
                let names: Vec<(Option<i64>, String)> = items
                    .iter()
                    .map(|item| match item {
                        Object::Name(n) => (None, String::from_utf8_lossy(n).into_owned()),
                        other => (object_to_f64(other).map(|v| v as i64), String::new()),
                    })
                    .collect();
                apply_differences(
                    &mut encoding,
                    names.iter().map(|(code, name)| match code {
                        Some(c) => DifferenceItem::Code(*c),
                        None => DifferenceItem::Name(name),
                    }),
                );
            }
            encoding
        }
        _ => SimpleEncoding::new(default_base),
    }
}

/// Base encoding used when `/Encoding` does not name one.
fn default_base_encoding(doc: &Document, font_dict: &Dictionary) -> BaseEncoding {
    let base_font = dict_entry(doc, font_dict, b"BaseFont")
        .and_then(|o| o.as_name().ok())
        .map(|n| String::from_utf8_lossy(n).into_owned())
        .unwrap_or_default();
    if base_font.contains("Symbol") || base_font.contains("Dingbats") {
        return BaseEncoding::BuiltIn;
    }
    let symbolic = dict_entry(doc, font_dict, b"FontDescriptor")
        .and_then(|o| o.as_dict().ok())
        .and_then(|d| dict_entry(doc, d, b"Flags"))
        .and_then(|o| o.as_i64().ok())
        .is_some_and(|flags| flags & FLAG_SYMBOLIC != 0);
    if symbolic {
        return BaseEncoding::BuiltIn;
    }
    let subtype = dict_entry(doc, font_dict, b"Subtype").and_then(|o| o.as_name().ok());
    match subtype {
        Some(b"TrueType") => BaseEncoding::WinAnsi,
        Some(b"Type3") => BaseEncoding::BuiltIn,
        _ => BaseEncoding::Standard,
    }
}

/// Drop a subset tag such as `ABCDEF+` from a base font name.
fn strip_subset_prefix(name: &str) -> &str {
    match name.split_once('+') {
        Some((tag, rest)) if tag.len() == 6 && tag.bytes().all(|b| b.is_ascii_uppercase()) => {
            rest
        }
        _ => name,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lopdf::{Stream, dictionary};

    fn to_unicode_stream(doc: &mut Document, body: &str) -> Object {
        Object::Reference(doc.add_object(Stream::new(dictionary! {}, body.as_bytes().to_vec())))
    }

    #[test]
    fn simple_font_widths_and_win_ansi() {
        let doc = Document::with_version("1.5");
        let dict = dictionary! {
            "Type" => "Font",
            "Subtype" => "TrueType",
            "BaseFont" => "ABCDEF+Arial",
            "FirstChar" => Object::Integer(32),
            "Widths" => vec![Object::Integer(278), Object::Integer(278)],
        };
        let font = LoadedFont::load(&doc, &dict, "F1");
        assert_eq!(font.name(), "Arial");
        assert!(!font.is_composite());
        assert_eq!(font.width(32), 278.0);
        // Out of range, no MissingWidth: average of defined widths.
        assert_eq!(font.width(90), 278.0);
        assert_eq!(font.decode(0x80, &[0x80]).as_deref(), Some("€"));
    }

    #[test]
    fn differences_decode() {
        let doc = Document::with_version("1.5");
        let dict = dictionary! {
            "Subtype" => "Type1",
            "BaseFont" => "Custom",
            "Encoding" => dictionary! {
                "BaseEncoding" => "WinAnsiEncoding",
                "Differences" => vec![
                    Object::Integer(1),
                    Object::Name(b"fi".to_vec()),
                    Object::Name(b"fl".to_vec()),
                ],
            },
        };
        let font = LoadedFont::load(&doc, &dict, "F1");
        assert_eq!(font.decode(1, &[1]).as_deref(), Some("\u{FB01}"));
        assert_eq!(font.decode(2, &[2]).as_deref(), Some("\u{FB02}"));
        assert_eq!(font.decode(0x41, &[0x41]).as_deref(), Some("A"));
    }

    #[test]
    fn to_unicode_takes_precedence() {
        let mut doc = Document::with_version("1.5");
        let tu = to_unicode_stream(&mut doc, "beginbfchar <41> <0058> endbfchar");
        let dict = dictionary! {
            "Subtype" => "Type1",
            "BaseFont" => "Helvetica",
            "ToUnicode" => tu,
        };
        let font = LoadedFont::load(&doc, &dict, "F1");
        assert_eq!(font.decode(0x41, b"A").as_deref(), Some("X"));
        assert_eq!(font.decode(0x42, b"B").as_deref(), Some("B"));
    }

    #[test]
    fn type0_identity_font() {
        let mut doc = Document::with_version("1.5");
        let cid_font = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "CIDFontType2",
            "DW" => Object::Integer(1000),
            "W" => vec![Object::Integer(3), vec![Object::Integer(250)].into()],
        });
        let tu = to_unicode_stream(
            &mut doc,
            "begincodespacerange <0000> <FFFF> endcodespacerange\nbeginbfchar <0003> <0020> endbfchar",
        );
        let dict = dictionary! {
            "Subtype" => "Type0",
            "BaseFont" => "Gothic",
            "Encoding" => "Identity-H",
            "DescendantFonts" => vec![Object::Reference(cid_font)],
            "ToUnicode" => tu,
        };
        let font = LoadedFont::load(&doc, &dict, "F1");
        assert!(font.is_composite());
        let codes = font.split_codes(&[0x00, 0x03, 0x00, 0x05]);
        assert_eq!(codes.len(), 2);
        assert_eq!(font.width(3), 250.0);
        assert_eq!(font.width(5), 1000.0);
        assert_eq!(font.decode(3, &[0x00, 0x03]).as_deref(), Some(" "));
        assert_eq!(font.decode(5, &[0x00, 0x05]), None);
        assert_eq!(font.writing_mode(), 0);
    }

    #[test]
    fn type0_predefined_cjk_cmap() {
        let doc = Document::with_version("1.5");
        let dict = dictionary! {
            "Subtype" => "Type0",
            "BaseFont" => "SimSun",
            "Encoding" => "GBK-EUC-V",
        };
        let font = LoadedFont::load(&doc, &dict, "F2");
        let bytes = [0x41, 0xD6, 0xD0];
        let codes = font.split_codes(&bytes);
        assert_eq!(codes.len(), 2);
        assert_eq!(font.decode(codes[1].code, codes[1].bytes(&bytes)).as_deref(), Some("中"));
        assert_eq!(font.writing_mode(), 1);
    }

    #[test]
    fn subset_prefix() {
        assert_eq!(strip_subset_prefix("ABCDEF+Times"), "Times");
        assert_eq!(strip_subset_prefix("abc+Times"), "abc+Times");
        assert_eq!(strip_subset_prefix("Times"), "Times");
    }
}

//! Byte → Unicode decoding for simple (single-byte) fonts.
//!
//! A [`SimpleEncoding`] starts from one of the base encodings named by a
//! font's `/Encoding` (or its `/BaseEncoding`) and applies a `/Differences`
//! array on top. WinAnsi and MacRoman tables come from `encoding_rs`.

use encoding_rs::Encoding;

/// Base encoding of a simple font.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BaseEncoding {
    /// Adobe StandardEncoding, the default for Type1 fonts.
    #[default]
    Standard,
    WinAnsi,
    MacRoman,
    /// Font-specific encoding (Symbol, ZapfDingbats, embedded TrueType).
    /// Codes map to themselves.
    BuiltIn,
}

impl BaseEncoding {
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "StandardEncoding" => Some(BaseEncoding::Standard),
            "WinAnsiEncoding" => Some(BaseEncoding::WinAnsi),
            "MacRomanEncoding" => Some(BaseEncoding::MacRoman),
            _ => None,
        }
    }

    fn decode(self, code: u8) -> Option<char> {
        match self {
            BaseEncoding::WinAnsi => decode_single(encoding_rs::WINDOWS_1252, code),
            BaseEncoding::MacRoman => decode_single(encoding_rs::MACINTOSH, code),
            BaseEncoding::Standard => standard_encoding(code),
            BaseEncoding::BuiltIn => char::from_u32(u32::from(code)),
        }
    }
}

fn decode_single(encoding: &'static Encoding, code: u8) -> Option<char> {
    if code < 0x20 {
        return None;
    }
    let byte = [code];
    let (text, had_errors) = encoding.decode_without_bom_handling(&byte);
    if had_errors {
        return None;
    }
    text.chars().next()
}

/// Adobe StandardEncoding: ASCII with typographic quotes plus a sparse
/// upper half.
fn standard_encoding(code: u8) -> Option<char> {
    let ch = match code {
        0x27 => '\u{2019}',
        0x60 => '\u{2018}',
        0x20..=0x7E => char::from(code),
        0xA1 => '¡',
        0xA2 => '¢',
        0xA3 => '£',
        0xA4 => '\u{2044}',
        0xA5 => '¥',
        0xA6 => 'ƒ',
        0xA7 => '§',
        0xA8 => '¤',
        0xA9 => '\'',
        0xAA => '\u{201C}',
        0xAB => '«',
        0xAC => '\u{2039}',
        0xAD => '\u{203A}',
        0xAE => '\u{FB01}',
        0xAF => '\u{FB02}',
        0xB1 => '\u{2013}',
        0xB2 => '\u{2020}',
        0xB3 => '\u{2021}',
        0xB4 => '·',
        0xB6 => '¶',
        0xB7 => '\u{2022}',
        0xB8 => '\u{201A}',
        0xB9 => '\u{201E}',
        0xBA => '\u{201D}',
        0xBB => '»',
        0xBC => '\u{2026}',
        0xBD => '\u{2030}',
        0xBF => '¿',
        0xC1 => '`',
        0xC2 => '´',
        0xC3 => 'ˆ',
        0xC4 => '˜',
        0xC5 => '¯',
        0xC6 => '˘',
        0xC7 => '˙',
        0xC8 => '¨',
        0xCA => '˚',
        0xCB => '¸',
        0xCD => '˝',
        0xCE => '˛',
        0xCF => 'ˇ',
        0xD0 => '\u{2014}',
        0xE1 => 'Æ',
        0xE3 => 'ª',
        0xE8 => 'Ł',
        0xE9 => 'Ø',
        0xEA => 'Œ',
        0xEB => 'º',
        0xF1 => 'æ',
        0xF5 => 'ı',
        0xF8 => 'ł',
        0xF9 => 'ø',
        0xFA => 'œ',
        0xFB => 'ß',
        _ => return None,
    };
    Some(ch)
}

/// Encoding of a simple font: a base table plus `/Differences`.
#[derive(Debug, Clone, PartialEq)]
pub struct SimpleEncoding {
    base: BaseEncoding,
    differences: Vec<(u8, String)>,
}

impl SimpleEncoding {
    pub fn new(base: BaseEncoding) -> Self {
        Self {
            base,
            differences: Vec::new(),
        }
    }

    pub fn base(&self) -> BaseEncoding {
        self.base
    }

    /// Override `code` with the glyph `name`.
    pub fn set_difference(&mut self, code: u8, name: impl Into<String>) {
        let name = name.into();
        match self.differences.iter_mut().find(|(c, _)| *c == code) {
            Some(entry) => entry.1 = name,
            None => self.differences.push((code, name)),
        }
    }

    /// Glyph name assigned to `code` by `/Differences`.
    pub fn difference(&self, code: u8) -> Option<&str> {
        self.differences
            .iter()
            .find(|(c, _)| *c == code)
            .map(|(_, n)| n.as_str())
    }

    /// Unicode text for `code`.
    ///
    /// A `/Differences` entry wins when its glyph name is recognized; an
    /// unrecognized name falls back to the base encoding.
    pub fn decode(&self, code: u8) -> Option<String> {
        if let Some(name) = self.difference(code) {
            if let Some(text) = glyph_name_to_unicode(name) {
                return Some(text);
            }
        }
        self.base.decode(code).map(String::from)
    }
}

/// Parse a `/Differences` array given as `(code | name)` items.
///
/// Each integer sets the code for the names that follow it; each name
/// consumes one code.
pub fn apply_differences<'n, I>(encoding: &mut SimpleEncoding, items: I)
where
    I: IntoIterator<Item = DifferenceItem<'n>>,
{
    let mut next: Option<u32> = None;
    for item in items {
        match item {
            DifferenceItem::Code(code) => next = u32::try_from(code).ok(),
            DifferenceItem::Name(name) => {
                if let Some(code) = next {
                    if let Ok(byte) = u8::try_from(code) {
                        encoding.set_difference(byte, name);
                    }
                    next = Some(code + 1);
                }
            }
        }
    }
}

/// One element of a `/Differences` array.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DifferenceItem<'n> {
    Code(i64),
    Name(&'n str),
}

/// Resolve a glyph name to Unicode text.
///
/// Handles `uniXXXX` (one or more 4-digit groups), `uXXXX`..`uXXXXXX`,
/// single-character names, and the common Latin glyph names.
pub fn glyph_name_to_unicode(name: &str) -> Option<String> {
    // "a.sc", "f_i": suffix after '.' is a variant tag.
    let base = name.split('.').next().unwrap_or(name);
    if base.is_empty() {
        return None;
    }
    if base.contains('_') {
        let parts: Option<String> = base.split('_').map(glyph_name_to_unicode).collect();
        return parts;
    }
    if let Some(hex) = base.strip_prefix("uni") {
        if hex.is_ascii() && hex.len() >= 4 && hex.len() % 4 == 0 {
            let units: Option<Vec<u16>> = (0..hex.len())
                .step_by(4)
                .map(|i| u16::from_str_radix(&hex[i..i + 4], 16).ok())
                .collect();
            if let Some(units) = units {
                return Some(String::from_utf16_lossy(&units));
            }
        }
    }
    if let Some(hex) = base.strip_prefix('u') {
        if (4..=6).contains(&hex.len()) {
            if let Some(ch) = u32::from_str_radix(hex, 16).ok().and_then(char::from_u32) {
                return Some(ch.to_string());
            }
        }
    }
    let mut chars = base.chars();
    if let (Some(ch), None) = (chars.next(), chars.next()) {
        return Some(ch.to_string());
    }
    GLYPH_NAMES
        .binary_search_by_key(&base, |&(n, _)| n)
        .ok()
        .map(|i| GLYPH_NAMES[i].1.to_string())
}

/// Common glyph names, sorted for binary search.
static GLYPH_NAMES: &[(&str, char)] = &[
    ("AE", 'Æ'),
    ("Aacute", 'Á'),
    ("Adieresis", 'Ä'),
    ("Agrave", 'À'),
    ("Ccedilla", 'Ç'),
    ("Eacute", 'É'),
    ("Egrave", 'È'),
    ("Euro", '€'),
    ("Ntilde", 'Ñ'),
    ("OE", 'Œ'),
    ("Odieresis", 'Ö'),
    ("Oslash", 'Ø'),
    ("Udieresis", 'Ü'),
    ("aacute", 'á'),
    ("acircumflex", 'â'),
    ("adieresis", 'ä'),
    ("ae", 'æ'),
    ("agrave", 'à'),
    ("ampersand", '&'),
    ("aring", 'å'),
    ("asterisk", '*'),
    ("at", '@'),
    ("backslash", '\\'),
    ("bar", '|'),
    ("braceleft", '{'),
    ("braceright", '}'),
    ("bracketleft", '['),
    ("bracketright", ']'),
    ("bullet", '\u{2022}'),
    ("ccedilla", 'ç'),
    ("colon", ':'),
    ("comma", ','),
    ("copyright", '©'),
    ("dagger", '\u{2020}'),
    ("degree", '°'),
    ("dollar", '$'),
    ("eacute", 'é'),
    ("ecircumflex", 'ê'),
    ("edieresis", 'ë'),
    ("egrave", 'è'),
    ("eight", '8'),
    ("ellipsis", '\u{2026}'),
    ("emdash", '\u{2014}'),
    ("endash", '\u{2013}'),
    ("equal", '='),
    ("exclam", '!'),
    ("ff", '\u{FB00}'),
    ("ffi", '\u{FB03}'),
    ("ffl", '\u{FB04}'),
    ("fi", '\u{FB01}'),
    ("five", '5'),
    ("fl", '\u{FB02}'),
    ("four", '4'),
    ("germandbls", 'ß'),
    ("grave", '`'),
    ("greater", '>'),
    ("guillemotleft", '«'),
    ("guillemotright", '»'),
    ("hyphen", '-'),
    ("iacute", 'í'),
    ("idieresis", 'ï'),
    ("less", '<'),
    ("minus", '\u{2212}'),
    ("nbspace", '\u{00A0}'),
    ("nine", '9'),
    ("ntilde", 'ñ'),
    ("numbersign", '#'),
    ("oacute", 'ó'),
    ("odieresis", 'ö'),
    ("oe", 'œ'),
    ("one", '1'),
    ("oslash", 'ø'),
    ("parenleft", '('),
    ("parenright", ')'),
    ("percent", '%'),
    ("period", '.'),
    ("plus", '+'),
    ("question", '?'),
    ("quotedbl", '"'),
    ("quotedblleft", '\u{201C}'),
    ("quotedblright", '\u{201D}'),
    ("quoteleft", '\u{2018}'),
    ("quoteright", '\u{2019}'),
    ("quotesingle", '\''),
    ("registered", '®'),
    ("section", '§'),
    ("semicolon", ';'),
    ("seven", '7'),
    ("six", '6'),
    ("slash", '/'),
    ("space", ' '),
    ("sterling", '£'),
    ("three", '3'),
    ("trademark", '\u{2122}'),
    ("two", '2'),
    ("uacute", 'ú'),
    ("udieresis", 'ü'),
    ("underscore", '_'),
    ("zero", '0'),
];

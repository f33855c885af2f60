//! CMap parsing for composite fonts and ToUnicode streams.
//!
//! A single [`CMap`] type covers the three kinds of mapping a PDF CMap
//! stream can carry:
//! - `begincodespacerange`: the byte lengths of character codes, used to
//!   split a string operand into codes of 1 to 4 bytes;
//! - `beginbfchar`/`beginbfrange`: code → Unicode (ToUnicode CMaps);
//! - `begincidchar`/`begincidrange`: code → CID (encoding CMaps).
//!
//! Parsing is lenient: entries that cannot be read are skipped and an
//! unusable stream simply produces an empty map.

use std::collections::HashMap;

use crate::font::CharCode;

/// Largest range expanded into the Unicode table; bigger `bfrange`
/// entries are clamped.
const MAX_RANGE_EXPANSION: u32 = 0xFFFF;

/// One `begincodespacerange` entry. `low` and `high` have the same length.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodespaceRange {
    low: Vec<u8>,
    high: Vec<u8>,
}

impl CodespaceRange {
    pub fn new(low: Vec<u8>, high: Vec<u8>) -> Option<Self> {
        if low.is_empty() || low.len() != high.len() || low.len() > 4 {
            return None;
        }
        Some(Self { low, high })
    }

    /// Code length in bytes.
    pub fn len(&self) -> usize {
        self.low.len()
    }

    pub fn is_empty(&self) -> bool {
        self.low.is_empty()
    }

    /// Whether `bytes` (of exactly this range's length) lies in the range.
    /// Each byte is compared against its own bounds.
    pub fn matches(&self, bytes: &[u8]) -> bool {
        bytes.len() == self.low.len()
            && bytes
                .iter()
                .zip(self.low.iter().zip(&self.high))
                .all(|(b, (lo, hi))| lo <= b && b <= hi)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct CidRange {
    low: u32,
    high: u32,
    first_cid: u32,
}

/// A parsed CMap stream.
#[derive(Debug, Clone, Default)]
pub struct CMap {
    name: Option<String>,
    writing_mode: u8,
    codespace: Vec<CodespaceRange>,
    unicode: HashMap<u32, String>,
    cid_chars: HashMap<u32, u32>,
    cid_ranges: Vec<CidRange>,
}

impl CMap {
    /// Parse CMap stream bytes.
    pub fn parse(data: &[u8]) -> Self {
        let text = String::from_utf8_lossy(data);
        let mut cmap = CMap {
            name: parse_cmap_name(&text),
            writing_mode: parse_writing_mode(&text),
            ..CMap::default()
        };

        for section in sections(&text, "begincodespacerange", "endcodespacerange") {
            let tokens = tokenize_section(section);
            for pair in tokens.chunks_exact(2) {
                if let (Token::Hex(lo), Token::Hex(hi)) = (&pair[0], &pair[1]) {
                    if let Some(range) = CodespaceRange::new(lo.clone(), hi.clone()) {
                        cmap.codespace.push(range);
                    }
                }
            }
        }

        for section in sections(&text, "beginbfchar", "endbfchar") {
            let tokens = tokenize_section(section);
            for pair in tokens.chunks_exact(2) {
                if let (Token::Hex(src), Token::Hex(dst)) = (&pair[0], &pair[1]) {
                    if let Some(text) = decode_utf16be(dst) {
                        cmap.unicode.insert(bytes_to_code(src), text);
                    }
                }
            }
        }

        for section in sections(&text, "beginbfrange", "endbfrange") {
            cmap.parse_bfrange_section(section);
        }

        for section in sections(&text, "begincidchar", "endcidchar") {
            let tokens = tokenize_section(section);
            for pair in tokens.chunks_exact(2) {
                if let (Token::Hex(src), Token::Int(cid)) = (&pair[0], &pair[1]) {
                    cmap.cid_chars.insert(bytes_to_code(src), *cid);
                }
            }
        }

        for section in sections(&text, "begincidrange", "endcidrange") {
            let tokens = tokenize_section(section);
            for triple in tokens.chunks_exact(3) {
                if let (Token::Hex(lo), Token::Hex(hi), Token::Int(cid)) =
                    (&triple[0], &triple[1], &triple[2])
                {
                    cmap.cid_ranges.push(CidRange {
                        low: bytes_to_code(lo),
                        high: bytes_to_code(hi),
                        first_cid: *cid,
                    });
                }
            }
        }

        cmap
    }

    /// The `Identity-H`/`Identity-V` CMap: two-byte codes, CID = code.
    pub fn identity(writing_mode: u8) -> Self {
        let name = if writing_mode == 1 {
            "Identity-V"
        } else {
            "Identity-H"
        };
        CMap {
            name: Some(name.to_string()),
            writing_mode,
            codespace: vec![CodespaceRange {
                low: vec![0x00, 0x00],
                high: vec![0xFF, 0xFF],
            }],
            cid_ranges: vec![CidRange {
                low: 0,
                high: 0xFFFF,
                first_cid: 0,
            }],
            ..CMap::default()
        }
    }

    fn parse_bfrange_section(&mut self, section: &str) {
        let tokens = tokenize_section(section);
        let mut i = 0;
        while i + 2 < tokens.len() {
            let (Token::Hex(lo), Token::Hex(hi)) = (&tokens[i], &tokens[i + 1]) else {
                i += 1;
                continue;
            };
            let low = bytes_to_code(lo);
            let high = bytes_to_code(hi).min(low.saturating_add(MAX_RANGE_EXPANSION));
            match &tokens[i + 2] {
                Token::Hex(dst) => {
                    if let Some(base) = utf16be_units(dst) {
                        for (offset, code) in (low..=high).enumerate() {
                            if let Some(text) = increment_last_unit(&base, offset as u32) {
                                self.unicode.insert(code, text);
                            }
                        }
                    }
                    i += 3;
                }
                Token::ArrayStart => {
                    let mut j = i + 3;
                    let mut code = low;
                    while j < tokens.len() && tokens[j] != Token::ArrayEnd {
                        if let Token::Hex(dst) = &tokens[j] {
                            if code <= high {
                                if let Some(text) = decode_utf16be(dst) {
                                    self.unicode.insert(code, text);
                                }
                            }
                            code = code.saturating_add(1);
                        }
                        j += 1;
                    }
                    i = j + 1;
                }
                _ => i += 3,
            }
        }
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// `/WMode`: 0 horizontal, 1 vertical.
    pub fn writing_mode(&self) -> u8 {
        self.writing_mode
    }

    pub fn has_codespace(&self) -> bool {
        !self.codespace.is_empty()
    }

    pub fn codespace_ranges(&self) -> &[CodespaceRange] {
        &self.codespace
    }

    /// Unicode text mapped to `code`.
    pub fn to_unicode(&self, code: u32) -> Option<&str> {
        self.unicode.get(&code).map(String::as_str)
    }

    /// Number of code → Unicode mappings.
    pub fn unicode_len(&self) -> usize {
        self.unicode.len()
    }

    /// CID mapped to `code` by `cidchar`/`cidrange` entries.
    pub fn cid(&self, code: u32) -> Option<u32> {
        if let Some(&cid) = self.cid_chars.get(&code) {
            return Some(cid);
        }
        self.cid_ranges
            .iter()
            .find(|r| r.low <= code && code <= r.high)
            .map(|r| r.first_cid + (code - r.low))
    }

    pub fn is_empty(&self) -> bool {
        self.unicode.is_empty()
            && self.cid_chars.is_empty()
            && self.cid_ranges.is_empty()
            && self.codespace.is_empty()
    }

    /// Split `bytes` into character codes using the codespace ranges.
    ///
    /// At each position the shortest matching range wins. A byte sequence
    /// that matches no range consumes as many bytes as the shortest range
    /// whose length fits (one byte when the map has no codespace).
    pub fn split_codes(&self, bytes: &[u8]) -> Vec<CharCode> {
        let shortest = self.codespace.iter().map(CodespaceRange::len).min().unwrap_or(1);
        let mut codes = Vec::with_capacity(bytes.len());
        let mut pos = 0;
        while pos < bytes.len() {
            let remaining = bytes.len() - pos;
            let matched = (1..=remaining.min(4)).find(|&n| {
                let candidate = &bytes[pos..pos + n];
                self.codespace.iter().any(|r| r.matches(candidate))
            });
            let len = matched.unwrap_or_else(|| shortest.min(remaining));
            codes.push(CharCode {
                code: bytes_to_code(&bytes[pos..pos + len]),
                start: pos,
                len,
            });
            pos += len;
        }
        codes
    }
}

/// Big-endian integer value of a code's bytes.
pub(crate) fn bytes_to_code(bytes: &[u8]) -> u32 {
    bytes.iter().fold(0u32, |acc, &b| (acc << 8) | u32::from(b))
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Hex(Vec<u8>),
    Int(u32),
    ArrayStart,
    ArrayEnd,
}

/// Bodies between every `begin`/`end` keyword pair.
fn sections<'t>(text: &'t str, begin: &str, end: &str) -> Vec<&'t str> {
    let mut out = Vec::new();
    let mut search_from = 0;
    while let Some(start) = text[search_from..].find(begin) {
        let body_start = search_from + start + begin.len();
        match text[body_start..].find(end) {
            Some(len) => {
                out.push(&text[body_start..body_start + len]);
                search_from = body_start + len + end.len();
            }
            None => break,
        }
    }
    out
}

/// Hex strings, integers and array brackets of a section body. Anything
/// else (names, comments, stray keywords) is dropped.
fn tokenize_section(section: &str) -> Vec<Token> {
    let bytes = section.as_bytes();
    let mut tokens = Vec::new();
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'<' => {
                let start = i + 1;
                let Some(len) = bytes[start..].iter().position(|&b| b == b'>') else {
                    break;
                };
                if let Some(value) = parse_hex(&section[start..start + len]) {
                    tokens.push(Token::Hex(value));
                }
                i = start + len + 1;
            }
            b'[' => {
                tokens.push(Token::ArrayStart);
                i += 1;
            }
            b']' => {
                tokens.push(Token::ArrayEnd);
                i += 1;
            }
            b'%' => {
                while i < bytes.len() && bytes[i] != b'\n' && bytes[i] != b'\r' {
                    i += 1;
                }
            }
            b'0'..=b'9' => {
                let start = i;
                while i < bytes.len() && bytes[i].is_ascii_digit() {
                    i += 1;
                }
                if let Ok(n) = section[start..i].parse::<u32>() {
                    tokens.push(Token::Int(n));
                }
            }
            _ => i += 1,
        }
    }
    tokens
}

/// Decode hex digits, ignoring whitespace. An odd digit count is padded
/// with a trailing zero.
fn parse_hex(hex: &str) -> Option<Vec<u8>> {
    let digits: Vec<u8> = hex
        .bytes()
        .filter(|b| !b.is_ascii_whitespace())
        .map(|b| (b as char).to_digit(16).map(|d| d as u8))
        .collect::<Option<_>>()?;
    if digits.is_empty() {
        return None;
    }
    Some(
        digits
            .chunks(2)
            .map(|pair| (pair[0] << 4) | pair.get(1).copied().unwrap_or(0))
            .collect(),
    )
}

/// UTF-16BE code units of a destination string. A single byte is widened
/// to one unit.
fn utf16be_units(bytes: &[u8]) -> Option<Vec<u16>> {
    match bytes.len() {
        0 => None,
        1 => Some(vec![u16::from(bytes[0])]),
        _ => Some(
            bytes
                .chunks(2)
                .map(|c| (u16::from(c[0]) << 8) | u16::from(c.get(1).copied().unwrap_or(0)))
                .collect(),
        ),
    }
}

fn decode_utf16be(bytes: &[u8]) -> Option<String> {
    let units = utf16be_units(bytes)?;
    Some(String::from_utf16_lossy(&units))
}

/// `base` with its last UTF-16 unit advanced by `offset`, as in
/// `bfrange` entries with a string destination.
fn increment_last_unit(base: &[u16], offset: u32) -> Option<String> {
    let (last, head) = base.split_last()?;
    let bumped = u32::from(*last).checked_add(offset)?;
    let mut units = head.to_vec();
    if let Ok(unit) = u16::try_from(bumped) {
        units.push(unit);
        return Some(String::from_utf16_lossy(&units));
    }
    // Overflowed a single unit: treat the destination as a code point.
    let ch = char::from_u32(bumped)?;
    let mut text = String::from_utf16_lossy(&units);
    text.push(ch);
    Some(text)
}

fn parse_cmap_name(text: &str) -> Option<String> {
    let idx = text.find("/CMapName")?;
    let rest = text[idx + "/CMapName".len()..].trim_start();
    let name = rest.strip_prefix('/')?;
    let end = name
        .find(|c: char| c.is_whitespace() || "/[]<>()".contains(c))
        .unwrap_or(name.len());
    (end > 0).then(|| name[..end].to_string())
}

fn parse_writing_mode(text: &str) -> u8 {
    text.find("/WMode")
        .and_then(|idx| {
            text[idx + "/WMode".len()..]
                .split_whitespace()
                .next()
                .and_then(|v| v.parse::<u8>().ok())
        })
        .unwrap_or(0)
}

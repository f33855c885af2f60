//! Content stream tokenizer for PDF operator/operand parsing.
//!
//! [`ContentLexer`] walks decoded content-stream bytes and yields one
//! [`Operator`] at a time, each carrying the [`Operand`]s that preceded it.
//!
//! The lexer is lenient in the way viewers are:
//! - a malformed operand poisons only the operator it belongs to, which is
//!   reported as [`ProcessorError::Parse`] and lexing continues after it;
//! - reaching the end of input inside a string, array, dictionary or inline
//!   image yields [`ProcessorError::Truncated`] once and ends the stream;
//! - stray closing delimiters at the top level are skipped.

use pdfcanvas_core::image::{expand_color_space_name, expand_key_name};
use pdfcanvas_core::ImageHandle;

use crate::error::ProcessorError;

/// A PDF content stream operand value.
#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    /// Integer number (e.g., `42`, `-7`).
    Integer(i64),
    /// Real (floating-point) number (e.g., `3.14`, `.5`).
    Real(f64),
    /// Name object (e.g., `/F1`, `/DeviceRGB`). Stored without the leading `/`.
    Name(String),
    /// Literal string delimited by parentheses, stored as raw bytes.
    LiteralString(Vec<u8>),
    /// Hexadecimal string delimited by angle brackets, stored as decoded bytes.
    HexString(Vec<u8>),
    /// Array of operands (e.g., `[1 2 3]`).
    Array(Vec<Operand>),
    /// Boolean value (`true` or `false`).
    Boolean(bool),
    /// The null object.
    Null,
    /// Dictionary object (`<< /Key value ... >>`).
    Dictionary(Vec<(String, Operand)>),
}

impl Operand {
    /// Numeric value of an integer or real operand.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Operand::Integer(i) => Some(*i as f64),
            Operand::Real(f) => Some(*f),
            _ => None,
        }
    }

    /// Integer value; reals are truncated toward zero.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Operand::Integer(i) => Some(*i),
            Operand::Real(f) => Some(*f as i64),
            _ => None,
        }
    }

    pub fn as_name(&self) -> Option<&str> {
        match self {
            Operand::Name(n) => Some(n),
            _ => None,
        }
    }

    /// Bytes of a literal or hex string.
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Operand::LiteralString(s) | Operand::HexString(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[Operand]> {
        match self {
            Operand::Array(a) => Some(a),
            _ => None,
        }
    }

    pub fn as_dict(&self) -> Option<&[(String, Operand)]> {
        match self {
            Operand::Dictionary(d) => Some(d),
            _ => None,
        }
    }
}

/// Look up `key` in an inline dictionary.
pub fn dict_get<'d>(dict: &'d [(String, Operand)], key: &str) -> Option<&'d Operand> {
    dict.iter().find(|(k, _)| k == key).map(|(_, v)| v)
}

/// A PDF content stream operator with its preceding operands.
#[derive(Debug, Clone, PartialEq)]
pub struct Operator {
    /// Operator name (e.g., `"BT"`, `"Tf"`, `"Tj"`, `"m"`).
    pub name: String,
    /// Operands that preceded this operator on the operand stack.
    ///
    /// For inline images (`BI`) this is `[Dictionary(entries), LiteralString(data)]`.
    pub operands: Vec<Operand>,
}

/// Streaming tokenizer over content-stream bytes.
#[derive(Debug)]
pub struct ContentLexer<'a> {
    input: &'a [u8],
    pos: usize,
    operands: Vec<Operand>,
    /// Set when an operand failed to parse; reported at the next operator.
    poisoned: Option<String>,
    finished: bool,
}

impl<'a> ContentLexer<'a> {
    pub fn new(input: &'a [u8]) -> Self {
        Self {
            input,
            pos: 0,
            operands: Vec::new(),
            poisoned: None,
            finished: false,
        }
    }

    /// Byte offset of the next unread byte.
    pub fn position(&self) -> usize {
        self.pos
    }

    fn finish_operator(&mut self, name: String) -> Result<Operator, ProcessorError> {
        let operands = std::mem::take(&mut self.operands);
        match self.poisoned.take() {
            Some(msg) => Err(ProcessorError::Parse(format!("{msg} (before '{name}')"))),
            None => Ok(Operator { name, operands }),
        }
    }

    fn next_operator(&mut self) -> Option<Result<Operator, ProcessorError>> {
        let input = self.input;
        loop {
            skip_whitespace_and_comments(input, &mut self.pos);
            if self.pos >= input.len() {
                // Operands with no operator at end of stream are dropped.
                return None;
            }

            match input[self.pos] {
                b'(' | b'<' | b'[' | b'/' | b'0'..=b'9' | b'+' | b'-' | b'.' => {
                    match parse_value(input, &mut self.pos) {
                        Ok(value) => self.operands.push(value),
                        Err(Lex::Truncated(msg)) => return Some(Err(ProcessorError::Truncated(msg))),
                        Err(Lex::Malformed(msg)) => {
                            self.poisoned.get_or_insert(msg);
                        }
                    }
                }
                b if is_regular(b) => {
                    let keyword = parse_keyword(input, &mut self.pos);
                    match keyword.as_str() {
                        "true" => self.operands.push(Operand::Boolean(true)),
                        "false" => self.operands.push(Operand::Boolean(false)),
                        "null" => self.operands.push(Operand::Null),
                        "BI" => {
                            return Some(match parse_inline_image(input, &mut self.pos) {
                                Ok((dict, data)) => {
                                    self.operands.clear();
                                    self.operands.push(Operand::Dictionary(dict));
                                    self.operands.push(Operand::LiteralString(data));
                                    self.finish_operator(keyword)
                                }
                                Err(Lex::Truncated(msg)) => Err(ProcessorError::Truncated(msg)),
                                Err(Lex::Malformed(msg)) => {
                                    self.operands.clear();
                                    Err(ProcessorError::Parse(msg))
                                }
                            });
                        }
                        _ => return Some(self.finish_operator(keyword)),
                    }
                }
                _ => {
                    // Stray ')', ']', '>', '{', '}'.
                    self.pos += 1;
                }
            }
        }
    }
}

impl Iterator for ContentLexer<'_> {
    type Item = Result<Operator, ProcessorError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }
        let item = self.next_operator();
        if matches!(item, None | Some(Err(ProcessorError::Truncated(_)))) {
            self.finished = true;
        }
        item
    }
}

/// Parse a whole content stream, failing on the first malformed operator.
///
/// Mostly useful for tests and tools; the processor consumes
/// [`ContentLexer`] directly so it can recover from bad operators.
pub fn tokenize(input: &[u8]) -> Result<Vec<Operator>, ProcessorError> {
    ContentLexer::new(input).collect()
}

/// Internal lexing failure: truncation ends the stream, malformation only
/// the current operator.
enum Lex {
    Truncated(String),
    Malformed(String),
}

type LexResult<T> = Result<T, Lex>;

/// Returns `true` if `b` is a PDF whitespace character.
fn is_whitespace(b: u8) -> bool {
    matches!(b, b' ' | b'\t' | b'\r' | b'\n' | 0x0C | 0x00)
}

/// Returns `true` if `b` is a PDF delimiter character.
fn is_delimiter(b: u8) -> bool {
    matches!(
        b,
        b'(' | b')' | b'<' | b'>' | b'[' | b']' | b'{' | b'}' | b'/' | b'%'
    )
}

fn is_regular(b: u8) -> bool {
    !is_whitespace(b) && !is_delimiter(b)
}

/// Skip whitespace and comments.
fn skip_whitespace_and_comments(input: &[u8], pos: &mut usize) {
    while *pos < input.len() {
        if is_whitespace(input[*pos]) {
            *pos += 1;
        } else if input[*pos] == b'%' {
            while *pos < input.len() && input[*pos] != b'\n' && input[*pos] != b'\r' {
                *pos += 1;
            }
        } else {
            break;
        }
    }
}

/// Parse any operand value at `pos` (never a bare operator keyword).
fn parse_value(input: &[u8], pos: &mut usize) -> LexResult<Operand> {
    match input[*pos] {
        b'(' => Ok(Operand::LiteralString(parse_literal_string(input, pos)?)),
        b'<' if input.get(*pos + 1) == Some(&b'<') => {
            Ok(Operand::Dictionary(parse_dictionary(input, pos)?))
        }
        b'<' => Ok(Operand::HexString(parse_hex_string(input, pos)?)),
        b'[' => {
            *pos += 1;
            Ok(Operand::Array(parse_array(input, pos)?))
        }
        b'/' => Ok(Operand::Name(parse_name(input, pos))),
        b'0'..=b'9' | b'+' | b'-' | b'.' => parse_number(input, pos),
        b if is_regular(b) => {
            let kw = parse_keyword(input, pos);
            Ok(match kw.as_str() {
                "true" => Operand::Boolean(true),
                "false" => Operand::Boolean(false),
                "null" => Operand::Null,
                // Bare words inside arrays/dictionaries are kept as names.
                _ => Operand::Name(kw),
            })
        }
        b => {
            *pos += 1;
            Err(Lex::Malformed(format!("unexpected byte 0x{b:02X}")))
        }
    }
}

/// Parse a literal string `(...)` with balanced parentheses and escape sequences.
fn parse_literal_string(input: &[u8], pos: &mut usize) -> LexResult<Vec<u8>> {
    *pos += 1; // skip opening '('

    let mut result = Vec::new();
    let mut depth = 1u32;

    while *pos < input.len() {
        let b = input[*pos];
        match b {
            b'(' => {
                depth += 1;
                result.push(b'(');
                *pos += 1;
            }
            b')' => {
                depth -= 1;
                *pos += 1;
                if depth == 0 {
                    return Ok(result);
                }
                result.push(b')');
            }
            b'\\' => {
                *pos += 1;
                let Some(&escaped) = input.get(*pos) else {
                    break;
                };
                match escaped {
                    b'n' => result.push(b'\n'),
                    b'r' => result.push(b'\r'),
                    b't' => result.push(b'\t'),
                    b'b' => result.push(0x08),
                    b'f' => result.push(0x0C),
                    b'\r' => {
                        // Line continuation (CR or CR LF).
                        *pos += 1;
                        if input.get(*pos) == Some(&b'\n') {
                            *pos += 1;
                        }
                        continue;
                    }
                    b'\n' => {
                        *pos += 1;
                        continue;
                    }
                    b'0'..=b'7' => {
                        let mut val: u16 = u16::from(escaped - b'0');
                        for _ in 0..2 {
                            match input.get(*pos + 1) {
                                Some(&d @ b'0'..=b'7') => {
                                    *pos += 1;
                                    val = val * 8 + u16::from(d - b'0');
                                }
                                _ => break,
                            }
                        }
                        // High-order overflow is ignored.
                        result.push((val & 0xFF) as u8);
                    }
                    // `\(`, `\)`, `\\` and unknown escapes yield the character.
                    other => result.push(other),
                }
                *pos += 1;
            }
            _ => {
                result.push(b);
                *pos += 1;
            }
        }
    }

    Err(Lex::Truncated("unterminated literal string".to_string()))
}

/// Parse a hex string `<...>`. Non-hex bytes are ignored.
fn parse_hex_string(input: &[u8], pos: &mut usize) -> LexResult<Vec<u8>> {
    *pos += 1; // skip '<'

    let mut digits = Vec::new();
    while *pos < input.len() {
        let b = input[*pos];
        *pos += 1;
        if b == b'>' {
            if digits.len() % 2 != 0 {
                digits.push(0);
            }
            return Ok(digits.chunks(2).map(|c| (c[0] << 4) | c[1]).collect());
        }
        if let Some(d) = hex_digit(b) {
            digits.push(d);
        }
    }

    Err(Lex::Truncated("unterminated hex string".to_string()))
}

/// Convert a hex digit character to its value (0-15).
fn hex_digit(b: u8) -> Option<u8> {
    match b {
        b'0'..=b'9' => Some(b - b'0'),
        b'a'..=b'f' => Some(b - b'a' + 10),
        b'A'..=b'F' => Some(b - b'A' + 10),
        _ => None,
    }
}

/// Parse an array until `]`. Assumes `[` already consumed.
fn parse_array(input: &[u8], pos: &mut usize) -> LexResult<Vec<Operand>> {
    let mut elements = Vec::new();
    let mut malformed = None;

    loop {
        skip_whitespace_and_comments(input, pos);
        if *pos >= input.len() {
            return Err(Lex::Truncated("unterminated array".to_string()));
        }
        if input[*pos] == b']' {
            *pos += 1;
            return match malformed {
                Some(msg) => Err(Lex::Malformed(msg)),
                None => Ok(elements),
            };
        }
        match parse_value(input, pos) {
            Ok(v) => elements.push(v),
            Err(Lex::Malformed(msg)) => {
                malformed.get_or_insert(msg);
            }
            Err(truncated) => return Err(truncated),
        }
    }
}

/// Parse a dictionary `<< /Key value ... >>`. Assumes current bytes are `<<`.
fn parse_dictionary(input: &[u8], pos: &mut usize) -> LexResult<Vec<(String, Operand)>> {
    *pos += 2; // skip '<<'

    let mut entries = Vec::new();
    let mut malformed = None;

    loop {
        skip_whitespace_and_comments(input, pos);
        if *pos >= input.len() {
            return Err(Lex::Truncated("unterminated dictionary".to_string()));
        }
        if input[*pos] == b'>' && input.get(*pos + 1) == Some(&b'>') {
            *pos += 2;
            return match malformed {
                Some(msg) => Err(Lex::Malformed(msg)),
                None => Ok(entries),
            };
        }
        if input[*pos] != b'/' {
            // Keep going so the closing '>>' is found; the entry is lost.
            malformed.get_or_insert_with(|| "expected name key in dictionary".to_string());
            match parse_value(input, pos) {
                Err(Lex::Truncated(msg)) => return Err(Lex::Truncated(msg)),
                _ => continue,
            }
        }
        let key = parse_name(input, pos);

        skip_whitespace_and_comments(input, pos);
        if *pos >= input.len() {
            return Err(Lex::Truncated("unterminated dictionary".to_string()));
        }
        if input[*pos] == b'>' && input.get(*pos + 1) == Some(&b'>') {
            malformed.get_or_insert_with(|| format!("missing value for /{key}"));
            continue;
        }
        match parse_value(input, pos) {
            Ok(value) => entries.push((key, value)),
            Err(Lex::Malformed(msg)) => {
                malformed.get_or_insert(msg);
            }
            Err(truncated) => return Err(truncated),
        }
    }
}

/// Parse a `/Name` token. Assumes current byte is `/`.
fn parse_name(input: &[u8], pos: &mut usize) -> String {
    *pos += 1; // skip '/'

    let start = *pos;
    while *pos < input.len() && is_regular(input[*pos]) {
        *pos += 1;
    }

    // Handle #XX hex escapes in names
    let raw = &input[start..*pos];
    let mut name = Vec::with_capacity(raw.len());
    let mut i = 0;
    while i < raw.len() {
        if raw[i] == b'#' && i + 2 < raw.len() {
            if let (Some(hi), Some(lo)) = (hex_digit(raw[i + 1]), hex_digit(raw[i + 2])) {
                name.push((hi << 4) | lo);
                i += 3;
                continue;
            }
        }
        name.push(raw[i]);
        i += 1;
    }

    String::from_utf8_lossy(&name).into_owned()
}

/// Parse a number (integer or real).
fn parse_number(input: &[u8], pos: &mut usize) -> LexResult<Operand> {
    let start = *pos;
    let mut has_dot = false;
    let mut has_digit = false;

    if matches!(input[*pos], b'+' | b'-') {
        *pos += 1;
    }
    while *pos < input.len() {
        match input[*pos] {
            b'.' if !has_dot => has_dot = true,
            b'0'..=b'9' => has_digit = true,
            _ => break,
        }
        *pos += 1;
    }

    // Swallow the rest of a garbled token such as `1.2.3` or `--4`.
    let token_end = *pos;
    while *pos < input.len() && is_regular(input[*pos]) && !input[*pos].is_ascii_alphabetic() {
        *pos += 1;
    }
    let token = &input[start..*pos];
    let text = String::from_utf8_lossy(token);
    if !has_digit || token_end != *pos {
        return Err(Lex::Malformed(format!("invalid number: {text}")));
    }

    if has_dot {
        text.parse::<f64>()
            .map(Operand::Real)
            .map_err(|_| Lex::Malformed(format!("invalid real number: {text}")))
    } else {
        match text.parse::<i64>() {
            Ok(v) => Ok(Operand::Integer(v)),
            // Out-of-range integers degrade to reals.
            Err(_) => text
                .parse::<f64>()
                .map(Operand::Real)
                .map_err(|_| Lex::Malformed(format!("invalid integer: {text}"))),
        }
    }
}

/// Parse a keyword: a run of regular characters.
fn parse_keyword(input: &[u8], pos: &mut usize) -> String {
    let start = *pos;
    while *pos < input.len() && is_regular(input[*pos]) {
        *pos += 1;
    }
    String::from_utf8_lossy(&input[start..*pos]).into_owned()
}

/// Inline image dictionary entries: key-value pairs.
type InlineImageDict = Vec<(String, Operand)>;

/// Parse inline image data: `BI <dict entries> ID <data> EI`.
/// Called after the `BI` keyword has been consumed.
///
/// When the image is unfiltered and its sample size is computable, exactly
/// that many bytes are taken as data; otherwise the data ends at the first
/// `EI` that stands as its own whitespace-delimited token.
fn parse_inline_image(input: &[u8], pos: &mut usize) -> LexResult<(InlineImageDict, Vec<u8>)> {
    let mut dict = Vec::new();

    loop {
        skip_whitespace_and_comments(input, pos);
        if *pos >= input.len() {
            return Err(Lex::Truncated(
                "unterminated inline image (missing ID)".to_string(),
            ));
        }

        if input[*pos] == b'I'
            && input.get(*pos + 1) == Some(&b'D')
            && input.get(*pos + 2).is_none_or(|&b| !is_regular(b))
        {
            *pos += 2;
            // Exactly one whitespace byte separates ID from the data.
            if input.get(*pos).is_some_and(|&b| is_whitespace(b)) {
                *pos += 1;
            }
            break;
        }

        if input[*pos] != b'/' {
            // Skip garbage up to the next key.
            *pos += 1;
            continue;
        }
        let key = parse_name(input, pos);
        skip_whitespace_and_comments(input, pos);
        if *pos >= input.len() {
            return Err(Lex::Truncated(
                "unterminated inline image dictionary".to_string(),
            ));
        }
        match parse_value(input, pos) {
            Ok(value) => dict.push((key, value)),
            Err(Lex::Truncated(msg)) => return Err(Lex::Truncated(msg)),
            Err(Lex::Malformed(_)) => {}
        }
    }

    let data_start = *pos;
    if let Some(data_end) = inline_raw_len(&dict).and_then(|len| data_start.checked_add(len)) {
        if data_end <= input.len() {
            let mut after = data_end;
            skip_whitespace_and_comments(input, &mut after);
            if is_ei_token(input, after) {
                *pos = after + 2;
                return Ok((dict, input[data_start..data_end].to_vec()));
            }
        }
    }

    while *pos < input.len() {
        let preceded = *pos == data_start || is_whitespace(input[*pos - 1]);
        if preceded && is_ei_token(input, *pos) {
            let mut data_end = *pos;
            if data_end > data_start && is_whitespace(input[data_end - 1]) {
                data_end -= 1;
            }
            let data = input[data_start..data_end].to_vec();
            *pos += 2;
            return Ok((dict, data));
        }
        *pos += 1;
    }

    Err(Lex::Truncated(
        "unterminated inline image (missing EI)".to_string(),
    ))
}

/// `EI` at `at`, followed by whitespace, a delimiter or end of input.
fn is_ei_token(input: &[u8], at: usize) -> bool {
    input.get(at) == Some(&b'E')
        && input.get(at + 1) == Some(&b'I')
        && input.get(at + 2).is_none_or(|&b| !is_regular(b))
}

/// Sample byte count of an unfiltered inline image, if computable.
fn inline_raw_len(dict: &[(String, Operand)]) -> Option<usize> {
    let mut handle = ImageHandle::default();
    for (key, value) in dict {
        match expand_key_name(key) {
            "Filter" => return None,
            "Width" => handle.width = u32::try_from(value.as_i64()?).ok()?,
            "Height" => handle.height = u32::try_from(value.as_i64()?).ok()?,
            "BitsPerComponent" => {
                handle.bits_per_component = u32::try_from(value.as_i64()?).ok();
            }
            "ImageMask" => handle.image_mask = matches!(value, Operand::Boolean(true)),
            "ColorSpace" => {
                let name = match value {
                    Operand::Name(n) => n.as_str(),
                    Operand::Array(items) => items.first()?.as_name()?,
                    _ => return None,
                };
                handle.color_space = Some(expand_color_space_name(name).to_string());
            }
            _ => {}
        }
    }
    handle.expected_raw_len()
}

#[cfg(test)]
mod tests {
    use super::*;

    // ---- Operand parsing tests ----

    #[test]
    fn parse_integer() {
        let ops = tokenize(b"42 m").unwrap();
        assert_eq!(ops.len(), 1);
        assert_eq!(ops[0].name, "m");
        assert_eq!(ops[0].operands, vec![Operand::Integer(42)]);
    }

    #[test]
    fn parse_real_forms() {
        let ops = tokenize(b"3.14 .5 -.002 +7. w").unwrap();
        assert_eq!(
            ops[0].operands,
            vec![
                Operand::Real(3.14),
                Operand::Real(0.5),
                Operand::Real(-0.002),
                Operand::Real(7.0)
            ]
        );
    }

    #[test]
    fn parse_name_with_hex_escape() {
        let ops = tokenize(b"/Name#20With#20Space BMC").unwrap();
        assert_eq!(
            ops[0].operands,
            vec![Operand::Name("Name With Space".to_string())]
        );
    }

    #[test]
    fn parse_literal_string_escapes() {
        let ops = tokenize(br"(a\(b\)c\\d\n\101\0537) Tj").unwrap();
        assert_eq!(
            ops[0].operands,
            vec![Operand::LiteralString(b"a(b)c\\d\nA+7".to_vec())]
        );
    }

    #[test]
    fn parse_literal_string_balanced_parens() {
        let ops = tokenize(b"(f(o)o) Tj").unwrap();
        assert_eq!(ops[0].operands, vec![Operand::LiteralString(b"f(o)o".to_vec())]);
    }

    #[test]
    fn parse_literal_string_line_continuation() {
        let ops = tokenize(b"(ab\\\r\ncd) Tj").unwrap();
        assert_eq!(ops[0].operands, vec![Operand::LiteralString(b"abcd".to_vec())]);
    }

    #[test]
    fn parse_hex_string_odd_digits_and_whitespace() {
        let ops = tokenize(b"<48 65 6C 6C 6F 7> Tj").unwrap();
        assert_eq!(
            ops[0].operands,
            vec![Operand::HexString(vec![0x48, 0x65, 0x6C, 0x6C, 0x6F, 0x70])]
        );
    }

    #[test]
    fn parse_tj_array() {
        let ops = tokenize(b"[(AB) -250 (CD)] TJ").unwrap();
        assert_eq!(
            ops[0].operands,
            vec![Operand::Array(vec![
                Operand::LiteralString(b"AB".to_vec()),
                Operand::Integer(-250),
                Operand::LiteralString(b"CD".to_vec()),
            ])]
        );
    }

    #[test]
    fn parse_inline_dictionary_for_bdc() {
        let ops = tokenize(b"/P <</MCID 3 /ActualText (x)>> BDC").unwrap();
        assert_eq!(ops[0].name, "BDC");
        assert_eq!(
            ops[0].operands[1],
            Operand::Dictionary(vec![
                ("MCID".to_string(), Operand::Integer(3)),
                ("ActualText".to_string(), Operand::LiteralString(b"x".to_vec())),
            ])
        );
    }

    #[test]
    fn keywords_and_booleans() {
        let ops = tokenize(b"true false null d0 T* ' \"").unwrap();
        assert_eq!(ops[0].name, "d0");
        assert_eq!(
            ops[0].operands,
            vec![Operand::Boolean(true), Operand::Boolean(false), Operand::Null]
        );
        let names: Vec<&str> = ops.iter().map(|o| o.name.as_str()).collect();
        assert_eq!(names, vec!["d0", "T*", "'", "\""]);
    }

    #[test]
    fn comments_are_skipped() {
        let ops = tokenize(b"% a comment\n1 0 0 1 0 0 cm % trailing\nq").unwrap();
        assert_eq!(ops.len(), 2);
        assert_eq!(ops[0].name, "cm");
        assert_eq!(ops[1].name, "q");
    }

    #[test]
    fn operator_without_whitespace_before_delimiter() {
        let ops = tokenize(b"BT/F1 12 Tf(Hi)Tj ET").unwrap();
        let names: Vec<&str> = ops.iter().map(|o| o.name.as_str()).collect();
        assert_eq!(names, vec!["BT", "Tf", "Tj", "ET"]);
    }

    // ---- Recovery ----

    #[test]
    fn malformed_number_poisons_only_its_operator() {
        let results: Vec<_> = ContentLexer::new(b"1.2.3 w 0 0 m").collect();
        assert_eq!(results.len(), 2);
        assert!(matches!(results[0], Err(ProcessorError::Parse(_))));
        let op = results[1].as_ref().unwrap();
        assert_eq!(op.name, "m");
        assert_eq!(op.operands, vec![Operand::Integer(0), Operand::Integer(0)]);
    }

    #[test]
    fn stray_closing_delimiters_are_skipped() {
        let ops = tokenize(b"] ) > q").unwrap();
        assert_eq!(ops.len(), 1);
        assert_eq!(ops[0].name, "q");
    }

    #[test]
    fn invalid_hex_digits_are_ignored() {
        let ops = tokenize(b"<4G1> Tj").unwrap();
        assert_eq!(ops[0].operands, vec![Operand::HexString(vec![0x41])]);
    }

    #[test]
    fn truncated_string_yields_prior_operators_then_stops() {
        let results: Vec<_> = ContentLexer::new(b"q 1 0 0 1 5 5 cm (unterminated").collect();
        assert_eq!(results.len(), 3);
        assert_eq!(results[0].as_ref().unwrap().name, "q");
        assert_eq!(results[1].as_ref().unwrap().name, "cm");
        assert!(matches!(results[2], Err(ProcessorError::Truncated(_))));
    }

    #[test]
    fn truncated_array_is_reported_once() {
        let mut lexer = ContentLexer::new(b"[(A) 1 2");
        assert!(matches!(lexer.next(), Some(Err(ProcessorError::Truncated(_)))));
        assert!(lexer.next().is_none());
    }

    #[test]
    fn trailing_operands_without_operator_are_dropped() {
        let ops = tokenize(b"q 1 2 3").unwrap();
        assert_eq!(ops.len(), 1);
    }

    // ---- Inline images ----

    #[test]
    fn inline_image_basic() {
        let ops = tokenize(b"BI /W 2 /H 1 /CS /G /BPC 8 ID \x01\x02 EI Q").unwrap();
        assert_eq!(ops.len(), 2);
        assert_eq!(ops[0].name, "BI");
        let dict = ops[0].operands[0].as_dict().unwrap();
        assert_eq!(dict_get(dict, "W"), Some(&Operand::Integer(2)));
        assert_eq!(ops[0].operands[1], Operand::LiteralString(vec![1, 2]));
        assert_eq!(ops[1].name, "Q");
    }

    #[test]
    fn inline_image_data_containing_ei_bytes() {
        // Raw data holds "EI" bytes; the computed length keeps them.
        let ops =
            tokenize(b"BI /W 4 /H 1 /CS /G /BPC 8 ID  EI\x00 EI Q").unwrap();
        assert_eq!(ops[0].operands[1], Operand::LiteralString(b" EI\x00".to_vec()));
        assert_eq!(ops[1].name, "Q");
    }

    #[test]
    fn inline_image_filtered_scans_for_delimited_ei() {
        // "xEIy" is not a token; the real terminator follows whitespace.
        let ops = tokenize(b"BI /W 9 /H 9 /F /AHx ID xEIy>\nEI Q").unwrap();
        assert_eq!(ops[0].operands[1], Operand::LiteralString(b"xEIy>".to_vec()));
        assert_eq!(ops[1].name, "Q");
    }

    #[test]
    fn inline_image_with_huge_dimensions_scans_for_ei() {
        let ops =
            tokenize(b"BI /W 4294967295 /H 4294967295 /BPC 8 /CS /RGB ID \x00 EI Q").unwrap();
        assert_eq!(ops.len(), 2);
        assert_eq!(ops[0].name, "BI");
        assert_eq!(ops[0].operands[1], Operand::LiteralString(vec![0]));
        assert_eq!(ops[1].name, "Q");
    }

    #[test]
    fn inline_image_longer_than_input_scans_for_ei() {
        let ops = tokenize(b"BI /W 100 /H 100 /BPC 8 /CS /G ID \x01\x02 EI Q").unwrap();
        assert_eq!(ops[0].operands[1], Operand::LiteralString(vec![1, 2]));
        assert_eq!(ops[1].name, "Q");
    }

    #[test]
    fn inline_image_missing_ei_is_truncation() {
        let results: Vec<_> = ContentLexer::new(b"q BI /W 1 /H 1 /F /DCT ID abc").collect();
        assert_eq!(results.len(), 2);
        assert!(matches!(results[1], Err(ProcessorError::Truncated(_))));
    }
}

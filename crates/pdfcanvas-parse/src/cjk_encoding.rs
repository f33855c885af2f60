//! Predefined CJK CMaps that are not embedded in the file.
//!
//! Fonts using predefined CMaps such as `GBK-EUC-H`, `90ms-RKSJ-H` or
//! `UniJIS-UTF16-H` carry no codespace ranges in the PDF. The code length
//! is instead derived from the underlying legacy encoding's lead bytes, and
//! Unicode text comes from `encoding_rs`.

use encoding_rs::Encoding;

use crate::cmap::bytes_to_code;
use crate::font::CharCode;

/// Byte layout of a predefined CMap.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CjkScheme {
    /// Legacy multi-byte encoding (GBK, Big5, Shift_JIS, EUC).
    MultiByte(&'static Encoding),
    /// `Uni*-UCS2-*` and `Uni*-UTF16-*`: UTF-16BE code units.
    Utf16,
}

/// Scheme for a predefined CMap name, `None` for Identity and unknown names.
pub fn scheme_for_cmap(cmap_name: &str) -> Option<CjkScheme> {
    let base = cmap_name
        .strip_suffix("-H")
        .or_else(|| cmap_name.strip_suffix("-V"))
        .unwrap_or(cmap_name);

    if base.starts_with("Uni") && (base.contains("UCS2") || base.contains("UTF16")) {
        return Some(CjkScheme::Utf16);
    }

    let encoding = match base {
        "GBK-EUC" | "GB-EUC" | "GBpc-EUC" | "GBK2K" | "GBKp-EUC" => encoding_rs::GBK,
        "B5pc" | "ETen-B5" | "HKscs-B5" | "ETenms-B5" | "CNS-EUC" => encoding_rs::BIG5,
        "90ms-RKSJ" | "90pv-RKSJ" | "83pv-RKSJ" | "78-RKSJ" | "Add-RKSJ" | "Ext-RKSJ"
        | "90msp-RKSJ" => encoding_rs::SHIFT_JIS,
        "EUC" | "78-EUC" => encoding_rs::EUC_JP,
        "KSC-EUC" | "KSCms-UHC" | "KSCpc-EUC" | "KSCms-UHC-HW" => encoding_rs::EUC_KR,
        _ => return None,
    };
    Some(CjkScheme::MultiByte(encoding))
}

impl CjkScheme {
    /// Split a string operand into character codes.
    pub fn split_codes(&self, bytes: &[u8]) -> Vec<CharCode> {
        let mut codes = Vec::new();
        let mut pos = 0;
        while pos < bytes.len() {
            let wanted = self.code_len(&bytes[pos..]);
            let len = wanted.min(bytes.len() - pos);
            codes.push(CharCode {
                code: bytes_to_code(&bytes[pos..pos + len]),
                start: pos,
                len,
            });
            pos += len;
        }
        codes
    }

    /// Unicode text of one code's bytes.
    pub fn decode(&self, bytes: &[u8]) -> Option<String> {
        let encoding = match self {
            CjkScheme::MultiByte(encoding) => *encoding,
            CjkScheme::Utf16 => encoding_rs::UTF_16BE,
        };
        let (text, had_errors) = encoding.decode_without_bom_handling(bytes);
        (!had_errors && !text.is_empty()).then(|| text.into_owned())
    }

    fn code_len(&self, rest: &[u8]) -> usize {
        let lead = rest[0];
        match self {
            CjkScheme::Utf16 => {
                let high_surrogate = (0xD8..=0xDB).contains(&lead);
                if high_surrogate { 4 } else { 2 }
            }
            CjkScheme::MultiByte(encoding) => lead_byte_len(lead, encoding),
        }
    }
}

/// Code length implied by a lead byte.
fn lead_byte_len(byte: u8, encoding: &'static Encoding) -> usize {
    if encoding == encoding_rs::SHIFT_JIS {
        if (0x81..=0x9F).contains(&byte) || (0xE0..=0xFC).contains(&byte) {
            2
        } else {
            1
        }
    } else if encoding == encoding_rs::EUC_JP {
        match byte {
            0x8F => 3,
            0x8E | 0xA1..=0xFE => 2,
            _ => 1,
        }
    } else if (0x81..=0xFE).contains(&byte) {
        // GBK, Big5, EUC-KR
        2
    } else {
        1
    }
}

//! Composite (Type0) font support: descendant CIDFont metrics and the
//! encoding CMap that cuts strings into codes.

use std::collections::HashMap;

use lopdf::{Dictionary, Document, Object};

use crate::font_metrics::{dict_entry, object_to_f64, parse_font_descriptor, resolve_object};

/// `/DW` when the CIDFont omits it.
pub const DEFAULT_CID_WIDTH: f64 = 1000.0;
const DEFAULT_CID_ASCENT: f64 = 880.0;
const DEFAULT_CID_DESCENT: f64 = -120.0;

/// Widths and vertical metrics of a descendant CIDFont, keyed by CID.
#[derive(Debug, Clone, PartialEq)]
pub struct CidFontMetrics {
    widths: HashMap<u32, f64>,
    default_width: f64,
    ascent: f64,
    descent: f64,
}

impl CidFontMetrics {
    pub fn new(widths: HashMap<u32, f64>, default_width: f64, ascent: f64, descent: f64) -> Self {
        Self {
            widths,
            default_width,
            ascent,
            descent,
        }
    }

    pub fn default_metrics() -> Self {
        Self::new(
            HashMap::new(),
            DEFAULT_CID_WIDTH,
            DEFAULT_CID_ASCENT,
            DEFAULT_CID_DESCENT,
        )
    }

    /// `/W` entry for `cid`, else `/DW`.
    pub fn width(&self, cid: u32) -> f64 {
        self.widths.get(&cid).copied().unwrap_or(self.default_width)
    }

    pub fn default_width(&self) -> f64 {
        self.default_width
    }

    /// Mean of the explicit `/W` widths, `/DW` when there are none.
    pub fn average_width(&self) -> f64 {
        if self.widths.is_empty() {
            return self.default_width;
        }
        self.widths.values().sum::<f64>() / self.widths.len() as f64
    }

    pub fn ascent(&self) -> f64 {
        self.ascent
    }

    pub fn descent(&self) -> f64 {
        self.descent
    }
}

/// Parse a CIDFont `/W` array.
///
/// Two forms may be mixed: `c [w1 w2 ...]` gives consecutive CIDs starting
/// at `c`, and `c_first c_last w` gives one width to a whole range.
pub fn parse_w_array(objects: &[Object], doc: &Document) -> HashMap<u32, f64> {
    let mut widths = HashMap::new();
    let mut i = 0;
    while i < objects.len() {
        let Some(first) = object_to_u32(resolve_object(doc, &objects[i])) else {
            i += 1;
            continue;
        };
        let Some(next) = objects.get(i + 1).map(|o| resolve_object(doc, o)) else {
            break;
        };
        if let Ok(list) = next.as_array() {
            for (offset, w) in list.iter().enumerate() {
                let Some(cid) = u32::try_from(offset)
                    .ok()
                    .and_then(|offset| first.checked_add(offset))
                else {
                    break;
                };
                if let Some(w) = object_to_f64(resolve_object(doc, w)) {
                    widths.insert(cid, w);
                }
            }
            i += 2;
        } else if let Some(last) = object_to_u32(next) {
            if let Some(w) = objects
                .get(i + 2)
                .and_then(|o| object_to_f64(resolve_object(doc, o)))
            {
                for cid in first..=last.min(first.saturating_add(0xFFFF)) {
                    widths.insert(cid, w);
                }
            }
            i += 3;
        } else {
            i += 2;
        }
    }
    widths
}

fn object_to_u32(obj: &Object) -> Option<u32> {
    object_to_f64(obj).filter(|v| *v >= 0.0).map(|v| v as u32)
}

/// Metrics of a descendant CIDFont dictionary.
pub fn extract_cid_font_metrics(doc: &Document, cid_font: &Dictionary) -> CidFontMetrics {
    let default_width = dict_entry(doc, cid_font, b"DW")
        .and_then(object_to_f64)
        .unwrap_or(DEFAULT_CID_WIDTH);
    let widths = dict_entry(doc, cid_font, b"W")
        .and_then(|o| o.as_array().ok())
        .map(|arr| parse_w_array(arr, doc))
        .unwrap_or_default();
    let desc = parse_font_descriptor(doc, cid_font, DEFAULT_CID_ASCENT, DEFAULT_CID_DESCENT);
    CidFontMetrics::new(widths, default_width, desc.ascent, desc.descent)
}

pub fn is_type0_font(font_dict: &Dictionary) -> bool {
    font_dict
        .get(b"Subtype")
        .and_then(Object::as_name)
        .is_ok_and(|s| s == b"Type0")
}

/// First entry of `/DescendantFonts`.
pub fn get_descendant_font<'a>(doc: &'a Document, type0: &'a Dictionary) -> Option<&'a Dictionary> {
    let fonts = dict_entry(doc, type0, b"DescendantFonts")?.as_array().ok()?;
    resolve_object(doc, fonts.first()?).as_dict().ok()
}

/// Writing mode implied by a predefined CMap name (`-V` suffix = vertical).
pub fn predefined_writing_mode(cmap_name: &str) -> u8 {
    u8::from(cmap_name.ends_with("-V"))
}

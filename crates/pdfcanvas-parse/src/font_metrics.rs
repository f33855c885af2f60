//! Glyph metrics of simple fonts read from lopdf font dictionaries.
//!
//! Widths come from `/FirstChar` + `/Widths`; ascent, descent,
//! `/MissingWidth` and `/FontBBox` from the font descriptor. Type3 widths
//! are expressed in glyph space and are scaled to 1/1000 em through
//! `/FontMatrix`.

use lopdf::{Dictionary, Document, Object};

use crate::font::{DEFAULT_ASCENT, DEFAULT_DESCENT, DEFAULT_WIDTH};

/// Widths and vertical metrics of a simple font, in 1/1000 em.
#[derive(Debug, Clone, PartialEq)]
pub struct FontMetrics {
    widths: Vec<f64>,
    first_char: u32,
    missing_width: Option<f64>,
    ascent: f64,
    descent: f64,
    font_bbox: Option<[f64; 4]>,
}

impl FontMetrics {
    pub fn new(
        widths: Vec<f64>,
        first_char: u32,
        missing_width: Option<f64>,
        ascent: f64,
        descent: f64,
        font_bbox: Option<[f64; 4]>,
    ) -> Self {
        Self {
            widths,
            first_char,
            missing_width,
            ascent,
            descent,
            font_bbox,
        }
    }

    /// Metrics for a font with no usable dictionary entries.
    pub fn default_metrics() -> Self {
        Self::new(
            Vec::new(),
            0,
            None,
            DEFAULT_ASCENT,
            DEFAULT_DESCENT,
            None,
        )
    }

    /// Width for `code`: the `/Widths` entry when in range, otherwise
    /// `/MissingWidth` when the descriptor sets one.
    pub fn glyph_width(&self, code: u32) -> Option<f64> {
        code.checked_sub(self.first_char)
            .and_then(|i| self.widths.get(i as usize))
            .copied()
            .or(self.missing_width)
    }

    /// Mean of the non-zero `/Widths` entries.
    pub fn average_width(&self) -> f64 {
        let (sum, count) = self
            .widths
            .iter()
            .filter(|w| **w > 0.0)
            .fold((0.0, 0usize), |(s, n), w| (s + w, n + 1));
        if count > 0 {
            sum / count as f64
        } else {
            self.missing_width.filter(|w| *w > 0.0).unwrap_or(DEFAULT_WIDTH)
        }
    }

    pub fn ascent(&self) -> f64 {
        self.ascent
    }

    pub fn descent(&self) -> f64 {
        self.descent
    }

    pub fn font_bbox(&self) -> Option<[f64; 4]> {
        self.font_bbox
    }

    pub fn first_char(&self) -> u32 {
        self.first_char
    }
}

/// Entries read from a `/FontDescriptor`.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct DescriptorInfo {
    pub ascent: f64,
    pub descent: f64,
    pub missing_width: Option<f64>,
    pub font_bbox: Option<[f64; 4]>,
}

/// Read the font descriptor of `font_dict`.
///
/// A zero or absent `/Ascent`/`/Descent` falls back to the bounding box,
/// then to `default_ascent`/`default_descent`.
pub(crate) fn parse_font_descriptor(
    doc: &Document,
    font_dict: &Dictionary,
    default_ascent: f64,
    default_descent: f64,
) -> DescriptorInfo {
    let Some(desc) = dict_entry(doc, font_dict, b"FontDescriptor").and_then(|o| o.as_dict().ok())
    else {
        return DescriptorInfo {
            ascent: default_ascent,
            descent: default_descent,
            missing_width: None,
            font_bbox: None,
        };
    };

    let number = |key: &[u8]| dict_entry(doc, desc, key).and_then(object_to_f64);
    let font_bbox = dict_entry(doc, desc, b"FontBBox").and_then(|o| bbox_from_object(doc, o));

    let ascent = number(b"Ascent")
        .filter(|v| *v != 0.0)
        .or_else(|| font_bbox.map(|b| b[3]).filter(|v| *v != 0.0))
        .unwrap_or(default_ascent);
    let descent = number(b"Descent")
        .filter(|v| *v != 0.0)
        .or_else(|| font_bbox.map(|b| b[1]).filter(|v| *v != 0.0))
        .unwrap_or(default_descent);

    DescriptorInfo {
        ascent,
        descent,
        missing_width: number(b"MissingWidth"),
        font_bbox,
    }
}

/// Extract metrics from a simple font dictionary (Type1, TrueType, Type3).
pub fn extract_font_metrics(doc: &Document, font_dict: &Dictionary) -> FontMetrics {
    let first_char = dict_entry(doc, font_dict, b"FirstChar")
        .and_then(object_to_f64)
        .map_or(0, |v| v.max(0.0) as u32);

    let mut widths: Vec<f64> = dict_entry(doc, font_dict, b"Widths")
        .and_then(|o| o.as_array().ok())
        .map(|arr| {
            arr.iter()
                .map(|o| object_to_f64(resolve_object(doc, o)).unwrap_or(0.0))
                .collect()
        })
        .unwrap_or_default();

    let desc = parse_font_descriptor(doc, font_dict, DEFAULT_ASCENT, DEFAULT_DESCENT);
    let (mut ascent, mut descent) = (desc.ascent, desc.descent);
    let mut missing_width = desc.missing_width;
    let mut font_bbox = desc.font_bbox;

    if let Some(scale) = type3_scale(doc, font_dict) {
        for w in &mut widths {
            *w *= scale.0;
        }
        missing_width = missing_width.map(|w| w * scale.0);
        if let Some(bbox) = dict_entry(doc, font_dict, b"FontBBox")
            .and_then(|o| bbox_from_object(doc, o))
        {
            let scaled = [
                bbox[0] * scale.0,
                bbox[1] * scale.1,
                bbox[2] * scale.0,
                bbox[3] * scale.1,
            ];
            font_bbox = Some(scaled);
            if desc_is_default(&desc) {
                ascent = scaled[3];
                descent = scaled[1];
            }
        }
    }

    FontMetrics::new(widths, first_char, missing_width, ascent, descent, font_bbox)
}

fn desc_is_default(desc: &DescriptorInfo) -> bool {
    desc.font_bbox.is_none() && desc.ascent == DEFAULT_ASCENT && desc.descent == DEFAULT_DESCENT
}

/// Horizontal and vertical glyph-space → 1/1000 em factors of a Type3 font.
fn type3_scale(doc: &Document, font_dict: &Dictionary) -> Option<(f64, f64)> {
    let subtype = dict_entry(doc, font_dict, b"Subtype")?.as_name().ok()?;
    if subtype != b"Type3" {
        return None;
    }
    let matrix: Vec<f64> = dict_entry(doc, font_dict, b"FontMatrix")
        .and_then(|o| o.as_array().ok())
        .map(|arr| arr.iter().filter_map(object_to_f64).collect())
        .unwrap_or_default();
    match matrix.as_slice() {
        [a, _, _, d, _, _] => Some((a * 1000.0, d * 1000.0)),
        _ => Some((1.0, 1.0)),
    }
}

fn bbox_from_object(doc: &Document, obj: &Object) -> Option<[f64; 4]> {
    let values: Vec<f64> = obj
        .as_array()
        .ok()?
        .iter()
        .filter_map(|o| object_to_f64(resolve_object(doc, o)))
        .collect();
    match values.as_slice() {
        [a, b, c, d] => Some([*a, *b, *c, *d]),
        _ => None,
    }
}

/// Follow an indirect reference, returning the object itself otherwise.
pub(crate) fn resolve_object<'a>(doc: &'a Document, obj: &'a Object) -> &'a Object {
    match obj {
        Object::Reference(id) => doc.get_object(*id).unwrap_or(obj),
        _ => obj,
    }
}

/// Resolved value of `key` in `dict`.
pub(crate) fn dict_entry<'a>(doc: &'a Document, dict: &'a Dictionary, key: &[u8]) -> Option<&'a Object> {
    dict.get(key).ok().map(|o| resolve_object(doc, o))
}

pub(crate) fn object_to_f64(obj: &Object) -> Option<f64> {
    match obj {
        Object::Integer(i) => Some(*i as f64),
        Object::Real(f) => Some(f64::from(*f)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lopdf::dictionary;

    fn font_with_widths(doc: &mut Document, widths: &[i64], first_char: i64) -> Dictionary {
        let widths_id = doc.add_object(Object::Array(
            widths.iter().map(|w| Object::Integer(*w)).collect(),
        ));
        dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Helvetica",
            "FirstChar" => Object::Integer(first_char),
            "LastChar" => Object::Integer(first_char + widths.len() as i64 - 1),
            "Widths" => widths_id,
        }
    }

    #[test]
    fn widths_in_and_out_of_range() {
        let metrics = FontMetrics::new(vec![250.0, 500.0], 32, None, 700.0, -200.0, None);
        assert_eq!(metrics.glyph_width(32), Some(250.0));
        assert_eq!(metrics.glyph_width(33), Some(500.0));
        assert_eq!(metrics.glyph_width(34), None);
        assert_eq!(metrics.glyph_width(10), None);
        assert_eq!(metrics.average_width(), 375.0);
    }

    #[test]
    fn missing_width_covers_out_of_range_codes() {
        let metrics = FontMetrics::new(vec![250.0], 65, Some(333.0), 700.0, -200.0, None);
        assert_eq!(metrics.glyph_width(90), Some(333.0));
    }

    #[test]
    fn average_of_empty_widths() {
        assert_eq!(FontMetrics::default_metrics().average_width(), DEFAULT_WIDTH);
        let metrics = FontMetrics::new(Vec::new(), 0, Some(400.0), 700.0, -200.0, None);
        assert_eq!(metrics.average_width(), 400.0);
    }

    #[test]
    fn extract_widths_and_descriptor() {
        let mut doc = Document::with_version("1.5");
        let mut font = font_with_widths(&mut doc, &[278, 556, 722], 65);
        let desc_id = doc.add_object(dictionary! {
            "Type" => "FontDescriptor",
            "Ascent" => Object::Integer(718),
            "Descent" => Object::Integer(-207),
            "MissingWidth" => Object::Integer(278),
            "FontBBox" => vec![
                Object::Integer(-166),
                Object::Integer(-225),
                Object::Integer(1000),
                Object::Integer(931),
            ],
        });
        font.set("FontDescriptor", desc_id);

        let metrics = extract_font_metrics(&doc, &font);
        assert_eq!(metrics.glyph_width(66), Some(556.0));
        assert_eq!(metrics.glyph_width(68), Some(278.0));
        assert_eq!(metrics.ascent(), 718.0);
        assert_eq!(metrics.descent(), -207.0);
        assert_eq!(metrics.font_bbox(), Some([-166.0, -225.0, 1000.0, 931.0]));
    }

    #[test]
    fn zero_ascent_falls_back_to_bbox() {
        let mut doc = Document::with_version("1.5");
        let mut font = font_with_widths(&mut doc, &[500], 32);
        font.set(
            "FontDescriptor",
            dictionary! {
                "Ascent" => Object::Integer(0),
                "Descent" => Object::Integer(0),
                "FontBBox" => vec![
                    Object::Integer(0),
                    Object::Integer(-300),
                    Object::Integer(1000),
                    Object::Integer(900),
                ],
            },
        );
        let metrics = extract_font_metrics(&doc, &font);
        assert_eq!(metrics.ascent(), 900.0);
        assert_eq!(metrics.descent(), -300.0);
    }

    #[test]
    fn no_descriptor_uses_defaults() {
        let mut doc = Document::with_version("1.5");
        let font = font_with_widths(&mut doc, &[500], 32);
        let metrics = extract_font_metrics(&doc, &font);
        assert_eq!(metrics.ascent(), DEFAULT_ASCENT);
        assert_eq!(metrics.descent(), DEFAULT_DESCENT);
        assert_eq!(metrics.glyph_width(32), Some(500.0));
    }

    #[test]
    fn type3_widths_scaled_by_font_matrix() {
        let doc = Document::with_version("1.5");
        let font = dictionary! {
            "Type" => "Font",
            "Subtype" => "Type3",
            "FirstChar" => Object::Integer(0),
            "Widths" => vec![Object::Integer(50)],
            "FontMatrix" => vec![
                Object::Real(0.01),
                Object::Integer(0),
                Object::Integer(0),
                Object::Real(0.01),
                Object::Integer(0),
                Object::Integer(0),
            ],
            "FontBBox" => vec![
                Object::Integer(0),
                Object::Integer(-20),
                Object::Integer(100),
                Object::Integer(80),
            ],
        };
        let metrics = extract_font_metrics(&doc, &font);
        let width = metrics.glyph_width(0).unwrap_or_default();
        assert!((width - 500.0).abs() < 1e-3);
        assert!((metrics.ascent() - 800.0).abs() < 1e-3);
        assert!((metrics.descent() + 200.0).abs() < 1e-3);
    }
}

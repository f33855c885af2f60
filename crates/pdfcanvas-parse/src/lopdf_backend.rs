//! lopdf-backed resource lookup and page driver.
//!
//! [`LopdfResources`] answers the processor's resource queries from a
//! `/Resources` dictionary of a [`lopdf::Document`]. [`process_page`] reads
//! a page's boxes, rotation, inherited resources and contents and runs them
//! through a [`CanvasProcessor`].

use std::sync::Arc;

use lopdf::{Dictionary, Document, Object, ObjectId};
use pdfcanvas_core::image::{expand_color_space_name, expand_filter_name};
use pdfcanvas_core::{BBox, DashPattern, ImageHandle, LineCap, LineJoin, Matrix, ProcessorOptions};

use crate::color_space::{ColorSpace, color_space_from_object};
use crate::error::ProcessorError;
use crate::font::PdfFont;
use crate::font_metrics::{dict_entry, object_to_f64, resolve_object};
use crate::graphics_state::GraphicsState;
use crate::listener::EventListener;
use crate::loaded_font::LoadedFont;
use crate::page_geometry::PageGeometry;
use crate::processor::CanvasProcessor;
use crate::resources::{ExtGState, FormXObject, ResourceProvider, XObject};
use crate::tokenizer::Operand;

/// Property lists nested deeper than this are cut off with `Null`.
const MAX_PROPERTY_DEPTH: usize = 16;

/// Decode a stream, decompressing if a `/Filter` is present.
pub(crate) fn decode_stream(stream: &lopdf::Stream) -> Result<Vec<u8>, ProcessorError> {
    if stream.dict.get(b"Filter").is_ok() {
        stream
            .decompressed_content()
            .map_err(|e| ProcessorError::Resource(format!("failed to decompress stream: {e}")))
    } else {
        Ok(stream.content.clone())
    }
}

/// Resources of one content stream, backed by a lopdf dictionary.
#[derive(Clone, Copy)]
pub struct LopdfResources<'d> {
    doc: &'d Document,
    dict: &'d Dictionary,
}

impl<'d> LopdfResources<'d> {
    pub fn new(doc: &'d Document, dict: &'d Dictionary) -> Self {
        Self { doc, dict }
    }

    /// The resources of a page, inherited through `/Parent` when the page
    /// has none of its own. A page without any resources gets an empty
    /// dictionary.
    pub fn for_page(doc: &'d Document, page_id: ObjectId) -> Result<Self, ProcessorError> {
        static EMPTY: std::sync::LazyLock<Dictionary> = std::sync::LazyLock::new(Dictionary::new);

        let dict = match resolve_inherited(doc, page_id, b"Resources")? {
            Some(obj) => resolve_object(doc, obj)
                .as_dict()
                .map_err(|_| ProcessorError::Resource("/Resources is not a dictionary".into()))?,
            None => &*EMPTY,
        };
        Ok(Self { doc, dict })
    }

    /// `/<category>/<name>`, resolved.
    fn entry(&self, category: &[u8], name: &str) -> Option<&'d Object> {
        let doc = self.doc;
        let sub = dict_entry(doc, self.dict, category)?.as_dict().ok()?;
        dict_entry(doc, sub, name.as_bytes())
    }

    fn form_xobject(
        &self,
        key: String,
        stream: &'d lopdf::Stream,
    ) -> Option<XObject<'d>> {
        let doc = self.doc;
        let content = decode_stream(stream).ok()?;
        let matrix = dict_entry(doc, &stream.dict, b"Matrix")
            .and_then(read_matrix)
            .unwrap_or_else(Matrix::identity);
        let bbox = dict_entry(doc, &stream.dict, b"BBox").and_then(|o| read_box(doc, o));
        let resources = dict_entry(doc, &stream.dict, b"Resources")
            .and_then(|o| o.as_dict().ok())
            .map(|dict| Box::new(LopdfResources { doc, dict }) as Box<dyn ResourceProvider + 'd>);
        Some(XObject::Form(FormXObject {
            key,
            content,
            matrix,
            bbox,
            resources,
        }))
    }
}

impl std::fmt::Debug for LopdfResources<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let keys: Vec<String> = self
            .dict
            .iter()
            .map(|(k, _)| String::from_utf8_lossy(k).into_owned())
            .collect();
        f.debug_struct("LopdfResources")
            .field("categories", &keys)
            .finish_non_exhaustive()
    }
}

impl ResourceProvider for LopdfResources<'_> {
    fn font(&self, name: &str) -> Option<Arc<dyn PdfFont>> {
        let dict = self.entry(b"Font", name)?.as_dict().ok()?;
        Some(Arc::new(LoadedFont::load(self.doc, dict, name)))
    }

    fn xobject(&self, name: &str) -> Option<XObject<'_>> {
        let sub = dict_entry(self.doc, self.dict, b"XObject")?.as_dict().ok()?;
        let raw = sub.get(name.as_bytes()).ok()?;
        let key = match raw {
            Object::Reference(id) => format!("{} {} R", id.0, id.1),
            _ => format!("direct:{name}:{:p}", raw),
        };
        let stream = resolve_object(self.doc, raw).as_stream().ok()?;
        match stream.dict.get(b"Subtype").and_then(Object::as_name).ok()? {
            b"Form" => self.form_xobject(key, stream),
            b"Image" => Some(XObject::Image(image_handle(
                self.doc,
                stream,
                Some(name.to_string()),
            ))),
            _ => None,
        }
    }

    fn color_space(&self, name: &str) -> Option<ColorSpace> {
        let obj = self.entry(b"ColorSpace", name)?;
        color_space_from_object(obj, self.doc)
    }

    fn ext_gstate(&self, name: &str) -> Option<ExtGState> {
        let dict = self.entry(b"ExtGState", name)?.as_dict().ok()?;
        Some(read_ext_gstate(self.doc, dict))
    }

    fn properties(&self, name: &str) -> Option<Vec<(String, Operand)>> {
        let dict = self.entry(b"Properties", name)?.as_dict().ok()?;
        Some(dict_to_operands(self.doc, dict, 0))
    }
}

fn read_ext_gstate(doc: &Document, dict: &Dictionary) -> ExtGState {
    let number = |key: &[u8]| dict_entry(doc, dict, key).and_then(object_to_f64);
    let integer = |key: &[u8]| dict_entry(doc, dict, key).and_then(|o| o.as_i64().ok());

    let dash_pattern = dict_entry(doc, dict, b"D")
        .and_then(|o| o.as_array().ok())
        .and_then(|parts| {
            let array = resolve_object(doc, parts.first()?).as_array().ok()?;
            let dashes = array
                .iter()
                .filter_map(|o| object_to_f64(resolve_object(doc, o)))
                .collect();
            let phase = parts
                .get(1)
                .and_then(|o| object_to_f64(resolve_object(doc, o)))
                .unwrap_or(0.0);
            Some(DashPattern::new(dashes, phase))
        });

    let font = dict_entry(doc, dict, b"Font")
        .and_then(|o| o.as_array().ok())
        .and_then(|parts| {
            let font_dict = resolve_object(doc, parts.first()?).as_dict().ok()?;
            let size = object_to_f64(resolve_object(doc, parts.get(1)?))?;
            let font: Arc<dyn PdfFont> = Arc::new(LoadedFont::load(doc, font_dict, "ExtGStateFont"));
            Some((font, size))
        });

    ExtGState {
        line_width: number(b"LW"),
        line_cap: integer(b"LC").and_then(LineCap::from_i64),
        line_join: integer(b"LJ").and_then(LineJoin::from_i64),
        miter_limit: number(b"ML"),
        dash_pattern,
        rendering_intent: dict_entry(doc, dict, b"RI")
            .and_then(|o| o.as_name().ok())
            .map(|n| String::from_utf8_lossy(n).into_owned()),
        flatness: number(b"FL"),
        stroke_alpha: number(b"CA"),
        fill_alpha: number(b"ca"),
        font,
    }
}

/// Describe an image XObject without decoding its samples.
fn image_handle(doc: &Document, stream: &lopdf::Stream, name: Option<String>) -> ImageHandle {
    let dict = &stream.dict;
    let dimension = |key: &[u8]| {
        dict_entry(doc, dict, key)
            .and_then(|o| o.as_i64().ok())
            .and_then(|v| u32::try_from(v).ok())
    };

    let color_space = dict_entry(doc, dict, b"ColorSpace").and_then(|o| match o {
        Object::Name(n) => Some(expand_color_space_name(&String::from_utf8_lossy(n)).to_string()),
        Object::Array(arr) => arr
            .first()
            .and_then(|f| resolve_object(doc, f).as_name().ok())
            .map(|n| expand_color_space_name(&String::from_utf8_lossy(n)).to_string()),
        _ => None,
    });

    let filters = match dict_entry(doc, dict, b"Filter") {
        Some(Object::Name(n)) => vec![expand_filter_name(&String::from_utf8_lossy(n)).to_string()],
        Some(Object::Array(arr)) => arr
            .iter()
            .filter_map(|f| resolve_object(doc, f).as_name().ok())
            .map(|n| expand_filter_name(&String::from_utf8_lossy(n)).to_string())
            .collect(),
        _ => Vec::new(),
    };

    let soft_mask = dict_entry(doc, dict, b"SMask")
        .and_then(|o| o.as_stream().ok())
        .map(|mask| Box::new(image_handle(doc, mask, None)));

    ImageHandle {
        name,
        width: dimension(b"Width").unwrap_or(0),
        height: dimension(b"Height").unwrap_or(0),
        bits_per_component: dimension(b"BitsPerComponent"),
        color_space,
        filters,
        image_mask: dict_entry(doc, dict, b"ImageMask")
            .and_then(|o| o.as_bool().ok())
            .unwrap_or(false),
        data: stream.content.clone(),
        soft_mask,
        is_inline: false,
    }
}

fn dict_to_operands(doc: &Document, dict: &Dictionary, depth: usize) -> Vec<(String, Operand)> {
    dict.iter()
        .map(|(k, v)| {
            (
                String::from_utf8_lossy(k).into_owned(),
                object_to_operand(doc, v, depth + 1),
            )
        })
        .collect()
}

fn object_to_operand(doc: &Document, obj: &Object, depth: usize) -> Operand {
    if depth > MAX_PROPERTY_DEPTH {
        return Operand::Null;
    }
    match obj {
        Object::Null => Operand::Null,
        Object::Boolean(b) => Operand::Boolean(*b),
        Object::Integer(i) => Operand::Integer(*i),
        Object::Real(r) => Operand::Real(f64::from(*r)),
        Object::Name(n) => Operand::Name(String::from_utf8_lossy(n).into_owned()),
        Object::String(bytes, _) => Operand::LiteralString(bytes.clone()),
        Object::Array(arr) => Operand::Array(
            arr.iter()
                .map(|o| object_to_operand(doc, o, depth + 1))
                .collect(),
        ),
        Object::Dictionary(d) => Operand::Dictionary(dict_to_operands(doc, d, depth)),
        Object::Reference(id) => match doc.get_object(*id) {
            Ok(target) => object_to_operand(doc, target, depth + 1),
            Err(_) => Operand::Null,
        },
        _ => Operand::Null,
    }
}

fn read_matrix(obj: &Object) -> Option<Matrix> {
    let arr = obj.as_array().ok()?;
    if arr.len() != 6 {
        return None;
    }
    let mut values = [0.0; 6];
    for (slot, item) in values.iter_mut().zip(arr) {
        *slot = object_to_f64(item)?;
    }
    Some(Matrix::from_array(values))
}

/// A `[x0 y0 x1 y1]` rectangle; corners may come in any order.
fn read_box(doc: &Document, obj: &Object) -> Option<BBox> {
    let arr = resolve_object(doc, obj).as_array().ok()?;
    if arr.len() != 4 {
        return None;
    }
    let n = |i: usize| object_to_f64(resolve_object(doc, &arr[i]));
    Some(BBox::new(n(0)?, n(1)?, n(2)?, n(3)?))
}

/// Look up a key in the page dictionary, walking up the page tree
/// (via /Parent) if the key is not found on the page itself.
fn resolve_inherited<'a>(
    doc: &'a Document,
    page_id: ObjectId,
    key: &[u8],
) -> Result<Option<&'a Object>, ProcessorError> {
    let mut current_id = page_id;
    // Guards against /Parent cycles.
    for _ in 0..64 {
        let dict = doc
            .get_object(current_id)
            .and_then(Object::as_dict)
            .map_err(|e| ProcessorError::Resource(format!("failed to get page dictionary: {e}")))?;

        if let Ok(value) = dict.get(key) {
            return Ok(Some(value));
        }

        match dict.get(b"Parent") {
            Ok(parent) => {
                current_id = parent.as_reference().map_err(|e| {
                    ProcessorError::Resource(format!("invalid /Parent reference: {e}"))
                })?;
            }
            Err(_) => return Ok(None),
        }
    }
    Ok(None)
}

/// MediaBox, CropBox and `/Rotate` of a page, all inheritable.
pub fn page_geometry(doc: &Document, page_id: ObjectId) -> Result<PageGeometry, ProcessorError> {
    let media_box = resolve_inherited(doc, page_id, b"MediaBox")?
        .and_then(|o| read_box(doc, o))
        .ok_or_else(|| ProcessorError::Resource("MediaBox not found on page or ancestors".into()))?;
    let crop_box = resolve_inherited(doc, page_id, b"CropBox")?.and_then(|o| read_box(doc, o));
    let rotation = resolve_inherited(doc, page_id, b"Rotate")?
        .and_then(|o| resolve_object(doc, o).as_i64().ok())
        .unwrap_or(0);
    Ok(PageGeometry::new(
        media_box,
        crop_box,
        i32::try_from(rotation).unwrap_or(0),
    ))
}

/// The decoded `/Contents` of a page. Multiple streams are joined with a
/// newline so that a token never spans two of them.
pub fn page_content(doc: &Document, page_id: ObjectId) -> Result<Vec<u8>, ProcessorError> {
    let page = doc.get_object(page_id).and_then(Object::as_dict)?;
    let Ok(contents) = page.get(b"Contents") else {
        return Ok(Vec::new());
    };

    match resolve_object(doc, contents) {
        Object::Stream(stream) => decode_stream(stream),
        Object::Array(parts) => {
            let mut content = Vec::new();
            for part in parts {
                let stream = resolve_object(doc, part).as_stream().map_err(|e| {
                    ProcessorError::Resource(format!("/Contents array item is not a stream: {e}"))
                })?;
                let bytes = decode_stream(stream)?;
                if !content.is_empty() {
                    content.push(b'\n');
                }
                content.extend_from_slice(&bytes);
            }
            Ok(content)
        }
        _ => Err(ProcessorError::Resource(
            "/Contents is not a stream or array".to_string(),
        )),
    }
}

/// Output space of [`process_page_in`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PageSpace {
    /// PDF convention: origin at the lower-left of the visible area, y up.
    #[default]
    BottomLeft,
    /// Device convention: origin at the top-left, y down.
    TopLeft,
}

/// Run one page through a fresh processor and hand the listener back.
pub fn process_page<L: EventListener>(
    doc: &Document,
    page_id: ObjectId,
    listener: L,
    options: ProcessorOptions,
) -> Result<L, ProcessorError> {
    process_page_in(doc, page_id, listener, options, PageSpace::BottomLeft)
}

/// [`process_page`] with an explicit output space.
pub fn process_page_in<L: EventListener>(
    doc: &Document,
    page_id: ObjectId,
    listener: L,
    options: ProcessorOptions,
    space: PageSpace,
) -> Result<L, ProcessorError> {
    let geometry = page_geometry(doc, page_id)?;
    let content = page_content(doc, page_id)?;
    let resources = LopdfResources::for_page(doc, page_id)?;

    #[cfg(feature = "tracing")]
    tracing::debug!(
        page = ?page_id,
        bytes = content.len(),
        rotation = geometry.rotation(),
        "processing page"
    );

    let initial = GraphicsState::with_ctm(geometry.initial_ctm(space == PageSpace::TopLeft));
    let mut processor = CanvasProcessor::with_initial_state(listener, options, initial);
    processor.process_content(&content, &resources)?;
    Ok(processor.into_listener())
}

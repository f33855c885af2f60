//! Resource lookup: the seam between the processor and whatever owns the
//! PDF object model.
//!
//! The processor never sees a PDF document. It asks a [`ResourceProvider`]
//! for fonts, XObjects, color spaces, ExtGState parameters and property
//! lists by resource name. [`LopdfResources`](crate::LopdfResources)
//! answers from a lopdf resources dictionary; [`MapResources`] answers from
//! in-memory tables.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use pdfcanvas_core::{BBox, DashPattern, ImageHandle, LineCap, LineJoin, Matrix};

use crate::color_space::ColorSpace;
use crate::font::PdfFont;
use crate::graphics_state::GraphicsState;
use crate::tokenizer::Operand;

/// Named resources of one content stream.
pub trait ResourceProvider {
    /// `/Font/<name>`.
    fn font(&self, name: &str) -> Option<Arc<dyn PdfFont>>;

    /// `/XObject/<name>`, with form content already filter-decoded.
    fn xobject(&self, name: &str) -> Option<XObject<'_>>;

    /// `/ColorSpace/<name>`. Device spaces are resolved by the processor
    /// and never reach the provider.
    fn color_space(&self, name: &str) -> Option<ColorSpace>;

    /// `/ExtGState/<name>`.
    fn ext_gstate(&self, name: &str) -> Option<ExtGState>;

    /// `/Properties/<name>`, flattened into operand form so that it reads
    /// the same as an inline `BDC` dictionary.
    fn properties(&self, name: &str) -> Option<Vec<(String, Operand)>>;
}

impl<R: ResourceProvider + ?Sized> ResourceProvider for &R {
    fn font(&self, name: &str) -> Option<Arc<dyn PdfFont>> {
        (**self).font(name)
    }

    fn xobject(&self, name: &str) -> Option<XObject<'_>> {
        (**self).xobject(name)
    }

    fn color_space(&self, name: &str) -> Option<ColorSpace> {
        (**self).color_space(name)
    }

    fn ext_gstate(&self, name: &str) -> Option<ExtGState> {
        (**self).ext_gstate(name)
    }

    fn properties(&self, name: &str) -> Option<Vec<(String, Operand)>> {
        (**self).properties(name)
    }
}

/// A resolved `/XObject` entry.
#[derive(Debug)]
pub enum XObject<'r> {
    Form(FormXObject<'r>),
    Image(ImageHandle),
}

/// A form XObject ready to be run as a nested content stream.
pub struct FormXObject<'r> {
    /// Identity used to detect a form invoking itself; two lookups of the
    /// same form must produce the same key.
    pub key: String,
    /// Filter-decoded content stream.
    pub content: Vec<u8>,
    /// `/Matrix`, form space to user space.
    pub matrix: Matrix,
    pub bbox: Option<BBox>,
    /// The form's own `/Resources`; `None` means inherit the caller's.
    pub resources: Option<Box<dyn ResourceProvider + 'r>>,
}

impl fmt::Debug for FormXObject<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FormXObject")
            .field("key", &self.key)
            .field("content_len", &self.content.len())
            .field("matrix", &self.matrix)
            .field("bbox", &self.bbox)
            .field("has_resources", &self.resources.is_some())
            .finish()
    }
}

/// Parameters of an `/ExtGState` dictionary that affect emitted events.
/// Absent entries leave the graphics state untouched.
#[derive(Debug, Clone, Default)]
pub struct ExtGState {
    pub line_width: Option<f64>,
    pub line_cap: Option<LineCap>,
    pub line_join: Option<LineJoin>,
    pub miter_limit: Option<f64>,
    pub dash_pattern: Option<DashPattern>,
    pub rendering_intent: Option<String>,
    pub flatness: Option<f64>,
    /// `/CA`
    pub stroke_alpha: Option<f64>,
    /// `/ca`
    pub fill_alpha: Option<f64>,
    /// `/Font [font size]`
    pub font: Option<(Arc<dyn PdfFont>, f64)>,
}

impl ExtGState {
    /// Overwrite the parameters this dictionary sets.
    pub fn apply_to(&self, gs: &mut GraphicsState) {
        if let Some(w) = self.line_width {
            gs.line_width = w;
        }
        if let Some(cap) = self.line_cap {
            gs.line_cap = cap;
        }
        if let Some(join) = self.line_join {
            gs.line_join = join;
        }
        if let Some(ml) = self.miter_limit {
            gs.miter_limit = ml;
        }
        if let Some(dash) = &self.dash_pattern {
            gs.dash_pattern = dash.clone();
        }
        if let Some(ri) = &self.rendering_intent {
            gs.rendering_intent = Some(ri.clone());
        }
        if let Some(fl) = self.flatness {
            gs.flatness = fl;
        }
        if let Some(a) = self.stroke_alpha {
            gs.stroke_alpha = a;
        }
        if let Some(a) = self.fill_alpha {
            gs.fill_alpha = a;
        }
        if let Some((font, size)) = &self.font {
            gs.font_name = Some(font.name().to_string());
            gs.font = Some(Arc::clone(font));
            gs.font_size = *size;
        }
    }
}

#[derive(Debug, Clone)]
struct MapForm {
    content: Vec<u8>,
    matrix: Matrix,
    bbox: Option<BBox>,
    resources: Option<Arc<MapResources>>,
}

/// In-memory [`ResourceProvider`] for hosts that resolve resources
/// themselves.
#[derive(Debug, Clone, Default)]
pub struct MapResources {
    fonts: HashMap<String, Arc<dyn PdfFont>>,
    forms: HashMap<String, MapForm>,
    images: HashMap<String, ImageHandle>,
    color_spaces: HashMap<String, ColorSpace>,
    ext_gstates: HashMap<String, ExtGState>,
    properties: HashMap<String, Vec<(String, Operand)>>,
}

impl MapResources {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_font(mut self, name: impl Into<String>, font: Arc<dyn PdfFont>) -> Self {
        self.fonts.insert(name.into(), font);
        self
    }

    /// A form that inherits the caller's resources.
    pub fn with_form(
        mut self,
        name: impl Into<String>,
        content: impl Into<Vec<u8>>,
        matrix: Matrix,
    ) -> Self {
        self.forms.insert(
            name.into(),
            MapForm {
                content: content.into(),
                matrix,
                bbox: None,
                resources: None,
            },
        );
        self
    }

    /// A form with its own resources.
    pub fn with_form_resources(
        mut self,
        name: impl Into<String>,
        content: impl Into<Vec<u8>>,
        matrix: Matrix,
        resources: MapResources,
    ) -> Self {
        self.forms.insert(
            name.into(),
            MapForm {
                content: content.into(),
                matrix,
                bbox: None,
                resources: Some(Arc::new(resources)),
            },
        );
        self
    }

    pub fn with_image(mut self, name: impl Into<String>, image: ImageHandle) -> Self {
        self.images.insert(name.into(), image);
        self
    }

    pub fn with_color_space(mut self, name: impl Into<String>, cs: ColorSpace) -> Self {
        self.color_spaces.insert(name.into(), cs);
        self
    }

    pub fn with_ext_gstate(mut self, name: impl Into<String>, ext: ExtGState) -> Self {
        self.ext_gstates.insert(name.into(), ext);
        self
    }

    pub fn with_properties(
        mut self,
        name: impl Into<String>,
        properties: Vec<(String, Operand)>,
    ) -> Self {
        self.properties.insert(name.into(), properties);
        self
    }
}

impl ResourceProvider for MapResources {
    fn font(&self, name: &str) -> Option<Arc<dyn PdfFont>> {
        self.fonts.get(name).cloned()
    }

    fn xobject(&self, name: &str) -> Option<XObject<'_>> {
        if let Some(form) = self.forms.get(name) {
            return Some(XObject::Form(FormXObject {
                key: format!("form:{name}"),
                content: form.content.clone(),
                matrix: form.matrix,
                bbox: form.bbox,
                resources: form
                    .resources
                    .as_deref()
                    .map(|r| Box::new(r) as Box<dyn ResourceProvider + '_>),
            }));
        }
        self.images.get(name).cloned().map(XObject::Image)
    }

    fn color_space(&self, name: &str) -> Option<ColorSpace> {
        self.color_spaces.get(name).cloned()
    }

    fn ext_gstate(&self, name: &str) -> Option<ExtGState> {
        self.ext_gstates.get(name).cloned()
    }

    fn properties(&self, name: &str) -> Option<Vec<(String, Operand)>> {
        self.properties.get(name).cloned()
    }
}

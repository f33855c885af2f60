//! Graphics state and the `q`/`Q` stack.
//!
//! [`GraphicsState`] holds every parameter that `q` saves: the CTM, paint
//! parameters, the clipping path and the text state parameters. Listeners
//! receive frozen `Arc<GraphicsState>` snapshots, never the live value.

use std::sync::Arc;

use pdfcanvas_core::{Color, DashPattern, FillRule, LineCap, LineJoin, Matrix, Path};

use crate::color_space::ColorSpace;
use crate::font::PdfFont;

/// Text rendering mode set by `Tr`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TextRenderMode {
    #[default]
    Fill = 0,
    Stroke = 1,
    FillStroke = 2,
    /// Neither fill nor stroke.
    Invisible = 3,
    FillClip = 4,
    StrokeClip = 5,
    FillStrokeClip = 6,
    /// Add to clipping path only.
    Clip = 7,
}

impl TextRenderMode {
    /// Mode for a `Tr` operand; `None` outside 0..=7.
    pub fn from_i64(value: i64) -> Option<Self> {
        match value {
            0 => Some(Self::Fill),
            1 => Some(Self::Stroke),
            2 => Some(Self::FillStroke),
            3 => Some(Self::Invisible),
            4 => Some(Self::FillClip),
            5 => Some(Self::StrokeClip),
            6 => Some(Self::FillStrokeClip),
            7 => Some(Self::Clip),
            _ => None,
        }
    }

    pub fn is_visible(&self) -> bool {
        !matches!(self, Self::Invisible | Self::Clip)
    }
}

/// One clipping path intersected into the current clip region.
#[derive(Debug, Clone, PartialEq)]
pub struct ClipPath {
    /// Path in the coordinates it was built in.
    pub path: Path,
    pub fill_rule: FillRule,
    /// CTM in effect when the clip was set.
    pub ctm: Matrix,
}

/// Parameters saved by `q` and restored by `Q`.
#[derive(Debug, Clone)]
pub struct GraphicsState {
    pub ctm: Matrix,
    pub fill_color: Color,
    pub stroke_color: Color,
    pub fill_color_space: ColorSpace,
    pub stroke_color_space: ColorSpace,
    pub line_width: f64,
    pub line_cap: LineCap,
    pub line_join: LineJoin,
    pub miter_limit: f64,
    pub dash_pattern: DashPattern,
    /// `/CA` constant alpha for stroking.
    pub stroke_alpha: f64,
    /// `/ca` constant alpha for filling.
    pub fill_alpha: f64,
    pub rendering_intent: Option<String>,
    pub flatness: f64,
    pub font: Option<Arc<dyn PdfFont>>,
    /// Resource name of the current font (`/F1`).
    pub font_name: Option<String>,
    pub font_size: f64,
    /// `Tc`, unscaled text space units.
    pub char_spacing: f64,
    /// `Tw`, unscaled text space units.
    pub word_spacing: f64,
    /// `Tz`, in percent (100 = normal).
    pub horizontal_scaling: f64,
    pub leading: f64,
    pub rise: f64,
    pub render_mode: TextRenderMode,
    /// Clipping paths intersected so far, outermost first. Empty means the
    /// whole page.
    pub clip: Vec<Arc<ClipPath>>,
}

impl Default for GraphicsState {
    fn default() -> Self {
        Self::with_ctm(Matrix::identity())
    }
}

impl GraphicsState {
    /// Initial state of a page whose default user space maps through `ctm`.
    pub fn with_ctm(ctm: Matrix) -> Self {
        Self {
            ctm,
            fill_color: Color::black(),
            stroke_color: Color::black(),
            fill_color_space: ColorSpace::DeviceGray,
            stroke_color_space: ColorSpace::DeviceGray,
            line_width: 1.0,
            line_cap: LineCap::default(),
            line_join: LineJoin::default(),
            miter_limit: 10.0,
            dash_pattern: DashPattern::solid(),
            stroke_alpha: 1.0,
            fill_alpha: 1.0,
            rendering_intent: None,
            flatness: 1.0,
            font: None,
            font_name: None,
            font_size: 0.0,
            char_spacing: 0.0,
            word_spacing: 0.0,
            horizontal_scaling: 100.0,
            leading: 0.0,
            rise: 0.0,
            render_mode: TextRenderMode::Fill,
            clip: Vec::new(),
        }
    }

    /// `Tz` as a factor (1.0 = 100%).
    pub fn horizontal_scaling_factor(&self) -> f64 {
        self.horizontal_scaling / 100.0
    }

    /// `cm`: pre-multiply the CTM.
    pub fn concat(&mut self, m: &Matrix) {
        self.ctm = m.multiply(&self.ctm);
    }
}

impl PartialEq for GraphicsState {
    fn eq(&self, other: &Self) -> bool {
        let same_font = match (&self.font, &other.font) {
            (Some(a), Some(b)) => Arc::ptr_eq(a, b),
            (None, None) => true,
            _ => false,
        };
        same_font
            && self.ctm == other.ctm
            && self.fill_color == other.fill_color
            && self.stroke_color == other.stroke_color
            && self.fill_color_space == other.fill_color_space
            && self.stroke_color_space == other.stroke_color_space
            && self.line_width == other.line_width
            && self.line_cap == other.line_cap
            && self.line_join == other.line_join
            && self.miter_limit == other.miter_limit
            && self.dash_pattern == other.dash_pattern
            && self.stroke_alpha == other.stroke_alpha
            && self.fill_alpha == other.fill_alpha
            && self.rendering_intent == other.rendering_intent
            && self.flatness == other.flatness
            && self.font_name == other.font_name
            && self.font_size == other.font_size
            && self.char_spacing == other.char_spacing
            && self.word_spacing == other.word_spacing
            && self.horizontal_scaling == other.horizontal_scaling
            && self.leading == other.leading
            && self.rise == other.rise
            && self.render_mode == other.render_mode
            && self.clip == other.clip
    }
}

/// The `q`/`Q` stack.
///
/// A floor marks the depth at which the content stream being processed
/// started; `restore` never pops below it, so a form XObject cannot
/// restore frames saved by its caller.
#[derive(Debug, Clone, Default)]
pub struct GraphicsStateStack {
    current: GraphicsState,
    saved: Vec<GraphicsState>,
    floor: usize,
}

impl GraphicsStateStack {
    pub fn new(initial: GraphicsState) -> Self {
        Self {
            current: initial,
            saved: Vec::new(),
            floor: 0,
        }
    }

    pub fn current(&self) -> &GraphicsState {
        &self.current
    }

    pub fn current_mut(&mut self) -> &mut GraphicsState {
        &mut self.current
    }

    /// Frozen copy of the current state for an event.
    pub fn snapshot(&self) -> Arc<GraphicsState> {
        Arc::new(self.current.clone())
    }

    /// Number of saved frames.
    pub fn depth(&self) -> usize {
        self.saved.len()
    }

    /// `q`
    pub fn save(&mut self) {
        self.saved.push(self.current.clone());
    }

    /// `Q`. Returns `false`, leaving the state untouched, at the floor.
    pub fn restore(&mut self) -> bool {
        if self.saved.len() <= self.floor {
            return false;
        }
        match self.saved.pop() {
            Some(state) => {
                self.current = state;
                true
            }
            None => false,
        }
    }

    /// Save the state and raise the floor above it, for a nested content
    /// stream. Returns the token to pass to [`leave_nested`](Self::leave_nested).
    pub fn enter_nested(&mut self) -> NestedFrame {
        self.save();
        let frame = NestedFrame {
            depth: self.saved.len(),
            previous_floor: self.floor,
        };
        self.floor = frame.depth;
        frame
    }

    /// Drop whatever the nested stream left saved, then restore the state
    /// from before [`enter_nested`](Self::enter_nested).
    pub fn leave_nested(&mut self, frame: NestedFrame) {
        self.saved.truncate(frame.depth);
        self.floor = frame.previous_floor;
        if let Some(state) = self.saved.pop() {
            self.current = state;
        }
    }
}

/// Stack position recorded by [`GraphicsStateStack::enter_nested`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[must_use]
pub struct NestedFrame {
    depth: usize,
    previous_floor: usize,
}

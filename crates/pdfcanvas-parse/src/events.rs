//! Events emitted by the content-stream processor.
//!
//! Every event owns (or shares through `Arc`) the data it describes, so a
//! listener may keep events after the processor has moved on.

use std::sync::Arc;

use pdfcanvas_core::{
    BBox, Color, DashPattern, FillRule, ImageHandle, LineCap, LineJoin, Matrix, PaintOperation,
    Path, Point, TagHierarchy,
};

use crate::graphics_state::GraphicsState;
use crate::text_render::TextRenderInfo;

/// A painted path: emitted once per painting operator with a non-empty path.
#[derive(Debug, Clone)]
pub struct PathRenderInfo {
    pub operation: PaintOperation,
    pub fill_rule: FillRule,
    /// Set when a pending `W`/`W*` was consumed by this operator.
    pub clip_rule: Option<FillRule>,
    /// Path in the coordinates of the operators that built it.
    pub path: Path,
    pub ctm: Matrix,
    pub fill_color: Color,
    pub stroke_color: Color,
    pub line_width: f64,
    pub line_cap: LineCap,
    pub line_join: LineJoin,
    pub miter_limit: f64,
    pub dash_pattern: DashPattern,
    pub tags: TagHierarchy,
}

impl PathRenderInfo {
    pub(crate) fn new(
        operation: PaintOperation,
        fill_rule: FillRule,
        clip_rule: Option<FillRule>,
        path: Path,
        gs: &GraphicsState,
        tags: TagHierarchy,
    ) -> Self {
        Self {
            operation,
            fill_rule,
            clip_rule,
            path,
            ctm: gs.ctm,
            fill_color: gs.fill_color.clone(),
            stroke_color: gs.stroke_color.clone(),
            line_width: gs.line_width,
            line_cap: gs.line_cap,
            line_join: gs.line_join,
            miter_limit: gs.miter_limit,
            dash_pattern: gs.dash_pattern.clone(),
            tags,
        }
    }

    /// Whether the path only updates the clip (`n` after `W`).
    pub fn is_clip_only(&self) -> bool {
        self.operation == PaintOperation::NoOp
    }

    /// The path mapped into user space.
    pub fn user_space_path(&self) -> Path {
        self.path.transform(&self.ctm)
    }

    pub fn mcid(&self) -> Option<i64> {
        self.tags.mcid()
    }
}

/// The clipping path changed because a paint operator consumed `W`/`W*`.
#[derive(Debug, Clone)]
pub struct ClipPathInfo {
    pub path: Path,
    pub fill_rule: FillRule,
    pub ctm: Matrix,
}

/// A painted image, from `Do` or an inline image.
#[derive(Debug, Clone)]
pub struct ImageRenderInfo {
    pub image: Arc<ImageHandle>,
    /// Maps the unit square onto the page: the CTM at paint time.
    pub image_matrix: Matrix,
    /// Fill color at paint time, which colors stencil masks.
    pub fill_color: Color,
    pub tags: TagHierarchy,
}

impl ImageRenderInfo {
    /// The unit square in user space.
    pub fn bounds(&self) -> BBox {
        BBox::new(0.0, 0.0, 1.0, 1.0).transform(&self.image_matrix)
    }

    /// Where the image's (0, 0) corner lands.
    pub fn origin(&self) -> Point {
        self.image_matrix.transform_point(Point::new(0.0, 0.0))
    }

    /// Area of the painted parallelogram.
    pub fn area(&self) -> f64 {
        self.image_matrix.determinant().abs()
    }

    pub fn is_inline(&self) -> bool {
        self.image.is_inline
    }

    pub fn mcid(&self) -> Option<i64> {
        self.tags.mcid()
    }
}

/// Event delivered to listeners.
#[derive(Debug, Clone)]
pub enum CanvasEvent {
    /// `BT`
    BeginText,
    Text(TextRenderInfo),
    /// `ET`
    EndText,
    Path(PathRenderInfo),
    ClipPathChanged(ClipPathInfo),
    Image(ImageRenderInfo),
}

impl CanvasEvent {
    pub fn event_type(&self) -> EventType {
        match self {
            CanvasEvent::BeginText => EventType::BeginText,
            CanvasEvent::Text(_) => EventType::RenderText,
            CanvasEvent::EndText => EventType::EndText,
            CanvasEvent::Path(_) => EventType::RenderPath,
            CanvasEvent::ClipPathChanged(_) => EventType::ClipPathChanged,
            CanvasEvent::Image(_) => EventType::RenderImage,
        }
    }

    /// Graphics state snapshot of text events.
    pub fn graphics_state(&self) -> Option<&GraphicsState> {
        match self {
            CanvasEvent::Text(info) => Some(info.graphics_state()),
            _ => None,
        }
    }
}

/// Discriminant of [`CanvasEvent`], used to filter listeners.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventType {
    BeginText,
    RenderText,
    EndText,
    RenderPath,
    ClipPathChanged,
    RenderImage,
}

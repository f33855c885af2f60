//! pdfcanvas-core: Backend-independent data types.
//!
//! This crate provides the value types shared by the content-stream
//! processor: the geometry kernel ([`Matrix`], [`Vector`], [`LineSegment`]),
//! paint parameters, the path model, marked-content tags, and the
//! warning/options types. It depends on no PDF backend.

pub mod error;
pub mod geometry;
pub mod image;
pub mod marked_content;
pub mod painting;
pub mod path;
pub mod unicode_norm;

pub use error::{CanvasWarning, PdfError, ProcessorOptions, WarningCode};
pub use geometry::{BBox, LineSegment, Matrix, Point, Vector};
pub use image::{ImageFilter, ImageHandle};
pub use marked_content::{CanvasTag, TagHierarchy};
pub use painting::{Color, DashPattern, FillRule, LineCap, LineJoin, PaintOperation};
pub use path::{Path, PathBuilder, Segment, Subpath};
pub use unicode_norm::UnicodeNorm;

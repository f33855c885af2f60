//! pdfcanvas-parse: content-stream processor for PDF pages.
//!
//! This crate tokenizes page and form content streams, tracks the graphics
//! and text state they describe, and reports what is painted as a stream of
//! [`CanvasEvent`]s to an [`EventListener`]. Fonts, XObjects and other named
//! resources come through the [`ResourceProvider`] seam; the
//! [`lopdf_backend`] module implements it over [`lopdf`].
//!
//! # Example
//!
//! ```
//! use pdfcanvas_core::ProcessorOptions;
//! use pdfcanvas_parse::{CanvasProcessor, EventCollector, EventType, MapResources};
//!
//! let mut processor = CanvasProcessor::new(EventCollector::new(), ProcessorOptions::default());
//! processor
//!     .process_content(b"0 0 m 10 0 l 10 10 l h f", &MapResources::new())
//!     .unwrap();
//! assert_eq!(processor.listener().of_type(EventType::RenderPath).count(), 1);
//! ```

pub mod cid_font;
pub mod cjk_encoding;
pub mod cmap;
pub mod color_space;
pub mod error;
pub mod events;
pub mod font;
pub mod font_metrics;
pub mod graphics_state;
pub mod listener;
pub mod loaded_font;
pub mod lopdf_backend;
pub mod page_geometry;
pub mod processor;
pub mod resources;
pub mod simple_encoding;
pub mod text_render;
pub mod text_state;
pub mod tokenizer;

pub use color_space::ColorSpace;
pub use error::ProcessorError;
pub use events::{CanvasEvent, ClipPathInfo, EventType, ImageRenderInfo, PathRenderInfo};
pub use font::{CharCode, FallbackFont, PdfFont};
pub use graphics_state::{ClipPath, GraphicsState, GraphicsStateStack, TextRenderMode};
pub use listener::{EventCollector, EventDispatcher, EventListener};
pub use loaded_font::LoadedFont;
pub use lopdf_backend::{LopdfResources, PageSpace, process_page, process_page_in};
pub use page_geometry::PageGeometry;
pub use pdfcanvas_core;
pub use processor::CanvasProcessor;
pub use resources::{ExtGState, FormXObject, MapResources, ResourceProvider, XObject};
pub use text_render::TextRenderInfo;
pub use tokenizer::{ContentLexer, Operand, Operator, tokenize};

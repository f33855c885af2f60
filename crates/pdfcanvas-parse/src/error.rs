//! Error types for the parsing and interpreter layers.
//!
//! Uses [`thiserror`] for ergonomic error derivation. Provides
//! [`ProcessorError`], which wraps parse, resource and listener failures and
//! converts them to [`PdfError`].

use pdfcanvas_core::PdfError;
use thiserror::Error;

/// Error type for content-stream processing.
#[derive(Debug, Error)]
pub enum ProcessorError {
    /// The content stream ended inside a token (string, array, dictionary,
    /// inline image). Everything before the truncation point is usable.
    #[error("content stream truncated: {0}")]
    Truncated(String),

    /// Malformed content-stream syntax that affects a single operator.
    #[error("content parse error: {0}")]
    Parse(String),

    /// Error resolving a resource from the PDF backend.
    #[error("resource error: {0}")]
    Resource(String),

    /// Error resolving font or encoding information.
    #[error("font error: {0}")]
    Font(String),

    /// A listener rejected an event; processing of the page stops.
    #[error("listener error: {0}")]
    Listener(Box<dyn std::error::Error + Send + Sync>),

    /// A core library error (strict-mode escalation, resource limits).
    #[error(transparent)]
    Core(#[from] PdfError),
}

impl ProcessorError {
    /// Wrap an arbitrary listener failure.
    pub fn listener(err: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> Self {
        ProcessorError::Listener(err.into())
    }
}

impl From<lopdf::Error> for ProcessorError {
    fn from(err: lopdf::Error) -> Self {
        ProcessorError::Resource(err.to_string())
    }
}

impl From<ProcessorError> for PdfError {
    fn from(err: ProcessorError) -> Self {
        match err {
            ProcessorError::Truncated(msg) | ProcessorError::Parse(msg) => {
                PdfError::ParseError(msg)
            }
            ProcessorError::Resource(msg) => PdfError::ResourceError(msg),
            ProcessorError::Font(msg) => PdfError::FontError(msg),
            ProcessorError::Listener(e) => PdfError::InterpreterError(e.to_string()),
            ProcessorError::Core(e) => e,
        }
    }
}

//! Error and warning types shared by every pdfcanvas crate.
//!
//! Provides [`PdfError`] for fatal errors that stop processing,
//! [`CanvasWarning`] for non-fatal issues that allow best-effort
//! continuation, and [`ProcessorOptions`] for configuring resource limits and
//! warning behavior.

use std::fmt;

use crate::unicode_norm::UnicodeNorm;

/// Fatal error types for content-stream processing.
#[derive(Debug, Clone, PartialEq)]
pub enum PdfError {
    /// Error parsing content-stream syntax.
    ParseError(String),
    /// Error resolving a resource (font, XObject, color space, ...).
    ResourceError(String),
    /// Error resolving font or encoding information.
    FontError(String),
    /// Error during content stream interpretation.
    InterpreterError(String),
    /// A configured resource limit was exceeded.
    ResourceLimitExceeded {
        /// Name of the limit that was exceeded (e.g., "max_operators").
        limit_name: String,
        /// The configured limit value.
        limit_value: usize,
        /// The actual value that exceeded the limit.
        actual_value: usize,
    },
    /// Any other error not covered by specific variants.
    Other(String),
}

impl fmt::Display for PdfError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PdfError::ParseError(msg) => write!(f, "parse error: {msg}"),
            PdfError::ResourceError(msg) => write!(f, "resource error: {msg}"),
            PdfError::FontError(msg) => write!(f, "font error: {msg}"),
            PdfError::InterpreterError(msg) => write!(f, "interpreter error: {msg}"),
            PdfError::ResourceLimitExceeded {
                limit_name,
                limit_value,
                actual_value,
            } => write!(
                f,
                "resource limit exceeded: {limit_name} (limit: {limit_value}, actual: {actual_value})"
            ),
            PdfError::Other(msg) => write!(f, "{msg}"),
        }
    }
}

impl std::error::Error for PdfError {}

/// Machine-readable category of a [`CanvasWarning`].
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(tag = "type", content = "detail")
)]
pub enum WarningCode {
    /// A font named by `Tf` was not found in the resources.
    MissingFont,
    /// An XObject, ExtGState, color space or property list was not found.
    MissingResource,
    /// An operator had the wrong number or type of operands.
    MalformedOperator,
    /// `Q` without a matching `q` (or a form popping its caller's state).
    UnbalancedState,
    /// A configured limit (recursion depth, operator count) was reached.
    ResourceLimitReached,
    /// The content stream ended in the middle of a token.
    TruncatedContent,
    /// Any other warning not covered by specific variants.
    Other(String),
}

impl WarningCode {
    /// Returns the string tag for this warning code.
    pub fn as_str(&self) -> &str {
        match self {
            WarningCode::MissingFont => "MISSING_FONT",
            WarningCode::MissingResource => "MISSING_RESOURCE",
            WarningCode::MalformedOperator => "MALFORMED_OPERATOR",
            WarningCode::UnbalancedState => "UNBALANCED_STATE",
            WarningCode::ResourceLimitReached => "RESOURCE_LIMIT_REACHED",
            WarningCode::TruncatedContent => "TRUNCATED_CONTENT",
            WarningCode::Other(_) => "OTHER",
        }
    }
}

impl fmt::Display for WarningCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A non-fatal issue encountered while processing a content stream.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CanvasWarning {
    /// Machine-readable warning code.
    pub code: WarningCode,
    /// Human-readable description of the warning.
    pub description: String,
    /// Index of the operator in the content stream, if known.
    pub operator_index: Option<usize>,
    /// Name of the operator being executed, if known.
    pub operator: Option<String>,
    /// Font resource name associated with the warning, if applicable.
    pub font_name: Option<String>,
}

impl CanvasWarning {
    /// Create a warning with a specific code and description.
    pub fn new(code: WarningCode, description: impl Into<String>) -> Self {
        Self {
            code,
            description: description.into(),
            operator_index: None,
            operator: None,
            font_name: None,
        }
    }

    /// Attach the operator position and name (builder pattern).
    pub fn at_operator(mut self, index: usize, operator: impl Into<String>) -> Self {
        self.operator_index = Some(index);
        self.operator = Some(operator.into());
        self
    }

    /// Attach the font resource name (builder pattern).
    pub fn with_font(mut self, font_name: impl Into<String>) -> Self {
        self.font_name = Some(font_name.into());
        self
    }

    /// Convert this warning into a [`PdfError`].
    ///
    /// Used by strict mode to escalate warnings to errors.
    pub fn to_error(&self) -> PdfError {
        PdfError::Other(self.to_string())
    }
}

impl fmt::Display for CanvasWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code, self.description)?;
        if let Some(ref font_name) = self.font_name {
            write!(f, " [font {font_name}]")?;
        }
        match (self.operator_index, &self.operator) {
            (Some(index), Some(op)) => write!(f, " [operator #{index} {op}]")?,
            (Some(index), None) => write!(f, " [operator #{index}]")?,
            _ => {}
        }
        Ok(())
    }
}

/// Options controlling processing behavior and resource limits.
///
/// Resource limits keep pathological content (deeply nested or
/// self-referencing forms, runaway operator counts) from looping forever.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ProcessorOptions {
    /// Maximum nesting depth of Form XObjects (default: 10). Deeper forms
    /// are skipped.
    pub max_recursion_depth: usize,
    /// Maximum operators executed per content stream (default: 1,000,000).
    pub max_operators: usize,
    /// Whether warnings are delivered to listeners (default: true).
    pub collect_warnings: bool,
    /// When true, the first warning aborts processing as an error (default: false).
    pub strict_mode: bool,
    /// Normalization applied to decoded text (default: none).
    pub unicode_norm: UnicodeNorm,
}

impl Default for ProcessorOptions {
    fn default() -> Self {
        Self {
            max_recursion_depth: 10,
            max_operators: 1_000_000,
            collect_warnings: true,
            strict_mode: false,
            unicode_norm: UnicodeNorm::None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pdf_error_display() {
        assert_eq!(
            PdfError::ParseError("unterminated string".to_string()).to_string(),
            "parse error: unterminated string"
        );
        assert_eq!(
            PdfError::ResourceError("no /XObject".to_string()).to_string(),
            "resource error: no /XObject"
        );
        assert_eq!(PdfError::Other("boom".to_string()).to_string(), "boom");
    }

    #[test]
    fn pdf_error_resource_limit_exceeded() {
        let err = PdfError::ResourceLimitExceeded {
            limit_name: "max_operators".to_string(),
            limit_value: 10,
            actual_value: 11,
        };
        assert_eq!(
            err.to_string(),
            "resource limit exceeded: max_operators (limit: 10, actual: 11)"
        );
    }

    #[test]
    fn pdf_error_implements_std_error() {
        let err: Box<dyn std::error::Error> = Box::new(PdfError::FontError("x".to_string()));
        assert_eq!(err.to_string(), "font error: x");
    }

    #[test]
    fn warning_display_minimal() {
        let w = CanvasWarning::new(WarningCode::MissingFont, "font /F9 not found");
        assert_eq!(w.to_string(), "[MISSING_FONT] font /F9 not found");
    }

    #[test]
    fn warning_display_with_context() {
        let w = CanvasWarning::new(WarningCode::MissingFont, "font not found")
            .at_operator(5, "Tf")
            .with_font("F1");
        assert_eq!(w.operator_index, Some(5));
        assert_eq!(
            w.to_string(),
            "[MISSING_FONT] font not found [font F1] [operator #5 Tf]"
        );
    }

    #[test]
    fn warning_to_error_keeps_message() {
        let w = CanvasWarning::new(WarningCode::UnbalancedState, "Q without q");
        assert_eq!(
            w.to_error(),
            PdfError::Other("[UNBALANCED_STATE] Q without q".to_string())
        );
    }

    #[test]
    fn warning_code_tags() {
        assert_eq!(WarningCode::TruncatedContent.as_str(), "TRUNCATED_CONTENT");
        assert_eq!(WarningCode::Other("x".to_string()).as_str(), "OTHER");
    }

    #[test]
    fn options_defaults() {
        let opts = ProcessorOptions::default();
        assert_eq!(opts.max_recursion_depth, 10);
        assert_eq!(opts.max_operators, 1_000_000);
        assert!(opts.collect_warnings);
        assert!(!opts.strict_mode);
        assert_eq!(opts.unicode_norm, UnicodeNorm::None);
    }
}

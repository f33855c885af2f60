//! Paint-related value types: colors, fill rules, stroke parameters and the
//! painting operation resolved from `S s f F f* B B* b b* n`.

/// A color value as set by the color operators.
///
/// Device colors keep their native components; anything that needs a
/// color-space lookup the interpreter cannot evaluate (ICC profiles with an
/// unusual component count, DeviceN, patterns) is kept verbatim.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Color {
    Gray(f32),
    Rgb(f32, f32, f32),
    Cmyk(f32, f32, f32, f32),
    /// A pattern color: the pattern resource name plus optional tint
    /// components for uncolored patterns.
    Pattern {
        name: String,
        components: Vec<f32>,
    },
    Other(Vec<f32>),
}

impl Color {
    pub fn black() -> Self {
        Color::Gray(0.0)
    }

    /// Build a device color from a raw component list (1 → gray, 3 → RGB,
    /// 4 → CMYK).
    pub fn from_components(components: &[f32]) -> Self {
        match *components {
            [g] => Color::Gray(g),
            [r, g, b] => Color::Rgb(r, g, b),
            [c, m, y, k] => Color::Cmyk(c, m, y, k),
            _ => Color::Other(components.to_vec()),
        }
    }

    /// Approximate RGB rendering of device colors.
    pub fn to_rgb(&self) -> Option<(f32, f32, f32)> {
        match *self {
            Color::Gray(g) => Some((g, g, g)),
            Color::Rgb(r, g, b) => Some((r, g, b)),
            Color::Cmyk(c, m, y, k) => Some((
                (1.0 - c) * (1.0 - k),
                (1.0 - m) * (1.0 - k),
                (1.0 - y) * (1.0 - k),
            )),
            Color::Pattern { .. } | Color::Other(_) => None,
        }
    }
}

impl Default for Color {
    fn default() -> Self {
        Self::black()
    }
}

/// Fill rule for path painting and clipping.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum FillRule {
    /// Nonzero winding number rule (default).
    #[default]
    NonZeroWinding,
    /// Even-odd rule.
    EvenOdd,
}

/// The painting performed by a path-painting operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum PaintOperation {
    /// `n`: the path is discarded (typically after `W`/`W*`).
    NoOp,
    /// `S`, `s`.
    Stroke,
    /// `f`, `F`, `f*`.
    Fill,
    /// `B`, `B*`, `b`, `b*`.
    FillStroke,
}

impl PaintOperation {
    pub fn is_fill(&self) -> bool {
        matches!(self, PaintOperation::Fill | PaintOperation::FillStroke)
    }

    pub fn is_stroke(&self) -> bool {
        matches!(self, PaintOperation::Stroke | PaintOperation::FillStroke)
    }
}

/// Dash pattern for stroking (`d` operator).
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DashPattern {
    /// Alternating dash and gap lengths.
    pub dash_array: Vec<f64>,
    /// Offset into the pattern at which stroking starts.
    pub phase: f64,
}

impl DashPattern {
    pub fn new(dash_array: Vec<f64>, phase: f64) -> Self {
        Self { dash_array, phase }
    }

    /// `[] 0`, a solid line.
    pub fn solid() -> Self {
        Self::new(Vec::new(), 0.0)
    }

    pub fn is_solid(&self) -> bool {
        self.dash_array.is_empty() || self.dash_array.iter().all(|&v| v == 0.0)
    }
}

impl Default for DashPattern {
    fn default() -> Self {
        Self::solid()
    }
}

/// Line cap style (`J` operator).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum LineCap {
    #[default]
    Butt,
    Round,
    ProjectingSquare,
}

impl LineCap {
    pub fn from_i64(value: i64) -> Option<Self> {
        match value {
            0 => Some(LineCap::Butt),
            1 => Some(LineCap::Round),
            2 => Some(LineCap::ProjectingSquare),
            _ => None,
        }
    }
}

/// Line join style (`j` operator).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum LineJoin {
    #[default]
    Miter,
    Round,
    Bevel,
}

impl LineJoin {
    pub fn from_i64(value: i64) -> Option<Self> {
        match value {
            0 => Some(LineJoin::Miter),
            1 => Some(LineJoin::Round),
            2 => Some(LineJoin::Bevel),
            _ => None,
        }
    }
}

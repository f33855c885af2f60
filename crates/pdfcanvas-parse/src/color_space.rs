//! Color spaces selected by `cs`/`CS` and used to interpret `sc`/`scn`
//! component lists.
//!
//! Device, calibrated, ICCBased, Indexed, Separation, DeviceN and Pattern
//! spaces are recognized. Tint transforms are not evaluated: Separation and
//! DeviceN colors are approximated through their alternate space.

use lopdf::{Document, Object};
use pdfcanvas_core::Color;

/// A resolved color space with enough information to convert component
/// values to a [`Color`].
#[derive(Debug, Clone, PartialEq)]
pub enum ColorSpace {
    DeviceGray,
    DeviceRGB,
    DeviceCMYK,
    /// CalGray, treated as DeviceGray.
    CalGray,
    /// CalRGB, treated as DeviceRGB.
    CalRGB,
    /// CIE L*a*b*; components are kept verbatim.
    Lab,
    /// ICC profile: component count plus the alternate space used for
    /// conversion.
    ICCBased {
        num_components: u32,
        alternate: Box<ColorSpace>,
    },
    /// Palette-based color space.
    Indexed {
        base: Box<ColorSpace>,
        /// Maximum valid index value.
        hival: u32,
        /// `(hival + 1) * base components` bytes.
        lookup_table: Vec<u8>,
    },
    /// Single-component spot color.
    Separation { alternate: Box<ColorSpace> },
    /// Multi-component named colors.
    DeviceN {
        num_components: u32,
        alternate: Box<ColorSpace>,
    },
    /// Pattern space; uncolored patterns carry an underlying space.
    Pattern { base: Option<Box<ColorSpace>> },
}

impl ColorSpace {
    /// Resolve a device (or abbreviated) color space name.
    pub fn from_device_name(name: &str) -> Option<ColorSpace> {
        match name {
            "DeviceGray" | "G" => Some(ColorSpace::DeviceGray),
            "DeviceRGB" | "RGB" => Some(ColorSpace::DeviceRGB),
            "DeviceCMYK" | "CMYK" => Some(ColorSpace::DeviceCMYK),
            "Pattern" => Some(ColorSpace::Pattern { base: None }),
            _ => None,
        }
    }

    /// Number of components expected for this color space.
    pub fn num_components(&self) -> u32 {
        match self {
            ColorSpace::DeviceGray | ColorSpace::CalGray => 1,
            ColorSpace::DeviceRGB | ColorSpace::CalRGB | ColorSpace::Lab => 3,
            ColorSpace::DeviceCMYK => 4,
            ColorSpace::ICCBased { num_components, .. } => *num_components,
            ColorSpace::Indexed { .. } | ColorSpace::Separation { .. } => 1,
            ColorSpace::DeviceN { num_components, .. } => *num_components,
            ColorSpace::Pattern { base } => base.as_ref().map_or(0, |b| b.num_components()),
        }
    }

    /// The color installed when this space is selected with `cs`/`CS`.
    pub fn initial_color(&self) -> Color {
        match self {
            ColorSpace::DeviceCMYK => Color::Cmyk(0.0, 0.0, 0.0, 1.0),
            ColorSpace::Indexed { .. } => self.resolve_color(&[0.0]),
            ColorSpace::Separation { .. } | ColorSpace::DeviceN { .. } => {
                let n = self.num_components().max(1) as usize;
                self.resolve_color(&vec![1.0; n])
            }
            ColorSpace::Pattern { .. } => Color::Pattern {
                name: String::new(),
                components: Vec::new(),
            },
            ColorSpace::ICCBased { alternate, .. } => alternate.initial_color(),
            other => other.resolve_color(&vec![0.0; other.num_components() as usize]),
        }
    }

    /// Convert color components to a `Color` value using this color space.
    pub fn resolve_color(&self, components: &[f32]) -> Color {
        let at = |i: usize| components.get(i).copied().unwrap_or(0.0);
        match self {
            ColorSpace::DeviceGray | ColorSpace::CalGray => Color::Gray(at(0)),
            ColorSpace::DeviceRGB | ColorSpace::CalRGB => Color::Rgb(at(0), at(1), at(2)),
            ColorSpace::DeviceCMYK => Color::Cmyk(at(0), at(1), at(2), at(3)),
            ColorSpace::Lab => Color::Other(components.to_vec()),
            ColorSpace::ICCBased { alternate, .. } => alternate.resolve_color(components),
            ColorSpace::Indexed {
                base,
                hival,
                lookup_table,
            } => {
                let index = (at(0).max(0.0) as u32).min(*hival);
                let base_n = base.num_components() as usize;
                let offset = index as usize * base_n;
                match lookup_table.get(offset..offset + base_n) {
                    Some(entry) => {
                        let base_components: Vec<f32> =
                            entry.iter().map(|&b| f32::from(b) / 255.0).collect();
                        base.resolve_color(&base_components)
                    }
                    None => Color::Other(components.to_vec()),
                }
            }
            ColorSpace::Separation { alternate } => {
                // Tint 1.0 is full colorant; map it onto the alternate
                // space's darkest value without evaluating the function.
                let tint = at(0);
                match alternate.as_ref() {
                    ColorSpace::DeviceGray => Color::Gray(1.0 - tint),
                    ColorSpace::DeviceRGB => Color::Rgb(1.0 - tint, 1.0 - tint, 1.0 - tint),
                    ColorSpace::DeviceCMYK => Color::Cmyk(0.0, 0.0, 0.0, tint),
                    _ => Color::Other(components.to_vec()),
                }
            }
            ColorSpace::DeviceN { alternate, .. } => alternate.resolve_color(components),
            ColorSpace::Pattern { .. } => Color::Other(components.to_vec()),
        }
    }

    /// Color for `scn`/`SCN` with a trailing pattern name.
    pub fn resolve_pattern(&self, name: &str, components: &[f32]) -> Color {
        Color::Pattern {
            name: name.to_string(),
            components: components.to_vec(),
        }
    }
}

/// Infer the alternate color space from the number of ICC profile components.
fn alternate_from_num_components(n: u32) -> ColorSpace {
    match n {
        1 => ColorSpace::DeviceGray,
        4 => ColorSpace::DeviceCMYK,
        _ => ColorSpace::DeviceRGB,
    }
}

fn name_of(obj: &Object) -> Option<String> {
    match obj {
        Object::Name(n) => Some(String::from_utf8_lossy(n).into_owned()),
        _ => None,
    }
}

/// Resolve a color space from a lopdf object (name, array or reference).
pub fn color_space_from_object(obj: &Object, doc: &Document) -> Option<ColorSpace> {
    match obj {
        Object::Name(_) => {
            let name = name_of(obj)?;
            ColorSpace::from_device_name(&name).or(match name.as_str() {
                "CalGray" => Some(ColorSpace::CalGray),
                "CalRGB" => Some(ColorSpace::CalRGB),
                "Lab" => Some(ColorSpace::Lab),
                _ => None,
            })
        }
        Object::Array(arr) => color_space_from_array(arr, doc),
        Object::Reference(id) => color_space_from_object(doc.get_object(*id).ok()?, doc),
        _ => None,
    }
}

/// Resolve a color space array like `[/ICCBased stream]` or `[/Indexed base hival lookup]`.
fn color_space_from_array(arr: &[Object], doc: &Document) -> Option<ColorSpace> {
    let family = name_of(arr.first()?)?;
    match family.as_str() {
        "ICCBased" => icc_based(arr, doc),
        "Indexed" | "I" => indexed(arr, doc),
        "Separation" => {
            let alternate = arr
                .get(2)
                .and_then(|o| color_space_from_object(o, doc))
                .unwrap_or(ColorSpace::DeviceCMYK);
            Some(ColorSpace::Separation {
                alternate: Box::new(alternate),
            })
        }
        "DeviceN" => {
            let num_components = match deref(arr.get(1)?, doc) {
                Object::Array(names) => names.len() as u32,
                _ => return None,
            };
            let alternate = arr
                .get(2)
                .and_then(|o| color_space_from_object(o, doc))
                .unwrap_or(ColorSpace::DeviceCMYK);
            Some(ColorSpace::DeviceN {
                num_components,
                alternate: Box::new(alternate),
            })
        }
        "Pattern" => Some(ColorSpace::Pattern {
            base: arr
                .get(1)
                .and_then(|o| color_space_from_object(o, doc))
                .map(Box::new),
        }),
        "CalGray" => Some(ColorSpace::CalGray),
        "CalRGB" => Some(ColorSpace::CalRGB),
        "Lab" => Some(ColorSpace::Lab),
        other => ColorSpace::from_device_name(other),
    }
}

fn deref<'d>(obj: &'d Object, doc: &'d Document) -> &'d Object {
    match obj {
        Object::Reference(id) => doc.get_object(*id).unwrap_or(obj),
        _ => obj,
    }
}

/// Resolve `[/ICCBased stream]`.
fn icc_based(arr: &[Object], doc: &Document) -> Option<ColorSpace> {
    let stream = deref(arr.get(1)?, doc).as_stream().ok()?;
    let num_components = stream
        .dict
        .get(b"N")
        .ok()
        .and_then(|o| o.as_i64().ok())
        .map_or(3, |n| n as u32);
    let alternate = stream
        .dict
        .get(b"Alternate")
        .ok()
        .and_then(|o| color_space_from_object(o, doc))
        .unwrap_or_else(|| alternate_from_num_components(num_components));

    Some(ColorSpace::ICCBased {
        num_components,
        alternate: Box::new(alternate),
    })
}

/// Resolve `[/Indexed base hival lookup]`.
fn indexed(arr: &[Object], doc: &Document) -> Option<ColorSpace> {
    if arr.len() < 4 {
        return None;
    }
    let base = color_space_from_object(&arr[1], doc).unwrap_or(ColorSpace::DeviceRGB);
    let hival = deref(&arr[2], doc).as_i64().ok()?.clamp(0, 255) as u32;
    let lookup_table = match deref(&arr[3], doc) {
        Object::String(bytes, _) => bytes.clone(),
        Object::Stream(s) => s
            .decompressed_content()
            .unwrap_or_else(|_| s.content.clone()),
        _ => return None,
    };

    Some(ColorSpace::Indexed {
        base: Box::new(base),
        hival,
        lookup_table,
    })
}

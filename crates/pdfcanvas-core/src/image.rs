//! Image handles delivered with image render events.
//!
//! The processor never decodes image data: an [`ImageHandle`] carries the
//! bytes exactly as stored (still filter-encoded) plus the dictionary
//! entries a consumer needs to decode them.

/// PDF stream filter used to encode image data.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ImageFilter {
    /// JPEG compression (DCTDecode).
    DCTDecode,
    /// Flate (zlib/deflate) compression.
    FlateDecode,
    /// CCITT fax compression (Group 3 or 4).
    CCITTFaxDecode,
    /// JBIG2 compression.
    JBIG2Decode,
    /// JPEG 2000 compression (JPXDecode).
    JPXDecode,
    /// LZW compression.
    LZWDecode,
    /// Run-length encoding.
    RunLengthDecode,
    ASCIIHexDecode,
    ASCII85Decode,
    /// No filter (or one this crate does not recognize).
    Raw,
}

impl ImageFilter {
    /// Returns the MIME type for the image data produced by this filter.
    pub fn mime_type(&self) -> &str {
        match self {
            ImageFilter::DCTDecode => "image/jpeg",
            ImageFilter::JPXDecode => "image/jp2",
            ImageFilter::JBIG2Decode => "image/x-jbig2",
            ImageFilter::CCITTFaxDecode => "image/tiff",
            _ => "application/octet-stream",
        }
    }

    /// Parse a filter name, accepting the inline-image abbreviations.
    pub fn from_pdf_name(name: &str) -> Self {
        match expand_filter_name(name) {
            "DCTDecode" => ImageFilter::DCTDecode,
            "FlateDecode" => ImageFilter::FlateDecode,
            "CCITTFaxDecode" => ImageFilter::CCITTFaxDecode,
            "JBIG2Decode" => ImageFilter::JBIG2Decode,
            "JPXDecode" => ImageFilter::JPXDecode,
            "LZWDecode" => ImageFilter::LZWDecode,
            "RunLengthDecode" => ImageFilter::RunLengthDecode,
            "ASCIIHexDecode" => ImageFilter::ASCIIHexDecode,
            "ASCII85Decode" => ImageFilter::ASCII85Decode,
            _ => ImageFilter::Raw,
        }
    }
}

/// Expand an abbreviated inline-image dictionary key (`W` → `Width`).
pub fn expand_key_name(key: &str) -> &str {
    match key {
        "W" => "Width",
        "H" => "Height",
        "BPC" => "BitsPerComponent",
        "CS" => "ColorSpace",
        "F" => "Filter",
        "DP" => "DecodeParms",
        "D" => "Decode",
        "I" => "Interpolate",
        "IM" => "ImageMask",
        "L" => "Length",
        other => other,
    }
}

/// Expand an abbreviated inline-image color space (`RGB` → `DeviceRGB`).
pub fn expand_color_space_name(cs: &str) -> &str {
    match cs {
        "G" => "DeviceGray",
        "RGB" => "DeviceRGB",
        "CMYK" => "DeviceCMYK",
        "I" => "Indexed",
        other => other,
    }
}

/// Expand an abbreviated inline-image filter name (`Fl` → `FlateDecode`).
pub fn expand_filter_name(filter: &str) -> &str {
    match filter {
        "AHx" => "ASCIIHexDecode",
        "A85" => "ASCII85Decode",
        "LZW" => "LZWDecode",
        "Fl" => "FlateDecode",
        "RL" => "RunLengthDecode",
        "CCF" => "CCITTFaxDecode",
        "DCT" => "DCTDecode",
        other => other,
    }
}

/// An image as painted by `Do` or an inline `BI … EI` sequence.
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ImageHandle {
    /// XObject resource name, `None` for inline images.
    pub name: Option<String>,
    pub width: u32,
    pub height: u32,
    pub bits_per_component: Option<u32>,
    /// Color space name after abbreviation expansion (`DeviceRGB`,
    /// `ICCBased`, a resource name, ...).
    pub color_space: Option<String>,
    /// Filter chain in application order, full names.
    pub filters: Vec<String>,
    /// `/ImageMask true`: a stencil painted with the fill color.
    pub image_mask: bool,
    /// The stored (still encoded) sample bytes.
    pub data: Vec<u8>,
    /// `/SMask` soft-mask image, if any.
    pub soft_mask: Option<Box<ImageHandle>>,
    pub is_inline: bool,
}

impl ImageHandle {
    /// First filter of the chain, [`ImageFilter::Raw`] when unfiltered.
    pub fn primary_filter(&self) -> ImageFilter {
        self.filters
            .first()
            .map_or(ImageFilter::Raw, |f| ImageFilter::from_pdf_name(f))
    }

    /// Number of color components implied by a device color space.
    pub fn components(&self) -> Option<u32> {
        if self.image_mask {
            return Some(1);
        }
        match self.color_space.as_deref()? {
            "DeviceGray" | "CalGray" => Some(1),
            "DeviceRGB" | "CalRGB" | "Lab" => Some(3),
            "DeviceCMYK" => Some(4),
            "Indexed" => Some(1),
            _ => None,
        }
    }

    /// Byte length of unfiltered sample data, when it can be computed.
    pub fn expected_raw_len(&self) -> Option<usize> {
        let bpc = if self.image_mask {
            1
        } else {
            self.bits_per_component?
        };
        let components = self.components()?;
        let row_bits = u64::from(self.width)
            .checked_mul(u64::from(components))?
            .checked_mul(u64::from(bpc))?;
        let len = row_bits.div_ceil(8).checked_mul(u64::from(self.height))?;
        usize::try_from(len).ok()
    }
}

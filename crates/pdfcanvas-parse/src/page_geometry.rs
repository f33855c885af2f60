//! Page coordinate setup: MediaBox, CropBox and `/Rotate` folded into the
//! initial CTM handed to the processor.
//!
//! Two target spaces are supported. Without a flip the result keeps the PDF
//! convention (origin at the lower-left corner of the visible area, y up);
//! with a flip the origin moves to the top-left corner and y grows
//! downward, which is what raster and SVG consumers expect.

use pdfcanvas_core::{BBox, Matrix};

/// Visible page area and orientation.
///
/// # Coordinate pipeline
///
/// 1. Offset from the MediaBox origin
/// 2. Rotate by `/Rotate` (0°/90°/180°/270° clockwise)
/// 3. Offset by the CropBox position in rotated space
/// 4. Optional y-flip to a top-left origin
///
/// # Example
///
/// ```
/// use pdfcanvas_core::BBox;
/// use pdfcanvas_parse::page_geometry::PageGeometry;
///
/// let geo = PageGeometry::new(BBox::new(0.0, 0.0, 612.0, 792.0), None, 0);
/// let ctm = geo.initial_ctm(true);
/// let p = ctm.transform_point(pdfcanvas_core::Point::new(72.0, 720.0));
/// assert!((p.y - 72.0).abs() < 1e-9);
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageGeometry {
    rotation: i32,
    media_x0: f64,
    media_y0: f64,
    native_width: f64,
    native_height: f64,
    crop_rx0: f64,
    crop_ry0: f64,
    display_width: f64,
    display_height: f64,
}

impl PageGeometry {
    /// `rotation` is normalized to 0, 90, 180 or 270; other multiples of 90
    /// wrap, anything else is treated as 0.
    pub fn new(media_box: BBox, crop_box: Option<BBox>, rotation: i32) -> Self {
        let rotation = match rotation.rem_euclid(360) {
            r @ (90 | 180 | 270) => r,
            _ => 0,
        };

        let media_x0 = media_box.x0;
        let media_y0 = media_box.y0;
        let native_width = media_box.width();
        let native_height = media_box.height();

        let crop = crop_box.unwrap_or(media_box);
        let cx0 = crop.x0 - media_x0;
        let cy0 = crop.y0 - media_y0;
        let cx1 = crop.x1 - media_x0;
        let cy1 = crop.y1 - media_y0;

        let (crop_rx0, crop_ry0, crop_rx1, crop_ry1) = match rotation {
            90 => (cy0, native_width - cx1, cy1, native_width - cx0),
            180 => (
                native_width - cx1,
                native_height - cy1,
                native_width - cx0,
                native_height - cy0,
            ),
            270 => (native_height - cy1, cx0, native_height - cy0, cx1),
            _ => (cx0, cy0, cx1, cy1),
        };

        Self {
            rotation,
            media_x0,
            media_y0,
            native_width,
            native_height,
            crop_rx0,
            crop_ry0,
            display_width: crop_rx1 - crop_rx0,
            display_height: crop_ry1 - crop_ry0,
        }
    }

    /// Visible width after rotation and cropping.
    pub fn width(&self) -> f64 {
        self.display_width
    }

    /// Visible height after rotation and cropping.
    pub fn height(&self) -> f64 {
        self.display_height
    }

    pub fn rotation(&self) -> i32 {
        self.rotation
    }

    /// The matrix mapping default user space to the display space.
    pub fn initial_ctm(&self, flip_y: bool) -> Matrix {
        let to_origin = Matrix::translation(-self.media_x0, -self.media_y0);
        let rotate = match self.rotation {
            90 => Matrix::new(0.0, -1.0, 1.0, 0.0, 0.0, self.native_width),
            180 => Matrix::new(-1.0, 0.0, 0.0, -1.0, self.native_width, self.native_height),
            270 => Matrix::new(0.0, 1.0, -1.0, 0.0, self.native_height, 0.0),
            _ => Matrix::identity(),
        };
        let crop = Matrix::translation(-self.crop_rx0, -self.crop_ry0);
        let ctm = to_origin.multiply(&rotate).multiply(&crop);
        if flip_y {
            ctm.multiply(&Matrix::new(1.0, 0.0, 0.0, -1.0, 0.0, self.display_height))
        } else {
            ctm
        }
    }

    /// Map a point from PDF space to top-left display space.
    pub fn normalize_point(&self, x: f64, y: f64) -> (f64, f64) {
        let p = self
            .initial_ctm(true)
            .transform_point(pdfcanvas_core::Point::new(x, y));
        (p.x, p.y)
    }
}

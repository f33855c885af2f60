//! Geometry kernel: affine matrices, homogeneous vectors and line segments.
//!
//! All types use the PDF coordinate convention (origin bottom-left, y up).
//! Matrices are the six-number form `[a b c d e f]` of the 3×3 matrix
//!
//! ```text
//! | a b 0 |
//! | c d 0 |
//! | e f 1 |
//! ```
//!
//! and points are treated as row vectors, so `p' = p × M`.

use std::ops::Mul;

/// A 2D point.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Euclidean distance to another point.
    pub fn distance_to(&self, other: Point) -> f64 {
        ((other.x - self.x).powi(2) + (other.y - self.y).powi(2)).sqrt()
    }
}

/// Affine transformation matrix `[a b c d e f]`.
///
/// `m1.multiply(&m2)` yields the transform that applies `m1` first and
/// `m2` second. The `*` operator has the same meaning.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Matrix {
    pub a: f64,
    pub b: f64,
    pub c: f64,
    pub d: f64,
    pub e: f64,
    pub f: f64,
}

impl Default for Matrix {
    fn default() -> Self {
        Self::identity()
    }
}

impl Matrix {
    pub fn new(a: f64, b: f64, c: f64, d: f64, e: f64, f: f64) -> Self {
        Self { a, b, c, d, e, f }
    }

    /// The identity transform.
    pub fn identity() -> Self {
        Self::new(1.0, 0.0, 0.0, 1.0, 0.0, 0.0)
    }

    /// A pure translation by `(tx, ty)`.
    pub fn translation(tx: f64, ty: f64) -> Self {
        Self::new(1.0, 0.0, 0.0, 1.0, tx, ty)
    }

    /// A pure scale by `(sx, sy)`.
    pub fn scaling(sx: f64, sy: f64) -> Self {
        Self::new(sx, 0.0, 0.0, sy, 0.0, 0.0)
    }

    pub fn from_array(values: [f64; 6]) -> Self {
        Self::new(
            values[0], values[1], values[2], values[3], values[4], values[5],
        )
    }

    pub fn to_array(&self) -> [f64; 6] {
        [self.a, self.b, self.c, self.d, self.e, self.f]
    }

    /// Compose two transforms: `self` is applied first, then `other`.
    pub fn multiply(&self, other: &Matrix) -> Matrix {
        Matrix {
            a: self.a * other.a + self.b * other.c,
            b: self.a * other.b + self.b * other.d,
            c: self.c * other.a + self.d * other.c,
            d: self.c * other.b + self.d * other.d,
            e: self.e * other.a + self.f * other.c + other.e,
            f: self.e * other.b + self.f * other.d + other.f,
        }
    }

    /// Map a point through this transform.
    pub fn transform_point(&self, p: Point) -> Point {
        Point {
            x: self.a * p.x + self.c * p.y + self.e,
            y: self.b * p.x + self.d * p.y + self.f,
        }
    }

    /// Map a displacement (ignores the translation part).
    pub fn transform_delta(&self, dx: f64, dy: f64) -> (f64, f64) {
        (self.a * dx + self.c * dy, self.b * dx + self.d * dy)
    }

    pub fn determinant(&self) -> f64 {
        self.a * self.d - self.b * self.c
    }

    /// Inverse transform, or `None` when the matrix is singular.
    pub fn inverse(&self) -> Option<Matrix> {
        let det = self.determinant();
        if det.abs() < f64::EPSILON {
            return None;
        }
        let a = self.d / det;
        let b = -self.b / det;
        let c = -self.c / det;
        let d = self.a / det;
        Some(Matrix {
            a,
            b,
            c,
            d,
            e: -(self.e * a + self.f * c),
            f: -(self.e * b + self.f * d),
        })
    }

    pub fn is_identity(&self) -> bool {
        *self == Matrix::identity()
    }
}

impl Mul for Matrix {
    type Output = Matrix;

    fn mul(self, rhs: Matrix) -> Matrix {
        self.multiply(&rhs)
    }
}

/// Homogeneous 2D vector `(x, y, w)`.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Vector {
    pub x: f64,
    pub y: f64,
    pub w: f64,
}

impl Vector {
    pub fn new(x: f64, y: f64, w: f64) -> Self {
        Self { x, y, w }
    }

    /// A position vector (`w = 1`).
    pub fn point(x: f64, y: f64) -> Self {
        Self::new(x, y, 1.0)
    }

    /// Multiply this row vector by a matrix.
    ///
    /// With `w = 1` this is a point transform; with `w = 0` only the
    /// linear part of the matrix applies.
    pub fn cross(&self, m: &Matrix) -> Vector {
        Vector {
            x: self.x * m.a + self.y * m.c + self.w * m.e,
            y: self.x * m.b + self.y * m.d + self.w * m.f,
            w: self.w,
        }
    }

    pub fn subtract(&self, other: &Vector) -> Vector {
        Vector::new(self.x - other.x, self.y - other.y, self.w - other.w)
    }

    pub fn add(&self, other: &Vector) -> Vector {
        Vector::new(self.x + other.x, self.y + other.y, self.w + other.w)
    }

    pub fn multiply(&self, by: f64) -> Vector {
        Vector::new(self.x * by, self.y * by, self.w * by)
    }

    /// Dot product over all three components.
    pub fn dot(&self, other: &Vector) -> f64 {
        self.x * other.x + self.y * other.y + self.w * other.w
    }

    pub fn length_squared(&self) -> f64 {
        self.x * self.x + self.y * self.y + self.w * self.w
    }

    pub fn length(&self) -> f64 {
        self.length_squared().sqrt()
    }

    /// Unit vector in the same direction. A zero vector is returned unchanged.
    pub fn normalize(&self) -> Vector {
        let len = self.length();
        if len == 0.0 {
            return *self;
        }
        self.multiply(1.0 / len)
    }

    pub fn to_point(&self) -> Point {
        Point::new(self.x, self.y)
    }
}

/// A directed segment between two position vectors.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct LineSegment {
    pub start: Vector,
    pub end: Vector,
}

impl LineSegment {
    pub fn new(start: Vector, end: Vector) -> Self {
        Self { start, end }
    }

    pub fn length(&self) -> f64 {
        self.end.subtract(&self.start).length()
    }

    /// Map both endpoints through `m`.
    pub fn transform_by(&self, m: &Matrix) -> LineSegment {
        LineSegment {
            start: self.start.cross(m),
            end: self.end.cross(m),
        }
    }

    /// Axis-aligned rectangle spanned by the two endpoints.
    pub fn bounding_box(&self) -> BBox {
        BBox::from_points(&[self.start.to_point(), self.end.to_point()])
            .unwrap_or_default()
    }
}

/// Axis-aligned rectangle in PDF user space (`y0` is the lower edge).
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct BBox {
    pub x0: f64,
    pub y0: f64,
    pub x1: f64,
    pub y1: f64,
}

impl BBox {
    /// Create a box, normalizing the corners so that `x0 <= x1` and `y0 <= y1`.
    pub fn new(x0: f64, y0: f64, x1: f64, y1: f64) -> Self {
        Self {
            x0: x0.min(x1),
            y0: y0.min(y1),
            x1: x0.max(x1),
            y1: y0.max(y1),
        }
    }

    /// Smallest box containing all `points`, or `None` for an empty slice.
    pub fn from_points(points: &[Point]) -> Option<BBox> {
        let first = points.first()?;
        let mut bbox = BBox {
            x0: first.x,
            y0: first.y,
            x1: first.x,
            y1: first.y,
        };
        for p in &points[1..] {
            bbox.x0 = bbox.x0.min(p.x);
            bbox.y0 = bbox.y0.min(p.y);
            bbox.x1 = bbox.x1.max(p.x);
            bbox.y1 = bbox.y1.max(p.y);
        }
        Some(bbox)
    }

    pub fn width(&self) -> f64 {
        self.x1 - self.x0
    }

    pub fn height(&self) -> f64 {
        self.y1 - self.y0
    }

    pub fn union(&self, other: &BBox) -> BBox {
        BBox {
            x0: self.x0.min(other.x0),
            y0: self.y0.min(other.y0),
            x1: self.x1.max(other.x1),
            y1: self.y1.max(other.y1),
        }
    }

    /// Transform all four corners and return their bounding box.
    pub fn transform(&self, m: &Matrix) -> BBox {
        let corners = [
            m.transform_point(Point::new(self.x0, self.y0)),
            m.transform_point(Point::new(self.x1, self.y0)),
            m.transform_point(Point::new(self.x1, self.y1)),
            m.transform_point(Point::new(self.x0, self.y1)),
        ];
        BBox::from_points(&corners).unwrap_or_default()
    }
}

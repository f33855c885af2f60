//! Path model built from the construction operators `m l c v y h re`.
//!
//! Coordinates are stored exactly as they appear in the operands (user space
//! at the time of construction). The CTM captured when the path is painted
//! travels alongside the path; apply it with [`Path::transform`].

use crate::geometry::{BBox, Matrix, Point};

/// A single drawn segment of a subpath.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Segment {
    Line { from: Point, to: Point },
    /// Cubic Bezier: start, two control points, end.
    Bezier { points: [Point; 4] },
}

impl Segment {
    pub fn start(&self) -> Point {
        match self {
            Segment::Line { from, .. } => *from,
            Segment::Bezier { points } => points[0],
        }
    }

    pub fn end(&self) -> Point {
        match self {
            Segment::Line { to, .. } => *to,
            Segment::Bezier { points } => points[3],
        }
    }

    pub fn transform(&self, m: &Matrix) -> Segment {
        match self {
            Segment::Line { from, to } => Segment::Line {
                from: m.transform_point(*from),
                to: m.transform_point(*to),
            },
            Segment::Bezier { points } => Segment::Bezier {
                points: points.map(|p| m.transform_point(p)),
            },
        }
    }

    fn control_points(&self) -> Vec<Point> {
        match self {
            Segment::Line { from, to } => vec![*from, *to],
            Segment::Bezier { points } => points.to_vec(),
        }
    }
}

/// A connected run of segments beginning at `start_point`.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Subpath {
    start_point: Point,
    segments: Vec<Segment>,
    closed: bool,
    /// `h` appended a line back to the start point.
    synthetic_close: bool,
}

impl Subpath {
    pub fn new(start_point: Point) -> Self {
        Self {
            start_point,
            segments: Vec::new(),
            closed: false,
            synthetic_close: false,
        }
    }

    pub fn start_point(&self) -> Point {
        self.start_point
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// A subpath made of a lone `m` with nothing drawn from it.
    pub fn is_degenerate(&self) -> bool {
        self.segments.is_empty()
    }

    /// End point of the last segment, or the start point when empty.
    pub fn last_point(&self) -> Point {
        self.segments
            .last()
            .map(Segment::end)
            .unwrap_or(self.start_point)
    }

    /// The vertex list: the start point followed by every segment end point.
    ///
    /// The end point of the line added by `h` is omitted since it repeats the
    /// start point.
    pub fn points(&self) -> Vec<Point> {
        let mut points = Vec::with_capacity(self.segments.len() + 1);
        points.push(self.start_point);
        let drawn = if self.synthetic_close {
            &self.segments[..self.segments.len() - 1]
        } else {
            &self.segments[..]
        };
        points.extend(drawn.iter().map(Segment::end));
        points
    }

    pub fn transform(&self, m: &Matrix) -> Subpath {
        Subpath {
            start_point: m.transform_point(self.start_point),
            segments: self.segments.iter().map(|s| s.transform(m)).collect(),
            closed: self.closed,
            synthetic_close: self.synthetic_close,
        }
    }

    fn push(&mut self, segment: Segment) {
        self.segments.push(segment);
    }

    fn close(&mut self) {
        if self.closed {
            return;
        }
        let last = self.last_point();
        if last != self.start_point {
            self.segments.push(Segment::Line {
                from: last,
                to: self.start_point,
            });
            self.synthetic_close = true;
        }
        self.closed = true;
    }
}

/// An ordered list of subpaths.
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Path {
    subpaths: Vec<Subpath>,
    current_point: Option<Point>,
}

impl Path {
    pub fn subpaths(&self) -> &[Subpath] {
        &self.subpaths
    }

    pub fn current_point(&self) -> Option<Point> {
        self.current_point
    }

    pub fn is_empty(&self) -> bool {
        self.subpaths.is_empty()
    }

    /// Map every subpath through `m` (usually the CTM captured at paint time).
    pub fn transform(&self, m: &Matrix) -> Path {
        Path {
            subpaths: self.subpaths.iter().map(|s| s.transform(m)).collect(),
            current_point: self.current_point.map(|p| m.transform_point(p)),
        }
    }

    /// Bounding box of all vertices and Bezier control points.
    pub fn bounding_box(&self) -> Option<BBox> {
        let points: Vec<Point> = self
            .subpaths
            .iter()
            .flat_map(|s| {
                std::iter::once(s.start_point)
                    .chain(s.segments.iter().flat_map(Segment::control_points))
            })
            .collect();
        BBox::from_points(&points)
    }
}

/// Incremental path construction.
///
/// Operators that need a current point (`l c v y h`) are ignored when there
/// is none; their methods return `false` in that case.
#[derive(Debug, Clone, Default)]
pub struct PathBuilder {
    path: Path,
}

impl PathBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.path.is_empty()
    }

    pub fn current_point(&self) -> Option<Point> {
        self.path.current_point
    }

    /// `m`: begin a new subpath at `(x, y)`.
    ///
    /// A preceding subpath that is still degenerate is replaced rather than
    /// kept as a stray point.
    pub fn move_to(&mut self, x: f64, y: f64) {
        let p = Point::new(x, y);
        match self.path.subpaths.last_mut() {
            Some(last) if last.is_degenerate() && !last.closed => last.start_point = p,
            _ => self.path.subpaths.push(Subpath::new(p)),
        }
        self.path.current_point = Some(p);
    }

    /// `l`: straight line to `(x, y)`.
    pub fn line_to(&mut self, x: f64, y: f64) -> bool {
        let to = Point::new(x, y);
        self.append(|from| Segment::Line { from, to })
    }

    /// `c`: cubic Bezier with both control points given.
    pub fn curve_to(&mut self, x1: f64, y1: f64, x2: f64, y2: f64, x3: f64, y3: f64) -> bool {
        let (cp1, cp2, end) = (Point::new(x1, y1), Point::new(x2, y2), Point::new(x3, y3));
        self.append(|from| Segment::Bezier {
            points: [from, cp1, cp2, end],
        })
    }

    /// `v`: the first control point coincides with the current point.
    pub fn curve_to_v(&mut self, x2: f64, y2: f64, x3: f64, y3: f64) -> bool {
        let (cp2, end) = (Point::new(x2, y2), Point::new(x3, y3));
        self.append(|from| Segment::Bezier {
            points: [from, from, cp2, end],
        })
    }

    /// `y`: the second control point coincides with the end point.
    pub fn curve_to_y(&mut self, x1: f64, y1: f64, x3: f64, y3: f64) -> bool {
        let (cp1, end) = (Point::new(x1, y1), Point::new(x3, y3));
        self.append(|from| Segment::Bezier {
            points: [from, cp1, end, end],
        })
    }

    /// `h`: close the current subpath with a line back to its start.
    pub fn close_path(&mut self) -> bool {
        let Some(last) = self.path.subpaths.last_mut() else {
            return false;
        };
        if self.path.current_point.is_none() {
            return false;
        }
        last.close();
        self.path.current_point = Some(last.start_point);
        true
    }

    /// `re`: move + three lines + close.
    pub fn rectangle(&mut self, x: f64, y: f64, width: f64, height: f64) {
        self.move_to(x, y);
        self.line_to(x + width, y);
        self.line_to(x + width, y + height);
        self.line_to(x, y + height);
        self.close_path();
    }

    /// Return the accumulated path and reset the builder.
    pub fn take(&mut self) -> Path {
        std::mem::take(&mut self.path)
    }

    fn append(&mut self, make: impl FnOnce(Point) -> Segment) -> bool {
        let Some(from) = self.path.current_point else {
            return false;
        };
        let segment = make(from);
        let end = segment.end();
        let reopen = self
            .path
            .subpaths
            .last()
            .is_none_or(|last| last.closed);
        if reopen {
            self.path.subpaths.push(Subpath::new(from));
        }
        if let Some(current) = self.path.subpaths.last_mut() {
            current.push(segment);
        }
        self.path.current_point = Some(end);
        true
    }
}

use serde::{Deserialize, Serialize};

use crate::{Result, SketchError};

/// Control points sit one sixth of the neighbour span away from each sample.
const TENSION_DIVISOR: f64 = 6.0;

/// A single pointer sample in canvas-pixel space.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Validates a sample coming from the input-capture boundary.
    pub fn try_new(x: f64, y: f64) -> Result<Self> {
        if !x.is_finite() || !y.is_finite() {
            return Err(SketchError::InvalidGeometry(
                "sample coordinates must be finite",
            ));
        }
        Ok(Self { x, y })
    }

    fn offset(self, dx: f64, dy: f64) -> Self {
        Self::new(self.x + dx, self.y + dy)
    }
}

/// One cubic Bézier piece between two consecutive samples.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CubicSegment {
    pub start: Point,
    pub control1: Point,
    pub control2: Point,
    pub end: Point,
}

impl CubicSegment {
    /// Evaluates the segment at `t` in `[0, 1]`.
    pub fn point_at(&self, t: f64) -> Point {
        let t = t.clamp(0.0, 1.0);
        let u = 1.0 - t;
        let (a, b, c, d) = (u * u * u, 3.0 * u * u * t, 3.0 * u * t * t, t * t * t);
        Point::new(
            a * self.start.x + b * self.control1.x + c * self.control2.x + d * self.end.x,
            a * self.start.y + b * self.control1.y + c * self.control2.y + d * self.end.y,
        )
    }
}

/// Renderable description of a stroke.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Curve {
    /// A stroke with a single sample is drawn as a dot.
    Dot(Point),
    Line(Point, Point),
    Path(Vec<CubicSegment>),
}

/// Drawing instruction emitted towards a rendering surface.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PathCommand {
    Dot(Point),
    MoveTo(Point),
    LineTo(Point),
    CubicTo {
        control1: Point,
        control2: Point,
        end: Point,
    },
}

impl Curve {
    /// Flattens the curve into drawing commands. Every cubic piece starts with
    /// its own `MoveTo` so segments can be painted independently.
    pub fn segments(&self) -> Vec<PathCommand> {
        match self {
            Curve::Dot(point) => vec![PathCommand::Dot(*point)],
            Curve::Line(from, to) => vec![PathCommand::MoveTo(*from), PathCommand::LineTo(*to)],
            Curve::Path(segments) => segments
                .iter()
                .flat_map(|segment| {
                    [
                        PathCommand::MoveTo(segment.start),
                        PathCommand::CubicTo {
                            control1: segment.control1,
                            control2: segment.control2,
                            end: segment.end,
                        },
                    ]
                })
                .collect(),
        }
    }

    /// Points the curve passes through, in drawing order.
    pub fn anchors(&self) -> Vec<Point> {
        match self {
            Curve::Dot(point) => vec![*point],
            Curve::Line(from, to) => vec![*from, *to],
            Curve::Path(segments) => {
                let mut anchors = Vec::with_capacity(segments.len() + 1);
                if let Some(first) = segments.first() {
                    anchors.push(first.start);
                }
                anchors.extend(segments.iter().map(|segment| segment.end));
                anchors
            }
        }
    }
}

/// Turns an ordered run of raw samples into a smooth curve that passes through
/// every sample.
pub fn smooth(points: &[Point]) -> Result<Curve> {
    match points {
        [] => Err(SketchError::InvalidGeometry(
            "cannot smooth an empty point sequence",
        )),
        [only] => Ok(Curve::Dot(*only)),
        [from, to] => Ok(Curve::Line(*from, *to)),
        _ => {
            let last = points.len() - 1;
            let segments = (0..last)
                .map(|i| {
                    let p0 = points[i.saturating_sub(1)];
                    let p1 = points[i];
                    let p2 = points[i + 1];
                    let p3 = points[(i + 2).min(last)];

                    CubicSegment {
                        start: p1,
                        control1: p1.offset(
                            (p2.x - p0.x) / TENSION_DIVISOR,
                            (p2.y - p0.y) / TENSION_DIVISOR,
                        ),
                        control2: p2.offset(
                            -(p3.x - p1.x) / TENSION_DIVISOR,
                            -(p3.y - p1.y) / TENSION_DIVISOR,
                        ),
                        end: p2,
                    }
                })
                .collect();
            Ok(Curve::Path(segments))
        }
    }
}

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{geometry, Curve, Point, Result, SketchError};

/// Colour tag attached to a stroke. Any CSS colour name or hex string.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Color(String);

impl Color {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Color {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TrackId(pub u64);

impl fmt::Display for TrackId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrackMode {
    #[default]
    Default,
}

/// A finished gesture. Never empty and never modified after creation.
#[derive(Debug, Clone, PartialEq)]
pub struct Stroke {
    color: Color,
    points: Vec<Point>,
}

impl Stroke {
    /// Builds a frozen stroke from already captured samples.
    pub fn new(color: Color, points: Vec<Point>) -> Result<Self> {
        if points.is_empty() {
            return Err(SketchError::InvalidGeometry(
                "a stroke needs at least one point",
            ));
        }
        Ok(Self { color, points })
    }

    pub fn color(&self) -> &Color {
        &self.color
    }

    pub fn points(&self) -> &[Point] {
        &self.points
    }

    pub fn curve(&self) -> Result<Curve> {
        geometry::smooth(&self.points)
    }
}

/// A gesture that is still being drawn. Points can only be appended.
#[derive(Debug, Clone)]
pub struct ActiveStroke {
    track: TrackId,
    color: Color,
    points: Vec<Point>,
}

impl ActiveStroke {
    pub fn begin(track: TrackId, color: Color, first: Point) -> Self {
        Self {
            track,
            color,
            points: vec![first],
        }
    }

    pub fn track(&self) -> TrackId {
        self.track
    }

    pub fn color(&self) -> &Color {
        &self.color
    }

    pub fn points(&self) -> &[Point] {
        &self.points
    }

    pub fn push(&mut self, point: Point) {
        self.points.push(point);
    }

    /// Smoothed preview of the gesture so far.
    pub fn curve(&self) -> Result<Curve> {
        geometry::smooth(&self.points)
    }

    pub fn finish(self) -> Stroke {
        Stroke {
            color: self.color,
            points: self.points,
        }
    }
}

/// An independent drawing layer with its own strokes.
#[derive(Debug, Clone)]
pub struct Track {
    pub id: TrackId,
    pub base_color: Color,
    pub mode: TrackMode,
    strokes: Vec<Stroke>,
}

impl Track {
    pub fn new(id: TrackId, base_color: Color) -> Self {
        Self {
            id,
            base_color,
            mode: TrackMode::default(),
            strokes: Vec::new(),
        }
    }

    /// Strokes in creation order, which is also the painting order.
    pub fn strokes(&self) -> &[Stroke] {
        &self.strokes
    }

    pub fn push_stroke(&mut self, stroke: Stroke) {
        self.strokes.push(stroke);
    }

    pub fn is_empty(&self) -> bool {
        self.strokes.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn active_stroke_freezes_points_and_color() {
        let mut active = ActiveStroke::begin(TrackId(3), Color::from("blue"), Point::new(1.0, 2.0));
        active.push(Point::new(3.0, 4.0));
        active.push(Point::new(5.0, 6.0));

        let stroke = active.finish();
        assert_eq!(stroke.color().as_str(), "blue");
        assert_eq!(
            stroke.points(),
            &[Point::new(1.0, 2.0), Point::new(3.0, 4.0), Point::new(5.0, 6.0)]
        );
    }

    #[test]
    fn frozen_strokes_cannot_be_empty() {
        assert!(Stroke::new(Color::from("red"), Vec::new()).is_err());
    }

    #[test]
    fn new_tracks_start_empty_in_default_mode() {
        let track = Track::new(TrackId(7), Color::from("green"));
        assert!(track.is_empty());
        assert_eq!(track.mode, TrackMode::Default);
        assert_eq!(track.base_color, Color::from("green"));
    }

    #[test]
    fn colors_and_modes_serialize_as_plain_strings() {
        let json = serde_json::to_string(&(Color::from("orange"), TrackMode::Default)).unwrap();
        assert_eq!(json, r#"["orange","default"]"#);
    }
}

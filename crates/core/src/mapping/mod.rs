use serde::{Deserialize, Serialize};

use crate::{Point, Result, SketchError, Track};

/// Lowest pitch produced by a sample at the bottom edge of the canvas.
pub const BASE_FREQUENCY_HZ: f64 = 100.0;
/// Duration given to the final event of a stroke, which has no successor.
pub const DEFAULT_NOTE_DURATION: f64 = 0.1;

/// A single sound trigger derived from stroke geometry.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AudioEvent {
    /// Seconds from the start of the transport.
    pub onset_time: f64,
    pub frequency: f64,
    /// Seconds.
    pub duration: f64,
}

/// Reference drawing area the samples were captured in.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CanvasExtent {
    pub width: f64,
    pub height: f64,
}

impl CanvasExtent {
    pub const fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }
}

/// Describes how stroke geometry is routed to onset, pitch and duration.
///
/// Horizontal position maps linearly onto the transport timeline scaled by
/// `bpm / 60`. Vertical position is inverted so the top of the canvas sounds
/// highest, offset by [`BASE_FREQUENCY_HZ`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SoundMapping {
    pub extent: CanvasExtent,
    pub bpm: f64,
    pub default_duration: f64,
}

impl SoundMapping {
    pub fn new(extent: CanvasExtent, bpm: f64) -> Self {
        Self {
            extent,
            bpm,
            default_duration: DEFAULT_NOTE_DURATION,
        }
    }

    pub fn with_default_duration(mut self, seconds: f64) -> Self {
        self.default_duration = seconds;
        self
    }

    fn validate(&self) -> Result<()> {
        let positive = |value: f64| value.is_finite() && value > 0.0;
        if !positive(self.extent.width) || !positive(self.extent.height) {
            return Err(SketchError::InvalidGeometry(
                "canvas extent must be positive and finite",
            ));
        }
        if !positive(self.bpm) {
            return Err(SketchError::InvalidGeometry(
                "tempo must be positive and finite",
            ));
        }
        if !self.default_duration.is_finite() || self.default_duration < 0.0 {
            return Err(SketchError::InvalidGeometry(
                "default duration must be a non-negative number of seconds",
            ));
        }
        Ok(())
    }

    fn onset(&self, point: &Point) -> f64 {
        ((point.x / self.extent.width) * (self.bpm / 60.0)).max(0.0)
    }

    fn frequency(&self, point: &Point) -> f64 {
        BASE_FREQUENCY_HZ + (self.extent.height - point.y)
    }

    /// Maps one stroke's samples into events ordered by onset.
    ///
    /// Each event lasts until the next onset in time order and the latest
    /// one gets the default duration. For strokes drawn right-to-left this
    /// means durations follow playback order, not drawing order.
    pub fn map_points(&self, points: &[Point]) -> Result<Vec<AudioEvent>> {
        if points.is_empty() {
            return Err(SketchError::InvalidGeometry(
                "cannot map an empty point sequence to sound",
            ));
        }
        self.validate()?;

        let mut timed: Vec<(f64, f64)> = points
            .iter()
            .map(|point| (self.onset(point), self.frequency(point)))
            .collect();
        timed.sort_by(|a, b| a.0.total_cmp(&b.0));

        let events: Vec<AudioEvent> = timed
            .iter()
            .enumerate()
            .map(|(i, &(onset_time, frequency))| AudioEvent {
                onset_time,
                frequency,
                duration: match timed.get(i + 1) {
                    Some(&(next, _)) => next - onset_time,
                    None => self.default_duration,
                },
            })
            .collect();
        Ok(events)
    }

    /// Maps every stroke of a track and merges the result by onset. Strokes are
    /// kept in creation order when onsets tie.
    pub fn map_track(&self, track: &Track) -> Result<Vec<AudioEvent>> {
        let mut events = Vec::new();
        for stroke in track.strokes() {
            events.extend(self.map_points(stroke.points())?);
        }
        events.sort_by(|a, b| a.onset_time.total_cmp(&b.onset_time));

        tracing::debug!(
            track = %track.id,
            strokes = track.strokes().len(),
            events = events.len(),
            "mapped track to audio events"
        );
        Ok(events)
    }
}

/// Convenience wrapper around [`SoundMapping::map_points`] using the default
/// note duration.
pub fn map_stroke(points: &[Point], extent: CanvasExtent, bpm: f64) -> Result<Vec<AudioEvent>> {
    SoundMapping::new(extent, bpm).map_points(points)
}

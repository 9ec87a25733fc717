//! Core library for the Sketch Sequencer.
//!
//! Freehand strokes are smoothed into cubic curves for display and mapped onto
//! a shared transport as timed audio triggers. Each module owns one stage of
//! that pipeline: geometry smoothing, sound mapping, transport scheduling,
//! and the track/session model that ties them together. Rendering surfaces,
//! persistence and the synthesis engine are reached through traits so hosts
//! can plug in their own backends.

pub mod audio;
pub mod config;
pub mod error;
pub mod geometry;
pub mod mapping;
pub mod persist;
pub mod render;
pub mod session;
pub mod timeline;
pub mod track;

pub use audio::{OfflineSynth, SynthEngine};
pub use config::{AppConfig, CanvasConfig, PaletteConfig, TransportConfig};
pub use error::{Result, SketchError};
pub use geometry::{smooth, CubicSegment, Curve, PathCommand, Point};
pub use mapping::{
    map_stroke, AudioEvent, CanvasExtent, SoundMapping, BASE_FREQUENCY_HZ, DEFAULT_NOTE_DURATION,
};
pub use persist::{DrawingStore, JsonFileStore, SavedDrawing, SavedStroke};
pub use render::{render_curve, render_track, RenderSurface, SvgSurface};
pub use session::Session;
pub use timeline::{PlaybackClock, Schedule, Transport, TransportStatus};
pub use track::{ActiveStroke, Color, Stroke, Track, TrackId, TrackMode};

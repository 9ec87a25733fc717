use std::{fs, path::Path};

use serde::{Deserialize, Serialize};

use crate::{CanvasExtent, Color, Result, SoundMapping, DEFAULT_NOTE_DURATION};

/// Top-level configuration structure for the application.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub canvas: CanvasConfig,
    pub transport: TransportConfig,
    pub palette: PaletteConfig,
}

impl AppConfig {
    /// Reads a JSON configuration file. Missing sections fall back to their
    /// defaults.
    pub fn load(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)?;
        let config = serde_json::from_str(&raw)?;
        tracing::debug!(?path, "loaded configuration");
        Ok(config)
    }

    pub fn mapping(&self) -> SoundMapping {
        SoundMapping::new(
            CanvasExtent::new(self.canvas.width, self.canvas.height),
            self.transport.bpm,
        )
        .with_default_duration(self.transport.default_duration)
    }
}

/// Size of the drawing surface in pixels.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CanvasConfig {
    pub width: f64,
    pub height: f64,
}

impl Default for CanvasConfig {
    fn default() -> Self {
        Self {
            width: 800.0,
            height: 600.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TransportConfig {
    pub bpm: f64,
    /// Seconds given to the last event of every stroke.
    pub default_duration: f64,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            bpm: 120.0,
            default_duration: DEFAULT_NOTE_DURATION,
        }
    }
}

/// Colours offered to the user and the one selected at start-up.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PaletteConfig {
    pub colors: Vec<Color>,
    pub default: Color,
}

impl Default for PaletteConfig {
    fn default() -> Self {
        Self {
            colors: ["red", "green", "blue", "orange", "purple", "yellow"]
                .into_iter()
                .map(Color::from)
                .collect(),
            default: Color::from("red"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_files_keep_defaults() {
        let config: AppConfig = serde_json::from_str(r#"{ "transport": { "bpm": 90 } }"#).unwrap();

        assert_eq!(config.transport.bpm, 90.0);
        assert_eq!(config.transport.default_duration, DEFAULT_NOTE_DURATION);
        assert_eq!(config.canvas.width, 800.0);
        assert_eq!(config.palette.default, Color::from("red"));
        assert_eq!(config.palette.colors.len(), 6);
    }

    #[test]
    fn mapping_reflects_canvas_and_tempo() {
        let mut config = AppConfig::default();
        config.canvas.height = 480.0;
        config.transport.default_duration = 0.25;

        let mapping = config.mapping();
        assert_eq!(mapping.extent, CanvasExtent::new(800.0, 480.0));
        assert_eq!(mapping.bpm, 120.0);
        assert_eq!(mapping.default_duration, 0.25);
    }

    #[test]
    fn missing_files_surface_io_errors() {
        let err = AppConfig::load(Path::new("/definitely/not/here.json")).unwrap_err();
        assert!(matches!(err, crate::SketchError::Io(_)));
    }
}

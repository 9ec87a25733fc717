use std::{
    fs,
    path::{Path, PathBuf},
};

use serde::{Deserialize, Serialize};

use crate::{Color, Point, Result, SketchError, Stroke, Track, TrackId};

/// Wire shape handed to the persistence service for one track.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SavedDrawing {
    pub file_name: String,
    pub drawing_id: String,
    pub track_id: TrackId,
    pub strokes: Vec<SavedStroke>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SavedStroke {
    pub color: Color,
    pub points: Vec<Point>,
}

impl SavedDrawing {
    pub fn from_track(track: &Track) -> Self {
        Self {
            file_name: format!("drawing_{}.json", track.id),
            drawing_id: track.id.to_string(),
            track_id: track.id,
            strokes: track
                .strokes()
                .iter()
                .map(|stroke| SavedStroke {
                    color: stroke.color().clone(),
                    points: stroke.points().to_vec(),
                })
                .collect(),
        }
    }

    /// Rebuilds the strokes, validating every sample on the way in.
    pub fn strokes(&self) -> Result<Vec<Stroke>> {
        self.strokes
            .iter()
            .map(|saved| {
                let points = saved
                    .points
                    .iter()
                    .map(|p| Point::try_new(p.x, p.y))
                    .collect::<Result<Vec<_>>>()?;
                Stroke::new(saved.color.clone(), points)
            })
            .collect()
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// External persistence collaborator. Failures are reported upward, never
/// retried by the caller.
pub trait DrawingStore {
    fn save(&self, drawing: &SavedDrawing) -> Result<()>;
}

/// Stores each drawing as `<dir>/<fileName>`.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    dir: PathBuf,
}

impl JsonFileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn load(path: &Path) -> Result<SavedDrawing> {
        let raw = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&raw)?)
    }
}

impl DrawingStore for JsonFileStore {
    fn save(&self, drawing: &SavedDrawing) -> Result<()> {
        let write = || -> Result<PathBuf> {
            fs::create_dir_all(&self.dir)?;
            let path = self.dir.join(&drawing.file_name);
            fs::write(&path, drawing.to_json()?)?;
            Ok(path)
        };
        let path = write().map_err(|err| SketchError::PersistenceFailure(err.to_string()))?;
        tracing::info!(?path, track = %drawing.track_id, "drawing saved");
        Ok(())
    }
}

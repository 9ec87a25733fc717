use crate::track::TrackId;

/// Result alias that carries the custom [`SketchError`] type.
pub type Result<T> = std::result::Result<T, SketchError>;

/// Common error type for the core crate.
#[derive(Debug, thiserror::Error)]
pub enum SketchError {
    /// Empty or malformed geometry handed to the smoother or the sound mapper.
    #[error("invalid geometry: {0}")]
    InvalidGeometry(&'static str),
    /// The audio-synthesis engine refused to start.
    #[error("audio engine unavailable: {0}")]
    AudioEngineUnavailable(String),
    /// Reported by a drawing store. Never retried by the core.
    #[error("failed to persist drawing: {0}")]
    PersistenceFailure(String),
    #[error("unknown track {0}")]
    UnknownTrack(TrackId),
    /// Free-form message for collaborators that do not fit the variants above.
    #[error("{0}")]
    Message(String),
    /// Wrapper around standard IO errors.
    #[error("{0}")]
    Io(#[from] std::io::Error),
    #[error("{0}")]
    Json(#[from] serde_json::Error),
}

impl SketchError {
    /// Creates a new error that simply wraps the provided message.
    pub fn msg<T: Into<String>>(msg: T) -> Self {
        Self::Message(msg.into())
    }
}

impl From<&str> for SketchError {
    fn from(value: &str) -> Self {
        Self::msg(value)
    }
}

impl From<String> for SketchError {
    fn from(value: String) -> Self {
        Self::Message(value)
    }
}

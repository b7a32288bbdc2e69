//! Error types for the Baton motion-analysis system.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Feature scaler error: {0}")]
    Scaler(String),

    #[error("Model loading error: {0}")]
    ModelLoad(String),

    #[error("Style inference error: {0}")]
    Inference(String),

    #[error("Class count mismatch: expected {expected}, got {actual}")]
    ClassCountMismatch { expected: usize, actual: usize },

    #[error("Classifier resources unavailable: {0}")]
    ResourceUnavailable(String),

    #[error("Audio decode error: {0}")]
    AudioDecode(String),

    #[error("Reference tempo analysis failed: {0}")]
    ReferenceTempo(String),

    #[error("Sensor stream error: {0}")]
    Stream(String),

    #[error("Session error: {0}")]
    Session(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}

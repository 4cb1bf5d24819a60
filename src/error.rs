use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Trace serialization error: {0}")]
    Serialization(#[from] bincode::Error),

    #[error("Trace JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Image encoding error: {0}")]
    Image(#[from] image::ImageError),

    #[error("Face detector error: {0}")]
    Detector(String),

    #[error("Surface has no pixels to snapshot")]
    EmptySurface,

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Capture pipeline has been stopped")]
    PipelineStopped,
}

pub type Result<T> = std::result::Result<T, Error>;

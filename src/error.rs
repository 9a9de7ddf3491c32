use thiserror::Error;

#[derive(Error, Debug)]
pub enum MapperError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Failed to encode image: {0}")]
    Image(#[from] image::ImageError),

    #[error("Invalid configuration: {reason}")]
    InvalidConfig { reason: String },
}

/// Result type alias for fallible I/O around the core
pub type MapperResult<T> = Result<T, MapperError>;

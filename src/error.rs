//! Error types for the soil and crop analysis service.

use thiserror::Error;

/// Main error type for agri-vision.
///
/// The heuristic scorers never produce one of these. Everything here comes
/// from the request boundary, the trained-model path, or start-up.
#[derive(Error, Debug)]
pub enum Error {
    /// Upload carried no bytes
    #[error("Empty image file")]
    EmptyPayload,

    /// Declared media type is not an image
    #[error("Expected image file, got {0}")]
    UnsupportedMediaType(String),

    /// Upload exceeds the configured ceiling
    #[error("Image file too large ({size} bytes, max {limit} bytes)")]
    PayloadTooLarge { size: usize, limit: usize },

    /// Bytes could not be decoded as an image
    #[error("Invalid image: {0}")]
    Decode(#[from] image::ImageError),

    /// Trained classifier missing, failed to load, or failed to run
    #[error("Model error: {0}")]
    Model(String),

    /// Label map missing or malformed
    #[error("Label map error: {0}")]
    Labels(String),

    /// Model input preparation failed
    #[error("Preprocessing error: {0}")]
    Preprocess(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO error occurred
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON (de)serialization failed
    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// True for failures caused by the caller's input rather than the service.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Error::EmptyPayload
                | Error::UnsupportedMediaType(_)
                | Error::PayloadTooLarge { .. }
                | Error::Decode(_)
        )
    }
}

/// Specialized Result type for agri-vision operations.
pub type Result<T> = std::result::Result<T, Error>;

//! Error Handling Module
//!
//! Defines custom error types for the poverty-mapping training library.
//! Uses thiserror for ergonomic error definitions.

use thiserror::Error;

/// Main error type for training and data-loading operations
#[derive(Error, Debug)]
pub enum PovertyError {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Error loading or processing an image
    #[error("Image error: {0}")]
    Image(String),

    /// Error with dataset operations
    #[error("Dataset error: {0}")]
    Dataset(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Error with model operations
    #[error("Model error: {0}")]
    Model(String),

    /// Error during training
    #[error("Training error: {0}")]
    Training(String),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Feature not implemented
    #[error("Not implemented: {0}")]
    NotImplemented(String),

    /// A run artifact that must not be overwritten already exists
    #[error("Already exists: {0}")]
    AlreadyExists(String),
}

impl From<image::ImageError> for PovertyError {
    fn from(err: image::ImageError) -> Self {
        PovertyError::Image(err.to_string())
    }
}

impl From<serde_json::Error> for PovertyError {
    fn from(err: serde_json::Error) -> Self {
        PovertyError::Serialization(err.to_string())
    }
}

impl From<csv::Error> for PovertyError {
    fn from(err: csv::Error) -> Self {
        PovertyError::Dataset(err.to_string())
    }
}

/// Convenience Result type for training operations
pub type Result<T> = std::result::Result<T, PovertyError>;

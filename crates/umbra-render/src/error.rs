//! Error types for rendering

use thiserror::Error;

/// Result type alias using the renderer's error type
pub type Result<T> = std::result::Result<T, RenderError>;

/// Errors that can occur while loading or rendering a scene
#[derive(Error, Debug)]
pub enum RenderError {
    /// The scene graph could not be built
    #[error(transparent)]
    Scene(#[from] umbra_core::Error),

    /// The abort flag was raised before the frame completed
    #[error("Render cancelled")]
    Cancelled,

    #[error("Invalid render settings: {0}")]
    InvalidSettings(String),

    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Scene description error: {0}")]
    Json(#[from] serde_json::Error),
}

//! Error types for Umbra scene construction

use thiserror::Error;

/// Result type alias using Umbra's Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while building or editing a scene
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    /// Sibling/child references that cannot form a forest
    #[error("Malformed scene graph: {0}")]
    MalformedGraph(String),

    /// A parameter name or value the registry cannot accept
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),
}

//! Error types for the layout engine

use thiserror::Error;

/// Result type alias using the engine Error
pub type Result<T> = std::result::Result<T, Error>;

/// Engine error types.
///
/// Constraint failures are never errors; they are reported as
/// [`Violation`](crate::Violation) values inside a report.
#[derive(Error, Debug)]
pub enum Error {
    #[error("Malformed measurement payload: {0}")]
    Measurement(#[from] serde_json::Error),

    #[error("Unknown viewport class: {0} (expected mobile, tablet or desktop)")]
    UnknownViewportClass(String),
}

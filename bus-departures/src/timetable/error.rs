//! Timetable provider error types.

use std::path::PathBuf;
use std::time::Duration;

/// Errors a timetable provider can report.
#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    /// The timetable source could not serve the request
    #[error("timetable unavailable: {0}")]
    Unavailable(String),

    /// The call took longer than allowed
    #[error("timetable request timed out after {0:?}")]
    Timeout(Duration),

    /// HTTP request failed
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The source answered with something that isn't a timetable
    #[error("malformed timetable: {0}")]
    Malformed(String),

    /// A fixture file could not be read or parsed
    #[error("fixture {path:?}: {message}")]
    Fixture { path: PathBuf, message: String },
}

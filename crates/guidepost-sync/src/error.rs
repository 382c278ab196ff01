//! Error types for calendar sync operations.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum SyncError {
    #[error("Calendar network error: {0}")]
    Network(String),

    #[error("Calendar authentication failed: {0}")]
    Authentication(String),

    #[error("Calendar API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("Calendar response could not be parsed: {0}")]
    InvalidResponse(String),

    #[error("Calendar sync configuration error: {0}")]
    Configuration(String),
}

pub type SyncResult<T> = std::result::Result<T, SyncError>;

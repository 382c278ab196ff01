//! Error types for store operations.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    /// Connection failures, timeouts, DNS errors.
    #[error("Storage network error: {0}")]
    Network(String),

    /// The database API returned a non-success status.
    #[error("Storage API error ({status}): {message}")]
    Api { status: u16, message: String },

    /// A row came back in a shape the records could not decode.
    #[error("Storage decode error: {0}")]
    Decode(String),

    /// The database's exclusion constraint rejected an overlapping booking.
    #[error("Storage conflict: {0}")]
    Conflict(String),

    /// Missing or malformed backend configuration.
    #[error("Storage configuration error: {0}")]
    Configuration(String),
}

pub type StoreResult<T> = std::result::Result<T, StoreError>;

//! Error types for slot-engine operations.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Invalid time string: {0}")]
    InvalidTime(String),

    #[error("Invalid day of week: {0}")]
    InvalidDayOfWeek(i64),

    #[error("Invalid appointment status: {0}")]
    InvalidStatus(String),
}

pub type Result<T> = std::result::Result<T, EngineError>;

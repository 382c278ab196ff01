//! The platform's error taxonomy.
//!
//! "No bookable slots" conditions are not errors; they are the tagged
//! [`SlotOutcome::Unavailable`] variant so callers can branch without string
//! matching. Calendar-sync failures never reach this type at all — they are
//! logged and swallowed at the call site.
//!
//! [`SlotOutcome::Unavailable`]: slot_engine::SlotOutcome::Unavailable

use guidepost_store::StoreError;
use thiserror::Error;

use crate::auth::AuthError;

#[derive(Error, Debug)]
pub enum Error {
    /// A referenced entity does not exist (404).
    #[error("{0}")]
    NotFound(String),

    /// Bad input shape or value (400).
    #[error("{0}")]
    Invalid(String),

    /// The bearer credential is missing or failed verification (401).
    #[error(transparent)]
    Auth(#[from] AuthError),

    /// The caller is authenticated but not allowed to do this (403).
    #[error("{0}")]
    Forbidden(String),

    /// The storage layer's exclusion constraint rejected the mutation (409).
    #[error("{0}")]
    Conflict(String),

    /// Unexpected storage failure (500).
    #[error(transparent)]
    Store(StoreError),
}

impl Error {
    pub fn not_found(entity: impl Into<String>) -> Self {
        Self::NotFound(entity.into())
    }

    pub fn invalid(message: impl Into<String>) -> Self {
        Self::Invalid(message.into())
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::Forbidden(message.into())
    }

    /// The HTTP status an outer transport layer would map this error to.
    pub fn status_code(&self) -> u16 {
        match self {
            Self::NotFound(_) => 404,
            Self::Invalid(_) => 400,
            Self::Auth(_) => 401,
            Self::Forbidden(_) => 403,
            Self::Conflict(_) => 409,
            Self::Store(_) => 500,
        }
    }
}

impl From<StoreError> for Error {
    fn from(e: StoreError) -> Self {
        match e {
            // A constraint rejection means someone else took the slot first.
            StoreError::Conflict(_) => {
                Self::Conflict("This time slot is no longer available".to_string())
            }
            other => Self::Store(other),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

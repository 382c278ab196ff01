//! Appointment status state machine.
//!
//! Valid transitions: `pending → confirmed → completed`,
//! `pending|confirmed → cancelled`, `confirmed → no_show`. Students may only
//! cancel; counselors may perform any machine-valid transition. Side effects
//! (timestamps, calendar sync) belong to the caller.

use thiserror::Error;

use crate::types::{Actor, AppointmentStatus};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransitionError {
    /// A student asked for anything other than a cancellation.
    #[error("Students can only cancel appointments")]
    StudentsOnlyCancel,

    /// The appointment is past the point where a student may cancel it.
    #[error("Cannot cancel this appointment")]
    NotCancellable,

    /// The target status is not reachable from the current one.
    #[error("Cannot move a {from} appointment to {to}")]
    InvalidTransition {
        from: AppointmentStatus,
        to: AppointmentStatus,
    },
}

impl TransitionError {
    /// Whether the rejection is an authorization failure (403) rather than a
    /// bad request (400).
    pub fn is_forbidden(&self) -> bool {
        matches!(self, Self::StudentsOnlyCancel)
    }
}

/// Whether the state machine allows `from → to` at all, regardless of actor.
pub fn is_valid_transition(from: AppointmentStatus, to: AppointmentStatus) -> bool {
    use AppointmentStatus::*;
    matches!(
        (from, to),
        (Pending, Confirmed)
            | (Pending, Cancelled)
            | (Confirmed, Cancelled)
            | (Confirmed, Completed)
            | (Confirmed, NoShow)
    )
}

/// Validate a requested transition for the given actor.
pub fn validate_transition(
    actor: Actor,
    from: AppointmentStatus,
    to: AppointmentStatus,
) -> Result<(), TransitionError> {
    if actor == Actor::Student {
        if to != AppointmentStatus::Cancelled {
            return Err(TransitionError::StudentsOnlyCancel);
        }
        if !from.occupies_calendar() {
            return Err(TransitionError::NotCancellable);
        }
    }

    if !is_valid_transition(from, to) {
        return Err(TransitionError::InvalidTransition { from, to });
    }

    Ok(())
}

//! Value types shared by the resolver and the booking state machine.

use std::fmt;
use std::str::FromStr;

use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};

use crate::error::EngineError;
use crate::grid;

/// One recurring window on a weekday (0 = Sunday through 6 = Saturday).
///
/// Rows with a null start or end mark the weekday as closed; they contribute
/// no window.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeeklyWindow {
    pub day_of_week: u8,
    #[serde(with = "grid::hhmm_opt")]
    pub start: Option<NaiveTime>,
    #[serde(with = "grid::hhmm_opt")]
    pub end: Option<NaiveTime>,
}

/// A date-specific exception. When any override exists for a date it replaces
/// the weekly windows for that date entirely; null times mean unavailable all
/// day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OverrideWindow {
    pub date: NaiveDate,
    #[serde(with = "grid::hhmm_opt")]
    pub start: Option<NaiveTime>,
    #[serde(with = "grid::hhmm_opt")]
    pub end: Option<NaiveTime>,
}

/// An existing appointment interval on the target date, as stored. Buffers are
/// not baked in; only the candidate under evaluation carries buffers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BookedInterval {
    pub start: NaiveTime,
    pub end: NaiveTime,
    /// Whether the booking belongs to the event type being resolved (feeds the
    /// per-day capacity check).
    pub same_event_type: bool,
}

/// The bookable-service parameters that shape candidate slots.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EventPolicy {
    pub duration_minutes: u32,
    pub buffer_before: u32,
    pub buffer_after: u32,
    pub max_per_day: Option<u32>,
}

/// A bookable start/end pair surfaced to a student.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Slot {
    #[serde(with = "grid::hhmm")]
    pub start_time: NaiveTime,
    #[serde(with = "grid::hhmm")]
    pub end_time: NaiveTime,
    /// 12-hour label with no leading zero, e.g. `9:30 AM`.
    pub display_time: String,
}

impl Slot {
    pub fn new(start: NaiveTime, end: NaiveTime) -> Self {
        Self {
            start_time: start,
            end_time: end,
            display_time: grid::display_12h(start),
        }
    }
}

/// Why a day yields no slots. These are successful empty outcomes, not errors;
/// callers branch on the variant instead of string-matching messages.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum UnavailableReason {
    /// The counselor has no schedule configured at all.
    NoSchedule,
    /// The target date falls before the minimum-notice horizon.
    MinimumNotice { hours: i64 },
    /// No weekly window or override window covers the date.
    NotAvailable,
    /// The event type's per-day booking cap is already met.
    DailyCapReached,
}

impl fmt::Display for UnavailableReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoSchedule => write!(f, "No schedule configured"),
            Self::MinimumNotice { hours } => write!(
                f,
                "Appointments must be booked at least {} hours in advance",
                hours
            ),
            Self::NotAvailable => write!(f, "Counselor is not available on this date"),
            Self::DailyCapReached => {
                write!(f, "Maximum bookings reached for this event type today")
            }
        }
    }
}

/// Result of resolving one day: either an ordered slot list or a tagged reason
/// for emptiness.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SlotOutcome {
    Open(Vec<Slot>),
    Unavailable(UnavailableReason),
}

impl SlotOutcome {
    /// The slots, empty when unavailable.
    pub fn slots(&self) -> &[Slot] {
        match self {
            Self::Open(slots) => slots,
            Self::Unavailable(_) => &[],
        }
    }

    /// The user-facing message for an unavailable day.
    pub fn message(&self) -> Option<String> {
        match self {
            Self::Open(_) => None,
            Self::Unavailable(reason) => Some(reason.to_string()),
        }
    }
}

/// Appointment lifecycle status. Only `pending` and `confirmed` occupy time on
/// the calendar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AppointmentStatus {
    Pending,
    Confirmed,
    Cancelled,
    Completed,
    NoShow,
}

impl AppointmentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Confirmed => "confirmed",
            Self::Cancelled => "cancelled",
            Self::Completed => "completed",
            Self::NoShow => "no_show",
        }
    }

    /// Whether an appointment in this status blocks other bookings.
    pub fn occupies_calendar(&self) -> bool {
        matches!(self, Self::Pending | Self::Confirmed)
    }
}

impl fmt::Display for AppointmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for AppointmentStatus {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "confirmed" => Ok(Self::Confirmed),
            "cancelled" => Ok(Self::Cancelled),
            "completed" => Ok(Self::Completed),
            "no_show" => Ok(Self::NoShow),
            other => Err(EngineError::InvalidStatus(other.to_string())),
        }
    }
}

/// Who is requesting a status transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Actor {
    Student,
    Counselor,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_serde_uses_snake_case() {
        assert_eq!(
            serde_json::to_string(&AppointmentStatus::NoShow).unwrap(),
            "\"no_show\""
        );
        let status: AppointmentStatus = serde_json::from_str("\"confirmed\"").unwrap();
        assert_eq!(status, AppointmentStatus::Confirmed);
    }

    #[test]
    fn status_from_str_rejects_unknown() {
        assert!("archived".parse::<AppointmentStatus>().is_err());
        assert_eq!(
            "no_show".parse::<AppointmentStatus>().unwrap(),
            AppointmentStatus::NoShow
        );
    }

    #[test]
    fn only_pending_and_confirmed_occupy_time() {
        assert!(AppointmentStatus::Pending.occupies_calendar());
        assert!(AppointmentStatus::Confirmed.occupies_calendar());
        assert!(!AppointmentStatus::Cancelled.occupies_calendar());
        assert!(!AppointmentStatus::Completed.occupies_calendar());
        assert!(!AppointmentStatus::NoShow.occupies_calendar());
    }

    #[test]
    fn slot_serializes_with_camel_case_keys() {
        let slot = Slot::new(
            NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
            NaiveTime::from_hms_opt(9, 30, 0).unwrap(),
        );
        let json = serde_json::to_value(&slot).unwrap();
        assert_eq!(json["startTime"], "09:00");
        assert_eq!(json["endTime"], "09:30");
        assert_eq!(json["displayTime"], "9:00 AM");
    }

    #[test]
    fn unavailable_messages_match_booking_responses() {
        assert_eq!(
            UnavailableReason::MinimumNotice { hours: 24 }.to_string(),
            "Appointments must be booked at least 24 hours in advance"
        );
        assert_eq!(
            UnavailableReason::NotAvailable.to_string(),
            "Counselor is not available on this date"
        );
    }
}

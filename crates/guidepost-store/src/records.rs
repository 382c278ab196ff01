//! Row types for the hosted database's tables, plus insert/update payloads.
//!
//! Field names follow the table columns so the same serde derives serve both
//! the REST backend and the JSON fixture format. Times are `HH:MM` strings on
//! the wire (seconds accepted on input), dates are `YYYY-MM-DD`.

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use slot_engine::grid::{hhmm, hhmm_opt};
use slot_engine::AppointmentStatus;

/// Whether an availability row is a recurring weekday window or a
/// date-specific override.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AvailabilityKind {
    Weekly,
    Override,
}

/// One row of a counselor's availability for a named schedule.
///
/// Weekly rows carry `day_of_week` (0 = Sunday); override rows carry
/// `specific_date`. Null times on either kind mean "closed".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AvailabilityRow {
    /// Fixture rows may omit the id; the in-memory backend assigns one.
    #[serde(default)]
    pub id: String,
    pub counselor_id: String,
    pub schedule_name: String,
    #[serde(rename = "type")]
    pub kind: AvailabilityKind,
    #[serde(default)]
    pub day_of_week: Option<u8>,
    #[serde(default)]
    pub specific_date: Option<NaiveDate>,
    #[serde(default, with = "hhmm_opt")]
    pub start_time: Option<NaiveTime>,
    #[serde(default, with = "hhmm_opt")]
    pub end_time: Option<NaiveTime>,
}

/// Insert payload for an availability row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewAvailabilityRow {
    pub counselor_id: String,
    pub schedule_name: String,
    #[serde(rename = "type")]
    pub kind: AvailabilityKind,
    pub day_of_week: Option<u8>,
    pub specific_date: Option<NaiveDate>,
    #[serde(with = "hhmm_opt")]
    pub start_time: Option<NaiveTime>,
    #[serde(with = "hhmm_opt")]
    pub end_time: Option<NaiveTime>,
}

impl NewAvailabilityRow {
    pub fn weekly(
        counselor_id: impl Into<String>,
        schedule_name: impl Into<String>,
        day_of_week: u8,
        start: Option<NaiveTime>,
        end: Option<NaiveTime>,
    ) -> Self {
        Self {
            counselor_id: counselor_id.into(),
            schedule_name: schedule_name.into(),
            kind: AvailabilityKind::Weekly,
            day_of_week: Some(day_of_week),
            specific_date: None,
            start_time: start,
            end_time: end,
        }
    }

    pub fn override_for(
        counselor_id: impl Into<String>,
        schedule_name: impl Into<String>,
        date: NaiveDate,
        start: Option<NaiveTime>,
        end: Option<NaiveTime>,
    ) -> Self {
        Self {
            counselor_id: counselor_id.into(),
            schedule_name: schedule_name.into(),
            kind: AvailabilityKind::Override,
            day_of_week: None,
            specific_date: Some(date),
            start_time: start,
            end_time: end,
        }
    }
}

/// A named minimum-notice policy container. An event type references one
/// schedule explicitly or falls back to the counselor's default.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Schedule {
    pub id: String,
    pub counselor_id: String,
    pub name: String,
    #[serde(default)]
    pub is_default: bool,
    /// Minimum advance notice, in hours.
    #[serde(rename = "booking_buffer", default = "default_booking_buffer")]
    pub booking_buffer_hours: i64,
    #[serde(default = "epoch")]
    pub created_at: DateTime<Utc>,
    #[serde(default = "epoch")]
    pub updated_at: DateTime<Utc>,
}

fn default_booking_buffer() -> i64 {
    24
}

fn epoch() -> DateTime<Utc> {
    DateTime::<Utc>::UNIX_EPOCH
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewSchedule {
    pub counselor_id: String,
    pub name: String,
    pub is_default: bool,
    #[serde(rename = "booking_buffer")]
    pub booking_buffer_hours: i64,
}

/// Partial update for a schedule. `None` fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_default: Option<bool>,
    #[serde(rename = "booking_buffer", skip_serializing_if = "Option::is_none")]
    pub booking_buffer_hours: Option<i64>,
}

impl ScheduleUpdate {
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.is_default.is_none() && self.booking_buffer_hours.is_none()
    }
}

/// A bookable service definition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventType {
    pub id: String,
    pub counselor_id: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(rename = "duration", default = "default_duration")]
    pub duration_minutes: u32,
    #[serde(default = "default_color")]
    pub color: String,
    #[serde(default = "default_category")]
    pub category: String,
    #[serde(default = "default_location_type")]
    pub location_type: String,
    #[serde(default)]
    pub location_details: Option<String>,
    #[serde(default = "default_true")]
    pub is_active: bool,
    #[serde(default)]
    pub requires_approval: bool,
    #[serde(default)]
    pub max_bookings_per_day: Option<u32>,
    #[serde(default)]
    pub buffer_before: u32,
    #[serde(default)]
    pub buffer_after: u32,
    #[serde(default)]
    pub schedule_id: Option<String>,
    #[serde(default = "epoch")]
    pub created_at: DateTime<Utc>,
    #[serde(default = "epoch")]
    pub updated_at: DateTime<Utc>,
}

fn default_duration() -> u32 {
    30
}

fn default_color() -> String {
    "#991b1b".to_string()
}

fn default_category() -> String {
    "counseling".to_string()
}

fn default_location_type() -> String {
    "in_person".to_string()
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewEventType {
    pub counselor_id: String,
    pub name: String,
    pub description: Option<String>,
    #[serde(rename = "duration")]
    pub duration_minutes: u32,
    pub color: String,
    pub category: String,
    pub location_type: String,
    pub location_details: Option<String>,
    pub is_active: bool,
    pub requires_approval: bool,
    pub max_bookings_per_day: Option<u32>,
    pub buffer_before: u32,
    pub buffer_after: u32,
    pub schedule_id: Option<String>,
}

impl NewEventType {
    /// A new event type with the platform defaults: 30 minutes, counseling
    /// category, in person, active, no approval, no buffers.
    pub fn new(counselor_id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            counselor_id: counselor_id.into(),
            name: name.into(),
            description: None,
            duration_minutes: 30,
            color: "#991b1b".to_string(),
            category: "counseling".to_string(),
            location_type: "in_person".to_string(),
            location_details: None,
            is_active: true,
            requires_approval: false,
            max_bookings_per_day: None,
            buffer_before: 0,
            buffer_after: 0,
            schedule_id: None,
        }
    }
}

/// Partial update for an event type. Double-`Option` fields distinguish
/// "leave untouched" (`None`) from "set null" (`Some(None)`).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventTypeUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<Option<String>>,
    #[serde(rename = "duration", skip_serializing_if = "Option::is_none")]
    pub duration_minutes: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location_details: Option<Option<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_active: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub requires_approval: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_bookings_per_day: Option<Option<u32>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub buffer_before: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub buffer_after: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub schedule_id: Option<Option<String>>,
}

impl EventTypeUpdate {
    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }
}

/// A booked appointment row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Appointment {
    pub id: String,
    pub student_id: String,
    pub counselor_id: String,
    pub event_type_id: String,
    pub scheduled_date: NaiveDate,
    #[serde(with = "hhmm")]
    pub start_time: NaiveTime,
    #[serde(with = "hhmm")]
    pub end_time: NaiveTime,
    pub status: AppointmentStatus,
    #[serde(default)]
    pub student_notes: Option<String>,
    #[serde(default)]
    pub counselor_notes: Option<String>,
    #[serde(default = "default_location_type")]
    pub location_type: String,
    #[serde(default)]
    pub location_details: Option<String>,
    #[serde(default)]
    pub cancellation_reason: Option<String>,
    #[serde(default)]
    pub cancelled_by: Option<String>,
    #[serde(default)]
    pub calendar_event_id_student: Option<String>,
    #[serde(default)]
    pub calendar_event_id_counselor: Option<String>,
    #[serde(default = "epoch")]
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub confirmed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub cancelled_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub last_calendar_sync_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewAppointment {
    pub student_id: String,
    pub counselor_id: String,
    pub event_type_id: String,
    pub scheduled_date: NaiveDate,
    #[serde(with = "hhmm")]
    pub start_time: NaiveTime,
    #[serde(with = "hhmm")]
    pub end_time: NaiveTime,
    pub status: AppointmentStatus,
    pub student_notes: Option<String>,
    pub location_type: String,
    pub location_details: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confirmed_at: Option<DateTime<Utc>>,
}

/// Partial update for an appointment.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppointmentUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<AppointmentStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confirmed_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cancelled_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_calendar_sync_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cancelled_by: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cancellation_reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub counselor_notes: Option<String>,
    /// `Some(None)` clears a stale calendar event id.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub calendar_event_id_student: Option<Option<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub calendar_event_id_counselor: Option<Option<String>>,
}

/// Which side of an appointment a user is on when listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PartyRole {
    Student,
    Counselor,
    /// Either side; the original "role=both" listing.
    Either,
}

/// Optional filters for appointment listings.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AppointmentQuery {
    pub status: Option<AppointmentStatus>,
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}

/// Stored third-party calendar credentials for one user. Absence of a row
/// means the user never connected a calendar; sync is silently skipped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalendarCredentials {
    pub user_id: String,
    pub refresh_token: String,
    #[serde(default)]
    pub access_token: Option<String>,
    #[serde(default)]
    pub token_expires_at: Option<DateTime<Utc>>,
    #[serde(default = "default_true")]
    pub sync_enabled: bool,
}

/// Directory entry used to decorate calendar events with names and attendee
/// emails.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectoryEntry {
    pub id: String,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn availability_row_roundtrips_with_type_column() {
        let json = r#"{
            "id": "av-1",
            "counselor_id": "c-1",
            "schedule_name": "Working hours",
            "type": "weekly",
            "day_of_week": 1,
            "specific_date": null,
            "start_time": "09:00:00",
            "end_time": "17:00"
        }"#;

        let row: AvailabilityRow = serde_json::from_str(json).unwrap();
        assert_eq!(row.kind, AvailabilityKind::Weekly);
        assert_eq!(row.start_time.unwrap().format("%H:%M").to_string(), "09:00");

        let back = serde_json::to_value(&row).unwrap();
        assert_eq!(back["type"], "weekly");
        assert_eq!(back["start_time"], "09:00");
    }

    #[test]
    fn schedule_maps_booking_buffer_column() {
        let json = r#"{
            "id": "s-1",
            "counselor_id": "c-1",
            "name": "Working hours",
            "is_default": true,
            "booking_buffer": 48,
            "created_at": "2026-01-05T08:00:00Z",
            "updated_at": "2026-01-05T08:00:00Z"
        }"#;

        let schedule: Schedule = serde_json::from_str(json).unwrap();
        assert_eq!(schedule.booking_buffer_hours, 48);
    }

    #[test]
    fn update_payloads_skip_untouched_fields() {
        let update = ScheduleUpdate {
            booking_buffer_hours: Some(12),
            ..Default::default()
        };
        assert_eq!(
            serde_json::to_string(&update).unwrap(),
            r#"{"booking_buffer":12}"#
        );

        let update = AppointmentUpdate {
            calendar_event_id_student: Some(None),
            ..Default::default()
        };
        assert_eq!(
            serde_json::to_string(&update).unwrap(),
            r#"{"calendar_event_id_student":null}"#
        );
    }

    #[test]
    fn event_type_defaults_match_the_platform() {
        let et = NewEventType::new("c-1", "Quick chat");
        assert_eq!(et.duration_minutes, 30);
        assert_eq!(et.color, "#991b1b");
        assert_eq!(et.category, "counseling");
        assert_eq!(et.location_type, "in_person");
        assert!(et.is_active);
        assert!(!et.requires_approval);
        assert_eq!(et.buffer_before, 0);
        assert_eq!(et.buffer_after, 0);
    }
}

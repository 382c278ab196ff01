//! JSON fixture datasets for the in-memory backend.
//!
//! A dataset is one JSON object holding rows for every table the platform
//! touches. The CLI loads one to answer availability queries offline, and the
//! service tests build small ones inline.

use serde::{Deserialize, Serialize};

use crate::error::{StoreError, StoreResult};
use crate::records::{
    Appointment, AvailabilityRow, CalendarCredentials, DirectoryEntry, EventType, Schedule,
};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Dataset {
    #[serde(default)]
    pub schedules: Vec<Schedule>,
    #[serde(default)]
    pub availability: Vec<AvailabilityRow>,
    #[serde(default)]
    pub event_types: Vec<EventType>,
    #[serde(default)]
    pub appointments: Vec<Appointment>,
    #[serde(default)]
    pub users: Vec<DirectoryEntry>,
    #[serde(default)]
    pub calendar_credentials: Vec<CalendarCredentials>,
}

impl Dataset {
    pub fn from_json(json: &str) -> StoreResult<Self> {
        serde_json::from_str(json).map_err(|e| StoreError::Decode(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minimal_dataset_parses_with_defaults() {
        let json = r#"{
            "schedules": [
                {"id": "s-1", "counselor_id": "c-1", "name": "Working hours", "is_default": true}
            ],
            "availability": [
                {"counselor_id": "c-1", "schedule_name": "Working hours", "type": "weekly",
                 "day_of_week": 1, "start_time": "09:00", "end_time": "17:00"},
                {"counselor_id": "c-1", "schedule_name": "Working hours", "type": "override",
                 "specific_date": "2026-03-16"}
            ],
            "event_types": [
                {"id": "et-1", "counselor_id": "c-1", "name": "Advising"}
            ]
        }"#;

        let dataset = Dataset::from_json(json).unwrap();
        assert_eq!(dataset.schedules[0].booking_buffer_hours, 24);
        assert_eq!(dataset.event_types[0].duration_minutes, 30);
        assert!(dataset.event_types[0].is_active);
        assert!(dataset.availability[1].start_time.is_none());
        assert!(dataset.appointments.is_empty());
    }

    #[test]
    fn malformed_dataset_is_a_decode_error() {
        let err = Dataset::from_json("{\"schedules\": 3}").unwrap_err();
        assert!(matches!(err, StoreError::Decode(_)));
    }
}

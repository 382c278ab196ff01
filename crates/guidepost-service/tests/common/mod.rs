//! Shared fixtures for the service integration tests.

#![allow(dead_code)]

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use guidepost_store::{Dataset, MemoryStore};
use guidepost_sync::{BoxFuture, CalendarGateway, EventDetails};

pub const COUNSELOR: &str = "couns-1";
pub const STUDENT: &str = "stu-1";

/// Monday with weekday availability in the fixture.
pub const TARGET_DATE: &str = "2026-03-16";

/// A counselor with a default 24h-notice schedule, Mon-Fri 09:00-17:00
/// availability, and three event types: a plain 30-minute one, one that
/// requires approval, and one capped at a single booking per day.
pub fn fixture_store() -> Arc<MemoryStore> {
    let json = r#"{
        "schedules": [
            {"id": "sched-main", "counselor_id": "couns-1", "name": "Working hours",
             "is_default": true, "booking_buffer": 24}
        ],
        "availability": [
            {"counselor_id": "couns-1", "schedule_name": "Working hours", "type": "weekly",
             "day_of_week": 0},
            {"counselor_id": "couns-1", "schedule_name": "Working hours", "type": "weekly",
             "day_of_week": 1, "start_time": "09:00", "end_time": "17:00"},
            {"counselor_id": "couns-1", "schedule_name": "Working hours", "type": "weekly",
             "day_of_week": 2, "start_time": "09:00", "end_time": "17:00"},
            {"counselor_id": "couns-1", "schedule_name": "Working hours", "type": "weekly",
             "day_of_week": 3, "start_time": "09:00", "end_time": "17:00"},
            {"counselor_id": "couns-1", "schedule_name": "Working hours", "type": "weekly",
             "day_of_week": 4, "start_time": "09:00", "end_time": "17:00"},
            {"counselor_id": "couns-1", "schedule_name": "Working hours", "type": "weekly",
             "day_of_week": 5, "start_time": "09:00", "end_time": "17:00"},
            {"counselor_id": "couns-1", "schedule_name": "Working hours", "type": "weekly",
             "day_of_week": 6}
        ],
        "event_types": [
            {"id": "et-30", "counselor_id": "couns-1", "name": "Advising",
             "duration": 30, "requires_approval": false},
            {"id": "et-approval", "counselor_id": "couns-1", "name": "Career counseling",
             "duration": 60, "requires_approval": true},
            {"id": "et-capped", "counselor_id": "couns-1", "name": "Intake interview",
             "duration": 30, "max_bookings_per_day": 1, "requires_approval": true},
            {"id": "et-retired", "counselor_id": "couns-1", "name": "Old format",
             "duration": 30, "is_active": false}
        ],
        "users": [
            {"id": "stu-1", "display_name": "Dana Reyes", "email": "dana@students.example.edu"},
            {"id": "couns-1", "display_name": "Prof. Lim", "email": "lim@example.edu"}
        ]
    }"#;
    Arc::new(MemoryStore::from_dataset(Dataset::from_json(json).unwrap()))
}

/// A calendar gateway double that records every call. Users listed in
/// `connected` get event ids; `fail_all` makes every operation fail, which
/// must never surface to the caller of the booking services.
#[derive(Default)]
pub struct RecordingCalendar {
    pub connected: Mutex<HashSet<String>>,
    pub fail_all: AtomicBool,
    pub created: Mutex<Vec<(String, String)>>,
    pub updated: Mutex<Vec<(String, String, String)>>,
    pub deleted: Mutex<Vec<(String, String)>>,
    counter: AtomicU64,
}

impl RecordingCalendar {
    pub fn with_connected(users: &[&str]) -> Arc<Self> {
        let gateway = Self::default();
        let mut connected = gateway.connected.lock().unwrap();
        for user in users {
            connected.insert(user.to_string());
        }
        drop(connected);
        Arc::new(gateway)
    }

    pub fn failing(users: &[&str]) -> Arc<Self> {
        let gateway = Self::with_connected(users);
        gateway.fail_all.store(true, Ordering::SeqCst);
        gateway
    }

    fn user_connected(&self, user_id: &str) -> bool {
        self.connected.lock().unwrap().contains(user_id)
    }
}

impl CalendarGateway for RecordingCalendar {
    fn is_connected<'a>(&'a self, user_id: &'a str) -> BoxFuture<'a, bool> {
        Box::pin(async move { self.user_connected(user_id) })
    }

    fn create_event<'a>(
        &'a self,
        user_id: &'a str,
        event: EventDetails,
    ) -> BoxFuture<'a, Option<String>> {
        Box::pin(async move {
            if !self.user_connected(user_id) || self.fail_all.load(Ordering::SeqCst) {
                return None;
            }
            self.created
                .lock()
                .unwrap()
                .push((user_id.to_string(), event.summary.clone()));
            let n = self.counter.fetch_add(1, Ordering::SeqCst);
            Some(format!("cal-ev-{}", n))
        })
    }

    fn update_event<'a>(
        &'a self,
        user_id: &'a str,
        event_id: &'a str,
        event: EventDetails,
    ) -> BoxFuture<'a, bool> {
        Box::pin(async move {
            if !self.user_connected(user_id) || self.fail_all.load(Ordering::SeqCst) {
                return false;
            }
            self.updated.lock().unwrap().push((
                user_id.to_string(),
                event_id.to_string(),
                event.summary.clone(),
            ));
            true
        })
    }

    fn delete_event<'a>(&'a self, user_id: &'a str, event_id: &'a str) -> BoxFuture<'a, bool> {
        Box::pin(async move {
            if self.fail_all.load(Ordering::SeqCst) {
                return false;
            }
            self.deleted
                .lock()
                .unwrap()
                .push((user_id.to_string(), event_id.to_string()));
            true
        })
    }
}

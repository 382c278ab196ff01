//! The `Store` trait: everything the services need from the hosted database.
//!
//! The trait is object-safe; methods return a boxed future so backends can be
//! swapped behind `Arc<dyn Store>`. Point lookups return `Option` (no rows is
//! data), listings return ordered `Vec`s, and only transport or constraint
//! failures are errors.

use std::future::Future;
use std::pin::Pin;

use chrono::{DateTime, NaiveDate, Utc};

use crate::error::StoreResult;
use crate::records::{
    Appointment, AppointmentQuery, AppointmentUpdate, AvailabilityRow, CalendarCredentials,
    EventType, EventTypeUpdate, NewAppointment, NewAvailabilityRow, NewEventType, NewSchedule,
    PartyRole, Schedule, ScheduleUpdate,
};

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

pub trait Store: Send + Sync {
    // ── Availability rows ───────────────────────────────────────────────

    /// All rows (weekly and overrides) for a counselor's named schedule.
    fn availability<'a>(
        &'a self,
        counselor_id: &'a str,
        schedule_name: &'a str,
    ) -> BoxFuture<'a, StoreResult<Vec<AvailabilityRow>>>;

    /// Weekly rows for one weekday (0 = Sunday).
    fn weekly_windows<'a>(
        &'a self,
        counselor_id: &'a str,
        schedule_name: &'a str,
        day_of_week: u8,
    ) -> BoxFuture<'a, StoreResult<Vec<AvailabilityRow>>>;

    /// Override rows for one exact date.
    fn override_windows<'a>(
        &'a self,
        counselor_id: &'a str,
        schedule_name: &'a str,
        date: NaiveDate,
    ) -> BoxFuture<'a, StoreResult<Vec<AvailabilityRow>>>;

    /// Delete every row of the named schedule and insert the given rows in
    /// their place. Returns the inserted count.
    fn replace_availability<'a>(
        &'a self,
        counselor_id: &'a str,
        schedule_name: &'a str,
        rows: Vec<NewAvailabilityRow>,
    ) -> BoxFuture<'a, StoreResult<usize>>;

    fn insert_availability<'a>(
        &'a self,
        row: NewAvailabilityRow,
    ) -> BoxFuture<'a, StoreResult<AvailabilityRow>>;

    /// Remove any override rows for the exact date (before inserting a
    /// replacement).
    fn delete_override<'a>(
        &'a self,
        counselor_id: &'a str,
        schedule_name: &'a str,
        date: NaiveDate,
    ) -> BoxFuture<'a, StoreResult<()>>;

    /// Delete one availability row owned by the counselor. Returns whether a
    /// row was removed.
    fn delete_availability_row<'a>(
        &'a self,
        counselor_id: &'a str,
        row_id: &'a str,
    ) -> BoxFuture<'a, StoreResult<bool>>;

    /// Re-point availability rows after a schedule rename.
    fn rename_schedule_rows<'a>(
        &'a self,
        counselor_id: &'a str,
        old_name: &'a str,
        new_name: &'a str,
    ) -> BoxFuture<'a, StoreResult<()>>;

    /// Drop all availability rows of a deleted schedule.
    fn delete_schedule_rows<'a>(
        &'a self,
        counselor_id: &'a str,
        schedule_name: &'a str,
    ) -> BoxFuture<'a, StoreResult<()>>;

    // ── Schedules ───────────────────────────────────────────────────────

    /// All schedules for a counselor, oldest first.
    fn schedules<'a>(&'a self, counselor_id: &'a str) -> BoxFuture<'a, StoreResult<Vec<Schedule>>>;

    fn schedule<'a>(&'a self, schedule_id: &'a str) -> BoxFuture<'a, StoreResult<Option<Schedule>>>;

    fn schedule_named<'a>(
        &'a self,
        counselor_id: &'a str,
        name: &'a str,
    ) -> BoxFuture<'a, StoreResult<Option<Schedule>>>;

    fn default_schedule<'a>(
        &'a self,
        counselor_id: &'a str,
    ) -> BoxFuture<'a, StoreResult<Option<Schedule>>>;

    fn insert_schedule<'a>(&'a self, schedule: NewSchedule)
        -> BoxFuture<'a, StoreResult<Schedule>>;

    /// Apply a partial update to a schedule owned by the counselor. `None`
    /// when no such schedule exists.
    fn update_schedule<'a>(
        &'a self,
        schedule_id: &'a str,
        counselor_id: &'a str,
        update: ScheduleUpdate,
    ) -> BoxFuture<'a, StoreResult<Option<Schedule>>>;

    fn delete_schedule<'a>(
        &'a self,
        schedule_id: &'a str,
        counselor_id: &'a str,
    ) -> BoxFuture<'a, StoreResult<bool>>;

    // ── Event types ─────────────────────────────────────────────────────

    fn event_type<'a>(
        &'a self,
        event_type_id: &'a str,
    ) -> BoxFuture<'a, StoreResult<Option<EventType>>>;

    /// All event types for a counselor, oldest first.
    fn event_types<'a>(
        &'a self,
        counselor_id: &'a str,
    ) -> BoxFuture<'a, StoreResult<Vec<EventType>>>;

    /// Active event types linked to a schedule, ordered by name.
    fn event_types_for_schedule<'a>(
        &'a self,
        counselor_id: &'a str,
        schedule_id: &'a str,
    ) -> BoxFuture<'a, StoreResult<Vec<EventType>>>;

    /// Active event types for student-facing listings, ordered by name,
    /// optionally filtered by category.
    fn public_event_types<'a>(
        &'a self,
        counselor_id: &'a str,
        category: Option<&'a str>,
    ) -> BoxFuture<'a, StoreResult<Vec<EventType>>>;

    fn insert_event_type<'a>(
        &'a self,
        event_type: NewEventType,
    ) -> BoxFuture<'a, StoreResult<EventType>>;

    fn update_event_type<'a>(
        &'a self,
        event_type_id: &'a str,
        counselor_id: &'a str,
        update: EventTypeUpdate,
    ) -> BoxFuture<'a, StoreResult<Option<EventType>>>;

    fn delete_event_type<'a>(
        &'a self,
        event_type_id: &'a str,
        counselor_id: &'a str,
    ) -> BoxFuture<'a, StoreResult<bool>>;

    // ── Appointments ────────────────────────────────────────────────────

    fn appointment<'a>(
        &'a self,
        appointment_id: &'a str,
    ) -> BoxFuture<'a, StoreResult<Option<Appointment>>>;

    /// Appointments where the user plays the given role, ordered by date then
    /// start time.
    fn appointments<'a>(
        &'a self,
        user_id: &'a str,
        role: PartyRole,
        query: AppointmentQuery,
    ) -> BoxFuture<'a, StoreResult<Vec<Appointment>>>;

    /// Calendar-occupying (pending or confirmed) appointments for a counselor
    /// on one date.
    fn appointments_on<'a>(
        &'a self,
        counselor_id: &'a str,
        date: NaiveDate,
    ) -> BoxFuture<'a, StoreResult<Vec<Appointment>>>;

    /// Scheduled dates (one entry per calendar-occupying appointment) on or
    /// after the given date.
    fn upcoming_appointment_dates<'a>(
        &'a self,
        counselor_id: &'a str,
        from: NaiveDate,
    ) -> BoxFuture<'a, StoreResult<Vec<NaiveDate>>>;

    /// Insert a booking. The backend's exclusion constraint is the authority
    /// on overlaps; a violation surfaces as [`StoreError::Conflict`].
    ///
    /// [`StoreError::Conflict`]: crate::StoreError::Conflict
    fn insert_appointment<'a>(
        &'a self,
        appointment: NewAppointment,
    ) -> BoxFuture<'a, StoreResult<Appointment>>;

    fn update_appointment<'a>(
        &'a self,
        appointment_id: &'a str,
        update: AppointmentUpdate,
    ) -> BoxFuture<'a, StoreResult<Option<Appointment>>>;

    // ── Directory ───────────────────────────────────────────────────────

    fn display_name<'a>(&'a self, user_id: &'a str) -> BoxFuture<'a, StoreResult<Option<String>>>;

    fn email<'a>(&'a self, user_id: &'a str) -> BoxFuture<'a, StoreResult<Option<String>>>;

    // ── Calendar credentials ────────────────────────────────────────────

    fn calendar_credentials<'a>(
        &'a self,
        user_id: &'a str,
    ) -> BoxFuture<'a, StoreResult<Option<CalendarCredentials>>>;

    fn upsert_calendar_credentials<'a>(
        &'a self,
        credentials: CalendarCredentials,
    ) -> BoxFuture<'a, StoreResult<()>>;

    /// Persist a refreshed access token.
    fn update_access_token<'a>(
        &'a self,
        user_id: &'a str,
        access_token: &'a str,
        expires_at: Option<DateTime<Utc>>,
    ) -> BoxFuture<'a, StoreResult<()>>;

    fn delete_calendar_credentials<'a>(
        &'a self,
        user_id: &'a str,
    ) -> BoxFuture<'a, StoreResult<()>>;
}

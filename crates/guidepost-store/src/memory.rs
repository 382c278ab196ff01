//! In-memory `Store` backend.
//!
//! Backs the service tests and the offline CLI. Semantics mirror the hosted
//! database where they matter: listings come back oldest-first (or by name
//! where the REST backend orders by name), and `insert_appointment` enforces
//! the same no-overlap exclusion the database does.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::RwLock;

use chrono::{DateTime, NaiveDate, Utc};

use crate::dataset::Dataset;
use crate::error::{StoreError, StoreResult};
use crate::records::{
    Appointment, AppointmentQuery, AppointmentUpdate, AvailabilityKind, AvailabilityRow,
    CalendarCredentials, DirectoryEntry, EventType, EventTypeUpdate, NewAppointment,
    NewAvailabilityRow, NewEventType, NewSchedule, PartyRole, Schedule, ScheduleUpdate,
};
use crate::store::{BoxFuture, Store};

#[derive(Debug, Default)]
struct Tables {
    availability: Vec<AvailabilityRow>,
    schedules: Vec<Schedule>,
    event_types: Vec<EventType>,
    appointments: Vec<Appointment>,
    directory: Vec<DirectoryEntry>,
    credentials: Vec<CalendarCredentials>,
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
    next_id: AtomicU64,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a store pre-populated from a fixture dataset. Rows without ids
    /// get generated ones.
    pub fn from_dataset(dataset: Dataset) -> Self {
        let store = Self::new();
        {
            let mut tables = store.tables.write().unwrap();
            tables.schedules = dataset.schedules;
            tables.event_types = dataset.event_types;
            tables.appointments = dataset.appointments;
            tables.directory = dataset.users;
            tables.credentials = dataset.calendar_credentials;
            tables.availability = dataset.availability;
            for row in tables.availability.iter_mut() {
                if row.id.is_empty() {
                    row.id = store.gen_id("avail");
                }
            }
        }
        store
    }

    fn gen_id(&self, prefix: &str) -> String {
        format!("{}-{:04}", prefix, self.next_id.fetch_add(1, Ordering::SeqCst))
    }
}

fn overlaps(a: &Appointment, start: chrono::NaiveTime, end: chrono::NaiveTime) -> bool {
    a.start_time < end && a.end_time > start
}

impl Store for MemoryStore {
    fn availability<'a>(
        &'a self,
        counselor_id: &'a str,
        schedule_name: &'a str,
    ) -> BoxFuture<'a, StoreResult<Vec<AvailabilityRow>>> {
        Box::pin(async move {
            let tables = self.tables.read().unwrap();
            Ok(tables
                .availability
                .iter()
                .filter(|r| r.counselor_id == counselor_id && r.schedule_name == schedule_name)
                .cloned()
                .collect())
        })
    }

    fn weekly_windows<'a>(
        &'a self,
        counselor_id: &'a str,
        schedule_name: &'a str,
        day_of_week: u8,
    ) -> BoxFuture<'a, StoreResult<Vec<AvailabilityRow>>> {
        Box::pin(async move {
            let tables = self.tables.read().unwrap();
            Ok(tables
                .availability
                .iter()
                .filter(|r| {
                    r.counselor_id == counselor_id
                        && r.schedule_name == schedule_name
                        && r.kind == AvailabilityKind::Weekly
                        && r.day_of_week == Some(day_of_week)
                })
                .cloned()
                .collect())
        })
    }

    fn override_windows<'a>(
        &'a self,
        counselor_id: &'a str,
        schedule_name: &'a str,
        date: NaiveDate,
    ) -> BoxFuture<'a, StoreResult<Vec<AvailabilityRow>>> {
        Box::pin(async move {
            let tables = self.tables.read().unwrap();
            Ok(tables
                .availability
                .iter()
                .filter(|r| {
                    r.counselor_id == counselor_id
                        && r.schedule_name == schedule_name
                        && r.kind == AvailabilityKind::Override
                        && r.specific_date == Some(date)
                })
                .cloned()
                .collect())
        })
    }

    fn replace_availability<'a>(
        &'a self,
        counselor_id: &'a str,
        schedule_name: &'a str,
        rows: Vec<NewAvailabilityRow>,
    ) -> BoxFuture<'a, StoreResult<usize>> {
        Box::pin(async move {
            let inserted = rows.len();
            let mut tables = self.tables.write().unwrap();
            tables
                .availability
                .retain(|r| !(r.counselor_id == counselor_id && r.schedule_name == schedule_name));
            for row in rows {
                let id = self.gen_id("avail");
                tables.availability.push(materialize_row(id, row));
            }
            Ok(inserted)
        })
    }

    fn insert_availability<'a>(
        &'a self,
        row: NewAvailabilityRow,
    ) -> BoxFuture<'a, StoreResult<AvailabilityRow>> {
        Box::pin(async move {
            let id = self.gen_id("avail");
            let row = materialize_row(id, row);
            self.tables.write().unwrap().availability.push(row.clone());
            Ok(row)
        })
    }

    fn delete_override<'a>(
        &'a self,
        counselor_id: &'a str,
        schedule_name: &'a str,
        date: NaiveDate,
    ) -> BoxFuture<'a, StoreResult<()>> {
        Box::pin(async move {
            self.tables.write().unwrap().availability.retain(|r| {
                !(r.counselor_id == counselor_id
                    && r.schedule_name == schedule_name
                    && r.kind == AvailabilityKind::Override
                    && r.specific_date == Some(date))
            });
            Ok(())
        })
    }

    fn delete_availability_row<'a>(
        &'a self,
        counselor_id: &'a str,
        row_id: &'a str,
    ) -> BoxFuture<'a, StoreResult<bool>> {
        Box::pin(async move {
            let mut tables = self.tables.write().unwrap();
            let before = tables.availability.len();
            tables
                .availability
                .retain(|r| !(r.id == row_id && r.counselor_id == counselor_id));
            Ok(tables.availability.len() < before)
        })
    }

    fn rename_schedule_rows<'a>(
        &'a self,
        counselor_id: &'a str,
        old_name: &'a str,
        new_name: &'a str,
    ) -> BoxFuture<'a, StoreResult<()>> {
        Box::pin(async move {
            for row in self.tables.write().unwrap().availability.iter_mut() {
                if row.counselor_id == counselor_id && row.schedule_name == old_name {
                    row.schedule_name = new_name.to_string();
                }
            }
            Ok(())
        })
    }

    fn delete_schedule_rows<'a>(
        &'a self,
        counselor_id: &'a str,
        schedule_name: &'a str,
    ) -> BoxFuture<'a, StoreResult<()>> {
        Box::pin(async move {
            self.tables
                .write()
                .unwrap()
                .availability
                .retain(|r| !(r.counselor_id == counselor_id && r.schedule_name == schedule_name));
            Ok(())
        })
    }

    fn schedules<'a>(&'a self, counselor_id: &'a str) -> BoxFuture<'a, StoreResult<Vec<Schedule>>> {
        Box::pin(async move {
            let tables = self.tables.read().unwrap();
            let mut rows: Vec<Schedule> = tables
                .schedules
                .iter()
                .filter(|s| s.counselor_id == counselor_id)
                .cloned()
                .collect();
            rows.sort_by(|a, b| a.created_at.cmp(&b.created_at));
            Ok(rows)
        })
    }

    fn schedule<'a>(
        &'a self,
        schedule_id: &'a str,
    ) -> BoxFuture<'a, StoreResult<Option<Schedule>>> {
        Box::pin(async move {
            let tables = self.tables.read().unwrap();
            Ok(tables.schedules.iter().find(|s| s.id == schedule_id).cloned())
        })
    }

    fn schedule_named<'a>(
        &'a self,
        counselor_id: &'a str,
        name: &'a str,
    ) -> BoxFuture<'a, StoreResult<Option<Schedule>>> {
        Box::pin(async move {
            let tables = self.tables.read().unwrap();
            Ok(tables
                .schedules
                .iter()
                .find(|s| s.counselor_id == counselor_id && s.name == name)
                .cloned())
        })
    }

    fn default_schedule<'a>(
        &'a self,
        counselor_id: &'a str,
    ) -> BoxFuture<'a, StoreResult<Option<Schedule>>> {
        Box::pin(async move {
            let tables = self.tables.read().unwrap();
            Ok(tables
                .schedules
                .iter()
                .find(|s| s.counselor_id == counselor_id && s.is_default)
                .cloned())
        })
    }

    fn insert_schedule<'a>(
        &'a self,
        schedule: NewSchedule,
    ) -> BoxFuture<'a, StoreResult<Schedule>> {
        Box::pin(async move {
            let now = Utc::now();
            let row = Schedule {
                id: self.gen_id("sched"),
                counselor_id: schedule.counselor_id,
                name: schedule.name,
                is_default: schedule.is_default,
                booking_buffer_hours: schedule.booking_buffer_hours,
                created_at: now,
                updated_at: now,
            };
            self.tables.write().unwrap().schedules.push(row.clone());
            Ok(row)
        })
    }

    fn update_schedule<'a>(
        &'a self,
        schedule_id: &'a str,
        counselor_id: &'a str,
        update: ScheduleUpdate,
    ) -> BoxFuture<'a, StoreResult<Option<Schedule>>> {
        Box::pin(async move {
            let mut tables = self.tables.write().unwrap();
            let Some(row) = tables
                .schedules
                .iter_mut()
                .find(|s| s.id == schedule_id && s.counselor_id == counselor_id)
            else {
                return Ok(None);
            };
            if let Some(name) = update.name {
                row.name = name;
            }
            if let Some(is_default) = update.is_default {
                row.is_default = is_default;
            }
            if let Some(hours) = update.booking_buffer_hours {
                row.booking_buffer_hours = hours;
            }
            row.updated_at = Utc::now();
            Ok(Some(row.clone()))
        })
    }

    fn delete_schedule<'a>(
        &'a self,
        schedule_id: &'a str,
        counselor_id: &'a str,
    ) -> BoxFuture<'a, StoreResult<bool>> {
        Box::pin(async move {
            let mut tables = self.tables.write().unwrap();
            let before = tables.schedules.len();
            tables
                .schedules
                .retain(|s| !(s.id == schedule_id && s.counselor_id == counselor_id));
            Ok(tables.schedules.len() < before)
        })
    }

    fn event_type<'a>(
        &'a self,
        event_type_id: &'a str,
    ) -> BoxFuture<'a, StoreResult<Option<EventType>>> {
        Box::pin(async move {
            let tables = self.tables.read().unwrap();
            Ok(tables
                .event_types
                .iter()
                .find(|et| et.id == event_type_id)
                .cloned())
        })
    }

    fn event_types<'a>(
        &'a self,
        counselor_id: &'a str,
    ) -> BoxFuture<'a, StoreResult<Vec<EventType>>> {
        Box::pin(async move {
            let tables = self.tables.read().unwrap();
            let mut rows: Vec<EventType> = tables
                .event_types
                .iter()
                .filter(|et| et.counselor_id == counselor_id)
                .cloned()
                .collect();
            rows.sort_by(|a, b| a.created_at.cmp(&b.created_at));
            Ok(rows)
        })
    }

    fn event_types_for_schedule<'a>(
        &'a self,
        counselor_id: &'a str,
        schedule_id: &'a str,
    ) -> BoxFuture<'a, StoreResult<Vec<EventType>>> {
        Box::pin(async move {
            let tables = self.tables.read().unwrap();
            let mut rows: Vec<EventType> = tables
                .event_types
                .iter()
                .filter(|et| {
                    et.counselor_id == counselor_id
                        && et.is_active
                        && et.schedule_id.as_deref() == Some(schedule_id)
                })
                .cloned()
                .collect();
            rows.sort_by(|a, b| a.name.cmp(&b.name));
            Ok(rows)
        })
    }

    fn public_event_types<'a>(
        &'a self,
        counselor_id: &'a str,
        category: Option<&'a str>,
    ) -> BoxFuture<'a, StoreResult<Vec<EventType>>> {
        Box::pin(async move {
            let tables = self.tables.read().unwrap();
            let mut rows: Vec<EventType> = tables
                .event_types
                .iter()
                .filter(|et| {
                    et.counselor_id == counselor_id
                        && et.is_active
                        && category.is_none_or(|c| et.category == c)
                })
                .cloned()
                .collect();
            rows.sort_by(|a, b| a.name.cmp(&b.name));
            Ok(rows)
        })
    }

    fn insert_event_type<'a>(
        &'a self,
        event_type: NewEventType,
    ) -> BoxFuture<'a, StoreResult<EventType>> {
        Box::pin(async move {
            let now = Utc::now();
            let row = EventType {
                id: self.gen_id("etype"),
                counselor_id: event_type.counselor_id,
                name: event_type.name,
                description: event_type.description,
                duration_minutes: event_type.duration_minutes,
                color: event_type.color,
                category: event_type.category,
                location_type: event_type.location_type,
                location_details: event_type.location_details,
                is_active: event_type.is_active,
                requires_approval: event_type.requires_approval,
                max_bookings_per_day: event_type.max_bookings_per_day,
                buffer_before: event_type.buffer_before,
                buffer_after: event_type.buffer_after,
                schedule_id: event_type.schedule_id,
                created_at: now,
                updated_at: now,
            };
            self.tables.write().unwrap().event_types.push(row.clone());
            Ok(row)
        })
    }

    fn update_event_type<'a>(
        &'a self,
        event_type_id: &'a str,
        counselor_id: &'a str,
        update: EventTypeUpdate,
    ) -> BoxFuture<'a, StoreResult<Option<EventType>>> {
        Box::pin(async move {
            let mut tables = self.tables.write().unwrap();
            let Some(row) = tables
                .event_types
                .iter_mut()
                .find(|et| et.id == event_type_id && et.counselor_id == counselor_id)
            else {
                return Ok(None);
            };
            if let Some(name) = update.name {
                row.name = name;
            }
            if let Some(description) = update.description {
                row.description = description;
            }
            if let Some(duration) = update.duration_minutes {
                row.duration_minutes = duration;
            }
            if let Some(color) = update.color {
                row.color = color;
            }
            if let Some(category) = update.category {
                row.category = category;
            }
            if let Some(location_type) = update.location_type {
                row.location_type = location_type;
            }
            if let Some(location_details) = update.location_details {
                row.location_details = location_details;
            }
            if let Some(is_active) = update.is_active {
                row.is_active = is_active;
            }
            if let Some(requires_approval) = update.requires_approval {
                row.requires_approval = requires_approval;
            }
            if let Some(max) = update.max_bookings_per_day {
                row.max_bookings_per_day = max;
            }
            if let Some(before) = update.buffer_before {
                row.buffer_before = before;
            }
            if let Some(after) = update.buffer_after {
                row.buffer_after = after;
            }
            if let Some(schedule_id) = update.schedule_id {
                row.schedule_id = schedule_id;
            }
            row.updated_at = Utc::now();
            Ok(Some(row.clone()))
        })
    }

    fn delete_event_type<'a>(
        &'a self,
        event_type_id: &'a str,
        counselor_id: &'a str,
    ) -> BoxFuture<'a, StoreResult<bool>> {
        Box::pin(async move {
            let mut tables = self.tables.write().unwrap();
            let before = tables.event_types.len();
            tables
                .event_types
                .retain(|et| !(et.id == event_type_id && et.counselor_id == counselor_id));
            Ok(tables.event_types.len() < before)
        })
    }

    fn appointment<'a>(
        &'a self,
        appointment_id: &'a str,
    ) -> BoxFuture<'a, StoreResult<Option<Appointment>>> {
        Box::pin(async move {
            let tables = self.tables.read().unwrap();
            Ok(tables
                .appointments
                .iter()
                .find(|a| a.id == appointment_id)
                .cloned())
        })
    }

    fn appointments<'a>(
        &'a self,
        user_id: &'a str,
        role: PartyRole,
        query: AppointmentQuery,
    ) -> BoxFuture<'a, StoreResult<Vec<Appointment>>> {
        Box::pin(async move {
            let tables = self.tables.read().unwrap();
            let mut rows: Vec<Appointment> = tables
                .appointments
                .iter()
                .filter(|a| match role {
                    PartyRole::Student => a.student_id == user_id,
                    PartyRole::Counselor => a.counselor_id == user_id,
                    PartyRole::Either => a.student_id == user_id || a.counselor_id == user_id,
                })
                .filter(|a| query.status.is_none_or(|s| a.status == s))
                .filter(|a| query.from.is_none_or(|d| a.scheduled_date >= d))
                .filter(|a| query.to.is_none_or(|d| a.scheduled_date <= d))
                .cloned()
                .collect();
            rows.sort_by(|a, b| {
                (a.scheduled_date, a.start_time).cmp(&(b.scheduled_date, b.start_time))
            });
            Ok(rows)
        })
    }

    fn appointments_on<'a>(
        &'a self,
        counselor_id: &'a str,
        date: NaiveDate,
    ) -> BoxFuture<'a, StoreResult<Vec<Appointment>>> {
        Box::pin(async move {
            let tables = self.tables.read().unwrap();
            Ok(tables
                .appointments
                .iter()
                .filter(|a| {
                    a.counselor_id == counselor_id
                        && a.scheduled_date == date
                        && a.status.occupies_calendar()
                })
                .cloned()
                .collect())
        })
    }

    fn upcoming_appointment_dates<'a>(
        &'a self,
        counselor_id: &'a str,
        from: NaiveDate,
    ) -> BoxFuture<'a, StoreResult<Vec<NaiveDate>>> {
        Box::pin(async move {
            let tables = self.tables.read().unwrap();
            let mut dates: Vec<NaiveDate> = tables
                .appointments
                .iter()
                .filter(|a| {
                    a.counselor_id == counselor_id
                        && a.scheduled_date >= from
                        && a.status.occupies_calendar()
                })
                .map(|a| a.scheduled_date)
                .collect();
            dates.sort();
            Ok(dates)
        })
    }

    fn insert_appointment<'a>(
        &'a self,
        appointment: NewAppointment,
    ) -> BoxFuture<'a, StoreResult<Appointment>> {
        Box::pin(async move {
            let mut tables = self.tables.write().unwrap();
            let clash = tables.appointments.iter().any(|a| {
                a.counselor_id == appointment.counselor_id
                    && a.scheduled_date == appointment.scheduled_date
                    && a.status.occupies_calendar()
                    && overlaps(a, appointment.start_time, appointment.end_time)
            });
            if clash {
                return Err(StoreError::Conflict(
                    "appointment overlaps an existing booking".to_string(),
                ));
            }
            let row = Appointment {
                id: self.gen_id("appt"),
                student_id: appointment.student_id,
                counselor_id: appointment.counselor_id,
                event_type_id: appointment.event_type_id,
                scheduled_date: appointment.scheduled_date,
                start_time: appointment.start_time,
                end_time: appointment.end_time,
                status: appointment.status,
                student_notes: appointment.student_notes,
                counselor_notes: None,
                location_type: appointment.location_type,
                location_details: appointment.location_details,
                cancellation_reason: None,
                cancelled_by: None,
                calendar_event_id_student: None,
                calendar_event_id_counselor: None,
                created_at: Utc::now(),
                confirmed_at: appointment.confirmed_at,
                cancelled_at: None,
                completed_at: None,
                last_calendar_sync_at: None,
            };
            tables.appointments.push(row.clone());
            Ok(row)
        })
    }

    fn update_appointment<'a>(
        &'a self,
        appointment_id: &'a str,
        update: AppointmentUpdate,
    ) -> BoxFuture<'a, StoreResult<Option<Appointment>>> {
        Box::pin(async move {
            let mut tables = self.tables.write().unwrap();
            let Some(row) = tables
                .appointments
                .iter_mut()
                .find(|a| a.id == appointment_id)
            else {
                return Ok(None);
            };
            if let Some(status) = update.status {
                row.status = status;
            }
            if let Some(at) = update.confirmed_at {
                row.confirmed_at = Some(at);
            }
            if let Some(at) = update.cancelled_at {
                row.cancelled_at = Some(at);
            }
            if let Some(at) = update.completed_at {
                row.completed_at = Some(at);
            }
            if let Some(at) = update.last_calendar_sync_at {
                row.last_calendar_sync_at = Some(at);
            }
            if let Some(by) = update.cancelled_by {
                row.cancelled_by = Some(by);
            }
            if let Some(reason) = update.cancellation_reason {
                row.cancellation_reason = Some(reason);
            }
            if let Some(notes) = update.counselor_notes {
                row.counselor_notes = Some(notes);
            }
            if let Some(id) = update.calendar_event_id_student {
                row.calendar_event_id_student = id;
            }
            if let Some(id) = update.calendar_event_id_counselor {
                row.calendar_event_id_counselor = id;
            }
            Ok(Some(row.clone()))
        })
    }

    fn display_name<'a>(&'a self, user_id: &'a str) -> BoxFuture<'a, StoreResult<Option<String>>> {
        Box::pin(async move {
            let tables = self.tables.read().unwrap();
            Ok(tables
                .directory
                .iter()
                .find(|u| u.id == user_id)
                .and_then(|u| u.display_name.clone()))
        })
    }

    fn email<'a>(&'a self, user_id: &'a str) -> BoxFuture<'a, StoreResult<Option<String>>> {
        Box::pin(async move {
            let tables = self.tables.read().unwrap();
            Ok(tables
                .directory
                .iter()
                .find(|u| u.id == user_id)
                .and_then(|u| u.email.clone()))
        })
    }

    fn calendar_credentials<'a>(
        &'a self,
        user_id: &'a str,
    ) -> BoxFuture<'a, StoreResult<Option<CalendarCredentials>>> {
        Box::pin(async move {
            let tables = self.tables.read().unwrap();
            Ok(tables
                .credentials
                .iter()
                .find(|c| c.user_id == user_id)
                .cloned())
        })
    }

    fn upsert_calendar_credentials<'a>(
        &'a self,
        credentials: CalendarCredentials,
    ) -> BoxFuture<'a, StoreResult<()>> {
        Box::pin(async move {
            let mut tables = self.tables.write().unwrap();
            tables.credentials.retain(|c| c.user_id != credentials.user_id);
            tables.credentials.push(credentials);
            Ok(())
        })
    }

    fn update_access_token<'a>(
        &'a self,
        user_id: &'a str,
        access_token: &'a str,
        expires_at: Option<DateTime<Utc>>,
    ) -> BoxFuture<'a, StoreResult<()>> {
        Box::pin(async move {
            let mut tables = self.tables.write().unwrap();
            if let Some(c) = tables.credentials.iter_mut().find(|c| c.user_id == user_id) {
                c.access_token = Some(access_token.to_string());
                c.token_expires_at = expires_at;
            }
            Ok(())
        })
    }

    fn delete_calendar_credentials<'a>(
        &'a self,
        user_id: &'a str,
    ) -> BoxFuture<'a, StoreResult<()>> {
        Box::pin(async move {
            self.tables
                .write()
                .unwrap()
                .credentials
                .retain(|c| c.user_id != user_id);
            Ok(())
        })
    }
}

fn materialize_row(id: String, row: NewAvailabilityRow) -> AvailabilityRow {
    AvailabilityRow {
        id,
        counselor_id: row.counselor_id,
        schedule_name: row.schedule_name,
        kind: row.kind,
        day_of_week: row.day_of_week,
        specific_date: row.specific_date,
        start_time: row.start_time,
        end_time: row.end_time,
    }
}

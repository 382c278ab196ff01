//! Appointment booking, listing, and status transitions.
//!
//! The store's exclusion constraint is the authority on double-booking; this
//! service maps its rejection to a conflict the caller can retry from. Every
//! calendar-side effect runs after the primary mutation commits and is
//! best-effort: failures are logged and the appointment stands.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{NaiveDate, NaiveTime, Utc};
use serde::Deserialize;
use tracing::warn;

use guidepost_store::records::{
    Appointment, AppointmentQuery, AppointmentUpdate, NewAppointment, PartyRole,
};
use guidepost_store::Store;
use guidepost_sync::{CalendarGateway, EventDetails};
use slot_engine::grid;
use slot_engine::{validate_transition, Actor, AppointmentStatus};

use crate::error::{Error, Result};

#[derive(Debug, Clone, Deserialize)]
pub struct BookingRequest {
    pub student_id: String,
    pub counselor_id: String,
    pub event_type_id: String,
    pub scheduled_date: NaiveDate,
    #[serde(with = "grid::hhmm")]
    pub start_time: NaiveTime,
    #[serde(default)]
    pub student_notes: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StatusChange {
    pub status: AppointmentStatus,
    /// Recorded on cancellation.
    #[serde(default)]
    pub reason: Option<String>,
    /// Applied only when the acting user is the counselor.
    #[serde(default)]
    pub counselor_notes: Option<String>,
}

pub struct AppointmentService {
    store: Arc<dyn Store>,
    calendar: Arc<dyn CalendarGateway>,
}

impl AppointmentService {
    pub fn new(store: Arc<dyn Store>, calendar: Arc<dyn CalendarGateway>) -> Self {
        Self { store, calendar }
    }

    /// Book an appointment. Auto-confirms when the event type does not
    /// require approval, then pushes calendar events for whichever parties
    /// have connected calendars.
    pub async fn book(&self, request: BookingRequest) -> Result<Appointment> {
        let event_type = self
            .store
            .event_type(&request.event_type_id)
            .await?
            .ok_or_else(|| Error::not_found("Event type not found"))?;

        if !event_type.is_active {
            return Err(Error::invalid(
                "This event type is not available for booking",
            ));
        }

        let end_minutes =
            grid::minutes_of_day(request.start_time) + event_type.duration_minutes as i32;
        let end_time = grid::time_from_minutes(end_minutes)
            .ok_or_else(|| Error::invalid("Appointment would run past midnight"))?;

        let status = if event_type.requires_approval {
            AppointmentStatus::Pending
        } else {
            AppointmentStatus::Confirmed
        };

        let appointment = self
            .store
            .insert_appointment(NewAppointment {
                student_id: request.student_id,
                counselor_id: request.counselor_id,
                event_type_id: request.event_type_id,
                scheduled_date: request.scheduled_date,
                start_time: request.start_time,
                end_time,
                status,
                student_notes: request.student_notes,
                location_type: event_type.location_type.clone(),
                location_details: event_type.location_details.clone(),
                confirmed_at: (status == AppointmentStatus::Confirmed).then(Utc::now),
            })
            .await?;

        self.sync_created(&appointment, &event_type.name).await;

        // Pick up any calendar event ids the sync recorded.
        Ok(self
            .store
            .appointment(&appointment.id)
            .await?
            .unwrap_or(appointment))
    }

    pub async fn list(
        &self,
        user_id: &str,
        role: PartyRole,
        query: AppointmentQuery,
    ) -> Result<Vec<Appointment>> {
        Ok(self.store.appointments(user_id, role, query).await?)
    }

    /// Fetch one appointment; only its two parties may see it.
    pub async fn get(&self, user_id: &str, appointment_id: &str) -> Result<Appointment> {
        let appointment = self
            .store
            .appointment(appointment_id)
            .await?
            .ok_or_else(|| Error::not_found("Appointment not found"))?;

        if appointment.student_id != user_id && appointment.counselor_id != user_id {
            return Err(Error::forbidden(
                "Not authorized to view this appointment",
            ));
        }
        Ok(appointment)
    }

    /// Transition an appointment's status on behalf of one of its parties.
    pub async fn update_status(
        &self,
        user_id: &str,
        appointment_id: &str,
        change: StatusChange,
    ) -> Result<Appointment> {
        let appointment = self
            .store
            .appointment(appointment_id)
            .await?
            .ok_or_else(|| Error::not_found("Appointment not found"))?;

        let actor = if appointment.counselor_id == user_id {
            Actor::Counselor
        } else if appointment.student_id == user_id {
            Actor::Student
        } else {
            return Err(Error::forbidden("Not authorized"));
        };

        validate_transition(actor, appointment.status, change.status).map_err(|e| {
            if e.is_forbidden() {
                Error::forbidden(e.to_string())
            } else {
                Error::invalid(e.to_string())
            }
        })?;

        let now = Utc::now();
        let mut update = AppointmentUpdate {
            status: Some(change.status),
            ..Default::default()
        };
        match change.status {
            AppointmentStatus::Confirmed => update.confirmed_at = Some(now),
            AppointmentStatus::Cancelled => {
                update.cancelled_at = Some(now);
                update.cancelled_by = Some(user_id.to_string());
                update.cancellation_reason = change.reason;
            }
            AppointmentStatus::Completed => update.completed_at = Some(now),
            AppointmentStatus::Pending | AppointmentStatus::NoShow => {}
        }
        if actor == Actor::Counselor {
            update.counselor_notes = change.counselor_notes;
        }

        let updated = self
            .store
            .update_appointment(appointment_id, update)
            .await?
            .ok_or_else(|| Error::not_found("Appointment not found"))?;

        match change.status {
            // Cancelled and completed appointments leave both calendars.
            AppointmentStatus::Cancelled | AppointmentStatus::Completed => {
                self.remove_calendar_events(&updated).await;
            }
            AppointmentStatus::Confirmed => {
                self.mark_confirmed(&updated).await;
            }
            AppointmentStatus::Pending | AppointmentStatus::NoShow => {}
        }

        Ok(self
            .store
            .appointment(appointment_id)
            .await?
            .unwrap_or(updated))
    }

    /// Upcoming dates with calendar-occupying appointments, with counts. Fed
    /// to the student-facing booking calendar as a density map.
    pub async fn busy_dates(
        &self,
        counselor_id: &str,
        from: NaiveDate,
    ) -> Result<BTreeMap<NaiveDate, usize>> {
        let dates = self
            .store
            .upcoming_appointment_dates(counselor_id, from)
            .await?;
        let mut counts = BTreeMap::new();
        for date in dates {
            *counts.entry(date).or_insert(0) += 1;
        }
        Ok(counts)
    }

    /// Push the freshly-booked appointment into both parties' calendars.
    async fn sync_created(&self, appointment: &Appointment, event_type_name: &str) {
        let student_name = self
            .lookup(self.store.display_name(&appointment.student_id))
            .await
            .unwrap_or_else(|| "Student".to_string());
        let counselor_name = self
            .lookup(self.store.display_name(&appointment.counselor_id))
            .await
            .unwrap_or_else(|| "Counselor".to_string());

        let mut attendees = Vec::new();
        if let Some(email) = self.lookup(self.store.email(&appointment.student_id)).await {
            attendees.push(email);
        }
        if let Some(email) = self
            .lookup(self.store.email(&appointment.counselor_id))
            .await
        {
            attendees.push(email);
        }

        let base = EventDetails {
            summary: String::new(),
            description: None,
            date: appointment.scheduled_date,
            start: appointment.start_time,
            end: appointment.end_time,
            attendees,
            location: appointment.location_details.clone(),
        };

        let student_event = EventDetails {
            summary: format!("{} with {}", event_type_name, counselor_name),
            description: Some(
                appointment
                    .student_notes
                    .clone()
                    .unwrap_or_else(|| format!("Appointment: {}", event_type_name)),
            ),
            ..base.clone()
        };
        let student_event_id = self
            .calendar
            .create_event(&appointment.student_id, student_event)
            .await;

        let counselor_event = EventDetails {
            summary: format!("{} - {}", event_type_name, student_name),
            description: Some(
                appointment
                    .student_notes
                    .clone()
                    .unwrap_or_else(|| format!("Appointment with {}", student_name)),
            ),
            ..base
        };
        let counselor_event_id = self
            .calendar
            .create_event(&appointment.counselor_id, counselor_event)
            .await;

        if student_event_id.is_some() || counselor_event_id.is_some() {
            let update = AppointmentUpdate {
                calendar_event_id_student: student_event_id.map(Some),
                calendar_event_id_counselor: counselor_event_id.map(Some),
                last_calendar_sync_at: Some(Utc::now()),
                ..Default::default()
            };
            if let Err(e) = self.store.update_appointment(&appointment.id, update).await {
                warn!(appointment_id = %appointment.id, error = %e,
                    "failed to record calendar event ids");
            }
        }
    }

    /// Delete both parties' calendar events and clear the stored ids. The ids
    /// are cleared even when deletion fails, so a dead event is never retried
    /// forever.
    async fn remove_calendar_events(&self, appointment: &Appointment) {
        if let Some(event_id) = &appointment.calendar_event_id_student {
            if !self
                .calendar
                .delete_event(&appointment.student_id, event_id)
                .await
            {
                warn!(appointment_id = %appointment.id, event_id = %event_id,
                    "failed to delete student calendar event");
            }
        }
        if let Some(event_id) = &appointment.calendar_event_id_counselor {
            if !self
                .calendar
                .delete_event(&appointment.counselor_id, event_id)
                .await
            {
                warn!(appointment_id = %appointment.id, event_id = %event_id,
                    "failed to delete counselor calendar event");
            }
        }

        let update = AppointmentUpdate {
            calendar_event_id_student: Some(None),
            calendar_event_id_counselor: Some(None),
            last_calendar_sync_at: Some(Utc::now()),
            ..Default::default()
        };
        if let Err(e) = self.store.update_appointment(&appointment.id, update).await {
            warn!(appointment_id = %appointment.id, error = %e,
                "failed to clear calendar event ids");
        }
    }

    /// Retitle both parties' calendar events after confirmation.
    async fn mark_confirmed(&self, appointment: &Appointment) {
        let event_type_name = self
            .lookup(self.store.event_type(&appointment.event_type_id))
            .await
            .map(|et| et.name)
            .unwrap_or_else(|| "Appointment".to_string());

        let details = EventDetails {
            summary: format!("{} (Confirmed)", event_type_name),
            description: None,
            date: appointment.scheduled_date,
            start: appointment.start_time,
            end: appointment.end_time,
            attendees: Vec::new(),
            location: None,
        };

        if let Some(event_id) = &appointment.calendar_event_id_student {
            self.calendar
                .update_event(&appointment.student_id, event_id, details.clone())
                .await;
        }
        if let Some(event_id) = &appointment.calendar_event_id_counselor {
            self.calendar
                .update_event(&appointment.counselor_id, event_id, details)
                .await;
        }

        let update = AppointmentUpdate {
            last_calendar_sync_at: Some(Utc::now()),
            ..Default::default()
        };
        if let Err(e) = self.store.update_appointment(&appointment.id, update).await {
            warn!(appointment_id = %appointment.id, error = %e,
                "failed to stamp calendar sync time");
        }
    }

    /// A store lookup used only to decorate calendar events; failures are
    /// logged and treated as absent.
    async fn lookup<T>(
        &self,
        future: guidepost_store::BoxFuture<'_, guidepost_store::StoreResult<Option<T>>>,
    ) -> Option<T> {
        match future.await {
            Ok(value) => value,
            Err(e) => {
                warn!(error = %e, "directory lookup failed during calendar sync");
                None
            }
        }
    }
}

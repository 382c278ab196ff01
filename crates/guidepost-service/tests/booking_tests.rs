//! End-to-end tests for booking, slot resolution, and status transitions over
//! the in-memory store.

mod common;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use common::{fixture_store, RecordingCalendar, COUNSELOR, STUDENT, TARGET_DATE};
use guidepost_service::{
    AppointmentService, AvailabilityService, BookingRequest, Error, StatusChange,
};
use guidepost_store::records::{AppointmentQuery, PartyRole};
use slot_engine::{AppointmentStatus, SlotOutcome, UnavailableReason};

fn date(s: &str) -> NaiveDate {
    s.parse().unwrap()
}

fn time(s: &str) -> NaiveTime {
    NaiveTime::parse_from_str(s, "%H:%M").unwrap()
}

/// Two days before the target date, so minimum notice never interferes.
fn resolve_now() -> NaiveDateTime {
    date("2026-03-14").and_time(time("08:00"))
}

fn booking(event_type: &str, start: &str) -> BookingRequest {
    BookingRequest {
        student_id: STUDENT.to_string(),
        counselor_id: COUNSELOR.to_string(),
        event_type_id: event_type.to_string(),
        scheduled_date: date(TARGET_DATE),
        start_time: time(start),
        student_notes: None,
    }
}

// ── Booking ─────────────────────────────────────────────────────────────────

#[tokio::test]
async fn booking_auto_confirms_without_approval() {
    let store = fixture_store();
    let service = AppointmentService::new(store, RecordingCalendar::with_connected(&[]));

    let appointment = service.book(booking("et-30", "09:00")).await.unwrap();
    assert_eq!(appointment.status, AppointmentStatus::Confirmed);
    assert!(appointment.confirmed_at.is_some());
    assert_eq!(appointment.end_time, time("09:30"));
    assert_eq!(appointment.location_type, "in_person");
}

#[tokio::test]
async fn booking_stays_pending_when_approval_is_required() {
    let store = fixture_store();
    let service = AppointmentService::new(store, RecordingCalendar::with_connected(&[]));

    let appointment = service.book(booking("et-approval", "10:00")).await.unwrap();
    assert_eq!(appointment.status, AppointmentStatus::Pending);
    assert!(appointment.confirmed_at.is_none());
    // End time comes from the event type's 60-minute duration.
    assert_eq!(appointment.end_time, time("11:00"));
}

#[tokio::test]
async fn booking_an_inactive_event_type_is_invalid() {
    let store = fixture_store();
    let service = AppointmentService::new(store, RecordingCalendar::with_connected(&[]));

    let err = service.book(booking("et-retired", "09:00")).await.unwrap_err();
    assert!(matches!(err, Error::Invalid(_)));
    assert_eq!(err.status_code(), 400);
}

#[tokio::test]
async fn booking_an_unknown_event_type_is_not_found() {
    let store = fixture_store();
    let service = AppointmentService::new(store, RecordingCalendar::with_connected(&[]));

    let err = service.book(booking("et-nope", "09:00")).await.unwrap_err();
    assert_eq!(err.status_code(), 404);
}

#[tokio::test]
async fn double_booking_surfaces_the_storage_conflict() {
    let store = fixture_store();
    let service = AppointmentService::new(store, RecordingCalendar::with_connected(&[]));

    service.book(booking("et-30", "09:00")).await.unwrap();
    let err = service.book(booking("et-30", "09:00")).await.unwrap_err();

    assert!(matches!(err, Error::Conflict(_)));
    assert_eq!(err.status_code(), 409);
    assert_eq!(err.to_string(), "This time slot is no longer available");
}

#[tokio::test]
async fn booking_records_calendar_event_ids_for_connected_parties() {
    let store = fixture_store();
    let calendar = RecordingCalendar::with_connected(&[STUDENT, COUNSELOR]);
    let service = AppointmentService::new(store, calendar.clone());

    let appointment = service.book(booking("et-30", "09:00")).await.unwrap();
    assert!(appointment.calendar_event_id_student.is_some());
    assert!(appointment.calendar_event_id_counselor.is_some());
    assert!(appointment.last_calendar_sync_at.is_some());

    let created = calendar.created.lock().unwrap();
    assert_eq!(created.len(), 2);
    // Each side gets its own summary, decorated with the other party's name.
    assert_eq!(created[0], (STUDENT.to_string(), "Advising with Prof. Lim".to_string()));
    assert_eq!(created[1], (COUNSELOR.to_string(), "Advising - Dana Reyes".to_string()));
}

#[tokio::test]
async fn calendar_failures_never_fail_the_booking() {
    let store = fixture_store();
    let service =
        AppointmentService::new(store, RecordingCalendar::failing(&[STUDENT, COUNSELOR]));

    let appointment = service.book(booking("et-30", "09:00")).await.unwrap();
    assert_eq!(appointment.status, AppointmentStatus::Confirmed);
    assert!(appointment.calendar_event_id_student.is_none());
    assert!(appointment.calendar_event_id_counselor.is_none());
    assert!(appointment.last_calendar_sync_at.is_none());
}

#[tokio::test]
async fn disconnected_users_are_silently_skipped() {
    let store = fixture_store();
    let calendar = RecordingCalendar::with_connected(&[COUNSELOR]);
    let service = AppointmentService::new(store, calendar.clone());

    let appointment = service.book(booking("et-30", "09:00")).await.unwrap();
    assert!(appointment.calendar_event_id_student.is_none());
    assert!(appointment.calendar_event_id_counselor.is_some());
    assert_eq!(calendar.created.lock().unwrap().len(), 1);
}

// ── Slot resolution through the service ─────────────────────────────────────

#[tokio::test]
async fn one_booking_leaves_the_back_half_of_the_window() {
    let store = fixture_store();
    let appointments =
        AppointmentService::new(store.clone(), RecordingCalendar::with_connected(&[]));
    let availability = AvailabilityService::new(store);

    // Narrow the day to one hour via an override, then book its first half.
    availability
        .set_override(
            COUNSELOR,
            None,
            guidepost_service::OverrideInput {
                date: date(TARGET_DATE),
                start_time: Some(time("09:00")),
                end_time: Some(time("10:00")),
            },
        )
        .await
        .unwrap();
    appointments.book(booking("et-30", "09:00")).await.unwrap();

    let resolved = availability
        .resolve_slots(COUNSELOR, "et-30", date(TARGET_DATE), resolve_now())
        .await
        .unwrap();

    let slots = resolved.outcome.slots();
    assert_eq!(slots.len(), 1);
    assert_eq!(slots[0].start_time, time("09:30"));
    assert_eq!(slots[0].end_time, time("10:00"));
    assert_eq!(slots[0].display_time, "9:30 AM");
}

#[tokio::test]
async fn closed_override_empties_the_day() {
    let store = fixture_store();
    let availability = AvailabilityService::new(store);

    availability
        .set_override(
            COUNSELOR,
            None,
            guidepost_service::OverrideInput {
                date: date(TARGET_DATE),
                start_time: None,
                end_time: None,
            },
        )
        .await
        .unwrap();

    let resolved = availability
        .resolve_slots(COUNSELOR, "et-30", date(TARGET_DATE), resolve_now())
        .await
        .unwrap();
    assert_eq!(
        resolved.outcome,
        SlotOutcome::Unavailable(UnavailableReason::NotAvailable)
    );
}

#[tokio::test]
async fn daily_cap_counts_pending_bookings() {
    let store = fixture_store();
    let appointments =
        AppointmentService::new(store.clone(), RecordingCalendar::with_connected(&[]));
    let availability = AvailabilityService::new(store);

    appointments.book(booking("et-capped", "09:00")).await.unwrap();

    let resolved = availability
        .resolve_slots(COUNSELOR, "et-capped", date(TARGET_DATE), resolve_now())
        .await
        .unwrap();
    assert_eq!(
        resolved.outcome,
        SlotOutcome::Unavailable(UnavailableReason::DailyCapReached)
    );
    assert_eq!(
        resolved.outcome.message().unwrap(),
        "Maximum bookings reached for this event type today"
    );

    // The cap is per event type; the uncapped one still has slots.
    let other = availability
        .resolve_slots(COUNSELOR, "et-30", date(TARGET_DATE), resolve_now())
        .await
        .unwrap();
    assert!(!other.outcome.slots().is_empty());
}

#[tokio::test]
async fn missing_schedule_is_a_tagged_outcome_not_an_error() {
    let store = fixture_store();
    let schedules = guidepost_service::ScheduleService::new(store.clone());
    let availability = AvailabilityService::new(store.clone());

    // Demote the only schedule so no default exists.
    schedules
        .update(
            COUNSELOR,
            "sched-main",
            guidepost_service::UpdateScheduleRequest {
                is_default: Some(false),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    let resolved = availability
        .resolve_slots(COUNSELOR, "et-30", date(TARGET_DATE), resolve_now())
        .await
        .unwrap();
    assert_eq!(
        resolved.outcome,
        SlotOutcome::Unavailable(UnavailableReason::NoSchedule)
    );
    assert_eq!(resolved.outcome.message().unwrap(), "No schedule configured");
}

#[tokio::test]
async fn inactive_event_types_still_list_slots() {
    let store = fixture_store();
    let availability = AvailabilityService::new(store);

    let resolved = availability
        .resolve_slots(COUNSELOR, "et-retired", date(TARGET_DATE), resolve_now())
        .await
        .unwrap();
    assert!(!resolved.outcome.slots().is_empty());
}

#[tokio::test]
async fn resolution_is_idempotent_through_the_service() {
    let store = fixture_store();
    let appointments =
        AppointmentService::new(store.clone(), RecordingCalendar::with_connected(&[]));
    let availability = AvailabilityService::new(store);

    appointments.book(booking("et-30", "11:00")).await.unwrap();

    let first = availability
        .resolve_slots(COUNSELOR, "et-30", date(TARGET_DATE), resolve_now())
        .await
        .unwrap();
    let second = availability
        .resolve_slots(COUNSELOR, "et-30", date(TARGET_DATE), resolve_now())
        .await
        .unwrap();
    assert_eq!(first.outcome, second.outcome);
}

// ── Status transitions ──────────────────────────────────────────────────────

#[tokio::test]
async fn student_cancellation_records_actor_and_reason() {
    let store = fixture_store();
    let calendar = RecordingCalendar::with_connected(&[STUDENT, COUNSELOR]);
    let service = AppointmentService::new(store, calendar.clone());

    let appointment = service.book(booking("et-30", "09:00")).await.unwrap();
    let student_event = appointment.calendar_event_id_student.clone().unwrap();

    let cancelled = service
        .update_status(
            STUDENT,
            &appointment.id,
            StatusChange {
                status: AppointmentStatus::Cancelled,
                reason: Some("Exam conflict".to_string()),
                counselor_notes: None,
            },
        )
        .await
        .unwrap();

    assert_eq!(cancelled.status, AppointmentStatus::Cancelled);
    assert!(cancelled.cancelled_at.is_some());
    assert_eq!(cancelled.cancelled_by.as_deref(), Some(STUDENT));
    assert_eq!(cancelled.cancellation_reason.as_deref(), Some("Exam conflict"));

    // Both calendar events are deleted and the stored ids cleared.
    let deleted = calendar.deleted.lock().unwrap();
    assert_eq!(deleted.len(), 2);
    assert!(deleted.iter().any(|(user, id)| user == STUDENT && *id == student_event));
    drop(deleted);
    assert!(cancelled.calendar_event_id_student.is_none());
    assert!(cancelled.calendar_event_id_counselor.is_none());
}

#[tokio::test]
async fn student_cannot_complete_an_appointment() {
    let store = fixture_store();
    let service = AppointmentService::new(store, RecordingCalendar::with_connected(&[]));

    let appointment = service.book(booking("et-approval", "09:00")).await.unwrap();
    assert_eq!(appointment.status, AppointmentStatus::Pending);

    let err = service
        .update_status(
            STUDENT,
            &appointment.id,
            StatusChange {
                status: AppointmentStatus::Completed,
                reason: None,
                counselor_notes: None,
            },
        )
        .await
        .unwrap_err();

    assert!(matches!(err, Error::Forbidden(_)));
    assert_eq!(err.status_code(), 403);
}

#[tokio::test]
async fn counselor_confirmation_retitles_calendar_events() {
    let store = fixture_store();
    let calendar = RecordingCalendar::with_connected(&[STUDENT, COUNSELOR]);
    let service = AppointmentService::new(store, calendar.clone());

    let appointment = service.book(booking("et-approval", "09:00")).await.unwrap();
    let confirmed = service
        .update_status(
            COUNSELOR,
            &appointment.id,
            StatusChange {
                status: AppointmentStatus::Confirmed,
                reason: None,
                counselor_notes: Some("Room 204".to_string()),
            },
        )
        .await
        .unwrap();

    assert_eq!(confirmed.status, AppointmentStatus::Confirmed);
    assert!(confirmed.confirmed_at.is_some());
    assert_eq!(confirmed.counselor_notes.as_deref(), Some("Room 204"));
    // Event ids survive a confirmation; only the titles change.
    assert!(confirmed.calendar_event_id_student.is_some());

    let updated = calendar.updated.lock().unwrap();
    assert_eq!(updated.len(), 2);
    assert!(updated
        .iter()
        .all(|(_, _, summary)| summary == "Career counseling (Confirmed)"));
}

#[tokio::test]
async fn completing_a_confirmed_appointment_clears_calendar_events() {
    let store = fixture_store();
    let calendar = RecordingCalendar::with_connected(&[COUNSELOR]);
    let service = AppointmentService::new(store, calendar.clone());

    let appointment = service.book(booking("et-30", "14:00")).await.unwrap();
    let completed = service
        .update_status(
            COUNSELOR,
            &appointment.id,
            StatusChange {
                status: AppointmentStatus::Completed,
                reason: None,
                counselor_notes: None,
            },
        )
        .await
        .unwrap();

    assert_eq!(completed.status, AppointmentStatus::Completed);
    assert!(completed.completed_at.is_some());
    assert!(completed.calendar_event_id_counselor.is_none());
    assert_eq!(calendar.deleted.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn outsiders_cannot_touch_an_appointment() {
    let store = fixture_store();
    let service = AppointmentService::new(store, RecordingCalendar::with_connected(&[]));

    let appointment = service.book(booking("et-30", "09:00")).await.unwrap();

    let err = service.get("someone-else", &appointment.id).await.unwrap_err();
    assert_eq!(err.status_code(), 403);

    let err = service
        .update_status(
            "someone-else",
            &appointment.id,
            StatusChange {
                status: AppointmentStatus::Cancelled,
                reason: None,
                counselor_notes: None,
            },
        )
        .await
        .unwrap_err();
    assert_eq!(err.status_code(), 403);
}

// ── Listings ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn listings_filter_by_role_and_status() {
    let store = fixture_store();
    let service = AppointmentService::new(store, RecordingCalendar::with_connected(&[]));

    service.book(booking("et-30", "09:00")).await.unwrap();
    let second = service.book(booking("et-approval", "10:00")).await.unwrap();

    let all = service
        .list(STUDENT, PartyRole::Student, AppointmentQuery::default())
        .await
        .unwrap();
    assert_eq!(all.len(), 2);

    let pending = service
        .list(
            COUNSELOR,
            PartyRole::Counselor,
            AppointmentQuery {
                status: Some(AppointmentStatus::Pending),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].id, second.id);
}

#[tokio::test]
async fn busy_dates_count_occupying_appointments() {
    let store = fixture_store();
    let service = AppointmentService::new(store, RecordingCalendar::with_connected(&[]));

    service.book(booking("et-30", "09:00")).await.unwrap();
    service.book(booking("et-30", "10:00")).await.unwrap();
    let cancelled = service.book(booking("et-30", "11:00")).await.unwrap();
    service
        .update_status(
            STUDENT,
            &cancelled.id,
            StatusChange {
                status: AppointmentStatus::Cancelled,
                reason: None,
                counselor_notes: None,
            },
        )
        .await
        .unwrap();

    let busy = service
        .busy_dates(COUNSELOR, date("2026-03-01"))
        .await
        .unwrap();
    assert_eq!(busy.get(&date(TARGET_DATE)), Some(&2));
}

//! Tests for single-day slot resolution.

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use slot_engine::{
    resolve_day, BookedInterval, DayContext, EventPolicy, OverrideWindow, Slot, SlotOutcome,
    UnavailableReason, WeeklyWindow,
};

// ── Helpers ─────────────────────────────────────────────────────────────────

fn date(s: &str) -> NaiveDate {
    s.parse().unwrap()
}

fn time(s: &str) -> NaiveTime {
    NaiveTime::parse_from_str(s, "%H:%M").unwrap()
}

fn at(d: &str, t: &str) -> NaiveDateTime {
    date(d).and_time(time(t))
}

fn weekly(day_of_week: u8, start: &str, end: &str) -> WeeklyWindow {
    WeeklyWindow {
        day_of_week,
        start: Some(time(start)),
        end: Some(time(end)),
    }
}

fn booked(start: &str, end: &str, same_event_type: bool) -> BookedInterval {
    BookedInterval {
        start: time(start),
        end: time(end),
        same_event_type,
    }
}

fn policy(duration: u32) -> EventPolicy {
    EventPolicy {
        duration_minutes: duration,
        buffer_before: 0,
        buffer_after: 0,
        max_per_day: None,
    }
}

/// Monday 2026-03-16 resolved two days out, so the notice horizon never
/// interferes unless a test wants it to.
fn monday_ctx<'a>(
    policy: EventPolicy,
    weekly: &'a [WeeklyWindow],
    overrides: &'a [OverrideWindow],
    booked: &'a [BookedInterval],
) -> DayContext<'a> {
    DayContext {
        date: date("2026-03-16"),
        now: at("2026-03-14", "08:00"),
        policy,
        notice_hours: 24,
        weekly,
        overrides,
        booked,
    }
}

fn starts(outcome: &SlotOutcome) -> Vec<String> {
    outcome
        .slots()
        .iter()
        .map(|s| s.start_time.format("%H:%M").to_string())
        .collect()
}

// ── Basic enumeration ───────────────────────────────────────────────────────

#[test]
fn empty_day_walks_the_full_window_on_the_half_hour() {
    let weekly = [weekly(1, "09:00", "12:00")];
    let outcome = resolve_day(&monday_ctx(policy(30), &weekly, &[], &[]));

    assert_eq!(
        starts(&outcome),
        vec!["09:00", "09:30", "10:00", "10:30", "11:00", "11:30"]
    );
}

#[test]
fn sixty_minute_events_still_step_by_thirty() {
    let weekly = [weekly(1, "09:00", "11:00")];
    let outcome = resolve_day(&monday_ctx(policy(60), &weekly, &[], &[]));

    // 10:30 would end at 11:30, past the window.
    assert_eq!(starts(&outcome), vec!["09:00", "09:30", "10:00"]);
}

#[test]
fn one_existing_booking_leaves_exactly_the_back_half() {
    let weekly = [weekly(1, "09:00", "10:00")];
    let existing = [booked("09:00", "09:30", true)];
    let outcome = resolve_day(&monday_ctx(policy(30), &weekly, &[], &existing));

    assert_eq!(
        outcome.slots(),
        &[Slot::new(time("09:30"), time("10:00"))]
    );
    assert_eq!(outcome.slots()[0].display_time, "9:30 AM");
}

#[test]
fn multiple_windows_emit_in_chronological_order() {
    // Rows arrive unordered, as they would from storage.
    let weekly = [weekly(1, "14:00", "15:00"), weekly(1, "09:00", "10:00")];
    let outcome = resolve_day(&monday_ctx(policy(30), &weekly, &[], &[]));

    assert_eq!(starts(&outcome), vec!["09:00", "09:30", "14:00", "14:30"]);
}

#[test]
fn other_weekdays_do_not_leak_in() {
    let weekly = [weekly(2, "09:00", "17:00")];
    let outcome = resolve_day(&monday_ctx(policy(30), &weekly, &[], &[]));

    assert_eq!(
        outcome,
        SlotOutcome::Unavailable(UnavailableReason::NotAvailable)
    );
}

#[test]
fn closed_weekday_marker_rows_yield_no_windows() {
    let weekly = [WeeklyWindow {
        day_of_week: 1,
        start: None,
        end: None,
    }];
    let outcome = resolve_day(&monday_ctx(policy(30), &weekly, &[], &[]));

    assert_eq!(
        outcome,
        SlotOutcome::Unavailable(UnavailableReason::NotAvailable)
    );
}

// ── Buffers ─────────────────────────────────────────────────────────────────

#[test]
fn candidate_buffers_push_slots_off_adjacent_bookings() {
    let weekly = [weekly(1, "09:00", "12:00")];
    let existing = [booked("10:00", "10:30", false)];
    let with_buffers = EventPolicy {
        duration_minutes: 30,
        buffer_before: 15,
        buffer_after: 15,
        max_per_day: None,
    };
    let outcome = resolve_day(&monday_ctx(with_buffers, &weekly, &[], &existing));

    // 09:30 spans [09:15, 10:15] and 10:30 spans [10:15, 11:15]; both touch
    // the booking. 09:00 spans [08:45, 09:45] and 11:00 spans [10:45, 11:45].
    assert_eq!(starts(&outcome), vec!["09:00", "11:00", "11:30"]);
}

#[test]
fn buffers_do_not_inflate_stored_bookings() {
    let weekly = [weekly(1, "09:00", "11:00")];
    // A zero-buffer candidate may sit flush against an existing booking.
    let existing = [booked("09:30", "10:00", false)];
    let outcome = resolve_day(&monday_ctx(policy(30), &weekly, &[], &existing));

    assert_eq!(starts(&outcome), vec!["09:00", "10:00", "10:30"]);
}

// ── Overrides ───────────────────────────────────────────────────────────────

#[test]
fn override_replaces_weekly_windows_entirely() {
    let weekly = [weekly(1, "09:00", "17:00")];
    let overrides = [OverrideWindow {
        date: date("2026-03-16"),
        start: Some(time("13:00")),
        end: Some(time("14:00")),
    }];
    let outcome = resolve_day(&monday_ctx(policy(30), &weekly, &overrides, &[]));

    assert_eq!(starts(&outcome), vec!["13:00", "13:30"]);
}

#[test]
fn null_override_closes_the_day_despite_weekly_windows() {
    let weekly = [weekly(1, "09:00", "17:00")];
    let overrides = [OverrideWindow {
        date: date("2026-03-16"),
        start: None,
        end: None,
    }];
    let outcome = resolve_day(&monday_ctx(policy(30), &weekly, &overrides, &[]));

    assert_eq!(
        outcome,
        SlotOutcome::Unavailable(UnavailableReason::NotAvailable)
    );
}

#[test]
fn override_for_another_date_is_ignored() {
    let weekly = [weekly(1, "09:00", "10:00")];
    let overrides = [OverrideWindow {
        date: date("2026-03-17"),
        start: None,
        end: None,
    }];
    let outcome = resolve_day(&monday_ctx(policy(30), &weekly, &overrides, &[]));

    assert_eq!(starts(&outcome), vec!["09:00", "09:30"]);
}

// ── Minimum notice ──────────────────────────────────────────────────────────

#[test]
fn dates_before_the_notice_horizon_are_rejected_with_the_hours() {
    let weekly = [weekly(1, "09:00", "17:00")];
    let ctx = DayContext {
        date: date("2026-03-16"),
        now: at("2026-03-16", "08:00"),
        policy: policy(30),
        notice_hours: 48,
        weekly: &weekly,
        overrides: &[],
        booked: &[],
    };

    assert_eq!(
        resolve_day(&ctx),
        SlotOutcome::Unavailable(UnavailableReason::MinimumNotice { hours: 48 })
    );
}

#[test]
fn same_day_slots_at_or_before_the_cutoff_are_dropped() {
    let weekly = [weekly(1, "09:00", "12:00")];
    // now + 2h = 10:00; the 10:00 candidate is "at" the cutoff and goes too.
    let ctx = DayContext {
        date: date("2026-03-16"),
        now: at("2026-03-16", "08:00"),
        policy: policy(30),
        notice_hours: 2,
        weekly: &weekly,
        overrides: &[],
        booked: &[],
    };

    assert_eq!(starts(&resolve_day(&ctx)), vec!["10:30", "11:00", "11:30"]);
}

#[test]
fn cutoff_only_applies_when_the_horizon_lands_on_the_target_date() {
    let weekly = [weekly(1, "09:00", "10:00")];
    // Horizon lands the day before the target; every slot survives.
    let ctx = DayContext {
        date: date("2026-03-16"),
        now: at("2026-03-14", "23:00"),
        policy: policy(30),
        notice_hours: 12,
        weekly: &weekly,
        overrides: &[],
        booked: &[],
    };

    assert_eq!(starts(&resolve_day(&ctx)), vec!["09:00", "09:30"]);
}

// ── Daily cap ───────────────────────────────────────────────────────────────

#[test]
fn daily_cap_counts_only_same_event_type_bookings() {
    let weekly = [weekly(1, "09:00", "17:00")];
    let existing = [booked("09:00", "09:30", false)];
    let capped = EventPolicy {
        max_per_day: Some(1),
        ..policy(30)
    };
    let outcome = resolve_day(&monday_ctx(capped, &weekly, &[], &existing));

    // The other event type's booking does not consume this type's cap.
    assert!(matches!(outcome, SlotOutcome::Open(_)));
}

#[test]
fn daily_cap_reached_yields_the_capacity_reason() {
    let weekly = [weekly(1, "09:00", "17:00")];
    let existing = [booked("09:00", "09:30", true)];
    let capped = EventPolicy {
        max_per_day: Some(1),
        ..policy(30)
    };
    let outcome = resolve_day(&monday_ctx(capped, &weekly, &[], &existing));

    assert_eq!(
        outcome,
        SlotOutcome::Unavailable(UnavailableReason::DailyCapReached)
    );
    assert_eq!(
        outcome.message().unwrap(),
        "Maximum bookings reached for this event type today"
    );
}

// ── Determinism ─────────────────────────────────────────────────────────────

#[test]
fn resolving_twice_yields_an_identical_ordered_list() {
    let weekly = [weekly(1, "09:00", "12:00"), weekly(1, "14:00", "16:00")];
    let existing = [booked("10:00", "11:00", true), booked("14:30", "15:00", false)];
    let ctx = monday_ctx(policy(30), &weekly, &[], &existing);

    assert_eq!(resolve_day(&ctx), resolve_day(&ctx));
}

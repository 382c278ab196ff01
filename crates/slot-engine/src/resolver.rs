//! Day resolution: availability windows minus bookings, on a fixed grid.
//!
//! The resolver is pure. The caller gathers everything the day depends on into
//! a [`DayContext`] (including "now"); the same context always produces the
//! same ordered slot list.

use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime};

use crate::grid::{self, SLOT_STEP_MINUTES};
use crate::types::{
    BookedInterval, EventPolicy, OverrideWindow, Slot, SlotOutcome, UnavailableReason, WeeklyWindow,
};

/// Everything one day's slot resolution depends on.
#[derive(Debug, Clone)]
pub struct DayContext<'a> {
    /// The date being resolved.
    pub date: NaiveDate,
    /// The current wall-clock instant, in the counselor's local time.
    pub now: NaiveDateTime,
    /// Duration, buffers, and per-day cap of the event type.
    pub policy: EventPolicy,
    /// Minimum advance notice required by the governing schedule.
    pub notice_hours: i64,
    /// Recurring weekly rows for the schedule (all weekdays; the resolver
    /// selects the target weekday).
    pub weekly: &'a [WeeklyWindow],
    /// Date overrides for the schedule. Any row matching the target date
    /// replaces the weekly windows, even when its times are null.
    pub overrides: &'a [OverrideWindow],
    /// Non-cancelled appointments already on the counselor's calendar for the
    /// date.
    pub booked: &'a [BookedInterval],
}

/// Resolve the bookable slots for one day.
pub fn resolve_day(ctx: &DayContext<'_>) -> SlotOutcome {
    let min_bookable = ctx.now + Duration::hours(ctx.notice_hours);

    if ctx.date < min_bookable.date() {
        return SlotOutcome::Unavailable(UnavailableReason::MinimumNotice {
            hours: ctx.notice_hours,
        });
    }

    let windows = day_windows(ctx);
    if windows.is_empty() {
        return SlotOutcome::Unavailable(UnavailableReason::NotAvailable);
    }

    if let Some(cap) = ctx.policy.max_per_day {
        let same_type = ctx.booked.iter().filter(|b| b.same_event_type).count();
        if same_type >= cap as usize {
            return SlotOutcome::Unavailable(UnavailableReason::DailyCapReached);
        }
    }

    let duration = ctx.policy.duration_minutes as i32;
    let buffer_before = ctx.policy.buffer_before as i32;
    let buffer_after = ctx.policy.buffer_after as i32;
    let same_day_cutoff = ctx.date == min_bookable.date();

    let mut slots = Vec::new();
    for (window_start, window_end) in windows {
        let window_end = grid::minutes_of_day(window_end);
        let mut cursor = grid::minutes_of_day(window_start);

        while cursor + duration <= window_end {
            let span_start = cursor - buffer_before;
            let span_end = cursor + duration + buffer_after;

            // Strict open-interval overlap against stored bookings; buffers
            // inflate only the candidate, never the stored intervals.
            let clashes = ctx.booked.iter().any(|b| {
                span_start < grid::minutes_of_day(b.end) && span_end > grid::minutes_of_day(b.start)
            });

            let too_soon = same_day_cutoff
                && slot_instant(ctx.date, cursor).is_some_and(|start| start <= min_bookable);

            if !clashes && !too_soon {
                // Both bounds fit in the day: cursor + duration <= window_end
                // and the window end came from a parsed wall-clock time.
                if let (Some(start), Some(end)) = (
                    grid::time_from_minutes(cursor),
                    grid::time_from_minutes(cursor + duration),
                ) {
                    slots.push(Slot::new(start, end));
                }
            }

            cursor += SLOT_STEP_MINUTES;
        }
    }

    // Windows are walked in start order, but misconfigured overlapping windows
    // could interleave; the contract is a chronological list.
    slots.sort_by_key(|s| s.start_time);
    SlotOutcome::Open(slots)
}

/// The availability windows governing a date: the date's overrides when any
/// exist (null-timed rows contribute nothing, so an explicit closure yields no
/// windows), otherwise the weekly rows for the date's weekday. Windows are
/// ordered by start time.
fn day_windows(ctx: &DayContext<'_>) -> Vec<(NaiveTime, NaiveTime)> {
    let overrides: Vec<&OverrideWindow> = ctx
        .overrides
        .iter()
        .filter(|o| o.date == ctx.date)
        .collect();

    let mut windows: Vec<(NaiveTime, NaiveTime)> = if !overrides.is_empty() {
        overrides
            .into_iter()
            .filter_map(|o| Some((o.start?, o.end?)))
            .collect()
    } else {
        let weekday = grid::weekday_index(ctx.date);
        ctx.weekly
            .iter()
            .filter(|w| w.day_of_week == weekday)
            .filter_map(|w| Some((w.start?, w.end?)))
            .collect()
    };

    windows.retain(|(start, end)| start < end);
    windows.sort();
    windows
}

fn slot_instant(date: NaiveDate, minutes: i32) -> Option<NaiveDateTime> {
    grid::time_from_minutes(minutes).map(|t| date.and_time(t))
}

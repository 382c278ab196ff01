//! Availability management and slot resolution over the store.
//!
//! The slot resolver itself is pure ([`slot_engine::resolve_day`]); this
//! service gathers the day's context — event type, governing schedule, weekly
//! or override windows, existing bookings — and maps the rows into engine
//! inputs.

use std::sync::Arc;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};
use slot_engine::grid::{self, hhmm_opt};
use slot_engine::{BookedInterval, DayContext, EventPolicy, OverrideWindow, SlotOutcome, WeeklyWindow};

use guidepost_store::records::{AvailabilityKind, AvailabilityRow, NewAvailabilityRow};
use guidepost_store::Store;

use crate::error::{Error, Result};

/// Schedule name used when a caller does not name one.
pub const DEFAULT_SCHEDULE_NAME: &str = "Working hours";

/// A counselor's availability for one named schedule, split the way callers
/// consume it.
#[derive(Debug, Clone, Serialize)]
pub struct AvailabilitySet {
    pub schedule_name: String,
    pub weekly: Vec<AvailabilityRow>,
    pub overrides: Vec<AvailabilityRow>,
}

/// One weekly slot as submitted by a counselor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeeklySlotInput {
    pub day_of_week: u8,
    #[serde(default, with = "hhmm_opt")]
    pub start_time: Option<NaiveTime>,
    #[serde(default, with = "hhmm_opt")]
    pub end_time: Option<NaiveTime>,
}

/// One date override as submitted by a counselor. Null times close the date.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OverrideInput {
    pub date: NaiveDate,
    #[serde(default, with = "hhmm_opt")]
    pub start_time: Option<NaiveTime>,
    #[serde(default, with = "hhmm_opt")]
    pub end_time: Option<NaiveTime>,
}

/// The resolved slots for one date, alongside the query echo callers render.
#[derive(Debug, Clone, Serialize)]
pub struct ResolvedSlots {
    pub date: NaiveDate,
    pub duration_minutes: u32,
    pub outcome: SlotOutcome,
}

pub struct AvailabilityService {
    store: Arc<dyn Store>,
}

impl AvailabilityService {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    /// A counselor's full availability for a named schedule.
    pub async fn availability(
        &self,
        counselor_id: &str,
        schedule_name: Option<&str>,
    ) -> Result<AvailabilitySet> {
        let name = schedule_name.unwrap_or(DEFAULT_SCHEDULE_NAME);
        let rows = self.store.availability(counselor_id, name).await?;

        let (weekly, overrides): (Vec<AvailabilityRow>, Vec<AvailabilityRow>) = rows
            .into_iter()
            .partition(|r| r.kind == AvailabilityKind::Weekly);

        Ok(AvailabilitySet {
            schedule_name: name.to_string(),
            weekly,
            overrides,
        })
    }

    /// Replace a schedule's availability wholesale.
    pub async fn replace(
        &self,
        counselor_id: &str,
        schedule_name: Option<&str>,
        weekly: Vec<WeeklySlotInput>,
        overrides: Vec<OverrideInput>,
    ) -> Result<usize> {
        let name = schedule_name.unwrap_or(DEFAULT_SCHEDULE_NAME);

        let mut rows = Vec::with_capacity(weekly.len() + overrides.len());
        for slot in weekly {
            validate_day_of_week(slot.day_of_week)?;
            rows.push(NewAvailabilityRow::weekly(
                counselor_id,
                name,
                slot.day_of_week,
                slot.start_time,
                slot.end_time,
            ));
        }
        for o in overrides {
            rows.push(NewAvailabilityRow::override_for(
                counselor_id,
                name,
                o.date,
                o.start_time,
                o.end_time,
            ));
        }

        Ok(self.store.replace_availability(counselor_id, name, rows).await?)
    }

    /// Add a single weekly slot.
    pub async fn add_weekly_slot(
        &self,
        counselor_id: &str,
        schedule_name: Option<&str>,
        slot: WeeklySlotInput,
    ) -> Result<AvailabilityRow> {
        validate_day_of_week(slot.day_of_week)?;
        let name = schedule_name.unwrap_or(DEFAULT_SCHEDULE_NAME);
        let row = self
            .store
            .insert_availability(NewAvailabilityRow::weekly(
                counselor_id,
                name,
                slot.day_of_week,
                slot.start_time,
                slot.end_time,
            ))
            .await?;
        Ok(row)
    }

    /// Set a date override, replacing any existing override for that date.
    pub async fn set_override(
        &self,
        counselor_id: &str,
        schedule_name: Option<&str>,
        input: OverrideInput,
    ) -> Result<AvailabilityRow> {
        let name = schedule_name.unwrap_or(DEFAULT_SCHEDULE_NAME);
        self.store
            .delete_override(counselor_id, name, input.date)
            .await?;
        let row = self
            .store
            .insert_availability(NewAvailabilityRow::override_for(
                counselor_id,
                name,
                input.date,
                input.start_time,
                input.end_time,
            ))
            .await?;
        Ok(row)
    }

    /// Delete a single availability row.
    pub async fn delete_slot(&self, counselor_id: &str, row_id: &str) -> Result<()> {
        if self
            .store
            .delete_availability_row(counselor_id, row_id)
            .await?
        {
            Ok(())
        } else {
            Err(Error::not_found("Availability slot not found"))
        }
    }

    /// Compute the bookable slots for a counselor, event type, and date.
    ///
    /// Listing proceeds for inactive event types; only the booking path
    /// enforces activity. `now` is supplied by the caller (the counselor's
    /// local wall clock) so resolution stays deterministic.
    pub async fn resolve_slots(
        &self,
        counselor_id: &str,
        event_type_id: &str,
        date: NaiveDate,
        now: NaiveDateTime,
    ) -> Result<ResolvedSlots> {
        let event_type = self
            .store
            .event_type(event_type_id)
            .await?
            .ok_or_else(|| Error::not_found("Event type not found"))?;

        let schedule = match &event_type.schedule_id {
            Some(schedule_id) => self.store.schedule(schedule_id).await?,
            None => self.store.default_schedule(counselor_id).await?,
        };
        let Some(schedule) = schedule else {
            return Ok(ResolvedSlots {
                date,
                duration_minutes: event_type.duration_minutes,
                outcome: SlotOutcome::Unavailable(slot_engine::UnavailableReason::NoSchedule),
            });
        };

        let weekday = grid::weekday_index(date);
        let weekly_rows = self
            .store
            .weekly_windows(counselor_id, &schedule.name, weekday)
            .await?;
        let override_rows = self
            .store
            .override_windows(counselor_id, &schedule.name, date)
            .await?;

        let weekly: Vec<WeeklyWindow> = weekly_rows
            .iter()
            .map(|r| WeeklyWindow {
                day_of_week: r.day_of_week.unwrap_or(weekday),
                start: r.start_time,
                end: r.end_time,
            })
            .collect();
        let overrides: Vec<OverrideWindow> = override_rows
            .iter()
            .map(|r| OverrideWindow {
                date: r.specific_date.unwrap_or(date),
                start: r.start_time,
                end: r.end_time,
            })
            .collect();

        let booked: Vec<BookedInterval> = self
            .store
            .appointments_on(counselor_id, date)
            .await?
            .iter()
            .map(|a| BookedInterval {
                start: a.start_time,
                end: a.end_time,
                same_event_type: a.event_type_id == event_type_id,
            })
            .collect();

        let ctx = DayContext {
            date,
            now,
            policy: EventPolicy {
                duration_minutes: event_type.duration_minutes,
                buffer_before: event_type.buffer_before,
                buffer_after: event_type.buffer_after,
                max_per_day: event_type.max_bookings_per_day,
            },
            notice_hours: schedule.booking_buffer_hours,
            weekly: &weekly,
            overrides: &overrides,
            booked: &booked,
        };

        Ok(ResolvedSlots {
            date,
            duration_minutes: event_type.duration_minutes,
            outcome: slot_engine::resolve_day(&ctx),
        })
    }
}

fn validate_day_of_week(day: u8) -> Result<()> {
    if day > 6 {
        return Err(Error::invalid("Invalid day of week"));
    }
    Ok(())
}

//! Schedule management: the named minimum-notice policies and their seeded
//! availability.

use std::sync::Arc;

use chrono::NaiveTime;
use serde::Deserialize;

use guidepost_store::records::{NewAvailabilityRow, NewSchedule, Schedule, ScheduleUpdate};
use guidepost_store::Store;

use crate::error::{Error, Result};

/// Default minimum notice for a new schedule, in hours.
pub const DEFAULT_NOTICE_HOURS: i64 = 24;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CreateScheduleRequest {
    pub name: String,
    #[serde(default)]
    pub is_default: bool,
    #[serde(default)]
    pub booking_buffer_hours: Option<i64>,
    /// Name of an existing schedule whose availability should be copied into
    /// the new one. Without it the new schedule is seeded with weekday
    /// working hours.
    #[serde(default)]
    pub duplicate_from: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateScheduleRequest {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub is_default: Option<bool>,
    #[serde(default)]
    pub booking_buffer_hours: Option<i64>,
}

pub struct ScheduleService {
    store: Arc<dyn Store>,
}

impl ScheduleService {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    pub async fn list(&self, counselor_id: &str) -> Result<Vec<Schedule>> {
        Ok(self.store.schedules(counselor_id).await?)
    }

    /// Create a schedule. Its availability is copied from `duplicate_from`
    /// when given, otherwise seeded Mon-Fri 09:00-17:00 with closed weekend
    /// markers.
    pub async fn create(
        &self,
        counselor_id: &str,
        request: CreateScheduleRequest,
    ) -> Result<Schedule> {
        let name = request.name.trim().to_string();
        if name.is_empty() {
            return Err(Error::invalid("Schedule name is required"));
        }
        if self
            .store
            .schedule_named(counselor_id, &name)
            .await?
            .is_some()
        {
            return Err(Error::invalid("A schedule with this name already exists"));
        }

        let schedule = self
            .store
            .insert_schedule(NewSchedule {
                counselor_id: counselor_id.to_string(),
                name: name.clone(),
                is_default: request.is_default,
                booking_buffer_hours: request.booking_buffer_hours.unwrap_or(DEFAULT_NOTICE_HOURS),
            })
            .await?;

        let rows = match &request.duplicate_from {
            Some(source_name) => {
                self.copied_rows(counselor_id, source_name, &name).await?
            }
            None => seed_rows(counselor_id, &name),
        };
        if !rows.is_empty() {
            self.store
                .replace_availability(counselor_id, &name, rows)
                .await?;
        }

        Ok(schedule)
    }

    /// Rename a schedule, change its default flag, or adjust its notice
    /// hours. A rename cascades to the schedule's availability rows.
    pub async fn update(
        &self,
        counselor_id: &str,
        schedule_id: &str,
        request: UpdateScheduleRequest,
    ) -> Result<Schedule> {
        let current = self
            .store
            .schedule(schedule_id)
            .await?
            .filter(|s| s.counselor_id == counselor_id)
            .ok_or_else(|| Error::not_found("Schedule not found"))?;

        let mut update = ScheduleUpdate {
            is_default: request.is_default,
            booking_buffer_hours: request.booking_buffer_hours,
            ..Default::default()
        };

        let mut renamed_from = None;
        if let Some(new_name) = &request.name {
            let new_name = new_name.trim().to_string();
            if !new_name.is_empty() && new_name != current.name {
                let clash = self
                    .store
                    .schedule_named(counselor_id, &new_name)
                    .await?
                    .is_some_and(|s| s.id != schedule_id);
                if clash {
                    return Err(Error::invalid("A schedule with this name already exists"));
                }
                update.name = Some(new_name);
                renamed_from = Some(current.name.clone());
            }
        }

        if update.is_empty() {
            return Err(Error::invalid("No changes provided"));
        }

        let new_name = update.name.clone();
        let updated = self
            .store
            .update_schedule(schedule_id, counselor_id, update)
            .await?
            .ok_or_else(|| Error::not_found("Schedule not found"))?;

        if let (Some(old_name), Some(new_name)) = (renamed_from, new_name) {
            self.store
                .rename_schedule_rows(counselor_id, &old_name, &new_name)
                .await?;
        }

        Ok(updated)
    }

    /// Delete a schedule and its availability. The last remaining schedule
    /// cannot be deleted; deleting the default promotes the oldest survivor.
    pub async fn delete(&self, counselor_id: &str, schedule_id: &str) -> Result<()> {
        let current = self
            .store
            .schedule(schedule_id)
            .await?
            .filter(|s| s.counselor_id == counselor_id)
            .ok_or_else(|| Error::not_found("Schedule not found"))?;

        let all = self.store.schedules(counselor_id).await?;
        if all.len() <= 1 {
            return Err(Error::invalid(
                "Cannot delete the last schedule. At least one schedule must exist.",
            ));
        }

        self.store
            .delete_schedule_rows(counselor_id, &current.name)
            .await?;
        self.store.delete_schedule(schedule_id, counselor_id).await?;

        if current.is_default {
            let remaining = self.store.schedules(counselor_id).await?;
            if let Some(oldest) = remaining.first() {
                self.store
                    .update_schedule(
                        &oldest.id,
                        counselor_id,
                        ScheduleUpdate {
                            is_default: Some(true),
                            ..Default::default()
                        },
                    )
                    .await?;
            }
        }

        Ok(())
    }

    /// Copy a schedule (notice hours and availability) under a new name. The
    /// copy is never the default.
    pub async fn duplicate(
        &self,
        counselor_id: &str,
        schedule_id: &str,
        new_name: &str,
    ) -> Result<Schedule> {
        let new_name = new_name.trim().to_string();
        if new_name.is_empty() {
            return Err(Error::invalid("New schedule name is required"));
        }

        let source = self
            .store
            .schedule(schedule_id)
            .await?
            .filter(|s| s.counselor_id == counselor_id)
            .ok_or_else(|| Error::not_found("Source schedule not found"))?;

        if self
            .store
            .schedule_named(counselor_id, &new_name)
            .await?
            .is_some()
        {
            return Err(Error::invalid("A schedule with this name already exists"));
        }

        let schedule = self
            .store
            .insert_schedule(NewSchedule {
                counselor_id: counselor_id.to_string(),
                name: new_name.clone(),
                is_default: false,
                booking_buffer_hours: source.booking_buffer_hours,
            })
            .await?;

        let rows = self
            .copied_rows(counselor_id, &source.name, &new_name)
            .await?;
        if !rows.is_empty() {
            self.store
                .replace_availability(counselor_id, &new_name, rows)
                .await?;
        }

        Ok(schedule)
    }

    async fn copied_rows(
        &self,
        counselor_id: &str,
        source_name: &str,
        target_name: &str,
    ) -> Result<Vec<NewAvailabilityRow>> {
        let source_rows = self.store.availability(counselor_id, source_name).await?;
        Ok(source_rows
            .into_iter()
            .map(|r| NewAvailabilityRow {
                counselor_id: counselor_id.to_string(),
                schedule_name: target_name.to_string(),
                kind: r.kind,
                day_of_week: r.day_of_week,
                specific_date: r.specific_date,
                start_time: r.start_time,
                end_time: r.end_time,
            })
            .collect())
    }
}

/// Weekday working hours, with explicit closed markers for the weekend.
fn seed_rows(counselor_id: &str, schedule_name: &str) -> Vec<NewAvailabilityRow> {
    let open = NaiveTime::from_hms_opt(9, 0, 0);
    let close = NaiveTime::from_hms_opt(17, 0, 0);
    (0u8..7)
        .map(|day| {
            if day == 0 || day == 6 {
                NewAvailabilityRow::weekly(counselor_id, schedule_name, day, None, None)
            } else {
                NewAvailabilityRow::weekly(counselor_id, schedule_name, day, open, close)
            }
        })
        .collect()
}

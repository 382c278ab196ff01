//! Event-type management: the bookable service definitions.

use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use guidepost_store::records::{EventType, EventTypeUpdate, NewEventType};
use guidepost_store::Store;

use crate::error::{Error, Result};

/// An event type decorated with the name of its linked schedule, the shape
/// counselor dashboards render.
#[derive(Debug, Clone, Serialize)]
pub struct EventTypeWithSchedule {
    #[serde(flatten)]
    pub event_type: EventType,
    pub schedule_name: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CreateEventTypeRequest {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub duration_minutes: Option<u32>,
    #[serde(default)]
    pub color: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub location_type: Option<String>,
    #[serde(default)]
    pub location_details: Option<String>,
    #[serde(default)]
    pub is_active: Option<bool>,
    #[serde(default)]
    pub requires_approval: Option<bool>,
    #[serde(default)]
    pub max_bookings_per_day: Option<u32>,
    #[serde(default)]
    pub buffer_before: Option<u32>,
    #[serde(default)]
    pub buffer_after: Option<u32>,
    #[serde(default)]
    pub schedule_id: Option<String>,
}

pub struct EventTypeService {
    store: Arc<dyn Store>,
}

impl EventTypeService {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    /// All of a counselor's event types with their schedule names.
    pub async fn list(&self, counselor_id: &str) -> Result<Vec<EventTypeWithSchedule>> {
        let event_types = self.store.event_types(counselor_id).await?;
        let schedules = self.store.schedules(counselor_id).await?;
        let names: HashMap<&str, &str> = schedules
            .iter()
            .map(|s| (s.id.as_str(), s.name.as_str()))
            .collect();

        Ok(event_types
            .into_iter()
            .map(|event_type| {
                let schedule_name = event_type
                    .schedule_id
                    .as_deref()
                    .and_then(|id| names.get(id))
                    .map(|name| name.to_string());
                EventTypeWithSchedule {
                    event_type,
                    schedule_name,
                }
            })
            .collect())
    }

    pub async fn create(
        &self,
        counselor_id: &str,
        request: CreateEventTypeRequest,
    ) -> Result<EventType> {
        let name = request.name.trim().to_string();
        if name.is_empty() {
            return Err(Error::invalid("Event type name is required"));
        }

        let mut event_type = NewEventType::new(counselor_id, name);
        event_type.description = request.description;
        if let Some(duration) = request.duration_minutes {
            event_type.duration_minutes = duration;
        }
        if let Some(color) = request.color {
            event_type.color = color;
        }
        if let Some(category) = request.category {
            event_type.category = category;
        }
        if let Some(location_type) = request.location_type {
            event_type.location_type = location_type;
        }
        event_type.location_details = request.location_details;
        if let Some(is_active) = request.is_active {
            event_type.is_active = is_active;
        }
        if let Some(requires_approval) = request.requires_approval {
            event_type.requires_approval = requires_approval;
        }
        event_type.max_bookings_per_day = request.max_bookings_per_day;
        if let Some(before) = request.buffer_before {
            event_type.buffer_before = before;
        }
        if let Some(after) = request.buffer_after {
            event_type.buffer_after = after;
        }
        event_type.schedule_id = request.schedule_id;

        Ok(self.store.insert_event_type(event_type).await?)
    }

    pub async fn update(
        &self,
        counselor_id: &str,
        event_type_id: &str,
        update: EventTypeUpdate,
    ) -> Result<EventType> {
        if let Some(name) = &update.name {
            if name.trim().is_empty() {
                return Err(Error::invalid("Event type name cannot be empty"));
            }
        }
        if update.is_empty() {
            return Err(Error::invalid("No changes provided"));
        }

        self.store
            .update_event_type(event_type_id, counselor_id, update)
            .await?
            .ok_or_else(|| Error::not_found("Event type not found"))
    }

    pub async fn delete(&self, counselor_id: &str, event_type_id: &str) -> Result<()> {
        if self
            .store
            .delete_event_type(event_type_id, counselor_id)
            .await?
        {
            Ok(())
        } else {
            Err(Error::not_found("Event type not found"))
        }
    }

    /// Copy an event type under a new name. Copies start inactive so they can
    /// be reviewed before students see them.
    pub async fn duplicate(
        &self,
        counselor_id: &str,
        event_type_id: &str,
        new_name: &str,
    ) -> Result<EventType> {
        let new_name = new_name.trim().to_string();
        if new_name.is_empty() {
            return Err(Error::invalid("New event type name is required"));
        }

        let source = self
            .store
            .event_type(event_type_id)
            .await?
            .filter(|et| et.counselor_id == counselor_id)
            .ok_or_else(|| Error::not_found("Source event type not found"))?;

        let copy = NewEventType {
            counselor_id: counselor_id.to_string(),
            name: new_name,
            description: source.description,
            duration_minutes: source.duration_minutes,
            color: source.color,
            category: source.category,
            location_type: source.location_type,
            location_details: source.location_details,
            is_active: false,
            requires_approval: source.requires_approval,
            max_bookings_per_day: source.max_bookings_per_day,
            buffer_before: source.buffer_before,
            buffer_after: source.buffer_after,
            schedule_id: source.schedule_id,
        };

        Ok(self.store.insert_event_type(copy).await?)
    }

    /// Active event types linked to one schedule.
    pub async fn for_schedule(
        &self,
        counselor_id: &str,
        schedule_id: &str,
    ) -> Result<Vec<EventType>> {
        Ok(self
            .store
            .event_types_for_schedule(counselor_id, schedule_id)
            .await?)
    }

    /// Student-facing listing: active event types, optionally by category.
    pub async fn public(
        &self,
        counselor_id: &str,
        category: Option<&str>,
    ) -> Result<Vec<EventType>> {
        Ok(self.store.public_event_types(counselor_id, category).await?)
    }
}

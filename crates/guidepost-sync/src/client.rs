//! Low-level calendar API client.
//!
//! Speaks the calendar provider's events API against the user's primary
//! calendar: insert, patch, delete. Authentication is a per-call bearer token;
//! token acquisition and refresh live in [`crate::oauth`] and the gateway.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{SyncError, SyncResult};

const CALENDAR_API_BASE: &str = "https://www.googleapis.com/calendar/v3";

/// Event body for inserts and patches. `None` fields are omitted, which the
/// API treats as "leave unchanged" on patch.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EventPayload {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start: Option<EventTime>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end: Option<EventTime>,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub attendees: Vec<Attendee>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EventTime {
    pub date_time: String,
    pub time_zone: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct Attendee {
    pub email: String,
}

#[derive(Debug, Deserialize)]
struct InsertedEvent {
    id: String,
}

#[derive(Debug, Clone)]
pub struct CalendarClient {
    http: reqwest::Client,
}

impl CalendarClient {
    pub fn new(timeout: Duration) -> SyncResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| SyncError::Configuration(format!("failed to build HTTP client: {}", e)))?;
        Ok(Self { http })
    }

    fn events_url(&self, event_id: Option<&str>) -> String {
        match event_id {
            Some(id) => format!(
                "{}/calendars/primary/events/{}",
                CALENDAR_API_BASE,
                urlencoding::encode(id)
            ),
            None => format!("{}/calendars/primary/events", CALENDAR_API_BASE),
        }
    }

    /// Create an event on the user's primary calendar, returning its id.
    pub async fn insert_event(
        &self,
        access_token: &str,
        payload: &EventPayload,
    ) -> SyncResult<String> {
        let response = self
            .http
            .post(self.events_url(None))
            .bearer_auth(access_token)
            .json(payload)
            .send()
            .await
            .map_err(|e| SyncError::Network(e.to_string()))?;

        let body = Self::check(response).await?;
        let event: InsertedEvent = serde_json::from_str(&body)
            .map_err(|e| SyncError::InvalidResponse(format!("failed to parse event: {}", e)))?;
        debug!(event_id = %event.id, "calendar event created");
        Ok(event.id)
    }

    /// Patch fields of an existing event.
    pub async fn patch_event(
        &self,
        access_token: &str,
        event_id: &str,
        payload: &EventPayload,
    ) -> SyncResult<()> {
        let response = self
            .http
            .patch(self.events_url(Some(event_id)))
            .bearer_auth(access_token)
            .json(payload)
            .send()
            .await
            .map_err(|e| SyncError::Network(e.to_string()))?;

        Self::check(response).await.map(|_| ())
    }

    /// Delete an event. An already-deleted event (404/410) counts as success.
    pub async fn delete_event(&self, access_token: &str, event_id: &str) -> SyncResult<()> {
        let response = self
            .http
            .delete(self.events_url(Some(event_id)))
            .bearer_auth(access_token)
            .send()
            .await
            .map_err(|e| SyncError::Network(e.to_string()))?;

        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND || status == reqwest::StatusCode::GONE {
            debug!(event_id, "calendar event already gone");
            return Ok(());
        }
        Self::check(response).await.map(|_| ())
    }

    async fn check(response: reqwest::Response) -> SyncResult<String> {
        let status = response.status();

        if status == reqwest::StatusCode::UNAUTHORIZED {
            return Err(SyncError::Authentication(
                "access token expired or invalid".to_string(),
            ));
        }

        let body = response
            .text()
            .await
            .map_err(|e| SyncError::Network(format!("failed to read response: {}", e)))?;

        if !status.is_success() {
            return Err(SyncError::Api {
                status: status.as_u16(),
                message: body,
            });
        }
        Ok(body)
    }
}

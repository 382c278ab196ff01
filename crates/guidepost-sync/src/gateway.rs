//! The calendar gateway seam.
//!
//! [`CalendarGateway`] is what the booking services call: best-effort
//! operations that return `Option`/`bool` instead of errors, because sync
//! must never block or fail the primary mutation. The Google-backed
//! implementation pulls per-user credentials through the [`CredentialStore`]
//! seam, refreshing access tokens as needed.

use std::future::Future;
use std::pin::Pin;
use std::time::Duration as StdDuration;

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use tracing::warn;

use crate::client::{Attendee, CalendarClient, EventPayload, EventTime};
use crate::error::SyncResult;
use crate::oauth::{self, OAuthConfig};

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Stored calendar credentials for one user, as the gateway sees them.
#[derive(Debug, Clone)]
pub struct Credentials {
    pub refresh_token: String,
    pub access_token: Option<String>,
    pub expires_at: Option<DateTime<Utc>>,
    pub sync_enabled: bool,
}

/// Where the gateway reads and writes per-user tokens. Implemented by the
/// platform over its storage collaborator; lookups that fail are reported as
/// absent, keeping sync best-effort.
pub trait CredentialStore: Send + Sync {
    fn credentials<'a>(&'a self, user_id: &'a str) -> BoxFuture<'a, Option<Credentials>>;

    /// Persist a refreshed access token. Failures are logged by the
    /// implementation; the fresh token is still used for this call.
    fn store_access_token<'a>(
        &'a self,
        user_id: &'a str,
        access_token: &'a str,
        expires_at: Option<DateTime<Utc>>,
    ) -> BoxFuture<'a, ()>;
}

/// What an appointment looks like to the calendar.
#[derive(Debug, Clone)]
pub struct EventDetails {
    pub summary: String,
    /// `None` on updates leaves the provider-side description untouched.
    pub description: Option<String>,
    pub date: NaiveDate,
    pub start: NaiveTime,
    pub end: NaiveTime,
    pub attendees: Vec<String>,
    pub location: Option<String>,
}

/// Best-effort calendar operations keyed by platform user id.
///
/// `create_event` returns the provider's event id when sync happened, `None`
/// when the user has no usable credentials or the call failed. The mutating
/// operations return whether they took effect. None of them error.
pub trait CalendarGateway: Send + Sync {
    /// Whether the user has connected a calendar with sync enabled.
    fn is_connected<'a>(&'a self, user_id: &'a str) -> BoxFuture<'a, bool>;

    fn create_event<'a>(
        &'a self,
        user_id: &'a str,
        event: EventDetails,
    ) -> BoxFuture<'a, Option<String>>;

    fn update_event<'a>(
        &'a self,
        user_id: &'a str,
        event_id: &'a str,
        event: EventDetails,
    ) -> BoxFuture<'a, bool>;

    fn delete_event<'a>(&'a self, user_id: &'a str, event_id: &'a str) -> BoxFuture<'a, bool>;
}

/// Google-backed gateway. Constructed explicitly and injected where needed;
/// one instance is shared per process via `Arc`.
pub struct GoogleCalendar {
    client: CalendarClient,
    http: reqwest::Client,
    oauth: OAuthConfig,
    credentials: std::sync::Arc<dyn CredentialStore>,
    /// IANA timezone applied to event times (appointments are stored as
    /// campus-local wall-clock times).
    timezone: String,
}

impl GoogleCalendar {
    pub fn new(
        oauth: OAuthConfig,
        credentials: std::sync::Arc<dyn CredentialStore>,
        timezone: impl Into<String>,
    ) -> SyncResult<Self> {
        Ok(Self {
            client: CalendarClient::new(StdDuration::from_secs(10))?,
            http: reqwest::Client::new(),
            oauth,
            credentials,
            timezone: timezone.into(),
        })
    }

    /// A usable access token for the user, refreshing (and persisting) when
    /// the stored one is stale. `None` when the user is not connected or the
    /// refresh fails.
    async fn access_token_for(&self, user_id: &str) -> Option<String> {
        let creds = self.credentials.credentials(user_id).await?;
        if !creds.sync_enabled {
            return None;
        }

        if let Some(token) = &creds.access_token {
            if !oauth::is_expired(creds.expires_at) {
                return Some(token.clone());
            }
        }

        match oauth::refresh_access_token(&self.http, &self.oauth, &creds.refresh_token).await {
            Ok(refreshed) => {
                self.credentials
                    .store_access_token(user_id, &refreshed.access_token, refreshed.expires_at)
                    .await;
                Some(refreshed.access_token)
            }
            Err(e) => {
                warn!(user_id, error = %e, "calendar token refresh failed");
                None
            }
        }
    }

    fn event_time(&self, date: NaiveDate, time: NaiveTime) -> EventTime {
        EventTime {
            date_time: format!("{}T{}:00", date, time.format("%H:%M")),
            time_zone: self.timezone.clone(),
        }
    }

    fn payload(&self, event: &EventDetails) -> EventPayload {
        EventPayload {
            summary: Some(event.summary.clone()),
            description: event.description.clone(),
            start: Some(self.event_time(event.date, event.start)),
            end: Some(self.event_time(event.date, event.end)),
            attendees: event
                .attendees
                .iter()
                .map(|email| Attendee {
                    email: email.clone(),
                })
                .collect(),
            location: event.location.clone(),
        }
    }
}

impl CalendarGateway for GoogleCalendar {
    fn is_connected<'a>(&'a self, user_id: &'a str) -> BoxFuture<'a, bool> {
        Box::pin(async move {
            self.credentials
                .credentials(user_id)
                .await
                .is_some_and(|c| c.sync_enabled)
        })
    }

    fn create_event<'a>(
        &'a self,
        user_id: &'a str,
        event: EventDetails,
    ) -> BoxFuture<'a, Option<String>> {
        Box::pin(async move {
            let token = self.access_token_for(user_id).await?;
            match self.client.insert_event(&token, &self.payload(&event)).await {
                Ok(event_id) => Some(event_id),
                Err(e) => {
                    warn!(user_id, error = %e, "calendar event creation failed");
                    None
                }
            }
        })
    }

    fn update_event<'a>(
        &'a self,
        user_id: &'a str,
        event_id: &'a str,
        event: EventDetails,
    ) -> BoxFuture<'a, bool> {
        Box::pin(async move {
            let Some(token) = self.access_token_for(user_id).await else {
                return false;
            };
            match self
                .client
                .patch_event(&token, event_id, &self.payload(&event))
                .await
            {
                Ok(()) => true,
                Err(e) => {
                    warn!(user_id, event_id, error = %e, "calendar event update failed");
                    false
                }
            }
        })
    }

    fn delete_event<'a>(&'a self, user_id: &'a str, event_id: &'a str) -> BoxFuture<'a, bool> {
        Box::pin(async move {
            let Some(token) = self.access_token_for(user_id).await else {
                warn!(user_id, event_id, "no calendar credentials, cannot delete event");
                return false;
            };
            match self.client.delete_event(&token, event_id).await {
                Ok(()) => true,
                Err(e) => {
                    warn!(user_id, event_id, error = %e, "calendar event deletion failed");
                    false
                }
            }
        })
    }
}

/// A gateway for deployments with calendar sync turned off (and for offline
/// tooling). Nothing is ever connected.
#[derive(Debug, Clone, Copy, Default)]
pub struct DisconnectedCalendar;

impl CalendarGateway for DisconnectedCalendar {
    fn is_connected<'a>(&'a self, _user_id: &'a str) -> BoxFuture<'a, bool> {
        Box::pin(async { false })
    }

    fn create_event<'a>(
        &'a self,
        _user_id: &'a str,
        _event: EventDetails,
    ) -> BoxFuture<'a, Option<String>> {
        Box::pin(async { None })
    }

    fn update_event<'a>(
        &'a self,
        _user_id: &'a str,
        _event_id: &'a str,
        _event: EventDetails,
    ) -> BoxFuture<'a, bool> {
        Box::pin(async { false })
    }

    fn delete_event<'a>(&'a self, _user_id: &'a str, _event_id: &'a str) -> BoxFuture<'a, bool> {
        Box::pin(async { false })
    }
}

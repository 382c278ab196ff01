//! PostgREST-dialect HTTP backend for the hosted database.
//!
//! Queries are expressed as querystring filters (`counselor_id=eq.abc`,
//! `status=in.(pending,confirmed)`, `order=created_at.asc`); mutations use
//! `Prefer: return=representation` so affected rows come back in the response.
//! The database's exclusion constraint on appointment intervals surfaces as a
//! 409, mapped to [`StoreError::Conflict`].

use std::time::Duration;

use chrono::{DateTime, NaiveDate, Utc};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;
use url::Url;

use crate::error::{StoreError, StoreResult};
use crate::records::{
    Appointment, AppointmentQuery, AppointmentUpdate, AvailabilityRow, CalendarCredentials,
    DirectoryEntry, EventType, EventTypeUpdate, NewAppointment, NewAvailabilityRow, NewEventType,
    NewSchedule, PartyRole, Schedule, ScheduleUpdate,
};
use crate::store::{BoxFuture, Store};

/// Statuses that occupy calendar time, as a PostgREST `in` filter.
const OCCUPYING: &str = "in.(pending,confirmed)";

#[derive(Debug, Clone)]
pub struct RestStore {
    http: reqwest::Client,
    base: Url,
    service_key: String,
}

type Params = Vec<(String, String)>;

fn eq(column: &str, value: &str) -> (String, String) {
    (column.to_string(), format!("eq.{}", value))
}

fn order(clause: &str) -> (String, String) {
    ("order".to_string(), clause.to_string())
}

/// `or=(student_id.eq.X,counselor_id.eq.X)` for either-side listings.
fn either_party(user_id: &str) -> (String, String) {
    (
        "or".to_string(),
        format!("(student_id.eq.{0},counselor_id.eq.{0})", user_id),
    )
}

impl RestStore {
    pub fn new(base_url: &str, service_key: impl Into<String>) -> StoreResult<Self> {
        let base = Url::parse(base_url)
            .map_err(|e| StoreError::Configuration(format!("invalid base URL: {}", e)))?;
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(15))
            .build()
            .map_err(|e| StoreError::Configuration(format!("failed to build HTTP client: {}", e)))?;
        Ok(Self {
            http,
            base,
            service_key: service_key.into(),
        })
    }

    fn table_url(&self, table: &str) -> StoreResult<Url> {
        self.base
            .join(&format!("rest/v1/{}", table))
            .map_err(|e| StoreError::Configuration(format!("invalid table URL: {}", e)))
    }

    fn request(&self, method: reqwest::Method, url: Url) -> reqwest::RequestBuilder {
        self.http
            .request(method, url)
            .header("apikey", &self.service_key)
            .bearer_auth(&self.service_key)
    }

    async fn read_rows<T: DeserializeOwned>(
        &self,
        response: reqwest::Response,
    ) -> StoreResult<Vec<T>> {
        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| StoreError::Network(format!("failed to read response: {}", e)))?;

        if status == reqwest::StatusCode::CONFLICT {
            return Err(StoreError::Conflict(body));
        }
        if !status.is_success() {
            return Err(StoreError::Api {
                status: status.as_u16(),
                message: body,
            });
        }
        serde_json::from_str(&body).map_err(|e| StoreError::Decode(e.to_string()))
    }

    async fn select<T: DeserializeOwned>(&self, table: &str, params: Params) -> StoreResult<Vec<T>> {
        let url = self.table_url(table)?;
        debug!(table, filters = params.len(), "store select");
        let response = self
            .request(reqwest::Method::GET, url)
            .query(&params)
            .send()
            .await
            .map_err(|e| StoreError::Network(e.to_string()))?;
        self.read_rows(response).await
    }

    async fn select_one<T: DeserializeOwned>(
        &self,
        table: &str,
        mut params: Params,
    ) -> StoreResult<Option<T>> {
        params.push(("limit".to_string(), "1".to_string()));
        Ok(self.select(table, params).await?.into_iter().next())
    }

    async fn insert<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        table: &str,
        body: &B,
    ) -> StoreResult<Vec<T>> {
        let url = self.table_url(table)?;
        debug!(table, "store insert");
        let response = self
            .request(reqwest::Method::POST, url)
            .header("Prefer", "return=representation")
            .json(body)
            .send()
            .await
            .map_err(|e| StoreError::Network(e.to_string()))?;
        self.read_rows(response).await
    }

    async fn upsert<B: Serialize + ?Sized>(
        &self,
        table: &str,
        conflict_column: &str,
        body: &B,
    ) -> StoreResult<()> {
        let url = self.table_url(table)?;
        let response = self
            .request(reqwest::Method::POST, url)
            .query(&[("on_conflict", conflict_column)])
            .header("Prefer", "resolution=merge-duplicates,return=representation")
            .json(body)
            .send()
            .await
            .map_err(|e| StoreError::Network(e.to_string()))?;
        self.read_rows::<serde_json::Value>(response).await.map(|_| ())
    }

    async fn patch<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        table: &str,
        params: Params,
        body: &B,
    ) -> StoreResult<Vec<T>> {
        let url = self.table_url(table)?;
        debug!(table, "store patch");
        let response = self
            .request(reqwest::Method::PATCH, url)
            .query(&params)
            .header("Prefer", "return=representation")
            .json(body)
            .send()
            .await
            .map_err(|e| StoreError::Network(e.to_string()))?;
        self.read_rows(response).await
    }

    /// Delete matching rows, returning how many were removed.
    async fn delete(&self, table: &str, params: Params) -> StoreResult<usize> {
        let url = self.table_url(table)?;
        debug!(table, "store delete");
        let response = self
            .request(reqwest::Method::DELETE, url)
            .query(&params)
            .header("Prefer", "return=representation")
            .send()
            .await
            .map_err(|e| StoreError::Network(e.to_string()))?;
        let rows: Vec<serde_json::Value> = self.read_rows(response).await?;
        Ok(rows.len())
    }
}

impl Store for RestStore {
    fn availability<'a>(
        &'a self,
        counselor_id: &'a str,
        schedule_name: &'a str,
    ) -> BoxFuture<'a, StoreResult<Vec<AvailabilityRow>>> {
        Box::pin(async move {
            self.select(
                "counselor_availability",
                vec![
                    eq("counselor_id", counselor_id),
                    eq("schedule_name", schedule_name),
                ],
            )
            .await
        })
    }

    fn weekly_windows<'a>(
        &'a self,
        counselor_id: &'a str,
        schedule_name: &'a str,
        day_of_week: u8,
    ) -> BoxFuture<'a, StoreResult<Vec<AvailabilityRow>>> {
        Box::pin(async move {
            self.select(
                "counselor_availability",
                vec![
                    eq("counselor_id", counselor_id),
                    eq("schedule_name", schedule_name),
                    eq("type", "weekly"),
                    eq("day_of_week", &day_of_week.to_string()),
                ],
            )
            .await
        })
    }

    fn override_windows<'a>(
        &'a self,
        counselor_id: &'a str,
        schedule_name: &'a str,
        date: NaiveDate,
    ) -> BoxFuture<'a, StoreResult<Vec<AvailabilityRow>>> {
        Box::pin(async move {
            self.select(
                "counselor_availability",
                vec![
                    eq("counselor_id", counselor_id),
                    eq("schedule_name", schedule_name),
                    eq("type", "override"),
                    eq("specific_date", &date.to_string()),
                ],
            )
            .await
        })
    }

    fn replace_availability<'a>(
        &'a self,
        counselor_id: &'a str,
        schedule_name: &'a str,
        rows: Vec<NewAvailabilityRow>,
    ) -> BoxFuture<'a, StoreResult<usize>> {
        Box::pin(async move {
            self.delete(
                "counselor_availability",
                vec![
                    eq("counselor_id", counselor_id),
                    eq("schedule_name", schedule_name),
                ],
            )
            .await?;
            if rows.is_empty() {
                return Ok(0);
            }
            let inserted: Vec<AvailabilityRow> =
                self.insert("counselor_availability", &rows).await?;
            Ok(inserted.len())
        })
    }

    fn insert_availability<'a>(
        &'a self,
        row: NewAvailabilityRow,
    ) -> BoxFuture<'a, StoreResult<AvailabilityRow>> {
        Box::pin(async move {
            let rows: Vec<AvailabilityRow> =
                self.insert("counselor_availability", &[row]).await?;
            rows.into_iter().next().ok_or_else(|| StoreError::Api {
                status: 500,
                message: "insert returned no rows".to_string(),
            })
        })
    }

    fn delete_override<'a>(
        &'a self,
        counselor_id: &'a str,
        schedule_name: &'a str,
        date: NaiveDate,
    ) -> BoxFuture<'a, StoreResult<()>> {
        Box::pin(async move {
            self.delete(
                "counselor_availability",
                vec![
                    eq("counselor_id", counselor_id),
                    eq("schedule_name", schedule_name),
                    eq("type", "override"),
                    eq("specific_date", &date.to_string()),
                ],
            )
            .await
            .map(|_| ())
        })
    }

    fn delete_availability_row<'a>(
        &'a self,
        counselor_id: &'a str,
        row_id: &'a str,
    ) -> BoxFuture<'a, StoreResult<bool>> {
        Box::pin(async move {
            let removed = self
                .delete(
                    "counselor_availability",
                    vec![eq("id", row_id), eq("counselor_id", counselor_id)],
                )
                .await?;
            Ok(removed > 0)
        })
    }

    fn rename_schedule_rows<'a>(
        &'a self,
        counselor_id: &'a str,
        old_name: &'a str,
        new_name: &'a str,
    ) -> BoxFuture<'a, StoreResult<()>> {
        Box::pin(async move {
            self.patch::<serde_json::Value, _>(
                "counselor_availability",
                vec![
                    eq("counselor_id", counselor_id),
                    eq("schedule_name", old_name),
                ],
                &serde_json::json!({ "schedule_name": new_name }),
            )
            .await
            .map(|_| ())
        })
    }

    fn delete_schedule_rows<'a>(
        &'a self,
        counselor_id: &'a str,
        schedule_name: &'a str,
    ) -> BoxFuture<'a, StoreResult<()>> {
        Box::pin(async move {
            self.delete(
                "counselor_availability",
                vec![
                    eq("counselor_id", counselor_id),
                    eq("schedule_name", schedule_name),
                ],
            )
            .await
            .map(|_| ())
        })
    }

    fn schedules<'a>(&'a self, counselor_id: &'a str) -> BoxFuture<'a, StoreResult<Vec<Schedule>>> {
        Box::pin(async move {
            self.select(
                "counselor_schedules",
                vec![eq("counselor_id", counselor_id), order("created_at.asc")],
            )
            .await
        })
    }

    fn schedule<'a>(
        &'a self,
        schedule_id: &'a str,
    ) -> BoxFuture<'a, StoreResult<Option<Schedule>>> {
        Box::pin(async move {
            self.select_one("counselor_schedules", vec![eq("id", schedule_id)])
                .await
        })
    }

    fn schedule_named<'a>(
        &'a self,
        counselor_id: &'a str,
        name: &'a str,
    ) -> BoxFuture<'a, StoreResult<Option<Schedule>>> {
        Box::pin(async move {
            self.select_one(
                "counselor_schedules",
                vec![eq("counselor_id", counselor_id), eq("name", name)],
            )
            .await
        })
    }

    fn default_schedule<'a>(
        &'a self,
        counselor_id: &'a str,
    ) -> BoxFuture<'a, StoreResult<Option<Schedule>>> {
        Box::pin(async move {
            self.select_one(
                "counselor_schedules",
                vec![eq("counselor_id", counselor_id), eq("is_default", "true")],
            )
            .await
        })
    }

    fn insert_schedule<'a>(
        &'a self,
        schedule: NewSchedule,
    ) -> BoxFuture<'a, StoreResult<Schedule>> {
        Box::pin(async move {
            let rows: Vec<Schedule> = self.insert("counselor_schedules", &[schedule]).await?;
            rows.into_iter().next().ok_or_else(|| StoreError::Api {
                status: 500,
                message: "insert returned no rows".to_string(),
            })
        })
    }

    fn update_schedule<'a>(
        &'a self,
        schedule_id: &'a str,
        counselor_id: &'a str,
        update: ScheduleUpdate,
    ) -> BoxFuture<'a, StoreResult<Option<Schedule>>> {
        Box::pin(async move {
            let rows: Vec<Schedule> = self
                .patch(
                    "counselor_schedules",
                    vec![eq("id", schedule_id), eq("counselor_id", counselor_id)],
                    &update,
                )
                .await?;
            Ok(rows.into_iter().next())
        })
    }

    fn delete_schedule<'a>(
        &'a self,
        schedule_id: &'a str,
        counselor_id: &'a str,
    ) -> BoxFuture<'a, StoreResult<bool>> {
        Box::pin(async move {
            let removed = self
                .delete(
                    "counselor_schedules",
                    vec![eq("id", schedule_id), eq("counselor_id", counselor_id)],
                )
                .await?;
            Ok(removed > 0)
        })
    }

    fn event_type<'a>(
        &'a self,
        event_type_id: &'a str,
    ) -> BoxFuture<'a, StoreResult<Option<EventType>>> {
        Box::pin(async move {
            self.select_one("event_types", vec![eq("id", event_type_id)])
                .await
        })
    }

    fn event_types<'a>(
        &'a self,
        counselor_id: &'a str,
    ) -> BoxFuture<'a, StoreResult<Vec<EventType>>> {
        Box::pin(async move {
            self.select(
                "event_types",
                vec![eq("counselor_id", counselor_id), order("created_at.asc")],
            )
            .await
        })
    }

    fn event_types_for_schedule<'a>(
        &'a self,
        counselor_id: &'a str,
        schedule_id: &'a str,
    ) -> BoxFuture<'a, StoreResult<Vec<EventType>>> {
        Box::pin(async move {
            self.select(
                "event_types",
                vec![
                    eq("counselor_id", counselor_id),
                    eq("schedule_id", schedule_id),
                    eq("is_active", "true"),
                    order("name.asc"),
                ],
            )
            .await
        })
    }

    fn public_event_types<'a>(
        &'a self,
        counselor_id: &'a str,
        category: Option<&'a str>,
    ) -> BoxFuture<'a, StoreResult<Vec<EventType>>> {
        Box::pin(async move {
            let mut params = vec![
                eq("counselor_id", counselor_id),
                eq("is_active", "true"),
                order("name.asc"),
            ];
            if let Some(category) = category {
                params.push(eq("category", category));
            }
            self.select("event_types", params).await
        })
    }

    fn insert_event_type<'a>(
        &'a self,
        event_type: NewEventType,
    ) -> BoxFuture<'a, StoreResult<EventType>> {
        Box::pin(async move {
            let rows: Vec<EventType> = self.insert("event_types", &[event_type]).await?;
            rows.into_iter().next().ok_or_else(|| StoreError::Api {
                status: 500,
                message: "insert returned no rows".to_string(),
            })
        })
    }

    fn update_event_type<'a>(
        &'a self,
        event_type_id: &'a str,
        counselor_id: &'a str,
        update: EventTypeUpdate,
    ) -> BoxFuture<'a, StoreResult<Option<EventType>>> {
        Box::pin(async move {
            let rows: Vec<EventType> = self
                .patch(
                    "event_types",
                    vec![eq("id", event_type_id), eq("counselor_id", counselor_id)],
                    &update,
                )
                .await?;
            Ok(rows.into_iter().next())
        })
    }

    fn delete_event_type<'a>(
        &'a self,
        event_type_id: &'a str,
        counselor_id: &'a str,
    ) -> BoxFuture<'a, StoreResult<bool>> {
        Box::pin(async move {
            let removed = self
                .delete(
                    "event_types",
                    vec![eq("id", event_type_id), eq("counselor_id", counselor_id)],
                )
                .await?;
            Ok(removed > 0)
        })
    }

    fn appointment<'a>(
        &'a self,
        appointment_id: &'a str,
    ) -> BoxFuture<'a, StoreResult<Option<Appointment>>> {
        Box::pin(async move {
            self.select_one("appointments", vec![eq("id", appointment_id)])
                .await
        })
    }

    fn appointments<'a>(
        &'a self,
        user_id: &'a str,
        role: PartyRole,
        query: AppointmentQuery,
    ) -> BoxFuture<'a, StoreResult<Vec<Appointment>>> {
        Box::pin(async move {
            let mut params = match role {
                PartyRole::Student => vec![eq("student_id", user_id)],
                PartyRole::Counselor => vec![eq("counselor_id", user_id)],
                PartyRole::Either => vec![either_party(user_id)],
            };
            if let Some(status) = query.status {
                params.push(eq("status", status.as_str()));
            }
            if let Some(from) = query.from {
                params.push(("scheduled_date".to_string(), format!("gte.{}", from)));
            }
            if let Some(to) = query.to {
                params.push(("scheduled_date".to_string(), format!("lte.{}", to)));
            }
            params.push(order("scheduled_date.asc,start_time.asc"));
            self.select("appointments", params).await
        })
    }

    fn appointments_on<'a>(
        &'a self,
        counselor_id: &'a str,
        date: NaiveDate,
    ) -> BoxFuture<'a, StoreResult<Vec<Appointment>>> {
        Box::pin(async move {
            self.select(
                "appointments",
                vec![
                    eq("counselor_id", counselor_id),
                    eq("scheduled_date", &date.to_string()),
                    ("status".to_string(), OCCUPYING.to_string()),
                ],
            )
            .await
        })
    }

    fn upcoming_appointment_dates<'a>(
        &'a self,
        counselor_id: &'a str,
        from: NaiveDate,
    ) -> BoxFuture<'a, StoreResult<Vec<NaiveDate>>> {
        Box::pin(async move {
            #[derive(serde::Deserialize)]
            struct DateRow {
                scheduled_date: NaiveDate,
            }
            let rows: Vec<DateRow> = self
                .select(
                    "appointments",
                    vec![
                        ("select".to_string(), "scheduled_date".to_string()),
                        eq("counselor_id", counselor_id),
                        ("scheduled_date".to_string(), format!("gte.{}", from)),
                        ("status".to_string(), OCCUPYING.to_string()),
                        order("scheduled_date.asc"),
                    ],
                )
                .await?;
            Ok(rows.into_iter().map(|r| r.scheduled_date).collect())
        })
    }

    fn insert_appointment<'a>(
        &'a self,
        appointment: NewAppointment,
    ) -> BoxFuture<'a, StoreResult<Appointment>> {
        Box::pin(async move {
            let rows: Vec<Appointment> = self.insert("appointments", &[appointment]).await?;
            rows.into_iter().next().ok_or_else(|| StoreError::Api {
                status: 500,
                message: "insert returned no rows".to_string(),
            })
        })
    }

    fn update_appointment<'a>(
        &'a self,
        appointment_id: &'a str,
        update: AppointmentUpdate,
    ) -> BoxFuture<'a, StoreResult<Option<Appointment>>> {
        Box::pin(async move {
            let rows: Vec<Appointment> = self
                .patch("appointments", vec![eq("id", appointment_id)], &update)
                .await?;
            Ok(rows.into_iter().next())
        })
    }

    fn display_name<'a>(&'a self, user_id: &'a str) -> BoxFuture<'a, StoreResult<Option<String>>> {
        Box::pin(async move {
            let row: Option<DirectoryEntry> = self
                .select_one("profiles", vec![eq("id", user_id)])
                .await?;
            Ok(row.and_then(|r| r.display_name))
        })
    }

    fn email<'a>(&'a self, user_id: &'a str) -> BoxFuture<'a, StoreResult<Option<String>>> {
        Box::pin(async move {
            let row: Option<DirectoryEntry> = self
                .select_one("profiles", vec![eq("id", user_id)])
                .await?;
            Ok(row.and_then(|r| r.email))
        })
    }

    fn calendar_credentials<'a>(
        &'a self,
        user_id: &'a str,
    ) -> BoxFuture<'a, StoreResult<Option<CalendarCredentials>>> {
        Box::pin(async move {
            self.select_one("calendar_credentials", vec![eq("user_id", user_id)])
                .await
        })
    }

    fn upsert_calendar_credentials<'a>(
        &'a self,
        credentials: CalendarCredentials,
    ) -> BoxFuture<'a, StoreResult<()>> {
        Box::pin(async move {
            self.upsert("calendar_credentials", "user_id", &[credentials])
                .await
        })
    }

    fn update_access_token<'a>(
        &'a self,
        user_id: &'a str,
        access_token: &'a str,
        expires_at: Option<DateTime<Utc>>,
    ) -> BoxFuture<'a, StoreResult<()>> {
        Box::pin(async move {
            self.patch::<serde_json::Value, _>(
                "calendar_credentials",
                vec![eq("user_id", user_id)],
                &serde_json::json!({
                    "access_token": access_token,
                    "token_expires_at": expires_at,
                }),
            )
            .await
            .map(|_| ())
        })
    }

    fn delete_calendar_credentials<'a>(
        &'a self,
        user_id: &'a str,
    ) -> BoxFuture<'a, StoreResult<()>> {
        Box::pin(async move {
            self.delete("calendar_credentials", vec![eq("user_id", user_id)])
                .await
                .map(|_| ())
        })
    }
}

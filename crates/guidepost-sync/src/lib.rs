//! # guidepost-sync
//!
//! Best-effort synchronization of appointments into users' third-party
//! calendars.
//!
//! Sync is opportunistic by contract: a user without stored credentials is
//! silently skipped, and any API failure is logged and swallowed — the booking
//! or status change that triggered the sync must never fail because of it.
//! The [`CalendarGateway`] trait is the seam the services depend on; the
//! concrete [`GoogleCalendar`] implementation is injected explicitly, never
//! reached through a process-wide singleton.
//!
//! ## Modules
//!
//! - [`gateway`] — the `CalendarGateway` seam and its Google implementation
//! - [`client`] — low-level calendar API client (insert/patch/delete events)
//! - [`oauth`] — access-token refresh and revocation
//! - [`error`] — error types

pub mod client;
pub mod error;
pub mod gateway;
pub mod oauth;

pub use client::{CalendarClient, EventPayload};
pub use error::{SyncError, SyncResult};
pub use gateway::{
    BoxFuture, CalendarGateway, CredentialStore, Credentials, DisconnectedCalendar, EventDetails,
    GoogleCalendar,
};
pub use oauth::OAuthConfig;

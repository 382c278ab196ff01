//! # guidepost-service
//!
//! Orchestration for the counseling scheduling platform: slot resolution over
//! the store, appointment booking and lifecycle, schedule and event-type
//! management, calendar credential handling, and verified bearer-token
//! authentication.
//!
//! Every collaborator is injected explicitly — the [`Platform`] constructor
//! takes the store and calendar gateway handles and shares them across the
//! services. There is no process-wide singleton and no lazy global state.
//!
//! ## Modules
//!
//! - [`availability`] — availability CRUD and the slot-resolution entry point
//! - [`appointments`] — booking, listing, status transitions, busy dates
//! - [`schedules`] — named minimum-notice policies and seeded availability
//! - [`event_types`] — bookable service definitions
//! - [`calendar`] — calendar credential management and the store adapter
//! - [`auth`] — bearer-token verification against the issuer's JWKS
//! - [`error`] — the platform error taxonomy

pub mod appointments;
pub mod auth;
pub mod availability;
pub mod calendar;
pub mod error;
pub mod event_types;
pub mod schedules;

use std::sync::Arc;

use guidepost_store::Store;
use guidepost_sync::CalendarGateway;

pub use appointments::{AppointmentService, BookingRequest, StatusChange};
pub use auth::{AuthConfig, AuthError, TokenVerifier};
pub use availability::{
    AvailabilityService, AvailabilitySet, OverrideInput, ResolvedSlots, WeeklySlotInput,
    DEFAULT_SCHEDULE_NAME,
};
pub use calendar::{CalendarAccountService, StoreCredentials};
pub use error::{Error, Result};
pub use event_types::{CreateEventTypeRequest, EventTypeService, EventTypeWithSchedule};
pub use schedules::{CreateScheduleRequest, ScheduleService, UpdateScheduleRequest};

/// The platform's service bundle, wired over shared collaborator handles.
pub struct Platform {
    pub availability: AvailabilityService,
    pub appointments: AppointmentService,
    pub schedules: ScheduleService,
    pub event_types: EventTypeService,
    pub calendar_accounts: CalendarAccountService,
}

impl Platform {
    pub fn new(store: Arc<dyn Store>, calendar: Arc<dyn CalendarGateway>) -> Self {
        Self {
            availability: AvailabilityService::new(store.clone()),
            appointments: AppointmentService::new(store.clone(), calendar),
            schedules: ScheduleService::new(store.clone()),
            event_types: EventTypeService::new(store.clone()),
            calendar_accounts: CalendarAccountService::new(store),
        }
    }
}

//! `guidepost` CLI — inspect counselor availability from the command line.
//!
//! Loads a JSON dataset (schedules, availability, event types, appointments)
//! into the in-memory store and answers the same questions the booking page
//! asks, without touching the hosted database. Useful for debugging a
//! counselor's availability configuration offline.
//!
//! ## Usage
//!
//! ```sh
//! # List bookable slots for a counselor, event type, and date
//! guidepost slots --data clinic.json --counselor c-1 --event-type et-1 \
//!     --date 2026-03-16
//!
//! # Pin "now" for reproducible output (minimum-notice checks depend on it)
//! guidepost slots --data clinic.json --counselor c-1 --event-type et-1 \
//!     --date 2026-03-16 --at 2026-03-14T08:00
//!
//! # Show upcoming dates that already carry bookings
//! guidepost busy-days --data clinic.json --counselor c-1 --from 2026-03-01
//! ```

use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::{Local, NaiveDate, NaiveDateTime};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use guidepost_service::{AppointmentService, AvailabilityService};
use guidepost_store::{Dataset, MemoryStore};
use guidepost_sync::DisconnectedCalendar;
use slot_engine::SlotOutcome;

#[derive(Parser)]
#[command(name = "guidepost", version, about = "Counselor availability inspection")]
struct Cli {
    /// Enable debug logging
    #[arg(long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List bookable slots for a counselor, event type, and date
    Slots {
        /// Path to the JSON dataset
        #[arg(short, long)]
        data: String,
        /// Counselor id
        #[arg(long)]
        counselor: String,
        /// Event type id
        #[arg(long)]
        event_type: String,
        /// Target date (YYYY-MM-DD)
        #[arg(long)]
        date: NaiveDate,
        /// Treat this instant as "now" (YYYY-MM-DDTHH:MM); defaults to the
        /// current local time
        #[arg(long)]
        at: Option<String>,
    },
    /// Show upcoming dates that already carry bookings
    BusyDays {
        /// Path to the JSON dataset
        #[arg(short, long)]
        data: String,
        /// Counselor id
        #[arg(long)]
        counselor: String,
        /// Earliest date to include (defaults to today)
        #[arg(long)]
        from: Option<NaiveDate>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.debug {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    match cli.command {
        Commands::Slots {
            data,
            counselor,
            event_type,
            date,
            at,
        } => {
            let store = load_store(&data)?;
            let now = match at {
                Some(at) => parse_instant(&at)?,
                None => Local::now().naive_local(),
            };

            let service = AvailabilityService::new(store);
            let resolved = service
                .resolve_slots(&counselor, &event_type, date, now)
                .await
                .map_err(|e| anyhow::anyhow!(e.to_string()))?;

            match &resolved.outcome {
                SlotOutcome::Unavailable(reason) => {
                    println!("No bookable slots on {}: {}", date, reason);
                }
                SlotOutcome::Open(slots) if slots.is_empty() => {
                    println!("No bookable slots on {}: every candidate time is taken", date);
                }
                SlotOutcome::Open(slots) => {
                    println!(
                        "{} slot(s) on {} ({} min each):",
                        slots.len(),
                        date,
                        resolved.duration_minutes
                    );
                    for slot in slots {
                        println!(
                            "  {} - {}  ({})",
                            slot.start_time.format("%H:%M"),
                            slot.end_time.format("%H:%M"),
                            slot.display_time
                        );
                    }
                }
            }
        }
        Commands::BusyDays {
            data,
            counselor,
            from,
        } => {
            let store = load_store(&data)?;
            let from = from.unwrap_or_else(|| Local::now().date_naive());

            let service = AppointmentService::new(store, Arc::new(DisconnectedCalendar));
            let busy = service
                .busy_dates(&counselor, from)
                .await
                .map_err(|e| anyhow::anyhow!(e.to_string()))?;

            if busy.is_empty() {
                println!("No upcoming appointments on or after {}", from);
            } else {
                for (date, count) in busy {
                    println!("{}  {} appointment(s)", date, count);
                }
            }
        }
    }

    Ok(())
}

fn load_store(path: &str) -> Result<Arc<MemoryStore>> {
    let json = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read dataset: {}", path))?;
    let dataset = Dataset::from_json(&json).context("Failed to parse dataset")?;
    Ok(Arc::new(MemoryStore::from_dataset(dataset)))
}

fn parse_instant(s: &str) -> Result<NaiveDateTime> {
    NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M")
        .or_else(|_| NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S"))
        .with_context(|| format!("Invalid instant (expected YYYY-MM-DDTHH:MM): {}", s))
}

//! Fixed 30-minute slot grid and wall-clock time helpers.
//!
//! All interval arithmetic in the resolver runs on minutes from midnight, the
//! same representation the booking tables use. Times cross the wire as `HH:MM`
//! (24-hour); stored rows may also carry a seconds component, which is accepted
//! on input and dropped.

use chrono::{NaiveDate, NaiveTime, Timelike};

use crate::error::{EngineError, Result};

/// Candidate start times advance on a fixed 30-minute grid regardless of the
/// event duration.
pub const SLOT_STEP_MINUTES: i32 = 30;

/// Minutes from midnight for a wall-clock time.
pub fn minutes_of_day(t: NaiveTime) -> i32 {
    (t.hour() * 60 + t.minute()) as i32
}

/// Wall-clock time for minutes from midnight. `None` when the value falls
/// outside a single day.
pub fn time_from_minutes(minutes: i32) -> Option<NaiveTime> {
    if !(0..24 * 60).contains(&minutes) {
        return None;
    }
    NaiveTime::from_hms_opt(minutes as u32 / 60, minutes as u32 % 60, 0)
}

/// Parse a `HH:MM` or `HH:MM:SS` time string.
pub fn parse_hhmm(s: &str) -> Result<NaiveTime> {
    NaiveTime::parse_from_str(s, "%H:%M")
        .or_else(|_| NaiveTime::parse_from_str(s, "%H:%M:%S"))
        .map_err(|_| EngineError::InvalidTime(s.to_string()))
}

/// Format a time as `HH:MM`.
pub fn format_hhmm(t: NaiveTime) -> String {
    t.format("%H:%M").to_string()
}

/// 12-hour display label with no leading zero, e.g. `9:30 AM`.
pub fn display_12h(t: NaiveTime) -> String {
    let label = t.format("%I:%M %p").to_string();
    label.trim_start_matches('0').to_string()
}

/// Day-of-week index with the booking tables' encoding: 0 = Sunday through
/// 6 = Saturday.
pub fn weekday_index(date: NaiveDate) -> u8 {
    chrono::Datelike::weekday(&date).num_days_from_sunday() as u8
}

/// Serde adapter for `NaiveTime` as `HH:MM` (accepting `HH:MM:SS` on input).
pub mod hhmm {
    use chrono::NaiveTime;
    use serde::{de, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(t: &NaiveTime, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&super::format_hhmm(*t))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<NaiveTime, D::Error> {
        let s = String::deserialize(deserializer)?;
        super::parse_hhmm(&s).map_err(de::Error::custom)
    }
}

/// Serde adapter for `Option<NaiveTime>` as `HH:MM` or null.
pub mod hhmm_opt {
    use chrono::NaiveTime;
    use serde::{de, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(
        t: &Option<NaiveTime>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match t {
            Some(t) => serializer.serialize_some(&super::format_hhmm(*t)),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<NaiveTime>, D::Error> {
        let s: Option<String> = Option::deserialize(deserializer)?;
        match s {
            Some(s) => super::parse_hhmm(&s).map(Some).map_err(de::Error::custom),
            None => Ok(None),
        }
    }
}

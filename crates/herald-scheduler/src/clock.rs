//! Timestamp parsing and calendar-field decomposition in the fixed
//! operating timezone.

use chrono::{DateTime, Datelike, Duration, Timelike, Utc};
use chrono_tz::Tz;

use crate::error::{Result, SchedulerError};

/// The only accepted inbound timestamp profile: fractional seconds and a
/// UTC offset are mandatory, e.g. `2024-03-01T08:00:00.000+01:00`.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.3f%z";

/// Parses absolute timestamps and renders display labels, all in one fixed
/// operating zone.
#[derive(Debug, Clone, Copy)]
pub struct Clock {
    tz: Tz,
}

impl Clock {
    pub fn new(tz: Tz) -> Self {
        Self { tz }
    }

    pub fn timezone(&self) -> Tz {
        self.tz
    }

    /// Parse `raw` against [`TIMESTAMP_FORMAT`].
    ///
    /// The profile is rigid: a missing offset, missing fractional seconds or
    /// a wrong separator is an error, never a best-effort guess. Nothing is
    /// mutated anywhere before this succeeds.
    pub fn resolve(&self, raw: &str) -> Result<CalendarPoint> {
        let parsed = DateTime::parse_from_str(raw, TIMESTAMP_FORMAT).map_err(|e| {
            SchedulerError::InvalidTimestamp {
                input: raw.to_string(),
                reason: e.to_string(),
            }
        })?;
        Ok(CalendarPoint {
            local: parsed.with_timezone(&self.tz),
        })
    }
}

/// An absolute instant plus its calendar-field decomposition in the
/// operating zone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CalendarPoint {
    local: DateTime<Tz>,
}

impl CalendarPoint {
    /// The absolute instant in UTC.
    pub fn instant(&self) -> DateTime<Utc> {
        self.local.with_timezone(&Utc)
    }

    pub fn year(&self) -> i32 {
        self.local.year()
    }
    pub fn month(&self) -> u32 {
        self.local.month()
    }
    pub fn day(&self) -> u32 {
        self.local.day()
    }
    pub fn hour(&self) -> u32 {
        self.local.hour()
    }
    pub fn minute(&self) -> u32 {
        self.local.minute()
    }
    pub fn second(&self) -> u32 {
        self.local.second()
    }

    /// The same point shifted `hours` back — used for the 24-hour-prior
    /// appointment reminder.
    pub fn minus_hours(&self, hours: i64) -> CalendarPoint {
        CalendarPoint {
            local: self.local - Duration::hours(hours),
        }
    }

    /// 12-hour wall-clock label, e.g. `08:00 AM`.
    pub fn clock_label(&self) -> String {
        self.local.format("%I:%M %p").to_string()
    }

    /// Weekday/date/time stamp, e.g. `Tue 2024-03-05 03:30 PM`.
    pub fn event_stamp(&self) -> String {
        self.local.format("%a %Y-%m-%d %I:%M %p").to_string()
    }

    /// Label shared by both slots of an appointment pair.
    pub fn event_label(&self, display_name: &str) -> String {
        format!("'{}' on {}", display_name, self.event_stamp())
    }
}

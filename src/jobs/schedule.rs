//! Recurrence schedules and next-run arithmetic
//!
//! All schedule arithmetic happens in UTC. A schedule computes the next
//! boundary strictly after a reference instant, so a run at exactly the
//! boundary never immediately re-arms for the same instant.

use chrono::{DateTime, Datelike, Duration, NaiveTime, TimeZone, Timelike, Utc, Weekday};

/// When a job recurs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScheduleType {
    /// Runs only when explicitly triggered
    Manual,

    /// Runs every N hours, measured from the last run
    Hourly(u32),

    /// Runs once a day at the given UTC time
    Daily(NaiveTime),

    /// Runs once a week, at 00:00 UTC on the given weekday
    Weekly(Weekday),
}

impl ScheduleType {
    /// Parses the configuration/database spelling of a schedule
    ///
    /// # Arguments
    ///
    /// * `kind` - One of `manual`, `hourly`, `daily`, `weekly`
    /// * `value` - Kind-specific: an hour count, an `HH:MM` time, or a
    ///   weekday name
    pub fn parse(kind: &str, value: &str) -> Result<Self, String> {
        match kind {
            "manual" => Ok(Self::Manual),
            "hourly" => {
                let hours: u32 = value
                    .trim()
                    .parse()
                    .map_err(|_| format!("invalid hour interval: {value:?}"))?;
                if hours == 0 {
                    return Err("hour interval must be at least 1".to_string());
                }
                Ok(Self::Hourly(hours))
            }
            "daily" => {
                let time = NaiveTime::parse_from_str(value.trim(), "%H:%M")
                    .map_err(|_| format!("invalid daily time (expected HH:MM): {value:?}"))?;
                Ok(Self::Daily(time))
            }
            "weekly" => {
                let weekday: Weekday = value
                    .trim()
                    .parse()
                    .map_err(|_| format!("invalid weekday: {value:?}"))?;
                Ok(Self::Weekly(weekday))
            }
            other => Err(format!("unknown schedule type: {other:?}")),
        }
    }

    /// Computes the next run boundary strictly after `reference`
    ///
    /// Returns None for manual schedules, which never self-arm.
    pub fn next_run_after(&self, reference: DateTime<Utc>) -> Option<DateTime<Utc>> {
        match self {
            Self::Manual => None,

            Self::Hourly(hours) => Some(reference + Duration::hours(i64::from(*hours))),

            Self::Daily(time) => {
                let today = reference.date_naive().and_time(*time);
                let candidate = Utc.from_utc_datetime(&today);
                if candidate > reference {
                    Some(candidate)
                } else {
                    Some(candidate + Duration::days(1))
                }
            }

            Self::Weekly(weekday) => {
                let midnight = Utc.from_utc_datetime(&reference.date_naive().and_time(NaiveTime::MIN));
                let days_ahead = i64::from(
                    (weekday.num_days_from_monday() + 7
                        - reference.weekday().num_days_from_monday())
                        % 7,
                );
                let candidate = midnight + Duration::days(days_ahead);
                if candidate > reference {
                    Some(candidate)
                } else {
                    Some(candidate + Duration::days(7))
                }
            }
        }
    }
}

impl std::fmt::Display for ScheduleType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Manual => write!(f, "manual"),
            Self::Hourly(n) => write!(f, "every {n}h"),
            Self::Daily(t) => write!(f, "daily at {:02}:{:02} UTC", t.hour(), t.minute()),
            Self::Weekly(wd) => write!(f, "weekly on {wd}"),
        }
    }
}

/// Time source, injected so schedule behavior is testable
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// The real wall clock
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

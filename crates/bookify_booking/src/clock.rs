// --- File: crates/bookify_booking/src/clock.rs ---
//! Source of "now", injectable so date rules can be tested.

use chrono::{DateTime, NaiveDate, Utc};
use chrono_tz::Tz;
use tracing::warn;

pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Always reports the same instant.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub DateTime<Utc>);

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}

/// Parses an IANA zone name.
pub fn parse_timezone(name: &str) -> Option<Tz> {
    name.trim().parse::<Tz>().ok()
}

/// Calendar date of `clock`'s instant in `timezone`; unknown zones count as UTC.
pub fn today_in(clock: &dyn Clock, timezone: Option<&str>) -> NaiveDate {
    let now = clock.now();
    match timezone {
        Some(name) => match parse_timezone(name) {
            Some(tz) => now.with_timezone(&tz).date_naive(),
            None => {
                warn!("Unknown timezone '{}', using UTC for today's date", name);
                now.date_naive()
            }
        },
        None => now.date_naive(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn today_follows_the_timezone() {
        let clock = FixedClock(Utc.with_ymd_and_hms(2024, 3, 15, 1, 0, 0).unwrap());
        assert_eq!(
            today_in(&clock, Some("America/Buenos_Aires")),
            NaiveDate::from_ymd_opt(2024, 3, 14).unwrap()
        );
        assert_eq!(today_in(&clock, Some("UTC")), NaiveDate::from_ymd_opt(2024, 3, 15).unwrap());
        assert_eq!(today_in(&clock, Some("Mars/Olympus")), NaiveDate::from_ymd_opt(2024, 3, 15).unwrap());
    }
}

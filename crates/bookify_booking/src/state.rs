// --- File: crates/bookify_booking/src/state.rs ---
use chrono::{Datelike, Months, NaiveDate};
use std::fmt;

/// Month-level availability of one calendar date.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DayAvailabilityStatus {
    Loading,
    Available,
    Unavailable,
}

impl fmt::Display for DayAvailabilityStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            DayAvailabilityStatus::Loading => "loading",
            DayAvailabilityStatus::Available => "available",
            DayAvailabilityStatus::Unavailable => "unavailable",
        };
        f.write_str(label)
    }
}

/// Progress of the probe fan-out for the visible month.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MonthPhase {
    /// Nothing probed (no month yet, or event type/timezone unknown).
    #[default]
    Idle,
    /// Probes issued, none settled.
    Loading,
    /// Some probes settled.
    Resolving,
    /// Every probe settled.
    Settled,
}

/// Identity of a month fetch. Results captured under another fingerprint are stale.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Fingerprint {
    pub generation: u64,
    pub event_type_id: String,
    pub timezone: String,
    pub month: NaiveDate,
}

pub fn first_of_month(date: NaiveDate) -> NaiveDate {
    date.with_day(1).unwrap_or(date)
}

/// Every date of the month containing `anchor`, in order.
pub fn days_of_month(anchor: NaiveDate) -> Vec<NaiveDate> {
    let first = first_of_month(anchor);
    let next = first.checked_add_months(Months::new(1));
    first
        .iter_days()
        .take_while(|day| next.map_or(day.month() == first.month(), |next| *day < next))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn month_lengths() {
        assert_eq!(days_of_month(date(2024, 2, 17)).len(), 29);
        assert_eq!(days_of_month(date(2023, 2, 1)).len(), 28);
        assert_eq!(days_of_month(date(2024, 12, 31)).len(), 31);
        assert_eq!(days_of_month(date(2024, 4, 30)).first(), Some(&date(2024, 4, 1)));
    }
}

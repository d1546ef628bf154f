// --- File: crates/bookify_dashboard/src/summary.rs ---
//! Pure metrics over one batch of bookings and event types.

use bookify_common::models::{Booking, EventType};
use chrono::NaiveDate;
use chrono_tz::Tz;
use std::collections::{BTreeMap, BTreeSet};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DashboardSummary {
    pub meeting_count: usize,
    pub total_minutes: i64,
    /// Minutes per event type id. Bookings without an event type are not listed.
    pub minutes_by_event_type: BTreeMap<String, i64>,
}

/// Seconds one booking contributes: its own span when both instants are known,
/// else the matching event type's duration, else zero.
pub fn booking_seconds(booking: &Booking, event_types: &[EventType]) -> i64 {
    if let Some(seconds) = booking.scheduled_seconds() {
        return seconds;
    }
    booking
        .event_type_id
        .as_deref()
        .and_then(|id| event_types.iter().find(|event| event.id == id))
        .and_then(|event| event.duration)
        .map(|minutes| i64::from(minutes) * 60)
        .unwrap_or(0)
}

/// Spans are added up in seconds; each total is cut to whole minutes once.
pub fn summarize(bookings: &[Booking], event_types: &[EventType]) -> DashboardSummary {
    let mut total_seconds = 0;
    let mut seconds_by_event_type: BTreeMap<String, i64> = BTreeMap::new();
    for booking in bookings {
        let seconds = booking_seconds(booking, event_types);
        total_seconds += seconds;
        if let Some(id) = &booking.event_type_id {
            *seconds_by_event_type.entry(id.clone()).or_insert(0) += seconds;
        }
    }
    DashboardSummary {
        meeting_count: bookings.len(),
        total_minutes: total_seconds / 60,
        minutes_by_event_type: seconds_by_event_type
            .into_iter()
            .map(|(id, seconds)| (id, seconds / 60))
            .collect(),
    }
}

/// Calendar dates in `tz` that carry at least one booking.
pub fn booking_dates(bookings: &[Booking], tz: Tz) -> BTreeSet<NaiveDate> {
    bookings
        .iter()
        .filter_map(|booking| booking.start_time)
        .map(|start| start.with_timezone(&tz).date_naive())
        .collect()
}

// --- File: crates/bookify_dashboard/src/lib.rs ---

pub mod summary;

pub use summary::{booking_dates, booking_seconds, summarize, DashboardSummary};

use bookify_common::models::{Booking, BookingQuery, EventType};
use bookify_common::{BookifyError, SchedulingService};
use std::sync::Arc;
use tracing::{error, info};

/// How many upcoming confirmed bookings the dashboard shows.
pub const UPCOMING_LIMIT: u32 = 5;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DashboardData {
    pub event_types: Vec<EventType>,
    pub bookings: Vec<Booking>,
    pub summary: DashboardSummary,
}

pub struct Dashboard<S: SchedulingService + ?Sized> {
    service: Arc<S>,
}

impl<S: SchedulingService + ?Sized> Dashboard<S> {
    pub fn new(service: Arc<S>) -> Self {
        Self { service }
    }

    /// Fetches event types and the next confirmed bookings concurrently.
    pub async fn load(&self) -> Result<DashboardData, BookifyError> {
        let (event_types, bookings) = tokio::join!(
            self.service.get_event_types(),
            self.service
                .get_bookings(BookingQuery::confirmed_upcoming(UPCOMING_LIMIT)),
        );
        let (event_types, bookings) = match (event_types, bookings) {
            (Ok(event_types), Ok(bookings)) => (event_types, bookings),
            (Err(e), _) | (_, Err(e)) => {
                error!("Error loading dashboard data: {}", e);
                return Err(e);
            }
        };

        let summary = summarize(&bookings, &event_types);
        info!(
            "Dashboard loaded: {} meetings, {} minutes",
            summary.meeting_count, summary.total_minutes
        );
        Ok(DashboardData {
            event_types,
            bookings,
            summary,
        })
    }
}

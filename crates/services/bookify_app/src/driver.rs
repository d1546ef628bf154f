// --- File: crates/services/bookify_app/src/driver.rs ---
//! Text front-end over the view-models: dashboard for the signed-in host and
//! the month overview of a public booking page.

use bookify_api::SessionEvent;
use bookify_booking::{AvailabilityView, BookingPage};
use bookify_common::{BookifyError, SchedulingService};
use bookify_dashboard::{booking_dates, Dashboard, DashboardData};
use chrono_tz::Tz;
use std::fmt::Write;
use std::sync::Arc;
use tokio::sync::broadcast::{self, error::RecvError};
use tracing::{info, warn};

pub fn render_summary(data: &DashboardData, tz: Tz) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "{} upcoming meetings, {} minutes scheduled",
        data.summary.meeting_count, data.summary.total_minutes
    );
    for event_type in &data.event_types {
        let minutes = data
            .summary
            .minutes_by_event_type
            .get(&event_type.id)
            .copied()
            .unwrap_or(0);
        let _ = writeln!(out, "  {} ({}): {} min", event_type.title, event_type.slug, minutes);
    }
    for date in booking_dates(&data.bookings, tz) {
        let _ = writeln!(out, "  booked on {}", date);
    }
    out
}

/// One line per day of the visible month.
pub fn render_month(view: &AvailabilityView) -> String {
    let mut out = String::new();
    if let Some(month) = view.visible_month {
        let _ = writeln!(out, "{} ({:?})", month.format("%B %Y"), view.phase);
    }
    for (date, status) in &view.statuses {
        let _ = writeln!(out, "  {} {}", date.format("%a %d"), status);
    }
    out
}

pub async fn show_dashboard<S>(service: Arc<S>, tz: Tz) -> Result<String, BookifyError>
where
    S: SchedulingService + ?Sized,
{
    let data = Dashboard::new(service).load().await?;
    Ok(render_summary(&data, tz))
}

/// Loads `username/slug` and probes the current month.
pub async fn show_public_page<S>(page: &BookingPage<S>, username: &str, slug: &str) -> Result<String, BookifyError>
where
    S: SchedulingService + ?Sized + 'static,
{
    let data = page.load_public_event(username, slug).await?;
    page.load_schedule().await;
    let today = page.availability().today();
    page.change_visible_month(today).await;

    let mut out = format!("{} ({} min)\n", data.event_type.title, data.event_type.duration.unwrap_or(0));
    if let Some(error) = page.schedule_error() {
        let _ = writeln!(out, "{}", error);
    }
    out.push_str(&render_month(&page.view()));
    Ok(out)
}

/// Clears the booking page whenever the session is invalidated. Ends when the
/// session is dropped.
pub async fn reset_on_invalidation<S>(mut events: broadcast::Receiver<SessionEvent>, page: Arc<BookingPage<S>>)
where
    S: SchedulingService + ?Sized + 'static,
{
    loop {
        match events.recv().await {
            Ok(SessionEvent::Invalidated) => {
                info!("Session invalidated; clearing booking page");
                page.reset();
            }
            Ok(_) => {}
            Err(RecvError::Lagged(skipped)) => {
                warn!("Missed {} session events; clearing booking page", skipped);
                page.reset();
            }
            Err(RecvError::Closed) => break,
        }
    }
}

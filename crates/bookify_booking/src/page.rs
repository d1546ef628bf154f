// --- File: crates/bookify_booking/src/page.rs ---
//! Public booking page: availability view-model and booking flow wired to
//! one event type and one timezone.

use crate::availability::{AvailabilityView, AvailabilityViewModel};
use crate::clock::Clock;
use crate::flow::{BookingFlow, BookingFlowError, BookingStep, InviteeDetails};
use bookify_common::models::{Booking, EventType, PublicBookingData, TimeSlot};
use bookify_common::{BookifyError, SchedulingService, WeeklySchedule};
use bookify_config::BookingConfig;
use chrono::NaiveDate;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{info, warn};

/// Shown when the host's weekly schedule cannot be loaded.
pub const SCHEDULE_LOAD_ERROR: &str = "Could not load availability settings.";

#[derive(Debug, Default)]
struct PageState {
    event_type: Option<EventType>,
    schedule: Option<WeeklySchedule>,
    schedule_error: Option<String>,
}

pub struct BookingPage<S: SchedulingService + ?Sized + 'static> {
    service: Arc<S>,
    availability: AvailabilityViewModel<S>,
    flow: BookingFlow<S>,
    state: Mutex<PageState>,
    timezone: Mutex<String>,
}

impl<S: SchedulingService + ?Sized + 'static> BookingPage<S> {
    pub fn new(service: Arc<S>, clock: Arc<dyn Clock>, config: &BookingConfig) -> Self {
        Self {
            availability: AvailabilityViewModel::new(Arc::clone(&service), clock),
            flow: BookingFlow::with_default_duration(Arc::clone(&service), config.default_duration_minutes),
            service,
            state: Mutex::new(PageState::default()),
            timezone: Mutex::new(config.timezone.clone()),
        }
    }

    fn lock(&self) -> MutexGuard<'_, PageState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn availability(&self) -> &AvailabilityViewModel<S> {
        &self.availability
    }

    pub fn flow(&self) -> &BookingFlow<S> {
        &self.flow
    }

    pub fn view(&self) -> AvailabilityView {
        self.availability.view()
    }

    pub fn event_type(&self) -> Option<EventType> {
        self.lock().event_type.clone()
    }

    pub fn timezone(&self) -> String {
        self.timezone.lock().unwrap_or_else(|p| p.into_inner()).clone()
    }

    pub fn schedule_error(&self) -> Option<String> {
        self.lock().schedule_error.clone()
    }

    pub fn step(&self) -> BookingStep {
        self.flow.step()
    }

    /// Loads the public event behind `username/slug` and starts fetching for it.
    pub async fn load_public_event(&self, username: &str, slug: &str) -> Result<PublicBookingData, BookifyError> {
        let data = self.service.get_public_booking_data(username, slug).await?;
        info!("Loaded public event '{}' ({})", data.event_type.title, data.event_type.id);
        self.set_event_type(data.event_type.clone()).await;
        Ok(data)
    }

    pub async fn set_event_type(&self, event_type: EventType) {
        let id = event_type.id.clone();
        self.lock().event_type = Some(event_type);
        self.availability.set_event_type(Some(id)).await;
        let timezone = self.timezone();
        self.availability.set_timezone(Some(timezone)).await;
    }

    pub async fn set_timezone(&self, timezone: impl Into<String>) {
        let timezone = timezone.into();
        *self.timezone.lock().unwrap_or_else(|p| p.into_inner()) = timezone.clone();
        self.availability.set_timezone(Some(timezone)).await;
    }

    /// Loads the host's weekly schedule for working-day hints.
    pub async fn load_schedule(&self) {
        let result = self.service.get_availability().await;
        let mut state = self.lock();
        match result {
            Ok(Some(availability)) => {
                state.schedule = Some(availability.schedule);
                state.schedule_error = None;
            }
            Ok(None) => {
                warn!("User schedule not found");
                state.schedule = None;
            }
            Err(e) => {
                warn!("Error loading availability schedule: {}", e);
                state.schedule = None;
                state.schedule_error = Some(SCHEDULE_LOAD_ERROR.to_string());
            }
        }
    }

    /// Whether `date` is a working day of the host; `None` without a schedule.
    pub fn is_working_day(&self, date: NaiveDate) -> Option<bool> {
        self.lock()
            .schedule
            .as_ref()
            .map(|schedule| schedule.is_working_on(date))
    }

    /// Selecting a date returns the flow to slot selection.
    pub async fn select_date(&self, date: NaiveDate) {
        self.flow.reset();
        self.availability.select_date(date).await;
    }

    pub async fn change_visible_month(&self, anchor: NaiveDate) {
        self.availability.change_visible_month(anchor).await;
    }

    /// Picks a slot offered for the selected date.
    pub fn pick_slot(&self, slot: TimeSlot) -> Result<(), BookifyError> {
        if !self.availability.slots().contains(&slot) {
            return Err(BookifyError::Validation(format!("{} is not an offered slot", slot)));
        }
        self.flow.pick_slot(slot);
        Ok(())
    }

    pub fn back(&self) {
        self.flow.back();
    }

    pub async fn submit(&self, invitee: InviteeDetails) -> Result<Booking, BookingFlowError> {
        let event_type = self.event_type();
        let draft = self.flow.draft(
            self.availability.selected_date(),
            event_type.as_ref(),
            &self.timezone(),
            invitee,
        );
        let booking = self.flow.submit(draft).await?;
        // The booked slot is gone; refresh what is left of the day.
        self.availability.refresh_day_slots().await;
        Ok(booking)
    }

    /// Clears every piece of view-state, e.g. after the session was invalidated.
    pub fn reset(&self) {
        self.availability.reset();
        self.flow.reset();
        *self.lock() = PageState::default();
    }
}

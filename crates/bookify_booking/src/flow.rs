// --- File: crates/bookify_booking/src/flow.rs ---
//! Two-step booking submission: pick a slot, then enter invitee details.

use crate::clock::parse_timezone;
use bookify_common::models::{Booking, EventType, NewBooking, TimeSlot};
use bookify_common::{BookifyError, SchedulingService};
use chrono::{Duration, NaiveDate, SecondsFormat, TimeZone, Utc};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use thiserror::Error;
use tracing::{info, warn};

/// Used when the event type carries no duration.
pub const DEFAULT_DURATION_MINUTES: u32 = 30;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BookingStep {
    #[default]
    Selecting,
    EnteringDetails,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BookingFlowError {
    #[error("Missing booking data: {}", .0.join(", "))]
    Incomplete(Vec<&'static str>),

    #[error("A booking submission is already in progress")]
    InProgress,

    #[error("Invalid booking time: {0}")]
    InvalidTime(String),

    #[error(transparent)]
    Api(#[from] BookifyError),
}

impl From<BookingFlowError> for BookifyError {
    fn from(err: BookingFlowError) -> Self {
        match err {
            BookingFlowError::Incomplete(missing) => BookifyError::IncompleteBooking(missing.join(", ")),
            BookingFlowError::InProgress => BookifyError::SubmissionInProgress,
            BookingFlowError::InvalidTime(msg) => BookifyError::Validation(msg),
            BookingFlowError::Api(e) => e,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InviteeDetails {
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub notes: Option<String>,
}

/// Everything a submission needs; fields are optional until checked.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BookingDraft {
    pub date: Option<NaiveDate>,
    pub slot: Option<TimeSlot>,
    pub event_type_id: Option<String>,
    pub duration_minutes: Option<u32>,
    pub location: Option<String>,
    pub timezone: String,
    pub invitee: InviteeDetails,
}

impl BookingDraft {
    /// Names of the required fields that are absent.
    pub fn missing_fields(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if self.date.is_none() {
            missing.push("date");
        }
        if self.slot.is_none() {
            missing.push("time");
        }
        if self.event_type_id.as_deref().map_or(true, str::is_empty) {
            missing.push("event type");
        }
        if self.invitee.name.trim().is_empty() {
            missing.push("name");
        }
        if self.invitee.email.trim().is_empty() {
            missing.push("email");
        }
        missing
    }

    /// Builds the API request. Start is the date at the slot's hour and minute
    /// in the draft's timezone; both instants are sent as UTC.
    pub fn to_request(&self, default_duration_minutes: u32) -> Result<NewBooking, BookingFlowError> {
        let missing = self.missing_fields();
        let (Some(date), Some(slot), Some(event_type_id)) = (self.date, self.slot, self.event_type_id.clone())
        else {
            return Err(BookingFlowError::Incomplete(missing));
        };
        if !missing.is_empty() {
            return Err(BookingFlowError::Incomplete(missing));
        }

        let tz = parse_timezone(&self.timezone)
            .ok_or_else(|| BookingFlowError::InvalidTime(format!("unknown timezone '{}'", self.timezone)))?;
        let local = date
            .and_hms_opt(slot.hour(), slot.minute(), 0)
            .ok_or_else(|| BookingFlowError::InvalidTime(format!("{} {}", date, slot)))?;
        let start = tz
            .from_local_datetime(&local)
            .earliest()
            .ok_or_else(|| {
                BookingFlowError::InvalidTime(format!("{} does not exist in {}", local, self.timezone))
            })?
            .with_timezone(&Utc);
        let minutes = self
            .duration_minutes
            .filter(|minutes| *minutes > 0)
            .unwrap_or(default_duration_minutes);
        let end = start + Duration::minutes(i64::from(minutes));

        Ok(NewBooking {
            event_type_id,
            start_time: start.to_rfc3339_opts(SecondsFormat::Millis, true),
            end_time: end.to_rfc3339_opts(SecondsFormat::Millis, true),
            invitee_name: self.invitee.name.trim().to_string(),
            invitee_email: self.invitee.email.trim().to_string(),
            invitee_phone: non_blank(&self.invitee.phone),
            notes: non_blank(&self.invitee.notes),
            timezone: self.timezone.clone(),
            location: non_blank(&self.location),
        })
    }
}

fn non_blank(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|text| !text.is_empty())
        .map(str::to_string)
}

#[derive(Debug, Default)]
struct FlowState {
    step: BookingStep,
    picked_slot: Option<TimeSlot>,
    last_error: Option<String>,
}

/// Releases the in-flight flag when the submission finishes or is dropped.
struct InFlightGuard<'a>(&'a AtomicBool);

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

pub struct BookingFlow<S: SchedulingService + ?Sized> {
    service: Arc<S>,
    state: Mutex<FlowState>,
    submitting: AtomicBool,
    default_duration_minutes: u32,
}

impl<S: SchedulingService + ?Sized> BookingFlow<S> {
    pub fn new(service: Arc<S>) -> Self {
        Self::with_default_duration(service, DEFAULT_DURATION_MINUTES)
    }

    pub fn with_default_duration(service: Arc<S>, default_duration_minutes: u32) -> Self {
        Self {
            service,
            state: Mutex::new(FlowState::default()),
            submitting: AtomicBool::new(false),
            default_duration_minutes,
        }
    }

    fn lock(&self) -> MutexGuard<'_, FlowState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn step(&self) -> BookingStep {
        self.lock().step
    }

    pub fn picked_slot(&self) -> Option<TimeSlot> {
        self.lock().picked_slot
    }

    pub fn last_error(&self) -> Option<String> {
        self.lock().last_error.clone()
    }

    pub fn is_submitting(&self) -> bool {
        self.submitting.load(Ordering::Acquire)
    }

    pub fn pick_slot(&self, slot: TimeSlot) {
        let mut state = self.lock();
        state.picked_slot = Some(slot);
        state.step = BookingStep::EnteringDetails;
        state.last_error = None;
    }

    /// Back to slot selection; the picked slot is dropped.
    pub fn back(&self) {
        let mut state = self.lock();
        state.picked_slot = None;
        state.step = BookingStep::Selecting;
    }

    pub fn reset(&self) {
        *self.lock() = FlowState::default();
    }

    /// Fills a draft from the flow's picked slot and the page context.
    pub fn draft(
        &self,
        date: Option<NaiveDate>,
        event_type: Option<&EventType>,
        timezone: &str,
        invitee: InviteeDetails,
    ) -> BookingDraft {
        BookingDraft {
            date,
            slot: self.picked_slot(),
            event_type_id: event_type.map(|event| event.id.clone()),
            duration_minutes: event_type.and_then(|event| event.duration),
            location: event_type.and_then(|event| event.location.clone()),
            timezone: timezone.to_string(),
            invitee,
        }
    }

    /// Submits a draft. Only one submission may be pending at a time.
    ///
    /// On success the flow returns to slot selection. On failure the message
    /// is kept as the last error and the step is left alone so the form can be
    /// retried.
    pub async fn submit(&self, draft: BookingDraft) -> Result<Booking, BookingFlowError> {
        if self
            .submitting
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            warn!("Booking submission rejected: another one is pending");
            return Err(BookingFlowError::InProgress);
        }
        let _guard = InFlightGuard(&self.submitting);

        let request = match draft.to_request(self.default_duration_minutes) {
            Ok(request) => request,
            Err(e) => {
                self.lock().last_error = Some(e.to_string());
                return Err(e);
            }
        };

        self.lock().last_error = None;
        info!(
            "Submitting booking for event {} at {}",
            request.event_type_id, request.start_time
        );
        match self.service.create_booking(request).await {
            Ok(booking) => {
                info!("Booking created: {}", booking.id);
                let mut state = self.lock();
                state.step = BookingStep::Selecting;
                state.picked_slot = None;
                Ok(booking)
            }
            Err(e) => {
                warn!("Error creating booking: {}", e);
                self.lock().last_error = Some(e.user_message());
                Err(BookingFlowError::Api(e))
            }
        }
    }
}

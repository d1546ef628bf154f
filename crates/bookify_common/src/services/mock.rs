// --- File: crates/bookify_common/src/services/mock.rs ---
//! In-memory [`SchedulingService`] for tests.
//!
//! Responses are configured up front; every call is recorded so tests can
//! assert on what reached the "network".

use super::{SchedulingService, ServiceFuture};
use crate::error::BookifyError;
use crate::models::{
    Booking, BookingQuery, EventType, NewBooking, PublicBookingData, SlotQuery, TimeSlot,
};
use crate::schedule::{Availability, WeeklySchedule};
use chrono::NaiveDate;
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

/// What a slot probe for one date does.
#[derive(Debug, Clone)]
pub enum SlotResponse {
    Slots(Vec<TimeSlot>),
    Fail(BookifyError),
    /// The probe task panics.
    Panic,
}

/// Mock scheduling service for testing.
#[derive(Default)]
pub struct MockSchedulingService {
    slots: HashMap<NaiveDate, SlotResponse>,
    slot_delays: HashMap<NaiveDate, Duration>,
    availability: Option<Result<Option<Availability>, BookifyError>>,
    update_error: Option<BookifyError>,
    booking_delay: Duration,
    booking_error: Option<BookifyError>,
    event_types: Vec<EventType>,
    bookings: Vec<Booking>,
    public_data: Option<PublicBookingData>,

    slot_calls: Mutex<Vec<SlotQuery>>,
    booking_calls: Mutex<Vec<NewBooking>>,
    booking_queries: Mutex<Vec<BookingQuery>>,
    saved_schedules: Mutex<Vec<WeeklySchedule>>,
}

impl MockSchedulingService {
    /// Create a new mock service where every date has no slots.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_slots(mut self, date: NaiveDate, slots: Vec<TimeSlot>) -> Self {
        self.slots.insert(date, SlotResponse::Slots(slots));
        self
    }

    pub fn with_slot_response(mut self, date: NaiveDate, response: SlotResponse) -> Self {
        self.slots.insert(date, response);
        self
    }

    pub fn with_slot_delay(mut self, date: NaiveDate, delay: Duration) -> Self {
        self.slot_delays.insert(date, delay);
        self
    }

    pub fn with_availability(mut self, availability: Result<Option<Availability>, BookifyError>) -> Self {
        self.availability = Some(availability);
        self
    }

    pub fn with_update_error(mut self, error: BookifyError) -> Self {
        self.update_error = Some(error);
        self
    }

    pub fn with_booking_delay(mut self, delay: Duration) -> Self {
        self.booking_delay = delay;
        self
    }

    pub fn with_booking_error(mut self, error: BookifyError) -> Self {
        self.booking_error = Some(error);
        self
    }

    pub fn with_event_types(mut self, event_types: Vec<EventType>) -> Self {
        self.event_types = event_types;
        self
    }

    pub fn with_bookings(mut self, bookings: Vec<Booking>) -> Self {
        self.bookings = bookings;
        self
    }

    pub fn with_public_data(mut self, data: PublicBookingData) -> Self {
        self.public_data = Some(data);
        self
    }

    pub fn slot_calls(&self) -> Vec<SlotQuery> {
        self.slot_calls.lock().unwrap().clone()
    }

    pub fn booking_calls(&self) -> Vec<NewBooking> {
        self.booking_calls.lock().unwrap().clone()
    }

    pub fn booking_queries(&self) -> Vec<BookingQuery> {
        self.booking_queries.lock().unwrap().clone()
    }

    pub fn saved_schedules(&self) -> Vec<WeeklySchedule> {
        self.saved_schedules.lock().unwrap().clone()
    }
}

impl SchedulingService for MockSchedulingService {
    fn get_availability(&self) -> ServiceFuture<'_, Option<Availability>> {
        Box::pin(async move { self.availability.clone().unwrap_or(Ok(None)) })
    }

    fn update_availability(&self, schedule: &WeeklySchedule) -> ServiceFuture<'_, Availability> {
        let schedule = schedule.clone();
        Box::pin(async move {
            if let Some(error) = &self.update_error {
                return Err(error.clone());
            }
            self.saved_schedules.lock().unwrap().push(schedule.clone());
            Ok(Availability {
                schedule,
                timezone: None,
            })
        })
    }

    fn get_slots(&self, query: SlotQuery) -> ServiceFuture<'_, Vec<TimeSlot>> {
        Box::pin(async move {
            self.slot_calls.lock().unwrap().push(query.clone());
            if let Some(delay) = self.slot_delays.get(&query.date) {
                tokio::time::sleep(*delay).await;
            }
            match self.slots.get(&query.date) {
                None => Ok(Vec::new()),
                Some(SlotResponse::Slots(slots)) => Ok(slots.clone()),
                Some(SlotResponse::Fail(error)) => Err(error.clone()),
                Some(SlotResponse::Panic) => panic!("mock probe panicked for {}", query.date),
            }
        })
    }

    fn create_booking(&self, booking: NewBooking) -> ServiceFuture<'_, Booking> {
        Box::pin(async move {
            self.booking_calls.lock().unwrap().push(booking.clone());
            if !self.booking_delay.is_zero() {
                tokio::time::sleep(self.booking_delay).await;
            }
            if let Some(error) = &self.booking_error {
                return Err(error.clone());
            }
            let count = self.booking_calls.lock().unwrap().len();
            Ok(Booking {
                id: format!("mock-booking-{}", count),
                event_type_id: Some(booking.event_type_id),
                start_time: crate::models::parse_instant(&booking.start_time),
                end_time: crate::models::parse_instant(&booking.end_time),
                invitee_name: Some(booking.invitee_name),
                invitee_email: Some(booking.invitee_email),
                status: Some("confirmed".to_string()),
                timezone: Some(booking.timezone),
            })
        })
    }

    fn get_event_types(&self) -> ServiceFuture<'_, Vec<EventType>> {
        Box::pin(async move { Ok(self.event_types.clone()) })
    }

    fn get_bookings(&self, query: BookingQuery) -> ServiceFuture<'_, Vec<Booking>> {
        Box::pin(async move {
            self.booking_queries.lock().unwrap().push(query);
            Ok(self.bookings.clone())
        })
    }

    fn get_public_booking_data(
        &self,
        username: &str,
        slug: &str,
    ) -> ServiceFuture<'_, PublicBookingData> {
        let key = format!("{}/{}", username, slug);
        Box::pin(async move {
            self.public_data.clone().ok_or_else(|| BookifyError::Api {
                status: Some(404),
                message: format!("Event type {} not found", key),
            })
        })
    }
}

// --- File: crates/bookify_common/src/services.rs ---
//! Service abstractions for the remote scheduling API.
//!
//! View-models depend on [`SchedulingService`] rather than on the HTTP facade,
//! so they can be driven by in-memory fakes in tests.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use crate::error::BookifyError;
use crate::models::{
    Booking, BookingQuery, EventType, NewBooking, PublicBookingData, SlotQuery, TimeSlot,
};
use crate::schedule::{Availability, WeeklySchedule};

#[cfg(feature = "mock")]
pub mod mock;

/// Type alias for a boxed future that returns a Result
pub type BoxFuture<'a, T, E> = Pin<Box<dyn Future<Output = Result<T, E>> + Send + 'a>>;

/// Boxed future failing with the normalized error.
pub type ServiceFuture<'a, T> = BoxFuture<'a, T, BookifyError>;

/// Scheduling operations the view-models need.
pub trait SchedulingService: Send + Sync {
    /// The host's weekly schedule; `None` when none has been saved yet.
    fn get_availability(&self) -> ServiceFuture<'_, Option<Availability>>;

    fn update_availability(&self, schedule: &WeeklySchedule) -> ServiceFuture<'_, Availability>;

    /// Bookable start times for one event type on one date.
    fn get_slots(&self, query: SlotQuery) -> ServiceFuture<'_, Vec<TimeSlot>>;

    fn create_booking(&self, booking: NewBooking) -> ServiceFuture<'_, Booking>;

    fn get_event_types(&self) -> ServiceFuture<'_, Vec<EventType>>;

    fn get_bookings(&self, query: BookingQuery) -> ServiceFuture<'_, Vec<Booking>>;

    /// Event type and today's slots for a public booking link.
    fn get_public_booking_data(
        &self,
        username: &str,
        slug: &str,
    ) -> ServiceFuture<'_, PublicBookingData>;
}

impl<S: SchedulingService + ?Sized> SchedulingService for Arc<S> {
    fn get_availability(&self) -> ServiceFuture<'_, Option<Availability>> {
        (**self).get_availability()
    }

    fn update_availability(&self, schedule: &WeeklySchedule) -> ServiceFuture<'_, Availability> {
        (**self).update_availability(schedule)
    }

    fn get_slots(&self, query: SlotQuery) -> ServiceFuture<'_, Vec<TimeSlot>> {
        (**self).get_slots(query)
    }

    fn create_booking(&self, booking: NewBooking) -> ServiceFuture<'_, Booking> {
        (**self).create_booking(booking)
    }

    fn get_event_types(&self) -> ServiceFuture<'_, Vec<EventType>> {
        (**self).get_event_types()
    }

    fn get_bookings(&self, query: BookingQuery) -> ServiceFuture<'_, Vec<Booking>> {
        (**self).get_bookings(query)
    }

    fn get_public_booking_data(
        &self,
        username: &str,
        slug: &str,
    ) -> ServiceFuture<'_, PublicBookingData> {
        (**self).get_public_booking_data(username, slug)
    }
}

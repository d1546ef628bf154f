// --- File: crates/bookify_booking/src/lib.rs ---
//! # Bookify Booking
//!
//! Client-side view-state for the public booking page and the host's
//! availability settings. Everything here talks to the API through
//! [`bookify_common::SchedulingService`], so it runs unchanged against the
//! HTTP facade or an in-memory fake.

pub mod availability;
pub mod clock;
pub mod flow;
pub mod page;
pub mod schedule_editor;
pub mod state;

pub use availability::{AvailabilityView, AvailabilityViewModel};
pub use clock::{Clock, FixedClock, SystemClock};
pub use flow::{BookingDraft, BookingFlow, BookingFlowError, BookingStep, InviteeDetails};
pub use page::BookingPage;
pub use schedule_editor::ScheduleEditor;
pub use state::{DayAvailabilityStatus, Fingerprint, MonthPhase};

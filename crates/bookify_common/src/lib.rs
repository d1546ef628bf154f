// --- File: crates/bookify_common/src/lib.rs ---

// Declare modules within this crate
pub mod error; // Error handling
pub mod http; // HTTP utilities
pub mod logging; // Logging utilities
pub mod models; // API records
pub mod schedule; // Weekly working hours
pub mod services; // Service abstractions

// Re-export error types and utilities for easier access
pub use error::{
    api_error, config_error, internal_error, validation_error, BookifyError, Context,
    GENERIC_CONNECTION_ERROR,
};

// Re-export HTTP utilities for easier access
pub use http::{client::create_client, join_url};

// Re-export logging utilities for easier access
pub use logging::{init, init_with_level, log_result};

pub use schedule::{Availability, DaySchedule, WeeklySchedule};
pub use services::{BoxFuture, SchedulingService, ServiceFuture};

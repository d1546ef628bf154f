// --- File: crates/bookify_api/src/lib.rs ---
//! # Bookify API
//!
//! HTTP facade for the scheduling REST API.
//!
//! - [`client::ApiClient`] implements [`bookify_common::SchedulingService`] and
//!   exposes the auth, event-type, booking and calendar endpoints.
//! - [`session::Session`] owns the bearer token, persists it through a
//!   [`session::TokenStore`] and broadcasts [`session::SessionEvent`]s.
//! - [`envelope`] normalizes the `{success, data, error, errors, message}`
//!   response envelope into [`bookify_common::BookifyError`].

pub mod client;
pub mod envelope;
pub mod session;

pub use client::ApiClient;
pub use session::{FileTokenStore, MemoryTokenStore, Session, SessionEvent, TokenStore};

// --- File: crates/services/bookify_app/src/lib.rs ---
pub mod app_state;
pub mod bootstrap;
pub mod driver;

pub use app_state::AppState;
pub use bootstrap::{bootstrap_session, CurrentUserSource, SessionStatus};

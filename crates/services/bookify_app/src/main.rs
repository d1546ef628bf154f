// --- File: crates/services/bookify_app/src/main.rs ---
use std::path::Path;
use std::sync::Arc;

use bookify_app::bootstrap::{bootstrap_session, SessionStatus};
use bookify_app::driver::{reset_on_invalidation, show_dashboard, show_public_page};
use bookify_app::AppState;
use bookify_booking::{BookingPage, SystemClock};
use bookify_common::logging::{self, parse_level};
use bookify_common::{config_error, BookifyError};
use bookify_config::load_config;
use chrono_tz::Tz;
use tracing::{error, info};

#[tokio::main(flavor = "current_thread")]
async fn main() {
    if let Err(e) = run().await {
        error!("bookify-app failed: {}", e);
        eprintln!("{}", e.user_message());
        std::process::exit(1);
    }
}

/// Usage: `bookify-app [username slug]`. Without arguments only the session
/// and dashboard are shown.
async fn run() -> Result<(), BookifyError> {
    let config = Arc::new(load_config().map_err(config_error)?);

    let level = parse_level(&config.logging.level);
    let _guard = match &config.logging.directory {
        Some(directory) => Some(logging::init_with_file(level, Path::new(directory))),
        None => {
            logging::init_with_level(level);
            None
        }
    };

    let state = AppState::new(Arc::clone(&config))?;
    let tz: Tz = config.booking.timezone.parse().unwrap_or(Tz::UTC);

    let status = bootstrap_session(&state.session, state.api.as_ref(), &config.session).await?;
    match &status {
        SessionStatus::Authenticated(user) | SessionStatus::DevSession(user) => {
            println!("Signed in as {} <{}>", user.name, user.email);
            if matches!(status, SessionStatus::Authenticated(_)) {
                println!("{}", show_dashboard(Arc::clone(&state.api), tz).await?);
            }
        }
        SessionStatus::OnboardingRequired => println!("Not signed in. Log in or register to continue."),
    }

    let args: Vec<String> = std::env::args().skip(1).collect();
    if let [username, slug] = args.as_slice() {
        let page = Arc::new(BookingPage::new(
            Arc::clone(&state.api),
            Arc::new(SystemClock),
            &config.booking,
        ));
        let watcher = tokio::spawn(reset_on_invalidation(state.session.subscribe(), Arc::clone(&page)));

        println!("{}", show_public_page(&page, username, slug).await?);
        watcher.abort();
    }

    info!("bookify-app finished");
    Ok(())
}

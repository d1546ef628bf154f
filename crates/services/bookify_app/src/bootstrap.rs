// --- File: crates/services/bookify_app/src/bootstrap.rs ---
//! Start-up session check.
//!
//! A stored token is only trusted after `/auth/me` accepts it. A rejected
//! token is cleared and subscribers see [`SessionEvent::Invalidated`], except
//! in developer bypass mode, which keeps a local dev user instead.
//!
//! [`SessionEvent::Invalidated`]: bookify_api::SessionEvent::Invalidated

use bookify_api::{ApiClient, Session};
use bookify_common::models::User;
use bookify_common::{BookifyError, ServiceFuture};
use bookify_config::SessionConfig;
use tracing::{info, warn};

/// Source of the signed-in user's profile.
pub trait CurrentUserSource: Send + Sync {
    fn current_user(&self) -> ServiceFuture<'_, User>;
}

impl CurrentUserSource for ApiClient {
    fn current_user(&self) -> ServiceFuture<'_, User> {
        Box::pin(async move { ApiClient::current_user(self).await })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionStatus {
    Authenticated(User),
    /// `/auth/me` failed but the developer bypass kept a local session.
    DevSession(User),
    OnboardingRequired,
}

impl SessionStatus {
    pub fn user(&self) -> Option<&User> {
        match self {
            SessionStatus::Authenticated(user) | SessionStatus::DevSession(user) => Some(user),
            SessionStatus::OnboardingRequired => None,
        }
    }
}

/// The user kept by the developer bypass.
pub fn dev_user(config: &SessionConfig) -> User {
    User {
        id: "dev-user".to_string(),
        name: config
            .dev_user_name
            .clone()
            .unwrap_or_else(|| "Developer".to_string()),
        email: config
            .dev_user_email
            .clone()
            .unwrap_or_else(|| "dev@localhost".to_string()),
        username: None,
        timezone: None,
        profile_picture: None,
    }
}

/// Resolves the session status at start-up.
///
/// Only storage failures while clearing a rejected token are returned as
/// errors; a rejected token itself is a normal outcome.
pub async fn bootstrap_session<U: CurrentUserSource + ?Sized>(
    session: &Session,
    users: &U,
    config: &SessionConfig,
) -> Result<SessionStatus, BookifyError> {
    if !session.is_signed_in() {
        info!("No stored session token; onboarding required");
        return Ok(SessionStatus::OnboardingRequired);
    }

    match users.current_user().await {
        Ok(user) => {
            info!("Session restored for {}", user.email);
            Ok(SessionStatus::Authenticated(user))
        }
        Err(e) if config.dev_bypass => {
            warn!("Error verifying session, keeping developer session: {}", e);
            Ok(SessionStatus::DevSession(dev_user(config)))
        }
        Err(e) => {
            warn!("Error verifying session, clearing token: {}", e);
            session.invalidate()?;
            Ok(SessionStatus::OnboardingRequired)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bookify_api::{MemoryTokenStore, SessionEvent};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    struct FakeUsers {
        result: Result<User, BookifyError>,
        calls: AtomicUsize,
    }

    impl FakeUsers {
        fn new(result: Result<User, BookifyError>) -> Self {
            Self {
                result,
                calls: AtomicUsize::new(0),
            }
        }
    }

    impl CurrentUserSource for FakeUsers {
        fn current_user(&self) -> ServiceFuture<'_, User> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let result = self.result.clone();
            Box::pin(async move { result })
        }
    }

    fn user() -> User {
        User {
            id: "u1".to_string(),
            name: "Ana".to_string(),
            email: "ana@example.com".to_string(),
            username: Some("ana".to_string()),
            timezone: None,
            profile_picture: None,
        }
    }

    fn signed_in_session() -> Session {
        Session::new(Arc::new(MemoryTokenStore::with_token("stored-token"))).unwrap()
    }

    #[tokio::test]
    async fn no_token_requires_onboarding_without_calling_the_api() {
        let session = Session::in_memory();
        let users = FakeUsers::new(Ok(user()));

        let status = bootstrap_session(&session, &users, &SessionConfig::default())
            .await
            .unwrap();

        assert_eq!(status, SessionStatus::OnboardingRequired);
        assert_eq!(users.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn accepted_token_authenticates() {
        let session = signed_in_session();
        let users = FakeUsers::new(Ok(user()));

        let status = bootstrap_session(&session, &users, &SessionConfig::default())
            .await
            .unwrap();

        assert_eq!(status, SessionStatus::Authenticated(user()));
        assert_eq!(session.token().as_deref(), Some("stored-token"));
    }

    #[tokio::test]
    async fn rejected_token_is_cleared_and_broadcast() {
        let session = signed_in_session();
        let mut events = session.subscribe();
        let users = FakeUsers::new(Err(bookify_common::api_error(Some(401), "Token expired")));

        let status = bootstrap_session(&session, &users, &SessionConfig::default())
            .await
            .unwrap();

        assert_eq!(status, SessionStatus::OnboardingRequired);
        assert!(!session.is_signed_in());
        assert_eq!(events.try_recv().unwrap(), SessionEvent::Invalidated);
    }

    #[tokio::test]
    async fn dev_bypass_keeps_the_configured_user() {
        let session = signed_in_session();
        let users = FakeUsers::new(Err(BookifyError::Network("connection refused".into())));
        let config = SessionConfig {
            dev_bypass: true,
            dev_user_name: Some("Local Dev".to_string()),
            ..SessionConfig::default()
        };

        let status = bootstrap_session(&session, &users, &config).await.unwrap();

        let kept = status.user().unwrap();
        assert_eq!(kept.name, "Local Dev");
        assert_eq!(kept.email, "dev@localhost");
        assert!(matches!(status, SessionStatus::DevSession(_)));
        assert!(session.is_signed_in());
    }
}

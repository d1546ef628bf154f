// --- File: crates/bookify_api/src/client.rs ---
//! HTTP facade over the scheduling REST API.
//!
//! Every call returns the unwrapped `data` payload or a normalized
//! [`BookifyError`]. The bearer token is read from the shared [`Session`] per
//! request, and every request is tagged with an `X-Request-Id`.

use crate::envelope::Exchange;
use crate::session::Session;
use bookify_common::models::{
    AuthGrant, Booking, BookingQuery, BookingStatusUpdate, CalendarAuthUrl,
    CalendarConnectionStatus, CancelRequest, Credentials, EventType, NewBooking, NewEventType,
    PasswordUpdate, ProfileUpdate, PublicBookingData, Registration, RescheduleRequest, SlotQuery,
    SyncUserRequest, TimeSlot, User,
};
use bookify_common::schedule::{Availability, WeeklySchedule};
use bookify_common::services::{SchedulingService, ServiceFuture};
use bookify_common::{config_error, create_client, internal_error, join_url, BookifyError};
use bookify_config::ApiConfig;
use reqwest::header::AUTHORIZATION;
use reqwest::{Client, Method, RequestBuilder};
use serde::de::IgnoredAny;
use serde::Serialize;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{debug, info_span, warn, Instrument};
use uuid::Uuid;

pub const REQUEST_ID_HEADER: &str = "X-Request-Id";
pub const API_KEY_HEADER: &str = "x-api-key";

/// Client for the scheduling API.
#[derive(Debug, Clone)]
pub struct ApiClient {
    http: Client,
    base_url: String,
    session: Arc<Session>,
    sync_api_key: Option<String>,
}

impl ApiClient {
    pub fn new(config: &ApiConfig, session: Arc<Session>) -> Result<Self, BookifyError> {
        let http = create_client(config.timeout_secs, config.follow_redirects)
            .map_err(|e| config_error(format!("failed to build HTTP client: {}", e)))?;
        Ok(Self {
            http,
            base_url: config.base_url.clone(),
            session,
            sync_api_key: config.sync_api_key.clone(),
        })
    }

    pub fn session(&self) -> &Arc<Session> {
        &self.session
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Sends one request and decodes the body; transport failures become `Network`.
    async fn exchange<F>(&self, method: Method, path: &str, build: F) -> Result<Exchange, BookifyError>
    where
        F: FnOnce(RequestBuilder) -> RequestBuilder,
    {
        let request_id = Uuid::new_v4();
        let span = info_span!("api_request", %method, path, %request_id);

        async move {
            let mut request = self
                .http
                .request(method, join_url(&self.base_url, path))
                .header(REQUEST_ID_HEADER, request_id.to_string());
            if let Some(token) = self.session.token() {
                request = request.header(AUTHORIZATION, format!("Bearer {}", token));
            }

            let response = build(request).send().await.map_err(|e| {
                warn!("Request failed before a response arrived: {}", e);
                BookifyError::Network(e.to_string())
            })?;
            let status = response.status();
            let text = response.text().await.map_err(|e| BookifyError::Network(e.to_string()))?;
            debug!(status = status.as_u16(), "Response received");

            let exchange = Exchange::from_text(status, &text)?;
            if !exchange.status.is_success() {
                warn!(status = status.as_u16(), "API answered with an error status");
            }
            Ok(exchange)
        }
        .instrument(span)
        .await
    }

    async fn get_data<T: serde::de::DeserializeOwned>(&self, path: &str) -> Result<T, BookifyError> {
        self.exchange(Method::GET, path, |r| r)
            .await?
            .ensure_success()?
            .into_data()
    }

    async fn send_data<B, T>(&self, method: Method, path: &str, body: &B) -> Result<T, BookifyError>
    where
        B: Serialize + ?Sized,
        T: serde::de::DeserializeOwned,
    {
        self.exchange(method, path, |r| r.json(body))
            .await?
            .ensure_success()?
            .into_data()
    }

    async fn delete_data(&self, path: &str) -> Result<(), BookifyError> {
        self.exchange(Method::DELETE, path, |r| r)
            .await?
            .ensure_success()?
            .into_data::<IgnoredAny>()
            .map(|_| ())
    }

    fn persist_grant(&self, grant: &AuthGrant) -> Result<(), BookifyError> {
        match grant.token.as_deref() {
            Some(token) if !token.is_empty() => self.session.set(token),
            _ => {
                warn!("Auth response carried no token");
                Ok(())
            }
        }
    }

    // --- Auth ---

    pub async fn register(&self, registration: &Registration) -> Result<AuthGrant, BookifyError> {
        let grant: AuthGrant = self.send_data(Method::POST, "/auth/register", registration).await?;
        self.persist_grant(&grant)?;
        Ok(grant)
    }

    pub async fn login(&self, credentials: &Credentials) -> Result<AuthGrant, BookifyError> {
        let grant: AuthGrant = self.send_data(Method::POST, "/auth/login", credentials).await?;
        self.persist_grant(&grant)?;
        Ok(grant)
    }

    /// Ends the session. The local token is cleared whatever the server says.
    pub async fn logout(&self) -> Result<(), BookifyError> {
        let outcome = self
            .exchange(Method::GET, "/auth/logout", |r| r)
            .await
            .and_then(Exchange::ensure_success);
        if let Err(e) = outcome {
            warn!("Logout call failed, clearing the local token anyway: {}", e);
        }
        self.session.clear()
    }

    pub async fn forgot_password(&self, email: &str) -> Result<(), BookifyError> {
        self.send_data::<_, IgnoredAny>(Method::POST, "/auth/forgot-password", &json!({ "email": email }))
            .await
            .map(|_| ())
    }

    /// Exchanges an external identity for an API token. Needs `api.sync_api_key`.
    pub async fn sync_user(&self, request: &SyncUserRequest) -> Result<AuthGrant, BookifyError> {
        let api_key = self
            .sync_api_key
            .clone()
            .ok_or_else(|| config_error("api.sync_api_key is not configured"))?;
        let grant: AuthGrant = self
            .exchange(Method::POST, "/auth/sync-user", |r| {
                r.header(API_KEY_HEADER, api_key).json(request)
            })
            .await?
            .ensure_success()?
            .into_data()?;
        self.persist_grant(&grant)?;
        Ok(grant)
    }

    pub async fn current_user(&self) -> Result<User, BookifyError> {
        self.get_data("/auth/me").await
    }

    // --- Users ---

    pub async fn update_profile(&self, update: &ProfileUpdate) -> Result<User, BookifyError> {
        self.send_data(Method::PUT, "/users/profile", update).await
    }

    pub async fn update_password(&self, update: &PasswordUpdate) -> Result<(), BookifyError> {
        self.send_data::<_, IgnoredAny>(Method::PUT, "/users/password", update)
            .await
            .map(|_| ())
    }

    // --- Event types ---

    pub async fn get_event_type(&self, id: &str) -> Result<EventType, BookifyError> {
        self.get_data(&format!("/event-types/{}", id)).await
    }

    pub async fn create_event_type(&self, event_type: &NewEventType) -> Result<EventType, BookifyError> {
        self.send_data(Method::POST, "/event-types", event_type).await
    }

    pub async fn update_event_type(
        &self,
        id: &str,
        event_type: &NewEventType,
    ) -> Result<EventType, BookifyError> {
        self.send_data(Method::PUT, &format!("/event-types/{}", id), event_type)
            .await
    }

    pub async fn delete_event_type(&self, id: &str) -> Result<(), BookifyError> {
        self.delete_data(&format!("/event-types/{}", id)).await
    }

    pub async fn get_public_event_type(&self, username: &str, slug: &str) -> Result<EventType, BookifyError> {
        self.get_data(&format!("/event-types/{}/{}", username, slug)).await
    }

    // --- Bookings ---

    pub async fn get_booking(&self, id: &str) -> Result<Booking, BookifyError> {
        self.get_data(&format!("/bookings/{}", id)).await
    }

    pub async fn update_booking_status(
        &self,
        id: &str,
        update: &BookingStatusUpdate,
    ) -> Result<Booking, BookifyError> {
        self.send_data(Method::PUT, &format!("/bookings/{}/status", id), update)
            .await
    }

    pub async fn reschedule_booking(
        &self,
        id: &str,
        request: &RescheduleRequest,
    ) -> Result<Booking, BookifyError> {
        self.send_data(Method::PUT, &format!("/bookings/{}/reschedule", id), request)
            .await
    }

    pub async fn cancel_booking(&self, id: &str, request: &CancelRequest) -> Result<Booking, BookifyError> {
        self.send_data(Method::PUT, &format!("/bookings/{}/cancel", id), request)
            .await
    }

    pub async fn delete_booking(&self, id: &str) -> Result<(), BookifyError> {
        self.delete_data(&format!("/bookings/{}", id)).await
    }

    // --- Calendar integration ---

    pub async fn calendar_auth_url(&self) -> Result<CalendarAuthUrl, BookifyError> {
        self.get_data("/auth/google/calendar").await
    }

    /// A 404 means no calendar was ever connected.
    pub async fn get_calendar_status(&self) -> Result<CalendarConnectionStatus, BookifyError> {
        match self.get_data("/auth/google/calendar/status").await {
            Err(e) if e.is_not_found() => Ok(CalendarConnectionStatus::default()),
            other => other,
        }
    }

    pub async fn disconnect_calendar(&self) -> Result<(), BookifyError> {
        self.delete_data("/auth/google/calendar").await
    }

    pub async fn health(&self) -> Result<Value, BookifyError> {
        self.get_data("/health").await
    }
}

fn with_query<Q: Serialize>(path: &str, query: &Q) -> Result<String, BookifyError> {
    let encoded = serde_urlencoded::to_string(query)
        .map_err(|e| internal_error(format!("failed to encode query for {}: {}", path, e)))?;
    if encoded.is_empty() {
        Ok(path.to_string())
    } else {
        Ok(format!("{}?{}", path, encoded))
    }
}

impl SchedulingService for ApiClient {
    fn get_availability(&self) -> ServiceFuture<'_, Option<Availability>> {
        Box::pin(async move {
            match self.get_data::<Option<Availability>>("/availability").await {
                Err(e) if e.is_not_found() => {
                    debug!("No availability saved yet");
                    Ok(None)
                }
                other => other,
            }
        })
    }

    fn update_availability(&self, schedule: &WeeklySchedule) -> ServiceFuture<'_, Availability> {
        let body = json!({ "schedule": schedule });
        Box::pin(async move { self.send_data(Method::POST, "/availability", &body).await })
    }

    fn get_slots(&self, query: SlotQuery) -> ServiceFuture<'_, Vec<TimeSlot>> {
        Box::pin(async move {
            let path = with_query("/availability/slots", &query)?;
            let slots: Option<Vec<TimeSlot>> = self.get_data(&path).await?;
            Ok(slots.unwrap_or_default())
        })
    }

    fn create_booking(&self, booking: NewBooking) -> ServiceFuture<'_, Booking> {
        Box::pin(async move { self.send_data(Method::POST, "/bookings", &booking).await })
    }

    fn get_event_types(&self) -> ServiceFuture<'_, Vec<EventType>> {
        Box::pin(async move {
            let event_types: Option<Vec<EventType>> = self
                .exchange(Method::GET, "/event-types", |r| r)
                .await?
                .ensure_status()?
                .into_data()?;
            Ok(event_types.unwrap_or_default())
        })
    }

    fn get_bookings(&self, query: BookingQuery) -> ServiceFuture<'_, Vec<Booking>> {
        Box::pin(async move {
            let path = with_query("/bookings", &query)?;
            let exchange = self.exchange(Method::GET, &path, |r| r).await?.ensure_status()?;
            if !exchange.has_count() {
                warn!("Unexpected bookings response without 'count', treating as empty");
                return Ok(Vec::new());
            }
            let bookings: Option<Vec<Booking>> = exchange.into_data()?;
            Ok(bookings.unwrap_or_default())
        })
    }

    fn get_public_booking_data(
        &self,
        username: &str,
        slug: &str,
    ) -> ServiceFuture<'_, PublicBookingData> {
        let path = format!("/bookings/book/{}/{}", username, slug);
        Box::pin(async move { self.get_data(&path).await })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn slot_query_is_url_encoded() {
        let query = SlotQuery {
            event_type_id: "et1".to_string(),
            date: NaiveDate::from_ymd_opt(2024, 3, 5).unwrap(),
            timezone: "America/Buenos_Aires".to_string(),
        };
        assert_eq!(
            with_query("/availability/slots", &query).unwrap(),
            "/availability/slots?eventTypeId=et1&date=2024-03-05&timezone=America%2FBuenos_Aires"
        );
    }

    #[test]
    fn empty_booking_filter_leaves_path_bare() {
        assert_eq!(with_query("/bookings", &BookingQuery::default()).unwrap(), "/bookings");
        assert_eq!(
            with_query("/bookings", &BookingQuery::confirmed_upcoming(5)).unwrap(),
            "/bookings?status=confirmed&limit=5&sort=startTime%3Aasc"
        );
    }
}

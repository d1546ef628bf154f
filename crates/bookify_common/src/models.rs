// --- File: crates/bookify_common/src/models.rs ---
//! Typed records exchanged with the scheduling API.
//!
//! Every record is parsed at the facade boundary, so view-models never see raw
//! JSON. Field names follow the API's camelCase; MongoDB-style `_id` keys are
//! accepted as aliases of `id`.

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Timelike, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use tracing::warn;

// --- Users and auth payloads ---

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    #[serde(alias = "_id", default)]
    pub id: String,
    pub name: String,
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timezone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profile_picture: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Registration {
    pub name: String,
    pub email: String,
    pub password: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timezone: Option<String>,
}

/// Payload for `POST /auth/sync-user`, used by external identity providers.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncUserRequest {
    pub external_id: String,
    pub email: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub profile_picture: Option<String>,
}

/// Response of the auth endpoints that issue a bearer token.
#[derive(Debug, Clone, Deserialize)]
pub struct AuthGrant {
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default)]
    pub user: Option<User>,
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timezone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub profile_picture: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PasswordUpdate {
    pub current_password: String,
    pub new_password: String,
}

// --- Event types ---

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventType {
    #[serde(alias = "_id")]
    pub id: String,
    pub title: String,
    /// Minutes. Missing on some legacy records.
    #[serde(default)]
    pub duration: Option<u32>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub slug: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub color: Option<String>,
}

/// Creation or full update of an event type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewEventType {
    pub title: String,
    pub slug: String,
    pub duration: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    /// Minimum notice before a booking, in minutes.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_notice: Option<u32>,
}

impl NewEventType {
    /// Starts a new event type whose slug is derived from the title.
    pub fn new(title: impl Into<String>, duration: u32) -> Self {
        let title = title.into();
        Self {
            slug: generate_slug(&title),
            title,
            duration,
            location: None,
            description: None,
            color: None,
            min_notice: None,
        }
    }

    pub fn with_min_notice_hours(mut self, hours: u32) -> Self {
        self.min_notice = Some(hours.saturating_mul(60));
        self
    }

    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }
}

/// URL slug for a title: lowercase, whitespace runs become `-`, anything
/// outside `[a-z0-9-]` is dropped and repeated dashes collapse.
pub fn generate_slug(title: &str) -> String {
    let mut slug = String::with_capacity(title.len());
    let mut in_whitespace = false;
    for ch in title.trim().to_lowercase().chars() {
        if ch.is_whitespace() {
            if !in_whitespace {
                slug.push('-');
            }
            in_whitespace = true;
            continue;
        }
        in_whitespace = false;
        if ch.is_ascii_lowercase() || ch.is_ascii_digit() || ch == '-' {
            slug.push(ch);
        }
    }

    let mut collapsed = String::with_capacity(slug.len());
    for ch in slug.chars() {
        if ch == '-' && collapsed.ends_with('-') {
            continue;
        }
        collapsed.push(ch);
    }
    collapsed
}

// --- Slots ---

/// A bookable wall-clock start time. Always rendered as `HH:MM`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TimeSlot {
    pub start: NaiveTime,
}

impl TimeSlot {
    pub fn new(start: NaiveTime) -> Self {
        Self { start }
    }

    pub fn at(hour: u32, minute: u32) -> Option<Self> {
        NaiveTime::from_hms_opt(hour, minute, 0).map(Self::new)
    }

    /// Accepts `HH:MM`, `HH:MM:SS` or an RFC 3339 timestamp (its wall-clock time).
    pub fn parse(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        if let Ok(time) = NaiveTime::parse_from_str(raw, "%H:%M") {
            return Some(Self::new(time));
        }
        if let Ok(time) = NaiveTime::parse_from_str(raw, "%H:%M:%S") {
            return Some(Self::new(time));
        }
        DateTime::parse_from_rfc3339(raw)
            .ok()
            .map(|instant| Self::new(instant.time()))
            .or_else(|| parse_naive_instant(raw).map(|naive| Self::new(naive.time())))
    }

    pub fn hour(&self) -> u32 {
        self.start.hour()
    }

    pub fn minute(&self) -> u32 {
        self.start.minute()
    }

    pub fn label(&self) -> String {
        self.start.format("%H:%M").to_string()
    }
}

impl fmt::Display for TimeSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.start.format("%H:%M"))
    }
}

impl Serialize for TimeSlot {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.label())
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawSlot {
    Text(String),
    Object {
        #[serde(rename = "startTime", alias = "start")]
        start_time: String,
    },
}

impl<'de> Deserialize<'de> for TimeSlot {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = match RawSlot::deserialize(deserializer)? {
            RawSlot::Text(text) => text,
            RawSlot::Object { start_time } => start_time,
        };
        TimeSlot::parse(&raw)
            .ok_or_else(|| serde::de::Error::custom(format!("invalid slot time '{}'", raw)))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SlotQuery {
    pub event_type_id: String,
    #[serde(serialize_with = "serialize_date")]
    pub date: NaiveDate,
    pub timezone: String,
}

fn serialize_date<S: Serializer>(date: &NaiveDate, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&date.format("%Y-%m-%d").to_string())
}

// --- Bookings ---

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Booking {
    #[serde(alias = "_id", default)]
    pub id: String,
    #[serde(default, deserialize_with = "deserialize_reference")]
    pub event_type_id: Option<String>,
    #[serde(default, deserialize_with = "deserialize_instant")]
    pub start_time: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "deserialize_instant")]
    pub end_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub invitee_name: Option<String>,
    #[serde(default)]
    pub invitee_email: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub timezone: Option<String>,
}

impl Booking {
    /// Length in seconds when both instants are known.
    pub fn scheduled_seconds(&self) -> Option<i64> {
        match (self.start_time, self.end_time) {
            (Some(start), Some(end)) => Some((end - start).num_seconds()),
            _ => None,
        }
    }
}

/// Payload for `POST /bookings`. Instants are UTC RFC 3339 strings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewBooking {
    pub event_type_id: String,
    pub start_time: String,
    pub end_time: String,
    pub invitee_name: String,
    pub invitee_email: String,
    pub invitee_phone: Option<String>,
    pub notes: Option<String>,
    pub timezone: String,
    pub location: Option<String>,
}

/// Filter for `GET /bookings`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BookingQuery {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sort: Option<String>,
}

impl BookingQuery {
    /// Confirmed bookings, soonest first.
    pub fn confirmed_upcoming(limit: u32) -> Self {
        Self {
            status: Some("confirmed".to_string()),
            limit: Some(limit),
            sort: Some("startTime:asc".to_string()),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct BookingStatusUpdate {
    pub status: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RescheduleRequest {
    pub start_time: String,
    pub end_time: String,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct CancelRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

// --- Public booking page ---

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicBookingData {
    pub event_type: EventType,
    #[serde(default)]
    pub available_slots: Vec<TimeSlot>,
}

// --- Calendar integration ---

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CalendarConnectionStatus {
    #[serde(default)]
    pub is_connected: bool,
    #[serde(default)]
    pub email: Option<String>,
}

/// Authorization URL returned by `GET /auth/google/calendar`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CalendarAuthUrl {
    #[serde(alias = "authUrl")]
    pub url: String,
}

// --- Field parsers ---

fn parse_naive_instant(raw: &str) -> Option<NaiveDateTime> {
    let trimmed = raw.trim_end_matches('Z');
    NaiveDateTime::parse_from_str(trimmed, "%Y-%m-%dT%H:%M:%S%.f")
        .or_else(|_| NaiveDateTime::parse_from_str(trimmed, "%Y-%m-%dT%H:%M"))
        .ok()
}

/// RFC 3339, or a `YYYY-MM-DDTHH:MM[:SS]` form (optionally `Z`-suffixed) read as UTC.
pub fn parse_instant(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    DateTime::parse_from_rfc3339(raw)
        .map(|instant| instant.with_timezone(&Utc))
        .ok()
        .or_else(|| parse_naive_instant(raw).map(|naive| naive.and_utc()))
}

fn deserialize_instant<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<String>::deserialize(deserializer)? {
        None => Ok(None),
        Some(raw) if raw.trim().is_empty() => Ok(None),
        Some(raw) => {
            let instant = parse_instant(&raw);
            if instant.is_none() {
                warn!("Ignoring unparseable instant '{}'", raw);
            }
            Ok(instant)
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum Reference {
    Id(String),
    Populated {
        #[serde(alias = "_id")]
        id: String,
    },
}

/// Accepts either a bare id or a populated sub-document carrying `_id`/`id`.
fn deserialize_reference<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Reference>::deserialize(deserializer)?.map(|reference| match reference {
        Reference::Id(id) => id,
        Reference::Populated { id } => id,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    #[test]
    fn slug_generation_normalizes_titles() {
        assert_eq!(generate_slug("  30 Minute Meeting "), "30-minute-meeting");
        assert_eq!(generate_slug("Coffee & Chat!"), "coffee-chat");
        assert_eq!(generate_slug("Q&A -- Office   Hours"), "qa-office-hours");
        assert_eq!(generate_slug("Ünïcode Call"), "ncode-call");
    }

    #[test]
    fn min_notice_is_stored_in_minutes() {
        let event = NewEventType::new("Intro Call", 15).with_min_notice_hours(4);
        assert_eq!(event.slug, "intro-call");
        assert_eq!(event.min_notice, Some(240));

        let body = serde_json::to_value(&event).unwrap();
        assert_eq!(body["minNotice"], json!(240));
        assert!(body.get("location").is_none());
    }

    #[test]
    fn time_slots_accept_every_wire_shape() {
        let slots: Vec<TimeSlot> = serde_json::from_value(json!([
            "09:00",
            "09:30:00",
            "2024-03-04T10:00:00-03:00",
            { "startTime": "11:15" }
        ]))
        .unwrap();

        let labels: Vec<String> = slots.iter().map(TimeSlot::label).collect();
        assert_eq!(labels, vec!["09:00", "09:30", "10:00", "11:15"]);
        assert_eq!(serde_json::to_value(slots[0]).unwrap(), json!("09:00"));
    }

    #[test]
    fn garbage_slot_is_a_parse_error() {
        let result: Result<TimeSlot, _> = serde_json::from_value(json!("soon"));
        assert!(result.is_err());
    }

    #[test]
    fn booking_accepts_populated_event_type_and_short_instants() {
        let booking: Booking = serde_json::from_value(json!({
            "_id": "b1",
            "eventTypeId": { "_id": "et1", "title": "Intro" },
            "startTime": "2024-01-01T10:00Z",
            "endTime": "2024-01-01T10:30:00.000Z",
            "status": "confirmed"
        }))
        .unwrap();

        assert_eq!(booking.id, "b1");
        assert_eq!(booking.event_type_id.as_deref(), Some("et1"));
        assert_eq!(
            booking.start_time,
            Some(Utc.with_ymd_and_hms(2024, 1, 1, 10, 0, 0).unwrap())
        );
        assert_eq!(booking.scheduled_seconds(), Some(30 * 60));
    }

    #[test]
    fn malformed_instant_is_read_as_missing() {
        let booking: Booking = serde_json::from_value(json!({
            "_id": "b1",
            "eventTypeId": "et1",
            "startTime": "next tuesday",
            "endTime": "2024-01-01T10:30:00Z"
        }))
        .unwrap();

        assert_eq!(booking.start_time, None);
        assert!(booking.end_time.is_some());
        assert_eq!(booking.scheduled_seconds(), None);
    }

    #[test]
    fn booking_query_skips_unset_fields() {
        let query = serde_json::to_value(BookingQuery::confirmed_upcoming(5)).unwrap();
        assert_eq!(query["status"], json!("confirmed"));
        assert_eq!(query["limit"], json!(5));
        assert_eq!(query["sort"], json!("startTime:asc"));
        assert!(serde_json::to_value(BookingQuery::default())
            .unwrap()
            .as_object()
            .unwrap()
            .is_empty());
    }

    #[test]
    fn event_type_tolerates_missing_optional_fields() {
        let event: EventType = serde_json::from_value(json!({
            "_id": "et9",
            "title": "Legacy"
        }))
        .unwrap();
        assert_eq!(event.duration, None);
        assert_eq!(event.slug, "");
    }
}

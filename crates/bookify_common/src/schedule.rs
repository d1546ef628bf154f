// --- File: crates/bookify_common/src/schedule.rs ---
//! Weekly working hours of a host.
//!
//! The wire format is a JSON object keyed by lowercase weekday names:
//!
//! ```json
//! { "monday": { "start": "09:00", "end": "17:00", "isWorking": true } }
//! ```
//!
//! Payloads may omit days (or fields of a day); those are filled from the
//! defaults below and never override what the server sent.

use chrono::{Datelike, NaiveDate, NaiveTime, Weekday};
use serde::de::{self, Deserializer};
use serde::ser::{SerializeMap, Serializer};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::warn;

use crate::error::{validation_error, BookifyError};

/// Display and storage order of the week.
pub const WEEKDAYS: [Weekday; 7] = [
    Weekday::Mon,
    Weekday::Tue,
    Weekday::Wed,
    Weekday::Thu,
    Weekday::Fri,
    Weekday::Sat,
    Weekday::Sun,
];

/// Lowercase English name used as the wire key.
pub fn weekday_key(weekday: Weekday) -> &'static str {
    match weekday {
        Weekday::Mon => "monday",
        Weekday::Tue => "tuesday",
        Weekday::Wed => "wednesday",
        Weekday::Thu => "thursday",
        Weekday::Fri => "friday",
        Weekday::Sat => "saturday",
        Weekday::Sun => "sunday",
    }
}

pub fn weekday_from_key(key: &str) -> Option<Weekday> {
    WEEKDAYS
        .iter()
        .copied()
        .find(|day| weekday_key(*day).eq_ignore_ascii_case(key.trim()))
}

/// `HH:MM` time-of-day (de)serialization; `HH:MM:SS` is accepted on input.
pub mod hhmm {
    use chrono::NaiveTime;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(time: &NaiveTime, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&time.format("%H:%M").to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<NaiveTime, D::Error> {
        let raw = String::deserialize(deserializer)?;
        parse(&raw).map_err(serde::de::Error::custom)
    }

    pub fn parse(raw: &str) -> Result<NaiveTime, String> {
        let raw = raw.trim();
        NaiveTime::parse_from_str(raw, "%H:%M")
            .or_else(|_| NaiveTime::parse_from_str(raw, "%H:%M:%S"))
            .map_err(|e| format!("invalid time of day '{}': {}", raw, e))
    }
}

/// Working hours for one weekday.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DaySchedule {
    #[serde(with = "hhmm")]
    pub start: NaiveTime,
    #[serde(with = "hhmm")]
    pub end: NaiveTime,
    #[serde(rename = "isWorking")]
    pub is_working: bool,
}

impl DaySchedule {
    pub fn new(start: NaiveTime, end: NaiveTime, is_working: bool) -> Self {
        Self {
            start,
            end,
            is_working,
        }
    }

    /// Working days must not end before they start.
    pub fn validate(&self, weekday: Weekday) -> Result<(), BookifyError> {
        if self.is_working && self.start > self.end {
            return Err(validation_error(format!(
                "{}: start {} is after end {}",
                weekday_key(weekday),
                self.start.format("%H:%M"),
                self.end.format("%H:%M")
            )));
        }
        Ok(())
    }
}

/// Day as it may arrive from the server: every field optional.
#[derive(Debug, Default, Deserialize)]
struct PartialDay {
    start: Option<String>,
    end: Option<String>,
    #[serde(rename = "isWorking")]
    is_working: Option<bool>,
}

/// All seven weekdays, Monday first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WeeklySchedule {
    days: [DaySchedule; 7],
}

fn hm(hour: u32, minute: u32) -> NaiveTime {
    NaiveTime::from_hms_opt(hour, minute, 0).unwrap_or(NaiveTime::MIN)
}

impl Default for WeeklySchedule {
    fn default() -> Self {
        Self {
            days: WEEKDAYS.map(WeeklySchedule::default_day),
        }
    }
}

impl WeeklySchedule {
    /// Mon-Fri 09:00-17:00 working, weekend 09:00-13:00 off.
    pub fn default_day(weekday: Weekday) -> DaySchedule {
        match weekday {
            Weekday::Sat | Weekday::Sun => DaySchedule::new(hm(9, 0), hm(13, 0), false),
            _ => DaySchedule::new(hm(9, 0), hm(17, 0), true),
        }
    }

    /// Builds a complete schedule from the days the server actually sent.
    pub fn from_days<I>(days: I) -> Result<Self, BookifyError>
    where
        I: IntoIterator<Item = (Weekday, DaySchedule)>,
    {
        let mut schedule = Self::default();
        for (weekday, day) in days {
            schedule.set_day(weekday, day)?;
        }
        Ok(schedule)
    }

    fn from_partial(raw: HashMap<String, PartialDay>) -> Result<Self, BookifyError> {
        let mut schedule = Self::default();
        for (key, partial) in raw {
            let Some(weekday) = weekday_from_key(&key) else {
                warn!("Ignoring unknown weekday '{}' in schedule payload", key);
                continue;
            };
            let fallback = Self::default_day(weekday);
            let start = match partial.start {
                Some(raw) => hhmm::parse(&raw).map_err(validation_error)?,
                None => fallback.start,
            };
            let end = match partial.end {
                Some(raw) => hhmm::parse(&raw).map_err(validation_error)?,
                None => fallback.end,
            };
            let day = DaySchedule::new(start, end, partial.is_working.unwrap_or(fallback.is_working));
            schedule.set_day(weekday, day)?;
        }
        Ok(schedule)
    }

    pub fn day(&self, weekday: Weekday) -> &DaySchedule {
        &self.days[weekday.num_days_from_monday() as usize]
    }

    /// Replaces one day after validating it.
    pub fn set_day(&mut self, weekday: Weekday, day: DaySchedule) -> Result<(), BookifyError> {
        day.validate(weekday)?;
        self.days[weekday.num_days_from_monday() as usize] = day;
        Ok(())
    }

    pub fn is_working_on(&self, date: NaiveDate) -> bool {
        self.day(date.weekday()).is_working
    }

    pub fn iter(&self) -> impl Iterator<Item = (Weekday, &DaySchedule)> {
        WEEKDAYS.iter().copied().zip(self.days.iter())
    }

    pub fn validate(&self) -> Result<(), BookifyError> {
        self.iter().try_for_each(|(weekday, day)| day.validate(weekday))
    }
}

impl Serialize for WeeklySchedule {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(WEEKDAYS.len()))?;
        for (weekday, day) in self.iter() {
            map.serialize_entry(weekday_key(weekday), day)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for WeeklySchedule {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = Option::<HashMap<String, PartialDay>>::deserialize(deserializer)?;
        match raw {
            Some(raw) => WeeklySchedule::from_partial(raw).map_err(de::Error::custom),
            None => Ok(WeeklySchedule::default()),
        }
    }
}

/// Saved availability as returned by `GET /availability`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Availability {
    #[serde(default)]
    pub schedule: WeeklySchedule,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timezone: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use serde_json::json;

    #[test]
    fn missing_days_fall_back_to_defaults() {
        let schedule: WeeklySchedule = serde_json::from_value(json!({
            "monday": { "start": "10:00", "end": "12:00", "isWorking": true },
            "saturday": { "start": "08:00", "end": "11:30", "isWorking": true }
        }))
        .unwrap();

        assert_eq!(schedule.day(Weekday::Mon).start, hm(10, 0));
        assert!(schedule.day(Weekday::Sat).is_working);
        assert_eq!(schedule.day(Weekday::Sat).end, hm(11, 30));
        assert_eq!(*schedule.day(Weekday::Tue), WeeklySchedule::default_day(Weekday::Tue));
        assert!(!schedule.day(Weekday::Sun).is_working);
    }

    #[test]
    fn missing_fields_inside_a_day_use_that_days_defaults() {
        let schedule: WeeklySchedule = serde_json::from_value(json!({
            "friday": { "isWorking": false }
        }))
        .unwrap();

        let friday = schedule.day(Weekday::Fri);
        assert!(!friday.is_working);
        assert_eq!(friday.start, hm(9, 0));
        assert_eq!(friday.end, hm(17, 0));
    }

    #[test]
    fn null_schedule_is_the_default_week() {
        let schedule: WeeklySchedule = serde_json::from_value(serde_json::Value::Null).unwrap();
        assert_eq!(schedule, WeeklySchedule::default());
    }

    #[test]
    fn inverted_working_hours_are_rejected() {
        let result: Result<WeeklySchedule, _> = serde_json::from_value(json!({
            "monday": { "start": "18:00", "end": "09:00", "isWorking": true }
        }));
        assert!(result.is_err());
    }

    #[test]
    fn inverted_hours_on_a_day_off_are_tolerated() {
        let schedule: WeeklySchedule = serde_json::from_value(json!({
            "sunday": { "start": "18:00", "end": "09:00", "isWorking": false }
        }))
        .unwrap();
        assert!(!schedule.day(Weekday::Sun).is_working);
    }

    #[test]
    fn serializes_all_seven_days_with_wire_keys() {
        let value = serde_json::to_value(WeeklySchedule::default()).unwrap();
        let object = value.as_object().unwrap();

        assert_eq!(object.len(), 7);
        assert_eq!(
            value["monday"],
            json!({ "start": "09:00", "end": "17:00", "isWorking": true })
        );
        assert_eq!(value["sunday"]["isWorking"], json!(false));
    }

    #[test]
    fn working_day_lookup_uses_the_dates_weekday() {
        let schedule = WeeklySchedule::default();
        // 2024-01-06 is a Saturday, 2024-01-08 a Monday
        assert!(!schedule.is_working_on(NaiveDate::from_ymd_opt(2024, 1, 6).unwrap()));
        assert!(schedule.is_working_on(NaiveDate::from_ymd_opt(2024, 1, 8).unwrap()));
    }

    fn arb_day() -> impl Strategy<Value = DaySchedule> {
        (0u32..12, 0u32..60, 12u32..24, 0u32..60, any::<bool>())
            .prop_map(|(sh, sm, eh, em, working)| DaySchedule::new(hm(sh, sm), hm(eh, em), working))
    }

    proptest! {
        #[test]
        fn present_days_survive_and_absent_days_are_defaults(
            present in proptest::collection::btree_map(0usize..7, arb_day(), 0..7)
        ) {
            let mut payload = serde_json::Map::new();
            for (index, day) in &present {
                payload.insert(
                    weekday_key(WEEKDAYS[*index]).to_string(),
                    serde_json::to_value(day).unwrap(),
                );
            }

            let schedule: WeeklySchedule =
                serde_json::from_value(serde_json::Value::Object(payload)).unwrap();

            for (index, weekday) in WEEKDAYS.iter().enumerate() {
                match present.get(&index) {
                    Some(day) => prop_assert_eq!(schedule.day(*weekday), day),
                    None => prop_assert_eq!(*schedule.day(*weekday), WeeklySchedule::default_day(*weekday)),
                }
            }
        }
    }
}

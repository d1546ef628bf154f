// --- File: crates/bookify_booking/src/availability.rs ---
//! Availability view-model: selected date, its slot list, and the month map.
//!
//! Two independent fetch paths share one state cell:
//!
//! * the day-level slot fetch for the selected date, where the latest request
//!   wins through a request generation;
//! * the month prefetch, one probe per remaining day fanned out into a
//!   [`JoinSet`] with settle-all semantics. Each probe result is applied only if
//!   the fingerprint captured at launch still matches the current one.
//!
//! The state lock is never held across an await.

use crate::clock::{today_in, Clock};
use crate::state::{days_of_month, first_of_month, DayAvailabilityStatus, Fingerprint, MonthPhase};
use bookify_common::models::{SlotQuery, TimeSlot};
use bookify_common::{BookifyError, SchedulingService};
use chrono::NaiveDate;
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

/// Read-only copy of the view-model state.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AvailabilityView {
    pub event_type_id: Option<String>,
    pub timezone: Option<String>,
    pub selected_date: Option<NaiveDate>,
    pub slots: Vec<TimeSlot>,
    pub slots_loading: bool,
    /// Inline message from the last failed slot fetch.
    pub slot_error: Option<String>,
    pub visible_month: Option<NaiveDate>,
    pub phase: MonthPhase,
    pub statuses: BTreeMap<NaiveDate, DayAvailabilityStatus>,
}

#[derive(Debug, Default)]
struct AvailabilityState {
    view: AvailabilityView,
    slot_generation: u64,
    month_generation: u64,
}

impl AvailabilityState {
    fn slot_query(&self) -> Option<SlotQuery> {
        let view = &self.view;
        match (&view.selected_date, &view.event_type_id, &view.timezone) {
            (Some(date), Some(event_type_id), Some(timezone)) => Some(SlotQuery {
                event_type_id: event_type_id.clone(),
                date: *date,
                timezone: timezone.clone(),
            }),
            _ => None,
        }
    }

    fn fingerprint(&self) -> Option<Fingerprint> {
        let view = &self.view;
        match (&view.visible_month, &view.event_type_id, &view.timezone) {
            (Some(month), Some(event_type_id), Some(timezone)) => Some(Fingerprint {
                generation: self.month_generation,
                event_type_id: event_type_id.clone(),
                timezone: timezone.clone(),
                month: *month,
            }),
            _ => None,
        }
    }

    fn is_current(&self, fingerprint: &Fingerprint) -> bool {
        self.fingerprint().as_ref() == Some(fingerprint)
    }
}

pub struct AvailabilityViewModel<S: SchedulingService + ?Sized + 'static> {
    service: Arc<S>,
    clock: Arc<dyn Clock>,
    state: Mutex<AvailabilityState>,
}

impl<S: SchedulingService + ?Sized + 'static> AvailabilityViewModel<S> {
    pub fn new(service: Arc<S>, clock: Arc<dyn Clock>) -> Self {
        Self {
            service,
            clock,
            state: Mutex::new(AvailabilityState::default()),
        }
    }

    fn lock(&self) -> MutexGuard<'_, AvailabilityState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn view(&self) -> AvailabilityView {
        self.lock().view.clone()
    }

    pub fn selected_date(&self) -> Option<NaiveDate> {
        self.lock().view.selected_date
    }

    pub fn slots(&self) -> Vec<TimeSlot> {
        self.lock().view.slots.clone()
    }

    pub fn day_status(&self, date: NaiveDate) -> Option<DayAvailabilityStatus> {
        self.lock().view.statuses.get(&date).copied()
    }

    pub fn phase(&self) -> MonthPhase {
        self.lock().view.phase
    }

    /// Today's date in the current timezone.
    pub fn today(&self) -> NaiveDate {
        let timezone = self.lock().view.timezone.clone();
        today_in(self.clock.as_ref(), timezone.as_deref())
    }

    /// Changes the event type; re-fetches the day slots and the month map.
    pub async fn set_event_type(&self, event_type_id: Option<String>) {
        {
            let mut state = self.lock();
            if state.view.event_type_id == event_type_id {
                return;
            }
            state.view.event_type_id = event_type_id;
        }
        self.refresh_all().await;
    }

    /// Changes the timezone; re-fetches the day slots and the month map.
    pub async fn set_timezone(&self, timezone: Option<String>) {
        {
            let mut state = self.lock();
            if state.view.timezone == timezone {
                return;
            }
            state.view.timezone = timezone;
        }
        self.refresh_all().await;
    }

    async fn refresh_all(&self) {
        tokio::join!(self.refresh_day_slots(), self.refresh_month());
    }

    /// Selects a date and fetches its slots.
    ///
    /// The slot list of a different date is dropped right away.
    pub async fn select_date(&self, date: NaiveDate) {
        {
            let mut state = self.lock();
            if state.view.selected_date != Some(date) {
                state.view.slots.clear();
            }
            state.view.selected_date = Some(date);
        }
        self.refresh_day_slots().await;
    }

    /// Fetches the slot list for the selected date.
    ///
    /// Without a date, event type or timezone the list is emptied and no call
    /// is made. Failures are kept as an inline message; the current list stays.
    pub async fn refresh_day_slots(&self) {
        let (query, generation) = {
            let mut state = self.lock();
            state.slot_generation += 1;
            let Some(query) = state.slot_query() else {
                state.view.slots.clear();
                state.view.slots_loading = false;
                state.view.slot_error = None;
                return;
            };
            state.view.slots_loading = true;
            state.view.slot_error = None;
            (query, state.slot_generation)
        };

        debug!(
            "Fetching slots for event {} on {} in {}",
            query.event_type_id, query.date, query.timezone
        );
        let result = self.service.get_slots(query).await;

        let mut state = self.lock();
        if state.slot_generation != generation {
            debug!("{}: superseded slot fetch", BookifyError::StaleResultDiscarded);
            return;
        }
        state.view.slots_loading = false;
        match result {
            Ok(slots) => state.view.slots = slots,
            Err(e) => {
                warn!("Error fetching available slots: {}", e);
                state.view.slot_error = Some(e.user_message());
            }
        }
    }

    /// Shows the month containing `anchor` and probes its days.
    pub async fn change_visible_month(&self, anchor: NaiveDate) {
        self.lock().view.visible_month = Some(first_of_month(anchor));
        self.refresh_month().await;
    }

    /// Re-probes the visible month under a fresh fingerprint.
    ///
    /// Days before today are `Unavailable` without a call. With the event type
    /// or timezone unknown only those days are filled in and the phase stays
    /// `Idle`.
    pub async fn refresh_month(&self) {
        let today = self.today();
        let (fingerprint, mut probes) = {
            let mut state = self.lock();
            state.month_generation += 1;
            let Some(month) = state.view.visible_month else {
                return;
            };

            let days = days_of_month(month);
            let fingerprint = state.fingerprint();
            state.view.statuses.clear();
            state.view.phase = MonthPhase::Idle;
            for day in days.iter().filter(|day| **day < today) {
                state.view.statuses.insert(*day, DayAvailabilityStatus::Unavailable);
            }
            let Some(fingerprint) = fingerprint else {
                debug!("Month {} recorded; event type or timezone unknown, not probing", month);
                return;
            };

            let mut probes = JoinSet::new();
            for day in days.into_iter().filter(|day| *day >= today) {
                state.view.statuses.insert(day, DayAvailabilityStatus::Loading);
                let service = Arc::clone(&self.service);
                let query = SlotQuery {
                    event_type_id: fingerprint.event_type_id.clone(),
                    date: day,
                    timezone: fingerprint.timezone.clone(),
                };
                probes.spawn(async move { (day, service.get_slots(query).await) });
            }
            state.view.phase = MonthPhase::Loading;
            (fingerprint, probes)
        };

        info!(
            "Probing {} days of {} for event {}",
            probes.len(),
            fingerprint.month.format("%Y-%m"),
            fingerprint.event_type_id
        );

        while let Some(joined) = probes.join_next().await {
            match joined {
                Ok((day, result)) => self.apply_probe(&fingerprint, day, result),
                Err(e) => warn!("Availability probe task failed: {}", e),
            }
        }
        self.settle(&fingerprint);
    }

    fn apply_probe(
        &self,
        fingerprint: &Fingerprint,
        day: NaiveDate,
        result: Result<Vec<TimeSlot>, BookifyError>,
    ) {
        let mut state = self.lock();
        if !state.is_current(fingerprint) {
            debug!("{}: probe for {}", BookifyError::StaleResultDiscarded, day);
            return;
        }
        let status = match result {
            Ok(slots) if !slots.is_empty() => DayAvailabilityStatus::Available,
            Ok(_) => DayAvailabilityStatus::Unavailable,
            Err(e) => {
                warn!("Availability probe for {} failed: {}", day, e);
                DayAvailabilityStatus::Unavailable
            }
        };
        state.view.statuses.insert(day, status);
        state.view.phase = MonthPhase::Resolving;
    }

    /// Closes a month fetch: days still loading (panicked probes) become unavailable.
    fn settle(&self, fingerprint: &Fingerprint) {
        let mut state = self.lock();
        if !state.is_current(fingerprint) {
            debug!(
                "{}: month {} settled after being superseded",
                BookifyError::StaleResultDiscarded,
                fingerprint.month
            );
            return;
        }
        for status in state.view.statuses.values_mut() {
            if *status == DayAvailabilityStatus::Loading {
                *status = DayAvailabilityStatus::Unavailable;
            }
        }
        state.view.phase = MonthPhase::Settled;
    }

    /// Drops all view-state. In-flight results are discarded when they land.
    pub fn reset(&self) {
        let mut state = self.lock();
        state.view = AvailabilityView::default();
        state.slot_generation += 1;
        state.month_generation += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedClock;
    use bookify_common::services::mock::{MockSchedulingService, SlotResponse};
    use chrono::{TimeZone, Utc};
    use std::time::Duration;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn slot(hour: u32, minute: u32) -> TimeSlot {
        TimeSlot::at(hour, minute).unwrap()
    }

    /// 2024-03-15 12:00 UTC.
    fn clock() -> Arc<dyn Clock> {
        Arc::new(FixedClock(Utc.with_ymd_and_hms(2024, 3, 15, 12, 0, 0).unwrap()))
    }

    async fn ready_view_model(
        service: MockSchedulingService,
    ) -> (Arc<MockSchedulingService>, AvailabilityViewModel<MockSchedulingService>) {
        let service = Arc::new(service);
        let vm = AvailabilityViewModel::new(service.clone(), clock());
        vm.set_event_type(Some("et1".to_string())).await;
        vm.set_timezone(Some("UTC".to_string())).await;
        (service, vm)
    }

    #[tokio::test]
    async fn selecting_a_date_fetches_its_slots() {
        let service = MockSchedulingService::new().with_slots(date(2024, 3, 20), vec![slot(9, 0), slot(9, 30)]);
        let (service, vm) = ready_view_model(service).await;

        vm.select_date(date(2024, 3, 20)).await;

        assert_eq!(vm.slots(), vec![slot(9, 0), slot(9, 30)]);
        let calls = service.slot_calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].event_type_id, "et1");
        assert_eq!(calls[0].timezone, "UTC");
    }

    #[tokio::test]
    async fn no_fetch_without_prerequisites() {
        let service = Arc::new(MockSchedulingService::new());
        let vm = AvailabilityViewModel::new(service.clone(), clock());

        vm.select_date(date(2024, 3, 20)).await;
        vm.set_event_type(Some("et1".to_string())).await;

        let view = vm.view();
        assert!(view.slots.is_empty());
        assert_eq!(view.slot_error, None);
        assert!(service.slot_calls().is_empty());

        vm.set_timezone(Some("UTC".to_string())).await;
        assert_eq!(service.slot_calls().len(), 1);
    }

    #[tokio::test]
    async fn failed_slot_fetch_keeps_previous_list_and_reports_inline() {
        let service = MockSchedulingService::new().with_slots(date(2024, 3, 20), vec![slot(10, 0)]);
        let (_, vm) = ready_view_model(service).await;
        vm.select_date(date(2024, 3, 20)).await;
        assert_eq!(vm.slots(), vec![slot(10, 0)]);

        // Same state, now backed by a failing service.
        let failing = Arc::new(MockSchedulingService::new().with_slot_response(
            date(2024, 3, 20),
            SlotResponse::Fail(bookify_common::api_error(Some(500), "Slot service down")),
        ));
        let vm2 = AvailabilityViewModel::new(failing, clock());
        vm2.lock().view = vm.view();
        vm2.refresh_day_slots().await;

        let view = vm2.view();
        assert_eq!(view.slots, vec![slot(10, 0)]);
        assert_eq!(view.slot_error.as_deref(), Some("Slot service down"));
        assert!(!view.slots_loading);
    }

    #[tokio::test(start_paused = true)]
    async fn latest_slot_request_wins() {
        let service = MockSchedulingService::new()
            .with_slots(date(2024, 3, 20), vec![slot(9, 0)])
            .with_slot_delay(date(2024, 3, 20), Duration::from_millis(200))
            .with_slots(date(2024, 3, 21), vec![slot(14, 0)])
            .with_slot_delay(date(2024, 3, 21), Duration::from_millis(10));
        let (_, vm) = ready_view_model(service).await;

        tokio::join!(vm.select_date(date(2024, 3, 20)), async {
            tokio::time::sleep(Duration::from_millis(1)).await;
            vm.select_date(date(2024, 3, 21)).await;
        });

        let view = vm.view();
        assert_eq!(view.selected_date, Some(date(2024, 3, 21)));
        assert_eq!(view.slots, vec![slot(14, 0)]);
    }

    #[tokio::test]
    async fn past_days_are_unavailable_without_calls() {
        let service = MockSchedulingService::new().with_slots(date(2024, 3, 20), vec![slot(9, 0)]);
        let (service, vm) = ready_view_model(service).await;

        vm.change_visible_month(date(2024, 3, 1)).await;

        for day in 1..15 {
            assert_eq!(vm.day_status(date(2024, 3, day)), Some(DayAvailabilityStatus::Unavailable));
        }
        assert!(service.slot_calls().iter().all(|q| q.date >= date(2024, 3, 15)));
        assert_eq!(service.slot_calls().len(), 17);
        assert_eq!(vm.day_status(date(2024, 3, 20)), Some(DayAvailabilityStatus::Available));
        assert_eq!(vm.day_status(date(2024, 3, 21)), Some(DayAvailabilityStatus::Unavailable));
        assert_eq!(vm.phase(), MonthPhase::Settled);
    }

    #[tokio::test(start_paused = true)]
    async fn month_passes_through_loading_and_resolving() {
        let mut service = MockSchedulingService::new();
        for day in days_of_month(date(2024, 3, 1)).into_iter().filter(|d| *d >= date(2024, 3, 15)) {
            service = service.with_slot_delay(day, Duration::from_millis(1000));
        }
        let service = service
            .with_slots(date(2024, 3, 20), vec![slot(9, 0)])
            .with_slot_delay(date(2024, 3, 20), Duration::from_millis(50))
            .with_slot_delay(date(2024, 3, 21), Duration::from_millis(50));
        let (_, vm) = ready_view_model(service).await;

        tokio::join!(vm.change_visible_month(date(2024, 3, 1)), async {
            tokio::time::sleep(Duration::from_millis(10)).await;
            let view = vm.view();
            assert_eq!(view.phase, MonthPhase::Loading);
            assert_eq!(view.statuses[&date(2024, 3, 14)], DayAvailabilityStatus::Unavailable);
            assert_eq!(view.statuses[&date(2024, 3, 15)], DayAvailabilityStatus::Loading);
            assert_eq!(view.statuses[&date(2024, 3, 20)], DayAvailabilityStatus::Loading);

            tokio::time::sleep(Duration::from_millis(90)).await;
            let view = vm.view();
            assert_eq!(view.phase, MonthPhase::Resolving);
            assert_eq!(view.statuses[&date(2024, 3, 20)], DayAvailabilityStatus::Available);
            assert_eq!(view.statuses[&date(2024, 3, 21)], DayAvailabilityStatus::Unavailable);
            assert_eq!(view.statuses[&date(2024, 3, 22)], DayAvailabilityStatus::Loading);
        });

        let view = vm.view();
        assert_eq!(view.phase, MonthPhase::Settled);
        assert_eq!(view.statuses[&date(2024, 3, 22)], DayAvailabilityStatus::Unavailable);
        assert_eq!(view.statuses[&date(2024, 3, 20)], DayAvailabilityStatus::Available);
    }

    #[tokio::test]
    async fn failed_and_panicked_probes_do_not_abort_siblings() {
        let service = MockSchedulingService::new()
            .with_slots(date(2024, 4, 2), vec![slot(9, 0)])
            .with_slot_response(
                date(2024, 4, 3),
                SlotResponse::Fail(BookifyError::Network("timeout".into())),
            )
            .with_slot_response(date(2024, 4, 4), SlotResponse::Panic)
            .with_slots(date(2024, 4, 5), vec![slot(11, 0)]);
        let (_, vm) = ready_view_model(service).await;

        vm.change_visible_month(date(2024, 4, 10)).await;

        let view = vm.view();
        assert_eq!(view.statuses.len(), 30);
        assert_eq!(view.statuses[&date(2024, 4, 2)], DayAvailabilityStatus::Available);
        assert_eq!(view.statuses[&date(2024, 4, 3)], DayAvailabilityStatus::Unavailable);
        assert_eq!(view.statuses[&date(2024, 4, 4)], DayAvailabilityStatus::Unavailable);
        assert_eq!(view.statuses[&date(2024, 4, 5)], DayAvailabilityStatus::Available);
        assert!(view.statuses.values().all(|s| *s != DayAvailabilityStatus::Loading));
    }

    #[tokio::test(start_paused = true)]
    async fn rapid_month_changes_keep_only_the_latest_month() {
        let mut service = MockSchedulingService::new();
        for day in days_of_month(date(2024, 4, 1)) {
            service = service
                .with_slots(day, vec![slot(9, 0)])
                .with_slot_delay(day, Duration::from_millis(300));
        }
        for day in days_of_month(date(2024, 5, 1)) {
            service = service.with_slot_delay(day, Duration::from_millis(20));
        }
        let (_, vm) = ready_view_model(service).await;

        tokio::join!(vm.change_visible_month(date(2024, 4, 1)), async {
            tokio::time::sleep(Duration::from_millis(5)).await;
            vm.change_visible_month(date(2024, 5, 1)).await;
        });

        let view = vm.view();
        assert_eq!(view.visible_month, Some(date(2024, 5, 1)));
        assert_eq!(view.phase, MonthPhase::Settled);
        assert_eq!(view.statuses.len(), 31);
        assert!(view.statuses.keys().all(|d| *d >= date(2024, 5, 1)));
        assert!(view
            .statuses
            .values()
            .all(|s| *s == DayAvailabilityStatus::Unavailable));
    }

    #[tokio::test]
    async fn month_without_prerequisites_stays_idle() {
        let service = Arc::new(MockSchedulingService::new().with_slots(date(2024, 3, 20), vec![slot(9, 0)]));
        let vm = AvailabilityViewModel::new(service.clone(), clock());

        vm.change_visible_month(date(2024, 3, 1)).await;

        let view = vm.view();
        assert_eq!(view.phase, MonthPhase::Idle);
        assert_eq!(view.statuses.len(), 14);
        assert!(service.slot_calls().is_empty());

        vm.set_event_type(Some("et1".to_string())).await;
        vm.set_timezone(Some("UTC".to_string())).await;

        assert_eq!(vm.phase(), MonthPhase::Settled);
        assert_eq!(vm.day_status(date(2024, 3, 20)), Some(DayAvailabilityStatus::Available));
    }

    #[tokio::test(start_paused = true)]
    async fn reset_discards_in_flight_results() {
        let service = MockSchedulingService::new()
            .with_slots(date(2024, 3, 20), vec![slot(9, 0)])
            .with_slot_delay(date(2024, 3, 20), Duration::from_millis(50));
        let (_, vm) = ready_view_model(service).await;

        tokio::join!(vm.select_date(date(2024, 3, 20)), async {
            tokio::time::sleep(Duration::from_millis(1)).await;
            vm.reset();
        });

        assert_eq!(vm.view(), AvailabilityView::default());
    }
}

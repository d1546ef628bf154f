// --- File: crates/bookify_booking/src/schedule_editor.rs ---
//! Editor for the host's weekly working hours.
//!
//! Loads the saved schedule (defaults when none exists), lets the user toggle
//! days and move their hours while in edit mode, and saves the whole week.

use bookify_common::{BookifyError, DaySchedule, SchedulingService, WeeklySchedule};
use chrono::{NaiveTime, Weekday};
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{info, warn};

pub const LOAD_ERROR: &str = "Could not load availability.";
pub const SAVE_ERROR: &str = "Error saving changes. Please try again.";

/// Which end of a working day is being moved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HoursField {
    Start,
    End,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EditorView {
    pub schedule: WeeklySchedule,
    pub editing: bool,
    pub saving: bool,
    pub error: Option<String>,
}

#[derive(Debug, Default)]
struct EditorState {
    view: EditorView,
    /// Last loaded or saved schedule, restored by `cancel`.
    saved: WeeklySchedule,
}

pub struct ScheduleEditor<S: SchedulingService + ?Sized> {
    service: Arc<S>,
    state: Mutex<EditorState>,
}

impl<S: SchedulingService + ?Sized> ScheduleEditor<S> {
    pub fn new(service: Arc<S>) -> Self {
        Self {
            service,
            state: Mutex::new(EditorState::default()),
        }
    }

    fn lock(&self) -> MutexGuard<'_, EditorState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn view(&self) -> EditorView {
        self.lock().view.clone()
    }

    pub fn schedule(&self) -> WeeklySchedule {
        self.lock().view.schedule.clone()
    }

    /// Loads the saved week. Absent schedule means defaults; failures fall back
    /// to defaults and leave an error message.
    pub async fn load(&self) {
        let result = self.service.get_availability().await;
        let mut state = self.lock();
        let schedule = match result {
            Ok(Some(availability)) => {
                state.view.error = None;
                availability.schedule
            }
            Ok(None) => {
                state.view.error = None;
                WeeklySchedule::default()
            }
            Err(e) => {
                warn!("Error loading availability: {}", e);
                state.view.error = Some(LOAD_ERROR.to_string());
                WeeklySchedule::default()
            }
        };
        state.saved = schedule.clone();
        state.view.schedule = schedule;
        state.view.editing = false;
    }

    pub fn start_editing(&self) {
        let mut state = self.lock();
        state.view.editing = true;
        state.view.error = None;
    }

    /// Leaves edit mode and discards unsaved changes.
    pub fn cancel(&self) {
        let mut state = self.lock();
        state.view.schedule = state.saved.clone();
        state.view.editing = false;
        state.view.error = None;
    }

    pub fn toggle_working(&self, weekday: Weekday) -> Result<(), BookifyError> {
        let mut state = self.lock();
        if !state.view.editing {
            return Ok(());
        }
        let mut day = *state.view.schedule.day(weekday);
        day.is_working = !day.is_working;
        state.view.schedule.set_day(weekday, day)
    }

    /// Moves the start or end of a working day. Ignored on days off and
    /// outside edit mode; rejected when it would put start after end.
    pub fn set_hours(&self, weekday: Weekday, field: HoursField, time: NaiveTime) -> Result<(), BookifyError> {
        let mut state = self.lock();
        let current = *state.view.schedule.day(weekday);
        if !state.view.editing || !current.is_working {
            return Ok(());
        }
        let updated = match field {
            HoursField::Start => DaySchedule { start: time, ..current },
            HoursField::End => DaySchedule { end: time, ..current },
        };
        state.view.schedule.set_day(weekday, updated)
    }

    /// Saves the whole week; leaves edit mode on success, keeps edits on failure.
    pub async fn save(&self) -> Result<(), BookifyError> {
        let schedule = {
            let mut state = self.lock();
            state.view.schedule.validate()?;
            state.view.saving = true;
            state.view.error = None;
            state.view.schedule.clone()
        };

        let result = self.service.update_availability(&schedule).await;

        let mut state = self.lock();
        state.view.saving = false;
        match result {
            Ok(_) => {
                info!("Weekly schedule saved");
                state.saved = schedule;
                state.view.editing = false;
                Ok(())
            }
            Err(e) => {
                warn!("Error updating availability: {}", e);
                state.view.error = Some(SAVE_ERROR.to_string());
                Err(e)
            }
        }
    }
}

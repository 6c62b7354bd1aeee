//! In-process calendar used for dry runs and tests.

use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Duration, NaiveDate, Utc};
use chrono_tz::Tz;
use uuid::Uuid;

use super::clock::local_datetime;
use super::models::BusyInterval;
use super::provider::{
    CalendarProvider, CreatedEvent, EventTime, NewEvent, ProviderError, ProviderEvent,
};

#[derive(Default)]
struct State {
    events: Vec<ProviderEvent>,
    busy: Vec<BusyInterval>,
    // Busy intervals that only show up from the nth free/busy query on
    delayed_busy: Vec<(usize, BusyInterval)>,
    failing_dates: Vec<NaiveDate>,
    // Event listing fails from this (zero based) query on
    failing_from_list: Option<usize>,
    fail_inserts: bool,
    inserted: Vec<NewEvent>,
    list_calls: usize,
    free_busy_calls: usize,
}

pub struct InMemoryCalendar {
    timezone: Tz,
    state: Mutex<State>,
}

impl Default for InMemoryCalendar {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryCalendar {
    pub fn new() -> Self {
        Self::with_timezone(chrono_tz::UTC)
    }

    /// Full-day events and failing dates are interpreted in `timezone`.
    pub fn with_timezone(timezone: Tz) -> Self {
        Self {
            timezone,
            state: Mutex::new(State::default()),
        }
    }

    fn state(&self) -> std::sync::MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn add_event(&self, title: &str, start: DateTime<Utc>, end: DateTime<Utc>) {
        self.state().events.push(ProviderEvent {
            id: Uuid::new_v4().to_string(),
            summary: Some(title.to_string()),
            start: EventTime::DateTime(start),
            end: EventTime::DateTime(end),
            html_link: None,
        });
    }

    pub fn add_full_day_event(&self, title: &str, date: NaiveDate) {
        self.state().events.push(ProviderEvent {
            id: Uuid::new_v4().to_string(),
            summary: Some(title.to_string()),
            start: EventTime::Date(date),
            end: EventTime::Date(date + Duration::days(1)),
            html_link: None,
        });
    }

    /// Busy time with no visible event, only reported by free/busy.
    pub fn add_busy(&self, start: DateTime<Utc>, end: DateTime<Utc>) {
        self.state().busy.push(BusyInterval::new(start, end));
    }

    /// Busy time that appears from the `nth` (zero based) free/busy
    /// query onwards, simulating a booking made by someone else while
    /// a search is running.
    pub fn add_busy_from_query(&self, nth: usize, start: DateTime<Utc>, end: DateTime<Utc>) {
        self.state()
            .delayed_busy
            .push((nth, BusyInterval::new(start, end)));
    }

    pub fn fail_on(&self, date: NaiveDate) {
        self.state().failing_dates.push(date);
    }

    /// Event listing starts failing at the `nth` (zero based) query,
    /// simulating an outage in the middle of a search.
    pub fn fail_from_list_query(&self, nth: usize) {
        self.state().failing_from_list = Some(nth);
    }

    pub fn fail_inserts(&self) {
        self.state().fail_inserts = true;
    }

    pub fn inserted(&self) -> Vec<NewEvent> {
        self.state().inserted.clone()
    }

    pub fn list_calls(&self) -> usize {
        self.state().list_calls
    }

    pub fn free_busy_calls(&self) -> usize {
        self.state().free_busy_calls
    }

    fn bounds(&self, time: EventTime) -> DateTime<Utc> {
        match time {
            EventTime::Date(date) => local_datetime(&self.timezone, date, 0, 0).with_timezone(&Utc),
            EventTime::DateTime(dt) => dt,
        }
    }

    fn check_failure(&self, state: &State, time_min: DateTime<Utc>) -> Result<(), ProviderError> {
        let date = time_min.with_timezone(&self.timezone).date_naive();
        if state.failing_dates.contains(&date) {
            return Err(ProviderError::Unavailable(format!("no data for {}", date)));
        }
        Ok(())
    }
}

#[async_trait]
impl CalendarProvider for InMemoryCalendar {
    async fn list_events(
        &self,
        time_min: DateTime<Utc>,
        time_max: DateTime<Utc>,
    ) -> Result<Vec<ProviderEvent>, ProviderError> {
        let mut state = self.state();
        let query = state.list_calls;
        state.list_calls += 1;
        self.check_failure(&state, time_min)?;
        if state.failing_from_list.is_some_and(|nth| query >= nth) {
            return Err(ProviderError::Unavailable(String::from("calendar went away")));
        }

        let events = state
            .events
            .iter()
            .filter(|e| self.bounds(e.start) < time_max && time_min < self.bounds(e.end))
            .cloned()
            .collect();
        Ok(events)
    }

    async fn free_busy(
        &self,
        time_min: DateTime<Utc>,
        time_max: DateTime<Utc>,
    ) -> Result<Vec<BusyInterval>, ProviderError> {
        let mut state = self.state();
        let query = state.free_busy_calls;
        state.free_busy_calls += 1;
        self.check_failure(&state, time_min)?;

        let delayed = state
            .delayed_busy
            .iter()
            .filter(|(nth, _)| query >= *nth)
            .map(|(_, interval)| *interval);
        let busy = state
            .busy
            .iter()
            .copied()
            .chain(delayed)
            .filter(|i| i.overlaps(time_min, time_max))
            .collect();
        Ok(busy)
    }

    async fn insert_event(&self, event: &NewEvent) -> Result<CreatedEvent, ProviderError> {
        let mut state = self.state();
        if state.fail_inserts {
            return Err(ProviderError::Unavailable(String::from("insert rejected")));
        }

        let id = Uuid::new_v4().to_string();
        let html_link = Some(format!("https://calendar.local/event?eid={}", id));
        state.events.push(ProviderEvent {
            id: id.clone(),
            summary: Some(event.summary.clone()),
            start: EventTime::DateTime(event.start),
            end: EventTime::DateTime(event.end),
            html_link: html_link.clone(),
        });
        state.inserted.push(event.clone());

        Ok(CreatedEvent { id, html_link })
    }
}

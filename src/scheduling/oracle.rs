//! Availability oracle: per-day events and busy intervals from a
//! calendar provider.
//!
//! Busy intervals come from two sources. The events listing carries
//! titles for the audit trail, the free/busy query catches time the
//! owner marked busy without a visible event. Both are merged.

use chrono::{DateTime, Duration, NaiveDate, Utc};

use super::clock::BusinessHours;
use super::intervals::{is_free, merge_intervals};
use super::models::{BusyInterval, CalendarEvent};
use super::provider::{CalendarProvider, EventTime, ProviderError, ProviderEvent};

/// Events and busy intervals for one day.
#[derive(Debug, Clone, Default)]
pub struct DayAvailability {
    pub events: Vec<CalendarEvent>,
    pub busy: Vec<BusyInterval>,
    pub has_full_day_event: bool,
}

pub struct AvailabilityOracle<'a> {
    provider: &'a dyn CalendarProvider,
    hours: BusinessHours,
}

impl<'a> AvailabilityOracle<'a> {
    pub fn new(provider: &'a dyn CalendarProvider, hours: BusinessHours) -> Self {
        Self { provider, hours }
    }

    pub fn hours(&self) -> &BusinessHours {
        &self.hours
    }

    pub async fn get_events(&self, date: NaiveDate) -> Result<Vec<CalendarEvent>, ProviderError> {
        let (time_min, time_max) = self.hours.day_bounds(date);
        let raw = self.provider.list_events(time_min, time_max).await?;
        Ok(raw.into_iter().map(|e| self.normalize(e)).collect())
    }

    pub async fn get_busy_intervals(
        &self,
        date: NaiveDate,
    ) -> Result<Vec<BusyInterval>, ProviderError> {
        Ok(self.day(date).await?.busy)
    }

    /// Fetch events for `date` and derive its busy intervals. Returns
    /// early with a single whole-day interval when any event is a
    /// full-day event.
    pub async fn day(&self, date: NaiveDate) -> Result<DayAvailability, ProviderError> {
        let events = self.get_events(date).await?;
        let (day_start, day_end) = self.hours.day_bounds(date);

        if events.iter().any(|e| e.is_full_day) {
            return Ok(DayAvailability {
                events,
                busy: vec![BusyInterval::new(day_start, day_end)],
                has_full_day_event: true,
            });
        }

        let mut busy: Vec<BusyInterval> = events.iter().map(BusyInterval::from).collect();
        busy.extend(self.provider.free_busy(day_start, day_end).await?);

        Ok(DayAvailability {
            events,
            busy: merge_intervals(busy),
            has_full_day_event: false,
        })
    }

    pub fn is_free(&self, start: DateTime<Utc>, end: DateTime<Utc>, busy: &[BusyInterval]) -> bool {
        is_free(start, end, busy)
    }

    fn normalize(&self, event: ProviderEvent) -> CalendarEvent {
        let is_full_day = matches!(event.start, EventTime::Date(_));
        let start = self.resolve(event.start);
        let mut end = self.resolve(event.end);
        // Some providers send a zero-length all-day marker
        if is_full_day && end <= start {
            end = start + Duration::days(1);
        }
        CalendarEvent {
            title: event.summary.unwrap_or_else(|| String::from("(No title)")),
            start,
            end,
            is_full_day,
            link: event.html_link,
        }
    }

    fn resolve(&self, time: EventTime) -> DateTime<Utc> {
        match time {
            EventTime::Date(date) => self.hours.day_bounds(date).0,
            EventTime::DateTime(dt) => dt,
        }
    }
}

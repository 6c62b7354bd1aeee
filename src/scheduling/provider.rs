//! The calendar provider seam. Google Calendar implements it for real
//! accounts and `InMemoryCalendar` for dry runs.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;

use super::models::BusyInterval;

#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    #[error("HTTP: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Calendar access token expired or revoked")]
    Unauthorized,
    #[error("Calendar API error {status}: {message}")]
    Api { status: u16, message: String },
    #[error("Unexpected calendar response: {0}")]
    Parse(String),
    #[error("Calendar unavailable: {0}")]
    Unavailable(String),
}

/// Start or end of an event as the provider reports it. Full-day
/// events only carry a date.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventTime {
    Date(NaiveDate),
    DateTime(DateTime<Utc>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct ProviderEvent {
    pub id: String,
    pub summary: Option<String>,
    pub start: EventTime,
    pub end: EventTime,
    pub html_link: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct NewEvent {
    pub summary: String,
    pub description: String,
    pub location: String,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    /// IANA name of the governing timezone
    pub timezone: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CreatedEvent {
    pub id: String,
    pub html_link: Option<String>,
}

#[async_trait]
pub trait CalendarProvider: Send + Sync {
    /// Events overlapping `[time_min, time_max)`. Empty when there are none.
    async fn list_events(
        &self,
        time_min: DateTime<Utc>,
        time_max: DateTime<Utc>,
    ) -> Result<Vec<ProviderEvent>, ProviderError>;

    /// The provider's native free/busy view of `[time_min, time_max)`.
    async fn free_busy(
        &self,
        time_min: DateTime<Utc>,
        time_max: DateTime<Utc>,
    ) -> Result<Vec<BusyInterval>, ProviderError>;

    async fn insert_event(&self, event: &NewEvent) -> Result<CreatedEvent, ProviderError>;
}

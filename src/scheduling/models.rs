//! Types shared by the availability oracle, slot finder and
//! coordinator. Instants are stored in UTC and converted to the
//! governing timezone only when business hours matter.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalendarEvent {
    pub title: String,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub is_full_day: bool,
    pub link: Option<String>,
}

/// Half-open `[start, end)` range during which the calendar is occupied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BusyInterval {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl BusyInterval {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self { start, end }
    }

    pub fn duration(&self) -> Duration {
        self.end - self.start
    }

    pub fn overlaps(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> bool {
        self.start < end && start < self.end
    }
}

impl From<&CalendarEvent> for BusyInterval {
    fn from(event: &CalendarEvent) -> Self {
        Self::new(event.start, event.end)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DateIntentType {
    Today,
    Tomorrow,
    ThisWeek,
    EndOfWeek,
    NextWeek,
    Weekend,
    SpecificDay,
    SpecificDate,
    Custom,
    None,
}

impl DateIntentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            DateIntentType::Today => "today",
            DateIntentType::Tomorrow => "tomorrow",
            DateIntentType::ThisWeek => "this_week",
            DateIntentType::EndOfWeek => "end_of_week",
            DateIntentType::NextWeek => "next_week",
            DateIntentType::Weekend => "weekend",
            DateIntentType::SpecificDay => "specific_day",
            DateIntentType::SpecificDate => "specific_date",
            DateIntentType::Custom => "custom",
            DateIntentType::None => "none",
        }
    }
}

impl fmt::Display for DateIntentType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DateIntentType {
    type Err = std::convert::Infallible;

    /// Unknown labels resolve to `Custom` so an extractor that
    /// invents its own vocabulary still lands on the default rule.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_lowercase().replace([' ', '-'], "_");
        let intent = match normalized.as_str() {
            "today" => DateIntentType::Today,
            "tomorrow" => DateIntentType::Tomorrow,
            "this_week" => DateIntentType::ThisWeek,
            "end_of_week" => DateIntentType::EndOfWeek,
            "next_week" => DateIntentType::NextWeek,
            "weekend" | "this_weekend" => DateIntentType::Weekend,
            "specific_day" => DateIntentType::SpecificDay,
            "specific_date" => DateIntentType::SpecificDate,
            "" | "none" | "null" => DateIntentType::None,
            _ => DateIntentType::Custom,
        };
        Ok(intent)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DateIntent {
    pub has_request: bool,
    pub r#type: DateIntentType,
    pub raw_description: String,
    pub confidence: f32,
}

impl DateIntent {
    pub fn none() -> Self {
        Self {
            has_request: false,
            r#type: DateIntentType::None,
            raw_description: String::new(),
            confidence: 0.0,
        }
    }
}

/// Audit record for one examined day.
#[derive(Debug, Clone, Serialize)]
pub struct SchedulingCandidate {
    pub date: NaiveDate,
    pub formatted_label: String,
    pub events: Vec<CalendarEvent>,
    pub busy: Vec<BusyInterval>,
    pub has_full_day_event: bool,
    pub slot: Option<DateTime<Utc>>,
    pub skipped_reason: Option<String>,
}

impl SchedulingCandidate {
    pub fn new(date: NaiveDate) -> Self {
        Self {
            date,
            formatted_label: format_day_label(date),
            events: Vec::new(),
            busy: Vec::new(),
            has_full_day_event: false,
            slot: None,
            skipped_reason: None,
        }
    }
}

/// Examined days in examination order, addressable by date.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(transparent)]
pub struct AuditTrail(Vec<SchedulingCandidate>);

impl AuditTrail {
    pub fn record(&mut self, candidate: SchedulingCandidate) {
        match self.0.iter_mut().find(|c| c.date == candidate.date) {
            Some(existing) => *existing = candidate,
            None => self.0.push(candidate),
        }
    }

    pub fn get(&self, date: NaiveDate) -> Option<&SchedulingCandidate> {
        self.0.iter().find(|c| c.date == date)
    }

    pub fn dates(&self) -> Vec<NaiveDate> {
        self.0.iter().map(|c| c.date).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &SchedulingCandidate> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ChosenSlot {
    pub start: DateTime<Utc>,
    pub duration_minutes: i64,
    pub verified: bool,
}

impl ChosenSlot {
    pub fn end(&self) -> DateTime<Utc> {
        self.start + Duration::minutes(self.duration_minutes)
    }
}

/// Details for the event written on commit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MeetingRequest {
    pub title: String,
    pub description: String,
    pub location: String,
    pub duration_minutes: i64,
}

impl Default for MeetingRequest {
    fn default() -> Self {
        Self {
            title: String::from("Meeting"),
            description: String::new(),
            location: String::new(),
            duration_minutes: 30,
        }
    }
}

/// Confirmation artifact produced by a committed booking.
#[derive(Debug, Clone, Serialize)]
pub struct Booking {
    pub slot: ChosenSlot,
    pub event_id: String,
    pub link: Option<String>,
    pub title: String,
    /// Slot start rendered in the governing timezone
    pub display_time: String,
}

pub fn format_day_label(date: NaiveDate) -> String {
    date.format("%A, %B %d, %Y").to_string()
}

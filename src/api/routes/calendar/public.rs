//! Public types for the calendar API
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::scheduling::SchedulingCandidate;

#[derive(Deserialize)]
pub struct AvailabilityQuery {
    pub date: NaiveDate,
    /// Meeting length in minutes, defaults to the configured length
    pub duration: Option<i64>,
}

#[derive(Serialize)]
pub struct AvailabilityResponse {
    pub day: SchedulingCandidate,
    pub first_free_slot: Option<DateTime<Utc>>,
    /// `first_free_slot` in the governing timezone
    pub first_free_slot_display: Option<String>,
}

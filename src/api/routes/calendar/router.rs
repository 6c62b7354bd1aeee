//! Router for the calendar API

use axum::{Router, extract::State, response::Json};
use axum_extra::extract::Query;
use chrono::Utc;

use super::public;
use crate::api::public::ApiError;
use crate::api::state::{SharedState, snapshot};
use crate::scheduling::slots::find_next_free_slot;
use crate::scheduling::{AvailabilityOracle, SchedulingCandidate};

/// Availability for one day and the first slot that fits
async fn availability_handler(
    State(state): State<SharedState>,
    Query(params): Query<public::AvailabilityQuery>,
) -> Result<Json<public::AvailabilityResponse>, ApiError> {
    let (config, services) = snapshot(&state)?;
    let hours = config.business_hours();
    let duration = params.duration.unwrap_or(config.meeting_minutes);
    if duration <= 0 {
        return Err(ApiError::bad_request("Duration must be a positive number of minutes"));
    }
    if duration > hours.window_minutes() {
        return Err(ApiError::bad_request("Duration must fit within business hours"));
    }
    let Some(calendar) = services.calendar else {
        return Err(ApiError::bad_request(
            "Cannot proceed without calendar access credentials",
        ));
    };

    let oracle = AvailabilityOracle::new(calendar.as_ref(), hours);
    let availability = oracle.day(params.date).await?;

    let slot = if availability.has_full_day_event {
        None
    } else {
        find_next_free_slot(
            hours.opening(params.date),
            duration,
            &availability.busy,
            &hours,
        )
        .map(|s| s.with_timezone(&Utc))
    };

    let mut day = SchedulingCandidate::new(params.date);
    day.events = availability.events;
    day.busy = availability.busy;
    day.has_full_day_event = availability.has_full_day_event;
    day.slot = slot;

    Ok(Json(public::AvailabilityResponse {
        day,
        first_free_slot: slot,
        first_free_slot_display: slot.map(|s| hours.display(s)),
    }))
}

/// Create the calendar router
pub fn router() -> Router<SharedState> {
    Router::new().route("/availability", axum::routing::get(availability_handler))
}

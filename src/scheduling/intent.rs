//! Date-intent resolution: turns the extractor's intent label into
//! the first day the coordinator should examine.

use chrono::{DateTime, Duration, NaiveDate, Timelike};
use chrono_tz::Tz;

use super::clock::weekday_index;
use super::models::DateIntentType;
use super::oracle::AvailabilityOracle;

const THURSDAY: i64 = 3;
const SATURDAY: i64 = 5;

/// Pure rules for every intent except `end_of_week`, which needs the
/// calendar. `suggested` is the date the extractor pulled from the
/// message, used verbatim for specific days and dates. From
/// `closing_hour` on, "this week" no longer includes today.
pub fn resolve_static(
    intent: DateIntentType,
    now: DateTime<Tz>,
    suggested: Option<NaiveDate>,
    closing_hour: u32,
) -> NaiveDate {
    let today = now.date_naive();
    match intent {
        DateIntentType::Today => today,
        DateIntentType::Tomorrow => today + Duration::days(1),
        DateIntentType::ThisWeek => {
            if now.hour() < closing_hour {
                today
            } else {
                today + Duration::days(1)
            }
        }
        DateIntentType::EndOfWeek => thursday_on_or_after(today),
        DateIntentType::Weekend => {
            let ahead = (SATURDAY - weekday_index(today)).rem_euclid(7);
            today + Duration::days(ahead)
        }
        DateIntentType::SpecificDay | DateIntentType::SpecificDate => match suggested {
            Some(date) => date,
            None => next_monday(today),
        },
        DateIntentType::NextWeek | DateIntentType::Custom | DateIntentType::None => {
            next_monday(today)
        }
    }
}

/// Resolve the starting search date, consulting the calendar for
/// `end_of_week`: when Thursday and Friday are both taken by full-day
/// events the search starts the following Monday.
pub async fn resolve(
    intent: DateIntentType,
    now: DateTime<Tz>,
    suggested: Option<NaiveDate>,
    oracle: &AvailabilityOracle<'_>,
) -> NaiveDate {
    let start = resolve_static(intent, now, suggested, oracle.hours().end_hour);
    if intent != DateIntentType::EndOfWeek {
        return start;
    }

    let friday = start + Duration::days(1);
    if has_full_day_event(oracle, start).await && has_full_day_event(oracle, friday).await {
        let monday = start + Duration::days(4);
        tracing::info!(
            "Thursday {} and Friday {} fully booked, starting from {}",
            start,
            friday,
            monday
        );
        return monday;
    }
    start
}

async fn has_full_day_event(oracle: &AvailabilityOracle<'_>, date: NaiveDate) -> bool {
    match oracle.get_events(date).await {
        Ok(events) => events.iter().any(|e| e.is_full_day),
        Err(e) => {
            tracing::warn!("Could not check {} for full-day events: {}", date, e);
            false
        }
    }
}

/// The coming Monday, a full week out when today is Monday.
pub fn next_monday(today: NaiveDate) -> NaiveDate {
    let ahead = match (7 - weekday_index(today)) % 7 {
        0 => 7,
        n => n,
    };
    today + Duration::days(ahead)
}

/// This week's Thursday, or next week's once it has passed.
fn thursday_on_or_after(today: NaiveDate) -> NaiveDate {
    today + Duration::days((THURSDAY - weekday_index(today)).rem_euclid(7))
}

//! Single-day slot search within business hours.

use chrono::{DateTime, Duration, Timelike, Utc};
use chrono_tz::Tz;

use super::clock::{BusinessHours, local_datetime};
use super::intervals::is_free;
use super::models::BusyInterval;

/// Busy blocks longer than this mark the whole day unavailable. Some
/// providers report an all-day entry as one long free/busy block
/// instead of a dated marker.
const FULL_DAY_BLOCK_HOURS: i64 = 12;

/// First free start time on the day of `preferred_start`.
///
/// Candidates begin at `preferred_start` (never before opening) and
/// then step to the top of each following hour. A candidate is only
/// valid when the whole meeting ends by closing time. Durations too
/// large to represent never fit.
pub fn find_next_free_slot(
    preferred_start: DateTime<Tz>,
    duration_minutes: i64,
    busy: &[BusyInterval],
    hours: &BusinessHours,
) -> Option<DateTime<Tz>> {
    let date = preferred_start.date_naive();
    let opening = hours.opening(date);
    let closing = hours.closing(date);
    let duration = Duration::try_minutes(duration_minutes.max(1))?;

    let (day_start, day_end) = hours.day_bounds(date);
    let blocked = busy.iter().any(|i| {
        i.overlaps(day_start, day_end) && i.duration() > Duration::hours(FULL_DAY_BLOCK_HOURS)
    });
    if blocked {
        tracing::debug!("{} has a full-day block, no slots", date);
        return None;
    }

    let mut candidate = preferred_start.max(opening);
    loop {
        let end = candidate.checked_add_signed(duration)?;
        if end > closing {
            return None;
        }
        if is_free(candidate.with_timezone(&Utc), end.with_timezone(&Utc), busy) {
            return Some(candidate);
        }
        candidate = local_datetime(&hours.timezone, date, candidate.hour() + 1, 0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn hours() -> BusinessHours {
        BusinessHours::new(chrono_tz::Europe::Paris, 9, 17)
    }

    fn day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 4, 24).unwrap()
    }

    fn local(hour: u32, minute: u32) -> DateTime<Tz> {
        local_datetime(&chrono_tz::Europe::Paris, day(), hour, minute)
    }

    fn busy(from: (u32, u32), to: (u32, u32)) -> BusyInterval {
        BusyInterval::new(
            local(from.0, from.1).with_timezone(&Utc),
            local(to.0, to.1).with_timezone(&Utc),
        )
    }

    #[test]
    fn test_empty_day_returns_opening() {
        let slot = find_next_free_slot(local(9, 0), 30, &[], &hours());
        assert_eq!(slot, Some(local(9, 0)));
    }

    #[test]
    fn test_never_starts_before_opening() {
        let slot = find_next_free_slot(local(6, 0), 30, &[], &hours());
        assert_eq!(slot, Some(local(9, 0)));
    }

    #[test]
    fn test_respects_preferred_hour() {
        let slot = find_next_free_slot(local(14, 0), 30, &[], &hours());
        assert_eq!(slot, Some(local(14, 0)));
    }

    #[test]
    fn test_preferred_half_hour_then_whole_hours() {
        let slot = find_next_free_slot(local(14, 30), 30, &[busy((14, 30), (15, 0))], &hours());
        assert_eq!(slot, Some(local(15, 0)));
    }

    #[test]
    fn test_skips_busy_hours() {
        let b = vec![busy((9, 0), (10, 0)), busy((10, 0), (11, 15))];
        let slot = find_next_free_slot(local(9, 0), 30, &b, &hours());
        assert_eq!(slot, Some(local(12, 0)));
    }

    #[test]
    fn test_last_slot_must_end_by_closing() {
        let b = vec![busy((9, 0), (16, 0))];
        assert_eq!(find_next_free_slot(local(9, 0), 60, &b, &hours()), Some(local(16, 0)));
        assert_eq!(find_next_free_slot(local(9, 0), 90, &b, &hours()), None);
    }

    #[test]
    fn test_preferred_after_closing_has_no_slot() {
        assert_eq!(find_next_free_slot(local(17, 0), 30, &[], &hours()), None);
    }

    #[test]
    fn test_full_day_block_blocks_everything() {
        let (start, end) = hours().day_bounds(day());
        let b = vec![BusyInterval::new(start, end)];
        assert_eq!(find_next_free_slot(local(9, 0), 30, &b, &hours()), None);
    }

    #[test]
    fn test_long_block_outside_business_hours_still_blocks() {
        // 13 hours starting the evening before
        let start = local(0, 0).with_timezone(&Utc) - Duration::hours(5);
        let b = vec![BusyInterval::new(start, start + Duration::hours(13))];
        assert_eq!(find_next_free_slot(local(9, 0), 30, &b, &hours()), None);
    }

    #[test]
    fn test_fully_booked_business_hours() {
        let b = vec![busy((9, 0), (17, 0))];
        assert_eq!(find_next_free_slot(local(9, 0), 30, &b, &hours()), None);
    }

    #[test]
    fn test_huge_durations_never_fit() {
        assert_eq!(find_next_free_slot(local(9, 0), 100_000_000_000_000, &[], &hours()), None);
        assert_eq!(find_next_free_slot(local(9, 0), i64::MAX, &[], &hours()), None);
    }
}

use chrono::{DateTime, Utc};

use super::models::BusyInterval;

/// Sort by start and coalesce intervals that touch or overlap.
pub fn merge_intervals(mut intervals: Vec<BusyInterval>) -> Vec<BusyInterval> {
    if intervals.is_empty() {
        return Vec::new();
    }

    intervals.sort_by_key(|i| (i.start, i.end));
    let mut merged: Vec<BusyInterval> = Vec::with_capacity(intervals.len());

    for interval in intervals {
        if let Some(current) = merged.last_mut() {
            if interval.start <= current.end {
                if interval.end > current.end {
                    current.end = interval.end;
                }
                continue;
            }
        }
        merged.push(interval);
    }

    merged
}

/// Standard half-open overlap test against every busy interval.
pub fn is_free(start: DateTime<Utc>, end: DateTime<Utc>, busy: &[BusyInterval]) -> bool {
    !busy.iter().any(|i| i.overlaps(start, end))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(hour: u32, minute: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 4, 24, hour, minute, 0).unwrap()
    }

    fn busy(from: (u32, u32), to: (u32, u32)) -> BusyInterval {
        BusyInterval::new(at(from.0, from.1), at(to.0, to.1))
    }

    #[test]
    fn test_merge_overlapping_and_touching() {
        let merged = merge_intervals(vec![
            busy((13, 0), (14, 0)),
            busy((9, 0), (10, 0)),
            busy((9, 30), (11, 0)),
            busy((11, 0), (11, 30)),
        ]);
        assert_eq!(merged, vec![busy((9, 0), (11, 30)), busy((13, 0), (14, 0))]);
    }

    #[test]
    fn test_merge_removes_duplicates_and_contained() {
        let merged = merge_intervals(vec![
            busy((10, 0), (12, 0)),
            busy((10, 0), (12, 0)),
            busy((10, 30), (11, 0)),
        ]);
        assert_eq!(merged, vec![busy((10, 0), (12, 0))]);
    }

    #[test]
    fn test_merge_is_idempotent() {
        let input = vec![
            busy((15, 0), (16, 0)),
            busy((9, 0), (9, 45)),
            busy((9, 30), (10, 0)),
            busy((12, 0), (12, 30)),
        ];
        let once = merge_intervals(input);
        let twice = merge_intervals(once.clone());
        assert_eq!(once, twice);
    }

    #[test]
    fn test_is_free_half_open() {
        let b = vec![busy((10, 0), (11, 0))];
        // Adjacent on either side is free
        assert!(is_free(at(9, 0), at(10, 0), &b));
        assert!(is_free(at(11, 0), at(11, 30), &b));
        // Any overlap is not
        assert!(!is_free(at(9, 30), at(10, 30), &b));
        assert!(!is_free(at(10, 15), at(10, 45), &b));
        assert!(!is_free(at(9, 0), at(12, 0), &b));
    }

    #[test]
    fn test_is_free_matches_overlap_definition() {
        let b = vec![busy((9, 0), (9, 30)), busy((13, 0), (14, 30))];
        for start_hour in 8..18 {
            for minute in [0, 15, 30, 45] {
                let s = at(start_hour, minute);
                let e = s + chrono::Duration::minutes(45);
                let expected = !b.iter().any(|i| i.start < e && s < i.end);
                assert_eq!(is_free(s, e, &b), expected, "start {}", s);
            }
        }
    }

    #[test]
    fn test_empty_calendar_is_free() {
        assert!(is_free(at(9, 0), at(17, 0), &[]));
        assert!(merge_intervals(vec![]).is_empty());
    }
}

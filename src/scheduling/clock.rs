//! Governing-timezone arithmetic: business hours, day bounds and DST
//! safe construction of local times.

use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc};
use chrono_tz::Tz;

/// Business window for meeting placement in the governing timezone.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BusinessHours {
    pub timezone: Tz,
    pub start_hour: u32,
    pub end_hour: u32,
}

impl Default for BusinessHours {
    fn default() -> Self {
        Self {
            timezone: chrono_tz::Europe::Paris,
            start_hour: 9,
            end_hour: 17,
        }
    }
}

impl BusinessHours {
    pub fn new(timezone: Tz, start_hour: u32, end_hour: u32) -> Self {
        Self {
            timezone,
            start_hour,
            end_hour,
        }
    }

    pub fn opening(&self, date: NaiveDate) -> DateTime<Tz> {
        local_datetime(&self.timezone, date, self.start_hour, 0)
    }

    pub fn closing(&self, date: NaiveDate) -> DateTime<Tz> {
        local_datetime(&self.timezone, date, self.end_hour, 0)
    }

    /// Longest meeting that fits between opening and closing.
    pub fn window_minutes(&self) -> i64 {
        i64::from(self.end_hour.saturating_sub(self.start_hour)) * 60
    }

    /// Local midnight to the following local midnight, as UTC instants.
    pub fn day_bounds(&self, date: NaiveDate) -> (DateTime<Utc>, DateTime<Utc>) {
        let start = local_datetime(&self.timezone, date, 0, 0);
        let end = local_datetime(&self.timezone, date + Duration::days(1), 0, 0);
        (start.with_timezone(&Utc), end.with_timezone(&Utc))
    }

    pub fn local_date(&self, instant: DateTime<Utc>) -> NaiveDate {
        instant.with_timezone(&self.timezone).date_naive()
    }

    pub fn now(&self) -> DateTime<Tz> {
        Utc::now().with_timezone(&self.timezone)
    }

    pub fn display(&self, instant: DateTime<Utc>) -> String {
        instant
            .with_timezone(&self.timezone)
            .format("%A, %B %d, %Y at %I:%M %p %Z")
            .to_string()
    }
}

/// Resolve a local date and time to a timezone aware instant.
///
/// Ambiguous times (fall back) resolve to the earlier instant. Inside
/// a spring-forward gap the local time does not exist, so the time an
/// hour later is used instead.
pub fn local_datetime(tz: &Tz, date: NaiveDate, hour: u32, minute: u32) -> DateTime<Tz> {
    // Hour 24 is used for "end of day"
    if hour >= 24 {
        return local_datetime(tz, date + Duration::days(1), hour - 24, minute);
    }

    let naive = NaiveDateTime::new(
        date,
        NaiveTime::from_hms_opt(hour, minute, 0).unwrap_or(NaiveTime::MIN),
    );
    if let Some(dt) = tz.from_local_datetime(&naive).earliest() {
        return dt;
    }

    tracing::warn!(
        "DST gap for {} {:02}:{:02} in {}; using post-transition time",
        date,
        hour,
        minute,
        tz
    );
    let shifted = naive + Duration::hours(1);
    tz.from_local_datetime(&shifted)
        .earliest()
        .unwrap_or_else(|| Utc.from_utc_datetime(&naive).with_timezone(tz))
}

/// Monday based weekday index, Monday = 0.
pub fn weekday_index(date: NaiveDate) -> i64 {
    date.weekday().num_days_from_monday() as i64
}

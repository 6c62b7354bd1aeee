//! Scheduling coordinator: walks candidate days, picks a slot,
//! re-verifies it against fresh availability and books it.
//!
//! The search runs in two phases. The first week honours the date the
//! lead asked for: a slot on that exact day wins immediately, any
//! other day is only remembered if nothing was found yet. When the
//! first week has nothing, the second week is scanned and the first
//! open slot wins.

use chrono::{DateTime, Duration, NaiveDate, Timelike, Utc};
use chrono_tz::Tz;
use serde::Serialize;

use super::clock::{BusinessHours, local_datetime};
use super::error::SchedulingError;
use super::intent;
use super::intervals::is_free;
use super::models::{
    AuditTrail, Booking, ChosenSlot, DateIntent, MeetingRequest, SchedulingCandidate,
};
use super::oracle::{AvailabilityOracle, DayAvailability};
use super::provider::{CalendarProvider, NewEvent};
use super::slots::find_next_free_slot;

const PRIMARY_HORIZON_DAYS: i64 = 7;
const EXTENDED_HORIZON_DAYS: i64 = 14;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum SchedulingState {
    Searching { day_offset: i64 },
    CandidateFound { date: NaiveDate },
    Verifying,
    Committed,
    SearchExhausted,
}

#[derive(Debug, Clone)]
pub struct SchedulingRequest {
    pub intent: DateIntent,
    /// Date and time suggested by the extractor, if any
    pub preferred: Option<DateTime<Tz>>,
    pub meeting: MeetingRequest,
    pub now: DateTime<Tz>,
}

/// Everything a scheduling attempt produced, successful or not.
#[derive(Debug)]
pub struct SchedulingRun {
    pub start_date: NaiveDate,
    pub audit: AuditTrail,
    pub transitions: Vec<SchedulingState>,
    pub notes: Vec<String>,
    pub outcome: Result<Booking, SchedulingError>,
}

#[derive(Default)]
struct Trace {
    audit: AuditTrail,
    transitions: Vec<SchedulingState>,
    notes: Vec<String>,
}

impl Trace {
    fn transition(&mut self, state: SchedulingState) {
        tracing::debug!("Scheduling state: {:?}", state);
        self.transitions.push(state);
    }

    fn note(&mut self, note: impl Into<String>) {
        self.notes.push(note.into());
    }
}

pub struct SchedulingCoordinator<'a> {
    provider: &'a dyn CalendarProvider,
    hours: BusinessHours,
}

impl<'a> SchedulingCoordinator<'a> {
    pub fn new(provider: &'a dyn CalendarProvider, hours: BusinessHours) -> Self {
        Self { provider, hours }
    }

    pub async fn schedule(&self, request: &SchedulingRequest) -> SchedulingRun {
        let oracle = AvailabilityOracle::new(self.provider, self.hours);
        let suggested = request.preferred.map(|p| p.date_naive());
        let start_date = intent::resolve(request.intent.r#type, request.now, suggested, &oracle).await;

        let mut trace = Trace::default();
        trace.note(format!(
            "Resolved '{}' intent to start searching on {}",
            request.intent.r#type,
            start_date.format("%A, %B %d, %Y")
        ));

        let outcome = self.drive(&oracle, request, start_date, &mut trace).await;
        match &outcome {
            Ok(booking) => tracing::info!("Booked meeting at {}", booking.display_time),
            Err(e) => tracing::warn!("Scheduling failed: {}", e),
        }

        SchedulingRun {
            start_date,
            audit: trace.audit,
            transitions: trace.transitions,
            notes: trace.notes,
            outcome,
        }
    }

    async fn drive(
        &self,
        oracle: &AvailabilityOracle<'_>,
        request: &SchedulingRequest,
        start_date: NaiveDate,
        trace: &mut Trace,
    ) -> Result<Booking, SchedulingError> {
        let Some(candidate) = self.search(oracle, request, start_date, trace).await else {
            trace.transition(SchedulingState::SearchExhausted);
            trace.note("No open slot in the search horizon");
            return Err(SchedulingError::SearchExhausted {
                start: start_date,
                days: EXTENDED_HORIZON_DAYS,
            });
        };
        trace.transition(SchedulingState::CandidateFound {
            date: candidate.date_naive(),
        });
        trace.note(format!(
            "Candidate slot {}",
            self.hours.display(candidate.with_timezone(&Utc))
        ));

        let slot = match self.verify(oracle, request, candidate, trace).await {
            Ok(slot) => slot,
            Err(e) => {
                if matches!(e, SchedulingError::SearchExhausted { .. }) {
                    trace.transition(SchedulingState::SearchExhausted);
                }
                return Err(e);
            }
        };

        let booking = self.commit(request, slot).await?;
        trace.transition(SchedulingState::Committed);
        trace.note(format!("Created calendar event for {}", booking.display_time));
        Ok(booking)
    }

    async fn search(
        &self,
        oracle: &AvailabilityOracle<'_>,
        request: &SchedulingRequest,
        start_date: NaiveDate,
        trace: &mut Trace,
    ) -> Option<DateTime<Tz>> {
        let duration = request.meeting.duration_minutes;
        let preferred_date = request.preferred.map(|p| p.date_naive());
        let mut best: Option<DateTime<Tz>> = None;

        for offset in 0..PRIMARY_HORIZON_DAYS {
            trace.transition(SchedulingState::Searching { day_offset: offset });
            let date = start_date + Duration::days(offset);
            let Some(day) = self.examine(oracle, date, trace).await else {
                continue;
            };
            if day.has_full_day_event {
                trace.note(format!("{} is fully booked", date));
                self.record(trace, date, Some(day), None, None);
                continue;
            }

            let is_preferred_day = preferred_date == Some(date);
            let slot = self
                .search_from(request, date, is_preferred_day)
                .and_then(|from| find_next_free_slot(from, duration, &day.busy, &self.hours));
            self.record(trace, date, Some(day), slot, None);

            if let Some(slot) = slot {
                if is_preferred_day {
                    trace.note(format!("Requested day {} has an opening", date));
                    return Some(slot);
                }
                if best.is_none() {
                    best = Some(slot);
                }
            }
        }

        if best.is_some() {
            return best;
        }

        trace.note("Nothing in the first week, extending the search");
        for offset in PRIMARY_HORIZON_DAYS..EXTENDED_HORIZON_DAYS {
            trace.transition(SchedulingState::Searching { day_offset: offset });
            let date = start_date + Duration::days(offset);
            let Some(day) = self.examine(oracle, date, trace).await else {
                continue;
            };
            if day.has_full_day_event {
                self.record(trace, date, Some(day), None, None);
                continue;
            }

            let slot = self
                .search_from(request, date, false)
                .and_then(|from| find_next_free_slot(from, duration, &day.busy, &self.hours));
            self.record(trace, date, Some(day), slot, None);
            if slot.is_some() {
                return slot;
            }
        }

        None
    }

    /// Availability for one day. Provider failures skip the day.
    async fn examine(
        &self,
        oracle: &AvailabilityOracle<'_>,
        date: NaiveDate,
        trace: &mut Trace,
    ) -> Option<DayAvailability> {
        match oracle.day(date).await {
            Ok(day) => Some(day),
            Err(e) => {
                tracing::warn!("Skipping {}: {}", date, e);
                trace.note(format!("Skipped {} (calendar unavailable)", date));
                self.record(trace, date, None, None, Some(e.to_string()));
                None
            }
        }
    }

    fn record(
        &self,
        trace: &mut Trace,
        date: NaiveDate,
        day: Option<DayAvailability>,
        slot: Option<DateTime<Tz>>,
        skipped_reason: Option<String>,
    ) {
        let mut candidate = SchedulingCandidate::new(date);
        if let Some(day) = day {
            candidate.events = day.events;
            candidate.busy = day.busy;
            candidate.has_full_day_event = day.has_full_day_event;
        }
        candidate.slot = slot.map(|s| s.with_timezone(&Utc));
        candidate.skipped_reason = skipped_reason;
        trace.audit.record(candidate);
    }

    /// Where the slot scan starts on `date`: the requested time on the
    /// requested day, opening time otherwise, and never in the past.
    /// `None` once business hours on `date` are over.
    fn search_from(
        &self,
        request: &SchedulingRequest,
        date: NaiveDate,
        is_preferred_day: bool,
    ) -> Option<DateTime<Tz>> {
        let from = match request.preferred {
            Some(preferred) if is_preferred_day => preferred,
            _ => self.hours.opening(date),
        };
        if date != request.now.date_naive() || from >= request.now {
            return Some(from);
        }

        let next = next_whole_hour(&self.hours.timezone, request.now);
        if next.date_naive() != date || next >= self.hours.closing(date) {
            tracing::debug!("Business hours on {} are over", date);
            return None;
        }
        Some(next)
    }

    async fn verify(
        &self,
        oracle: &AvailabilityOracle<'_>,
        request: &SchedulingRequest,
        candidate: DateTime<Tz>,
        trace: &mut Trace,
    ) -> Result<ChosenSlot, SchedulingError> {
        trace.transition(SchedulingState::Verifying);
        let duration = request.meeting.duration_minutes;
        let date = candidate.date_naive();

        let busy = oracle.get_busy_intervals(date).await.inspect_err(|e| {
            tracing::error!("Verification lookup failed for {}: {}", date, e);
        })?;

        let start = candidate.with_timezone(&Utc);
        if is_free(start, start + Duration::minutes(duration), &busy) {
            return Ok(ChosenSlot {
                start,
                duration_minutes: duration,
                verified: true,
            });
        }

        let conflict = SchedulingError::SlotConflict(self.hours.display(start));
        tracing::warn!("{}", conflict);
        trace.note(conflict.to_string());

        let alternate = self
            .search_from(request, date, false)
            .and_then(|from| find_next_free_slot(from, duration, &busy, &self.hours));
        match alternate {
            Some(alternate) => {
                trace.note(format!(
                    "Moved to {} on the same day",
                    self.hours.display(alternate.with_timezone(&Utc))
                ));
                Ok(ChosenSlot {
                    start: alternate.with_timezone(&Utc),
                    duration_minutes: duration,
                    verified: true,
                })
            }
            None => Err(SchedulingError::SearchExhausted {
                start: date,
                days: 1,
            }),
        }
    }

    async fn commit(
        &self,
        request: &SchedulingRequest,
        slot: ChosenSlot,
    ) -> Result<Booking, SchedulingError> {
        let meeting = &request.meeting;
        let event = NewEvent {
            summary: meeting.title.clone(),
            description: meeting.description.clone(),
            location: meeting.location.clone(),
            start: slot.start,
            end: slot.end(),
            timezone: self.hours.timezone.name().to_string(),
        };

        let created = self.provider.insert_event(&event).await.inspect_err(|e| {
            tracing::error!("Creating calendar event failed: {}", e);
        })?;

        Ok(Booking {
            slot,
            event_id: created.id,
            link: created.html_link,
            title: meeting.title.clone(),
            display_time: self.hours.display(slot.start),
        })
    }
}

fn next_whole_hour(tz: &Tz, now: DateTime<Tz>) -> DateTime<Tz> {
    if now.minute() == 0 && now.second() == 0 && now.nanosecond() == 0 {
        return now;
    }
    local_datetime(tz, now.date_naive(), now.hour() + 1, 0)
}

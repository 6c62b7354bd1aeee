//! Calendar agent: asks the extractor for a suggested meeting time,
//! turns it into a scheduling request and lets the coordinator book it.

use std::sync::LazyLock;

use chrono::{DateTime, Duration, NaiveDateTime, Timelike};
use chrono_tz::Tz;
use regex::Regex;
use serde::Deserialize;
use serde_json::{Value, json};

use crate::ai::prompt::{Prompt, render};
use crate::openai::LanguageModel;
use crate::scheduling::clock::local_datetime;
use crate::scheduling::intent::next_monday;
use crate::scheduling::{
    CalendarProvider, DateIntent, DateIntentType, MeetingRequest, SchedulingCoordinator,
    SchedulingError, SchedulingRequest,
};
use crate::workflow::report::{MeetingSummary, SchedulingFailure, SchedulingSummary};
use crate::workflow::{RequestContext, WorkflowReport};

// Never strip AM/PM, they are part of the time
static TZ_SUFFIX_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\s+\(?(CET|CEST|UTC|GMT|BST|WET|WEST|EET|EEST|EST|EDT|CST|CDT|MST|MDT|PST|PDT)\)?\s*$")
        .unwrap()
});

static LEADING_WEEKDAY_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z]+,\s*").unwrap());

static DIGITS_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\d+").unwrap());

const NAIVE_FORMATS: [&str; 5] = [
    "%A, %B %d, %Y at %I:%M %p",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M",
];

/// The extractor's JSON answer. Every field is optional, models leave
/// things out.
#[derive(Debug, Default, Deserialize)]
pub struct MeetingSuggestion {
    #[serde(default)]
    pub datetime: Option<String>,
    /// Minutes, as a number or a string such as "45 minutes"
    #[serde(default)]
    pub duration: Option<Value>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub has_specific_date_request: Option<bool>,
    #[serde(default)]
    pub date_intent_type: Option<String>,
}

impl MeetingSuggestion {
    pub fn duration_minutes(&self) -> Option<i64> {
        let minutes = match self.duration.as_ref()? {
            Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f.round() as i64)),
            Value::String(s) => DIGITS_RE.find(s).and_then(|m| m.as_str().parse().ok()),
            _ => None,
        }?;
        (minutes > 0).then_some(minutes)
    }
}

/// The JSON inside a ```json fence, the first fenced block, or the
/// outermost braces, in that order.
pub fn extract_json_block(response: &str) -> &str {
    let response = response.trim();
    if let Some((_, rest)) = response.split_once("```json") {
        return rest.split("```").next().unwrap_or(rest).trim();
    }
    if let Some((_, rest)) = response.split_once("```") {
        return rest.split("```").next().unwrap_or(rest).trim();
    }
    match (response.find('{'), response.rfind('}')) {
        (Some(start), Some(end)) if start < end => &response[start..=end],
        _ => response,
    }
}

pub fn parse_suggestion(response: &str) -> Result<MeetingSuggestion, SchedulingError> {
    let block = extract_json_block(response);
    serde_json::from_str(block).map_err(|e| SchedulingError::ClassifierParse(e.to_string()))
}

/// Parse a suggested date-time in `tz`. Trailing timezone
/// abbreviations are dropped, the governing timezone always applies.
pub fn parse_datetime(raw: &str, tz: &Tz) -> Result<DateTime<Tz>, SchedulingError> {
    let cleaned = TZ_SUFFIX_RE.replace(raw.trim(), "").to_string();

    if let Ok(instant) = DateTime::parse_from_rfc3339(&cleaned) {
        return Ok(instant.with_timezone(tz));
    }

    let naive = NAIVE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(&cleaned, fmt).ok())
        // Models get the weekday wrong more often than the date
        .or_else(|| {
            let without_weekday = LEADING_WEEKDAY_RE.replace(&cleaned, "");
            NaiveDateTime::parse_from_str(&without_weekday, "%B %d, %Y at %I:%M %p").ok()
        })
        .ok_or_else(|| {
            SchedulingError::ClassifierParse(format!("unrecognized date and time '{}'", raw))
        })?;

    Ok(local_datetime(
        tz,
        naive.date(),
        naive.time().hour(),
        naive.time().minute(),
    ))
}

/// Map the suggestion onto the coordinator's request. A missing
/// date-time is fine, an unparseable one is not.
pub fn build_request(
    suggestion: &MeetingSuggestion,
    ctx: &RequestContext,
) -> Result<(SchedulingRequest, Vec<String>), SchedulingError> {
    let mut notes = Vec::new();
    let tz = ctx.hours.timezone;

    let raw_datetime = suggestion
        .datetime
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty() && !s.eq_ignore_ascii_case("null"));
    let mut preferred = raw_datetime.map(|s| parse_datetime(s, &tz)).transpose()?;
    if let Some(p) = preferred
        && p < ctx.now
    {
        notes.push(format!(
            "Ignoring suggested time {} since it is in the past",
            p.format("%Y-%m-%d %H:%M")
        ));
        preferred = None;
    }

    let intent_type = match suggestion.date_intent_type.as_deref() {
        Some(label) => label
            .parse::<DateIntentType>()
            .unwrap_or(DateIntentType::Custom),
        None if preferred.is_some() => DateIntentType::SpecificDate,
        None => DateIntentType::None,
    };
    let intent = DateIntent {
        has_request: suggestion
            .has_specific_date_request
            .unwrap_or(preferred.is_some()),
        r#type: intent_type,
        raw_description: raw_datetime.unwrap_or_default().to_string(),
        confidence: match (preferred.is_some(), intent_type) {
            (true, _) => 0.9,
            (false, DateIntentType::None) => 0.0,
            (false, _) => 0.5,
        },
    };

    let window = ctx.hours.window_minutes();
    let duration_minutes = match suggestion.duration_minutes() {
        Some(minutes) if minutes > window => {
            notes.push(format!(
                "Requested {} minute meeting does not fit in business hours, using {} minutes",
                minutes, ctx.meeting_minutes
            ));
            ctx.meeting_minutes
        }
        Some(minutes) => minutes,
        None => ctx.meeting_minutes,
    };

    let defaults = MeetingRequest::default();
    let meeting = MeetingRequest {
        title: suggestion
            .title
            .clone()
            .filter(|t| !t.trim().is_empty())
            .unwrap_or(defaults.title),
        description: suggestion
            .description
            .clone()
            .unwrap_or_else(|| format!("Meeting requested via: {}", ctx.lead.message)),
        location: suggestion.location.clone().unwrap_or_default(),
        duration_minutes,
    };

    Ok((
        SchedulingRequest {
            intent,
            preferred,
            meeting,
            now: ctx.now,
        },
        notes,
    ))
}

fn failed(mut report: WorkflowReport, e: SchedulingError) -> WorkflowReport {
    report = report
        .thought(format!("[Calendar Agent] {}", e))
        .error(e.to_string());
    report.scheduling_error = Some(SchedulingFailure::from(&e));
    report
}

pub async fn run(
    llm: &dyn LanguageModel,
    calendar: Option<&dyn CalendarProvider>,
    ctx: &RequestContext,
) -> WorkflowReport {
    let report = WorkflowReport::default();
    let Some(calendar) = calendar else {
        return failed(report, SchedulingError::MissingCredentials);
    };

    let today = ctx.now.date_naive();
    let prompt = render(
        Prompt::ExtractMeeting,
        &json!({
            "today": today.format("%A, %B %d, %Y").to_string(),
            "tomorrow": (today + Duration::days(1)).format("%A, %B %d, %Y").to_string(),
            "next_monday": next_monday(today).format("%A, %B %d, %Y").to_string(),
            "timezone": ctx.hours.timezone.name(),
            "opening": format!("{:02}:00", ctx.hours.start_hour),
            "closing": format!("{:02}:00", ctx.hours.end_hour),
            "message": ctx.lead.message,
        }),
    );
    let prompt = match prompt {
        Ok(p) => p,
        Err(e) => return failed(report, SchedulingError::ClassifierParse(e.to_string())),
    };

    let report = report.tool("CalendarTool.extract");
    let completion = match llm.think(&prompt).await {
        Ok(c) => c,
        Err(e) => {
            tracing::error!("Meeting extraction failed: {}", e);
            return failed(
                report,
                SchedulingError::ClassifierParse(format!("extractor unavailable: {}", e)),
            );
        }
    };
    let mut report = report.tokens(completion.usage);

    let suggestion = match parse_suggestion(&completion.content) {
        Ok(s) => s,
        Err(e) => {
            let preview: String = completion.content.chars().take(100).collect();
            report = report.thought(format!("[Calendar Agent] Raw response: {}...", preview));
            return failed(report, e);
        }
    };
    report = report.thought(format!(
        "[Calendar Agent] Parsed scheduling suggestion: datetime={}, intent={}",
        suggestion.datetime.as_deref().unwrap_or("none"),
        suggestion.date_intent_type.as_deref().unwrap_or("none"),
    ));

    let (request, notes) = match build_request(&suggestion, ctx) {
        Ok(r) => r,
        Err(e) => return failed(report, e),
    };
    for note in notes {
        report = report.thought(format!("[Calendar Agent] {}", note));
    }

    let coordinator = SchedulingCoordinator::new(calendar, ctx.hours);
    let run = coordinator.schedule(&request).await;

    report = report
        .tool("Calendar.list_events")
        .tool("Calendar.free_busy");
    for note in &run.notes {
        report = report.thought(format!("[Calendar Agent] {}", note));
    }
    report.scheduling = Some(SchedulingSummary {
        intent: request.intent.clone(),
        start_date: run.start_date,
        dates_checked: run.audit.clone(),
        transitions: run.transitions.clone(),
    });

    match run.outcome {
        Ok(booking) => {
            let mut report = report.tool("Calendar.insert_event").thought(format!(
                "[Calendar Agent] Successfully created calendar event: {}",
                booking.link.as_deref().unwrap_or(&booking.event_id)
            ));
            report.meeting = Some(MeetingSummary::from(&booking));
            report
        }
        Err(e) => failed(report, e),
    }
}

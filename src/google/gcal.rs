//! Google Calendar API v3 as a `CalendarProvider`.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use serde::Deserialize;
use serde_json::json;

use super::oauth::TokenProvider;
use crate::core::AppConfig;
use crate::scheduling::BusyInterval;
use crate::scheduling::provider::{
    CalendarProvider, CreatedEvent, EventTime, NewEvent, ProviderError, ProviderEvent,
};

pub const GOOGLE_CALENDAR_API_URL: &str = "https://www.googleapis.com/calendar/v3";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct EventsListResponse {
    #[serde(default)]
    items: Vec<RawEvent>,
    next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawEvent {
    #[serde(default)]
    id: String,
    summary: Option<String>,
    status: Option<String>,
    start: Option<RawEventTime>,
    end: Option<RawEventTime>,
    html_link: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawEventTime {
    date_time: Option<String>,
    date: Option<String>,
}

#[derive(Debug, Deserialize)]
struct FreeBusyResponse {
    #[serde(default)]
    calendars: HashMap<String, FreeBusyCalendar>,
}

#[derive(Debug, Deserialize)]
struct FreeBusyCalendar {
    #[serde(default)]
    busy: Vec<RawBusy>,
    #[serde(default)]
    errors: Vec<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct RawBusy {
    start: String,
    end: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct InsertedEvent {
    id: String,
    html_link: Option<String>,
}

fn parse_instant(value: &str) -> Result<DateTime<Utc>, ProviderError> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| ProviderError::Parse(format!("{}: {}", value, e)))
}

fn parse_event_time(raw: Option<RawEventTime>) -> Result<EventTime, ProviderError> {
    let raw = raw.ok_or_else(|| ProviderError::Parse(String::from("event without time")))?;
    if let Some(date_time) = raw.date_time {
        return Ok(EventTime::DateTime(parse_instant(&date_time)?));
    }
    if let Some(date) = raw.date {
        let date = NaiveDate::parse_from_str(&date, "%Y-%m-%d")
            .map_err(|e| ProviderError::Parse(format!("{}: {}", date, e)))?;
        return Ok(EventTime::Date(date));
    }
    Err(ProviderError::Parse(String::from("event time has neither date nor dateTime")))
}

async fn check(res: reqwest::Response) -> Result<reqwest::Response, ProviderError> {
    let status = res.status();
    if status == reqwest::StatusCode::UNAUTHORIZED {
        return Err(ProviderError::Unauthorized);
    }
    if !status.is_success() {
        let message = res.text().await.unwrap_or_default();
        return Err(ProviderError::Api {
            status: status.as_u16(),
            message,
        });
    }
    Ok(res)
}

pub struct GoogleCalendar {
    client: reqwest::Client,
    api_base_url: String,
    calendar_id: String,
    token: Arc<TokenProvider>,
}

impl GoogleCalendar {
    pub fn new(api_base_url: &str, calendar_id: &str, token: Arc<TokenProvider>) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_base_url: api_base_url.trim_end_matches('/').to_string(),
            calendar_id: calendar_id.to_string(),
            token,
        }
    }

    pub fn from_config(config: &AppConfig, token: Arc<TokenProvider>) -> Self {
        Self::new(&config.google_calendar_api_url, &config.calendar_id, token)
    }

    async fn access_token(&self) -> Result<String, ProviderError> {
        self.token.access_token().await.map_err(|e| {
            tracing::error!("Unable to get calendar access token: {}", e);
            ProviderError::Unauthorized
        })
    }

    fn events_url(&self) -> String {
        format!(
            "{}/calendars/{}/events",
            self.api_base_url,
            urlencoding::encode(&self.calendar_id)
        )
    }
}

#[async_trait]
impl CalendarProvider for GoogleCalendar {
    async fn list_events(
        &self,
        time_min: DateTime<Utc>,
        time_max: DateTime<Utc>,
    ) -> Result<Vec<ProviderEvent>, ProviderError> {
        let token = self.access_token().await?;
        let time_min = time_min.to_rfc3339();
        let time_max = time_max.to_rfc3339();
        let mut events = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let mut request = self
                .client
                .get(self.events_url())
                .bearer_auth(&token)
                .query(&[
                    ("timeMin", time_min.as_str()),
                    ("timeMax", time_max.as_str()),
                    ("singleEvents", "true"),
                    ("orderBy", "startTime"),
                    ("maxResults", "250"),
                ]);
            if let Some(ref page) = page_token {
                request = request.query(&[("pageToken", page.as_str())]);
            }

            let body: EventsListResponse = check(request.send().await?).await?.json().await?;
            for item in body.items {
                if item.status.as_deref() == Some("cancelled") {
                    continue;
                }
                events.push(ProviderEvent {
                    id: item.id,
                    summary: item.summary,
                    start: parse_event_time(item.start)?,
                    end: parse_event_time(item.end)?,
                    html_link: item.html_link,
                });
            }

            page_token = body.next_page_token;
            if page_token.is_none() {
                break;
            }
        }

        Ok(events)
    }

    async fn free_busy(
        &self,
        time_min: DateTime<Utc>,
        time_max: DateTime<Utc>,
    ) -> Result<Vec<BusyInterval>, ProviderError> {
        let token = self.access_token().await?;
        let payload = json!({
            "timeMin": time_min.to_rfc3339(),
            "timeMax": time_max.to_rfc3339(),
            "items": [{"id": self.calendar_id}],
        });
        let res = self
            .client
            .post(format!("{}/freeBusy", self.api_base_url))
            .bearer_auth(&token)
            .json(&payload)
            .send()
            .await?;
        let body: FreeBusyResponse = check(res).await?.json().await?;

        let Some(calendar) = body.calendars.get(&self.calendar_id) else {
            return Ok(Vec::new());
        };
        if !calendar.errors.is_empty() {
            return Err(ProviderError::Api {
                status: 200,
                message: serde_json::to_string(&calendar.errors).unwrap_or_default(),
            });
        }

        calendar
            .busy
            .iter()
            .map(|b| Ok(BusyInterval::new(parse_instant(&b.start)?, parse_instant(&b.end)?)))
            .collect()
    }

    async fn insert_event(&self, event: &NewEvent) -> Result<CreatedEvent, ProviderError> {
        let token = self.access_token().await?;
        let payload = json!({
            "summary": event.summary,
            "description": event.description,
            "location": event.location,
            "start": {
                "dateTime": event.start.to_rfc3339(),
                "timeZone": event.timezone,
            },
            "end": {
                "dateTime": event.end.to_rfc3339(),
                "timeZone": event.timezone,
            },
        });
        let res = self
            .client
            .post(self.events_url())
            .bearer_auth(&token)
            .json(&payload)
            .send()
            .await?;
        let created: InsertedEvent = check(res).await?.json().await?;
        tracing::info!("Created calendar event {}", created.id);

        Ok(CreatedEvent {
            id: created.id,
            html_link: created.html_link,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use mockito::Matcher;

    fn calendar(server: &mockito::ServerGuard) -> GoogleCalendar {
        GoogleCalendar::new(
            &server.url(),
            "primary",
            Arc::new(TokenProvider::Static(String::from("test_token"))),
        )
    }

    fn at(hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 4, 24, hour, 0, 0).unwrap()
    }

    #[tokio::test]
    async fn test_list_events_classifies_full_day() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/calendars/primary/events")
            .match_query(Matcher::UrlEncoded("singleEvents".into(), "true".into()))
            .match_header("authorization", "Bearer test_token")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                r#"{"items": [
                    {"id": "a", "summary": "Standup",
                     "start": {"dateTime": "2025-04-24T09:00:00+02:00"},
                     "end": {"dateTime": "2025-04-24T09:30:00+02:00"},
                     "htmlLink": "https://calendar.google.com/event?eid=a"},
                    {"id": "b", "summary": "Offsite",
                     "start": {"date": "2025-04-24"}, "end": {"date": "2025-04-25"}},
                    {"id": "c", "status": "cancelled",
                     "start": {"date": "2025-04-24"}, "end": {"date": "2025-04-25"}}
                ]}"#,
            )
            .create();

        let events = calendar(&server).list_events(at(0), at(23)).await.unwrap();

        mock.assert();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].start, EventTime::DateTime(at(7)));
        assert_eq!(
            events[1].start,
            EventTime::Date(NaiveDate::from_ymd_opt(2025, 4, 24).unwrap())
        );
    }

    #[tokio::test]
    async fn test_unauthorized_is_distinguishable() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/calendars/primary/events")
            .match_query(Matcher::Any)
            .with_status(401)
            .create();

        let err = calendar(&server).list_events(at(0), at(23)).await.unwrap_err();
        assert!(matches!(err, ProviderError::Unauthorized));
    }

    #[tokio::test]
    async fn test_free_busy() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/freeBusy")
            .match_body(Matcher::PartialJson(json!({"items": [{"id": "primary"}]})))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                r#"{"calendars": {"primary": {"busy": [
                    {"start": "2025-04-24T10:00:00Z", "end": "2025-04-24T11:00:00Z"}
                ]}}}"#,
            )
            .create();

        let busy = calendar(&server).free_busy(at(0), at(23)).await.unwrap();

        mock.assert();
        assert_eq!(busy, vec![BusyInterval::new(at(10), at(11))]);
    }

    #[tokio::test]
    async fn test_free_busy_calendar_errors() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/freeBusy")
            .with_status(200)
            .with_body(r#"{"calendars": {"primary": {"errors": [{"reason": "notFound"}]}}}"#)
            .create();

        let err = calendar(&server).free_busy(at(0), at(23)).await.unwrap_err();
        assert!(matches!(err, ProviderError::Api { .. }));
    }

    #[tokio::test]
    async fn test_insert_event() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/calendars/primary/events")
            .match_body(Matcher::PartialJson(json!({
                "summary": "Intro call",
                "start": {"timeZone": "Europe/Paris"}
            })))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"id": "evt1", "htmlLink": "https://calendar.google.com/event?eid=evt1"}"#)
            .create();

        let created = calendar(&server)
            .insert_event(&NewEvent {
                summary: String::from("Intro call"),
                description: String::new(),
                location: String::new(),
                start: at(12),
                end: at(12) + chrono::Duration::minutes(30),
                timezone: String::from("Europe/Paris"),
            })
            .await
            .unwrap();

        mock.assert();
        assert_eq!(created.id, "evt1");
        assert!(created.html_link.unwrap().contains("evt1"));
    }
}

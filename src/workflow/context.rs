use chrono::DateTime;
use chrono_tz::Tz;
use serde::Deserialize;
use uuid::Uuid;

use crate::core::AppConfig;
use crate::scheduling::BusinessHours;

/// An inbound lead as received over HTTP, the webhook, the inbox job
/// or the CLI.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LeadRequest {
    pub message: String,
    /// Qualification rule, falls back to the configured one
    #[serde(default)]
    pub rule: Option<String>,
    #[serde(default)]
    pub sender: Option<String>,
    #[serde(default)]
    pub subject: Option<String>,
    #[serde(default)]
    pub thread_id: Option<String>,
    /// Per-request calendar credential that overrides the configured one
    #[serde(default)]
    pub access_token: Option<String>,
    /// Revision instructions for the reply draft
    #[serde(default)]
    pub user_feedback: Option<String>,
}

impl LeadRequest {
    pub fn new(message: &str) -> Self {
        Self {
            message: message.to_string(),
            ..Self::default()
        }
    }
}

/// Everything a single workflow run needs, passed explicitly to each
/// step. Nothing here outlives the run.
#[derive(Debug, Clone)]
pub struct RequestContext {
    pub run_id: String,
    pub lead: LeadRequest,
    pub rule: String,
    pub now: DateTime<Tz>,
    pub hours: BusinessHours,
    pub meeting_minutes: i64,
}

impl RequestContext {
    pub fn new(config: &AppConfig, lead: LeadRequest) -> Self {
        let hours = config.business_hours();
        Self::at(config, lead, hours.now())
    }

    /// Same as `new` with a fixed reference time.
    pub fn at(config: &AppConfig, lead: LeadRequest, now: DateTime<Tz>) -> Self {
        let rule = lead
            .rule
            .clone()
            .filter(|r| !r.trim().is_empty())
            .unwrap_or_else(|| config.lead_rule.clone());
        Self {
            run_id: Uuid::new_v4().to_string(),
            lead,
            rule,
            now,
            hours: config.business_hours(),
            meeting_minutes: config.meeting_minutes,
        }
    }

    pub fn subject(&self) -> &str {
        self.lead
            .subject
            .as_deref()
            .filter(|s| !s.trim().is_empty())
            .unwrap_or("your recent inquiry")
    }
}

//! The lead workflow: inbox, then calendar and CRM side by side, then
//! the reply. Steps are plain async calls over an explicit context.

mod context;
pub mod report;

use std::sync::Arc;

use serde_json::json;

use crate::ai::agents::{calendar, crm, inbox, reply};
use crate::core::AppConfig;
use crate::crm::{CrmClient, SimulatedCrm};
use crate::google::gcal::GoogleCalendar;
use crate::google::gmail::{Gmail, Mailbox};
use crate::google::oauth::TokenProvider;
use crate::openai::{LanguageModel, OpenAI};
use crate::scheduling::{CalendarProvider, InMemoryCalendar};
use crate::telemetry::{self, Telemetry, TracingTelemetry};

pub use context::{LeadRequest, RequestContext};
pub use report::WorkflowReport;

/// External collaborators for a workflow run.
#[derive(Clone)]
pub struct Services {
    pub llm: Arc<dyn LanguageModel>,
    pub calendar: Option<Arc<dyn CalendarProvider>>,
    pub crm: Arc<dyn CrmClient>,
    pub mailbox: Option<Arc<dyn Mailbox>>,
    pub telemetry: Arc<dyn Telemetry>,
    /// Used to build a calendar client from a per-request access token
    pub calendar_api_url: String,
    pub calendar_id: String,
}

impl Services {
    pub fn from_config(config: &AppConfig) -> Self {
        let token = TokenProvider::from_config(config).map(Arc::new);
        if token.is_none() {
            tracing::warn!(
                "Google credentials not set, requests need their own calendar access token"
            );
        }
        let calendar = token.clone().map(|token| {
            Arc::new(GoogleCalendar::from_config(config, token)) as Arc<dyn CalendarProvider>
        });
        let mailbox = token
            .map(|token| Arc::new(Gmail::from_config(config, token)) as Arc<dyn Mailbox>);

        Self {
            llm: Arc::new(OpenAI::from_config(config)),
            calendar,
            crm: crate::crm::from_config(config),
            mailbox,
            telemetry: telemetry::from_config(config),
            calendar_api_url: config.google_calendar_api_url.clone(),
            calendar_id: config.calendar_id.clone(),
        }
    }

    /// Real language model, in-memory calendar and simulated CRM, no
    /// mailbox. Nothing outside the process is written.
    pub fn dry_run(config: &AppConfig) -> Self {
        Self {
            llm: Arc::new(OpenAI::from_config(config)),
            calendar: Some(Arc::new(InMemoryCalendar::with_timezone(config.timezone))),
            crm: Arc::new(SimulatedCrm::default()),
            mailbox: None,
            telemetry: Arc::new(TracingTelemetry),
            calendar_api_url: config.google_calendar_api_url.clone(),
            calendar_id: config.calendar_id.clone(),
        }
    }

    pub fn with_calendar(mut self, calendar: Arc<dyn CalendarProvider>) -> Self {
        self.calendar = Some(calendar);
        self
    }

    /// A token on the request takes precedence over configured
    /// credentials.
    fn calendar_for(&self, lead: &LeadRequest) -> Option<Arc<dyn CalendarProvider>> {
        match lead.access_token.as_deref().filter(|t| !t.trim().is_empty()) {
            Some(token) => Some(Arc::new(GoogleCalendar::new(
                &self.calendar_api_url,
                &self.calendar_id,
                Arc::new(TokenProvider::Static(token.to_string())),
            ))),
            None => self.calendar.clone(),
        }
    }
}

pub async fn run_workflow(services: &Services, ctx: &RequestContext) -> WorkflowReport {
    tracing::info!(run_id = %ctx.run_id, "Starting lead workflow");
    let telemetry = services.telemetry.as_ref();
    let mut report = WorkflowReport {
        run_id: Some(ctx.run_id.clone()),
        ..WorkflowReport::default()
    };

    let inbox_report = inbox::run(services.llm.as_ref(), ctx).await;
    telemetry
        .record_event(
            "inbox_agent",
            json!({"run_id": ctx.run_id, "qualified": inbox_report.qualified}),
        )
        .await;
    report = report.merge(inbox_report);

    let calendar = services.calendar_for(&ctx.lead);
    let crm_step = crm::run(services.llm.as_ref(), services.crm.as_ref(), ctx);
    if report.qualified == Some(true) {
        let calendar_step = calendar::run(services.llm.as_ref(), calendar.as_deref(), ctx);
        let (calendar_report, crm_report) = tokio::join!(calendar_step, crm_step);
        telemetry
            .record_event(
                "calendar_agent",
                json!({
                    "run_id": ctx.run_id,
                    "meeting": calendar_report.meeting,
                    "error": calendar_report.scheduling_error,
                }),
            )
            .await;
        report = report.merge(calendar_report).merge(crm_report);
    } else {
        report = report
            .thought("[Workflow] Message is not a qualified lead, skipping scheduling");
        report = report.merge(crm_step.await);
    }
    telemetry
        .record_event(
            "crm_agent",
            json!({"run_id": ctx.run_id, "status": report.crm.as_ref().map(|r| &r.status)}),
        )
        .await;

    let reply_context = reply::ReplyContext::from_report(&report);
    let reply_report = reply::run(
        services.llm.as_ref(),
        services.mailbox.as_deref(),
        ctx,
        &reply_context,
    )
    .await;
    report = report.merge(reply_report);
    telemetry
        .record_event(
            "reply_agent",
            json!({
                "run_id": ctx.run_id,
                "draft_id": report.draft_id,
                "tokens": report.tokens,
                "errors": report.errors.len(),
            }),
        )
        .await;

    tracing::info!(
        run_id = %ctx.run_id,
        booked = report.meeting.is_some(),
        errors = report.errors.len(),
        "Lead workflow finished"
    );
    report
}

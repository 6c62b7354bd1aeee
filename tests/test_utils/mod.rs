//! Test utilities for integration tests
#![allow(dead_code)]

use std::sync::{Arc, Mutex, RwLock};

use anyhow::{Result, anyhow};
use async_trait::async_trait;
use axum::Router;
use serde_json::Value;

use leadflow::api::{AppState, app};
use leadflow::core::AppConfig;
use leadflow::crm::SimulatedCrm;
use leadflow::google::gmail::{Draft, Mailbox};
use leadflow::openai::{Completion, LanguageModel, Usage};
use leadflow::scheduling::{CalendarProvider, InMemoryCalendar};
use leadflow::telemetry::Telemetry;
use leadflow::workflow::Services;

/// Unique phrases from each prompt, used to route scripted answers
pub const CLASSIFIER: &str = "Use the following rule to decide if this is a qualified lead";
pub const EXTRACTOR: &str = "Today is";
pub const CRM_EXTRACTOR: &str = "extract key information for a CRM system";
pub const REPLY: &str = "Write a professional reply regarding";

pub const TOKENS_PER_CALL: u64 = 15;

/// A language model that answers from a script. The first rule whose
/// needle appears in the prompt wins.
#[derive(Default)]
pub struct ScriptedModel {
    rules: Vec<(String, Result<String, String>)>,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedModel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on(mut self, needle: &str, response: &str) -> Self {
        self.rules.push((needle.to_string(), Ok(response.to_string())));
        self
    }

    pub fn failing_on(mut self, needle: &str, error: &str) -> Self {
        self.rules.push((needle.to_string(), Err(error.to_string())));
        self
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }

    pub fn prompts_containing(&self, needle: &str) -> Vec<String> {
        self.prompts()
            .into_iter()
            .filter(|p| p.contains(needle))
            .collect()
    }
}

#[async_trait]
impl LanguageModel for ScriptedModel {
    async fn think(&self, prompt: &str) -> Result<Completion> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        let (_, response) = self
            .rules
            .iter()
            .find(|(needle, _)| prompt.contains(needle.as_str()))
            .ok_or_else(|| anyhow!("No scripted response for prompt: {}", prompt))?;
        match response {
            Ok(content) => Ok(Completion {
                content: content.clone(),
                usage: Usage {
                    prompt_tokens: 10,
                    completion_tokens: 5,
                    total_tokens: TOKENS_PER_CALL,
                },
            }),
            Err(e) => Err(anyhow!(e.clone())),
        }
    }
}

/// A model for a qualified lead that answers `extraction` to the
/// meeting extractor.
pub fn qualified_model(extraction: &str) -> ScriptedModel {
    ScriptedModel::new()
        .on(CLASSIFIER, "The lead asks for a meeting and mentions a budget.\nQUALIFIED: yes")
        .on(EXTRACTOR, &format!("```json\n{}\n```", extraction))
        .on(
            CRM_EXTRACTOR,
            r#"{"name": "Jane Doe", "email": "jane@acme.io", "company": "Acme", "interest": "AI project", "priority": "high"}"#,
        )
        .on(REPLY, "Hi Jane, thanks for reaching out!")
}

#[derive(Default)]
pub struct RecordingMailbox {
    drafts: Mutex<Vec<Draft>>,
}

impl RecordingMailbox {
    pub fn drafts(&self) -> Vec<Draft> {
        self.drafts.lock().unwrap().clone()
    }
}

#[async_trait]
impl Mailbox for RecordingMailbox {
    async fn create_draft(&self, draft: &Draft) -> Result<String> {
        let mut drafts = self.drafts.lock().unwrap();
        drafts.push(draft.clone());
        Ok(format!("draft-{}", drafts.len()))
    }
}

#[derive(Default)]
pub struct RecordingTelemetry {
    events: Mutex<Vec<(String, Value)>>,
}

impl RecordingTelemetry {
    pub fn names(&self) -> Vec<String> {
        self.events
            .lock()
            .unwrap()
            .iter()
            .map(|(name, _)| name.clone())
            .collect()
    }
}

#[async_trait]
impl Telemetry for RecordingTelemetry {
    async fn record_event(&self, name: &str, metadata: Value) {
        self.events
            .lock()
            .unwrap()
            .push((name.to_string(), metadata));
    }
}

pub fn test_config() -> AppConfig {
    AppConfig {
        timezone: chrono_tz::Europe::Paris,
        business_start_hour: 9,
        business_end_hour: 17,
        meeting_minutes: 30,
        lead_rule: String::from("Companies with a budget that ask for a meeting"),
        openai_api_hostname: String::from("http://localhost:1"),
        openai_api_key: String::from("test-api-key"),
        google_client_id: None,
        google_client_secret: None,
        google_refresh_token: None,
        hubspot_api_key: None,
        langfuse_public_key: None,
        langfuse_secret_key: None,
        ..AppConfig::default()
    }
}

/// Collaborators for one test, kept around so tests can inspect them.
pub struct Harness {
    pub llm: Arc<ScriptedModel>,
    pub calendar: Arc<InMemoryCalendar>,
    pub crm: Arc<SimulatedCrm>,
    pub mailbox: Arc<RecordingMailbox>,
    pub telemetry: Arc<RecordingTelemetry>,
}

impl Harness {
    pub fn new(llm: ScriptedModel) -> Self {
        Self {
            llm: Arc::new(llm),
            calendar: Arc::new(InMemoryCalendar::with_timezone(chrono_tz::Europe::Paris)),
            crm: Arc::new(SimulatedCrm::default()),
            mailbox: Arc::new(RecordingMailbox::default()),
            telemetry: Arc::new(RecordingTelemetry::default()),
        }
    }

    pub fn services(&self) -> Services {
        Services {
            llm: self.llm.clone(),
            calendar: Some(self.calendar.clone() as Arc<dyn CalendarProvider>),
            crm: self.crm.clone(),
            mailbox: Some(self.mailbox.clone() as Arc<dyn Mailbox>),
            telemetry: self.telemetry.clone(),
            calendar_api_url: String::from("http://localhost:1"),
            calendar_id: String::from("primary"),
        }
    }
}

/// Creates a test application router around `services`.
pub fn test_app(services: Services) -> Router {
    let app_state = AppState::new(test_config(), services);
    app(Arc::new(RwLock::new(app_state)))
}

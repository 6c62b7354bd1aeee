//! Public types for the webhook API
use serde::{Deserialize, Serialize};

use crate::workflow::WorkflowReport;

/// Inbound email as posted by SendGrid's inbound parse
#[derive(Debug, Deserialize)]
pub struct InboundEmail {
    #[serde(default)]
    pub from: Option<String>,
    #[serde(default)]
    pub subject: Option<String>,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub html: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct WebhookResponse {
    pub status: String,
    pub report: WorkflowReport,
}

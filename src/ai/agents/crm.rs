//! CRM agent: extracts contact details from the lead and logs them.

use serde_json::json;

use crate::ai::agents::calendar::extract_json_block;
use crate::ai::prompt::{Prompt, render};
use crate::crm::{CrmClient, LeadDetails};
use crate::google::gmail::extract_email_address;
use crate::openai::LanguageModel;
use crate::workflow::{RequestContext, WorkflowReport};

/// Parse the extractor output, tolerating fences and prose around the
/// JSON. The sender's address fills in a missing email.
pub fn parse_lead_details(response: &str, sender: Option<&str>) -> LeadDetails {
    let mut details: LeadDetails = serde_json::from_str(extract_json_block(response))
        .unwrap_or_else(|e| {
            tracing::warn!("Could not parse lead details, logging what is known: {}", e);
            LeadDetails::default()
        });
    if details.email.is_none() {
        details.email = sender.and_then(extract_email_address);
    }
    details
}

pub async fn run(
    llm: &dyn LanguageModel,
    crm: &dyn CrmClient,
    ctx: &RequestContext,
) -> WorkflowReport {
    let mut report = WorkflowReport::default()
        .thought("[CRM Agent] Analyzing lead information for CRM logging")
        .tool(crm.name());

    let prompt = match render(
        Prompt::ExtractLead,
        &json!({"message": ctx.lead.message, "sender": ctx.lead.sender}),
    ) {
        Ok(p) => p,
        Err(e) => {
            return report.error(format!("Failed to process lead for CRM: {}", e));
        }
    };

    let details = match llm.think(&prompt).await {
        Ok(completion) => {
            report = report
                .tool("LLM CRM Extractor")
                .tokens(completion.usage)
                .thought("[CRM Agent] Extracted lead information from message for CRM");
            parse_lead_details(&completion.content, ctx.lead.sender.as_deref())
        }
        Err(e) => {
            tracing::error!("CRM extraction failed: {}", e);
            report = report
                .thought("[CRM Agent] Extraction failed, logging the sender only")
                .error(format!("Failed to extract lead details: {}", e));
            parse_lead_details("", ctx.lead.sender.as_deref())
        }
    };

    match crm.log_lead(&details, &ctx.lead.message).await {
        Ok(record) => {
            report = report.thought(format!("[CRM Agent] {}", record.message));
            report.crm = Some(record);
            report
        }
        Err(e) => {
            tracing::error!("CRM logging failed: {}", e);
            let message = format!("Failed to process lead for CRM: {}", e);
            report.thought(format!("[CRM Agent] {}", message)).error(message)
        }
    }
}

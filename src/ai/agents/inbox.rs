//! Inbox agent: decides whether a message is a qualified lead.

use std::sync::LazyLock;

use regex::Regex;
use serde_json::json;

use crate::ai::prompt::{Prompt, render};
use crate::openai::LanguageModel;
use crate::workflow::{RequestContext, WorkflowReport};

static VERDICT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?im)qualified\W*:\W*(yes|no)\b").unwrap());

const NEGATIVE_PHRASES: [&str; 4] = [
    "not a qualified lead",
    "not qualified",
    "unqualified",
    "is not a lead",
];

const POSITIVE_PHRASES: [&str; 3] = ["qualified lead", "is a lead", "qualifies"];

/// Read the verdict out of the classifier's reasoning. The explicit
/// `QUALIFIED: yes|no` line wins, the last one if it appears more than
/// once. Otherwise fall back to common phrasing.
pub fn parse_qualified(thought: &str) -> bool {
    if let Some(caps) = VERDICT_RE.captures_iter(thought).last() {
        return caps[1].eq_ignore_ascii_case("yes");
    }
    let lower = thought.to_lowercase();
    if NEGATIVE_PHRASES.iter().any(|p| lower.contains(p)) {
        return false;
    }
    POSITIVE_PHRASES.iter().any(|p| lower.contains(p))
}

pub async fn run(llm: &dyn LanguageModel, ctx: &RequestContext) -> WorkflowReport {
    let report = WorkflowReport::default().tool("LLM Lead Classifier");

    let prompt = match render(
        Prompt::QualifyLead,
        &json!({"rule": ctx.rule, "message": ctx.lead.message}),
    ) {
        Ok(p) => p,
        Err(e) => return unclassified(report, e),
    };

    match llm.think(&prompt).await {
        Ok(completion) => {
            let qualified = parse_qualified(&completion.content);
            tracing::info!(run_id = %ctx.run_id, qualified, "Lead classified");
            let mut report = report
                .thought(format!("[Inbox Agent] {}", completion.content.trim()))
                .tokens(completion.usage);
            report.qualified = Some(qualified);
            report
        }
        Err(e) => unclassified(report, e),
    }
}

// A classifier outage should not drop a potential lead on the floor,
// so the message is treated as qualified.
fn unclassified(report: WorkflowReport, e: anyhow::Error) -> WorkflowReport {
    tracing::error!("Lead classification failed: {}", e);
    let mut report = report
        .thought("[Inbox Agent] Could not classify the message, treating it as a lead")
        .error(format!("Lead classification failed: {}", e));
    report.qualified = Some(true);
    report
}

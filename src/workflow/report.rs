//! The structured report a workflow run produces. Each step returns a
//! partial report and `merge` folds them together.

use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;

use crate::crm::CrmRecord;
use crate::openai::Usage;
use crate::scheduling::{AuditTrail, Booking, DateIntent, SchedulingError, SchedulingState};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TokenUsage {
    pub input: u64,
    pub output: u64,
    pub total: u64,
}

impl From<Usage> for TokenUsage {
    fn from(usage: Usage) -> Self {
        Self {
            input: usage.prompt_tokens,
            output: usage.completion_tokens,
            total: usage.total_tokens,
        }
    }
}

impl std::ops::Add for TokenUsage {
    type Output = Self;

    fn add(self, other: Self) -> Self {
        Self {
            input: self.input + other.input,
            output: self.output + other.output,
            total: self.total + other.total,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MeetingSummary {
    pub title: String,
    pub start: DateTime<Utc>,
    pub display_time: String,
    pub duration_minutes: i64,
    pub event_id: String,
    pub link: Option<String>,
    pub verified: bool,
}

impl From<&Booking> for MeetingSummary {
    fn from(booking: &Booking) -> Self {
        Self {
            title: booking.title.clone(),
            start: booking.slot.start,
            display_time: booking.display_time.clone(),
            duration_minutes: booking.slot.duration_minutes,
            event_id: booking.event_id.clone(),
            link: booking.link.clone(),
            verified: booking.slot.verified,
        }
    }
}

/// How the scheduler got to its outcome.
#[derive(Debug, Clone, Serialize)]
pub struct SchedulingSummary {
    pub intent: DateIntent,
    pub start_date: NaiveDate,
    pub dates_checked: AuditTrail,
    pub transitions: Vec<SchedulingState>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SchedulingFailure {
    pub kind: String,
    pub message: String,
}

impl From<&SchedulingError> for SchedulingFailure {
    fn from(e: &SchedulingError) -> Self {
        Self {
            kind: e.kind().to_string(),
            message: e.to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct WorkflowReport {
    pub run_id: Option<String>,
    pub thoughts: Vec<String>,
    pub tools_used: Vec<String>,
    pub errors: Vec<String>,
    pub tokens: TokenUsage,
    pub qualified: Option<bool>,
    pub meeting: Option<MeetingSummary>,
    pub scheduling: Option<SchedulingSummary>,
    pub scheduling_error: Option<SchedulingFailure>,
    pub crm: Option<CrmRecord>,
    pub reply: Option<String>,
    pub draft_id: Option<String>,
}

impl WorkflowReport {
    pub fn thought(mut self, thought: impl Into<String>) -> Self {
        self.thoughts.push(thought.into());
        self
    }

    pub fn tool(mut self, tool: impl Into<String>) -> Self {
        self.tools_used.push(tool.into());
        self
    }

    pub fn error(mut self, error: impl Into<String>) -> Self {
        self.errors.push(error.into());
        self
    }

    pub fn tokens(mut self, usage: impl Into<TokenUsage>) -> Self {
        self.tokens = self.tokens + usage.into();
        self
    }

    /// Fold `other` into `self`: lists are appended, token counts are
    /// summed and scalars set in `other` replace those in `self`.
    pub fn merge(mut self, other: WorkflowReport) -> WorkflowReport {
        self.thoughts.extend(other.thoughts);
        self.tools_used.extend(other.tools_used);
        self.errors.extend(other.errors);
        self.tokens = self.tokens + other.tokens;
        self.run_id = other.run_id.or(self.run_id);
        self.qualified = other.qualified.or(self.qualified);
        self.meeting = other.meeting.or(self.meeting);
        self.scheduling = other.scheduling.or(self.scheduling);
        self.scheduling_error = other.scheduling_error.or(self.scheduling_error);
        self.crm = other.crm.or(self.crm);
        self.reply = other.reply.or(self.reply);
        self.draft_id = other.draft_id.or(self.draft_id);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn usage(input: u64, output: u64) -> TokenUsage {
        TokenUsage {
            input,
            output,
            total: input + output,
        }
    }

    #[test]
    fn test_merge_appends_lists_and_sums_tokens() {
        let a = WorkflowReport::default()
            .thought("[Inbox Agent] looks good")
            .tool("EmailTool.read_email")
            .tokens(usage(10, 5));
        let b = WorkflowReport::default()
            .thought("[CRM Agent] logged")
            .tool("LLM CRM Extractor")
            .error("CRM down")
            .tokens(usage(7, 3));

        let merged = a.merge(b);
        assert_eq!(
            merged.thoughts,
            vec!["[Inbox Agent] looks good", "[CRM Agent] logged"]
        );
        assert_eq!(merged.tools_used.len(), 2);
        assert_eq!(merged.errors, vec!["CRM down"]);
        assert_eq!(merged.tokens, usage(17, 8));
    }

    #[test]
    fn test_merge_scalars_last_write_wins() {
        let a = WorkflowReport {
            qualified: Some(false),
            reply: Some(String::from("first")),
            ..WorkflowReport::default()
        };
        let b = WorkflowReport {
            qualified: Some(true),
            ..WorkflowReport::default()
        };

        let merged = a.merge(b);
        assert_eq!(merged.qualified, Some(true));
        // Unset scalars do not clear earlier values
        assert_eq!(merged.reply.as_deref(), Some("first"));
    }

    #[test]
    fn test_merge_with_empty_is_identity_for_lists() {
        let a = WorkflowReport::default().thought("only").tokens(usage(1, 1));
        let merged = a.clone().merge(WorkflowReport::default());
        assert_eq!(merged.thoughts, a.thoughts);
        assert_eq!(merged.tokens, a.tokens);
    }

    #[test]
    fn test_usage_conversion() {
        let tokens: TokenUsage = Usage {
            prompt_tokens: 12,
            completion_tokens: 4,
            total_tokens: 16,
        }
        .into();
        assert_eq!(tokens, usage(12, 4));
    }
}

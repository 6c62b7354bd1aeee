//! Reply agent: drafts the answer to the lead from whatever the
//! calendar step produced.

use serde_json::json;

use crate::ai::prompt::{Prompt, render};
use crate::google::gmail::{Draft, Mailbox, extract_email_address, reply_subject};
use crate::openai::LanguageModel;
use crate::workflow::report::{MeetingSummary, SchedulingFailure};
use crate::workflow::{RequestContext, WorkflowReport};

/// What the reply has to tell the lead.
#[derive(Debug, Clone, PartialEq)]
pub enum ReplyContext {
    Booked(MeetingSummary),
    SchedulingFailed(SchedulingFailure),
    NoMeeting,
}

impl ReplyContext {
    /// A booking wins over an error, both win over nothing.
    pub fn from_report(report: &WorkflowReport) -> Self {
        match (&report.meeting, &report.scheduling_error) {
            (Some(meeting), _) => ReplyContext::Booked(meeting.clone()),
            (None, Some(failure)) => ReplyContext::SchedulingFailed(failure.clone()),
            (None, None) => ReplyContext::NoMeeting,
        }
    }

    pub fn text(&self) -> String {
        match self {
            ReplyContext::Booked(meeting) => {
                let mut text = format!(
                    "I have scheduled a {}-minute {} for {}.\n\n",
                    meeting.duration_minutes, meeting.title, meeting.display_time
                );
                if let Some(link) = &meeting.link {
                    text.push_str(&format!(
                        "You can view and add this event to your calendar using this link: {}\n\n",
                        link
                    ));
                }
                text.push_str(
                    "Please let me know if this time works for you, or if you would prefer a different time.",
                );
                text
            }
            ReplyContext::SchedulingFailed(failure) => format!(
                "Unfortunately, I encountered an issue while trying to schedule the meeting: {}\n\n\
                 Could you please suggest another time or provide more details?",
                failure.message
            ),
            ReplyContext::NoMeeting => String::from(
                "I wasn't able to automatically confirm a meeting time based on our previous conversation.\n\n\
                 Could you please suggest a specific date and time that works well for you?",
            ),
        }
    }

    fn summary(&self) -> String {
        match self {
            ReplyContext::Booked(_) => String::from("Generated reply confirming scheduled meeting."),
            ReplyContext::SchedulingFailed(failure) => format!(
                "Generated reply indicating scheduling error: {}.",
                failure.message
            ),
            ReplyContext::NoMeeting => {
                String::from("Generated reply asking for scheduling clarification.")
            }
        }
    }
}

pub async fn run(
    llm: &dyn LanguageModel,
    mailbox: Option<&dyn Mailbox>,
    ctx: &RequestContext,
    reply_context: &ReplyContext,
) -> WorkflowReport {
    let mut report = WorkflowReport::default().tool("LLM Reply Generator");
    let context_text = reply_context.text();
    let feedback = ctx
        .lead
        .user_feedback
        .as_deref()
        .filter(|f| !f.trim().is_empty());

    let prompt = render(
        Prompt::DraftReply,
        &json!({
            "subject": ctx.subject(),
            "context": context_text,
            "feedback": feedback,
        }),
    );
    let reply = match prompt {
        Ok(prompt) => match llm.think(&prompt).await {
            Ok(completion) => {
                report = report.tokens(completion.usage);
                completion.content.trim().to_string()
            }
            Err(e) => {
                tracing::error!("Reply generation failed: {}", e);
                report = report.error(format!("Reply generation failed: {}", e));
                context_text.clone()
            }
        },
        Err(e) => {
            report = report.error(format!("Reply generation failed: {}", e));
            context_text.clone()
        }
    };

    let summary = match feedback {
        Some(_) => format!("Revising draft based on feedback. {}", reply_context.summary()),
        None => reply_context.summary(),
    };
    report = report.thought(format!("[Reply Agent] {}", summary));

    let recipient = ctx.lead.sender.as_deref().and_then(extract_email_address);
    if let (Some(mailbox), Some(to)) = (mailbox, recipient) {
        let draft = Draft {
            to,
            subject: reply_subject(ctx.lead.subject.as_deref().unwrap_or_default()),
            body: reply.clone(),
            thread_id: ctx.lead.thread_id.clone(),
        };
        report = report.tool("GmailTool.create_draft");
        match mailbox.create_draft(&draft).await {
            Ok(id) => {
                tracing::info!("Saved reply draft {}", id);
                report.draft_id = Some(id);
            }
            Err(e) => {
                tracing::error!("Saving reply draft failed: {}", e);
                report = report.error(format!("Saving reply draft failed: {}", e));
            }
        }
    }

    report.reply = Some(reply);
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn meeting() -> MeetingSummary {
        MeetingSummary {
            title: String::from("Demo"),
            start: Utc.with_ymd_and_hms(2025, 4, 24, 12, 0, 0).unwrap(),
            display_time: String::from("Thursday, April 24, 2025 at 02:00 PM CEST"),
            duration_minutes: 30,
            event_id: String::from("evt-1"),
            link: Some(String::from("https://calendar.example/evt-1")),
            verified: true,
        }
    }

    #[test]
    fn test_booking_wins_over_error() {
        let report = WorkflowReport {
            meeting: Some(meeting()),
            scheduling_error: Some(SchedulingFailure {
                kind: String::from("slot_conflict"),
                message: String::from("conflict"),
            }),
            ..WorkflowReport::default()
        };
        assert!(matches!(
            ReplyContext::from_report(&report),
            ReplyContext::Booked(_)
        ));
    }

    #[test]
    fn test_context_text() {
        let booked = ReplyContext::Booked(meeting()).text();
        assert!(booked.contains("30-minute Demo for Thursday, April 24, 2025 at 02:00 PM CEST"));
        assert!(booked.contains("https://calendar.example/evt-1"));

        let failed = ReplyContext::SchedulingFailed(SchedulingFailure {
            kind: String::from("search_exhausted"),
            message: String::from("No available time slot"),
        })
        .text();
        assert!(failed.contains("suggest another time"));

        assert!(ReplyContext::NoMeeting.text().contains("specific date and time"));
    }
}

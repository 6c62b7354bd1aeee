//! Reusable prompts using Handlebars for templating. Handlebars adds
//! additional security controls since it can't do much out of the box
//! without registering your own helpers. This is ideal since lead
//! messages and model output should be considered untrusted and
//! Handlebars forces you to add only what you need.

use std::fmt;

use anyhow::Result;
use handlebars::Handlebars;
use serde::Serialize;

#[derive(Debug, Clone, Copy)]
pub enum Prompt {
    QualifyLead,
    ExtractMeeting,
    ExtractLead,
    DraftReply,
}

impl fmt::Display for Prompt {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

impl From<Prompt> for String {
    fn from(item: Prompt) -> String {
        format!("{:?}", item)
    }
}

const QUALIFY_LEAD_PROMPT: &str = r"
Use the following rule to decide if this is a qualified lead:
{{rule}}

Here is the message from the lead:
{{message}}

Provide your detailed reasoning. End your answer with a single line that reads exactly `QUALIFIED: yes` or `QUALIFIED: no`.
";

const EXTRACT_MEETING_PROMPT: &str = r#"
Today is {{today}}. Tomorrow is {{tomorrow}}. Next Monday is {{next_monday}}.
All times are in the {{timezone}} timezone and business hours are {{opening}} to {{closing}}.

A customer sent the following message:

"""{{message}}"""

Please do the following:
1. Extract the date and time the customer asked for, if any. Use null when they did not give one.
2. Classify their date preference as one of: today, tomorrow, this_week, end_of_week, next_week, weekend, specific_day, specific_date, custom, none.
3. Suggest a meeting title, a short description and a location ("online" when unsure).
4. Respond with *only* the following JSON block wrapped in triple backticks.

```json
{
  "datetime": "Thursday, April 24, 2025 at 10:00 AM",
  "duration": 30,
  "title": "AI project discussion",
  "description": "Intro call about the AI project",
  "location": "online",
  "has_specific_date_request": true,
  "date_intent_type": "specific_date"
}
```
"#;

const EXTRACT_LEAD_PROMPT: &str = r#"
From the following message, extract key information for a CRM system:

{{message}}
{{#if sender}}

The message was sent from: {{sender}}
{{/if}}

Return only a JSON object with the fields "name", "email", "company", "interest", "priority". Use null if info is missing.
"#;

const DRAFT_REPLY_PROMPT: &str = r"
Write a professional reply regarding: {{subject}}

{{context}}

Assume you are a helpful assistant responding to the initial request.
Keep the tone friendly and professional. If a meeting was scheduled, confirm the details clearly. If there was an error or no time was found, explain briefly and ask for clarification or alternative times.
{{#if feedback}}

Please revise the previous draft based on this feedback: {{feedback}}
{{/if}}
";

pub fn templates<'a>() -> Handlebars<'a> {
    let mut registry = Handlebars::new();
    registry.set_strict_mode(true);
    // Prompts are plain text, not HTML
    registry.register_escape_fn(handlebars::no_escape);
    for (prompt, template) in [
        (Prompt::QualifyLead, QUALIFY_LEAD_PROMPT),
        (Prompt::ExtractMeeting, EXTRACT_MEETING_PROMPT),
        (Prompt::ExtractLead, EXTRACT_LEAD_PROMPT),
        (Prompt::DraftReply, DRAFT_REPLY_PROMPT),
    ] {
        registry
            .register_template_string(&prompt.to_string(), template)
            .expect("Failed to register template");
    }
    registry
}

/// Render `prompt` with `data`, trimming the surrounding whitespace
/// the templates carry for readability.
pub fn render<T: Serialize>(prompt: Prompt, data: &T) -> Result<String> {
    let rendered = templates().render(&prompt.to_string(), data)?;
    Ok(rendered.trim().to_string())
}

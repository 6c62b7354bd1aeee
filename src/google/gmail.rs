//! Gmail API client: reading unread leads from the inbox, saving reply
//! drafts in the lead's thread and marking processed mail as read.

use std::sync::{Arc, LazyLock};

use anyhow::{Result, bail};
use async_trait::async_trait;
use base64::{Engine as _, engine::general_purpose::URL_SAFE, engine::general_purpose::URL_SAFE_NO_PAD};
use chrono::{Duration, Utc};
use htmd::HtmlToMarkdown;
use regex::Regex;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::json;

use super::oauth::TokenProvider;
use crate::core::AppConfig;

pub const GMAIL_API_URL: &str = "https://gmail.googleapis.com/gmail/v1";

static BLANK_LINES_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\n{3,}").expect("valid regex"));
static QUOTE_HEADER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?m)^On .{5,200}wrote:\s*$").expect("valid regex")
});
static ADDRESS_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<([^<>@\s]+@[^<>\s]+)>").expect("valid regex"));

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct MessageResponse {
    pub id: String,
    #[serde(rename = "threadId")]
    pub thread_id: String,
}

#[derive(Debug, Deserialize)]
pub struct ListMessagesResponse {
    pub messages: Option<Vec<MessageResponse>>,
    #[serde(rename = "nextPageToken")]
    pub next_page_token: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub id: String,
    #[serde(rename = "threadId")]
    pub thread_id: String,
    pub snippet: Option<String>,
    pub payload: Option<MessagePayload>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessagePartBody {
    #[serde(rename = "attachmentId")]
    attachment_id: Option<String>,
    // Base64 encoded
    data: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessagePart {
    #[serde(rename = "mimeType")]
    pub mimetype: String,
    pub body: Option<MessagePartBody>,
    pub parts: Option<Vec<MessagePart>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessagePayload {
    pub headers: Option<Vec<MessageHeader>>,
    #[serde(rename = "mimeType")]
    pub mimetype: String,
    pub body: Option<MessagePartBody>,
    pub parts: Option<Vec<MessagePart>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageHeader {
    pub name: String,
    pub value: String,
}

/// The parts of an inbound email the lead workflow cares about.
#[derive(Debug, Clone, PartialEq)]
pub struct LeadEmail {
    pub id: String,
    pub thread_id: String,
    pub from: String,
    pub subject: String,
    pub body: String,
}

/// A reply draft to save in the user's mailbox.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Draft {
    pub to: String,
    pub subject: String,
    pub body: String,
    pub thread_id: Option<String>,
}

#[async_trait]
pub trait Mailbox: Send + Sync {
    /// Save `draft` and return the provider's draft id.
    async fn create_draft(&self, draft: &Draft) -> Result<String>;
}

fn decode_base64(data: &str) -> Option<String> {
    URL_SAFE
        .decode(data)
        .or_else(|_| URL_SAFE_NO_PAD.decode(data.trim_end_matches('=')))
        .ok()
        .and_then(|bytes| String::from_utf8(bytes).ok())
}

/// Convert an HTML body to markdown text for the prompts.
pub fn html_to_text(html: &str) -> String {
    let converter = HtmlToMarkdown::builder()
        .skip_tags(vec!["script", "style", "footer", "img", "svg"])
        .build();
    let markdown = match converter.convert(html) {
        Ok(markdown) => markdown,
        Err(e) => {
            tracing::warn!("Failed to convert HTML body to markdown: {}", e);
            return html.trim().to_string();
        }
    };
    let markdown = markdown.replace('\u{a0}', " ");
    BLANK_LINES_RE
        .replace_all(markdown.trim(), "\n\n")
        .to_string()
}

/// Drop quoted history from a reply so only the new text remains.
fn strip_quoted_replies(content: &str) -> String {
    let content = match QUOTE_HEADER_RE.find(content) {
        Some(m) => &content[..m.start()],
        None => content,
    };
    content
        .lines()
        .filter(|line| !line.trim_start().starts_with('>'))
        .collect::<Vec<_>>()
        .join("\n")
        .trim()
        .to_string()
}

fn part_text(mimetype: &str, body: Option<&MessagePartBody>) -> Option<String> {
    let body = body?;
    if body.attachment_id.is_some() {
        return None;
    }
    let decoded = decode_base64(body.data.as_deref()?)?;
    if decoded.trim().is_empty() {
        return None;
    }
    match mimetype {
        "text/plain" => Some(decoded),
        "text/html" => Some(html_to_text(&decoded)),
        _ => None,
    }
}

/// Depth first search for a body, preferring plain text over HTML.
fn find_text(parts: &[MessagePart], mimetype: &str) -> Option<String> {
    parts.iter().find_map(|part| {
        if part.mimetype == mimetype
            && let Some(text) = part_text(&part.mimetype, part.body.as_ref())
        {
            return Some(text);
        }
        part.parts.as_deref().and_then(|nested| find_text(nested, mimetype))
    })
}

/// Extract the readable body of a message. Multipart messages prefer
/// their plain text part, falling back to HTML and then the snippet.
pub fn extract_body(message: &Message) -> String {
    let body = message.payload.as_ref().and_then(|payload| {
        part_text(&payload.mimetype, payload.body.as_ref()).or_else(|| {
            let parts = payload.parts.as_deref()?;
            find_text(parts, "text/plain").or_else(|| find_text(parts, "text/html"))
        })
    });

    match body {
        Some(body) => strip_quoted_replies(&body),
        None => {
            tracing::warn!("Body was empty for message with ID: {}", message.id);
            message.snippet.clone().unwrap_or_default()
        }
    }
}

pub fn extract_header(message: &Message, name: &str) -> String {
    message
        .payload
        .as_ref()
        .and_then(|p| p.headers.as_ref())
        .and_then(|headers| headers.iter().find(|h| h.name.eq_ignore_ascii_case(name)))
        .map(|h| h.value.trim().to_string())
        .unwrap_or_default()
}

/// `Jane Doe <jane@example.com>` -> `jane@example.com`
pub fn extract_email_address(from: &str) -> Option<String> {
    if let Some(caps) = ADDRESS_RE.captures(from) {
        return Some(caps[1].to_string());
    }
    let trimmed = from.trim();
    if trimmed.contains('@') && !trimmed.contains(char::is_whitespace) {
        return Some(trimmed.to_string());
    }
    None
}

pub fn reply_subject(subject: &str) -> String {
    let subject = subject.trim();
    if subject.is_empty() {
        return String::from("Re: your recent inquiry");
    }
    if subject.to_lowercase().starts_with("re:") {
        return subject.to_string();
    }
    format!("Re: {}", subject)
}

impl From<&Message> for LeadEmail {
    fn from(message: &Message) -> Self {
        Self {
            id: message.id.clone(),
            thread_id: message.thread_id.clone(),
            from: extract_header(message, "from"),
            subject: extract_header(message, "subject"),
            body: extract_body(message),
        }
    }
}

fn rfc822(draft: &Draft) -> String {
    format!(
        "To: {}\r\nSubject: {}\r\nContent-Type: text/plain; charset=\"UTF-8\"\r\nMIME-Version: 1.0\r\n\r\n{}",
        draft.to, draft.subject, draft.body
    )
}

pub struct Gmail {
    client: Client,
    api_base_url: String,
    token: Arc<TokenProvider>,
}

impl Gmail {
    pub fn new(api_base_url: &str, token: Arc<TokenProvider>) -> Self {
        Self {
            client: Client::new(),
            api_base_url: api_base_url.trim_end_matches('/').to_string(),
            token,
        }
    }

    pub fn from_config(config: &AppConfig, token: Arc<TokenProvider>) -> Self {
        Self::new(&config.gmail_api_url, token)
    }

    /// Unread inbox messages received in the last `n_days`.
    pub async fn list_unread_messages(&self, n_days: i64) -> Result<Vec<MessageResponse>> {
        let access_token = self.token.access_token().await?;
        let after_date = (Utc::now() - Duration::days(n_days))
            .format("%Y/%m/%d")
            .to_string();
        let query = format!("is:unread after:{} in:inbox", after_date);
        let res = self
            .client
            .get(format!("{}/users/me/messages", self.api_base_url))
            .bearer_auth(access_token)
            .query(&[("labelIds", "UNREAD"), ("q", query.as_str())])
            .send()
            .await?;
        let status = res.status();
        let text = res.text().await.unwrap_or_default();
        if !status.is_success() {
            bail!("Unread fetch failed: {} ({})", status, text);
        }
        let msgs: ListMessagesResponse = serde_json::from_str(&text)?;
        Ok(msgs.messages.unwrap_or_default())
    }

    pub async fn fetch_message(&self, id: &str) -> Result<Message> {
        let access_token = self.token.access_token().await?;
        let res = self
            .client
            .get(format!("{}/users/me/messages/{}", self.api_base_url, id))
            .bearer_auth(access_token)
            .query(&[("format", "full")])
            .send()
            .await?;
        let status = res.status();
        let text = res.text().await.unwrap_or_default();
        if !status.is_success() {
            bail!("Message fetch failed: {} ({})", status, text);
        }
        let message: Message = serde_json::from_str(&text)?;
        Ok(message)
    }

    pub async fn mark_read(&self, id: &str) -> Result<()> {
        let access_token = self.token.access_token().await?;
        let res = self
            .client
            .post(format!("{}/users/me/messages/{}/modify", self.api_base_url, id))
            .bearer_auth(access_token)
            .json(&json!({"removeLabelIds": ["UNREAD"]}))
            .send()
            .await?;
        let status = res.status();
        if !status.is_success() {
            let text = res.text().await.unwrap_or_default();
            bail!("Marking {} read failed: {} ({})", id, status, text);
        }
        Ok(())
    }
}

#[async_trait]
impl Mailbox for Gmail {
    async fn create_draft(&self, draft: &Draft) -> Result<String> {
        let access_token = self.token.access_token().await?;
        let mut message = json!({"raw": URL_SAFE.encode(rfc822(draft).as_bytes())});
        if let Some(thread_id) = &draft.thread_id {
            message["threadId"] = json!(thread_id);
        }
        let res = self
            .client
            .post(format!("{}/users/me/drafts", self.api_base_url))
            .bearer_auth(access_token)
            .json(&json!({"message": message}))
            .send()
            .await?;
        let status = res.status();
        let text = res.text().await.unwrap_or_default();
        if !status.is_success() {
            bail!("Draft creation failed: {} ({})", status, text);
        }
        let created: serde_json::Value = serde_json::from_str(&text)?;
        let id = created["id"].as_str().unwrap_or_default().to_string();
        tracing::info!("Draft created with ID: {}", id);
        Ok(id)
    }
}

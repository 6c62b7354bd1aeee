use std::time::Duration;

use anyhow::{Result, anyhow, bail};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::core::AppConfig;

#[derive(Clone, Serialize, Deserialize, Debug, PartialEq)]
pub enum Role {
    #[serde(rename = "system")]
    System,
    #[serde(rename = "user")]
    User,
}

#[derive(Clone, Serialize, Deserialize, Debug)]
pub struct Message {
    role: Role,
    pub content: String,
}

impl Message {
    pub fn new(role: Role, content: &str) -> Self {
        Message {
            role,
            content: content.to_string(),
        }
    }
}

/// Token counts as reported by the chat completions API.
#[derive(Clone, Copy, Serialize, Deserialize, Debug, Default, PartialEq, Eq)]
pub struct Usage {
    #[serde(default)]
    pub prompt_tokens: u64,
    #[serde(default)]
    pub completion_tokens: u64,
    #[serde(default)]
    pub total_tokens: u64,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Completion {
    pub content: String,
    pub usage: Usage,
}

pub async fn completion(
    messages: &[Message],
    api_hostname: &str,
    api_key: &str,
    model: &str,
    temperature: f32,
) -> Result<Value> {
    let payload = json!({
        "model": model,
        "messages": messages,
        "temperature": temperature,
    });
    let url = format!("{}/v1/chat/completions", api_hostname.trim_end_matches("/"));
    let response = reqwest::Client::new()
        .post(url)
        .bearer_auth(api_key)
        .header("Content-Type", "application/json")
        .timeout(Duration::from_secs(60 * 2))
        .json(&payload)
        .send()
        .await?
        .json()
        .await?;

    Ok(response)
}

/// Pull the first choice and the usage block out of a completion response.
pub fn parse_completion(response: &Value) -> Result<Completion> {
    if let Some(error) = response.get("error") {
        bail!(
            "Completion failed: {}",
            error["message"].as_str().unwrap_or("unknown error")
        );
    }

    let content = response["choices"][0]["message"]["content"]
        .as_str()
        .ok_or_else(|| anyhow!("Completion response has no message content"))?
        .trim()
        .to_string();
    let usage = match response.get("usage") {
        Some(usage) => serde_json::from_value(usage.clone())?,
        None => Usage::default(),
    };

    Ok(Completion { content, usage })
}

/// A language model that answers a single prompt. Agents only ever
/// send one user message on top of the system message.
#[async_trait]
pub trait LanguageModel: Send + Sync {
    async fn think(&self, prompt: &str) -> Result<Completion>;
}

#[derive(Clone, Debug)]
pub struct OpenAI {
    api_hostname: String,
    api_key: String,
    model: String,
    system_message: String,
}

impl OpenAI {
    pub fn new(api_hostname: &str, api_key: &str, model: &str, system_message: &str) -> Self {
        Self {
            api_hostname: api_hostname.to_string(),
            api_key: api_key.to_string(),
            model: model.to_string(),
            system_message: system_message.to_string(),
        }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(
            &config.openai_api_hostname,
            &config.openai_api_key,
            &config.openai_model,
            &config.system_message,
        )
    }
}

#[async_trait]
impl LanguageModel for OpenAI {
    async fn think(&self, prompt: &str) -> Result<Completion> {
        let messages = vec![
            Message::new(Role::System, &self.system_message),
            Message::new(Role::User, prompt),
        ];
        let response = completion(
            &messages,
            &self.api_hostname,
            &self.api_key,
            &self.model,
            0.3,
        )
        .await?;
        let result = parse_completion(&response)?;
        tracing::debug!(
            "Completion used {} tokens ({} in, {} out)",
            result.usage.total_tokens,
            result.usage.prompt_tokens,
            result.usage.completion_tokens
        );
        Ok(result)
    }
}

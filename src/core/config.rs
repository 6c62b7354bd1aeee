use std::env;
use std::str::FromStr;

use chrono_tz::Tz;

use crate::scheduling::BusinessHours;

const DEFAULT_LEAD_RULE: &str = "A qualified lead is a business inquiry from a person or company \
that is interested in our services or asks to meet with us. Newsletters, spam, job applications \
and automated notifications are not leads.";

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub timezone: Tz,
    pub business_start_hour: u32,
    pub business_end_hour: u32,
    pub meeting_minutes: i64,
    pub lead_rule: String,
    pub openai_model: String,
    pub openai_api_hostname: String,
    pub openai_api_key: String,
    pub system_message: String,
    pub google_client_id: Option<String>,
    pub google_client_secret: Option<String>,
    pub google_refresh_token: Option<String>,
    pub google_token_url: String,
    pub google_calendar_api_url: String,
    pub gmail_api_url: String,
    pub calendar_id: String,
    pub hubspot_api_key: Option<String>,
    pub hubspot_api_url: String,
    pub langfuse_public_key: Option<String>,
    pub langfuse_secret_key: Option<String>,
    pub langfuse_host: String,
    pub inbox_poll_minutes: u64,
}

impl Default for AppConfig {
    fn default() -> Self {
        let timezone = env::var("LEADFLOW_TIMEZONE")
            .ok()
            .and_then(|name| match name.parse::<Tz>() {
                Ok(tz) => Some(tz),
                Err(_) => {
                    tracing::warn!("Unknown timezone {}, falling back to Europe/Paris", name);
                    None
                }
            })
            .unwrap_or(chrono_tz::Europe::Paris);
        let business_start_hour = parsed_env("LEADFLOW_BUSINESS_START_HOUR", 9);
        let business_end_hour = parsed_env("LEADFLOW_BUSINESS_END_HOUR", 17);
        let meeting_minutes = parsed_env("LEADFLOW_MEETING_MINUTES", 30);
        let lead_rule =
            env::var("LEADFLOW_LEAD_RULE").unwrap_or_else(|_| DEFAULT_LEAD_RULE.to_string());
        let openai_api_hostname = env::var("LEADFLOW_LLM_HOST")
            .unwrap_or_else(|_| "https://api.openai.com".to_string());
        let openai_api_key =
            env::var("OPENAI_API_KEY").unwrap_or_else(|_| "thiswontworkforopenai".to_string());
        let openai_model =
            env::var("LEADFLOW_LLM_MODEL").unwrap_or_else(|_| "gpt-4.1-mini".to_string());
        let system_message = env::var("LEADFLOW_SYSTEM_MESSAGE")
            .unwrap_or_else(|_| "You're a helpful assistant.".to_string());
        let google_client_id = optional_env("LEADFLOW_GOOGLE_CLIENT_ID");
        let google_client_secret = optional_env("LEADFLOW_GOOGLE_CLIENT_SECRET");
        let google_refresh_token = optional_env("LEADFLOW_GOOGLE_REFRESH_TOKEN");
        let calendar_id =
            env::var("LEADFLOW_CALENDAR_ID").unwrap_or_else(|_| "primary".to_string());
        let hubspot_api_key = optional_env("HUBSPOT_API_KEY");
        let langfuse_public_key = optional_env("LANGFUSE_PUBLIC_KEY");
        let langfuse_secret_key = optional_env("LANGFUSE_SECRET_KEY");
        let langfuse_host =
            env::var("LANGFUSE_HOST").unwrap_or_else(|_| "https://cloud.langfuse.com".to_string());
        let inbox_poll_minutes = parsed_env("LEADFLOW_INBOX_POLL_MINUTES", 15);

        Self {
            timezone,
            business_start_hour,
            business_end_hour,
            meeting_minutes,
            lead_rule,
            openai_model,
            openai_api_hostname,
            openai_api_key,
            system_message,
            google_client_id,
            google_client_secret,
            google_refresh_token,
            google_token_url: crate::google::oauth::GOOGLE_TOKEN_URL.to_string(),
            google_calendar_api_url: crate::google::gcal::GOOGLE_CALENDAR_API_URL.to_string(),
            gmail_api_url: crate::google::gmail::GMAIL_API_URL.to_string(),
            calendar_id,
            hubspot_api_key,
            hubspot_api_url: crate::crm::hubspot::HUBSPOT_API_URL.to_string(),
            langfuse_public_key,
            langfuse_secret_key,
            langfuse_host,
            inbox_poll_minutes,
        }
    }
}

impl AppConfig {
    pub fn business_hours(&self) -> BusinessHours {
        BusinessHours::new(
            self.timezone,
            self.business_start_hour,
            self.business_end_hour,
        )
    }

    /// Client id, secret and refresh token when all three are set.
    pub fn google_credentials(&self) -> Option<(String, String, String)> {
        match (
            &self.google_client_id,
            &self.google_client_secret,
            &self.google_refresh_token,
        ) {
            (Some(id), Some(secret), Some(refresh)) => {
                Some((id.clone(), secret.clone(), refresh.clone()))
            }
            _ => None,
        }
    }
}

fn optional_env(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn parsed_env<T: FromStr + Copy + std::fmt::Display>(key: &str, default: T) -> T {
    match env::var(key) {
        Ok(raw) => raw.trim().parse().unwrap_or_else(|_| {
            tracing::warn!("Invalid value {} for {}, using {}", raw, key, default);
            default
        }),
        Err(_) => default,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_business_hours_from_config() {
        let config = AppConfig {
            timezone: chrono_tz::America::New_York,
            business_start_hour: 8,
            business_end_hour: 18,
            ..AppConfig::default()
        };
        let hours = config.business_hours();
        assert_eq!(hours.timezone, chrono_tz::America::New_York);
        assert_eq!(hours.start_hour, 8);
        assert_eq!(hours.end_hour, 18);
    }

    #[test]
    fn test_google_credentials_require_all_parts() {
        let mut config = AppConfig {
            google_client_id: Some(String::from("id")),
            google_client_secret: Some(String::from("secret")),
            google_refresh_token: None,
            ..AppConfig::default()
        };
        assert!(config.google_credentials().is_none());

        config.google_refresh_token = Some(String::from("refresh"));
        assert_eq!(
            config.google_credentials(),
            Some((
                String::from("id"),
                String::from("secret"),
                String::from("refresh")
            ))
        );
    }
}

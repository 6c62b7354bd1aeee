//! Google OAuth2: authorization-code exchange for the CLI and
//! refresh-token based access tokens for the API clients.

use anyhow::{Result, anyhow, bail};
use chrono::{DateTime, Duration, Utc};
use serde::Deserialize;
use tokio::sync::Mutex;

use crate::core::AppConfig;

pub const GOOGLE_TOKEN_URL: &str = "https://oauth2.googleapis.com/token";
pub const GOOGLE_AUTH_URL: &str = "https://accounts.google.com/o/oauth2/v2/auth";

pub const SCOPES: &[&str] = &[
    "https://www.googleapis.com/auth/calendar.events",
    "https://www.googleapis.com/auth/calendar.readonly",
    "https://www.googleapis.com/auth/gmail.modify",
    "https://www.googleapis.com/auth/gmail.compose",
];

// Refresh a little early so a token never expires mid-request
const EXPIRY_MARGIN_SECS: i64 = 60;

#[derive(Debug, Clone, Deserialize)]
pub struct OAuthToken {
    pub access_token: String,
    pub expires_in: Option<i64>,
    pub refresh_token: Option<String>,
    pub scope: Option<String>,
    pub token_type: Option<String>,
}

pub fn authorization_url(client_id: &str, redirect_uri: &str) -> String {
    format!(
        "{}?client_id={}&redirect_uri={}&response_type=code&scope={}&access_type=offline&prompt=consent",
        GOOGLE_AUTH_URL,
        urlencoding::encode(client_id),
        urlencoding::encode(redirect_uri),
        urlencoding::encode(&SCOPES.join(" "))
    )
}

async fn request_token(token_url: &str, params: &[(&str, &str)]) -> Result<OAuthToken> {
    let res = reqwest::Client::new()
        .post(token_url)
        .form(params)
        .send()
        .await?;
    let status = res.status();
    let text = res.text().await.unwrap_or_default();
    if !status.is_success() {
        bail!("Token request failed: {} ({})", status, text);
    }
    let token: OAuthToken = serde_json::from_str(&text)?;
    Ok(token)
}

pub async fn exchange_code_for_token(
    token_url: &str,
    client_id: &str,
    client_secret: &str,
    code: &str,
    redirect_uri: &str,
) -> Result<OAuthToken> {
    request_token(
        token_url,
        &[
            ("code", code),
            ("client_id", client_id),
            ("client_secret", client_secret),
            ("redirect_uri", redirect_uri),
            ("grant_type", "authorization_code"),
        ],
    )
    .await
}

pub async fn refresh_access_token(
    token_url: &str,
    client_id: &str,
    client_secret: &str,
    refresh_token: &str,
) -> Result<OAuthToken> {
    request_token(
        token_url,
        &[
            ("client_id", client_id),
            ("client_secret", client_secret),
            ("refresh_token", refresh_token),
            ("grant_type", "refresh_token"),
        ],
    )
    .await
}

struct CachedToken {
    access_token: String,
    expires_at: DateTime<Utc>,
}

/// Access tokens minted from a long-lived refresh token, cached until
/// shortly before they expire.
pub struct RefreshingToken {
    token_url: String,
    client_id: String,
    client_secret: String,
    refresh_token: String,
    cached: Mutex<Option<CachedToken>>,
}

impl RefreshingToken {
    pub fn new(token_url: &str, client_id: &str, client_secret: &str, refresh_token: &str) -> Self {
        Self {
            token_url: token_url.to_string(),
            client_id: client_id.to_string(),
            client_secret: client_secret.to_string(),
            refresh_token: refresh_token.to_string(),
            cached: Mutex::new(None),
        }
    }

    async fn access_token(&self) -> Result<String> {
        // Held across the refresh so concurrent callers share one request
        let mut cached = self.cached.lock().await;
        if let Some(token) = cached.as_ref()
            && token.expires_at > Utc::now()
        {
            return Ok(token.access_token.clone());
        }

        tracing::debug!("Refreshing Google access token");
        let token = refresh_access_token(
            &self.token_url,
            &self.client_id,
            &self.client_secret,
            &self.refresh_token,
        )
        .await?;
        let expires_in = token.expires_in.unwrap_or(3600);
        *cached = Some(CachedToken {
            access_token: token.access_token.clone(),
            expires_at: Utc::now() + Duration::seconds(expires_in - EXPIRY_MARGIN_SECS),
        });
        Ok(token.access_token)
    }
}

/// Where the Google clients get their bearer token from.
pub enum TokenProvider {
    /// A token handed in by the caller, used as is
    Static(String),
    Refreshing(RefreshingToken),
}

impl TokenProvider {
    pub fn from_config(config: &AppConfig) -> Option<Self> {
        let (client_id, client_secret, refresh_token) = config.google_credentials()?;
        Some(TokenProvider::Refreshing(RefreshingToken::new(
            &config.google_token_url,
            &client_id,
            &client_secret,
            &refresh_token,
        )))
    }

    pub async fn access_token(&self) -> Result<String> {
        match self {
            TokenProvider::Static(token) if token.trim().is_empty() => {
                Err(anyhow!("Empty access token"))
            }
            TokenProvider::Static(token) => Ok(token.clone()),
            TokenProvider::Refreshing(refreshing) => refreshing.access_token().await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;

    #[test]
    fn test_authorization_url_requests_offline_access() {
        let url = authorization_url("client-123", "urn:ietf:wg:oauth:2.0:oob");
        assert!(url.starts_with(GOOGLE_AUTH_URL));
        assert!(url.contains("client_id=client-123"));
        assert!(url.contains("access_type=offline"));
        assert!(url.contains(&*urlencoding::encode(
            "https://www.googleapis.com/auth/calendar.events"
        )));
    }

    #[tokio::test]
    async fn test_exchange_code_for_token() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/token")
            .match_body(Matcher::AllOf(vec![
                Matcher::UrlEncoded("grant_type".into(), "authorization_code".into()),
                Matcher::UrlEncoded("code".into(), "the-code".into()),
            ]))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"access_token": "ya29.a", "expires_in": 3599, "refresh_token": "1//r"}"#)
            .create();

        let token = exchange_code_for_token(
            &format!("{}/token", server.url()),
            "id",
            "secret",
            "the-code",
            "urn:ietf:wg:oauth:2.0:oob",
        )
        .await
        .unwrap();

        mock.assert();
        assert_eq!(token.access_token, "ya29.a");
        assert_eq!(token.refresh_token.as_deref(), Some("1//r"));
    }

    #[tokio::test]
    async fn test_refreshing_token_is_cached() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/token")
            .match_body(Matcher::UrlEncoded(
                "grant_type".into(),
                "refresh_token".into(),
            ))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"access_token": "ya29.fresh", "expires_in": 3599}"#)
            .expect(1)
            .create();

        let provider = TokenProvider::Refreshing(RefreshingToken::new(
            &format!("{}/token", server.url()),
            "id",
            "secret",
            "1//r",
        ));
        assert_eq!(provider.access_token().await.unwrap(), "ya29.fresh");
        assert_eq!(provider.access_token().await.unwrap(), "ya29.fresh");
        mock.assert();
    }

    #[tokio::test]
    async fn test_refresh_failure_is_an_error() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/token")
            .with_status(400)
            .with_body(r#"{"error": "invalid_grant"}"#)
            .create();

        let err = refresh_access_token(&format!("{}/token", server.url()), "id", "secret", "bad")
            .await
            .unwrap_err();
        assert!(err.to_string().contains("invalid_grant"));
    }

    #[tokio::test]
    async fn test_static_token() {
        let provider = TokenProvider::Static(String::from("abc"));
        assert_eq!(provider.access_token().await.unwrap(), "abc");
        assert!(TokenProvider::Static(String::new()).access_token().await.is_err());
    }
}

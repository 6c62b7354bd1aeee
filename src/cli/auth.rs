use std::io::{self, Write};

use anyhow::{Context, Result, anyhow};

use crate::core::AppConfig;
use crate::google::oauth::{authorization_url, exchange_code_for_token};

fn prompt(message: &str) -> Result<String> {
    print!("{}", message);
    io::stdout().flush()?;
    let mut input = String::new();
    io::stdin()
        .read_line(&mut input)
        .context("Failed to read from stdin")?;
    Ok(input.trim().to_owned())
}

pub async fn run() -> Result<()> {
    let config = AppConfig::default();
    let client_id = config
        .google_client_id
        .clone()
        .context("Set LEADFLOW_GOOGLE_CLIENT_ID in your environment")?;
    let client_secret = config
        .google_client_secret
        .clone()
        .context("Set LEADFLOW_GOOGLE_CLIENT_SECRET in your environment")?;
    let redirect_uri = std::env::var("LEADFLOW_GOOGLE_REDIRECT_URI")
        .unwrap_or_else(|_| "urn:ietf:wg:oauth:2.0:oob".to_string());

    println!(
        "\nPlease open the following URL in your browser and authorize access:\n\n{}\n",
        authorization_url(&client_id, &redirect_uri)
    );
    let code = prompt("Paste the authorization code shown by Google here: ")?;

    let token = exchange_code_for_token(
        &config.google_token_url,
        &client_id,
        &client_secret,
        &code,
        &redirect_uri,
    )
    .await?;
    let refresh_token = token
        .refresh_token
        .ok_or(anyhow!("No refresh token in response"))?;

    println!("\nAdd this to your environment:\n\nLEADFLOW_GOOGLE_REFRESH_TOKEN={}", refresh_token);
    Ok(())
}

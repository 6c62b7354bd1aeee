use anyhow::Result;

use crate::core::{AppConfig, init_tracing};
use crate::workflow::{LeadRequest, RequestContext, Services, run_workflow};

pub async fn run(
    message: String,
    rule: Option<String>,
    sender: Option<String>,
    dry_run: bool,
) -> Result<()> {
    init_tracing(&format!("{}=info", env!("CARGO_CRATE_NAME")));

    let config = AppConfig::default();
    let services = if dry_run {
        tracing::info!("Dry run, using an in-memory calendar and simulated CRM");
        Services::dry_run(&config)
    } else {
        Services::from_config(&config)
    };

    let lead = LeadRequest {
        rule,
        sender,
        ..LeadRequest::new(&message)
    };
    let ctx = RequestContext::new(&config, lead);
    let report = run_workflow(&services, &ctx).await;

    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

//! Router for the webhook API

use axum::{Form, Json, Router, extract::State};

use super::public::{InboundEmail, WebhookResponse};
use crate::api::public::ApiError;
use crate::api::state::{SharedState, snapshot};
use crate::google::gmail::html_to_text;
use crate::workflow::{LeadRequest, RequestContext, run_workflow};

/// Plain text body, or the HTML body flattened to text
fn email_body(email: &InboundEmail) -> Option<String> {
    email
        .text
        .as_deref()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(String::from)
        .or_else(|| email.html.as_deref().map(html_to_text))
        .filter(|t| !t.trim().is_empty())
}

/// Handle inbound emails forwarded by the mail provider
async fn email_webhook(
    State(state): State<SharedState>,
    Form(email): Form<InboundEmail>,
) -> Result<Json<WebhookResponse>, ApiError> {
    tracing::info!(
        "Received inbound email from {:?} with subject {:?}",
        email.from,
        email.subject
    );
    let Some(message) = email_body(&email) else {
        return Err(ApiError::bad_request("Email has no body"));
    };

    let (config, services) = snapshot(&state)?;
    let lead = LeadRequest {
        sender: email.from.clone(),
        subject: email.subject.clone(),
        ..LeadRequest::new(&message)
    };
    let ctx = RequestContext::new(&config, lead);
    let report = run_workflow(&services, &ctx).await;

    Ok(Json(WebhookResponse {
        status: String::from("success"),
        report,
    }))
}

/// Create the webhook router
pub fn router() -> Router<SharedState> {
    Router::new().route("/email", axum::routing::post(email_webhook))
}

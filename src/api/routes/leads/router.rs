//! Router for the lead workflow API

use axum::{Router, extract::State, response::Json};

use crate::api::public::ApiError;
use crate::api::state::{SharedState, snapshot};
use crate::workflow::{LeadRequest, RequestContext, WorkflowReport, run_workflow};

/// Run the full workflow for one lead and return the report
async fn leads_handler(
    State(state): State<SharedState>,
    Json(lead): Json<LeadRequest>,
) -> Result<Json<WorkflowReport>, ApiError> {
    if lead.message.trim().is_empty() {
        return Err(ApiError::bad_request("Lead message is required"));
    }
    let (config, services) = snapshot(&state)?;
    let ctx = RequestContext::new(&config, lead);
    let report = run_workflow(&services, &ctx).await;
    Ok(Json(report))
}

pub fn router() -> Router<SharedState> {
    Router::new().route("/", axum::routing::post(leads_handler))
}

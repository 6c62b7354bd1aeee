//! Router for the health check

use axum::Router;

use crate::api::state::SharedState;

async fn health_handler() -> &'static str {
    "ok"
}

pub fn router() -> Router<SharedState> {
    Router::new().route("/", axum::routing::get(health_handler))
}

//! API routes module

pub mod calendar;
mod health;
mod leads;
pub mod webhook;

use axum::Router;

use crate::api::state::SharedState;

/// Create the combined API router
pub fn router() -> Router<SharedState> {
    Router::new()
        // Lead workflow
        .nest("/leads", leads::router())
        // Inbound email webhook
        .nest("/webhook", webhook::router())
        // Calendar availability
        .nest("/calendar", calendar::router())
        .nest("/health", health::router())
}

use std::sync::{Arc, RwLock};

use anyhow::{Result, anyhow};

use crate::core::AppConfig;
use crate::workflow::Services;

pub type SharedState = Arc<RwLock<AppState>>;

pub struct AppState {
    pub config: AppConfig,
    pub services: Services,
}

impl AppState {
    pub fn new(config: AppConfig, services: Services) -> Self {
        Self { config, services }
    }
}

/// Clone what a handler needs out of the lock so nothing is held
/// across an await.
pub fn snapshot(state: &SharedState) -> Result<(AppConfig, Services)> {
    let guard = state
        .read()
        .map_err(|_| anyhow!("Unable to read shared state"))?;
    Ok((guard.config.clone(), guard.services.clone()))
}

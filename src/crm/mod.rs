//! CRM logging for inbound leads.

pub mod hubspot;
mod simulated;

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::core::AppConfig;

pub use hubspot::HubSpot;
pub use simulated::SimulatedCrm;

/// Contact details extracted from a lead message. Every field is
/// optional since leads rarely state all of them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LeadDetails {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub company: Option<String>,
    #[serde(default)]
    pub interest: Option<String>,
    #[serde(default)]
    pub priority: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CrmRecord {
    pub status: String,
    pub contact_id: Option<String>,
    pub note_id: Option<String>,
    pub message: String,
    pub lead: LeadDetails,
}

#[async_trait]
pub trait CrmClient: Send + Sync {
    /// Name used in the report's `tools_used`
    fn name(&self) -> &'static str;

    async fn log_lead(&self, lead: &LeadDetails, message: &str) -> Result<CrmRecord>;
}

/// HubSpot when an API key is configured, the simulated CRM otherwise.
pub fn from_config(config: &AppConfig) -> Arc<dyn CrmClient> {
    match &config.hubspot_api_key {
        Some(key) => Arc::new(HubSpot::new(&config.hubspot_api_url, key)),
        None => {
            tracing::warn!("HUBSPOT_API_KEY not set, leads are logged to the simulated CRM");
            Arc::new(SimulatedCrm::default())
        }
    }
}

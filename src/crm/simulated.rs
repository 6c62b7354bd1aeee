use std::sync::Mutex;

use anyhow::Result;
use async_trait::async_trait;

use super::{CrmClient, CrmRecord, LeadDetails};

/// Keeps logged leads in memory. Used when no CRM is configured and
/// for dry runs.
#[derive(Default)]
pub struct SimulatedCrm {
    records: Mutex<Vec<CrmRecord>>,
}

impl SimulatedCrm {
    pub fn records(&self) -> Vec<CrmRecord> {
        self.records
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }
}

#[async_trait]
impl CrmClient for SimulatedCrm {
    fn name(&self) -> &'static str {
        "CRM Lead Logger (Simulated)"
    }

    async fn log_lead(&self, lead: &LeadDetails, _message: &str) -> Result<CrmRecord> {
        let record = CrmRecord {
            status: String::from("logged (simulated)"),
            contact_id: None,
            note_id: None,
            message: String::from("Lead information stored in CRM system (simulation)"),
            lead: lead.clone(),
        };
        self.records
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(record.clone());
        Ok(record)
    }
}

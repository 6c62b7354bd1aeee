use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;

use super::PeriodicJob;
use crate::core::AppConfig;
use crate::google::gmail::{Gmail, LeadEmail};
use crate::google::oauth::TokenProvider;
use crate::workflow::{LeadRequest, RequestContext, Services, run_workflow};

/// Runs the lead workflow for every unread inbox message, then marks
/// it read.
pub struct ProcessInbox {
    gmail: Arc<Gmail>,
    services: Services,
    every: Duration,
}

impl ProcessInbox {
    pub fn new(gmail: Arc<Gmail>, services: Services, every: Duration) -> Self {
        Self {
            gmail,
            services,
            every,
        }
    }

    /// `None` when no Google credentials are configured.
    pub fn from_config(config: &AppConfig, services: Services) -> Option<Self> {
        let token = Arc::new(TokenProvider::from_config(config)?);
        Some(Self::new(
            Arc::new(Gmail::from_config(config, token)),
            services,
            Duration::from_secs(60 * config.inbox_poll_minutes.max(1)),
        ))
    }

    /// Process unread messages from the last day, returning how many
    /// went through the workflow.
    pub async fn process(&self, config: &AppConfig) -> Result<usize> {
        let unread = self.gmail.list_unread_messages(1).await?;
        tracing::info!("Found {} unread messages", unread.len());

        let mut processed = 0;
        for item in unread {
            let message = match self.gmail.fetch_message(&item.id).await {
                Ok(m) => m,
                Err(e) => {
                    tracing::error!("Failed to fetch message {}: {}", item.id, e);
                    continue;
                }
            };
            let email = LeadEmail::from(&message);
            if email.body.trim().is_empty() {
                tracing::warn!("Skipping message {} with an empty body", email.id);
                continue;
            }

            let lead = LeadRequest {
                sender: Some(email.from.clone()).filter(|f| !f.is_empty()),
                subject: Some(email.subject.clone()).filter(|s| !s.is_empty()),
                thread_id: Some(email.thread_id.clone()),
                ..LeadRequest::new(&email.body)
            };
            let ctx = RequestContext::new(config, lead);
            let report = run_workflow(&self.services, &ctx).await;
            tracing::info!(
                "Processed message {}: qualified={:?} booked={} errors={}",
                email.id,
                report.qualified,
                report.meeting.is_some(),
                report.errors.len()
            );

            // A message that stays unread is picked up again on the next run
            if let Err(e) = self.gmail.mark_read(&email.id).await {
                tracing::error!("Failed to mark {} read: {}", email.id, e);
            }
            processed += 1;
        }
        Ok(processed)
    }
}

#[async_trait]
impl PeriodicJob for ProcessInbox {
    fn interval(&self) -> Duration {
        self.every
    }

    async fn run_job(&self, config: &AppConfig) {
        if let Err(e) = self.process(config).await {
            tracing::error!("Inbox processing failed: {}", e);
        }
    }
}

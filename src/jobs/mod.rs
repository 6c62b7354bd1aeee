//! Background jobs run on a fixed interval by the server.

mod process_inbox;

use std::time::Duration;

use async_trait::async_trait;

use crate::core::AppConfig;

pub use process_inbox::ProcessInbox;

#[async_trait]
pub trait PeriodicJob: Send + Sync + 'static {
    fn interval(&self) -> Duration;

    async fn run_job(&self, config: &AppConfig);
}

/// Run `job` now and then every `job.interval()` in its own task.
pub fn spawn_periodic_job<T: PeriodicJob>(config: AppConfig, job: T) {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(job.interval());
        loop {
            interval.tick().await;
            job.run_job(&config).await;
        }
    });
}

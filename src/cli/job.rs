use anyhow::{Result, bail};

use crate::core::{AppConfig, init_tracing};
use crate::jobs::{PeriodicJob, ProcessInbox};
use crate::workflow::Services;

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
pub enum JobId {
    ProcessInbox,
}

pub async fn run(id: JobId) -> Result<()> {
    init_tracing(&format!("{}=debug", env!("CARGO_CRATE_NAME")));

    let config = AppConfig::default();
    let job: Box<dyn PeriodicJob> = match id {
        JobId::ProcessInbox => {
            let services = Services::from_config(&config);
            match ProcessInbox::from_config(&config, services) {
                Some(job) => Box::new(job),
                None => bail!("Set the LEADFLOW_GOOGLE_* credentials to read the inbox"),
            }
        }
    };

    println!("Running job: {:?}", id);
    job.run_job(&config).await;
    println!("Job completed");

    Ok(())
}

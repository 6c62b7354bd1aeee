pub mod ai;
pub mod api;
pub mod cli;
pub mod core;
pub mod crm;
pub mod google;
pub mod jobs;
pub mod openai;
pub mod scheduling;
pub mod telemetry;
pub mod workflow;

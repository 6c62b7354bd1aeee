//! Workflow steps. Each agent takes the request context plus the
//! collaborators it needs and returns its slice of the report.

pub mod calendar;
pub mod crm;
pub mod inbox;
pub mod reply;

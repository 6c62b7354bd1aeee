use chrono::NaiveDate;

use super::provider::ProviderError;

#[derive(Debug, thiserror::Error)]
pub enum SchedulingError {
    #[error("Unable to parse scheduling suggestion: {0}")]
    ClassifierParse(String),
    #[error("Calendar provider error: {0}")]
    Provider(#[from] ProviderError),
    #[error("Time slot conflict detected for {0}")]
    SlotConflict(String),
    #[error("No available time slot found in the {days} days from {start}")]
    SearchExhausted { start: NaiveDate, days: i64 },
    #[error("Cannot proceed without calendar access credentials")]
    MissingCredentials,
}

impl SchedulingError {
    /// Stable label used in reports and telemetry.
    pub fn kind(&self) -> &'static str {
        match self {
            SchedulingError::ClassifierParse(_) => "classifier_parse_error",
            SchedulingError::Provider(_) => "provider_error",
            SchedulingError::SlotConflict(_) => "slot_conflict",
            SchedulingError::SearchExhausted { .. } => "search_exhausted",
            SchedulingError::MissingCredentials => "missing_credentials",
        }
    }
}

//! Calendar availability and slot selection.

pub mod clock;
pub mod coordinator;
pub mod error;
pub mod intent;
pub mod intervals;
pub mod memory;
pub mod models;
pub mod oracle;
pub mod provider;
pub mod slots;

pub use clock::BusinessHours;
pub use coordinator::{SchedulingCoordinator, SchedulingRequest, SchedulingRun, SchedulingState};
pub use error::SchedulingError;
pub use memory::InMemoryCalendar;
pub use models::{
    AuditTrail, Booking, BusyInterval, CalendarEvent, ChosenSlot, DateIntent, DateIntentType,
    MeetingRequest, SchedulingCandidate,
};
pub use oracle::AvailabilityOracle;
pub use provider::{CalendarProvider, ProviderError};

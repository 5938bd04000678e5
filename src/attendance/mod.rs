mod dto;
pub(crate) mod repo;
pub mod repo_types;
mod services;

pub use dto::{AttendanceSheet, BatchOutcome};
pub use repo_types::{AttendanceEntry, AttendanceStatus};
pub use services::RosterRecorder;

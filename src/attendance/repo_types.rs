use serde::{Deserialize, Serialize};
use time::{Date, OffsetDateTime};

time::serde::format_description!(iso_date, Date, "[year]-[month]-[day]");

/// Daily mark. Capitalized on the wire, matching the stored documents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AttendanceStatus {
    Present,
    Absent,
}

impl AttendanceStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AttendanceStatus::Present => "Present",
            AttendanceStatus::Absent => "Absent",
        }
    }
}

/// Attendance document as persisted under `attendance/{autoId}`. Append
/// only: entries are never updated or deleted, and repeated markings for the
/// same roll number and date all persist.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttendanceEntry {
    pub roll_number: String,
    /// Calendar date the mark applies to, no time component.
    #[serde(with = "iso_date")]
    pub date: Date,
    pub status: AttendanceStatus,
    pub marked_by: String,
    pub class: String,
    pub section: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::attendance::repo_types::AttendanceStatus;

/// One submission of marks for a class/section on a date.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttendanceSheet {
    pub class: String,
    pub section: String,
    /// Raw date input. Normalized to its first ten characters and parsed as
    /// `YYYY-MM-DD` before anything is written.
    pub date: String,
    /// Marks keyed by roll number.
    pub marks: BTreeMap<String, AttendanceStatus>,
    /// Attribution; blank falls back to "Teacher".
    #[serde(default)]
    pub marked_by: String,
}

/// Aggregate result of one batch submission. A partially failed batch is an
/// inspectable outcome for the caller to retry, never a hard error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BatchOutcome {
    pub succeeded: usize,
    /// Roll numbers whose write failed, candidates for a manual retry.
    pub failed: Vec<String>,
}

impl BatchOutcome {
    pub fn total(&self) -> usize {
        self.succeeded + self.failed.len()
    }

    pub fn all_saved(&self) -> bool {
        self.failed.is_empty()
    }
}

impl fmt::Display for BatchOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "saved {} of {}", self.succeeded, self.total())
    }
}

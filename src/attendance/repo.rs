use serde_json::Value;
use tracing::warn;
use uuid::Uuid;

use crate::attendance::repo_types::AttendanceEntry;
use crate::provider::store::{Predicate, ProfileStore, StoreError};

pub(crate) const ATTENDANCE: &str = "attendance";

fn decode_entry(doc: Value) -> Option<AttendanceEntry> {
    match serde_json::from_value(doc) {
        Ok(entry) => Some(entry),
        Err(e) => {
            warn!(error = %e, "skipping undecodable attendance document");
            None
        }
    }
}

impl AttendanceEntry {
    /// Appends the entry under a fresh auto-generated key. Entries are never
    /// keyed by (rollNumber, date), so repeat markings pile up by design.
    pub async fn create(&self, store: &dyn ProfileStore) -> Result<(), StoreError> {
        let doc =
            serde_json::to_value(self).map_err(|e| StoreError::Unavailable(e.to_string()))?;
        store
            .set(ATTENDANCE, &Uuid::new_v4().to_string(), doc)
            .await
    }
}

/// Every entry ever recorded for one roll number.
pub async fn by_roll_number(
    store: &dyn ProfileStore,
    roll_number: &str,
) -> Result<Vec<AttendanceEntry>, StoreError> {
    let docs = store
        .query(ATTENDANCE, &[Predicate::eq("rollNumber", roll_number)])
        .await?;
    Ok(docs.into_iter().filter_map(decode_entry).collect())
}

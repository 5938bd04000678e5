use serde_json::Value;
use tracing::warn;

use crate::account::repo_types::{AccountRecord, AccountStatus, Role};
use crate::provider::store::{Predicate, ProfileStore, StoreError};

pub(crate) const USERS: &str = "users";
pub(crate) const STUDENTS: &str = "students";

fn decode_record(doc: Value) -> Option<AccountRecord> {
    match serde_json::from_value(doc) {
        Ok(record) => Some(record),
        Err(e) => {
            warn!(error = %e, "skipping undecodable account document");
            None
        }
    }
}

fn decode_records(docs: Vec<Value>) -> Vec<AccountRecord> {
    docs.into_iter().filter_map(decode_record).collect()
}

fn encode_record(record: &AccountRecord) -> Result<Value, StoreError> {
    serde_json::to_value(record).map_err(|e| StoreError::Unavailable(e.to_string()))
}

impl AccountRecord {
    /// Find an account by identifier.
    pub async fn find_by_uid(
        store: &dyn ProfileStore,
        uid: &str,
    ) -> Result<Option<AccountRecord>, StoreError> {
        let doc = store.get(USERS, uid).await?;
        Ok(doc.and_then(decode_record))
    }

    /// Read the roster mirror by roll number.
    pub async fn find_student_profile(
        store: &dyn ProfileStore,
        roll_number: &str,
    ) -> Result<Option<AccountRecord>, StoreError> {
        let doc = store.get(STUDENTS, roll_number).await?;
        Ok(doc.and_then(decode_record))
    }

    /// Persist the account document; student records also get the roster
    /// mirror. The pair is one logical create: a mirror failure fails the
    /// whole call, and since both writes are upserts the caller recovers by
    /// retrying the create as a whole.
    pub async fn create(&self, store: &dyn ProfileStore) -> Result<(), StoreError> {
        let doc = encode_record(self)?;
        store.set(USERS, &self.uid, doc.clone()).await?;
        if self.role == Role::Student {
            let mirror_key = self.roll_number.as_deref().unwrap_or(&self.uid);
            if let Err(e) = store.set(STUDENTS, mirror_key, doc).await {
                warn!(
                    uid = %self.uid,
                    error = %e,
                    "roster mirror write failed after users write, retry the whole create"
                );
                return Err(e);
            }
        }
        Ok(())
    }
}

/// Teachers still waiting on an approval decision.
pub async fn pending_teachers(
    store: &dyn ProfileStore,
) -> Result<Vec<AccountRecord>, StoreError> {
    let docs = store
        .query(
            USERS,
            &[
                Predicate::eq("role", Role::Teacher.as_str()),
                Predicate::eq("status", AccountStatus::Pending.as_str()),
            ],
        )
        .await?;
    Ok(decode_records(docs))
}

/// Student accounts, optionally narrowed by class and section.
pub async fn students(
    store: &dyn ProfileStore,
    class: Option<&str>,
    section: Option<&str>,
) -> Result<Vec<AccountRecord>, StoreError> {
    let mut filters = vec![Predicate::eq("role", Role::Student.as_str())];
    if let Some(class) = class {
        filters.push(Predicate::eq("class", class));
    }
    if let Some(section) = section {
        filters.push(Predicate::eq("section", section));
    }
    let docs = store.query(USERS, &filters).await?;
    Ok(decode_records(docs))
}

/// Partial status update, last write wins. `NotFound` when no such account.
pub async fn set_status(
    store: &dyn ProfileStore,
    uid: &str,
    status: AccountStatus,
) -> Result<(), StoreError> {
    store
        .update(USERS, uid, serde_json::json!({ "status": status.as_str() }))
        .await
}

use std::sync::Arc;

use futures_util::future::join_all;
use time::format_description::FormatItem;
use time::macros::format_description;
use time::{Date, OffsetDateTime};
use tracing::{info, warn};

use crate::account::repo as account_repo;
use crate::account::repo_types::AccountRecord;
use crate::attendance::dto::{AttendanceSheet, BatchOutcome};
use crate::attendance::repo;
use crate::attendance::repo_types::AttendanceEntry;
use crate::error::{PortalError, PortalResult};
use crate::provider::store::ProfileStore;

const DEFAULT_MARKED_BY: &str = "Teacher";

const DATE_FORMAT: &[FormatItem<'static>] = format_description!("[year]-[month]-[day]");

/// Date inputs arrive as whatever the picker produced; keep the calendar
/// part and insist it parses.
fn parse_sheet_date(raw: &str) -> PortalResult<Date> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(PortalError::Validation("date is required".into()));
    }
    let head: String = trimmed.chars().take(10).collect();
    Date::parse(&head, DATE_FORMAT)
        .map_err(|_| PortalError::Validation("date must be YYYY-MM-DD".into()))
}

/// Loads class rosters and records daily marks against them. Batch writes
/// are independent best-effort creates; nothing here is transactional.
pub struct RosterRecorder {
    store: Arc<dyn ProfileStore>,
}

impl RosterRecorder {
    pub fn new(store: Arc<dyn ProfileStore>) -> Self {
        Self { store }
    }

    /// Students of one class/section. Both filters are required; a roster
    /// with no matches is a valid empty result, not an error.
    pub async fn fetch_roster(
        &self,
        class: &str,
        section: &str,
    ) -> PortalResult<Vec<AccountRecord>> {
        let class = class.trim();
        let section = section.trim();
        if class.is_empty() || section.is_empty() {
            return Err(PortalError::Validation(
                "class and section are required".into(),
            ));
        }
        Ok(account_repo::students(self.store.as_ref(), Some(class), Some(section)).await?)
    }

    /// Writes one attendance entry per mark, all dispatched concurrently.
    ///
    /// Preconditions (class/section/date present, date parseable, at least
    /// one mark) fail fast before any write. Past that point a failed write
    /// never aborts the others; the aggregate reports how many landed and
    /// which roll numbers to retry.
    pub async fn record(&self, sheet: AttendanceSheet) -> PortalResult<BatchOutcome> {
        let class = sheet.class.trim().to_string();
        let section = sheet.section.trim().to_string();
        if class.is_empty() || section.is_empty() {
            return Err(PortalError::Validation(
                "class and section are required".into(),
            ));
        }
        let date = parse_sheet_date(&sheet.date)?;
        if sheet.marks.is_empty() {
            return Err(PortalError::Validation("no marks to save".into()));
        }
        let marked_by = match sheet.marked_by.trim() {
            "" => DEFAULT_MARKED_BY.to_string(),
            name => name.to_string(),
        };
        let created_at = OffsetDateTime::now_utc();

        let writes = sheet.marks.iter().map(|(roll_number, status)| {
            let entry = AttendanceEntry {
                roll_number: roll_number.clone(),
                date,
                status: *status,
                marked_by: marked_by.clone(),
                class: class.clone(),
                section: section.clone(),
                created_at,
            };
            async move {
                match entry.create(self.store.as_ref()).await {
                    Ok(()) => Ok(()),
                    Err(e) => {
                        warn!(
                            roll_number = %entry.roll_number,
                            error = %e,
                            "attendance write failed"
                        );
                        Err(entry.roll_number)
                    }
                }
            }
        });
        let results = join_all(writes).await;

        let mut outcome = BatchOutcome {
            succeeded: 0,
            failed: Vec::new(),
        };
        for result in results {
            match result {
                Ok(()) => outcome.succeeded += 1,
                Err(roll_number) => outcome.failed.push(roll_number),
            }
        }
        info!(%outcome, class = %class, section = %section, "attendance batch finished");
        Ok(outcome)
    }

    /// A student's marks, optionally narrowed to an inclusive date range,
    /// oldest first. Range filtering happens here; the store only supports
    /// the equality lookup.
    pub async fn history(
        &self,
        roll_number: &str,
        from: Option<Date>,
        to: Option<Date>,
    ) -> PortalResult<Vec<AttendanceEntry>> {
        let roll_number = roll_number.trim();
        if roll_number.is_empty() {
            return Err(PortalError::Validation("roll number is required".into()));
        }
        let mut entries = repo::by_roll_number(self.store.as_ref(), roll_number).await?;
        entries.retain(|e| {
            from.map_or(true, |f| e.date >= f) && to.map_or(true, |t| e.date <= t)
        });
        entries.sort_by_key(|e| e.date);
        Ok(entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attendance::repo::ATTENDANCE;
    use crate::attendance::repo_types::AttendanceStatus;
    use crate::provider::memory::{FaultyStore, MemoryProfileStore};
    use serde_json::json;
    use std::collections::BTreeMap;
    use time::macros::date;

    async fn seed_student(store: &MemoryProfileStore, roll: &str, class: &str, section: &str) {
        store
            .set(
                "users",
                roll,
                json!({
                    "uid": roll,
                    "rollNumber": roll,
                    "name": format!("Student {}", roll),
                    "role": "student",
                    "status": "approved",
                    "class": class,
                    "section": section,
                    "classSection": format!("{}-{}", class, section),
                }),
            )
            .await
            .unwrap();
    }

    fn sheet(date: &str, marks: &[(&str, AttendanceStatus)]) -> AttendanceSheet {
        AttendanceSheet {
            class: "10".into(),
            section: "A".into(),
            date: date.into(),
            marks: marks
                .iter()
                .map(|(roll, status)| (roll.to_string(), *status))
                .collect::<BTreeMap<_, _>>(),
            marked_by: String::new(),
        }
    }

    #[tokio::test]
    async fn roster_requires_both_filters() {
        let recorder = RosterRecorder::new(Arc::new(MemoryProfileStore::new()));
        assert!(matches!(
            recorder.fetch_roster("", "A").await.unwrap_err(),
            PortalError::Validation(_)
        ));
        assert!(matches!(
            recorder.fetch_roster("10", "  ").await.unwrap_err(),
            PortalError::Validation(_)
        ));
    }

    #[tokio::test]
    async fn empty_roster_is_a_valid_result() {
        let recorder = RosterRecorder::new(Arc::new(MemoryProfileStore::new()));
        let roster = recorder.fetch_roster("10", "A").await.unwrap();
        assert!(roster.is_empty());
    }

    #[tokio::test]
    async fn roster_matches_class_and_section() {
        let store = Arc::new(MemoryProfileStore::new());
        seed_student(&store, "101", "10", "A").await;
        seed_student(&store, "102", "10", "B").await;
        seed_student(&store, "103", "9", "A").await;

        let recorder = RosterRecorder::new(store);
        let roster = recorder.fetch_roster("10", "A").await.unwrap();
        assert_eq!(roster.len(), 1);
        assert_eq!(roster[0].roll_number.as_deref(), Some("101"));
    }

    #[tokio::test]
    async fn batch_writes_one_entry_per_mark_with_stored_field_names() {
        let store = Arc::new(MemoryProfileStore::new());
        let recorder = RosterRecorder::new(store.clone());

        let outcome = recorder
            .record(sheet(
                "2024-01-15",
                &[
                    ("101", AttendanceStatus::Present),
                    ("102", AttendanceStatus::Absent),
                ],
            ))
            .await
            .unwrap();
        assert_eq!(outcome.succeeded, 2);
        assert!(outcome.all_saved());

        let docs = store.query(ATTENDANCE, &[]).await.unwrap();
        assert_eq!(docs.len(), 2);
        for doc in &docs {
            assert_eq!(doc["date"], "2024-01-15");
            assert_eq!(doc["class"], "10");
            assert_eq!(doc["section"], "A");
            assert_eq!(doc["markedBy"], "Teacher");
            assert!(doc["createdAt"].is_string());
        }
        let statuses: Vec<_> = docs
            .iter()
            .map(|d| (d["rollNumber"].as_str().unwrap(), d["status"].as_str().unwrap()))
            .collect();
        assert!(statuses.contains(&("101", "Present")));
        assert!(statuses.contains(&("102", "Absent")));
    }

    #[tokio::test]
    async fn partial_failure_reports_failed_rolls_and_keeps_the_rest() {
        let faulty = Arc::new(FaultyStore::new(MemoryProfileStore::new()));
        faulty.fail_writes_matching("rollNumber", "102").await;
        let recorder = RosterRecorder::new(faulty.clone());

        let outcome = recorder
            .record(sheet(
                "2024-01-15",
                &[
                    ("101", AttendanceStatus::Present),
                    ("102", AttendanceStatus::Absent),
                ],
            ))
            .await
            .unwrap();
        assert_eq!(outcome.succeeded, 1);
        assert_eq!(outcome.failed, vec!["102".to_string()]);
        assert_eq!(outcome.to_string(), "saved 1 of 2");

        let kept = recorder.history("101", None, None).await.unwrap();
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].status, AttendanceStatus::Present);
        assert!(recorder.history("102", None, None).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn preconditions_fail_fast_before_any_write() {
        let store = Arc::new(MemoryProfileStore::new());
        let recorder = RosterRecorder::new(store.clone());
        let marks = &[("101", AttendanceStatus::Present)];

        assert!(matches!(
            recorder.record(sheet("", marks)).await.unwrap_err(),
            PortalError::Validation(_)
        ));
        assert!(matches!(
            recorder.record(sheet("Jan 15 2024", marks)).await.unwrap_err(),
            PortalError::Validation(_)
        ));
        assert!(matches!(
            recorder.record(sheet("2024-01-15", &[])).await.unwrap_err(),
            PortalError::Validation(_)
        ));
        let mut missing_class = sheet("2024-01-15", marks);
        missing_class.class = "  ".into();
        assert!(matches!(
            recorder.record(missing_class).await.unwrap_err(),
            PortalError::Validation(_)
        ));

        assert!(store.query(ATTENDANCE, &[]).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn date_input_is_normalized_to_its_calendar_part() {
        let store = Arc::new(MemoryProfileStore::new());
        let recorder = RosterRecorder::new(store.clone());

        recorder
            .record(sheet(
                "2024-01-15T08:30:00.000Z",
                &[("101", AttendanceStatus::Present)],
            ))
            .await
            .unwrap();

        let docs = store.query(ATTENDANCE, &[]).await.unwrap();
        assert_eq!(docs[0]["date"], "2024-01-15");
    }

    #[tokio::test]
    async fn repeat_markings_for_the_same_day_all_persist() {
        let recorder = RosterRecorder::new(Arc::new(MemoryProfileStore::new()));
        let marks = &[("101", AttendanceStatus::Present)];

        recorder.record(sheet("2024-01-15", marks)).await.unwrap();
        recorder.record(sheet("2024-01-15", marks)).await.unwrap();

        let entries = recorder.history("101", None, None).await.unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].date, entries[1].date);
    }

    #[tokio::test]
    async fn history_applies_an_inclusive_date_range() {
        let recorder = RosterRecorder::new(Arc::new(MemoryProfileStore::new()));
        for day in ["2024-01-10", "2024-01-15", "2024-01-20"] {
            recorder
                .record(sheet(day, &[("101", AttendanceStatus::Present)]))
                .await
                .unwrap();
        }

        let all = recorder.history("101", None, None).await.unwrap();
        assert_eq!(all.len(), 3);
        assert!(all.windows(2).all(|w| w[0].date <= w[1].date));

        let ranged = recorder
            .history(
                "101",
                Some(date!(2024 - 01 - 10)),
                Some(date!(2024 - 01 - 15)),
            )
            .await
            .unwrap();
        assert_eq!(ranged.len(), 2);
        assert_eq!(ranged[0].date, date!(2024 - 01 - 10));
        assert_eq!(ranged[1].date, date!(2024 - 01 - 15));

        let open_start = recorder
            .history("101", None, Some(date!(2024 - 01 - 10)))
            .await
            .unwrap();
        assert_eq!(open_start.len(), 1);
    }

    #[tokio::test]
    async fn attribution_defaults_to_teacher_and_keeps_names() {
        let store = Arc::new(MemoryProfileStore::new());
        let recorder = RosterRecorder::new(store.clone());

        let mut named = sheet("2024-01-15", &[("101", AttendanceStatus::Present)]);
        named.marked_by = "Ms. Rao".into();
        recorder.record(named).await.unwrap();

        let entries = recorder.history("101", None, None).await.unwrap();
        assert_eq!(entries[0].marked_by, "Ms. Rao");
    }
}

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, NaiveDate, Utc};
use futures::future::join_all;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::model::attendance::{AuditAction, AuditEntry};
use crate::model::employee::AttendanceMode;
use crate::model::sync::{SyncIssue, SyncRun};
use crate::repo::attendance::AttendanceStore;
use crate::repo::employee::EmployeeDirectory;
use crate::sync::client::{TimesheetProvider, WorkSession};
use crate::utils::timezone;

/// Orchestrates one sync run for one target date: fetch the provider summary
/// for the display-day window, resolve each external user, and upsert one
/// record per (employee, date).
pub struct Reconciler {
    provider: Arc<dyn TimesheetProvider>,
    directory: Arc<dyn EmployeeDirectory>,
    store: Arc<dyn AttendanceStore>,
}

/// Per-user reduction of a day's sessions: earliest start, latest end.
/// Gaps between disjoint sessions are deliberately absorbed (first-punch /
/// last-punch semantics).
struct DaySpan {
    start: DateTime<Utc>,
    end: Option<DateTime<Utc>>,
}

enum Outcome {
    Synced,
    SkippedManual,
    Failed(SyncIssue),
}

impl Reconciler {
    pub fn new(
        provider: Arc<dyn TimesheetProvider>,
        directory: Arc<dyn EmployeeDirectory>,
        store: Arc<dyn AttendanceStore>,
    ) -> Self {
        Self {
            provider,
            directory,
            store,
        }
    }

    /// Partial failures are collected into the returned summary; only a
    /// provider outage aborts, and it does so before any write.
    pub async fn run(&self, date: NaiveDate) -> SyncRun {
        let run_id = Uuid::new_v4().to_string();
        let (from, to) = timezone::display_day_bounds(date);

        let sessions = match self.provider.fetch_summary(from, to).await {
            Ok(sessions) => sessions,
            Err(e) => {
                warn!(run_id = %run_id, date = %date, error = %e, "Sync aborted, no writes performed");
                return SyncRun {
                    run_id,
                    date,
                    total_external_users: 0,
                    synced_count: 0,
                    skipped_manual: 0,
                    error_count: 1,
                    errors: vec![SyncIssue::provider(e.to_string())],
                };
            }
        };

        let reported: i64 = sessions.iter().map(|s| s.total_seconds).sum();
        let spans = reduce_sessions(sessions);
        let total_external_users = spans.len();
        debug!(run_id = %run_id, date = %date, users = total_external_users, reported_seconds = reported, "Provider summary fetched");

        // Each upsert touches a disjoint (employee, date) key, so per-user
        // work can run concurrently.
        let outcomes = join_all(
            spans
                .into_iter()
                .map(|(external_user_id, span)| self.sync_user(date, external_user_id, span)),
        )
        .await;

        let mut synced_count = 0;
        let mut skipped_manual = 0;
        let mut errors = Vec::new();
        for outcome in outcomes {
            match outcome {
                Outcome::Synced => synced_count += 1,
                Outcome::SkippedManual => skipped_manual += 1,
                Outcome::Failed(issue) => errors.push(issue),
            }
        }

        info!(
            run_id = %run_id,
            date = %date,
            total = total_external_users,
            synced = synced_count,
            skipped = skipped_manual,
            errors = errors.len(),
            "Sync run finished"
        );

        SyncRun {
            run_id,
            date,
            total_external_users,
            synced_count,
            skipped_manual,
            error_count: errors.len(),
            errors,
        }
    }

    async fn sync_user(&self, date: NaiveDate, external_user_id: String, span: DaySpan) -> Outcome {
        let mapping = match self.directory.resolve(&external_user_id).await {
            Ok(Some(mapping)) => mapping,
            Ok(None) => {
                warn!(user = %external_user_id, date = %date, "No employee mapping, user skipped");
                return Outcome::Failed(SyncIssue::mapping(external_user_id));
            }
            Err(e) => return Outcome::Failed(SyncIssue::store(external_user_id, e.to_string())),
        };

        // Manual-mode employees own their records; sync never touches them.
        if mapping.attendance_mode == AttendanceMode::Manual {
            return Outcome::SkippedManual;
        }

        let start_dt = span.start.naive_utc();
        let end_dt = span.end.map(|end| end.naive_utc());
        let total_seconds = span.end.map(|end| (end - span.start).num_seconds());

        let mut audit = vec![AuditEntry {
            action: AuditAction::TimeIn,
            time: start_dt,
            created_by: None,
        }];
        if let Some(end) = end_dt {
            audit.push(AuditEntry {
                action: AuditAction::TimeOut,
                time: end,
                created_by: None,
            });
        }

        match self
            .store
            .upsert_synced(
                mapping.employee_id,
                date,
                start_dt.time(),
                end_dt.map(|end| end.time()),
                total_seconds,
                audit,
            )
            .await
        {
            Ok(()) => Outcome::Synced,
            Err(e) => {
                warn!(user = %external_user_id, date = %date, error = %e, "Upsert failed");
                Outcome::Failed(SyncIssue::store(external_user_id, e.to_string()))
            }
        }
    }
}

/// Collapse a user's sessions to min(start)/max(end). A session without an
/// end never contributes one; a user with no ended session stays open.
fn reduce_sessions(sessions: Vec<WorkSession>) -> HashMap<String, DaySpan> {
    let mut spans: HashMap<String, DaySpan> = HashMap::new();
    for session in sessions {
        match spans.get_mut(&session.external_user_id) {
            Some(span) => {
                if session.start < span.start {
                    span.start = session.start;
                }
                if let Some(end) = session.end {
                    span.end = Some(span.end.map_or(end, |current| current.max(end)));
                }
            }
            None => {
                spans.insert(
                    session.external_user_id,
                    DaySpan {
                        start: session.start,
                        end: session.end,
                    },
                );
            }
        }
    }
    spans
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::attendance::AttendanceSource;
    use crate::model::sync::SyncIssueKind;
    use crate::testutil::{MemDirectory, MemStore, ScriptedProvider, employee, session};
    use chrono::{NaiveTime, Timelike};

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 11, 18).unwrap()
    }

    fn harness(
        provider: ScriptedProvider,
        directory: MemDirectory,
    ) -> (Reconciler, Arc<MemStore>) {
        let store = Arc::new(MemStore::default());
        let reconciler = Reconciler::new(Arc::new(provider), Arc::new(directory), store.clone());
        (reconciler, store)
    }

    #[actix_web::test]
    async fn synced_record_matches_provider_summary() {
        let provider = ScriptedProvider::ok(vec![session(
            "ext-57",
            "2025-11-18T05:59:30Z",
            Some("2025-11-18T07:39:00Z"),
        )]);
        let directory = MemDirectory::new(vec![employee(57, "ext-57", AttendanceMode::Automatic)]);
        let (reconciler, store) = harness(provider, directory);

        let run = reconciler.run(date()).await;
        assert_eq!(run.synced_count, 1);
        assert_eq!(run.error_count, 0);

        let record = store.find(57, date()).await.unwrap().unwrap();
        assert_eq!(record.start_time, NaiveTime::from_hms_opt(5, 59, 30));
        assert_eq!(record.end_time, NaiveTime::from_hms_opt(7, 39, 0));
        assert_eq!(record.total_seconds, Some(5970));
        assert_eq!(record.source, AttendanceSource::TimeDoctor);
        assert_eq!(record.derived_total(), record.total_seconds);
        assert_eq!(record.audit_trail.len(), 2);

        // Display rendering of the same record: 11:29:30 - 13:09:00.
        let shown = timezone::utc_to_display(record.start_time.unwrap(), record.date);
        assert_eq!((shown.hour(), shown.minute(), shown.second()), (11, 29, 30));
        let shown = timezone::utc_to_display(record.end_time.unwrap(), record.date);
        assert_eq!((shown.hour(), shown.minute(), shown.second()), (13, 9, 0));
    }

    #[actix_web::test]
    async fn rerun_with_unchanged_data_is_idempotent() {
        let sessions = vec![session(
            "ext-57",
            "2025-11-18T05:59:30Z",
            Some("2025-11-18T07:39:00Z"),
        )];
        let provider = ScriptedProvider::ok(sessions.clone());
        let directory = MemDirectory::new(vec![employee(57, "ext-57", AttendanceMode::Automatic)]);
        let (reconciler, store) = harness(provider, directory);

        reconciler.run(date()).await;
        let first = store.find(57, date()).await.unwrap().unwrap();

        reconciler.run(date()).await;
        let second = store.find(57, date()).await.unwrap().unwrap();

        // No duplicate audit entries, no drift in totals.
        assert_eq!(first, second);
    }

    #[actix_web::test]
    async fn manual_mode_employees_are_never_touched() {
        let provider = ScriptedProvider::ok(vec![session(
            "ext-12",
            "2025-11-18T04:00:00Z",
            Some("2025-11-18T10:00:00Z"),
        )]);
        let directory = MemDirectory::new(vec![employee(12, "ext-12", AttendanceMode::Manual)]);
        let (reconciler, store) = harness(provider, directory);

        // Pre-existing manual record for the same day.
        let noon = NaiveTime::from_hms_opt(3, 30, 0).unwrap();
        let at = date().and_time(noon);
        store
            .record_time_in(12, date(), noon, at, Some("HQ".into()), Some(99))
            .await
            .unwrap();
        let before = store.find(12, date()).await.unwrap().unwrap();

        let run = reconciler.run(date()).await;
        assert_eq!(run.synced_count, 0);
        assert_eq!(run.skipped_manual, 1);
        assert_eq!(run.error_count, 0);

        let after = store.find(12, date()).await.unwrap().unwrap();
        assert_eq!(before, after);
        assert_eq!(after.source, AttendanceSource::Manual);
    }

    #[actix_web::test]
    async fn missing_mapping_is_counted_and_run_continues() {
        let provider = ScriptedProvider::ok(vec![
            session("ext-57", "2025-11-18T05:00:00Z", Some("2025-11-18T09:00:00Z")),
            session("ext-999", "2025-11-18T05:00:00Z", Some("2025-11-18T09:00:00Z")),
        ]);
        let directory = MemDirectory::new(vec![employee(57, "ext-57", AttendanceMode::Automatic)]);
        let (reconciler, store) = harness(provider, directory);

        let run = reconciler.run(date()).await;
        assert_eq!(run.total_external_users, 2);
        assert_eq!(run.synced_count, 1);
        assert_eq!(run.error_count, 1);
        assert_eq!(run.errors[0].kind, SyncIssueKind::MappingNotFound);
        assert_eq!(run.errors[0].external_user_id.as_deref(), Some("ext-999"));

        assert!(store.find(57, date()).await.unwrap().is_some());
    }

    #[actix_web::test]
    async fn provider_outage_leaves_existing_records_untouched() {
        let provider = ScriptedProvider::unavailable("connect timeout");
        let directory = MemDirectory::new(vec![employee(57, "ext-57", AttendanceMode::Automatic)]);
        let (reconciler, store) = harness(provider, directory);

        let start = NaiveTime::from_hms_opt(5, 0, 0).unwrap();
        store
            .record_time_in(57, date(), start, date().and_time(start), None, None)
            .await
            .unwrap();
        let before = store.find(57, date()).await.unwrap().unwrap();

        let run = reconciler.run(date()).await;
        assert_eq!(run.synced_count, 0);
        assert_eq!(run.error_count, 1);
        assert_eq!(run.errors[0].kind, SyncIssueKind::ProviderUnavailable);

        let after = store.find(57, date()).await.unwrap().unwrap();
        assert_eq!(before, after);
    }

    #[actix_web::test]
    async fn disjoint_sessions_collapse_to_first_and_last_punch() {
        let provider = ScriptedProvider::ok(vec![
            session("ext-57", "2025-11-18T08:00:00Z", Some("2025-11-18T09:00:00Z")),
            session("ext-57", "2025-11-18T03:30:00Z", Some("2025-11-18T05:00:00Z")),
            session("ext-57", "2025-11-18T11:00:00Z", Some("2025-11-18T12:15:00Z")),
        ]);
        let directory = MemDirectory::new(vec![employee(57, "ext-57", AttendanceMode::Automatic)]);
        let (reconciler, store) = harness(provider, directory);

        let run = reconciler.run(date()).await;
        assert_eq!(run.total_external_users, 1);
        assert_eq!(run.synced_count, 1);

        let record = store.find(57, date()).await.unwrap().unwrap();
        assert_eq!(record.start_time, NaiveTime::from_hms_opt(3, 30, 0));
        assert_eq!(record.end_time, NaiveTime::from_hms_opt(12, 15, 0));
        // The gap between sessions is absorbed into the reported interval.
        assert_eq!(record.total_seconds, Some(8 * 3600 + 45 * 60));
    }

    #[actix_web::test]
    async fn open_session_syncs_start_only() {
        let provider =
            ScriptedProvider::ok(vec![session("ext-57", "2025-11-18T05:59:30Z", None)]);
        let directory = MemDirectory::new(vec![employee(57, "ext-57", AttendanceMode::Automatic)]);
        let (reconciler, store) = harness(provider, directory);

        let run = reconciler.run(date()).await;
        assert_eq!(run.synced_count, 1);

        let record = store.find(57, date()).await.unwrap().unwrap();
        assert!(record.is_open());
        assert_eq!(record.end_time, None);
        assert_eq!(record.total_seconds, None);
        assert_eq!(record.audit_trail.len(), 1);
        assert_eq!(record.audit_trail[0].action, AuditAction::TimeIn);
    }
}

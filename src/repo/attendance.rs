use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use futures_util::StreamExt;
use sqlx::MySqlPool;
use sqlx::types::Json;
use tracing::error;

use crate::errors::AttendanceError;
use crate::model::attendance::{
    AttendanceRecord, AttendanceRow, AttendanceSource, AuditAction, AuditEntry, audit_is_ordered,
};
use crate::utils::timezone;

/// Persistence seam for attendance rows. One row per (employee_id, date);
/// every implementation must keep writes for a single key serialized.
#[async_trait]
pub trait AttendanceStore: Send + Sync {
    async fn find(
        &self,
        employee_id: u64,
        date: NaiveDate,
    ) -> Result<Option<AttendanceRecord>, AttendanceError>;

    /// Idempotent provider upsert: replaces start/end/total and the whole
    /// audit trail for the (employee, date) key.
    async fn upsert_synced(
        &self,
        employee_id: u64,
        date: NaiveDate,
        start: NaiveTime,
        end: Option<NaiveTime>,
        total_seconds: Option<i64>,
        audit: Vec<AuditEntry>,
    ) -> Result<(), AttendanceError>;

    async fn record_time_in(
        &self,
        employee_id: u64,
        date: NaiveDate,
        time: NaiveTime,
        at: NaiveDateTime,
        location: Option<String>,
        created_by: Option<u64>,
    ) -> Result<AttendanceRecord, AttendanceError>;

    async fn record_time_out(
        &self,
        employee_id: u64,
        date: NaiveDate,
        time: NaiveTime,
        at: NaiveDateTime,
        created_by: Option<u64>,
    ) -> Result<AttendanceRecord, AttendanceError>;

    async fn list_range(
        &self,
        employee_ids: &[u64],
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<AttendanceRecord>, AttendanceError>;
}

/// Close the open session for an employee "now".
///
/// Today is evaluated in the display zone. A session that started shortly
/// before local midnight is still open under yesterday's date and keeps the
/// Time-In's calendar date; the fallback only fires when the clock has
/// actually wrapped (display-now earlier than the display start), so a stale
/// open record from a full day ago still reports `NotTimedIn`.
pub async fn manual_time_out(
    store: &dyn AttendanceStore,
    employee_id: u64,
    now: DateTime<Utc>,
    created_by: Option<u64>,
) -> Result<AttendanceRecord, AttendanceError> {
    let today = timezone::display_today(now);
    let time = now.time();
    let at = now.naive_utc();

    match store
        .record_time_out(employee_id, today, time, at, created_by)
        .await
    {
        Err(AttendanceError::NotTimedIn { .. }) => {
            let yesterday = today
                .pred_opt()
                .ok_or_else(|| AttendanceError::CorruptRecord("date underflow".into()))?;

            let now_display = timezone::utc_to_display(time, today);
            let crossed_midnight = store
                .find(employee_id, yesterday)
                .await?
                .filter(|record| record.is_open())
                .and_then(|record| record.start_time)
                .map(|start| timezone::utc_to_display(start, yesterday))
                .is_some_and(|start_display| now_display < start_display);

            if crossed_midnight {
                store
                    .record_time_out(employee_id, yesterday, time, at, created_by)
                    .await
            } else {
                Err(AttendanceError::NotTimedIn { employee_id })
            }
        }
        other => other,
    }
}

const SELECT_COLUMNS: &str = "id, employee_id, date, start_time, end_time, total_seconds, source, location, audit_trail";

pub struct SqlAttendanceRepo {
    pool: MySqlPool,
}

impl SqlAttendanceRepo {
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AttendanceStore for SqlAttendanceRepo {
    async fn find(
        &self,
        employee_id: u64,
        date: NaiveDate,
    ) -> Result<Option<AttendanceRecord>, AttendanceError> {
        let sql = format!("SELECT {SELECT_COLUMNS} FROM attendance WHERE employee_id = ? AND date = ?");
        let row = sqlx::query_as::<_, AttendanceRow>(&sql)
            .bind(employee_id)
            .bind(date)
            .fetch_optional(&self.pool)
            .await?;
        row.map(AttendanceRow::decode).transpose()
    }

    async fn upsert_synced(
        &self,
        employee_id: u64,
        date: NaiveDate,
        start: NaiveTime,
        end: Option<NaiveTime>,
        total_seconds: Option<i64>,
        audit: Vec<AuditEntry>,
    ) -> Result<(), AttendanceError> {
        sqlx::query(
            r#"
            INSERT INTO attendance
            (employee_id, date, start_time, end_time, total_seconds, source, location, audit_trail)
            VALUES (?, ?, ?, ?, ?, ?, NULL, ?)
            ON DUPLICATE KEY UPDATE
                start_time = VALUES(start_time),
                end_time = VALUES(end_time),
                total_seconds = VALUES(total_seconds),
                source = VALUES(source),
                audit_trail = VALUES(audit_trail)
            "#,
        )
        .bind(employee_id)
        .bind(date)
        .bind(start)
        .bind(end)
        .bind(total_seconds)
        .bind(AttendanceSource::TimeDoctor.to_string())
        .bind(Json(&audit))
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn record_time_in(
        &self,
        employee_id: u64,
        date: NaiveDate,
        time: NaiveTime,
        at: NaiveDateTime,
        location: Option<String>,
        created_by: Option<u64>,
    ) -> Result<AttendanceRecord, AttendanceError> {
        let mut tx = self.pool.begin().await?;

        // Row lock on the natural key; a racing sync or second time-in waits
        // here and then sees the row.
        let existing = sqlx::query_scalar::<_, u64>(
            "SELECT id FROM attendance WHERE employee_id = ? AND date = ? FOR UPDATE",
        )
        .bind(employee_id)
        .bind(date)
        .fetch_optional(&mut *tx)
        .await?;

        if existing.is_some() {
            return Err(AttendanceError::AlreadyTimedIn { employee_id, date });
        }

        let audit = vec![AuditEntry {
            action: AuditAction::TimeIn,
            time: at,
            created_by,
        }];

        let result = sqlx::query(
            r#"
            INSERT INTO attendance
            (employee_id, date, start_time, end_time, total_seconds, source, location, audit_trail)
            VALUES (?, ?, ?, NULL, NULL, ?, ?, ?)
            "#,
        )
        .bind(employee_id)
        .bind(date)
        .bind(time)
        .bind(AttendanceSource::Manual.to_string())
        .bind(&location)
        .bind(Json(&audit))
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(AttendanceRecord {
            id: result.last_insert_id(),
            employee_id,
            date,
            start_time: Some(time),
            end_time: None,
            total_seconds: None,
            source: AttendanceSource::Manual,
            location,
            audit_trail: audit,
        })
    }

    async fn record_time_out(
        &self,
        employee_id: u64,
        date: NaiveDate,
        time: NaiveTime,
        at: NaiveDateTime,
        created_by: Option<u64>,
    ) -> Result<AttendanceRecord, AttendanceError> {
        let mut tx = self.pool.begin().await?;

        let sql = format!(
            "SELECT {SELECT_COLUMNS} FROM attendance \
             WHERE employee_id = ? AND date = ? AND start_time IS NOT NULL AND end_time IS NULL \
             FOR UPDATE"
        );
        let row = sqlx::query_as::<_, AttendanceRow>(&sql)
            .bind(employee_id)
            .bind(date)
            .fetch_optional(&mut *tx)
            .await?;

        let Some(row) = row else {
            return Err(AttendanceError::NotTimedIn { employee_id });
        };
        let mut record = row.decode()?;
        let Some(start) = record.start_time else {
            return Err(AttendanceError::CorruptRecord("open record without start".into()));
        };

        let total = timezone::worked_seconds(start, time);

        // Audit times never run backwards.
        let at = match record.audit_trail.last() {
            Some(last) if at < last.time => last.time,
            _ => at,
        };
        record.audit_trail.push(AuditEntry {
            action: AuditAction::TimeOut,
            time: at,
            created_by,
        });
        debug_assert!(audit_is_ordered(&record.audit_trail));

        sqlx::query(
            "UPDATE attendance SET end_time = ?, total_seconds = ?, audit_trail = ? WHERE id = ?",
        )
        .bind(time)
        .bind(total)
        .bind(Json(&record.audit_trail))
        .bind(record.id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        record.end_time = Some(time);
        record.total_seconds = Some(total);
        Ok(record)
    }

    async fn list_range(
        &self,
        employee_ids: &[u64],
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<AttendanceRecord>, AttendanceError> {
        if employee_ids.is_empty() {
            return Ok(Vec::new());
        }

        let placeholders = vec!["?"; employee_ids.len()].join(", ");
        let sql = format!(
            "SELECT {SELECT_COLUMNS} FROM attendance \
             WHERE date BETWEEN ? AND ? AND employee_id IN ({placeholders}) \
             ORDER BY employee_id, date"
        );

        let mut query = sqlx::query_as::<_, AttendanceRow>(&sql).bind(from).bind(to);
        for id in employee_ids {
            query = query.bind(*id);
        }

        let mut stream = query.fetch(&self.pool);
        let mut records = Vec::new();
        while let Some(row) = stream.next().await {
            match row {
                Ok(row) => records.push(row.decode()?),
                Err(e) => {
                    error!(error = %e, "Failed to fetch attendance rows");
                    return Err(e.into());
                }
            }
        }
        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::attendance::{AttendanceSource, AuditAction};
    use crate::testutil::MemStore;
    use chrono::NaiveDate;

    fn utc(dt: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(dt).unwrap().with_timezone(&Utc)
    }

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    async fn time_in_at(store: &MemStore, employee_id: u64, now: DateTime<Utc>) {
        let date = timezone::display_today(now);
        store
            .record_time_in(employee_id, date, now.time(), now.naive_utc(), None, Some(1))
            .await
            .unwrap();
    }

    #[actix_web::test]
    async fn time_out_closes_the_same_display_day() {
        let store = MemStore::default();
        // 09:00 display on Jan 10 is 03:30 UTC.
        time_in_at(&store, 12, utc("2025-01-10T03:30:00Z")).await;

        let record = manual_time_out(&store, 12, utc("2025-01-10T12:00:00Z"), Some(1))
            .await
            .unwrap();
        assert_eq!(record.date, d(2025, 1, 10));
        assert_eq!(record.total_seconds, Some(8 * 3600 + 30 * 60));
        assert_eq!(record.source, AttendanceSource::Manual);
        assert_eq!(record.audit_trail.len(), 2);
        assert_eq!(record.audit_trail[1].action, AuditAction::TimeOut);
        assert!(audit_is_ordered(&record.audit_trail));
    }

    #[actix_web::test]
    async fn session_across_midnight_keeps_the_time_in_date() {
        let store = MemStore::default();
        // 23:50 display on Jan 10 is 18:20 UTC on Jan 10.
        time_in_at(&store, 12, utc("2025-01-10T18:20:00Z")).await;

        // 00:10 display on Jan 11 is 18:40 UTC on Jan 10.
        let record = manual_time_out(&store, 12, utc("2025-01-10T18:40:00Z"), Some(1))
            .await
            .unwrap();
        assert_eq!(record.date, d(2025, 1, 10), "record stays on the Time-In date");
        assert_eq!(record.total_seconds, Some(20 * 60));

        assert!(store.find(12, d(2025, 1, 11)).await.unwrap().is_none());
    }

    #[actix_web::test]
    async fn time_out_a_day_later_is_not_timed_in() {
        let store = MemStore::default();
        // 09:00 display on Jan 10, never timed out.
        time_in_at(&store, 12, utc("2025-01-10T03:30:00Z")).await;

        // 10:00 display on Jan 11.
        let result = manual_time_out(&store, 12, utc("2025-01-11T04:30:00Z"), Some(1)).await;
        assert!(matches!(
            result,
            Err(AttendanceError::NotTimedIn { employee_id: 12 })
        ));

        // The stale record is untouched, still open under its own date.
        let stale = store.find(12, d(2025, 1, 10)).await.unwrap().unwrap();
        assert!(stale.is_open());
    }

    #[actix_web::test]
    async fn time_out_without_any_time_in_fails() {
        let store = MemStore::default();
        let result = manual_time_out(&store, 12, utc("2025-01-11T04:30:00Z"), Some(1)).await;
        assert!(matches!(result, Err(AttendanceError::NotTimedIn { .. })));
    }

    #[actix_web::test]
    async fn second_time_in_on_the_same_day_conflicts() {
        let store = MemStore::default();
        time_in_at(&store, 12, utc("2025-01-10T03:30:00Z")).await;

        let date = timezone::display_today(utc("2025-01-10T05:00:00Z"));
        let result = store
            .record_time_in(
                12,
                date,
                utc("2025-01-10T05:00:00Z").time(),
                utc("2025-01-10T05:00:00Z").naive_utc(),
                None,
                Some(1),
            )
            .await;
        assert!(matches!(
            result,
            Err(AttendanceError::AlreadyTimedIn { employee_id: 12, .. })
        ));
    }
}

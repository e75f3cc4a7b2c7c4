use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};
use utoipa::ToSchema;

use crate::errors::AttendanceError;
use crate::utils::timezone;

/// Provenance of an attendance record. Drives whether automatic sync may
/// overwrite it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, ToSchema)]
pub enum AttendanceSource {
    Manual,
    TimeDoctor,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, ToSchema)]
pub enum AuditAction {
    TimeIn,
    TimeOut,
}

/// One entry of the append-only audit trail backing a record.
///
/// Times are full UTC datetimes rather than times of day so the trail stays
/// monotonically non-decreasing across a session that crosses midnight.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct AuditEntry {
    pub action: AuditAction,
    #[schema(value_type = String, format = "date-time")]
    pub time: NaiveDateTime,
    /// Acting user for manual entries; absent on provider-synced trails.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_by: Option<u64>,
}

/// One attendance record per (employee, calendar date).
///
/// `date` is the display-zone operational day; `start_time`/`end_time` are
/// wall-clock times of day stored in UTC.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct AttendanceRecord {
    pub id: u64,
    pub employee_id: u64,
    #[schema(value_type = String, format = "date")]
    pub date: NaiveDate,
    #[schema(value_type = String, nullable = true)]
    pub start_time: Option<NaiveTime>,
    #[schema(value_type = String, nullable = true)]
    pub end_time: Option<NaiveTime>,
    pub total_seconds: Option<i64>,
    pub source: AttendanceSource,
    pub location: Option<String>,
    pub audit_trail: Vec<AuditEntry>,
}

impl AttendanceRecord {
    /// Derived worked span; must agree with `total_seconds` whenever both
    /// endpoints are present.
    pub fn derived_total(&self) -> Option<i64> {
        match (self.start_time, self.end_time) {
            (Some(start), Some(end)) => Some(timezone::worked_seconds(start, end)),
            _ => None,
        }
    }

    /// An open record has a start without an end (employee still clocked in).
    pub fn is_open(&self) -> bool {
        self.start_time.is_some() && self.end_time.is_none()
    }
}

/// Database row shape. `source` and the audit JSON are decoded into their
/// typed forms by [`AttendanceRow::decode`].
#[derive(Debug, sqlx::FromRow)]
pub struct AttendanceRow {
    pub id: u64,
    pub employee_id: u64,
    pub date: NaiveDate,
    pub start_time: Option<NaiveTime>,
    pub end_time: Option<NaiveTime>,
    pub total_seconds: Option<i64>,
    pub source: String,
    pub location: Option<String>,
    pub audit_trail: sqlx::types::Json<Vec<AuditEntry>>,
}

impl AttendanceRow {
    pub fn decode(self) -> Result<AttendanceRecord, AttendanceError> {
        let source = self.source.parse::<AttendanceSource>().map_err(|_| {
            AttendanceError::CorruptRecord(format!("unknown source '{}'", self.source))
        })?;
        Ok(AttendanceRecord {
            id: self.id,
            employee_id: self.employee_id,
            date: self.date,
            start_time: self.start_time,
            end_time: self.end_time,
            total_seconds: self.total_seconds,
            source,
            location: self.location,
            audit_trail: self.audit_trail.0,
        })
    }
}

/// Audit entries must never run backwards in time.
pub fn audit_is_ordered(entries: &[AuditEntry]) -> bool {
    entries.windows(2).all(|w| w[0].time <= w[1].time)
}

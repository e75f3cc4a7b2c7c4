//! In-memory collaborators for exercising the sync and reporting logic
//! without a database or network.

use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};

use crate::errors::AttendanceError;
use crate::model::attendance::{
    AttendanceRecord, AttendanceSource, AuditAction, AuditEntry,
};
use crate::model::employee::{AttendanceMode, Employee, EmployeeMapping};
use crate::repo::attendance::AttendanceStore;
use crate::repo::employee::{EmployeeDirectory, EmployeeFilter};
use crate::sync::client::{TimesheetProvider, WorkSession};
use crate::utils::timezone;

#[derive(Default)]
pub struct MemStore {
    rows: Mutex<HashMap<(u64, NaiveDate), AttendanceRecord>>,
    next_id: AtomicU64,
}

impl MemStore {
    fn alloc_id(&self) -> u64 {
        self.next_id.fetch_add(1, Ordering::SeqCst) + 1
    }
}

#[async_trait]
impl AttendanceStore for MemStore {
    async fn find(
        &self,
        employee_id: u64,
        date: NaiveDate,
    ) -> Result<Option<AttendanceRecord>, AttendanceError> {
        let rows = self.rows.lock().unwrap();
        Ok(rows.get(&(employee_id, date)).cloned())
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
        let mut rows = self.rows.lock().unwrap();
        match rows.get_mut(&(employee_id, date)) {
            Some(record) => {
                record.start_time = Some(start);
                record.end_time = end;
                record.total_seconds = total_seconds;
                record.source = AttendanceSource::TimeDoctor;
                record.audit_trail = audit;
            }
            None => {
                let id = self.alloc_id();
                rows.insert(
                    (employee_id, date),
                    AttendanceRecord {
                        id,
                        employee_id,
                        date,
                        start_time: Some(start),
                        end_time: end,
                        total_seconds,
                        source: AttendanceSource::TimeDoctor,
                        location: None,
                        audit_trail: audit,
                    },
                );
            }
        }
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
        let mut rows = self.rows.lock().unwrap();
        if rows.contains_key(&(employee_id, date)) {
            return Err(AttendanceError::AlreadyTimedIn { employee_id, date });
        }
        let record = AttendanceRecord {
            id: self.alloc_id(),
            employee_id,
            date,
            start_time: Some(time),
            end_time: None,
            total_seconds: None,
            source: AttendanceSource::Manual,
            location,
            audit_trail: vec![AuditEntry {
                action: AuditAction::TimeIn,
                time: at,
                created_by,
            }],
        };
        rows.insert((employee_id, date), record.clone());
        Ok(record)
    }

    async fn record_time_out(
        &self,
        employee_id: u64,
        date: NaiveDate,
        time: NaiveTime,
        at: NaiveDateTime,
        created_by: Option<u64>,
    ) -> Result<AttendanceRecord, AttendanceError> {
        let mut rows = self.rows.lock().unwrap();
        let Some(record) = rows.get_mut(&(employee_id, date)) else {
            return Err(AttendanceError::NotTimedIn { employee_id });
        };
        if !record.is_open() {
            return Err(AttendanceError::NotTimedIn { employee_id });
        }
        let start = record.start_time.expect("open record has a start");
        let total = timezone::worked_seconds(start, time);

        let at = match record.audit_trail.last() {
            Some(last) if at < last.time => last.time,
            _ => at,
        };
        record.audit_trail.push(AuditEntry {
            action: AuditAction::TimeOut,
            time: at,
            created_by,
        });
        record.end_time = Some(time);
        record.total_seconds = Some(total);
        Ok(record.clone())
    }

    async fn list_range(
        &self,
        employee_ids: &[u64],
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<AttendanceRecord>, AttendanceError> {
        let rows = self.rows.lock().unwrap();
        let mut records: Vec<AttendanceRecord> = rows
            .values()
            .filter(|r| employee_ids.contains(&r.employee_id) && r.date >= from && r.date <= to)
            .cloned()
            .collect();
        records.sort_by_key(|r| (r.employee_id, r.date));
        Ok(records)
    }
}

pub struct MemDirectory {
    employees: Vec<Employee>,
}

impl MemDirectory {
    pub fn new(employees: Vec<Employee>) -> Self {
        Self { employees }
    }
}

#[async_trait]
impl EmployeeDirectory for MemDirectory {
    async fn resolve(
        &self,
        external_user_id: &str,
    ) -> Result<Option<EmployeeMapping>, AttendanceError> {
        Ok(self
            .employees
            .iter()
            .find(|e| e.status == "active" && e.external_user_id.as_deref() == Some(external_user_id))
            .map(|e| EmployeeMapping {
                employee_id: e.id,
                external_user_id: e.external_user_id.clone(),
                attendance_mode: e.attendance_mode(),
            }))
    }

    async fn list_active(
        &self,
        filter: &EmployeeFilter,
        page: u32,
        per_page: u32,
    ) -> Result<(Vec<Employee>, i64), AttendanceError> {
        let matching: Vec<Employee> = self
            .employees
            .iter()
            .filter(|e| e.status == "active")
            .filter(|e| filter.department_id.is_none_or(|d| e.department_id == d))
            .filter(|e| filter.branch_id.is_none_or(|b| e.branch_id == b))
            .filter(|e| filter.employee_id.is_none_or(|id| e.id == id))
            .filter(|e| {
                filter.search.as_ref().is_none_or(|s| {
                    e.first_name.contains(s) || e.last_name.contains(s) || e.employee_code.contains(s)
                })
            })
            .cloned()
            .collect();
        let total = matching.len() as i64;
        let offset = ((page.max(1) - 1) * per_page) as usize;
        let pageful = matching
            .into_iter()
            .skip(offset)
            .take(per_page as usize)
            .collect();
        Ok((pageful, total))
    }
}

enum Script {
    Sessions(Vec<WorkSession>),
    Unavailable(String),
}

pub struct ScriptedProvider {
    script: Script,
}

impl ScriptedProvider {
    pub fn ok(sessions: Vec<WorkSession>) -> Self {
        Self {
            script: Script::Sessions(sessions),
        }
    }

    pub fn unavailable(detail: &str) -> Self {
        Self {
            script: Script::Unavailable(detail.to_string()),
        }
    }
}

#[async_trait]
impl TimesheetProvider for ScriptedProvider {
    async fn fetch_summary(
        &self,
        _from: DateTime<Utc>,
        _to: DateTime<Utc>,
    ) -> Result<Vec<WorkSession>, AttendanceError> {
        match &self.script {
            Script::Sessions(sessions) => Ok(sessions.clone()),
            Script::Unavailable(detail) => {
                Err(AttendanceError::ProviderUnavailable(detail.clone()))
            }
        }
    }
}

pub fn employee(id: u64, external_user_id: &str, mode: AttendanceMode) -> Employee {
    Employee {
        id,
        employee_code: format!("EMP-{id:03}"),
        first_name: format!("First{id}"),
        last_name: format!("Last{id}"),
        email: format!("employee{id}@company.com"),
        department_id: 1,
        branch_id: 1,
        status: "active".into(),
        external_user_id: Some(external_user_id.to_string()),
        attendance_mode: mode.to_string(),
    }
}

pub fn session(user: &str, start: &str, end: Option<&str>) -> WorkSession {
    let start = DateTime::parse_from_rfc3339(start)
        .unwrap()
        .with_timezone(&Utc);
    let end = end.map(|e| DateTime::parse_from_rfc3339(e).unwrap().with_timezone(&Utc));
    let total_seconds = end.map_or(0, |e| (e - start).num_seconds());
    WorkSession {
        external_user_id: user.to_string(),
        start,
        end,
        total_seconds,
    }
}

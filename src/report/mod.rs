use std::collections::BTreeMap;

use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::errors::AttendanceError;
use crate::model::attendance::AttendanceRecord;
use crate::model::employee::Employee;
use crate::utils::timezone;

#[derive(Debug, Deserialize, IntoParams)]
pub struct ReportQuery {
    #[param(value_type = String, example = "2025-11-01")]
    pub date_from: NaiveDate,
    #[param(value_type = String, example = "2025-11-30")]
    pub date_to: NaiveDate,
    pub department_id: Option<u64>,
    pub branch_id: Option<u64>,
    pub employee_id: Option<u64>,
    pub search: Option<String>,
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

/// One day's cell in the worked-hours matrix. Times are display-zone values,
/// converted exactly once when the record leaves the repository.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct DayCell {
    #[schema(value_type = String, nullable = true, example = "11:29:30")]
    pub start_time: Option<NaiveTime>,
    #[schema(value_type = String, nullable = true, example = "13:09:00")]
    pub end_time: Option<NaiveTime>,
    /// `HH:MM` worked hours; absent while the employee is still clocked in.
    #[serde(skip_serializing_if = "Option::is_none")]
    #[schema(example = "01:39", nullable = true)]
    pub worked: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct EmployeeReport {
    pub employee_id: u64,
    #[schema(example = "EMP-057")]
    pub employee_code: String,
    #[schema(example = "John Doe")]
    pub name: String,
    /// Sparse: dates with no attendance record are omitted, so "no data" and
    /// "zero hours" stay distinguishable.
    #[schema(value_type = Object)]
    pub days: BTreeMap<NaiveDate, DayCell>,
    #[schema(example = "41:30")]
    pub total: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ReportResponse {
    pub data: Vec<EmployeeReport>,
    #[schema(example = 1)]
    pub page: u32,
    #[schema(example = 20)]
    pub per_page: u32,
    #[schema(example = 134)]
    pub total: i64,
}

/// Bound the range before any aggregation work happens.
pub fn check_span(from: NaiveDate, to: NaiveDate, max_days: i64) -> Result<i64, AttendanceError> {
    if to < from {
        return Err(AttendanceError::InvalidDateRange);
    }
    let days = (to - from).num_days() + 1;
    if days > max_days {
        return Err(AttendanceError::DateRangeTooWide {
            days,
            max: max_days,
        });
    }
    Ok(days)
}

/// Build the per-employee worked-hours matrix from fetched rows.
///
/// Records outside the employee page are ignored; employees without records
/// appear with an empty map and a zero total.
pub fn build_report(employees: &[Employee], records: Vec<AttendanceRecord>) -> Vec<EmployeeReport> {
    let mut by_employee: BTreeMap<u64, Vec<AttendanceRecord>> = BTreeMap::new();
    for record in records {
        by_employee.entry(record.employee_id).or_default().push(record);
    }

    employees
        .iter()
        .map(|employee| {
            let mut days = BTreeMap::new();
            let mut total_seconds = 0i64;

            for record in by_employee.remove(&employee.id).unwrap_or_default() {
                let worked = record.total_seconds.or_else(|| record.derived_total());
                if let Some(seconds) = worked {
                    total_seconds += seconds;
                }
                days.insert(
                    record.date,
                    DayCell {
                        start_time: record
                            .start_time
                            .map(|t| timezone::utc_to_display(t, record.date)),
                        end_time: record
                            .end_time
                            .map(|t| timezone::utc_to_display(t, record.date)),
                        worked: worked.map(timezone::format_hhmm),
                    },
                );
            }

            EmployeeReport {
                employee_id: employee.id,
                employee_code: employee.employee_code.clone(),
                name: employee.full_name(),
                days,
                total: timezone::format_hhmm(total_seconds),
            }
        })
        .collect()
}

use chrono::NaiveDate;
use thiserror::Error;

/// Error taxonomy for the attendance core.
///
/// Per-user failures during a sync run are collected into the run summary
/// instead of being raised; only a total provider/storage failure surfaces
/// here.
#[derive(Debug, Error)]
pub enum AttendanceError {
    #[error("time tracking provider unavailable: {0}")]
    ProviderUnavailable(String),

    #[error("no employee mapped to external user '{0}'")]
    MappingNotFound(String),

    #[error("employee {employee_id} is not timed in")]
    NotTimedIn { employee_id: u64 },

    #[error("employee {employee_id} already timed in on {date}")]
    AlreadyTimedIn { employee_id: u64, date: NaiveDate },

    #[error("report range of {days} days exceeds the {max} day limit")]
    DateRangeTooWide { days: i64, max: i64 },

    #[error("date_to precedes date_from")]
    InvalidDateRange,

    #[error("database error")]
    Database(#[from] sqlx::Error),

    #[error("stored attendance row is malformed: {0}")]
    CorruptRecord(String),
}

impl From<reqwest::Error> for AttendanceError {
    fn from(e: reqwest::Error) -> Self {
        // Connect errors, timeouts and body failures all mean the provider
        // cannot be used for this run.
        AttendanceError::ProviderUnavailable(e.to_string())
    }
}

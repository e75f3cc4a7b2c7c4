use chrono::NaiveDate;
use serde::Serialize;
use utoipa::ToSchema;

use crate::errors::AttendanceError;

/// Outcome of one reconciler invocation for one date.
///
/// Per-user failures are aggregated here rather than raised, so one bad
/// mapping never blocks the rest of the company's sync.
#[derive(Debug, Serialize, ToSchema)]
pub struct SyncRun {
    #[schema(example = "7f9c0a52-2f05-4d9e-9f31-8a4f3f7d2c11")]
    pub run_id: String,

    #[schema(value_type = String, format = "date", example = "2025-11-18")]
    pub date: NaiveDate,

    /// External users seen in the provider summary.
    #[schema(example = 42)]
    pub total_external_users: usize,

    #[schema(example = 40)]
    pub synced_count: usize,

    /// Employees skipped because their attendance mode is Manual.
    #[schema(example = 1)]
    pub skipped_manual: usize,

    #[schema(example = 1)]
    pub error_count: usize,

    pub errors: Vec<SyncIssue>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
pub enum SyncIssueKind {
    ProviderUnavailable,
    MappingNotFound,
    Store,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct SyncIssue {
    pub kind: SyncIssueKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub external_user_id: Option<String>,
    pub detail: String,
}

impl SyncIssue {
    pub fn provider(detail: impl Into<String>) -> Self {
        Self {
            kind: SyncIssueKind::ProviderUnavailable,
            external_user_id: None,
            detail: detail.into(),
        }
    }

    pub fn mapping(external_user_id: impl Into<String>) -> Self {
        let external_user_id = external_user_id.into();
        Self {
            kind: SyncIssueKind::MappingNotFound,
            detail: AttendanceError::MappingNotFound(external_user_id.clone()).to_string(),
            external_user_id: Some(external_user_id),
        }
    }

    pub fn store(external_user_id: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            kind: SyncIssueKind::Store,
            external_user_id: Some(external_user_id.into()),
            detail: detail.into(),
        }
    }
}

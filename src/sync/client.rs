use anyhow::Context;
use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use reqwest::StatusCode;
use reqwest::header::{ACCEPT, AUTHORIZATION};
use serde::Deserialize;
use std::time::Duration;
use tracing::warn;
use url::Url;

use crate::config::Config;
use crate::errors::AttendanceError;

const SUMMARY_PATH: &str = "api/1.0/activity/summary";

/// One raw work session reported by the provider. Timestamps are UTC.
#[derive(Debug, Clone, PartialEq)]
pub struct WorkSession {
    pub external_user_id: String,
    pub start: DateTime<Utc>,
    /// Absent while the user is still clocked in.
    pub end: Option<DateTime<Utc>>,
    pub total_seconds: i64,
}

/// Summary-statistics endpoint of the external time tracker.
#[async_trait]
pub trait TimesheetProvider: Send + Sync {
    async fn fetch_summary(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<WorkSession>, AttendanceError>;
}

pub struct TimeDoctorClient {
    http: reqwest::Client,
    base_url: Url,
    api_token: String,
    company_id: String,
}

impl TimeDoctorClient {
    pub fn new(config: &Config) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.provider_timeout_secs))
            .build()
            .context("Failed to build provider HTTP client")?;
        let base_url = Url::parse(&config.provider_base_url)
            .context("PROVIDER_BASE_URL is not a valid URL")?;
        Ok(Self {
            http,
            base_url,
            api_token: config.provider_api_token.clone(),
            company_id: config.provider_company_id.clone(),
        })
    }
}

#[async_trait]
impl TimesheetProvider for TimeDoctorClient {
    async fn fetch_summary(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<WorkSession>, AttendanceError> {
        let mut url = self
            .base_url
            .join(SUMMARY_PATH)
            .map_err(|e| AttendanceError::ProviderUnavailable(e.to_string()))?;
        url.query_pairs_mut()
            .append_pair("company", &self.company_id)
            .append_pair("from", &from.to_rfc3339_opts(SecondsFormat::Secs, true))
            .append_pair("to", &to.to_rfc3339_opts(SecondsFormat::Secs, true));

        let response = self
            .http
            .get(url)
            .header(AUTHORIZATION, format!("Bearer {}", self.api_token))
            .header(ACCEPT, "application/json")
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            // Auth failures (401/403) are provider outages from the sync
            // run's point of view: nothing can be fetched, nothing written.
            let body = response.text().await.unwrap_or_default();
            return Err(provider_error(status, &body));
        }

        let payload: SummaryResponse = response.json().await?;
        Ok(decode_sessions(payload.data))
    }
}

fn provider_error(status: StatusCode, body: &str) -> AttendanceError {
    let detail = body.chars().take(200).collect::<String>();
    AttendanceError::ProviderUnavailable(format!("status {status}: {detail}"))
}

#[derive(Debug, Deserialize)]
struct SummaryResponse {
    #[serde(default)]
    data: Vec<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawSession {
    user_id: String,
    start: String,
    end: Option<String>,
    #[serde(default)]
    total: i64,
}

/// Decode individual summary entries, skipping malformed ones so a single
/// bad user never aborts the run.
fn decode_sessions(values: Vec<serde_json::Value>) -> Vec<WorkSession> {
    let mut sessions = Vec::with_capacity(values.len());
    for value in values {
        let raw: RawSession = match serde_json::from_value(value) {
            Ok(raw) => raw,
            Err(e) => {
                warn!(error = %e, "Skipping malformed provider session entry");
                continue;
            }
        };
        let start = match parse_utc(&raw.start) {
            Ok(start) => start,
            Err(e) => {
                warn!(error = %e, user = %raw.user_id, "Skipping session with bad start timestamp");
                continue;
            }
        };
        let end = match raw.end.as_deref().map(parse_utc).transpose() {
            Ok(end) => end,
            Err(e) => {
                warn!(error = %e, user = %raw.user_id, "Skipping session with bad end timestamp");
                continue;
            }
        };
        sessions.push(WorkSession {
            external_user_id: raw.user_id,
            start,
            end,
            total_seconds: raw.total,
        });
    }
    sessions
}

/// Strict UTC-aware parse. RFC 3339 requires an explicit offset, so a naive
/// timestamp (which a lenient parser would read in host-local time) is
/// rejected here at the single ingestion boundary.
fn parse_utc(value: &str) -> Result<DateTime<Utc>, chrono::ParseError> {
    DateTime::parse_from_rfc3339(value).map(|dt| dt.with_timezone(&Utc))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parse_utc_accepts_z_suffix() {
        let dt = parse_utc("2025-11-18T05:59:30Z").unwrap();
        assert_eq!(dt.to_rfc3339(), "2025-11-18T05:59:30+00:00");
    }

    #[test]
    fn parse_utc_normalizes_explicit_offsets() {
        let dt = parse_utc("2025-11-18T11:29:30+05:30").unwrap();
        assert_eq!(dt.to_rfc3339(), "2025-11-18T05:59:30+00:00");
    }

    #[test]
    fn parse_utc_rejects_naive_timestamps() {
        assert!(parse_utc("2025-11-18T05:59:30").is_err());
        assert!(parse_utc("2025-11-18 05:59:30").is_err());
    }

    #[test]
    fn decode_skips_malformed_entries_and_keeps_the_rest() {
        let values = vec![
            json!({"userId": "ext-57", "start": "2025-11-18T05:59:30Z", "end": "2025-11-18T07:39:00Z", "total": 5970}),
            json!({"userId": "ext-58", "start": "not a timestamp", "end": null}),
            json!({"start": "2025-11-18T06:00:00Z"}),
            json!({"userId": "ext-59", "start": "2025-11-18T06:00:00Z"}),
        ];

        let sessions = decode_sessions(values);
        assert_eq!(sessions.len(), 2);

        assert_eq!(sessions[0].external_user_id, "ext-57");
        assert_eq!(sessions[0].total_seconds, 5970);
        assert_eq!(
            sessions[0].end.unwrap().to_rfc3339(),
            "2025-11-18T07:39:00+00:00"
        );

        // open session: no end yet, total defaults to zero
        assert_eq!(sessions[1].external_user_id, "ext-59");
        assert_eq!(sessions[1].end, None);
        assert_eq!(sessions[1].total_seconds, 0);
    }
}

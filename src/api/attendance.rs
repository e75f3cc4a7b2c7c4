use crate::auth::auth::AuthUser;
use crate::errors::AttendanceError;
use crate::model::attendance::{AttendanceRecord, AttendanceSource, AuditAction};
use crate::repo::attendance::{AttendanceStore, manual_time_out};
use crate::utils::timezone;
use actix_web::{HttpResponse, Responder, web};
use chrono::{NaiveDate, NaiveDateTime, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::error;
use utoipa::ToSchema;

#[derive(Deserialize, ToSchema)]
pub struct TimeInRequest {
    /// Defaults to the acting user's own employee record.
    #[schema(example = 57)]
    pub employee_id: Option<u64>,
    /// Display-zone date for backfilled entries; defaults to today.
    #[schema(example = "2025-01-10", value_type = String, format = "date", nullable = true)]
    pub date: Option<NaiveDate>,
    /// Display wall-clock time for backfilled entries; defaults to now.
    #[schema(example = "09:00:00", value_type = String, nullable = true)]
    pub time: Option<NaiveTime>,
    #[schema(example = "HQ", nullable = true)]
    pub location: Option<String>,
}

#[derive(Deserialize, ToSchema)]
pub struct TimeOutRequest {
    /// Defaults to the acting user's own employee record.
    #[schema(example = 57)]
    pub employee_id: Option<u64>,
}

/// Attendance record as rendered to clients: every time has passed through
/// the display-zone conversion exactly once, here.
#[derive(Serialize, ToSchema)]
pub struct AttendanceView {
    pub employee_id: u64,
    #[schema(value_type = String, format = "date")]
    pub date: NaiveDate,
    #[schema(value_type = String, nullable = true, example = "11:29:30")]
    pub start_time: Option<NaiveTime>,
    #[schema(value_type = String, nullable = true, example = "13:09:00")]
    pub end_time: Option<NaiveTime>,
    #[schema(example = "01:39", nullable = true)]
    pub worked: Option<String>,
    pub source: AttendanceSource,
    pub location: Option<String>,
    pub audit_trail: Vec<AuditEntryView>,
}

#[derive(Serialize, ToSchema)]
pub struct AuditEntryView {
    pub action: AuditAction,
    #[schema(value_type = String, format = "date-time")]
    pub time: NaiveDateTime,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_by: Option<u64>,
}

impl AttendanceView {
    pub fn from_record(record: AttendanceRecord) -> Self {
        Self {
            employee_id: record.employee_id,
            date: record.date,
            start_time: record
                .start_time
                .map(|t| timezone::utc_to_display(t, record.date)),
            end_time: record
                .end_time
                .map(|t| timezone::utc_to_display(t, record.date)),
            worked: record.total_seconds.map(timezone::format_hhmm),
            source: record.source,
            location: record.location,
            audit_trail: record
                .audit_trail
                .into_iter()
                .map(|entry| AuditEntryView {
                    action: entry.action,
                    time: timezone::utc_datetime_to_display(entry.time),
                    created_by: entry.created_by,
                })
                .collect(),
        }
    }
}

/// Time-In endpoint
#[utoipa::path(
    post,
    path = "/api/v1/attendance/time-in",
    request_body = TimeInRequest,
    responses(
        (status = 200, description = "Timed in successfully", body = Object, example = json!({
            "success": true
        })),
        (status = 403, description = "Forbidden"),
        (status = 409, description = "Already timed in today", body = Object, example = json!({
            "message": "Already timed in today"
        })),
        (status = 500, description = "Internal server error")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Attendance"
)]
pub async fn time_in(
    auth: AuthUser,
    store: web::Data<dyn AttendanceStore>,
    payload: web::Json<TimeInRequest>,
) -> actix_web::Result<impl Responder> {
    let employee_id = match payload.employee_id.or(auth.employee_id) {
        Some(id) => id,
        None => return Err(actix_web::error::ErrorForbidden("No employee profile")),
    };
    auth.require_can_act_for(employee_id)?;

    let now = Utc::now();
    let (date, time, at) = match (payload.date, payload.time) {
        (Some(date), Some(time)) => {
            let at = timezone::display_to_utc_datetime(time, date);
            (date, at.time(), at)
        }
        _ => (timezone::display_today(now), now.time(), now.naive_utc()),
    };

    let result = store
        .record_time_in(
            employee_id,
            date,
            time,
            at,
            payload.location.clone(),
            Some(auth.user_id),
        )
        .await;

    match result {
        Ok(record) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "record": AttendanceView::from_record(record)
        }))),
        Err(AttendanceError::AlreadyTimedIn { .. }) => {
            Ok(HttpResponse::Conflict().json(json!({
                "message": "Already timed in today"
            })))
        }
        Err(e) => {
            error!(error = %e, employee_id, "Time-in failed");
            Ok(HttpResponse::InternalServerError().json(json!({
                "message": "Internal Server Error"
            })))
        }
    }
}

/// Time-Out endpoint
#[utoipa::path(
    post,
    path = "/api/v1/attendance/time-out",
    request_body = TimeOutRequest,
    responses(
        (status = 200, description = "Timed out successfully", body = Object, example = json!({
            "success": true
        })),
        (status = 403, description = "Forbidden"),
        (status = 422, description = "No open time-in found", body = Object, example = json!({
            "message": "You are not currently timed in"
        })),
        (status = 500, description = "Internal server error")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Attendance"
)]
pub async fn time_out(
    auth: AuthUser,
    store: web::Data<dyn AttendanceStore>,
    payload: web::Json<TimeOutRequest>,
) -> actix_web::Result<impl Responder> {
    let employee_id = match payload.employee_id.or(auth.employee_id) {
        Some(id) => id,
        None => return Err(actix_web::error::ErrorForbidden("No employee profile")),
    };
    auth.require_can_act_for(employee_id)?;

    let result = manual_time_out(
        store.get_ref(),
        employee_id,
        Utc::now(),
        Some(auth.user_id),
    )
    .await;

    match result {
        Ok(record) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "record": AttendanceView::from_record(record)
        }))),
        Err(AttendanceError::NotTimedIn { .. }) => {
            Ok(HttpResponse::UnprocessableEntity().json(json!({
                "message": "You are not currently timed in"
            })))
        }
        Err(e) => {
            error!(error = %e, employee_id, "Time-out failed");
            Ok(HttpResponse::InternalServerError().json(json!({
                "message": "Internal Server Error"
            })))
        }
    }
}

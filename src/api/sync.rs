use crate::auth::auth::AuthUser;
use crate::model::sync::SyncRun;
use crate::sync::reconciler::Reconciler;
use actix_web::{HttpResponse, Responder, web};
use chrono::NaiveDate;
use serde::Deserialize;
use tracing::info;
use utoipa::ToSchema;

#[derive(Deserialize, ToSchema)]
pub struct SyncRequest {
    #[schema(example = "2025-11-18", value_type = String, format = "date")]
    pub date: NaiveDate,
}

/// Trigger one reconciler run for a date
#[utoipa::path(
    post,
    path = "/api/v1/attendance/sync",
    request_body = SyncRequest,
    responses(
        (status = 200, description = "Sync run summary", body = SyncRun),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Attendance"
)]
pub async fn trigger_sync(
    auth: AuthUser,
    reconciler: web::Data<Reconciler>,
    payload: web::Json<SyncRequest>,
) -> actix_web::Result<impl Responder> {
    auth.require_hr_or_admin()?;

    info!(requested_by = %auth.username, date = %payload.date, "Manual sync triggered");

    // Partial failures (bad mappings, single-row write errors) are inside
    // the summary; a provider outage shows up there too, with zero writes.
    let run = reconciler.run(payload.date).await;
    Ok(HttpResponse::Ok().json(run))
}

use crate::auth::auth::AuthUser;
use crate::config::Config;
use crate::errors::AttendanceError;
use crate::repo::attendance::AttendanceStore;
use crate::repo::employee::{EmployeeDirectory, EmployeeFilter};
use crate::report::{self, ReportQuery, ReportResponse};
use actix_web::{HttpResponse, Responder, error::ErrorInternalServerError, web};
use serde_json::json;
use tracing::error;

/// Worked-hours report over a date range
#[utoipa::path(
    get,
    path = "/api/v1/attendance/report",
    params(ReportQuery),
    responses(
        (status = 200, description = "Paginated per-employee worked-hours matrix", body = ReportResponse),
        (status = 400, description = "Invalid or too wide date range", body = Object, example = json!({
            "message": "Date range exceeds the 60 day limit"
        })),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Attendance"
)]
pub async fn attendance_report(
    auth: AuthUser,
    config: web::Data<Config>,
    directory: web::Data<dyn EmployeeDirectory>,
    store: web::Data<dyn AttendanceStore>,
    query: web::Query<ReportQuery>,
) -> actix_web::Result<impl Responder> {
    let mut filter = EmployeeFilter {
        department_id: query.department_id,
        branch_id: query.branch_id,
        employee_id: query.employee_id,
        search: query.search.clone(),
    };

    // Non-HR callers only ever see their own rows.
    if !auth.is_hr_or_admin() {
        match auth.employee_id {
            Some(own) => filter.employee_id = Some(own),
            None => return Err(actix_web::error::ErrorForbidden("No employee profile")),
        }
    }

    match report::check_span(query.date_from, query.date_to, config.report_max_span_days) {
        Ok(_) => {}
        Err(AttendanceError::DateRangeTooWide { max, .. }) => {
            return Ok(HttpResponse::BadRequest().json(json!({
                "message": format!("Date range exceeds the {max} day limit")
            })));
        }
        Err(_) => {
            return Ok(HttpResponse::BadRequest().json(json!({
                "message": "date_to must not precede date_from"
            })));
        }
    }

    let page = query.page.unwrap_or(1).max(1);
    let per_page = query.per_page.unwrap_or(20).clamp(1, 100);

    let (employees, total) = directory
        .list_active(&filter, page, per_page)
        .await
        .map_err(|e| {
            error!(error = %e, "Failed to fetch report employees");
            ErrorInternalServerError("Database error")
        })?;

    let ids: Vec<u64> = employees.iter().map(|e| e.id).collect();
    let records = store
        .list_range(&ids, query.date_from, query.date_to)
        .await
        .map_err(|e| {
            error!(error = %e, "Failed to fetch attendance rows for report");
            ErrorInternalServerError("Database error")
        })?;

    let data = report::build_report(&employees, records);

    Ok(HttpResponse::Ok().json(ReportResponse {
        data,
        page,
        per_page,
        total,
    }))
}

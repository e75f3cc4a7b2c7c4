use crate::api::attendance::{AttendanceView, AuditEntryView, TimeInRequest, TimeOutRequest};
use crate::api::sync::SyncRequest;
use crate::model::attendance::{AttendanceSource, AuditAction};
use crate::model::employee::Employee;
use crate::model::sync::{SyncIssue, SyncIssueKind, SyncRun};
use crate::report::{DayCell, EmployeeReport, ReportResponse};
use utoipa::Modify;
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{OpenApi, openapi};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "HRM Attendance Service API",
        version = "1.0.0",
        description = r#"
## Attendance Synchronization & Reporting

This API powers the attendance subsystem of an HRM platform.

### 🔹 Key Features
- **Manual Attendance**
  - Time-In / Time-Out with display-timezone day boundaries
- **Provider Sync**
  - Reconciles Time Doctor work sessions into one record per employee per day
- **Reporting**
  - Multi-day worked-hours matrix with department/branch filters

### 🔐 Security
All endpoints are protected using **JWT Bearer authentication** issued by the
central auth service.

### 📦 Response Format
- JSON-based RESTful responses
- All rendered times are display timezone (UTC+5:30); storage is UTC

---
Built with **Rust**, **Actix Web**, **SQLx**, and **Utoipa**.
"#,
    ),
    paths(
        crate::api::attendance::time_in,
        crate::api::attendance::time_out,

        crate::api::sync::trigger_sync,

        crate::api::report::attendance_report
    ),
    components(
        schemas(
            TimeInRequest,
            TimeOutRequest,
            AttendanceView,
            AuditEntryView,
            AttendanceSource,
            AuditAction,
            Employee,
            SyncRequest,
            SyncRun,
            SyncIssue,
            SyncIssueKind,
            ReportResponse,
            EmployeeReport,
            DayCell
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Attendance", description = "Attendance capture, sync and reporting APIs"),
    )
)]
pub struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

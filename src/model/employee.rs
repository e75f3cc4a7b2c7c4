use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};
use utoipa::ToSchema;

/// Per-employee setting controlling whether the external provider sync is
/// authoritative for that employee's records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, ToSchema)]
pub enum AttendanceMode {
    Manual,
    Automatic,
}

/// Employee master data, owned by the HR core and read-only here.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
#[schema(
    example = json!({
        "id": 57,
        "employee_code": "EMP-057",
        "first_name": "John",
        "last_name": "Doe",
        "email": "john.doe@company.com",
        "department_id": 10,
        "branch_id": 2,
        "status": "active",
        "external_user_id": "ext-57",
        "attendance_mode": "Automatic"
    })
)]
pub struct Employee {
    #[schema(example = 57)]
    pub id: u64,

    #[schema(example = "EMP-057")]
    pub employee_code: String,

    #[schema(example = "John")]
    pub first_name: String,

    #[schema(example = "Doe")]
    pub last_name: String,

    #[schema(example = "john.doe@company.com")]
    pub email: String,

    #[schema(example = 10)]
    pub department_id: u64,

    #[schema(example = 2)]
    pub branch_id: u64,

    #[schema(example = "active")]
    pub status: String,

    /// Identity at the time-tracking provider; NULL means the employee is not
    /// subject to automatic sync.
    #[schema(example = "ext-57", nullable = true)]
    pub external_user_id: Option<String>,

    #[schema(example = "Automatic")]
    pub attendance_mode: String,
}

impl Employee {
    pub fn attendance_mode(&self) -> AttendanceMode {
        // Unknown values stay manual so sync can never overwrite them.
        self.attendance_mode
            .parse()
            .unwrap_or(AttendanceMode::Manual)
    }

    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

/// Resolved link between a provider-side user and an internal employee.
#[derive(Debug, Clone, PartialEq)]
pub struct EmployeeMapping {
    pub employee_id: u64,
    pub external_user_id: Option<String>,
    pub attendance_mode: AttendanceMode,
}

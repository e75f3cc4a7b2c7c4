use async_trait::async_trait;
use sqlx::MySqlPool;
use tracing::debug;

use crate::errors::AttendanceError;
use crate::model::employee::{Employee, EmployeeMapping};

/// Read-only view of employee master data, owned by the HR core.
#[async_trait]
pub trait EmployeeDirectory: Send + Sync {
    /// Map a provider-side user id to an employee. `None` is a per-user
    /// condition for the caller to count, never a fatal error.
    async fn resolve(
        &self,
        external_user_id: &str,
    ) -> Result<Option<EmployeeMapping>, AttendanceError>;

    /// Active employees matching the filter, paginated, plus the total count.
    async fn list_active(
        &self,
        filter: &EmployeeFilter,
        page: u32,
        per_page: u32,
    ) -> Result<(Vec<Employee>, i64), AttendanceError>;
}

#[derive(Debug, Default, Clone)]
pub struct EmployeeFilter {
    pub department_id: Option<u64>,
    pub branch_id: Option<u64>,
    pub employee_id: Option<u64>,
    pub search: Option<String>,
}

pub struct SqlEmployeeDirectory {
    pool: MySqlPool,
}

impl SqlEmployeeDirectory {
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl EmployeeDirectory for SqlEmployeeDirectory {
    async fn resolve(
        &self,
        external_user_id: &str,
    ) -> Result<Option<EmployeeMapping>, AttendanceError> {
        let row = sqlx::query_as::<_, Employee>(
            "SELECT * FROM employees WHERE external_user_id = ? AND status = 'active'",
        )
        .bind(external_user_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|employee| EmployeeMapping {
            employee_id: employee.id,
            attendance_mode: employee.attendance_mode(),
            external_user_id: employee.external_user_id,
        }))
    }

    async fn list_active(
        &self,
        filter: &EmployeeFilter,
        page: u32,
        per_page: u32,
    ) -> Result<(Vec<Employee>, i64), AttendanceError> {
        let offset = (page.max(1) - 1) * per_page;

        // ---------- build WHERE clause dynamically ----------
        let mut conditions = vec!["status = 'active'"];
        let mut bindings: Vec<sqlx::types::JsonValue> = Vec::new();

        if let Some(department_id) = filter.department_id {
            conditions.push("department_id = ?");
            bindings.push(department_id.into());
        }

        if let Some(branch_id) = filter.branch_id {
            conditions.push("branch_id = ?");
            bindings.push(branch_id.into());
        }

        if let Some(employee_id) = filter.employee_id {
            conditions.push("id = ?");
            bindings.push(employee_id.into());
        }

        if let Some(search) = &filter.search {
            conditions.push("(first_name LIKE ? OR last_name LIKE ? OR employee_code LIKE ?)");
            let like = format!("%{}%", search);
            bindings.push(like.clone().into());
            bindings.push(like.clone().into());
            bindings.push(like.into());
        }

        let where_clause = format!("WHERE {}", conditions.join(" AND "));

        // ---------- total count ----------
        let count_sql = format!("SELECT COUNT(*) FROM employees {}", where_clause);
        debug!(sql = %count_sql, bindings = ?bindings, "Counting report employees");

        let mut count_query = sqlx::query_scalar::<_, i64>(&count_sql);
        for b in &bindings {
            count_query = count_query.bind(b);
        }
        let total = count_query.fetch_one(&self.pool).await?;

        // ---------- data query ----------
        let data_sql = format!(
            "SELECT * FROM employees {} ORDER BY id LIMIT ? OFFSET ?",
            where_clause
        );
        debug!(sql = %data_sql, page, per_page, offset, "Fetching report employees");

        let mut data_query = sqlx::query_as::<_, Employee>(&data_sql);
        for b in &bindings {
            data_query = data_query.bind(b);
        }
        data_query = data_query.bind(per_page as i64).bind(offset as i64);

        let employees = data_query.fetch_all(&self.pool).await?;

        Ok((employees, total))
    }
}

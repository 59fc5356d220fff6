//! EmployeeStorage implementation for SQLite, plus the row-level queries
//! shared with [`SqliteTransaction`](super::SqliteTransaction).

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::{Connection, OptionalExtension, Row, params};

use crate::core::EmployeeStorage;
use crate::error::{BackendError, ResourceError, StorageError, StorageResult};
use crate::types::{Employee, EmployeeFields, NewEmployee};

use super::SqliteBackend;

const EMPLOYEE_COLUMNS: &str = "id, username, phone_number, first_name, last_name, email, \
     department, position, age, salary, hire_date, version, created_at, updated_at";

const DATE_FORMAT: &str = "%Y-%m-%d";

fn internal_error(message: String) -> StorageError {
    StorageError::Backend(BackendError::Internal {
        backend_name: "sqlite".to_string(),
        message,
        source: None,
    })
}

/// Raw column values of one `employees` row.
struct EmployeeRow {
    id: i64,
    username: String,
    phone_number: String,
    first_name: Option<String>,
    last_name: Option<String>,
    email: Option<String>,
    department: Option<String>,
    position: Option<String>,
    age: Option<u32>,
    salary: Option<f64>,
    hire_date: Option<String>,
    version: i64,
    created_at: String,
    updated_at: String,
}

impl EmployeeRow {
    fn read(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            username: row.get(1)?,
            phone_number: row.get(2)?,
            first_name: row.get(3)?,
            last_name: row.get(4)?,
            email: row.get(5)?,
            department: row.get(6)?,
            position: row.get(7)?,
            age: row.get(8)?,
            salary: row.get(9)?,
            hire_date: row.get(10)?,
            version: row.get(11)?,
            created_at: row.get(12)?,
            updated_at: row.get(13)?,
        })
    }

    fn into_employee(self) -> StorageResult<Employee> {
        let hire_date = self
            .hire_date
            .map(|s| {
                NaiveDate::parse_from_str(&s, DATE_FORMAT)
                    .map_err(|e| internal_error(format!("Failed to parse hire_date: {}", e)))
            })
            .transpose()?;

        Ok(Employee {
            id: self.id,
            username: self.username,
            phone_number: self.phone_number,
            fields: EmployeeFields {
                first_name: self.first_name,
                last_name: self.last_name,
                email: self.email,
                department: self.department,
                position: self.position,
                age: self.age,
                salary: self.salary,
                hire_date,
            },
            version: u64::try_from(self.version)
                .map_err(|e| internal_error(format!("Invalid version: {}", e)))?,
            created_at: parse_timestamp(&self.created_at, "created_at")?,
            updated_at: parse_timestamp(&self.updated_at, "updated_at")?,
        })
    }
}

fn parse_timestamp(value: &str, column: &str) -> StorageResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| internal_error(format!("Failed to parse {}: {}", column, e)))
}

fn format_date(date: Option<NaiveDate>) -> Option<String> {
    date.map(|d| d.format(DATE_FORMAT).to_string())
}

/// Lookup columns that may be used in [`select_employee`].
#[derive(Debug, Clone, Copy)]
pub(crate) enum EmployeeKey<'a> {
    Id(i64),
    Username(&'a str),
    PhoneNumber(&'a str),
}

pub(crate) fn select_employee(
    conn: &Connection,
    key: EmployeeKey<'_>,
) -> StorageResult<Option<Employee>> {
    let row = match key {
        EmployeeKey::Id(id) => conn
            .query_row(
                &format!("SELECT {} FROM employees WHERE id = ?1", EMPLOYEE_COLUMNS),
                params![id],
                EmployeeRow::read,
            )
            .optional()?,
        EmployeeKey::Username(username) => conn
            .query_row(
                &format!(
                    "SELECT {} FROM employees WHERE username = ?1",
                    EMPLOYEE_COLUMNS
                ),
                params![username],
                EmployeeRow::read,
            )
            .optional()?,
        EmployeeKey::PhoneNumber(phone) => conn
            .query_row(
                &format!(
                    "SELECT {} FROM employees WHERE phone_number = ?1 ORDER BY id LIMIT 1",
                    EMPLOYEE_COLUMNS
                ),
                params![phone],
                EmployeeRow::read,
            )
            .optional()?,
    };

    row.map(EmployeeRow::into_employee).transpose()
}

pub(crate) fn insert_employee(
    conn: &Connection,
    employee: &NewEmployee,
) -> StorageResult<Employee> {
    let now = Utc::now().to_rfc3339();
    let fields = &employee.fields;

    let result = conn.execute(
        "INSERT INTO employees (username, phone_number, first_name, last_name, email,
             department, position, age, salary, hire_date, version, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, 1, ?11, ?11)",
        params![
            employee.username,
            employee.phone_number,
            fields.first_name,
            fields.last_name,
            fields.email,
            fields.department,
            fields.position,
            fields.age,
            fields.salary,
            format_date(fields.hire_date),
            now,
        ],
    );

    match result {
        Ok(_) => {}
        Err(rusqlite::Error::SqliteFailure(code, _))
            if code.code == rusqlite::ErrorCode::ConstraintViolation =>
        {
            return Err(StorageError::Resource(ResourceError::employee_exists(
                "username",
                &employee.username,
            )));
        }
        Err(e) => return Err(e.into()),
    }

    let id = conn.last_insert_rowid();
    select_employee(conn, EmployeeKey::Id(id))?
        .ok_or_else(|| internal_error(format!("Inserted employee {} not readable", id)))
}

/// Writes the mutable state of `employee`. Identity and username are
/// matched, never written.
pub(crate) fn update_employee(conn: &Connection, employee: &Employee) -> StorageResult<Employee> {
    let now = Utc::now().to_rfc3339();
    let fields = &employee.fields;

    let changed = conn.execute(
        "UPDATE employees SET phone_number = ?1, first_name = ?2, last_name = ?3, email = ?4,
             department = ?5, position = ?6, age = ?7, salary = ?8, hire_date = ?9,
             version = version + 1, updated_at = ?10
         WHERE id = ?11",
        params![
            employee.phone_number,
            fields.first_name,
            fields.last_name,
            fields.email,
            fields.department,
            fields.position,
            fields.age,
            fields.salary,
            format_date(fields.hire_date),
            now,
            employee.id,
        ],
    )?;

    if changed == 0 {
        return Err(StorageError::Resource(ResourceError::employee_not_found(
            "id",
            employee.id,
        )));
    }

    select_employee(conn, EmployeeKey::Id(employee.id))?
        .ok_or_else(|| ResourceError::employee_not_found("id", employee.id).into())
}

#[async_trait]
impl EmployeeStorage for SqliteBackend {
    fn backend_name(&self) -> &'static str {
        "sqlite"
    }

    async fn find_by_id(&self, id: i64) -> StorageResult<Option<Employee>> {
        let conn = self.get_connection()?;
        select_employee(&conn, EmployeeKey::Id(id))
    }

    async fn find_by_username(&self, username: &str) -> StorageResult<Option<Employee>> {
        let conn = self.get_connection()?;
        select_employee(&conn, EmployeeKey::Username(username))
    }

    async fn find_by_phone_number(&self, phone_number: &str) -> StorageResult<Option<Employee>> {
        let conn = self.get_connection()?;
        select_employee(&conn, EmployeeKey::PhoneNumber(phone_number))
    }

    async fn list(&self, offset: u64, limit: u32) -> StorageResult<Vec<Employee>> {
        let conn = self.get_connection()?;
        let offset = i64::try_from(offset).unwrap_or(i64::MAX);

        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM employees ORDER BY id LIMIT ?1 OFFSET ?2",
            EMPLOYEE_COLUMNS
        ))?;
        let rows = stmt
            .query_map(params![limit, offset], EmployeeRow::read)?
            .collect::<Result<Vec<_>, _>>()?;

        rows.into_iter().map(EmployeeRow::into_employee).collect()
    }

    async fn count(&self) -> StorageResult<u64> {
        let conn = self.get_connection()?;
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM employees", [], |row| row.get(0))?;
        Ok(u64::try_from(count).unwrap_or(0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_test_backend() -> SqliteBackend {
        let backend = SqliteBackend::in_memory().unwrap();
        backend.init_schema().unwrap();
        backend
    }

    fn new_employee(username: &str, phone: &str) -> NewEmployee {
        NewEmployee {
            username: username.to_string(),
            phone_number: phone.to_string(),
            fields: EmployeeFields {
                department: Some("Engineering".to_string()),
                age: Some(35),
                salary: Some(72000.5),
                hire_date: NaiveDate::from_ymd_opt(2019, 4, 1),
                ..Default::default()
            },
        }
    }

    #[tokio::test]
    async fn test_insert_and_read() {
        let backend = create_test_backend();
        let inserted = {
            let conn = backend.get_connection().unwrap();
            insert_employee(&conn, &new_employee("jdoe", "555-0100")).unwrap()
        };

        assert_eq!(inserted.version, 1);
        assert_eq!(inserted.fields.hire_date, NaiveDate::from_ymd_opt(2019, 4, 1));

        let by_id = backend.find_by_id(inserted.id).await.unwrap().unwrap();
        assert_eq!(by_id, inserted);

        let by_name = backend.find_by_username("jdoe").await.unwrap().unwrap();
        assert_eq!(by_name.id, inserted.id);

        let by_phone = backend.find_by_phone_number("555-0100").await.unwrap();
        assert!(by_phone.is_some());

        assert!(backend.find_by_username("nobody").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_duplicate_username_is_conflict() {
        let backend = create_test_backend();
        let conn = backend.get_connection().unwrap();
        insert_employee(&conn, &new_employee("jdoe", "555-0100")).unwrap();

        let err = insert_employee(&conn, &new_employee("jdoe", "555-0199")).unwrap_err();
        assert!(matches!(
            err,
            StorageError::Resource(ResourceError::AlreadyExists { .. })
        ));
    }

    #[tokio::test]
    async fn test_update_bumps_version_and_keeps_username() {
        let backend = create_test_backend();
        let updated = {
            let conn = backend.get_connection().unwrap();
            let mut employee = insert_employee(&conn, &new_employee("jdoe", "555-0100")).unwrap();
            employee.username = "ignored".to_string();
            employee.fields.position = Some("Lead".to_string());
            update_employee(&conn, &employee).unwrap()
        };

        assert_eq!(updated.version, 2);
        assert_eq!(updated.username, "jdoe");
        assert_eq!(updated.fields.position.as_deref(), Some("Lead"));
    }

    #[tokio::test]
    async fn test_update_missing_is_not_found() {
        let backend = create_test_backend();
        let conn = backend.get_connection().unwrap();
        let mut employee = insert_employee(&conn, &new_employee("jdoe", "555-0100")).unwrap();
        employee.id = 999;

        let err = update_employee(&conn, &employee).unwrap_err();
        assert!(matches!(
            err,
            StorageError::Resource(ResourceError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_list_and_count() {
        let backend = create_test_backend();
        {
            let conn = backend.get_connection().unwrap();
            for i in 0..5 {
                insert_employee(&conn, &new_employee(&format!("user{}", i), &format!("555-{}", i)))
                    .unwrap();
            }
        }

        assert_eq!(backend.count().await.unwrap(), 5);
        let page = backend.list(1, 2).await.unwrap();
        assert_eq!(page.len(), 2);
        assert_eq!(page[0].username, "user1");
        assert_eq!(page[1].username, "user2");
    }
}

//! Relational source contracts and SQLite implementation.
//!
//! # Responsibility
//! - Page employee root rows in stable `emp_no` order.
//! - Batch-fetch child rows for one page with a single query per child kind.
//! - Load the read-once reference data (departments, annotated manager tenures).
//! - Create and drop helper indexes keyed by `emp_no`.
//!
//! # Invariants
//! - Pages are ordered by `emp_no` and never overlap while the source is unchanged.
//! - Child rows keep primary-key order of their table.
//! - Schema and index names are validated before they reach SQL text.

use crate::db::validate_identifier;
use crate::model::employee::{
    Department, DepartmentTenure, EmpNo, Employee, Gender, ManagerTenure, SalaryRecord, Tenure,
    TitleRecord,
};
use crate::repo::{RepoError, RepoResult};
use rusqlite::{params, Connection, Row};

/// Source tables and the columns this migration reads from each.
const REQUIRED_COLUMNS: &[(&str, &[&str])] = &[
    (
        "employees",
        &[
            "emp_no",
            "birth_date",
            "first_name",
            "last_name",
            "gender",
            "hire_date",
        ],
    ),
    ("salaries", &["emp_no", "salary", "from_date", "to_date"]),
    ("titles", &["emp_no", "title", "from_date", "to_date"]),
    ("departments", &["dept_no", "dept_name"]),
    ("dept_emp", &["emp_no", "dept_no", "from_date", "to_date"]),
    ("dept_manager", &["emp_no", "dept_no", "from_date", "to_date"]),
];

/// Tables that receive a transient `emp_no` helper index during a run.
pub const HELPER_INDEX_TABLES: &[&str] =
    &["employees", "salaries", "titles", "dept_emp", "dept_manager"];

/// Transient source index on `<table>(emp_no)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HelperIndex {
    pub table: &'static str,
}

impl HelperIndex {
    pub fn new(table: &'static str) -> Self {
        Self { table }
    }

    /// Index name, unique per database.
    pub fn name(&self) -> String {
        format!("idx_empdoc_{}_emp_no", self.table)
    }

    /// Returns the helper index set covering every per-employee lookup.
    pub fn all() -> Vec<Self> {
        HELPER_INDEX_TABLES.iter().copied().map(Self::new).collect()
    }
}

/// Manager tenure annotated with the manager's own first name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnnotatedManagerTenure {
    pub tenure: ManagerTenure,
    /// `None` when the manager has no row in `employees`.
    pub first_name: Option<String>,
}

/// Child rows for one `emp_no` range, each vector in primary-key order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChildRows {
    pub salaries: Vec<SalaryRecord>,
    pub titles: Vec<TitleRecord>,
    pub departments: Vec<DepartmentTenure>,
    pub managed: Vec<ManagerTenure>,
}

/// Read contract over the relational source.
pub trait SourceRepository {
    /// Returns up to `page_size` employees of zero-based page `page_index`.
    ///
    /// An empty vector means the source is exhausted.
    fn fetch_employee_page(&self, page_index: u64, page_size: u32) -> RepoResult<Vec<Employee>>;
    /// Returns every child row whose `emp_no` lies in `[first, last]`.
    fn fetch_children(&self, first: EmpNo, last: EmpNo) -> RepoResult<ChildRows>;
    /// Returns all departments.
    fn load_departments(&self) -> RepoResult<Vec<Department>>;
    /// Returns every manager tenure joined with the manager's first name.
    fn load_manager_tenures(&self) -> RepoResult<Vec<AnnotatedManagerTenure>>;
    /// Creates `index` unless an index with that name already exists.
    ///
    /// Returns `true` only when this call created it.
    fn create_helper_index(&self, index: &HelperIndex) -> RepoResult<bool>;
    /// Drops `index` when present.
    fn drop_helper_index(&self, index: &HelperIndex) -> RepoResult<()>;
}

/// SQLite-backed source repository.
pub struct SqliteSourceRepository<'conn> {
    conn: &'conn Connection,
    schema: String,
}

impl<'conn> SqliteSourceRepository<'conn> {
    /// Constructs a repository over `schema` (usually `main`) and checks that
    /// the expected tables and columns exist.
    pub fn try_new(conn: &'conn Connection, schema: &str) -> RepoResult<Self> {
        let schema = validate_identifier(schema)?.to_string();
        ensure_source_ready(conn, &schema)?;
        Ok(Self { conn, schema })
    }

    fn table(&self, name: &str) -> String {
        format!("\"{}\".\"{}\"", self.schema, name)
    }
}

impl SourceRepository for SqliteSourceRepository<'_> {
    fn fetch_employee_page(&self, page_index: u64, page_size: u32) -> RepoResult<Vec<Employee>> {
        if page_size == 0 {
            return Err(RepoError::InvalidData(
                "page size must be greater than zero".to_string(),
            ));
        }
        let offset = page_index
            .checked_mul(u64::from(page_size))
            .and_then(|value| i64::try_from(value).ok())
            .ok_or_else(|| {
                RepoError::InvalidData(format!(
                    "page {page_index} of size {page_size} overflows the row offset"
                ))
            })?;

        let mut stmt = self.conn.prepare(&format!(
            "SELECT emp_no, birth_date, first_name, last_name, gender, hire_date
             FROM {}
             ORDER BY emp_no ASC
             LIMIT ?1 OFFSET ?2;",
            self.table("employees")
        ))?;
        let mut rows = stmt.query(params![i64::from(page_size), offset])?;
        let mut employees = Vec::new();
        while let Some(row) = rows.next()? {
            employees.push(parse_employee_row(row)?);
        }
        Ok(employees)
    }

    fn fetch_children(&self, first: EmpNo, last: EmpNo) -> RepoResult<ChildRows> {
        if first > last {
            return Ok(ChildRows::default());
        }

        let mut children = ChildRows::default();

        let mut stmt = self.conn.prepare(&format!(
            "SELECT emp_no, salary, from_date, to_date
             FROM {}
             WHERE emp_no BETWEEN ?1 AND ?2
             ORDER BY emp_no ASC, from_date ASC;",
            self.table("salaries")
        ))?;
        let mut rows = stmt.query(params![first, last])?;
        while let Some(row) = rows.next()? {
            children.salaries.push(SalaryRecord {
                emp_no: row.get("emp_no")?,
                salary: row.get("salary")?,
                tenure: parse_tenure(row)?,
            });
        }

        let mut stmt = self.conn.prepare(&format!(
            "SELECT emp_no, title, from_date, to_date
             FROM {}
             WHERE emp_no BETWEEN ?1 AND ?2
             ORDER BY emp_no ASC, title ASC, from_date ASC;",
            self.table("titles")
        ))?;
        let mut rows = stmt.query(params![first, last])?;
        while let Some(row) = rows.next()? {
            children.titles.push(TitleRecord {
                emp_no: row.get("emp_no")?,
                title: row.get("title")?,
                tenure: parse_tenure(row)?,
            });
        }

        let mut stmt = self.conn.prepare(&format!(
            "SELECT
                de.emp_no AS emp_no,
                de.dept_no AS dept_no,
                d.dept_name AS dept_name,
                de.from_date AS from_date,
                de.to_date AS to_date
             FROM {} de
             LEFT JOIN {} d ON d.dept_no = de.dept_no
             WHERE de.emp_no BETWEEN ?1 AND ?2
             ORDER BY de.emp_no ASC, de.dept_no ASC;",
            self.table("dept_emp"),
            self.table("departments")
        ))?;
        let mut rows = stmt.query(params![first, last])?;
        while let Some(row) = rows.next()? {
            children.departments.push(DepartmentTenure {
                emp_no: row.get("emp_no")?,
                dept_no: row.get("dept_no")?,
                dept_name: row.get("dept_name")?,
                tenure: parse_tenure(row)?,
            });
        }

        let mut stmt = self.conn.prepare(&format!(
            "SELECT emp_no, dept_no, from_date, to_date
             FROM {}
             WHERE emp_no BETWEEN ?1 AND ?2
             ORDER BY emp_no ASC, dept_no ASC;",
            self.table("dept_manager")
        ))?;
        let mut rows = stmt.query(params![first, last])?;
        while let Some(row) = rows.next()? {
            children.managed.push(parse_manager_tenure_row(row)?);
        }

        Ok(children)
    }

    fn load_departments(&self) -> RepoResult<Vec<Department>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT dept_no, dept_name FROM {} ORDER BY dept_no ASC;",
            self.table("departments")
        ))?;
        let mut rows = stmt.query([])?;
        let mut departments = Vec::new();
        while let Some(row) = rows.next()? {
            departments.push(Department {
                dept_no: row.get("dept_no")?,
                dept_name: row.get("dept_name")?,
            });
        }
        Ok(departments)
    }

    fn load_manager_tenures(&self) -> RepoResult<Vec<AnnotatedManagerTenure>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT
                dm.emp_no AS emp_no,
                dm.dept_no AS dept_no,
                dm.from_date AS from_date,
                dm.to_date AS to_date,
                e.first_name AS first_name
             FROM {} dm
             LEFT JOIN {} e ON e.emp_no = dm.emp_no
             ORDER BY dm.emp_no ASC, dm.dept_no ASC;",
            self.table("dept_manager"),
            self.table("employees")
        ))?;
        let mut rows = stmt.query([])?;
        let mut tenures = Vec::new();
        while let Some(row) = rows.next()? {
            tenures.push(AnnotatedManagerTenure {
                tenure: parse_manager_tenure_row(row)?,
                first_name: row.get("first_name")?,
            });
        }
        Ok(tenures)
    }

    fn create_helper_index(&self, index: &HelperIndex) -> RepoResult<bool> {
        let name = index.name();
        validate_identifier(&name)?;
        validate_identifier(index.table)?;
        if index_exists(self.conn, &self.schema, &name)? {
            return Ok(false);
        }

        self.conn.execute_batch(&format!(
            "CREATE INDEX \"{}\".\"{}\" ON \"{}\" (emp_no);",
            self.schema, name, index.table
        ))?;
        Ok(true)
    }

    fn drop_helper_index(&self, index: &HelperIndex) -> RepoResult<()> {
        let name = index.name();
        validate_identifier(&name)?;
        self.conn.execute_batch(&format!(
            "DROP INDEX IF EXISTS \"{}\".\"{}\";",
            self.schema, name
        ))?;
        Ok(())
    }
}

fn parse_employee_row(row: &Row<'_>) -> RepoResult<Employee> {
    let emp_no: EmpNo = row.get("emp_no")?;
    let gender_text: String = row.get("gender")?;
    let gender = Gender::from_db(&gender_text).ok_or_else(|| {
        RepoError::InvalidData(format!(
            "invalid gender `{gender_text}` in employees.gender for emp_no {emp_no}"
        ))
    })?;

    Ok(Employee {
        emp_no,
        birth_date: row.get("birth_date")?,
        first_name: row.get("first_name")?,
        last_name: row.get("last_name")?,
        gender,
        hire_date: row.get("hire_date")?,
    })
}

fn parse_manager_tenure_row(row: &Row<'_>) -> RepoResult<ManagerTenure> {
    Ok(ManagerTenure {
        emp_no: row.get("emp_no")?,
        dept_no: row.get("dept_no")?,
        tenure: parse_tenure(row)?,
    })
}

fn parse_tenure(row: &Row<'_>) -> RepoResult<Tenure> {
    Ok(Tenure::new(row.get("from_date")?, row.get("to_date")?))
}

fn ensure_source_ready(conn: &Connection, schema: &str) -> RepoResult<()> {
    for (table, columns) in REQUIRED_COLUMNS {
        if !table_exists(conn, schema, table)? {
            return Err(RepoError::MissingRequiredTable(format!("{schema}.{table}")));
        }
        for &column in columns.iter() {
            if !table_has_column(conn, schema, table, column)? {
                return Err(RepoError::MissingRequiredColumn {
                    table: format!("{schema}.{table}"),
                    column,
                });
            }
        }
    }
    Ok(())
}

fn table_exists(conn: &Connection, schema: &str, table: &str) -> RepoResult<bool> {
    let exists: i64 = conn.query_row(
        &format!(
            "SELECT EXISTS(
                SELECT 1
                FROM \"{schema}\".sqlite_master
                WHERE type = 'table' AND name = ?1
            );"
        ),
        [table],
        |row| row.get(0),
    )?;
    Ok(exists == 1)
}

fn table_has_column(conn: &Connection, schema: &str, table: &str, column: &str) -> RepoResult<bool> {
    let mut stmt = conn.prepare(&format!("PRAGMA \"{schema}\".table_info(\"{table}\");"))?;
    let mut rows = stmt.query([])?;
    while let Some(row) = rows.next()? {
        let current: String = row.get(1)?;
        if current == column {
            return Ok(true);
        }
    }
    Ok(false)
}

fn index_exists(conn: &Connection, schema: &str, name: &str) -> RepoResult<bool> {
    let exists: i64 = conn.query_row(
        &format!(
            "SELECT EXISTS(
                SELECT 1
                FROM \"{schema}\".sqlite_master
                WHERE type = 'index' AND name = ?1
            );"
        ),
        [name],
        |row| row.get(0),
    )?;
    Ok(exists == 1)
}

#[cfg(test)]
mod tests {
    use super::HelperIndex;

    #[test]
    fn helper_index_names_are_unique_per_table() {
        let names: Vec<String> = HelperIndex::all().iter().map(HelperIndex::name).collect();
        assert_eq!(names.len(), 5);
        assert!(names.contains(&"idx_empdoc_salaries_emp_no".to_string()));
        let mut deduped = names.clone();
        deduped.sort();
        deduped.dedup();
        assert_eq!(deduped.len(), names.len());
    }
}

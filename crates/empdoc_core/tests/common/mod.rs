#![allow(dead_code)]

use chrono::NaiveDate;
use empdoc_core::sentinel_end_date;
use rusqlite::{params, Connection};

const SOURCE_SCHEMA_SQL: &str = "
CREATE TABLE employees (
    emp_no INTEGER PRIMARY KEY NOT NULL,
    birth_date TEXT NOT NULL,
    first_name TEXT NOT NULL,
    last_name TEXT NOT NULL,
    gender TEXT NOT NULL CHECK (gender IN ('M', 'F')),
    hire_date TEXT NOT NULL
);
CREATE TABLE departments (
    dept_no TEXT PRIMARY KEY NOT NULL,
    dept_name TEXT NOT NULL UNIQUE
);
CREATE TABLE salaries (
    emp_no INTEGER NOT NULL,
    salary INTEGER NOT NULL,
    from_date TEXT NOT NULL,
    to_date TEXT NOT NULL,
    PRIMARY KEY (emp_no, from_date)
);
CREATE TABLE titles (
    emp_no INTEGER NOT NULL,
    title TEXT NOT NULL,
    from_date TEXT NOT NULL,
    to_date TEXT NOT NULL,
    PRIMARY KEY (emp_no, title, from_date)
);
CREATE TABLE dept_emp (
    emp_no INTEGER NOT NULL,
    dept_no TEXT NOT NULL,
    from_date TEXT NOT NULL,
    to_date TEXT NOT NULL,
    PRIMARY KEY (emp_no, dept_no)
);
CREATE TABLE dept_manager (
    emp_no INTEGER NOT NULL,
    dept_no TEXT NOT NULL,
    from_date TEXT NOT NULL,
    to_date TEXT NOT NULL,
    PRIMARY KEY (emp_no, dept_no)
);
";

pub fn date(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).unwrap()
}

pub fn forever() -> NaiveDate {
    sentinel_end_date()
}

/// In-memory source database with the `employees` schema and no rows.
pub fn source_in_memory() -> Connection {
    let conn = Connection::open_in_memory().unwrap();
    create_source_schema(&conn);
    conn
}

/// File-backed source database with the `employees` schema and no rows.
pub fn source_file(path: &std::path::Path) -> Connection {
    let conn = Connection::open(path).unwrap();
    create_source_schema(&conn);
    conn
}

pub fn create_source_schema(conn: &Connection) {
    conn.execute_batch(SOURCE_SCHEMA_SQL).unwrap();
}

pub fn insert_employee(conn: &Connection, emp_no: i64, first_name: &str) {
    conn.execute(
        "INSERT INTO employees (emp_no, birth_date, first_name, last_name, gender, hire_date)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6);",
        params![
            emp_no,
            date(1960, 1, 1),
            first_name,
            format!("Last{emp_no}"),
            if emp_no % 2 == 0 { "F" } else { "M" },
            date(1990, 1, 1),
        ],
    )
    .unwrap();
}

pub fn insert_department(conn: &Connection, dept_no: &str, dept_name: &str) {
    conn.execute(
        "INSERT INTO departments (dept_no, dept_name) VALUES (?1, ?2);",
        params![dept_no, dept_name],
    )
    .unwrap();
}

pub fn insert_salary(conn: &Connection, emp_no: i64, salary: i64, from: NaiveDate, to: NaiveDate) {
    conn.execute(
        "INSERT INTO salaries (emp_no, salary, from_date, to_date) VALUES (?1, ?2, ?3, ?4);",
        params![emp_no, salary, from, to],
    )
    .unwrap();
}

pub fn insert_title(conn: &Connection, emp_no: i64, title: &str, from: NaiveDate, to: NaiveDate) {
    conn.execute(
        "INSERT INTO titles (emp_no, title, from_date, to_date) VALUES (?1, ?2, ?3, ?4);",
        params![emp_no, title, from, to],
    )
    .unwrap();
}

pub fn insert_dept_emp(conn: &Connection, emp_no: i64, dept_no: &str, from: NaiveDate, to: NaiveDate) {
    conn.execute(
        "INSERT INTO dept_emp (emp_no, dept_no, from_date, to_date) VALUES (?1, ?2, ?3, ?4);",
        params![emp_no, dept_no, from, to],
    )
    .unwrap();
}

pub fn insert_dept_manager(
    conn: &Connection,
    emp_no: i64,
    dept_no: &str,
    from: NaiveDate,
    to: NaiveDate,
) {
    conn.execute(
        "INSERT INTO dept_manager (emp_no, dept_no, from_date, to_date) VALUES (?1, ?2, ?3, ?4);",
        params![emp_no, dept_no, from, to],
    )
    .unwrap();
}

/// Seeds `count` employees with identifiers `10001, 10004, 10007, ...`,
/// each with one salary, one title and one department tenure in `d001`.
///
/// Returns the seeded identifiers in ascending order.
pub fn seed_employees(conn: &Connection, count: i64) -> Vec<i64> {
    insert_department(conn, "d001", "Marketing");
    let mut ids = Vec::new();
    for index in 0..count {
        let emp_no = 10001 + index * 3;
        insert_employee(conn, emp_no, &format!("First{emp_no}"));
        insert_salary(conn, emp_no, 40_000 + index, date(1990, 1, 1), forever());
        insert_title(conn, emp_no, "Engineer", date(1990, 1, 1), forever());
        insert_dept_emp(conn, emp_no, "d001", date(1990, 1, 1), forever());
        ids.push(emp_no);
    }
    ids
}

pub fn index_exists(conn: &Connection, name: &str) -> bool {
    let exists: i64 = conn
        .query_row(
            "SELECT EXISTS(
                SELECT 1
                FROM sqlite_master
                WHERE type = 'index' AND name = ?1
            );",
            [name],
            |row| row.get(0),
        )
        .unwrap();
    exists == 1
}

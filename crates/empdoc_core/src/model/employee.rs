//! Relational source rows.
//!
//! # Responsibility
//! - Mirror the `employees` schema tables as plain values.
//! - Provide the shared tenure interval used by every time-varying row.
//!
//! # Invariants
//! - Rows are read-only snapshots; the migration never writes them back.
//! - `to_date` equal to [`sentinel_end_date`] means "still in effect".

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Employee identifier, shared by source rows and destination documents.
pub type EmpNo = i64;

/// Department identifier such as `d005`.
pub type DeptNo = String;

/// Returns the far-future `to_date` used for currently active tenures.
pub fn sentinel_end_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(9999, 1, 1).unwrap_or(NaiveDate::MAX)
}

/// Two-valued gender column of the `employees` table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Gender {
    #[serde(rename = "M")]
    Male,
    #[serde(rename = "F")]
    Female,
}

impl Gender {
    /// Parses the stored column value (`M` or `F`).
    pub fn from_db(value: &str) -> Option<Self> {
        match value {
            "M" => Some(Self::Male),
            "F" => Some(Self::Female),
            _ => None,
        }
    }
}

/// Validity window `[from_date, to_date)` of a time-varying fact.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tenure {
    pub from_date: NaiveDate,
    pub to_date: NaiveDate,
}

impl Tenure {
    pub fn new(from_date: NaiveDate, to_date: NaiveDate) -> Self {
        Self { from_date, to_date }
    }

    /// Whether this tenure carries the sentinel end date.
    pub fn is_open_ended(&self) -> bool {
        self.to_date == sentinel_end_date()
    }
}

/// Root record of the `employees` table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Employee {
    pub emp_no: EmpNo,
    pub birth_date: NaiveDate,
    pub first_name: String,
    pub last_name: String,
    pub gender: Gender,
    pub hire_date: NaiveDate,
}

/// One row of `salaries`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SalaryRecord {
    pub emp_no: EmpNo,
    pub salary: i64,
    pub tenure: Tenure,
}

/// One row of `titles`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TitleRecord {
    pub emp_no: EmpNo,
    pub title: String,
    pub tenure: Tenure,
}

/// One row of `dept_emp`, joined with the department display name.
///
/// `dept_name` is `None` when `dept_no` has no row in `departments`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DepartmentTenure {
    pub emp_no: EmpNo,
    pub dept_no: DeptNo,
    pub dept_name: Option<String>,
    pub tenure: Tenure,
}

/// One row of `dept_manager`: `emp_no` managed `dept_no` during `tenure`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManagerTenure {
    pub emp_no: EmpNo,
    pub dept_no: DeptNo,
    pub tenure: Tenure,
}

/// Static reference row of `departments`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Department {
    pub dept_no: DeptNo,
    pub dept_name: String,
}

#[cfg(test)]
mod tests {
    use super::{sentinel_end_date, Gender, Tenure};
    use chrono::NaiveDate;

    #[test]
    fn gender_parses_only_known_codes() {
        assert_eq!(Gender::from_db("M"), Some(Gender::Male));
        assert_eq!(Gender::from_db("F"), Some(Gender::Female));
        assert_eq!(Gender::from_db("m"), None);
    }

    #[test]
    fn sentinel_marks_open_ended_tenure() {
        let from = NaiveDate::from_ymd_opt(1999, 3, 1).unwrap();
        assert!(Tenure::new(from, sentinel_end_date()).is_open_ended());
        assert!(!Tenure::new(from, NaiveDate::from_ymd_opt(2001, 1, 1).unwrap()).is_open_ended());
    }
}

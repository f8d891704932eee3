//! Denormalized employee document written to the destination store.
//!
//! Field names and nesting are part of the downstream read contract; keep
//! them in sync with readers of the `employees` collection.

use crate::model::employee::{DeptNo, EmpNo, Gender};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// One employee folded together with every child row that references it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmployeeDocument {
    pub emp_no: EmpNo,
    pub birth_date: NaiveDate,
    pub first_name: String,
    pub last_name: String,
    pub gender: Gender,
    pub hire_date: NaiveDate,
    pub salaries: Vec<SalaryEntry>,
    pub titles: Vec<TitleEntry>,
    pub departments: Vec<DepartmentEntry>,
    /// Departments this employee managed.
    pub manager_at: Vec<ManagerAtEntry>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SalaryEntry {
    pub salary: i64,
    pub from_date: NaiveDate,
    pub to_date: NaiveDate,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TitleEntry {
    pub title: String,
    pub from_date: NaiveDate,
    pub to_date: NaiveDate,
}

/// Department tenure with the managers whose tenure matched it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DepartmentEntry {
    pub dept_no: DeptNo,
    /// `null` when the department is missing from the lookup.
    pub department_name: Option<String>,
    pub from_date: NaiveDate,
    pub to_date: NaiveDate,
    pub managers: Vec<ManagerEntry>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManagerEntry {
    pub emp_no: EmpNo,
    /// `null` when the manager has no `employees` row.
    pub first_name: Option<String>,
    pub from_date: NaiveDate,
    pub to_date: NaiveDate,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManagerAtEntry {
    pub dept_no: DeptNo,
    pub dept_name: Option<String>,
    pub from_date: NaiveDate,
    pub to_date: NaiveDate,
}

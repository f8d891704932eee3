//! Relationship resolution for one page of employees.
//!
//! # Responsibility
//! - Fetch child rows for a whole page in one query per child kind.
//! - Partition child rows per employee.
//! - Attach covering managers to each department tenure and department names
//!   to each managed department.
//!
//! # Invariants
//! - Every employee of the page gets an entry, even with no child rows.
//! - Child rows keep retrieval order; nothing is re-sorted here.
//! - Unresolved department or manager names become `None`, never an error.

use crate::model::document::ManagerEntry;
use crate::model::employee::{
    DepartmentTenure, EmpNo, Employee, ManagerTenure, SalaryRecord, TitleRecord,
};
use crate::repo::source_repo::{ChildRows, SourceRepository};
use crate::repo::RepoResult;
use crate::service::lookup::{LookupContext, OverlapRule};
use std::collections::BTreeMap;

/// Raw child rows that belong to one employee.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EmployeeChildren {
    pub salaries: Vec<SalaryRecord>,
    pub titles: Vec<TitleRecord>,
    pub departments: Vec<DepartmentTenure>,
    pub managed: Vec<ManagerTenure>,
}

/// Department tenure plus the manager tenures matched against it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedDepartment {
    pub tenure: DepartmentTenure,
    pub managers: Vec<ManagerEntry>,
}

/// Managed department tenure with its resolved display name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedManagement {
    pub tenure: ManagerTenure,
    pub dept_name: Option<String>,
}

/// Fully resolved child collections for one employee.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolvedChildren {
    pub salaries: Vec<SalaryRecord>,
    pub titles: Vec<TitleRecord>,
    pub departments: Vec<ResolvedDepartment>,
    pub manager_at: Vec<ResolvedManagement>,
}

/// Fetches the child rows of every employee in `page`.
///
/// `page` must be ordered by `emp_no`, as returned by
/// [`SourceRepository::fetch_employee_page`]; the fetch covers the
/// `[first, last]` identifier range of the page.
pub fn fetch_page_children<S: SourceRepository + ?Sized>(
    source: &S,
    page: &[Employee],
) -> RepoResult<BTreeMap<EmpNo, EmployeeChildren>> {
    let (Some(first), Some(last)) = (page.first(), page.last()) else {
        return Ok(BTreeMap::new());
    };
    let rows = source.fetch_children(first.emp_no, last.emp_no)?;
    Ok(group_children(page, rows))
}

/// Partitions `rows` by employee.
///
/// Rows whose `emp_no` is not part of `page` are discarded.
pub fn group_children(page: &[Employee], rows: ChildRows) -> BTreeMap<EmpNo, EmployeeChildren> {
    let mut grouped: BTreeMap<EmpNo, EmployeeChildren> = page
        .iter()
        .map(|employee| (employee.emp_no, EmployeeChildren::default()))
        .collect();

    for salary in rows.salaries {
        if let Some(children) = grouped.get_mut(&salary.emp_no) {
            children.salaries.push(salary);
        }
    }
    for title in rows.titles {
        if let Some(children) = grouped.get_mut(&title.emp_no) {
            children.titles.push(title);
        }
    }
    for department in rows.departments {
        if let Some(children) = grouped.get_mut(&department.emp_no) {
            children.departments.push(department);
        }
    }
    for managed in rows.managed {
        if let Some(children) = grouped.get_mut(&managed.emp_no) {
            children.managed.push(managed);
        }
    }

    grouped
}

/// Resolves names and covering managers for one employee's children.
pub fn resolve_children(
    children: EmployeeChildren,
    lookups: &LookupContext,
    rule: OverlapRule,
) -> ResolvedChildren {
    let departments = children
        .departments
        .into_iter()
        .map(|mut tenure| {
            if tenure.dept_name.is_none() {
                tenure.dept_name = lookups.departments.name(&tenure.dept_no).map(str::to_string);
            }
            let managers = lookups
                .managers
                .covering(&tenure.dept_no, &tenure.tenure, rule);
            ResolvedDepartment { tenure, managers }
        })
        .collect();

    let manager_at = children
        .managed
        .into_iter()
        .map(|tenure| {
            let dept_name = lookups.departments.name(&tenure.dept_no).map(str::to_string);
            ResolvedManagement { tenure, dept_name }
        })
        .collect();

    ResolvedChildren {
        salaries: children.salaries,
        titles: children.titles,
        departments,
        manager_at,
    }
}

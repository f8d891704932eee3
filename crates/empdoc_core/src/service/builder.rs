//! Pure assembly of the denormalized employee document.

use crate::model::document::{
    DepartmentEntry, EmployeeDocument, ManagerAtEntry, SalaryEntry, TitleEntry,
};
use crate::model::employee::Employee;
use crate::service::resolver::ResolvedChildren;

/// Folds `employee` and its resolved children into one document.
///
/// Child order is kept as retrieved. No I/O.
pub fn build_document(employee: &Employee, children: ResolvedChildren) -> EmployeeDocument {
    EmployeeDocument {
        emp_no: employee.emp_no,
        birth_date: employee.birth_date,
        first_name: employee.first_name.clone(),
        last_name: employee.last_name.clone(),
        gender: employee.gender,
        hire_date: employee.hire_date,
        salaries: children
            .salaries
            .into_iter()
            .map(|salary| SalaryEntry {
                salary: salary.salary,
                from_date: salary.tenure.from_date,
                to_date: salary.tenure.to_date,
            })
            .collect(),
        titles: children
            .titles
            .into_iter()
            .map(|title| TitleEntry {
                title: title.title,
                from_date: title.tenure.from_date,
                to_date: title.tenure.to_date,
            })
            .collect(),
        departments: children
            .departments
            .into_iter()
            .map(|department| DepartmentEntry {
                dept_no: department.tenure.dept_no,
                department_name: department.tenure.dept_name,
                from_date: department.tenure.tenure.from_date,
                to_date: department.tenure.tenure.to_date,
                managers: department.managers,
            })
            .collect(),
        manager_at: children
            .manager_at
            .into_iter()
            .map(|management| ManagerAtEntry {
                dept_no: management.tenure.dept_no,
                dept_name: management.dept_name,
                from_date: management.tenure.tenure.from_date,
                to_date: management.tenure.tenure.to_date,
            })
            .collect(),
    }
}

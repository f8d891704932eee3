//! Read-once reference tables shared by every page of a run.
//!
//! # Responsibility
//! - Materialize the department name table.
//! - Index every manager tenure by department, annotated with the manager name.
//! - Decide which manager tenures cover a department tenure.
//!
//! # Invariants
//! - Both tables are loaded once before paging and never mutated afterwards.
//! - Manager tenures keep source order within each department.

use crate::model::document::ManagerEntry;
use crate::model::employee::{Department, DeptNo, Tenure};
use crate::repo::source_repo::{AnnotatedManagerTenure, SourceRepository};
use crate::repo::RepoResult;
use log::info;
use std::collections::HashMap;
use std::fmt::{Display, Formatter};
use std::str::FromStr;

/// Predicate used to match a manager tenure against a department tenure.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OverlapRule {
    /// `m.from <= d.to OR m.to >= d.from`.
    ///
    /// Matches nearly every manager of the department. Downstream readers rely
    /// on these over-inclusive manager lists, so this stays the default.
    #[default]
    Observed,
    /// `m.from <= d.to AND m.to >= d.from`, a true interval intersection.
    Intersection,
}

impl OverlapRule {
    /// Whether `manager` covers `department` under this rule.
    pub fn matches(self, manager: &Tenure, department: &Tenure) -> bool {
        let starts_before_end = manager.from_date <= department.to_date;
        let ends_after_start = manager.to_date >= department.from_date;
        match self {
            Self::Observed => starts_before_end || ends_after_start,
            Self::Intersection => starts_before_end && ends_after_start,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Observed => "observed",
            Self::Intersection => "intersection",
        }
    }
}

impl Display for OverlapRule {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OverlapRule {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "observed" => Ok(Self::Observed),
            "intersection" => Ok(Self::Intersection),
            other => Err(format!(
                "unsupported overlap rule `{other}`; expected observed|intersection"
            )),
        }
    }
}

/// Department identifier to display name.
#[derive(Debug, Clone, Default)]
pub struct DepartmentLookup {
    names: HashMap<DeptNo, String>,
}

impl DepartmentLookup {
    pub fn from_departments(departments: Vec<Department>) -> Self {
        let names = departments
            .into_iter()
            .map(|department| (department.dept_no, department.dept_name))
            .collect();
        Self { names }
    }

    pub fn name(&self, dept_no: &str) -> Option<&str> {
        self.names.get(dept_no).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

/// Every manager tenure of the source, grouped by department.
#[derive(Debug, Clone, Default)]
pub struct ManagerTenureIndex {
    by_department: HashMap<DeptNo, Vec<AnnotatedManagerTenure>>,
    len: usize,
}

impl ManagerTenureIndex {
    pub fn from_tenures(tenures: Vec<AnnotatedManagerTenure>) -> Self {
        let len = tenures.len();
        let mut by_department: HashMap<DeptNo, Vec<AnnotatedManagerTenure>> = HashMap::new();
        for tenure in tenures {
            by_department
                .entry(tenure.tenure.dept_no.clone())
                .or_default()
                .push(tenure);
        }
        Self { by_department, len }
    }

    /// Returns the managers of `dept_no` whose tenure matches `department`
    /// under `rule`, in source order.
    pub fn covering(&self, dept_no: &str, department: &Tenure, rule: OverlapRule) -> Vec<ManagerEntry> {
        let Some(candidates) = self.by_department.get(dept_no) else {
            return Vec::new();
        };

        candidates
            .iter()
            .filter(|candidate| rule.matches(&candidate.tenure.tenure, department))
            .map(|candidate| ManagerEntry {
                emp_no: candidate.tenure.emp_no,
                first_name: candidate.first_name.clone(),
                from_date: candidate.tenure.tenure.from_date,
                to_date: candidate.tenure.tenure.to_date,
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

/// Immutable lookup state handed to every resolution step of a run.
#[derive(Debug, Clone, Default)]
pub struct LookupContext {
    pub departments: DepartmentLookup,
    pub managers: ManagerTenureIndex,
}

impl LookupContext {
    /// Loads both tables from `source` in one pass each.
    pub fn load<S: SourceRepository + ?Sized>(source: &S) -> RepoResult<Self> {
        let departments = DepartmentLookup::from_departments(source.load_departments()?);
        let managers = ManagerTenureIndex::from_tenures(source.load_manager_tenures()?);
        info!(
            "event=lookups_load module=lookup status=ok departments={} manager_tenures={}",
            departments.len(),
            managers.len()
        );
        Ok(Self {
            departments,
            managers,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::{ManagerTenureIndex, OverlapRule};
    use crate::model::employee::{sentinel_end_date, ManagerTenure, Tenure};
    use crate::repo::source_repo::AnnotatedManagerTenure;
    use chrono::NaiveDate;

    fn date(year: i32, month: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(year, month, day).unwrap()
    }

    fn manager(emp_no: i64, dept_no: &str, from: NaiveDate, to: NaiveDate) -> AnnotatedManagerTenure {
        AnnotatedManagerTenure {
            tenure: ManagerTenure {
                emp_no,
                dept_no: dept_no.to_string(),
                tenure: Tenure::new(from, to),
            },
            first_name: Some(format!("manager-{emp_no}")),
        }
    }

    #[test]
    fn observed_rule_includes_true_overlap() {
        let department = Tenure::new(date(2000, 1, 1), date(2010, 1, 1));
        let manager = Tenure::new(date(2005, 1, 1), sentinel_end_date());
        assert!(OverlapRule::Observed.matches(&manager, &department));
        assert!(OverlapRule::Intersection.matches(&manager, &department));
    }

    #[test]
    fn observed_rule_keeps_disjoint_later_manager() {
        // No calendar overlap, but `m.to >= d.from` holds, so the OR form matches.
        let department = Tenure::new(date(2000, 1, 1), date(2001, 1, 1));
        let manager = Tenure::new(date(2020, 1, 1), sentinel_end_date());
        assert!(OverlapRule::Observed.matches(&manager, &department));
        assert!(!OverlapRule::Intersection.matches(&manager, &department));
    }

    #[test]
    fn observed_rule_keeps_disjoint_earlier_manager() {
        let department = Tenure::new(date(2010, 1, 1), sentinel_end_date());
        let manager = Tenure::new(date(1990, 1, 1), date(1995, 1, 1));
        assert!(OverlapRule::Observed.matches(&manager, &department));
        assert!(!OverlapRule::Intersection.matches(&manager, &department));
    }

    #[test]
    fn covering_filters_by_department_and_keeps_order() {
        let index = ManagerTenureIndex::from_tenures(vec![
            manager(10, "d001", date(1990, 1, 1), date(1995, 1, 1)),
            manager(11, "d002", date(1990, 1, 1), sentinel_end_date()),
            manager(12, "d001", date(1995, 1, 1), sentinel_end_date()),
        ]);
        let tenure = Tenure::new(date(2000, 1, 1), sentinel_end_date());

        let observed = index.covering("d001", &tenure, OverlapRule::Observed);
        let ids: Vec<i64> = observed.iter().map(|entry| entry.emp_no).collect();
        assert_eq!(ids, vec![10, 12]);
        assert_eq!(observed[1].first_name.as_deref(), Some("manager-12"));

        let strict = index.covering("d001", &tenure, OverlapRule::Intersection);
        assert_eq!(strict.len(), 1);
        assert_eq!(strict[0].emp_no, 12);

        assert!(index.covering("d999", &tenure, OverlapRule::Observed).is_empty());
        assert_eq!(index.len(), 3);
    }

    #[test]
    fn overlap_rule_parses_names() {
        assert_eq!("Observed".parse::<OverlapRule>(), Ok(OverlapRule::Observed));
        assert_eq!(
            " intersection ".parse::<OverlapRule>(),
            Ok(OverlapRule::Intersection)
        );
        assert!("and".parse::<OverlapRule>().is_err());
    }
}

//! Deterministic lookups and aggregates over the loaded employee table.

use crate::intent::{parse_intent, ParsedIntent};
use crate::models::{EmployeeRecord, SeniorityBucket};
use crate::table::{load_table, Table};
use chrono::{Local, NaiveDate};
use once_cell::sync::OnceCell;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, warn};

pub const NAME_COLUMN: &str = "name";
pub const DEPARTMENT_COLUMN: &str = "department";
pub const TITLE_COLUMN: &str = "title";
pub const START_DATE_COLUMN: &str = "start_date";
pub const EMAIL_COLUMN: &str = "email";
pub const LOCATION_COLUMN: &str = "location";

const DAYS_PER_YEAR: f64 = 365.25;

#[derive(Debug, Error)]
pub enum AnalyticError {
    #[error("column {0:?} is not present")]
    MissingColumn(&'static str),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DepartmentStats {
    pub employee_count: usize,
    pub distinct_roles: Vec<String>,
    pub role_count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SeniorityStats {
    pub count: usize,
    pub mean_years: f64,
    pub min_years: f64,
    pub max_years: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompanyOverview {
    pub total_employees: usize,
    pub department_count: usize,
    pub unique_title_count: usize,
    pub department_breakdown: BTreeMap<String, usize>,
    pub seniority_breakdown: BTreeMap<SeniorityBucket, SeniorityStats>,
}

/// Immutable snapshot of one table load plus lazily derived service years.
pub struct StructuredQueryEngine {
    table: Arc<Table>,
    records: Vec<EmployeeRecord>,
    columns: BTreeSet<String>,
    as_of: NaiveDate,
    years: OnceCell<Vec<Option<f64>>>,
    load_error: Option<String>,
}

impl StructuredQueryEngine {
    pub fn new(table: Table) -> Self {
        let records = table.records();
        let columns = table
            .columns()
            .iter()
            .map(|c| crate::table::normalize_column(c))
            .collect();
        Self {
            table: Arc::new(table),
            records,
            columns,
            as_of: Local::now().date_naive(),
            years: OnceCell::new(),
            load_error: None,
        }
    }

    /// Loads `path`; on failure the engine serves an empty table and keeps the error.
    pub fn load(path: &Path) -> Self {
        match load_table(path) {
            Ok(table) => Self::new(table),
            Err(err) => {
                warn!(error = %err, "employee table unavailable; serving empty table");
                let mut engine = Self::new(Table::empty());
                engine.load_error = Some(err.to_string());
                engine
            }
        }
    }

    /// Date service years are measured against.
    pub fn with_reference_date(mut self, as_of: NaiveDate) -> Self {
        self.as_of = as_of;
        self.years = OnceCell::new();
        self
    }

    pub fn table(&self) -> &Arc<Table> {
        &self.table
    }

    pub fn records(&self) -> &[EmployeeRecord] {
        &self.records
    }

    pub fn load_error(&self) -> Option<&str> {
        self.load_error.as_deref()
    }

    pub fn is_loaded(&self) -> bool {
        self.load_error.is_none()
    }

    pub fn has_column(&self, column: &str) -> bool {
        self.columns.contains(column)
    }

    pub fn parse_intent(&self, text: &str) -> ParsedIntent {
        parse_intent(text)
    }

    pub fn search_by_name(&self, term: &str) -> Vec<EmployeeRecord> {
        absorb("search_by_name", self.containing(NAME_COLUMN, term))
    }

    pub fn search_by_department(&self, term: &str) -> Vec<EmployeeRecord> {
        absorb("search_by_department", self.containing(DEPARTMENT_COLUMN, term))
    }

    pub fn search_by_role(&self, term: &str) -> Vec<EmployeeRecord> {
        absorb("search_by_role", self.containing(TITLE_COLUMN, term))
    }

    pub fn search_by_location(&self, term: &str) -> Vec<EmployeeRecord> {
        absorb("search_by_location", self.containing(LOCATION_COLUMN, term))
    }

    /// Exact, case-insensitive email match.
    pub fn find_by_email(&self, email: &str) -> Option<EmployeeRecord> {
        let wanted = email.trim().to_lowercase();
        self.records
            .iter()
            .find(|r| {
                r.text(EMAIL_COLUMN)
                    .map(|e| e.trim().to_lowercase() == wanted)
                    .unwrap_or(false)
            })
            .cloned()
    }

    /// Records whose service years fall within the inclusive bounds.
    ///
    /// Rows without a parseable start date never match.
    pub fn search_by_experience(
        &self,
        min_years: Option<f64>,
        max_years: Option<f64>,
    ) -> Vec<EmployeeRecord> {
        absorb(
            "search_by_experience",
            self.experience_between(min_years, max_years),
        )
    }

    pub fn department_stats(&self) -> BTreeMap<String, DepartmentStats> {
        absorb("department_stats", self.compute_department_stats())
    }

    pub fn seniority_analysis(&self) -> BTreeMap<SeniorityBucket, SeniorityStats> {
        absorb("seniority_analysis", self.compute_seniority())
    }

    pub fn company_overview(&self) -> CompanyOverview {
        let department_breakdown = absorb("department_breakdown", self.value_counts(DEPARTMENT_COLUMN));
        let unique_title_count =
            absorb("unique_titles", self.value_counts(TITLE_COLUMN)).len();
        CompanyOverview {
            total_employees: self.records.len(),
            department_count: department_breakdown.len(),
            unique_title_count,
            department_breakdown,
            seniority_breakdown: self.seniority_analysis(),
        }
    }

    fn require(&self, column: &'static str) -> Result<(), AnalyticError> {
        if self.has_column(column) {
            Ok(())
        } else {
            Err(AnalyticError::MissingColumn(column))
        }
    }

    fn containing(
        &self,
        column: &'static str,
        term: &str,
    ) -> Result<Vec<EmployeeRecord>, AnalyticError> {
        self.require(column)?;
        let needle = term.to_lowercase();
        Ok(self
            .records
            .iter()
            .filter(|r| {
                r.text(column)
                    .map(|v| v.to_lowercase().contains(&needle))
                    .unwrap_or(false)
            })
            .cloned()
            .collect())
    }

    fn years_of_service(&self) -> &[Option<f64>] {
        self.years.get_or_init(|| {
            self.records
                .iter()
                .map(|r| {
                    r.get(START_DATE_COLUMN)
                        .and_then(|v| v.as_date())
                        .map(|start| (self.as_of - start).num_days() as f64 / DAYS_PER_YEAR)
                })
                .collect()
        })
    }

    fn experience_between(
        &self,
        min_years: Option<f64>,
        max_years: Option<f64>,
    ) -> Result<Vec<EmployeeRecord>, AnalyticError> {
        self.require(START_DATE_COLUMN)?;
        Ok(self
            .records
            .iter()
            .zip(self.years_of_service())
            .filter_map(|(record, years)| {
                let years = (*years)?;
                let above = min_years.map_or(true, |min| years >= min);
                let below = max_years.map_or(true, |max| years <= max);
                (above && below).then(|| record.clone())
            })
            .collect())
    }

    fn compute_department_stats(&self) -> Result<BTreeMap<String, DepartmentStats>, AnalyticError> {
        self.require(DEPARTMENT_COLUMN)?;
        let mut stats: BTreeMap<String, DepartmentStats> = BTreeMap::new();
        for record in &self.records {
            let Some(department) = record.text(DEPARTMENT_COLUMN) else {
                continue;
            };
            let entry = stats.entry(department).or_insert_with(|| DepartmentStats {
                employee_count: 0,
                distinct_roles: Vec::new(),
                role_count: 0,
            });
            if record.get(NAME_COLUMN).is_some() {
                entry.employee_count += 1;
            }
            if let Some(title) = record.text(TITLE_COLUMN) {
                if !entry.distinct_roles.contains(&title) {
                    entry.distinct_roles.push(title);
                    entry.role_count += 1;
                }
            }
        }
        Ok(stats)
    }

    fn compute_seniority(&self) -> Result<BTreeMap<SeniorityBucket, SeniorityStats>, AnalyticError> {
        self.require(START_DATE_COLUMN)?;
        let mut groups: BTreeMap<SeniorityBucket, Vec<f64>> = BTreeMap::new();
        for years in self.years_of_service().iter().flatten() {
            groups
                .entry(SeniorityBucket::from_years(*years))
                .or_default()
                .push(*years);
        }
        Ok(groups
            .into_iter()
            .map(|(bucket, years)| {
                let count = years.len();
                let sum: f64 = years.iter().sum();
                let min = years.iter().copied().fold(f64::INFINITY, f64::min);
                let max = years.iter().copied().fold(f64::NEG_INFINITY, f64::max);
                (
                    bucket,
                    SeniorityStats {
                        count,
                        mean_years: round2(sum / count as f64),
                        min_years: round2(min),
                        max_years: round2(max),
                    },
                )
            })
            .collect())
    }

    fn value_counts(&self, column: &'static str) -> Result<BTreeMap<String, usize>, AnalyticError> {
        self.require(column)?;
        let mut counts = BTreeMap::new();
        for value in self.records.iter().filter_map(|r| r.text(column)) {
            *counts.entry(value).or_insert(0) += 1;
        }
        Ok(counts)
    }
}

fn absorb<T: Default>(op: &'static str, result: Result<T, AnalyticError>) -> T {
    result.unwrap_or_else(|err| {
        debug!(op, error = %err, "analytic query skipped");
        T::default()
    })
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

use roster_core::query_engine::StructuredQueryEngine;
use roster_core::EmployeeRecord;
use std::collections::BTreeSet;

/// Filters from the `find` command; every given filter must match.
#[derive(Debug, Clone, Default)]
pub struct FindFilters {
    pub name: Option<String>,
    pub department: Option<String>,
    pub role: Option<String>,
    pub location: Option<String>,
    pub email: Option<String>,
    pub min_years: Option<f64>,
    pub max_years: Option<f64>,
}

impl FindFilters {
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.department.is_none()
            && self.role.is_none()
            && self.location.is_none()
            && self.email.is_none()
            && self.min_years.is_none()
            && self.max_years.is_none()
    }
}

pub fn find(engine: &StructuredQueryEngine, filters: &FindFilters) -> Vec<EmployeeRecord> {
    if filters.is_empty() {
        return engine.records().to_vec();
    }

    let mut matches: Vec<BTreeSet<usize>> = Vec::new();
    if let Some(term) = &filters.name {
        matches.push(rows(engine.search_by_name(term)));
    }
    if let Some(term) = &filters.department {
        matches.push(rows(engine.search_by_department(term)));
    }
    if let Some(term) = &filters.role {
        matches.push(rows(engine.search_by_role(term)));
    }
    if let Some(term) = &filters.location {
        matches.push(rows(engine.search_by_location(term)));
    }
    if let Some(email) = &filters.email {
        matches.push(rows(engine.find_by_email(email)));
    }
    if filters.min_years.is_some() || filters.max_years.is_some() {
        matches.push(rows(
            engine.search_by_experience(filters.min_years, filters.max_years),
        ));
    }

    let mut iter = matches.into_iter();
    let Some(first) = iter.next() else {
        return Vec::new();
    };
    let keep = iter.fold(first, |acc, set| &acc & &set);
    engine
        .records()
        .iter()
        .filter(|r| keep.contains(&r.row_index))
        .cloned()
        .collect()
}

fn rows(records: impl IntoIterator<Item = EmployeeRecord>) -> BTreeSet<usize> {
    records.into_iter().map(|r| r.row_index).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use roster_core::models::CellValue;
    use roster_core::table::Table;

    fn engine() -> StructuredQueryEngine {
        let text = |s: &str| Some(CellValue::Text(s.into()));
        let table = Table::new(
            vec!["Name".into(), "Department".into(), "Location".into()],
            vec![
                vec![text("Alice Smith"), text("Engineering"), text("Berlin")],
                vec![text("Bob Jones"), text("Sales"), text("Berlin")],
                vec![text("Alicia Keys"), text("Sales"), text("Paris")],
            ],
        );
        StructuredQueryEngine::new(table)
    }

    #[test]
    fn filters_intersect() {
        let engine = engine();
        let filters = FindFilters {
            department: Some("sales".into()),
            location: Some("berlin".into()),
            ..Default::default()
        };
        let found = find(&engine, &filters);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].text("name").as_deref(), Some("Bob Jones"));

        let filters = FindFilters {
            name: Some("ali".into()),
            ..Default::default()
        };
        assert_eq!(find(&engine, &filters).len(), 2);
    }

    #[test]
    fn no_filters_lists_everyone() {
        assert_eq!(find(&engine(), &FindFilters::default()).len(), 3);
    }
}

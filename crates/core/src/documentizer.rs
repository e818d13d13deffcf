//! Turns table rows into retrievable documents.

use crate::models::{CellValue, Document};
use crate::table::{load_table, Table, TableError};
use std::path::Path;
use tracing::warn;

/// One document per row that has at least one value.
///
/// `row_index` is the row's position in the source table, so documents stay
/// traceable even when null rows are dropped.
pub fn documentize(table: &Table) -> Vec<Document> {
    table
        .rows()
        .filter(|(_, row)| row.iter().any(Option::is_some))
        .filter_map(|(row_index, row)| {
            let content = row_content(table.columns(), row);
            if content.trim().is_empty() {
                None
            } else {
                Some(Document::new(content, row_index))
            }
        })
        .collect()
}

/// `"column: value"` pairs for each non-null cell, joined by `" | "`.
pub fn row_content(columns: &[String], row: &[Option<CellValue>]) -> String {
    columns
        .iter()
        .zip(row)
        .filter_map(|(col, cell)| cell.as_ref().map(|v| format!("{col}: {v}")))
        .collect::<Vec<_>>()
        .join(" | ")
}

/// Document for a single row, if it has any content.
pub fn row_document(table: &Table, row_index: usize) -> Option<Document> {
    let row = table.row(row_index)?;
    let content = row_content(table.columns(), row);
    (!content.trim().is_empty()).then(|| Document::new(content, row_index))
}

/// Loads and documentizes `path`. A load failure yields no documents plus the error.
pub fn documentize_source(path: &Path) -> (Vec<Document>, Option<TableError>) {
    match load_table(path) {
        Ok(table) => (documentize(&table), None),
        Err(err) => {
            warn!(error = %err, "could not load table; no documents produced");
            (Vec::new(), Some(err))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn text(s: &str) -> Option<CellValue> {
        Some(CellValue::Text(s.to_string()))
    }

    fn sample() -> Table {
        Table::new(
            vec!["Name".into(), "Department".into(), "Title".into()],
            vec![
                vec![None, None, None],
                vec![text("Alice Smith"), text("Engineering"), None],
                vec![text("Bob Lee"), text("Sales"), text("Account Executive")],
                vec![text("Bob Lee"), text("Sales"), text("Account Executive")],
            ],
        )
    }

    #[test]
    fn skips_null_cells_and_keeps_column_order() {
        let docs = documentize(&sample());
        assert_eq!(docs.len(), 3);
        assert_eq!(docs[0].content, "Name: Alice Smith | Department: Engineering");
        assert_eq!(docs[0].metadata.row_index, 1);
        assert_eq!(
            docs[1].content,
            "Name: Bob Lee | Department: Sales | Title: Account Executive"
        );
    }

    #[test]
    fn identical_rows_share_content_but_not_row_index() {
        let docs = documentize(&sample());
        assert_eq!(docs[1].content, docs[2].content);
        let indices: HashSet<usize> = docs.iter().map(|d| d.metadata.row_index).collect();
        assert_eq!(indices.len(), docs.len());
        assert_eq!(docs[2].metadata.row_index, 3);
    }

    #[test]
    fn null_rows_have_no_document() {
        let table = Table::new(
            vec!["Name".into()],
            vec![vec![None], vec![text("Carol")]],
        );
        let docs = documentize(&table);
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].metadata.row_index, 1);
        assert!(row_document(&table, 0).is_none());
        assert_eq!(row_document(&table, 1), Some(docs[0].clone()));
    }

    #[test]
    fn unreadable_source_yields_empty_batch_and_error() {
        let temp = tempfile::tempdir().unwrap();
        let (docs, err) = documentize_source(&temp.path().join("missing.xlsx"));
        assert!(docs.is_empty());
        assert!(matches!(err, Some(TableError::NotFound(_))));
    }
}

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashSet;
use thiserror::Error;

/// A single cell as returned by the dump backend. Most are strings, but numbers,
/// nulls and arrays (e.g. "Download Links") show up too.
pub type Cell = Value;
pub type Row = Vec<Cell>;

/// Column used to fold experiment rows into study-level groups.
pub const PRIMARY_KEY: &str = "Study Accession";
/// Columns preselected for tagging and used for the short card description.
pub const DEFAULT_COLUMNS: [&str; 2] = ["Study Title", "Study Abstract"];
pub const DOWNLOAD_LINKS: &str = "Download Links";
/// Grid columns shown when a group card is expanded; everything else starts hidden.
pub const DEFAULT_VISIBLE_COLUMNS: [&str; 11] = [
    "Experiment Accession",
    "Experiment Title",
    "Experiment ID",
    "Study Accession",
    "Study Title",
    "Sample Accession",
    "Sample Alias",
    "Taxon ID",
    "Library Name",
    "Run Accession",
    "Download Links",
];

#[derive(Debug, Error, PartialEq, Eq)]
pub enum MetadataError {
    #[error("row {row} has {found} cells, expected {expected}")]
    RaggedRow { row: usize, expected: usize, found: usize },
    #[error("duplicate column name: {0}")]
    DuplicateColumn(String),
}

/// Search results metadata: column names plus positional rows.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchMetadata {
    pub columns: Vec<String>,
    #[serde(default)]
    pub data: Vec<Row>,
}

impl SearchMetadata {
    pub fn new(columns: Vec<String>, data: Vec<Row>) -> Self { Self { columns, data } }

    pub fn is_empty(&self) -> bool { self.data.is_empty() }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// Check the shape invariants: unique column names and rows aligned to `columns`.
    pub fn validate(&self) -> Result<(), MetadataError> {
        let mut seen = HashSet::new();
        for c in &self.columns {
            if !seen.insert(c.as_str()) {
                return Err(MetadataError::DuplicateColumn(c.clone()));
            }
        }
        for (i, row) in self.data.iter().enumerate() {
            if row.len() != self.columns.len() {
                return Err(MetadataError::RaggedRow { row: i, expected: self.columns.len(), found: row.len() });
            }
        }
        Ok(())
    }
}

/// Render a cell the way it is shown and exported: arrays are comma-joined, null is empty.
pub fn cell_text(cell: &Cell) -> String {
    match cell {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::Array(items) => items.iter().map(cell_text).collect::<Vec<_>>().join(","),
        Value::Object(_) => cell.to_string(),
    }
}

/// Whether a cell counts towards a column's fill ratio.
pub fn is_filled(cell: &Cell) -> bool {
    match cell {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::String(s) => !s.is_empty(),
        Value::Number(n) => n.as_f64().map_or(true, |f| f != 0.0),
        Value::Array(items) => !items.is_empty(),
        Value::Object(_) => true,
    }
}

/// Cell lookup that tolerates short rows.
pub fn cell_at(row: &Row, index: usize) -> Option<&Cell> { row.get(index) }

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn validate_detects_ragged_rows() {
        let meta = SearchMetadata::new(vec!["A".into(), "B".into()], vec![vec![json!("x")]]);
        assert_eq!(meta.validate(), Err(MetadataError::RaggedRow { row: 0, expected: 2, found: 1 }));
    }

    #[test]
    fn validate_detects_duplicate_columns() {
        let meta = SearchMetadata::new(vec!["A".into(), "A".into()], vec![]);
        assert_eq!(meta.validate(), Err(MetadataError::DuplicateColumn("A".into())));
    }

    #[test]
    fn cell_text_and_fill() {
        assert_eq!(cell_text(&json!(["u1", "u2"])), "u1,u2");
        assert_eq!(cell_text(&json!(9606)), "9606");
        assert_eq!(cell_text(&Value::Null), "");
        assert!(!is_filled(&json!("")));
        assert!(!is_filled(&json!([])));
        assert!(!is_filled(&json!(0)));
        assert!(is_filled(&json!("x")));
    }
}

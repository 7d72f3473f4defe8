//! Concrete in-memory dataset, the shape the reader materializes into.

use crate::traits::DataSource;
use crate::{CellValue, CodecError, Result, SemanticType};
use std::collections::HashSet;

/// Name used when a dataset or file provides none.
pub(crate) const DEFAULT_NAME: &str = "dataset";

/// A named, typed column definition.
#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    pub name: String,
    pub dtype: SemanticType,
}

impl Column {
    pub fn new(name: impl Into<String>, dtype: SemanticType) -> Self {
        Self {
            name: name.into(),
            dtype,
        }
    }
}

/// An in-memory table: a name, ordered column definitions, and rows.
///
/// Owned by the caller and read-only to the codec. Cell lookups go through
/// the [`DataSource`] contract the writer consumes.
#[derive(Debug, Clone, PartialEq)]
pub struct Dataset {
    name: String,
    columns: Vec<Column>,
    rows: Vec<Vec<CellValue>>,
}

impl Dataset {
    /// Create a dataset, validating unique column names and uniform row width.
    pub fn new(
        name: impl Into<String>,
        columns: Vec<Column>,
        rows: Vec<Vec<CellValue>>,
    ) -> Result<Self> {
        let mut seen = HashSet::new();
        for column in &columns {
            if !seen.insert(column.name.as_str()) {
                return Err(CodecError::invalid_argument(format!(
                    "duplicate column name '{}'",
                    column.name
                )));
            }
        }
        for (i, row) in rows.iter().enumerate() {
            if row.len() != columns.len() {
                return Err(CodecError::invalid_argument(format!(
                    "row {} has {} values but the dataset has {} columns",
                    i,
                    row.len(),
                    columns.len()
                )));
            }
        }
        Ok(Self {
            name: name.into(),
            columns,
            rows,
        })
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<CellValue>] {
        &self.rows
    }

    /// Index of the named column, if present.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name == name)
    }
}

impl DataSource for Dataset {
    fn name(&self) -> &str {
        &self.name
    }

    fn column_count(&self) -> usize {
        self.columns.len()
    }

    fn column_name(&self, index: usize) -> &str {
        &self.columns[index].name
    }

    fn column_type(&self, index: usize) -> SemanticType {
        self.columns[index].dtype.clone()
    }

    fn row_count(&self) -> usize {
        self.rows.len()
    }

    fn value(&self, row: usize, column: usize) -> CellValue {
        self.rows[row][column].clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_duplicate_column_names_rejected() {
        let result = Dataset::new(
            "t",
            vec![
                Column::new("a", SemanticType::Int32),
                Column::new("a", SemanticType::Int64),
            ],
            vec![],
        );
        assert!(matches!(result, Err(CodecError::InvalidArgument(_))));
    }

    #[test]
    fn test_ragged_rows_rejected() {
        let result = Dataset::new(
            "t",
            vec![Column::new("a", SemanticType::Int32)],
            vec![vec![CellValue::Int32(1), CellValue::Int32(2)]],
        );
        assert!(matches!(result, Err(CodecError::InvalidArgument(_))));
    }

    #[test]
    fn test_source_contract() {
        let ds = Dataset::new(
            "people",
            vec![
                Column::new("id", SemanticType::Int64),
                Column::new("name", SemanticType::String),
            ],
            vec![vec![
                CellValue::Int64(1),
                CellValue::String("Alice".into()),
            ]],
        )
        .unwrap();

        assert_eq!(DataSource::name(&ds), "people");
        assert_eq!(ds.column_count(), 2);
        assert_eq!(ds.column_name(1), "name");
        assert_eq!(ds.row_count(), 1);
        assert_eq!(ds.value(0, 0), CellValue::Int64(1));
        assert_eq!(ds.column_index("name"), Some(1));
        assert_eq!(ds.column_index("missing"), None);
    }
}

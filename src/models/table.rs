use serde::{Deserialize, Serialize};

/// A loosely-typed table as read from disk: header names plus string cells.
///
/// Tables are treated as values. Operations that change columns return a new
/// table and leave the receiver untouched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawTable {
    origin: String,
    columns: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl RawTable {
    pub fn new(origin: impl Into<String>, columns: Vec<String>, rows: Vec<Vec<String>>) -> Self {
        Self {
            origin: origin.into(),
            columns,
            rows,
        }
    }

    /// Path or label the table was loaded from.
    pub fn origin(&self) -> &str {
        &self.origin
    }

    /// File name component of the origin.
    pub fn file_name(&self) -> &str {
        std::path::Path::new(&self.origin)
            .file_name()
            .and_then(|name| name.to_str())
            .unwrap_or(self.origin.as_str())
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }

    pub fn into_rows(self) -> Vec<Vec<String>> {
        self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Index of the first column with this name.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column_index(name).is_some()
    }

    /// Cell accessor tolerant of short rows.
    pub fn cell(row: &[String], index: usize) -> &str {
        row.get(index).map(String::as_str).unwrap_or("")
    }

    /// Copy of this table with one column's values rewritten.
    pub fn map_column<F>(&self, name: &str, mut f: F) -> RawTable
    where
        F: FnMut(&str) -> String,
    {
        let Some(idx) = self.column_index(name) else {
            return self.clone();
        };

        let rows = self
            .rows
            .iter()
            .map(|row| {
                let mut row = row.clone();
                if let Some(cell) = row.get_mut(idx) {
                    *cell = f(cell);
                }
                row
            })
            .collect();

        RawTable::new(self.origin.clone(), self.columns.clone(), rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> RawTable {
        RawTable::new(
            "data/in/sample.csv",
            vec!["a".to_string(), "b".to_string()],
            vec![
                vec!["1".to_string(), "x".to_string()],
                vec!["2".to_string()],
            ],
        )
    }

    #[test]
    fn test_cell_tolerates_short_rows() {
        let table = sample();
        assert_eq!(RawTable::cell(&table.rows()[1], 1), "");
        assert_eq!(RawTable::cell(&table.rows()[0], 1), "x");
    }

    #[test]
    fn test_map_column_returns_new_table() {
        let table = sample();
        let mapped = table.map_column("b", |v| v.to_uppercase());

        assert_eq!(RawTable::cell(&mapped.rows()[0], 1), "X");
        assert_eq!(RawTable::cell(&table.rows()[0], 1), "x");
        assert_eq!(table.file_name(), "sample.csv");
    }
}

use std::collections::BTreeMap;
use std::path::Path;
use tracing::{debug, info};

use crate::error::Result;
use crate::models::{AggregateRow, RawTable, Record};
use crate::processors::run_report::RunWarning;
use crate::readers::TableReader;
use crate::utils::constants::{COL_LOCATION, MAP_FROM_COLUMN, MAP_TO_COLUMN};

/// A finite `from -> to` location rename table.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LocationMapping {
    entries: BTreeMap<String, String>,
}

impl LocationMapping {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Later pairs override earlier ones with the same `from`.
    pub fn from_pairs<I, A, B>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (A, B)>,
        A: Into<String>,
        B: Into<String>,
    {
        let entries = pairs
            .into_iter()
            .map(|(from, to)| (from.into(), to.into()))
            .filter(|(from, _)| !from.is_empty())
            .collect();
        Self { entries }
    }

    /// Load a two-column `from,to` CSV file.
    ///
    /// A missing file or one without both columns yields the identity mapping
    /// plus a [`RunWarning::LocationMapDisabled`]. Chained entries are
    /// reported but kept.
    pub fn load(path: &Path) -> Result<(Self, Vec<RunWarning>)> {
        let disabled = |reason: &str| -> Result<(Self, Vec<RunWarning>)> {
            let warning = RunWarning::LocationMapDisabled {
                path: path.display().to_string(),
                reason: reason.to_string(),
            };
            Ok((Self::empty(), vec![warning]))
        };

        if !path.exists() {
            return disabled("file not found");
        }

        let table = TableReader::new().read(path)?;
        let (Some(from_idx), Some(to_idx)) = (
            table.column_index(MAP_FROM_COLUMN),
            table.column_index(MAP_TO_COLUMN),
        ) else {
            return disabled(&format!(
                "expected columns '{}' and '{}', found {:?}",
                MAP_FROM_COLUMN,
                MAP_TO_COLUMN,
                table.columns()
            ));
        };

        let mapping = Self::from_pairs(table.rows().iter().map(|row| {
            (
                RawTable::cell(row, from_idx).to_string(),
                RawTable::cell(row, to_idx).to_string(),
            )
        }));

        let warnings = mapping
            .chained_entries()
            .into_iter()
            .map(|(from, to, then)| RunWarning::ChainedLocationMapping { from, to, then })
            .collect();

        info!("Loaded {} location mappings from {}", mapping.len(), path.display());
        Ok((mapping, warnings))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, location: &str) -> Option<&str> {
        self.entries.get(location).map(String::as_str)
    }

    /// Entries `a -> b` where `b -> c` also exists (and `b != c`).
    pub fn chained_entries(&self) -> Vec<(String, String, String)> {
        self.entries
            .iter()
            .filter(|(from, to)| from != to)
            .filter_map(|(from, to)| {
                self.entries
                    .get(to)
                    .filter(|then| *then != to)
                    .map(|then| (from.clone(), to.clone(), then.clone()))
            })
            .collect()
    }
}

/// Applies a [`LocationMapping`] in a single pass.
///
/// Each location is looked up once against the original keys, so a value
/// produced by the mapping is never mapped again in the same pass.
#[derive(Debug, Clone, Default)]
pub struct LocationNormalizer {
    mapping: LocationMapping,
}

impl LocationNormalizer {
    pub fn new(mapping: LocationMapping) -> Self {
        Self { mapping }
    }

    pub fn identity() -> Self {
        Self::default()
    }

    pub fn mapping(&self) -> &LocationMapping {
        &self.mapping
    }

    pub fn is_identity(&self) -> bool {
        self.mapping.is_empty()
    }

    pub fn map_location<'a>(&'a self, location: &'a str) -> &'a str {
        self.mapping.get(location).unwrap_or(location)
    }

    /// New table with the `location` column remapped; tables without one are returned as-is.
    pub fn normalize(&self, table: &RawTable) -> RawTable {
        if self.is_identity() {
            return table.clone();
        }
        let mut remapped = 0usize;
        let result = table.map_column(COL_LOCATION, |location| {
            let mapped = self.map_location(location);
            if mapped != location {
                remapped += 1;
            }
            mapped.to_string()
        });
        debug!("{}: remapped {} locations", table.origin(), remapped);
        result
    }

    pub fn normalize_records(&self, records: Vec<Record>) -> Vec<Record> {
        if self.is_identity() {
            return records;
        }
        records
            .into_iter()
            .map(|mut record| {
                if let Some(mapped) = self.mapping.get(&record.location) {
                    record.location = mapped.to_string();
                }
                record
            })
            .collect()
    }

    pub fn normalize_rows(&self, rows: Vec<AggregateRow>) -> Vec<AggregateRow> {
        if self.is_identity() {
            return rows;
        }
        rows.into_iter()
            .map(|mut row| {
                if let Some(mapped) = self.mapping.get(&row.location) {
                    row.location = mapped.to_string();
                }
                row
            })
            .collect()
    }
}

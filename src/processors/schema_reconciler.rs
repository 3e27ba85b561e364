use crate::error::{ProcessingError, Result};
use crate::models::{MeasurementClass, RawTable};
use crate::utils::constants::{CANONICAL_COLUMNS, COL_MEASUREMENT};
use tracing::debug;

/// A single column rename from one naming generation to the canonical name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenameRule {
    pub generation: &'static str,
    pub from: &'static str,
    pub to: &'static str,
}

/// Bumped whenever a rule is added, removed or reordered.
pub const RULESET_VERSION: u32 = 2;

/// Every historical column name the pipeline has seen, oldest generation first.
pub const RENAME_RULES: &[RenameRule] = &[
    // Time-series database export (`_time`, `_value`, `_measurement` system columns)
    RenameRule {
        generation: "database-export",
        from: "_time",
        to: "time",
    },
    RenameRule {
        generation: "database-export",
        from: "_value",
        to: "data_value",
    },
    RenameRule {
        generation: "database-export",
        from: "_measurement",
        to: "measurement",
    },
    // Annotated import files (`quantity` tag, `value` field)
    RenameRule {
        generation: "annotated-import",
        from: "value",
        to: "data_value",
    },
    RenameRule {
        generation: "annotated-import",
        from: "quantity",
        to: "data_key",
    },
];

enum ColumnSource {
    Index(usize),
    Constant(&'static str),
}

/// Maps any known naming generation onto the canonical schema.
pub struct SchemaReconciler {
    rules: &'static [RenameRule],
    infer_measurement_from_path: bool,
}

impl SchemaReconciler {
    pub fn new() -> Self {
        Self {
            rules: RENAME_RULES,
            infer_measurement_from_path: true,
        }
    }

    pub fn with_infer_measurement_from_path(mut self, infer: bool) -> Self {
        self.infer_measurement_from_path = infer;
        self
    }

    pub fn rules(&self) -> &[RenameRule] {
        self.rules
    }

    /// Column names after applying every rename rule in order.
    ///
    /// A rule whose target already exists is skipped, so inputs mixing
    /// generations are never renamed twice.
    pub fn renamed_columns(&self, columns: &[String]) -> Vec<String> {
        let mut columns = columns.to_vec();
        for rule in self.rules {
            if columns.iter().any(|c| c == rule.to) {
                continue;
            }
            if let Some(pos) = columns.iter().position(|c| c == rule.from) {
                debug!("rename {} -> {} ({})", rule.from, rule.to, rule.generation);
                columns[pos] = rule.to.to_string();
            }
        }
        columns
    }

    /// Canonical columns still absent after renaming.
    pub fn missing_columns(&self, table: &RawTable) -> Vec<String> {
        let columns = self.renamed_columns(table.columns());
        let inferred = self.inferred_measurement(table, &columns);
        CANONICAL_COLUMNS
            .iter()
            .filter(|name| !columns.iter().any(|c| c == *name))
            .filter(|name| !(**name == COL_MEASUREMENT && inferred.is_some()))
            .map(|name| name.to_string())
            .collect()
    }

    /// Produce a new table with exactly the canonical columns, in canonical order.
    pub fn reconcile(&self, table: &RawTable) -> Result<RawTable> {
        let columns = self.renamed_columns(table.columns());
        let inferred = self.inferred_measurement(table, &columns);

        let mut sources = Vec::with_capacity(CANONICAL_COLUMNS.len());
        let mut missing = Vec::new();
        for name in CANONICAL_COLUMNS {
            match (columns.iter().position(|c| c == name), inferred) {
                (Some(idx), _) => sources.push(ColumnSource::Index(idx)),
                (None, Some(class)) if name == COL_MEASUREMENT => {
                    sources.push(ColumnSource::Constant(class.as_str()));
                }
                (None, _) => missing.push(name.to_string()),
            }
        }

        if !missing.is_empty() {
            return Err(ProcessingError::Schema {
                path: table.origin().to_string(),
                missing,
                found: table.columns().to_vec(),
            });
        }

        let rows = table
            .rows()
            .iter()
            .map(|row| {
                sources
                    .iter()
                    .map(|source| match source {
                        ColumnSource::Index(idx) => RawTable::cell(row, *idx).to_string(),
                        ColumnSource::Constant(value) => value.to_string(),
                    })
                    .collect()
            })
            .collect();

        Ok(RawTable::new(
            table.origin(),
            CANONICAL_COLUMNS.iter().map(|c| c.to_string()).collect(),
            rows,
        ))
    }

    fn inferred_measurement(&self, table: &RawTable, columns: &[String]) -> Option<MeasurementClass> {
        if !self.infer_measurement_from_path || columns.iter().any(|c| c == COL_MEASUREMENT) {
            return None;
        }
        MeasurementClass::from_file_prefix(table.file_name())
    }
}

impl Default for SchemaReconciler {
    fn default() -> Self {
        Self::new()
    }
}

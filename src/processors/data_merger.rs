use crate::error::Result;
use crate::models::{AggregateRow, CanonicalTable, MonthlyAggregate};
use crate::processors::{IntegrityChecker, LocationNormalizer};
use tracing::{debug, info};

/// Combines monthly aggregates into the publication table.
pub struct DataMerger {
    normalizer: Option<LocationNormalizer>,
}

impl DataMerger {
    pub fn new() -> Self {
        Self { normalizer: None }
    }

    /// Remap locations while merging, for runs that did not normalize before aggregation.
    pub fn with_normalizer(mut self, normalizer: LocationNormalizer) -> Self {
        self.normalizer = Some(normalizer);
        self
    }

    /// Concatenate, validate keys, then sort by `(time, location, data_key, source)`.
    ///
    /// Rows with an empty key column, from any partition, and repeated primary
    /// keys fail the merge. The error lists every one of them.
    pub fn merge(&self, partitions: Vec<MonthlyAggregate>) -> Result<CanonicalTable> {
        let total: usize = partitions.iter().map(|p| p.rows.len()).sum();
        let mut rows: Vec<AggregateRow> = Vec::with_capacity(total);
        let mut key_violations = Vec::new();

        for partition in partitions {
            debug!("merging {} rows from {}", partition.rows.len(), partition.origin);
            key_violations.extend(partition.key_violations);
            rows.extend(partition.rows);
        }

        if let Some(normalizer) = &self.normalizer {
            rows = normalizer.normalize_rows(rows);
        }

        let mut report = IntegrityChecker::new().check(&rows);
        key_violations.append(&mut report.empty_key_violations);
        report.empty_key_violations = key_violations;
        report.into_result()?;

        // stable, and total over the primary key, so input order never shows
        rows.sort_by(|a, b| a.publication_cmp(b));

        info!("Merged {} rows", rows.len());
        Ok(CanonicalTable::from_sorted_rows(rows))
    }
}

impl Default for DataMerger {
    fn default() -> Self {
        Self::new()
    }
}

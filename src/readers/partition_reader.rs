use crate::error::Result;
use crate::models::{AggregateRow, MeasurementClass, MonthlyAggregate, RawTable};
use crate::processors::SchemaReconciler;
use crate::readers::TableReader;
use crate::utils::constants::{COL_DATA_KEY, COL_DATA_VALUE, COL_LOCATION, COL_MEASUREMENT, COL_SOURCE, COL_TIME};
use crate::utils::time::{parse_utc_timestamp, parse_value};
use std::path::Path;
use tracing::debug;

/// Loads a monthly hourly-aggregate file as typed rows.
pub struct PartitionReader {
    table_reader: TableReader,
    reconciler: SchemaReconciler,
}

impl PartitionReader {
    pub fn new() -> Self {
        Self {
            table_reader: TableReader::new(),
            reconciler: SchemaReconciler::new(),
        }
    }

    pub fn with_table_reader(mut self, table_reader: TableReader) -> Self {
        self.table_reader = table_reader;
        self
    }

    pub fn with_reconciler(mut self, reconciler: SchemaReconciler) -> Self {
        self.reconciler = reconciler;
        self
    }

    pub fn read(&self, path: &Path) -> Result<MonthlyAggregate> {
        let table = self.table_reader.read(path)?;
        self.from_table(&table)
    }

    /// Rows whose `time` does not parse are dropped and counted. Rows with an
    /// empty key column or unknown measurement are kept out and described in
    /// `key_violations`.
    pub fn from_table(&self, table: &RawTable) -> Result<MonthlyAggregate> {
        let table = self.reconciler.reconcile(table)?;
        let idx = |name: &str| table.column_index(name).unwrap_or(usize::MAX);
        let (time_idx, location_idx, source_idx, measurement_idx, key_idx, value_idx) = (
            idx(COL_TIME),
            idx(COL_LOCATION),
            idx(COL_SOURCE),
            idx(COL_MEASUREMENT),
            idx(COL_DATA_KEY),
            idx(COL_DATA_VALUE),
        );

        let mut aggregate = MonthlyAggregate::new(table.origin(), Vec::with_capacity(table.len()));

        for (line, row) in table.rows().iter().enumerate() {
            let Some(hour) = parse_utc_timestamp(RawTable::cell(row, time_idx)) else {
                aggregate.dropped_rows += 1;
                continue;
            };

            let location = RawTable::cell(row, location_idx);
            let source = RawTable::cell(row, source_idx);
            let data_key = RawTable::cell(row, key_idx);
            let measurement = RawTable::cell(row, measurement_idx);

            let mut empty = Vec::new();
            for (name, value) in [
                (COL_LOCATION, location),
                (COL_SOURCE, source),
                (COL_MEASUREMENT, measurement),
                (COL_DATA_KEY, data_key),
            ] {
                if value.is_empty() {
                    empty.push(name);
                }
            }
            if !empty.is_empty() {
                aggregate.key_violations.push(format!(
                    "{}: data row {}: empty {}",
                    table.origin(),
                    line + 1,
                    empty.join(", ")
                ));
                continue;
            }

            let Ok(measurement) = measurement.parse::<MeasurementClass>() else {
                aggregate.key_violations.push(format!(
                    "{}: data row {}: unknown measurement '{}'",
                    table.origin(),
                    line + 1,
                    measurement
                ));
                continue;
            };

            aggregate.rows.push(AggregateRow {
                hour,
                location: location.to_string(),
                source: source.to_string(),
                measurement,
                quantity: data_key.to_string(),
                value: parse_value(RawTable::cell(row, value_idx)),
            });
        }

        debug!(
            "{}: {} rows, {} dropped, {} key violations",
            aggregate.origin,
            aggregate.rows.len(),
            aggregate.dropped_rows,
            aggregate.key_violations.len()
        );
        Ok(aggregate)
    }
}

impl Default for PartitionReader {
    fn default() -> Self {
        Self::new()
    }
}

use crate::error::Result;
use crate::models::{AggregateRow, CanonicalTable};
use crate::readers::PartitionReader;
use crate::utils::constants::DEFAULT_TOP_DATA_KEYS;
use crate::utils::format_utc_timestamp;
use crate::writers::ParquetWriter;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

/// Descriptive statistics of a canonical table, used for metadata and `info`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DatasetSummary {
    pub rows: usize,
    pub time_range: Option<(DateTime<Utc>, DateTime<Utc>)>,
    /// Row count per measurement class name.
    pub measurements: BTreeMap<String, usize>,
    /// Most frequent data keys, by count descending then name.
    pub top_data_keys: Vec<(String, usize)>,
    pub distinct_data_keys: usize,
    pub locations: usize,
    pub sources: usize,
    pub null_values: usize,
}

impl DatasetSummary {
    pub fn time_range_strings(&self) -> Option<(String, String)> {
        self.time_range
            .map(|(start, end)| (format_utc_timestamp(&start), format_utc_timestamp(&end)))
    }

    pub fn summary(&self) -> String {
        let range = match self.time_range_strings() {
            Some((start, end)) => format!("{} to {}", start, end),
            None => "n/a".to_string(),
        };
        format!(
            "Dataset Summary:\n\
            - Rows: {}\n\
            - Time range: {}\n\
            - Locations: {}\n\
            - Sources: {}\n\
            - Data keys: {}\n\
            - Empty values: {}",
            self.rows, range, self.locations, self.sources, self.distinct_data_keys, self.null_values
        )
    }

    pub fn detailed_summary(&self) -> String {
        let mut out = self.summary();

        out.push_str("\n\nRows per measurement:\n");
        for (measurement, count) in &self.measurements {
            out.push_str(&format!("  {:<12} {:>10}\n", measurement, count));
        }

        out.push_str(&format!("\nTop {} data keys:\n", self.top_data_keys.len()));
        for (key, count) in &self.top_data_keys {
            out.push_str(&format!("  {:<30} {:>10}\n", key, count));
        }

        out
    }
}

pub struct DatasetAnalyzer {
    top_n: usize,
}

impl DatasetAnalyzer {
    pub fn new() -> Self {
        Self {
            top_n: DEFAULT_TOP_DATA_KEYS,
        }
    }

    pub fn with_top_n(mut self, top_n: usize) -> Self {
        self.top_n = top_n;
        self
    }

    pub fn summarize(&self, table: &CanonicalTable) -> DatasetSummary {
        self.summarize_rows(table.rows())
    }

    pub fn summarize_rows(&self, rows: &[AggregateRow]) -> DatasetSummary {
        let mut measurements: BTreeMap<String, usize> = BTreeMap::new();
        let mut key_counts: BTreeMap<&str, usize> = BTreeMap::new();
        let mut locations = BTreeSet::new();
        let mut sources = BTreeSet::new();
        let mut null_values = 0;
        let mut time_range: Option<(DateTime<Utc>, DateTime<Utc>)> = None;

        for row in rows {
            *measurements.entry(row.measurement.to_string()).or_default() += 1;
            *key_counts.entry(row.quantity.as_str()).or_default() += 1;
            locations.insert(row.location.as_str());
            sources.insert(row.source.as_str());
            if row.value.is_none() {
                null_values += 1;
            }
            time_range = Some(match time_range {
                Some((start, end)) => (start.min(row.hour), end.max(row.hour)),
                None => (row.hour, row.hour),
            });
        }

        let distinct_data_keys = key_counts.len();
        let mut top_data_keys: Vec<(String, usize)> = key_counts
            .into_iter()
            .map(|(key, count)| (key.to_string(), count))
            .collect();
        top_data_keys.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        top_data_keys.truncate(self.top_n);

        DatasetSummary {
            rows: rows.len(),
            time_range,
            measurements,
            top_data_keys,
            distinct_data_keys,
            locations: locations.len(),
            sources: sources.len(),
            null_values,
        }
    }

    /// Summarize a published `.csv`, `.csv.zip` or `.parquet` file.
    pub fn analyze_file(&self, path: &Path) -> Result<DatasetSummary> {
        let is_parquet = path
            .extension()
            .map(|ext| ext.eq_ignore_ascii_case("parquet"))
            .unwrap_or(false);

        let rows = if is_parquet {
            ParquetWriter::new().read_sample_rows(path, usize::MAX)?
        } else {
            PartitionReader::new().read(path)?.rows
        };

        Ok(self.summarize_rows(&rows))
    }
}

impl Default for DatasetAnalyzer {
    fn default() -> Self {
        Self::new()
    }
}

use serde::Serialize;
use std::fmt;
use std::path::PathBuf;

use crate::models::{MonthKey, RecordParseStats};

/// Non-fatal conditions observed during a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RunWarning {
    /// A month between the first and last reading had no records at all.
    PartitionGap { month: MonthKey },
    /// Nothing was left to aggregate or merge.
    EmptyInput { stage: String },
    /// The location mapping could not be used; locations pass through unchanged.
    LocationMapDisabled { path: String, reason: String },
    /// A mapping target is itself a key; it is not followed further in the same pass.
    ChainedLocationMapping {
        from: String,
        to: String,
        then: String,
    },
    UploadFailed {
        path: String,
        destination: String,
        message: String,
    },
    /// Readings stamped later than the time of the run.
    FutureTimestamps { path: String, count: usize },
}

impl fmt::Display for RunWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunWarning::PartitionGap { month } => {
                write!(f, "No records for month {}", month)
            }
            RunWarning::EmptyInput { stage } => write!(f, "No input rows for {}", stage),
            RunWarning::LocationMapDisabled { path, reason } => {
                write!(f, "Location mapping {} disabled: {}", path, reason)
            }
            RunWarning::ChainedLocationMapping { from, to, then } => write!(
                f,
                "Chained location mapping {} -> {} -> {}: only the first step is applied",
                from, to, then
            ),
            RunWarning::UploadFailed {
                path,
                destination,
                message,
            } => write!(f, "Upload of {} to {} failed: {}", path, destination, message),
            RunWarning::FutureTimestamps { path, count } => {
                write!(f, "{}: {} rows with a timestamp in the future", path, count)
            }
        }
    }
}

/// An input file that was left out of the run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedFile {
    pub path: PathBuf,
    pub reason: String,
}

/// Everything a caller needs to judge a run: inputs, drops, warnings and violations.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RunReport {
    pub files_read: usize,
    pub skipped_files: Vec<SkippedFile>,
    pub warnings: Vec<RunWarning>,
    pub rows_read: usize,
    pub unparseable_time: usize,
    pub unknown_measurement: usize,
    /// Records without location, source or quantity.
    pub incomplete_records: usize,
    pub null_values: usize,
    /// Raw readings collapsed because another input carried the same reading.
    pub duplicate_readings: usize,
    /// Failed per-file quality gates; any of them stops the run before aggregation.
    pub quality_violations: Vec<String>,
    pub partitions_written: Vec<PathBuf>,
    pub rows_published: usize,
    pub integrity_violations: Vec<String>,
    pub published: Vec<PathBuf>,
}

impl RunReport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn skip(&mut self, path: impl Into<PathBuf>, reason: impl fmt::Display) {
        self.skipped_files.push(SkippedFile {
            path: path.into(),
            reason: reason.to_string(),
        });
    }

    pub fn warn(&mut self, warning: RunWarning) {
        tracing::warn!("{}", warning);
        self.warnings.push(warning);
    }

    pub fn record_parse_stats(&mut self, stats: &RecordParseStats) {
        self.rows_read += stats.rows;
        self.unparseable_time += stats.unparseable_time;
        self.unknown_measurement += stats.unknown_measurement;
    }

    pub fn gap_months(&self) -> Vec<MonthKey> {
        self.warnings
            .iter()
            .filter_map(|w| match w {
                RunWarning::PartitionGap { month } => Some(*month),
                _ => None,
            })
            .collect()
    }

    pub fn has_integrity_violations(&self) -> bool {
        !self.integrity_violations.is_empty()
    }

    pub fn has_quality_violations(&self) -> bool {
        !self.quality_violations.is_empty()
    }

    /// Whether the run should end with a failure status.
    pub fn is_failure(&self, strict: bool) -> bool {
        self.has_integrity_violations()
            || self.has_quality_violations()
            || (strict && !self.skipped_files.is_empty())
    }

    /// Merge another stage's report into this one.
    pub fn absorb(&mut self, other: RunReport) {
        self.files_read += other.files_read;
        self.skipped_files.extend(other.skipped_files);
        self.warnings.extend(other.warnings);
        self.rows_read += other.rows_read;
        self.unparseable_time += other.unparseable_time;
        self.unknown_measurement += other.unknown_measurement;
        self.incomplete_records += other.incomplete_records;
        self.null_values += other.null_values;
        self.duplicate_readings += other.duplicate_readings;
        self.quality_violations.extend(other.quality_violations);
        self.partitions_written.extend(other.partitions_written);
        self.rows_published += other.rows_published;
        self.integrity_violations.extend(other.integrity_violations);
        self.published.extend(other.published);
    }

    pub fn generate_summary(&self) -> String {
        let mut summary = String::new();

        summary.push_str("Run Report\n");
        summary.push_str("==========\n");
        summary.push_str(&format!("Files read: {}\n", self.files_read));
        summary.push_str(&format!("Files skipped: {}\n", self.skipped_files.len()));
        summary.push_str(&format!("Rows read: {}\n", self.rows_read));

        if self.unparseable_time + self.unknown_measurement + self.incomplete_records > 0 {
            summary.push_str("\nDropped rows:\n");
            summary.push_str(&format!("  Unparseable time: {}\n", self.unparseable_time));
            summary.push_str(&format!("  Unknown measurement: {}\n", self.unknown_measurement));
            summary.push_str(&format!("  Missing tags: {}\n", self.incomplete_records));
        }
        if self.null_values > 0 {
            summary.push_str(&format!("Null values ignored: {}\n", self.null_values));
        }
        if self.duplicate_readings > 0 {
            summary.push_str(&format!(
                "Duplicate readings collapsed: {}\n",
                self.duplicate_readings
            ));
        }

        if !self.partitions_written.is_empty() {
            summary.push_str(&format!(
                "Monthly partitions written: {}\n",
                self.partitions_written.len()
            ));
        }
        if !self.published.is_empty() {
            summary.push_str(&format!("Rows published: {}\n", self.rows_published));
            for path in &self.published {
                summary.push_str(&format!("  - {}\n", path.display()));
            }
        }

        if !self.skipped_files.is_empty() {
            summary.push_str("\nSkipped files:\n");
            for skipped in &self.skipped_files {
                summary.push_str(&format!("  - {}: {}\n", skipped.path.display(), skipped.reason));
            }
        }

        if !self.warnings.is_empty() {
            summary.push_str(&format!("\nWarnings ({}):\n", self.warnings.len()));
            for warning in &self.warnings {
                summary.push_str(&format!("  - {}\n", warning));
            }
        }

        if self.has_quality_violations() {
            summary.push_str(&format!(
                "\nQuality checks failed ({}), nothing was aggregated:\n",
                self.quality_violations.len()
            ));
            for violation in &self.quality_violations {
                summary.push_str(&format!("  - {}\n", violation));
            }
        }

        if self.has_integrity_violations() {
            summary.push_str(&format!(
                "\nIntegrity violations ({}), nothing was published:\n",
                self.integrity_violations.len()
            ));
            for violation in &self.integrity_violations {
                summary.push_str(&format!("  - {}\n", violation));
            }
        }

        summary
    }
}

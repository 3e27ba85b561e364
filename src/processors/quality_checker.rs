use chrono::{DateTime, Utc};

use crate::config::QualityThresholds;
use crate::models::RawTable;
use crate::utils::constants::{COL_DATA_VALUE, COL_TIME};
use crate::utils::time::parse_utc_timestamp;

/// Quality figures for one reconciled input file.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QualityReport {
    pub origin: String,
    pub rows: usize,
    pub null_values: usize,
    pub invalid_timestamps: usize,
    /// Rows stamped after the check time.
    pub future_timestamps: usize,
    pub time_range: Option<(DateTime<Utc>, DateTime<Utc>)>,
    /// One line per failed gate.
    pub violations: Vec<String>,
}

impl QualityReport {
    pub fn passed(&self) -> bool {
        self.violations.is_empty()
    }

    pub fn null_fraction(&self) -> f64 {
        if self.rows == 0 {
            0.0
        } else {
            self.null_values as f64 / self.rows as f64
        }
    }

    pub fn generate_summary(&self) -> String {
        let mut summary = String::new();

        summary.push_str(&format!("Quality check: {}\n", self.origin));
        summary.push_str(&format!("  Rows: {}\n", self.rows));
        summary.push_str(&format!(
            "  Empty values: {} ({:.2}%)\n",
            self.null_values,
            self.null_fraction() * 100.0
        ));
        summary.push_str(&format!("  Invalid timestamps: {}\n", self.invalid_timestamps));
        if self.future_timestamps > 0 {
            summary.push_str(&format!("  Future timestamps: {}\n", self.future_timestamps));
        }
        if let Some((start, end)) = self.time_range {
            summary.push_str(&format!(
                "  Time range: {} to {} ({} days)\n",
                start.date_naive(),
                end.date_naive(),
                (end - start).num_days()
            ));
        }
        for violation in &self.violations {
            summary.push_str(&format!("  FAILED: {}\n", violation));
        }

        summary
    }
}

/// Applies [`QualityThresholds`] to reconciled tables before aggregation.
pub struct QualityChecker {
    thresholds: QualityThresholds,
}

impl QualityChecker {
    pub fn new(thresholds: QualityThresholds) -> Self {
        Self { thresholds }
    }

    pub fn thresholds(&self) -> &QualityThresholds {
        &self.thresholds
    }

    /// Check a table in canonical schema. Timestamps after `now` are counted
    /// but never fail the file.
    pub fn check(&self, table: &RawTable, now: DateTime<Utc>) -> QualityReport {
        let time_idx = table.column_index(COL_TIME).unwrap_or(usize::MAX);
        let value_idx = table.column_index(COL_DATA_VALUE).unwrap_or(usize::MAX);

        let mut report = QualityReport {
            origin: table.origin().to_string(),
            rows: table.len(),
            ..Default::default()
        };

        let mut range: Option<(DateTime<Utc>, DateTime<Utc>)> = None;
        for row in table.rows() {
            if RawTable::cell(row, value_idx).is_empty() {
                report.null_values += 1;
            }

            match parse_utc_timestamp(RawTable::cell(row, time_idx)) {
                Some(time) => {
                    if time > now {
                        report.future_timestamps += 1;
                    }
                    range = Some(match range {
                        Some((start, end)) => (start.min(time), end.max(time)),
                        None => (time, time),
                    });
                }
                None => report.invalid_timestamps += 1,
            }
        }
        report.time_range = range;

        let thresholds = &self.thresholds;
        if let Some(max) = thresholds.max_null_fraction {
            if report.null_fraction() > max {
                report.violations.push(format!(
                    "{}: {:.2}% empty values (max {:.2}%)",
                    report.origin,
                    report.null_fraction() * 100.0,
                    max * 100.0
                ));
            }
        }
        if let Some(min) = thresholds.min_rows {
            if report.rows < min {
                report.violations.push(format!(
                    "{}: {} rows (min {})",
                    report.origin, report.rows, min
                ));
            }
        }
        if let Some(max) = thresholds.max_rows {
            if report.rows > max {
                report.violations.push(format!(
                    "{}: {} rows (max {})",
                    report.origin, report.rows, max
                ));
            }
        }
        if thresholds.reject_invalid_timestamps && report.invalid_timestamps > 0 {
            report.violations.push(format!(
                "{}: {} invalid timestamps",
                report.origin, report.invalid_timestamps
            ));
        }

        report
    }
}

impl Default for QualityChecker {
    fn default() -> Self {
        Self::new(QualityThresholds::default())
    }
}

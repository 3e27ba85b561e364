use crate::error::{ProcessingError, Result};
use crate::models::{AggregateRow, MeasurementClass, PrimaryKey};
use crate::utils::format_utc_timestamp;
use std::collections::{BTreeMap, HashSet};

#[derive(Debug, Clone, Default)]
pub struct IntegrityReport {
    pub total_rows: usize,
    /// Every key seen more than once, sorted, listed once each.
    pub duplicate_keys: Vec<PrimaryKey>,
    /// One line per row with an empty key column.
    pub empty_key_violations: Vec<String>,
    pub measurement_counts: BTreeMap<MeasurementClass, usize>,
    pub null_values: usize,
}

impl IntegrityReport {
    pub fn is_clean(&self) -> bool {
        self.duplicate_keys.is_empty() && self.empty_key_violations.is_empty()
    }

    /// Fails with every violation found. Empty key lines come before duplicate keys.
    pub fn into_result(self) -> Result<()> {
        match (self.empty_key_violations.is_empty(), self.duplicate_keys.is_empty()) {
            (true, true) => Ok(()),
            (false, true) => Err(ProcessingError::EmptyKeyColumns {
                violations: self.empty_key_violations,
            }),
            (true, false) => Err(ProcessingError::DuplicateKeys {
                keys: self.duplicate_keys,
            }),
            (false, false) => Err(ProcessingError::IntegrityViolations {
                empty_keys: self.empty_key_violations,
                duplicates: self.duplicate_keys,
            }),
        }
    }

    pub fn generate_summary(&self) -> String {
        let mut summary = String::new();

        summary.push_str("Integrity Check Summary\n");
        summary.push_str("=======================\n");
        summary.push_str(&format!("Total rows: {}\n", self.total_rows));
        for (class, count) in &self.measurement_counts {
            summary.push_str(&format!("  {}: {}\n", class, count));
        }
        summary.push_str(&format!("Empty data values: {}\n", self.null_values));
        summary.push_str(&format!(
            "Rows with empty key columns: {}\n",
            self.empty_key_violations.len()
        ));
        summary.push_str(&format!("Duplicate primary keys: {}\n", self.duplicate_keys.len()));

        if !self.duplicate_keys.is_empty() {
            summary.push_str("\nSample duplicates (first 10):\n");
            for key in self.duplicate_keys.iter().take(10) {
                summary.push_str(&format!("  - {}\n", key));
            }
        }

        summary
    }
}

/// Checks primary key completeness and uniqueness of aggregate rows.
pub struct IntegrityChecker;

impl IntegrityChecker {
    pub fn new() -> Self {
        Self
    }

    pub fn check(&self, rows: &[AggregateRow]) -> IntegrityReport {
        let mut report = IntegrityReport {
            total_rows: rows.len(),
            ..Default::default()
        };

        let mut seen: HashSet<PrimaryKey> = HashSet::with_capacity(rows.len());
        let mut duplicates: HashSet<PrimaryKey> = HashSet::new();

        for row in rows {
            *report.measurement_counts.entry(row.measurement).or_default() += 1;
            if row.value.is_none() {
                report.null_values += 1;
            }

            let empty = empty_key_columns(row);
            if !empty.is_empty() {
                report.empty_key_violations.push(format!(
                    "row at {} ({} {}): empty {}",
                    format_utc_timestamp(&row.hour),
                    row.measurement,
                    row.quantity,
                    empty.join(", ")
                ));
                continue;
            }

            let key = row.primary_key();
            if !seen.insert(key.clone()) {
                duplicates.insert(key);
            }
        }

        let mut duplicate_keys: Vec<PrimaryKey> = duplicates.into_iter().collect();
        duplicate_keys.sort();
        report.duplicate_keys = duplicate_keys;

        report
    }
}

impl Default for IntegrityChecker {
    fn default() -> Self {
        Self::new()
    }
}

fn empty_key_columns(row: &AggregateRow) -> Vec<&'static str> {
    let mut empty = Vec::new();
    if row.location.trim().is_empty() {
        empty.push("location");
    }
    if row.quantity.trim().is_empty() {
        empty.push("data_key");
    }
    if row.source.trim().is_empty() {
        empty.push("source");
    }
    empty
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn row(hour: u32, location: &str, measurement: MeasurementClass) -> AggregateRow {
        let t = Utc.with_ymd_and_hms(2024, 1, 1, hour, 0, 0).unwrap();
        AggregateRow::new(t, location, "meter", measurement, "energy", Some(1.0))
    }

    #[test]
    fn test_clean_rows() {
        let rows = vec![
            row(0, "A", MeasurementClass::Additive),
            row(0, "A", MeasurementClass::Nonadditive),
            row(1, "A", MeasurementClass::Additive),
        ];
        let report = IntegrityChecker::new().check(&rows);
        assert!(report.is_clean());
        assert_eq!(report.measurement_counts[&MeasurementClass::Additive], 2);
        assert!(report.into_result().is_ok());
    }

    #[test]
    fn test_duplicates_listed_once_each() {
        let rows = vec![
            row(0, "A", MeasurementClass::Additive),
            row(0, "A", MeasurementClass::Additive),
            row(0, "A", MeasurementClass::Additive),
            row(2, "B", MeasurementClass::Additive),
            row(2, "B", MeasurementClass::Additive),
        ];
        let report = IntegrityChecker::new().check(&rows);
        assert_eq!(report.duplicate_keys.len(), 2);
        assert_eq!(report.duplicate_keys[0].location, "A");

        match report.into_result() {
            Err(ProcessingError::DuplicateKeys { keys }) => assert_eq!(keys.len(), 2),
            other => panic!("expected duplicate keys, got {:?}", other),
        }
    }

    #[test]
    fn test_empty_keys_alone() {
        let rows = vec![row(0, "", MeasurementClass::Additive), row(1, "A", MeasurementClass::Additive)];
        let report = IntegrityChecker::new().check(&rows);
        assert!(matches!(
            report.into_result(),
            Err(ProcessingError::EmptyKeyColumns { .. })
        ));
    }

    #[test]
    fn test_empty_keys_and_duplicates_both_listed() {
        let rows = vec![
            row(0, "", MeasurementClass::Additive),
            row(1, "A", MeasurementClass::Additive),
            row(1, "A", MeasurementClass::Additive),
        ];
        let report = IntegrityChecker::new().check(&rows);
        assert_eq!(report.empty_key_violations.len(), 1);
        assert!(report.empty_key_violations[0].contains("empty location"));

        let err = report.into_result().unwrap_err();
        assert!(err.is_integrity_violation());
        let lines = err.violation_lines();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].contains("empty location"));
        assert!(lines[1].starts_with("duplicate primary key"));
    }
}

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

use super::MeasurementClass;
use crate::utils::time::format_utc_timestamp;

/// One hourly aggregate in canonical form.
///
/// On disk the fields map to `time`, `location`, `source`, `measurement`,
/// `data_key` and `data_value`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregateRow {
    pub hour: DateTime<Utc>,
    pub location: String,
    pub source: String,
    pub measurement: MeasurementClass,
    pub quantity: String,
    pub value: Option<f64>,
}

impl AggregateRow {
    pub fn new(
        hour: DateTime<Utc>,
        location: impl Into<String>,
        source: impl Into<String>,
        measurement: MeasurementClass,
        quantity: impl Into<String>,
        value: Option<f64>,
    ) -> Self {
        Self {
            hour,
            location: location.into(),
            source: source.into(),
            measurement,
            quantity: quantity.into(),
            value,
        }
    }

    pub fn primary_key(&self) -> PrimaryKey {
        PrimaryKey {
            time: self.hour,
            measurement: self.measurement,
            location: self.location.clone(),
            data_key: self.quantity.clone(),
            source: self.source.clone(),
        }
    }

    /// Publication order: time, location, data_key, source, then measurement
    /// so that the order never depends on how inputs were concatenated.
    pub fn publication_cmp(&self, other: &Self) -> Ordering {
        self.hour
            .cmp(&other.hour)
            .then_with(|| self.location.cmp(&other.location))
            .then_with(|| self.quantity.cmp(&other.quantity))
            .then_with(|| self.source.cmp(&other.source))
            .then_with(|| self.measurement.cmp(&other.measurement))
    }

    /// Cells in canonical column order.
    pub fn to_csv_record(&self) -> [String; 6] {
        [
            format_utc_timestamp(&self.hour),
            self.location.clone(),
            self.source.clone(),
            self.measurement.as_str().to_string(),
            self.quantity.clone(),
            self.value.map(format_value).unwrap_or_default(),
        ]
    }
}

/// Decimal rendering used for `data_value`; shortest representation that round-trips.
pub fn format_value(value: f64) -> String {
    format!("{}", value)
}

/// Primary key of the published table: `(time, measurement, location, data_key, source)`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PrimaryKey {
    pub time: DateTime<Utc>,
    pub measurement: MeasurementClass,
    pub location: String,
    pub data_key: String,
    pub source: String,
}

impl fmt::Display for PrimaryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "({}, {}, {}, {}, {})",
            format_utc_timestamp(&self.time),
            self.measurement,
            self.location,
            self.data_key,
            self.source
        )
    }
}

/// Rows loaded from one monthly aggregate file.
#[derive(Debug, Clone, Default)]
pub struct MonthlyAggregate {
    pub origin: String,
    pub rows: Vec<AggregateRow>,
    /// Rows dropped because `time` did not parse.
    pub dropped_rows: usize,
    /// Rows with an empty or unknown key column, one description each.
    pub key_violations: Vec<String>,
}

impl MonthlyAggregate {
    pub fn new(origin: impl Into<String>, rows: Vec<AggregateRow>) -> Self {
        Self {
            origin: origin.into(),
            rows,
            dropped_rows: 0,
            key_violations: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_csv_record_formatting() {
        let hour = Utc.with_ymd_and_hms(2024, 1, 1, 5, 0, 0).unwrap();
        let row = AggregateRow::new(hour, "A", "meter", MeasurementClass::Additive, "energy", Some(30.0));
        assert_eq!(
            row.to_csv_record(),
            [
                "2024-01-01T05:00:00Z".to_string(),
                "A".to_string(),
                "meter".to_string(),
                "additive".to_string(),
                "energy".to_string(),
                "30".to_string(),
            ]
        );

        let empty = AggregateRow::new(hour, "A", "meter", MeasurementClass::Nonadditive, "temp", None);
        assert_eq!(empty.to_csv_record()[5], "");
    }

    #[test]
    fn test_publication_order_ties_on_measurement() {
        let hour = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let a = AggregateRow::new(hour, "A", "s", MeasurementClass::Nonadditive, "k", Some(1.0));
        let b = AggregateRow::new(hour, "A", "s", MeasurementClass::Additive, "k", Some(1.0));
        assert_eq!(a.publication_cmp(&b), Ordering::Greater);
        assert_ne!(a.primary_key(), b.primary_key());
    }
}

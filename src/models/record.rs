use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{ProcessingError, Result};
use crate::utils::constants::{COL_DATA_KEY, COL_DATA_VALUE, COL_LOCATION, COL_MEASUREMENT, COL_SOURCE, COL_TIME};
use crate::utils::time::{parse_utc_timestamp, parse_value};

use super::RawTable;

/// How readings of a quantity combine within an hour.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MeasurementClass {
    /// Hourly value is the sum of readings (energy, volume).
    Additive,
    /// Hourly value is the arithmetic mean of readings (temperature, humidity).
    Nonadditive,
}

impl MeasurementClass {
    pub const ALL: [MeasurementClass; 2] = [MeasurementClass::Additive, MeasurementClass::Nonadditive];

    pub fn as_str(&self) -> &'static str {
        match self {
            MeasurementClass::Additive => "additive",
            MeasurementClass::Nonadditive => "nonadditive",
        }
    }

    pub fn reducer_name(&self) -> &'static str {
        match self {
            MeasurementClass::Additive => "sum",
            MeasurementClass::Nonadditive => "mean",
        }
    }

    /// Detect the class from a file name such as `additive_2024-01.hourly.csv`.
    pub fn from_file_prefix(file_name: &str) -> Option<Self> {
        // "nonadditive" contains "additive", so the longer prefix goes first
        if file_name.starts_with("nonadditive_") || file_name.starts_with("nonadditive.") {
            Some(MeasurementClass::Nonadditive)
        } else if file_name.starts_with("additive_") || file_name.starts_with("additive.") {
            Some(MeasurementClass::Additive)
        } else {
            None
        }
    }
}

impl fmt::Display for MeasurementClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MeasurementClass {
    type Err = ProcessingError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "additive" => Ok(MeasurementClass::Additive),
            "nonadditive" => Ok(MeasurementClass::Nonadditive),
            other => Err(ProcessingError::InvalidFormat(format!(
                "Unknown measurement class: '{}'",
                other
            ))),
        }
    }
}

/// A single reading in canonical form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub time: DateTime<Utc>,
    pub location: String,
    pub source: String,
    pub measurement_class: MeasurementClass,
    pub quantity: String,
    pub value: Option<f64>,
}

impl Record {
    pub fn new(
        time: DateTime<Utc>,
        location: impl Into<String>,
        source: impl Into<String>,
        measurement_class: MeasurementClass,
        quantity: impl Into<String>,
        value: Option<f64>,
    ) -> Self {
        Self {
            time,
            location: location.into(),
            source: source.into(),
            measurement_class,
            quantity: quantity.into(),
            value,
        }
    }

    /// True when every tag needed for grouping is present.
    pub fn has_complete_tags(&self) -> bool {
        !self.location.is_empty() && !self.source.is_empty() && !self.quantity.is_empty()
    }
}

/// Counts of rows rejected while turning a canonical table into records.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecordParseStats {
    pub rows: usize,
    pub unparseable_time: usize,
    pub unknown_measurement: usize,
}

impl RecordParseStats {
    pub fn rejected(&self) -> usize {
        self.unparseable_time + self.unknown_measurement
    }

    pub fn absorb(&mut self, other: &RecordParseStats) {
        self.rows += other.rows;
        self.unparseable_time += other.unparseable_time;
        self.unknown_measurement += other.unknown_measurement;
    }
}

/// Convert a reconciled table into records, dropping rows with unparseable
/// time or an unknown measurement class.
pub fn records_from_table(table: &RawTable) -> Result<(Vec<Record>, RecordParseStats)> {
    let index = |name: &str| {
        table.column_index(name).ok_or_else(|| ProcessingError::Schema {
            path: table.origin().to_string(),
            missing: vec![name.to_string()],
            found: table.columns().to_vec(),
        })
    };
    let time_idx = index(COL_TIME)?;
    let location_idx = index(COL_LOCATION)?;
    let source_idx = index(COL_SOURCE)?;
    let measurement_idx = index(COL_MEASUREMENT)?;
    let key_idx = index(COL_DATA_KEY)?;
    let value_idx = index(COL_DATA_VALUE)?;

    let mut stats = RecordParseStats::default();
    let mut records = Vec::with_capacity(table.len());

    for row in table.rows() {
        stats.rows += 1;

        let Some(time) = parse_utc_timestamp(RawTable::cell(row, time_idx)) else {
            stats.unparseable_time += 1;
            continue;
        };

        let Ok(measurement_class) = RawTable::cell(row, measurement_idx).parse::<MeasurementClass>()
        else {
            stats.unknown_measurement += 1;
            continue;
        };

        records.push(Record {
            time,
            location: RawTable::cell(row, location_idx).to_string(),
            source: RawTable::cell(row, source_idx).to_string(),
            measurement_class,
            quantity: RawTable::cell(row, key_idx).to_string(),
            value: parse_value(RawTable::cell(row, value_idx)),
        });
    }

    Ok((records, stats))
}

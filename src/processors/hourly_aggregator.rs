use chrono::{DateTime, Utc};
use std::collections::BTreeMap;

use crate::models::{AggregateRow, MeasurementClass, Record};
use crate::utils::time::floor_to_hour;

type GroupKey = (DateTime<Utc>, String, String, String);

/// Result of aggregating one batch of records.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AggregationOutcome {
    /// Sorted by `(hour, location, source, quantity)`.
    pub rows: Vec<AggregateRow>,
    /// Records without location, source or quantity.
    pub dropped_records: usize,
    /// Records with a missing value; they count toward no group.
    pub null_values: usize,
    /// Readings replaced by a later reading with the same timestamp and tags.
    pub duplicate_readings: usize,
}

/// Reduces raw records to one row per hour, location, source and quantity.
#[derive(Debug, Clone, Copy, Default)]
pub struct HourlyAggregator;

impl HourlyAggregator {
    pub fn new() -> Self {
        Self
    }

    /// Aggregate with the reducer of `class` (sum or mean) and tag every row with it.
    ///
    /// A reading is identified by its exact timestamp and tags. When overlapping
    /// exports carry the same reading more than once, the last one in `records`
    /// wins and the others are counted in `duplicate_readings`.
    ///
    /// Values are reduced in ascending order, so the floating-point result does
    /// not depend on the input order of distinct readings.
    pub fn aggregate(&self, records: &[Record], class: MeasurementClass) -> AggregationOutcome {
        let mut groups: BTreeMap<GroupKey, BTreeMap<DateTime<Utc>, f64>> = BTreeMap::new();
        let mut outcome = AggregationOutcome::default();

        for record in records {
            if !record.has_complete_tags() {
                outcome.dropped_records += 1;
                continue;
            }
            let Some(value) = record.value else {
                outcome.null_values += 1;
                continue;
            };

            let readings = groups
                .entry((
                    floor_to_hour(record.time),
                    record.location.clone(),
                    record.source.clone(),
                    record.quantity.clone(),
                ))
                .or_default();
            if readings.insert(record.time, value).is_some() {
                outcome.duplicate_readings += 1;
            }
        }

        outcome.rows = groups
            .into_iter()
            .map(|((hour, location, source, quantity), readings)| {
                let mut values: Vec<f64> = readings.into_values().collect();
                values.sort_by(f64::total_cmp);
                let value = reduce(&values, class);
                AggregateRow {
                    hour,
                    location,
                    source,
                    measurement: class,
                    quantity,
                    value: Some(value),
                }
            })
            .collect();

        outcome
    }
}

fn reduce(values: &[f64], class: MeasurementClass) -> f64 {
    let sum: f64 = values.iter().sum();
    match class {
        MeasurementClass::Additive => sum,
        MeasurementClass::Nonadditive => sum / values.len() as f64,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use pretty_assertions::assert_eq;

    fn at(hour: u32, minute: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, hour, minute, 0).unwrap()
    }

    fn record(time: DateTime<Utc>, value: Option<f64>) -> Record {
        Record::new(time, "A", "meter", MeasurementClass::Additive, "energy", value)
    }

    #[test]
    fn test_sum_and_mean_for_same_readings() {
        let records = vec![record(at(5, 10), Some(10.0)), record(at(5, 40), Some(20.0))];
        let aggregator = HourlyAggregator::new();

        let additive = aggregator.aggregate(&records, MeasurementClass::Additive);
        assert_eq!(additive.rows.len(), 1);
        assert_eq!(additive.rows[0].hour, at(5, 0));
        assert_eq!(additive.rows[0].value, Some(30.0));
        assert_eq!(additive.rows[0].measurement, MeasurementClass::Additive);

        let nonadditive = aggregator.aggregate(&records, MeasurementClass::Nonadditive);
        assert_eq!(nonadditive.rows[0].value, Some(15.0));
        assert_eq!(nonadditive.rows[0].measurement, MeasurementClass::Nonadditive);
    }

    #[test]
    fn test_nulls_are_excluded_and_all_null_groups_vanish() {
        let records = vec![
            record(at(1, 0), None),
            record(at(1, 30), Some(4.0)),
            record(at(2, 0), None),
        ];

        let outcome = HourlyAggregator::new().aggregate(&records, MeasurementClass::Nonadditive);
        assert_eq!(outcome.rows.len(), 1);
        assert_eq!(outcome.rows[0].value, Some(4.0));
        assert_eq!(outcome.null_values, 2);
    }

    #[test]
    fn test_incomplete_tags_are_dropped() {
        let mut orphan = record(at(1, 0), Some(1.0));
        orphan.source.clear();

        let outcome = HourlyAggregator::new().aggregate(&[orphan], MeasurementClass::Additive);
        assert!(outcome.rows.is_empty());
        assert_eq!(outcome.dropped_records, 1);
    }

    #[test]
    fn test_result_independent_of_input_order() {
        let values = [0.1, 1e16, -1e16, 0.2, 0.3, 7.25, -3.5];
        let forward: Vec<Record> = values
            .iter()
            .enumerate()
            .map(|(i, v)| record(at(3, i as u32), Some(*v)))
            .collect();
        let mut reversed = forward.clone();
        reversed.reverse();
        let mut rotated = forward.clone();
        rotated.rotate_left(3);

        let aggregator = HourlyAggregator::new();
        for class in MeasurementClass::ALL {
            let expected = aggregator.aggregate(&forward, class);
            assert_eq!(aggregator.aggregate(&reversed, class), expected);
            assert_eq!(aggregator.aggregate(&rotated, class), expected);
        }
    }

    #[test]
    fn test_overlapping_exports_counted_once() {
        let first_export = vec![record(at(0, 15), Some(10.0)), record(at(0, 45), Some(20.0))];
        let mut records = first_export.clone();
        records.extend(first_export);

        let outcome = HourlyAggregator::new().aggregate(&records, MeasurementClass::Additive);
        assert_eq!(outcome.rows.len(), 1);
        assert_eq!(outcome.rows[0].value, Some(30.0));
        assert_eq!(outcome.duplicate_readings, 2);
    }

    #[test]
    fn test_later_reading_wins() {
        let records = vec![
            record(at(0, 15), Some(10.0)),
            record(at(0, 15), Some(12.0)),
            record(at(0, 15), None),
        ];

        let outcome = HourlyAggregator::new().aggregate(&records, MeasurementClass::Nonadditive);
        assert_eq!(outcome.rows[0].value, Some(12.0));
        assert_eq!(outcome.duplicate_readings, 1);
        assert_eq!(outcome.null_values, 1);
    }

    #[test]
    fn test_rows_sorted_by_group_key() {
        let mut b = record(at(0, 0), Some(1.0));
        b.location = "B".to_string();
        let records = vec![record(at(1, 0), Some(1.0)), b, record(at(0, 5), Some(2.0))];

        let outcome = HourlyAggregator::new().aggregate(&records, MeasurementClass::Additive);
        let keys: Vec<(DateTime<Utc>, &str)> = outcome
            .rows
            .iter()
            .map(|r| (r.hour, r.location.as_str()))
            .collect();
        assert_eq!(keys, vec![(at(0, 0), "A"), (at(0, 0), "B"), (at(1, 0), "A")]);
    }
}

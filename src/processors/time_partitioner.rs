use std::iter::Peekable;
use std::vec;

use crate::models::{MonthKey, Record};

/// Records of one UTC calendar month.
#[derive(Debug, Clone, PartialEq)]
pub struct MonthlyBucket {
    pub key: MonthKey,
    pub records: Vec<Record>,
}

impl MonthlyBucket {
    /// An empty month between the first and last reading.
    pub fn is_gap(&self) -> bool {
        self.records.is_empty()
    }
}

/// Splits records into consecutive monthly buckets.
#[derive(Debug, Clone, Copy, Default)]
pub struct TimePartitioner;

impl TimePartitioner {
    pub fn new() -> Self {
        Self
    }

    /// Lazily yield one bucket per month from the earliest to the latest
    /// record, including empty months in between.
    pub fn partition(&self, mut records: Vec<Record>) -> MonthlyPartitions {
        records.sort_by(|a, b| a.time.cmp(&b.time));

        let first = records.first().map(|r| MonthKey::of(&r.time));
        let last = records.last().map(|r| MonthKey::of(&r.time));

        MonthlyPartitions {
            records: records.into_iter().peekable(),
            next_key: first,
            last,
        }
    }
}

/// Iterator returned by [`TimePartitioner::partition`].
pub struct MonthlyPartitions {
    records: Peekable<vec::IntoIter<Record>>,
    next_key: Option<MonthKey>,
    last: Option<MonthKey>,
}

impl MonthlyPartitions {
    /// Months still to be yielded.
    pub fn remaining_months(&self) -> Vec<MonthKey> {
        match (self.next_key, self.last) {
            (Some(next), Some(last)) => MonthKey::range_inclusive(next, last),
            _ => Vec::new(),
        }
    }
}

impl Iterator for MonthlyPartitions {
    type Item = MonthlyBucket;

    fn next(&mut self) -> Option<MonthlyBucket> {
        let key = self.next_key?;
        let last = self.last?;
        if key > last {
            self.next_key = None;
            return None;
        }

        let mut records = Vec::new();
        while let Some(record) = self.records.next_if(|r| key.contains(&r.time)) {
            records.push(record);
        }

        self.next_key = Some(key.succ());
        Some(MonthlyBucket { key, records })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::MeasurementClass;
    use chrono::{DateTime, Utc};
    use pretty_assertions::assert_eq;

    fn record(time: &str) -> Record {
        let time = DateTime::parse_from_rfc3339(time).unwrap().with_timezone(&Utc);
        Record::new(time, "A", "meter", MeasurementClass::Additive, "energy", Some(1.0))
    }

    #[test]
    fn test_every_record_lands_in_exactly_one_bucket() {
        let records = vec![
            record("2024-03-31T23:59:59Z"),
            record("2024-01-01T00:00:00Z"),
            record("2024-01-31T23:00:00Z"),
            record("2024-03-01T00:00:00Z"),
        ];
        let total = records.len();

        let buckets: Vec<MonthlyBucket> = TimePartitioner::new().partition(records).collect();

        let keys: Vec<String> = buckets.iter().map(|b| b.key.to_string()).collect();
        assert_eq!(keys, vec!["2024-01", "2024-02", "2024-03"]);
        assert_eq!(buckets.iter().map(|b| b.records.len()).sum::<usize>(), total);
        for bucket in &buckets {
            assert!(bucket.records.iter().all(|r| bucket.key.contains(&r.time)));
        }
        assert!(buckets[1].is_gap());
        assert_eq!(buckets[0].records.len(), 2);
    }

    #[test]
    fn test_no_records_no_buckets() {
        let mut partitions = TimePartitioner::new().partition(Vec::new());
        assert!(partitions.remaining_months().is_empty());
        assert!(partitions.next().is_none());
    }

    #[test]
    fn test_year_boundary_and_short_months() {
        let records = vec![record("2023-12-31T23:30:00Z"), record("2024-03-01T00:00:00Z")];
        let partitions = TimePartitioner::new().partition(records);

        let months: Vec<String> = partitions.remaining_months().iter().map(|m| m.to_string()).collect();
        assert_eq!(months, vec!["2023-12", "2024-01", "2024-02", "2024-03"]);

        let buckets: Vec<MonthlyBucket> = partitions.collect();
        assert_eq!(buckets.len(), 4);
        assert_eq!(buckets.iter().filter(|b| b.is_gap()).count(), 2);
    }

    #[test]
    fn test_month_boundary_is_half_open() {
        let records = vec![record("2024-01-31T23:59:59Z"), record("2024-02-01T00:00:00Z")];
        let buckets: Vec<MonthlyBucket> = TimePartitioner::new().partition(records).collect();
        assert_eq!(buckets[0].records.len(), 1);
        assert_eq!(buckets[1].records.len(), 1);
        assert_eq!(buckets[1].key.to_string(), "2024-02");
    }
}

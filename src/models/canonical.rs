use chrono::{DateTime, Utc};

use super::AggregateRow;

/// The merged, sorted, key-unique publication table.
///
/// Only the merge stage constructs one; afterwards it is read-only.
#[derive(Debug, Clone, PartialEq)]
pub struct CanonicalTable {
    rows: Vec<AggregateRow>,
}

impl CanonicalTable {
    pub(crate) fn from_sorted_rows(rows: Vec<AggregateRow>) -> Self {
        Self { rows }
    }

    pub fn rows(&self) -> &[AggregateRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn time_range(&self) -> Option<(DateTime<Utc>, DateTime<Utc>)> {
        // rows are sorted by time first
        match (self.rows.first(), self.rows.last()) {
            (Some(first), Some(last)) => Some((first.hour, last.hour)),
            _ => None,
        }
    }
}

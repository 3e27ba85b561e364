pub mod aggregate;
pub mod canonical;
pub mod month;
pub mod record;
pub mod table;

pub use aggregate::{format_value, AggregateRow, MonthlyAggregate, PrimaryKey};
pub use canonical::CanonicalTable;
pub use month::MonthKey;
pub use record::{records_from_table, MeasurementClass, Record, RecordParseStats};
pub use table::RawTable;

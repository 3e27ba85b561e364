pub mod constants;
pub mod filename;
pub mod logging;
pub mod progress;
pub mod time;

pub use constants::*;
pub use filename::{
    dataset_csv_filename, dataset_parquet_filename, expand_inputs, find_monthly_partitions,
    monthly_partition_filename, parse_monthly_partition_filename,
};
pub use logging::init_logging;
pub use progress::ProgressReporter;
pub use time::{floor_to_hour, format_utc_timestamp, parse_utc_timestamp, parse_value};

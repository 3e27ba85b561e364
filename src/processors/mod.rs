pub mod data_merger;
pub mod hourly_aggregator;
pub mod integrity_checker;
pub mod location_normalizer;
pub mod parallel_processor;
pub mod quality_checker;
pub mod run_report;
pub mod schema_reconciler;
pub mod time_partitioner;

pub use data_merger::DataMerger;
pub use hourly_aggregator::{AggregationOutcome, HourlyAggregator};
pub use integrity_checker::{IntegrityChecker, IntegrityReport};
pub use location_normalizer::{LocationMapping, LocationNormalizer};
pub use parallel_processor::{MergeOutcome, ParallelProcessor};
pub use quality_checker::{QualityChecker, QualityReport};
pub use run_report::{RunReport, RunWarning, SkippedFile};
pub use schema_reconciler::{RenameRule, SchemaReconciler, RENAME_RULES, RULESET_VERSION};
pub use time_partitioner::{MonthlyBucket, MonthlyPartitions, TimePartitioner};

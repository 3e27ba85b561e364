use crate::analyzers::{DatasetAnalyzer, DatasetSummary};
use crate::config::{CsvCompression, NormalizationStage, PipelineConfig};
use crate::error::{ProcessingError, Result};
use crate::models::{records_from_table, CanonicalTable, MeasurementClass, MonthKey, Record};
use crate::processors::{
    DataMerger, HourlyAggregator, LocationMapping, LocationNormalizer, MonthlyBucket,
    QualityChecker, RunReport, RunWarning, SchemaReconciler, TimePartitioner,
};
use crate::readers::ConcurrentReader;
use crate::utils::filename::{expand_inputs, find_monthly_partitions, monthly_partition_filename};
use crate::utils::progress::ProgressReporter;
use crate::writers::{CsvWriter, Publisher};
use chrono::Utc;
use rayon::prelude::*;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use tracing::{debug, info, warn};

/// What one month contributed to an aggregation run.
#[derive(Debug)]
struct BucketOutcome {
    key: MonthKey,
    gap: bool,
    written: Vec<PathBuf>,
    dropped_records: usize,
    null_values: usize,
    duplicate_readings: usize,
}

/// Result of the merge stage. `table` is `None` when nothing may be published.
#[derive(Debug)]
pub struct MergeOutcome {
    pub table: Option<CanonicalTable>,
    pub summary: Option<DatasetSummary>,
    pub report: RunReport,
}

/// Drives the stages: read, reconcile, normalize, partition, aggregate,
/// merge and publish.
pub struct ParallelProcessor {
    config: PipelineConfig,
    reconciler: SchemaReconciler,
    normalizer: LocationNormalizer,
    quality: QualityChecker,
}

impl ParallelProcessor {
    pub fn new(config: PipelineConfig) -> Self {
        let reconciler = SchemaReconciler::new()
            .with_infer_measurement_from_path(config.infer_measurement_from_path);
        let quality = QualityChecker::new(config.quality.clone());
        Self {
            config,
            reconciler,
            normalizer: LocationNormalizer::identity(),
            quality,
        }
    }

    /// Build a processor, loading the configured location mapping. Mapping
    /// problems become warnings in `report`.
    pub fn from_config(config: PipelineConfig, report: &mut RunReport) -> Result<Self> {
        let normalizer = match &config.location_map {
            Some(path) => {
                let (mapping, warnings) = LocationMapping::load(path)?;
                for warning in warnings {
                    report.warn(warning);
                }
                LocationNormalizer::new(mapping)
            }
            None => LocationNormalizer::identity(),
        };
        Ok(Self::new(config).with_normalizer(normalizer))
    }

    pub fn with_normalizer(mut self, normalizer: LocationNormalizer) -> Self {
        self.normalizer = normalizer;
        self
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    fn reader(&self) -> ConcurrentReader {
        ConcurrentReader::new(self.config.max_workers)
    }

    /// Read, reconcile and quality-check raw inputs into records. Files that
    /// cannot be read or reconciled are skipped and listed in the report;
    /// failed quality gates are listed as violations.
    pub async fn load_records(
        &self,
        inputs: &[PathBuf],
        report: &mut RunReport,
        progress: Option<&ProgressReporter>,
    ) -> Result<Vec<Record>> {
        let files = expand_inputs(inputs)?;
        if let Some(p) = progress {
            p.set_message(&format!("Reading {} files...", files.len()));
        }

        let normalize_here = self.config.normalization_stage == NormalizationStage::BeforeAggregation;
        let now = Utc::now();
        let mut records = Vec::new();

        for (path, result) in self.reader().read_tables(files).await? {
            let table = match result.and_then(|table| self.reconciler.reconcile(&table)) {
                Ok(table) => table,
                Err(e) => {
                    warn!("Skipping {}: {}", path.display(), e);
                    report.skip(path, e);
                    continue;
                }
            };

            let quality = self.quality.check(&table, now);
            debug!("{}", quality.generate_summary());
            if quality.future_timestamps > 0 {
                report.warn(RunWarning::FutureTimestamps {
                    path: path.display().to_string(),
                    count: quality.future_timestamps,
                });
            }
            for violation in quality.violations {
                warn!("Quality check failed: {}", violation);
                report.quality_violations.push(violation);
            }

            let table = if normalize_here {
                self.normalizer.normalize(&table)
            } else {
                table
            };

            match records_from_table(&table) {
                Ok((parsed, stats)) => {
                    debug!("{}: {} records ({} rejected)", path.display(), parsed.len(), stats.rejected());
                    report.files_read += 1;
                    report.record_parse_stats(&stats);
                    records.extend(parsed);
                }
                Err(e) => report.skip(path, e),
            }
        }

        Ok(records)
    }

    /// Schema and quality report for the given inputs; nothing is written.
    pub async fn validate(&self, inputs: &[PathBuf]) -> Result<RunReport> {
        let mut report = RunReport::new();
        let records = self.load_records(inputs, &mut report, None).await?;
        if records.is_empty() {
            report.warn(RunWarning::EmptyInput {
                stage: "validation".to_string(),
            });
        }
        Ok(report)
    }

    /// Raw inputs to monthly hourly-aggregate files in `output_dir`.
    pub async fn aggregate(
        &self,
        inputs: &[PathBuf],
        output_dir: &Path,
        progress: Option<&ProgressReporter>,
    ) -> Result<RunReport> {
        let mut report = RunReport::new();
        let records = self.load_records(inputs, &mut report, progress).await?;

        if report.has_quality_violations() {
            warn!(
                "Not aggregating: {} quality check(s) failed",
                report.quality_violations.len()
            );
            return Ok(report);
        }

        if records.is_empty() {
            report.warn(RunWarning::EmptyInput {
                stage: "aggregation".to_string(),
            });
            return Ok(report);
        }

        self.aggregate_records(records, output_dir, &mut report, progress)?;

        if let Some(p) = progress {
            p.finish_with_message(&format!(
                "Wrote {} monthly files",
                report.partitions_written.len()
            ));
        }
        Ok(report)
    }

    /// Partition by month and aggregate each month on the rayon pool.
    pub fn aggregate_records(
        &self,
        records: Vec<Record>,
        output_dir: &Path,
        report: &mut RunReport,
        progress: Option<&ProgressReporter>,
    ) -> Result<()> {
        std::fs::create_dir_all(output_dir)?;

        let partitions = TimePartitioner::new().partition(records);
        let months = partitions.remaining_months().len();
        let processed = AtomicUsize::new(0);
        if let Some(p) = progress {
            p.set_length(months as u64);
            p.set_message(&format!("Aggregating {} months...", months));
        }

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.config.max_workers)
            .build()
            .map_err(|e| ProcessingError::Config(e.to_string()))?;

        let outcomes: Result<Vec<BucketOutcome>> = pool.install(|| {
            partitions
                .par_bridge()
                .map(|bucket| {
                    let result = self.process_bucket(bucket, output_dir);

                    processed.fetch_add(1, Ordering::Relaxed);
                    if let Some(p) = progress {
                        p.increment(1);
                    }

                    result
                })
                .collect()
        });

        let mut outcomes = outcomes?;
        outcomes.sort_by_key(|o| o.key);

        for outcome in outcomes {
            if outcome.gap {
                report.warn(RunWarning::PartitionGap { month: outcome.key });
            }
            report.incomplete_records += outcome.dropped_records;
            report.null_values += outcome.null_values;
            report.duplicate_readings += outcome.duplicate_readings;
            report.partitions_written.extend(outcome.written);
        }

        info!(
            "Aggregated {} months into {} files",
            processed.load(Ordering::Relaxed),
            report.partitions_written.len()
        );
        Ok(())
    }

    /// Aggregate one month, one file per measurement class present.
    fn process_bucket(&self, bucket: MonthlyBucket, output_dir: &Path) -> Result<BucketOutcome> {
        let mut outcome = BucketOutcome {
            key: bucket.key,
            gap: bucket.is_gap(),
            written: Vec::new(),
            dropped_records: 0,
            null_values: 0,
            duplicate_readings: 0,
        };

        let compression = self.config.csv_compression;
        let aggregator = HourlyAggregator::new();
        let writer = CsvWriter::new().with_compression(compression);

        for class in MeasurementClass::ALL {
            let class_records: Vec<Record> = bucket
                .records
                .iter()
                .filter(|r| r.measurement_class == class)
                .cloned()
                .collect();
            if class_records.is_empty() {
                continue;
            }

            let aggregated = aggregator.aggregate(&class_records, class);
            outcome.dropped_records += aggregated.dropped_records;
            outcome.null_values += aggregated.null_values;
            outcome.duplicate_readings += aggregated.duplicate_readings;
            if aggregated.rows.is_empty() {
                continue;
            }

            let path = output_dir.join(monthly_partition_filename(class, bucket.key, compression));
            writer.write_rows(&aggregated.rows, &path)?;

            // a month rewritten with the other compression must not be merged twice
            let other = match compression {
                CsvCompression::None => CsvCompression::Zip,
                CsvCompression::Zip => CsvCompression::None,
            };
            let stale = output_dir.join(monthly_partition_filename(class, bucket.key, other));
            if stale.is_file() {
                std::fs::remove_file(&stale)?;
                debug!("removed stale {}", stale.display());
            }
            debug!("{}: {} hourly rows", path.display(), aggregated.rows.len());
            outcome.written.push(path);
        }

        Ok(outcome)
    }

    /// Merge every monthly file in `input_dir`. Integrity violations are
    /// returned in the report with no table; other errors propagate.
    pub async fn merge(
        &self,
        input_dir: &Path,
        progress: Option<&ProgressReporter>,
    ) -> Result<MergeOutcome> {
        let mut report = RunReport::new();
        let files = find_monthly_partitions(input_dir)?;

        if files.is_empty() {
            report.warn(RunWarning::EmptyInput {
                stage: "merge".to_string(),
            });
            return Ok(MergeOutcome {
                table: None,
                summary: None,
                report,
            });
        }

        if let Some(p) = progress {
            p.set_message(&format!("Merging {} monthly files...", files.len()));
        }

        let mut partitions = Vec::with_capacity(files.len());
        for (path, result) in self.reader().read_partitions(files).await? {
            match result {
                Ok(partition) => {
                    report.files_read += 1;
                    report.rows_read += partition.rows.len() + partition.dropped_rows;
                    report.unparseable_time += partition.dropped_rows;
                    partitions.push(partition);
                }
                Err(e) => {
                    warn!("Skipping {}: {}", path.display(), e);
                    report.skip(path, e);
                }
            }
        }

        let mut merger = DataMerger::new();
        if self.config.normalization_stage == NormalizationStage::AtMerge {
            merger = merger.with_normalizer(self.normalizer.clone());
        }

        let table = match merger.merge(partitions) {
            Ok(table) => table,
            Err(e) if e.is_integrity_violation() => {
                report.integrity_violations.extend(e.violation_lines());
                return Ok(MergeOutcome {
                    table: None,
                    summary: None,
                    report,
                });
            }
            Err(e) => return Err(e),
        };

        if table.is_empty() {
            report.warn(RunWarning::EmptyInput {
                stage: "merge".to_string(),
            });
            return Ok(MergeOutcome {
                table: None,
                summary: None,
                report,
            });
        }

        let summary = DatasetAnalyzer::new()
            .with_top_n(self.config.top_data_keys)
            .summarize(&table);

        Ok(MergeOutcome {
            table: Some(table),
            summary: Some(summary),
            report,
        })
    }

    /// Merge and, when the run is clean, publish into `output_dir`.
    pub async fn merge_and_publish(
        &self,
        input_dir: &Path,
        output_dir: &Path,
        progress: Option<&ProgressReporter>,
    ) -> Result<RunReport> {
        let MergeOutcome {
            table,
            summary,
            mut report,
        } = self.merge(input_dir, progress).await?;

        if report.is_failure(self.config.strict) {
            warn!("Not publishing: run has failures");
            return Ok(report);
        }

        if let (Some(table), Some(summary)) = (table, summary) {
            if let Some(p) = progress {
                p.set_message("Publishing...");
            }
            let outcome = Publisher::from_config(&self.config)?.publish(&table, &summary, output_dir)?;
            report.rows_published = table.len();
            report.published = outcome.artifacts;
            for warning in outcome.warnings {
                report.warn(warning);
            }
        }

        if let Some(p) = progress {
            p.finish_with_message(&format!("Published {} rows", report.rows_published));
        }
        Ok(report)
    }

    /// Aggregate into `work_dir`, then merge and publish into `output_dir`.
    pub async fn run(
        &self,
        inputs: &[PathBuf],
        work_dir: &Path,
        output_dir: &Path,
        progress: Option<&ProgressReporter>,
    ) -> Result<RunReport> {
        let mut report = self.aggregate(inputs, work_dir, progress).await?;
        if report.is_failure(self.config.strict) {
            return Ok(report);
        }

        let merged = self.merge_and_publish(work_dir, output_dir, progress).await?;
        report.absorb(merged);
        Ok(report)
    }
}

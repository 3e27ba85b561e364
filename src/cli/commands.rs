use crate::analyzers::DatasetAnalyzer;
use crate::cli::args::{Cli, Commands};
use crate::config::PipelineConfig;
use crate::error::{ProcessingError, Result};
use crate::models::AggregateRow;
use crate::processors::{ParallelProcessor, RunReport};
use crate::readers::PartitionReader;
use crate::utils::logging::init_logging;
use crate::utils::progress::ProgressReporter;
use crate::writers::ParquetWriter;
use std::path::Path;
use tracing::info;

pub async fn run(cli: Cli) -> Result<()> {
    init_logging(cli.verbose, cli.log_file.as_deref())?;

    let mut config = PipelineConfig::load(cli.config.as_deref())?;
    if let Some(location_map) = &cli.location_map {
        config.location_map = Some(location_map.clone());
    }
    if let Some(max_workers) = cli.max_workers {
        config.max_workers = max_workers;
    }
    config.strict |= cli.strict;

    match cli.command {
        Commands::Aggregate { input, output_dir } => {
            config.check()?;
            println!("Aggregating {} input path(s) into {}", input.len(), output_dir.display());

            let mut report = RunReport::new();
            let processor = ParallelProcessor::from_config(config.clone(), &mut report)?;
            let progress = ProgressReporter::new_spinner("Aggregating...", cli.quiet);

            report.absorb(processor.aggregate(&input, &output_dir, Some(&progress)).await?);
            finish(report, config.strict)
        }

        Commands::Merge {
            input_dir,
            output_dir,
            dataset_name,
        } => {
            if let Some(name) = dataset_name {
                config.dataset_name = name;
            }
            config.check()?;
            println!("Merging {} into {}", input_dir.display(), output_dir.display());

            let mut report = RunReport::new();
            let processor = ParallelProcessor::from_config(config.clone(), &mut report)?;
            let progress = ProgressReporter::new_spinner("Merging...", cli.quiet);

            report.absorb(
                processor
                    .merge_and_publish(&input_dir, &output_dir, Some(&progress))
                    .await?,
            );
            finish(report, config.strict)
        }

        Commands::Run {
            input,
            work_dir,
            output_dir,
            dataset_name,
        } => {
            if let Some(name) = dataset_name {
                config.dataset_name = name;
            }
            config.check()?;
            println!(
                "Running pipeline: {} input path(s), work dir {}, output dir {}",
                input.len(),
                work_dir.display(),
                output_dir.display()
            );

            let mut report = RunReport::new();
            let processor = ParallelProcessor::from_config(config.clone(), &mut report)?;
            let progress = ProgressReporter::new_spinner("Processing...", cli.quiet);

            report.absorb(
                processor
                    .run(&input, &work_dir, &output_dir, Some(&progress))
                    .await?,
            );
            finish(report, config.strict)
        }

        Commands::Validate { input } => {
            config.check()?;
            println!("Validating {} input path(s)", input.len());

            let mut report = RunReport::new();
            let processor = ParallelProcessor::from_config(config.clone(), &mut report)?;
            report.absorb(processor.validate(&input).await?);

            if report.skipped_files.is_empty() {
                println!("✅ All files reconcile to the canonical schema");
            } else {
                println!("⚠️  {} file(s) do not reconcile", report.skipped_files.len());
            }
            if report.has_quality_violations() {
                println!("❌ {} quality check(s) failed", report.quality_violations.len());
            } else {
                println!("✅ All quality checks passed");
            }
            finish(report, config.strict)
        }

        Commands::Info { file, sample } => show_info(&file, sample, config.top_data_keys),
    }
}

/// Print the report and turn a failed run into an error.
fn finish(report: RunReport, strict: bool) -> Result<()> {
    println!("\n{}", report.generate_summary());

    if report.is_failure(strict) {
        return Err(ProcessingError::RunFailed(format!(
            "{} integrity violation(s), {} quality violation(s), {} skipped file(s)",
            report.integrity_violations.len(),
            report.quality_violations.len(),
            report.skipped_files.len()
        )));
    }

    info!("Run complete");
    Ok(())
}

fn show_info(file: &Path, sample: usize, top_n: usize) -> Result<()> {
    println!("Analyzing file: {}", file.display());

    let is_parquet = file
        .extension()
        .map(|ext| ext.eq_ignore_ascii_case("parquet"))
        .unwrap_or(false);

    let summary = DatasetAnalyzer::new().with_top_n(top_n).analyze_file(file)?;
    println!("\n{}", summary.detailed_summary());

    let rows: Vec<AggregateRow> = if is_parquet {
        let writer = ParquetWriter::new();
        println!("\nFile Details:");
        println!("{}", writer.get_file_info(file)?.summary());
        writer.read_sample_rows(file, sample)?
    } else {
        PartitionReader::new()
            .read(file)?
            .rows
            .into_iter()
            .take(sample)
            .collect()
    };

    if sample > 0 {
        println!("\nSample Rows (showing {} rows):", rows.len());
        for row in &rows {
            println!("  {}", row.to_csv_record().join(","));
        }
    }

    Ok(())
}

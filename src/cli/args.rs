use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "sensor-dataset")]
#[command(about = "Hourly aggregation and publishing pipeline for building sensor feeds")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    #[arg(short, long, global = true, help = "Enable verbose logging")]
    pub verbose: bool,

    #[arg(long, global = true, help = "Log file path")]
    pub log_file: Option<PathBuf>,

    #[arg(short, long, global = true, help = "Pipeline configuration file (TOML)")]
    pub config: Option<PathBuf>,

    #[arg(long, global = true, help = "Location mapping CSV with 'from' and 'to' columns")]
    pub location_map: Option<PathBuf>,

    #[arg(long, global = true, help = "Worker threads for reading and aggregation")]
    pub max_workers: Option<usize>,

    #[arg(long, global = true, help = "Fail the run when any input file is skipped")]
    pub strict: bool,

    #[arg(short, long, global = true, help = "Hide progress spinners")]
    pub quiet: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Aggregate raw readings into monthly hourly files
    Aggregate {
        #[arg(short, long, required = true, num_args = 1.., help = "Input CSV files or directories")]
        input: Vec<PathBuf>,

        #[arg(short, long, help = "Directory for {measurement}_{YYYY-MM}.hourly.csv files")]
        output_dir: PathBuf,
    },

    /// Merge monthly hourly files and publish the dataset
    Merge {
        #[arg(short, long, help = "Directory containing monthly hourly files")]
        input_dir: PathBuf,

        #[arg(short, long, help = "Publication directory")]
        output_dir: PathBuf,

        #[arg(long, help = "Dataset name used for file names and metadata")]
        dataset_name: Option<String>,
    },

    /// Aggregate, merge and publish in one go
    Run {
        #[arg(short, long, required = true, num_args = 1.., help = "Input CSV files or directories")]
        input: Vec<PathBuf>,

        #[arg(short, long, help = "Directory for monthly hourly files")]
        work_dir: PathBuf,

        #[arg(short, long, help = "Publication directory")]
        output_dir: PathBuf,

        #[arg(long, help = "Dataset name used for file names and metadata")]
        dataset_name: Option<String>,
    },

    /// Check schema reconciliation and quality gates without writing anything
    Validate {
        #[arg(short, long, required = true, num_args = 1.., help = "Input CSV files or directories")]
        input: Vec<PathBuf>,
    },

    /// Display information about a published CSV or Parquet file
    Info {
        #[arg(short, long)]
        file: PathBuf,

        #[arg(short, long, default_value = "10")]
        sample: usize,
    },
}

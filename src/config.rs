//! Run configuration.
//!
//! The pipeline never reads the process environment itself: the CLI layer
//! builds one [`PipelineConfig`] from defaults, an optional TOML file and
//! `SENSOR_DATASET_*` variables, then hands it to every stage.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use validator::Validate;

use crate::error::{ProcessingError, Result};
use crate::utils::constants::{
    COMPRESSION_GZIP, COMPRESSION_LZ4, COMPRESSION_NONE, COMPRESSION_SNAPPY, COMPRESSION_ZSTD,
    DEFAULT_DATASET_NAME, DEFAULT_LICENSE, DEFAULT_TOP_DATA_KEYS, ENV_PREFIX,
};

/// Where location remapping is applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NormalizationStage {
    /// Remap raw records before hourly grouping, so merged locations share one bucket.
    #[default]
    BeforeAggregation,
    /// Remap rows of monthly aggregate files while merging.
    AtMerge,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CsvCompression {
    #[default]
    None,
    Zip,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RemoteKind {
    /// Copy artifacts into a local or mounted directory.
    Directory,
    /// Copy artifacts with `rclone copyto` to a configured remote.
    Rclone,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteConfig {
    pub kind: RemoteKind,
    /// Directory path or rclone remote prefix such as `drive:Public`.
    pub destination: String,
}

/// Per-file gates checked before a raw file is aggregated. Unset gates are off.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct QualityThresholds {
    /// Largest accepted share of rows with an empty `data_value`, from 0 to 1.
    #[validate(range(min = 0.0, max = 1.0))]
    pub max_null_fraction: Option<f64>,

    pub min_rows: Option<usize>,

    pub max_rows: Option<usize>,

    /// Fail a file that has any timestamp that does not parse.
    pub reject_invalid_timestamps: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct PipelineConfig {
    #[validate(length(min = 1, max = 128))]
    pub dataset_name: String,

    pub location_map: Option<PathBuf>,

    pub normalization_stage: NormalizationStage,

    #[validate(range(min = 1, max = 1000))]
    pub top_data_keys: usize,

    pub csv_compression: CsvCompression,

    pub write_parquet: bool,

    pub parquet_compression: String,

    #[validate(range(min = 1, max = 1024))]
    pub max_workers: usize,

    /// Fail the run when any input file had to be skipped.
    pub strict: bool,

    /// Fill a missing `measurement` column from an `additive_`/`nonadditive_` file name prefix.
    pub infer_measurement_from_path: bool,

    pub remote: Option<RemoteConfig>,

    pub homepage: Option<String>,

    #[validate(length(min = 1))]
    pub license: String,

    #[validate(nested)]
    pub quality: QualityThresholds,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            dataset_name: DEFAULT_DATASET_NAME.to_string(),
            location_map: None,
            normalization_stage: NormalizationStage::default(),
            top_data_keys: DEFAULT_TOP_DATA_KEYS,
            csv_compression: CsvCompression::default(),
            write_parquet: true,
            parquet_compression: COMPRESSION_GZIP.to_string(),
            max_workers: num_cpus::get(),
            strict: false,
            infer_measurement_from_path: true,
            remote: None,
            homepage: None,
            license: DEFAULT_LICENSE.to_string(),
            quality: QualityThresholds::default(),
        }
    }
}

impl PipelineConfig {
    /// Layer defaults, an optional TOML file and `SENSOR_DATASET_*` variables.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut builder = config::Config::builder();

        if let Some(path) = path {
            if !path.exists() {
                return Err(ProcessingError::Config(format!(
                    "Configuration file not found: {}",
                    path.display()
                )));
            }
            builder = builder.add_source(config::File::from(path));
        }

        builder = builder.add_source(
            config::Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        let config: PipelineConfig = builder.build()?.try_deserialize()?;
        config.check()?;
        Ok(config)
    }

    /// Field validation plus cross-field checks.
    pub fn check(&self) -> Result<()> {
        self.validate()?;

        let compression = self.parquet_compression.to_lowercase();
        let known = [
            COMPRESSION_SNAPPY,
            COMPRESSION_GZIP,
            COMPRESSION_LZ4,
            COMPRESSION_ZSTD,
            COMPRESSION_NONE,
        ];
        if !known.contains(&compression.as_str()) {
            return Err(ProcessingError::Config(format!(
                "Unsupported parquet compression: {}",
                self.parquet_compression
            )));
        }

        if self
            .dataset_name
            .chars()
            .any(|c| c == '/' || c == '\\' || c.is_whitespace())
        {
            return Err(ProcessingError::Config(format!(
                "Dataset name must be a plain file stem: '{}'",
                self.dataset_name
            )));
        }

        if let (Some(min), Some(max)) = (self.quality.min_rows, self.quality.max_rows) {
            if min > max {
                return Err(ProcessingError::Config(format!(
                    "quality.min_rows ({}) exceeds quality.max_rows ({})",
                    min, max
                )));
            }
        }

        if let Some(remote) = &self.remote {
            if remote.destination.trim().is_empty() {
                return Err(ProcessingError::Config(
                    "Remote destination must not be empty".to_string(),
                ));
            }
        }

        Ok(())
    }
}

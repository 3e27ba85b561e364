use crate::analyzers::DatasetSummary;
use crate::config::{CsvCompression, PipelineConfig};
use crate::error::{ProcessingError, Result};
use crate::models::CanonicalTable;
use crate::processors::RunWarning;
use crate::readers::TableReader;
use crate::utils::constants::{CANONICAL_COLUMNS, STAGING_PREFIX};
use crate::utils::filename::{dataset_csv_filename, dataset_parquet_filename};
use crate::writers::artifact_store::{store_from_config, ArtifactStore};
use crate::writers::{CsvWriter, MetadataWriter, ParquetWriter};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

#[derive(Debug, Default)]
pub struct PublishOutcome {
    /// Final paths of every artifact, in write order.
    pub artifacts: Vec<PathBuf>,
    pub warnings: Vec<RunWarning>,
}

/// Writes the publication set into a staging directory, validates it, then
/// moves each artifact over the previous one.
///
/// Anything that fails before the move leaves the previous publication as it was.
pub struct Publisher {
    dataset_name: String,
    csv_compression: CsvCompression,
    parquet: Option<ParquetWriter>,
    metadata: MetadataWriter,
    store: Option<Box<dyn ArtifactStore>>,
}

impl Publisher {
    pub fn new(dataset_name: impl Into<String>) -> Self {
        let dataset_name = dataset_name.into();
        Self {
            metadata: MetadataWriter::new().with_dataset_name(dataset_name.clone()),
            dataset_name,
            csv_compression: CsvCompression::None,
            parquet: Some(ParquetWriter::new()),
            store: None,
        }
    }

    pub fn from_config(config: &PipelineConfig) -> Result<Self> {
        let parquet = if config.write_parquet {
            Some(ParquetWriter::new().with_compression(&config.parquet_compression)?)
        } else {
            None
        };

        Ok(Self {
            dataset_name: config.dataset_name.clone(),
            csv_compression: config.csv_compression,
            parquet,
            metadata: MetadataWriter::new()
                .with_dataset_name(config.dataset_name.clone())
                .with_license(config.license.clone())
                .with_homepage(config.homepage.clone()),
            store: config.remote.as_ref().map(store_from_config),
        })
    }

    pub fn with_csv_compression(mut self, compression: CsvCompression) -> Self {
        self.csv_compression = compression;
        self
    }

    pub fn with_parquet(mut self, parquet: Option<ParquetWriter>) -> Self {
        self.parquet = parquet;
        self
    }

    pub fn with_metadata_writer(mut self, metadata: MetadataWriter) -> Self {
        self.metadata = metadata;
        self
    }

    pub fn with_store(mut self, store: Box<dyn ArtifactStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn csv_file_name(&self) -> String {
        dataset_csv_filename(&self.dataset_name, self.csv_compression)
    }

    pub fn publish(
        &self,
        table: &CanonicalTable,
        summary: &DatasetSummary,
        output_dir: &Path,
    ) -> Result<PublishOutcome> {
        std::fs::create_dir_all(output_dir)?;
        let staging = tempfile::Builder::new()
            .prefix(STAGING_PREFIX)
            .tempdir_in(output_dir)?;
        debug!("staging publication in {}", staging.path().display());

        let mut staged = Vec::new();

        let csv_path = staging.path().join(self.csv_file_name());
        CsvWriter::new()
            .with_compression(self.csv_compression)
            .write_table(table, &csv_path)?;
        staged.push(csv_path.clone());

        if let Some(parquet) = &self.parquet {
            let parquet_path = staging.path().join(dataset_parquet_filename(&self.dataset_name));
            parquet.write_table(table, &parquet_path)?;
            staged.push(parquet_path);
        }

        staged.extend(self.metadata.write(summary, staging.path())?);

        verify_staged_csv(&csv_path, table.len())?;

        let mut moves = Vec::with_capacity(staged.len());
        for path in &staged {
            let file_name = path.file_name().ok_or_else(|| {
                ProcessingError::InvalidFormat(format!("Staged path has no file name: {}", path.display()))
            })?;
            let target = output_dir.join(file_name);
            if target.is_dir() {
                return Err(ProcessingError::InvalidFormat(format!(
                    "Cannot replace directory {} with a file",
                    target.display()
                )));
            }
            moves.push((path.clone(), target));
        }

        let mut outcome = PublishOutcome::default();
        for (from, to) in moves {
            std::fs::rename(&from, &to)?;
            outcome.artifacts.push(to);
        }
        info!(
            "Published {} rows as {} artifacts in {}",
            table.len(),
            outcome.artifacts.len(),
            output_dir.display()
        );

        if let Some(store) = &self.store {
            outcome.warnings = upload_all(store.as_ref(), &outcome.artifacts);
        }

        Ok(outcome)
    }
}

/// Re-read a staged CSV and compare header and row count with what was written.
pub fn verify_staged_csv(path: &Path, expected_rows: usize) -> Result<()> {
    let staged = TableReader::new().read(path)?;

    if staged.columns().iter().map(String::as_str).ne(CANONICAL_COLUMNS.iter().copied()) {
        return Err(ProcessingError::InvalidFormat(format!(
            "Staged {} has header {:?}",
            path.display(),
            staged.columns()
        )));
    }
    if staged.len() != expected_rows {
        return Err(ProcessingError::InvalidFormat(format!(
            "Staged {} has {} rows, expected {}",
            path.display(),
            staged.len(),
            expected_rows
        )));
    }

    Ok(())
}

/// Upload every artifact; failures become warnings.
fn upload_all(store: &dyn ArtifactStore, artifacts: &[PathBuf]) -> Vec<RunWarning> {
    let mut warnings = Vec::new();
    for path in artifacts {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        if let Err(e) = store.copy_to(path, &name) {
            warnings.push(RunWarning::UploadFailed {
                path: path.display().to_string(),
                destination: store.describe(),
                message: e.to_string(),
            });
        }
    }
    warnings
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzers::DatasetAnalyzer;
    use crate::models::{AggregateRow, MeasurementClass};
    use crate::writers::artifact_store::{DirectoryStore, RcloneStore};
    use chrono::{TimeZone, Utc};

    fn table() -> CanonicalTable {
        let rows = (0..3)
            .map(|h| {
                AggregateRow::new(
                    Utc.with_ymd_and_hms(2024, 1, 1, h, 0, 0).unwrap(),
                    "A",
                    "meter",
                    MeasurementClass::Additive,
                    "energy",
                    Some(1.0),
                )
            })
            .collect();
        CanonicalTable::from_sorted_rows(rows)
    }

    fn staging_dirs(dir: &Path) -> usize {
        std::fs::read_dir(dir)
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name().to_string_lossy().starts_with(STAGING_PREFIX))
            .count()
    }

    #[test]
    fn test_publish_writes_all_artifacts() -> Result<()> {
        let out = tempfile::tempdir()?;
        let table = table();
        let summary = DatasetAnalyzer::new().summarize(&table);

        let outcome = Publisher::new("building").publish(&table, &summary, out.path())?;

        let names: Vec<String> = outcome
            .artifacts
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().to_string())
            .collect();
        assert_eq!(
            names,
            vec!["building.csv", "building.parquet", "schema.json", "README.md", "LICENSE"]
        );
        assert!(outcome.artifacts.iter().all(|p| p.exists()));
        assert_eq!(staging_dirs(out.path()), 0);
        Ok(())
    }

    #[test]
    fn test_failed_publish_keeps_previous_artifacts() -> Result<()> {
        let out = tempfile::tempdir()?;
        std::fs::write(out.path().join("building.csv"), "previous")?;
        // a directory where the parquet file should go cannot be replaced
        std::fs::create_dir(out.path().join("building.parquet"))?;
        std::fs::write(out.path().join("building.parquet").join("keep"), "x")?;

        let table = table();
        let summary = DatasetAnalyzer::new().summarize(&table);
        let result = Publisher::new("building").publish(&table, &summary, out.path());

        assert!(result.is_err());
        assert_eq!(std::fs::read_to_string(out.path().join("building.csv"))?, "previous");
        assert!(!out.path().join("schema.json").exists());
        assert_eq!(staging_dirs(out.path()), 0);
        Ok(())
    }

    #[test]
    fn test_verify_detects_truncation() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("x.csv");
        std::fs::write(&path, "time,location,source,measurement,data_key,data_value\n")?;
        assert!(verify_staged_csv(&path, 0).is_ok());
        assert!(verify_staged_csv(&path, 1).is_err());

        std::fs::write(&path, "time,location\n")?;
        assert!(verify_staged_csv(&path, 0).is_err());
        Ok(())
    }

    #[test]
    fn test_zip_and_uploads() -> Result<()> {
        let out = tempfile::tempdir()?;
        let remote = tempfile::tempdir()?;
        let table = table();
        let summary = DatasetAnalyzer::new().summarize(&table);

        let outcome = Publisher::new("building")
            .with_csv_compression(CsvCompression::Zip)
            .with_parquet(None)
            .with_store(Box::new(DirectoryStore::new(remote.path())))
            .publish(&table, &summary, out.path())?;

        assert!(outcome.warnings.is_empty());
        assert!(remote.path().join("building.csv.zip").exists());
        assert!(remote.path().join("schema.json").exists());
        assert!(!out.path().join("building.parquet").exists());
        Ok(())
    }

    #[test]
    fn test_upload_failure_is_warning() -> Result<()> {
        let out = tempfile::tempdir()?;
        let table = table();
        let summary = DatasetAnalyzer::new().summarize(&table);

        let outcome = Publisher::new("building")
            .with_parquet(None)
            .with_store(Box::new(RcloneStore::new("drive:x").with_program("/nonexistent/rclone")))
            .publish(&table, &summary, out.path())?;

        assert_eq!(outcome.warnings.len(), outcome.artifacts.len());
        assert!(out.path().join("building.csv").exists());
        Ok(())
    }
}

use crate::models::PrimaryKey;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, ProcessingError>;

#[derive(Error, Debug)]
pub enum ProcessingError {
    #[error("File I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV parsing error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Parquet write error: {0}")]
    Parquet(#[from] parquet::errors::ParquetError),

    #[error("Arrow error: {0}")]
    Arrow(#[from] arrow::error::ArrowError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Zip archive error: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Configuration loading error: {0}")]
    ConfigLoad(#[from] config::ConfigError),

    #[error("Validation error: {0}")]
    Validation(#[from] validator::ValidationErrors),

    #[error("Invalid data format: {0}")]
    InvalidFormat(String),

    #[error("Invalid month key: '{0}' (expected YYYY-MM)")]
    InvalidMonthKey(String),

    #[error("Schema error in {path}: missing columns {missing:?} (found {found:?})")]
    Schema {
        path: String,
        missing: Vec<String>,
        found: Vec<String>,
    },

    #[error("Duplicate primary keys ({}): {}", keys.len(), format_keys(keys))]
    DuplicateKeys { keys: Vec<PrimaryKey> },

    #[error("Empty required columns ({}): {}", violations.len(), violations.join("; "))]
    EmptyKeyColumns { violations: Vec<String> },

    #[error(
        "Integrity violations: {} rows with empty key columns, {} duplicate primary keys",
        empty_keys.len(),
        duplicates.len()
    )]
    IntegrityViolations {
        empty_keys: Vec<String>,
        duplicates: Vec<PrimaryKey>,
    },

    #[error("Upload of {path} to {destination} failed: {message}")]
    Upload {
        path: String,
        destination: String,
        message: String,
    },

    #[error("Run failed: {0}")]
    RunFailed(String),

    #[error("Async task error: {0}")]
    TaskJoin(#[from] tokio::task::JoinError),
}

impl ProcessingError {
    /// Errors that leave the merged table internally inconsistent.
    pub fn is_integrity_violation(&self) -> bool {
        matches!(
            self,
            ProcessingError::DuplicateKeys { .. }
                | ProcessingError::EmptyKeyColumns { .. }
                | ProcessingError::IntegrityViolations { .. }
        )
    }

    /// Human-readable lines describing every violation carried by this error.
    pub fn violation_lines(&self) -> Vec<String> {
        match self {
            ProcessingError::DuplicateKeys { keys } => duplicate_lines(keys),
            ProcessingError::EmptyKeyColumns { violations } => violations.clone(),
            ProcessingError::IntegrityViolations {
                empty_keys,
                duplicates,
            } => {
                let mut lines = empty_keys.clone();
                lines.extend(duplicate_lines(duplicates));
                lines
            }
            other => vec![other.to_string()],
        }
    }
}

fn duplicate_lines(keys: &[PrimaryKey]) -> Vec<String> {
    keys.iter()
        .map(|key| format!("duplicate primary key {}", key))
        .collect()
}

fn format_keys(keys: &[PrimaryKey]) -> String {
    let shown: Vec<String> = keys.iter().take(20).map(|k| k.to_string()).collect();
    if keys.len() > shown.len() {
        format!("{} ... and {} more", shown.join(", "), keys.len() - shown.len())
    } else {
        shown.join(", ")
    }
}

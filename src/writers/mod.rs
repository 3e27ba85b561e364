pub mod artifact_store;
pub mod csv_writer;
pub mod metadata_writer;
pub mod parquet_writer;
pub mod publisher;

pub use artifact_store::{ArtifactStore, DirectoryStore, RcloneStore};
pub use csv_writer::{render_csv, CsvWriter};
pub use metadata_writer::{DatasetMetadata, MetadataWriter};
pub use parquet_writer::{ParquetFileInfo, ParquetWriter};
pub use publisher::{PublishOutcome, Publisher};

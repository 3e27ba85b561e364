use crate::config::CsvCompression;
use crate::error::Result;
use crate::models::{AggregateRow, CanonicalTable};
use crate::utils::constants::{CANONICAL_COLUMNS, ZIP_SUFFIX};
use std::io::Write;
use std::path::Path;
use tempfile::NamedTempFile;
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipWriter};

/// Writes canonical rows as UTF-8 CSV, optionally inside a single-entry zip.
///
/// Output is a pure function of the rows: no timestamps end up in the file,
/// including the zip entry's modification time.
pub struct CsvWriter {
    compression: CsvCompression,
}

impl CsvWriter {
    pub fn new() -> Self {
        Self {
            compression: CsvCompression::None,
        }
    }

    pub fn with_compression(mut self, compression: CsvCompression) -> Self {
        self.compression = compression;
        self
    }

    pub fn write_table(&self, table: &CanonicalTable, path: &Path) -> Result<()> {
        self.write_rows(table.rows(), path)
    }

    /// Write through a temporary file in the target directory, then rename,
    /// so a reader never observes a half-written file.
    pub fn write_rows(&self, rows: &[AggregateRow], path: &Path) -> Result<()> {
        let csv_bytes = render_csv(rows)?;
        let bytes = match self.compression {
            CsvCompression::None => csv_bytes,
            CsvCompression::Zip => {
                let file_name = path
                    .file_name()
                    .and_then(|n| n.to_str())
                    .unwrap_or("data.csv.zip");
                let entry = file_name.strip_suffix(ZIP_SUFFIX).unwrap_or(file_name);
                zip_single_entry(entry, &csv_bytes)?
            }
        };

        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        let mut temp = NamedTempFile::new_in(dir)?;
        temp.write_all(&bytes)?;
        temp.as_file().sync_all()?;
        temp.persist(path).map_err(|e| e.error)?;
        Ok(())
    }
}

impl Default for CsvWriter {
    fn default() -> Self {
        Self::new()
    }
}

/// Canonical header followed by one line per row.
pub fn render_csv(rows: &[AggregateRow]) -> Result<Vec<u8>> {
    let mut writer = csv::WriterBuilder::new()
        .terminator(csv::Terminator::Any(b'\n'))
        .from_writer(Vec::with_capacity(rows.len() * 64));

    writer.write_record(CANONICAL_COLUMNS)?;
    for row in rows {
        writer.write_record(row.to_csv_record())?;
    }

    Ok(writer.into_inner().map_err(|e| e.into_error())?)
}

fn zip_single_entry(entry_name: &str, bytes: &[u8]) -> Result<Vec<u8>> {
    let mut zip = ZipWriter::new(std::io::Cursor::new(Vec::new()));
    let options = FileOptions::default()
        .compression_method(CompressionMethod::Deflated)
        .last_modified_time(zip::DateTime::default());
    zip.start_file(entry_name, options)?;
    zip.write_all(bytes)?;
    Ok(zip.finish()?.into_inner())
}

use crate::error::{ProcessingError, Result};
use crate::models::RawTable;
use crate::utils::constants::ZIP_SUFFIX;
use memmap2::Mmap;
use std::fs::File;
use std::io::Read;
use std::path::Path;
use tracing::debug;
use zip::ZipArchive;

/// Reads delimited text files of any naming generation into a [`RawTable`].
///
/// Handles the quirks of database exports: `#` annotation lines, repeated
/// header rows between result tables, a UTF-8 byte-order mark, ragged rows.
pub struct TableReader {
    use_mmap: bool,
    delimiter: u8,
}

impl TableReader {
    pub fn new() -> Self {
        Self {
            use_mmap: false,
            delimiter: b',',
        }
    }

    pub fn with_mmap(mut self, use_mmap: bool) -> Self {
        self.use_mmap = use_mmap;
        self
    }

    pub fn with_delimiter(mut self, delimiter: u8) -> Self {
        self.delimiter = delimiter;
        self
    }

    /// Read a `.csv` file, or the first CSV entry of a `.csv.zip` archive.
    pub fn read(&self, path: &Path) -> Result<RawTable> {
        let origin = path.display().to_string();

        if origin.to_ascii_lowercase().ends_with(ZIP_SUFFIX) {
            let bytes = self.read_zip_entry(path)?;
            return self.parse_bytes(&origin, &bytes);
        }

        let file = File::open(path)?;
        if self.use_mmap && file.metadata()?.len() > 0 {
            // Safety: the map is read-only and dropped before this function returns
            let mmap = unsafe { Mmap::map(&file)? };
            self.parse_bytes(&origin, &mmap)
        } else {
            let mut bytes = Vec::new();
            (&file).read_to_end(&mut bytes)?;
            self.parse_bytes(&origin, &bytes)
        }
    }

    fn read_zip_entry(&self, path: &Path) -> Result<Vec<u8>> {
        let file = File::open(path)?;
        let mut archive = ZipArchive::new(file)?;

        let entry_index = (0..archive.len())
            .find(|&i| {
                archive
                    .by_index(i)
                    .map(|f| !f.is_dir() && f.name().to_ascii_lowercase().ends_with(".csv"))
                    .unwrap_or(false)
            })
            .ok_or_else(|| {
                ProcessingError::InvalidFormat(format!(
                    "No CSV entry found in archive '{}'",
                    path.display()
                ))
            })?;

        let mut entry = archive.by_index(entry_index)?;
        let mut bytes = Vec::with_capacity(entry.size() as usize);
        entry.read_to_end(&mut bytes)?;
        Ok(bytes)
    }

    /// Parse already-loaded bytes. Invalid UTF-8 sequences are replaced.
    pub fn parse_bytes(&self, origin: &str, bytes: &[u8]) -> Result<RawTable> {
        let (text, had_errors) = encoding_rs::UTF_8.decode_with_bom_removal(bytes);
        if had_errors {
            debug!("{}: replaced invalid UTF-8 sequences", origin);
        }

        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .delimiter(self.delimiter)
            .flexible(true)
            .comment(Some(b'#'))
            .trim(csv::Trim::All)
            .from_reader(text.as_bytes());

        let columns: Vec<String> = reader.headers()?.iter().map(str::to_string).collect();

        let mut rows = Vec::new();
        for record in reader.records() {
            let record = record?;

            // Exports repeat the header at the start of every result table
            if record.iter().eq(columns.iter().map(String::as_str)) {
                continue;
            }
            if record.iter().all(str::is_empty) {
                continue;
            }

            rows.push(record.iter().map(str::to_string).collect());
        }

        debug!("{}: read {} rows, columns {:?}", origin, rows.len(), columns);
        Ok(RawTable::new(origin, columns, rows))
    }
}

impl Default for TableReader {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_reads_annotated_export() -> Result<()> {
        let content = "\
#datatype,string,long,dateTime:RFC3339,double,string,string
#group,false,false,false,false,true,true
#default,_result,,,,,
,result,table,_time,_value,_field,location
,,0,2024-01-01T00:00:00Z,1.5,value,A

#datatype,string,long,dateTime:RFC3339,double,string,string
,result,table,_time,_value,_field,location
,,1,2024-01-01T01:00:00Z,2.5,value,B
";
        let reader = TableReader::new();
        let table = reader.parse_bytes("export.csv", content.as_bytes())?;

        assert_eq!(table.columns()[3], "_time");
        assert_eq!(table.len(), 2);
        assert_eq!(RawTable::cell(&table.rows()[1], 6), "B");
        Ok(())
    }

    #[test]
    fn test_strips_bom_and_trims() -> Result<()> {
        let content = "\u{feff}from , to\n 1PP-S1 , Ground floor \n";
        let table = TableReader::new().parse_bytes("map.csv", content.as_bytes())?;

        assert_eq!(table.columns(), &["from".to_string(), "to".to_string()]);
        assert_eq!(RawTable::cell(&table.rows()[0], 1), "Ground floor");
        Ok(())
    }

    #[test]
    fn test_read_file_with_and_without_mmap() -> Result<()> {
        let mut file = NamedTempFile::new()?;
        writeln!(file, "time,location")?;
        writeln!(file, "2024-01-01T00:00:00Z,A")?;
        file.flush()?;

        let plain = TableReader::new().read(file.path())?;
        let mapped = TableReader::new().with_mmap(true).read(file.path())?;

        assert_eq!(plain, mapped);
        assert_eq!(plain.len(), 1);
        Ok(())
    }

    #[test]
    fn test_read_zip_partition() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("additive_2024-01.hourly.csv.zip");
        {
            let file = File::create(&path)?;
            let mut zip = zip::ZipWriter::new(file);
            zip.start_file("additive_2024-01.hourly.csv", zip::write::FileOptions::default())?;
            zip.write_all(b"time,location\n2024-01-01T00:00:00Z,A\n")?;
            zip.finish()?;
        }

        let table = TableReader::new().read(&path)?;
        assert_eq!(table.len(), 1);
        assert_eq!(table.columns()[1], "location");
        Ok(())
    }

    #[test]
    fn test_empty_file_has_no_columns() -> Result<()> {
        let table = TableReader::new().parse_bytes("empty.csv", b"")?;
        assert!(table.columns().is_empty());
        assert!(table.is_empty());
        Ok(())
    }
}

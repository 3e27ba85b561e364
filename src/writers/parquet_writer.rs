use crate::error::{ProcessingError, Result};
use crate::models::{AggregateRow, CanonicalTable, MeasurementClass};
use crate::utils::constants::{
    COL_DATA_KEY, COL_DATA_VALUE, COL_LOCATION, COL_MEASUREMENT, COL_SOURCE, COL_TIME,
    DEFAULT_ROW_GROUP_SIZE,
};
use arrow::array::*;
use arrow::datatypes::{DataType, Field, Schema, TimeUnit};
use arrow::record_batch::RecordBatch;
use chrono::DateTime;
use parquet::arrow::ArrowWriter;
use parquet::basic::{Compression, GzipLevel};
use parquet::file::properties::WriterProperties;
use std::fs::File;
use std::path::Path;
use std::sync::Arc;

/// Columnar copy of the publication table.
pub struct ParquetWriter {
    compression: Compression,
    row_group_size: usize,
}

impl ParquetWriter {
    pub fn new() -> Self {
        Self {
            compression: Compression::GZIP(GzipLevel::default()),
            row_group_size: DEFAULT_ROW_GROUP_SIZE,
        }
    }

    pub fn with_compression(mut self, compression: &str) -> Result<Self> {
        self.compression = match compression.to_lowercase().as_str() {
            "snappy" => Compression::SNAPPY,
            "gzip" => Compression::GZIP(GzipLevel::default()),
            "lz4" => Compression::LZ4,
            "zstd" => Compression::ZSTD(parquet::basic::ZstdLevel::default()),
            "none" => Compression::UNCOMPRESSED,
            _ => {
                return Err(ProcessingError::Config(format!(
                    "Unsupported compression: {}",
                    compression
                )))
            }
        };
        Ok(self)
    }

    pub fn with_row_group_size(mut self, size: usize) -> Self {
        self.row_group_size = size;
        self
    }

    /// Write the table in row-group sized batches.
    pub fn write_table(&self, table: &CanonicalTable, path: &Path) -> Result<()> {
        let schema = self.create_schema();
        let file = File::create(path)?;
        let props = WriterProperties::builder()
            .set_compression(self.compression)
            .set_max_row_group_size(self.row_group_size)
            .build();

        let mut writer = ArrowWriter::try_new(file, schema.clone(), Some(props))?;
        for chunk in table.rows().chunks(self.row_group_size.max(1)) {
            let batch = self.rows_to_batch(chunk, schema.clone())?;
            writer.write(&batch)?;
        }
        writer.close()?;

        Ok(())
    }

    /// Arrow schema mirroring the CSV columns; `time` as UTC milliseconds.
    fn create_schema(&self) -> Arc<Schema> {
        let fields = vec![
            Field::new(
                COL_TIME,
                DataType::Timestamp(TimeUnit::Millisecond, Some("UTC".into())),
                false,
            ),
            Field::new(COL_LOCATION, DataType::Utf8, false),
            Field::new(COL_SOURCE, DataType::Utf8, false),
            Field::new(COL_MEASUREMENT, DataType::Utf8, false),
            Field::new(COL_DATA_KEY, DataType::Utf8, false),
            Field::new(COL_DATA_VALUE, DataType::Float64, true),
        ];

        Arc::new(Schema::new(fields))
    }

    fn rows_to_batch(&self, rows: &[AggregateRow], schema: Arc<Schema>) -> Result<RecordBatch> {
        let times: Vec<i64> = rows.iter().map(|r| r.hour.timestamp_millis()).collect();
        let locations: Vec<&str> = rows.iter().map(|r| r.location.as_str()).collect();
        let sources: Vec<&str> = rows.iter().map(|r| r.source.as_str()).collect();
        let measurements: Vec<&str> = rows.iter().map(|r| r.measurement.as_str()).collect();
        let keys: Vec<&str> = rows.iter().map(|r| r.quantity.as_str()).collect();
        let values: Vec<Option<f64>> = rows.iter().map(|r| r.value).collect();

        let batch = RecordBatch::try_new(
            schema,
            vec![
                Arc::new(TimestampMillisecondArray::from(times).with_timezone("UTC")),
                Arc::new(StringArray::from(locations)),
                Arc::new(StringArray::from(sources)),
                Arc::new(StringArray::from(measurements)),
                Arc::new(StringArray::from(keys)),
                Arc::new(Float64Array::from(values)),
            ],
        )?;

        Ok(batch)
    }

    /// Read up to `limit` rows back.
    pub fn read_sample_rows(&self, path: &Path, limit: usize) -> Result<Vec<AggregateRow>> {
        use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;

        let file = File::open(path)?;
        let reader = ParquetRecordBatchReaderBuilder::try_new(file)?
            .with_batch_size(limit.clamp(1, 8192))
            .build()?;

        let mut rows = Vec::new();
        for batch in reader {
            let batch = batch?;
            let times = column::<TimestampMillisecondArray>(&batch, 0, COL_TIME)?;
            let locations = column::<StringArray>(&batch, 1, COL_LOCATION)?;
            let sources = column::<StringArray>(&batch, 2, COL_SOURCE)?;
            let measurements = column::<StringArray>(&batch, 3, COL_MEASUREMENT)?;
            let keys = column::<StringArray>(&batch, 4, COL_DATA_KEY)?;
            let values = column::<Float64Array>(&batch, 5, COL_DATA_VALUE)?;

            for i in 0..batch.num_rows() {
                if rows.len() >= limit {
                    return Ok(rows);
                }
                let hour = DateTime::from_timestamp_millis(times.value(i)).ok_or_else(|| {
                    ProcessingError::InvalidFormat(format!("Timestamp out of range in {}", path.display()))
                })?;
                rows.push(AggregateRow {
                    hour,
                    location: locations.value(i).to_string(),
                    source: sources.value(i).to_string(),
                    measurement: measurements.value(i).parse::<MeasurementClass>()?,
                    quantity: keys.value(i).to_string(),
                    value: (!values.is_null(i)).then(|| values.value(i)),
                });
            }
        }

        Ok(rows)
    }

    /// Get file statistics
    pub fn get_file_info(&self, path: &Path) -> Result<ParquetFileInfo> {
        use parquet::file::reader::{FileReader, SerializedFileReader};

        let file = File::open(path)?;
        let reader = SerializedFileReader::new(file)?;
        let metadata = reader.metadata();

        let file_metadata = metadata.file_metadata();
        let row_groups = metadata.num_row_groups();
        let total_rows = file_metadata.num_rows();
        let file_size = std::fs::metadata(path)?.len();

        let mut row_group_sizes = Vec::new();
        for i in 0..row_groups {
            let rg_metadata = metadata.row_group(i);
            row_group_sizes.push(rg_metadata.num_rows());
        }

        Ok(ParquetFileInfo {
            total_rows,
            row_groups: row_groups as i32,
            row_group_sizes,
            file_size,
            compression: self.compression,
        })
    }
}

fn column<'a, T: 'static>(batch: &'a RecordBatch, index: usize, name: &str) -> Result<&'a T> {
    batch
        .column(index)
        .as_any()
        .downcast_ref::<T>()
        .ok_or_else(|| ProcessingError::InvalidFormat(format!("Invalid {} column type", name)))
}

impl Default for ParquetWriter {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug)]
pub struct ParquetFileInfo {
    pub total_rows: i64,
    pub row_groups: i32,
    pub row_group_sizes: Vec<i64>,
    pub file_size: u64,
    pub compression: Compression,
}

impl ParquetFileInfo {
    pub fn summary(&self) -> String {
        format!(
            "Parquet File Summary:\n\
            - Total rows: {}\n\
            - Row groups: {}\n\
            - File size: {:.2} MB\n\
            - Compression: {:?}\n\
            - Avg rows per group: {:.0}",
            self.total_rows,
            self.row_groups,
            self.file_size as f64 / 1_048_576.0,
            self.compression,
            self.total_rows as f64 / self.row_groups.max(1) as f64
        )
    }
}

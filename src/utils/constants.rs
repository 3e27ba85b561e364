/// Canonical column names
pub const COL_TIME: &str = "time";
pub const COL_LOCATION: &str = "location";
pub const COL_SOURCE: &str = "source";
pub const COL_MEASUREMENT: &str = "measurement";
pub const COL_DATA_KEY: &str = "data_key";
pub const COL_DATA_VALUE: &str = "data_value";

/// Canonical schema, in on-disk order
pub const CANONICAL_COLUMNS: [&str; 6] = [
    COL_TIME,
    COL_LOCATION,
    COL_SOURCE,
    COL_MEASUREMENT,
    COL_DATA_KEY,
    COL_DATA_VALUE,
];

/// Primary key of the published table
pub const PRIMARY_KEY_COLUMNS: [&str; 5] = [
    COL_TIME,
    COL_MEASUREMENT,
    COL_LOCATION,
    COL_DATA_KEY,
    COL_SOURCE,
];

/// Location mapping columns
pub const MAP_FROM_COLUMN: &str = "from";
pub const MAP_TO_COLUMN: &str = "to";

/// File names
pub const SCHEMA_FILE: &str = "schema.json";
pub const README_FILE: &str = "README.md";
pub const LICENSE_FILE: &str = "LICENSE";
pub const HOURLY_SUFFIX: &str = ".hourly.csv";
pub const ZIP_SUFFIX: &str = ".zip";

/// Dataset defaults
pub const DEFAULT_DATASET_NAME: &str = "sensor_public_dataset";
pub const DEFAULT_TOP_DATA_KEYS: usize = 15;
pub const DEFAULT_LICENSE: &str = "CC BY 4.0";
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";
pub const GENERATED_AT_FORMAT: &str = "%Y-%m-%d %H:%M:%SZ";

/// Processing defaults
pub const DEFAULT_ROW_GROUP_SIZE: usize = 10000;
pub const STAGING_PREFIX: &str = ".staging-";
pub const ENV_PREFIX: &str = "SENSOR_DATASET";

/// Parquet compression options
pub const COMPRESSION_SNAPPY: &str = "snappy";
pub const COMPRESSION_GZIP: &str = "gzip";
pub const COMPRESSION_LZ4: &str = "lz4";
pub const COMPRESSION_ZSTD: &str = "zstd";
pub const COMPRESSION_NONE: &str = "none";

use std::path::{Path, PathBuf};

use super::constants::{HOURLY_SUFFIX, ZIP_SUFFIX};
use crate::config::CsvCompression;
use crate::models::{MeasurementClass, MonthKey};

/// Monthly partition file name: `{measurement}_{YYYY-MM}.hourly.csv[.zip]`
pub fn monthly_partition_filename(
    class: MeasurementClass,
    month: MonthKey,
    compression: CsvCompression,
) -> String {
    let name = format!("{}_{}{}", class.as_str(), month, HOURLY_SUFFIX);
    match compression {
        CsvCompression::None => name,
        CsvCompression::Zip => name + ZIP_SUFFIX,
    }
}

/// Inverse of [`monthly_partition_filename`], also accepting a `.zip` suffix.
pub fn parse_monthly_partition_filename(file_name: &str) -> Option<(MeasurementClass, MonthKey)> {
    let stem = file_name.strip_suffix(ZIP_SUFFIX).unwrap_or(file_name);
    let stem = stem.strip_suffix(HOURLY_SUFFIX)?;
    let (class, month) = stem.split_once('_')?;
    let class = class.parse::<MeasurementClass>().ok()?;
    let month = month.parse::<MonthKey>().ok()?;
    Some((class, month))
}

/// Published table file name for a dataset.
pub fn dataset_csv_filename(dataset_name: &str, compression: CsvCompression) -> String {
    match compression {
        CsvCompression::None => format!("{}.csv", dataset_name),
        CsvCompression::Zip => format!("{}.csv{}", dataset_name, ZIP_SUFFIX),
    }
}

pub fn dataset_parquet_filename(dataset_name: &str) -> String {
    format!("{}.parquet", dataset_name)
}

/// True for `.csv` and `.csv.zip` files.
pub fn is_csv_path(path: &Path) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .map(|n| {
            let n = n.to_ascii_lowercase();
            n.ends_with(".csv") || n.ends_with(".csv.zip")
        })
        .unwrap_or(false)
}

/// Monthly partition files in a directory, sorted by file name.
pub fn find_monthly_partitions(dir: &Path) -> std::io::Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        if !path.is_file() {
            continue;
        }
        let matches = path
            .file_name()
            .and_then(|n| n.to_str())
            .map(|n| parse_monthly_partition_filename(n).is_some())
            .unwrap_or(false);
        if matches {
            files.push(path);
        }
    }
    files.sort();
    files.dedup();
    Ok(files)
}

/// Expand directories into their CSV files; plain files are kept as given.
pub fn expand_inputs(inputs: &[PathBuf]) -> std::io::Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for input in inputs {
        if input.is_dir() {
            let mut found: Vec<PathBuf> = std::fs::read_dir(input)?
                .filter_map(|e| e.ok().map(|e| e.path()))
                .filter(|p| p.is_file() && is_csv_path(p))
                .collect();
            found.sort();
            files.extend(found);
        } else {
            files.push(input.clone());
        }
    }
    files.sort();
    files.dedup();
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_monthly_partition_filename_round_trip() {
        let month = MonthKey::new(2024, 2).unwrap();
        let name = monthly_partition_filename(MeasurementClass::Nonadditive, month, CsvCompression::None);
        assert_eq!(name, "nonadditive_2024-02.hourly.csv");
        assert_eq!(
            parse_monthly_partition_filename(&name),
            Some((MeasurementClass::Nonadditive, month))
        );

        let zipped = monthly_partition_filename(MeasurementClass::Additive, month, CsvCompression::Zip);
        assert_eq!(zipped, "additive_2024-02.hourly.csv.zip");
        assert_eq!(
            parse_monthly_partition_filename(&zipped),
            Some((MeasurementClass::Additive, month))
        );
    }

    #[test]
    fn test_parse_rejects_other_files() {
        assert_eq!(parse_monthly_partition_filename("additive_2024-02.annotated.csv"), None);
        assert_eq!(parse_monthly_partition_filename("pressure_2024-02.hourly.csv"), None);
        assert_eq!(parse_monthly_partition_filename("additive_2024-2.hourly.csv"), None);
    }

    #[test]
    fn test_find_monthly_partitions_sorted() -> std::io::Result<()> {
        let dir = tempfile::tempdir()?;
        for name in [
            "nonadditive_2024-01.hourly.csv",
            "additive_2024-02.hourly.csv",
            "additive_2024-01.hourly.csv",
            "notes.txt",
        ] {
            std::fs::write(dir.path().join(name), "")?;
        }

        let files = find_monthly_partitions(dir.path())?;
        let names: Vec<_> = files
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().to_string())
            .collect();
        assert_eq!(
            names,
            vec![
                "additive_2024-01.hourly.csv",
                "additive_2024-02.hourly.csv",
                "nonadditive_2024-01.hourly.csv"
            ]
        );
        Ok(())
    }

    #[test]
    fn test_dataset_filenames() {
        assert_eq!(dataset_csv_filename("ds", CsvCompression::None), "ds.csv");
        assert_eq!(dataset_csv_filename("ds", CsvCompression::Zip), "ds.csv.zip");
        assert_eq!(dataset_parquet_filename("ds"), "ds.parquet");
    }
}

use pretty_assertions::assert_eq;
use sensor_dataset::config::{NormalizationStage, PipelineConfig};
use sensor_dataset::models::MeasurementClass;
use sensor_dataset::processors::{ParallelProcessor, RunReport, RunWarning};
use sensor_dataset::readers::TableReader;
use sensor_dataset::writers::ParquetWriter;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use validator::Validate;

fn config() -> PipelineConfig {
    PipelineConfig {
        dataset_name: "building".to_string(),
        max_workers: 2,
        ..Default::default()
    }
}

fn write_file(dir: &Path, name: &str, content: &str) -> PathBuf {
    let path = dir.join(name);
    let mut file = std::fs::File::create(&path).expect("create fixture");
    file.write_all(content.as_bytes()).expect("write fixture");
    path
}

/// Two readings (10 and 20) in every hour of 2024-01-01 and 2024-02-01,
/// in the database export naming generation.
fn raw_energy_readings() -> String {
    let mut content = String::from("_time,location,source,_measurement,quantity,_value\n");
    for month in [1, 2] {
        for hour in 0..24 {
            content.push_str(&format!(
                "2024-{:02}-01T{:02}:05:00Z,A,meter,additive,energy,10\n",
                month, hour
            ));
            content.push_str(&format!(
                "2024-{:02}-01T{:02}:35:00Z,A,meter,additive,energy,20\n",
                month, hour
            ));
        }
    }
    content
}

fn monthly_header() -> &'static str {
    "time,location,source,measurement,data_key,data_value\n"
}

#[tokio::test]
async fn test_end_to_end_two_months() {
    let input = TempDir::new().unwrap();
    let work = TempDir::new().unwrap();
    let output = TempDir::new().unwrap();
    write_file(input.path(), "export.csv", &raw_energy_readings());

    let report = ParallelProcessor::new(config())
        .run(&[input.path().to_path_buf()], work.path(), output.path(), None)
        .await
        .unwrap();

    assert!(!report.is_failure(true), "{}", report.generate_summary());
    assert_eq!(report.partitions_written.len(), 2);
    assert!(work.path().join("additive_2024-01.hourly.csv").exists());
    assert!(work.path().join("additive_2024-02.hourly.csv").exists());
    assert_eq!(report.rows_published, 48);

    let published = TableReader::new().read(&output.path().join("building.csv")).unwrap();
    assert_eq!(published.len(), 48);
    assert!(published
        .rows()
        .iter()
        .all(|row| row[1] == "A" && row[2] == "meter" && row[3] == "additive" && row[4] == "energy" && row[5] == "30"));
    assert_eq!(published.rows()[0][0], "2024-01-01T00:00:00Z");
    assert_eq!(published.rows()[47][0], "2024-02-01T23:00:00Z");

    let schema: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(output.path().join("schema.json")).unwrap()).unwrap();
    assert_eq!(schema["rows"], 48);
    assert_eq!(schema["counts"]["measurements"]["additive"], 48);

    let parquet_info = ParquetWriter::new()
        .get_file_info(&output.path().join("building.parquet"))
        .unwrap();
    assert_eq!(parquet_info.total_rows, 48);

    assert!(output.path().join("README.md").exists());
    assert!(output.path().join("LICENSE").exists());
}

#[tokio::test]
async fn test_overlapping_exports_publish_same_dataset() {
    let input = TempDir::new().unwrap();
    let work = TempDir::new().unwrap();
    let output = TempDir::new().unwrap();
    write_file(input.path(), "export.csv", &raw_energy_readings());
    write_file(input.path(), "export_previous.csv", &raw_energy_readings());

    let report = ParallelProcessor::new(config())
        .run(&[input.path().to_path_buf()], work.path(), output.path(), None)
        .await
        .unwrap();

    assert_eq!(report.duplicate_readings, 96);
    assert_eq!(report.rows_published, 48);
    let published = TableReader::new().read(&output.path().join("building.csv")).unwrap();
    assert!(published.rows().iter().all(|row| row[5] == "30"));
}

#[tokio::test]
async fn test_duplicate_keys_block_publication() {
    let work = TempDir::new().unwrap();
    let output = TempDir::new().unwrap();
    let row = "2024-01-01T00:00:00Z,A,meter,additive,energy,30\n";
    write_file(
        work.path(),
        "additive_2024-01.hourly.csv",
        &format!("{}{}", monthly_header(), row),
    );
    // a hand-edited copy of the same month under a different file
    write_file(
        work.path(),
        "nonadditive_2024-01.hourly.csv",
        &format!("{}{}2024-01-01T00:00:00Z,A,thermo,nonadditive,temp,21\n", monthly_header(), row),
    );

    let report = ParallelProcessor::new(config())
        .merge_and_publish(work.path(), output.path(), None)
        .await
        .unwrap();

    assert!(report.is_failure(false));
    assert_eq!(report.integrity_violations.len(), 1);
    assert!(report.integrity_violations[0].contains("2024-01-01T00:00:00Z"));
    assert!(report.generate_summary().contains("nothing was published"));
    assert!(!output.path().join("building.csv").exists());
}

#[tokio::test]
async fn test_strict_run_stops_on_skipped_file() {
    let input = TempDir::new().unwrap();
    let work = TempDir::new().unwrap();
    let output = TempDir::new().unwrap();
    write_file(input.path(), "export.csv", &raw_energy_readings());
    write_file(input.path(), "notes.csv", "when,what\n2024-01-01,cleaning\n");

    let lenient = ParallelProcessor::new(config())
        .run(&[input.path().to_path_buf()], work.path(), output.path(), None)
        .await
        .unwrap();
    assert_eq!(lenient.skipped_files.len(), 1);
    assert_eq!(lenient.rows_published, 48);

    let strict_output = TempDir::new().unwrap();
    let strict = ParallelProcessor::new(PipelineConfig {
        strict: true,
        ..config()
    })
    .run(&[input.path().to_path_buf()], work.path(), strict_output.path(), None)
    .await
    .unwrap();
    assert!(strict.is_failure(true));
    assert!(strict.published.is_empty());
    assert!(!strict_output.path().join("building.csv").exists());
}

#[tokio::test]
async fn test_merge_is_byte_idempotent() {
    let input = TempDir::new().unwrap();
    let work = TempDir::new().unwrap();
    write_file(input.path(), "export.csv", &raw_energy_readings());

    let processor = ParallelProcessor::new(config());
    processor
        .aggregate(&[input.path().to_path_buf()], work.path(), None)
        .await
        .unwrap();

    let first = TempDir::new().unwrap();
    let second = TempDir::new().unwrap();
    processor.merge_and_publish(work.path(), first.path(), None).await.unwrap();
    processor.merge_and_publish(work.path(), second.path(), None).await.unwrap();

    assert_eq!(
        std::fs::read(first.path().join("building.csv")).unwrap(),
        std::fs::read(second.path().join("building.csv")).unwrap()
    );
}

#[tokio::test]
async fn test_location_mapping_at_merge() {
    let work = TempDir::new().unwrap();
    let output = TempDir::new().unwrap();
    let maps = TempDir::new().unwrap();
    write_file(
        work.path(),
        "nonadditive_2024-03.hourly.csv",
        &format!(
            "{}2024-03-01T00:00:00Z,1PP-S1,thermo,nonadditive,temp,21.5\n",
            monthly_header()
        ),
    );
    let map = write_file(maps.path(), "location_map.csv", "from,to\n1PP-S1,Ground floor\n");

    let mut report = RunReport::new();
    let processor = ParallelProcessor::from_config(
        PipelineConfig {
            location_map: Some(map),
            normalization_stage: NormalizationStage::AtMerge,
            ..config()
        },
        &mut report,
    )
    .unwrap();
    assert!(report.warnings.is_empty());

    let outcome = processor.merge(work.path(), None).await.unwrap();
    let table = outcome.table.unwrap();
    assert_eq!(table.rows()[0].location, "Ground floor");
    assert_eq!(table.rows()[0].measurement, MeasurementClass::Nonadditive);

    processor
        .merge_and_publish(work.path(), output.path(), None)
        .await
        .unwrap();
    let published = std::fs::read_to_string(output.path().join("building.csv")).unwrap();
    assert!(published.contains("Ground floor"));
}

#[tokio::test]
async fn test_missing_location_map_is_a_warning() {
    let mut report = RunReport::new();
    let processor = ParallelProcessor::from_config(
        PipelineConfig {
            location_map: Some(PathBuf::from("/nonexistent/location_map.csv")),
            ..config()
        },
        &mut report,
    );

    assert!(processor.is_ok());
    assert!(matches!(
        report.warnings.as_slice(),
        [RunWarning::LocationMapDisabled { .. }]
    ));
}

#[test]
fn test_config_validation() {
    let mut config = config();
    assert!(config.validate().is_ok());

    config.max_workers = 0;
    assert!(config.validate().is_err());
}

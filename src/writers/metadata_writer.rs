use crate::analyzers::DatasetSummary;
use crate::error::Result;
use crate::processors::schema_reconciler::RULESET_VERSION;
use crate::utils::constants::{
    DEFAULT_DATASET_NAME, DEFAULT_LICENSE, GENERATED_AT_FORMAT, LICENSE_FILE, PRIMARY_KEY_COLUMNS,
    README_FILE, SCHEMA_FILE,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ColumnSpec {
    pub name: &'static str,
    #[serde(rename = "type")]
    pub data_type: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timezone: Option<&'static str>,
    #[serde(rename = "enum", skip_serializing_if = "Option::is_none")]
    pub allowed: Option<Vec<&'static str>>,
    pub description: &'static str,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TimeRange {
    pub start: String,
    pub end: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct KeyCount {
    pub data_key: String,
    pub rows: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Counts {
    pub rows: usize,
    pub measurements: BTreeMap<String, usize>,
    pub top_data_keys: Vec<KeyCount>,
}

/// Contents of `schema.json`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DatasetMetadata {
    pub name: String,
    pub created_utc: String,
    pub format: &'static str,
    pub delimiter: &'static str,
    pub encoding: &'static str,
    pub columns: Vec<ColumnSpec>,
    pub primary_key: Vec<&'static str>,
    pub rows: usize,
    pub time_range: Option<TimeRange>,
    pub counts: Counts,
    pub notes: BTreeMap<&'static str, String>,
    pub license: String,
}

fn column_specs() -> Vec<ColumnSpec> {
    vec![
        ColumnSpec {
            name: "time",
            data_type: "datetime",
            timezone: Some("UTC"),
            allowed: None,
            description: "ISO 8601 hourly timestamp (start of the hour)",
        },
        ColumnSpec {
            name: "location",
            data_type: "string",
            timezone: None,
            allowed: None,
            description: "normalized location of the sensor",
        },
        ColumnSpec {
            name: "source",
            data_type: "string",
            timezone: None,
            allowed: None,
            description: "device or system that produced the reading",
        },
        ColumnSpec {
            name: "measurement",
            data_type: "string",
            timezone: None,
            allowed: Some(vec!["additive", "nonadditive"]),
            description: "aggregation class of the quantity",
        },
        ColumnSpec {
            name: "data_key",
            data_type: "string",
            timezone: None,
            allowed: None,
            description: "quantity name",
        },
        ColumnSpec {
            name: "data_value",
            data_type: "number",
            timezone: None,
            allowed: None,
            description: "hourly aggregate: sum for additive, mean for nonadditive; empty when unknown",
        },
    ]
}

/// Renders and writes `schema.json`, `README.md` and `LICENSE` for a published table.
pub struct MetadataWriter {
    dataset_name: String,
    license: String,
    homepage: Option<String>,
    generated_at: Option<DateTime<Utc>>,
}

impl MetadataWriter {
    pub fn new() -> Self {
        Self {
            dataset_name: DEFAULT_DATASET_NAME.to_string(),
            license: DEFAULT_LICENSE.to_string(),
            homepage: None,
            generated_at: None,
        }
    }

    pub fn with_dataset_name(mut self, name: impl Into<String>) -> Self {
        self.dataset_name = name.into();
        self
    }

    pub fn with_license(mut self, license: impl Into<String>) -> Self {
        self.license = license.into();
        self
    }

    pub fn with_homepage(mut self, homepage: Option<String>) -> Self {
        self.homepage = homepage;
        self
    }

    /// Pin the generation timestamp instead of using the current time.
    pub fn with_generated_at(mut self, generated_at: DateTime<Utc>) -> Self {
        self.generated_at = Some(generated_at);
        self
    }

    pub fn build(&self, summary: &DatasetSummary) -> DatasetMetadata {
        let created = self.generated_at.unwrap_or_else(Utc::now);

        let mut notes = BTreeMap::new();
        notes.insert("aggregation", "fixed 1 hour windows in UTC".to_string());
        notes.insert("schema_ruleset", format!("v{}", RULESET_VERSION));
        if let Some(homepage) = &self.homepage {
            notes.insert("homepage", homepage.clone());
        }

        DatasetMetadata {
            name: self.dataset_name.clone(),
            created_utc: created.format(GENERATED_AT_FORMAT).to_string(),
            format: "csv",
            delimiter: ",",
            encoding: "utf-8",
            columns: column_specs(),
            primary_key: PRIMARY_KEY_COLUMNS.to_vec(),
            rows: summary.rows,
            time_range: summary
                .time_range_strings()
                .map(|(start, end)| TimeRange { start, end }),
            counts: Counts {
                rows: summary.rows,
                measurements: summary.measurements.clone(),
                top_data_keys: summary
                    .top_data_keys
                    .iter()
                    .map(|(data_key, rows)| KeyCount {
                        data_key: data_key.clone(),
                        rows: *rows,
                    })
                    .collect(),
            },
            notes,
            license: self.license.clone(),
        }
    }

    pub fn render_schema(&self, metadata: &DatasetMetadata) -> Result<String> {
        Ok(serde_json::to_string_pretty(metadata)?)
    }

    pub fn render_readme(&self, metadata: &DatasetMetadata) -> String {
        let range = match &metadata.time_range {
            Some(range) => format!("{} → {}", range.start, range.end),
            None => "n/a".to_string(),
        };

        let mut readme = String::new();
        readme.push_str(&format!("# {}\n\n", metadata.name));
        readme.push_str(&format!("**Created (UTC):** {}  \n", metadata.created_utc));
        readme.push_str(&format!("**Rows:** {}  \n", metadata.rows));
        readme.push_str(&format!("**Time range:** {}\n\n", range));

        readme.push_str("## Schema (CSV columns)\n\n");
        for column in &metadata.columns {
            readme.push_str(&format!("- `{}` ({}): {}\n", column.name, column.data_type, column.description));
        }
        readme.push_str(&format!(
            "\nPrimary key: `({})`\n\n",
            metadata.primary_key.join(", ")
        ));

        readme.push_str("## Counts\n\n");
        for (measurement, count) in &metadata.counts.measurements {
            readme.push_str(&format!("- {}: {}\n", measurement, count));
        }
        if !metadata.counts.top_data_keys.is_empty() {
            readme.push_str("\n| data_key | rows |\n|---|---:|\n");
            for entry in &metadata.counts.top_data_keys {
                readme.push_str(&format!("| {} | {} |\n", entry.data_key, entry.rows));
            }
        }

        readme.push_str("\n## Provenance\n\n");
        readme.push_str("- Raw readings aggregated into fixed hourly UTC windows.\n");
        readme.push_str("- Monthly additive and nonadditive aggregates merged into a single table.\n");
        readme.push_str("- `location` normalized through the configured location mapping.\n");
        if let Some(homepage) = metadata.notes.get("homepage") {
            readme.push_str(&format!("\nMore information: {}\n", homepage));
        }

        readme.push_str("\n## Citation\n\n");
        readme.push_str(&format!("{}, {}\n", metadata.name, metadata.created_utc));

        readme.push_str("\n## License\n\n");
        readme.push_str(&format!("{}\n", license_text(&metadata.license)));
        readme
    }

    /// Write all metadata files into `dir`, returning their paths.
    pub fn write(&self, summary: &DatasetSummary, dir: &Path) -> Result<Vec<PathBuf>> {
        let metadata = self.build(summary);

        let schema_path = dir.join(SCHEMA_FILE);
        std::fs::write(&schema_path, self.render_schema(&metadata)?)?;

        let readme_path = dir.join(README_FILE);
        std::fs::write(&readme_path, self.render_readme(&metadata))?;

        let license_path = dir.join(LICENSE_FILE);
        std::fs::write(&license_path, format!("{}\n", license_text(&metadata.license)))?;

        Ok(vec![schema_path, readme_path, license_path])
    }
}

impl Default for MetadataWriter {
    fn default() -> Self {
        Self::new()
    }
}

fn license_text(license: &str) -> String {
    if license == DEFAULT_LICENSE {
        "Creative Commons Attribution 4.0 International (CC BY 4.0). \
         You are free to share and adapt the data for any purpose, even commercially, \
         provided you give appropriate credit."
            .to_string()
    } else {
        license.to_string()
    }
}

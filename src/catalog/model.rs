use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

pub type DatasetId = i64;
pub type VersionId = i64;
pub type TableId = i64;
pub type FieldId = i64;

fn default_true() -> bool { true }

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dataset {
    pub id: DatasetId,
    pub slug: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub icon: String,
    pub author_name: String,
    #[serde(default)]
    pub author_url: Option<String>,
    #[serde(default)]
    pub code_url: String,
    #[serde(default)]
    pub license_name: String,
    #[serde(default)]
    pub license_url: String,
    pub source_name: String,
    #[serde(default)]
    pub source_url: String,
    #[serde(default)]
    pub show: bool,
}

impl fmt::Display for Dataset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (by {}, source: {})", self.name, self.author_name, self.source_name)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Version {
    pub id: VersionId,
    pub dataset_id: DatasetId,
    pub name: String,
    pub collected_at: NaiveDate,
    pub download_url: String,
    pub order: u32,
}

impl Version {
    pub fn label(&self, dataset: &Dataset) -> String {
        format!("{}.{} (order: {})", dataset.slug, self.name, self.order)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Table {
    pub id: TableId,
    pub dataset_id: DatasetId,
    pub version_id: VersionId,
    pub name: String,
    #[serde(default)]
    pub default: bool,
    #[serde(default)]
    pub options: Option<serde_json::Value>,
    #[serde(default)]
    pub ordering: Vec<String>,
    #[serde(default)]
    pub filtering: Vec<String>,
    #[serde(default)]
    pub search: Vec<String>,
    #[serde(default)]
    pub last_update: Option<DateTime<Utc>>,
}

impl Table {
    pub fn db_table(&self, dataset: &Dataset) -> String {
        crate::ident::physical_table_name(&dataset.slug, &self.name)
    }

    pub fn label(&self, dataset: &Dataset, version: &Version) -> String {
        format!("{}.{}.{}", dataset.slug, version.name, self.name)
    }
}

/// Cached distinct values of a choiceable field, stored as `{"data": [...]}`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FieldChoices {
    pub data: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Field {
    pub id: FieldId,
    pub dataset_id: DatasetId,
    pub table_id: TableId,
    #[serde(default)]
    pub version_id: Option<VersionId>,
    pub name: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    /// Raw type tag; validated against the type catalog when a descriptor is compiled.
    #[serde(rename = "type")]
    pub type_tag: String,
    pub order: u32,
    #[serde(default = "default_true")]
    pub null: bool,
    #[serde(default)]
    pub choices: Option<FieldChoices>,
    #[serde(default)]
    pub has_choices: bool,
    #[serde(default)]
    pub show_on_frontend: bool,
    #[serde(default)]
    pub frontend_filter: bool,
    #[serde(default)]
    pub obfuscate: bool,
    #[serde(default = "default_true")]
    pub show: bool,
    #[serde(default)]
    pub options: Option<serde_json::Map<String, serde_json::Value>>,
    #[serde(default)]
    pub link_template: Option<String>,
}

impl Field {
    pub fn is_choiceable(&self) -> bool { self.has_choices && self.show_on_frontend }

    /// Options rendered as `key=value` pairs, values in JSON notation.
    pub fn options_text(&self) -> String {
        match &self.options {
            Some(map) if !map.is_empty() => map.iter().map(|(k, v)| format!("{}={}", k, v)).collect::<Vec<_>>().join(", "),
            _ => String::new(),
        }
    }

    pub fn label(&self, table: &Table) -> String {
        format!("{}.{}({})", table.name, self.name, self.options_text())
    }
}

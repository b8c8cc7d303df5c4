use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::str::FromStr;

pub const STATUS_CREATION_SUCCESSFUL: &str = "CREATION_SUCCESSFUL";
pub const TABLE_TYPE_VIEW: &str = "VIRTUAL_VIEW";

/// Entry of `ListAnalyses`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct AnalysisSummary {
    pub analysis_id: String,
    #[serde(default)]
    pub arn: Option<String>,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default, deserialize_with = "epoch_seconds")]
    pub last_updated_time: Option<DateTime<Utc>>,
}

/// `Analysis` member of `DescribeAnalysis`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Analysis {
    pub analysis_id: String,
    pub arn: String,
    pub name: String,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub data_set_arns: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "PascalCase")]
pub struct Column {
    pub name: String,
    #[serde(default)]
    pub r#type: Option<String>,
}

/// `TableMetadata` member of Athena `GetTableMetadata`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct TableMetadata {
    pub name: String,
    #[serde(default)]
    pub table_type: Option<String>,
    #[serde(default)]
    pub columns: Vec<Column>,
    #[serde(default)]
    pub partition_keys: Vec<Column>,
}

impl TableMetadata {
    pub fn is_view(&self) -> bool {
        self.table_type.as_deref() == Some(TABLE_TYPE_VIEW)
    }

    /// Regular columns followed by partition keys.
    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns
            .iter()
            .chain(self.partition_keys.iter())
            .map(|c| c.name.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct TemplateVersion {
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub version_number: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Template {
    pub template_id: String,
    #[serde(default)]
    pub arn: Option<String>,
    #[serde(default)]
    pub version: Option<TemplateVersion>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "PascalCase")]
pub struct DataSetReference {
    pub data_set_placeholder: String,
    pub data_set_arn: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct SourceAnalysis {
    pub arn: String,
    pub data_set_references: Vec<DataSetReference>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct TemplateSourceEntity {
    pub source_analysis: SourceAnalysis,
}

/// Body shared by `CreateTemplate` and `UpdateTemplate`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct TemplateRequest {
    pub name: String,
    pub source_entity: TemplateSourceEntity,
    pub version_description: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct TemplateOperation {
    #[serde(default)]
    pub arn: String,
    #[serde(default)]
    pub template_id: Option<String>,
    #[serde(default)]
    pub version_arn: Option<String>,
    #[serde(default)]
    pub creation_status: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "PascalCase")]
pub struct ResourcePermission {
    pub principal: String,
    pub actions: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportMethod {
    Template,
    #[default]
    Definition,
}

impl FromStr for ExportMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "template" => Ok(ExportMethod::Template),
            "definition" => Ok(ExportMethod::Definition),
            other => Err(format!(
                "unknown export method '{}', expected 'template' or 'definition'",
                other
            )),
        }
    }
}

impl fmt::Display for ExportMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExportMethod::Template => f.write_str("template"),
            ExportMethod::Definition => f.write_str("definition"),
        }
    }
}

// ---- resource file ----

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct DependsOn {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub datasets: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub views: Vec<String>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub cur: bool,
}

impl DependsOn {
    pub fn is_empty(&self) -> bool {
        self.datasets.is_empty() && self.views.is_empty() && !self.cur
    }
}

/// Dependencies of a dataset: `views` is always written, even when empty.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct DatasetDependsOn {
    #[serde(default)]
    pub views: Vec<String>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub cur: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardResource {
    pub depends_on: DependsOn,
    pub name: String,
    pub dashboard_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub template_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_account_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<String>,
}

/// The exported subset of a `DescribeDataSet` document.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "PascalCase")]
pub struct DatasetData {
    pub data_set_id: String,
    pub name: String,
    pub physical_table_map: serde_json::Map<String, serde_json::Value>,
    #[serde(default)]
    pub logical_table_map: serde_json::Map<String, serde_json::Value>,
    #[serde(default)]
    pub import_mode: serde_json::Value,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DatasetResource {
    pub data: DatasetData,
    pub depends_on: DatasetDependsOn,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ViewResource {
    pub data: String,
    #[serde(default, skip_serializing_if = "DependsOn::is_empty")]
    pub depends_on: DependsOn,
}

/// Top level of the exported YAML file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ResourceFile {
    #[serde(default)]
    pub dashboards: IndexMap<String, DashboardResource>,
    #[serde(default)]
    pub datasets: IndexMap<String, DatasetResource>,
    #[serde(default)]
    pub views: IndexMap<String, ViewResource>,
}

fn epoch_seconds<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Timestamp {
        Seconds(f64),
        Text(String),
    }

    Ok(match Option::<Timestamp>::deserialize(deserializer)? {
        Some(Timestamp::Seconds(secs)) => {
            DateTime::from_timestamp(secs.trunc() as i64, (secs.fract() * 1e9) as u32)
        }
        Some(Timestamp::Text(text)) => DateTime::parse_from_rfc3339(&text)
            .ok()
            .map(|dt| dt.with_timezone(&Utc)),
        None => None,
    })
}

use crate::core::cur::CurDetector;
use crate::core::known::KnownResources;
use crate::core::sql::{ATHENA_DATABASE_PLACEHOLDER, ATHENA_DATASOURCE_PLACEHOLDER};
use crate::domain::model::{
    Analysis, DataSetReference, DatasetData, DatasetDependsOn, DatasetResource,
};
use crate::domain::ports::{AthenaApi, QuickSightApi};
use crate::utils::error::{ExportError, Result};
use indexmap::IndexMap;
use serde_json::Value;

/// A dataset stripped to its exported fields, with its Athena coordinates
/// replaced by placeholders.
#[derive(Debug, Clone, PartialEq)]
pub struct ParameterizedDataset {
    pub data: DatasetData,
    /// Names of the Athena tables/views the physical tables read.
    pub views: Vec<String>,
    /// Athena databases (schemas) the physical tables read from.
    pub databases: Vec<String>,
}

fn str_field<'v>(raw: &'v Value, field: &str) -> Result<&'v str> {
    raw.get(field)
        .and_then(Value::as_str)
        .ok_or_else(|| ExportError::critical(format!("DataSet description has no {}", field)))
}

pub fn parameterize_dataset(raw: &Value) -> Result<ParameterizedDataset> {
    let name = str_field(raw, "Name")?.to_string();
    let mut physical_table_map = raw
        .get("PhysicalTableMap")
        .and_then(Value::as_object)
        .cloned()
        .unwrap_or_default();
    let logical_table_map = raw
        .get("LogicalTableMap")
        .and_then(Value::as_object)
        .cloned()
        .unwrap_or_default();

    let mut views = Vec::new();
    let mut databases = Vec::new();
    for (key, value) in physical_table_map.iter_mut() {
        let table = value
            .get_mut("RelationalTable")
            .and_then(Value::as_object_mut)
            .filter(|t| t.contains_key("DataSourceArn") && t.contains_key("Schema"))
            .ok_or_else(|| ExportError::UnsupportedError {
                message: format!(
                    "Dataset {} does not seem to be an Athena dataset. Only Athena datasets are supported.",
                    key
                ),
            })?;

        if let Some(schema) = table.get("Schema").and_then(Value::as_str) {
            if !databases.iter().any(|db| db == schema) {
                databases.push(schema.to_string());
            }
        }
        table.insert(
            "DataSourceArn".to_string(),
            Value::String(ATHENA_DATASOURCE_PLACEHOLDER.to_string()),
        );
        table.insert(
            "Schema".to_string(),
            Value::String(ATHENA_DATABASE_PLACEHOLDER.to_string()),
        );
        if let Some(source) = table.get("Name").and_then(Value::as_str) {
            views.push(source.to_string());
        }
    }

    for value in logical_table_map.values() {
        let joins_dataset = value
            .get("Source")
            .and_then(|source| source.get("DataSetArn"))
            .is_some();
        if joins_dataset {
            let alias = value.get("Alias").and_then(Value::as_str).unwrap_or("?");
            return Err(ExportError::UnsupportedError {
                message: format!(
                    "DataSet {} contains unsupported join. Please replace join of {} from DataSet to DataSource",
                    name, alias
                ),
            });
        }
    }

    Ok(ParameterizedDataset {
        data: DatasetData {
            data_set_id: str_field(raw, "DataSetId")?.to_string(),
            name,
            physical_table_map,
            logical_table_map,
            import_mode: raw.get("ImportMode").cloned().unwrap_or(Value::Null),
        },
        views,
        databases,
    })
}

/// Datasets of one analysis.
#[derive(Debug, Clone, Default)]
pub struct CollectedDatasets {
    /// Placeholder/ARN pairs for template creation, one per analysis dataset.
    pub references: Vec<DataSetReference>,
    /// Datasets to export, by name.
    pub datasets: IndexMap<String, ParameterizedDataset>,
    /// Common datasets the analysis uses.
    pub known: Vec<String>,
}

impl CollectedDatasets {
    pub async fn collect<Q: QuickSightApi>(
        quicksight: &Q,
        analysis: &Analysis,
        known: &KnownResources,
        export_known: bool,
    ) -> Result<Self> {
        let mut collected = CollectedDatasets::default();

        for dataset_arn in &analysis.data_set_arns {
            let dataset_id = dataset_arn.rsplit('/').next().unwrap_or(dataset_arn);
            let raw = quicksight.describe_data_set(dataset_id).await?.ok_or_else(|| {
                ExportError::critical(format!(
                    "dataset {} not found. We need all datasets to be present for template generation",
                    dataset_id
                ))
            })?;
            let name = str_field(&raw, "Name")?.to_string();

            collected.references.push(DataSetReference {
                data_set_placeholder: name.clone(),
                data_set_arn: dataset_arn.clone(),
            });

            tracing::info!("Found DataSet {}.", name);
            if known.has_dataset(&name) {
                collected.known.push(name.clone());
                if !export_known {
                    tracing::info!("DataSet {} is in resources. Skipping.", name);
                    continue;
                }
            }

            let dataset = parameterize_dataset(&raw)?;
            collected.datasets.insert(name, dataset);
        }

        Ok(collected)
    }

    /// The one Athena database all exported datasets read from.
    pub fn database(&self) -> Result<Option<String>> {
        let mut databases: Vec<&str> = Vec::new();
        for db in self.datasets.values().flat_map(|d| d.databases.iter()) {
            if !databases.contains(&db.as_str()) {
                databases.push(db);
            }
        }
        match databases.as_slice() {
            [] => Ok(None),
            [db] => Ok(Some(db.to_string())),
            many => Err(ExportError::critical(format!(
                "CID only supports one database. Multiple used: {:?}",
                many
            ))),
        }
    }

    /// Every table/view read by the exported datasets, first occurrence first.
    pub fn views(&self) -> Vec<String> {
        let mut views: Vec<String> = Vec::new();
        for view in self.datasets.values().flat_map(|d| d.views.iter()) {
            if !views.contains(view) {
                views.push(view.clone());
            }
        }
        views
    }

    /// Exported dataset names followed by the common datasets not exported.
    pub fn dashboard_dependencies(&self) -> Vec<String> {
        let mut names: Vec<String> = self.datasets.keys().cloned().collect();
        for name in &self.known {
            if !names.contains(name) {
                names.push(name.clone());
            }
        }
        names
    }

    /// Dataset resources; CUR tables leave the view list and set `cur: true`.
    /// Without a database (`cur` is `None`) every view is kept as a plain dependency.
    pub async fn into_resources<A: AthenaApi>(
        self,
        cur: Option<&CurDetector<'_, A>>,
    ) -> Result<IndexMap<String, DatasetResource>> {
        let mut resources = IndexMap::new();
        for (name, dataset) in self.datasets {
            let mut depends_on = DatasetDependsOn::default();
            for view in dataset.views {
                let is_cur = match cur {
                    Some(cur) => cur.is_cur(&view).await?,
                    None => false,
                };
                if is_cur {
                    depends_on.cur = true;
                } else {
                    depends_on.views.push(view);
                }
            }
            resources.insert(
                name,
                DatasetResource {
                    data: dataset.data,
                    depends_on,
                },
            );
        }
        Ok(resources)
    }
}

//! In-memory ports used by the unit tests.

use crate::core::cur::CUR_MINIMAL_REQUIRED_COLUMNS;
use crate::core::Storage;
use crate::domain::model::{
    Analysis, AnalysisSummary, Column, ResourcePermission, TableMetadata, Template,
    TemplateOperation, TemplateRequest, TemplateVersion,
};
use crate::domain::ports::{AthenaApi, QuickSightApi};
use crate::utils::error::{ExportError, Result};
use async_trait::async_trait;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

pub fn not_found(service: &str, what: &str) -> ExportError {
    ExportError::ServiceError {
        service: service.to_string(),
        status: 404,
        code: "ResourceNotFoundException".to_string(),
        message: format!("{} not found", what),
    }
}

pub fn athena_dataset(id: &str, name: &str, schema: &str, tables: &[&str]) -> Value {
    let physical: serde_json::Map<String, Value> = tables
        .iter()
        .enumerate()
        .map(|(i, table)| {
            (
                format!("pt-{}", i),
                json!({
                    "RelationalTable": {
                        "DataSourceArn": "arn:aws:quicksight:us-east-1:111122223333:datasource/athena",
                        "Catalog": "AwsDataCatalog",
                        "Schema": schema,
                        "Name": table,
                        "InputColumns": [{"Name": "cost", "Type": "DECIMAL"}]
                    }
                }),
            )
        })
        .collect();
    json!({
        "Arn": format!("arn:aws:quicksight:us-east-1:111122223333:dataset/{}", id),
        "DataSetId": id,
        "Name": name,
        "PhysicalTableMap": physical,
        "LogicalTableMap": {
            "lt-0": {"Alias": name, "Source": {"PhysicalTableId": "pt-0"}}
        },
        "ImportMode": "SPICE",
        "ConsumedSpiceCapacityInBytes": 42
    })
}

pub fn cur_table(name: &str) -> TableMetadata {
    TableMetadata {
        name: name.to_string(),
        table_type: Some("EXTERNAL_TABLE".to_string()),
        columns: CUR_MINIMAL_REQUIRED_COLUMNS
            .iter()
            .map(|c| Column {
                name: c.to_string(),
                r#type: Some("string".to_string()),
            })
            .collect(),
        partition_keys: vec![],
    }
}

#[derive(Default)]
pub struct FakeAthena {
    tables: HashMap<String, TableMetadata>,
    ddl: HashMap<String, String>,
    pub queries: Mutex<Vec<String>>,
}

impl FakeAthena {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_table(mut self, table: TableMetadata) -> Self {
        self.ddl.insert(
            table.name.clone(),
            format!(
                "CREATE EXTERNAL TABLE `{}`(\n  `a` string)\nLOCATION\n  's3://cur-bucket/cur/'",
                table.name
            ),
        );
        self.tables.insert(table.name.clone(), table);
        self
    }

    pub fn with_plain_table(self, name: &str, ddl: &str) -> Self {
        let mut this = self.with_table(TableMetadata {
            name: name.to_string(),
            table_type: Some("EXTERNAL_TABLE".to_string()),
            columns: vec![Column {
                name: "account_id".to_string(),
                r#type: Some("string".to_string()),
            }],
            partition_keys: vec![],
        });
        this.ddl.insert(name.to_string(), ddl.to_string());
        this
    }

    pub fn with_view(mut self, name: &str, sql: &str) -> Self {
        self.tables.insert(
            name.to_string(),
            TableMetadata {
                name: name.to_string(),
                table_type: Some("VIRTUAL_VIEW".to_string()),
                columns: vec![],
                partition_keys: vec![],
            },
        );
        self.ddl.insert(name.to_string(), sql.to_string());
        self
    }
}

#[async_trait]
impl AthenaApi for FakeAthena {
    async fn get_table_metadata(&self, _database: &str, table: &str) -> Result<Option<TableMetadata>> {
        Ok(self.tables.get(table).cloned())
    }

    async fn query(&self, _database: &str, sql: &str) -> Result<Vec<String>> {
        self.queries.lock().unwrap().push(sql.to_string());
        let name = sql
            .rsplit(' ')
            .next()
            .unwrap_or_default()
            .trim_matches('`');
        self.ddl
            .get(name)
            .map(|ddl| ddl.lines().map(str::to_string).collect())
            .ok_or_else(|| ExportError::QueryError {
                query_id: "q-1".to_string(),
                state: "FAILED".to_string(),
                reason: format!("no ddl for {}", name),
            })
    }
}

pub struct FakeQuickSight {
    pub analyses: Vec<AnalysisSummary>,
    pub list_denied: bool,
    pub analysis: HashMap<String, Analysis>,
    pub definitions: HashMap<String, Value>,
    pub datasets: HashMap<String, Value>,
    pub templates: Mutex<HashMap<String, Template>>,
    pub template_requests: Mutex<Vec<(String, String, TemplateRequest)>>,
    pub permissions: Mutex<Vec<(String, Vec<ResourcePermission>)>>,
    pub creation_status: String,
}

impl Default for FakeQuickSight {
    fn default() -> Self {
        Self {
            analyses: vec![],
            list_denied: false,
            analysis: HashMap::new(),
            definitions: HashMap::new(),
            datasets: HashMap::new(),
            templates: Mutex::new(HashMap::new()),
            template_requests: Mutex::new(vec![]),
            permissions: Mutex::new(vec![]),
            creation_status: "CREATION_IN_PROGRESS".to_string(),
        }
    }
}

impl FakeQuickSight {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_analysis(mut self, analysis: Analysis) -> Self {
        self.analyses.push(AnalysisSummary {
            analysis_id: analysis.analysis_id.clone(),
            arn: Some(analysis.arn.clone()),
            name: analysis.name.clone(),
            status: Some("CREATION_SUCCESSFUL".to_string()),
            last_updated_time: None,
        });
        self.analysis.insert(analysis.analysis_id.clone(), analysis);
        self
    }

    pub fn with_definition(mut self, analysis_id: &str, definition: Value) -> Self {
        self.definitions.insert(analysis_id.to_string(), definition);
        self
    }

    pub fn with_dataset(mut self, dataset: Value) -> Self {
        let id = dataset["DataSetId"].as_str().unwrap_or_default().to_string();
        self.datasets.insert(id, dataset);
        self
    }

    pub fn with_template(self, template_id: &str, description: &str) -> Self {
        self.templates.lock().unwrap().insert(
            template_id.to_string(),
            Template {
                template_id: template_id.to_string(),
                arn: Some(format!("arn:aws:quicksight:us-east-1:111122223333:template/{}", template_id)),
                version: Some(TemplateVersion {
                    description: Some(description.to_string()),
                    version_number: Some(1),
                }),
            },
        );
        self
    }

    fn record(&self, op: &str, template_id: &str, request: &TemplateRequest) -> TemplateOperation {
        self.template_requests.lock().unwrap().push((
            op.to_string(),
            template_id.to_string(),
            request.clone(),
        ));
        TemplateOperation {
            arn: format!("arn:aws:quicksight:us-east-1:111122223333:template/{}", template_id),
            template_id: Some(template_id.to_string()),
            version_arn: None,
            creation_status: self.creation_status.clone(),
        }
    }
}

#[async_trait]
impl QuickSightApi for FakeQuickSight {
    fn account_id(&self) -> &str {
        "111122223333"
    }

    fn region(&self) -> &str {
        "us-east-1"
    }

    async fn list_analyses(&self, max_items: usize) -> Result<Vec<AnalysisSummary>> {
        if self.list_denied {
            return Err(ExportError::ServiceError {
                service: "quicksight".to_string(),
                status: 403,
                code: "AccessDeniedException".to_string(),
                message: "denied".to_string(),
            });
        }
        Ok(self.analyses.iter().take(max_items).cloned().collect())
    }

    async fn describe_analysis(&self, analysis_id: &str) -> Result<Analysis> {
        self.analysis
            .get(analysis_id)
            .cloned()
            .ok_or_else(|| not_found("quicksight", analysis_id))
    }

    async fn describe_analysis_definition(&self, analysis_id: &str) -> Result<Value> {
        self.definitions
            .get(analysis_id)
            .cloned()
            .ok_or_else(|| not_found("quicksight", analysis_id))
    }

    async fn describe_data_set(&self, data_set_id: &str) -> Result<Option<Value>> {
        Ok(self.datasets.get(data_set_id).cloned())
    }

    async fn describe_template(&self, template_id: &str) -> Result<Option<Template>> {
        Ok(self.templates.lock().unwrap().get(template_id).cloned())
    }

    async fn create_template(&self, template_id: &str, request: &TemplateRequest) -> Result<TemplateOperation> {
        Ok(self.record("create", template_id, request))
    }

    async fn update_template(&self, template_id: &str, request: &TemplateRequest) -> Result<TemplateOperation> {
        if !self.templates.lock().unwrap().contains_key(template_id) {
            return Err(not_found("quicksight", template_id));
        }
        Ok(self.record("update", template_id, request))
    }

    async fn update_template_permissions(&self, template_id: &str, grants: &[ResourcePermission]) -> Result<()> {
        self.permissions
            .lock()
            .unwrap()
            .push((template_id.to_string(), grants.to_vec()));
        Ok(())
    }
}

#[derive(Clone, Default)]
pub struct MemoryStorage {
    pub files: Arc<Mutex<HashMap<String, Vec<u8>>>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_file(self, path: &str, data: &str) -> Self {
        self.files
            .lock()
            .unwrap()
            .insert(path.to_string(), data.as_bytes().to_vec());
        self
    }

    pub fn get_text(&self, path: &str) -> Option<String> {
        self.files
            .lock()
            .unwrap()
            .get(path)
            .map(|data| String::from_utf8_lossy(data).into_owned())
    }
}

impl Storage for MemoryStorage {
    async fn read_file(&self, path: &str) -> Result<Vec<u8>> {
        self.files.lock().unwrap().get(path).cloned().ok_or_else(|| {
            ExportError::IoError(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("File not found: {}", path),
            ))
        })
    }

    async fn write_file(&self, path: &str, data: &[u8]) -> Result<()> {
        self.files
            .lock()
            .unwrap()
            .insert(path.to_string(), data.to_vec());
        Ok(())
    }
}

use crate::domain::model::{
    Analysis, AnalysisSummary, ExportMethod, ResourcePermission, TableMetadata, Template,
    TemplateOperation, TemplateRequest,
};
use crate::utils::error::Result;
use async_trait::async_trait;
use std::time::Duration;

pub trait Storage: Send + Sync {
    fn read_file(&self, path: &str) -> impl std::future::Future<Output = Result<Vec<u8>>> + Send;
    fn write_file(
        &self,
        path: &str,
        data: &[u8],
    ) -> impl std::future::Future<Output = Result<()>> + Send;
}

pub trait ConfigProvider: Send + Sync {
    fn analysis_id(&self) -> Option<&str>;
    fn analysis_name(&self) -> Option<&str>;
    fn dashboard_id(&self) -> Option<&str>;
    fn export_method(&self) -> Option<ExportMethod>;
    fn template_id(&self) -> Option<&str>;
    fn template_version_description(&self) -> Option<&str>;
    fn reader_account(&self) -> &str;
    fn output(&self) -> Option<&str>;
    fn export_known_datasets(&self) -> bool;
    /// Database used when no dataset names one.
    fn athena_database(&self) -> Option<&str>;
    fn template_permissions_delay(&self) -> Duration;
}

#[async_trait]
pub trait QuickSightApi: Send + Sync {
    fn account_id(&self) -> &str;
    fn region(&self) -> &str;

    /// Lists analyses page by page, stopping after `max_items`.
    async fn list_analyses(&self, max_items: usize) -> Result<Vec<AnalysisSummary>>;
    async fn describe_analysis(&self, analysis_id: &str) -> Result<Analysis>;
    async fn describe_analysis_definition(&self, analysis_id: &str) -> Result<serde_json::Value>;
    /// `None` when the dataset does not exist.
    async fn describe_data_set(&self, data_set_id: &str) -> Result<Option<serde_json::Value>>;
    /// `None` when the template does not exist.
    async fn describe_template(&self, template_id: &str) -> Result<Option<Template>>;
    async fn create_template(
        &self,
        template_id: &str,
        request: &TemplateRequest,
    ) -> Result<TemplateOperation>;
    async fn update_template(
        &self,
        template_id: &str,
        request: &TemplateRequest,
    ) -> Result<TemplateOperation>;
    async fn update_template_permissions(
        &self,
        template_id: &str,
        grants: &[ResourcePermission],
    ) -> Result<()>;
}

#[async_trait]
pub trait AthenaApi: Send + Sync {
    /// `None` when the table does not exist in `database`.
    async fn get_table_metadata(&self, database: &str, table: &str)
        -> Result<Option<TableMetadata>>;
    /// Runs `sql` to completion and returns the first column of every row.
    async fn query(&self, database: &str, sql: &str) -> Result<Vec<String>>;
}

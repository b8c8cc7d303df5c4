use crate::adapters::aws::signed_client::SignedClient;
use crate::config::AthenaSettings;
use crate::domain::model::TableMetadata;
use crate::domain::ports::AthenaApi;
use crate::utils::error::{ExportError, Result};
use async_trait::async_trait;
use reqwest::Method;
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::{Duration, Instant};

const CONTENT_TYPE: &str = "application/x-amz-json-1.1";

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct GetTableMetadataResponse {
    table_metadata: TableMetadata,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct StartQueryExecutionResponse {
    query_execution_id: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct QueryStatus {
    state: String,
    #[serde(default)]
    state_change_reason: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct QueryExecution {
    status: QueryStatus,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct GetQueryExecutionResponse {
    query_execution: QueryExecution,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct Datum {
    #[serde(default)]
    var_char_value: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct Row {
    #[serde(default)]
    data: Vec<Datum>,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ResultSet {
    #[serde(default)]
    rows: Vec<Row>,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct GetQueryResultsResponse {
    result_set: ResultSet,
    #[serde(default)]
    next_token: Option<String>,
}

/// Athena JSON 1.1 API.
#[derive(Debug, Clone)]
pub struct AthenaClient {
    client: SignedClient,
    catalog: String,
    workgroup: String,
    output_location: Option<String>,
    poll_interval: Duration,
    query_timeout: Duration,
}

impl AthenaClient {
    pub fn new(client: SignedClient, settings: &AthenaSettings) -> Self {
        Self {
            client,
            catalog: settings.catalog.clone(),
            workgroup: settings.workgroup.clone(),
            output_location: settings.output_location.clone(),
            poll_interval: Duration::from_millis(settings.poll_interval_ms),
            query_timeout: Duration::from_secs(settings.query_timeout_seconds),
        }
    }

    async fn call(&self, operation: &str, body: Value) -> Result<Value> {
        let target = format!("AmazonAthena.{}", operation);
        let headers = [("content-type", CONTENT_TYPE), ("x-amz-target", target.as_str())];
        self.client
            .send_json(Method::POST, self.client.endpoint().clone(), &headers, Some(&body))
            .await
    }

    async fn start_query(&self, database: &str, sql: &str) -> Result<String> {
        let mut body = json!({
            "QueryString": sql,
            "QueryExecutionContext": {"Database": database, "Catalog": self.catalog},
            "WorkGroup": self.workgroup,
        });
        if let Some(location) = &self.output_location {
            body["ResultConfiguration"] = json!({ "OutputLocation": location });
        }
        let answer: StartQueryExecutionResponse =
            serde_json::from_value(self.call("StartQueryExecution", body).await?)?;
        Ok(answer.query_execution_id)
    }

    async fn wait_for_query(&self, query_id: &str) -> Result<()> {
        let started = Instant::now();
        loop {
            let answer: GetQueryExecutionResponse = serde_json::from_value(
                self.call("GetQueryExecution", json!({ "QueryExecutionId": query_id }))
                    .await?,
            )?;
            let status = answer.query_execution.status;
            match status.state.as_str() {
                "SUCCEEDED" => return Ok(()),
                "FAILED" | "CANCELLED" => {
                    return Err(ExportError::QueryError {
                        query_id: query_id.to_string(),
                        state: status.state,
                        reason: status.state_change_reason.unwrap_or_default(),
                    })
                }
                _ => {}
            }
            if started.elapsed() >= self.query_timeout {
                return Err(ExportError::QueryError {
                    query_id: query_id.to_string(),
                    state: status.state,
                    reason: format!("not finished after {:?}", self.query_timeout),
                });
            }
            tokio::time::sleep(self.poll_interval).await;
        }
    }

    async fn query_results(&self, query_id: &str) -> Result<Vec<String>> {
        let mut lines = Vec::new();
        let mut next_token: Option<String> = None;
        loop {
            let mut body = json!({ "QueryExecutionId": query_id });
            if let Some(token) = &next_token {
                body["NextToken"] = Value::String(token.clone());
            }
            let page: GetQueryResultsResponse =
                serde_json::from_value(self.call("GetQueryResults", body).await?)?;
            for row in page.result_set.rows {
                let first = row
                    .data
                    .into_iter()
                    .next()
                    .and_then(|d| d.var_char_value)
                    .unwrap_or_default();
                lines.push(first);
            }
            match page.next_token {
                Some(token) if !token.is_empty() => next_token = Some(token),
                _ => break,
            }
        }
        Ok(lines)
    }
}

fn is_missing_table(error: &ExportError) -> bool {
    if error.is_not_found() {
        return true;
    }
    match error {
        ExportError::ServiceError { code, message, .. } => {
            code == "MetadataException" && message.to_lowercase().contains("not found")
        }
        _ => false,
    }
}

#[async_trait]
impl AthenaApi for AthenaClient {
    async fn get_table_metadata(&self, database: &str, table: &str) -> Result<Option<TableMetadata>> {
        let body = json!({
            "CatalogName": self.catalog,
            "DatabaseName": database,
            "TableName": table,
        });
        match self.call("GetTableMetadata", body).await {
            Ok(answer) => {
                let response: GetTableMetadataResponse = serde_json::from_value(answer)?;
                Ok(Some(response.table_metadata))
            }
            Err(e) if is_missing_table(&e) => Ok(None),
            Err(e) => Err(e),
        }
    }

    async fn query(&self, database: &str, sql: &str) -> Result<Vec<String>> {
        tracing::debug!("Athena query on {}: {}", database, sql);
        let query_id = self.start_query(database, sql).await?;
        self.wait_for_query(&query_id).await?;
        self.query_results(&query_id).await
    }
}

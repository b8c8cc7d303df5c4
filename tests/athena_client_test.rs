use aws_credential_types::provider::SharedCredentialsProvider;
use aws_credential_types::Credentials;
use cid_export::adapters::aws::AthenaClient;
use cid_export::config::AthenaSettings;
use cid_export::domain::ports::AthenaApi;
use cid_export::{AwsSession, ExportError};
use httpmock::prelude::*;
use serde_json::json;

const TARGET: &str = "x-amz-target";

fn client(server: &MockServer) -> AthenaClient {
    let credentials =
        SharedCredentialsProvider::new(Credentials::new("AKIDEXAMPLE", "secret", None, None, "test"));
    let settings = AthenaSettings {
        workgroup: "CID".to_string(),
        poll_interval_ms: 10,
        query_timeout_seconds: 5,
        endpoint: Some(server.base_url()),
        ..AthenaSettings::default()
    };
    AwsSession::new("us-east-1", "111122223333", credentials)
        .athena(&settings)
        .unwrap()
}

#[tokio::test]
async fn test_get_table_metadata() {
    let server = MockServer::start_async().await;
    let mock = server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/")
                .header(TARGET, "AmazonAthena.GetTableMetadata")
                .header("content-type", "application/x-amz-json-1.1")
                .json_body_partial(
                    r#"{"CatalogName": "AwsDataCatalog", "DatabaseName": "cid_cur", "TableName": "summary_view"}"#,
                );
            then.status(200).json_body(json!({
                "TableMetadata": {
                    "Name": "summary_view",
                    "TableType": "VIRTUAL_VIEW",
                    "Columns": [{"Name": "cost", "Type": "double"}]
                }
            }));
        })
        .await;

    let table = client(&server)
        .get_table_metadata("cid_cur", "summary_view")
        .await
        .unwrap()
        .unwrap();

    mock.assert_async().await;
    assert!(table.is_view());
    assert_eq!(table.column_names().collect::<Vec<_>>(), vec!["cost"]);
}

#[tokio::test]
async fn test_missing_table_is_none() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/")
                .header(TARGET, "AmazonAthena.GetTableMetadata");
            then.status(400).json_body(json!({
                "__type": "MetadataException",
                "Message": "Table ghost not found in database cid_cur"
            }));
        })
        .await;

    let table = client(&server)
        .get_table_metadata("cid_cur", "ghost")
        .await
        .unwrap();
    assert!(table.is_none());
}

#[tokio::test]
async fn test_query_collects_every_page() {
    let server = MockServer::start_async().await;
    let start = server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/")
                .header(TARGET, "AmazonAthena.StartQueryExecution")
                .json_body_partial(
                    r#"{"QueryString": "SHOW CREATE VIEW summary_view", "WorkGroup": "CID", "QueryExecutionContext": {"Database": "cid_cur"}}"#,
                );
            then.status(200).json_body(json!({"QueryExecutionId": "q-1"}));
        })
        .await;
    server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/")
                .header(TARGET, "AmazonAthena.GetQueryExecution")
                .json_body_partial(r#"{"QueryExecutionId": "q-1"}"#);
            then.status(200).json_body(json!({
                "QueryExecution": {"QueryExecutionId": "q-1", "Status": {"State": "SUCCEEDED"}}
            }));
        })
        .await;
    // Second page first: it is the more specific match.
    server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/")
                .header(TARGET, "AmazonAthena.GetQueryResults")
                .json_body_partial(r#"{"NextToken": "t-2"}"#);
            then.status(200).json_body(json!({
                "ResultSet": {"Rows": [
                    {"Data": [{"VarCharValue": "FROM cid_cur.cur"}]},
                    {"Data": [{}]}
                ]}
            }));
        })
        .await;
    server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/")
                .header(TARGET, "AmazonAthena.GetQueryResults")
                .json_body_partial(r#"{"QueryExecutionId": "q-1"}"#);
            then.status(200).json_body(json!({
                "ResultSet": {"Rows": [
                    {"Data": [{"VarCharValue": "CREATE VIEW summary_view AS"}]},
                    {"Data": [{"VarCharValue": "SELECT *"}]}
                ]},
                "NextToken": "t-2"
            }));
        })
        .await;

    let lines = client(&server)
        .query("cid_cur", "SHOW CREATE VIEW summary_view")
        .await
        .unwrap();

    start.assert_async().await;
    assert_eq!(
        lines,
        vec![
            "CREATE VIEW summary_view AS".to_string(),
            "SELECT *".to_string(),
            "FROM cid_cur.cur".to_string(),
            String::new(),
        ]
    );
}

#[tokio::test]
async fn test_failed_query_is_query_error() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/")
                .header(TARGET, "AmazonAthena.StartQueryExecution");
            then.status(200).json_body(json!({"QueryExecutionId": "q-bad"}));
        })
        .await;
    server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/")
                .header(TARGET, "AmazonAthena.GetQueryExecution");
            then.status(200).json_body(json!({
                "QueryExecution": {"Status": {
                    "State": "FAILED",
                    "StateChangeReason": "line 1:8: mismatched input"
                }}
            }));
        })
        .await;

    let err = client(&server)
        .query("cid_cur", "SHOW CREATE VIEW broken")
        .await
        .unwrap_err();

    match err {
        ExportError::QueryError {
            query_id,
            state,
            reason,
        } => {
            assert_eq!(query_id, "q-bad");
            assert_eq!(state, "FAILED");
            assert!(reason.contains("mismatched input"));
        }
        other => panic!("unexpected error: {:?}", other),
    }
}

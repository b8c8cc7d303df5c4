use crate::core::sql;
use crate::domain::model::{
    Analysis, DashboardResource, DataSetReference, DependsOn, ResourcePermission, SourceAnalysis,
    TemplateRequest, TemplateSourceEntity,
};
use crate::domain::ports::QuickSightApi;
use crate::utils::error::{ExportError, Result};
use serde_json::Value;
use std::time::Duration;

pub const DEFAULT_TEMPLATE_VERSION: &str = "v0.0.1";
const TEMPLATE_IN_PROGRESS: &[&str] = &["CREATION_IN_PROGRESS", "UPDATE_IN_PROGRESS"];

#[derive(Debug, Clone)]
pub struct TemplateOptions {
    pub template_id: Option<String>,
    pub version_description: Option<String>,
    /// Account allowed to describe the template, `*` for all.
    pub reader_account: String,
    /// Permission updates right after a template change are sometimes ignored.
    pub permissions_delay: Duration,
}

pub fn base_resource(
    analysis: &Analysis,
    dashboard_id: Option<&str>,
    datasets: Vec<String>,
) -> DashboardResource {
    DashboardResource {
        depends_on: DependsOn {
            datasets,
            ..Default::default()
        },
        name: analysis.name.clone(),
        dashboard_id: dashboard_id
            .map(str::to_string)
            .unwrap_or_else(|| sql::default_resource_id(&analysis.name)),
        template_id: None,
        source_account_id: None,
        region: None,
        data: None,
    }
}

pub fn reader_principal(reader_account: &str) -> String {
    if reader_account == "*" {
        "*".to_string()
    } else {
        format!("arn:aws:iam::{}:root", reader_account)
    }
}

/// Creates or updates a template from the analysis and shares it with the
/// reader account.
pub async fn export_template<Q: QuickSightApi>(
    quicksight: &Q,
    analysis: &Analysis,
    references: &[DataSetReference],
    options: &TemplateOptions,
    resource: &mut DashboardResource,
) -> Result<()> {
    let template_id = options
        .template_id
        .clone()
        .unwrap_or_else(|| sql::default_resource_id(&analysis.name));

    let version_description = match &options.version_description {
        Some(description) => description.clone(),
        None => match quicksight.describe_template(&template_id).await? {
            Some(old) => old
                .version
                .and_then(|v| v.description)
                .unwrap_or_else(|| DEFAULT_TEMPLATE_VERSION.to_string()),
            None => {
                tracing::debug!("No previous template");
                DEFAULT_TEMPLATE_VERSION.to_string()
            }
        },
    };

    let request = TemplateRequest {
        name: template_id.clone(),
        source_entity: TemplateSourceEntity {
            source_analysis: SourceAnalysis {
                arn: analysis.arn.clone(),
                data_set_references: references.to_vec(),
            },
        },
        version_description,
    };
    tracing::debug!("Template params = {:?}", request);

    tracing::info!("Updating template");
    let operation = match quicksight.update_template(&template_id, &request).await {
        Ok(operation) => {
            tracing::info!("Template {} updated from Analysis {}", template_id, analysis.arn);
            operation
        }
        Err(e) if e.is_not_found() => {
            let operation = quicksight.create_template(&template_id, &request).await?;
            tracing::info!("Template {} created from Analysis {}", template_id, analysis.arn);
            operation
        }
        Err(e) => return Err(e),
    };

    if !TEMPLATE_IN_PROGRESS.contains(&operation.creation_status.as_str()) {
        return Err(ExportError::critical(format!(
            "failed template operation {:?}",
            operation
        )));
    }
    tracing::info!("Template arn = {}", operation.arn);

    if !options.permissions_delay.is_zero() {
        tokio::time::sleep(options.permissions_delay).await;
    }
    let grants = [ResourcePermission {
        principal: reader_principal(&options.reader_account),
        actions: vec!["quicksight:DescribeTemplate".to_string()],
    }];
    quicksight
        .update_template_permissions(&template_id, &grants)
        .await?;

    resource.template_id = Some(template_id);
    resource.source_account_id = Some(quicksight.account_id().to_string());
    resource.region = Some(quicksight.region().to_string());
    Ok(())
}

/// Drops region and account from the dataset ARNs of an analysis definition.
pub fn anonymize_definition(definition: &mut Value) {
    let Some(declarations) = definition
        .get_mut("DataSetIdentifierDeclarations")
        .and_then(Value::as_array_mut)
    else {
        return;
    };
    for declaration in declarations {
        let Some(arn) = declaration.get("DataSetArn").and_then(Value::as_str) else {
            continue;
        };
        let dataset_id = arn.rsplit('/').next().unwrap_or(arn).to_string();
        declaration["DataSetArn"] =
            Value::String(format!("arn:aws:quicksight:::dataset/{}", dataset_id));
    }
}

/// Embeds the analysis definition, as YAML text, in the resource.
pub async fn export_definition<Q: QuickSightApi>(
    quicksight: &Q,
    analysis_id: &str,
    resource: &mut DashboardResource,
) -> Result<()> {
    let mut definition = quicksight.describe_analysis_definition(analysis_id).await?;
    anonymize_definition(&mut definition);
    let yaml = serde_yaml::to_string(&definition)?;
    resource.data = Some(sql::strip_trailing_whitespace(&yaml));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::fakes::FakeQuickSight;
    use serde_json::json;

    fn analysis() -> Analysis {
        Analysis {
            analysis_id: "a-1".to_string(),
            arn: "arn:aws:quicksight:us-east-1:111122223333:analysis/a-1".to_string(),
            name: "Cost Dashboard".to_string(),
            status: None,
            data_set_arns: vec![],
        }
    }

    fn options(template_id: Option<&str>, reader: &str) -> TemplateOptions {
        TemplateOptions {
            template_id: template_id.map(str::to_string),
            version_description: None,
            reader_account: reader.to_string(),
            permissions_delay: Duration::ZERO,
        }
    }

    fn references() -> Vec<DataSetReference> {
        vec![DataSetReference {
            data_set_placeholder: "summary".to_string(),
            data_set_arn: "arn:aws:quicksight:us-east-1:111122223333:dataset/d-1".to_string(),
        }]
    }

    #[test]
    fn test_base_resource_defaults_dashboard_id() {
        let resource = base_resource(&analysis(), None, vec!["summary".to_string()]);
        assert_eq!(resource.dashboard_id, "cost-dashboard");
        assert_eq!(resource.depends_on.datasets, vec!["summary".to_string()]);

        let resource = base_resource(&analysis(), Some("custom-id"), vec![]);
        assert_eq!(resource.dashboard_id, "custom-id");
    }

    #[test]
    fn test_reader_principal() {
        assert_eq!(reader_principal("*"), "*");
        assert_eq!(reader_principal("123456789012"), "arn:aws:iam::123456789012:root");
    }

    #[tokio::test]
    async fn test_template_created_when_missing() {
        let qs = FakeQuickSight::new();
        let mut resource = base_resource(&analysis(), None, vec![]);

        export_template(&qs, &analysis(), &references(), &options(None, "*"), &mut resource)
            .await
            .unwrap();

        let requests = qs.template_requests.lock().unwrap();
        assert_eq!(requests.len(), 1);
        let (op, id, request) = &requests[0];
        assert_eq!(op, "create");
        assert_eq!(id, "cost-dashboard");
        assert_eq!(request.version_description, DEFAULT_TEMPLATE_VERSION);
        assert_eq!(request.source_entity.source_analysis.data_set_references, references());

        let permissions = qs.permissions.lock().unwrap();
        assert_eq!(permissions[0].1[0].principal, "*");
        assert_eq!(resource.template_id.as_deref(), Some("cost-dashboard"));
        assert_eq!(resource.source_account_id.as_deref(), Some("111122223333"));
        assert_eq!(resource.region.as_deref(), Some("us-east-1"));
    }

    #[tokio::test]
    async fn test_template_update_keeps_previous_description() {
        let qs = FakeQuickSight::new().with_template("cid-template", "v1.2.3");
        let mut resource = base_resource(&analysis(), None, vec![]);

        export_template(
            &qs,
            &analysis(),
            &references(),
            &options(Some("cid-template"), "123456789012"),
            &mut resource,
        )
        .await
        .unwrap();

        let requests = qs.template_requests.lock().unwrap();
        assert_eq!(requests[0].0, "update");
        assert_eq!(requests[0].2.version_description, "v1.2.3");
        let permissions = qs.permissions.lock().unwrap();
        assert_eq!(permissions[0].1[0].principal, "arn:aws:iam::123456789012:root");
    }

    #[tokio::test]
    async fn test_template_failure_status_is_critical() {
        let mut qs = FakeQuickSight::new();
        qs.creation_status = "CREATION_FAILED".to_string();
        let mut resource = base_resource(&analysis(), None, vec![]);

        let err = export_template(&qs, &analysis(), &references(), &options(None, "*"), &mut resource)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("failed template operation"));
        assert!(qs.permissions.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_definition_hides_account_and_region() {
        let qs = FakeQuickSight::new().with_definition(
            "a-1",
            json!({
                "DataSetIdentifierDeclarations": [{
                    "Identifier": "summary",
                    "DataSetArn": "arn:aws:quicksight:us-east-1:111122223333:dataset/d-1"
                }],
                "Sheets": [{"SheetId": "s-1", "Name": "Overview"}]
            }),
        );
        let mut resource = base_resource(&analysis(), None, vec![]);

        export_definition(&qs, "a-1", &mut resource).await.unwrap();

        let data = resource.data.unwrap();
        assert!(data.contains("arn:aws:quicksight:::dataset/d-1"));
        assert!(!data.contains("111122223333"));
        let parsed: Value = serde_yaml::from_str(&data).unwrap();
        assert_eq!(parsed["Sheets"][0]["Name"], "Overview");
    }
}

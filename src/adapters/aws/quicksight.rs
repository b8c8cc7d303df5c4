use crate::adapters::aws::signed_client::SignedClient;
use crate::domain::model::{
    Analysis, AnalysisSummary, ResourcePermission, Template, TemplateOperation, TemplateRequest,
};
use crate::domain::ports::QuickSightApi;
use crate::utils::error::{ExportError, Result};
use async_trait::async_trait;
use reqwest::Method;
use serde::Deserialize;
use serde_json::{json, Value};

const MAX_PAGE_SIZE: usize = 100;

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ListAnalysesPage {
    #[serde(default)]
    analysis_summary_list: Vec<AnalysisSummary>,
    #[serde(default)]
    next_token: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct DescribeAnalysisResponse {
    analysis: Analysis,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct DescribeTemplateResponse {
    template: Template,
}

fn member(mut document: Value, name: &str) -> Result<Value> {
    match document.get_mut(name) {
        Some(value) => Ok(value.take()),
        None => Err(ExportError::critical(format!(
            "QuickSight answer has no {} member",
            name
        ))),
    }
}

/// QuickSight REST-JSON API of one account.
#[derive(Debug, Clone)]
pub struct QuickSightClient {
    client: SignedClient,
    account_id: String,
}

impl QuickSightClient {
    pub fn new(client: SignedClient, account_id: impl Into<String>) -> Self {
        Self {
            client,
            account_id: account_id.into(),
        }
    }

    fn account_url(&self, segments: &[&str]) -> Result<url::Url> {
        let mut path = vec!["accounts", self.account_id.as_str()];
        path.extend_from_slice(segments);
        self.client.url(&path)
    }

    async fn get(&self, segments: &[&str]) -> Result<Value> {
        let url = self.account_url(segments)?;
        self.client.send_json(Method::GET, url, &[], None).await
    }

    async fn write_template(
        &self,
        method: Method,
        template_id: &str,
        request: &TemplateRequest,
    ) -> Result<TemplateOperation> {
        let url = self.account_url(&["templates", template_id])?;
        let body = serde_json::to_value(request)?;
        let answer = self.client.send_json(method, url, &[], Some(&body)).await?;
        Ok(serde_json::from_value(answer)?)
    }
}

#[async_trait]
impl QuickSightApi for QuickSightClient {
    fn account_id(&self) -> &str {
        &self.account_id
    }

    fn region(&self) -> &str {
        self.client.region()
    }

    async fn list_analyses(&self, max_items: usize) -> Result<Vec<AnalysisSummary>> {
        let mut analyses = Vec::new();
        let mut next_token: Option<String> = None;

        loop {
            let mut url = self.account_url(&["analyses"])?;
            {
                let mut query = url.query_pairs_mut();
                query.append_pair("max-results", &MAX_PAGE_SIZE.min(max_items).to_string());
                if let Some(token) = &next_token {
                    query.append_pair("next-token", token);
                }
            }
            let answer = self.client.send_json(Method::GET, url, &[], None).await?;
            let page: ListAnalysesPage = serde_json::from_value(answer)?;
            analyses.extend(page.analysis_summary_list);

            if analyses.len() >= max_items {
                analyses.truncate(max_items);
                break;
            }
            match page.next_token {
                Some(token) if !token.is_empty() => next_token = Some(token),
                _ => break,
            }
        }

        Ok(analyses)
    }

    async fn describe_analysis(&self, analysis_id: &str) -> Result<Analysis> {
        let answer = self.get(&["analyses", analysis_id]).await?;
        let response: DescribeAnalysisResponse = serde_json::from_value(answer)?;
        Ok(response.analysis)
    }

    async fn describe_analysis_definition(&self, analysis_id: &str) -> Result<Value> {
        let answer = self.get(&["analyses", analysis_id, "definition"]).await?;
        member(answer, "Definition")
    }

    async fn describe_data_set(&self, data_set_id: &str) -> Result<Option<Value>> {
        match self.get(&["data-sets", data_set_id]).await {
            Ok(answer) => member(answer, "DataSet").map(Some),
            Err(e) if e.is_not_found() => Ok(None),
            Err(e) => Err(e),
        }
    }

    async fn describe_template(&self, template_id: &str) -> Result<Option<Template>> {
        match self.get(&["templates", template_id]).await {
            Ok(answer) => {
                let response: DescribeTemplateResponse = serde_json::from_value(answer)?;
                Ok(Some(response.template))
            }
            Err(e) if e.is_not_found() => Ok(None),
            Err(e) => Err(e),
        }
    }

    async fn create_template(
        &self,
        template_id: &str,
        request: &TemplateRequest,
    ) -> Result<TemplateOperation> {
        self.write_template(Method::POST, template_id, request).await
    }

    async fn update_template(
        &self,
        template_id: &str,
        request: &TemplateRequest,
    ) -> Result<TemplateOperation> {
        self.write_template(Method::PUT, template_id, request).await
    }

    async fn update_template_permissions(
        &self,
        template_id: &str,
        grants: &[ResourcePermission],
    ) -> Result<()> {
        let url = self.account_url(&["templates", template_id, "permissions"])?;
        let body = json!({ "GrantPermissions": grants });
        self.client
            .send_json(Method::PUT, url, &[], Some(&body))
            .await?;
        Ok(())
    }
}

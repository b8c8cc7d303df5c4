use crate::core::analysis::choose_analysis;
use crate::core::cur::CurDetector;
use crate::core::dashboard::{self, TemplateOptions};
use crate::core::datasets::CollectedDatasets;
use crate::core::known::KnownResources;
use crate::core::views::ViewResolver;
use crate::core::{ConfigProvider, Storage};
use crate::domain::model::{ExportMethod, ResourceFile};
use crate::domain::ports::{AthenaApi, QuickSightApi};
use crate::utils::error::Result;

/// Exports one QuickSight analysis, its datasets and the Athena views behind
/// them into a resource file.
pub struct Exporter<Q, A, S, C>
where
    Q: QuickSightApi,
    A: AthenaApi,
    S: Storage,
    C: ConfigProvider,
{
    quicksight: Q,
    athena: A,
    storage: S,
    config: C,
    known: KnownResources,
}

pub fn default_output_name(analysis_name: &str) -> String {
    format!("{}.yaml", analysis_name.replace(' ', "-"))
}

pub fn render_yaml(resources: &ResourceFile) -> Result<String> {
    Ok(serde_yaml::to_string(resources)?)
}

impl<Q, A, S, C> Exporter<Q, A, S, C>
where
    Q: QuickSightApi,
    A: AthenaApi,
    S: Storage,
    C: ConfigProvider,
{
    pub fn new(quicksight: Q, athena: A, storage: S, config: C) -> Self {
        Self {
            quicksight,
            athena,
            storage,
            config,
            known: KnownResources::default(),
        }
    }

    pub fn with_known_resources(mut self, known: KnownResources) -> Self {
        self.known = known;
        self
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    /// Builds the resource file; returns it with the output file name.
    pub async fn build(&self) -> Result<(String, ResourceFile)> {
        let analysis_id = choose_analysis(
            &self.quicksight,
            self.config.analysis_id(),
            self.config.analysis_name(),
        )
        .await?;
        let analysis = self.quicksight.describe_analysis(&analysis_id).await?;

        tracing::info!("analysing datasets");
        let export_known = self.config.export_known_datasets();
        let collected =
            CollectedDatasets::collect(&self.quicksight, &analysis, &self.known, export_known)
                .await?;

        let mut resources = ResourceFile::default();
        let database = collected
            .database()?
            .or_else(|| self.config.athena_database().map(str::to_string));

        let references = collected.references.clone();
        let dashboard_datasets = collected.dashboard_dependencies();

        if let Some(database) = &database {
            let resolver = ViewResolver::new(&self.athena, database.clone());
            let all_views = collected.views();
            tracing::info!("Analyzing Athena Views: {:?}. Can take some time.", all_views);
            let resolved = resolver.process_views(&all_views).await?;
            tracing::info!("List of views: {:?}", resolved.keys().collect::<Vec<_>>());
            resources.views = resolver
                .export_views(&resolved, &self.known, export_known)
                .await?;
        } else {
            tracing::warn!("No Athena database known, views and CUR tables are not resolved");
        }

        let cur = database
            .as_ref()
            .map(|database| CurDetector::new(&self.athena, database.clone()));
        resources.datasets = collected.into_resources(cur.as_ref()).await?;

        tracing::debug!("Building dashboard resource");
        let mut dashboard_resource =
            dashboard::base_resource(&analysis, self.config.dashboard_id(), dashboard_datasets);

        let method = if self.config.template_id().is_some() {
            ExportMethod::Template
        } else {
            self.config.export_method().unwrap_or_default()
        };
        tracing::info!("Exporting dashboard {} using {} method", analysis.name, method);
        match method {
            ExportMethod::Template => {
                let options = TemplateOptions {
                    template_id: self.config.template_id().map(str::to_string),
                    version_description: self
                        .config
                        .template_version_description()
                        .map(str::to_string),
                    reader_account: self.config.reader_account().to_string(),
                    permissions_delay: self.config.template_permissions_delay(),
                };
                dashboard::export_template(
                    &self.quicksight,
                    &analysis,
                    &references,
                    &options,
                    &mut dashboard_resource,
                )
                .await?;
            }
            ExportMethod::Definition => {
                dashboard::export_definition(&self.quicksight, &analysis_id, &mut dashboard_resource)
                    .await?;
            }
        }
        resources
            .dashboards
            .insert(analysis.name.to_uppercase(), dashboard_resource);

        let output = self
            .config
            .output()
            .map(str::to_string)
            .unwrap_or_else(|| default_output_name(&analysis.name));
        Ok((output, resources))
    }

    /// Builds the resource file and writes it; returns the path written.
    pub async fn run(&self) -> Result<String> {
        let (output, resources) = self.build().await?;
        let yaml = render_yaml(&resources)?;
        self.storage.write_file(&output, yaml.as_bytes()).await?;
        tracing::info!(
            "Exported {} dashboard(s), {} dataset(s), {} view(s)",
            resources.dashboards.len(),
            resources.datasets.len(),
            resources.views.len()
        );
        Ok(output)
    }
}

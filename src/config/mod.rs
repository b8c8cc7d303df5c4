#[cfg(feature = "cli")]
pub mod cli;
pub mod toml_config;

#[cfg(feature = "cli")]
pub use cli::CliConfig;
pub use toml_config::TomlConfig;

use crate::core::ConfigProvider;
use crate::domain::model::ExportMethod;
use crate::utils::error::Result;
use crate::utils::validation::{self, Validate};
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AthenaSettings {
    pub database: Option<String>,
    pub workgroup: String,
    pub catalog: String,
    /// Query result location, when the workgroup does not enforce one.
    pub output_location: Option<String>,
    pub poll_interval_ms: u64,
    pub query_timeout_seconds: u64,
    pub endpoint: Option<String>,
}

impl Default for AthenaSettings {
    fn default() -> Self {
        Self {
            database: None,
            workgroup: "primary".to_string(),
            catalog: "AwsDataCatalog".to_string(),
            output_location: None,
            poll_interval_ms: 500,
            query_timeout_seconds: 300,
            endpoint: None,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AwsSettings {
    pub region: Option<String>,
    pub profile: Option<String>,
    pub quicksight_endpoint: Option<String>,
}

/// Fully resolved export settings (config file, then command line).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportConfig {
    pub analysis_id: Option<String>,
    pub analysis_name: Option<String>,
    pub dashboard_id: Option<String>,
    pub export_method: Option<ExportMethod>,
    pub template_id: Option<String>,
    pub template_version_description: Option<String>,
    pub reader_account: String,
    pub template_permissions_delay_seconds: u64,
    pub output: Option<String>,
    pub export_known_datasets: bool,
    /// YAML file listing the common datasets and views.
    pub resources_file: Option<String>,
    pub athena: AthenaSettings,
    pub aws: AwsSettings,
    pub verbose: bool,
    pub log_json: bool,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            analysis_id: None,
            analysis_name: None,
            dashboard_id: None,
            export_method: None,
            template_id: None,
            template_version_description: None,
            reader_account: "*".to_string(),
            template_permissions_delay_seconds: 5,
            output: None,
            export_known_datasets: false,
            resources_file: None,
            athena: AthenaSettings::default(),
            aws: AwsSettings::default(),
            verbose: false,
            log_json: false,
        }
    }
}

impl ConfigProvider for ExportConfig {
    fn analysis_id(&self) -> Option<&str> {
        self.analysis_id.as_deref()
    }

    fn analysis_name(&self) -> Option<&str> {
        self.analysis_name.as_deref()
    }

    fn dashboard_id(&self) -> Option<&str> {
        self.dashboard_id.as_deref()
    }

    fn export_method(&self) -> Option<ExportMethod> {
        self.export_method
    }

    fn template_id(&self) -> Option<&str> {
        self.template_id.as_deref()
    }

    fn template_version_description(&self) -> Option<&str> {
        self.template_version_description.as_deref()
    }

    fn reader_account(&self) -> &str {
        &self.reader_account
    }

    fn output(&self) -> Option<&str> {
        self.output.as_deref()
    }

    fn export_known_datasets(&self) -> bool {
        self.export_known_datasets
    }

    fn athena_database(&self) -> Option<&str> {
        self.athena.database.as_deref()
    }

    fn template_permissions_delay(&self) -> Duration {
        Duration::from_secs(self.template_permissions_delay_seconds)
    }
}

impl Validate for ExportConfig {
    fn validate(&self) -> Result<()> {
        if let Some(id) = &self.analysis_id {
            validation::validate_resource_id("analysis_id", id)?;
        }
        if let Some(name) = &self.analysis_name {
            validation::validate_non_empty_string("analysis_name", name)?;
        }
        if let Some(id) = &self.dashboard_id {
            validation::validate_resource_id("dashboard_id", id)?;
        }
        if let Some(id) = &self.template_id {
            validation::validate_resource_id("template_id", id)?;
        }
        validation::validate_account_id("reader_account", &self.reader_account)?;
        validation::validate_range(
            "template_permissions_delay_seconds",
            self.template_permissions_delay_seconds,
            0,
            300,
        )?;

        if let Some(output) = &self.output {
            validation::validate_path("output", output)?;
            validation::validate_file_extension("output", output, &["yaml", "yml"])?;
        }
        if let Some(resources) = &self.resources_file {
            validation::validate_path("resources_file", resources)?;
        }

        validation::validate_non_empty_string("athena.workgroup", &self.athena.workgroup)?;
        validation::validate_non_empty_string("athena.catalog", &self.athena.catalog)?;
        validation::validate_range("athena.poll_interval_ms", self.athena.poll_interval_ms, 10, 60_000)?;
        validation::validate_range(
            "athena.query_timeout_seconds",
            self.athena.query_timeout_seconds,
            1,
            3600,
        )?;
        if let Some(endpoint) = &self.athena.endpoint {
            validation::validate_url("athena.endpoint", endpoint)?;
        }
        if let Some(endpoint) = &self.aws.quicksight_endpoint {
            validation::validate_url("aws.quicksight_endpoint", endpoint)?;
        }
        if let Some(region) = &self.aws.region {
            validation::validate_aws_region("aws.region", region)?;
        }

        tracing::debug!("Configuration validation passed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = ExportConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.reader_account(), "*");
        assert_eq!(config.template_permissions_delay(), Duration::from_secs(5));
        assert_eq!(config.athena.workgroup, "primary");
    }

    #[test]
    fn test_invalid_values_rejected() {
        let config = ExportConfig {
            output: Some("dashboard.json".to_string()),
            ..ExportConfig::default()
        };
        assert!(config.validate().is_err());

        let config = ExportConfig {
            reader_account: "nobody".to_string(),
            ..ExportConfig::default()
        };
        assert!(config.validate().is_err());

        let mut config = ExportConfig::default();
        config.athena.endpoint = Some("not a url".to_string());
        assert!(config.validate().is_err());
    }
}

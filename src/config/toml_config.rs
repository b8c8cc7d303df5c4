use crate::config::ExportConfig;
use crate::domain::model::ExportMethod;
use crate::utils::error::{ExportError, Result};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::LazyLock;

static ENV_VAR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\$\{([^}]+)\}").expect("valid env var regex"));

/// Optional `--config` file. Every key is optional; command line flags win.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TomlConfig {
    pub analysis: Option<AnalysisSection>,
    pub dashboard: Option<DashboardSection>,
    pub output: Option<OutputSection>,
    pub athena: Option<AthenaSection>,
    pub aws: Option<AwsSection>,
    pub logging: Option<LoggingSection>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AnalysisSection {
    pub id: Option<String>,
    pub name: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DashboardSection {
    pub id: Option<String>,
    pub export_method: Option<ExportMethod>,
    pub template_id: Option<String>,
    pub template_version_description: Option<String>,
    pub reader_account: Option<String>,
    pub template_permissions_delay_seconds: Option<u64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OutputSection {
    pub path: Option<String>,
    pub export_known_datasets: Option<bool>,
    pub resources_file: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AthenaSection {
    pub database: Option<String>,
    pub workgroup: Option<String>,
    pub catalog: Option<String>,
    pub output_location: Option<String>,
    pub poll_interval_ms: Option<u64>,
    pub query_timeout_seconds: Option<u64>,
    pub endpoint: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AwsSection {
    pub region: Option<String>,
    pub profile: Option<String>,
    pub quicksight_endpoint: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoggingSection {
    pub verbose: Option<bool>,
    pub json: Option<bool>,
}

fn set<T>(target: &mut T, value: Option<T>) {
    if let Some(value) = value {
        *target = value;
    }
}

fn set_opt<T>(target: &mut Option<T>, value: Option<T>) {
    if value.is_some() {
        *target = value;
    }
}

impl TomlConfig {
    /// 從 TOML 檔案載入配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(ExportError::IoError)?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content);

        toml::from_str(&processed_content).map_err(|e| ExportError::ConfigValidationError {
            field: "toml_parsing".to_string(),
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// 替換環境變數 (例如 ${AWS_ACCOUNT_ID}); unknown variables stay as written.
    fn substitute_env_vars(content: &str) -> String {
        ENV_VAR
            .replace_all(content, |caps: &regex::Captures| {
                let var_name = &caps[1];
                std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
            })
            .into_owned()
    }

    /// Writes every value present in the file over `config`.
    pub fn apply_to(self, config: &mut ExportConfig) {
        if let Some(analysis) = self.analysis {
            set_opt(&mut config.analysis_id, analysis.id);
            set_opt(&mut config.analysis_name, analysis.name);
        }
        if let Some(dashboard) = self.dashboard {
            set_opt(&mut config.dashboard_id, dashboard.id);
            set_opt(&mut config.export_method, dashboard.export_method);
            set_opt(&mut config.template_id, dashboard.template_id);
            set_opt(
                &mut config.template_version_description,
                dashboard.template_version_description,
            );
            set(&mut config.reader_account, dashboard.reader_account);
            set(
                &mut config.template_permissions_delay_seconds,
                dashboard.template_permissions_delay_seconds,
            );
        }
        if let Some(output) = self.output {
            set_opt(&mut config.output, output.path);
            set(&mut config.export_known_datasets, output.export_known_datasets);
            set_opt(&mut config.resources_file, output.resources_file);
        }
        if let Some(athena) = self.athena {
            set_opt(&mut config.athena.database, athena.database);
            set(&mut config.athena.workgroup, athena.workgroup);
            set(&mut config.athena.catalog, athena.catalog);
            set_opt(&mut config.athena.output_location, athena.output_location);
            set(&mut config.athena.poll_interval_ms, athena.poll_interval_ms);
            set(
                &mut config.athena.query_timeout_seconds,
                athena.query_timeout_seconds,
            );
            set_opt(&mut config.athena.endpoint, athena.endpoint);
        }
        if let Some(aws) = self.aws {
            set_opt(&mut config.aws.region, aws.region);
            set_opt(&mut config.aws.profile, aws.profile);
            set_opt(&mut config.aws.quicksight_endpoint, aws.quicksight_endpoint);
        }
        if let Some(logging) = self.logging {
            set(&mut config.verbose, logging.verbose);
            set(&mut config.log_json, logging.json);
        }
    }

    pub fn into_export_config(self) -> ExportConfig {
        let mut config = ExportConfig::default();
        self.apply_to(&mut config);
        config
    }
}

use crate::config::{ExportConfig, TomlConfig};
use crate::domain::model::ExportMethod;
use crate::utils::error::Result;
use clap::Parser;

#[derive(Debug, Clone, Default, Parser)]
#[command(name = "cid-export")]
#[command(about = "Export a QuickSight analysis with its datasets and Athena views to a YAML resource file")]
pub struct CliConfig {
    /// TOML file with default values for the options below
    #[arg(short, long)]
    pub config: Option<String>,

    /// Id of the analysis to export (from the analysis URL)
    #[arg(long)]
    pub analysis_id: Option<String>,

    /// Name of the analysis to export; the most recently updated one wins
    #[arg(long)]
    pub analysis_name: Option<String>,

    /// Dashboard id in the exported resource (default: derived from the analysis name)
    #[arg(long)]
    pub dashboard_id: Option<String>,

    /// How the dashboard is exported: template or definition
    #[arg(long)]
    pub dashboard_export_method: Option<ExportMethod>,

    /// Template id; implies the template export method
    #[arg(long)]
    pub template_id: Option<String>,

    #[arg(long)]
    pub template_version_description: Option<String>,

    /// Account id allowed to read the template, or '*'
    #[arg(long)]
    pub reader_account: Option<String>,

    /// Seconds to wait before sharing a freshly updated template
    #[arg(long)]
    pub template_permissions_delay: Option<u64>,

    /// Output file (default: <analysis name>.yaml)
    #[arg(short, long)]
    pub output: Option<String>,

    /// Export datasets and views that are part of the common resources too
    #[arg(long)]
    pub export_known_datasets: bool,

    /// YAML file listing the common datasets and views
    #[arg(long)]
    pub resources: Option<String>,

    /// Athena database used when no dataset names one
    #[arg(long)]
    pub athena_database: Option<String>,

    #[arg(long)]
    pub athena_workgroup: Option<String>,

    #[arg(long)]
    pub athena_catalog: Option<String>,

    /// s3:// location for query results
    #[arg(long)]
    pub athena_output_location: Option<String>,

    #[arg(long)]
    pub region: Option<String>,

    #[arg(long)]
    pub profile: Option<String>,

    #[arg(long, hide = true)]
    pub quicksight_endpoint: Option<String>,

    #[arg(long, hide = true)]
    pub athena_endpoint: Option<String>,

    #[arg(short, long, help = "Enable verbose output")]
    pub verbose: bool,

    #[arg(long, help = "Log as JSON lines")]
    pub log_json: bool,
}

fn set_opt<T>(target: &mut Option<T>, value: Option<T>) {
    if value.is_some() {
        *target = value;
    }
}

impl CliConfig {
    /// Loads `--config` when given and applies the command line over it.
    pub fn into_export_config(self) -> Result<ExportConfig> {
        let mut config = match &self.config {
            Some(path) => TomlConfig::from_file(path)?.into_export_config(),
            None => ExportConfig::default(),
        };
        self.apply_to(&mut config);
        Ok(config)
    }

    pub fn apply_to(self, config: &mut ExportConfig) {
        set_opt(&mut config.analysis_id, self.analysis_id);
        set_opt(&mut config.analysis_name, self.analysis_name);
        set_opt(&mut config.dashboard_id, self.dashboard_id);
        set_opt(&mut config.export_method, self.dashboard_export_method);
        set_opt(&mut config.template_id, self.template_id);
        set_opt(
            &mut config.template_version_description,
            self.template_version_description,
        );
        if let Some(reader) = self.reader_account {
            config.reader_account = reader;
        }
        if let Some(delay) = self.template_permissions_delay {
            config.template_permissions_delay_seconds = delay;
        }
        set_opt(&mut config.output, self.output);
        config.export_known_datasets |= self.export_known_datasets;
        set_opt(&mut config.resources_file, self.resources);

        set_opt(&mut config.athena.database, self.athena_database);
        if let Some(workgroup) = self.athena_workgroup {
            config.athena.workgroup = workgroup;
        }
        if let Some(catalog) = self.athena_catalog {
            config.athena.catalog = catalog;
        }
        set_opt(&mut config.athena.output_location, self.athena_output_location);
        set_opt(&mut config.athena.endpoint, self.athena_endpoint);

        set_opt(&mut config.aws.region, self.region);
        set_opt(&mut config.aws.profile, self.profile);
        set_opt(&mut config.aws.quicksight_endpoint, self.quicksight_endpoint);

        config.verbose |= self.verbose;
        config.log_json |= self.log_json;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_parse_flags() {
        let cli = CliConfig::parse_from([
            "cid-export",
            "--analysis-id",
            "a-1",
            "--dashboard-export-method",
            "template",
            "--export-known-datasets",
            "-o",
            "out.yaml",
        ]);
        let config = cli.into_export_config().unwrap();
        assert_eq!(config.analysis_id.as_deref(), Some("a-1"));
        assert_eq!(config.export_method, Some(ExportMethod::Template));
        assert!(config.export_known_datasets);
        assert_eq!(config.output.as_deref(), Some("out.yaml"));
        assert_eq!(config.reader_account, "*");
    }

    #[test]
    fn test_cli_overrides_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "[analysis]\nname = \"From File\"\n\n[athena]\nworkgroup = \"file-wg\"\ndatabase = \"file_db\"\n"
        )
        .unwrap();

        let cli = CliConfig::parse_from([
            "cid-export",
            "--config",
            file.path().to_str().unwrap(),
            "--athena-workgroup",
            "cli-wg",
        ]);
        let config = cli.into_export_config().unwrap();
        assert_eq!(config.analysis_name.as_deref(), Some("From File"));
        assert_eq!(config.athena.workgroup, "cli-wg");
        assert_eq!(config.athena.database.as_deref(), Some("file_db"));
    }

    #[test]
    fn test_bad_export_method_rejected() {
        let result = CliConfig::try_parse_from(["cid-export", "--dashboard-export-method", "zip"]);
        assert!(result.is_err());
    }
}

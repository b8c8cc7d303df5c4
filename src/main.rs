use cid_export::utils::error::ExportError;
use cid_export::utils::{logger, validation::Validate};
use cid_export::{AwsSession, CliConfig, ExportConfig, Exporter, KnownResources, LocalStorage};
use clap::Parser;

async fn export(config: ExportConfig) -> cid_export::Result<String> {
    let session = AwsSession::load(&config.aws).await?;
    let quicksight = session.quicksight(config.aws.quicksight_endpoint.as_deref())?;
    let athena = session.athena(&config.athena)?;
    let storage = LocalStorage::new(".");

    let known = match &config.resources_file {
        Some(path) => KnownResources::load(&storage, path).await?,
        None => KnownResources::default(),
    };

    Exporter::new(quicksight, athena, storage, config)
        .with_known_resources(known)
        .run()
        .await
}

fn fail(e: &ExportError) -> ! {
    tracing::error!(
        "Export failed: {} (Category: {:?}, Severity: {:?})",
        e,
        e.category(),
        e.severity()
    );
    tracing::error!("Recovery suggestion: {}", e.recovery_suggestion());

    eprintln!("❌ {}", e.user_friendly_message());
    eprintln!("💡 {}", e.recovery_suggestion());

    std::process::exit(e.severity().exit_code())
}

#[tokio::main]
async fn main() {
    let cli = CliConfig::parse();
    let verbose = cli.verbose;

    let config = match cli.into_export_config() {
        Ok(config) => config,
        Err(e) => {
            logger::init_cli_logger(verbose);
            fail(&e)
        }
    };

    if config.log_json {
        logger::init_json_logger(config.verbose);
    } else {
        logger::init_cli_logger(config.verbose);
    }

    tracing::info!("Starting cid-export");
    tracing::debug!("Export config: {:?}", config);

    if let Err(e) = config.validate() {
        tracing::error!("Configuration validation failed: {}", e);
        fail(&e);
    }

    match export(config).await {
        Ok(output) => {
            tracing::info!("Output saved to: {}", output);
            println!("Output: {}", output);
        }
        Err(e) => fail(&e),
    }
}

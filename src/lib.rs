pub mod adapters;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::CliConfig;
pub use config::ExportConfig;

pub use adapters::aws::AwsSession;
pub use adapters::storage::LocalStorage;
pub use core::export::Exporter;
pub use core::known::KnownResources;
pub use utils::error::{ExportError, Result};

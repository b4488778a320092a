use crate::config::toml_config::TomlConfig;
use crate::utils::error::Result;
use clap::Parser;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, Parser)]
#[command(name = "media-analytics")]
#[command(about = "Cleans ad platform exports and generates performance reports")]
pub struct CliConfig {
    /// Path to TOML configuration file
    #[arg(short, long)]
    pub config: Option<String>,

    /// Directory holding the platform exports (overrides config)
    #[arg(long)]
    pub data_dir: Option<String>,

    /// Directory receiving the reports (overrides config)
    #[arg(long)]
    pub output_dir: Option<String>,

    /// Skip writing the ZIP bundle of all reports
    #[arg(long)]
    pub no_bundle: bool,

    #[arg(short, long, help = "Enable verbose output")]
    pub verbose: bool,

    #[arg(long, help = "Log CPU and memory usage per phase")]
    pub monitor: bool,

    /// Show which inputs would be used without processing them
    #[arg(long)]
    pub dry_run: bool,
}

impl CliConfig {
    /// Loads the configuration file (or defaults) and applies command line overrides.
    pub fn resolve(&self) -> Result<TomlConfig> {
        let mut config = match &self.config {
            Some(path) => {
                tracing::info!("📁 Loading configuration from: {}", path);
                TomlConfig::from_file(path)?
            }
            None => TomlConfig::default(),
        };

        if let Some(data_dir) = &self.data_dir {
            config.paths.data_dir = data_dir.clone();
        }
        if let Some(output_dir) = &self.output_dir {
            config.paths.output_dir = output_dir.clone();
        }
        if self.no_bundle {
            config.output.bundle = false;
        }
        if self.monitor {
            config.monitoring.get_or_insert_with(Default::default).enabled = true;
        }

        Ok(config)
    }
}

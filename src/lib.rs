pub mod adapters;
pub mod api;
pub mod app;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

pub use adapters::LocalStorage;
pub use app::pipelines::analytics_pipeline::AnalyticsPipeline;
#[cfg(feature = "cli")]
pub use config::CliConfig;
pub use config::TomlConfig;
pub use core::etl::EtlEngine;
pub use utils::error::{EtlError, Result};

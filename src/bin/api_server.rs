use anyhow::Context;
use clap::Parser;
use media_analytics::api::{self, ApiState};
use media_analytics::utils::{logger, validation::validate_bind_address, validation::Validate};
use media_analytics::TomlConfig;

const BIND_ENV: &str = "MEDIA_ANALYTICS_BIND";

#[derive(Parser)]
#[command(name = "media-analytics-api")]
#[command(about = "HTTP service that runs the media analytics pipeline and serves its reports")]
struct Args {
    /// Path to TOML configuration file
    #[arg(short, long)]
    config: Option<String>,

    /// Listen address, e.g. 0.0.0.0:8000 (falls back to $MEDIA_ANALYTICS_BIND, then config)
    #[arg(short, long)]
    bind: Option<String>,

    /// Directory holding the platform exports (overrides config)
    #[arg(long)]
    data_dir: Option<String>,

    /// Directory receiving the reports (overrides config)
    #[arg(long)]
    output_dir: Option<String>,

    /// Override the JSON log setting from config
    #[arg(long)]
    json_logs: Option<bool>,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => TomlConfig::from_file(path)
            .with_context(|| format!("Failed to load config file '{}'", path))?,
        None => TomlConfig::default(),
    };

    // 應用命令列覆蓋設定
    if let Some(bind) = bind_override(args.bind.clone(), std::env::var(BIND_ENV).ok()) {
        config.server.bind = bind;
    }
    if let Some(data_dir) = &args.data_dir {
        config.paths.data_dir = data_dir.clone();
    }
    if let Some(output_dir) = &args.output_dir {
        config.paths.output_dir = output_dir.clone();
    }

    logger::init_server_logger(
        args.verbose,
        args.json_logs.unwrap_or(config.server.json_logs),
    );

    config.validate().context("Configuration validation failed")?;
    let addr = validate_bind_address("server.bind", &config.server.bind)?;

    tracing::info!(
        "🚀 Starting {} v{} (data: {}, output: {})",
        config.pipeline.name,
        config.pipeline.version,
        config.paths.data_dir,
        config.paths.output_dir
    );

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    tracing::info!("🌐 Listening on http://{}", listener.local_addr()?);

    axum::serve(listener, api::app(ApiState::new(config)))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server error")?;

    tracing::info!("👋 Server stopped");
    Ok(())
}

/// `--bind` wins over the environment; both win over the config file.
fn bind_override(flag: Option<String>, env: Option<String>) -> Option<String> {
    flag.or(env.filter(|value| !value.trim().is_empty()))
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bind_flag_beats_environment() {
        let bind = bind_override(Some("127.0.0.1:9000".into()), Some("0.0.0.0:8080".into()));
        assert_eq!(bind.as_deref(), Some("127.0.0.1:9000"));
    }

    #[test]
    fn test_environment_applies_without_flag() {
        let bind = bind_override(None, Some("0.0.0.0:8080".into()));
        assert_eq!(bind.as_deref(), Some("0.0.0.0:8080"));
        assert_eq!(bind_override(None, Some("  ".into())), None);
        assert_eq!(bind_override(None, None), None);
    }

    #[test]
    fn test_container_command_leaves_bind_to_environment() {
        let dockerfile = include_str!("../../Dockerfile");
        let cmd = dockerfile
            .lines()
            .find(|line| line.starts_with("CMD"))
            .unwrap();
        assert!(cmd.contains("media-analytics-api"));
        assert!(!cmd.contains("--bind"));
    }
}

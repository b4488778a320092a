use clap::Parser;
use media_analytics::adapters::source::SourceFormat;
use media_analytics::core::ConfigProvider;
use media_analytics::domain::model::Platform;
use media_analytics::utils::error::{ErrorSeverity, EtlError};
use media_analytics::utils::{logger, validation::Validate};
use media_analytics::{AnalyticsPipeline, CliConfig, EtlEngine, LocalStorage, TomlConfig};
use std::path::Path;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = CliConfig::parse();

    // 初始化日誌
    logger::init_cli_logger(cli.verbose);

    tracing::info!("Starting media-analytics CLI");
    if cli.verbose {
        tracing::debug!("CLI config: {:?}", cli);
    }

    let config = match cli.resolve().and_then(|config| config.validate().map(|_| config)) {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("❌ Configuration validation failed: {}", e);
            tracing::error!("💡 Suggestion: {}", e.recovery_suggestion());
            eprintln!("❌ {}", e.user_friendly_message());
            std::process::exit(1);
        }
    };

    if cli.dry_run {
        print_dry_run(&config);
        return Ok(());
    }

    let monitor_enabled = config.monitoring_enabled();
    if monitor_enabled {
        tracing::info!("🔍 System monitoring enabled");
    }

    // 創建存儲和管道
    let data = LocalStorage::new(config.data_dir());
    let output = LocalStorage::new(config.output_dir());
    let pipeline = AnalyticsPipeline::new(data, output, config);

    let engine = EtlEngine::new_with_monitoring(pipeline, monitor_enabled);

    match engine.run().await {
        Ok(output_path) => {
            tracing::info!("✅ Media analytics completed successfully!");
            println!("✅ Media analytics completed successfully!");
            println!("📁 Reports saved to: {}", output_path);
        }
        Err(e) => {
            report_failure(&e);
            let exit_code = exit_code(e.severity());
            if exit_code > 0 {
                std::process::exit(exit_code);
            }
        }
    }

    Ok(())
}

fn print_dry_run(config: &TomlConfig) {
    println!("🔍 Dry run for pipeline '{}' v{}", config.pipeline.name, config.pipeline.version);
    println!("📂 Data directory: {}", config.data_dir());
    for platform in Platform::ALL {
        let found = SourceFormat::ALL
            .iter()
            .map(|format| format.file_name(platform))
            .find(|name| Path::new(config.data_dir()).join(name).is_file());
        match found {
            Some(name) => println!("  ✅ {:<9} {}", platform.label(), name),
            None => println!("  ❌ {:<9} missing", platform.label()),
        }
    }
    println!("📁 Output directory: {}", config.output_dir());
    match config.bundle_filename() {
        Some(name) => println!("📦 Bundle: {}", name),
        None => println!("📦 Bundle: disabled"),
    }
}

fn report_failure(e: &EtlError) {
    tracing::error!(
        "❌ Media analytics failed: {} (Category: {:?}, Severity: {:?})",
        e,
        e.category(),
        e.severity()
    );
    tracing::error!("💡 Recovery suggestion: {}", e.recovery_suggestion());

    eprintln!("❌ {}", e.user_friendly_message());
    eprintln!("💡 建議: {}", e.recovery_suggestion());
}

// 根據錯誤嚴重程度決定退出碼
fn exit_code(severity: ErrorSeverity) -> i32 {
    match severity {
        ErrorSeverity::Low => 0,
        ErrorSeverity::Medium => 2,
        ErrorSeverity::High => 1,
        ErrorSeverity::Critical => 3,
    }
}

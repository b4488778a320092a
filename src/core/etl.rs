use crate::core::Pipeline;
use crate::utils::error::Result;
use crate::utils::monitor::SystemMonitor;

pub struct EtlEngine<P: Pipeline> {
    pipeline: P,
    monitor: SystemMonitor,
}

impl<P: Pipeline> EtlEngine<P> {
    pub fn new(pipeline: P) -> Self {
        Self::new_with_monitoring(pipeline, false)
    }

    pub fn new_with_monitoring(pipeline: P, monitor_enabled: bool) -> Self {
        Self {
            pipeline,
            monitor: SystemMonitor::new(monitor_enabled),
        }
    }

    pub fn pipeline(&self) -> &P {
        &self.pipeline
    }

    pub async fn run(&self) -> Result<String> {
        tracing::info!("🔧 Starting media analytics pipeline");
        self.monitor.log_stats("Start");

        // Extract
        let tables = self.pipeline.extract().await?;
        let rows: usize = tables.iter().map(|t| t.len()).sum();
        tracing::info!("📥 Extracted {} platform exports ({} rows)", tables.len(), rows);
        self.monitor.log_stats("Extract");

        // Transform
        let result = self.pipeline.transform(tables).await?;
        tracing::info!(
            "📊 Analyzed {} platform rows and {} Meta campaigns into {} artifacts",
            result.platform_record_count,
            result.campaign_count,
            result.artifacts.len()
        );
        self.monitor.log_stats("Transform");

        // Load
        let output_path = self.pipeline.load(result).await?;
        tracing::info!("💾 Outputs saved to: {}", output_path);
        self.monitor.log_stats("Load");
        self.monitor.log_final_stats();

        Ok(output_path)
    }
}

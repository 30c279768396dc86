use crate::core::Pipeline;
use crate::utils::error::Result;
use crate::utils::monitor::ResourceMonitor;

pub struct EtlEngine<P: Pipeline> {
    pipeline: P,
    monitor: ResourceMonitor,
}

impl<P: Pipeline> EtlEngine<P> {
    pub fn new_with_monitoring(pipeline: P, monitor_enabled: bool) -> Self {
        Self {
            pipeline,
            monitor: ResourceMonitor::new(monitor_enabled),
        }
    }

    pub async fn run(&self) -> Result<String> {
        tracing::info!("Starting analysis run...");
        self.monitor.log_phase("Start");

        tracing::info!("Fetching source files...");
        let sources = self.pipeline.extract().await?;
        tracing::info!("Fetched {} files", sources.len());
        self.monitor.log_phase("Extract");

        tracing::info!("Aggregating payment statuses...");
        let result = self.pipeline.transform(sources).await?;
        tracing::info!(
            "Aggregated {} rows into {} summary rows",
            result.aggregate.rows_scanned,
            result.rows.len()
        );
        self.monitor.log_phase("Transform");

        tracing::info!("Writing report...");
        let output_path = self.pipeline.load(result).await?;
        tracing::info!("Report saved to: {}", output_path);
        self.monitor.log_phase("Load");
        self.monitor.log_final();

        Ok(output_path)
    }
}

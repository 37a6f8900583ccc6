//! Export-tables command implementation

use super::{exit_code_for, load_ready_store, load_settings, print_summary, tables_layout};
use crate::adapters::database::create_source;
use crate::core::pipeline::{PipelineCoordinator, PipelineSettings};
use clap::Args;
use tokio::sync::watch;

/// Arguments for the export-tables command
#[derive(Args, Debug)]
pub struct ExportTablesArgs {
    /// Override the number of tables exported at once
    #[arg(long)]
    pub concurrency: Option<usize>,
}

impl ExportTablesArgs {
    pub async fn execute(
        &self,
        config_path: &str,
        shutdown_signal: watch::Receiver<bool>,
    ) -> anyhow::Result<i32> {
        tracing::info!("Starting export-tables command");

        let mut config = match load_settings(config_path) {
            Ok(c) => c,
            Err(code) => return Ok(code),
        };
        if let Some(concurrency) = self.concurrency {
            tracing::info!(concurrency, "Overriding concurrency from CLI");
            config.pipeline.concurrency = concurrency;
            if let Err(e) = config.validate() {
                eprintln!("❌ {e}");
                return Ok(2);
            }
        }

        let store = match load_ready_store(&config) {
            Ok(s) => s,
            Err(code) => return Ok(code),
        };

        let coordinator = match PipelineCoordinator::new(
            &store,
            tables_layout(&config),
            PipelineSettings::from_config(&config),
            shutdown_signal,
        ) {
            Ok(c) => c,
            Err(e) => {
                eprintln!("❌ {e}");
                return Ok(exit_code_for(&e));
            }
        };

        let source = match create_source(&config).await {
            Ok(s) => s,
            Err(e) => {
                tracing::error!(error = %e, "Failed to connect to source database");
                eprintln!("❌ Failed to connect to source database: {e}");
                return Ok(4);
            }
        };

        println!("🚀 Exporting tables...");
        let summary = match coordinator.run_export(source.as_ref()).await {
            Ok(s) => s,
            Err(e) => {
                eprintln!("❌ Export failed: {e}");
                return Ok(5);
            }
        };

        print_summary("Export", &summary);
        Ok(summary.exit_code())
    }
}

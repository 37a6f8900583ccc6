//! Run command implementation
//!
//! Export, obfuscate and merge in one pass, optionally dumping the schema
//! sections first.

use super::export_schema::export_schema;
use super::{exit_code_for, load_ready_store, load_settings, print_summary, tables_layout};
use crate::adapters::database::create_source;
use crate::adapters::delegate::ClickHouseObfuscator;
use crate::core::pipeline::{PipelineCoordinator, PipelineSettings};
use clap::Args;
use tokio::sync::watch;

/// Arguments for the run command
#[derive(Args, Debug)]
pub struct RunArgs {
    /// Also write pre-data.sql and post-data.sql
    #[arg(long)]
    pub with_schema: bool,
}

impl RunArgs {
    pub async fn execute(
        &self,
        config_path: &str,
        shutdown_signal: watch::Receiver<bool>,
    ) -> anyhow::Result<i32> {
        tracing::info!("Starting run command");

        let config = match load_settings(config_path) {
            Ok(c) => c,
            Err(code) => return Ok(code),
        };

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

        if self.with_schema {
            println!("📄 Exporting schema sections...");
            if let Err(e) = export_schema(&config).await {
                eprintln!("❌ Schema export failed: {e}");
                return Ok(exit_code_for(&e));
            }
        }

        let source = match create_source(&config).await {
            Ok(s) => s,
            Err(e) => {
                tracing::error!(error = %e, "Failed to connect to source database");
                eprintln!("❌ Failed to connect to source database: {e}");
                return Ok(4);
            }
        };
        let anonymizer = ClickHouseObfuscator::new(&config.delegate);

        println!("🚀 Running pipeline...");
        let summary = match coordinator.run_all(source.as_ref(), &anonymizer).await {
            Ok(s) => s,
            Err(e) => {
                eprintln!("❌ Pipeline failed: {e}");
                return Ok(5);
            }
        };

        print_summary("Pipeline", &summary);
        Ok(summary.exit_code())
    }
}

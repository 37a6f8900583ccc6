//! Obfuscate command implementation
//!
//! Runs the delegate over the exported streams and merges the result.

use super::{exit_code_for, load_ready_store, load_settings, print_summary, tables_layout};
use crate::adapters::delegate::ClickHouseObfuscator;
use crate::core::pipeline::{PipelineCoordinator, PipelineSettings};
use clap::Args;
use tokio::sync::watch;

/// Arguments for the obfuscate command
#[derive(Args, Debug)]
pub struct ObfuscateArgs {
    /// Override the delegate binary
    #[arg(long)]
    pub delegate: Option<String>,
}

impl ObfuscateArgs {
    pub async fn execute(
        &self,
        config_path: &str,
        shutdown_signal: watch::Receiver<bool>,
    ) -> anyhow::Result<i32> {
        tracing::info!("Starting obfuscate command");

        let mut config = match load_settings(config_path) {
            Ok(c) => c,
            Err(code) => return Ok(code),
        };
        if let Some(binary) = &self.delegate {
            tracing::info!(binary = %binary, "Overriding delegate binary from CLI");
            config.delegate.binary = binary.clone();
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

        let anonymizer = ClickHouseObfuscator::new(&config.delegate);

        println!("🚀 Obfuscating tables...");
        let summary = match coordinator.run_obfuscation(&anonymizer).await {
            Ok(s) => s,
            Err(e) => {
                eprintln!("❌ Obfuscation failed: {e}");
                return Ok(5);
            }
        };

        print_summary("Obfuscation", &summary);
        Ok(summary.exit_code())
    }
}

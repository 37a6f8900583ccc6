//! Import command implementation

use super::{exit_code_for, load_ready_store, load_settings, tables_layout};
use crate::adapters::database::create_target;
use crate::core::import::{import_dataset, ImportOutcome, ImportSettings};
use crate::core::pipeline::retry::RetryPolicy;
use clap::Args;
use std::time::Duration;

/// Arguments for the import command
#[derive(Args, Debug)]
pub struct ImportArgs {}

impl ImportArgs {
    pub async fn execute(&self, config_path: &str) -> anyhow::Result<i32> {
        tracing::info!("Starting import command");

        let config = match load_settings(config_path) {
            Ok(c) => c,
            Err(code) => return Ok(code),
        };

        let store = match load_ready_store(&config) {
            Ok(s) => s,
            Err(code) => return Ok(code),
        };

        let target = match create_target(&config).await {
            Ok(t) => t,
            Err(e) => {
                tracing::error!(error = %e, "Failed to connect to target database");
                eprintln!("❌ Failed to connect to target database: {e}");
                return Ok(exit_code_for(&e));
            }
        };

        let schema = config
            .target
            .as_ref()
            .map(|t| t.schema.clone())
            .unwrap_or_else(|| config.source.schema.clone());
        let settings = ImportSettings {
            schema,
            pre_data: config.resolve_path(&config.paths.pre_data),
            post_data: config.resolve_path(&config.paths.post_data),
            copy_timeout: Duration::from_secs(config.pipeline.copy_timeout_seconds),
            retry: RetryPolicy::from(&config.pipeline.retry),
        };

        println!("🚀 Importing dataset...");
        match import_dataset(target.as_ref(), &store, &tables_layout(&config), &settings).await {
            Ok(ImportOutcome::AlreadyImported { table }) => {
                println!("ℹ️  Table '{table}' already exists in the target, nothing imported");
                Ok(0)
            }
            Ok(ImportOutcome::Imported {
                tables,
                rows,
                sequences,
            }) => {
                println!();
                println!("📊 Import Summary:");
                println!("  Tables: {tables}");
                println!("  Rows: {rows}");
                println!("  Sequences reset: {sequences}");
                println!();
                Ok(0)
            }
            Err(e) => {
                tracing::error!(error = %e, "Import failed");
                eprintln!("❌ Import failed: {e}");
                Ok(exit_code_for(&e))
            }
        }
    }
}

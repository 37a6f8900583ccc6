//! Configure command implementation
//!
//! Scans the source schema, classifies every column and writes the
//! obfuscation config for review.

use super::{exit_code_for, load_settings};
use crate::adapters::database::create_source;
use crate::obfuscation::{load_override, ConfigStore};
use clap::Args;

/// Arguments for the configure command
#[derive(Args, Debug)]
pub struct ConfigureArgs {
    /// Print the classification report even when the config is ready
    #[arg(long)]
    pub verbose_report: bool,
}

impl ConfigureArgs {
    pub async fn execute(&self, config_path: &str) -> anyhow::Result<i32> {
        tracing::info!("Starting configure command");

        let config = match load_settings(config_path) {
            Ok(c) => c,
            Err(code) => return Ok(code),
        };

        let override_path = config.resolve_path(&config.paths.override_document);
        let overrides = match load_override(&override_path) {
            Ok(o) => o,
            Err(e) => {
                eprintln!("❌ Failed to load override document {}: {e}", override_path.display());
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

        println!("🔍 Scanning schema '{}'...", config.source.schema);
        let records = match source.fetch_columns(&config.source.schema).await {
            Ok(r) => r,
            Err(e) => {
                eprintln!("❌ Failed to read column catalog: {e}");
                return Ok(exit_code_for(&e));
            }
        };

        let store = ConfigStore::build(&records, &overrides);
        let output = config.resolve_path(&config.paths.config_document);
        store.save(&output)?;

        let report = store.validate();
        println!("✅ Config written to {}", output.display());
        println!("  Tables: {}", store.config().tables.len());
        println!();

        if !report.is_ready() || self.verbose_report {
            println!("{report}");
        }
        if !report.is_ready() {
            println!(
                "Edit {} and run `pg-obfuscator configure` again, or review with `pg-obfuscator validate`.",
                override_path.display()
            );
        }

        Ok(0)
    }
}

//! Export-schema command implementation

use super::{exit_code_for, load_settings};
use crate::adapters::postgresql::{dump_schema_section, SchemaSection};
use crate::config::ObfuscatorConfig;
use crate::domain::Result;
use clap::Args;

/// Arguments for the export-schema command
#[derive(Args, Debug)]
pub struct ExportSchemaArgs {}

impl ExportSchemaArgs {
    pub async fn execute(&self, config_path: &str) -> anyhow::Result<i32> {
        tracing::info!("Starting export-schema command");

        let config = match load_settings(config_path) {
            Ok(c) => c,
            Err(code) => return Ok(code),
        };

        match export_schema(&config).await {
            Ok(()) => {
                println!("✅ Schema sections written");
                Ok(0)
            }
            Err(e) => {
                tracing::error!(error = %e, "Schema export failed");
                eprintln!("❌ Schema export failed: {e}");
                Ok(exit_code_for(&e))
            }
        }
    }
}

/// Write the pre-data and post-data sections of the source schema
pub async fn export_schema(config: &ObfuscatorConfig) -> Result<()> {
    let sections = [
        (SchemaSection::PreData, config.resolve_path(&config.paths.pre_data)),
        (SchemaSection::PostData, config.resolve_path(&config.paths.post_data)),
    ];
    for (section, output) in sections {
        dump_schema_section(&config.source, section, &output).await?;
    }
    Ok(())
}

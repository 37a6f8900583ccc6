//! Validate command implementation
//!
//! Checks the settings file and whether the obfuscation config is ready.

use super::load_settings;
use crate::obfuscation::ConfigStore;
use clap::Args;
use secrecy::ExposeSecret;

/// Arguments for the validate command
#[derive(Args, Debug)]
pub struct ValidateArgs {}

impl ValidateArgs {
    pub async fn execute(&self, config_path: &str) -> anyhow::Result<i32> {
        tracing::info!(config_path = %config_path, "Validating configuration");

        println!("🔍 Validating configuration file: {config_path}");
        println!();

        let config = match load_settings(config_path) {
            Ok(c) => {
                println!("✅ Configuration file loaded successfully");
                c
            }
            Err(code) => return Ok(code),
        };

        println!();
        println!("Configuration Summary:");
        println!("  Log Level: {}", config.application.log_level);
        println!("  Work Dir: {}", config.application.work_dir.display());
        println!(
            "  Source: {} (schema {})",
            config.source.connection_string.expose_secret().redacted_url(),
            config.source.schema
        );
        match &config.target {
            Some(target) => println!(
                "  Target: {} (schema {})",
                target.connection_string.expose_secret().redacted_url(),
                target.schema
            ),
            None => println!("  Target: not configured"),
        }
        println!("  Concurrency: {}", config.pipeline.concurrency);
        println!("  Delegate: {}", config.delegate.binary);
        println!();

        let document = config.resolve_path(&config.paths.config_document);
        let store = match ConfigStore::load(&document) {
            Ok(s) => s,
            Err(e) => {
                println!("❌ Failed to load obfuscation config {}", document.display());
                println!("   Error: {e}");
                return Ok(2);
            }
        };

        let report = store.validate();
        if report.is_ready() {
            println!("✅ Obfuscation config is ready ({} tables)", store.config().tables.len());
            Ok(0)
        } else {
            println!("❌ Obfuscation config is not ready");
            println!();
            println!("{report}");
            Ok(2)
        }
    }
}

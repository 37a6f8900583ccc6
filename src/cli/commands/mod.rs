//! CLI command implementations
//!
//! Every command returns a process exit code:
//! 0 success, 1 partial failure, 2 configuration error, 4 connection error,
//! 5 fatal error, 130 interrupted.

pub mod configure;
pub mod export_schema;
pub mod export_tables;
pub mod import;
pub mod init;
pub mod obfuscate;
pub mod run;
pub mod validate;

use crate::config::{load_config, ObfuscatorConfig};
use crate::core::pipeline::{PipelineSummary, TablesLayout};
use crate::domain::ObfuscatorError;
use crate::obfuscation::ConfigStore;

/// Exit code for an error that ends a command
pub fn exit_code_for(error: &ObfuscatorError) -> i32 {
    match error {
        ObfuscatorError::Configuration(_)
        | ObfuscatorError::ConfigurationInvalid(_)
        | ObfuscatorError::UnknownFakeGenerator(_) => 2,
        ObfuscatorError::Database(_) | ObfuscatorError::TransientIo(_) | ObfuscatorError::Timeout(_) => 4,
        _ => 5,
    }
}

/// Load the settings file, printing the failure
fn load_settings(config_path: &str) -> Result<ObfuscatorConfig, i32> {
    load_config(config_path).map_err(|e| {
        tracing::error!(error = %e, "Failed to load configuration");
        eprintln!("❌ Failed to load configuration: {e}");
        exit_code_for(&e)
    })
}

/// Load the obfuscation config and refuse to continue unless it is ready
fn load_ready_store(config: &ObfuscatorConfig) -> Result<ConfigStore, i32> {
    let path = config.resolve_path(&config.paths.config_document);
    let store = ConfigStore::load(&path).map_err(|e| {
        eprintln!("❌ Failed to load {}: {e}", path.display());
        exit_code_for(&e)
    })?;

    if let Err(e) = store.ensure_configured() {
        tracing::error!("Obfuscation config is not ready");
        eprintln!("❌ {e}");
        return Err(exit_code_for(&e));
    }
    Ok(store)
}

fn tables_layout(config: &ObfuscatorConfig) -> TablesLayout {
    TablesLayout::new(config.resolve_path(&config.paths.tables_dir))
}

fn print_summary(title: &str, summary: &PipelineSummary) {
    println!();
    println!("📊 {title} Summary:");
    println!("  Succeeded: {}", summary.succeeded.len());
    println!("  Failed: {}", summary.failed.len());
    println!("  Rows: {}", summary.rows);
    println!("  Duration: {:.2}s", summary.duration.as_secs_f64());

    if !summary.failed.is_empty() {
        println!();
        println!("  ⚠️  Failed tables:");
        for failure in &summary.failed {
            println!(
                "    - {} [{} / {}]: {}",
                failure.table, failure.stage, failure.error_type, failure.message
            );
        }
    }

    if summary.interrupted {
        println!();
        println!(
            "  ⚠️  Interrupted, {} table(s) not started",
            summary.not_started.len()
        );
    }
    println!();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_codes_by_error() {
        assert_eq!(exit_code_for(&ObfuscatorError::ConfigurationInvalid("x".into())), 2);
        assert_eq!(exit_code_for(&ObfuscatorError::Database("x".into())), 4);
        assert_eq!(exit_code_for(&ObfuscatorError::Timeout("x".into())), 4);
        assert_eq!(
            exit_code_for(&ObfuscatorError::Delegate {
                table: "t".into(),
                message: "x".into()
            }),
            5
        );
    }

    #[test]
    fn test_missing_settings_file_is_configuration_error() {
        assert_eq!(load_settings("does-not-exist.toml").unwrap_err(), 2);
    }
}

//! Init command implementation
//!
//! This module implements the `init` command for generating a sample
//! settings file.

use clap::Args;
use std::fs;
use std::path::Path;

/// Arguments for the init command
#[derive(Args, Debug)]
pub struct InitArgs {
    /// Path where to create the configuration file
    #[arg(short, long, default_value = "pg-obfuscator.toml")]
    pub output: String,

    /// Include every optional setting with its default value
    #[arg(long)]
    pub with_examples: bool,

    /// Overwrite existing file
    #[arg(long)]
    pub force: bool,
}

impl InitArgs {
    /// Execute the init command
    pub async fn execute(&self) -> anyhow::Result<i32> {
        tracing::info!(output = %self.output, "Initializing configuration file");

        println!("📝 Initializing pg-obfuscator configuration");
        println!();

        if Path::new(&self.output).exists() && !self.force {
            println!("❌ Configuration file already exists: {}", self.output);
            println!("   Use --force to overwrite");
            return Ok(2);
        }

        let config_content = if self.with_examples {
            Self::generate_config_with_examples()
        } else {
            Self::generate_minimal_config()
        };

        match fs::write(&self.output, config_content) {
            Ok(_) => {
                println!("✅ Configuration file created: {}", self.output);
                println!();
                println!("Next steps:");
                println!("  1. Set PGOBF_SOURCE_URL (a .env file works too)");
                println!("  2. Classify the schema: pg-obfuscator configure");
                println!("  3. Fix flagged columns in config/override.toml and re-run configure");
                println!("  4. Check readiness: pg-obfuscator validate");
                println!("  5. Produce the dataset: pg-obfuscator run --with-schema");
                println!("  6. Load it: pg-obfuscator import");
                println!();
                Ok(0)
            }
            Err(e) => {
                println!("❌ Failed to write configuration file");
                println!("   Error: {e}");
                Ok(5)
            }
        }
    }

    fn generate_minimal_config() -> String {
        r#"# pg-obfuscator settings

[application]
log_level = "info"

[source]
connection_string = "${PGOBF_SOURCE_URL}"
schema = "public"

# [target]
# connection_string = "${PGOBF_TARGET_URL}"
# schema = "public"

[pipeline]
concurrency = 4

[delegate]
binary = "clickhouse-obfuscator"
"#
        .to_string()
    }

    fn generate_config_with_examples() -> String {
        r#"# pg-obfuscator settings
#
# Values of the form ${VAR} are read from the environment.
# Any key can also be overridden with PGOBF_<SECTION>_<KEY>.

[application]
# trace | debug | info | warn | error
log_level = "info"
# Relative paths below are resolved against this directory
work_dir = "."

[source]
connection_string = "${PGOBF_SOURCE_URL}"
schema = "public"
max_connections = 10
connection_timeout_seconds = 30
# 0 disables the statement timeout
statement_timeout_seconds = 0

# Required by `import` only
[target]
connection_string = "${PGOBF_TARGET_URL}"
schema = "public"
max_connections = 10
connection_timeout_seconds = 30
statement_timeout_seconds = 0

[pipeline]
# Tables processed at the same time
concurrency = 4
copy_timeout_seconds = 3600
delegate_timeout_seconds = 3600

[pipeline.retry]
max_retries = 3
initial_delay_ms = 1000
max_delay_ms = 30000
backoff_multiplier = 2.0

[delegate]
binary = "clickhouse-obfuscator"
# Appended to every invocation
extra_args = []

[paths]
config_document = "config/obfuscation.toml"
override_document = "config/override.toml"
tables_dir = "tables"
pre_data = "pre-data.sql"
post_data = "post-data.sql"

[logging]
local_enabled = false
local_path = "logs"
# daily | hourly | never
local_rotation = "daily"
"#
        .to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ObfuscatorConfig;
    use tempfile::TempDir;

    fn parse(content: &str) -> ObfuscatorConfig {
        let content = content
            .replace("${PGOBF_SOURCE_URL}", "postgresql://app@localhost/app")
            .replace("${PGOBF_TARGET_URL}", "postgresql://app@localhost/staging");
        toml::from_str(&content).unwrap()
    }

    #[test]
    fn test_generated_configs_are_valid() {
        let minimal = parse(&InitArgs::generate_minimal_config());
        assert!(minimal.validate().is_ok());
        assert!(minimal.target.is_none());

        let full = parse(&InitArgs::generate_config_with_examples());
        assert!(full.validate().is_ok());
        assert_eq!(full.target.unwrap().schema, "public");
    }

    #[tokio::test]
    async fn test_refuses_to_overwrite_without_force() {
        let dir = TempDir::new().unwrap();
        let output = dir.path().join("pg-obfuscator.toml");
        fs::write(&output, "keep me").unwrap();

        let args = InitArgs {
            output: output.to_string_lossy().into_owned(),
            with_examples: false,
            force: false,
        };
        assert_eq!(args.execute().await.unwrap(), 2);
        assert_eq!(fs::read_to_string(&output).unwrap(), "keep me");

        let args = InitArgs { force: true, ..args };
        assert_eq!(args.execute().await.unwrap(), 0);
        assert!(fs::read_to_string(&output).unwrap().contains("[source]"));
    }
}

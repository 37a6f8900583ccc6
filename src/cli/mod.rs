//! CLI interface and argument parsing
//!
//! This module provides the command-line interface for pg-obfuscator using clap.

pub mod commands;

use clap::{Parser, Subcommand};

/// pg-obfuscator - build anonymized copies of PostgreSQL databases
#[derive(Parser, Debug)]
#[command(name = "pg-obfuscator")]
#[command(version, about, long_about = None)]
#[command(author = "pg-obfuscator Contributors")]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "pg-obfuscator.toml", env = "PGOBF_CONFIG")]
    pub config: String,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, env = "PGOBF_LOG_LEVEL")]
    pub log_level: Option<String>,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Classify the source schema and write the obfuscation config
    Configure(commands::configure::ConfigureArgs),

    /// Validate the settings file and the obfuscation config
    Validate(commands::validate::ValidateArgs),

    /// Dump the pre-data and post-data schema sections
    ExportSchema(commands::export_schema::ExportSchemaArgs),

    /// Export every table into obfuscate and preserve streams
    ExportTables(commands::export_tables::ExportTablesArgs),

    /// Anonymize exported streams and merge the result files
    Obfuscate(commands::obfuscate::ObfuscateArgs),

    /// Export, obfuscate and merge in one pass
    Run(commands::run::RunArgs),

    /// Load the schema and result files into the target database
    Import(commands::import::ImportArgs),

    /// Initialize a new configuration file
    Init(commands::init::InitArgs),
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test]
    fn test_cli_parse_defaults() {
        let cli = Cli::parse_from(["pg-obfuscator", "configure"]);
        assert_eq!(cli.config, "pg-obfuscator.toml");
        assert!(cli.log_level.is_none());
        assert!(matches!(cli.command, Commands::Configure(_)));
    }

    #[test]
    fn test_cli_parse_with_config_and_log_level() {
        let cli = Cli::parse_from([
            "pg-obfuscator",
            "--config",
            "custom.toml",
            "--log-level",
            "debug",
            "validate",
        ]);
        assert_eq!(cli.config, "custom.toml");
        assert_eq!(cli.log_level, Some("debug".to_string()));
    }

    #[test_case("export-schema" ; "export schema")]
    #[test_case("export-tables" ; "export tables")]
    #[test_case("obfuscate" ; "obfuscate")]
    #[test_case("run" ; "run")]
    #[test_case("import" ; "import")]
    #[test_case("init" ; "init")]
    fn test_cli_parse_subcommand(name: &str) {
        assert!(Cli::try_parse_from(["pg-obfuscator", name]).is_ok());
    }

    #[test]
    fn test_cli_parse_run_with_schema() {
        let cli = Cli::parse_from(["pg-obfuscator", "run", "--with-schema"]);
        match cli.command {
            Commands::Run(args) => assert!(args.with_schema),
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_cli_parse_export_tables_concurrency() {
        let cli = Cli::parse_from(["pg-obfuscator", "export-tables", "--concurrency", "8"]);
        match cli.command {
            Commands::ExportTables(args) => assert_eq!(args.concurrency, Some(8)),
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_cli_rejects_unknown_command() {
        assert!(Cli::try_parse_from(["pg-obfuscator", "status"]).is_err());
    }
}

// pg-obfuscator - PostgreSQL data obfuscation pipeline
// Copyright (c) 2025 pg-obfuscator Contributors
// Licensed under the MIT License

//! # pg-obfuscator - anonymized copies of PostgreSQL databases
//!
//! pg-obfuscator builds an importable, anonymized copy of a PostgreSQL schema.
//! Every column is classified by risk, the tables are exported as CSV, the
//! risky columns are run through an external anonymization engine and the
//! result is merged back into files the target database can `COPY` in.
//!
//! ## Overview
//!
//! This library provides the core functionality for:
//! - **Classifying** columns (keys, sequences, unique constraints, unmapped types)
//! - **Configuring** obfuscation with a generated document plus human overrides
//! - **Exporting** each table as an obfuscate stream and a preserve stream
//! - **Obfuscating** through a delegate process and merging with fake data
//! - **Importing** the schema sections, result files and sequence positions
//!
//! ## Architecture
//!
//! - [`cli`] - Command-line interface and argument parsing
//! - [`obfuscation`] - Classification and the obfuscation config document
//! - [`core`] - Pipeline stages and import
//! - [`adapters`] - PostgreSQL, `pg_dump` and the delegate process
//! - [`domain`] - Catalog records and error types
//! - [`config`] - Settings file management
//! - [`logging`] - Structured logging
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use pg_obfuscator::adapters::database::create_source;
//! use pg_obfuscator::config::ObfuscatorConfig;
//! use pg_obfuscator::obfuscation::{load_override, ConfigStore};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ObfuscatorConfig::from_file("pg-obfuscator.toml")?;
//!     let source = create_source(&config).await?;
//!
//!     let records = source.fetch_columns(&config.source.schema).await?;
//!     let overrides = load_override(config.resolve_path(&config.paths.override_document))?;
//!     let store = ConfigStore::build(&records, &overrides);
//!
//!     println!("{}", store.validate());
//!     Ok(())
//! }
//! ```
//!
//! ## Error Handling
//!
//! Library operations return [`domain::Result`], backed by
//! [`domain::ObfuscatorError`]:
//!
//! ```rust,no_run
//! use pg_obfuscator::domain::ObfuscatorError;
//!
//! fn example() -> Result<(), ObfuscatorError> {
//!     let config = pg_obfuscator::config::ObfuscatorConfig::from_file("pg-obfuscator.toml")?;
//!     Ok(())
//! }
//! ```
//!
//! ## Logging
//!
//! Structured logging goes through the `tracing` crate:
//!
//! ```rust,no_run
//! use tracing::{info, warn};
//!
//! info!(table = "users", "Exporting table");
//! warn!(table = "orders", column = "total", "Column needs a manual fix");
//! ```

pub mod adapters;
pub mod cli;
pub mod config;
pub mod core;
pub mod domain;
pub mod logging;
pub mod obfuscation;

//! External system integrations for pg-obfuscator.
//!
//! - [`database`] - Database abstraction layer (trait-based)
//! - [`postgresql`] - PostgreSQL implementation of the source and target
//! - [`delegate`] - The external anonymization engine
//!
//! # Design Pattern
//!
//! Adapters isolate external dependencies so the pipeline stages can be
//! tested against in-memory implementations of the traits.
//!
//! ```rust,no_run
//! use pg_obfuscator::adapters::database::create_source;
//! use pg_obfuscator::config::ObfuscatorConfig;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = ObfuscatorConfig::from_file("pg-obfuscator.toml")?;
//! let source = create_source(&config).await?;
//! let columns = source.fetch_columns(&config.source.schema).await?;
//! println!("{} catalog rows", columns.len());
//! # Ok(())
//! # }
//! ```

pub mod database;
pub mod delegate;
pub mod postgresql;

//! Core pipeline logic for pg-obfuscator.
//!
//! # Modules
//!
//! - [`pipeline`] - Export, obfuscate and merge stages over a worker pool
//! - [`import`] - Loading the merged dataset into the target database
//!
//! # Workflow
//!
//! 1. **Configure**: classify the source schema into the obfuscation config
//! 2. **Export**: write the obfuscate and preserve streams of every table
//! 3. **Obfuscate**: run the obfuscate stream through the delegate
//! 4. **Merge**: pair both streams and apply fake-data overrides
//! 5. **Import**: apply the schema sections and `COPY` the result files
//!
//! # Example
//!
//! ```rust,no_run
//! use pg_obfuscator::config::ObfuscatorConfig;
//! use pg_obfuscator::core::pipeline::{PipelineCoordinator, PipelineSettings, TablesLayout};
//! use pg_obfuscator::adapters::delegate::ClickHouseObfuscator;
//! use pg_obfuscator::obfuscation::ConfigStore;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = ObfuscatorConfig::from_file("pg-obfuscator.toml")?;
//! let store = ConfigStore::load(config.resolve_path(&config.paths.config_document))?;
//! let layout = TablesLayout::new(config.resolve_path(&config.paths.tables_dir));
//!
//! let (_shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);
//! let coordinator = PipelineCoordinator::new(
//!     &store,
//!     layout,
//!     PipelineSettings::from_config(&config),
//!     shutdown_rx,
//! )?;
//!
//! let summary = coordinator
//!     .run_obfuscation(&ClickHouseObfuscator::new(&config.delegate))
//!     .await?;
//! println!("Succeeded: {}", summary.succeeded.len());
//! # Ok(())
//! # }
//! ```

pub mod import;
pub mod pipeline;

//! PostgreSQL integration
//!
//! The same adapter serves as the export source and the import target.

pub mod adapter;
pub mod catalog;
pub mod client;
pub mod dump;
pub mod sql;

pub use adapter::PostgreSQLAdapter;
pub use client::PostgreSQLClient;
pub use dump::{dump_schema_section, SchemaSection};

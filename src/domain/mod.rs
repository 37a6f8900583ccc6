//! Domain models and types for pg-obfuscator.
//!
//! The domain layer provides:
//! - **Catalog records** ([`ColumnRecord`], [`SequenceRecord`], [`ConstraintKind`])
//! - **Error types** ([`ObfuscatorError`])
//! - **Result type alias** ([`Result`])
//!
//! # Error Handling
//!
//! All fallible library operations return [`Result<T, ObfuscatorError>`]:
//!
//! ```rust,no_run
//! use pg_obfuscator::domain::Result;
//!
//! fn example() -> Result<()> {
//!     // Errors are automatically converted using the ? operator
//!     let config = pg_obfuscator::config::ObfuscatorConfig::from_file("pg-obfuscator.toml")?;
//!     Ok(())
//! }
//! ```

pub mod column;
pub mod errors;
pub mod result;

// Re-export commonly used types for convenience
pub use column::{ColumnRecord, ConstraintKind, SequenceRecord};
pub use errors::ObfuscatorError;
pub use result::Result;

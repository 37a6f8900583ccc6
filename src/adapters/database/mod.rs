//! Database abstraction layer
//!
//! The pipeline depends on these traits rather than on PostgreSQL directly.

pub mod factory;
pub mod traits;

pub use factory::{create_source, create_target};
pub use traits::{CopyOutRequest, SourceDatabase, TargetDatabase};

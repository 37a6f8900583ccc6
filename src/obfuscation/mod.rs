//! Schema classification and obfuscation configuration
//!
//! This module turns a column scan into a reviewable [`GlobalConfig`]:
//!
//! - [`type_map`] - source type to delegate type lookup
//! - [`classifier`] - per-column risk reasons, type patch and exclusion
//! - [`merge`] - applying the human-authored [`OverrideDocument`]
//! - [`store`] - build, validate, load and save
//! - [`report`] - needs-fix and validation reports
//! - [`fake`] - fake-data generators and pattern substitution

pub mod classifier;
pub mod fake;
pub mod merge;
pub mod model;
pub mod report;
pub mod store;
pub mod type_map;

pub use classifier::{classify, needs_fix, Classification, ClassificationContext, Reason};
pub use fake::{FakeGenerator, FakeGenerators, ResolvedFake};
pub use model::{
    ColumnConfig, FakeKind, FakeOverride, GlobalConfig, OverrideDocument, TableConfig,
};
pub use report::ValidationReport;
pub use store::{load_override, ConfigStore};

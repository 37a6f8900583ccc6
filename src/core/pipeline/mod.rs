//! Export, obfuscate and merge stages
//!
//! Every loadable table goes through the same three stages. The streams of
//! a table live under the tables directory (see [`layout`]) and the
//! [`manifest`] records their column order for the later phases.

pub mod coordinator;
pub mod export;
pub mod layout;
pub mod manifest;
pub mod merge;
pub mod obfuscate;
pub mod retry;
pub mod summary;

pub use coordinator::{PipelineCoordinator, PipelineSettings};
pub use layout::{Stream, TablesLayout};
pub use manifest::{HeaderManifest, TableHeaders};
pub use summary::{PipelineSummary, Stage, TableFailure};

//! On-disk layout of the per-table streams

use std::path::{Path, PathBuf};

use crate::domain::Result;

/// Stream directories under the tables directory
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stream {
    /// Columns sent to the delegate
    Source,
    /// Columns copied verbatim
    Excluded,
    /// Delegate output
    Obfuscated,
    /// Final merged dataset
    Result,
}

impl Stream {
    pub const ALL: [Stream; 4] = [Stream::Source, Stream::Excluded, Stream::Obfuscated, Stream::Result];

    pub fn dir_name(&self) -> &'static str {
        match self {
            Self::Source => "source",
            Self::Excluded => "excluded",
            Self::Obfuscated => "obfuscated",
            Self::Result => "result",
        }
    }
}

#[derive(Debug, Clone)]
pub struct TablesLayout {
    root: PathBuf,
}

impl TablesLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn file(&self, stream: Stream, table: &str) -> PathBuf {
        self.root.join(stream.dir_name()).join(format!("{table}.csv"))
    }

    /// Create every stream directory
    pub fn ensure_dirs(&self) -> Result<()> {
        for stream in Stream::ALL {
            std::fs::create_dir_all(self.root.join(stream.dir_name()))?;
        }
        Ok(())
    }
}

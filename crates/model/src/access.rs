//! Access modes understood by the permission oracle.

use std::fmt;

use serde::{Deserialize, Serialize};

/// The kind of access an operation needs on a path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccessMode {
    /// Enumerate the entries of a directory.
    ListDirectory,
    /// Read names, dates and sizes.
    ReadProperties,
    /// Read file contents.
    ReadContents,
    /// Create, rename or overwrite entries.
    Write,
    /// Traverse into a directory.
    Execute,
    /// Remove an entry.
    Delete,
}

impl AccessMode {
    /// Whether this mode only observes the file system.
    pub fn is_read_only(&self) -> bool {
        matches!(
            self,
            Self::ListDirectory | Self::ReadProperties | Self::ReadContents | Self::Execute
        )
    }
}

impl fmt::Display for AccessMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::ListDirectory => "list directory",
            Self::ReadProperties => "read properties",
            Self::ReadContents => "read contents",
            Self::Write => "write",
            Self::Execute => "execute",
            Self::Delete => "delete",
        };
        f.write_str(s)
    }
}

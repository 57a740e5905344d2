//! Directory and file entities produced by the domain services.
//!
//! Entities are built per call and never cached. An entity whose metadata
//! could not be read is still returned, tagged [`Status::Inaccessible`], so
//! enumeration never drops an item just because its properties are hidden.

use std::time::SystemTime;

use serde::{Deserialize, Serialize};

use crate::path::FileSystemPathId;

/// Whether an entity's metadata could be read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    /// All metadata sub-calls succeeded.
    Accessible,
    /// At least one metadata sub-call failed.
    Inaccessible,
}

/// Tagged metadata group.
///
/// `Accessible` carries details whose optional fields may still be absent
/// because the platform genuinely has no value (e.g. no birth time).
/// `Inaccessible` carries nothing: the engine tried and failed to read.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", content = "details", rename_all = "lowercase")]
pub enum Metadata<T> {
    /// Metadata was read successfully.
    Accessible(T),
    /// Metadata could not be read.
    Inaccessible,
}

impl<T> Metadata<T> {
    /// The status tag for this group.
    pub fn status(&self) -> Status {
        match self {
            Self::Accessible(_) => Status::Accessible,
            Self::Inaccessible => Status::Inaccessible,
        }
    }

    /// The details, if they were readable.
    pub fn details(&self) -> Option<&T> {
        match self {
            Self::Accessible(details) => Some(details),
            Self::Inaccessible => None,
        }
    }
}

/// Readable directory properties.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectoryDetails {
    /// Creation time, when the platform records one.
    pub date_created: Option<SystemTime>,
    /// Last write time.
    pub date_modified: Option<SystemTime>,
}

/// Readable file properties.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileDetails {
    /// Creation time, when the platform records one.
    pub date_created: Option<SystemTime>,
    /// Last write time.
    pub date_modified: Option<SystemTime>,
    /// Size in bytes.
    pub size: u64,
}

/// A directory entity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Directory {
    /// Normalized path, always ending with a separator.
    pub id: FileSystemPathId,
    /// Entry name (not full path).
    pub name: String,
    /// Dates, or the fact that they could not be read.
    pub metadata: Metadata<DirectoryDetails>,
}

impl Directory {
    /// Whether the directory's metadata could be read.
    pub fn status(&self) -> Status {
        self.metadata.status()
    }

    /// Creation time, if accessible and recorded.
    pub fn date_created(&self) -> Option<SystemTime> {
        self.metadata.details().and_then(|d| d.date_created)
    }

    /// Last write time, if accessible.
    pub fn date_modified(&self) -> Option<SystemTime> {
        self.metadata.details().and_then(|d| d.date_modified)
    }
}

/// A file entity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct File {
    /// Normalized path, never ending with a separator.
    pub id: FileSystemPathId,
    /// Entry name including extension.
    pub name: String,
    /// Dates and size, or the fact that they could not be read.
    pub metadata: Metadata<FileDetails>,
}

impl File {
    /// Whether the file's metadata could be read.
    pub fn status(&self) -> Status {
        self.metadata.status()
    }

    /// Creation time, if accessible and recorded.
    pub fn date_created(&self) -> Option<SystemTime> {
        self.metadata.details().and_then(|d| d.date_created)
    }

    /// Last write time, if accessible.
    pub fn date_modified(&self) -> Option<SystemTime> {
        self.metadata.details().and_then(|d| d.date_modified)
    }

    /// Size in bytes, if accessible.
    pub fn size(&self) -> Option<u64> {
        self.metadata.details().map(|d| d.size)
    }

    /// Lowercased extension without the dot, if any.
    pub fn extension(&self) -> Option<String> {
        let (stem, ext) = self.name.rsplit_once('.')?;
        if stem.is_empty() || ext.is_empty() {
            return None;
        }
        Some(ext.to_ascii_lowercase())
    }
}

/// A drive reported by the OS.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DriveInfo {
    /// Root path of the drive (`C:\`, `/`).
    pub root: String,
    /// Whether the drive is mounted and readable.
    pub is_ready: bool,
}

/// A mount root.
///
/// Unix exposes exactly one (`/`); Windows exposes one per ready drive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "platform", rename_all = "lowercase")]
pub enum RootItem {
    /// The single Unix root.
    Unix {
        /// The root directory.
        directory: Directory,
    },
    /// A ready Windows drive.
    Windows {
        /// Drive as reported by the OS.
        drive: DriveInfo,
        /// The drive's root directory.
        directory: Directory,
    },
}

impl RootItem {
    /// The root directory entity.
    pub fn directory(&self) -> &Directory {
        match self {
            Self::Unix { directory } | Self::Windows { directory, .. } => directory,
        }
    }
}

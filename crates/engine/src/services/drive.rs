//! Drive enumeration.

use std::sync::Arc;

use model::{Directory, DirectoryDetails, FileSystemPathId, FsError, Metadata, Result, RootItem};

use super::DirectoryService;
use crate::fs::FileSystem;
use crate::platform::Platform;

/// Lists mount roots for the active platform.
#[derive(Debug, Clone)]
pub struct DriveService {
    platform: Platform,
    fs: Arc<dyn FileSystem>,
    directories: DirectoryService,
}

impl DriveService {
    /// Create a drive service for `platform`.
    pub fn new(platform: Platform, fs: Arc<dyn FileSystem>, directories: DirectoryService) -> Self {
        Self {
            platform,
            fs,
            directories,
        }
    }

    /// Mount roots.
    ///
    /// Unix always yields the single `/` root, marked accessible. Windows
    /// yields one item per drive reporting ready.
    pub fn get_drives(&self) -> Result<Vec<RootItem>> {
        match self.platform {
            Platform::Unix => Ok(vec![self.unix_root()?]),
            Platform::Windows => self.windows_drives(),
        }
    }

    fn unix_root(&self) -> Result<RootItem> {
        let id = FileSystemPathId::new("/")?;
        let directory = match self.directories.hydrate(id.clone()) {
            accessible @ Directory {
                metadata: Metadata::Accessible(_),
                ..
            } => accessible,
            _ => Directory {
                name: "/".to_string(),
                id,
                metadata: Metadata::Accessible(DirectoryDetails::default()),
            },
        };
        Ok(RootItem::Unix { directory })
    }

    fn windows_drives(&self) -> Result<Vec<RootItem>> {
        let drives = self
            .fs
            .drives()
            .map_err(|e| FsError::Io {
                path: "drives".to_string(),
                message: e.to_string(),
            })?;

        let mut roots = Vec::new();
        for drive in drives {
            if !drive.is_ready {
                tracing::debug!(drive = %drive.root, "Skipping drive that is not ready");
                continue;
            }
            match self.directories.get_directory(drive.root.as_str()) {
                Ok(directory) => roots.push(RootItem::Windows { drive, directory }),
                Err(e) => {
                    tracing::warn!(drive = %drive.root, error = %e, "Skipping unusable drive root");
                }
            }
        }
        Ok(roots)
    }
}

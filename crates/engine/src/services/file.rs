//! File domain service.

use std::sync::Arc;

use model::{File, FileDetails, FileSystemPathId, FsError, Metadata, Result};

use super::{recover, PathInput};
use crate::platform::PathStrategy;
use crate::providers::FileProvider;

/// File operations returning hydrated [`File`] entities.
#[derive(Debug, Clone)]
pub struct FileService {
    provider: FileProvider,
    strategy: Arc<dyn PathStrategy>,
}

impl FileService {
    /// Create a service over `provider`.
    pub fn new(provider: FileProvider, strategy: Arc<dyn PathStrategy>) -> Self {
        Self { provider, strategy }
    }

    /// The underlying provider.
    pub fn provider(&self) -> &FileProvider {
        &self.provider
    }

    /// The file at `path`.
    pub fn get_file(&self, path: impl PathInput) -> Result<File> {
        let id = path.to_file_id(self.strategy.as_ref())?;
        if !self.provider.file_exists(&id) {
            return Err(FsError::FileNotFound(id.into_string()));
        }
        Ok(self.hydrate(id))
    }

    /// Files directly inside `directory`, sorted by full path.
    pub fn get_files(&self, directory: impl PathInput, include_hidden: bool) -> Result<Vec<File>> {
        let dir = directory.to_directory_id(self.strategy.as_ref())?;
        let children = self.provider.get_file_paths(&dir, include_hidden)?;
        Ok(children.into_iter().map(|child| self.hydrate(child)).collect())
    }

    /// Whether a file exists at `path`. Invalid paths do not exist.
    pub fn file_exists(&self, path: impl PathInput) -> bool {
        path.to_file_id(self.strategy.as_ref())
            .map(|id| self.provider.file_exists(&id))
            .unwrap_or(false)
    }

    /// Whole contents of the file.
    pub fn read_file(&self, path: impl PathInput) -> Result<Vec<u8>> {
        let id = path.to_file_id(self.strategy.as_ref())?;
        self.provider.get_file(&id)
    }

    /// Copy `source` to `destination`, picking a `" - Copy (N)"` name on
    /// collision.
    pub fn copy_file(
        &self,
        source: impl PathInput,
        destination: impl PathInput,
        overwrite: bool,
    ) -> Result<File> {
        let source = source.to_file_id(self.strategy.as_ref())?;
        let destination = destination.to_file_id(self.strategy.as_ref())?;
        let copied = self.provider.copy_file(&source, &destination, overwrite)?;
        Ok(self.hydrate(copied))
    }

    /// Move `source` to `destination`.
    pub fn move_file(
        &self,
        source: impl PathInput,
        destination: impl PathInput,
        overwrite: bool,
    ) -> Result<File> {
        let source = source.to_file_id(self.strategy.as_ref())?;
        let destination = destination.to_file_id(self.strategy.as_ref())?;
        let moved = self.provider.move_file(&source, &destination, overwrite)?;
        Ok(self.hydrate(moved))
    }

    /// Rename `path` within its directory.
    ///
    /// Fails with `FileAlreadyExists` when the new name is taken.
    pub fn rename_file(&self, path: impl PathInput, new_name: &str) -> Result<File> {
        let id = path.to_file_id(self.strategy.as_ref())?;
        let parent = self
            .strategy
            .parent(&id)
            .ok_or_else(|| FsError::InvalidPath(format!("{id} has no parent directory")))?;
        let target = self.strategy.combine_path(&parent, new_name)?;
        if self.provider.file_exists(&target) {
            return Err(FsError::FileAlreadyExists(target.into_string()));
        }

        let renamed = self.provider.rename_file(&id, new_name)?;
        Ok(self.hydrate(renamed))
    }

    /// Delete the file at `path`.
    pub fn delete_file(&self, path: impl PathInput) -> Result<()> {
        let id = path.to_file_id(self.strategy.as_ref())?;
        self.provider.delete_file(&id)
    }

    /// Build an entity for `id`. Never fails; unreadable metadata yields an
    /// `Inaccessible` entity.
    pub fn hydrate(&self, id: FileSystemPathId) -> File {
        let name = recover(&id, "name", self.provider.get_file_name(&id));
        let modified = recover(&id, "last_write_time", self.provider.get_last_write_time(&id));
        let created = recover(&id, "creation_time", self.provider.get_creation_time(&id));
        let size = recover(&id, "size", self.provider.get_size(&id));

        match (name, modified, created, size) {
            (Some(name), Some(modified), Some(created), Some(size)) => File {
                id,
                name,
                metadata: Metadata::Accessible(FileDetails {
                    date_created: created,
                    date_modified: Some(modified),
                    size,
                }),
            },
            (name, ..) => File {
                name: name.unwrap_or_else(|| self.strategy.file_name(&id)),
                id,
                metadata: Metadata::Inaccessible,
            },
        }
    }
}

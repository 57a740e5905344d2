//! Directory provider: listing, probing and the copy, move, merge, rename
//! and delete algorithms for directory trees.

use std::io;
use std::path::Path;
use std::sync::Arc;
use std::time::SystemTime;

use model::{AccessMode, FileSystemPathId, FsError, Result};

use super::{translate, Entity, ProviderContext};
use crate::fs::FileSystem;
use crate::permissions::PermissionsService;
use crate::platform::PathStrategy;

/// Permission-gated directory operations.
#[derive(Debug, Clone)]
pub struct DirectoryProvider {
    ctx: ProviderContext,
}

impl DirectoryProvider {
    /// Create a provider over `fs`, resolving paths with `strategy` and
    /// asking `permissions` before each OS call.
    pub fn new(
        fs: Arc<dyn FileSystem>,
        strategy: Arc<dyn PathStrategy>,
        permissions: Arc<dyn PermissionsService>,
    ) -> Self {
        Self {
            ctx: ProviderContext::new(fs, strategy, permissions),
        }
    }

    #[cfg(test)]
    pub(crate) fn from_context(ctx: ProviderContext) -> Self {
        Self { ctx }
    }

    /// Subdirectories of `path`, sorted by full path.
    ///
    /// Hidden entries are dropped unless `include_hidden`. An entry whose
    /// attributes cannot be read is kept.
    pub fn get_subdirectory_paths(
        &self,
        path: &FileSystemPathId,
        include_hidden: bool,
    ) -> Result<Vec<FileSystemPathId>> {
        self.ctx.authorize(path, AccessMode::ListDirectory, true)?;

        let children = self
            .ctx
            .fs
            .list_directories(path.as_path())
            .map_err(|e| translate(&e, path, Entity::Directory, AccessMode::ListDirectory))?;

        let mut ids: Vec<FileSystemPathId> = children
            .iter()
            .filter(|child| include_hidden || is_visible(self.ctx.fs.as_ref(), child))
            .filter_map(|child| self.ctx.child_id(child, true))
            .collect();
        ids.sort_by(|a, b| a.as_str().cmp(b.as_str()));
        Ok(ids)
    }

    /// Whether a directory exists at `path`.
    pub fn directory_exists(&self, path: &FileSystemPathId) -> bool {
        self.ctx.fs.directory_exists(path.as_path())
    }

    /// Display name of the directory.
    pub fn get_directory_name(&self, path: &FileSystemPathId) -> Result<String> {
        self.ctx.authorize(path, AccessMode::ReadProperties, true)?;
        Ok(self.ctx.strategy.file_name(path))
    }

    /// Creation time, `None` when the platform records none.
    pub fn get_creation_time(&self, path: &FileSystemPathId) -> Result<Option<SystemTime>> {
        self.ctx.authorize(path, AccessMode::ReadProperties, true)?;
        self.ctx
            .fs
            .creation_time(path.as_path())
            .map_err(|e| translate(&e, path, Entity::Directory, AccessMode::ReadProperties))
    }

    /// Last write time.
    pub fn get_last_write_time(&self, path: &FileSystemPathId) -> Result<SystemTime> {
        self.ctx.authorize(path, AccessMode::ReadProperties, true)?;
        self.ctx
            .fs
            .last_write_time(path.as_path())
            .map_err(|e| translate(&e, path, Entity::Directory, AccessMode::ReadProperties))
    }

    /// Create `name` inside `parent` and return its id.
    pub fn create_directory(
        &self,
        parent: &FileSystemPathId,
        name: &str,
    ) -> Result<FileSystemPathId> {
        self.ctx.authorize(parent, AccessMode::Write, true)?;
        let target = self.ctx.strategy.combine_directory_path(parent, name)?;

        self.ctx
            .fs
            .create_directory(target.as_path())
            .map_err(|e| match e.kind() {
                io::ErrorKind::NotFound => FsError::DirectoryNotFound(parent.to_string()),
                _ => translate(&e, &target, Entity::Directory, AccessMode::Write),
            })?;

        if !self.ctx.fs.directory_exists(target.as_path()) {
            return Err(FsError::Validation(format!(
                "created directory {target} cannot be found"
            )));
        }
        tracing::debug!(path = %target, "Created directory");
        Ok(target)
    }

    /// Copy the tree at `source` to `destination`.
    ///
    /// When `destination` is taken, the copy lands at the first free
    /// `"<name> - Copy (N)"` sibling instead. Returns the id actually used.
    pub fn copy_directory(
        &self,
        source: &FileSystemPathId,
        destination: &FileSystemPathId,
        override_existing: bool,
    ) -> Result<FileSystemPathId> {
        self.ctx.authorize(source, AccessMode::ReadContents, true)?;
        let destination_parent = self.ctx.parent_of(destination)?;
        self.ctx
            .authorize(&destination_parent, AccessMode::Write, true)?;

        if !self.ctx.fs.directory_exists(source.as_path()) {
            return Err(FsError::DirectoryNotFound(source.to_string()));
        }

        // Copying onto the source itself resolves to a "- Copy (N)" sibling
        let target = self.ctx.unique_copy_target(destination, false)?;
        if target.as_path().starts_with(source.as_path()) {
            return Err(FsError::DirectoryCopyError {
                path: source.to_string(),
                reason: format!("destination {target} is inside the source"),
            });
        }

        copy_tree(
            self.ctx.fs.as_ref(),
            source.as_path(),
            target.as_path(),
            override_existing,
        )
        .map_err(|e| {
            tracing::warn!(source = %source, destination = %target, error = %e, "Directory copy failed");
            FsError::DirectoryCopyError {
                path: source.to_string(),
                reason: e.to_string(),
            }
        })?;

        tracing::debug!(source = %source, destination = %target, "Copied directory");
        Ok(target)
    }

    /// Move `source` to `destination`, merging into it when it exists.
    ///
    /// During a merge, files present on both sides are replaced only with
    /// `overwrite`. The source is removed only if nothing was left behind.
    /// The first failure aborts the merge and leaves the source in place.
    pub fn move_directory(
        &self,
        source: &FileSystemPathId,
        destination: &FileSystemPathId,
        overwrite: bool,
    ) -> Result<FileSystemPathId> {
        self.ctx.authorize(source, AccessMode::Delete, true)?;
        let destination_parent = self.ctx.parent_of(destination)?;
        self.ctx
            .authorize(&destination_parent, AccessMode::Write, true)?;

        let fs = self.ctx.fs.as_ref();
        if !fs.directory_exists(source.as_path()) {
            return Err(FsError::DirectoryNotFound(source.to_string()));
        }
        if destination.as_path().starts_with(source.as_path()) {
            return Err(FsError::DirectoryMoveError {
                path: source.to_string(),
                reason: format!("destination {destination} is inside the source"),
            });
        }

        let move_error = |e: io::Error| {
            tracing::warn!(source = %source, destination = %destination, error = %e, "Directory move aborted");
            FsError::DirectoryMoveError {
                path: source.to_string(),
                reason: e.to_string(),
            }
        };

        if !fs.directory_exists(destination.as_path()) {
            fs.move_directory(source.as_path(), destination.as_path())
                .map_err(move_error)?;
            tracing::debug!(source = %source, destination = %destination, "Moved directory");
            return Ok(destination.clone());
        }

        merge_tree(fs, source.as_path(), destination.as_path(), overwrite).map_err(move_error)?;
        if is_empty(fs, source.as_path()).map_err(move_error)? {
            fs.delete_directory(source.as_path(), false)
                .map_err(move_error)?;
            tracing::debug!(source = %source, destination = %destination, "Merged directory");
        } else {
            tracing::debug!(
                source = %source,
                destination = %destination,
                "Merged directory, source kept with skipped entries"
            );
        }
        Ok(destination.clone())
    }

    /// Rename `path` to `new_name` within its parent.
    ///
    /// Does not check whether the new name is taken; the OS move fails if it
    /// is.
    pub fn rename_directory(
        &self,
        path: &FileSystemPathId,
        new_name: &str,
    ) -> Result<FileSystemPathId> {
        let parent = self.ctx.parent_of(path)?;
        self.ctx.authorize(&parent, AccessMode::Write, true)?;
        self.ctx.authorize(path, AccessMode::Execute, true)?;

        let target = self.ctx.strategy.combine_directory_path(&parent, new_name)?;
        self.ctx
            .fs
            .move_directory(path.as_path(), target.as_path())
            .map_err(|e| match e.kind() {
                io::ErrorKind::NotFound => FsError::DirectoryNotFound(path.to_string()),
                io::ErrorKind::AlreadyExists => FsError::DirectoryAlreadyExists(target.to_string()),
                io::ErrorKind::PermissionDenied => FsError::unauthorized(path.as_str(), AccessMode::Write),
                _ => FsError::DirectoryMoveError {
                    path: path.to_string(),
                    reason: e.to_string(),
                },
            })?;

        tracing::debug!(path = %path, new_path = %target, "Renamed directory");
        Ok(target)
    }

    /// Delete `path` and everything below it.
    pub fn delete_directory(&self, path: &FileSystemPathId) -> Result<()> {
        self.ctx.authorize(path, AccessMode::Delete, true)?;
        self.ctx
            .fs
            .delete_directory(path.as_path(), true)
            .map_err(|e| translate(&e, path, Entity::Directory, AccessMode::Delete))?;
        tracing::debug!(path = %path, "Deleted directory");
        Ok(())
    }
}

/// Visibility for listings. Unreadable attributes count as visible.
pub(crate) fn is_visible(fs: &dyn FileSystem, path: &Path) -> bool {
    match fs.is_hidden(path) {
        Ok(hidden) => !hidden,
        Err(e) => {
            tracing::debug!(path = %path.display(), error = %e, "Cannot read attributes, treating as visible");
            true
        }
    }
}

fn entry_name(path: &Path) -> io::Result<&std::ffi::OsStr> {
    path.file_name().ok_or_else(|| {
        io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("entry has no name: {}", path.display()),
        )
    })
}

fn is_empty(fs: &dyn FileSystem, path: &Path) -> io::Result<bool> {
    Ok(fs.list_files(path)?.is_empty() && fs.list_directories(path)?.is_empty())
}

/// Recreate `from` at `to`, files first, then subdirectories.
fn copy_tree(fs: &dyn FileSystem, from: &Path, to: &Path, overwrite: bool) -> io::Result<()> {
    fs.create_directory(to)?;

    for file in fs.list_files(from)? {
        fs.copy_file(&file, &to.join(entry_name(&file)?), overwrite)?;
    }
    for dir in fs.list_directories(from)? {
        if fs.is_symlink(&dir) {
            tracing::warn!(path = %dir.display(), "Skipping linked directory during copy");
            continue;
        }
        copy_tree(fs, &dir, &to.join(entry_name(&dir)?), overwrite)?;
    }
    Ok(())
}

/// Move the contents of `from` into the existing directory `to`.
fn merge_tree(fs: &dyn FileSystem, from: &Path, to: &Path, overwrite: bool) -> io::Result<()> {
    for file in fs.list_files(from)? {
        let target = to.join(entry_name(&file)?);
        if fs.file_exists(&target) {
            if !overwrite {
                tracing::trace!(path = %file.display(), "Merge skipped existing file");
                continue;
            }
            fs.delete_file(&target)?;
        }
        fs.move_file(&file, &target)?;
    }

    for dir in fs.list_directories(from)? {
        let target = to.join(entry_name(&dir)?);
        if fs.directory_exists(&target) {
            if fs.is_symlink(&dir) {
                // Left in the source, which is then kept
                tracing::warn!(path = %dir.display(), "Not merging through linked directory");
                continue;
            }
            merge_tree(fs, &dir, &target, overwrite)?;
            if is_empty(fs, &dir)? {
                fs.delete_directory(&dir, false)?;
            }
        } else {
            fs.move_directory(&dir, &target)?;
        }
    }
    Ok(())
}

//! File provider: listing, metadata, content reads and the copy, move,
//! rename and delete operations for single files.

use std::io;
use std::sync::Arc;
use std::time::SystemTime;

use model::{AccessMode, FileSystemPathId, FsError, Result};
use tokio_util::sync::CancellationToken;

use super::directory::is_visible;
use super::{translate, Entity, ProviderContext};
use crate::fs::FileSystem;
use crate::permissions::PermissionsService;
use crate::platform::PathStrategy;

/// Permission-gated file operations.
#[derive(Debug, Clone)]
pub struct FileProvider {
    ctx: ProviderContext,
}

impl FileProvider {
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

    /// Files directly inside `directory`, sorted by full path.
    ///
    /// Same hidden-entry rules as directory listings.
    pub fn get_file_paths(
        &self,
        directory: &FileSystemPathId,
        include_hidden: bool,
    ) -> Result<Vec<FileSystemPathId>> {
        self.ctx
            .authorize(directory, AccessMode::ListDirectory, true)?;

        let children = self
            .ctx
            .fs
            .list_files(directory.as_path())
            .map_err(|e| translate(&e, directory, Entity::Directory, AccessMode::ListDirectory))?;

        let mut ids: Vec<FileSystemPathId> = children
            .iter()
            .filter(|child| include_hidden || is_visible(self.ctx.fs.as_ref(), child))
            .filter_map(|child| self.ctx.child_id(child, false))
            .collect();
        ids.sort_by(|a, b| a.as_str().cmp(b.as_str()));
        Ok(ids)
    }

    /// Whether a regular file exists at `path`.
    pub fn file_exists(&self, path: &FileSystemPathId) -> bool {
        self.ctx.fs.file_exists(path.as_path())
    }

    /// Display name of the file, extension included.
    pub fn get_file_name(&self, path: &FileSystemPathId) -> Result<String> {
        self.ctx.authorize(path, AccessMode::ReadProperties, false)?;
        Ok(self.ctx.strategy.file_name(path))
    }

    /// Creation time, `None` when the platform records none.
    pub fn get_creation_time(&self, path: &FileSystemPathId) -> Result<Option<SystemTime>> {
        self.ctx.authorize(path, AccessMode::ReadProperties, false)?;
        self.ctx
            .fs
            .creation_time(path.as_path())
            .map_err(|e| translate(&e, path, Entity::File, AccessMode::ReadProperties))
    }

    /// Last write time.
    pub fn get_last_write_time(&self, path: &FileSystemPathId) -> Result<SystemTime> {
        self.ctx.authorize(path, AccessMode::ReadProperties, false)?;
        self.ctx
            .fs
            .last_write_time(path.as_path())
            .map_err(|e| translate(&e, path, Entity::File, AccessMode::ReadProperties))
    }

    /// Size in bytes.
    pub fn get_size(&self, path: &FileSystemPathId) -> Result<u64> {
        self.ctx.authorize(path, AccessMode::ReadProperties, false)?;
        self.ctx
            .fs
            .file_size(path.as_path())
            .map_err(|e| translate(&e, path, Entity::File, AccessMode::ReadProperties))
    }

    /// Whole file contents.
    pub fn get_file(&self, path: &FileSystemPathId) -> Result<Vec<u8>> {
        self.ctx.authorize(path, AccessMode::ReadContents, false)?;
        self.read_all(path)
    }

    /// Up to `len` leading bytes of the file.
    pub fn read_header(&self, path: &FileSystemPathId, len: usize) -> Result<Vec<u8>> {
        self.ctx.authorize(path, AccessMode::ReadContents, false)?;
        self.read_prefix(path, len)
    }

    /// [`Self::get_file`] on the blocking pool, abandoned if `cancel` fires.
    pub async fn get_file_async(
        &self,
        path: &FileSystemPathId,
        cancel: &CancellationToken,
    ) -> Result<Vec<u8>> {
        self.ctx.authorize(path, AccessMode::ReadContents, false)?;
        let this = self.clone();
        let id = path.clone();
        run_blocking(path, cancel, move || this.read_all(&id)).await
    }

    /// [`Self::read_header`] on the blocking pool, abandoned if `cancel` fires.
    pub async fn read_header_async(
        &self,
        path: &FileSystemPathId,
        len: usize,
        cancel: &CancellationToken,
    ) -> Result<Vec<u8>> {
        self.ctx.authorize(path, AccessMode::ReadContents, false)?;
        let this = self.clone();
        let id = path.clone();
        run_blocking(path, cancel, move || this.read_prefix(&id, len)).await
    }

    /// Copy `source` to `destination`.
    ///
    /// When `destination` is taken the copy is written to the first free
    /// `"<stem> - Copy (N).<ext>"` sibling. Returns the id actually used.
    pub fn copy_file(
        &self,
        source: &FileSystemPathId,
        destination: &FileSystemPathId,
        overwrite: bool,
    ) -> Result<FileSystemPathId> {
        self.ctx.authorize(source, AccessMode::ReadContents, false)?;
        let destination_parent = self.ctx.parent_of(destination)?;
        self.ctx
            .authorize(&destination_parent, AccessMode::Write, true)?;

        if !self.ctx.fs.file_exists(source.as_path()) {
            return Err(FsError::FileNotFound(source.to_string()));
        }

        let target = if overwrite && source != destination {
            destination.clone()
        } else {
            self.ctx.unique_copy_target(destination, true)?
        };
        self.ctx
            .fs
            .copy_file(source.as_path(), target.as_path(), overwrite)
            .map_err(|e| {
                // A denial here can come from either side of the copy
                tracing::warn!(source = %source, destination = %target, error = %e, "File copy failed");
                FsError::FileCopyError {
                    path: source.to_string(),
                    reason: e.to_string(),
                }
            })?;

        tracing::debug!(source = %source, destination = %target, "Copied file");
        Ok(target)
    }

    /// Move `source` to `destination`, replacing an existing file only with
    /// `overwrite`.
    pub fn move_file(
        &self,
        source: &FileSystemPathId,
        destination: &FileSystemPathId,
        overwrite: bool,
    ) -> Result<FileSystemPathId> {
        self.ctx.authorize(source, AccessMode::Delete, false)?;
        let destination_parent = self.ctx.parent_of(destination)?;
        self.ctx
            .authorize(&destination_parent, AccessMode::Write, true)?;

        let fs = self.ctx.fs.as_ref();
        if !fs.file_exists(source.as_path()) {
            return Err(FsError::FileNotFound(source.to_string()));
        }
        if source == destination {
            return Ok(destination.clone());
        }

        let move_error = |e: io::Error| FsError::FileMoveError {
            path: source.to_string(),
            reason: e.to_string(),
        };

        if fs.file_exists(destination.as_path()) {
            if !overwrite {
                return Err(FsError::FileAlreadyExists(destination.to_string()));
            }
            fs.delete_file(destination.as_path()).map_err(move_error)?;
            tracing::debug!(path = %destination, "Replacing existing file");
        }

        fs.move_file(source.as_path(), destination.as_path())
            .map_err(|e| match e.kind() {
                io::ErrorKind::AlreadyExists => FsError::FileAlreadyExists(destination.to_string()),
                _ => move_error(e),
            })?;

        tracing::debug!(source = %source, destination = %destination, "Moved file");
        Ok(destination.clone())
    }

    /// Rename `path` to `new_name` within its directory.
    ///
    /// Does not check whether the new name is taken; the OS move fails if it
    /// is.
    pub fn rename_file(&self, path: &FileSystemPathId, new_name: &str) -> Result<FileSystemPathId> {
        let parent = self.ctx.parent_of(path)?;
        self.ctx.authorize(&parent, AccessMode::Write, true)?;
        self.ctx.authorize(path, AccessMode::Write, false)?;

        let target = self.ctx.strategy.combine_path(&parent, new_name)?;
        self.ctx
            .fs
            .move_file(path.as_path(), target.as_path())
            .map_err(|e| match e.kind() {
                io::ErrorKind::NotFound => FsError::FileNotFound(path.to_string()),
                io::ErrorKind::AlreadyExists => FsError::FileAlreadyExists(target.to_string()),
                io::ErrorKind::PermissionDenied => FsError::unauthorized(path.as_str(), AccessMode::Write),
                _ => FsError::FileMoveError {
                    path: path.to_string(),
                    reason: e.to_string(),
                },
            })?;

        tracing::debug!(path = %path, new_path = %target, "Renamed file");
        Ok(target)
    }

    /// Delete the file at `path`.
    pub fn delete_file(&self, path: &FileSystemPathId) -> Result<()> {
        self.ctx.authorize(path, AccessMode::Delete, false)?;
        self.ctx
            .fs
            .delete_file(path.as_path())
            .map_err(|e| translate(&e, path, Entity::File, AccessMode::Delete))?;
        tracing::debug!(path = %path, "Deleted file");
        Ok(())
    }

    fn read_all(&self, path: &FileSystemPathId) -> Result<Vec<u8>> {
        self.ctx
            .fs
            .read_file(path.as_path())
            .map_err(|e| translate(&e, path, Entity::File, AccessMode::ReadContents))
    }

    fn read_prefix(&self, path: &FileSystemPathId, len: usize) -> Result<Vec<u8>> {
        self.ctx
            .fs
            .read_prefix(path.as_path(), len)
            .map_err(|e| translate(&e, path, Entity::File, AccessMode::ReadContents))
    }
}

/// Run `work` on the blocking pool, returning `Cancelled` as soon as the
/// token fires. The blocking call itself runs to completion and its result
/// is dropped.
pub(crate) async fn run_blocking<T, F>(
    path: &FileSystemPathId,
    cancel: &CancellationToken,
    work: F,
) -> Result<T>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T> + Send + 'static,
{
    if cancel.is_cancelled() {
        return Err(FsError::Cancelled);
    }

    let task = tokio::task::spawn_blocking(work);
    tokio::select! {
        _ = cancel.cancelled() => {
            tracing::debug!(path = %path, "Blocking read cancelled");
            Err(FsError::Cancelled)
        }
        joined = task => joined.map_err(|e| FsError::Io {
            path: path.to_string(),
            message: format!("blocking task failed: {e}"),
        })?,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::MemoryFileSystem;
    use crate::providers::test_support::{self, Deny};

    fn provider(fs: &Arc<MemoryFileSystem>) -> FileProvider {
        FileProvider::from_context(test_support::allow_all(fs))
    }

    fn denying(fs: &Arc<MemoryFileSystem>, path: &str, mode: AccessMode) -> FileProvider {
        FileProvider::from_context(test_support::context(fs, Arc::new(Deny::new(path, mode))))
    }

    fn id(raw: &str) -> FileSystemPathId {
        FileSystemPathId::new(raw).unwrap()
    }

    #[test]
    fn test_get_file_paths() {
        let fs = Arc::new(MemoryFileSystem::new());
        fs.add_file("/d/b.txt", "")
            .add_file("/d/a.txt", "")
            .add_file("/d/.secret", "")
            .set_hidden("/d/.secret", true)
            .add_file("/d/odd.bin", "")
            .set_hidden("/d/odd.bin", true)
            .fail_attributes("/d/odd.bin")
            .add_directory("/d/sub");
        let provider = provider(&fs);

        let visible = provider.get_file_paths(&id("/d/"), false).unwrap();
        assert_eq!(
            visible.iter().map(|p| p.as_str()).collect::<Vec<_>>(),
            vec!["/d/a.txt", "/d/b.txt", "/d/odd.bin"]
        );
        assert_eq!(provider.get_file_paths(&id("/d/"), true).unwrap().len(), 4);
    }

    #[test]
    fn test_metadata() {
        let fs = Arc::new(MemoryFileSystem::new());
        fs.add_file("/d/photo.JPG", vec![0u8; 42]);
        let provider = provider(&fs);

        let photo = id("/d/photo.JPG");
        assert_eq!(provider.get_file_name(&photo).unwrap(), "photo.JPG");
        assert_eq!(provider.get_size(&photo).unwrap(), 42);
        assert!(provider.get_creation_time(&photo).unwrap().is_some());
        assert_eq!(
            provider.get_size(&id("/d/none.txt")).unwrap_err(),
            FsError::FileNotFound("/d/none.txt".to_string())
        );

        fs.fail_metadata("/d/photo.JPG");
        assert!(provider.get_last_write_time(&photo).unwrap_err().is_unauthorized());
    }

    #[test]
    fn test_read_header_denied_issues_no_calls() {
        let fs = Arc::new(MemoryFileSystem::new());
        fs.add_file("/d/a.bin", "0123456789");
        let provider = denying(&fs, "/d/a.bin", AccessMode::ReadContents);
        fs.reset_call_count();

        assert!(provider.read_header(&id("/d/a.bin"), 4).unwrap_err().is_unauthorized());
        assert!(provider.get_file(&id("/d/a.bin")).unwrap_err().is_unauthorized());
        assert_eq!(fs.call_count(), 0);
    }

    #[test]
    fn test_copy_file_collisions() {
        let fs = Arc::new(MemoryFileSystem::new());
        fs.add_file("/src/report.pdf", "pdf").add_file("/dst/report.pdf", "old");
        let provider = provider(&fs);

        let first = provider
            .copy_file(&id("/src/report.pdf"), &id("/dst/report.pdf"), false)
            .unwrap();
        assert_eq!(first.as_str(), "/dst/report - Copy (1).pdf");

        let second = provider
            .copy_file(&id("/src/report.pdf"), &id("/dst/report.pdf"), false)
            .unwrap();
        assert_eq!(second.as_str(), "/dst/report - Copy (2).pdf");
        assert_eq!(fs.contents("/dst/report.pdf").unwrap(), b"old");
        assert_eq!(fs.contents("/dst/report - Copy (2).pdf").unwrap(), b"pdf");

        let replaced = provider
            .copy_file(&id("/src/report.pdf"), &id("/dst/report.pdf"), true)
            .unwrap();
        assert_eq!(replaced.as_str(), "/dst/report.pdf");
        assert_eq!(fs.contents("/dst/report.pdf").unwrap(), b"pdf");
        assert!(!fs.contains("/dst/report - Copy (3).pdf"));
    }

    #[test]
    fn test_copy_file_errors() {
        let fs = Arc::new(MemoryFileSystem::new());
        fs.add_file("/src/a.txt", "a").add_directory("/dst");
        let provider = provider(&fs);

        assert_eq!(
            provider
                .copy_file(&id("/src/missing.txt"), &id("/dst/a.txt"), false)
                .unwrap_err(),
            FsError::FileNotFound("/src/missing.txt".to_string())
        );

        fs.fail_operations("/src/a.txt");
        assert!(matches!(
            provider.copy_file(&id("/src/a.txt"), &id("/dst/a.txt"), false),
            Err(FsError::FileCopyError { .. })
        ));
    }

    #[test]
    fn test_copy_file_denied_destination() {
        let fs = Arc::new(MemoryFileSystem::new());
        fs.add_file("/src/a.txt", "a").add_directory("/dst");
        let provider = denying(&fs, "/dst/", AccessMode::Write);
        fs.reset_call_count();

        assert!(provider
            .copy_file(&id("/src/a.txt"), &id("/dst/a.txt"), false)
            .unwrap_err()
            .is_unauthorized());
        assert_eq!(fs.call_count(), 0);
    }

    #[test]
    fn test_move_file_overwrite() {
        let fs = Arc::new(MemoryFileSystem::new());
        fs.add_file("/src/a.txt", "new").add_file("/dst/a.txt", "old");
        let provider = provider(&fs);

        assert_eq!(
            provider
                .move_file(&id("/src/a.txt"), &id("/dst/a.txt"), false)
                .unwrap_err(),
            FsError::FileAlreadyExists("/dst/a.txt".to_string())
        );
        assert!(fs.contains("/src/a.txt"));

        provider
            .move_file(&id("/src/a.txt"), &id("/dst/a.txt"), true)
            .unwrap();
        assert!(!fs.contains("/src/a.txt"));
        assert_eq!(fs.contents("/dst/a.txt").unwrap(), b"new");
    }

    #[test]
    fn test_rename_file() {
        let fs = Arc::new(MemoryFileSystem::new());
        fs.add_file("/d/old.txt", "x").add_file("/d/taken.txt", "y");
        let provider = provider(&fs);

        let renamed = provider.rename_file(&id("/d/old.txt"), "new.txt").unwrap();
        assert_eq!(renamed.as_str(), "/d/new.txt");
        assert_eq!(
            provider.rename_file(&id("/d/new.txt"), "taken.txt").unwrap_err(),
            FsError::FileAlreadyExists("/d/taken.txt".to_string())
        );
        assert!(matches!(
            provider.rename_file(&id("/d/new.txt"), ""),
            Err(FsError::InvalidPath(_))
        ));
    }

    #[test]
    fn test_rename_file_requires_write_on_file() {
        let fs = Arc::new(MemoryFileSystem::new());
        fs.add_file("/d/old.txt", "x");
        let provider = denying(&fs, "/d/old.txt", AccessMode::Write);
        fs.reset_call_count();

        assert!(provider
            .rename_file(&id("/d/old.txt"), "new.txt")
            .unwrap_err()
            .is_unauthorized());
        assert_eq!(fs.call_count(), 0);
    }

    #[test]
    fn test_delete_file() {
        let fs = Arc::new(MemoryFileSystem::new());
        fs.add_file("/d/a.txt", "x");
        let provider = provider(&fs);

        provider.delete_file(&id("/d/a.txt")).unwrap();
        assert!(!fs.contains("/d/a.txt"));
        assert_eq!(
            provider.delete_file(&id("/d/a.txt")).unwrap_err(),
            FsError::FileNotFound("/d/a.txt".to_string())
        );
    }

    #[tokio::test]
    async fn test_get_file_async() {
        let fs = Arc::new(MemoryFileSystem::new());
        fs.add_file("/d/a.bin", "0123456789");
        let provider = provider(&fs);
        let token = CancellationToken::new();

        assert_eq!(
            provider.get_file_async(&id("/d/a.bin"), &token).await.unwrap(),
            b"0123456789"
        );
        assert_eq!(
            provider
                .read_header_async(&id("/d/a.bin"), 4, &token)
                .await
                .unwrap(),
            b"0123"
        );
    }

    #[tokio::test]
    async fn test_get_file_async_cancelled() {
        let fs = Arc::new(MemoryFileSystem::new());
        fs.add_file("/d/a.bin", "0123456789");
        let provider = provider(&fs);
        let token = CancellationToken::new();
        token.cancel();

        assert_eq!(
            provider.get_file_async(&id("/d/a.bin"), &token).await.unwrap_err(),
            FsError::Cancelled
        );
    }
}

//! Permission-gated access to the OS file system.
//!
//! Provider methods ask the [`PermissionsService`] first and only then touch
//! the [`FileSystem`]. A denial returns [`FsError::UnauthorizedAccess`]
//! without a single OS call. Raw [`io::Error`]s are translated here and never
//! escape this layer.

pub mod directory;
pub mod file;

use std::io;
use std::path::Path;
use std::sync::Arc;

use model::{AccessMode, FileSystemPathId, FsError, Result};

use crate::fs::FileSystem;
use crate::permissions::PermissionsService;
use crate::platform::PathStrategy;

pub use directory::DirectoryProvider;
pub use file::FileProvider;

/// Collaborators every provider needs.
#[derive(Debug, Clone)]
pub(crate) struct ProviderContext {
    pub(crate) fs: Arc<dyn FileSystem>,
    pub(crate) strategy: Arc<dyn PathStrategy>,
    pub(crate) permissions: Arc<dyn PermissionsService>,
}

impl ProviderContext {
    pub(crate) fn new(
        fs: Arc<dyn FileSystem>,
        strategy: Arc<dyn PathStrategy>,
        permissions: Arc<dyn PermissionsService>,
    ) -> Self {
        Self {
            fs,
            strategy,
            permissions,
        }
    }

    /// Fail with `UnauthorizedAccess` unless the oracle grants `mode`.
    pub(crate) fn authorize(
        &self,
        path: &FileSystemPathId,
        mode: AccessMode,
        is_directory: bool,
    ) -> Result<()> {
        if self.permissions.can_access_path(path, mode, is_directory) {
            Ok(())
        } else {
            tracing::debug!(path = %path, %mode, "Access denied");
            Err(FsError::unauthorized(path.as_str(), mode))
        }
    }

    /// Parent directory of `path`, or `InvalidPath` for a root.
    pub(crate) fn parent_of(&self, path: &FileSystemPathId) -> Result<FileSystemPathId> {
        self.strategy
            .parent(path)
            .ok_or_else(|| FsError::InvalidPath(format!("{path} has no parent directory")))
    }

    /// Whether anything, file or directory, exists at `path`.
    pub(crate) fn occupied(&self, path: &FileSystemPathId) -> bool {
        let p = path.as_path();
        self.fs.directory_exists(p) || self.fs.file_exists(p)
    }

    /// First free sibling of `target` named `"<name> - Copy (N)"`, N from 1.
    pub(crate) fn unique_copy_target(
        &self,
        target: &FileSystemPathId,
        keep_extension: bool,
    ) -> Result<FileSystemPathId> {
        if !self.occupied(target) {
            return Ok(target.clone());
        }

        let parent = self.parent_of(target)?;
        let name = self.strategy.file_name(target);
        for n in 1u32.. {
            let candidate_name = copy_name(&name, n, keep_extension);
            let candidate = if target.is_directory() {
                self.strategy.combine_directory_path(&parent, &candidate_name)?
            } else {
                self.strategy.combine_path(&parent, &candidate_name)?
            };
            if !self.occupied(&candidate) {
                tracing::debug!(original = %target, copy = %candidate, "Resolved copy name collision");
                return Ok(candidate);
            }
        }
        Err(FsError::Validation(format!("no free copy name for {target}")))
    }

    /// Turn a listed child path back into an id.
    pub(crate) fn child_id(&self, child: &Path, directory: bool) -> Option<FileSystemPathId> {
        let Some(raw) = child.to_str() else {
            tracing::warn!(path = %child.display(), "Skipping entry with non UTF-8 path");
            return None;
        };
        let id = if directory {
            self.strategy.directory_id(raw)
        } else {
            self.strategy.file_id(raw)
        };
        match id {
            Ok(id) => Some(id),
            Err(e) => {
                tracing::warn!(path = raw, error = %e, "Skipping entry with unusable path");
                None
            }
        }
    }
}

/// `"report - Copy (2).pdf"` from `"report.pdf"`. Dot files and directories
/// get the suffix at the end.
pub(crate) fn copy_name(name: &str, n: u32, keep_extension: bool) -> String {
    let split = if keep_extension {
        name.rfind('.').filter(|&i| i > 0)
    } else {
        None
    };
    match split {
        Some(i) => format!("{} - Copy ({n}){}", &name[..i], &name[i..]),
        None => format!("{name} - Copy ({n})"),
    }
}

/// Kind of entity an OS error was raised for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Entity {
    Directory,
    File,
}

/// Translate an OS error for a plain read or probe.
pub(crate) fn translate(
    err: &io::Error,
    path: &FileSystemPathId,
    entity: Entity,
    mode: AccessMode,
) -> FsError {
    match (err.kind(), entity) {
        (io::ErrorKind::NotFound, Entity::Directory) => FsError::DirectoryNotFound(path.to_string()),
        (io::ErrorKind::NotFound, Entity::File) => FsError::FileNotFound(path.to_string()),
        (io::ErrorKind::PermissionDenied, _) => FsError::unauthorized(path.as_str(), mode),
        (io::ErrorKind::AlreadyExists, Entity::Directory) => {
            FsError::DirectoryAlreadyExists(path.to_string())
        }
        (io::ErrorKind::AlreadyExists, Entity::File) => FsError::FileAlreadyExists(path.to_string()),
        _ => FsError::io(path.as_str(), err),
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use std::sync::Arc;

    use model::{AccessMode, FileSystemPathId};

    use super::ProviderContext;
    use crate::fs::{FileSystem, MemoryFileSystem};
    use crate::permissions::{AllowAll, PermissionsService};
    use crate::platform::{PathStrategy, UnixPathStrategy};

    /// Oracle denying one `(path, mode)` pair and granting everything else.
    #[derive(Debug)]
    pub(crate) struct Deny {
        pub(crate) path: String,
        pub(crate) mode: AccessMode,
    }

    impl Deny {
        pub(crate) fn new(path: &str, mode: AccessMode) -> Self {
            Self {
                path: path.to_string(),
                mode,
            }
        }
    }

    impl PermissionsService for Deny {
        fn can_access_path(&self, path: &FileSystemPathId, mode: AccessMode, _: bool) -> bool {
            !(path.as_str() == self.path && mode == self.mode)
        }
    }

    pub(crate) fn context(
        fs: &Arc<MemoryFileSystem>,
        permissions: Arc<dyn PermissionsService>,
    ) -> ProviderContext {
        let os: Arc<dyn FileSystem> = fs.clone();
        let strategy: Arc<dyn PathStrategy> = Arc::new(UnixPathStrategy::new(Arc::clone(&os)));
        ProviderContext::new(os, strategy, permissions)
    }

    pub(crate) fn allow_all(fs: &Arc<MemoryFileSystem>) -> ProviderContext {
        context(fs, Arc::new(AllowAll))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::MemoryFileSystem;

    #[test]
    fn test_copy_name() {
        assert_eq!(copy_name("report.pdf", 1, true), "report - Copy (1).pdf");
        assert_eq!(copy_name("archive.tar.gz", 2, true), "archive.tar - Copy (2).gz");
        assert_eq!(copy_name(".bashrc", 1, true), ".bashrc - Copy (1)");
        assert_eq!(copy_name("Makefile", 3, true), "Makefile - Copy (3)");
        assert_eq!(copy_name("photos.2024", 1, false), "photos.2024 - Copy (1)");
    }

    #[test]
    fn test_translate() {
        let id = FileSystemPathId::new("/x/").unwrap();
        let not_found = io::Error::from(io::ErrorKind::NotFound);
        assert_eq!(
            translate(&not_found, &id, Entity::Directory, AccessMode::ListDirectory),
            FsError::DirectoryNotFound("/x/".to_string())
        );
        let denied = io::Error::from(io::ErrorKind::PermissionDenied);
        assert!(translate(&denied, &id, Entity::File, AccessMode::Write).is_unauthorized());
        let other = io::Error::other("disk on fire");
        assert!(matches!(
            translate(&other, &id, Entity::File, AccessMode::Write),
            FsError::Io { .. }
        ));
    }

    #[test]
    fn test_unique_copy_target_increments() {
        let fs = Arc::new(MemoryFileSystem::new());
        fs.add_file("/d/a.txt", "")
            .add_file("/d/a - Copy (1).txt", "")
            .add_directory("/d/sub");
        let ctx = test_support::allow_all(&fs);

        let file = ctx.strategy.file_id("/d/a.txt").unwrap();
        assert_eq!(
            ctx.unique_copy_target(&file, true).unwrap().as_str(),
            "/d/a - Copy (2).txt"
        );

        let dir = ctx.strategy.directory_id("/d/sub").unwrap();
        assert_eq!(
            ctx.unique_copy_target(&dir, false).unwrap().as_str(),
            "/d/sub - Copy (1)/"
        );

        let free = ctx.strategy.file_id("/d/b.txt").unwrap();
        assert_eq!(ctx.unique_copy_target(&free, true).unwrap(), free);
    }
}

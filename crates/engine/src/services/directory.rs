//! Directory domain service.

use std::sync::Arc;

use model::{Directory, DirectoryDetails, FileSystemPathId, FsError, Metadata, Result};

use super::{recover, PathInput};
use crate::platform::PathStrategy;
use crate::providers::DirectoryProvider;

/// Directory operations returning hydrated [`Directory`] entities.
#[derive(Debug, Clone)]
pub struct DirectoryService {
    provider: DirectoryProvider,
    strategy: Arc<dyn PathStrategy>,
}

impl DirectoryService {
    /// Create a service over `provider`.
    pub fn new(provider: DirectoryProvider, strategy: Arc<dyn PathStrategy>) -> Self {
        Self { provider, strategy }
    }

    /// The underlying provider.
    pub fn provider(&self) -> &DirectoryProvider {
        &self.provider
    }

    /// The directory at `path`.
    pub fn get_directory(&self, path: impl PathInput) -> Result<Directory> {
        let id = path.to_directory_id(self.strategy.as_ref())?;
        if !self.provider.directory_exists(&id) {
            return Err(FsError::DirectoryNotFound(id.into_string()));
        }
        Ok(self.hydrate(id))
    }

    /// Subdirectories of `path`, sorted by full path.
    pub fn get_subdirectories(
        &self,
        path: impl PathInput,
        include_hidden: bool,
    ) -> Result<Vec<Directory>> {
        let id = path.to_directory_id(self.strategy.as_ref())?;
        let children = self.provider.get_subdirectory_paths(&id, include_hidden)?;
        Ok(children.into_iter().map(|child| self.hydrate(child)).collect())
    }

    /// Whether a directory exists at `path`. Invalid paths do not exist.
    pub fn directory_exists(&self, path: impl PathInput) -> bool {
        path.to_directory_id(self.strategy.as_ref())
            .map(|id| self.provider.directory_exists(&id))
            .unwrap_or(false)
    }

    /// Create `name` inside `parent`.
    ///
    /// Fails with `DirectoryAlreadyExists` when the name is taken.
    pub fn create_directory(&self, parent: impl PathInput, name: &str) -> Result<Directory> {
        let parent = parent.to_directory_id(self.strategy.as_ref())?;
        let target = self.strategy.combine_directory_path(&parent, name)?;
        if self.provider.directory_exists(&target) {
            return Err(FsError::DirectoryAlreadyExists(target.into_string()));
        }

        let created = self.provider.create_directory(&parent, name)?;
        Ok(self.hydrate(created))
    }

    /// Copy `source` to `destination`, picking a `" - Copy (N)"` name on
    /// collision.
    pub fn copy_directory(
        &self,
        source: impl PathInput,
        destination: impl PathInput,
        override_existing: bool,
    ) -> Result<Directory> {
        let source = source.to_directory_id(self.strategy.as_ref())?;
        let destination = destination.to_directory_id(self.strategy.as_ref())?;
        let copied = self
            .provider
            .copy_directory(&source, &destination, override_existing)?;
        Ok(self.hydrate(copied))
    }

    /// Move `source` to `destination`, merging when it exists.
    pub fn move_directory(
        &self,
        source: impl PathInput,
        destination: impl PathInput,
        overwrite: bool,
    ) -> Result<Directory> {
        let source = source.to_directory_id(self.strategy.as_ref())?;
        let destination = destination.to_directory_id(self.strategy.as_ref())?;
        let moved = self
            .provider
            .move_directory(&source, &destination, overwrite)?;
        Ok(self.hydrate(moved))
    }

    /// Rename `path` within its parent.
    ///
    /// Fails with `DirectoryAlreadyExists` when the new name is taken.
    pub fn rename_directory(&self, path: impl PathInput, new_name: &str) -> Result<Directory> {
        let id = path.to_directory_id(self.strategy.as_ref())?;
        let parent = self
            .strategy
            .parent(&id)
            .ok_or_else(|| FsError::InvalidPath(format!("{id} has no parent directory")))?;
        let target = self.strategy.combine_directory_path(&parent, new_name)?;
        if self.provider.directory_exists(&target) {
            return Err(FsError::DirectoryAlreadyExists(target.into_string()));
        }

        let renamed = self.provider.rename_directory(&id, new_name)?;
        Ok(self.hydrate(renamed))
    }

    /// Delete `path` recursively.
    pub fn delete_directory(&self, path: impl PathInput) -> Result<()> {
        let id = path.to_directory_id(self.strategy.as_ref())?;
        self.provider.delete_directory(&id)
    }

    /// Build an entity for `id`. Never fails; unreadable metadata yields an
    /// `Inaccessible` entity.
    pub fn hydrate(&self, id: FileSystemPathId) -> Directory {
        let name = recover(&id, "name", self.provider.get_directory_name(&id));
        let modified = recover(&id, "last_write_time", self.provider.get_last_write_time(&id));
        let created = recover(&id, "creation_time", self.provider.get_creation_time(&id));

        match (name, modified, created) {
            (Some(name), Some(modified), Some(created)) => Directory {
                id,
                name,
                metadata: Metadata::Accessible(DirectoryDetails {
                    date_created: created,
                    date_modified: Some(modified),
                }),
            },
            (name, _, _) => Directory {
                name: name.unwrap_or_else(|| self.strategy.file_name(&id)),
                id,
                metadata: Metadata::Inaccessible,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::MemoryFileSystem;
    use crate::providers::test_support::{self, Deny};
    use model::{AccessMode, Status};

    fn service(fs: &Arc<MemoryFileSystem>) -> DirectoryService {
        let ctx = test_support::allow_all(fs);
        let strategy = Arc::clone(&ctx.strategy);
        DirectoryService::new(DirectoryProvider::from_context(ctx), strategy)
    }

    fn denying(fs: &Arc<MemoryFileSystem>, path: &str, mode: AccessMode) -> DirectoryService {
        let ctx = test_support::context(fs, Arc::new(Deny::new(path, mode)));
        let strategy = Arc::clone(&ctx.strategy);
        DirectoryService::new(DirectoryProvider::from_context(ctx), strategy)
    }

    #[test]
    fn test_get_directory() {
        let fs = Arc::new(MemoryFileSystem::new());
        fs.add_directory("/data/docs");
        let service = service(&fs);

        let docs = service.get_directory("/data/docs").unwrap();
        assert_eq!(docs.id.as_str(), "/data/docs/");
        assert_eq!(docs.name, "docs");
        assert_eq!(docs.status(), Status::Accessible);
        assert!(docs.date_modified().is_some());

        assert_eq!(
            service.get_directory("/data/none").unwrap_err(),
            FsError::DirectoryNotFound("/data/none/".to_string())
        );
        assert!(matches!(service.get_directory(""), Err(FsError::InvalidPath(_))));
    }

    #[test]
    fn test_missing_creation_time_is_still_accessible() {
        let fs = Arc::new(MemoryFileSystem::new());
        fs.add_directory("/data/docs").clear_creation_time("/data/docs");
        let docs = service(&fs).get_directory("/data/docs/").unwrap();

        assert_eq!(docs.status(), Status::Accessible);
        assert_eq!(docs.date_created(), None);
        assert!(docs.date_modified().is_some());
    }

    #[test]
    fn test_unreadable_metadata_yields_inaccessible() {
        let fs = Arc::new(MemoryFileSystem::new());
        fs.add_directory("/data/open")
            .add_directory("/data/locked")
            .fail_metadata("/data/locked");
        let dirs = service(&fs).get_subdirectories("/data", false).unwrap();

        assert_eq!(dirs.len(), 2);
        let locked = &dirs[0];
        assert_eq!(locked.id.as_str(), "/data/locked/");
        assert_eq!(locked.name, "locked");
        assert_eq!(locked.status(), Status::Inaccessible);
        assert_eq!(locked.date_modified(), None);
        assert_eq!(dirs[1].status(), Status::Accessible);
    }

    #[test]
    fn test_denied_properties_yield_inaccessible() {
        let fs = Arc::new(MemoryFileSystem::new());
        fs.add_directory("/data/secret");
        let service = denying(&fs, "/data/secret/", AccessMode::ReadProperties);

        let secret = service.get_directory("/data/secret").unwrap();
        assert_eq!(secret.status(), Status::Inaccessible);
        assert_eq!(secret.name, "secret");
    }

    #[test]
    fn test_create_directory() {
        let fs = Arc::new(MemoryFileSystem::new());
        fs.add_directory("/data/existing");
        let service = service(&fs);

        let created = service.create_directory("/data", "fresh").unwrap();
        assert_eq!(created.id.as_str(), "/data/fresh/");
        assert_eq!(created.status(), Status::Accessible);

        assert_eq!(
            service.create_directory("/data", "existing").unwrap_err(),
            FsError::DirectoryAlreadyExists("/data/existing/".to_string())
        );
    }

    #[test]
    fn test_rename_directory_collision() {
        let fs = Arc::new(MemoryFileSystem::new());
        fs.add_directory("/data/a").add_directory("/data/b");
        let service = service(&fs);

        assert_eq!(
            service.rename_directory("/data/a", "b").unwrap_err(),
            FsError::DirectoryAlreadyExists("/data/b/".to_string())
        );
        let renamed = service.rename_directory("/data/a", "c").unwrap();
        assert_eq!(renamed.name, "c");
        assert!(!service.directory_exists("/data/a"));
        assert!(service.directory_exists("/data/c/"));
    }

    #[test]
    fn test_copy_move_delete() {
        let fs = Arc::new(MemoryFileSystem::new());
        fs.add_file("/src/a.txt", "a").add_directory("/dst");
        let service = service(&fs);

        let copy = service.copy_directory("/src", "/dst/src", false).unwrap();
        assert_eq!(copy.id.as_str(), "/dst/src/");
        let again = service.copy_directory("/src", "/dst/src", false).unwrap();
        assert_eq!(again.name, "src - Copy (1)");

        let moved = service.move_directory("/src", "/dst/moved", false).unwrap();
        assert_eq!(moved.id.as_str(), "/dst/moved/");
        assert!(!service.directory_exists("/src"));

        service.delete_directory("/dst/moved").unwrap();
        assert!(!fs.contains("/dst/moved"));
    }
}

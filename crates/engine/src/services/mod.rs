//! Domain services.
//!
//! Services accept either a raw path string or a [`FileSystemPathId`],
//! validate it up front, delegate to a provider and hydrate the result into
//! a [`model::Directory`] or [`model::File`]. Metadata failures during
//! hydration never fail the call; the entity comes back
//! [`model::Status::Inaccessible`] instead.

pub mod directory;
pub mod drive;
pub mod file;
pub mod path;

use model::{FileSystemPathId, FsError, Result};

use crate::platform::PathStrategy;

pub use directory::DirectoryService;
pub use drive::DriveService;
pub use file::FileService;
pub use path::PathService;

/// Anything a service can turn into a normalized id.
pub trait PathInput {
    /// The raw path text.
    fn raw_path(&self) -> &str;

    /// Normalize as a directory id.
    fn to_directory_id(&self, strategy: &dyn PathStrategy) -> Result<FileSystemPathId> {
        strategy.directory_id(non_blank(self.raw_path())?)
    }

    /// Normalize as a file id.
    fn to_file_id(&self, strategy: &dyn PathStrategy) -> Result<FileSystemPathId> {
        strategy.file_id(non_blank(self.raw_path())?)
    }
}

fn non_blank(raw: &str) -> Result<&str> {
    if raw.trim().is_empty() {
        return Err(FsError::InvalidPath("path is empty".to_string()));
    }
    Ok(raw)
}

impl PathInput for str {
    fn raw_path(&self) -> &str {
        self
    }
}

impl PathInput for String {
    fn raw_path(&self) -> &str {
        self.as_str()
    }
}

impl PathInput for FileSystemPathId {
    fn raw_path(&self) -> &str {
        self.as_str()
    }
}

impl<T: PathInput + ?Sized> PathInput for &T {
    fn raw_path(&self) -> &str {
        (**self).raw_path()
    }
}

/// Log a metadata sub-call failure and turn it into `None`.
pub(crate) fn recover<T>(path: &FileSystemPathId, what: &str, result: Result<T>) -> Option<T> {
    match result {
        Ok(value) => Some(value),
        Err(e) => {
            tracing::debug!(path = %path, property = what, error = %e, "Metadata unavailable");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::fs::MemoryFileSystem;
    use crate::platform::UnixPathStrategy;

    #[test]
    fn test_path_input_variants() {
        let strategy = UnixPathStrategy::new(Arc::new(MemoryFileSystem::new()));
        let id = FileSystemPathId::new("/a/b").unwrap();

        assert_eq!("/a/b".to_directory_id(&strategy).unwrap().as_str(), "/a/b/");
        assert_eq!(String::from("/a/b/").to_file_id(&strategy).unwrap().as_str(), "/a/b");
        assert_eq!(id.to_directory_id(&strategy).unwrap().as_str(), "/a/b/");
        assert_eq!((&id).to_file_id(&strategy).unwrap(), id);
    }

    #[test]
    fn test_blank_input_is_invalid() {
        let strategy = UnixPathStrategy::new(Arc::new(MemoryFileSystem::new()));
        assert!(matches!("   ".to_directory_id(&strategy), Err(FsError::InvalidPath(_))));
        assert!(matches!("".to_file_id(&strategy), Err(FsError::InvalidPath(_))));
    }
}

//! OS file-system abstraction.
//!
//! Provider services never call `std::fs` directly; they go through a
//! [`FileSystem`] so the OS can be substituted in tests and embedders.
//! Implementations report raw [`io::Error`]s. Translation into the engine's
//! error taxonomy happens in the provider layer.

pub mod local;
pub mod memory;

use std::fmt;
use std::io;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use model::DriveInfo;

pub use local::LocalFileSystem;
pub use memory::MemoryFileSystem;

/// Raw, synchronous file-system operations.
///
/// Implementations must be thread-safe. No method performs permission
/// checks; that is the provider layer's job.
pub trait FileSystem: Send + Sync + fmt::Debug {
    /// Full paths of the subdirectories of `path`, in no particular order.
    fn list_directories(&self, path: &Path) -> io::Result<Vec<PathBuf>>;

    /// Full paths of the files directly inside `path`, in no particular order.
    fn list_files(&self, path: &Path) -> io::Result<Vec<PathBuf>>;

    /// Whether the entry carries the platform's hidden attribute.
    fn is_hidden(&self, path: &Path) -> io::Result<bool>;

    /// Whether `path` exists and is a directory.
    fn directory_exists(&self, path: &Path) -> bool;

    /// Whether `path` exists and is a regular file.
    fn file_exists(&self, path: &Path) -> bool;

    /// Whether `path` is itself a symbolic link. Tree walks never descend
    /// through one.
    fn is_symlink(&self, path: &Path) -> bool {
        let _ = path;
        false
    }

    /// Creates a single directory. The parent must exist.
    fn create_directory(&self, path: &Path) -> io::Result<()>;

    /// Removes a directory, and everything in it when `recursive`.
    fn delete_directory(&self, path: &Path, recursive: bool) -> io::Result<()>;

    /// Moves a directory to a path that does not exist yet.
    fn move_directory(&self, from: &Path, to: &Path) -> io::Result<()>;

    /// Copies a file, preserving its attributes.
    ///
    /// A failed copy leaves nothing at `to`. Fails with [`io::ErrorKind::AlreadyExists`] if `to` exists and
    /// `overwrite` is false.
    fn copy_file(&self, from: &Path, to: &Path, overwrite: bool) -> io::Result<()>;

    /// Moves a file to a path that does not exist yet.
    fn move_file(&self, from: &Path, to: &Path) -> io::Result<()>;

    /// Removes a file.
    fn delete_file(&self, path: &Path) -> io::Result<()>;

    /// Creation time. `Ok(None)` when the platform does not record one.
    fn creation_time(&self, path: &Path) -> io::Result<Option<SystemTime>>;

    /// Last write time.
    fn last_write_time(&self, path: &Path) -> io::Result<SystemTime>;

    /// File size in bytes.
    fn file_size(&self, path: &Path) -> io::Result<u64>;

    /// Whole file contents.
    fn read_file(&self, path: &Path) -> io::Result<Vec<u8>>;

    /// Up to `len` leading bytes of a file.
    fn read_prefix(&self, path: &Path, len: usize) -> io::Result<Vec<u8>>;

    /// Drives known to the OS, ready or not.
    fn drives(&self) -> io::Result<Vec<DriveInfo>>;
}

//! `std::fs` backed [`FileSystem`].

use std::fs::{self, File};
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use filetime::FileTime;
use model::DriveInfo;

use super::FileSystem;

/// The host's real file system.
#[derive(Debug, Default, Clone, Copy)]
pub struct LocalFileSystem;

impl LocalFileSystem {
    /// Create a new handle to the host file system.
    pub fn new() -> Self {
        Self
    }

    /// List children of `path`, keeping those whose type matches `want_dirs`.
    ///
    /// Symlinks are classified by their target so linked directories can be
    /// browsed; [`FileSystem::is_symlink`] tells walkers not to descend into
    /// them. Entries that cannot be read at all are skipped.
    fn list_children(&self, path: &Path, want_dirs: bool) -> io::Result<Vec<PathBuf>> {
        let mut results = Vec::new();

        for entry_result in fs::read_dir(path)? {
            let entry = match entry_result {
                Ok(e) => e,
                Err(e) => {
                    tracing::debug!(path = %path.display(), error = %e, "Skipping unreadable directory entry");
                    continue;
                }
            };

            let entry_path = entry.path();
            let is_dir = match entry.file_type() {
                Ok(t) if t.is_symlink() => {
                    // Dangling links are listed as files
                    fs::metadata(&entry_path).map(|m| m.is_dir()).unwrap_or(false)
                }
                Ok(t) => t.is_dir(),
                Err(e) => {
                    tracing::debug!(path = %entry_path.display(), error = %e, "Skipping entry of unknown type");
                    continue;
                }
            };

            if is_dir == want_dirs {
                results.push(entry_path);
            }
        }

        Ok(results)
    }
}

impl FileSystem for LocalFileSystem {
    fn list_directories(&self, path: &Path) -> io::Result<Vec<PathBuf>> {
        self.list_children(path, true)
    }

    fn list_files(&self, path: &Path) -> io::Result<Vec<PathBuf>> {
        self.list_children(path, false)
    }

    fn is_hidden(&self, path: &Path) -> io::Result<bool> {
        let metadata = fs::symlink_metadata(path)?;

        #[cfg(windows)]
        {
            use std::os::windows::fs::MetadataExt;
            const FILE_ATTRIBUTE_HIDDEN: u32 = 0x2;
            Ok(metadata.file_attributes() & FILE_ATTRIBUTE_HIDDEN != 0)
        }

        #[cfg(not(windows))]
        {
            let _ = metadata;
            Ok(path
                .file_name()
                .map(|n| n.to_string_lossy().starts_with('.'))
                .unwrap_or(false))
        }
    }

    fn directory_exists(&self, path: &Path) -> bool {
        path.is_dir()
    }

    fn file_exists(&self, path: &Path) -> bool {
        path.is_file()
    }

    fn is_symlink(&self, path: &Path) -> bool {
        path.is_symlink()
    }

    fn create_directory(&self, path: &Path) -> io::Result<()> {
        fs::create_dir(path)
    }

    fn delete_directory(&self, path: &Path, recursive: bool) -> io::Result<()> {
        if recursive {
            fs::remove_dir_all(path)
        } else {
            fs::remove_dir(path)
        }
    }

    fn move_directory(&self, from: &Path, to: &Path) -> io::Result<()> {
        if to.exists() {
            return Err(io::Error::new(
                io::ErrorKind::AlreadyExists,
                format!("destination exists: {}", to.display()),
            ));
        }
        fs::rename(from, to)
    }

    fn copy_file(&self, from: &Path, to: &Path, overwrite: bool) -> io::Result<()> {
        if !overwrite && to.exists() {
            return Err(io::Error::new(
                io::ErrorKind::AlreadyExists,
                format!("destination exists: {}", to.display()),
            ));
        }

        let existed = to.exists();
        let result = fs::copy(from, to).and_then(|_| {
            // Set by path: the copy already carries the source's permission
            // bits and may not be writable
            let modified = FileTime::from_last_modification_time(&fs::metadata(from)?);
            filetime::set_file_mtime(to, modified)
        });

        if let Err(e) = result {
            if !existed {
                if let Err(cleanup) = fs::remove_file(to) {
                    if cleanup.kind() != io::ErrorKind::NotFound {
                        tracing::warn!(path = %to.display(), error = %cleanup, "Failed to remove partial copy");
                    }
                }
            }
            return Err(e);
        }
        Ok(())
    }

    fn move_file(&self, from: &Path, to: &Path) -> io::Result<()> {
        if to.exists() {
            return Err(io::Error::new(
                io::ErrorKind::AlreadyExists,
                format!("destination exists: {}", to.display()),
            ));
        }
        fs::rename(from, to)
    }

    fn delete_file(&self, path: &Path) -> io::Result<()> {
        fs::remove_file(path)
    }

    fn creation_time(&self, path: &Path) -> io::Result<Option<SystemTime>> {
        let metadata = fs::metadata(path)?;
        match metadata.created() {
            Ok(t) => Ok(Some(t)),
            Err(e) if e.kind() == io::ErrorKind::Unsupported => Ok(None),
            Err(e) => Err(e),
        }
    }

    fn last_write_time(&self, path: &Path) -> io::Result<SystemTime> {
        fs::metadata(path)?.modified()
    }

    fn file_size(&self, path: &Path) -> io::Result<u64> {
        Ok(fs::metadata(path)?.len())
    }

    fn read_file(&self, path: &Path) -> io::Result<Vec<u8>> {
        fs::read(path)
    }

    fn read_prefix(&self, path: &Path, len: usize) -> io::Result<Vec<u8>> {
        let file = File::open(path)?;
        let mut buffer = Vec::with_capacity(len);
        file.take(len as u64).read_to_end(&mut buffer)?;
        Ok(buffer)
    }

    #[cfg(windows)]
    fn drives(&self) -> io::Result<Vec<DriveInfo>> {
        let mut drives = Vec::new();
        for letter in b'A'..=b'Z' {
            let root = format!("{}:\\", letter as char);
            if Path::new(&root).exists() {
                let is_ready = fs::read_dir(&root).is_ok();
                drives.push(DriveInfo { root, is_ready });
            }
        }
        Ok(drives)
    }

    #[cfg(not(windows))]
    fn drives(&self) -> io::Result<Vec<DriveInfo>> {
        Ok(vec![DriveInfo {
            root: "/".to_string(),
            is_ready: true,
        }])
    }
}

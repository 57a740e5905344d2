//! In-memory [`FileSystem`] for tests and embedders.
//!
//! Every trait call increments a counter, which lets callers prove that an
//! operation issued no OS calls at all. Faults can be injected per path for
//! attribute reads, metadata reads and any other operation.

use std::collections::{BTreeMap, HashSet};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{PoisonError, RwLock};
use std::time::SystemTime;

use model::DriveInfo;

use super::FileSystem;

#[derive(Debug, Clone)]
enum Node {
    Directory {
        hidden: bool,
        created: Option<SystemTime>,
        modified: SystemTime,
    },
    File {
        data: Vec<u8>,
        hidden: bool,
        created: Option<SystemTime>,
        modified: SystemTime,
    },
}

impl Node {
    fn directory() -> Self {
        let now = SystemTime::now();
        Self::Directory {
            hidden: false,
            created: Some(now),
            modified: now,
        }
    }

    fn file(data: Vec<u8>) -> Self {
        let now = SystemTime::now();
        Self::File {
            data,
            hidden: false,
            created: Some(now),
            modified: now,
        }
    }

    fn is_dir(&self) -> bool {
        matches!(self, Self::Directory { .. })
    }

    fn hidden_mut(&mut self) -> &mut bool {
        match self {
            Self::Directory { hidden, .. } | Self::File { hidden, .. } => hidden,
        }
    }

    fn created_mut(&mut self) -> &mut Option<SystemTime> {
        match self {
            Self::Directory { created, .. } | Self::File { created, .. } => created,
        }
    }
}

#[derive(Debug, Default)]
struct Faults {
    attributes: HashSet<PathBuf>,
    metadata: HashSet<PathBuf>,
    operations: HashSet<PathBuf>,
}

/// A Unix-style file system held entirely in memory.
///
/// The root `/` always exists.
#[derive(Debug)]
pub struct MemoryFileSystem {
    nodes: RwLock<BTreeMap<PathBuf, Node>>,
    faults: RwLock<Faults>,
    drives: RwLock<Vec<DriveInfo>>,
    calls: AtomicUsize,
}

impl Default for MemoryFileSystem {
    fn default() -> Self {
        Self::new()
    }
}

fn not_found(path: &Path) -> io::Error {
    io::Error::new(
        io::ErrorKind::NotFound,
        format!("no such entry: {}", path.display()),
    )
}

fn already_exists(path: &Path) -> io::Error {
    io::Error::new(
        io::ErrorKind::AlreadyExists,
        format!("entry exists: {}", path.display()),
    )
}

impl MemoryFileSystem {
    /// Create a file system containing only `/`.
    pub fn new() -> Self {
        let mut nodes = BTreeMap::new();
        nodes.insert(PathBuf::from("/"), Node::directory());
        Self {
            nodes: RwLock::new(nodes),
            faults: RwLock::new(Faults::default()),
            drives: RwLock::new(vec![DriveInfo {
                root: "/".to_string(),
                is_ready: true,
            }]),
            calls: AtomicUsize::new(0),
        }
    }

    /// Add a directory, creating missing ancestors. Not counted as a call.
    pub fn add_directory(&self, path: impl AsRef<Path>) -> &Self {
        let mut nodes = self.nodes.write().unwrap_or_else(PoisonError::into_inner);
        for ancestor in path.as_ref().ancestors() {
            if ancestor.as_os_str().is_empty() {
                continue;
            }
            nodes
                .entry(ancestor.to_path_buf())
                .or_insert_with(Node::directory);
        }
        self
    }

    /// Add or replace a file, creating missing ancestors. Not counted as a call.
    pub fn add_file(&self, path: impl AsRef<Path>, data: impl Into<Vec<u8>>) -> &Self {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            self.add_directory(parent);
        }
        self.nodes
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(path.to_path_buf(), Node::file(data.into()));
        self
    }

    /// Set or clear the hidden attribute of an existing entry.
    pub fn set_hidden(&self, path: impl AsRef<Path>, hidden: bool) -> &Self {
        if let Some(node) = self
            .nodes
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .get_mut(path.as_ref())
        {
            *node.hidden_mut() = hidden;
        }
        self
    }

    /// Make an entry report no creation time, like platforms without birth time.
    pub fn clear_creation_time(&self, path: impl AsRef<Path>) -> &Self {
        if let Some(node) = self
            .nodes
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .get_mut(path.as_ref())
        {
            *node.created_mut() = None;
        }
        self
    }

    /// Make `is_hidden` fail for `path`.
    pub fn fail_attributes(&self, path: impl AsRef<Path>) -> &Self {
        self.faults
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .attributes
            .insert(path.as_ref().to_path_buf());
        self
    }

    /// Make dates and size reads fail with `PermissionDenied` for `path`.
    pub fn fail_metadata(&self, path: impl AsRef<Path>) -> &Self {
        self.faults
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .metadata
            .insert(path.as_ref().to_path_buf());
        self
    }

    /// Make every other operation touching `path` fail.
    pub fn fail_operations(&self, path: impl AsRef<Path>) -> &Self {
        self.faults
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .operations
            .insert(path.as_ref().to_path_buf());
        self
    }

    /// Replace the drive list.
    pub fn set_drives(&self, drives: Vec<DriveInfo>) -> &Self {
        *self.drives.write().unwrap_or_else(PoisonError::into_inner) = drives;
        self
    }

    /// Number of trait calls issued so far.
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Reset the trait call counter.
    pub fn reset_call_count(&self) {
        self.calls.store(0, Ordering::SeqCst);
    }

    /// File contents, bypassing faults and the call counter.
    pub fn contents(&self, path: impl AsRef<Path>) -> Option<Vec<u8>> {
        match self
            .nodes
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(path.as_ref())
        {
            Some(Node::File { data, .. }) => Some(data.clone()),
            _ => None,
        }
    }

    /// Whether any entry exists at `path`, bypassing faults and the counter.
    pub fn contains(&self, path: impl AsRef<Path>) -> bool {
        self.nodes
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(path.as_ref())
    }

    fn record_call(&self) {
        self.calls.fetch_add(1, Ordering::SeqCst);
    }

    fn check_operation(&self, path: &Path) -> io::Result<()> {
        let faults = self.faults.read().unwrap_or_else(PoisonError::into_inner);
        if faults.operations.contains(path) {
            return Err(io::Error::other(format!(
                "injected failure: {}",
                path.display()
            )));
        }
        Ok(())
    }

    fn check_metadata(&self, path: &Path) -> io::Result<()> {
        let faults = self.faults.read().unwrap_or_else(PoisonError::into_inner);
        if faults.metadata.contains(path) {
            return Err(io::Error::new(
                io::ErrorKind::PermissionDenied,
                format!("metadata unreadable: {}", path.display()),
            ));
        }
        Ok(())
    }

    fn children(&self, path: &Path, want_dirs: bool) -> io::Result<Vec<PathBuf>> {
        self.record_call();
        self.check_operation(path)?;
        let nodes = self.nodes.read().unwrap_or_else(PoisonError::into_inner);
        match nodes.get(path) {
            Some(node) if node.is_dir() => {}
            _ => return Err(not_found(path)),
        }
        Ok(nodes
            .iter()
            .filter(|(k, node)| k.parent() == Some(path) && node.is_dir() == want_dirs)
            .map(|(k, _)| k.clone())
            .collect())
    }

    /// Re-key `from` and every descendant under `to`.
    fn rename_subtree(nodes: &mut BTreeMap<PathBuf, Node>, from: &Path, to: &Path) {
        let keys: Vec<PathBuf> = nodes
            .keys()
            .filter(|k| k.starts_with(from))
            .cloned()
            .collect();
        for key in keys {
            if let (Some(node), Ok(rest)) = (nodes.remove(&key), key.strip_prefix(from)) {
                let new_key = if rest.as_os_str().is_empty() {
                    to.to_path_buf()
                } else {
                    to.join(rest)
                };
                nodes.insert(new_key, node);
            }
        }
    }

    fn require_parent_dir(nodes: &BTreeMap<PathBuf, Node>, path: &Path) -> io::Result<()> {
        let parent = path.parent().ok_or_else(|| not_found(path))?;
        match nodes.get(parent) {
            Some(node) if node.is_dir() => Ok(()),
            _ => Err(not_found(parent)),
        }
    }

    fn metadata_node(&self, path: &Path) -> io::Result<Node> {
        self.record_call();
        self.check_metadata(path)?;
        self.nodes
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(path)
            .cloned()
            .ok_or_else(|| not_found(path))
    }
}

impl FileSystem for MemoryFileSystem {
    fn list_directories(&self, path: &Path) -> io::Result<Vec<PathBuf>> {
        self.children(path, true)
    }

    fn list_files(&self, path: &Path) -> io::Result<Vec<PathBuf>> {
        self.children(path, false)
    }

    fn is_hidden(&self, path: &Path) -> io::Result<bool> {
        self.record_call();
        if self
            .faults
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .attributes
            .contains(path)
        {
            return Err(io::Error::other(format!(
                "attributes unreadable: {}",
                path.display()
            )));
        }
        match self
            .nodes
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(path)
        {
            Some(Node::Directory { hidden, .. }) | Some(Node::File { hidden, .. }) => Ok(*hidden),
            None => Err(not_found(path)),
        }
    }

    fn directory_exists(&self, path: &Path) -> bool {
        self.record_call();
        matches!(
            self.nodes
                .read()
                .unwrap_or_else(PoisonError::into_inner)
                .get(path),
            Some(Node::Directory { .. })
        )
    }

    fn file_exists(&self, path: &Path) -> bool {
        self.record_call();
        matches!(
            self.nodes
                .read()
                .unwrap_or_else(PoisonError::into_inner)
                .get(path),
            Some(Node::File { .. })
        )
    }

    fn create_directory(&self, path: &Path) -> io::Result<()> {
        self.record_call();
        self.check_operation(path)?;
        let mut nodes = self.nodes.write().unwrap_or_else(PoisonError::into_inner);
        if nodes.contains_key(path) {
            return Err(already_exists(path));
        }
        Self::require_parent_dir(&nodes, path)?;
        nodes.insert(path.to_path_buf(), Node::directory());
        Ok(())
    }

    fn delete_directory(&self, path: &Path, recursive: bool) -> io::Result<()> {
        self.record_call();
        self.check_operation(path)?;
        let mut nodes = self.nodes.write().unwrap_or_else(PoisonError::into_inner);
        match nodes.get(path) {
            Some(node) if node.is_dir() => {}
            _ => return Err(not_found(path)),
        }
        let descendants: Vec<PathBuf> = nodes
            .keys()
            .filter(|k| k.starts_with(path) && k.as_path() != path)
            .cloned()
            .collect();
        if !descendants.is_empty() && !recursive {
            return Err(io::Error::other(format!(
                "directory not empty: {}",
                path.display()
            )));
        }
        for key in descendants {
            nodes.remove(&key);
        }
        nodes.remove(path);
        Ok(())
    }

    fn move_directory(&self, from: &Path, to: &Path) -> io::Result<()> {
        self.record_call();
        self.check_operation(from)?;
        self.check_operation(to)?;
        let mut nodes = self.nodes.write().unwrap_or_else(PoisonError::into_inner);
        match nodes.get(from) {
            Some(node) if node.is_dir() => {}
            _ => return Err(not_found(from)),
        }
        if nodes.contains_key(to) {
            return Err(already_exists(to));
        }
        if to.starts_with(from) {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "cannot move a directory into itself",
            ));
        }
        Self::require_parent_dir(&nodes, to)?;
        Self::rename_subtree(&mut nodes, from, to);
        Ok(())
    }

    fn copy_file(&self, from: &Path, to: &Path, overwrite: bool) -> io::Result<()> {
        self.record_call();
        self.check_operation(from)?;
        self.check_operation(to)?;
        let mut nodes = self.nodes.write().unwrap_or_else(PoisonError::into_inner);
        let source = match nodes.get(from) {
            Some(node @ Node::File { .. }) => node.clone(),
            _ => return Err(not_found(from)),
        };
        match nodes.get(to) {
            Some(Node::Directory { .. }) => return Err(already_exists(to)),
            Some(Node::File { .. }) if !overwrite => return Err(already_exists(to)),
            _ => {}
        }
        Self::require_parent_dir(&nodes, to)?;
        nodes.insert(to.to_path_buf(), source);
        Ok(())
    }

    fn move_file(&self, from: &Path, to: &Path) -> io::Result<()> {
        self.record_call();
        self.check_operation(from)?;
        self.check_operation(to)?;
        let mut nodes = self.nodes.write().unwrap_or_else(PoisonError::into_inner);
        if !matches!(nodes.get(from), Some(Node::File { .. })) {
            return Err(not_found(from));
        }
        if nodes.contains_key(to) {
            return Err(already_exists(to));
        }
        Self::require_parent_dir(&nodes, to)?;
        if let Some(node) = nodes.remove(from) {
            nodes.insert(to.to_path_buf(), node);
        }
        Ok(())
    }

    fn delete_file(&self, path: &Path) -> io::Result<()> {
        self.record_call();
        self.check_operation(path)?;
        let mut nodes = self.nodes.write().unwrap_or_else(PoisonError::into_inner);
        match nodes.get(path) {
            Some(Node::File { .. }) => {
                nodes.remove(path);
                Ok(())
            }
            _ => Err(not_found(path)),
        }
    }

    fn creation_time(&self, path: &Path) -> io::Result<Option<SystemTime>> {
        match self.metadata_node(path)? {
            Node::Directory { created, .. } | Node::File { created, .. } => Ok(created),
        }
    }

    fn last_write_time(&self, path: &Path) -> io::Result<SystemTime> {
        match self.metadata_node(path)? {
            Node::Directory { modified, .. } | Node::File { modified, .. } => Ok(modified),
        }
    }

    fn file_size(&self, path: &Path) -> io::Result<u64> {
        match self.metadata_node(path)? {
            Node::File { data, .. } => Ok(data.len() as u64),
            Node::Directory { .. } => Ok(0),
        }
    }

    fn read_file(&self, path: &Path) -> io::Result<Vec<u8>> {
        self.record_call();
        self.check_operation(path)?;
        match self
            .nodes
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(path)
        {
            Some(Node::File { data, .. }) => Ok(data.clone()),
            _ => Err(not_found(path)),
        }
    }

    fn read_prefix(&self, path: &Path, len: usize) -> io::Result<Vec<u8>> {
        let mut data = self.read_file(path)?;
        data.truncate(len);
        Ok(data)
    }

    fn drives(&self) -> io::Result<Vec<DriveInfo>> {
        self.record_call();
        Ok(self
            .drives
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_file_creates_ancestors() {
        let fs = MemoryFileSystem::new();
        fs.add_file("/a/b/c.txt", "data");

        assert!(fs.directory_exists(Path::new("/a")));
        assert!(fs.directory_exists(Path::new("/a/b/")));
        assert!(fs.file_exists(Path::new("/a/b/c.txt")));
        assert_eq!(fs.contents("/a/b/c.txt").unwrap(), b"data");
    }

    #[test]
    fn test_children_listing() {
        let fs = MemoryFileSystem::new();
        fs.add_directory("/root/one")
            .add_directory("/root/two/nested")
            .add_file("/root/file.txt", "x");

        let dirs = fs.list_directories(Path::new("/root/")).unwrap();
        assert_eq!(
            dirs,
            vec![PathBuf::from("/root/one"), PathBuf::from("/root/two")]
        );
        let files = fs.list_files(Path::new("/root")).unwrap();
        assert_eq!(files, vec![PathBuf::from("/root/file.txt")]);
    }

    #[test]
    fn test_call_counter() {
        let fs = MemoryFileSystem::new();
        fs.add_directory("/x");
        assert_eq!(fs.call_count(), 0);

        fs.directory_exists(Path::new("/x"));
        fs.list_files(Path::new("/x")).unwrap();
        assert_eq!(fs.call_count(), 2);

        fs.reset_call_count();
        assert_eq!(fs.call_count(), 0);
    }

    #[test]
    fn test_move_directory_rekeys_subtree() {
        let fs = MemoryFileSystem::new();
        fs.add_file("/src/inner/a.txt", "a").add_directory("/dst");

        fs.move_directory(Path::new("/src"), Path::new("/dst/moved"))
            .unwrap();

        assert!(!fs.contains("/src"));
        assert_eq!(fs.contents("/dst/moved/inner/a.txt").unwrap(), b"a");
    }

    #[test]
    fn test_move_directory_into_itself_fails() {
        let fs = MemoryFileSystem::new();
        fs.add_directory("/src");
        let err = fs
            .move_directory(Path::new("/src"), Path::new("/src/child"))
            .unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidInput);
    }

    #[test]
    fn test_copy_file_preserves_hidden() {
        let fs = MemoryFileSystem::new();
        fs.add_file("/a/.secret", "s").set_hidden("/a/.secret", true);

        fs.copy_file(Path::new("/a/.secret"), Path::new("/a/copy"), false)
            .unwrap();
        assert!(fs.is_hidden(Path::new("/a/copy")).unwrap());
    }

    #[test]
    fn test_injected_faults() {
        let fs = MemoryFileSystem::new();
        fs.add_file("/f.txt", "x")
            .fail_attributes("/f.txt")
            .fail_metadata("/f.txt");

        assert!(fs.is_hidden(Path::new("/f.txt")).is_err());
        let err = fs.file_size(Path::new("/f.txt")).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::PermissionDenied);
        assert!(fs.read_file(Path::new("/f.txt")).is_ok());

        fs.fail_operations("/f.txt");
        assert!(fs.read_file(Path::new("/f.txt")).is_err());
    }

    #[test]
    fn test_delete_directory_non_recursive() {
        let fs = MemoryFileSystem::new();
        fs.add_file("/d/f", "x");

        assert!(fs.delete_directory(Path::new("/d"), false).is_err());
        fs.delete_directory(Path::new("/d"), true).unwrap();
        assert!(!fs.contains("/d"));
        assert!(!fs.contains("/d/f"));
    }

    #[test]
    fn test_read_prefix() {
        let fs = MemoryFileSystem::new();
        fs.add_file("/img", vec![1u8, 2, 3, 4, 5]);
        assert_eq!(fs.read_prefix(Path::new("/img"), 3).unwrap(), vec![1, 2, 3]);
    }
}

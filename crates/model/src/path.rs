//! Path identity types.
//!
//! A [`FileSystemPathId`] is the normalized string form of a path. The
//! platform path strategies in the engine are responsible for producing
//! normalized ids; this type only enforces the checks that hold on every
//! platform and offers cheap accessors.

use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{FsError, Result};

/// Separators recognised when inspecting an already normalized id.
const SEPARATORS: [char; 2] = ['/', '\\'];

/// Immutable, validated path value.
///
/// Directory ids always end with a separator, file ids never do. Two ids are
/// equal iff their normalized strings are equal.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct FileSystemPathId(String);

impl FileSystemPathId {
    /// Wraps an already normalized path string.
    ///
    /// Fails with [`FsError::InvalidPath`] if the string is blank, contains a
    /// NUL byte, is not rooted (`/`, `\\` or a drive letter) or still has
    /// `.` or `..` segments. Anything else is taken as given: callers holding
    /// raw user input should go through the engine's `PathStrategy::directory_id`
    /// and `PathStrategy::file_id`, which apply the platform's full rules.
    pub fn new(normalized: impl Into<String>) -> Result<Self> {
        let normalized = normalized.into();
        if normalized.trim().is_empty() {
            return Err(FsError::InvalidPath("path is empty".to_string()));
        }
        if normalized.contains('\0') {
            return Err(FsError::InvalidPath(format!(
                "path contains a NUL character: {}",
                normalized.escape_debug()
            )));
        }
        if !is_rooted(&normalized) {
            return Err(FsError::InvalidPath(format!(
                "path is not absolute: {normalized}"
            )));
        }
        if normalized
            .split(SEPARATORS)
            .any(|segment| segment == "." || segment == "..")
        {
            return Err(FsError::InvalidPath(format!(
                "path is not normalized: {normalized}"
            )));
        }
        Ok(Self(normalized))
    }

    /// The normalized path string.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The id as a [`Path`] for OS calls.
    pub fn as_path(&self) -> &Path {
        Path::new(&self.0)
    }

    /// Whether this id names a directory (ends with a separator).
    pub fn is_directory(&self) -> bool {
        self.0.ends_with(SEPARATORS)
    }

    /// Consumes the id and returns the normalized string.
    pub fn into_string(self) -> String {
        self.0
    }
}

fn is_rooted(path: &str) -> bool {
    let mut chars = path.chars();
    match (chars.next(), chars.next()) {
        (Some(c), _) if SEPARATORS.contains(&c) => true,
        (Some(letter), Some(':')) => letter.is_ascii_alphabetic(),
        _ => false,
    }
}

impl fmt::Display for FileSystemPathId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<Path> for FileSystemPathId {
    fn as_ref(&self) -> &Path {
        self.as_path()
    }
}

impl TryFrom<String> for FileSystemPathId {
    type Error = FsError;

    fn try_from(value: String) -> Result<Self> {
        Self::new(value)
    }
}

impl From<FileSystemPathId> for String {
    fn from(value: FileSystemPathId) -> Self {
        value.0
    }
}

/// One component of a parsed path, used for breadcrumb navigation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PathSegment {
    /// Display name (`/` or `C:\` for roots).
    pub name: String,
    /// Whether the segment names a directory.
    pub is_directory: bool,
    /// Whether the segment is a mount root or drive.
    pub is_drive: bool,
}

impl PathSegment {
    /// Creates a root segment.
    pub fn root(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            is_directory: true,
            is_drive: true,
        }
    }

    /// Creates a directory segment.
    pub fn directory(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            is_directory: true,
            is_drive: false,
        }
    }

    /// Creates a file segment.
    pub fn file(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            is_directory: false,
            is_drive: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_rejects_empty() {
        assert!(matches!(
            FileSystemPathId::new(""),
            Err(FsError::InvalidPath(_))
        ));
        assert!(matches!(
            FileSystemPathId::new("   "),
            Err(FsError::InvalidPath(_))
        ));
    }

    #[test]
    fn test_new_rejects_nul() {
        assert!(matches!(
            FileSystemPathId::new("/tmp/a\0b"),
            Err(FsError::InvalidPath(_))
        ));
    }

    #[test]
    fn test_new_rejects_relative_and_unresolved() {
        for raw in ["rel/x", "x.txt", "/a/../b", "/a/./b/", r"C:\Users\..\x"] {
            assert!(
                matches!(FileSystemPathId::new(raw), Err(FsError::InvalidPath(_))),
                "{raw} accepted"
            );
        }
        assert!(FileSystemPathId::new("/a/..b/").is_ok());
        assert!(FileSystemPathId::new("c:/users/").is_ok());
        assert!(FileSystemPathId::new(r"\\server\share\").is_ok());
    }

    #[test]
    fn test_deserialize_validates() {
        let ok: FileSystemPathId = serde_json::from_str("\"/srv/data/\"").unwrap();
        assert_eq!(ok.as_str(), "/srv/data/");
        assert!(serde_json::from_str::<FileSystemPathId>("\"../etc\"").is_err());
    }

    #[test]
    fn test_directory_detection() {
        assert!(FileSystemPathId::new("/home/").unwrap().is_directory());
        assert!(FileSystemPathId::new("C:\\Users\\").unwrap().is_directory());
        assert!(!FileSystemPathId::new("/home/notes.txt").unwrap().is_directory());
    }

    #[test]
    fn test_equality_is_string_equality() {
        let a = FileSystemPathId::new("/data/").unwrap();
        let b = FileSystemPathId::new("/data/").unwrap();
        let c = FileSystemPathId::new("/data").unwrap();
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_serde_is_transparent_and_validated() {
        let id = FileSystemPathId::new("/srv/").unwrap();
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"/srv/\"");

        let restored: FileSystemPathId = serde_json::from_str(&json).unwrap();
        assert_eq!(restored, id);

        let invalid: std::result::Result<FileSystemPathId, _> = serde_json::from_str("\"\"");
        assert!(invalid.is_err());
    }

    #[test]
    fn test_segment_constructors() {
        let root = PathSegment::root("/");
        assert!(root.is_drive && root.is_directory);

        let file = PathSegment::file("a.txt");
        assert!(!file.is_directory && !file.is_drive);
    }
}

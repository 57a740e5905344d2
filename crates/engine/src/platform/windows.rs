//! Windows path strategy: drive-letter roots and `\` separators.
//!
//! Forward slashes are accepted on input and normalized to `\`. Drive letters
//! are uppercased so `c:\Users` and `C:/Users` produce the same id. UNC shares
//! are not supported.

use std::collections::HashSet;
use std::sync::Arc;

use model::{FsError, Result};

use super::{resolve_components, PathStrategy, Platform, SplitPath};
use crate::fs::FileSystem;

const SEPARATOR: char = '\\';
const ALT_SEPARATOR: char = '/';

const INVALID_PATH_CHARS: &[char] = &['"', '<', '>', '|', '*', '?'];

const RESERVED_NAMES: &[&str] = &[
    "CON", "PRN", "AUX", "NUL", "COM1", "COM2", "COM3", "COM4", "COM5", "COM6", "COM7", "COM8",
    "COM9", "LPT1", "LPT2", "LPT3", "LPT4", "LPT5", "LPT6", "LPT7", "LPT8", "LPT9",
];

fn is_invalid_char(c: char) -> bool {
    (c as u32) < 0x20 || INVALID_PATH_CHARS.contains(&c)
}

/// `NUL`, `nul.txt` and `Com1.log` are all reserved; `nullable` is not.
fn is_reserved(name: &str) -> bool {
    let stem = name.split('.').next().unwrap_or(name).trim_end();
    RESERVED_NAMES
        .iter()
        .any(|reserved| reserved.eq_ignore_ascii_case(stem))
}

/// Path semantics for Windows.
#[derive(Debug, Clone)]
pub struct WindowsPathStrategy {
    fs: Arc<dyn FileSystem>,
}

impl WindowsPathStrategy {
    /// Create a strategy probing `fs` for existence checks.
    pub fn new(fs: Arc<dyn FileSystem>) -> Self {
        Self { fs }
    }

    /// Split off and normalize the `X:` drive prefix.
    fn split_drive<'a>(&self, path: &'a str) -> Result<(String, &'a str)> {
        let mut chars = path.chars();
        let (Some(letter), Some(':')) = (chars.next(), chars.next()) else {
            return Err(FsError::InvalidPath(format!(
                "path has no drive letter: {path}"
            )));
        };
        if !letter.is_ascii_alphabetic() {
            return Err(FsError::InvalidPath(format!("invalid drive letter: {path}")));
        }

        let rest = &path[2..];
        if !rest.is_empty() && !rest.starts_with(SEPARATOR) {
            // `C:folder` is relative to the drive's current directory
            return Err(FsError::InvalidPath(format!("path is not absolute: {path}")));
        }
        Ok((format!("{}:{SEPARATOR}", letter.to_ascii_uppercase()), rest))
    }
}

impl PathStrategy for WindowsPathStrategy {
    fn platform(&self) -> Platform {
        Platform::Windows
    }

    fn separator(&self) -> char {
        SEPARATOR
    }

    fn get_invalid_path_chars_for_platform(&self) -> HashSet<char> {
        INVALID_PATH_CHARS
            .iter()
            .copied()
            .chain((0u8..0x20).map(char::from))
            .collect()
    }

    fn split_path(&self, path: &str) -> Result<SplitPath> {
        if path.trim().is_empty() {
            return Err(FsError::InvalidPath("path is empty".to_string()));
        }
        if path.chars().any(is_invalid_char) {
            return Err(FsError::InvalidPath(format!(
                "path contains invalid characters: {}",
                path.escape_debug()
            )));
        }

        let normalized = path.replace(ALT_SEPARATOR, &SEPARATOR.to_string());
        if normalized.starts_with(r"\\") {
            return Err(FsError::InvalidPath(format!(
                "UNC paths are not supported: {path}"
            )));
        }

        let (root, rest) = self.split_drive(&normalized)?;
        if rest.contains(':') {
            return Err(FsError::InvalidPath(format!(
                "':' is only allowed after the drive letter: {path}"
            )));
        }

        let parts: Vec<&str> = rest.split(SEPARATOR).collect();
        if let Some(bad) = parts
            .iter()
            .find(|p| !matches!(**p, "" | "." | "..") && !self.is_valid_name(p))
        {
            return Err(FsError::InvalidPath(format!(
                "invalid path component {bad:?} in {path}"
            )));
        }

        let last_part = parts.last().copied().unwrap_or("");
        let trailing_separator = matches!(last_part, "" | "." | "..");
        let components = resolve_components(path, parts.into_iter())?;

        Ok(SplitPath {
            root,
            components,
            trailing_separator,
        })
    }

    fn is_valid_name(&self, name: &str) -> bool {
        if name.is_empty() || name == "." || name == ".." {
            return false;
        }
        if name.ends_with('.') || name.ends_with(' ') {
            return false;
        }
        if name
            .chars()
            .any(|c| c == SEPARATOR || c == ALT_SEPARATOR || c == ':' || is_invalid_char(c))
        {
            return false;
        }
        !is_reserved(name)
    }

    fn file_system(&self) -> &dyn FileSystem {
        self.fs.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::MemoryFileSystem;
    use model::PathSegment;

    fn strategy() -> WindowsPathStrategy {
        WindowsPathStrategy::new(Arc::new(MemoryFileSystem::new()))
    }

    #[test]
    fn test_is_valid_path() {
        let s = strategy();
        assert!(s.is_valid_path(r"C:\"));
        assert!(s.is_valid_path("C:"));
        assert!(s.is_valid_path(r"c:\Users\Public\Documents"));
        assert!(s.is_valid_path("D:/Mixed/Separators"));

        assert!(!s.is_valid_path(""));
        assert!(!s.is_valid_path(r"\Users"));
        assert!(!s.is_valid_path(r"C:Users"));
        assert!(!s.is_valid_path(r"1:\Users"));
        assert!(!s.is_valid_path(r"C:\a:b"));
        assert!(!s.is_valid_path(r"C:\what?"));
        assert!(!s.is_valid_path("C:\\tab\there"));
        assert!(!s.is_valid_path(r"\\server\share\file"));
        assert!(!s.is_valid_path(r"C:\..\escape"));
    }

    #[test]
    fn test_reserved_and_trailing_names() {
        let s = strategy();
        assert!(!s.is_valid_name("CON"));
        assert!(!s.is_valid_name("nul.txt"));
        assert!(!s.is_valid_name("Com1"));
        assert!(!s.is_valid_name("trailing."));
        assert!(!s.is_valid_name("trailing "));
        assert!(!s.is_valid_name("a/b"));
        assert!(s.is_valid_name("nullable"));
        assert!(s.is_valid_name("COM10"));
        assert!(s.is_valid_name(".gitignore"));

        assert!(!s.is_valid_path(r"C:\Users\aux\file.txt"));
    }

    #[test]
    fn test_ids_are_normalized() {
        let s = strategy();
        assert_eq!(s.directory_id("c:/users//bob").unwrap().as_str(), r"C:\users\bob\");
        assert_eq!(s.directory_id("C:").unwrap().as_str(), r"C:\");
        assert_eq!(s.file_id(r"C:\a\.\b\..\c.txt").unwrap().as_str(), r"C:\a\c.txt");
        assert!(s.file_id(r"C:\").is_err());
    }

    #[test]
    fn test_parse_path() {
        let s = strategy();
        let segments = s.parse_path(r"C:\Users\bob\notes.txt").unwrap();
        assert_eq!(
            segments,
            vec![
                PathSegment::root(r"C:\"),
                PathSegment::directory("Users"),
                PathSegment::directory("bob"),
                PathSegment::file("notes.txt"),
            ]
        );
        assert!(segments[0].is_drive);

        let root_only = s.parse_path("e:").unwrap();
        assert_eq!(root_only, vec![PathSegment::root(r"E:\")]);
    }

    #[test]
    fn test_go_up_and_root() {
        let s = strategy();
        let up = s.go_up_one_level(r"C:\Users\bob\").unwrap();
        assert_eq!(
            up,
            vec![PathSegment::root(r"C:\"), PathSegment::directory("Users")]
        );
        assert!(s.go_up_one_level(r"C:\").unwrap().is_empty());
        assert_eq!(s.get_path_root(r"d:\data").unwrap(), PathSegment::root(r"D:\"));
    }

    #[test]
    fn test_combine_path() {
        let s = strategy();
        let base = s.directory_id(r"C:\Projects").unwrap();
        assert_eq!(
            s.combine_path(&base, "readme.md").unwrap().as_str(),
            r"C:\Projects\readme.md"
        );
        assert!(s.combine_path(&base, "bad|name").is_err());
        assert!(s.combine_path(&base, "PRN").is_err());
    }

    #[test]
    fn test_invalid_chars_include_controls() {
        let chars = strategy().get_invalid_path_chars_for_platform();
        for c in ['"', '<', '>', '|', '*', '?', '\0', '\u{1f}'] {
            assert!(chars.contains(&c), "missing {c:?}");
        }
        assert!(!chars.contains(&':'));
        assert!(!chars.contains(&'\\'));
    }
}

//! Unix path strategy: a single `/` root and `/` separators.

use std::collections::HashSet;
use std::sync::Arc;

use model::{FsError, Result};

use super::{resolve_components, PathStrategy, Platform, SplitPath};
use crate::fs::FileSystem;

const SEPARATOR: char = '/';

const INVALID_PATH_CHARS: &[char] = &['\0'];

/// Path semantics for Linux, macOS and other Unix-likes.
#[derive(Debug, Clone)]
pub struct UnixPathStrategy {
    fs: Arc<dyn FileSystem>,
}

impl UnixPathStrategy {
    /// Create a strategy probing `fs` for existence checks.
    pub fn new(fs: Arc<dyn FileSystem>) -> Self {
        Self { fs }
    }
}

impl PathStrategy for UnixPathStrategy {
    fn platform(&self) -> Platform {
        Platform::Unix
    }

    fn separator(&self) -> char {
        SEPARATOR
    }

    fn get_invalid_path_chars_for_platform(&self) -> HashSet<char> {
        INVALID_PATH_CHARS.iter().copied().collect()
    }

    fn split_path(&self, path: &str) -> Result<SplitPath> {
        if path.trim().is_empty() {
            return Err(FsError::InvalidPath("path is empty".to_string()));
        }
        if path.contains(INVALID_PATH_CHARS) {
            return Err(FsError::InvalidPath(format!(
                "path contains invalid characters: {}",
                path.escape_debug()
            )));
        }
        let Some(rest) = path.strip_prefix(SEPARATOR) else {
            return Err(FsError::InvalidPath(format!("path is not absolute: {path}")));
        };

        let last_part = rest.rsplit(SEPARATOR).next().unwrap_or("");
        let trailing_separator = rest.is_empty() || matches!(last_part, "" | "." | "..");
        let components = resolve_components(path, rest.split(SEPARATOR))?;

        Ok(SplitPath {
            root: SEPARATOR.to_string(),
            components,
            trailing_separator,
        })
    }

    fn is_valid_name(&self, name: &str) -> bool {
        !name.is_empty()
            && name != "."
            && name != ".."
            && !name.contains(SEPARATOR)
            && !name.contains(INVALID_PATH_CHARS)
    }

    fn file_system(&self) -> &dyn FileSystem {
        self.fs.as_ref()
    }
}

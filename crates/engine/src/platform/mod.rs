//! Platform path semantics.
//!
//! A [`PathStrategy`] is chosen once at startup by [`PlatformContext::detect`]
//! and injected wherever path math is needed. Nothing outside this module
//! branches on the host OS for path handling.
//!
//! Strategies only need to describe how a raw string splits into a root and
//! components and which names are legal; parsing, combining, navigation and
//! id construction are shared.

pub mod unix;
pub mod windows;

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use model::{FileSystemPathId, FsError, PathSegment, Result};

use crate::fs::FileSystem;

pub use unix::UnixPathStrategy;
pub use windows::WindowsPathStrategy;

/// Operating system family a strategy implements.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Platform {
    /// Single `/` root, `/` separator.
    Unix,
    /// One root per drive letter, `\` separator.
    Windows,
}

impl Platform {
    /// The platform this binary was compiled for.
    pub fn current() -> Self {
        if cfg!(windows) {
            Self::Windows
        } else {
            Self::Unix
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unix => f.write_str("unix"),
            Self::Windows => f.write_str("windows"),
        }
    }
}

/// A raw path split into its root and resolved components.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SplitPath {
    /// Normalized root (`/`, `C:\`).
    pub root: String,
    /// Components below the root, `.` and `..` already resolved.
    pub components: Vec<String>,
    /// Whether the raw string ended with a separator.
    pub trailing_separator: bool,
}

impl SplitPath {
    /// Render back to a string, with a trailing separator when `directory`.
    pub fn render(&self, separator: char, directory: bool) -> String {
        let mut out = self.root.clone();
        out.push_str(&self.components.join(separator.to_string().as_str()));
        if directory && !self.components.is_empty() {
            out.push(separator);
        }
        out
    }

    /// Whether the path is a bare root.
    pub fn is_root(&self) -> bool {
        self.components.is_empty()
    }
}

/// Resolve `.` and `..` lexically. `..` above the root is an error.
pub(crate) fn resolve_components<'a>(
    raw: &str,
    parts: impl Iterator<Item = &'a str>,
) -> Result<Vec<String>> {
    let mut components: Vec<String> = Vec::new();
    for part in parts {
        match part {
            "" | "." => {}
            ".." => {
                if components.pop().is_none() {
                    return Err(FsError::InvalidPath(format!(
                        "path escapes its root: {raw}"
                    )));
                }
            }
            other => components.push(other.to_string()),
        }
    }
    Ok(components)
}

/// Per-platform path semantics.
pub trait PathStrategy: Send + Sync + fmt::Debug {
    /// Platform implemented by this strategy.
    fn platform(&self) -> Platform;

    /// Preferred separator.
    fn separator(&self) -> char;

    /// Characters that may never appear in a path. Returns a fresh copy.
    fn get_invalid_path_chars_for_platform(&self) -> HashSet<char>;

    /// Validate `path` and split it into root and components.
    fn split_path(&self, path: &str) -> Result<SplitPath>;

    /// Whether `name` is legal as a single entry name.
    fn is_valid_name(&self, name: &str) -> bool;

    /// File system used for existence probes.
    fn file_system(&self) -> &dyn FileSystem;

    /// Whether `path` is syntactically valid and rooted.
    fn is_valid_path(&self, path: &str) -> bool {
        self.split_path(path).is_ok()
    }

    /// Whether `path` exists as a file or directory.
    ///
    /// With `include_hidden` false, hidden entries report as absent. An entry
    /// whose attributes cannot be read counts as visible.
    fn exists(&self, path: &str, include_hidden: bool) -> bool {
        let Ok(split) = self.split_path(path) else {
            return false;
        };
        let rendered = split.render(self.separator(), false);
        let target = std::path::Path::new(&rendered);
        let fs = self.file_system();

        if !fs.directory_exists(target) && !fs.file_exists(target) {
            return false;
        }
        if include_hidden {
            return true;
        }
        fs.is_hidden(target).map(|hidden| !hidden).unwrap_or(true)
    }

    /// Normalized directory id (trailing separator) for `raw`.
    fn directory_id(&self, raw: &str) -> Result<FileSystemPathId> {
        let split = self.split_path(raw)?;
        FileSystemPathId::new(split.render(self.separator(), true))
    }

    /// Normalized file id (no trailing separator) for `raw`.
    fn file_id(&self, raw: &str) -> Result<FileSystemPathId> {
        let split = self.split_path(raw)?;
        if split.is_root() {
            return Err(FsError::InvalidPath(format!("a root is not a file: {raw}")));
        }
        FileSystemPathId::new(split.render(self.separator(), false))
    }

    /// Combine a directory id with an entry name, producing a file-form id.
    fn combine_path(&self, base: &FileSystemPathId, name: &str) -> Result<FileSystemPathId> {
        if !base.is_directory() {
            return Err(FsError::InvalidPath(format!(
                "cannot combine onto a file path: {base}"
            )));
        }
        if !self.is_valid_name(name) {
            return Err(FsError::InvalidPath(format!("invalid entry name: {name:?}")));
        }
        self.file_id(&format!("{base}{name}"))
    }

    /// Combine a directory id with a name, producing a directory id.
    fn combine_directory_path(
        &self,
        base: &FileSystemPathId,
        name: &str,
    ) -> Result<FileSystemPathId> {
        let combined = self.combine_path(base, name)?;
        self.directory_id(combined.as_str())
    }

    /// Break a path into breadcrumb segments, root first.
    fn parse_path(&self, path: &str) -> Result<Vec<PathSegment>> {
        let split = self.split_path(path)?;
        let mut segments = Vec::with_capacity(split.components.len() + 1);
        segments.push(PathSegment::root(split.root.clone()));

        let last = split.components.len().saturating_sub(1);
        for (i, name) in split.components.iter().enumerate() {
            if i == last && !split.trailing_separator {
                segments.push(PathSegment::file(name.clone()));
            } else {
                segments.push(PathSegment::directory(name.clone()));
            }
        }
        Ok(segments)
    }

    /// Segments of the parent of `path`. A root yields an empty sequence.
    fn go_up_one_level(&self, path: &str) -> Result<Vec<PathSegment>> {
        let mut segments = self.parse_path(path)?;
        if segments.len() <= 1 {
            return Ok(Vec::new());
        }
        segments.pop();
        Ok(segments)
    }

    /// Root segment of `path`.
    fn get_path_root(&self, path: &str) -> Result<PathSegment> {
        self.parse_path(path)?
            .into_iter()
            .next()
            .ok_or_else(|| FsError::InvalidPath(path.to_string()))
    }

    /// Rebuild an id from segments produced by [`Self::parse_path`].
    fn join_segments(&self, segments: &[PathSegment]) -> Result<FileSystemPathId> {
        let (root, rest) = segments
            .split_first()
            .ok_or_else(|| FsError::InvalidPath("no path segments".to_string()))?;
        if !root.is_drive {
            return Err(FsError::InvalidPath(format!(
                "first segment is not a root: {}",
                root.name
            )));
        }

        let separator = self.separator().to_string();
        let mut raw = root.name.clone();
        raw.push_str(
            &rest
                .iter()
                .map(|s| s.name.as_str())
                .collect::<Vec<_>>()
                .join(separator.as_str()),
        );

        match rest.last() {
            Some(last) if !last.is_directory => self.file_id(&raw),
            _ => self.directory_id(&raw),
        }
    }

    /// Last segment name of an id; the root's own name for a root.
    fn file_name(&self, id: &FileSystemPathId) -> String {
        self.parse_path(id.as_str())
            .ok()
            .and_then(|segments| segments.last().map(|s| s.name.clone()))
            .unwrap_or_else(|| id.to_string())
    }

    /// Parent directory id, or `None` for a root.
    fn parent(&self, id: &FileSystemPathId) -> Option<FileSystemPathId> {
        let segments = self.go_up_one_level(id.as_str()).ok()?;
        if segments.is_empty() {
            return None;
        }
        self.join_segments(&segments).ok()
    }
}

/// The strategy selected for this process, plus the platform it implements.
#[derive(Debug, Clone)]
pub struct PlatformContext {
    platform: Platform,
    strategy: Arc<dyn PathStrategy>,
}

impl PlatformContext {
    /// Build a context for an explicit platform.
    pub fn new(platform: Platform, fs: Arc<dyn FileSystem>) -> Self {
        let strategy: Arc<dyn PathStrategy> = match platform {
            Platform::Unix => Arc::new(UnixPathStrategy::new(fs)),
            Platform::Windows => Arc::new(WindowsPathStrategy::new(fs)),
        };
        tracing::debug!(%platform, "Selected path strategy");
        Self { platform, strategy }
    }

    /// Build a context for the host OS.
    pub fn detect(fs: Arc<dyn FileSystem>) -> Self {
        Self::new(Platform::current(), fs)
    }

    /// Platform the strategy implements.
    pub fn platform(&self) -> Platform {
        self.platform
    }

    /// Shared handle to the strategy.
    pub fn strategy(&self) -> Arc<dyn PathStrategy> {
        Arc::clone(&self.strategy)
    }
}

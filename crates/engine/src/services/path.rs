//! Path navigation service.

use std::collections::HashSet;
use std::sync::Arc;

use model::{FileSystemPathId, FsError, PathSegment, Result};

use super::PathInput;
use crate::platform::PathStrategy;

/// Breadcrumbs, navigation and validation on top of the active strategy.
#[derive(Debug, Clone)]
pub struct PathService {
    strategy: Arc<dyn PathStrategy>,
}

impl PathService {
    /// Create a service over `strategy`.
    pub fn new(strategy: Arc<dyn PathStrategy>) -> Self {
        Self { strategy }
    }

    /// Segments of `path`, root first.
    pub fn parse_path(&self, path: impl PathInput) -> Result<Vec<PathSegment>> {
        self.strategy.parse_path(path.raw_path())
    }

    /// Root segment of `path`.
    pub fn get_path_root(&self, path: impl PathInput) -> Result<PathSegment> {
        self.strategy.get_path_root(path.raw_path())
    }

    /// `name` joined onto the directory `base`, in file form.
    pub fn combine_path(&self, base: impl PathInput, name: &str) -> Result<FileSystemPathId> {
        let base = base.to_directory_id(self.strategy.as_ref())?;
        self.strategy.combine_path(&base, name)
    }

    /// Whether `path` is syntactically valid and rooted.
    pub fn is_valid_path(&self, path: impl PathInput) -> bool {
        self.strategy.is_valid_path(path.raw_path())
    }

    /// Whether `path` exists, hidden entries included unless told otherwise.
    pub fn exists(&self, path: impl PathInput, include_hidden: bool) -> bool {
        self.strategy.exists(path.raw_path(), include_hidden)
    }

    /// Characters never allowed in a path. A fresh copy on every call.
    pub fn get_invalid_path_chars(&self) -> HashSet<char> {
        self.strategy.get_invalid_path_chars_for_platform()
    }

    /// Parent directory of `path`.
    ///
    /// Fails with `CannotNavigateUp` at a root.
    pub fn go_up_one_level(&self, path: impl PathInput) -> Result<FileSystemPathId> {
        let segments = self.go_up_one_level_segments(path.raw_path())?;
        if segments.is_empty() {
            return Err(FsError::CannotNavigateUp(path.raw_path().to_string()));
        }
        self.strategy.join_segments(&segments)
    }

    /// Parent segments of `path`; empty at a root.
    pub fn go_up_one_level_segments(&self, path: impl PathInput) -> Result<Vec<PathSegment>> {
        let id = path.to_directory_id(self.strategy.as_ref())?;
        self.strategy.go_up_one_level(id.as_str())
    }
}

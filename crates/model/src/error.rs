//! Error taxonomy shared by every engine operation.

use thiserror::Error;

use crate::access::AccessMode;

/// Engine error type covering every failure a caller can observe.
///
/// Raw OS errors never cross the engine boundary; provider services
/// translate them into the closest variant here.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum FsError {
    // Authorization errors
    /// The permission oracle denied the requested access.
    #[error("access denied ({mode}) to {path}")]
    UnauthorizedAccess {
        /// Path the access was requested for.
        path: String,
        /// Access mode that was denied.
        mode: AccessMode,
    },

    // Path errors
    /// The path is empty, contains invalid characters or cannot be resolved.
    #[error("invalid path: {0}")]
    InvalidPath(String),

    /// Attempted to navigate above a root.
    #[error("cannot navigate up from {0}")]
    CannotNavigateUp(String),

    // Existence errors
    /// The directory does not exist.
    #[error("directory not found: {0}")]
    DirectoryNotFound(String),

    /// The file does not exist.
    #[error("file not found: {0}")]
    FileNotFound(String),

    /// A directory with the target name already exists.
    #[error("directory already exists: {0}")]
    DirectoryAlreadyExists(String),

    /// A file with the target name already exists.
    #[error("file already exists: {0}")]
    FileAlreadyExists(String),

    // Transfer errors
    /// Copying a directory tree failed part way.
    #[error("failed to copy directory {path}: {reason}")]
    DirectoryCopyError {
        /// Source directory.
        path: String,
        /// Underlying failure.
        reason: String,
    },

    /// Copying a file failed.
    #[error("failed to copy file {path}: {reason}")]
    FileCopyError {
        /// Source file.
        path: String,
        /// Underlying failure.
        reason: String,
    },

    /// Moving or merging a directory failed.
    #[error("failed to move directory {path}: {reason}")]
    DirectoryMoveError {
        /// Source directory.
        path: String,
        /// Underlying failure.
        reason: String,
    },

    /// Moving a file failed.
    #[error("failed to move file {path}: {reason}")]
    FileMoveError {
        /// Source file.
        path: String,
        /// Underlying failure.
        reason: String,
    },

    // Imaging errors
    /// The file is not an image type a thumbnail can be produced for.
    #[error("no thumbnail available for {0}")]
    NoThumbnail(String),

    /// The image codec failed to decode, resize or encode the source.
    #[error("thumbnail encoding failed for {path}: {reason}")]
    ThumbnailEncoding {
        /// Source image.
        path: String,
        /// Codec failure.
        reason: String,
    },

    // Generic errors
    /// The result of an operation could not be turned into a usable value.
    #[error("validation failed: {0}")]
    Validation(String),

    /// An OS failure with no closer taxonomy entry.
    #[error("I/O error on {path}: {message}")]
    Io {
        /// Path the operation targeted.
        path: String,
        /// OS error description.
        message: String,
    },

    /// The operation observed its cancellation token.
    #[error("operation cancelled")]
    Cancelled,
}

impl FsError {
    /// Creates an [`FsError::UnauthorizedAccess`].
    pub fn unauthorized(path: impl Into<String>, mode: AccessMode) -> Self {
        Self::UnauthorizedAccess {
            path: path.into(),
            mode,
        }
    }

    /// Creates an [`FsError::Io`] from an OS error.
    pub fn io(path: impl Into<String>, err: &std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            message: err.to_string(),
        }
    }

    /// Returns true if this error was produced by a permission denial.
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, Self::UnauthorizedAccess { .. })
    }
}

/// Result type alias for engine operations.
pub type Result<T> = std::result::Result<T, FsError>;

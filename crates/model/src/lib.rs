//! # fs-engine model
//!
//! Value types shared by the fs-engine crates and by anything built on top
//! of them (HTTP layers, scan orchestrators, UIs).
//!
//! ## Overview
//!
//! - **Paths**: [`FileSystemPathId`] and [`PathSegment`]
//! - **Entities**: [`Directory`], [`File`] and [`RootItem`], with a tagged
//!   [`Metadata`] group that separates "could not read" from "not recorded"
//! - **Permissions**: the [`AccessMode`] asked of the permission oracle
//! - **Imaging**: [`ImageType`] and [`Thumbnail`]
//! - **Errors**: the [`FsError`] taxonomy returned by every operation
//!
//! Nothing in this crate touches the file system.

pub mod access;
pub mod entry;
pub mod error;
pub mod image;
pub mod path;

pub use access::AccessMode;
pub use entry::{
    Directory, DirectoryDetails, DriveInfo, File, FileDetails, Metadata, RootItem, Status,
};
pub use error::{FsError, Result};
pub use image::{ImageType, Thumbnail, ThumbnailFormat};
pub use path::{FileSystemPathId, PathSegment};

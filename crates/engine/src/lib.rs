//! # fs-engine
//!
//! Cross-platform file-system engine: permission-checked, partial-failure
//! tolerant directory and file operations behind a platform-neutral API.
//!
//! ## Overview
//!
//! - **Path strategies**: one [`PathStrategy`] per OS family, chosen once
//!   at startup, owns every bit of path syntax
//! - **Permission oracle**: every provider operation asks a
//!   [`PermissionsService`] before touching the OS
//! - **Providers**: thin, gated wrappers over an injectable [`FileSystem`]
//!   that translate OS failures into [`model::FsError`]
//! - **Services**: hydrate entities, degrading unreadable metadata to
//!   `Inaccessible` instead of failing a whole listing
//! - **Imaging**: magic-byte type detection and cancellable thumbnails
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                           Engine                             │
//! ├──────────────────────────────────────────────────────────────┤
//! │  PathService  DirectoryService  FileService  DriveService    │
//! │               FileTypeService   ThumbnailService             │
//! ├──────────────────────────────────────────────────────────────┤
//! │        DirectoryProvider            FileProvider             │
//! │                 (PermissionsService gate)                    │
//! ├──────────────────────────────────────────────────────────────┤
//! │   PathStrategy (Unix / Windows)      FileSystem (OS / mem)   │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use engine::{Config, Engine};
//!
//! fn main() -> anyhow::Result<()> {
//!     let mut config = Config::load_default()?;
//!     config.apply_env_overrides();
//!
//!     let engine = Engine::new(config)?;
//!     for dir in engine.directories().get_subdirectories("/home", false)? {
//!         println!("{} ({:?})", dir.name, dir.status());
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Modules
//!
//! - [`config`]: Configuration loading and defaults
//! - [`fs`]: OS abstraction and its in-memory double
//! - [`platform`]: Path strategies
//! - [`permissions`]: Permission oracle trait and the rule-based oracle
//! - [`providers`]: Permission-gated OS operations
//! - [`services`]: Entity-returning domain services
//! - [`filetype`]: Image type detection
//! - [`thumbnail`]: Thumbnail generation
//! - [`engine`]: Facade wiring everything together

pub mod config;
pub mod engine;
pub mod filetype;
pub mod fs;
pub mod permissions;
pub mod platform;
pub mod providers;
pub mod services;
pub mod thumbnail;

// Re-export the model crate for convenience
pub use model;

pub use config::Config;
pub use engine::Engine;
pub use filetype::{sniff, FileTypeService};
pub use fs::{FileSystem, LocalFileSystem, MemoryFileSystem};
pub use permissions::{
    AllowAll, PathRule, PermissionLevel, PermissionsService, RulePermissions, RuleSet,
};
pub use platform::{
    PathStrategy, Platform, PlatformContext, UnixPathStrategy, WindowsPathStrategy,
};
pub use providers::{DirectoryProvider, FileProvider};
pub use services::{DirectoryService, DriveService, FileService, PathInput, PathService};
pub use thumbnail::{
    ImageCodec, ImageCrateCodec, ThumbnailRequest, ThumbnailService, ThumbnailSettings,
};

//! Engine facade wiring the strategy, oracle, providers and services.
//!
//! Embedders build one [`Engine`] at startup and hand out the service
//! handles. All services share the same file system, path strategy and
//! permission oracle.

use std::sync::Arc;

use anyhow::{Context, Result};

use crate::config::{Config, PermissionsConfig};
use crate::filetype::FileTypeService;
use crate::fs::{FileSystem, LocalFileSystem};
use crate::permissions::{PermissionsService, RulePermissions, RuleSet};
use crate::platform::{Platform, PlatformContext};
use crate::providers::{DirectoryProvider, FileProvider};
use crate::services::{DirectoryService, DriveService, FileService, PathService};
use crate::thumbnail::{ImageCrateCodec, ThumbnailService, ThumbnailSettings};

/// Fully wired set of services.
#[derive(Debug, Clone)]
pub struct Engine {
    config: Config,
    platform: PlatformContext,
    paths: PathService,
    directories: DirectoryService,
    files: FileService,
    drives: DriveService,
    file_types: FileTypeService,
    thumbnails: ThumbnailService,
}

impl Engine {
    /// Build an engine over the host file system with the rule-based oracle
    /// described by `config`.
    pub fn new(config: Config) -> Result<Self> {
        config.validate().context("Invalid configuration")?;

        let permissions = build_permissions(&config.permissions)?;
        let fs: Arc<dyn FileSystem> = Arc::new(LocalFileSystem::new());

        tracing::info!(
            platform = %Platform::current(),
            default_level = ?config.permissions.default_level,
            rules = config.permissions.rules.len(),
            allowed_roots = config.permissions.allowed_roots.len(),
            "Initializing engine"
        );
        Ok(Self::with_parts(
            config,
            Platform::current(),
            fs,
            Arc::new(permissions),
        ))
    }

    /// Build an engine from explicit parts. The configuration is used as
    /// given; only its thumbnail and listing sections apply.
    pub fn with_parts(
        config: Config,
        platform: Platform,
        fs: Arc<dyn FileSystem>,
        permissions: Arc<dyn PermissionsService>,
    ) -> Self {
        let context = PlatformContext::new(platform, Arc::clone(&fs));
        let strategy = context.strategy();

        let directory_provider = DirectoryProvider::new(
            Arc::clone(&fs),
            Arc::clone(&strategy),
            Arc::clone(&permissions),
        );
        let file_provider =
            FileProvider::new(Arc::clone(&fs), Arc::clone(&strategy), permissions);

        let directories = DirectoryService::new(directory_provider, Arc::clone(&strategy));
        let files = FileService::new(file_provider.clone(), Arc::clone(&strategy));
        let drives = DriveService::new(platform, Arc::clone(&fs), directories.clone());
        let paths = PathService::new(Arc::clone(&strategy));
        let file_types = FileTypeService::new(file_provider.clone(), Arc::clone(&strategy));

        let settings = ThumbnailSettings {
            max_dimension: config.thumbnail.max_dimension,
            format: config.thumbnail.format,
        };
        let codec = Arc::new(ImageCrateCodec::new(config.thumbnail.max_source_size));
        let thumbnails = ThumbnailService::new(
            file_types.clone(),
            file_provider,
            codec,
            strategy,
            settings,
        );

        Self {
            config,
            platform: context,
            paths,
            directories,
            files,
            drives,
            file_types,
            thumbnails,
        }
    }

    /// Active configuration.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Platform the engine's path strategy implements.
    pub fn platform(&self) -> Platform {
        self.platform.platform()
    }

    /// Path parsing, validation and navigation.
    pub fn paths(&self) -> &PathService {
        &self.paths
    }

    /// Directory listing and tree operations.
    pub fn directories(&self) -> &DirectoryService {
        &self.directories
    }

    /// File listing, reads and file operations.
    pub fn files(&self) -> &FileService {
        &self.files
    }

    /// Drive enumeration.
    pub fn drives(&self) -> &DriveService {
        &self.drives
    }

    /// Magic-byte image classification.
    pub fn file_types(&self) -> &FileTypeService {
        &self.file_types
    }

    /// Thumbnail generation.
    pub fn thumbnails(&self) -> &ThumbnailService {
        &self.thumbnails
    }
}

/// Build the rule-based oracle for `config`.
///
/// When a store is configured it is loaded first; rules from the config file
/// are appended after the stored ones.
pub fn build_permissions(config: &PermissionsConfig) -> Result<RulePermissions> {
    let oracle = match &config.store_path {
        Some(path) => {
            let oracle =
                RulePermissions::with_store(path, config.default_level, config.allowed_roots.clone());
            oracle
                .load()
                .with_context(|| format!("Failed to load permission store: {}", path.display()))?;
            oracle
        }
        None => RulePermissions::new(
            RuleSet::with_default(config.default_level),
            config.allowed_roots.clone(),
        ),
    };

    for rule in &config.rules {
        oracle.add_rule(rule.clone())?;
    }
    Ok(oracle)
}

#[cfg(test)]
mod tests {
    use std::path::{Path, PathBuf};

    use super::*;
    use crate::fs::MemoryFileSystem;
    use crate::permissions::{PathRule, PermissionLevel};
    use model::Status;
    use tempfile::TempDir;

    #[test]
    fn test_with_parts_shares_file_system() {
        let fs = Arc::new(MemoryFileSystem::new());
        fs.add_directory("/data/a").add_file("/data/b.txt", "b");
        let engine = Engine::with_parts(
            Config::default(),
            Platform::Unix,
            fs.clone(),
            Arc::new(crate::permissions::AllowAll),
        );

        assert_eq!(engine.platform(), Platform::Unix);
        let dirs = engine.directories().get_subdirectories("/data", false).unwrap();
        assert_eq!(dirs.len(), 1);
        assert_eq!(dirs[0].status(), Status::Accessible);

        let created = engine.directories().create_directory("/data", "c").unwrap();
        assert_eq!(created.id.as_str(), "/data/c/");
        assert!(fs.contains("/data/c"));
        assert_eq!(engine.files().get_files("/data", false).unwrap().len(), 1);
    }

    #[test]
    fn test_build_permissions_from_config() {
        let config = PermissionsConfig {
            default_level: PermissionLevel::Read,
            allowed_roots: vec![PathBuf::from("/srv")],
            rules: vec![PathRule::full_access("/srv/upload")],
            store_path: None,
        };
        let oracle = build_permissions(&config).unwrap();

        assert_eq!(oracle.level_for(Path::new("/srv/docs")), PermissionLevel::Read);
        assert_eq!(oracle.level_for(Path::new("/srv/upload/x")), PermissionLevel::Full);
        assert_eq!(oracle.level_for(Path::new("/etc")), PermissionLevel::None);
    }

    #[test]
    fn test_build_permissions_appends_config_rules_to_store() {
        let temp_dir = TempDir::new().unwrap();
        let store = temp_dir.path().join("rules.json");

        let seeded = RulePermissions::with_store(&store, PermissionLevel::None, Vec::new());
        seeded.add_rule(PathRule::read_only("/home")).unwrap();
        seeded.save().unwrap();

        let config = PermissionsConfig {
            default_level: PermissionLevel::None,
            allowed_roots: Vec::new(),
            rules: vec![PathRule::read_write("/home/user")],
            store_path: Some(store),
        };
        let oracle = build_permissions(&config).unwrap();

        assert_eq!(oracle.rules().unwrap().rules.len(), 2);
        assert_eq!(oracle.level_for(Path::new("/home/other")), PermissionLevel::Read);
        assert_eq!(
            oracle.level_for(Path::new("/home/user/x")),
            PermissionLevel::ReadWrite
        );
    }

    #[test]
    fn test_new_rejects_invalid_config() {
        let mut config = Config::default();
        config.thumbnail.default_quality = 0;
        assert!(Engine::new(config).is_err());
    }
}

//! Path permission oracle.
//!
//! Provider services ask a [`PermissionsService`] before every OS call. The
//! engine ships [`RulePermissions`], a rule store that grants a
//! [`PermissionLevel`] per path prefix, and [`AllowAll`] for trusted
//! embedders that enforce access elsewhere.
//!
//! Paths are compared lexically. The oracle never touches the file system,
//! so a denial really does issue zero OS calls.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::RwLock;

use anyhow::{Context, Result};
use model::{AccessMode, FileSystemPathId};
use serde::{Deserialize, Serialize};

/// Answers "can this path be accessed in this mode".
pub trait PermissionsService: Send + Sync + fmt::Debug {
    /// Whether `path` may be accessed with `mode`.
    fn can_access_path(&self, path: &FileSystemPathId, mode: AccessMode, is_directory: bool)
        -> bool;
}

/// Grants everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct AllowAll;

impl PermissionsService for AllowAll {
    fn can_access_path(&self, _: &FileSystemPathId, _: AccessMode, _: bool) -> bool {
        true
    }
}

/// Permission level for a path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum PermissionLevel {
    /// No access.
    #[default]
    None,
    /// List, stat, read and traverse.
    Read,
    /// Read plus create, rename, copy into and move into.
    ReadWrite,
    /// Everything, including delete and move out.
    Full,
}

impl PermissionLevel {
    /// Check if this level allows reading.
    pub fn can_read(&self) -> bool {
        matches!(self, Self::Read | Self::ReadWrite | Self::Full)
    }

    /// Check if this level allows writing.
    pub fn can_write(&self) -> bool {
        matches!(self, Self::ReadWrite | Self::Full)
    }

    /// Check if this level allows deleting.
    pub fn can_delete(&self) -> bool {
        matches!(self, Self::Full)
    }

    /// Whether this level grants `mode`.
    pub fn allows(&self, mode: AccessMode) -> bool {
        match mode {
            AccessMode::ListDirectory
            | AccessMode::ReadProperties
            | AccessMode::ReadContents
            | AccessMode::Execute => self.can_read(),
            AccessMode::Write => self.can_write(),
            AccessMode::Delete => self.can_delete(),
        }
    }
}

impl std::str::FromStr for PermissionLevel {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "none" => Ok(Self::None),
            "read" => Ok(Self::Read),
            "readwrite" => Ok(Self::ReadWrite),
            "full" => Ok(Self::Full),
            other => Err(format!("unknown permission level: {other}")),
        }
    }
}

/// A permission granted on a path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PathRule {
    /// The path this rule applies to.
    pub path: PathBuf,
    /// The permission level.
    pub level: PermissionLevel,
    /// Whether the rule also covers everything below `path`.
    #[serde(default = "default_recursive")]
    pub recursive: bool,
}

fn default_recursive() -> bool {
    true
}

impl PathRule {
    /// Create a new rule.
    pub fn new(path: impl Into<PathBuf>, level: PermissionLevel, recursive: bool) -> Self {
        Self {
            path: path.into(),
            level,
            recursive,
        }
    }

    /// Recursive read-only rule.
    pub fn read_only(path: impl Into<PathBuf>) -> Self {
        Self::new(path, PermissionLevel::Read, true)
    }

    /// Recursive read-write rule.
    pub fn read_write(path: impl Into<PathBuf>) -> Self {
        Self::new(path, PermissionLevel::ReadWrite, true)
    }

    /// Recursive full-access rule.
    pub fn full_access(path: impl Into<PathBuf>) -> Self {
        Self::new(path, PermissionLevel::Full, true)
    }
}

/// Lexically normalized path: separators unified, `.`/`..` resolved, drive
/// letters uppercased. Returns the list of components.
fn normalize(path: &Path) -> Vec<String> {
    let raw = path.to_string_lossy();
    let mut components: Vec<String> = Vec::new();
    for (i, part) in raw.split(['/', '\\']).enumerate() {
        match part {
            "" | "." => {}
            ".." => {
                // never pop a drive root
                if components.len() > 1 || (components.len() == 1 && !is_drive(&components[0])) {
                    components.pop();
                }
            }
            drive if i == 0 && is_drive(drive) => components.push(drive.to_ascii_uppercase()),
            other => components.push(other.to_string()),
        }
    }
    components
}

fn is_drive(part: &str) -> bool {
    let bytes = part.as_bytes();
    bytes.len() == 2 && bytes[0].is_ascii_alphabetic() && bytes[1] == b':'
}

/// An ordered set of rules plus a fallback level.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleSet {
    /// Path rules; the longest matching one wins.
    pub rules: Vec<PathRule>,
    /// Level for paths no rule matches.
    pub default_level: PermissionLevel,
}

impl RuleSet {
    /// Rule set with no rules and the given fallback.
    pub fn with_default(default_level: PermissionLevel) -> Self {
        Self {
            rules: Vec::new(),
            default_level,
        }
    }

    /// Effective level for `path`: the most specific matching rule, else the
    /// default.
    pub fn get_permission(&self, path: &Path) -> PermissionLevel {
        let target = normalize(path);

        let mut best: Option<(usize, PermissionLevel)> = None;
        for rule in &self.rules {
            let prefix = normalize(&rule.path);
            let matches = if rule.recursive {
                target.starts_with(&prefix)
            } else {
                target == prefix
            };
            if matches && best.map_or(true, |(len, _)| prefix.len() >= len) {
                best = Some((prefix.len(), rule.level));
            }
        }

        best.map(|(_, level)| level).unwrap_or(self.default_level)
    }
}

/// Persisted form of a [`RuleSet`].
#[derive(Debug, Serialize, Deserialize)]
struct RuleStoreData {
    /// Version of the store format.
    version: u32,
    #[serde(flatten)]
    rules: RuleSet,
}

/// Thread-safe rule-based oracle with optional JSON persistence.
///
/// `allowed_roots`, when non-empty, is a hard outer boundary: anything
/// outside every root is denied regardless of rules.
#[derive(Debug)]
pub struct RulePermissions {
    store_path: Option<PathBuf>,
    rules: RwLock<RuleSet>,
    allowed_roots: Vec<PathBuf>,
}

impl RulePermissions {
    /// Create an in-memory oracle.
    pub fn new(rules: RuleSet, allowed_roots: Vec<PathBuf>) -> Self {
        Self {
            store_path: None,
            rules: RwLock::new(rules),
            allowed_roots,
        }
    }

    /// Create an oracle backed by a JSON file at `path`. Call [`Self::load`]
    /// to read it.
    pub fn with_store(
        path: impl AsRef<Path>,
        default_level: PermissionLevel,
        allowed_roots: Vec<PathBuf>,
    ) -> Self {
        Self {
            store_path: Some(path.as_ref().to_path_buf()),
            rules: RwLock::new(RuleSet::with_default(default_level)),
            allowed_roots,
        }
    }

    /// Oracle granting `level` everywhere.
    pub fn uniform(level: PermissionLevel) -> Self {
        Self::new(RuleSet::with_default(level), Vec::new())
    }

    /// Load rules from the backing file, replacing the current ones. A
    /// missing file leaves the rules untouched.
    pub fn load(&self) -> Result<()> {
        let Some(path) = &self.store_path else {
            return Ok(());
        };
        if !path.exists() {
            tracing::debug!("Permission store not found at {:?}, keeping configured rules", path);
            return Ok(());
        }

        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read permission store: {}", path.display()))?;
        let data: RuleStoreData = serde_json::from_str(&contents)
            .with_context(|| format!("Failed to parse permission store: {}", path.display()))?;

        let mut rules = self
            .rules
            .write()
            .map_err(|_| anyhow::anyhow!("Failed to acquire write lock on permission rules"))?;
        *rules = data.rules;

        tracing::info!("Loaded {} permission rules from {:?}", rules.rules.len(), path);
        Ok(())
    }

    /// Write rules to the backing file atomically.
    pub fn save(&self) -> Result<()> {
        let Some(path) = &self.store_path else {
            anyhow::bail!("Permission rules have no backing store");
        };
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create permission store directory: {}", parent.display())
            })?;
        }

        let rules = self
            .rules
            .read()
            .map_err(|_| anyhow::anyhow!("Failed to acquire read lock on permission rules"))?;
        let data = RuleStoreData {
            version: 1,
            rules: rules.clone(),
        };
        let contents =
            serde_json::to_string_pretty(&data).context("Failed to serialize permission rules")?;

        let temp_path = path.with_extension("json.tmp");
        fs::write(&temp_path, &contents).with_context(|| {
            format!("Failed to write temp permission store: {}", temp_path.display())
        })?;
        fs::rename(&temp_path, path).with_context(|| {
            format!(
                "Failed to rename temp permission store {} to {}",
                temp_path.display(),
                path.display()
            )
        })?;

        tracing::debug!("Saved {} permission rules to {:?}", rules.rules.len(), path);
        Ok(())
    }

    /// Append a rule.
    pub fn add_rule(&self, rule: PathRule) -> Result<()> {
        let mut rules = self
            .rules
            .write()
            .map_err(|_| anyhow::anyhow!("Failed to acquire write lock on permission rules"))?;
        tracing::debug!(path = %rule.path.display(), level = ?rule.level, "Adding permission rule");
        rules.rules.push(rule);
        Ok(())
    }

    /// Replace the fallback level.
    pub fn set_default_level(&self, level: PermissionLevel) -> Result<()> {
        let mut rules = self
            .rules
            .write()
            .map_err(|_| anyhow::anyhow!("Failed to acquire write lock on permission rules"))?;
        rules.default_level = level;
        Ok(())
    }

    /// Snapshot of the current rules.
    pub fn rules(&self) -> Result<RuleSet> {
        self.rules
            .read()
            .map(|r| r.clone())
            .map_err(|_| anyhow::anyhow!("Failed to acquire read lock on permission rules"))
    }

    /// Effective level for `path`, including the root boundary.
    pub fn level_for(&self, path: &Path) -> PermissionLevel {
        if !self.is_within_allowed_roots(path) {
            return PermissionLevel::None;
        }
        match self.rules.read() {
            Ok(rules) => rules.get_permission(path),
            Err(_) => {
                tracing::error!("Permission rules lock poisoned, denying access");
                PermissionLevel::None
            }
        }
    }

    fn is_within_allowed_roots(&self, path: &Path) -> bool {
        if self.allowed_roots.is_empty() {
            return true;
        }
        let target = normalize(path);
        self.allowed_roots
            .iter()
            .any(|root| target.starts_with(&normalize(root)))
    }
}

impl PermissionsService for RulePermissions {
    fn can_access_path(
        &self,
        path: &FileSystemPathId,
        mode: AccessMode,
        is_directory: bool,
    ) -> bool {
        let level = self.level_for(path.as_path());
        let granted = level.allows(mode);
        tracing::trace!(path = %path, %mode, is_directory, ?level, granted, "Permission check");
        granted
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn id(raw: &str) -> FileSystemPathId {
        FileSystemPathId::new(raw).unwrap()
    }

    #[test]
    fn test_permission_level_checks() {
        assert!(!PermissionLevel::None.can_read());
        assert!(!PermissionLevel::None.can_write());
        assert!(!PermissionLevel::None.can_delete());

        assert!(PermissionLevel::Read.can_read());
        assert!(!PermissionLevel::Read.can_write());

        assert!(PermissionLevel::ReadWrite.can_write());
        assert!(!PermissionLevel::ReadWrite.can_delete());

        assert!(PermissionLevel::Full.can_delete());
    }

    #[test]
    fn test_level_allows_modes() {
        let read = PermissionLevel::Read;
        assert!(read.allows(AccessMode::ListDirectory));
        assert!(read.allows(AccessMode::ReadProperties));
        assert!(read.allows(AccessMode::ReadContents));
        assert!(read.allows(AccessMode::Execute));
        assert!(!read.allows(AccessMode::Write));
        assert!(!read.allows(AccessMode::Delete));

        assert!(PermissionLevel::ReadWrite.allows(AccessMode::Write));
        assert!(!PermissionLevel::ReadWrite.allows(AccessMode::Delete));
        assert!(PermissionLevel::Full.allows(AccessMode::Delete));
    }

    #[test]
    fn test_level_from_str() {
        assert_eq!("READWRITE".parse::<PermissionLevel>().unwrap(), PermissionLevel::ReadWrite);
        assert_eq!("none".parse::<PermissionLevel>().unwrap(), PermissionLevel::None);
        assert!("admin".parse::<PermissionLevel>().is_err());
    }

    #[test]
    fn test_normalize() {
        assert_eq!(normalize(Path::new("/a/./b/../c/")), vec!["a", "c"]);
        assert_eq!(normalize(Path::new(r"c:\Users\..\..\x")), vec!["C:", "x"]);
        assert_eq!(normalize(Path::new("/../..")), Vec::<String>::new());
    }

    #[test]
    fn test_most_specific_wins() {
        let mut set = RuleSet::default();
        set.rules.push(PathRule::full_access("/data"));
        set.rules.push(PathRule::read_only("/data/restricted"));

        assert_eq!(set.get_permission(Path::new("/data/file.txt")), PermissionLevel::Full);
        assert_eq!(
            set.get_permission(Path::new("/data/restricted/secret.txt")),
            PermissionLevel::Read
        );
        assert_eq!(set.get_permission(Path::new("/elsewhere")), PermissionLevel::None);
    }

    #[test]
    fn test_prefix_match_is_per_component() {
        let mut set = RuleSet::default();
        set.rules.push(PathRule::full_access("/data"));
        assert_eq!(set.get_permission(Path::new("/database")), PermissionLevel::None);
    }

    #[test]
    fn test_dot_dot_cannot_escape_rule() {
        let mut set = RuleSet::default();
        set.rules.push(PathRule::full_access("/data"));
        assert_eq!(
            set.get_permission(Path::new("/data/../etc/passwd")),
            PermissionLevel::None
        );
    }

    #[test]
    fn test_non_recursive_rule() {
        let mut set = RuleSet::default();
        set.rules.push(PathRule::new("/data", PermissionLevel::ReadWrite, false));
        assert_eq!(set.get_permission(Path::new("/data/")), PermissionLevel::ReadWrite);
        assert_eq!(set.get_permission(Path::new("/data/sub")), PermissionLevel::None);
    }

    #[test]
    fn test_allowed_roots_boundary() {
        let oracle = RulePermissions::new(
            RuleSet::with_default(PermissionLevel::Full),
            vec![PathBuf::from("/srv")],
        );
        assert!(oracle.can_access_path(&id("/srv/www/"), AccessMode::Delete, true));
        assert!(!oracle.can_access_path(&id("/etc/"), AccessMode::ListDirectory, true));
    }

    #[test]
    fn test_allow_all() {
        assert!(AllowAll.can_access_path(&id("/anything"), AccessMode::Delete, false));
    }

    #[test]
    fn test_store_save_load() {
        let temp_dir = TempDir::new().unwrap();
        let store_path = temp_dir.path().join("nested").join("permissions.json");

        let store = RulePermissions::with_store(&store_path, PermissionLevel::None, vec![]);
        store.add_rule(PathRule::read_only("/home/user")).unwrap();
        store.set_default_level(PermissionLevel::Read).unwrap();
        store.save().unwrap();
        assert!(!store_path.with_extension("json.tmp").exists());

        let loaded = RulePermissions::with_store(&store_path, PermissionLevel::None, vec![]);
        loaded.load().unwrap();
        let rules = loaded.rules().unwrap();
        assert_eq!(rules.default_level, PermissionLevel::Read);
        assert_eq!(rules.rules, vec![PathRule::read_only("/home/user")]);
    }

    #[test]
    fn test_load_missing_store_keeps_rules() {
        let temp_dir = TempDir::new().unwrap();
        let store = RulePermissions::with_store(
            temp_dir.path().join("absent.json"),
            PermissionLevel::ReadWrite,
            vec![],
        );
        store.load().unwrap();
        assert_eq!(store.rules().unwrap().default_level, PermissionLevel::ReadWrite);
    }

    #[test]
    fn test_load_rejects_garbage() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("permissions.json");
        fs::write(&path, "not json").unwrap();

        let store = RulePermissions::with_store(&path, PermissionLevel::None, vec![]);
        let err = store.load().unwrap_err();
        assert!(err.to_string().contains("Failed to parse permission store"));
    }

    #[test]
    fn test_save_without_store_fails() {
        assert!(RulePermissions::uniform(PermissionLevel::Full).save().is_err());
    }
}

//! Configuration schema for inhouse
//!
//! Global configuration is stored at `~/.config/inhouse/config.toml`;
//! a project may override any part of it with a local `.inhouse.toml`.

use crate::asset::Attributes;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Component, Path, PathBuf};

/// Root configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// General settings
    pub general: GeneralConfig,

    /// Project layout
    pub paths: PathsConfig,

    /// Cache behaviour
    pub cache: CacheConfig,

    /// HTML tag output
    pub output: OutputConfig,

    /// Template scanning for `inhouse cache`
    pub scan: ScanConfig,

    /// Named assets, keyed by alias
    pub named: BTreeMap<String, NamedAssetConfig>,
}

impl Config {
    /// Project root, resolved against the current directory when relative
    pub fn project_root(&self) -> PathBuf {
        let root = &self.paths.project_root;
        let root = if root.is_absolute() {
            root.clone()
        } else {
            std::env::current_dir()
                .map(|cwd| cwd.join(root))
                .unwrap_or_else(|_| root.clone())
        };

        // `.` segments would defeat prefix stripping of cache paths
        root.components()
            .filter(|c| !matches!(c, Component::CurDir))
            .collect()
    }

    /// Resolve a configured path against the project root
    pub fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.project_root().join(path)
        }
    }

    /// Public web root
    pub fn public_dir(&self) -> PathBuf {
        self.resolve(&self.paths.public_dir)
    }

    /// Storage root directory that holds the cache tree and the sidecar file
    pub fn disk_root(&self) -> PathBuf {
        self.resolve(&self.cache.disk_root)
    }
}

/// General application settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Enable verbose logging
    pub verbose: bool,

    /// Log format: "text" or "json"
    pub log_format: String,

    /// Append an "asset cached" JSON line for every internalized asset
    pub event_log: bool,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            verbose: false,
            log_format: "text".to_string(),
            event_log: true,
        }
    }
}

/// Project layout
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    /// Project root; absolute references under it are internalized
    pub project_root: PathBuf,

    /// Public web root, relative to the project root
    pub public_dir: PathBuf,

    /// Staging directory for archive extraction (system temp dir if unset)
    pub temp_dir: Option<PathBuf>,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            project_root: PathBuf::from("."),
            public_dir: PathBuf::from("public"),
            temp_dir: None,
        }
    }
}

/// Cache configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Storage root, relative to the project root
    pub disk_root: PathBuf,

    /// Cache base prefix inside the storage root
    pub path: String,

    /// Public URL prefix the storage root is served under
    pub url: String,

    /// Development mode: re-validate cached assets on every call
    pub dev_mode: bool,

    /// Persist the cache map sidecar file
    pub cache_map: bool,

    /// Verify TLS certificates when fetching
    pub verify_tls: bool,

    /// Internalize URLs even in development mode
    pub force_url_cache: bool,

    /// Global fetch timeout in seconds (0 = no timeout)
    pub fetch_timeout_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            disk_root: PathBuf::from("storage/app/public"),
            path: "inhouse".to_string(),
            url: "/storage".to_string(),
            dev_mode: false,
            cache_map: true,
            verify_tls: true,
            force_url_cache: true,
            fetch_timeout_secs: 30,
        }
    }
}

/// HTML output configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Content security policy nonce added to every tag
    pub nonce: Option<String>,

    /// Strip the application origin from rendered URLs
    pub relative_paths: bool,

    /// Application origin, e.g. `https://example.com`
    pub app_url: Option<String>,

    /// File whose content hash is appended to local URLs as a cache buster
    pub version_file: Option<PathBuf>,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            nonce: None,
            relative_paths: true,
            app_url: None,
            version_file: None,
        }
    }
}

/// Template scan configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanConfig {
    /// Directories searched for templates, relative to the project root
    pub view_paths: Vec<PathBuf>,

    /// Template file name suffixes
    pub extensions: Vec<String>,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            view_paths: vec![PathBuf::from("resources/views")],
            extensions: vec![".blade.php".to_string(), ".html".to_string()],
        }
    }
}

/// A named asset declared in configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NamedAssetConfig {
    /// URL or path the alias resolves to
    pub source: String,

    /// Default tag attributes
    #[serde(default)]
    pub attributes: Attributes,
}

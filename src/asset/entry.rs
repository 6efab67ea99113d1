//! Cache entries: one asset's identity, source and cache location

use super::hash::content_hash;
use super::path::PathResolver;
use crate::error::{InhouseError, InhouseResult};
use crate::fetch::Fetcher;
use crate::storage::Storage;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// A tag attribute value: `async` (flag) or `integrity="..."` (text)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttrValue {
    Flag(bool),
    Text(String),
}

impl From<bool> for AttrValue {
    fn from(value: bool) -> Self {
        Self::Flag(value)
    }
}

impl From<&str> for AttrValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for AttrValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl fmt::Display for AttrValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Flag(flag) => write!(f, "{}", flag),
            Self::Text(text) => write!(f, "{}", text),
        }
    }
}

/// Ordered tag attributes
pub type Attributes = IndexMap<String, AttrValue>;

/// Where an asset's bytes come from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    /// Remote `scheme://host/...` locator
    Url,
    /// Absolute filesystem path
    Local,
    /// File inside the public web root
    Public,
}

/// Whether `reference` is an absolute URL (`scheme://host...`)
pub fn is_url(reference: &str) -> bool {
    let Some((scheme, rest)) = reference.split_once("://") else {
        return false;
    };

    let mut chars = scheme.chars();
    let scheme_ok = chars.next().is_some_and(|c| c.is_ascii_alphabetic())
        && chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'));

    scheme_ok && !rest.is_empty() && !rest.starts_with('/')
}

/// Paths an entry is classified against
#[derive(Debug, Clone)]
pub struct AssetContext {
    pub resolver: PathResolver,
    pub project_root: PathBuf,
    pub public_dir: PathBuf,
}

impl AssetContext {
    /// Create a context; the resolver strips `project_root` from references
    pub fn new(base: &str, project_root: impl Into<PathBuf>, public_dir: impl Into<PathBuf>) -> Self {
        let project_root = project_root.into();
        Self {
            resolver: PathResolver::new(base, &project_root.to_string_lossy()),
            project_root,
            public_dir: public_dir.into(),
        }
    }

    /// Whether `source` is an absolute path under the project root
    pub fn is_under_project(&self, source: &str) -> bool {
        !is_url(source) && Path::new(source).starts_with(&self.project_root)
    }

    /// Whether `source` is an absolute path under the public web root
    pub fn is_public(&self, source: &str) -> bool {
        !is_url(source) && Path::new(source).starts_with(&self.public_dir)
    }
}

/// One asset: logical name, source locator, cache location and attributes.
///
/// Built fresh for every internalization call; the cache map stores a
/// serialized copy and rehydrates a new entry on lookup.
#[derive(Debug, Clone, PartialEq)]
pub struct CacheEntry {
    name: String,
    source: String,
    reference: String,
    disk_path: String,
    attributes: Attributes,
    content_hash: String,
}

impl CacheEntry {
    /// Build an entry for `source`, registered under `name`.
    ///
    /// Relative sources resolve to the public root when the file exists
    /// there, otherwise to the project root. Existing local files are
    /// hashed eagerly.
    pub fn build(ctx: &AssetContext, name: &str, source: &str, attributes: Attributes) -> Self {
        let mut resolved = source.to_string();

        if !is_url(source) && !ctx.is_under_project(source) && Path::new(source).is_relative() {
            let relative = source.trim_start_matches(['/', '\\']);
            let public = ctx.public_dir.join(relative);
            resolved = if public.exists() {
                public.to_string_lossy().into_owned()
            } else {
                ctx.project_root.join(relative).to_string_lossy().into_owned()
            };
        }

        let mut entry = Self {
            name: name.to_string(),
            source: resolved,
            reference: source.to_string(),
            disk_path: ctx.resolver.resolve(source),
            attributes,
            content_hash: String::new(),
        };

        if entry.is_local_asset() && Path::new(&entry.source).is_file() {
            match fs::read(&entry.source) {
                Ok(content) => entry.content_hash = content_hash(&content),
                Err(e) => debug!("Could not hash {}: {}", entry.source, e),
            }
        }

        entry
    }

    /// Map key for this asset
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Resolved source locator (URL or absolute path)
    pub fn source(&self) -> &str {
        &self.source
    }

    /// The reference exactly as the caller gave it
    pub fn reference(&self) -> &str {
        &self.reference
    }

    /// Path of the cached copy, relative to the storage root
    pub fn disk_path(&self) -> &str {
        &self.disk_path
    }

    /// Tag attributes
    pub fn attributes(&self) -> &Attributes {
        &self.attributes
    }

    /// Fingerprint of the last-known local content (empty if unknown)
    pub fn content_hash(&self) -> &str {
        &self.content_hash
    }

    /// Point the entry at another cache location
    pub fn set_disk_path(&mut self, disk_path: impl Into<String>) {
        self.disk_path = disk_path.into();
    }

    /// Record the fingerprint of the content that was cached
    pub fn set_content_hash(&mut self, hash: impl Into<String>) {
        self.content_hash = hash.into();
    }

    /// Classify the resolved source
    pub fn kind(&self, ctx: &AssetContext) -> SourceKind {
        if is_url(&self.source) {
            SourceKind::Url
        } else if ctx.is_public(&self.source) {
            SourceKind::Public
        } else {
            SourceKind::Local
        }
    }

    /// Whether the source is a URL
    pub fn is_url(&self) -> bool {
        is_url(&self.source)
    }

    /// Whether a cached copy exists in `storage`
    pub fn exists_on_disk(&self, storage: &dyn Storage) -> bool {
        !self.disk_path.is_empty() && storage.exists(&self.disk_path)
    }

    /// Whether the source is an existing local filesystem path
    pub fn is_local_asset(&self) -> bool {
        !self.is_url() && Path::new(&self.source).exists()
    }

    /// Fetch or read the source bytes
    pub fn content(&self, fetcher: &dyn Fetcher) -> InhouseResult<Vec<u8>> {
        if self.is_url() {
            return fetcher.get(&self.source);
        }

        let path = Path::new(&self.source);
        if !path.is_file() {
            return Err(InhouseError::Read {
                path: path.to_path_buf(),
                source: std::io::Error::new(std::io::ErrorKind::NotFound, "not a file"),
            });
        }

        fs::read(path).map_err(|e| InhouseError::Read {
            path: path.to_path_buf(),
            source: e,
        })
    }

    /// Persisted form for the cache map
    pub fn to_stored(&self) -> StoredEntry {
        StoredEntry {
            asset_path: self.source.clone(),
            asset_disk_path: self.disk_path.clone(),
            attributes: self.attributes.clone(),
            content_hash: self.content_hash.clone(),
        }
    }

    /// Rehydrate an entry persisted under `name`
    pub fn from_stored(name: &str, stored: StoredEntry) -> Self {
        Self {
            name: name.to_string(),
            reference: stored.asset_path.clone(),
            source: stored.asset_path,
            disk_path: stored.asset_disk_path,
            attributes: stored.attributes,
            content_hash: stored.content_hash,
        }
    }
}

/// Sidecar representation of a cache entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredEntry {
    pub asset_path: String,
    pub asset_disk_path: String,
    #[serde(default, alias = "asset_attributes")]
    pub attributes: Attributes,
    #[serde(default, alias = "asset_content_hash")]
    pub content_hash: String,
}

//! Storage abstraction for the cache tree
//!
//! Paths handed to a `Storage` are relative to its root and always use `/`.

use crate::error::{InhouseError, InhouseResult};
use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{PoisonError, RwLock};
use walkdir::WalkDir;

/// Where cached assets are written and served from
pub trait Storage: Send + Sync {
    /// Whether a file or directory exists at `path`
    fn exists(&self, path: &str) -> bool;

    /// Read a file
    fn get(&self, path: &str) -> InhouseResult<Vec<u8>>;

    /// Write a file, creating parent directories
    fn put(&self, path: &str, contents: &[u8]) -> InhouseResult<()>;

    /// Delete a file; deleting a missing file is not an error
    fn delete(&self, path: &str) -> InhouseResult<()>;

    /// Delete a directory and everything below it
    fn delete_directory(&self, dir: &str) -> InhouseResult<()>;

    /// Public URL of `path`
    fn url(&self, path: &str) -> String;

    /// Files directly inside `dir` (not recursive), as storage paths
    fn list_files(&self, dir: &str) -> InhouseResult<Vec<String>>;
}

fn join_url(prefix: &str, path: &str) -> String {
    format!(
        "{}/{}",
        prefix.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}

/// Every file below `dir`, recursively, sorted by name within each directory.
///
/// Symlinked files are included; symlinked directories are not descended
/// into, so a link cycle cannot make the walk fail.
pub fn collect_files(dir: &Path) -> InhouseResult<Vec<PathBuf>> {
    let mut files = Vec::new();

    for entry in WalkDir::new(dir).sort_by_file_name() {
        let entry = entry.map_err(|e| {
            InhouseError::io(format!("reading directory {}", dir.display()), io::Error::from(e))
        })?;
        let file_type = entry.file_type();
        if file_type.is_file() || (file_type.is_symlink() && entry.path().is_file()) {
            files.push(entry.into_path());
        }
    }

    Ok(files)
}

/// Relative path of `file` under `root`, with `/` separators
pub fn relative_path(root: &Path, file: &Path) -> Option<String> {
    let relative = file.strip_prefix(root).ok()?;
    let parts: Vec<String> = relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect();
    Some(parts.join("/"))
}

/// A directory on the local filesystem
#[derive(Debug, Clone)]
pub struct LocalStorage {
    root: PathBuf,
    url_prefix: String,
}

impl LocalStorage {
    /// Create a storage rooted at `root`, served under `url_prefix`
    pub fn new(root: impl Into<PathBuf>, url_prefix: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            url_prefix: url_prefix.into(),
        }
    }

    /// Root directory
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Absolute filesystem path for a storage path
    pub fn full_path(&self, path: &str) -> PathBuf {
        self.root.join(path.trim_start_matches('/'))
    }
}

impl Storage for LocalStorage {
    fn exists(&self, path: &str) -> bool {
        self.full_path(path).exists()
    }

    fn get(&self, path: &str) -> InhouseResult<Vec<u8>> {
        let full = self.full_path(path);
        fs::read(&full).map_err(|e| InhouseError::Read {
            path: full,
            source: e,
        })
    }

    fn put(&self, path: &str, contents: &[u8]) -> InhouseResult<()> {
        let full = self.full_path(path);
        if let Some(parent) = full.parent() {
            fs::create_dir_all(parent).map_err(|e| InhouseError::write(path, e))?;
        }
        fs::write(&full, contents).map_err(|e| InhouseError::write(path, e))
    }

    fn delete(&self, path: &str) -> InhouseResult<()> {
        let full = self.full_path(path);
        match fs::remove_file(&full) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(InhouseError::io(format!("deleting {}", full.display()), e)),
        }
    }

    fn delete_directory(&self, dir: &str) -> InhouseResult<()> {
        let full = self.full_path(dir);
        if !full.exists() {
            return Ok(());
        }
        fs::remove_dir_all(&full)
            .map_err(|e| InhouseError::io(format!("deleting directory {}", full.display()), e))
    }

    fn url(&self, path: &str) -> String {
        join_url(&self.url_prefix, path)
    }

    fn list_files(&self, dir: &str) -> InhouseResult<Vec<String>> {
        let full = self.full_path(dir);
        if !full.is_dir() {
            return Ok(Vec::new());
        }

        let entries = fs::read_dir(&full)
            .map_err(|e| InhouseError::io(format!("reading directory {}", full.display()), e))?;

        let mut files = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| InhouseError::io("reading directory entry", e))?;
            if entry.path().is_file() {
                if let Some(relative) = relative_path(&self.root, &entry.path()) {
                    files.push(relative);
                }
            }
        }
        files.sort();
        Ok(files)
    }
}

/// In-memory storage, shareable across threads and manager instances
#[derive(Debug, Default)]
pub struct MemoryStorage {
    files: RwLock<BTreeMap<String, Vec<u8>>>,
    url_prefix: String,
}

impl MemoryStorage {
    /// Create an empty storage served under `url_prefix`
    pub fn new(url_prefix: impl Into<String>) -> Self {
        Self {
            files: RwLock::new(BTreeMap::new()),
            url_prefix: url_prefix.into(),
        }
    }

    /// All stored paths
    pub fn paths(&self) -> Vec<String> {
        self.files
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect()
    }

    fn normalize(path: &str) -> String {
        path.trim_matches('/').to_string()
    }
}

impl Storage for MemoryStorage {
    fn exists(&self, path: &str) -> bool {
        let path = Self::normalize(path);
        let dir = format!("{}/", path);
        let files = self.files.read().unwrap_or_else(PoisonError::into_inner);
        files.contains_key(&path) || files.keys().any(|key| key.starts_with(&dir))
    }

    fn get(&self, path: &str) -> InhouseResult<Vec<u8>> {
        let path = Self::normalize(path);
        self.files
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&path)
            .cloned()
            .ok_or_else(|| InhouseError::Read {
                path: PathBuf::from(&path),
                source: std::io::Error::new(std::io::ErrorKind::NotFound, "no such file"),
            })
    }

    fn put(&self, path: &str, contents: &[u8]) -> InhouseResult<()> {
        self.files
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(Self::normalize(path), contents.to_vec());
        Ok(())
    }

    fn delete(&self, path: &str) -> InhouseResult<()> {
        self.files
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&Self::normalize(path));
        Ok(())
    }

    fn delete_directory(&self, dir: &str) -> InhouseResult<()> {
        let prefix = format!("{}/", Self::normalize(dir));
        self.files
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .retain(|key, _| !key.starts_with(&prefix));
        Ok(())
    }

    fn url(&self, path: &str) -> String {
        join_url(&self.url_prefix, path)
    }

    fn list_files(&self, dir: &str) -> InhouseResult<Vec<String>> {
        let prefix = format!("{}/", Self::normalize(dir));
        Ok(self
            .files
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .filter(|key| {
                key.strip_prefix(&prefix)
                    .is_some_and(|rest| !rest.is_empty() && !rest.contains('/'))
            })
            .cloned()
            .collect())
    }
}

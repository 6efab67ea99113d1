//! Persisted index from asset name to cache entry
//!
//! The map lives in a single JSON sidecar file beside the cache tree. It is
//! read lazily on first use, mutated in memory, and written back once at
//! teardown when something changed.
//!
//! There is no locking around the sidecar: two processes internalizing the
//! same new asset may both write it, and the last flush wins. The bytes they
//! cache for one logical asset are expected to be identical.

use super::entry::{CacheEntry, StoredEntry};
use crate::error::InhouseResult;
use crate::storage::Storage;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, warn};

/// Name-to-entry index backed by a JSON sidecar file
pub struct CacheMap {
    storage: Arc<dyn Storage>,
    sidecar: String,
    enabled: bool,
    loaded: bool,
    dirty: bool,
    entries: BTreeMap<String, StoredEntry>,
}

impl CacheMap {
    /// Create a map persisted at `sidecar` (a storage-relative path).
    ///
    /// Nothing is read until the first lookup.
    pub fn new(storage: Arc<dyn Storage>, sidecar: impl Into<String>, enabled: bool) -> Self {
        Self {
            storage,
            sidecar: sidecar.into(),
            enabled,
            loaded: false,
            dirty: false,
            entries: BTreeMap::new(),
        }
    }

    /// Sidecar path for a cache base prefix: `inhouse/` maps to `inhouse.map.json`
    pub fn sidecar_path(base: &str) -> String {
        let base = base.trim_matches('/');
        if base.is_empty() {
            ".map.json".to_string()
        } else {
            format!("{}.map.json", base)
        }
    }

    /// Storage-relative path of the sidecar file
    pub fn sidecar(&self) -> &str {
        &self.sidecar
    }

    /// Whether the map is persisted at all
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Whether there are unsaved changes
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Look up the entry stored under `name`
    pub fn lookup(&mut self, name: &str) -> Option<CacheEntry> {
        if !self.enabled {
            return None;
        }
        self.ensure_loaded();

        self.entries
            .get(name)
            .cloned()
            .map(|stored| CacheEntry::from_stored(name, stored))
    }

    /// Insert or replace the entry for `entry.name()`
    pub fn put(&mut self, entry: &CacheEntry) {
        if !self.enabled {
            return;
        }
        self.ensure_loaded();

        self.entries.insert(entry.name().to_string(), entry.to_stored());
        self.dirty = true;
    }

    /// Drop the entry for `entry.name()`
    pub fn remove(&mut self, entry: &CacheEntry) {
        if !self.enabled {
            return;
        }
        self.ensure_loaded();

        if self.entries.remove(entry.name()).is_some() {
            self.dirty = true;
        }
    }

    /// All persisted entries, keyed by asset name
    pub fn snapshot(&mut self) -> &BTreeMap<String, StoredEntry> {
        if self.enabled {
            self.ensure_loaded();
        }
        &self.entries
    }

    /// Write the map to the sidecar file if enabled and dirty.
    ///
    /// Returns whether anything was written. On failure the in-memory map
    /// stays valid and dirty.
    pub fn flush(&mut self) -> InhouseResult<bool> {
        if !self.enabled || !self.dirty {
            return Ok(false);
        }

        let json = serde_json::to_string_pretty(&self.entries)?;
        self.storage.put(&self.sidecar, json.as_bytes())?;
        self.dirty = false;

        debug!("Saved {} cache map entries to {}", self.entries.len(), self.sidecar);
        Ok(true)
    }

    fn ensure_loaded(&mut self) {
        if self.loaded {
            return;
        }
        self.loaded = true;

        if !self.storage.exists(&self.sidecar) {
            debug!("No cache map at {}, starting empty", self.sidecar);
            return;
        }

        let raw = match self.storage.get(&self.sidecar) {
            Ok(raw) => raw,
            Err(e) => {
                warn!("Failed to read cache map {}: {}", self.sidecar, e);
                return;
            }
        };

        let parsed: BTreeMap<String, serde_json::Value> = match serde_json::from_slice(&raw) {
            Ok(parsed) => parsed,
            Err(e) => {
                warn!("Ignoring corrupt cache map {}: {}", self.sidecar, e);
                return;
            }
        };

        for (name, value) in parsed {
            match serde_json::from_value::<StoredEntry>(value) {
                Ok(stored) => {
                    self.entries.insert(name, stored);
                }
                Err(e) => warn!("Skipping cache map entry {}: {}", name, e),
            }
        }

        debug!("Loaded {} cache map entries from {}", self.entries.len(), self.sidecar);
    }
}

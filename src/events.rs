//! Cache events
//!
//! Every successful internalization is reported to a `CacheListener`. The
//! bundled `EventLog` appends JSON lines to `events.log` in the state directory.

use crate::asset::CacheEntry;
use crate::config::{schema::Config, ConfigManager};
use chrono::Utc;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::warn;

/// Event name written for a newly cached asset
pub const ASSET_CACHED: &str = "asset.cached";

/// Observer notified after an asset is written to the cache
pub trait CacheListener: Send + Sync {
    fn asset_cached(&self, entry: &CacheEntry);
}

/// Listener that ignores every event
#[derive(Debug, Default)]
pub struct NoopListener;

impl CacheListener for NoopListener {
    fn asset_cached(&self, _entry: &CacheEntry) {}
}

/// File-based event log that appends JSON lines
pub struct EventLog {
    enabled: bool,
    path: PathBuf,
    lock: Mutex<()>,
}

impl EventLog {
    /// Create an event log from config
    pub fn new(config: &Config) -> Self {
        Self::at(ConfigManager::event_log_path(), config.general.event_log)
    }

    /// Create an event log writing to `path`
    pub fn at(path: impl Into<PathBuf>, enabled: bool) -> Self {
        Self {
            enabled,
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    /// Log file location
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append an event as a JSON line.
    ///
    /// IO failures are logged and dropped.
    pub fn log(&self, event: &str, data: &serde_json::Value) {
        if !self.enabled {
            return;
        }

        let entry = serde_json::json!({
            "timestamp": Utc::now().to_rfc3339(),
            "event": event,
            "data": data,
        });

        let mut line = match serde_json::to_string(&entry) {
            Ok(s) => s,
            Err(e) => {
                warn!("Failed to serialize cache event: {}", e);
                return;
            }
        };
        line.push('\n');

        if let Err(e) = self.append(&line) {
            warn!("Failed to write event log: {}", e);
        }
    }

    fn append(&self, line: &str) -> std::io::Result<()> {
        let _guard = self.lock.lock().unwrap_or_else(|e| e.into_inner());

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;

        file.write_all(line.as_bytes())?;
        file.flush()
    }
}

impl CacheListener for EventLog {
    fn asset_cached(&self, entry: &CacheEntry) {
        self.log(
            ASSET_CACHED,
            &serde_json::json!({
                "name": entry.name(),
                "source": entry.source(),
                "disk_path": entry.disk_path(),
            }),
        );
    }
}

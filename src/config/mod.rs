//! Configuration management for inhouse

pub mod schema;

pub use schema::Config;

use crate::error::{InhouseError, InhouseResult};
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, info};

/// Project-local configuration file name
pub const LOCAL_CONFIG_FILE: &str = ".inhouse.toml";

/// Configuration manager
pub struct ConfigManager {
    config_path: PathBuf,
}

impl ConfigManager {
    /// Create a new config manager with default path
    pub fn new() -> Self {
        Self {
            config_path: Self::default_config_path(),
        }
    }

    /// Create a config manager with a custom path
    pub fn with_path(path: PathBuf) -> Self {
        Self { config_path: path }
    }

    /// Get the default config file path
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("inhouse")
            .join("config.toml")
    }

    /// Get the state directory path
    pub fn state_dir() -> PathBuf {
        dirs::state_dir()
            .or_else(dirs::data_local_dir)
            .unwrap_or_else(|| PathBuf::from("."))
            .join("inhouse")
    }

    /// Get the "asset cached" event log path
    pub fn event_log_path() -> PathBuf {
        Self::state_dir().join("events.log")
    }

    /// Find a project-local `.inhouse.toml`, walking up from `start`
    pub fn find_local_config(start: &Path) -> Option<PathBuf> {
        start
            .ancestors()
            .map(|dir| dir.join(LOCAL_CONFIG_FILE))
            .find(|candidate| candidate.is_file())
    }

    /// Load configuration, creating default if not exists
    pub async fn load(&self) -> InhouseResult<Config> {
        if !self.config_path.exists() {
            debug!("Config file not found, using defaults");
            return Ok(Config::default());
        }

        self.load_from_file(&self.config_path).await
    }

    /// Load configuration from a specific file
    pub async fn load_from_file(&self, path: &Path) -> InhouseResult<Config> {
        let content = read_config(path).await?;

        toml::from_str(&content).map_err(|e| InhouseError::ConfigInvalid {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })
    }

    /// Load the global configuration with a project-local file merged on top.
    ///
    /// Tables merge key by key; any other local value replaces the global one.
    /// A relative `paths.project_root` in the local file is anchored at the
    /// directory containing it.
    pub async fn load_merged(&self, local: Option<&Path>) -> InhouseResult<Config> {
        let Some(local) = local else {
            return self.load().await;
        };

        let mut merged = if self.config_path.exists() {
            parse_table(&self.config_path, &read_config(&self.config_path).await?)?
        } else {
            toml::Table::new()
        };
        let overlay = parse_table(local, &read_config(local).await?)?;
        merge_tables(&mut merged, overlay);

        let mut config: Config =
            toml::Value::Table(merged)
                .try_into()
                .map_err(|e: toml::de::Error| InhouseError::ConfigInvalid {
                    path: local.to_path_buf(),
                    reason: e.to_string(),
                })?;

        if config.paths.project_root.is_relative() {
            if let Some(dir) = local.parent() {
                config.paths.project_root = dir.join(&config.paths.project_root);
            }
        }

        debug!("Merged local config {}", local.display());
        Ok(config)
    }

    /// Save configuration to file
    pub async fn save(&self, config: &Config) -> InhouseResult<()> {
        self.ensure_config_dir().await?;

        let content = toml::to_string_pretty(config)?;
        fs::write(&self.config_path, content).await.map_err(|e| {
            InhouseError::io(
                format!("writing config to {}", self.config_path.display()),
                e,
            )
        })?;

        info!("Configuration saved to {}", self.config_path.display());
        Ok(())
    }

    /// Ensure the config directory exists
    async fn ensure_config_dir(&self) -> InhouseResult<()> {
        if let Some(parent) = self.config_path.parent() {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| InhouseError::ConfigDirCreate {
                    path: parent.to_path_buf(),
                    source: e,
                })?;
        }
        Ok(())
    }

    /// Get the config file path
    pub fn path(&self) -> &Path {
        &self.config_path
    }
}

impl Default for ConfigManager {
    fn default() -> Self {
        Self::new()
    }
}

async fn read_config(path: &Path) -> InhouseResult<String> {
    fs::read_to_string(path)
        .await
        .map_err(|e| InhouseError::io(format!("reading config from {}", path.display()), e))
}

fn parse_table(path: &Path, content: &str) -> InhouseResult<toml::Table> {
    content
        .parse::<toml::Table>()
        .map_err(|e| InhouseError::ConfigInvalid {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })
}

fn merge_tables(base: &mut toml::Table, overlay: toml::Table) {
    for (key, value) in overlay {
        match (base.get_mut(&key), value) {
            (Some(toml::Value::Table(existing)), toml::Value::Table(incoming)) => {
                merge_tables(existing, incoming);
            }
            (_, value) => {
                base.insert(key, value);
            }
        }
    }
}

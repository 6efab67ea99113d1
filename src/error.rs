//! Error types for inhouse
//!
//! All modules use `InhouseResult<T>` as their return type. The asset
//! manager itself never returns these to its callers: every failure on the
//! internalization path is folded into `Status::Invalid`.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for inhouse operations
pub type InhouseResult<T> = Result<T, InhouseError>;

/// All errors that can occur in inhouse
#[derive(Error, Debug)]
pub enum InhouseError {
    // Asset errors
    #[error("Could not read asset {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to fetch {url}: {reason}")]
    Fetch { url: String, reason: String },

    #[error("Failed to write cached asset {path}: {reason}")]
    Write { path: String, reason: String },

    #[error("Unrecognized or corrupt archive {path}: {reason}")]
    Archive { path: PathBuf, reason: String },

    #[error("Not a URL or a resolvable local path: {0}")]
    InvalidReference(String),

    // Configuration errors
    #[error("Invalid configuration at {path}: {reason}")]
    ConfigInvalid { path: PathBuf, reason: String },

    #[error("Failed to create config directory {path}: {source}")]
    ConfigDirCreate {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // IO errors
    #[error("IO error: {context}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    // Serialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("TOML serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    // General errors
    #[error("Internal error: {0}")]
    Internal(String),

    #[error("{0}")]
    User(String),
}

impl InhouseError {
    /// Create an IO error with context
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }

    /// Create a fetch error
    pub fn fetch(url: impl Into<String>, reason: impl ToString) -> Self {
        Self::Fetch {
            url: url.into(),
            reason: reason.to_string(),
        }
    }

    /// Create a cache write error
    pub fn write(path: impl Into<String>, reason: impl ToString) -> Self {
        Self::Write {
            path: path.into(),
            reason: reason.to_string(),
        }
    }

    /// Create an archive error
    pub fn archive(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        Self::Archive {
            path: path.into(),
            reason: reason.to_string(),
        }
    }

    /// Check if error is retryable
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Fetch { .. })
    }

    /// Get actionable hint for the error
    pub fn hint(&self) -> Option<&'static str> {
        match self {
            Self::Fetch { .. } => Some(
                "Check network access, or set cache.verify_tls = false for hosts with self-signed certificates",
            ),
            Self::InvalidReference(_) => {
                Some("Use a URL, a named asset, or a path inside paths.project_root")
            }
            Self::ConfigInvalid { .. } => Some("Run: inhouse config init --force"),
            Self::Write { .. } => Some("Check that cache.disk_root exists and is writable"),
            Self::Archive { .. } => Some("Supported archives: .zip, .tar, .tar.gz, .tar.bz2"),
            _ => None,
        }
    }
}

//! Outcome of an internalization call

use serde::Serialize;
use std::fmt;

/// What happened to an asset on a single internalization call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    /// Already processed in this process
    Loaded,
    /// A valid cached copy was reused
    InCache,
    /// Freshly fetched or copied into the cache
    Internalized,
    /// Source already lives in the public tree
    PublicFile,
    /// Not internalizable; the original reference was used
    Invalid,
    /// Caching suppressed; the original reference or code was used verbatim
    Disabled,
}

impl Status {
    /// Human-readable description
    pub fn message(&self) -> &'static str {
        match self {
            Self::Loaded => "Already loaded",
            Self::InCache => "Already in cache",
            Self::Internalized => "Internalized",
            Self::PublicFile => "Public file, no copy needed",
            Self::Invalid => "Not in a CDN or local filesystem, falling back to provided path",
            Self::Disabled => "Development mode active",
        }
    }

    /// Whether the asset is served from the local cache after this call
    pub fn is_cached(&self) -> bool {
        matches!(self, Self::InCache | Self::Internalized)
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Loaded => "loaded",
            Self::InCache => "in_cache",
            Self::Internalized => "internalized",
            Self::PublicFile => "public_file",
            Self::Invalid => "invalid",
            Self::Disabled => "disabled",
        };
        write!(f, "{}", name)
    }
}

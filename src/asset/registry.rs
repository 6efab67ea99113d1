//! Named assets: short aliases for a concrete source plus default attributes
//!
//! The first registration of a key wins. An optional override hook runs
//! once, lazily, before the first registration or lookup, so it can pin
//! sources that later `map` calls will not replace.

use super::entry::Attributes;
use indexmap::IndexMap;
use serde::Serialize;
use tracing::debug;

/// Source and default attributes behind an alias
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NamedAsset {
    pub source: String,
    pub attributes: Attributes,
}

/// Pre-seeds or replaces named assets before normal registration runs
pub trait AssetOverrides: Send + Sync {
    fn assets(&self, registry: &mut NamedAssetRegistry);
}

impl<F> AssetOverrides for F
where
    F: Fn(&mut NamedAssetRegistry) + Send + Sync,
{
    fn assets(&self, registry: &mut NamedAssetRegistry) {
        self(registry)
    }
}

/// In-memory alias table
#[derive(Default)]
pub struct NamedAssetRegistry {
    aliases: IndexMap<String, NamedAsset>,
    overrides: Option<Box<dyn AssetOverrides>>,
    overrides_applied: bool,
}

impl NamedAssetRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Install the override hook; it runs on first use of the registry
    pub fn with_overrides(mut self, overrides: Box<dyn AssetOverrides>) -> Self {
        self.overrides = Some(overrides);
        self.overrides_applied = false;
        self
    }

    /// Register `key`; a no-op if the key is already registered
    pub fn map(&mut self, key: &str, source: &str, attributes: Attributes) {
        self.apply_overrides();

        if self.aliases.contains_key(key) {
            debug!("Named asset {} already registered, keeping first source", key);
            return;
        }

        self.aliases.insert(
            key.to_string(),
            NamedAsset {
                source: source.to_string(),
                attributes,
            },
        );
    }

    /// Register or replace `key` unconditionally (for override hooks)
    pub fn replace(&mut self, key: &str, source: &str, attributes: Attributes) {
        self.aliases.insert(
            key.to_string(),
            NamedAsset {
                source: source.to_string(),
                attributes,
            },
        );
    }

    /// Resolve an alias
    pub fn get(&mut self, key: &str) -> Option<&NamedAsset> {
        self.apply_overrides();
        self.aliases.get(key)
    }

    /// All registered aliases in registration order
    pub fn all(&mut self) -> &IndexMap<String, NamedAsset> {
        self.apply_overrides();
        &self.aliases
    }

    /// Forget every alias; the override hook is not re-run
    pub fn clear(&mut self) {
        self.aliases.clear();
    }

    fn apply_overrides(&mut self) {
        if self.overrides_applied {
            return;
        }
        self.overrides_applied = true;

        if let Some(overrides) = self.overrides.take() {
            overrides.assets(self);
            debug!("Applied named asset overrides ({} aliases)", self.aliases.len());
            self.overrides = Some(overrides);
        }
    }
}

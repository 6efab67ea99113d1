//! Asset model: cache paths, fingerprints, entries, the persisted cache map
//! and the named asset registry.

pub mod entry;
pub mod hash;
pub mod map;
pub mod path;
pub mod registry;
pub mod status;

pub use entry::{is_url, AssetContext, AttrValue, Attributes, CacheEntry, SourceKind, StoredEntry};
pub use hash::{content_hash, with_hash};
pub use map::CacheMap;
pub use path::PathResolver;
pub use registry::{AssetOverrides, NamedAsset, NamedAssetRegistry};
pub use status::Status;

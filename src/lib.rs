//! Inhouse - front-end asset internalization
//!
//! Copies CDN-hosted and local assets into a content-stable local cache,
//! remembers where each one landed, and renders the HTML tag that points
//! at the cached copy.

pub mod archive;
pub mod asset;
pub mod cli;
pub mod config;
pub mod error;
pub mod events;
pub mod fetch;
pub mod manager;
pub mod render;
pub mod scan;
pub mod storage;
pub mod ui;

pub use asset::Status;
pub use error::{InhouseError, InhouseResult};
pub use manager::AssetManager;

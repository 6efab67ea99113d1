//! CLI command implementations

pub mod cache;
pub mod clear;
pub mod config;
pub mod internalize;
pub mod list;
pub mod named;

pub use cache::execute as cache;
pub use clear::execute as clear;
pub use config::execute as config;
pub use internalize::execute as internalize;
pub use list::execute as list;
pub use named::execute as named;

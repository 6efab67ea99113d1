//! CLI argument definitions using clap derive

use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Inhouse - front-end asset internalization
///
/// Copies CDN and local assets into a content-stable local cache and
/// serves them from there.
#[derive(Parser, Debug)]
#[command(name = "inhouse")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Increase verbosity (-v info, -vv debug)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    /// Configuration file path
    #[arg(short, long, global = true, env = "INHOUSE_CONFIG")]
    pub config: Option<PathBuf>,

    /// Skip local .inhouse.toml discovery
    #[arg(long, global = true)]
    pub no_local: bool,

    /// Force development mode on
    #[arg(long, global = true, env = "INHOUSE_DEV_MODE")]
    pub dev: bool,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Scan templates and internalize every asset they reference
    Cache(CacheArgs),

    /// Delete the asset cache and its map
    Clear(ClearArgs),

    /// List cached assets
    List(ListArgs),

    /// List named assets
    Named(NamedArgs),

    /// Internalize a single asset, archive or directory
    Internalize(InternalizeArgs),

    /// Show or initialize configuration
    Config(ConfigArgs),
}

/// Arguments for the cache command
#[derive(Parser, Debug)]
pub struct CacheArgs {
    /// Clear the cache before scanning
    #[arg(long)]
    pub fresh: bool,
}

/// Arguments for the clear command
#[derive(Parser, Debug)]
pub struct ClearArgs {
    /// Skip confirmation prompt
    #[arg(short, long)]
    pub yes: bool,
}

/// Arguments for the list command
#[derive(Parser, Debug)]
pub struct ListArgs {
    /// Output format
    #[arg(short, long, default_value = "table")]
    pub format: OutputFormat,
}

/// Arguments for the named command
#[derive(Parser, Debug)]
pub struct NamedArgs {
    /// Only show assets whose name or source contains this text
    #[arg(long)]
    pub filter: Option<String>,

    /// Output format
    #[arg(short, long, default_value = "table")]
    pub format: OutputFormat,
}

/// Arguments for the internalize command
#[derive(Parser, Debug)]
pub struct InternalizeArgs {
    /// Asset name, URL or path
    pub reference: String,

    /// Treat the reference as an archive and extract it into DIR
    #[arg(long, value_name = "DIR")]
    pub archive: Option<String>,

    /// Treat the reference as a directory and copy it into DIR
    #[arg(long, value_name = "DIR", conflicts_with = "archive")]
    pub directory: Option<String>,

    /// Print the HTML tag for the asset
    #[arg(long, conflicts_with_all = ["archive", "directory"])]
    pub tag: bool,
}

/// Arguments for the config command
#[derive(Parser, Debug)]
pub struct ConfigArgs {
    /// Subcommand for config
    #[command(subcommand)]
    pub action: Option<ConfigAction>,
}

/// Config subcommands
#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Show current configuration
    Show,

    /// Show configuration file path
    Path,

    /// Initialize default configuration
    Init {
        /// Overwrite existing configuration
        #[arg(short, long)]
        force: bool,
    },
}

/// Output format for listing commands
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable table
    Table,
    /// JSON output
    Json,
    /// Simple text (one per line)
    Plain,
}

//! Inhouse - front-end asset internalization
//!
//! CLI entry point that dispatches to subcommands.

use clap::Parser;
use console::style;
use inhouse::cli::args::{ConfigAction, ConfigArgs};
use inhouse::cli::{commands, Cli, Commands};
use inhouse::config::ConfigManager;
use inhouse::error::{InhouseError, InhouseResult};
use std::process::ExitCode;
use tracing::debug;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{} {}", style("Error:").red().bold(), e);
            if let Some(hint) = e.hint() {
                eprintln!("{} {}", style("Hint:").yellow(), hint);
            }
            ExitCode::FAILURE
        }
    }
}

async fn run() -> InhouseResult<()> {
    let cli = Cli::parse();
    inhouse::ui::init_theme();

    let config_manager = match cli.config {
        Some(ref path) => ConfigManager::with_path(path.clone()),
        None => ConfigManager::new(),
    };

    // Config init must work even when the existing file no longer parses
    if let Commands::Config(ConfigArgs {
        action: Some(ConfigAction::Init { force }),
    }) = cli.command
    {
        init_logging(cli.verbose, false);
        return commands::config::init_config(&config_manager, force).await;
    }

    let local_config_path = if cli.no_local {
        None
    } else {
        let cwd = std::env::current_dir()
            .map_err(|e| InhouseError::io("getting current directory", e))?;
        ConfigManager::find_local_config(&cwd)
    };

    let mut config = config_manager
        .load_merged(local_config_path.as_deref())
        .await?;

    if cli.dev {
        config.cache.dev_mode = true;
    }

    let verbose = match cli.verbose {
        0 if config.general.verbose => 1,
        n => n,
    };
    init_logging(verbose, config.general.log_format == "json");

    if let Some(ref path) = local_config_path {
        debug!("Using local config: {}", path.display());
    }
    debug!("Project root: {}", config.project_root().display());

    match cli.command {
        Commands::Cache(args) => commands::cache(args, &config).await,
        Commands::Clear(args) => commands::clear(args, &config).await,
        Commands::List(args) => commands::list(args, &config).await,
        Commands::Named(args) => commands::named(args, &config).await,
        Commands::Internalize(args) => commands::internalize(args, &config).await,
        Commands::Config(args) => commands::config(args, &config_manager, &config).await,
    }
}

/// Install the tracing subscriber: 0 = warn (spinners only), 1 = info, 2+ = debug
fn init_logging(verbose: u8, json: bool) {
    let filter = match verbose {
        0 => EnvFilter::new("inhouse=warn"),
        1 => EnvFilter::new("inhouse=info"),
        _ => EnvFilter::new("inhouse=debug"),
    };

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr);

    if json {
        builder.json().init();
    } else {
        builder.without_time().init();
    }
}

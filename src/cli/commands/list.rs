//! List command - show the cache map

use crate::asset::{CacheMap, StoredEntry};
use crate::cli::args::{ListArgs, OutputFormat};
use crate::config::Config;
use crate::error::InhouseResult;
use crate::storage::{LocalStorage, Storage};
use crate::ui::{self, UiContext};
use console::style;
use serde::Serialize;
use std::sync::Arc;

/// One cached asset as listed
#[derive(Debug, Serialize)]
struct CachedAsset<'a> {
    name: &'a str,
    source: &'a str,
    disk_path: &'a str,
    url: String,
    present: bool,
}

/// Execute the list command
pub async fn execute(args: ListArgs, config: &Config) -> InhouseResult<()> {
    let storage: Arc<dyn Storage> = Arc::new(LocalStorage::new(
        config.disk_root(),
        config.cache.url.clone(),
    ));
    let mut map = CacheMap::new(
        storage.clone(),
        CacheMap::sidecar_path(&config.cache.path),
        config.cache.cache_map,
    );

    let assets: Vec<CachedAsset> = map
        .snapshot()
        .iter()
        .map(|(name, entry)| describe(storage.as_ref(), name, entry))
        .collect();

    if assets.is_empty() {
        match args.format {
            OutputFormat::Json => println!("[]"),
            OutputFormat::Plain => {}
            OutputFormat::Table => {
                let ctx = UiContext::detect();
                ui::step_info(&ctx, "No cached assets");
            }
        }
        return Ok(());
    }

    match args.format {
        OutputFormat::Table => print_table(&assets),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&assets)?),
        OutputFormat::Plain => {
            for asset in &assets {
                println!("{}", asset.name);
            }
        }
    }

    Ok(())
}

fn describe<'a>(storage: &dyn Storage, name: &'a str, entry: &'a StoredEntry) -> CachedAsset<'a> {
    CachedAsset {
        name,
        source: &entry.asset_path,
        disk_path: &entry.asset_disk_path,
        url: storage.url(&entry.asset_disk_path),
        present: storage.exists(&entry.asset_disk_path),
    }
}

fn print_table(assets: &[CachedAsset]) {
    let ctx = UiContext::detect();
    ui::intro(&ctx, "Cached assets");

    println!(
        "{:<40} {:<9} {:<50}",
        style("NAME").bold(),
        style("STATE").bold(),
        style("URL").bold()
    );
    println!("{}", "-".repeat(99));

    for asset in assets {
        let state = if asset.present {
            style("cached").green()
        } else {
            style("missing").red()
        };
        println!("{:<40} {:<9} {:<50}", asset.name, state, asset.url);
    }

    println!();
    println!("{} asset(s)", assets.len());
}

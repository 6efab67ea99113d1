//! Named command - list named assets

use crate::asset::NamedAsset;
use crate::cli::args::{NamedArgs, OutputFormat};
use crate::config::Config;
use crate::error::InhouseResult;
use crate::manager::AssetManager;
use crate::ui::{self, UiContext};
use console::style;
use serde::Serialize;

#[derive(Debug, Serialize)]
struct NamedRow<'a> {
    name: &'a str,
    #[serde(flatten)]
    asset: &'a NamedAsset,
}

/// Execute the named command
pub async fn execute(args: NamedArgs, config: &Config) -> InhouseResult<()> {
    let mut manager = AssetManager::from_config(config);
    let rows: Vec<NamedRow> = manager
        .named_assets()
        .iter()
        .filter(|(name, asset)| matches_filter(args.filter.as_deref(), name, asset))
        .map(|(name, asset)| NamedRow { name, asset })
        .collect();

    match args.format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&rows)?),
        OutputFormat::Plain => {
            for row in &rows {
                println!("{}", row.name);
            }
        }
        OutputFormat::Table => {
            let ctx = UiContext::detect();
            if rows.is_empty() {
                ui::step_info(&ctx, "No named assets");
                return Ok(());
            }

            ui::intro(&ctx, "Named assets");
            for row in &rows {
                println!("  {}", style(row.name).bold());
                println!("    {}", style(&row.asset.source).dim());
            }
            println!();
            println!("{} named asset(s)", rows.len());
        }
    }

    Ok(())
}

/// Case-insensitive match against the alias or its source
fn matches_filter(filter: Option<&str>, name: &str, asset: &NamedAsset) -> bool {
    let Some(filter) = filter else {
        return true;
    };
    let filter = filter.to_lowercase();
    name.to_lowercase().contains(&filter) || asset.source.to_lowercase().contains(&filter)
}

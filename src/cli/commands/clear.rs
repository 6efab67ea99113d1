//! Clear command - delete the asset cache

use crate::asset::CacheMap;
use crate::cli::args::ClearArgs;
use crate::config::Config;
use crate::error::{InhouseError, InhouseResult};
use crate::storage::{LocalStorage, Storage};
use crate::ui::{self, UiContext};
use tracing::debug;

/// Execute the clear command
pub async fn execute(args: ClearArgs, config: &Config) -> InhouseResult<()> {
    let ctx = UiContext::detect().with_auto_yes(args.yes);
    let storage = LocalStorage::new(config.disk_root(), config.cache.url.clone());
    let target = storage.full_path(&config.cache.path);

    ui::intro(&ctx, "Clearing cache");
    ui::key_value(&ctx, "Cache", &target.display().to_string());

    if !target.exists() && !storage.exists(&CacheMap::sidecar_path(&config.cache.path)) {
        ui::step_warn(&ctx, "Cache is already empty");
        return Ok(());
    }

    if !ui::confirm(&ctx, "Delete every cached asset?", false).await? {
        ui::outro_warn(&ctx, "Nothing deleted (pass --yes to skip the prompt)");
        return Ok(());
    }

    clear_cache(&storage, &config.cache.path)?;

    ui::outro_success(&ctx, "Cache cleared");
    Ok(())
}

/// Remove the cache tree below `base` and its sidecar map, then recreate
/// the empty base directory
pub fn clear_cache(storage: &LocalStorage, base: &str) -> InhouseResult<()> {
    storage.delete_directory(base)?;

    let root = storage.full_path(base);
    std::fs::create_dir_all(&root)
        .map_err(|e| InhouseError::io(format!("creating {}", root.display()), e))?;

    let sidecar = CacheMap::sidecar_path(base);
    storage.delete(&sidecar)?;
    debug!("Removed {} and {}", base, sidecar);

    Ok(())
}

//! Cache command - scan templates and internalize every asset they reference

use crate::asset::Status;
use crate::cli::args::CacheArgs;
use crate::cli::commands::clear::clear_cache;
use crate::config::Config;
use crate::error::{InhouseError, InhouseResult};
use crate::manager::AssetManager;
use crate::render::NullRenderer;
use crate::scan::{self, Directive, Request};
use crate::storage::LocalStorage;
use crate::ui::{self, CacheProgress, UiContext};
use std::collections::BTreeMap;
use tracing::debug;

/// Outcome of one directive
struct Outcome {
    directive: Directive,
    status: Status,
}

/// Execute the cache command
pub async fn execute(args: CacheArgs, config: &Config) -> InhouseResult<()> {
    let ctx = UiContext::detect();
    ui::intro(&ctx, "Caching assets");

    if args.fresh {
        let storage = LocalStorage::new(config.disk_root(), config.cache.url.clone());
        clear_cache(&storage, &config.cache.path)?;
        ui::step_ok(&ctx, "Cleared existing cache");
    }

    let view_paths: Vec<_> = config
        .scan
        .view_paths
        .iter()
        .map(|path| config.resolve(path))
        .collect();
    let report = scan::scan(&view_paths, &config.scan.extensions)?;

    ui::step_info(
        &ctx,
        &format!(
            "Found {} directive(s) in {} template(s)",
            report.directives.len(),
            report.files
        ),
    );
    for skipped in &report.skipped {
        ui::step_warn_hint(
            &ctx,
            &format!("{}:{} {}", skipped.file.display(), skipped.line, skipped.kind),
            &skipped.reason,
        );
    }

    if report.directives.is_empty() {
        ui::outro_warn(&ctx, "No assets to cache");
        return Ok(());
    }

    let progress = CacheProgress::new(&ctx, report.directives.len());
    let worker_progress = progress.clone();
    let config = config.clone();
    let directives = report.directives;

    let outcomes = tokio::task::spawn_blocking(move || {
        internalize_all(&config, directives, &worker_progress)
    })
    .await
    .map_err(|e| InhouseError::Internal(format!("cache task failed: {}", e)))??;
    progress.finish();

    summarize(&ctx, &outcomes);
    Ok(())
}

/// Internalize every directive with one manager, then flush the map once
fn internalize_all(
    config: &Config,
    directives: Vec<Directive>,
    progress: &CacheProgress,
) -> InhouseResult<Vec<Outcome>> {
    let mut manager = AssetManager::from_config(config).with_renderer(Box::new(NullRenderer));
    let mut outcomes = Vec::with_capacity(directives.len());

    for directive in directives {
        let reference = directive.request.reference().to_string();
        progress.start_item(&reference);

        let status = match &directive.request {
            Request::Asset {
                reference,
                attributes,
            } => manager.internalize(reference, false, attributes.clone()),
            Request::Archive { reference, output } => {
                manager.internalize_archive(reference, output)
            }
            Request::Directory { reference, output } => {
                manager.internalize_directory(reference, output)
            }
        };
        debug!("{} {} -> {}", directive.request.kind(), reference, status);

        progress.finish_item(&reference, status);
        outcomes.push(Outcome { directive, status });
    }

    if manager.flush()? {
        debug!("Cache map written");
    }

    Ok(outcomes)
}

fn summarize(ctx: &UiContext, outcomes: &[Outcome]) {
    let mut counts: BTreeMap<String, usize> = BTreeMap::new();
    for outcome in outcomes {
        *counts.entry(outcome.status.to_string()).or_default() += 1;
    }
    for (status, count) in &counts {
        ui::key_value(ctx, status, &count.to_string());
    }

    let failed: Vec<&Outcome> = outcomes
        .iter()
        .filter(|o| o.status == Status::Invalid)
        .collect();

    for outcome in &failed {
        let location = format!(
            "{}:{}",
            outcome.directive.file.display(),
            outcome.directive.line
        );
        ui::step_error_detail(ctx, outcome.directive.request.reference(), &location);
    }

    if failed.is_empty() {
        ui::outro_success(ctx, &format!("Cached {} asset(s)", outcomes.len()));
    } else {
        ui::outro_warn(
            ctx,
            &format!("{} of {} asset(s) could not be cached", failed.len(), outcomes.len()),
        );
    }
}

//! Internalize command - cache one asset, archive or directory

use crate::asset::{Attributes, Status};
use crate::cli::args::InternalizeArgs;
use crate::config::Config;
use crate::error::{InhouseError, InhouseResult};
use crate::manager::AssetManager;
use crate::render::NullRenderer;
use crate::ui::{self, TaskSpinner, UiContext};
use tracing::warn;

/// Execute the internalize command.
///
/// With `--tag` only the rendered HTML tag is printed, so the output can be
/// pasted into a template.
pub async fn execute(args: InternalizeArgs, config: &Config) -> InhouseResult<()> {
    let ctx = UiContext::detect();
    let reference = args.reference.clone();
    let tag = args.tag;

    let mut spinner = TaskSpinner::new(&ctx);
    if !tag {
        spinner.start(&format!("Internalizing {}", reference));
    }

    let config = config.clone();
    let (status, url) = tokio::task::spawn_blocking(move || internalize(&config, &args))
        .await
        .map_err(|e| InhouseError::Internal(format!("internalize task failed: {}", e)))?;

    match status {
        Status::Invalid => {
            if !tag {
                spinner.stop_error(status.message());
            }
            return Err(InhouseError::InvalidReference(reference));
        }
        _ if tag => {}
        _ => {
            spinner.stop(status.message());
            if status.is_cached() {
                ui::key_value(&ctx, "URL", &url);
            }
        }
    }

    Ok(())
}

/// Run the engine for one request; returns the status and the cached URL
fn internalize(config: &Config, args: &InternalizeArgs) -> (Status, String) {
    let mut manager = AssetManager::from_config(config);
    if !args.tag {
        manager = manager.with_renderer(Box::new(NullRenderer));
    }

    let (status, url) = match (&args.archive, &args.directory) {
        (Some(output), _) => {
            let status = manager.internalize_archive(&args.reference, output);
            (status, directory_url(&manager, output))
        }
        (None, Some(output)) => {
            let status = manager.internalize_directory(&args.reference, output);
            (status, directory_url(&manager, output))
        }
        (None, None) => {
            let status = manager.internalize(&args.reference, args.tag, Attributes::new());
            (status, manager.url(&args.reference))
        }
    };

    if let Err(e) = manager.flush() {
        warn!("Failed to persist cache map: {}", e);
    }

    (status, url)
}

fn directory_url(manager: &AssetManager, output_dir: &str) -> String {
    let path = manager.context().resolver.resolve(output_dir);
    manager.storage().url(&path)
}

//! Progress indicators with CI fallback

use super::context::UiContext;
use crate::asset::Status;
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

/// Longest reference shown next to the progress bar
const MAX_MESSAGE_CHARS: usize = 60;

/// A task spinner with CI fallback
pub struct TaskSpinner {
    spinner: Option<cliclack::ProgressBar>,
    interactive: bool,
}

impl TaskSpinner {
    pub fn new(ctx: &UiContext) -> Self {
        Self {
            spinner: None,
            interactive: ctx.use_fancy_output(),
        }
    }

    /// Start the spinner with a message
    pub fn start(&mut self, message: &str) {
        if self.interactive {
            let spinner = cliclack::spinner();
            spinner.start(message);
            self.spinner = Some(spinner);
        } else {
            println!("{} {}", style("...").dim(), message);
        }
    }

    /// Stop with success message
    pub fn stop(&mut self, message: &str) {
        if let Some(spinner) = self.spinner.take() {
            spinner.stop(message);
        } else if self.interactive {
            println!("{} {}", style("✓").green(), message);
        } else {
            println!("{} {}", style("[OK]").green(), message);
        }
    }

    /// Stop with error message
    pub fn stop_error(&mut self, message: &str) {
        if let Some(spinner) = self.spinner.take() {
            spinner.error(message);
        } else if self.interactive {
            println!("{} {}", style("✗").red(), message);
        } else {
            println!("{} {}", style("[FAIL]").red(), message);
        }
    }
}

/// Progress bar for a batch of internalizations.
///
/// Shows an indicatif bar in interactive mode and one line per asset in CI.
/// Clones share the same bar, so a clone can be moved onto a blocking task.
#[derive(Clone)]
pub struct CacheProgress {
    bar: Option<ProgressBar>,
}

impl CacheProgress {
    pub fn new(ctx: &UiContext, total: usize) -> Self {
        let bar = if ctx.use_fancy_output() {
            let bar = ProgressBar::new(total as u64);
            if let Ok(bar_style) = ProgressStyle::default_bar()
                .template("  {spinner:.cyan} Caching  {bar:20.cyan/dim} {pos}/{len} {msg:.dim}  {elapsed:.dim}")
            {
                bar.set_style(
                    bar_style
                        .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏ ")
                        .progress_chars("━╸─"),
                );
            }
            bar.enable_steady_tick(Duration::from_millis(120));
            Some(bar)
        } else {
            println!("Caching {} asset(s)...", total);
            None
        };
        Self { bar }
    }

    /// Announce the asset about to be processed
    pub fn start_item(&self, reference: &str) {
        if let Some(ref bar) = self.bar {
            bar.set_message(shorten(reference, MAX_MESSAGE_CHARS));
        }
    }

    /// Record the outcome of one asset
    pub fn finish_item(&self, reference: &str, status: Status) {
        match self.bar {
            Some(ref bar) => bar.inc(1),
            None => println!("  {:<14} {}", status_label(status), reference),
        }
    }

    /// Finish and clear the progress bar
    pub fn finish(&self) {
        if let Some(ref bar) = self.bar {
            bar.disable_steady_tick();
            bar.finish_and_clear();
        }
    }
}

fn status_label(status: Status) -> String {
    let label = format!("[{}]", status);
    match status {
        Status::Internalized | Status::InCache => style(label).green().to_string(),
        Status::Invalid => style(label).red().to_string(),
        Status::Disabled => style(label).yellow().to_string(),
        Status::Loaded | Status::PublicFile => style(label).dim().to_string(),
    }
}

/// Truncate to `max` characters, marking the cut with `...`
fn shorten(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_string();
    }
    let kept: String = text.chars().take(max.saturating_sub(3)).collect();
    format!("{}...", kept)
}

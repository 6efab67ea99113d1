//! Terminal output for the CLI
//!
//! Uses `cliclack` for framed output and prompts, with automatic fallback to
//! plain, line-oriented output in CI and other non-interactive environments.
//!
//! # Example
//!
//! ```rust,ignore
//! use inhouse::ui::{self, UiContext};
//!
//! let ctx = UiContext::detect().with_auto_yes(args.yes);
//!
//! ui::intro(&ctx, "Clearing cache");
//! if ui::confirm(&ctx, "Delete every cached asset?", false).await? {
//!     // ... delete ...
//!     ui::outro_success(&ctx, "Cache cleared");
//! }
//! ```

mod context;
mod output;
mod progress;
mod prompts;
mod theme;

pub use context::UiContext;
pub use output::{
    intro, key_value, outro_success, outro_warn, step_error_detail, step_info, step_ok,
    step_ok_detail, step_warn, step_warn_hint,
};
pub use progress::{CacheProgress, TaskSpinner};
pub use prompts::confirm;
pub use theme::{init_theme, InhouseTheme};

//! Output functions for consistent CLI formatting
//!
//! Interactive terminals get cliclack's framed log lines; everything else
//! gets one plain line per step with a bracketed level tag.

use super::context::UiContext;
use console::{style, StyledObject};

#[derive(Debug, Clone, Copy)]
enum Level {
    Ok,
    Warn,
    Fail,
    Info,
}

impl Level {
    fn tag(self) -> StyledObject<&'static str> {
        match self {
            Self::Ok => style("[OK]").green(),
            Self::Warn => style("[WARN]").yellow(),
            Self::Fail => style("[FAIL]").red(),
            Self::Info => style("[INFO]").cyan(),
        }
    }

    fn log(self, message: String) {
        let _ = match self {
            Self::Ok => cliclack::log::success(message),
            Self::Warn => cliclack::log::warning(message),
            Self::Fail => cliclack::log::error(message),
            Self::Info => cliclack::log::info(message),
        };
    }
}

fn step(ctx: &UiContext, level: Level, message: String) {
    if ctx.use_fancy_output() {
        level.log(message);
    } else {
        println!("  {} {}", level.tag(), message);
    }
}

/// Display intro banner
pub fn intro(ctx: &UiContext, title: &str) {
    if ctx.use_fancy_output() {
        cliclack::intro(style(title).blue().bold()).ok();
    } else {
        println!("{}", style(title).blue().bold());
        println!();
    }
}

/// Display success outro
pub fn outro_success(ctx: &UiContext, message: &str) {
    outro(ctx, Level::Ok, style(message).green().bold());
}

/// Display warning outro
pub fn outro_warn(ctx: &UiContext, message: &str) {
    outro(ctx, Level::Warn, style(message).yellow().bold());
}

fn outro(ctx: &UiContext, level: Level, message: StyledObject<&str>) {
    if ctx.use_fancy_output() {
        cliclack::outro(message).ok();
    } else {
        println!();
        println!("{} {}", level.tag(), message.force_styling(false));
    }
}

pub fn step_ok(ctx: &UiContext, message: &str) {
    step(ctx, Level::Ok, message.to_string());
}

pub fn step_ok_detail(ctx: &UiContext, message: &str, detail: &str) {
    let detail = if ctx.use_fancy_output() {
        style(detail).dim().to_string()
    } else {
        detail.to_string()
    };
    step(ctx, Level::Ok, format!("{} ({})", message, detail));
}

pub fn step_warn(ctx: &UiContext, message: &str) {
    step(ctx, Level::Warn, message.to_string());
}

pub fn step_warn_hint(ctx: &UiContext, message: &str, hint: &str) {
    let hint = if ctx.use_fancy_output() {
        style(hint).dim().to_string()
    } else {
        hint.to_string()
    };
    step(ctx, Level::Warn, format!("{} - {}", message, hint));
}

pub fn step_error_detail(ctx: &UiContext, message: &str, detail: &str) {
    let detail = if ctx.use_fancy_output() {
        style(detail).red().to_string()
    } else {
        detail.to_string()
    };
    step(ctx, Level::Fail, format!("{}: {}", message, detail));
}

pub fn step_info(ctx: &UiContext, message: &str) {
    step(ctx, Level::Info, message.to_string());
}

/// Print styled key-value pair
pub fn key_value(ctx: &UiContext, key: &str, value: &str) {
    if ctx.use_fancy_output() {
        println!("  {}: {}", style(key).dim(), value);
    } else {
        println!("  {}: {}", key, value);
    }
}

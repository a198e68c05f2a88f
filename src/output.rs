//! Terminal output settings shared by every renderer.
//!
//! Honors `NO_COLOR` (no ANSI colors) and `--no-unicode` (ASCII-only trees
//! and rules).

use std::sync::atomic::{AtomicBool, Ordering};

static NO_UNICODE: AtomicBool = AtomicBool::new(false);
static COLORS_ENABLED: AtomicBool = AtomicBool::new(true);
static QUIET: AtomicBool = AtomicBool::new(false);

pub struct OutputConfig;

impl OutputConfig {
    /// Call once at startup after parsing args.
    pub fn configure(no_unicode: bool, quiet: bool) {
        NO_UNICODE.store(no_unicode, Ordering::Relaxed);
        QUIET.store(quiet, Ordering::Relaxed);
        let no_color = std::env::var("NO_COLOR")
            .map(|v| !v.trim().is_empty())
            .unwrap_or(false);
        COLORS_ENABLED.store(!no_color, Ordering::Relaxed);
    }

    #[inline]
    pub fn no_unicode() -> bool {
        NO_UNICODE.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn colors_enabled() -> bool {
        COLORS_ENABLED.load(Ordering::Relaxed)
    }

    pub fn set_colors_enabled(enabled: bool) {
        COLORS_ENABLED.store(enabled, Ordering::Relaxed);
    }

    /// Status lines and progress bars are suppressed with `--quiet`.
    #[inline]
    pub fn quiet() -> bool {
        QUIET.load(Ordering::Relaxed)
    }

    pub fn rule_line(len: usize) -> String {
        "-".repeat(len)
    }

    pub fn double_rule_line(len: usize) -> String {
        if Self::no_unicode() {
            "=".repeat(len)
        } else {
            "\u{2550}".repeat(len)
        }
    }

    /// Marker placed before list items.
    pub fn bullet() -> &'static str {
        if Self::no_unicode() {
            "*"
        } else {
            "\u{2022}"
        }
    }
}

/// Text labels so status stays readable without color.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StatusLabel {
    Pass,
    Fail,
    Info,
    Warning,
    Skip,
}

impl StatusLabel {
    pub fn as_str(self) -> &'static str {
        match self {
            StatusLabel::Pass => "[PASS]",
            StatusLabel::Fail => "[FAIL]",
            StatusLabel::Info => "[INFO]",
            StatusLabel::Warning => "[WARN]",
            StatusLabel::Skip => "[SKIP]",
        }
    }
}

#![deny(missing_docs)]
//! Shared logging utilities for the tag QA workspace.
//!
//! This crate provides the `engine_*` logging macros used across the codebase,
//! a process-wide run scope that prefixes every message while a sweep is
//! active, and a minimal test initializer for the global logger.

use std::sync::RwLock;

static RUN_SCOPE: RwLock<Option<String>> = RwLock::new(None);

/// Sets the label prepended to every `engine_*` message, e.g. `url 2/5`.
///
/// The run controller sets this once per URL so interleaved output from the
/// engine thread and the foreground loop can be attributed to a URL.
pub fn set_run_scope(label: impl Into<String>) {
    if let Ok(mut scope) = RUN_SCOPE.write() {
        *scope = Some(label.into());
    }
}

/// Clears the run scope label.
pub fn clear_run_scope() {
    if let Ok(mut scope) = RUN_SCOPE.write() {
        *scope = None;
    }
}

/// Returns the current run scope label, if one is set.
pub fn run_scope() -> Option<String> {
    RUN_SCOPE.read().ok().and_then(|scope| scope.clone())
}

#[doc(hidden)]
pub fn scope_prefix() -> String {
    match run_scope() {
        Some(label) => format!("[{label}] "),
        None => String::new(),
    }
}

/// Logs a trace-level message using the global logging facade.
#[macro_export]
macro_rules! engine_trace {
    ($($arg:tt)*) => {{
        log::trace!("{}{}", $crate::scope_prefix(), format_args!($($arg)*));
    }};
}

/// Logs an info-level message using the global logging facade.
#[macro_export]
macro_rules! engine_info {
    ($($arg:tt)*) => {{
        log::info!("{}{}", $crate::scope_prefix(), format_args!($($arg)*));
    }};
}

/// Logs a debug-level message using the global logging facade.
#[macro_export]
macro_rules! engine_debug {
    ($($arg:tt)*) => {{
        log::debug!("{}{}", $crate::scope_prefix(), format_args!($($arg)*));
    }};
}

/// Logs a warn-level message using the global logging facade.
#[macro_export]
macro_rules! engine_warn {
    ($($arg:tt)*) => {{
        log::warn!("{}{}", $crate::scope_prefix(), format_args!($($arg)*));
    }};
}

/// Logs an error-level message using the global logging facade.
#[macro_export]
macro_rules! engine_error {
    ($($arg:tt)*) => {{
        log::error!("{}{}", $crate::scope_prefix(), format_args!($($arg)*));
    }};
}

/// Default level for this build: debug in debug builds, info in release builds.
pub fn default_level() -> log::LevelFilter {
    if cfg!(debug_assertions) {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Info
    }
}

/// Initializes a simple terminal logger for use in unit tests.
///
/// This safely no-ops if another logger has already been initialized.
pub fn initialize_for_tests() {
    use simplelog::{ColorChoice, CombinedLogger, Config, TermLogger, TerminalMode};

    // Ignore the error if a logger was already set by another test.
    let _ = CombinedLogger::init(vec![TermLogger::new(
        default_level(),
        Config::default(),
        TerminalMode::Mixed,
        ColorChoice::Auto,
    )]);
}

//! Logging facilities for Horizon Rowstore.
//!
//! This module provides:
//! - Target and span names for filtering `tracing` output per subsystem
//! - [`PerfSpan`], a guard for timing hot operations
//! - [`warn_once`], a process-wide registry for warnings that should only be
//!   logged the first time they happen
//!
//! # Tracing Integration
//!
//! Horizon Rowstore uses the `tracing` crate for instrumentation. To see logs,
//! install a subscriber in your application:
//!
//! ```ignore
//! tracing_subscriber::fmt()
//!     .with_env_filter("horizon_rowstore=debug")
//!     .init();
//! ```

use std::collections::HashSet;
use std::sync::OnceLock;

use parking_lot::Mutex;

/// Span names used throughout Horizon Rowstore for tracing.
pub mod span_names {
    /// Performance span for timed operations.
    pub const PERF: &str = "horizon_rowstore::perf";
}

/// Target names for log filtering.
///
/// Use these with `tracing` directives to filter logs by subsystem.
pub mod targets {
    /// Core infrastructure target.
    pub const CORE: &str = "horizon_rowstore_core";
    /// Signal/slot system target.
    pub const SIGNAL: &str = "horizon_rowstore_core::signal";
    /// Cooperative task queue target.
    pub const TASK: &str = "horizon_rowstore_core::task";
    /// Row store lifecycle target.
    pub const STORE: &str = "horizon_rowstore::store";
    /// Datasource loading target.
    pub const LOAD: &str = "horizon_rowstore::load";
    /// Transaction application target.
    pub const TRANSACTION: &str = "horizon_rowstore::transaction";
    /// Display index allocation target.
    pub const DISPLAY: &str = "horizon_rowstore::display";
}

/// A guard that keeps a tracing span entered until dropped.
///
/// This is useful for tracking the duration of operations.
#[derive(Debug)]
pub struct PerfSpan {
    _span: tracing::span::EnteredSpan,
}

impl PerfSpan {
    /// Create a new performance span.
    ///
    /// The span will be active until the guard is dropped.
    pub fn new(name: &'static str) -> Self {
        let span = tracing::info_span!(target: span_names::PERF, "perf", operation = name);
        Self {
            _span: span.entered(),
        }
    }
}

fn warned_categories() -> &'static Mutex<HashSet<&'static str>> {
    static WARNED: OnceLock<Mutex<HashSet<&'static str>>> = OnceLock::new();
    WARNED.get_or_init(|| Mutex::new(HashSet::new()))
}

/// Record that a warning category is about to be logged.
///
/// Returns `true` the first time a category is seen in this process and
/// `false` afterwards. Callers log only when this returns `true`.
pub fn warn_once(category: &'static str) -> bool {
    warned_categories().lock().insert(category)
}

/// Forget every category recorded by [`warn_once`].
///
/// Mostly useful in tests that assert on once-only warnings.
pub fn reset_warn_once() {
    warned_categories().lock().clear();
}

/// Macros for common tracing patterns.
///
/// These are wrappers around the `tracing` crate macros with consistent
/// target naming. The calling crate must depend on `tracing`.
#[macro_export]
macro_rules! rowstore_trace {
    ($($arg:tt)*) => {
        tracing::trace!(target: "horizon_rowstore", $($arg)*)
    };
}

#[macro_export]
macro_rules! rowstore_debug {
    ($($arg:tt)*) => {
        tracing::debug!(target: "horizon_rowstore", $($arg)*)
    };
}

#[macro_export]
macro_rules! rowstore_info {
    ($($arg:tt)*) => {
        tracing::info!(target: "horizon_rowstore", $($arg)*)
    };
}

#[macro_export]
macro_rules! rowstore_warn {
    ($($arg:tt)*) => {
        tracing::warn!(target: "horizon_rowstore", $($arg)*)
    };
}

#[macro_export]
macro_rules! rowstore_error {
    ($($arg:tt)*) => {
        tracing::error!(target: "horizon_rowstore", $($arg)*)
    };
}

/// Log a warning at most once per process for the given category.
///
/// ```ignore
/// rowstore_warn_once!("RowStore.noData", "datasource returned no row data");
/// ```
#[macro_export]
macro_rules! rowstore_warn_once {
    ($category:expr, $($arg:tt)*) => {
        if $crate::logging::warn_once($category) {
            tracing::warn!(target: "horizon_rowstore", $($arg)*);
        }
    };
}

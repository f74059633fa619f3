//! Logging for the Glacier dialect layer.
//!
//! Output is controlled by environment variables:
//!
//! - `GLACIER_DEBUG=true|1|yes` - Enable debug logging
//! - `GLACIER_LOG_LEVEL=trace|debug|info|warn|error` - Set a specific log level
//! - `GLACIER_LOG_FORMAT=json|pretty|compact` - Set the output format (default: json)
//!
//! ```rust,no_run
//! use glacier_query::logging;
//!
//! // Call once at startup
//! logging::init();
//! ```
//!
//! The generators emit `tracing` events under the `glacier_*` targets, so an
//! application that installs its own subscriber does not need [`init`].

use std::env;
use std::sync::Once;

static INIT: Once = Once::new();

/// Check if debug logging is enabled via `GLACIER_DEBUG`.
#[inline]
pub fn is_debug_enabled() -> bool {
    env::var("GLACIER_DEBUG")
        .map(|v| matches!(v.to_lowercase().as_str(), "true" | "1" | "yes"))
        .unwrap_or(false)
}

/// Get the configured log level from `GLACIER_LOG_LEVEL`.
///
/// Defaults to "debug" if `GLACIER_DEBUG` is enabled, otherwise "warn".
pub fn get_log_level() -> &'static str {
    let fallback = if is_debug_enabled() { "debug" } else { "warn" };
    match env::var("GLACIER_LOG_LEVEL") {
        Ok(level) => match level.to_lowercase().as_str() {
            "trace" => "trace",
            "debug" => "debug",
            "info" => "info",
            "warn" => "warn",
            "error" => "error",
            _ => fallback,
        },
        Err(_) => fallback,
    }
}

/// Get the configured log format from `GLACIER_LOG_FORMAT`.
pub fn get_log_format() -> &'static str {
    env::var("GLACIER_LOG_FORMAT")
        .map(|f| match f.to_lowercase().as_str() {
            "pretty" => "pretty",
            "compact" => "compact",
            _ => "json",
        })
        .unwrap_or("json")
}

/// Initialize logging. Subsequent calls are no-ops.
///
/// Without the `tracing-subscriber` feature this only records that
/// initialization happened; events go to whatever subscriber the host installs.
pub fn init() {
    INIT.call_once(|| {
        if !is_debug_enabled() && env::var("GLACIER_LOG_LEVEL").is_err() {
            return;
        }

        #[cfg(feature = "tracing-subscriber")]
        {
            use tracing_subscriber::{EnvFilter, fmt, prelude::*};

            let level = get_log_level();
            let filter = EnvFilter::try_new(format!(
                "glacier={},glacier_types={},glacier_query={},glacier_migrate={}",
                level, level, level, level
            ))
            .unwrap_or_else(|_| EnvFilter::new("warn"));

            // try_init: a host subscriber may already be installed
            let installed = match get_log_format() {
                "json" => tracing_subscriber::registry()
                    .with(filter)
                    .with(fmt::layer().json())
                    .try_init(),
                "compact" => tracing_subscriber::registry()
                    .with(filter)
                    .with(fmt::layer().compact())
                    .try_init(),
                _ => tracing_subscriber::registry()
                    .with(filter)
                    .with(fmt::layer().pretty())
                    .try_init(),
            };

            if installed.is_ok() {
                tracing::info!(
                    level = level,
                    format = get_log_format(),
                    "Glacier logging initialized"
                );
            }
        }
    });
}

/// Log rendered SQL at debug level when `log_sql` is on or `GLACIER_DEBUG` is set.
#[macro_export]
macro_rules! glacier_sql {
    ($enabled:expr, $($arg:tt)*) => {
        if $enabled || $crate::logging::is_debug_enabled() {
            tracing::debug!($($arg)*);
        }
    };
}

//! Structured logging.
//!
//! Events go to stderr so command output on stdout stays machine-readable.

use crate::{LogFormat, TelemetryConfig, TelemetryError};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

/// Initialize the logging subsystem.
///
/// Sets up tracing-subscriber with either JSON or pretty format,
/// respecting the configured log level unless `RUST_LOG` is set.
pub fn init_logging(config: &TelemetryConfig) -> Result<(), TelemetryError> {
    let filter = build_filter(config)?;

    match config.log_format {
        LogFormat::Json => init_json_logging(filter),
        LogFormat::Pretty => init_pretty_logging(filter),
    }
}

/// Filter from `RUST_LOG`, falling back to the configured level.
fn build_filter(config: &TelemetryConfig) -> Result<EnvFilter, TelemetryError> {
    match EnvFilter::try_from_default_env() {
        Ok(filter) => Ok(filter),
        Err(_) => EnvFilter::try_new(&config.log_level).map_err(|e| TelemetryError::InvalidLevel {
            level: config.log_level.clone(),
            reason: e.to_string(),
        }),
    }
}

fn init_json_logging(filter: EnvFilter) -> Result<(), TelemetryError> {
    let json_layer = fmt::layer()
        .json()
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_current_span(true)
        .with_span_list(false)
        .with_file(false)
        .with_line_number(false)
        .flatten_event(true)
        .with_filter(filter);

    tracing_subscriber::registry()
        .with(json_layer)
        .try_init()
        .map_err(|e: tracing_subscriber::util::TryInitError| {
            TelemetryError::LoggingInit(e.to_string())
        })
}

fn init_pretty_logging(filter: EnvFilter) -> Result<(), TelemetryError> {
    let pretty_layer = fmt::layer()
        .pretty()
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_file(true)
        .with_line_number(true)
        .with_filter(filter);

    tracing_subscriber::registry()
        .with(pretty_layer)
        .try_init()
        .map_err(|e: tracing_subscriber::util::TryInitError| {
            TelemetryError::LoggingInit(e.to_string())
        })
}

/// Standard log event names.
pub mod events {
    /// A command is starting.
    pub const STARTUP: &str = "startup";

    /// A route manifest has been loaded and its routes registered.
    pub const MANIFEST_LOADED: &str = "manifest_loaded";

    /// A route could not be registered.
    pub const REGISTRATION_FAILED: &str = "registration_failed";

    /// A request resolved to a route.
    pub const ROUTE_RESOLVED: &str = "route_resolved";

    /// A request matched no route and no default route was configured.
    pub const ROUTE_NOT_FOUND: &str = "route_not_found";
}

/// Helper macros for structured logging with standard fields.
///
/// These wrap the tracing macros to ensure consistent field naming.
#[macro_export]
macro_rules! log_startup {
    ($($field:tt)*) => {
        tracing::info!(
            event = $crate::logging::events::STARTUP,
            $($field)*
        )
    };
}

#[macro_export]
macro_rules! log_manifest_loaded {
    ($($field:tt)*) => {
        tracing::info!(
            event = $crate::logging::events::MANIFEST_LOADED,
            $($field)*
        )
    };
}

#[macro_export]
macro_rules! log_registration_failed {
    ($($field:tt)*) => {
        tracing::error!(
            event = $crate::logging::events::REGISTRATION_FAILED,
            $($field)*
        )
    };
}

#[macro_export]
macro_rules! log_route_resolved {
    ($($field:tt)*) => {
        tracing::debug!(
            event = $crate::logging::events::ROUTE_RESOLVED,
            $($field)*
        )
    };
}

#[macro_export]
macro_rules! log_route_not_found {
    ($($field:tt)*) => {
        tracing::info!(
            event = $crate::logging::events::ROUTE_NOT_FOUND,
            $($field)*
        )
    };
}

//! Logging setup for the Switchyard tools.
//!
//! Provides structured JSON or pretty logging through `tracing`, a set of
//! standard event names, and `log_*!` macros that attach them.
//!
//! # Usage
//!
//! ```ignore
//! use switchyard_telemetry::{LogFormat, Telemetry, TelemetryConfig};
//!
//! let config = TelemetryConfig::new()
//!     .with_log_level("debug")
//!     .with_log_format(LogFormat::Pretty);
//!
//! let telemetry = Telemetry::init(config)?;
//! ```

pub mod config;
pub mod logging;

pub use config::{LogFormat, TelemetryConfig};
pub use logging::events;

use thiserror::Error;

/// Telemetry errors.
#[derive(Debug, Error)]
pub enum TelemetryError {
    /// Failed to initialize logging.
    #[error("failed to initialize logging: {0}")]
    LoggingInit(String),

    /// The log level is not a valid filter directive.
    #[error("invalid log level '{level}': {reason}")]
    InvalidLevel { level: String, reason: String },
}

/// Telemetry handle.
pub struct Telemetry {
    config: TelemetryConfig,
}

impl Telemetry {
    /// Install the global logging subscriber.
    ///
    /// Fails if the level is not a valid filter or a subscriber is already
    /// installed.
    pub fn init(config: TelemetryConfig) -> Result<Self, TelemetryError> {
        logging::init_logging(&config)?;
        crate::log_startup!(
            service = %config.service_name,
            format = %config.log_format,
            "logging initialized"
        );
        Ok(Self { config })
    }

    /// Get the telemetry configuration.
    pub fn config(&self) -> &TelemetryConfig {
        &self.config
    }
}

//! # Vectorize Telemetry
//!
//! Logging setup for applications built on `vectorize`. The library crate
//! only emits `tracing` events; this crate installs the subscriber that
//! prints them.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use vectorize_telemetry::{init_logging, TelemetryConfig};
//!
//! fn main() {
//!     init_logging(&TelemetryConfig::from_env()).expect("Failed to init logging");
//!     // GPU fallback warnings and build/call debug events are now visible
//! }
//! ```
//!
//! ## Environment Variables
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `OTEL_SERVICE_NAME` | `vectorize` | Service name in logs |
//! | `VECTORIZE_LOG_LEVEL` / `RUST_LOG` | `info` | Log filter directives |
//! | `VECTORIZE_JSON_LOGS` | `false` | JSON formatted output |

mod config;
mod logging;

pub use config::TelemetryConfig;
pub use logging::{env_filter, init_logging};

use thiserror::Error;

/// Telemetry initialization errors
#[derive(Error, Debug)]
pub enum TelemetryError {
    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("A global subscriber is already installed: {0}")]
    AlreadyInitialized(String),
}

/// Span around a unit of vectorizer work, tagged with its registry key.
///
/// # Example
///
/// ```rust,ignore
/// let _span = vectorize_span!("benchmark", strategy = "ast", target = "parallel").entered();
/// ```
#[macro_export]
macro_rules! vectorize_span {
    ($name:expr, $($field:tt)*) => {
        tracing::info_span!($name, $($field)*)
    };
}

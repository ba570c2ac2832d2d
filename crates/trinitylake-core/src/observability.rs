//! Observability infrastructure for TrinityLake.
//!
//! Structured logging with consistent spans. This module provides the
//! initialization helper and span constructors used across the engine.

use std::sync::Once;
use tracing::Span;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

static INIT: Once = Once::new();

/// Log output format.
#[derive(Debug, Clone, Copy, Default)]
pub enum LogFormat {
    /// JSON structured logs (for production).
    Json,
    /// Pretty-printed logs (for development).
    #[default]
    Pretty,
}

/// Initializes the logging subsystem.
///
/// Call once at application startup. Safe to call multiple times;
/// subsequent calls are no-ops.
///
/// # Environment Variables
///
/// - `RUST_LOG`: Controls log levels (e.g., `info`, `trinitylake_catalog=debug`)
///
/// # Example
///
/// ```rust
/// use trinitylake_core::observability::{init_logging, LogFormat};
///
/// init_logging(LogFormat::Pretty);
/// ```
pub fn init_logging(format: LogFormat) {
    INIT.call_once(|| {
        let env_filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

        match format {
            LogFormat::Json => {
                tracing_subscriber::registry()
                    .with(env_filter)
                    .with(fmt::layer().json())
                    .init();
            }
            LogFormat::Pretty => {
                tracing_subscriber::registry()
                    .with(env_filter)
                    .with(fmt::layer().pretty())
                    .init();
            }
        }
    });
}

/// Creates a span for transaction operations with standard fields.
///
/// # Example
///
/// ```rust
/// use trinitylake_core::observability::txn_span;
///
/// let span = txn_span("create_namespace", "7c9e6679-7425-40de-944b-e07fc1f90ae7");
/// let _guard = span.enter();
/// // ... do catalog operation
/// ```
#[must_use]
pub fn txn_span(operation: &str, transaction_id: &str) -> Span {
    tracing::info_span!("txn", op = operation, txn_id = transaction_id)
}

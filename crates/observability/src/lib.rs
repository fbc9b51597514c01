//! Tracing and logging setup shared by the library service binaries.

/// Initialize process-wide tracing from the environment.
///
/// `RUST_LOG` sets the filter (default `info`); `LOG_FORMAT=pretty` switches
/// from JSON lines to human-readable output. Safe to call multiple times;
/// subsequent calls become no-ops.
pub fn init() {
    let format = std::env::var("LOG_FORMAT")
        .map(|v| LogFormat::parse(&v))
        .unwrap_or_default();
    tracing::init(format);
}

/// Tracing configuration (filters, layers).
pub mod tracing;

pub use crate::tracing::LogFormat;

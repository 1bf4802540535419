// logging/src/lib.rs

//! A small helper to initialize tracing for the pipeline.
//!
//! Usage:
//! ```rust,ignore
//! logging::init();
//! tracing::info!("pipeline started");
//! tracing::debug!("detailed state: {:?}", some_struct);
//! ```

use tracing_subscriber::{fmt, EnvFilter};

/// Initialize the global tracing subscriber:
/// - Reads `RUST_LOG` for filter directives, falling back to `"warn,pipeline=info,supervisor=info,ingress=info,watchdog=info"`.
/// - Uses a pretty-printed, line-based formatter.
pub fn init() {
    // Try to parse RUST_LOG; default to showing info+ on the pipeline crates
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new("warn,pipeline=info,supervisor=info,ingress=info,watchdog=info")
    });

    fmt()
        .with_env_filter(filter)
        // You can tweak formatting here (timestamps, targets, etc.)
        .init();
}

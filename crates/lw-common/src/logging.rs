//! Structured logging setup with tracing
//!
//! Provides:
//! - JSON logs for production (LOG_FORMAT=json)
//! - Human-readable logs for development (default)
//! - Log level filtering via RUST_LOG
//!
//! # Usage
//!
//! ```rust,ignore
//! use lw_common::logging::init_logging;
//!
//! fn main() {
//!     init_logging("lw-agent");
//!
//!     tracing::info!(lease = "jobs", "joining election");
//! }
//! ```
//!
//! # Environment Variables
//!
//! - `LOG_FORMAT`: Set to "json" for JSON output, anything else for text
//! - `RUST_LOG`: Standard env_logger-style filter directives.
//!   Examples: `RUST_LOG=debug`, `RUST_LOG=lw_election=trace,reqwest=info`

use tracing_subscriber::{
    fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer,
};

/// Filter applied when RUST_LOG is unset. The HTTP stack under the lease
/// client logs per-connection chatter at debug, so it is pinned to warn.
const DEFAULT_DIRECTIVES: &str = "info,hyper=warn,reqwest=warn";

/// Initialize logging for the given service.
///
/// Reads LOG_FORMAT to pick the output format ("json" for aggregation,
/// anything else for human-readable text) and RUST_LOG for filtering.
pub fn init_logging(service_name: &str) {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_DIRECTIVES));

    let json = std::env::var("LOG_FORMAT")
        .map(|format| format.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    let fmt_layer = if json {
        fmt::layer()
            .json()
            .with_file(true)
            .with_line_number(true)
            .with_target(true)
            .flatten_event(true)
            .boxed()
    } else {
        fmt::layer().with_target(true).with_ansi(true).boxed()
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .init();

    tracing::debug!(service = service_name, json, "Logging initialized");
}

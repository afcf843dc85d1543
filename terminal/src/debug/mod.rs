//! # Logging Infrastructure
//!
//! File-based structured logging for the chart terminal.
//!
//! ## Features
//!
//! - **File-based logging**: Structured logs to `logs/chart-terminal.log.<date>` (daily rotation)
//! - **Non-blocking writer**: the network thread never waits on disk
//! - **Panic hook**: panics on either thread are logged with thread name and location
//!
//! ## Usage
//!
//! ```rust,no_run
//! use chart_terminal::debug::{self, DebugConfig};
//!
//! // Initialize at startup; keep the guard alive until exit
//! let _guard = debug::init(&DebugConfig::from_env());
//!
//! tracing::info!(request_id = 12, symbol = "AAPL", "Chart requested");
//! ```
//!
//! ## Configuration
//!
//! Environment variables:
//! - `RUST_LOG`: Log level filter (default `chart_terminal=info,warn`)
//! - `TERMINAL_LOG_DIR`: Log directory (default `logs`)
//! - `TERMINAL_LOG_FILE`: Log file prefix (default `chart-terminal.log`)
//! - `TERMINAL_LOG_STDOUT`: Mirror logs to stdout (1=on, 0=off)
//! - `TERMINAL_LOG_JSON`: JSON lines in the log file (1=on, 0=off)

pub mod config;
pub mod logger;

pub use config::DebugConfig;
pub use logger::init;

/// Check if debug mode is enabled via feature flag
pub fn is_debug_mode() -> bool {
    cfg!(feature = "debug-mode")
}

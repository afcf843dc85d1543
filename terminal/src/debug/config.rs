//! Logging configuration from environment variables

use std::path::PathBuf;

/// Default filter when `RUST_LOG` is unset
pub const DEFAULT_LOG_LEVEL: &str = "chart_terminal=info,warn";

/// Logging configuration
#[derive(Debug, Clone, PartialEq)]
pub struct DebugConfig {
    /// Log directory (daily files are rotated inside it)
    pub log_dir: PathBuf,
    /// File name prefix of the rotated log
    pub log_file: String,
    /// Log level filter (e.g., "chart_terminal=debug,info")
    pub log_level: String,
    /// Mirror log output to stdout
    pub log_to_stdout: bool,
    /// Write the file log as JSON lines instead of text
    pub log_json: bool,
}

impl Default for DebugConfig {
    fn default() -> Self {
        Self {
            log_dir: PathBuf::from("logs"),
            log_file: "chart-terminal.log".to_string(),
            log_level: DEFAULT_LOG_LEVEL.to_string(),
            log_to_stdout: cfg!(feature = "debug-mode"),
            log_json: false,
        }
    }
}

impl DebugConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup; unset keys keep their defaults
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        let flag = |key: &str, default: bool| lookup(key).map(|v| v == "1").unwrap_or(default);

        Self {
            log_dir: lookup("TERMINAL_LOG_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.log_dir),
            log_file: lookup("TERMINAL_LOG_FILE").unwrap_or(defaults.log_file),
            log_level: lookup("RUST_LOG").unwrap_or(defaults.log_level),
            log_to_stdout: flag("TERMINAL_LOG_STDOUT", defaults.log_to_stdout),
            log_json: flag("TERMINAL_LOG_JSON", defaults.log_json),
        }
    }

    /// Check if debug logging is enabled
    pub fn is_debug_enabled(&self) -> bool {
        self.log_level.contains("debug") || self.is_trace_enabled()
    }

    /// Check if trace logging is enabled
    pub fn is_trace_enabled(&self) -> bool {
        self.log_level.contains("trace")
    }
}

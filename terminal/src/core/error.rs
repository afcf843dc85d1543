//! # Common Error Types
//!
//! Consolidated error handling for the chart terminal.
//!
//! Errors exist only at the edges of the application: loading configuration,
//! spawning the network thread, writing files. The bridge and the network
//! driver never surface errors to the foreground; a failed request shows up
//! as the absence of its result.
//!
//! ## Error Categories
//!
//! - **Config**: configuration missing or invalid
//! - **Io**: file system failures (config, scanner parameter dump)
//! - **Json**: malformed configuration JSON
//! - **Thread**: the network driver thread could not be spawned or panicked
//! - **State**: operation not valid in the current application state
//!
//! ## Usage Pattern
//!
//! ```rust
//! use chart_terminal::core::error::{AppError, Result};
//!
//! fn require_account(account: &str) -> Result<()> {
//!     if account.is_empty() {
//!         return Err(AppError::Config("account number not configured".to_string()));
//!     }
//!     Ok(())
//! }
//!
//! assert!(require_account("").is_err());
//! ```

use thiserror::Error;

/// Application-wide error type.
///
/// # Example
///
/// ```rust
/// use chart_terminal::core::error::AppError;
///
/// let err = AppError::Config("port out of range".to_string());
/// assert_eq!(err.to_string(), "Config error: port out of range");
/// ```
#[derive(Debug, Error)]
pub enum AppError {
    /// Configuration missing, unreadable or failing validation.
    #[error("Config error: {0}")]
    Config(String),

    /// File system failure.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Malformed JSON.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Network driver thread could not be spawned or joined.
    #[error("Thread error: {0}")]
    Thread(String),

    /// Operation not valid in the current state (e.g. starting twice).
    #[error("State error: {0}")]
    State(String),
}

/// Convenience type alias for `Result<T, AppError>`.
pub type Result<T> = std::result::Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_prefixes() {
        assert_eq!(AppError::Thread("boom".into()).to_string(), "Thread error: boom");
        assert_eq!(AppError::State("already started".into()).to_string(), "State error: already started");
    }

    #[test]
    fn test_json_conversion() {
        let parse: std::result::Result<serde_json::Value, _> = serde_json::from_str("{");
        let err: AppError = parse.unwrap_err().into();
        assert!(matches!(err, AppError::Json(_)));
    }
}

//! # Configuration
//!
//! JSON configuration for the broker connection, the default scanner and the
//! bridge limits. Every field has a default; only the account number must be
//! filled in.
//!
//! ```json
//! {
//!   "ibkr":    { "account": "DU1234567", "host": "127.0.0.1", "port": 7497, "client_id": 0 },
//!   "scanner": { "default_scan_code": "TOP_PERC_GAIN", "price_above": 5.0 },
//!   "bridge":  { "signal_timeout_ms": 2000, "max_pending_rows": 10000, "pending_timeout_secs": 120 }
//! }
//! ```
//!
//! The camelCase spellings used by older config files (`clientId`,
//! `defaultScanCode`, `priceAbove`) are accepted as aliases.

use crate::core::error::{AppError, Result};
use crate::network::{AggregatorLimits, DriverSettings};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Placeholder account written into the template
pub const ACCOUNT_PLACEHOLDER: &str = "YOUR_ACCOUNT_NUMBER_HERE";

/// Environment variable overriding the config path
pub const CONFIG_PATH_ENV: &str = "TERMINAL_CONFIG";

fn default_config_path() -> PathBuf {
    PathBuf::from("config.json")
}

/// Broker connection settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct IbkrConfig {
    pub account: String,
    pub host: String,
    /// 7497 = paper trading, 7496 = live
    pub port: u16,
    #[serde(alias = "clientId")]
    pub client_id: i32,
}

impl Default for IbkrConfig {
    fn default() -> Self {
        Self {
            account: String::new(),
            host: "127.0.0.1".to_string(),
            port: 7497,
            client_id: 0,
        }
    }
}

/// Scanner started at launch
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ScannerConfig {
    #[serde(alias = "defaultScanCode")]
    pub default_scan_code: String,
    #[serde(alias = "locationCode")]
    pub location_code: String,
    #[serde(alias = "priceAbove")]
    pub price_above: f64,
}

impl Default for ScannerConfig {
    fn default() -> Self {
        Self {
            default_scan_code: "TOP_PERC_GAIN".to_string(),
            location_code: "STK.US".to_string(),
            price_above: 5.0,
        }
    }
}

/// Network driver tuning
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct BridgeConfig {
    /// Upper bound on each readiness wait
    pub signal_timeout_ms: u64,
    /// Per-request cap on buffered rows/bars
    pub max_pending_rows: usize,
    /// Age at which an unterminated request is dropped; 0 disables
    pub pending_timeout_secs: u64,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            signal_timeout_ms: 2000,
            max_pending_rows: 10_000,
            pending_timeout_secs: 120,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AppConfig {
    pub ibkr: IbkrConfig,
    pub scanner: ScannerConfig,
    pub bridge: BridgeConfig,
}

impl AppConfig {
    /// Load and validate a config file. A missing file is an error.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(AppError::Config(format!(
                "config file '{}' not found - copy the template and fill in your account",
                path.display()
            )));
        }

        let content = std::fs::read_to_string(path)?;
        let config: AppConfig = serde_json::from_str(&content)?;
        config.validate()?;

        tracing::info!(
            path = %path.display(),
            account = %shared::mask_account(&config.ibkr.account),
            host = %config.ibkr.host,
            port = config.ibkr.port,
            client_id = config.ibkr.client_id,
            scan_code = %config.scanner.default_scan_code,
            "Configuration loaded"
        );
        Ok(config)
    }

    /// Path from `TERMINAL_CONFIG`, else `config.json`
    pub fn path_from_env() -> PathBuf {
        std::env::var(CONFIG_PATH_ENV)
            .map(PathBuf::from)
            .unwrap_or_else(|_| default_config_path())
    }

    pub fn load_from_env_path() -> Result<Self> {
        Self::load(&Self::path_from_env())
    }

    pub fn validate(&self) -> Result<()> {
        let account = self.ibkr.account.trim();
        if account.is_empty() || account == ACCOUNT_PLACEHOLDER {
            return Err(AppError::Config("account number not configured".to_string()));
        }
        if self.ibkr.host.trim().is_empty() {
            return Err(AppError::Config("broker host is empty".to_string()));
        }
        if self.ibkr.port == 0 {
            return Err(AppError::Config("broker port must be non-zero".to_string()));
        }
        if !self.scanner.price_above.is_finite() {
            return Err(AppError::Config("scanner price_above must be a number".to_string()));
        }
        Ok(())
    }

    /// Write a template with the account placeholder. Creates parent directories.
    pub fn write_template(path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let template = AppConfig {
            ibkr: IbkrConfig {
                account: ACCOUNT_PLACEHOLDER.to_string(),
                ..IbkrConfig::default()
            },
            ..AppConfig::default()
        };
        let content = serde_json::to_string_pretty(&template)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Settings for the network driver
    pub fn driver_settings(&self) -> DriverSettings {
        DriverSettings {
            host: self.ibkr.host.clone(),
            port: self.ibkr.port,
            client_id: self.ibkr.client_id,
            signal_timeout: Duration::from_millis(self.bridge.signal_timeout_ms),
            limits: AggregatorLimits {
                max_pending_rows: self.bridge.max_pending_rows,
                pending_timeout: (self.bridge.pending_timeout_secs > 0)
                    .then(|| Duration::from_secs(self.bridge.pending_timeout_secs)),
            },
        }
    }
}

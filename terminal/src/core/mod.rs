//! # Core Abstractions
//!
//! Core traits and error types.
//!
//! - **[`error`]**: Application error types (`AppError`, `Result<T>`)
//! - **[`service`]**: The broker client seam (`VendorClient`, `VendorCallbacks`)
//!
//! ## Dependency Injection
//!
//! The network driver is generic over [`VendorClient`], so the same driver
//! loop runs against the real broker adapter, the in-process paper client, or
//! a scripted test double:
//!
//! ```rust,no_run
//! use chart_terminal::network::NetworkDriver;
//! use chart_terminal::services::paper::PaperClient;
//! # use chart_terminal::{bridge::Bridge, config::AppConfig};
//! # use std::sync::Arc;
//! # let config = AppConfig::default();
//! let bridge = Arc::new(Bridge::new());
//! let driver = NetworkDriver::new(PaperClient::new(), bridge, config.driver_settings());
//! ```

pub mod error;
pub mod service;

pub use error::{AppError, Result};
pub use service::{
    HistoricalQuery, ScannerSubscription, TickType, VendorBar, VendorCallbacks, VendorClient,
    VendorContract,
};

//! # Shared Data Transfer Objects Library
//!
//! This library defines the contract between the foreground (render/update)
//! thread and the background network thread of the chart terminal. Every value
//! that crosses the bridge is defined here.
//!
//! ## Structure
//!
//! - **[`dto`]**: Data Transfer Objects
//!   - **[`dto::request`]**: [`Request`] commands (scan, series, account, quotes, disconnect)
//!   - **[`dto::event`]**: [`Event`] results (completed scans and series, partial account snapshots, quotes)
//!   - **[`dto::market`]**: rows, bars, account values and positions
//! - **[`utils`]**: Shared utility functions
//!   - **[`utils::mask_account`]**: Mask account codes for logs
//!   - **[`utils::parse_volume`]**: Lenient numeric parsing of broker strings
//!
//! ## Usage
//!
//! ```rust
//! use shared::{Event, Request};
//!
//! let request = Request::CancelScan { request_id: 1 };
//! assert_eq!(request.request_id(), Some(1));
//!
//! let event = Event::ScanCompleted { request_id: 1, rows: vec![] };
//! assert_eq!(event.kind(), "ScanCompleted");
//! ```

pub mod dto;
pub mod utils;

// Wildcard re-exports: shared is a DTO library where every export is public API
pub use dto::*;
pub use utils::*;

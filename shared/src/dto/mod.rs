//! # Data Transfer Objects (DTOs)
//!
//! Everything that crosses the foreground/network thread boundary.
//!
//! ## Module Organization
//!
//! - [`market`] - Value types delivered by the brokerage: scan rows, bars, account values, positions
//! - [`request`] - [`Request`] commands issued by the foreground thread
//! - [`event`] - [`Event`] outcomes produced by the network thread
//!
//! ## Serialization Format
//!
//! All DTOs derive `serde` traits so they can be logged as JSON, captured in
//! fixtures, or replayed:
//!
//! - **Field naming**: snake_case (default serde behavior)
//! - **Enums**: externally tagged by variant name
//! - **Optional fields**: Omitted when `None` using `#[serde(skip_serializing_if = "Option::is_none")]`
//!
//! ## Example
//!
//! ```text
//! {"StartScan":{"request_id":1,"scan_code":"TOP_PERC_GAIN","location_code":"STK.US","price_floor":5.0}}
//! ```

pub mod event;
pub mod market;
pub mod request;

pub use event::*;
pub use market::*;
pub use request::*;

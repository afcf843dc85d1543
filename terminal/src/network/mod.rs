//! # Network Layer
//!
//! Everything that runs on the background network thread.
//!
//! - **[`driver`]**: [`NetworkDriver`], the connect / dispatch / wait / pump loop
//! - **[`aggregator`]**: [`InboundAggregator`], turning partial broker callbacks
//!   into completed [`shared::Event`]s
//!
//! The foreground never calls into this module directly; it only talks to the
//! [`crate::bridge::Bridge`] the driver was built with.

pub mod aggregator;
pub mod driver;

pub use aggregator::{AggregatorLimits, InboundAggregator};
pub use driver::{DriverExit, DriverSettings, DriverState, NetworkDriver};

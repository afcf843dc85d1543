//! # Chart Terminal - Library Root
//!
//! Connects a blocking, callback-driven brokerage client to a foreground
//! render loop without the render loop ever touching the socket.
//!
//! ## Architecture
//!
//! ```text
//! ┌────────────────────────────────────────────────────────┐
//! │  foreground thread                                     │
//! │    App::on_tick()  ── drain ──┐                        │
//! │    App::request_chart() ─ submit ─┐                    │
//! └───────────────────────────────│───│────────────────────┘
//!                                 │   ▼
//!                          ┌──────┴──────────┐
//!                          │     Bridge      │  two mutex-guarded FIFOs
//!                          └──────▲──────┬───┘
//!                          publish│      │take_requests
//! ┌───────────────────────────────│──────▼─────────────────┐
//! │  network driver thread                                 │
//! │    NetworkDriver ── VendorClient (connect/wait/pump)   │
//! │          └── InboundAggregator (VendorCallbacks)       │
//! └────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Structure
//!
//! - **app**: foreground orchestrator and application state
//! - **bridge**: the dual-queue crossing point between the two threads
//! - **network**: the driver loop and the inbound aggregator
//! - **core**: the broker client seam and error types
//! - **services**: broker client implementations (paper broker)
//! - **config**: JSON configuration
//! - **debug**: logging setup
//!
//! ## Data Flow
//!
//! 1. The foreground submits a [`shared::Request`] (e.g. `FetchSeries`).
//! 2. The driver takes it on its next iteration and calls the broker.
//! 3. Partial callbacks (one bar each) accumulate in the aggregator.
//! 4. The end marker releases one `SeriesCompleted` event to the bridge.
//! 5. The next `on_tick` drains it and stores the chart.

pub mod app;
pub mod bridge;
pub mod config;
pub mod core;
pub mod debug;
pub mod network;
pub mod services;

pub use app::App;
pub use bridge::Bridge;
pub use config::AppConfig;
pub use crate::core::error::{AppError, Result};

//! # Services Module
//!
//! Broker client implementations that plug into the
//! [`VendorClient`](crate::core::service::VendorClient) seam.
//!
//! ## Module Overview
//!
//! ```text
//! services/
//! └── paper.rs    - In-process paper broker
//!                   (synthetic scans, bars, account data, quote stream)
//! ```
//!
//! ## Service Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │                  network driver thread                  │
//! │                                                         │
//! │  ┌──────────────────┐  callbacks  ┌──────────────────┐  │
//! │  │  PaperClient     │ ──────────▶ │ InboundAggregator│  │
//! │  │  (paper.rs)      │             │                  │  │
//! │  └────────┬─────────┘             └────────┬─────────┘  │
//! │           │ Condvar signal                 │ publish    │
//! └───────────┼────────────────────────────────┼────────────┘
//!             │                                ▼
//!   ┌─────────┴─────────┐               ┌─────────────┐
//!   │  paper-reader     │               │   Bridge    │
//!   │  (quote ticks)    │               └─────────────┘
//!   └───────────────────┘
//! ```
//!
//! ## PaperClient (paper.rs)
//!
//! Answers every request synchronously by queueing the callbacks a broker
//! would send, then replays them on the next `process_messages`. Quote
//! subscriptions are the only streaming source and run on a background
//! reader thread started by `start_reader`.
//!
//! ```rust
//! use chart_terminal::core::service::VendorClient;
//! use chart_terminal::services::paper::PaperClient;
//!
//! let mut client = PaperClient::with_seed(42);
//! assert!(client.connect("127.0.0.1", 7497, 0));
//! assert!(!PaperClient::refusing().connect("127.0.0.1", 7497, 0));
//! ```
//!
//! A production adapter over the broker's socket library implements the same
//! trait and is passed to [`crate::app::App::start`] in place of the paper client.

pub mod paper;

pub use paper::PaperClient;

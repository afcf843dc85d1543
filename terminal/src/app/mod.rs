//! # Application Orchestrator
//!
//! The [`App`] is the foreground half of the terminal. It never touches the
//! broker socket: user actions become [`Request`]s submitted to the
//! [`Bridge`], and [`App::on_tick`] drains completed [`shared::Event`]s once
//! per frame and folds them into [`AppState`].
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                  Foreground thread (render loop)            │
//! │  ┌──────────────────────────────────────────────────────┐   │
//! │  │  App (orchestrator)                                  │   │
//! │  │  - on_tick() - called every frame                    │   │
//! │  │  - request_chart() / start_scanner() - user actions  │   │
//! │  └────────────┬─────────────────────────────────────────┘   │
//! │               │                                              │
//! │  ┌────────────▼─────────────────────────────────────────┐   │
//! │  │  State: Arc<RwLock<AppState>>                        │   │
//! │  │  - read by the renderer, written per event           │   │
//! │  └──────────────────────────────────────────────────────┘   │
//! └───────────────────────┬─────────────────────────────────────┘
//!                         │ Bridge (two mutex-guarded queues)
//! ┌───────────────────────▼─────────────────────────────────────┐
//! │              Network driver thread                          │
//! │  NetworkDriver ── VendorClient ── InboundAggregator         │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Request Ids
//!
//! Id 1 is reserved for the launch scanner. Chart and quote requests take
//! ids from a counter starting at 2.
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use chart_terminal::app::App;
//! use chart_terminal::bridge::Bridge;
//! use chart_terminal::config::AppConfig;
//! use chart_terminal::services::paper::PaperClient;
//! use std::sync::Arc;
//!
//! # fn main() -> chart_terminal::core::Result<()> {
//! let config = AppConfig::load_from_env_path()?;
//! let mut app = App::new(Arc::new(Bridge::new()));
//! app.start(PaperClient::new(), &config)?;
//!
//! loop {
//!     app.on_tick();
//!     let state = app.state.read();
//!     // render from state
//!     # break;
//! }
//! app.stop();
//! # Ok(())
//! # }
//! ```

mod event_handler;
pub mod state;

pub use state::{AccountData, AppState, ChartData, QuoteBoard, QuoteSnapshot, ScanState};

use crate::bridge::Bridge;
use crate::config::AppConfig;
use crate::core::error::{AppError, Result};
use crate::core::service::VendorClient;
use crate::network::{DriverExit, NetworkDriver};
use parking_lot::RwLock;
use shared::{Request, RequestId};
use std::path::Path;
use std::sync::Arc;
use std::thread::JoinHandle;

/// Request id used for the scanner started at launch
pub const LAUNCH_SCAN_ID: RequestId = 1;
/// First id handed out by the request counter
pub const FIRST_DYNAMIC_ID: RequestId = 2;

/// Daily chart request: one year of regular-hours trade bars
const CHART_DURATION: &str = "1 Y";
const CHART_BAR_SIZE: &str = "1 day";
const CHART_DATA_KIND: &str = "TRADES";

/// Main application orchestrator
pub struct App {
    /// Application state, shared with whatever renders it
    pub state: Arc<RwLock<AppState>>,
    bridge: Arc<Bridge>,
    driver: Option<JoinHandle<DriverExit>>,
    next_request_id: RequestId,
    location_code: String,
}

impl App {
    pub fn new(bridge: Arc<Bridge>) -> Self {
        Self {
            state: Arc::new(RwLock::new(AppState::default())),
            bridge,
            driver: None,
            next_request_id: FIRST_DYNAMIC_ID,
            location_code: crate::config::ScannerConfig::default().location_code,
        }
    }

    pub fn bridge(&self) -> &Arc<Bridge> {
        &self.bridge
    }

    /// Spawn the network driver for `client`, then queue the launch scan and
    /// the account subscription from `config`.
    pub fn start<C>(&mut self, client: C, config: &AppConfig) -> Result<()>
    where
        C: VendorClient + 'static,
    {
        if self.driver.is_some() {
            return Err(AppError::State("network driver already started".to_string()));
        }

        let driver = NetworkDriver::new(client, Arc::clone(&self.bridge), config.driver_settings());
        let handle = driver
            .spawn()
            .map_err(|e| AppError::Thread(format!("failed to spawn network driver: {}", e)))?;
        self.driver = Some(handle);
        self.location_code = config.scanner.location_code.clone();

        tracing::info!(
            account = %shared::mask_account(&config.ibkr.account),
            host = %config.ibkr.host,
            port = config.ibkr.port,
            "Network driver started"
        );

        self.start_scanner(
            LAUNCH_SCAN_ID,
            &config.scanner.default_scan_code,
            config.scanner.price_above,
        );
        self.request_account(Some(config.ibkr.account.clone()));
        Ok(())
    }

    /// Whether a driver thread is attached and still running
    pub fn is_running(&self) -> bool {
        self.driver.as_ref().is_some_and(|h| !h.is_finished())
    }

    /// Drain the bridge and apply every event. Returns how many were applied.
    pub fn on_tick(&mut self) -> usize {
        let events = self.bridge.drain();
        let count = events.len();
        if count == 0 {
            return 0;
        }

        let started = std::time::Instant::now();
        for event in events {
            self.handle_event(event);
        }
        tracing::debug!(
            events_processed = count,
            processing_time_us = started.elapsed().as_micros() as u64,
            "on_tick: applied bridge events"
        );
        count
    }

    fn handle_event(&mut self, event: shared::Event) {
        use event_handler::AppEventHandler;
        self.handle_event_impl(event);
    }

    fn allocate_id(&mut self) -> RequestId {
        let id = self.next_request_id;
        self.next_request_id += 1;
        id
    }

    pub fn start_scanner(&mut self, request_id: RequestId, scan_code: &str, price_floor: f64) {
        self.bridge.submit(Request::StartScan {
            request_id,
            scan_code: scan_code.to_string(),
            location_code: self.location_code.clone(),
            price_floor,
        });
        tracing::info!(request_id, scan_code, price_floor, "Scanner requested");
    }

    /// Show `symbol`'s chart, fetching it first if it is not loaded.
    ///
    /// Returns the request id when a fetch was queued.
    pub fn request_chart(&mut self, symbol: &str) -> Option<RequestId> {
        {
            let mut state = self.state.write();
            if state.charts.contains_key(symbol) {
                state.active_symbol = Some(symbol.to_string());
                tracing::info!(symbol, "Switched active chart");
                return None;
            }
        }

        let request_id = self.allocate_id();
        self.bridge.submit(Request::FetchSeries {
            request_id,
            symbol: symbol.to_string(),
            end_timestamp: String::new(),
            duration: CHART_DURATION.to_string(),
            bar_size: CHART_BAR_SIZE.to_string(),
            data_kind: CHART_DATA_KIND.to_string(),
            regular_hours_only: true,
        });
        tracing::info!(symbol, request_id, duration = CHART_DURATION, "Requesting daily chart");
        Some(request_id)
    }

    /// Drop a loaded chart so the next `request_chart` fetches it again
    pub fn forget_chart(&mut self, symbol: &str) -> bool {
        let mut state = self.state.write();
        let removed = state.charts.remove(symbol).is_some();
        if state.active_symbol.as_deref() == Some(symbol) {
            state.active_symbol = None;
        }
        removed
    }

    pub fn subscribe_quotes(&mut self, symbol: &str) -> RequestId {
        let request_id = self.allocate_id();
        self.state.write().quotes.track(request_id, symbol);
        self.bridge.submit(Request::SubscribeQuotes {
            request_id,
            symbol: symbol.to_string(),
        });
        request_id
    }

    pub fn unsubscribe_quotes(&mut self, request_id: RequestId) {
        self.state.write().quotes.untrack(request_id);
        self.bridge.submit(Request::CancelQuotes { request_id });
    }

    /// `Some(code)` subscribes to that account; `None` requests positions only
    pub fn request_account(&mut self, account_code: Option<String>) {
        self.bridge.submit(Request::FetchAccount { account_code });
    }

    pub fn fetch_scanner_parameters(&mut self) {
        self.bridge.submit(Request::FetchScannerParameters);
    }

    /// Write the received scanner parameter XML to `path`
    pub fn save_scanner_parameters(&self, path: &Path) -> Result<()> {
        let state = self.state.read();
        let xml = state
            .scanner_parameters
            .as_deref()
            .ok_or_else(|| AppError::State("no scanner parameters received yet".to_string()))?;
        std::fs::write(path, xml)?;
        tracing::info!(path = %path.display(), bytes = xml.len(), "Scanner parameters saved");
        Ok(())
    }

    /// Ask the driver to disconnect and wait for its thread. Safe to call twice.
    pub fn stop(&mut self) -> Option<DriverExit> {
        let handle = self.driver.take()?;
        self.bridge.submit(Request::Disconnect);
        tracing::info!("Waiting for network thread to finish");
        match handle.join() {
            Ok(exit) => {
                tracing::info!(exit = ?exit, "Network thread joined");
                Some(exit)
            }
            Err(_) => {
                tracing::error!("Network thread panicked");
                None
            }
        }
    }
}

impl Drop for App {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::{Bar, Event, ScanRow};

    fn app() -> App {
        App::new(Arc::new(Bridge::new()))
    }

    fn row(rank: i32, symbol: &str) -> ScanRow {
        ScanRow {
            rank,
            symbol: symbol.into(),
            instrument_type: "STK".into(),
            currency: "USD".into(),
            contract_id: rank as i64,
        }
    }

    fn bars(n: usize) -> Vec<Bar> {
        (0..n)
            .map(|i| Bar {
                time: format!("202401{:02}", i + 1),
                open: 1.0,
                high: 2.0,
                low: 0.5,
                close: 1.5,
                volume: 10,
            })
            .collect()
    }

    #[test]
    fn test_scan_result_replaces_state_and_cancels() {
        let mut app = app();
        app.bridge.publish(Event::ScanCompleted { request_id: 1, rows: vec![row(0, "A"), row(1, "B")] });
        app.bridge.publish(Event::ScanCompleted { request_id: 1, rows: vec![row(0, "C")] });
        assert_eq!(app.on_tick(), 2);

        let scan = app.state.read().scan.clone().unwrap();
        assert_eq!(scan.rows.len(), 1);
        assert_eq!(scan.rows[0].symbol, "C");
        assert_eq!(
            app.bridge.take_requests(),
            vec![Request::CancelScan { request_id: 1 }, Request::CancelScan { request_id: 1 }]
        );
    }

    #[test]
    fn test_series_becomes_active_chart() {
        let mut app = app();
        app.bridge.publish(Event::SeriesCompleted { request_id: 2, symbol: "AAPL".into(), bars: bars(3) });
        app.bridge.publish(Event::SeriesCompleted { request_id: 3, symbol: "MSFT".into(), bars: bars(5) });
        app.on_tick();

        let state = app.state.read();
        assert_eq!(state.charts.len(), 2);
        assert_eq!(state.active_symbol.as_deref(), Some("MSFT"));
        assert_eq!(state.active_chart().unwrap().bars.len(), 5);
        assert_eq!(state.events_processed, 2);
    }

    #[test]
    fn test_request_chart_allocates_ids_from_two() {
        let mut app = app();
        assert_eq!(app.request_chart("AAPL"), Some(2));
        assert_eq!(app.request_chart("MSFT"), Some(3));

        let requests = app.bridge.take_requests();
        match &requests[0] {
            Request::FetchSeries { request_id, symbol, duration, bar_size, data_kind, regular_hours_only, end_timestamp } => {
                assert_eq!(*request_id, 2);
                assert_eq!(symbol, "AAPL");
                assert_eq!(duration, "1 Y");
                assert_eq!(bar_size, "1 day");
                assert_eq!(data_kind, "TRADES");
                assert!(*regular_hours_only);
                assert!(end_timestamp.is_empty());
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_request_chart_switches_when_loaded() {
        let mut app = app();
        app.bridge.publish(Event::SeriesCompleted { request_id: 2, symbol: "AAPL".into(), bars: bars(1) });
        app.bridge.publish(Event::SeriesCompleted { request_id: 3, symbol: "MSFT".into(), bars: bars(1) });
        app.on_tick();

        assert_eq!(app.request_chart("AAPL"), None);
        assert!(app.bridge.take_requests().is_empty());
        assert_eq!(app.state.read().active_symbol.as_deref(), Some("AAPL"));

        assert!(app.forget_chart("AAPL"));
        assert_eq!(app.state.read().active_symbol, None);
        assert!(app.request_chart("AAPL").is_some());
    }

    #[test]
    fn test_quotes_tracked_and_applied() {
        let mut app = app();
        let id = app.subscribe_quotes("NVDA");
        app.bridge.publish(Event::Quote { request_id: id, field: shared::QuoteField::Last, value: 101.0 });
        app.bridge.publish(Event::Quote { request_id: id, field: shared::QuoteField::Close, value: 100.0 });
        app.on_tick();

        let gain = app.state.read().quotes.by_symbol("NVDA").unwrap().gain_pct().unwrap();
        assert!((gain - 1.0).abs() < 1e-9);

        app.unsubscribe_quotes(id);
        assert!(app.state.read().quotes.is_empty());
        assert_eq!(
            app.bridge.take_requests().last(),
            Some(&Request::CancelQuotes { request_id: id })
        );
    }

    #[test]
    fn test_save_scanner_parameters_requires_data() {
        let mut app = app();
        let path = std::env::temp_dir().join(format!("chart-terminal-params-{}.xml", std::process::id()));
        assert!(matches!(app.save_scanner_parameters(&path), Err(AppError::State(_))));

        app.bridge.publish(Event::ScannerParameters { xml: "<ScanParameterResponse/>".into() });
        app.on_tick();
        app.save_scanner_parameters(&path).unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "<ScanParameterResponse/>");
        std::fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_stop_without_start_is_noop() {
        let mut app = app();
        assert_eq!(app.stop(), None);
        assert_eq!(app.stop(), None);
        assert_eq!(app.bridge.pending_requests(), 0);
    }
}

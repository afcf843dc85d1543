//! # Network Driver
//!
//! The background thread that owns the broker client.
//!
//! ## State Machine
//!
//! ```text
//! Disconnected ──connect()──▶ Connecting ──start_reader()──▶ Connected
//!      ▲                          │                              │
//!      └────── connect failed ────┘                              │ Disconnect request
//!      ▲                                                         ▼
//!      └──────────── pending buffers discarded ─────────────  Draining
//! ```
//!
//! One iteration of the connected loop:
//!
//! 1. stop if the client reports the connection lost
//! 2. take every queued [`Request`] and translate it into broker calls
//! 3. wait (bounded) for the client's readiness signal
//! 4. pump ready messages into the [`InboundAggregator`]
//! 5. evict pending buffers past their deadline
//!
//! There is no reconnect. Whatever ends the loop, the foreground only ever
//! notices that results stop arriving; [`DriverExit`] exists for logs and
//! for whoever joins the thread.

use super::aggregator::{AggregatorLimits, InboundAggregator};
use crate::bridge::Bridge;
use crate::core::service::{HistoricalQuery, ScannerSubscription, VendorClient, VendorContract};
use shared::Request;
use std::ops::ControlFlow;
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

/// Name given to the driver thread
pub const THREAD_NAME: &str = "vendor-network";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriverState {
    Disconnected,
    Connecting,
    Connected,
    Draining,
}

/// Why the driver loop returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriverExit {
    /// `connect()` failed; no request was taken from the bridge
    ConnectFailed,
    /// A `Disconnect` request was processed
    Disconnected,
    /// The client stopped reporting a live connection
    ConnectionLost,
}

/// Connection target and loop tuning.
#[derive(Debug, Clone, PartialEq)]
pub struct DriverSettings {
    pub host: String,
    pub port: u16,
    pub client_id: i32,
    /// Upper bound on each readiness wait
    pub signal_timeout: Duration,
    pub limits: AggregatorLimits,
}

impl Default for DriverSettings {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 7497,
            client_id: 0,
            signal_timeout: Duration::from_millis(2000),
            limits: AggregatorLimits::default(),
        }
    }
}

/// Drives one broker session on the calling thread (or via [`NetworkDriver::spawn`]).
pub struct NetworkDriver<C: VendorClient> {
    client: C,
    bridge: Arc<Bridge>,
    aggregator: InboundAggregator,
    settings: DriverSettings,
    state: DriverState,
}

impl<C: VendorClient> NetworkDriver<C> {
    pub fn new(client: C, bridge: Arc<Bridge>, settings: DriverSettings) -> Self {
        let aggregator = InboundAggregator::new(Arc::clone(&bridge), settings.limits);
        Self {
            client,
            bridge,
            aggregator,
            settings,
            state: DriverState::Disconnected,
        }
    }

    pub fn state(&self) -> DriverState {
        self.state
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    /// Run the session to completion. Blocks until disconnect or connection loss.
    pub fn run(&mut self) -> DriverExit {
        self.state = DriverState::Connecting;
        info!(
            host = %self.settings.host,
            port = self.settings.port,
            client_id = self.settings.client_id,
            "Connecting to broker"
        );

        if !self
            .client
            .connect(&self.settings.host, self.settings.port, self.settings.client_id)
        {
            error!(
                host = %self.settings.host,
                port = self.settings.port,
                "Broker connection failed - network driver stopping"
            );
            self.state = DriverState::Disconnected;
            return DriverExit::ConnectFailed;
        }

        self.client.start_reader();
        self.state = DriverState::Connected;
        info!("Broker connected - reader started");

        loop {
            if !self.client.is_connected() {
                let dropped = self.aggregator.discard_all();
                warn!(dropped_pending = dropped, "Broker connection lost - network driver stopping");
                self.state = DriverState::Disconnected;
                return DriverExit::ConnectionLost;
            }

            if self.dispatch_queued().is_break() {
                self.state = DriverState::Draining;
                let dropped = self.aggregator.discard_all();
                if dropped > 0 {
                    warn!(dropped_pending = dropped, "Discarding incomplete requests on disconnect");
                }
                self.state = DriverState::Disconnected;
                info!(stats = ?self.bridge.stats(), "Network driver stopped");
                return DriverExit::Disconnected;
            }

            self.client.wait_for_signal(self.settings.signal_timeout);
            self.client.process_messages(&mut self.aggregator);
            self.aggregator.expire_stale(Instant::now());
        }
    }

    /// Move the driver onto its own named thread.
    pub fn spawn(mut self) -> std::io::Result<JoinHandle<DriverExit>>
    where
        C: 'static,
    {
        std::thread::Builder::new()
            .name(THREAD_NAME.to_string())
            .spawn(move || self.run())
    }

    /// Translate every queued request. Breaks once a `Disconnect` was handled;
    /// anything queued behind it in the same batch is dropped.
    fn dispatch_queued(&mut self) -> ControlFlow<()> {
        let requests = self.bridge.take_requests();
        let mut requests = requests.into_iter();
        while let Some(request) = requests.next() {
            if self.dispatch(request).is_break() {
                let skipped = requests.by_ref().count();
                if skipped > 0 {
                    debug!(skipped, "Requests queued after Disconnect dropped");
                }
                return ControlFlow::Break(());
            }
        }
        ControlFlow::Continue(())
    }

    fn dispatch(&mut self, request: Request) -> ControlFlow<()> {
        debug!(kind = request.kind(), request_id = ?request.request_id(), "Dispatching request");
        match request {
            Request::StartScan {
                request_id,
                scan_code,
                location_code,
                price_floor,
            } => {
                let subscription = ScannerSubscription {
                    instrument: "STK".to_string(),
                    location_code,
                    scan_code,
                    filters: vec![("priceAbove".to_string(), price_floor.to_string())],
                };
                self.aggregator.register_scan(request_id);
                self.client
                    .request_scanner_subscription(request_id, &subscription);
            }
            Request::CancelScan { request_id } => {
                self.aggregator.forget_scan(request_id);
                self.client.cancel_scanner_subscription(request_id);
            }
            Request::FetchSeries {
                request_id,
                symbol,
                end_timestamp,
                duration,
                bar_size,
                data_kind,
                regular_hours_only,
            } => {
                self.aggregator.register_series(request_id, &symbol);
                let query = HistoricalQuery {
                    contract: VendorContract::stock(&symbol),
                    end_date_time: end_timestamp,
                    duration,
                    bar_size,
                    what_to_show: data_kind,
                    use_rth: regular_hours_only,
                };
                self.client.request_historical_data(request_id, &query);
            }
            Request::CancelSeries { request_id } => {
                self.aggregator.forget_series(request_id);
                self.client.cancel_historical_data(request_id);
            }
            Request::FetchAccount { account_code } => match account_code {
                Some(code) => self.client.request_account_updates(true, &code),
                None => self.client.request_positions(),
            },
            Request::SubscribeQuotes { request_id, symbol } => {
                self.client
                    .request_market_data(request_id, &VendorContract::stock(&symbol));
            }
            Request::CancelQuotes { request_id } => {
                self.client.cancel_market_data(request_id);
            }
            Request::FetchScannerParameters => self.client.request_scanner_parameters(),
            Request::Disconnect => {
                info!("Disconnect requested");
                self.client.disconnect();
                return ControlFlow::Break(());
            }
        }
        ControlFlow::Continue(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::service::{VendorCallbacks, VendorContract};
    use shared::RequestId;

    /// Records outbound calls; never produces callbacks.
    #[derive(Default)]
    struct Recorder {
        connected: bool,
        refuse: bool,
        calls: Vec<String>,
    }

    impl VendorClient for Recorder {
        fn connect(&mut self, _host: &str, _port: u16, _client_id: i32) -> bool {
            self.connected = !self.refuse;
            self.connected
        }
        fn is_connected(&self) -> bool {
            self.connected
        }
        fn disconnect(&mut self) {
            self.connected = false;
            self.calls.push("disconnect".into());
        }
        fn start_reader(&mut self) {}
        fn wait_for_signal(&self, _timeout: Duration) {}
        fn process_messages(&mut self, _handler: &mut dyn VendorCallbacks) {}
        fn request_scanner_subscription(&mut self, id: RequestId, sub: &ScannerSubscription) {
            self.calls.push(format!("scan {id} {} {} {:?}", sub.scan_code, sub.location_code, sub.filters));
        }
        fn cancel_scanner_subscription(&mut self, id: RequestId) {
            self.calls.push(format!("cancel_scan {id}"));
        }
        fn request_scanner_parameters(&mut self) {
            self.calls.push("scanner_params".into());
        }
        fn request_historical_data(&mut self, id: RequestId, q: &HistoricalQuery) {
            self.calls.push(format!(
                "history {id} {} {} {} {} {}",
                q.contract.symbol, q.duration, q.bar_size, q.what_to_show, q.use_rth
            ));
        }
        fn cancel_historical_data(&mut self, id: RequestId) {
            self.calls.push(format!("cancel_history {id}"));
        }
        fn request_account_updates(&mut self, subscribe: bool, code: &str) {
            self.calls.push(format!("account {subscribe} {code}"));
        }
        fn request_positions(&mut self) {
            self.calls.push("positions".into());
        }
        fn request_market_data(&mut self, id: RequestId, c: &VendorContract) {
            self.calls.push(format!("quotes {id} {}", c.symbol));
        }
        fn cancel_market_data(&mut self, id: RequestId) {
            self.calls.push(format!("cancel_quotes {id}"));
        }
    }

    #[test]
    fn test_translation_of_each_request() {
        let bridge = Arc::new(Bridge::new());
        bridge.submit(Request::StartScan {
            request_id: 1,
            scan_code: "TOP_PERC_GAIN".into(),
            location_code: "STK.US.MAJOR".into(),
            price_floor: 5.0,
        });
        bridge.submit(Request::FetchSeries {
            request_id: 2,
            symbol: "AAPL".into(),
            end_timestamp: String::new(),
            duration: "1 Y".into(),
            bar_size: "1 day".into(),
            data_kind: "TRADES".into(),
            regular_hours_only: true,
        });
        bridge.submit(Request::FetchAccount { account_code: Some("DU1".into()) });
        bridge.submit(Request::FetchAccount { account_code: None });
        bridge.submit(Request::SubscribeQuotes { request_id: 3, symbol: "MSFT".into() });
        bridge.submit(Request::CancelQuotes { request_id: 3 });
        bridge.submit(Request::CancelSeries { request_id: 2 });
        bridge.submit(Request::FetchScannerParameters);
        bridge.submit(Request::Disconnect);

        let mut driver = NetworkDriver::new(Recorder::default(), Arc::clone(&bridge), DriverSettings::default());
        assert_eq!(driver.run(), DriverExit::Disconnected);
        assert_eq!(driver.state(), DriverState::Disconnected);
        assert_eq!(
            driver.client().calls,
            vec![
                "scan 1 TOP_PERC_GAIN STK.US.MAJOR [(\"priceAbove\", \"5\")]".to_string(),
                "history 2 AAPL 1 Y 1 day TRADES true".to_string(),
                "account true DU1".to_string(),
                "positions".to_string(),
                "quotes 3 MSFT".to_string(),
                "cancel_quotes 3".to_string(),
                "cancel_history 2".to_string(),
                "scanner_params".to_string(),
                "disconnect".to_string(),
            ]
        );
    }

    #[test]
    fn test_requests_after_disconnect_dropped() {
        let bridge = Arc::new(Bridge::new());
        bridge.submit(Request::Disconnect);
        bridge.submit(Request::CancelScan { request_id: 9 });

        let mut driver = NetworkDriver::new(Recorder::default(), Arc::clone(&bridge), DriverSettings::default());
        assert_eq!(driver.run(), DriverExit::Disconnected);
        assert_eq!(driver.client().calls, vec!["disconnect".to_string()]);
        assert_eq!(bridge.pending_requests(), 0);
    }

    #[test]
    fn test_connect_failure_leaves_requests_queued() {
        let bridge = Arc::new(Bridge::new());
        bridge.submit(Request::CancelScan { request_id: 1 });

        let client = Recorder { refuse: true, ..Default::default() };
        let mut driver = NetworkDriver::new(client, Arc::clone(&bridge), DriverSettings::default());
        assert_eq!(driver.run(), DriverExit::ConnectFailed);
        assert_eq!(driver.state(), DriverState::Disconnected);
        assert!(driver.client().calls.is_empty());
        assert_eq!(bridge.pending_requests(), 1);
    }

    #[test]
    fn test_spawn_names_thread_and_returns_exit() {
        let bridge = Arc::new(Bridge::new());
        bridge.submit(Request::Disconnect);
        let driver = NetworkDriver::new(Recorder::default(), bridge, DriverSettings::default());
        let handle = driver.spawn().unwrap();
        assert_eq!(handle.thread().name(), Some(THREAD_NAME));
        assert_eq!(handle.join().unwrap(), DriverExit::Disconnected);
    }
}

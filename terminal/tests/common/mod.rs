//! # Test Support
//!
//! A scripted broker client for driving the network thread from tests. The
//! test pushes callbacks into the client's inbox; the driver pumps them into
//! its aggregator on the next iteration. Every outbound call is recorded.

#![allow(dead_code)]

use chart_terminal::core::service::{
    HistoricalQuery, ScannerSubscription, TickType, VendorBar, VendorCallbacks, VendorClient,
    VendorContract,
};
use parking_lot::{Condvar, Mutex};
use shared::{Event, RequestId};
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Outbound call as seen by the broker
#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    Connect,
    StartReader,
    Disconnect,
    Scan { request_id: RequestId, scan_code: String, price_above: String },
    CancelScan(RequestId),
    ScannerParameters,
    History { request_id: RequestId, symbol: String },
    CancelHistory(RequestId),
    Account { subscribe: bool, code: String },
    Positions,
    Quotes { request_id: RequestId, symbol: String },
    CancelQuotes(RequestId),
}

/// Inbound callback to replay
#[derive(Debug, Clone)]
pub enum Callback {
    Row { request_id: RequestId, rank: i32, symbol: String },
    RowsEnd(RequestId),
    Bar { request_id: RequestId, index: usize },
    BarsEnd(RequestId),
    Parameters(String),
    AccountValue { key: String, value: String },
    Position { symbol: String, size: String },
    Tick { request_id: RequestId, price: f64 },
    /// Make `is_connected` report false from now on
    DropConnection,
}

#[derive(Default)]
struct Script {
    connected: bool,
    refuse: bool,
    calls: Vec<Call>,
    inbox: VecDeque<Callback>,
}

/// Test-side handle onto a [`ScriptedVendor`]
#[derive(Clone, Default)]
pub struct ScriptHandle {
    script: Arc<Mutex<Script>>,
    signal: Arc<Condvar>,
}

impl ScriptHandle {
    pub fn push(&self, callbacks: impl IntoIterator<Item = Callback>) {
        self.script.lock().inbox.extend(callbacks);
        self.signal.notify_one();
    }

    pub fn calls(&self) -> Vec<Call> {
        self.script.lock().calls.clone()
    }

    pub fn count(&self, call: &Call) -> usize {
        self.script.lock().calls.iter().filter(|c| *c == call).count()
    }

    /// Callbacks not yet pumped by the driver
    pub fn queued(&self) -> usize {
        self.script.lock().inbox.len()
    }

    pub fn is_connected(&self) -> bool {
        self.script.lock().connected
    }
}

pub struct ScriptedVendor {
    handle: ScriptHandle,
}

impl ScriptedVendor {
    pub fn new() -> (Self, ScriptHandle) {
        let handle = ScriptHandle::default();
        (Self { handle: handle.clone() }, handle)
    }

    pub fn refusing() -> (Self, ScriptHandle) {
        let (vendor, handle) = Self::new();
        handle.script.lock().refuse = true;
        (vendor, handle)
    }

    fn record(&self, call: Call) {
        self.handle.script.lock().calls.push(call);
    }
}

pub fn bar(index: usize) -> VendorBar {
    VendorBar {
        time: format!("2024{:02}{:02}", index / 28 % 12 + 1, index % 28 + 1),
        open: 100.0 + index as f64,
        high: 102.0 + index as f64,
        low: 99.0 + index as f64,
        close: 101.0 + index as f64,
        volume: format!("{}", 1_000 + index),
    }
}

impl VendorClient for ScriptedVendor {
    fn connect(&mut self, _host: &str, _port: u16, _client_id: i32) -> bool {
        let mut script = self.handle.script.lock();
        if script.refuse {
            return false;
        }
        script.connected = true;
        script.calls.push(Call::Connect);
        true
    }

    fn is_connected(&self) -> bool {
        self.handle.script.lock().connected
    }

    fn disconnect(&mut self) {
        let mut script = self.handle.script.lock();
        script.connected = false;
        script.calls.push(Call::Disconnect);
    }

    fn start_reader(&mut self) {
        self.record(Call::StartReader);
    }

    fn wait_for_signal(&self, timeout: Duration) {
        let mut script = self.handle.script.lock();
        if script.inbox.is_empty() {
            let _ = self.handle.signal.wait_for(&mut script, timeout);
        }
    }

    fn process_messages(&mut self, handler: &mut dyn VendorCallbacks) {
        let batch = {
            let mut script = self.handle.script.lock();
            let mut batch = Vec::new();
            while let Some(callback) = script.inbox.pop_front() {
                if matches!(callback, Callback::DropConnection) {
                    script.connected = false;
                    break;
                }
                batch.push(callback);
            }
            batch
        };

        for callback in batch {
            match callback {
                Callback::Row { request_id, rank, symbol } => {
                    handler.scanner_data(request_id, rank, &VendorContract::stock(&symbol))
                }
                Callback::RowsEnd(request_id) => handler.scanner_data_end(request_id),
                Callback::Bar { request_id, index } => handler.historical_data(request_id, &bar(index)),
                Callback::BarsEnd(request_id) => handler.historical_data_end(request_id, "", ""),
                Callback::Parameters(xml) => handler.scanner_parameters(&xml),
                Callback::AccountValue { key, value } => {
                    handler.update_account_value(&key, &value, "USD", "DU1234567")
                }
                Callback::Position { symbol, size } => {
                    handler.position("DU1234567", &VendorContract::stock(&symbol), &size, 10.0)
                }
                Callback::Tick { request_id, price } => {
                    handler.tick_price(request_id, TickType::LAST, price)
                }
                Callback::DropConnection => {}
            }
        }
    }

    fn request_scanner_subscription(&mut self, request_id: RequestId, subscription: &ScannerSubscription) {
        let price_above = subscription
            .filters
            .iter()
            .find(|(tag, _)| tag == "priceAbove")
            .map(|(_, v)| v.clone())
            .unwrap_or_default();
        self.record(Call::Scan {
            request_id,
            scan_code: subscription.scan_code.clone(),
            price_above,
        });
    }

    fn cancel_scanner_subscription(&mut self, request_id: RequestId) {
        self.record(Call::CancelScan(request_id));
    }

    fn request_scanner_parameters(&mut self) {
        self.record(Call::ScannerParameters);
    }

    fn request_historical_data(&mut self, request_id: RequestId, query: &HistoricalQuery) {
        self.record(Call::History {
            request_id,
            symbol: query.contract.symbol.clone(),
        });
    }

    fn cancel_historical_data(&mut self, request_id: RequestId) {
        self.record(Call::CancelHistory(request_id));
    }

    fn request_account_updates(&mut self, subscribe: bool, account_code: &str) {
        self.record(Call::Account {
            subscribe,
            code: account_code.to_string(),
        });
    }

    fn request_positions(&mut self) {
        self.record(Call::Positions);
    }

    fn request_market_data(&mut self, request_id: RequestId, contract: &VendorContract) {
        self.record(Call::Quotes {
            request_id,
            symbol: contract.symbol.clone(),
        });
    }

    fn cancel_market_data(&mut self, request_id: RequestId) {
        self.record(Call::CancelQuotes(request_id));
    }
}

/// Poll `condition` until it holds or `timeout` passes
pub fn wait_until(timeout: Duration, mut condition: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        std::thread::sleep(Duration::from_millis(2));
    }
    condition()
}

/// Drain `bridge` until `count` events have arrived or `timeout` passes
pub fn collect_events(bridge: &chart_terminal::Bridge, count: usize, timeout: Duration) -> Vec<Event> {
    let mut events = Vec::new();
    wait_until(timeout, || {
        events.extend(bridge.drain());
        events.len() >= count
    });
    events
}

pub const TIMEOUT: Duration = Duration::from_secs(5);

pub fn rows(request_id: RequestId, ranks: &[i32]) -> Vec<Callback> {
    ranks
        .iter()
        .map(|&rank| Callback::Row {
            request_id,
            rank,
            symbol: format!("SYM{rank}"),
        })
        .collect()
}

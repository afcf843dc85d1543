//! # Inbound Aggregator
//!
//! Turns the broker's stream of partial callbacks into one [`Event`] per
//! logical request.
//!
//! - Scanner rows and historical bars are buffered per request id and released
//!   as a single `ScanCompleted` / `SeriesCompleted` when the end marker for
//!   that id arrives. An empty buffer at end time releases nothing.
//! - Account values, portfolio rows and positions are not buffered: each
//!   callback becomes its own partial `AccountSnapshot` immediately, since the
//!   broker sends no "account complete" marker. The foreground merges them.
//! - Quote ticks are forwarded one by one.
//!
//! The aggregator is owned by the network driver thread and is only ever
//! touched from inside the vendor's message pump, so it carries no locks.
//!
//! ## Limits
//!
//! Each pending buffer is capped at `max_pending_rows`; extra partials for that
//! id are dropped and the end marker releases the truncated buffer. A buffer
//! that has received no partial for `pending_timeout` is evicted without a
//! result by [`InboundAggregator::expire_stale`]. The evicted id is remembered:
//! its later partials are ignored and its end marker releases nothing, so a
//! tail of rows is never published as a complete result. The mark clears at
//! that end marker, on cancel, or when the id is issued again.
//!
//! A series symbol registered at dispatch stays until the end marker, a cancel
//! or driver shutdown. The broker may hold paced history requests for minutes
//! before the first bar, so silence before any data is not treated as stale.

use crate::bridge::Bridge;
use crate::core::service::{TickType, VendorBar, VendorCallbacks, VendorContract};
use shared::{AccountValue, Bar, Event, Position, RequestId, ScanRow};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, trace, warn};

/// Bounds applied to pending buffers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AggregatorLimits {
    /// Maximum rows/bars buffered per request id
    pub max_pending_rows: usize,
    /// Quiet period after which an unterminated buffer is evicted; `None` keeps forever
    pub pending_timeout: Option<Duration>,
}

impl Default for AggregatorLimits {
    fn default() -> Self {
        Self {
            max_pending_rows: 10_000,
            pending_timeout: Some(Duration::from_secs(120)),
        }
    }
}

/// Rows collected for one request id.
#[derive(Debug)]
struct Pending<T> {
    items: Vec<T>,
    /// Arrival of the latest partial
    touched_at: Instant,
    overflowed: bool,
}

impl<T> Pending<T> {
    fn new(now: Instant) -> Self {
        Self {
            items: Vec::new(),
            touched_at: now,
            overflowed: false,
        }
    }
}

/// Callback handler that accumulates partial results and publishes completed ones.
pub struct InboundAggregator {
    bridge: Arc<Bridge>,
    limits: AggregatorLimits,
    pending_scans: HashMap<RequestId, Pending<ScanRow>>,
    pending_bars: HashMap<RequestId, Pending<Bar>>,
    /// Symbol of each in-flight series request; end markers carry only the id
    series_symbols: HashMap<RequestId, String>,
    /// Ids evicted by `expire_stale` whose stream has not ended yet
    expired_scans: HashSet<RequestId>,
    expired_series: HashSet<RequestId>,
}

impl InboundAggregator {
    pub fn new(bridge: Arc<Bridge>, limits: AggregatorLimits) -> Self {
        Self {
            bridge,
            limits,
            pending_scans: HashMap::new(),
            pending_bars: HashMap::new(),
            series_symbols: HashMap::new(),
            expired_scans: HashSet::new(),
            expired_series: HashSet::new(),
        }
    }

    /// Accept rows for a newly issued scan id, lifting any eviction mark.
    pub fn register_scan(&mut self, request_id: RequestId) {
        if self.expired_scans.remove(&request_id) {
            debug!(request_id, "Scan id reissued after eviction");
        }
    }

    /// Remember which symbol a series request id belongs to.
    pub fn register_series(&mut self, request_id: RequestId, symbol: &str) {
        if self.expired_series.remove(&request_id) {
            debug!(request_id, "Series id reissued after eviction");
        }
        if let Some(previous) = self
            .series_symbols
            .insert(request_id, symbol.to_string())
        {
            warn!(
                request_id,
                previous = %previous,
                symbol = %symbol,
                "Series request id reused while still in flight"
            );
        }
    }

    /// Drop everything buffered for a cancelled series request.
    pub fn forget_series(&mut self, request_id: RequestId) {
        let bars = self
            .pending_bars
            .remove(&request_id)
            .map(|p| p.items.len())
            .unwrap_or(0);
        self.series_symbols.remove(&request_id);
        self.expired_series.remove(&request_id);
        debug!(request_id, discarded_bars = bars, "Series request cancelled");
    }

    /// Drop the buffered rows of a cancelled scan.
    pub fn forget_scan(&mut self, request_id: RequestId) {
        self.expired_scans.remove(&request_id);
        if let Some(pending) = self.pending_scans.remove(&request_id) {
            debug!(
                request_id,
                discarded_rows = pending.items.len(),
                "Scan cancelled before end marker"
            );
        }
    }

    /// Evict buffers that have gone quiet for the pending timeout, together
    /// with the symbol of an evicted series.
    ///
    /// Returns the number of request ids evicted.
    pub fn expire_stale(&mut self, now: Instant) -> usize {
        let Some(timeout) = self.limits.pending_timeout else {
            return 0;
        };
        let is_stale = |touched_at: Instant| now.saturating_duration_since(touched_at) >= timeout;

        let mut evicted_scans = Vec::new();
        self.pending_scans.retain(|&request_id, pending| {
            let keep = !is_stale(pending.touched_at);
            if !keep {
                warn!(
                    request_id,
                    rows = pending.items.len(),
                    timeout_secs = timeout.as_secs(),
                    "Scan went quiet before its end marker - dropping buffered rows"
                );
                evicted_scans.push(request_id);
            }
            keep
        });

        let mut evicted_series = Vec::new();
        self.pending_bars.retain(|&request_id, pending| {
            let keep = !is_stale(pending.touched_at);
            if !keep {
                warn!(
                    request_id,
                    bars = pending.items.len(),
                    timeout_secs = timeout.as_secs(),
                    "Series went quiet before its end marker - dropping buffered bars"
                );
                evicted_series.push(request_id);
            }
            keep
        });
        for request_id in &evicted_series {
            self.series_symbols.remove(request_id);
        }

        let evicted = evicted_scans.len() + evicted_series.len();
        self.expired_scans.extend(evicted_scans);
        self.expired_series.extend(evicted_series);
        evicted
    }

    /// Throw away every pending buffer; used when the driver stops.
    ///
    /// Returns the number of request ids that never completed.
    pub fn discard_all(&mut self) -> usize {
        let dropped = self.pending_scans.len() + self.pending_bars.len();
        self.pending_scans.clear();
        self.pending_bars.clear();
        self.series_symbols.clear();
        self.expired_scans.clear();
        self.expired_series.clear();
        dropped
    }

    /// Request ids with rows or bars still buffered
    pub fn pending_count(&self) -> usize {
        self.pending_scans.len() + self.pending_bars.len()
    }

    fn push_limited<T>(
        map: &mut HashMap<RequestId, Pending<T>>,
        request_id: RequestId,
        item: T,
        max: usize,
        what: &'static str,
    ) {
        let now = Instant::now();
        let pending = map.entry(request_id).or_insert_with(|| Pending::new(now));
        pending.touched_at = now;
        if pending.items.len() < max {
            pending.items.push(item);
        } else if !pending.overflowed {
            pending.overflowed = true;
            warn!(request_id, limit = max, what, "Pending buffer full - dropping further partials");
        }
    }
}

impl VendorCallbacks for InboundAggregator {
    fn connect_ack(&mut self) {
        debug!("Broker acknowledged connection");
    }

    fn tick_price(&mut self, ticker_id: RequestId, field: TickType, price: f64) {
        if let Some(field) = field.price_field() {
            self.bridge.publish(Event::Quote {
                request_id: ticker_id,
                field,
                value: price,
            });
        }
    }

    fn tick_size(&mut self, ticker_id: RequestId, field: TickType, size: &str) {
        if let Some(field) = field.size_field() {
            self.bridge.publish(Event::Quote {
                request_id: ticker_id,
                field,
                value: shared::parse_amount(size),
            });
        }
    }

    fn historical_data(&mut self, request_id: RequestId, bar: &VendorBar) {
        if self.expired_series.contains(&request_id) {
            trace!(request_id, "Ignoring bar for evicted series");
            return;
        }
        let bar = Bar {
            time: bar.time.clone(),
            open: bar.open,
            high: bar.high,
            low: bar.low,
            close: bar.close,
            volume: shared::parse_volume(&bar.volume),
        };
        Self::push_limited(
            &mut self.pending_bars,
            request_id,
            bar,
            self.limits.max_pending_rows,
            "bars",
        );
    }

    fn historical_data_end(&mut self, request_id: RequestId, start: &str, end: &str) {
        if self.expired_series.remove(&request_id) {
            debug!(request_id, "End marker for evicted series - nothing delivered");
            return;
        }
        let bars = self
            .pending_bars
            .remove(&request_id)
            .map(|p| p.items)
            .unwrap_or_default();
        let symbol = self
            .series_symbols
            .remove(&request_id)
            .unwrap_or_default();

        if bars.is_empty() || symbol.is_empty() {
            debug!(
                request_id,
                bars = bars.len(),
                has_symbol = !symbol.is_empty(),
                "Series ended with nothing to deliver"
            );
            return;
        }

        debug!(request_id, symbol = %symbol, bars = bars.len(), start, end, "Series completed");
        self.bridge.publish(Event::SeriesCompleted {
            request_id,
            symbol,
            bars,
        });
    }

    fn scanner_parameters(&mut self, xml: &str) {
        debug!(bytes = xml.len(), "Scanner parameters received");
        self.bridge.publish(Event::ScannerParameters {
            xml: xml.to_string(),
        });
    }

    fn scanner_data(&mut self, request_id: RequestId, rank: i32, contract: &VendorContract) {
        if self.expired_scans.contains(&request_id) {
            trace!(request_id, rank, "Ignoring row for evicted scan");
            return;
        }
        trace!(request_id, rank, symbol = %contract.symbol, "Scanner row");
        let row = ScanRow {
            rank,
            symbol: contract.symbol.clone(),
            instrument_type: contract.sec_type.clone(),
            currency: contract.currency.clone(),
            contract_id: contract.con_id,
        };
        Self::push_limited(
            &mut self.pending_scans,
            request_id,
            row,
            self.limits.max_pending_rows,
            "scan rows",
        );
    }

    fn scanner_data_end(&mut self, request_id: RequestId) {
        if self.expired_scans.remove(&request_id) {
            debug!(request_id, "End marker for evicted scan - nothing delivered");
            return;
        }
        let rows = self
            .pending_scans
            .remove(&request_id)
            .map(|p| p.items)
            .unwrap_or_default();
        if rows.is_empty() {
            debug!(request_id, "Scan ended with no rows");
            return;
        }
        debug!(request_id, rows = rows.len(), "Scan completed");
        self.bridge
            .publish(Event::ScanCompleted { request_id, rows });
    }

    fn update_account_value(&mut self, key: &str, value: &str, currency: &str, account_name: &str) {
        trace!(key, value, currency, "Account value update");
        self.bridge.publish(Event::account_value(
            key,
            AccountValue {
                value: value.to_string(),
                currency: currency.to_string(),
                account_name: account_name.to_string(),
            },
        ));
    }

    fn update_portfolio(
        &mut self,
        contract: &VendorContract,
        position: &str,
        market_price: f64,
        market_value: f64,
        average_cost: f64,
        unrealized_pnl: f64,
        realized_pnl: f64,
        account_name: &str,
    ) {
        trace!(symbol = %contract.symbol, position, "Portfolio update");
        self.bridge.publish(Event::position(Position {
            account: account_name.to_string(),
            symbol: contract.symbol.clone(),
            instrument_type: contract.sec_type.clone(),
            size: shared::parse_amount(position),
            market_price,
            market_value,
            average_cost,
            unrealized_pnl,
            realized_pnl,
        }));
    }

    fn position(&mut self, account: &str, contract: &VendorContract, position: &str, average_cost: f64) {
        trace!(symbol = %contract.symbol, position, "Position update");
        self.bridge.publish(Event::position(Position {
            account: account.to_string(),
            symbol: contract.symbol.clone(),
            instrument_type: contract.sec_type.clone(),
            size: shared::parse_amount(position),
            market_price: 0.0,
            market_value: 0.0,
            average_cost,
            unrealized_pnl: 0.0,
            realized_pnl: 0.0,
        }));
    }
}

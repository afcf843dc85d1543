//! # Paper Broker Client
//!
//! In-process stand-in for the broker's socket client. Requests are answered
//! with synthetic callbacks queued on an inbox; [`PaperClient::process_messages`]
//! replays them into the handler exactly the way the real client re-enters its
//! callback table.
//!
//! - Scans rank a fixed universe of US stocks above the requested price floor.
//! - Historical requests produce a seeded random walk sized by duration and
//!   bar size, with weekday-only dates for daily bars.
//! - Account subscriptions produce summary values and portfolio rows.
//! - Quote subscriptions stream ticks from a background reader thread until
//!   cancelled or disconnected.
//!
//! A `parking_lot::Condvar` over the inbox acts as the readiness signal.

use crate::core::service::{
    HistoricalQuery, ScannerSubscription, TickType, VendorBar, VendorCallbacks, VendorClient,
    VendorContract,
};
use chrono::{Datelike, Days, Duration as ChronoDuration, Local, NaiveDate, NaiveDateTime, Weekday};
use parking_lot::{Condvar, Mutex};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use shared::RequestId;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Scan results are capped like the broker's own scanner
const MAX_SCAN_ROWS: usize = 50;
/// Upper bound on bars per historical request
const MAX_BARS: usize = 2_000;
const DEFAULT_ACCOUNT: &str = "DU0000000";

/// (symbol, last price, daily change %, average volume, contract id)
const UNIVERSE: &[(&str, f64, f64, i64, i64)] = &[
    ("AAPL", 189.5, 1.2, 55_000_000, 265598),
    ("MSFT", 415.2, 0.6, 22_000_000, 272093),
    ("NVDA", 875.4, 4.8, 48_000_000, 4815747),
    ("AMD", 178.3, 3.9, 60_000_000, 4391),
    ("TSLA", 182.6, -2.7, 95_000_000, 76792991),
    ("AMZN", 178.1, 0.9, 40_000_000, 3691937),
    ("META", 497.8, 2.1, 15_000_000, 107113386),
    ("GOOGL", 152.4, -0.4, 25_000_000, 208813719),
    ("INTC", 31.2, -3.5, 45_000_000, 270639),
    ("PLTR", 24.7, 6.3, 70_000_000, 444857009),
    ("SOFI", 7.8, 5.1, 40_000_000, 448045490),
    ("F", 12.1, -1.1, 50_000_000, 9599491),
    ("NIO", 4.6, 7.4, 55_000_000, 332794741),
    ("SNAP", 11.3, -4.2, 30_000_000, 268084645),
    ("JPM", 198.6, 0.3, 9_000_000, 1520593),
    ("XOM", 118.9, -0.8, 17_000_000, 13977),
];

const SCANNER_PARAMETERS_XML: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<ScanParameterResponse>
  <InstrumentList><Instrument><type>STK</type><name>US Stocks</name></Instrument></InstrumentList>
  <LocationTree><Location><locationCode>STK.US.MAJOR</locationCode><displayName>US Major</displayName></Location></LocationTree>
  <ScanTypeList>
    <ScanType><scanCode>TOP_PERC_GAIN</scanCode><displayName>Top % Gainers</displayName></ScanType>
    <ScanType><scanCode>TOP_PERC_LOSE</scanCode><displayName>Top % Losers</displayName></ScanType>
    <ScanType><scanCode>MOST_ACTIVE</scanCode><displayName>Most Active</displayName></ScanType>
  </ScanTypeList>
  <FilterList><RangeFilter><id>priceAbove</id><category>Price</category></RangeFilter></FilterList>
</ScanParameterResponse>"#;

/// One queued callback.
#[derive(Debug, Clone)]
enum PaperMessage {
    ConnectAck,
    ScannerRow { request_id: RequestId, rank: i32, contract: VendorContract },
    ScannerEnd { request_id: RequestId },
    ScannerParameters(String),
    Bar { request_id: RequestId, bar: VendorBar },
    HistoryEnd { request_id: RequestId, start: String, end: String },
    AccountValue { key: String, value: String, currency: String, account: String },
    Portfolio { contract: VendorContract, position: String, market_price: f64, average_cost: f64, account: String },
    Position { account: String, contract: VendorContract, position: String, average_cost: f64 },
    TickPrice { request_id: RequestId, field: TickType, price: f64 },
    TickSize { request_id: RequestId, field: TickType, size: String },
}

#[derive(Debug)]
struct QuoteStream {
    last: f64,
    volume: i64,
}

struct Inbox {
    messages: VecDeque<PaperMessage>,
    quotes: HashMap<RequestId, QuoteStream>,
    rng: StdRng,
}

struct Shared {
    inbox: Mutex<Inbox>,
    signal: Condvar,
    connected: AtomicBool,
}

impl Shared {
    fn push_all(&self, messages: impl IntoIterator<Item = PaperMessage>) {
        self.inbox.lock().messages.extend(messages);
        self.signal.notify_one();
    }
}

/// Synthetic broker client.
pub struct PaperClient {
    shared: Arc<Shared>,
    refuse_connect: bool,
    tick_interval: Duration,
    account: String,
    reader: Option<JoinHandle<()>>,
}

impl PaperClient {
    pub fn new() -> Self {
        Self::with_seed(0x5EED)
    }

    /// Deterministic client: same seed, same bars and ticks
    pub fn with_seed(seed: u64) -> Self {
        Self {
            shared: Arc::new(Shared {
                inbox: Mutex::new(Inbox {
                    messages: VecDeque::new(),
                    quotes: HashMap::new(),
                    rng: StdRng::seed_from_u64(seed),
                }),
                signal: Condvar::new(),
                connected: AtomicBool::new(false),
            }),
            refuse_connect: false,
            tick_interval: Duration::from_millis(250),
            account: DEFAULT_ACCOUNT.to_string(),
            reader: None,
        }
    }

    /// A client whose `connect` always fails
    pub fn refusing() -> Self {
        let mut client = Self::new();
        client.refuse_connect = true;
        client
    }

    /// How often the reader thread emits quote ticks
    pub fn with_tick_interval(mut self, interval: Duration) -> Self {
        self.tick_interval = interval;
        self
    }

    /// Callbacks queued but not yet pumped
    pub fn queued(&self) -> usize {
        self.shared.inbox.lock().messages.len()
    }

    fn stop_reader(&mut self) {
        if let Some(reader) = self.reader.take() {
            if reader.join().is_err() {
                warn!("Paper reader thread panicked");
            }
        }
    }
}

impl Default for PaperClient {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for PaperClient {
    fn drop(&mut self) {
        self.shared.connected.store(false, Ordering::SeqCst);
        self.stop_reader();
    }
}

impl VendorClient for PaperClient {
    fn connect(&mut self, host: &str, port: u16, client_id: i32) -> bool {
        if self.refuse_connect {
            warn!(host, port, "Paper client refusing connection");
            return false;
        }
        info!(host, port, client_id, "Paper client connected");
        self.shared.connected.store(true, Ordering::SeqCst);
        self.shared.push_all([PaperMessage::ConnectAck]);
        true
    }

    fn is_connected(&self) -> bool {
        self.shared.connected.load(Ordering::SeqCst)
    }

    fn disconnect(&mut self) {
        self.shared.connected.store(false, Ordering::SeqCst);
        self.shared.signal.notify_all();
        self.stop_reader();
        debug!("Paper client disconnected");
    }

    fn start_reader(&mut self) {
        if self.reader.is_some() {
            return;
        }
        let shared = Arc::clone(&self.shared);
        let interval = self.tick_interval;
        let spawned = std::thread::Builder::new()
            .name("paper-reader".to_string())
            .spawn(move || {
                while shared.connected.load(Ordering::SeqCst) {
                    std::thread::sleep(interval);
                    let mut inbox = shared.inbox.lock();
                    let ticks = stream_ticks(&mut inbox);
                    if !ticks.is_empty() {
                        inbox.messages.extend(ticks);
                        shared.signal.notify_one();
                    }
                }
            });
        match spawned {
            Ok(handle) => self.reader = Some(handle),
            Err(e) => warn!(error = %e, "Paper reader thread failed to start - no quote stream"),
        }
    }

    fn wait_for_signal(&self, timeout: Duration) {
        let mut inbox = self.shared.inbox.lock();
        if inbox.messages.is_empty() && self.is_connected() {
            let _ = self.shared.signal.wait_for(&mut inbox, timeout);
        }
    }

    fn process_messages(&mut self, handler: &mut dyn VendorCallbacks) {
        let batch = std::mem::take(&mut self.shared.inbox.lock().messages);
        for message in batch {
            replay(message, handler);
        }
    }

    fn request_scanner_subscription(&mut self, request_id: RequestId, subscription: &ScannerSubscription) {
        let floor = subscription
            .filters
            .iter()
            .find(|(tag, _)| tag == "priceAbove")
            .and_then(|(_, value)| value.parse::<f64>().ok())
            .unwrap_or(0.0);
        let rows = scan_universe(&subscription.scan_code, floor);
        debug!(request_id, scan_code = %subscription.scan_code, floor, rows = rows.len(), "Paper scan");

        let mut messages: Vec<PaperMessage> = rows
            .into_iter()
            .enumerate()
            .map(|(rank, contract)| PaperMessage::ScannerRow {
                request_id,
                rank: rank as i32,
                contract,
            })
            .collect();
        messages.push(PaperMessage::ScannerEnd { request_id });
        self.shared.push_all(messages);
    }

    fn cancel_scanner_subscription(&mut self, request_id: RequestId) {
        debug!(request_id, "Paper scan cancelled");
    }

    fn request_scanner_parameters(&mut self) {
        self.shared
            .push_all([PaperMessage::ScannerParameters(SCANNER_PARAMETERS_XML.to_string())]);
    }

    fn request_historical_data(&mut self, request_id: RequestId, query: &HistoricalQuery) {
        let count = bar_count(&query.duration, &query.bar_size);
        let step = bar_seconds(&query.bar_size).unwrap_or(86_400);
        let end = parse_end(&query.end_date_time);
        let start_price = UNIVERSE
            .iter()
            .find(|(symbol, ..)| *symbol == query.contract.symbol)
            .map(|(_, price, ..)| *price)
            .unwrap_or(100.0);

        let bars = {
            let mut inbox = self.shared.inbox.lock();
            random_walk(&mut inbox.rng, start_price, count, step, end)
        };
        debug!(request_id, symbol = %query.contract.symbol, bars = bars.len(), "Paper history");

        let start = bars.first().map(|b| b.time.clone()).unwrap_or_default();
        let finish = bars.last().map(|b| b.time.clone()).unwrap_or_default();
        let mut messages: Vec<PaperMessage> = bars
            .into_iter()
            .map(|bar| PaperMessage::Bar { request_id, bar })
            .collect();
        messages.push(PaperMessage::HistoryEnd {
            request_id,
            start,
            end: finish,
        });
        self.shared.push_all(messages);
    }

    fn cancel_historical_data(&mut self, request_id: RequestId) {
        self.shared.inbox.lock().messages.retain(|m| {
            !matches!(m, PaperMessage::Bar { request_id: id, .. } | PaperMessage::HistoryEnd { request_id: id, .. } if *id == request_id)
        });
    }

    fn request_account_updates(&mut self, subscribe: bool, account_code: &str) {
        if !subscribe {
            return;
        }
        self.account = account_code.to_string();
        let account = self.account.clone();
        let entry = |key: &str, value: &str| PaperMessage::AccountValue {
            key: key.to_string(),
            value: value.to_string(),
            currency: "USD".to_string(),
            account: account.clone(),
        };
        let mut messages = vec![
            entry("NetLiquidation", "125430.55"),
            entry("AvailableFunds", "48210.10"),
            entry("BuyingPower", "192840.40"),
            entry("TotalCashValue", "48210.10"),
        ];
        messages.extend(holdings().into_iter().map(|(contract, size, price, cost)| {
            PaperMessage::Portfolio {
                contract,
                position: size.to_string(),
                market_price: price,
                average_cost: cost,
                account: account.clone(),
            }
        }));
        self.shared.push_all(messages);
    }

    fn request_positions(&mut self) {
        let account = self.account.clone();
        self.shared.push_all(holdings().into_iter().map(|(contract, size, _, cost)| {
            PaperMessage::Position {
                account: account.clone(),
                contract,
                position: size.to_string(),
                average_cost: cost,
            }
        }));
    }

    fn request_market_data(&mut self, request_id: RequestId, contract: &VendorContract) {
        let (last, close, volume) = UNIVERSE
            .iter()
            .find(|(symbol, ..)| *symbol == contract.symbol)
            .map(|(_, price, change, volume, _)| (*price, price / (1.0 + change / 100.0), *volume))
            .unwrap_or((100.0, 100.0, 1_000_000));
        let mut inbox = self.shared.inbox.lock();
        inbox.quotes.insert(request_id, QuoteStream { last, volume });
        inbox.messages.extend([
            PaperMessage::TickPrice { request_id, field: TickType::CLOSE, price: close },
            PaperMessage::TickPrice { request_id, field: TickType::LAST, price: last },
        ]);
        drop(inbox);
        self.shared.signal.notify_one();
    }

    fn cancel_market_data(&mut self, request_id: RequestId) {
        let mut inbox = self.shared.inbox.lock();
        inbox.quotes.remove(&request_id);
        inbox.messages.retain(|m| {
            !matches!(m, PaperMessage::TickPrice { request_id: id, .. } | PaperMessage::TickSize { request_id: id, .. } if *id == request_id)
        });
    }
}

fn replay(message: PaperMessage, handler: &mut dyn VendorCallbacks) {
    match message {
        PaperMessage::ConnectAck => handler.connect_ack(),
        PaperMessage::ScannerRow { request_id, rank, contract } => {
            handler.scanner_data(request_id, rank, &contract)
        }
        PaperMessage::ScannerEnd { request_id } => handler.scanner_data_end(request_id),
        PaperMessage::ScannerParameters(xml) => handler.scanner_parameters(&xml),
        PaperMessage::Bar { request_id, bar } => handler.historical_data(request_id, &bar),
        PaperMessage::HistoryEnd { request_id, start, end } => {
            handler.historical_data_end(request_id, &start, &end)
        }
        PaperMessage::AccountValue { key, value, currency, account } => {
            handler.update_account_value(&key, &value, &currency, &account)
        }
        PaperMessage::Portfolio { contract, position, market_price, average_cost, account } => {
            let size = shared::parse_amount(&position);
            let market_value = size * market_price;
            let unrealized = (market_price - average_cost) * size;
            handler.update_portfolio(
                &contract,
                &position,
                market_price,
                market_value,
                average_cost,
                unrealized,
                0.0,
                &account,
            )
        }
        PaperMessage::Position { account, contract, position, average_cost } => {
            handler.position(&account, &contract, &position, average_cost)
        }
        PaperMessage::TickPrice { request_id, field, price } => handler.tick_price(request_id, field, price),
        PaperMessage::TickSize { request_id, field, size } => handler.tick_size(request_id, field, &size),
    }
}

/// Universe members above `floor`, ordered for `scan_code`
fn scan_universe(scan_code: &str, floor: f64) -> Vec<VendorContract> {
    let mut candidates: Vec<_> = UNIVERSE.iter().filter(|(_, price, ..)| *price > floor).collect();
    match scan_code {
        "TOP_PERC_GAIN" => candidates.sort_by(|a, b| b.2.total_cmp(&a.2)),
        "TOP_PERC_LOSE" => candidates.sort_by(|a, b| a.2.total_cmp(&b.2)),
        "MOST_ACTIVE" => candidates.sort_by(|a, b| b.3.cmp(&a.3)),
        _ => candidates.sort_by(|a, b| a.0.cmp(&b.0)),
    }
    candidates
        .into_iter()
        .take(MAX_SCAN_ROWS)
        .map(|(symbol, _, _, _, con_id)| VendorContract {
            con_id: *con_id,
            ..VendorContract::stock(symbol)
        })
        .collect()
}

/// (contract, size, market price, average cost)
fn holdings() -> Vec<(VendorContract, f64, f64, f64)> {
    vec![
        (VendorContract { con_id: 265598, ..VendorContract::stock("AAPL") }, 100.0, 189.5, 152.3),
        (VendorContract { con_id: 4815747, ..VendorContract::stock("NVDA") }, 25.0, 875.4, 610.0),
        (VendorContract { con_id: 76792991, ..VendorContract::stock("TSLA") }, -10.0, 182.6, 201.4),
    ]
}

/// Length in seconds of a bar size such as "1 day", "5 mins", "1 hour"
fn bar_seconds(bar_size: &str) -> Option<i64> {
    let mut parts = bar_size.split_whitespace();
    let n: i64 = parts.next()?.parse().ok().filter(|n| *n > 0)?;
    let unit = parts.next()?;
    let unit_secs = match unit.trim_end_matches('s') {
        "sec" => 1,
        "min" => 60,
        "hour" => 3_600,
        "day" => 86_400,
        "week" => 7 * 86_400,
        "month" => 30 * 86_400,
        _ => return None,
    };
    n.checked_mul(unit_secs)
}

/// Length in seconds of a duration such as "1 Y", "30 D", "3600 S"
fn duration_seconds(duration: &str) -> Option<i64> {
    let mut parts = duration.split_whitespace();
    let n: i64 = parts.next()?.parse().ok().filter(|n| *n > 0)?;
    let unit_secs = match parts.next()? {
        "S" => 1,
        "D" => 86_400,
        "W" => 7 * 86_400,
        "M" => 30 * 86_400,
        "Y" => 365 * 86_400,
        _ => return None,
    };
    n.checked_mul(unit_secs)
}

fn bar_count(duration: &str, bar_size: &str) -> usize {
    let (Some(total), Some(step)) = (duration_seconds(duration), bar_seconds(bar_size)) else {
        return 0;
    };
    let mut count = total / step;
    if step == 86_400 {
        // Weekends carry no daily bars
        count = count * 5 / 7;
    }
    (count.max(1) as usize).min(MAX_BARS)
}

/// End of the requested window; empty means now
fn parse_end(end_date_time: &str) -> NaiveDateTime {
    let trimmed = end_date_time.get(..17).unwrap_or(end_date_time);
    NaiveDateTime::parse_from_str(trimmed, "%Y%m%d %H:%M:%S")
        .ok()
        .or_else(|| {
            NaiveDate::parse_from_str(trimmed, "%Y%m%d")
                .ok()
                .and_then(|d| d.and_hms_opt(16, 0, 0))
        })
        .unwrap_or_else(|| Local::now().naive_local())
}

fn is_weekend(date: NaiveDate) -> bool {
    matches!(date.weekday(), Weekday::Sat | Weekday::Sun)
}

/// Bar timestamps walking back from `end`, returned oldest first
fn bar_times(count: usize, step: i64, end: NaiveDateTime) -> Vec<String> {
    let mut times = Vec::with_capacity(count);
    if step == 86_400 {
        let mut date = end.date();
        while times.len() < count {
            if !is_weekend(date) {
                times.push(date.format("%Y%m%d").to_string());
            }
            match date.pred_opt() {
                Some(previous) => date = previous,
                None => break,
            }
        }
    } else if step > 86_400 {
        let mut date = end.date();
        let stride = Days::new((step / 86_400) as u64);
        while times.len() < count {
            times.push(date.format("%Y%m%d").to_string());
            match date.checked_sub_days(stride) {
                Some(previous) => date = previous,
                None => break,
            }
        }
    } else {
        let mut at = end;
        let stride = ChronoDuration::seconds(step);
        while times.len() < count {
            times.push(at.format("%Y%m%d %H:%M:%S").to_string());
            match at.checked_sub_signed(stride) {
                Some(previous) => at = previous,
                None => break,
            }
        }
    }
    times.reverse();
    times
}

fn random_walk(rng: &mut StdRng, start_price: f64, count: usize, step: i64, end: NaiveDateTime) -> Vec<VendorBar> {
    let mut price = start_price;
    bar_times(count, step, end)
        .into_iter()
        .map(|time| {
            let open = price;
            let close = (open * (1.0 + rng.random_range(-0.03..0.03))).max(0.01);
            let high = open.max(close) * (1.0 + rng.random_range(0.0..0.015));
            let low = (open.min(close) * (1.0 - rng.random_range(0.0..0.015))).max(0.01);
            let volume: i64 = rng.random_range(100_000..5_000_000);
            price = close;
            VendorBar { time, open, high, low, close, volume: volume.to_string() }
        })
        .collect()
}

/// One round of ticks for every live quote subscription
fn stream_ticks(inbox: &mut Inbox) -> Vec<PaperMessage> {
    let Inbox { quotes, rng, .. } = inbox;
    let mut ticks = Vec::with_capacity(quotes.len() * 2);
    for (&request_id, stream) in quotes.iter_mut() {
        stream.last = (stream.last * (1.0 + rng.random_range(-0.002..0.002))).max(0.01);
        stream.volume += rng.random_range(100..10_000);
        ticks.push(PaperMessage::TickPrice { request_id, field: TickType::LAST, price: stream.last });
        ticks.push(PaperMessage::TickSize { request_id, field: TickType::VOLUME, size: stream.volume.to_string() });
    }
    ticks
}

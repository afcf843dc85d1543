//! # Market Data Transfer Objects
//!
//! Value types built from brokerage callbacks: scanner rows, historical bars,
//! account values, positions and quote fields.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// Caller-assigned request identifier.
///
/// Uniqueness among outstanding requests of the same kind is the caller's
/// responsibility; nothing in the bridge allocates or validates ids.
pub type RequestId = i32;

/// One ranked row of a market scanner result.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ScanRow {
    pub rank: i32,
    pub symbol: String,
    /// Security type as reported by the broker ("STK", "OPT", ...)
    pub instrument_type: String,
    pub currency: String,
    pub contract_id: i64,
}

/// One OHLCV bar of a historical series.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Bar {
    /// Broker timestamp, `YYYYMMDD` for daily bars or `YYYYMMDD HH:MM:SS` intraday
    pub time: String,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: i64,
}

impl Bar {
    /// Parse the broker timestamp.
    ///
    /// Daily bars parse to midnight. Anything after the seconds field (a time
    /// zone suffix, for instance) is ignored. Returns `None` for unrecognised
    /// formats.
    ///
    /// ```rust
    /// use shared::dto::market::Bar;
    ///
    /// let bar = Bar { time: "20240102".into(), open: 1.0, high: 1.0, low: 1.0, close: 1.0, volume: 0 };
    /// assert_eq!(bar.parsed_time().unwrap().to_string(), "2024-01-02 00:00:00");
    /// ```
    pub fn parsed_time(&self) -> Option<NaiveDateTime> {
        let raw = self.time.trim();
        if raw.len() == 8 {
            return chrono::NaiveDate::parse_from_str(raw, "%Y%m%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0));
        }
        let head = raw.get(..17)?;
        NaiveDateTime::parse_from_str(head, "%Y%m%d %H:%M:%S").ok()
    }
}

/// A single account value update ("NetLiquidation", "BuyingPower", ...).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AccountValue {
    /// Raw value as delivered by the broker; may be non-numeric
    pub value: String,
    pub currency: String,
    pub account_name: String,
}

/// A holding in an account.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Position {
    pub account: String,
    pub symbol: String,
    pub instrument_type: String,
    /// Number of shares/contracts
    pub size: f64,
    pub market_price: f64,
    pub market_value: f64,
    pub average_cost: f64,
    pub unrealized_pnl: f64,
    pub realized_pnl: f64,
}

impl Position {
    /// Whether two position rows describe the same holding.
    pub fn same_holding(&self, other: &Position) -> bool {
        self.account == other.account
            && self.symbol == other.symbol
            && self.instrument_type == other.instrument_type
    }
}

/// Quote fields forwarded from price and size ticks.
///
/// Delayed tick types are folded onto their real-time counterparts.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum QuoteField {
    Last,
    Close,
    Bid,
    Ask,
    High,
    Low,
    Volume,
    BidSize,
    AskSize,
}

impl QuoteField {
    /// Display label for quote boards and logs
    pub fn label(&self) -> &'static str {
        match self {
            QuoteField::Last => "LAST",
            QuoteField::Close => "CLOSE",
            QuoteField::Bid => "BID",
            QuoteField::Ask => "ASK",
            QuoteField::High => "HIGH",
            QuoteField::Low => "LOW",
            QuoteField::Volume => "VOLUME",
            QuoteField::BidSize => "BID_SIZE",
            QuoteField::AskSize => "ASK_SIZE",
        }
    }

    /// Size fields carry quantities rather than prices
    pub fn is_size(&self) -> bool {
        matches!(self, QuoteField::Volume | QuoteField::BidSize | QuoteField::AskSize)
    }
}

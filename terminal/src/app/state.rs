//! # Application State Types
//!
//! Everything the foreground keeps about the broker session: the current scan,
//! loaded charts, the merged account view, live quotes and the scanner
//! parameter catalogue. Updated only from [`crate::app::App::on_tick`].

use chrono::{DateTime, Local};
use shared::{AccountValue, Bar, Position, QuoteField, RequestId, ScanRow};
use std::collections::HashMap;

/// Latest completed scanner result
#[derive(Debug, Clone, PartialEq)]
pub struct ScanState {
    pub request_id: RequestId,
    pub rows: Vec<ScanRow>,
    pub received_at: DateTime<Local>,
}

/// Bars loaded for one symbol
#[derive(Debug, Clone, PartialEq)]
pub struct ChartData {
    pub request_id: RequestId,
    pub symbol: String,
    pub bars: Vec<Bar>,
    pub received_at: DateTime<Local>,
}

impl ChartData {
    pub fn last_close(&self) -> Option<f64> {
        self.bars.last().map(|b| b.close)
    }

    /// Lowest low and highest high across the series
    pub fn price_range(&self) -> Option<(f64, f64)> {
        self.bars.iter().fold(None, |range, bar| match range {
            None => Some((bar.low, bar.high)),
            Some((low, high)) => Some((low.min(bar.low), high.max(bar.high))),
        })
    }
}

/// Account values and positions merged from partial snapshots.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AccountData {
    pub values: HashMap<String, AccountValue>,
    pub positions: Vec<Position>,
    pub net_liquidation: f64,
    pub available_funds: f64,
    pub buying_power: f64,
}

impl AccountData {
    /// Merge one snapshot. Keys overwrite; a position replaces the one with the
    /// same account, symbol and instrument type, otherwise it is appended.
    /// Applying the same snapshot twice leaves the state unchanged.
    pub fn merge(&mut self, values: HashMap<String, AccountValue>, positions: Vec<Position>) {
        for (key, value) in values {
            let amount = shared::parse_amount(&value.value);
            match key.as_str() {
                "NetLiquidation" => self.net_liquidation = amount,
                "AvailableFunds" => self.available_funds = amount,
                "BuyingPower" => self.buying_power = amount,
                _ => {}
            }
            self.values.insert(key, value);
        }

        for position in positions {
            match self.positions.iter_mut().find(|p| p.same_holding(&position)) {
                Some(existing) => *existing = position,
                None => self.positions.push(position),
            }
        }
    }

    /// Sum of unrealized P&L across positions
    pub fn unrealized_pnl(&self) -> f64 {
        self.positions.iter().map(|p| p.unrealized_pnl).sum()
    }
}

/// Latest values for one quote subscription
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QuoteSnapshot {
    pub symbol: String,
    pub values: HashMap<QuoteField, f64>,
}

impl QuoteSnapshot {
    pub fn get(&self, field: QuoteField) -> Option<f64> {
        self.values.get(&field).copied()
    }

    /// Change from the previous close in percent
    pub fn gain_pct(&self) -> Option<f64> {
        let last = self.get(QuoteField::Last)?;
        let close = self.get(QuoteField::Close)?;
        if close == 0.0 {
            return None;
        }
        Some((last - close) / close * 100.0)
    }
}

/// Quote snapshots keyed by subscription id
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QuoteBoard {
    quotes: HashMap<RequestId, QuoteSnapshot>,
}

impl QuoteBoard {
    /// Remember which symbol an id streams
    pub fn track(&mut self, request_id: RequestId, symbol: &str) {
        self.quotes.entry(request_id).or_default().symbol = symbol.to_string();
    }

    pub fn untrack(&mut self, request_id: RequestId) -> Option<QuoteSnapshot> {
        self.quotes.remove(&request_id)
    }

    pub fn apply(&mut self, request_id: RequestId, field: QuoteField, value: f64) {
        self.quotes
            .entry(request_id)
            .or_default()
            .values
            .insert(field, value);
    }

    pub fn get(&self, request_id: RequestId) -> Option<&QuoteSnapshot> {
        self.quotes.get(&request_id)
    }

    pub fn by_symbol(&self, symbol: &str) -> Option<&QuoteSnapshot> {
        self.quotes.values().find(|q| q.symbol == symbol)
    }

    pub fn len(&self) -> usize {
        self.quotes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.quotes.is_empty()
    }
}

/// Main application state
#[derive(Debug, Clone, Default)]
pub struct AppState {
    pub scan: Option<ScanState>,
    pub charts: HashMap<String, ChartData>,
    pub active_symbol: Option<String>,
    pub account: AccountData,
    pub quotes: QuoteBoard,
    pub scanner_parameters: Option<String>,
    /// Events applied since start
    pub events_processed: u64,
}

impl AppState {
    pub fn active_chart(&self) -> Option<&ChartData> {
        self.active_symbol
            .as_deref()
            .and_then(|symbol| self.charts.get(symbol))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn value(v: &str) -> AccountValue {
        AccountValue {
            value: v.to_string(),
            currency: "USD".to_string(),
            account_name: "DU1".to_string(),
        }
    }

    fn position(symbol: &str, instrument_type: &str, size: f64) -> Position {
        Position {
            account: "DU1".to_string(),
            symbol: symbol.to_string(),
            instrument_type: instrument_type.to_string(),
            size,
            market_price: 10.0,
            market_value: 10.0 * size,
            average_cost: 9.0,
            unrealized_pnl: size,
            realized_pnl: 0.0,
        }
    }

    #[test]
    fn test_merge_is_idempotent() {
        let values: HashMap<String, AccountValue> = [
            ("NetLiquidation".to_string(), value("1000.5")),
            ("Cushion".to_string(), value("0.9")),
        ]
        .into_iter()
        .collect();
        let positions = vec![position("AAPL", "STK", 10.0)];

        let mut once = AccountData::default();
        once.merge(values.clone(), positions.clone());
        let mut twice = once.clone();
        twice.merge(values, positions);

        assert_eq!(once, twice);
        assert_eq!(twice.net_liquidation, 1000.5);
        assert_eq!(twice.positions.len(), 1);
    }

    #[test]
    fn test_position_replaced_by_holding_key() {
        let mut account = AccountData::default();
        account.merge(HashMap::new(), vec![position("AAPL", "STK", 10.0)]);
        account.merge(HashMap::new(), vec![position("AAPL", "OPT", 1.0)]);
        account.merge(HashMap::new(), vec![position("AAPL", "STK", 25.0)]);

        assert_eq!(account.positions.len(), 2);
        assert_eq!(account.positions[0].size, 25.0);
        assert_eq!(account.positions[1].instrument_type, "OPT");
        assert_eq!(account.unrealized_pnl(), 26.0);
    }

    #[test]
    fn test_unparseable_summary_value_is_zero() {
        let mut account = AccountData::default();
        account.merge([("BuyingPower".to_string(), value("500"))].into_iter().collect(), vec![]);
        account.merge([("BuyingPower".to_string(), value("n/a"))].into_iter().collect(), vec![]);
        assert_eq!(account.buying_power, 0.0);
        assert_eq!(account.values["BuyingPower"].value, "n/a");
    }

    #[test]
    fn test_gain_pct_needs_nonzero_close() {
        let mut board = QuoteBoard::default();
        board.track(3, "NVDA");
        board.apply(3, QuoteField::Last, 110.0);
        assert_eq!(board.get(3).unwrap().gain_pct(), None);

        board.apply(3, QuoteField::Close, 100.0);
        let gain = board.by_symbol("NVDA").unwrap().gain_pct().unwrap();
        assert!((gain - 10.0).abs() < 1e-9);

        board.apply(3, QuoteField::Close, 0.0);
        assert_eq!(board.get(3).unwrap().gain_pct(), None);
    }

    #[test]
    fn test_chart_range() {
        let bar = |low: f64, high: f64| Bar {
            time: "20240102".into(),
            open: low,
            high,
            low,
            close: high,
            volume: 1,
        };
        let chart = ChartData {
            request_id: 2,
            symbol: "AAPL".into(),
            bars: vec![bar(10.0, 12.0), bar(9.0, 11.0)],
            received_at: Local::now(),
        };
        assert_eq!(chart.price_range(), Some((9.0, 12.0)));
        assert_eq!(chart.last_close(), Some(11.0));
    }
}

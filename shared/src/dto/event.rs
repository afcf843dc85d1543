//! # Events
//!
//! Completed outcomes the network thread hands back to the foreground thread.

use super::market::{AccountValue, Bar, Position, QuoteField, RequestId, ScanRow};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Closed set of results delivered through the bridge.
///
/// Scan and series results are emitted once per request, after the broker's
/// end marker. Account snapshots and quotes are partial: one per callback,
/// to be merged by the consumer.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum Event {
    /// All rows of a scanner request, in rank order as delivered
    ScanCompleted {
        request_id: RequestId,
        rows: Vec<ScanRow>,
    },
    /// All bars of a historical series request, oldest first
    SeriesCompleted {
        request_id: RequestId,
        symbol: String,
        bars: Vec<Bar>,
    },
    /// A partial account update: typically one value or one position
    AccountSnapshot {
        values: HashMap<String, AccountValue>,
        positions: Vec<Position>,
    },
    /// A single quote tick
    Quote {
        request_id: RequestId,
        field: QuoteField,
        value: f64,
    },
    /// Scanner parameter catalogue
    ScannerParameters { xml: String },
}

impl Event {
    /// Correlation id carried by the event, if any
    pub fn request_id(&self) -> Option<RequestId> {
        match self {
            Event::ScanCompleted { request_id, .. }
            | Event::SeriesCompleted { request_id, .. }
            | Event::Quote { request_id, .. } => Some(*request_id),
            Event::AccountSnapshot { .. } | Event::ScannerParameters { .. } => None,
        }
    }

    /// Short variant name for structured logs
    pub fn kind(&self) -> &'static str {
        match self {
            Event::ScanCompleted { .. } => "ScanCompleted",
            Event::SeriesCompleted { .. } => "SeriesCompleted",
            Event::AccountSnapshot { .. } => "AccountSnapshot",
            Event::Quote { .. } => "Quote",
            Event::ScannerParameters { .. } => "ScannerParameters",
        }
    }

    /// Snapshot holding a single account value
    pub fn account_value(key: impl Into<String>, value: AccountValue) -> Self {
        let mut values = HashMap::with_capacity(1);
        values.insert(key.into(), value);
        Event::AccountSnapshot {
            values,
            positions: Vec::new(),
        }
    }

    /// Snapshot holding a single position
    pub fn position(position: Position) -> Self {
        Event::AccountSnapshot {
            values: HashMap::new(),
            positions: vec![position],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_account_value_snapshot_has_one_key() {
        let event = Event::account_value(
            "NetLiquidation",
            AccountValue {
                value: "1000".into(),
                currency: "USD".into(),
                account_name: "DU1".into(),
            },
        );
        match event {
            Event::AccountSnapshot { values, positions } => {
                assert_eq!(values.len(), 1);
                assert_eq!(values["NetLiquidation"].value, "1000");
                assert!(positions.is_empty());
            }
            other => panic!("unexpected event {other:?}"),
        }
    }

    #[test]
    fn test_request_id_only_on_correlated_events() {
        let scan = Event::ScanCompleted { request_id: 4, rows: vec![] };
        assert_eq!(scan.request_id(), Some(4));
        assert_eq!(scan.kind(), "ScanCompleted");

        let params = Event::ScannerParameters { xml: "<x/>".into() };
        assert_eq!(params.request_id(), None);
    }
}

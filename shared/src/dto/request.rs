//! # Requests
//!
//! Commands the foreground thread asks the network thread to perform.

use super::market::RequestId;
use serde::{Deserialize, Serialize};

/// Closed set of commands submitted to the bridge.
///
/// Each variant carries only the fields its vendor call needs. Requests are
/// consumed exactly once, by the network driver, in submission order.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum Request {
    /// Start a market scanner subscription
    StartScan {
        request_id: RequestId,
        scan_code: String,
        location_code: String,
        price_floor: f64,
    },
    /// Cancel a scanner subscription
    CancelScan { request_id: RequestId },
    /// Fetch a historical bar series for a stock
    FetchSeries {
        request_id: RequestId,
        symbol: String,
        /// `YYYYMMDD HH:MM:SS`, or empty for "now"
        end_timestamp: String,
        /// Look-back window ("1 D", "1 W", "1 M", "1 Y")
        duration: String,
        /// Bar width ("1 min", "5 mins", "1 hour", "1 day")
        bar_size: String,
        /// "TRADES", "MIDPOINT", "BID", "ASK"
        data_kind: String,
        regular_hours_only: bool,
    },
    /// Cancel an in-flight historical series request
    CancelSeries { request_id: RequestId },
    /// Subscribe to account values for `account_code`, or to positions for
    /// all accounts when no code is given
    FetchAccount {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        account_code: Option<String>,
    },
    /// Stream top-of-book quotes for a stock
    SubscribeQuotes { request_id: RequestId, symbol: String },
    /// Stop a quote stream
    CancelQuotes { request_id: RequestId },
    /// Ask for the scanner parameter catalogue (XML)
    FetchScannerParameters,
    /// Disconnect from the broker and stop the network driver
    Disconnect,
}

impl Request {
    /// Correlation id carried by the request, if any
    pub fn request_id(&self) -> Option<RequestId> {
        match self {
            Request::StartScan { request_id, .. }
            | Request::CancelScan { request_id }
            | Request::FetchSeries { request_id, .. }
            | Request::CancelSeries { request_id }
            | Request::SubscribeQuotes { request_id, .. }
            | Request::CancelQuotes { request_id } => Some(*request_id),
            Request::FetchAccount { .. } | Request::FetchScannerParameters | Request::Disconnect => {
                None
            }
        }
    }

    /// Short variant name for structured logs
    pub fn kind(&self) -> &'static str {
        match self {
            Request::StartScan { .. } => "StartScan",
            Request::CancelScan { .. } => "CancelScan",
            Request::FetchSeries { .. } => "FetchSeries",
            Request::CancelSeries { .. } => "CancelSeries",
            Request::FetchAccount { .. } => "FetchAccount",
            Request::SubscribeQuotes { .. } => "SubscribeQuotes",
            Request::CancelQuotes { .. } => "CancelQuotes",
            Request::FetchScannerParameters => "FetchScannerParameters",
            Request::Disconnect => "Disconnect",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_id_extraction() {
        let scan = Request::StartScan {
            request_id: 1,
            scan_code: "TOP_PERC_GAIN".into(),
            location_code: "STK.US".into(),
            price_floor: 5.0,
        };
        assert_eq!(scan.request_id(), Some(1));
        assert_eq!(Request::CancelQuotes { request_id: 9 }.request_id(), Some(9));
        assert_eq!(Request::Disconnect.request_id(), None);
        assert_eq!(Request::FetchAccount { account_code: None }.request_id(), None);
    }

    #[test]
    fn test_fetch_account_omits_missing_code() {
        let json = serde_json::to_string(&Request::FetchAccount { account_code: None }).unwrap();
        assert_eq!(json, r#"{"FetchAccount":{}}"#);

        let parsed: Request = serde_json::from_str(r#"{"FetchAccount":{"account_code":"DU42"}}"#).unwrap();
        assert_eq!(parsed, Request::FetchAccount { account_code: Some("DU42".into()) });
    }

    #[test]
    fn test_kind_names() {
        assert_eq!(Request::Disconnect.kind(), "Disconnect");
        assert_eq!(Request::CancelScan { request_id: 3 }.kind(), "CancelScan");
    }
}

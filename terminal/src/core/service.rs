//! # Service Traits
//!
//! The seam between the chart terminal and the brokerage's socket client.
//!
//! The vendor client is synchronous and callback driven: requests go out
//! through plain method calls, and everything that comes back is delivered by
//! re-entering a handler table while [`VendorClient::process_messages`] runs.
//! [`VendorClient`] is the outbound half, [`VendorCallbacks`] the inbound half.
//! Production code plugs in an adapter over the broker library; tests and the
//! headless binary use [`crate::services::paper::PaperClient`].

use shared::RequestId;
use std::time::Duration;

/// Contract description passed to and received from the broker.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct VendorContract {
    pub symbol: String,
    /// Security type ("STK", "OPT", "FUT", ...)
    pub sec_type: String,
    pub currency: String,
    pub exchange: String,
    /// Broker contract id; `0` when unknown
    pub con_id: i64,
}

impl VendorContract {
    /// US stock routed through the broker's smart router
    pub fn stock(symbol: &str) -> Self {
        Self {
            symbol: symbol.to_string(),
            sec_type: "STK".to_string(),
            currency: "USD".to_string(),
            exchange: "SMART".to_string(),
            con_id: 0,
        }
    }
}

/// Market scanner subscription parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct ScannerSubscription {
    pub instrument: String,
    pub location_code: String,
    pub scan_code: String,
    /// Filter tags, e.g. `("priceAbove", "5")`
    pub filters: Vec<(String, String)>,
}

/// Historical bar request parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct HistoricalQuery {
    pub contract: VendorContract,
    /// Empty string means "now"
    pub end_date_time: String,
    pub duration: String,
    pub bar_size: String,
    pub what_to_show: String,
    pub use_rth: bool,
}

/// A bar as the broker delivers it. Volume is a decimal display string.
#[derive(Debug, Clone, PartialEq)]
pub struct VendorBar {
    pub time: String,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: String,
}

/// Broker tick type code.
///
/// Only the codes the terminal reacts to are named; everything else passes
/// through untouched and is ignored by the aggregator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TickType(pub i32);

impl TickType {
    pub const BID_SIZE: TickType = TickType(0);
    pub const BID: TickType = TickType(1);
    pub const ASK: TickType = TickType(2);
    pub const ASK_SIZE: TickType = TickType(3);
    pub const LAST: TickType = TickType(4);
    pub const HIGH: TickType = TickType(6);
    pub const LOW: TickType = TickType(7);
    pub const VOLUME: TickType = TickType(8);
    pub const CLOSE: TickType = TickType(9);
    pub const DELAYED_BID: TickType = TickType(66);
    pub const DELAYED_ASK: TickType = TickType(67);
    pub const DELAYED_LAST: TickType = TickType(68);
    pub const DELAYED_BID_SIZE: TickType = TickType(69);
    pub const DELAYED_ASK_SIZE: TickType = TickType(70);
    pub const DELAYED_HIGH: TickType = TickType(72);
    pub const DELAYED_LOW: TickType = TickType(73);
    pub const DELAYED_VOLUME: TickType = TickType(74);
    pub const DELAYED_CLOSE: TickType = TickType(75);

    /// Map a price tick onto a quote field (delayed folded onto real-time)
    pub fn price_field(self) -> Option<shared::QuoteField> {
        use shared::QuoteField;
        match self {
            TickType::LAST | TickType::DELAYED_LAST => Some(QuoteField::Last),
            TickType::CLOSE | TickType::DELAYED_CLOSE => Some(QuoteField::Close),
            TickType::BID | TickType::DELAYED_BID => Some(QuoteField::Bid),
            TickType::ASK | TickType::DELAYED_ASK => Some(QuoteField::Ask),
            TickType::HIGH | TickType::DELAYED_HIGH => Some(QuoteField::High),
            TickType::LOW | TickType::DELAYED_LOW => Some(QuoteField::Low),
            _ => None,
        }
    }

    /// Map a size tick onto a quote field
    pub fn size_field(self) -> Option<shared::QuoteField> {
        use shared::QuoteField;
        match self {
            TickType::VOLUME | TickType::DELAYED_VOLUME => Some(QuoteField::Volume),
            TickType::BID_SIZE | TickType::DELAYED_BID_SIZE => Some(QuoteField::BidSize),
            TickType::ASK_SIZE | TickType::DELAYED_ASK_SIZE => Some(QuoteField::AskSize),
            _ => None,
        }
    }
}

/// Outbound half of the broker client.
///
/// All methods are called from the network driver thread only. Request
/// methods are fire-and-forget; their outcome arrives later through
/// [`VendorCallbacks`] during [`VendorClient::process_messages`].
pub trait VendorClient: Send {
    /// Open the socket and perform the handshake. `false` means not connected.
    fn connect(&mut self, host: &str, port: u16, client_id: i32) -> bool;

    /// Connection state as tracked by the client library
    fn is_connected(&self) -> bool;

    /// Close the socket
    fn disconnect(&mut self);

    /// Start the library's own background reader
    fn start_reader(&mut self);

    /// Block until inbound messages are ready or `timeout` elapses
    fn wait_for_signal(&self, timeout: Duration);

    /// Decode ready messages, re-entering `handler` once per message
    fn process_messages(&mut self, handler: &mut dyn VendorCallbacks);

    fn request_scanner_subscription(&mut self, request_id: RequestId, subscription: &ScannerSubscription);
    fn cancel_scanner_subscription(&mut self, request_id: RequestId);
    fn request_scanner_parameters(&mut self);

    fn request_historical_data(&mut self, request_id: RequestId, query: &HistoricalQuery);
    fn cancel_historical_data(&mut self, request_id: RequestId);

    /// Subscribe (or unsubscribe) to value and portfolio updates for one account
    fn request_account_updates(&mut self, subscribe: bool, account_code: &str);
    /// Request positions across all accounts
    fn request_positions(&mut self);

    fn request_market_data(&mut self, request_id: RequestId, contract: &VendorContract);
    fn cancel_market_data(&mut self, request_id: RequestId);
}

/// Inbound half: the callback table the broker client re-enters.
///
/// Invoked synchronously on the network driver thread, one message at a
/// time, in delivery order.
#[allow(clippy::too_many_arguments)]
pub trait VendorCallbacks {
    fn connect_ack(&mut self);

    fn tick_price(&mut self, ticker_id: RequestId, field: TickType, price: f64);
    /// `size` is a decimal display string
    fn tick_size(&mut self, ticker_id: RequestId, field: TickType, size: &str);

    /// One bar of a historical request
    fn historical_data(&mut self, request_id: RequestId, bar: &VendorBar);
    /// End marker for a historical request
    fn historical_data_end(&mut self, request_id: RequestId, start: &str, end: &str);

    fn scanner_parameters(&mut self, xml: &str);
    /// One ranked row of a scanner request
    fn scanner_data(&mut self, request_id: RequestId, rank: i32, contract: &VendorContract);
    /// End marker for a scanner request
    fn scanner_data_end(&mut self, request_id: RequestId);

    fn update_account_value(&mut self, key: &str, value: &str, currency: &str, account_name: &str);
    /// `position` is a decimal display string
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
    );
    /// `position` is a decimal display string
    fn position(&mut self, account: &str, contract: &VendorContract, position: &str, average_cost: f64);
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::QuoteField;

    #[test]
    fn test_delayed_ticks_fold_onto_realtime() {
        assert_eq!(TickType::DELAYED_LAST.price_field(), Some(QuoteField::Last));
        assert_eq!(TickType::LAST.price_field(), Some(QuoteField::Last));
        assert_eq!(TickType::DELAYED_VOLUME.size_field(), Some(QuoteField::Volume));
    }

    #[test]
    fn test_unknown_ticks_ignored() {
        assert_eq!(TickType(45).price_field(), None);
        assert_eq!(TickType::BID.size_field(), None);
        assert_eq!(TickType::VOLUME.price_field(), None);
    }

    #[test]
    fn test_stock_contract_defaults() {
        let c = VendorContract::stock("AAPL");
        assert_eq!(c.sec_type, "STK");
        assert_eq!(c.currency, "USD");
        assert_eq!(c.exchange, "SMART");
    }
}

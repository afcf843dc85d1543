//! # Event Handler
//!
//! Applies results drained from the bridge to application state.
//!
//! Each event takes the state write lock for its own update only. A completed
//! scan also queues the matching `CancelScan`, since the broker keeps a
//! scanner subscription open until told otherwise.

use crate::app::state::{ChartData, ScanState};
use crate::app::App;
use chrono::Local;
use shared::{Event, Request};

/// Trait for event handling implementation
pub(crate) trait AppEventHandler {
    fn handle_event_impl(&mut self, event: Event);
}

impl AppEventHandler for App {
    fn handle_event_impl(&mut self, event: Event) {
        match event {
            Event::ScanCompleted { request_id, rows } => {
                tracing::info!(request_id, rows = rows.len(), "Scanner result received");
                {
                    let mut state = self.state.write();
                    state.scan = Some(ScanState {
                        request_id,
                        rows,
                        received_at: Local::now(),
                    });
                }
                self.bridge.submit(Request::CancelScan { request_id });
            }
            Event::SeriesCompleted {
                request_id,
                symbol,
                bars,
            } => {
                tracing::info!(request_id, symbol = %symbol, bars = bars.len(), "Chart data received");
                let mut state = self.state.write();
                state.charts.insert(
                    symbol.clone(),
                    ChartData {
                        request_id,
                        symbol: symbol.clone(),
                        bars,
                        received_at: Local::now(),
                    },
                );
                state.active_symbol = Some(symbol);
            }
            Event::AccountSnapshot { values, positions } => {
                tracing::debug!(
                    values = values.len(),
                    positions = positions.len(),
                    "Account data updated"
                );
                self.state.write().account.merge(values, positions);
            }
            Event::Quote {
                request_id,
                field,
                value,
            } => {
                tracing::trace!(request_id, field = field.label(), value, "Quote tick");
                self.state.write().quotes.apply(request_id, field, value);
            }
            Event::ScannerParameters { xml } => {
                tracing::info!(bytes = xml.len(), "Scanner parameters received");
                self.state.write().scanner_parameters = Some(xml);
            }
        }
        self.state.write().events_processed += 1;
    }
}

//! Headless chart terminal.
//!
//! Connects the foreground [`App`] to the in-process paper broker, ticks at
//! roughly 60 Hz for `TERMINAL_RUN_SECS` seconds (default 5), logs what it
//! collected and shuts the network thread down.

use chart_terminal::app::App;
use chart_terminal::bridge::Bridge;
use chart_terminal::config::AppConfig;
use chart_terminal::debug::{self, DebugConfig};
use chart_terminal::services::paper::PaperClient;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::{Duration, Instant};

const TICK: Duration = Duration::from_millis(16);

fn run_duration() -> Duration {
    let secs = std::env::var("TERMINAL_RUN_SECS")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(5);
    Duration::from_secs(secs)
}

fn main() -> ExitCode {
    let _log_guard = debug::init(&DebugConfig::from_env());
    tracing::info!(debug_mode = debug::is_debug_mode(), "Chart terminal starting");

    let config_path = AppConfig::path_from_env();
    let config = match AppConfig::load(&config_path) {
        Ok(config) => config,
        Err(e) => {
            tracing::error!(error = %e, path = %config_path.display(), "Failed to load configuration");
            eprintln!("ERROR: {}", e);
            let template = config_path.with_extension("json.template");
            match AppConfig::write_template(&template) {
                Ok(()) => eprintln!(
                    "A template was written to '{}'. Copy it to '{}' and set your account number.",
                    template.display(),
                    config_path.display()
                ),
                Err(e) => tracing::warn!(error = %e, "Could not write config template"),
            }
            return ExitCode::FAILURE;
        }
    };

    let mut app = App::new(Arc::new(Bridge::new()));
    if let Err(e) = app.start(PaperClient::new(), &config) {
        tracing::error!(error = %e, "Failed to start network driver");
        eprintln!("ERROR: {}", e);
        return ExitCode::FAILURE;
    }

    let first_symbol = "AAPL";
    app.request_chart(first_symbol);
    app.subscribe_quotes(first_symbol);
    app.fetch_scanner_parameters();

    let deadline = Instant::now() + run_duration();
    let mut charted_scan = false;
    while Instant::now() < deadline {
        app.on_tick();

        // Chart the scan leader once the scan arrives
        if !charted_scan {
            let leader = app
                .state
                .read()
                .scan
                .as_ref()
                .and_then(|scan| scan.rows.first().map(|row| row.symbol.clone()));
            if let Some(symbol) = leader {
                app.request_chart(&symbol);
                charted_scan = true;
            }
        }

        if !app.is_running() {
            tracing::warn!("Network driver exited early");
            break;
        }
        std::thread::sleep(TICK);
    }

    let exit = app.stop();
    app.on_tick();

    {
        let state = app.state.read();
        let scan_symbols: Vec<String> = state
            .scan
            .as_ref()
            .map(|scan| scan.rows.iter().take(5).map(|r| r.symbol.clone()).collect())
            .unwrap_or_default();
        tracing::info!(
            scan_rows = state.scan.as_ref().map(|s| s.rows.len()).unwrap_or(0),
            top = ?scan_symbols,
            charts = state.charts.len(),
            active = ?state.active_symbol,
            net_liquidation = state.account.net_liquidation,
            positions = state.account.positions.len(),
            quotes = state.quotes.len(),
            events = state.events_processed,
            stats = ?app.bridge().stats(),
            exit = ?exit,
            "Session summary"
        );
        println!(
            "scan rows: {}, charts: {}, positions: {}, net liquidation: {:.2}",
            state.scan.as_ref().map(|s| s.rows.len()).unwrap_or(0),
            state.charts.len(),
            state.account.positions.len(),
            state.account.net_liquidation
        );
    }

    ExitCode::SUCCESS
}

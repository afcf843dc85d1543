//! File-based logging initialization

use super::config::{DebugConfig, DEFAULT_LOG_LEVEL};
use std::fs;
use tracing_appender::non_blocking::WorkerGuard;
use tracing::Subscriber;
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

/// Initialize the logging system
///
/// Sets up:
/// - Daily log rotation in `log_dir`
/// - Non-blocking writes so neither thread stalls on disk
/// - Optional stdout mirror (`TERMINAL_LOG_STDOUT=1`)
/// - Panic hook integration for crash logging
///
/// The returned guard flushes the file writer when dropped; keep it alive
/// for the lifetime of the program. `None` means the log directory could not
/// be created and only stdout logging (if enabled) is active.
pub fn init(config: &DebugConfig) -> Option<WorkerGuard> {
    let env_filter = EnvFilter::try_new(&config.log_level)
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_LEVEL));

    if let Err(e) = fs::create_dir_all(&config.log_dir) {
        eprintln!("Warning: Failed to create log directory: {}", e);
        let _ = tracing_subscriber::registry()
            .with(console_layer(config.log_to_stdout))
            .with(env_filter)
            .try_init();
        setup_panic_hook();
        return None;
    }

    let file_appender = tracing_appender::rolling::daily(&config.log_dir, &config.log_file);
    let (writer, guard) = tracing_appender::non_blocking(file_appender);

    let file_layer = if config.log_json {
        fmt::layer()
            .json()
            .with_writer(writer)
            .with_thread_names(true)
            .boxed()
    } else {
        fmt::layer()
            .with_writer(writer)
            .with_target(true)
            .with_thread_names(true)
            .with_file(true)
            .with_line_number(true)
            .with_ansi(false) // No ANSI codes in log files
            .boxed()
    };

    if let Err(e) = tracing_subscriber::registry()
        .with(file_layer)
        .with(console_layer(config.log_to_stdout))
        .with(env_filter)
        .try_init()
    {
        eprintln!("Warning: Logging already initialized: {}", e);
    }

    tracing::info!(
        log_dir = %config.log_dir.display(),
        log_file = %config.log_file,
        log_level = %config.log_level,
        stdout = config.log_to_stdout,
        json = config.log_json,
        "Logging initialized"
    );

    setup_panic_hook();
    Some(guard)
}

fn console_layer<S>(enabled: bool) -> Option<Box<dyn Layer<S> + Send + Sync>>
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    enabled.then(|| {
        fmt::layer()
            .with_target(false)
            .with_thread_names(true)
            .boxed()
    })
}

/// Set up panic hook to log panics with location and message
fn setup_panic_hook() {
    let default_panic = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |panic_info| {
        let location = panic_info
            .location()
            .map(|l| format!("{}:{}:{}", l.file(), l.line(), l.column()))
            .unwrap_or_else(|| "unknown location".to_string());

        let message = if let Some(s) = panic_info.payload().downcast_ref::<&str>() {
            s.to_string()
        } else if let Some(s) = panic_info.payload().downcast_ref::<String>() {
            s.clone()
        } else {
            "unknown panic message".to_string()
        };

        let thread = std::thread::current()
            .name()
            .unwrap_or("unnamed")
            .to_string();

        tracing::error!(
            thread = %thread,
            location = %location,
            message = %message,
            "!!!!! APPLICATION PANIC !!!!!"
        );

        default_panic(panic_info);
    }));
}

//! Logging utilities

use crate::{ArbitrageError, Result};
use std::path::Path;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{
    fmt,
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter,
    Registry,
};

/// Initialize logging: console plus a daily-rotated file under `log_file`'s directory.
///
/// `RUST_LOG` takes precedence over `log_level`.
pub fn init<P: AsRef<Path>>(log_level: &str, log_file: P) -> Result<()> {
    let log_file = log_file.as_ref();
    let directory = log_file.parent().unwrap_or(Path::new("."));
    std::fs::create_dir_all(directory)?;

    let file_appender = RollingFileAppender::new(
        Rotation::DAILY,
        directory,
        log_file.file_name().unwrap_or(std::ffi::OsStr::new("arbitrage.log")),
    );

    let console_layer = fmt::layer()
        .with_target(true)
        .with_thread_ids(true)
        .with_line_number(true);

    let file_layer = fmt::layer()
        .with_target(true)
        .with_thread_ids(true)
        .with_thread_names(true)
        .with_file(true)
        .with_line_number(true)
        .with_ansi(false)
        .with_writer(file_appender);

    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(log_level))
        .map_err(|e| ArbitrageError::Config(format!("Invalid log level '{}': {}", log_level, e)))?;

    Registry::default()
        .with(env_filter)
        .with(console_layer)
        .with(file_layer)
        .try_init()
        .map_err(|e| ArbitrageError::Config(format!("Logger already initialised: {}", e)))?;

    Ok(())
}

/// Log a paired trade with structured fields
#[macro_export]
macro_rules! log_trade {
    ($level:ident, $instrument:expr, $buy_venue:expr, $sell_venue:expr, $amount:expr, $net_profit:expr, $($field:tt)*) => {
        tracing::$level!(
            instrument = %$instrument,
            buy_venue = %$buy_venue,
            sell_venue = %$sell_venue,
            amount = %$amount,
            net_profit = %$net_profit,
            $($field)*
        );
    };
}

/// Log spread information with structured fields
#[macro_export]
macro_rules! log_spread {
    ($level:ident, $instrument:expr, $buy_venue:expr, $sell_venue:expr, $net_spread:expr, $($field:tt)*) => {
        tracing::$level!(
            instrument = %$instrument,
            buy_venue = %$buy_venue,
            sell_venue = %$sell_venue,
            net_spread = %$net_spread,
            $($field)*
        );
    };
}

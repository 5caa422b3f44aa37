//! Logger initialization.
//!
//! Logs go to stderr so the binary's JSON results on stdout stay
//! machine-readable. `RUST_LOG` is read first; the CLI level then overrides it
//! for the engine's own modules and the global default.

use std::io::Write;

use colored::*;
use log::{Level, LevelFilter, Record};

use crate::config::LogFormat;
use crate::error_handling::InitializationError;

/// Dependencies that are chatty below these levels during a scan.
const QUIET_MODULES: &[(&str, LevelFilter)] = &[
    // Every certificate alert and handshake step is logged at debug
    ("rustls", LevelFilter::Warn),
    ("tokio_rustls", LevelFilter::Warn),
    // Connection pool churn on every redirect hop
    ("hyper", LevelFilter::Info),
    ("hyper_util", LevelFilter::Info),
    ("reqwest", LevelFilter::Info),
    // HTML parsing used by the SEO step
    ("html5ever", LevelFilter::Error),
    ("selectors", LevelFilter::Warn),
];

/// Initializes the global logger.
///
/// # Errors
///
/// Returns `InitializationError::LoggerError` if a logger is already installed.
///
/// # Examples
///
/// ```bash
/// # Trace the guard and fetcher while keeping dependencies quiet
/// domain_intel --log-level debug fetch https://example.com/
///
/// # JSON lines for a log shipper
/// domain_intel --log-format json acquire example.com certificates
/// ```
pub fn init_logger_with(level: LevelFilter, format: LogFormat) -> Result<(), InitializationError> {
    if matches!(format, LogFormat::Plain) {
        colored::control::set_override(true);
    }
    logger_builder(level, format)
        .try_init()
        .map_err(InitializationError::from)
}

/// Builds the `env_logger` configuration without installing it.
fn logger_builder(level: LevelFilter, format: LogFormat) -> env_logger::Builder {
    let mut builder = env_logger::Builder::from_default_env();
    builder.filter_level(level);
    for (module, ceiling) in QUIET_MODULES {
        builder.filter_module(module, level.min(*ceiling));
    }
    builder.filter_module("domain_intel", level);
    builder.target(env_logger::Target::Stderr);

    match format {
        LogFormat::Json => {
            builder.format(|buf, record| {
                writeln!(buf, "{}", json_line(record, chrono::Utc::now().timestamp_millis()))
            });
        }
        LogFormat::Plain => {
            builder.format(|buf, record| {
                writeln!(
                    buf,
                    "{} {} {}",
                    colored_level(record.level()),
                    record.target().cyan(),
                    record.args()
                )
            });
        }
    }
    builder
}

/// One JSON object per record: `ts` (epoch millis), `level`, `target`, `msg`.
fn json_line(record: &Record<'_>, ts: i64) -> String {
    serde_json::json!({
        "ts": ts,
        "level": record.level().as_str(),
        "target": record.target(),
        "msg": record.args().to_string(),
    })
    .to_string()
}

fn colored_level(level: Level) -> ColoredString {
    let label = format!("{:<5}", level);
    match level {
        Level::Error => label.red().bold(),
        Level::Warn => label.yellow(),
        Level::Info => label.green(),
        Level::Debug => label.blue(),
        Level::Trace => label.purple(),
    }
}

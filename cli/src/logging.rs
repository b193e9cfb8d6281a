//! # Structured Logging
//!
//! Initializes the `tracing` subscriber for the `lockbox` binary.
//!
//! All log output goes to stderr. Stdout is reserved for the JSON receipts
//! and records the commands print, so they can be piped into `jq`.
//!
//! The registry logs committed operations at `info` and every rejected
//! operation (with its error kind and code) at `debug`. The default filter
//! therefore shows what happened; `-v` also shows why something was refused,
//! and `-vv` adds ledger and snapshot traffic.

use clap::ValueEnum;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Log output format, selected with `--log-format` or `LOCKBOX_LOG_FORMAT`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    /// Human-readable, colored output.
    Pretty,
    /// Machine-parseable JSON lines.
    Json,
}

/// Filter directives for a `-v` count, used when `RUST_LOG` is unset.
pub fn default_filter(verbosity: u8) -> &'static str {
    match verbosity {
        0 => "lockbox=info,lockbox_protocol=info",
        1 => "lockbox=debug,lockbox_protocol::vault::registry=debug,lockbox_protocol=info",
        _ => "lockbox=trace,lockbox_protocol=trace",
    }
}

/// Initialize the global tracing subscriber.
///
/// Call this exactly once, early in `main()`. Subsequent calls will panic.
///
/// # Environment
///
/// `RUST_LOG` overrides the verbosity-derived filter when set, e.g.:
///
/// ```text
/// RUST_LOG=lockbox_protocol::storage=debug
/// ```
pub fn init_logging(verbosity: u8, format: LogFormat) {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_filter(verbosity)));

    match format {
        LogFormat::Pretty => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(
                    fmt::layer()
                        .with_writer(std::io::stderr)
                        .with_target(verbosity > 0)
                        .without_time(),
                )
                .init();
        }
        LogFormat::Json => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(fmt::layer().json().with_writer(std::io::stderr).with_target(true))
                .init();
        }
    }

    tracing::debug!(?format, verbosity, "logging initialized");
}

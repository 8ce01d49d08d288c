//! Tracing subscriber initialization.
//!
//! Filtering comes from `RUST_LOG` (default `info`). Output is JSON unless
//! `LEARNHUB_LOG_FORMAT=pretty` asks for human-readable lines.

use std::str::FromStr;

use thiserror::Error;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    #[default]
    Json,
    Pretty,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("unknown log format {0:?} (expected \"json\" or \"pretty\")")]
pub struct UnknownLogFormat(String);

impl FromStr for LogFormat {
    type Err = UnknownLogFormat;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "json" => Ok(LogFormat::Json),
            "pretty" => Ok(LogFormat::Pretty),
            _ => Err(UnknownLogFormat(s.to_string())),
        }
    }
}

/// Initialize tracing with the format named by `LEARNHUB_LOG_FORMAT`.
///
/// Safe to call multiple times (subsequent calls are no-ops). An unknown
/// format falls back to JSON and is reported once the subscriber is up.
pub fn init() {
    let requested = std::env::var("LEARNHUB_LOG_FORMAT").ok();
    let parsed = requested.as_deref().map(LogFormat::from_str).transpose();

    match parsed {
        Ok(format) => init_with(format.unwrap_or_default()),
        Err(err) => {
            init_with(LogFormat::Json);
            tracing::warn!(error = %err, "falling back to json logs");
        }
    }
}

/// Initialize tracing with an explicit output format.
pub fn init_with(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_timer(tracing_subscriber::fmt::time::SystemTime)
        .with_target(false);

    let _ = match format {
        LogFormat::Json => builder.json().try_init(),
        LogFormat::Pretty => builder.pretty().try_init(),
    };
}

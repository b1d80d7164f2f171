// src/logging.rs

//! Diagnostics for `dynadag` runs.
//!
//! stdout is reserved for the `name: value` lines of evaluated roots, so
//! every engine event (steps, memo hits, cycle reports, shell stderr) is a
//! `tracing` event written to stderr.
//!
//! The filter comes from `--log-level` when given. Otherwise `DYNADAG_LOG`
//! is read, either as a bare level (`debug`) or as full filter directives
//! (`info,dynadag::dag=trace`). Without either, `info` is used.

use anyhow::Result;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::fmt;

use crate::cli::LogLevel;

/// Environment variable consulted when no CLI level is given.
pub const LOG_ENV_VAR: &str = "DYNADAG_LOG";

/// Install the global subscriber. Fails if one is already installed.
pub fn init_logging(cli_level: Option<LogLevel>) -> Result<()> {
    let filter = match cli_level {
        Some(lvl) => level_filter(level_from_log_level(lvl)),
        None => env_filter(std::env::var(LOG_ENV_VAR).ok().as_deref()),
    };

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|e| anyhow::anyhow!("failed to install tracing subscriber: {e}"))?;

    Ok(())
}

/// Filter for a raw `DYNADAG_LOG` value.
///
/// Unparseable directives fall back to `info` rather than silencing output.
pub fn env_filter(raw: Option<&str>) -> EnvFilter {
    let Some(raw) = raw.map(str::trim).filter(|s| !s.is_empty()) else {
        return level_filter(tracing::Level::INFO);
    };

    if let Some(level) = parse_level_str(raw) {
        return level_filter(level);
    }

    EnvFilter::try_new(raw).unwrap_or_else(|err| {
        eprintln!("ignoring invalid {LOG_ENV_VAR}={raw:?}: {err}");
        level_filter(tracing::Level::INFO)
    })
}

fn level_filter(level: tracing::Level) -> EnvFilter {
    EnvFilter::default().add_directive(LevelFilter::from_level(level).into())
}

fn level_from_log_level(lvl: LogLevel) -> tracing::Level {
    match lvl {
        LogLevel::Error => tracing::Level::ERROR,
        LogLevel::Warn => tracing::Level::WARN,
        LogLevel::Info => tracing::Level::INFO,
        LogLevel::Debug => tracing::Level::DEBUG,
        LogLevel::Trace => tracing::Level::TRACE,
    }
}

pub fn parse_level_str(s: &str) -> Option<tracing::Level> {
    match s.trim().to_lowercase().as_str() {
        "error" => Some(tracing::Level::ERROR),
        "warn" | "warning" => Some(tracing::Level::WARN),
        "info" => Some(tracing::Level::INFO),
        "debug" => Some(tracing::Level::DEBUG),
        "trace" => Some(tracing::Level::TRACE),
        _ => None,
    }
}

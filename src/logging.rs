//! Tracing subscriber setup.
//!
//! `RUST_LOG` wins over the configured level. Output goes to stderr in
//! either human or JSON form, and optionally to a daily-rotated file.

use anyhow::Result;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::prelude::*;

use crate::config::{LogFormat, LoggingSection};

const LOG_FILE_PREFIX: &str = "mission-control.log";

/// Filter directives: `rust_log` when set, else `level`. `verbose` forces
/// debug output for this crate.
pub fn filter_directives(rust_log: Option<&str>, level: &str, verbose: bool) -> String {
    let base = rust_log
        .map(str::trim)
        .filter(|f| !f.is_empty())
        .unwrap_or(level);
    if verbose {
        format!("{},mission_control=debug", base)
    } else {
        base.to_string()
    }
}

pub fn build_filter(level: &str, verbose: bool) -> EnvFilter {
    let rust_log = std::env::var("RUST_LOG").ok();
    let directives = filter_directives(rust_log.as_deref(), level, verbose);
    EnvFilter::try_new(&directives).unwrap_or_else(|_| EnvFilter::new("info"))
}

/// Install the global subscriber. Keep the returned guard alive for the
/// life of the process or buffered file output is lost.
pub fn init(settings: &LoggingSection, verbose: bool) -> Result<Option<WorkerGuard>> {
    let filter = build_filter(&settings.level, verbose);

    let (file_writer, guard) = match &settings.directory {
        Some(dir) => {
            std::fs::create_dir_all(dir)?;
            let appender = tracing_appender::rolling::daily(dir, LOG_FILE_PREFIX);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            (Some(writer), Some(guard))
        }
        None => (None, None),
    };

    let registry = tracing_subscriber::registry().with(filter);
    let result = match settings.format {
        LogFormat::Pretty => registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .with(file_writer.map(|w| {
                tracing_subscriber::fmt::layer()
                    .with_ansi(false)
                    .with_writer(w)
            }))
            .try_init(),
        LogFormat::Json => registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_writer(std::io::stderr),
            )
            .with(file_writer.map(|w| tracing_subscriber::fmt::layer().json().with_writer(w)))
            .try_init(),
    };
    result.map_err(|e| anyhow::anyhow!("Failed to install tracing subscriber: {}", e))?;
    Ok(guard)
}

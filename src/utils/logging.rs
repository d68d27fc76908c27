use std::fs;
use std::path::Path;

use tracing_appender::non_blocking::{NonBlocking, WorkerGuard};
use tracing_subscriber::filter::{LevelFilter, Targets};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::Layer;

use crate::config::Config;
use crate::utils::timing::TIMING_TARGET;

const NOISY_TARGETS: [&str; 3] = ["hyper", "hyper_util", "reqwest"];

/// Keeps the background file writers alive; drop flushes them.
pub struct LoggingGuards {
    _writers: Vec<WorkerGuard>,
}

fn parse_log_level(value: &str) -> LevelFilter {
    match value.trim().to_lowercase().as_str() {
        "trace" => LevelFilter::TRACE,
        "debug" => LevelFilter::DEBUG,
        "info" => LevelFilter::INFO,
        "warn" | "warning" => LevelFilter::WARN,
        "error" => LevelFilter::ERROR,
        "off" => LevelFilter::OFF,
        _ => LevelFilter::INFO,
    }
}

/// Everything except timing events, with HTTP client internals capped at WARN.
fn general_targets(level: LevelFilter) -> Targets {
    NOISY_TARGETS.iter().fold(
        Targets::new()
            .with_default(level)
            .with_target(TIMING_TARGET, LevelFilter::OFF),
        |targets, target| targets.with_target(*target, LevelFilter::WARN),
    )
}

fn timing_targets() -> Targets {
    Targets::new()
        .with_default(LevelFilter::OFF)
        .with_target(TIMING_TARGET, LevelFilter::INFO)
}

fn daily_writer(dir: &Path, file_name: &str, guards: &mut Vec<WorkerGuard>) -> NonBlocking {
    let (writer, guard) =
        tracing_appender::non_blocking(tracing_appender::rolling::daily(dir, file_name));
    guards.push(guard);
    writer
}

/// Installs the global subscriber: human console output on stderr, plus a
/// plain and a JSON daily file for general and for timing events.
pub fn init_logging(config: &Config) -> LoggingGuards {
    let logs_dir = config.log_dir.as_path();
    if let Err(err) = fs::create_dir_all(logs_dir) {
        eprintln!("Failed to create logs directory {}: {err}", logs_dir.display());
    }

    let mut guards = Vec::with_capacity(4);
    let general = general_targets(parse_log_level(&config.log_level));
    let timing = timing_targets();

    let console = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_filter(general.clone());
    let mut file_layers = Vec::with_capacity(2);
    for (stem, targets) in [("figure", general), ("timing", timing)] {
        let plain = daily_writer(logs_dir, &format!("{stem}.log"), &mut guards);
        let json = daily_writer(logs_dir, &format!("{stem}.jsonl"), &mut guards);
        file_layers.push(
            tracing_subscriber::fmt::layer()
                .with_writer(plain)
                .with_ansi(false)
                .with_filter(targets.clone())
                .and_then(
                    tracing_subscriber::fmt::layer()
                        .json()
                        .with_writer(json)
                        .with_filter(targets),
                ),
        );
    }

    tracing_subscriber::registry()
        .with(console)
        .with(file_layers)
        .init();

    LoggingGuards { _writers: guards }
}

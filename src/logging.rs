//! tracing subscriber setup.
//!
//! stdout carries the rendered configuration, so the default destination is
//! stderr and the default level is `warn`.

use anyhow::{Context, Result};
use std::fs::OpenOptions;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

/// Target of the AWS SDK retry machinery.
const AWS_RETRY_TARGET: &str = "aws_smithy_runtime::client::retries";

/// Where log lines go, from the `--log` option.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogDestination {
    Off,
    Stdout,
    Stderr,
    File(String),
}

impl LogDestination {
    /// `0`/`off`, `1`/`stdout`, `2`/`stderr`, anything else is a file name.
    pub fn parse(value: &str) -> Self {
        match value {
            "0" | "off" => LogDestination::Off,
            "1" | "stdout" => LogDestination::Stdout,
            "2" | "stderr" => LogDestination::Stderr,
            filename => LogDestination::File(filename.to_string()),
        }
    }
}

/// Build the level filter. `RUST_LOG`, when set, replaces the default level.
pub fn build_filter(verbose: bool, log_aws_retries: bool) -> EnvFilter {
    let default_level = if verbose { "debug" } else { "warn" };
    let mut filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    if log_aws_retries {
        if let Ok(directive) = format!("{AWS_RETRY_TARGET}=debug").parse() {
            filter = filter.add_directive(directive);
        }
    }
    filter
}

/// Install the global subscriber.
pub fn init(log: &str, verbose: bool, log_aws_retries: bool) -> Result<()> {
    let filter = build_filter(verbose, log_aws_retries);
    match LogDestination::parse(log) {
        LogDestination::Off => {}
        LogDestination::Stdout => {
            let subscriber = FmtSubscriber::builder()
                .with_env_filter(filter)
                .with_writer(std::io::stdout)
                .finish();
            tracing::subscriber::set_global_default(subscriber)?;
        }
        LogDestination::Stderr => {
            let subscriber = FmtSubscriber::builder()
                .with_env_filter(filter)
                .with_writer(std::io::stderr)
                .finish();
            tracing::subscriber::set_global_default(subscriber)?;
        }
        LogDestination::File(filename) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(&filename)
                .with_context(|| format!("opening log file {filename}"))?;
            let subscriber = FmtSubscriber::builder()
                .with_env_filter(filter)
                .with_writer(file)
                .with_ansi(false)
                .finish();
            tracing::subscriber::set_global_default(subscriber)?;
        }
    }
    Ok(())
}

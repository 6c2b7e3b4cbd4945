//! snagsby
//!
//! Resolves configuration Sources in parallel and prints the merged items
//! as shell exports, an env file or JSON.

use anyhow::Result;
use clap::Parser;
use snagsby::app::{failure_report, merge, resolve_all};
use snagsby::cli::Cli;
use snagsby::config::{Config, ENV_SOURCE};
use snagsby::logging;
use snagsby::resolvers::{Dispatcher, ResolveContext};
use snagsby::store::AwsStores;
use std::sync::Arc;
use tracing::debug;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = Config::from_env();
    logging::init(&cli.log, cli.verbose, config.log_aws_retries)?;

    let env_sources = std::env::var(ENV_SOURCE).unwrap_or_default();
    if let Err(err) = config.set_sources(&cli.sources, &env_sources) {
        eprintln!("Error parsing sources: {err}");
        std::process::exit(1);
    }
    debug!(
        sources = config.len_sources(),
        concurrency = config.fetch.concurrency,
        "Resolving sources"
    );

    let ctx = ResolveContext::new(Arc::new(AwsStores::new())).with_fetch_settings(config.fetch);
    let dispatcher = Arc::new(Dispatcher::new(ctx));
    let results = resolve_all(dispatcher, config.sources()).await;

    let mut succeeded = Vec::with_capacity(results.len());
    for result in &results {
        if !result.has_errors() {
            succeeded.push(result.items());
            continue;
        }

        eprint!("{}", failure_report(result));
        debug!(
            source = %result.source(),
            errors = result.errors().len(),
            "Source failed"
        );
        if cli.fail_on_error {
            std::process::exit(1);
        }
    }

    let merged = merge(succeeded);
    print!("{}", cli.output.render(&merged));
    Ok(())
}

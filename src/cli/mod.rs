//! CLI definitions for snagsby.

use crate::format::OutputFormat;
use clap::Parser;

/// Resolve configuration from S3, Secrets Manager, env files and manifests
/// into shell exports or JSON.
///
/// Example: snagsby s3://my-bucket/my-config.json?region=us-west-2
#[derive(Parser, Debug)]
#[command(name = "snagsby", author, version, about, long_about = None)]
pub struct Cli {
    /// Sources to resolve, in override order (default: $SNAGSBY_SOURCE)
    pub sources: Vec<String>,

    /// Output format
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Env)]
    pub output: OutputFormat,

    /// Exit with status 1 if any source fails
    #[arg(short = 'e', long)]
    pub fail_on_error: bool,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Logging output: 0/off, 1/stdout, 2/stderr (default), or filename
    #[arg(short, long, default_value = "2")]
    pub log: String,
}

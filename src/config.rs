//! Configuration: which Sources to resolve and how to fetch them.
//!
//! ## Environment Variables
//! - `SNAGSBY_SOURCE` - Sources to use when none are given on the command line
//! - `SNAGSBY_SM_CONCURRENCY` - Secret fetch workers per batch (0 = one per secret)
//! - `SNAGSBY_SM_DEFAULT_CAP` - Upper bound on the default worker count
//! - `SNAGSBY_LOG_AWS_RETRIES` - Log AWS SDK retries (`1`, `true` or `yes`)

use crate::error::ResolveError;
use crate::fetch::FetchSettings;
use crate::source::Source;
use regex_lite::Regex;
use std::sync::LazyLock;

pub const ENV_SOURCE: &str = "SNAGSBY_SOURCE";
pub const ENV_SM_CONCURRENCY: &str = "SNAGSBY_SM_CONCURRENCY";
pub const ENV_SM_DEFAULT_CAP: &str = "SNAGSBY_SM_DEFAULT_CAP";
pub const ENV_LOG_AWS_RETRIES: &str = "SNAGSBY_LOG_AWS_RETRIES";

static SOURCE_SEPARATOR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[\s|,]+").expect("static separator pattern is valid"));

static TRUTHY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^(1|true|yes)$").expect("static bool pattern is valid"));

/// Resolver configuration.
#[derive(Debug, Clone, Default)]
pub struct Config {
    sources: Vec<Source>,
    /// Worker pool sizing for secret batches.
    pub fetch: FetchSettings,
    /// Log AWS SDK retry attempts.
    pub log_aws_retries: bool,
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    /// Defaults plus the environment-derived settings.
    pub fn from_env() -> Self {
        Self::from_vars(|name| std::env::var(name).ok())
    }

    /// Like [`Config::from_env`], reading variables through `get`.
    pub fn from_vars(get: impl Fn(&str) -> Option<String>) -> Self {
        Self {
            sources: Vec::new(),
            fetch: FetchSettings {
                concurrency: parse_count(get(ENV_SM_CONCURRENCY).as_deref()).unwrap_or(0),
                default_cap: parse_count(get(ENV_SM_DEFAULT_CAP).as_deref())
                    .filter(|cap| *cap > 0),
            },
            log_aws_retries: get(ENV_LOG_AWS_RETRIES).is_some_and(|value| is_truthy(&value)),
        }
    }

    /// Set Sources from command line arguments, or from `env` when there are
    /// none.
    ///
    /// `env` is split on runs of whitespace, `|` and `,`. On a parse error
    /// the Config is left with no Sources.
    pub fn set_sources(&mut self, args: &[String], env: &str) -> Result<(), ResolveError> {
        self.sources.clear();

        let raw: Vec<&str> = if args.is_empty() {
            split_env_arg(env)
        } else {
            args.iter().map(String::as_str).collect()
        };

        let sources = raw
            .into_iter()
            .map(Source::parse)
            .collect::<Result<Vec<_>, _>>()?;
        self.sources = sources;
        Ok(())
    }

    pub fn sources(&self) -> &[Source] {
        &self.sources
    }

    pub fn len_sources(&self) -> usize {
        self.sources.len()
    }
}

/// Split an environment string into source tokens, dropping empty ones.
pub fn split_env_arg(env: &str) -> Vec<&str> {
    SOURCE_SEPARATOR
        .split(env.trim())
        .filter(|token| !token.is_empty())
        .collect()
}

/// Parse a non-negative count. Absent, negative or malformed values are `None`.
pub fn parse_count(value: Option<&str>) -> Option<usize> {
    value.and_then(|v| v.trim().parse::<usize>().ok())
}

/// Whether `value` is `1`, `true` or `yes`, case-insensitively.
pub fn is_truthy(value: &str) -> bool {
    TRUTHY.is_match(value)
}

//! Configuration source URIs.
//!
//! A [`Source`] is parsed once from text like `sm://prod/api/*?region=us-west-2`
//! and is read-only afterwards. Its [`SourceKind`] decides which resolver
//! handles it.

use crate::error::ResolveError;
use regex_lite::Regex;
use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

static SCHEME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z][A-Za-z0-9+.\-]*$").expect("static scheme pattern is valid")
});

/// Query option naming the store region.
pub const OPTION_REGION: &str = "region";
/// Query option selecting a secret version by id.
pub const OPTION_VERSION_ID: &str = "version-id";
/// Query option selecting a secret version by staging label.
pub const OPTION_VERSION_STAGE: &str = "version-stage";

/// What a Source resolves through, decided by its scheme.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceKind {
    /// `s3://bucket/key.json`
    ObjectStore,
    /// `sm://name`
    SecretSingle,
    /// `sm://prefix/*`
    SecretRecursive,
    /// `file://path/to/.env`
    File,
    /// `manifest://path/to/manifest.yaml`
    Manifest,
    /// Any other scheme.
    Unrecognized(String),
}

impl SourceKind {
    /// Classify a scheme and locator.
    pub fn classify(scheme: &str, locator: &str) -> Self {
        match scheme {
            "s3" => SourceKind::ObjectStore,
            "sm" if locator.ends_with("/*") => SourceKind::SecretRecursive,
            "sm" => SourceKind::SecretSingle,
            "file" => SourceKind::File,
            "manifest" => SourceKind::Manifest,
            other => SourceKind::Unrecognized(other.to_string()),
        }
    }
}

/// Version selection attached to secret requests.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SecretVersion {
    /// Staging label, e.g. `AWSPREVIOUS`.
    pub stage: Option<String>,
    /// Exact version id.
    pub id: Option<String>,
}

/// One configured origin of configuration data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Source {
    raw: String,
    scheme: String,
    locator: String,
    options: Vec<(String, String)>,
}

impl Source {
    /// Parse `scheme ":" ["//"] locator ["?" query] ["#" fragment]`.
    pub fn parse(raw: &str) -> Result<Self, ResolveError> {
        let (scheme, rest) = raw
            .split_once(':')
            .ok_or_else(|| ResolveError::source_parse(raw, "missing scheme"))?;
        if !SCHEME.is_match(scheme) {
            return Err(ResolveError::source_parse(
                raw,
                format!("invalid scheme {scheme:?}"),
            ));
        }

        let rest = rest.strip_prefix("//").unwrap_or(rest);
        let rest = rest.split_once('#').map_or(rest, |(before, _)| before);
        let (locator, query) = match rest.split_once('?') {
            Some((locator, query)) => (locator, Some(query)),
            None => (rest, None),
        };

        let locator = decode(raw, locator)?;
        let mut options = Vec::new();
        if let Some(query) = query {
            for pair in query.split('&').filter(|p| !p.is_empty()) {
                let (name, value) = pair.split_once('=').unwrap_or((pair, ""));
                options.push((decode(raw, name)?, decode(raw, value)?));
            }
        }

        Ok(Self {
            raw: raw.to_string(),
            scheme: scheme.to_ascii_lowercase(),
            locator,
            options,
        })
    }

    /// The lower-cased scheme.
    pub fn scheme(&self) -> &str {
        &self.scheme
    }

    /// Host and path joined, percent-decoded, without query or fragment.
    pub fn locator(&self) -> &str {
        &self.locator
    }

    /// The text this Source was parsed from.
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    pub fn kind(&self) -> SourceKind {
        SourceKind::classify(&self.scheme, &self.locator)
    }

    /// First non-empty value of a query option.
    pub fn option(&self, name: &str) -> Option<&str> {
        self.options
            .iter()
            .find(|(key, value)| key == name && !value.is_empty())
            .map(|(_, value)| value.as_str())
    }

    pub fn region(&self) -> Option<&str> {
        self.option(OPTION_REGION)
    }

    /// Version selection carried in the query string.
    pub fn version(&self) -> SecretVersion {
        SecretVersion {
            stage: self.option(OPTION_VERSION_STAGE).map(str::to_string),
            id: self.option(OPTION_VERSION_ID).map(str::to_string),
        }
    }

    /// Split the locator into an object-store bucket and key.
    ///
    /// Only the first leading slash of the key is dropped, so
    /// `s3://bucket//a` addresses the key `/a`.
    pub fn bucket_and_key(&self) -> (&str, &str) {
        match self.locator.split_once('/') {
            Some((bucket, key)) => (bucket, key),
            None => (self.locator.as_str(), ""),
        }
    }
}

fn decode(raw: &str, component: &str) -> Result<String, ResolveError> {
    urlencoding::decode(component)
        .map(|s| s.into_owned())
        .map_err(|e| ResolveError::source_parse(raw, e.to_string()))
}

impl FromStr for Source {
    type Err = ResolveError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.raw)
    }
}

//! Structured error types for source resolution.
//!
//! Nothing in the core aborts on these: every error is recorded on the
//! [`Resolution`](crate::resolution::Resolution) of the Source it belongs to.

use serde::Serialize;
use std::time::Duration;
use thiserror::Error;

/// Error codes for programmatic error handling.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    // Configuration errors
    SourceParse,
    UnknownScheme,

    // Remote store errors
    NotFound,
    AccessDenied,
    StoreError,
    Timeout,

    // Content errors
    Decode,
    LocalIo,

    // Internal errors
    InternalError,
}

/// Error reported by a remote store collaborator.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("{0} not found")]
    NotFound(String),

    #[error("access denied to {0}")]
    AccessDenied(String),

    #[error("{0} has no string value")]
    Unsupported(String),

    #[error("{0}")]
    Client(String),
}

impl StoreError {
    pub fn code(&self) -> ErrorCode {
        match self {
            StoreError::NotFound(_) => ErrorCode::NotFound,
            StoreError::AccessDenied(_) => ErrorCode::AccessDenied,
            StoreError::Unsupported(_) | StoreError::Client(_) => ErrorCode::StoreError,
        }
    }
}

/// Error recorded against a Source while resolving it.
#[derive(Debug, Error)]
pub enum ResolveError {
    /// The source string could not be parsed.
    #[error("invalid source {input:?}: {reason}")]
    SourceParse { input: String, reason: String },

    /// No resolver handles the scheme.
    #[error("no resolver found for scheme {0:?}")]
    UnknownScheme(String),

    /// The store refused or could not find `target`.
    #[error("fetching {target}: {source}")]
    Access {
        target: String,
        #[source]
        source: StoreError,
    },

    #[error("fetching {target}: timed out after {}s", .after.as_secs())]
    Timeout { target: String, after: Duration },

    /// The body of `target` is not in the expected shape.
    #[error("decoding {target}: {message}")]
    Decode { target: String, message: String },

    #[error("reading {path}: {message}")]
    LocalIo { path: String, message: String },

    #[error("internal error: {0}")]
    Internal(String),
}

impl ResolveError {
    pub fn source_parse(input: &str, reason: impl Into<String>) -> Self {
        Self::SourceParse {
            input: input.to_string(),
            reason: reason.into(),
        }
    }

    pub fn access(target: impl Into<String>, source: StoreError) -> Self {
        Self::Access {
            target: target.into(),
            source,
        }
    }

    pub fn timeout(target: impl Into<String>, after: Duration) -> Self {
        Self::Timeout {
            target: target.into(),
            after,
        }
    }

    pub fn decode(target: impl Into<String>, err: impl std::fmt::Display) -> Self {
        Self::Decode {
            target: target.into(),
            message: err.to_string(),
        }
    }

    pub fn local_io(path: impl Into<String>, err: impl std::fmt::Display) -> Self {
        Self::LocalIo {
            path: path.into(),
            message: err.to_string(),
        }
    }

    pub fn internal(err: impl std::fmt::Display) -> Self {
        Self::Internal(err.to_string())
    }

    /// Stable code for this error.
    pub fn code(&self) -> ErrorCode {
        match self {
            ResolveError::SourceParse { .. } => ErrorCode::SourceParse,
            ResolveError::UnknownScheme(_) => ErrorCode::UnknownScheme,
            ResolveError::Access { source, .. } => source.code(),
            ResolveError::Timeout { .. } => ErrorCode::Timeout,
            ResolveError::Decode { .. } => ErrorCode::Decode,
            ResolveError::LocalIo { .. } => ErrorCode::LocalIo,
            ResolveError::Internal(_) => ErrorCode::InternalError,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes() {
        let err = ResolveError::access("prod/db", StoreError::NotFound("prod/db".into()));
        assert_eq!(err.code(), ErrorCode::NotFound);

        let err = ResolveError::access("prod/db", StoreError::AccessDenied("prod/db".into()));
        assert_eq!(err.code(), ErrorCode::AccessDenied);

        let err = ResolveError::timeout("prod/db", Duration::from_secs(30));
        assert_eq!(err.code(), ErrorCode::Timeout);
        assert_eq!(err.to_string(), "fetching prod/db: timed out after 30s");
    }

    #[test]
    fn test_code_serializes_screaming_snake() {
        let json = serde_json::to_string(&ErrorCode::UnknownScheme).unwrap();
        assert_eq!(json, "\"UNKNOWN_SCHEME\"");
    }

    #[test]
    fn test_display_messages() {
        let err = ResolveError::UnknownScheme("ftp".into());
        assert_eq!(err.to_string(), "no resolver found for scheme \"ftp\"");

        let err = ResolveError::access("bucket/key", StoreError::AccessDenied("bucket/key".into()));
        assert_eq!(err.to_string(), "fetching bucket/key: access denied to bucket/key");
    }
}

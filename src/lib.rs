//! snagsby: resolve configuration Sources into one set of items.
//!
//! A Source is a URI naming where items come from:
//!
//! - `s3://bucket/key.json` - a flat JSON object in S3
//! - `sm://name` - a Secrets Manager secret holding a flat JSON object
//! - `sm://prefix/*` - every secret under a prefix, one item each
//! - `file:///path/app.env` - `KEY=value` lines, `sm://` values are fetched
//! - `manifest:///path/secrets.yaml` - a list of secret name to item key
//!
//! Sources resolve concurrently and merge in declaration order, later
//! Sources overriding earlier ones.

pub mod app;
pub mod cli;
pub mod config;
pub mod error;
pub mod fetch;
pub mod format;
pub mod keys;
pub mod logging;
pub mod resolution;
pub mod resolvers;
pub mod source;
pub mod store;

pub use app::{merge, resolve_all};
pub use config::Config;
pub use error::{ErrorCode, ResolveError, StoreError};
pub use resolution::Resolution;
pub use source::Source;

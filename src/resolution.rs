//! The item/error output of resolving one Source.

use crate::error::ResolveError;
use crate::keys::normalize;
use crate::source::Source;
use std::collections::BTreeMap;

/// Items and errors produced for a single [`Source`].
///
/// Keys are normalized on insert, so two raw keys that normalize to the same
/// name collapse into one item and the later append wins. A Resolution with
/// errors is "failed" but may still carry partial items.
#[derive(Debug)]
pub struct Resolution {
    source: Source,
    items: BTreeMap<String, String>,
    errors: Vec<ResolveError>,
}

impl Resolution {
    pub fn new(source: Source) -> Self {
        Self {
            source,
            items: BTreeMap::new(),
            errors: Vec::new(),
        }
    }

    /// Build a Resolution that failed before producing any items.
    pub fn failed(source: Source, error: ResolveError) -> Self {
        let mut resolution = Self::new(source);
        resolution.append_error(error);
        resolution
    }

    pub fn source(&self) -> &Source {
        &self.source
    }

    /// Insert an item under the normalized form of `key`.
    pub fn append_item(&mut self, key: &str, value: impl Into<String>) {
        self.items.insert(normalize(key), value.into());
    }

    pub fn append_items<K, V>(&mut self, items: impl IntoIterator<Item = (K, V)>)
    where
        K: AsRef<str>,
        V: Into<String>,
    {
        for (key, value) in items {
            self.append_item(key.as_ref(), value);
        }
    }

    pub fn append_error(&mut self, error: ResolveError) {
        self.errors.push(error);
    }

    pub fn append_errors(&mut self, errors: impl IntoIterator<Item = ResolveError>) {
        self.errors.extend(errors);
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    pub fn items(&self) -> &BTreeMap<String, String> {
        &self.items
    }

    pub fn errors(&self) -> &[ResolveError] {
        &self.errors
    }

    /// Item keys in sorted order.
    pub fn item_keys(&self) -> Vec<&str> {
        self.items.keys().map(String::as_str).collect()
    }

    pub fn len_items(&self) -> usize {
        self.items.len()
    }
}

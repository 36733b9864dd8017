//! Header maps with last-write-wins semantics.
//!
//! Client defaults and per-request custom headers are both [`HeaderSet`]s.
//! They are layered onto a transport [`HeaderMap`] in order, each layer
//! replacing same-named headers of the one below instead of appending.

use std::collections::BTreeMap;

use reqwest::header::{CONTENT_LENGTH, HeaderMap, HeaderName, HeaderValue};

use crate::error::{Error, Result};

/// A set of header name/value pairs.
///
/// Names compare case-insensitively, as HTTP does. Inserting a name that is
/// already present, in any casing, replaces both its value and its spelling.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HeaderSet {
    // ASCII-lowercased name -> (name as last inserted, value)
    entries: BTreeMap<String, (String, String)>,
}

impl HeaderSet {
    /// Create an empty set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a header, returning the value it replaced.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) -> Option<String> {
        let name = name.into();
        self.entries
            .insert(name.to_ascii_lowercase(), (name, value.into()))
            .map(|(_, old)| old)
    }

    /// Builder-style [`insert`](Self::insert).
    #[must_use]
    pub fn with(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.insert(name, value);
        self
    }

    /// Look up a header, ignoring case.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries
            .get(&name.to_ascii_lowercase())
            .map(|(_, value)| value.as_str())
    }

    /// Remove a header, ignoring case.
    pub fn remove(&mut self, name: &str) -> Option<String> {
        self.entries
            .remove(&name.to_ascii_lowercase())
            .map(|(_, value)| value)
    }

    /// Number of headers in the set.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the set is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate over `(name, value)` pairs.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries
            .values()
            .map(|(name, value)| (name.as_str(), value.as_str()))
    }

    /// Return a new set with `other` layered on top of `self`.
    #[must_use]
    pub fn overlay(&self, other: &HeaderSet) -> HeaderSet {
        let mut merged = self.clone();
        merged.extend(other.iter().map(|(k, v)| (k.to_string(), v.to_string())));
        merged
    }

    /// Write every header into `map`, replacing any value already present
    /// under the same (case-insensitive) HTTP name.
    ///
    /// `content-length` is owned by the transport and is never written.
    pub fn apply_to(&self, map: &mut HeaderMap) -> Result<()> {
        for (name, value) in self.iter() {
            let name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|e| Error::Configuration(format!("invalid header name {name:?}: {e}")))?;
            if name == CONTENT_LENGTH {
                tracing::warn!("ignoring caller-supplied content-length header");
                continue;
            }
            let value = HeaderValue::from_str(value).map_err(|e| {
                Error::Configuration(format!("invalid value for header {name}: {e}"))
            })?;
            map.insert(name, value);
        }
        Ok(())
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for HeaderSet {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut set = Self::new();
        set.extend(iter);
        set
    }
}

impl<K: Into<String>, V: Into<String>> Extend<(K, V)> for HeaderSet {
    fn extend<I: IntoIterator<Item = (K, V)>>(&mut self, iter: I) {
        for (k, v) in iter {
            self.insert(k, v);
        }
    }
}

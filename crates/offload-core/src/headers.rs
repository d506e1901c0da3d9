//! Case-insensitive HTTP header multimap.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A case-insensitive multimap of header name to value(s).
///
/// Names are stored canonically lowercased; the original casing supplied
/// by callers is not preserved, matching the wire behavior described for
/// requests built by this crate (headers are merged and re-emitted, not
/// passed through byte-for-byte).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HttpHeaders {
    entries: Vec<(String, String)>,
}

impl HttpHeaders {
    /// An empty header set.
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    fn normalize(name: &str) -> String {
        name.to_ascii_lowercase()
    }

    /// Replaces all existing values for `name` with a single value.
    pub fn insert(&mut self, name: impl AsRef<str>, value: impl Into<String>) {
        let key = Self::normalize(name.as_ref());
        self.entries.retain(|(k, _)| k != &key);
        self.entries.push((key, value.into()));
    }

    /// Adds a value for `name` without removing existing values.
    pub fn append(&mut self, name: impl AsRef<str>, value: impl Into<String>) {
        let key = Self::normalize(name.as_ref());
        self.entries.push((key, value.into()));
    }

    /// Removes all values for `name`, returning whether any were present.
    pub fn remove(&mut self, name: impl AsRef<str>) -> bool {
        let key = Self::normalize(name.as_ref());
        let before = self.entries.len();
        self.entries.retain(|(k, _)| k != &key);
        self.entries.len() != before
    }

    /// Returns the first value for `name`, if any.
    pub fn get(&self, name: impl AsRef<str>) -> Option<&str> {
        let key = Self::normalize(name.as_ref());
        self.entries
            .iter()
            .find(|(k, _)| k == &key)
            .map(|(_, v)| v.as_str())
    }

    /// Returns every value stored for `name`, in insertion order.
    pub fn get_all<'a>(&'a self, name: &str) -> impl Iterator<Item = &'a str> + 'a {
        let key = Self::normalize(name);
        self.entries
            .iter()
            .filter(move |(k, _)| *k == key)
            .map(|(_, v)| v.as_str())
    }

    /// True if `name` has at least one value.
    pub fn contains(&self, name: impl AsRef<str>) -> bool {
        self.get(name).is_some()
    }

    /// Iterates over every `(name, value)` pair in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Number of stored `(name, value)` pairs (not distinct names).
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True if no headers are stored.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Merges `other` into `self`, with `self`'s values for a name winning
    /// when both sets define it. Used by `RequestTemplate` to apply
    /// per-request headers over template defaults.
    pub fn merge_over(mut self, defaults: &HttpHeaders) -> Self {
        for (key, value) in &defaults.entries {
            if !self.contains(key) {
                self.entries.push((key.clone(), value.clone()));
            }
        }
        self
    }

    /// Converts to a `reqwest::header::HeaderMap`, skipping any entry whose
    /// name or value fails HTTP validation rather than failing the whole
    /// conversion.
    pub fn to_header_map(&self) -> http::HeaderMap {
        let mut map = http::HeaderMap::new();
        for (name, value) in &self.entries {
            if let (Ok(name), Ok(value)) = (
                http::HeaderName::try_from(name.as_str()),
                http::HeaderValue::try_from(value.as_str()),
            ) {
                map.append(name, value);
            }
        }
        map
    }

    /// Builds headers from a `http::HeaderMap`, lowercasing names.
    pub fn from_header_map(map: &http::HeaderMap) -> Self {
        let mut headers = Self::new();
        for (name, value) in map.iter() {
            if let Ok(value) = value.to_str() {
                headers.append(name.as_str(), value.to_string());
            }
        }
        headers
    }
}

impl fmt::Display for HttpHeaders {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (name, value) in &self.entries {
            writeln!(f, "{name}: {value}")?;
        }
        Ok(())
    }
}

impl FromIterator<(String, String)> for HttpHeaders {
    fn from_iter<T: IntoIterator<Item = (String, String)>>(iter: T) -> Self {
        let mut headers = Self::new();
        for (name, value) in iter {
            headers.append(name, value);
        }
        headers
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_is_case_insensitive_and_replaces() {
        let mut headers = HttpHeaders::new();
        headers.insert("Content-Type", "text/plain");
        headers.insert("content-type", "application/json");
        assert_eq!(headers.get("CONTENT-TYPE"), Some("application/json"));
        assert_eq!(headers.len(), 1);
    }

    #[test]
    fn append_preserves_multiple_values() {
        let mut headers = HttpHeaders::new();
        headers.append("Set-Cookie", "a=1");
        headers.append("set-cookie", "b=2");
        let values: Vec<_> = headers.get_all("SET-COOKIE").collect();
        assert_eq!(values, vec!["a=1", "b=2"]);
    }

    #[test]
    fn merge_over_prefers_self_values() {
        let mut per_request = HttpHeaders::new();
        per_request.insert("x-env", "prod");

        let mut defaults = HttpHeaders::new();
        defaults.insert("x-env", "default");
        defaults.insert("user-agent", "offload-engine");

        let merged = per_request.merge_over(&defaults);
        assert_eq!(merged.get("x-env"), Some("prod"));
        assert_eq!(merged.get("user-agent"), Some("offload-engine"));
    }

    #[test]
    fn round_trips_through_json() {
        let mut headers = HttpHeaders::new();
        headers.insert("accept", "application/json");
        let json = serde_json::to_string(&headers).unwrap();
        let back: HttpHeaders = serde_json::from_str(&json).unwrap();
        assert_eq!(headers, back);
    }

    #[test]
    fn remove_reports_presence() {
        let mut headers = HttpHeaders::new();
        assert!(!headers.remove("x-missing"));
        headers.insert("x-present", "1");
        assert!(headers.remove("X-Present"));
        assert!(!headers.contains("x-present"));
    }
}

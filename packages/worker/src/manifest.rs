//! The versioned resource manifest and the shell subset of it.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use shellcache_store::Response;

/// Mapping from logical resource path to content fingerprint.
///
/// Paths are relative to the origin (`main.js`, `assets/font.otf`); `/` is
/// the root document. Ordered so the persisted JSON is deterministic.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResourceManifest(BTreeMap<String, String>);

impl ResourceManifest {
    pub fn new(entries: BTreeMap<String, String>) -> Self {
        Self(entries)
    }

    pub fn from_pairs<I, P, F>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (P, F)>,
        P: Into<String>,
        F: Into<String>,
    {
        Self(
            pairs
                .into_iter()
                .map(|(path, fingerprint)| (path.into(), fingerprint.into()))
                .collect(),
        )
    }

    pub fn fingerprint(&self, path: &str) -> Option<&str> {
        self.0.get(path).map(String::as_str)
    }

    pub fn contains(&self, path: &str) -> bool {
        self.0.contains_key(path)
    }

    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(p, f)| (p.as_str(), f.as_str()))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// The form the manifest is persisted in inside the record store.
    pub fn to_response(&self) -> Result<Response, serde_json::Error> {
        Response::json(self)
    }

    pub fn from_response(response: &Response) -> Result<Self, serde_json::Error> {
        response.parse_json()
    }
}

/// Paths that must be cached before the worker is usable offline.
///
/// Fetched in order at install time.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ShellSet(Vec<String>);

impl ShellSet {
    pub fn new<I, S>(paths: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(paths.into_iter().map(Into::into).collect())
    }

    pub fn paths(&self) -> &[String] {
        &self.0
    }

    pub fn contains(&self, path: &str) -> bool {
        self.0.iter().any(|p| p == path)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

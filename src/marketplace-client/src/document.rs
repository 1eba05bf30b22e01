//! Repository document shapes.
//!
//! Two kinds of document live in a repository:
//!
//! ```text
//! index.json           { "indexes": ["8/index.json"], "releases": ["11/11.0.14+9.json"] }
//! <release>.json       { "releases": [ { "release_name": "...", ... } ] }
//! ```
//!
//! Both are only parsed after their signature has been verified.

use std::collections::BTreeMap;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::error::FetchError;

/// Structural node of a repository.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexFile {
    /// Paths to further index documents, relative to this index.
    #[serde(default, deserialize_with = "null_as_empty")]
    pub indexes: Vec<String>,
    /// Paths to release-list documents, relative to this index.
    #[serde(default, deserialize_with = "null_as_empty")]
    pub releases: Vec<String>,
}

impl IndexFile {
    /// An index with neither children nor release documents.
    pub fn is_leaf(&self) -> bool {
        self.indexes.is_empty() && self.releases.is_empty()
    }
}

/// A release-list document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(bound(deserialize = "R: Deserialize<'de>"))]
pub struct ReleaseList<R = Release> {
    /// Release records.
    #[serde(default = "Vec::new", deserialize_with = "null_as_empty")]
    pub releases: Vec<R>,
}

/// A vendor release record.
///
/// Only the identifying fields are typed; the rest of the record is kept
/// as JSON so it survives a round trip untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Release {
    /// Vendor's name for the release, e.g. `jdk8u302-b08`.
    pub release_name: String,
    /// Link to the vendor's release page.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub release_link: Option<String>,
    /// Publication timestamp as published.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
    /// Publishing vendor.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vendor: Option<String>,
    /// Binary assets.
    #[serde(default, deserialize_with = "null_as_empty")]
    pub binaries: Vec<Value>,
    /// Parsed version information.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version_data: Option<Value>,
    /// Source package.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<Value>,
    /// Any other fields.
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

/// Parse trusted bytes as an index document.
pub fn parse_index(url: &str, bytes: &[u8]) -> Result<IndexFile, FetchError> {
    serde_json::from_slice(bytes)
        .map_err(|e| FetchError::malformed(url, format!("not an index document: {}", e)))
}

/// Parse trusted bytes as a release-list document.
pub fn parse_release_list<R: DeserializeOwned>(url: &str, bytes: &[u8]) -> Result<Vec<R>, FetchError> {
    serde_json::from_slice::<ReleaseList<R>>(bytes)
        .map(|list| list.releases)
        .map_err(|e| FetchError::malformed(url, format!("not a release list: {}", e)))
}

fn null_as_empty<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(Option::<Vec<T>>::deserialize(deserializer)?.unwrap_or_default())
}

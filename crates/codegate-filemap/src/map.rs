//! File maps
//!
//! [`FileMap`] is the single canonical shape every downstream check sees:
//! normalized sandbox paths mapped to text content.

use crate::hash::Fingerprint;
use crate::path::{PathError, SandboxPath};
use std::collections::BTreeMap;

/// Mapping from sandbox path to file content
///
/// Keys are unique after normalization and every value is text. Iteration
/// order is by path, which keeps fingerprints and logs deterministic.
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(transparent)]
pub struct FileMap(BTreeMap<SandboxPath, String>);

impl FileMap {
    /// Create empty map
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from raw `(key, content)` pairs, normalizing every key
    ///
    /// Keys that collapse to the same path after normalization are
    /// de-duplicated; the later entry wins.
    ///
    /// # Errors
    /// Returns [`PathError`] if a key is empty after normalization.
    pub fn from_raw_pairs<K, V>(pairs: impl IntoIterator<Item = (K, V)>) -> Result<Self, PathError>
    where
        K: AsRef<str>,
        V: Into<String>,
    {
        let mut map = Self::new();
        for (key, content) in pairs {
            map.insert(SandboxPath::normalize(key.as_ref())?, content);
        }
        Ok(map)
    }

    /// Insert a file, returning the previous content if any
    #[inline]
    pub fn insert(&mut self, path: SandboxPath, content: impl Into<String>) -> Option<String> {
        self.0.insert(path, content.into())
    }

    /// Look up a file by normalized path
    #[inline]
    #[must_use]
    pub fn get(&self, path: &SandboxPath) -> Option<&str> {
        self.0.get(path).map(String::as_str)
    }

    /// Check whether the map contains a path
    #[inline]
    #[must_use]
    pub fn contains(&self, path: &SandboxPath) -> bool {
        self.0.contains_key(path)
    }

    /// Number of files
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Check if the map has no files
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterate `(path, content)` in path order
    pub fn iter(&self) -> impl Iterator<Item = (&SandboxPath, &str)> {
        self.0.iter().map(|(path, content)| (path, content.as_str()))
    }

    /// Iterate paths in order
    pub fn paths(&self) -> impl Iterator<Item = &SandboxPath> {
        self.0.keys()
    }

    /// Overlay this map onto `base` (right-biased merge)
    ///
    /// Every key of `self` overwrites the same key in `base`; keys only in
    /// `base` are carried over unchanged.
    #[must_use]
    pub fn merged_over(&self, base: &FileMap) -> FileMap {
        let mut merged = base.clone();
        for (path, content) in &self.0 {
            merged.0.insert(path.clone(), content.clone());
        }
        merged
    }

    /// Fingerprint of the whole map
    #[must_use]
    pub fn fingerprint(&self) -> Fingerprint {
        Fingerprint::of_entries(self.iter().map(|(path, content)| (path.as_str(), content)))
    }
}

impl FromIterator<(SandboxPath, String)> for FileMap {
    fn from_iter<I: IntoIterator<Item = (SandboxPath, String)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl IntoIterator for FileMap {
    type Item = (SandboxPath, String);
    type IntoIter = std::collections::btree_map::IntoIter<SandboxPath, String>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

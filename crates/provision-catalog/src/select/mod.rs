//! Version selection among resources sharing a symbolic name

use std::collections::BTreeMap;

use provision_core::types::Version;

/// Picks one entry among several versions of the same resource
#[derive(Debug, Clone)]
pub struct VersionSelector<T> {
    /// Available entries sorted by version
    available: BTreeMap<Version, T>,
}

impl<T> VersionSelector<T> {
    /// Create an empty selector
    pub fn new() -> Self {
        Self {
            available: BTreeMap::new(),
        }
    }

    /// Add an entry, replacing any earlier entry with the same version
    pub fn insert(&mut self, version: Version, entry: T) -> Option<T> {
        self.available.insert(version, entry)
    }

    /// Highest available version
    pub fn highest(&self) -> Option<&T> {
        self.available.values().next_back()
    }

    /// Exact version if available
    pub fn exact(&self, version: &Version) -> Option<&T> {
        self.available.get(version)
    }

    /// Preferred version when available, highest otherwise
    pub fn select(&self, preferred: Option<&Version>) -> Option<&T> {
        preferred
            .and_then(|version| self.exact(version))
            .or_else(|| self.highest())
    }

    /// All versions in ascending order
    pub fn versions(&self) -> impl Iterator<Item = &Version> {
        self.available.keys()
    }

    pub fn len(&self) -> usize {
        self.available.len()
    }

    pub fn is_empty(&self) -> bool {
        self.available.is_empty()
    }
}

impl<T> Default for VersionSelector<T> {
    fn default() -> Self {
        Self::new()
    }
}

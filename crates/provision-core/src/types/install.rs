//! Ordered install lists produced by resolution.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

use super::{FeatureDefinition, SampleDefinition};

/// How strictly a resolution pass treats version conflicts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ResolutionMode {
    /// Best-effort transitive closure, conflicting versions are all kept
    #[default]
    IgnoreConflicts,
    /// Strict resolution that fails on incompatible singleton versions
    DetectConflicts,
}

/// Single entry of an install list
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InstallResource {
    Feature(Arc<FeatureDefinition>),
    Sample(Arc<SampleDefinition>),
}

/// Resources to install for one requested root, dependencies first
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallList {
    /// Name the root was requested by
    pub root: String,
    pub resources: Vec<InstallResource>,
}

impl InstallResource {
    /// Symbolic name of a feature or name of a sample
    pub fn name(&self) -> &str {
        match self {
            InstallResource::Feature(feature) => &feature.symbolic_name,
            InstallResource::Sample(sample) => &sample.name,
        }
    }

    pub fn as_feature(&self) -> Option<&FeatureDefinition> {
        match self {
            InstallResource::Feature(feature) => Some(feature),
            InstallResource::Sample(_) => None,
        }
    }

    pub fn is_sample(&self) -> bool {
        matches!(self, InstallResource::Sample(_))
    }
}

impl fmt::Display for InstallResource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InstallResource::Feature(feature) => {
                write!(f, "{} {}", feature.symbolic_name, feature.version)
            }
            InstallResource::Sample(sample) => write!(f, "{} (sample)", sample.name),
        }
    }
}

impl InstallList {
    pub fn new(root: impl Into<String>, resources: Vec<InstallResource>) -> Self {
        Self {
            root: root.into(),
            resources,
        }
    }

    /// Resource names in install order
    pub fn names(&self) -> Vec<&str> {
        self.resources.iter().map(InstallResource::name).collect()
    }

    pub fn len(&self) -> usize {
        self.resources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.position(name).is_some()
    }

    /// Index of a resource in install order
    pub fn position(&self, name: &str) -> Option<usize> {
        self.resources.iter().position(|r| r.name() == name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &InstallResource> {
        self.resources.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_install_list_lookup() {
        let list = InstallList::new(
            "app",
            vec![
                InstallResource::Feature(Arc::new(FeatureDefinition::new("dep"))),
                InstallResource::Sample(Arc::new(SampleDefinition::new("app", "App"))),
            ],
        );

        assert_eq!(list.names(), vec!["dep", "app"]);
        assert_eq!(list.position("app"), Some(1));
        assert!(list.contains("dep"));
        assert!(!list.contains("missing"));
        assert!(list.resources[1].is_sample());
        assert!(list.resources[1].as_feature().is_none());
    }
}

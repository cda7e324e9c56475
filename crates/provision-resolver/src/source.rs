//! Read-only view of the feature universe used by walks and solvers

use std::sync::Arc;

use provision_catalog::Catalog;
use provision_core::types::{FeatureDefinition, NonApplicableResource, Version};

/// Lookup operations resolution needs from a feature universe
pub trait FeatureSource {
    /// Find a feature by symbolic or short name, highest version first
    fn feature(&self, name: &str) -> Option<Arc<FeatureDefinition>>;

    /// Find one exact version of a feature
    fn feature_version(&self, name: &str, version: &Version) -> Option<Arc<FeatureDefinition>>;

    /// Every feature in the universe
    fn features(&self) -> Vec<Arc<FeatureDefinition>>;

    /// Every auto-feature in the universe
    fn auto_features(&self) -> Vec<Arc<FeatureDefinition>>;

    /// Resources with this name that only apply to other products
    fn non_applicable_resources(&self, name: &str) -> &[NonApplicableResource];
}

impl FeatureSource for Catalog {
    fn feature(&self, name: &str) -> Option<Arc<FeatureDefinition>> {
        Catalog::feature(self, name)
    }

    fn feature_version(&self, name: &str, version: &Version) -> Option<Arc<FeatureDefinition>> {
        Catalog::feature_version(self, name, version)
    }

    fn features(&self) -> Vec<Arc<FeatureDefinition>> {
        Catalog::features(self)
    }

    fn auto_features(&self) -> Vec<Arc<FeatureDefinition>> {
        Catalog::auto_features(self)
    }

    fn non_applicable_resources(&self, name: &str) -> &[NonApplicableResource] {
        Catalog::non_applicable_resources(self, name)
    }
}

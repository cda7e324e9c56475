//! Core data types for feature resolution.
//!
//! This module provides the fundamental types used throughout provision:
//! - Resource versions and ranges
//! - Feature and sample definitions
//! - Installed products and applies-to constraints
//! - Install lists and resolution modes

pub mod feature;
pub mod install;
pub mod product;
pub mod sample;
pub mod version;

// Re-export all public types
pub use feature::{base_name, FeatureDefinition, FeatureDependency, FeatureKind};
pub use install::{InstallList, InstallResource, ResolutionMode};
pub use product::{
    is_applicable, NonApplicableResource, ProductDefinition, ProductRequirementInformation,
};
pub use sample::{SampleDefinition, SampleKind};
pub use version::{Version, VersionError, VersionRange};

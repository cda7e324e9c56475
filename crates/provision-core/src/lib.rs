//! # provision-core
//!
//! Core types and errors shared across all provision crates.
//!
//! This crate provides:
//! - Four-part resource versions and version ranges
//! - Feature, sample and product definitions
//! - Applies-to expression parsing into product requirements
//! - Install lists produced by resolution
//! - ProvisionError and ResolutionError for unified error handling
//!
//! ## Architecture
//!
//! The crate is organized into modules:
//! - `types`: Core data types (Version, FeatureDefinition, InstallList, etc.)
//! - `error`: Error types and result aliases

pub mod error;
pub mod types;

// Re-export commonly used types
pub use error::{
    ConflictChain, MissingRequirement, ProvisionError, ProvisionResult, ResolutionError,
};
pub use types::{
    FeatureDefinition, FeatureDependency, FeatureKind, InstallList, InstallResource,
    NonApplicableResource, ProductDefinition, ProductRequirementInformation, ResolutionMode,
    SampleDefinition, SampleKind, Version, VersionError, VersionRange,
};

//! Catalog manifests and resolver settings for provision
//!
//! This crate reads catalog manifests (TOML, or a JSON resource array) into a
//! single manifest model that builds a [`Catalog`](provision_catalog::Catalog),
//! and layers resolver settings from defaults, the global config, the project
//! `provision.toml`, the environment and command line flags.

pub mod json;
pub mod manifest;
pub mod merge;

// Re-export main types
pub use json::{JsonCatalog, JsonResource};
pub use manifest::{CatalogManifest, DependencyEntry, FeatureEntry, ProductEntry, SampleEntry};
pub use merge::{ResolverSettings, SettingsLayer, SettingsLayering, SettingsLoader, SettingsSource};

use provision_core::error::ProvisionError;

/// Result type for configuration operations
pub type ConfigResult<T> = Result<T, ProvisionError>;

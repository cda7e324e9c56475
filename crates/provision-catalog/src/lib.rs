//! In-memory resource catalog for feature resolution
//!
//! This crate holds the universe a resolution pass works against: installed
//! features, repository features and samples, and the products they apply to.
//! Resources that only apply to other products are kept aside so failures can
//! be reported precisely.

pub mod catalog;
pub mod select;

// Re-export main types
pub use catalog::{Catalog, CatalogBuilder, CatalogStats};
pub use select::VersionSelector;

use provision_core::error::ProvisionError;

/// Result type for catalog operations
pub type CatalogResult<T> = Result<T, ProvisionError>;

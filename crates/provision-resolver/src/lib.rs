//! Install list resolution for features and samples
//!
//! This crate turns requested feature and sample names into ordered install
//! lists, dependencies first. Resolution walks the feature dependency tree
//! over a [`Catalog`](provision_catalog::Catalog), pulls in auto-features
//! whose capabilities are satisfied, and reports missing resources, resources
//! for other products and conflicting singleton versions in one aggregated
//! error.

pub mod graph;
pub mod resolver;
pub mod solver;
pub mod source;
pub mod tree;
pub mod walker;

// Re-export main types
pub use graph::FeatureGraph;
pub use resolver::{RepositoryResolver, VERSION_REQUEST_SEPARATOR};
pub use solver::{ConstraintSolver, RequestedFeature, SingletonSolver, SolverOutcome, SolverRequest};
pub use source::FeatureSource;
pub use tree::{dependency_candidates, FeatureTreeWalker};
pub use walker::{walk_breadth_first, walk_depth_first, WalkDecision};

use provision_core::error::ProvisionError;

/// Result type for resolver operations
pub type ResolverResult<T> = Result<T, ProvisionError>;

//! `provision check` command implementation.

use provision_catalog::CatalogStats;
use provision_core::error::ProvisionResult;
use provision_resolver::FeatureGraph;
use tracing::debug;

use super::{load_catalog, CommandContext};

/// What `provision check` found in the configured catalogs
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckReport {
    pub stats: CatalogStats,
    pub dependencies: usize,
    /// Groups of features that depend on each other
    pub cycles: Vec<Vec<String>>,
}

/// Load and validate the catalogs, then look for circular relationships
pub fn inspect(ctx: &CommandContext) -> ProvisionResult<CheckReport> {
    let catalog = load_catalog(ctx)?;
    let features = catalog.features();
    let graph = FeatureGraph::from_features(&catalog, features.iter());
    debug!(
        "Feature graph has {} nodes and {} edges",
        graph.feature_count(),
        graph.dependency_count()
    );

    Ok(CheckReport {
        stats: catalog.stats(),
        dependencies: graph.dependency_count(),
        cycles: graph.cycles(),
    })
}

/// Execute the `provision check` command
pub fn execute(ctx: &CommandContext) -> ProvisionResult<()> {
    let report = inspect(ctx)?;
    let stats = report.stats;

    ctx.output.info(&format!("Products: {}", stats.products));
    ctx.output.info(&format!("Installed features: {}", stats.installed));
    ctx.output.info(&format!(
        "Repository features: {} ({} dependencies)",
        stats.features, report.dependencies
    ));
    ctx.output.info(&format!("Samples: {}", stats.samples));
    if stats.non_applicable > 0 {
        ctx.output.info(&format!(
            "Resources for other products: {}",
            stats.non_applicable
        ));
    }

    for cycle in &report.cycles {
        ctx.output.warn(&format!(
            "Circular feature relationship: {}",
            FeatureGraph::format_cycle(cycle)
        ));
    }

    ctx.output.success(&format!(
        "{} catalog(s) are valid",
        ctx.settings.catalogs.len()
    ));
    Ok(())
}

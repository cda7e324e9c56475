//! Common utilities for benchmarks

use std::fmt::Write;
use std::sync::Arc;

use criterion::Criterion;
use pprof::criterion::{Output, PProfProfiler};

use provision_catalog::Catalog;
use provision_core::types::{FeatureDefinition, FeatureKind, Version};

/// Configure criterion with flamegraph profiling support
pub fn criterion_config() -> Criterion {
    Criterion::default()
        .warm_up_time(std::time::Duration::from_secs(3))
        .measurement_time(std::time::Duration::from_secs(10))
        .sample_size(100)
        .with_profiler(PProfProfiler::new(100, Output::Flamegraph(None)))
}

fn layered_name(layer: usize, index: usize) -> String {
    format!("com.example.l{layer}.f{index}-1.0")
}

/// Catalog of `layers` layers with `width` features each.
///
/// Every feature depends on two features of the layer below, and all of
/// layer 0 depends on one installed kernel feature.
pub fn layered_catalog(layers: usize, width: usize) -> Arc<Catalog> {
    let mut builder = Catalog::builder().installed(
        FeatureDefinition::new("com.example.kernel").with_kind(FeatureKind::Kernel),
    );

    for layer in 0..layers {
        for index in 0..width {
            let mut feature = FeatureDefinition::new(layered_name(layer, index))
                .with_short_name(format!("l{layer}f{index}"))
                .with_version(Version::new(1, 0, 0, 0));

            feature = if layer == 0 {
                feature.depends_on("com.example.kernel")
            } else {
                feature
                    .depends_on(layered_name(layer - 1, index))
                    .depends_on(layered_name(layer - 1, (index + 1) % width))
            };
            builder = builder.feature(feature);
        }
    }

    match builder.build() {
        Ok(catalog) => Arc::new(catalog),
        Err(e) => panic!("layered catalog is valid: {e}"),
    }
}

/// Names of the top layer of [`layered_catalog`]
pub fn top_layer(layers: usize, width: usize) -> Vec<String> {
    (0..width).map(|index| layered_name(layers - 1, index)).collect()
}

/// TOML manifest text with `count` features in a dependency chain
pub fn chain_manifest(count: usize) -> String {
    let mut manifest = String::from(
        "[[product]]\nid = \"com.example.server\"\nversion = \"8.5.5.2\"\n\n",
    );

    for index in 0..count {
        let _ = writeln!(manifest, "[[feature]]");
        let _ = writeln!(manifest, "symbolic-name = \"com.example.f{index}-1.0\"");
        let _ = writeln!(manifest, "short-name = \"f{index}\"");
        let _ = writeln!(manifest, "version = \"1.0.{index}\"");
        if index > 0 {
            let _ = writeln!(manifest, "dependencies = [\"com.example.f{}-1.0\"]", index - 1);
        }
        let _ = writeln!(manifest, "applies-to = \"com.example.server; productVersion=8.5.5.2+\"");
        manifest.push('\n');
    }

    manifest
}

//! Catalog of installed and available resources
//!
//! Repository resources are filtered against the installed products when the
//! catalog is built. Installed features shadow repository features with the
//! same symbolic name, and several repository versions of one feature collapse
//! into a version selector.

use std::collections::HashMap;
use std::sync::Arc;

use indexmap::IndexMap;
use tracing::{debug, trace};

use provision_core::types::{
    is_applicable, FeatureDefinition, NonApplicableResource, ProductDefinition, SampleDefinition,
    Version,
};

use crate::select::VersionSelector;
use crate::CatalogResult;


/// Read-only universe of resources for resolution
#[derive(Debug, Default)]
pub struct Catalog {
    /// Installed products used for applicability
    products: Vec<ProductDefinition>,
    /// Installed features by symbolic name
    installed: IndexMap<String, Arc<FeatureDefinition>>,
    /// Applicable repository features by symbolic name
    repository: IndexMap<String, VersionSelector<Arc<FeatureDefinition>>>,
    /// Lower-cased short name to symbolic name
    short_names: HashMap<String, String>,
    /// Applicable samples by lower-cased short name
    samples: IndexMap<String, Arc<SampleDefinition>>,
    /// Sample name to lower-cased short name
    sample_names: HashMap<String, String>,
    /// Resources for other products, keyed by name and lower-cased short name
    non_applicable: HashMap<String, Vec<NonApplicableResource>>,
}

/// Counts reported by `provision check`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CatalogStats {
    pub products: usize,
    pub installed: usize,
    pub features: usize,
    pub samples: usize,
    pub non_applicable: usize,
}

/// Collects resources and builds a [`Catalog`]
#[derive(Debug, Default)]
pub struct CatalogBuilder {
    products: Vec<ProductDefinition>,
    installed: Vec<FeatureDefinition>,
    features: Vec<FeatureDefinition>,
    samples: Vec<SampleDefinition>,
}

impl CatalogBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an installed product
    pub fn product(mut self, product: ProductDefinition) -> Self {
        self.products.push(product);
        self
    }

    /// Add an already installed feature
    pub fn installed(mut self, feature: FeatureDefinition) -> Self {
        self.installed.push(feature);
        self
    }

    /// Add a repository feature
    pub fn feature(mut self, feature: FeatureDefinition) -> Self {
        self.features.push(feature);
        self
    }

    /// Add a repository sample
    pub fn sample(mut self, sample: SampleDefinition) -> Self {
        self.samples.push(sample);
        self
    }

    pub fn products(mut self, products: impl IntoIterator<Item = ProductDefinition>) -> Self {
        self.products.extend(products);
        self
    }

    pub fn installed_features(
        mut self,
        features: impl IntoIterator<Item = FeatureDefinition>,
    ) -> Self {
        self.installed.extend(features);
        self
    }

    pub fn features(mut self, features: impl IntoIterator<Item = FeatureDefinition>) -> Self {
        self.features.extend(features);
        self
    }

    pub fn samples(mut self, samples: impl IntoIterator<Item = SampleDefinition>) -> Self {
        self.samples.extend(samples);
        self
    }

    /// Build the catalog, parsing every applies-to expression
    pub fn build(self) -> CatalogResult<Catalog> {
        let mut catalog = Catalog {
            products: self.products,
            ..Catalog::default()
        };

        for feature in self.installed {
            let feature = Arc::new(feature);
            catalog.index_short_name(&feature);
            catalog
                .installed
                .insert(feature.symbolic_name.clone(), feature);
        }

        for feature in self.features {
            if catalog.installed.contains_key(&feature.symbolic_name) {
                trace!(
                    "Repository feature {} shadowed by installed feature",
                    feature.symbolic_name
                );
                continue;
            }

            if let Some(applies_to) = &feature.applies_to {
                let resource = NonApplicableResource::new(&feature.symbolic_name, applies_to)?;
                if !is_applicable(&resource.requirements, &catalog.products) {
                    debug!(
                        "Feature {} {} does not apply to installed products",
                        feature.symbolic_name, feature.version
                    );
                    catalog.add_non_applicable(resource, feature.short_name.as_deref());
                    continue;
                }
            }

            let feature = Arc::new(feature);
            catalog.index_short_name(&feature);
            catalog
                .repository
                .entry(feature.symbolic_name.clone())
                .or_default()
                .insert(feature.version, feature);
        }

        for sample in self.samples {
            if let Some(applies_to) = &sample.applies_to {
                let resource = NonApplicableResource::new(&sample.name, applies_to)?;
                if !is_applicable(&resource.requirements, &catalog.products) {
                    debug!("Sample {} does not apply to installed products", sample.name);
                    catalog.add_non_applicable(resource, Some(&sample.short_name));
                    continue;
                }
            }

            let key = sample.short_name.to_lowercase();
            catalog.sample_names.insert(sample.name.clone(), key.clone());
            catalog.samples.insert(key, Arc::new(sample));
        }

        debug!(
            "Built catalog with {} installed and {} repository features, {} samples",
            catalog.installed.len(),
            catalog.repository.len(),
            catalog.samples.len()
        );

        Ok(catalog)
    }
}

impl Catalog {
    /// Create a catalog builder
    pub fn builder() -> CatalogBuilder {
        CatalogBuilder::new()
    }

    fn index_short_name(&mut self, feature: &FeatureDefinition) {
        if let Some(short_name) = &feature.short_name {
            self.short_names
                .entry(short_name.to_lowercase())
                .or_insert_with(|| feature.symbolic_name.clone());
        }
    }

    fn add_non_applicable(&mut self, resource: NonApplicableResource, short_name: Option<&str>) {
        if let Some(short_name) = short_name {
            let key = short_name.to_lowercase();
            if key != resource.name {
                self.non_applicable
                    .entry(key)
                    .or_default()
                    .push(resource.clone());
            }
        }
        self.non_applicable
            .entry(resource.name.clone())
            .or_default()
            .push(resource);
    }

    /// Map a requested name to the symbolic name it refers to
    fn symbolic_name<'a>(&'a self, name: &'a str) -> Option<&'a str> {
        if self.installed.contains_key(name) || self.repository.contains_key(name) {
            return Some(name);
        }
        self.short_names
            .get(&name.to_lowercase())
            .map(String::as_str)
    }

    /// Products resources are filtered against
    pub fn products(&self) -> &[ProductDefinition] {
        &self.products
    }

    /// Find a feature by symbolic name or case-insensitive short name.
    ///
    /// Installed features win; otherwise the highest repository version.
    pub fn feature(&self, name: &str) -> Option<Arc<FeatureDefinition>> {
        let symbolic = self.symbolic_name(name)?;
        if let Some(installed) = self.installed.get(symbolic) {
            return Some(Arc::clone(installed));
        }
        self.repository
            .get(symbolic)
            .and_then(VersionSelector::highest)
            .cloned()
    }

    /// Find one exact version of a feature.
    ///
    /// An installed feature is returned whatever version was asked for, since
    /// only one version of a symbolic name can be installed.
    pub fn feature_version(&self, name: &str, version: &Version) -> Option<Arc<FeatureDefinition>> {
        let symbolic = self.symbolic_name(name)?;
        if let Some(installed) = self.installed.get(symbolic) {
            return Some(Arc::clone(installed));
        }
        self.repository
            .get(symbolic)
            .and_then(|selector| selector.exact(version))
            .cloned()
    }

    /// Every known feature: installed first, then the highest repository versions
    pub fn features(&self) -> Vec<Arc<FeatureDefinition>> {
        self.installed
            .values()
            .cloned()
            .chain(
                self.repository
                    .values()
                    .filter_map(VersionSelector::highest)
                    .cloned(),
            )
            .collect()
    }

    /// Every known auto-feature
    pub fn auto_features(&self) -> Vec<Arc<FeatureDefinition>> {
        self.features()
            .into_iter()
            .filter(|feature| feature.is_auto_feature())
            .collect()
    }

    /// Every known kernel feature
    pub fn kernel_features(&self) -> Vec<Arc<FeatureDefinition>> {
        self.features()
            .into_iter()
            .filter(|feature| feature.is_kernel())
            .collect()
    }

    /// Installed features in insertion order
    pub fn installed_features(&self) -> impl Iterator<Item = &Arc<FeatureDefinition>> {
        self.installed.values()
    }

    /// Whether a feature with this symbolic name is installed
    pub fn is_installed(&self, symbolic_name: &str) -> bool {
        self.installed.contains_key(symbolic_name)
    }

    /// Resources with this name that exist only for other products
    pub fn non_applicable_resources(&self, name: &str) -> &[NonApplicableResource] {
        self.non_applicable
            .get(name)
            .or_else(|| self.non_applicable.get(&name.to_lowercase()))
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Find a sample by case-insensitive short name or exact name
    pub fn sample(&self, name: &str) -> Option<Arc<SampleDefinition>> {
        let key = name.to_lowercase();
        self.samples
            .get(&key)
            .or_else(|| {
                self.sample_names
                    .get(name)
                    .and_then(|key| self.samples.get(key))
            })
            .cloned()
    }

    /// Applicable samples in insertion order
    pub fn samples(&self) -> impl Iterator<Item = &Arc<SampleDefinition>> {
        self.samples.values()
    }

    /// Number of distinct features
    pub fn feature_count(&self) -> usize {
        self.installed.len() + self.repository.len()
    }

    pub fn stats(&self) -> CatalogStats {
        let mut non_applicable: Vec<&str> = self
            .non_applicable
            .values()
            .flatten()
            .map(|resource| resource.name.as_str())
            .collect();
        non_applicable.sort_unstable();
        non_applicable.dedup();

        CatalogStats {
            products: self.products.len(),
            installed: self.installed.len(),
            features: self.repository.len(),
            samples: self.samples.len(),
            non_applicable: non_applicable.len(),
        }
    }
}

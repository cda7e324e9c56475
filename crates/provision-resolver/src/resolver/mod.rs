//! Turns requested feature and sample names into ordered install lists
//!
//! A resolver owns a read-only catalog and keeps all per-call state in a
//! short-lived pass, so one instance may serve overlapping calls.
//!
//! Each pass:
//! 1. classifies the requested names into samples and features,
//! 2. computes the set of features to install, either as a best-effort
//!    closure or through the strict constraint solver,
//! 3. reports names that are missing or only exist for other products,
//! 4. finds resolved features no request accounts for,
//! 5. builds one install list per request, dependencies first.

use std::collections::{BTreeSet, HashMap, HashSet};
use std::sync::Arc;

use indexmap::{IndexMap, IndexSet};
use tracing::{debug, info, trace, warn};

use provision_catalog::Catalog;
use provision_core::error::{MissingRequirement, ProvisionError, ProvisionResult, ResolutionError};
use provision_core::types::{
    FeatureDefinition, FeatureDependency, InstallList, InstallResource, ResolutionMode,
    SampleDefinition, Version,
};

use crate::graph::FeatureGraph;
use crate::solver::{ConstraintSolver, RequestedFeature, SingletonSolver, SolverRequest};
use crate::tree::{dependency_candidates, FeatureTreeWalker};
use crate::walker::WalkDecision;


/// Separator between a feature name and a requested version
pub const VERSION_REQUEST_SEPARATOR: char = '/';

/// Resolves requests against a catalog
#[derive(Debug)]
pub struct RepositoryResolver {
    catalog: Arc<Catalog>,
    solver: Box<dyn ConstraintSolver>,
    /// Features the strict solver must not select
    excluded: HashSet<String>,
}

impl RepositoryResolver {
    /// Create a resolver with the default singleton solver
    pub fn new(catalog: Arc<Catalog>) -> Self {
        Self {
            catalog,
            solver: Box::new(SingletonSolver::new()),
            excluded: HashSet::new(),
        }
    }

    /// Replace the solver used by strict resolution
    pub fn with_solver<S>(mut self, solver: S) -> Self
    where
        S: ConstraintSolver + 'static,
    {
        self.solver = Box::new(solver);
        self
    }

    /// Features strict resolution must never select
    pub fn with_excluded_features<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.excluded.extend(names.into_iter().map(Into::into));
        self
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    /// Best-effort resolution, every requested version is kept
    pub fn resolve<I, S>(&self, names: I) -> ProvisionResult<Vec<InstallList>>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.resolve_with_mode(names, ResolutionMode::IgnoreConflicts)
    }

    /// Strict resolution that fails on conflicting singleton versions
    pub fn resolve_as_set<I, S>(&self, names: I) -> ProvisionResult<Vec<InstallList>>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.resolve_with_mode(names, ResolutionMode::DetectConflicts)
    }

    /// Resolve names with an explicit mode
    pub fn resolve_with_mode<I, S>(
        &self,
        names: I,
        mode: ResolutionMode,
    ) -> ProvisionResult<Vec<InstallList>>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let names: Vec<String> = names.into_iter().map(|n| n.as_ref().to_string()).collect();
        info!("Resolving {} name(s) with {:?}", names.len(), mode);

        let mut pass = ResolutionPass::new(self);
        pass.classify(&names)?;

        match mode {
            ResolutionMode::IgnoreConflicts => pass.resolve_ignoring_conflicts(),
            ResolutionMode::DetectConflicts => {
                pass.resolve_detecting_conflicts();
                if !pass.errors.conflicts.is_empty() {
                    warn!(
                        "Conflicting singleton versions of {}",
                        pass.errors
                            .conflicts
                            .keys()
                            .cloned()
                            .collect::<Vec<_>>()
                            .join(", ")
                    );
                    pass.mark_incomplete_roots();
                    return Err(pass.errors.into());
                }
            }
        }

        pass.mark_incomplete_roots();
        pass.log_cycles();
        let install_lists = pass.build_install_lists();

        if pass.errors.has_failures() {
            debug!("Resolution failed: {}", pass.errors);
            pass.errors.install_lists = install_lists;
            return Err(pass.errors.into());
        }

        debug!("Resolved {} install list(s)", install_lists.len());
        Ok(install_lists)
    }
}

/// Feature request after splitting off an optional version
#[derive(Debug, Clone)]
struct FeatureRequest {
    /// Name exactly as requested
    requested: String,
    /// Feature the name resolved to
    feature: Option<Arc<FeatureDefinition>>,
}

/// Sample request with the features it needs
#[derive(Debug, Clone)]
struct SampleRequest {
    requested: String,
    sample: Arc<SampleDefinition>,
    /// Required features that exist in the catalog
    features: Vec<Arc<FeatureDefinition>>,
}

/// Part a feature plays in walks over the resolved set
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum NodeRole {
    /// Resolved, appears in install lists
    Install,
    /// Kernel feature whose dependencies still count
    PassThrough,
    /// Installed or not selected
    Skip,
}

/// State of a single resolution call
struct ResolutionPass<'r> {
    resolver: &'r RepositoryResolver,
    catalog: &'r Catalog,
    samples: Vec<SampleRequest>,
    features: Vec<FeatureRequest>,
    preferred: HashMap<String, Version>,
    /// Features to install, never installed or kernel features
    resolved: IndexMap<String, Arc<FeatureDefinition>>,
    /// Features with at least one unmet dependency
    incomplete: HashSet<String>,
    errors: ResolutionError,
}

impl<'r> ResolutionPass<'r> {
    fn new(resolver: &'r RepositoryResolver) -> Self {
        Self {
            resolver,
            catalog: &resolver.catalog,
            samples: Vec::new(),
            features: Vec::new(),
            preferred: HashMap::new(),
            resolved: IndexMap::new(),
            incomplete: HashSet::new(),
            errors: ResolutionError::default(),
        }
    }

    /// Split names into samples and features, first occurrence wins
    fn classify(&mut self, names: &[String]) -> ProvisionResult<()> {
        let mut seen = HashSet::new();

        for requested in names {
            if !seen.insert(requested.as_str()) {
                continue;
            }

            if let Some(sample) = self.catalog.sample(requested) {
                trace!("'{}' is sample {}", requested, sample.name);
                let mut features = Vec::new();
                for name in &sample.required_features {
                    match self.catalog.feature(name) {
                        Some(feature) => features.push(feature),
                        None => {
                            self.record_not_found(name, Some(sample.name.clone()));
                            self.add_top_level_not_resolved(requested);
                        }
                    }
                }
                self.samples.push(SampleRequest {
                    requested: requested.clone(),
                    sample,
                    features,
                });
                continue;
            }

            let (name, version) = split_version(requested)?;
            let feature = match &version {
                Some(version) => self.catalog.feature_version(&name, version),
                None => self.catalog.feature(&name),
            };

            match &feature {
                Some(feature) => {
                    if let Some(version) = version {
                        self.preferred.insert(feature.symbolic_name.clone(), version);
                    }
                }
                None => {
                    debug!("Requested feature '{}' not found", requested);
                    self.record_not_found(&name, None);
                    self.add_top_level_not_resolved(requested);
                }
            }

            self.features.push(FeatureRequest {
                requested: requested.clone(),
                feature,
            });
        }

        Ok(())
    }

    /// Root features requested directly or through samples
    fn root_features(&self) -> Vec<Arc<FeatureDefinition>> {
        let samples = self.samples.iter().flat_map(|s| s.features.iter().cloned());
        let features = self.features.iter().filter_map(|r| r.feature.clone());
        samples.chain(features).collect()
    }

    fn resolve_ignoring_conflicts(&mut self) {
        for root in self.root_features() {
            if self.catalog.is_installed(&root.symbolic_name) {
                trace!("{} is already installed", root.symbolic_name);
                continue;
            }
            self.walk_into_resolved(root, true);
        }

        self.complete_installed_features();
        self.provision_auto_features();
    }

    /// Walk a tree, adding every feature that still needs installing
    fn walk_into_resolved(&mut self, root: Arc<FeatureDefinition>, autofeature_edges: bool) {
        let catalog = self.catalog;
        let mut visited: HashSet<String> = HashSet::new();
        let mut found: Vec<Arc<FeatureDefinition>> = Vec::new();
        let mut missing: Vec<(String, String)> = Vec::new();

        FeatureTreeWalker::walk_over(catalog)
            .use_autofeature_provision_as_dependency(autofeature_edges)
            .prefer_versions(&self.preferred)
            .for_each(|parent, feature| {
                if catalog.is_installed(&feature.symbolic_name) {
                    return WalkDecision::IgnoreChildren;
                }
                if parent.is_some_and(|parent| satisfied_by_installed(catalog, parent, feature)) {
                    return WalkDecision::IgnoreChildren;
                }
                if !visited.insert(feature.symbolic_name.clone()) {
                    return WalkDecision::IgnoreChildren;
                }
                if !feature.is_kernel() {
                    found.push(Arc::clone(feature));
                }
                WalkDecision::WalkChildren
            })
            .on_missing_dependency(|owner, dependency| {
                missing.push((owner.symbolic_name.clone(), dependency.symbolic_name.clone()));
            })
            .walk_depth_first(root);

        for feature in found {
            self.resolved
                .entry(feature.symbolic_name.clone())
                .or_insert(feature);
        }
        for (owner, dependency) in missing {
            self.incomplete.insert(owner.clone());
            self.record_not_found(&dependency, Some(owner));
        }
    }

    /// Pull in dependencies of installed and kernel features that are not
    /// satisfied by anything installed
    fn complete_installed_features(&mut self) {
        let catalog = self.catalog;
        let mut roots: IndexMap<String, Arc<FeatureDefinition>> = catalog
            .installed_features()
            .map(|feature| (feature.symbolic_name.clone(), Arc::clone(feature)))
            .collect();
        for kernel in catalog.kernel_features() {
            roots.entry(kernel.symbolic_name.clone()).or_insert(kernel);
        }

        for root in roots.into_values() {
            let mut visited: HashSet<String> = HashSet::new();
            let mut found: Vec<Arc<FeatureDefinition>> = Vec::new();

            FeatureTreeWalker::walk_over(catalog)
                .use_autofeature_provision_as_dependency(false)
                .prefer_versions(&self.preferred)
                .for_each(|parent, feature| {
                    if !visited.insert(feature.symbolic_name.clone()) {
                        return WalkDecision::IgnoreChildren;
                    }
                    if catalog.is_installed(&feature.symbolic_name) || feature.is_kernel() {
                        return WalkDecision::WalkChildren;
                    }
                    if parent.is_some_and(|parent| satisfied_by_installed(catalog, parent, feature)) {
                        return WalkDecision::IgnoreChildren;
                    }
                    found.push(Arc::clone(feature));
                    WalkDecision::WalkChildren
                })
                .on_missing_dependency(|owner, dependency| {
                    warn!(
                        "Installed feature {} is missing dependency {}",
                        owner.symbolic_name, dependency.symbolic_name
                    );
                })
                .walk_depth_first(root);

            for feature in found {
                if !self.resolved.contains_key(&feature.symbolic_name) {
                    debug!("Completing installed dependency {}", feature.symbolic_name);
                    self.resolved.insert(feature.symbolic_name.clone(), feature);
                }
            }
        }
    }

    /// Add satisfied auto-features until a full pass adds nothing
    fn provision_auto_features(&mut self) {
        let mut autos = self.catalog.auto_features();
        autos.sort_by(|a, b| a.symbolic_name.cmp(&b.symbolic_name));

        loop {
            let mut added = false;
            for auto in &autos {
                if self.resolved.contains_key(&auto.symbolic_name)
                    || self.catalog.is_installed(&auto.symbolic_name)
                {
                    continue;
                }
                let satisfied = auto.is_capability_satisfied(|name| self.is_present(name));
                if satisfied {
                    debug!("Auto-feature {} is satisfied", auto.symbolic_name);
                    self.walk_into_resolved(Arc::clone(auto), false);
                    added = true;
                }
            }
            if !added {
                break;
            }
        }
    }

    /// Installed, kernel or already resolved
    fn is_present(&self, name: &str) -> bool {
        self.catalog.is_installed(name)
            || self.resolved.contains_key(name)
            || self
                .catalog
                .feature(name)
                .is_some_and(|feature| feature.is_kernel())
    }

    fn resolve_detecting_conflicts(&mut self) {
        let mut requested = Vec::new();
        for sample in &self.samples {
            for feature in &sample.features {
                requested.push(RequestedFeature {
                    name: feature.symbolic_name.clone(),
                    owner: Some(sample.sample.name.clone()),
                });
            }
        }
        for request in &self.features {
            if let Some(feature) = &request.feature {
                requested.push(RequestedFeature {
                    name: feature.symbolic_name.clone(),
                    owner: None,
                });
            }
        }

        let request = SolverRequest {
            kernel: self
                .catalog
                .kernel_features()
                .iter()
                .map(|feature| feature.symbolic_name.clone())
                .collect(),
            requested,
            installed: self
                .catalog
                .installed_features()
                .map(|feature| feature.symbolic_name.clone())
                .collect(),
            excluded: self.resolver.excluded.clone(),
            preferred: self.preferred.clone(),
            allow_multiple_versions: false,
        };

        let outcome = self.resolver.solver.resolve(self.catalog, &request);

        for feature in outcome.resolved {
            if feature.is_kernel() || self.catalog.is_installed(&feature.symbolic_name) {
                continue;
            }
            self.resolved
                .entry(feature.symbolic_name.clone())
                .or_insert(feature);
        }

        for missing in outcome.missing {
            self.record_not_found(&missing.requirement, missing.owner.clone());

            let sample = self
                .samples
                .iter()
                .find(|sample| missing.owner.as_deref() == Some(sample.sample.name.as_str()))
                .map(|sample| sample.requested.clone());

            match (sample, missing.owner) {
                (Some(requested), _) => self.add_top_level_not_resolved(&requested),
                (None, Some(owner)) => {
                    self.incomplete.insert(owner);
                }
                (None, None) => {
                    let requested = self
                        .features
                        .iter()
                        .find(|request| {
                            request
                                .feature
                                .as_ref()
                                .is_some_and(|f| f.symbolic_name == missing.requirement)
                        })
                        .map(|request| request.requested.clone())
                        .unwrap_or(missing.requirement);
                    self.add_top_level_not_resolved(&requested);
                }
            }
        }

        self.errors.conflicts = outcome.conflicts;
    }

    /// Record a name that did not resolve, preferring wrong-product details
    fn record_not_found(&mut self, name: &str, owner: Option<String>) {
        let wrong_product = self.catalog.non_applicable_resources(name);
        if wrong_product.is_empty() {
            self.errors
                .add_missing_requirement(MissingRequirement::new(name, owner));
            return;
        }

        for resource in wrong_product {
            self.errors.add_missing_requirement(MissingRequirement::new(
                resource.applies_to.clone(),
                Some(resource.name.clone()),
            ));
            for info in &resource.requirements {
                self.errors.add_missing_product(info.clone());
            }
        }
    }

    fn add_top_level_not_resolved(&mut self, requested: &str) {
        if !self
            .errors
            .top_level_not_resolved
            .iter()
            .any(|name| name == requested)
        {
            self.errors.top_level_not_resolved.push(requested.to_string());
        }
    }

    /// Flag requested roots whose closure contains an incomplete feature
    fn mark_incomplete_roots(&mut self) {
        if self.incomplete.is_empty() {
            return;
        }

        let mut flagged = Vec::new();
        for sample in &self.samples {
            if self.closure_is_incomplete(sample.features.iter().cloned()) {
                flagged.push(sample.requested.clone());
            }
        }
        for request in &self.features {
            if let Some(feature) = &request.feature {
                if self.closure_is_incomplete(std::iter::once(Arc::clone(feature))) {
                    flagged.push(request.requested.clone());
                }
            }
        }

        for requested in flagged {
            self.add_top_level_not_resolved(&requested);
        }
    }

    fn closure_is_incomplete<I>(&self, roots: I) -> bool
    where
        I: IntoIterator<Item = Arc<FeatureDefinition>>,
    {
        let mut incomplete = false;
        let mut seen: HashSet<String> = HashSet::new();
        FeatureTreeWalker::walk_over(self.catalog)
            .use_autofeature_provision_as_dependency(false)
            .prefer_versions(&self.preferred)
            .for_each(|_, feature| {
                if !seen.insert(feature.symbolic_name.clone()) {
                    return WalkDecision::IgnoreChildren;
                }
                match self.role_of(feature) {
                    NodeRole::Skip => return WalkDecision::IgnoreChildren,
                    NodeRole::PassThrough => {}
                    NodeRole::Install => {
                        if self.incomplete.contains(&feature.symbolic_name) {
                            incomplete = true;
                        }
                    }
                }
                WalkDecision::WalkChildren
            })
            .walk_breadth_first(roots);
        incomplete
    }

    /// How list and reachability walks treat a feature
    fn role_of(&self, feature: &FeatureDefinition) -> NodeRole {
        if self.resolved.contains_key(&feature.symbolic_name) {
            NodeRole::Install
        } else if feature.is_kernel() && !self.catalog.is_installed(&feature.symbolic_name) {
            NodeRole::PassThrough
        } else {
            NodeRole::Skip
        }
    }

    /// Walk over resolved features only, collecting every name reached
    fn reachable_from<I>(&self, roots: I) -> HashSet<String>
    where
        I: IntoIterator<Item = Arc<FeatureDefinition>>,
    {
        let mut reached: HashSet<String> = HashSet::new();
        FeatureTreeWalker::walk_over(self.catalog)
            .use_autofeature_provision_as_dependency(false)
            .prefer_versions(&self.preferred)
            .for_each(|_, feature| {
                if self.role_of(feature) == NodeRole::Skip
                    || !reached.insert(feature.symbolic_name.clone())
                {
                    return WalkDecision::IgnoreChildren;
                }
                WalkDecision::WalkChildren
            })
            .walk_breadth_first(roots);
        reached.retain(|name| self.resolved.contains_key(name));
        reached
    }

    /// Resolved auto-features sorted by name
    fn resolved_auto_features(&self) -> Vec<Arc<FeatureDefinition>> {
        let mut autos: Vec<Arc<FeatureDefinition>> = self
            .resolved
            .values()
            .filter(|feature| feature.is_auto_feature())
            .cloned()
            .collect();
        autos.sort_by(|a, b| a.symbolic_name.cmp(&b.symbolic_name));
        autos
    }

    /// Resolved features no request or auto-feature accounts for.
    ///
    /// A candidate reached from another candidate is dropped, unless the two
    /// reach each other. Of mutually dependent candidates only the first in
    /// name order stays a root.
    fn additional_roots(&self) -> Vec<Arc<FeatureDefinition>> {
        let accounted = self.reachable_from(
            self.root_features()
                .into_iter()
                .chain(self.resolved_auto_features()),
        );

        let candidates: BTreeSet<&String> = self
            .resolved
            .keys()
            .filter(|name| !accounted.contains(*name))
            .collect();

        let reach: Vec<(&String, HashSet<String>)> = candidates
            .iter()
            .filter_map(|name| {
                let candidate = self.resolved.get(*name)?;
                Some((*name, self.reachable_from(std::iter::once(Arc::clone(candidate)))))
            })
            .collect();

        let mut kept = Vec::new();
        for (name, reached) in &reach {
            let dominated = reach.iter().any(|(other, other_reached)| {
                other != name
                    && other_reached.contains(*name)
                    && (!reached.contains(*other) || other < name)
            });
            if dominated {
                continue;
            }
            if let Some(candidate) = self.resolved.get(*name) {
                trace!("{} needs its own install list", name);
                kept.push(Arc::clone(candidate));
            }
        }

        kept
    }

    /// Order features for installation, dependencies first.
    ///
    /// Walks breadth-first over resolved features, moving a feature to the
    /// end each time it is reached again, then reverses the result.
    fn ordered_features<I>(&self, roots: I) -> Vec<InstallResource>
    where
        I: IntoIterator<Item = Arc<FeatureDefinition>>,
    {
        let mut order: IndexSet<String> = IndexSet::new();
        FeatureTreeWalker::walk_over(self.catalog)
            .use_autofeature_provision_as_dependency(false)
            .prefer_versions(&self.preferred)
            .for_each(|_, feature| match self.role_of(feature) {
                NodeRole::Skip => WalkDecision::IgnoreChildren,
                NodeRole::PassThrough => WalkDecision::WalkChildren,
                NodeRole::Install => {
                    order.shift_remove(&feature.symbolic_name);
                    order.insert(feature.symbolic_name.clone());
                    WalkDecision::WalkChildren
                }
            })
            .walk_breadth_first(roots);

        order
            .into_iter()
            .rev()
            .filter_map(|name| self.resolved.get(&name).cloned())
            .map(InstallResource::Feature)
            .collect()
    }

    fn build_install_lists(&self) -> Vec<InstallList> {
        let mut lists = Vec::new();
        let mut covered: HashSet<String> = HashSet::new();

        for sample in &self.samples {
            let mut resources = self.ordered_features(sample.features.iter().cloned());
            resources.push(InstallResource::Sample(Arc::clone(&sample.sample)));
            lists.push(InstallList::new(sample.requested.clone(), resources));
        }

        for request in &self.features {
            let Some(feature) = &request.feature else {
                continue;
            };
            let resources = self.ordered_features(std::iter::once(Arc::clone(feature)));
            if resources.is_empty() {
                trace!("'{}' is already satisfied", request.requested);
                continue;
            }
            lists.push(InstallList::new(request.requested.clone(), resources));
        }

        for list in &lists {
            covered.extend(list.names().into_iter().map(str::to_string));
        }

        for auto in self.resolved_auto_features() {
            if covered.contains(&auto.symbolic_name) {
                continue;
            }
            let resources: Vec<InstallResource> = self
                .ordered_features(std::iter::once(Arc::clone(&auto)))
                .into_iter()
                .filter(|resource| {
                    resource.name() == auto.symbolic_name || !covered.contains(resource.name())
                })
                .collect();
            covered.extend(resources.iter().map(|r| r.name().to_string()));
            lists.push(InstallList::new(auto.symbolic_name.clone(), resources));
        }

        for root in self.additional_roots() {
            let resources = self.ordered_features(std::iter::once(Arc::clone(&root)));
            lists.push(InstallList::new(root.symbolic_name.clone(), resources));
        }

        lists
    }

    /// Log circular relationships among the resolved features
    fn log_cycles(&self) {
        let graph = FeatureGraph::from_features(self.catalog, self.resolved.values());
        for cycle in graph.cycles() {
            debug!(
                "Circular feature relationship: {}",
                FeatureGraph::format_cycle(&cycle)
            );
        }
    }
}

/// Split `name/version` into its parts
fn split_version(requested: &str) -> ProvisionResult<(String, Option<Version>)> {
    let mut parts = requested.split(VERSION_REQUEST_SEPARATOR);
    let name = parts.next().unwrap_or_default();
    let version = parts.next();

    if parts.next().is_some() {
        return Err(ProvisionError::malformed_name(
            requested,
            format!("more than one '{VERSION_REQUEST_SEPARATOR}'"),
        ));
    }
    if name.is_empty() {
        return Err(ProvisionError::malformed_name(requested, "empty name"));
    }

    match version {
        Some(version) => {
            let parsed = version
                .parse()
                .map_err(|source| ProvisionError::InvalidVersion {
                    input: requested.to_string(),
                    source,
                })?;
            Ok((name.to_string(), Some(parsed)))
        }
        None => Ok((name.to_string(), None)),
    }
}

/// Whether the dependency through which `parent` reaches `feature` already
/// has an installed candidate
fn satisfied_by_installed(
    catalog: &Catalog,
    parent: &FeatureDefinition,
    feature: &FeatureDefinition,
) -> bool {
    parent
        .dependencies()
        .iter()
        .filter(|dependency| declares(catalog, dependency, &feature.symbolic_name))
        .any(|dependency| {
            dependency_candidates(catalog, None, dependency)
                .iter()
                .any(|candidate| catalog.is_installed(&candidate.symbolic_name))
        })
}

fn declares(catalog: &Catalog, dependency: &FeatureDependency, symbolic_name: &str) -> bool {
    dependency_candidates(catalog, None, dependency)
        .iter()
        .any(|candidate| candidate.symbolic_name == symbolic_name)
}

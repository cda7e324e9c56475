//! Strict resolution with singleton version conflict detection
//!
//! Used when a pass must fail on incompatible versions instead of installing
//! every version that was asked for. Several versions of a singleton feature
//! may never be active together, so every path that reaches a singleton
//! records which of its versions it accepts. A version acceptable to every
//! path is selected; when none exists the paths are reported as conflicting.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;
use tracing::{debug, trace};

use provision_core::error::{ConflictChain, MissingRequirement};
use provision_core::types::{base_name, FeatureDefinition, Version};

use crate::source::FeatureSource;
use crate::tree::dependency_candidates;

/// Root handed to the solver
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestedFeature {
    /// Symbolic name of the feature
    pub name: String,
    /// Sample that required the feature, none for direct requests
    pub owner: Option<String>,
}

/// Input of a strict resolution
#[derive(Debug, Clone, Default)]
pub struct SolverRequest {
    pub kernel: Vec<String>,
    pub requested: Vec<RequestedFeature>,
    /// Features already on the target, counted toward auto-feature capabilities
    pub installed: HashSet<String>,
    /// Features that must not be selected
    pub excluded: HashSet<String>,
    /// Versions to pick for exact-name lookups
    pub preferred: HashMap<String, Version>,
    /// Disable singleton checks
    pub allow_multiple_versions: bool,
}

/// Result of a strict resolution
#[derive(Debug, Clone, Default)]
pub struct SolverOutcome {
    /// Selected features in discovery order
    pub resolved: Vec<Arc<FeatureDefinition>>,
    pub missing: Vec<MissingRequirement>,
    /// Conflicting chains keyed by base name
    pub conflicts: BTreeMap<String, Vec<ConflictChain>>,
}

/// Selects one consistent set of features for a request
pub trait ConstraintSolver: fmt::Debug + Send + Sync {
    fn resolve(&self, source: &dyn FeatureSource, request: &SolverRequest) -> SolverOutcome;
}

/// Default solver enforcing one version per singleton feature
#[derive(Debug, Clone, Copy, Default)]
pub struct SingletonSolver;

impl SingletonSolver {
    pub fn new() -> Self {
        Self
    }
}

impl ConstraintSolver for SingletonSolver {
    fn resolve(&self, source: &dyn FeatureSource, request: &SolverRequest) -> SolverOutcome {
        let max_rounds = source.features().len() + 1;
        let mut selection: HashMap<String, String> = HashMap::new();
        let mut outcome = SolverOutcome::default();

        for round in 0..max_rounds {
            let mut pass = SolverPass {
                source,
                request,
                selection: &selection,
                resolved: IndexMap::new(),
                missing: Vec::new(),
                chains: BTreeMap::new(),
            };
            pass.run();

            let (next, conflicts) = select_versions(&pass.chains);
            let stable = next == selection;

            outcome = SolverOutcome {
                resolved: pass.resolved.into_values().collect(),
                missing: pass.missing,
                conflicts,
            };

            if stable {
                debug!(
                    "Solver settled after {} round(s) with {} features",
                    round + 1,
                    outcome.resolved.len()
                );
                return outcome;
            }
            trace!("Solver round {} changed singleton selection", round + 1);
            selection = next;
        }

        debug!("Solver stopped after {} rounds without settling", max_rounds);
        outcome
    }
}

/// Pick a version per singleton base name from the recorded chains.
///
/// The selection is the first candidate of the first chain that every other
/// chain also accepts.
fn select_versions(
    chains: &BTreeMap<String, Vec<ConflictChain>>,
) -> (HashMap<String, String>, BTreeMap<String, Vec<ConflictChain>>) {
    let mut selection = HashMap::new();
    let mut conflicts = BTreeMap::new();

    for (base, paths) in chains {
        let Some(first) = paths.first() else {
            continue;
        };

        let agreed = first.candidates.iter().find(|candidate| {
            paths
                .iter()
                .all(|path| path.candidates.contains(candidate))
        });

        match agreed {
            Some(candidate) => {
                selection.insert(base.clone(), candidate.clone());
            }
            None => {
                conflicts.insert(base.clone(), paths.clone());
            }
        }
    }

    (selection, conflicts)
}

struct SolverPass<'s> {
    source: &'s dyn FeatureSource,
    request: &'s SolverRequest,
    selection: &'s HashMap<String, String>,
    resolved: IndexMap<String, Arc<FeatureDefinition>>,
    missing: Vec<MissingRequirement>,
    chains: BTreeMap<String, Vec<ConflictChain>>,
}

impl SolverPass<'_> {
    fn run(&mut self) {
        let roots = self
            .request
            .kernel
            .iter()
            .map(|name| (name.clone(), None))
            .chain(
                self.request
                    .requested
                    .iter()
                    .map(|root| (root.name.clone(), root.owner.clone())),
            )
            .collect::<Vec<_>>();

        for (name, owner) in roots {
            match self.lookup_root(&name) {
                Some(feature) => {
                    if self.checks_singletons() && feature.singleton {
                        let chain = owner.into_iter().collect();
                        self.record_chain(feature.base_name(), chain, vec![feature.symbolic_name.clone()]);
                    }
                    self.visit(feature, &[]);
                }
                None => self.add_missing(MissingRequirement::new(name, owner)),
            }
        }

        self.provision_auto_features();
    }

    fn checks_singletons(&self) -> bool {
        !self.request.allow_multiple_versions
    }

    fn lookup_root(&self, name: &str) -> Option<Arc<FeatureDefinition>> {
        if self.request.excluded.contains(name) {
            return None;
        }
        match self.request.preferred.get(name) {
            Some(version) => self.source.feature_version(name, version),
            None => self.source.feature(name),
        }
    }

    /// Add satisfied auto-features until nothing changes
    fn provision_auto_features(&mut self) {
        let mut autos = self.source.auto_features();
        autos.sort_by(|a, b| a.symbolic_name.cmp(&b.symbolic_name));

        loop {
            let mut added = false;
            for auto in &autos {
                if self.resolved.contains_key(&auto.symbolic_name)
                    || self.request.excluded.contains(&auto.symbolic_name)
                {
                    continue;
                }
                let satisfied = auto.is_capability_satisfied(|name| {
                    self.resolved.contains_key(name) || self.request.installed.contains(name)
                });
                if satisfied {
                    trace!("Auto-feature {} is satisfied", auto.symbolic_name);
                    self.visit(Arc::clone(auto), &[]);
                    added = true;
                }
            }
            if !added {
                break;
            }
        }
    }

    fn visit(&mut self, feature: Arc<FeatureDefinition>, path: &[String]) {
        if self.resolved.contains_key(&feature.symbolic_name) {
            return;
        }
        self.resolved
            .insert(feature.symbolic_name.clone(), Arc::clone(&feature));

        let mut chain = path.to_vec();
        chain.push(feature.symbolic_name.clone());

        for dependency in feature.dependencies() {
            let candidates: Vec<Arc<FeatureDefinition>> =
                dependency_candidates(self.source, Some(&self.request.preferred), dependency)
                    .into_iter()
                    .filter(|candidate| !self.request.excluded.contains(&candidate.symbolic_name))
                    .collect();

            if candidates.is_empty() {
                self.add_missing(MissingRequirement::new(
                    dependency.symbolic_name(),
                    Some(feature.symbolic_name.clone()),
                ));
                continue;
            }

            let singleton = candidates.iter().any(|candidate| candidate.singleton);
            if singleton && self.checks_singletons() {
                let base = base_name(dependency.symbolic_name()).to_string();
                let names: Vec<String> = candidates
                    .iter()
                    .map(|candidate| candidate.symbolic_name.clone())
                    .collect();
                let chosen = self.record_chain(&base, chain.clone(), names);
                if let Some(selected) = candidates
                    .into_iter()
                    .find(|candidate| candidate.symbolic_name == chosen)
                {
                    self.visit(selected, &chain);
                }
            } else {
                for candidate in candidates {
                    self.visit(candidate, &chain);
                }
            }
        }
    }

    /// Record a path to a singleton and return the candidate it walks
    fn record_chain(&mut self, base: &str, chain: Vec<String>, candidates: Vec<String>) -> String {
        let chosen = self
            .selection
            .get(base)
            .filter(|selected| candidates.contains(selected))
            .or_else(|| candidates.first())
            .cloned()
            .unwrap_or_default();

        self.chains
            .entry(base.to_string())
            .or_default()
            .push(ConflictChain {
                chain,
                candidates,
                preferred: Some(chosen.clone()),
            });
        chosen
    }

    fn add_missing(&mut self, missing: MissingRequirement) {
        if !self.missing.contains(&missing) {
            self.missing.push(missing);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use provision_catalog::Catalog;
    use provision_core::types::FeatureDependency;

    fn request(names: &[&str]) -> SolverRequest {
        SolverRequest {
            requested: names
                .iter()
                .map(|name| RequestedFeature {
                    name: name.to_string(),
                    owner: None,
                })
                .collect(),
            ..SolverRequest::default()
        }
    }

    fn names(outcome: &SolverOutcome) -> Vec<&str> {
        outcome
            .resolved
            .iter()
            .map(|f| f.symbolic_name.as_str())
            .collect()
    }

    #[test]
    fn test_singleton_conflict_detected() {
        let catalog = Catalog::builder()
            .feature(FeatureDefinition::new("F1").depends_on("S-1.0"))
            .feature(FeatureDefinition::new("F2").depends_on("S-2.0"))
            .feature(FeatureDefinition::new("S-1.0").singleton())
            .feature(FeatureDefinition::new("S-2.0").singleton())
            .build()
            .unwrap();

        let outcome = SingletonSolver.resolve(&catalog, &request(&["F1", "F2"]));
        let chains = outcome.conflicts.get("S").unwrap();
        assert_eq!(chains.len(), 2);
        assert_eq!(chains[0].chain, vec!["F1"]);
        assert_eq!(chains[0].candidates, vec!["S-1.0"]);
        assert_eq!(chains[1].chain, vec!["F2"]);
        assert_eq!(chains[1].candidates, vec!["S-2.0"]);
    }

    #[test]
    fn test_tolerated_singleton_agrees() {
        let catalog = Catalog::builder()
            .feature(
                FeatureDefinition::new("F1")
                    .with_dependency(FeatureDependency::new("S-1.0").tolerating("2.0")),
            )
            .feature(FeatureDefinition::new("F2").depends_on("S-2.0"))
            .feature(FeatureDefinition::new("S-1.0").singleton())
            .feature(FeatureDefinition::new("S-2.0").singleton())
            .build()
            .unwrap();

        let outcome = SingletonSolver.resolve(&catalog, &request(&["F1", "F2"]));
        assert!(outcome.conflicts.is_empty());
        assert_eq!(names(&outcome), vec!["F1", "S-2.0", "F2"]);
    }

    #[test]
    fn test_multiple_versions_allowed() {
        let catalog = Catalog::builder()
            .feature(FeatureDefinition::new("F1").depends_on("S-1.0"))
            .feature(FeatureDefinition::new("F2").depends_on("S-2.0"))
            .feature(FeatureDefinition::new("S-1.0").singleton())
            .feature(FeatureDefinition::new("S-2.0").singleton())
            .build()
            .unwrap();

        let mut req = request(&["F1", "F2"]);
        req.allow_multiple_versions = true;
        let outcome = SingletonSolver.resolve(&catalog, &req);
        assert!(outcome.conflicts.is_empty());
        assert_eq!(outcome.resolved.len(), 4);
    }

    #[test]
    fn test_missing_dependency_and_root() {
        let catalog = Catalog::builder()
            .feature(FeatureDefinition::new("A").depends_on("G"))
            .build()
            .unwrap();

        let outcome = SingletonSolver.resolve(&catalog, &request(&["A", "nope"]));
        assert_eq!(
            outcome.missing,
            vec![
                MissingRequirement::new("G", Some("A".to_string())),
                MissingRequirement::new("nope", None),
            ]
        );
    }

    #[test]
    fn test_excluded_feature_is_missing() {
        let catalog = Catalog::builder()
            .feature(FeatureDefinition::new("A").depends_on("B"))
            .feature(FeatureDefinition::new("B"))
            .build()
            .unwrap();

        let mut req = request(&["A"]);
        req.excluded.insert("B".to_string());
        let outcome = SingletonSolver.resolve(&catalog, &req);
        assert_eq!(names(&outcome), vec!["A"]);
        assert_eq!(outcome.missing.len(), 1);
    }

    #[test]
    fn test_auto_features_added() {
        let catalog = Catalog::builder()
            .feature(FeatureDefinition::new("P"))
            .feature(FeatureDefinition::new("Q"))
            .feature(FeatureDefinition::new("X").provisioned_by(["P", "Q"]))
            .build()
            .unwrap();

        let outcome = SingletonSolver.resolve(&catalog, &request(&["P", "Q"]));
        assert_eq!(names(&outcome), vec!["P", "Q", "X"]);
    }

    #[test]
    fn test_installed_features_satisfy_auto_features() {
        let catalog = Catalog::builder()
            .installed(FeatureDefinition::new("P"))
            .feature(FeatureDefinition::new("Q"))
            .feature(FeatureDefinition::new("X").provisioned_by(["P", "Q"]))
            .build()
            .unwrap();

        let outcome = SingletonSolver.resolve(&catalog, &request(&["Q"]));
        assert_eq!(names(&outcome), vec!["Q"]);

        let mut req = request(&["Q"]);
        req.installed.insert("P".to_string());
        let outcome = SingletonSolver.resolve(&catalog, &req);
        assert_eq!(names(&outcome), vec!["Q", "X"]);
    }

    #[test]
    fn test_singleton_root_pins_selection() {
        let catalog = Catalog::builder()
            .feature(
                FeatureDefinition::new("F1")
                    .with_dependency(FeatureDependency::new("S-1.0").tolerating("2.0")),
            )
            .feature(FeatureDefinition::new("S-1.0").singleton())
            .feature(FeatureDefinition::new("S-2.0").singleton())
            .build()
            .unwrap();

        let outcome = SingletonSolver.resolve(&catalog, &request(&["F1", "S-2.0"]));
        assert!(outcome.conflicts.is_empty());
        assert_eq!(names(&outcome), vec!["F1", "S-2.0"]);
    }
}

//! Feature dependency tree traversal
//!
//! Adapts the generic walks to features. The children of a feature are every
//! resolvable candidate of each dependency (the exact name first, then the
//! tolerated alternates in declaration order). Optionally, auto-features that
//! a feature provisions on its own are treated as children too, so a single
//! walk also discovers them.

use std::collections::HashMap;
use std::sync::Arc;

use provision_core::types::{FeatureDefinition, FeatureDependency, Version};

use crate::source::FeatureSource;
use crate::walker::{self, WalkDecision};

type Node = Arc<FeatureDefinition>;
type VisitFn<'a> = Box<dyn FnMut(Option<&Node>, &Node) -> WalkDecision + 'a>;
type MissingFn<'a> = Box<dyn FnMut(&FeatureDefinition, &FeatureDependency) + 'a>;

/// One-shot walk configuration, consumed by the walk call
pub struct FeatureTreeWalker<'a> {
    source: &'a dyn FeatureSource,
    visit: Option<VisitFn<'a>>,
    on_missing: Option<MissingFn<'a>>,
    autofeature_edges: bool,
    preferred: Option<&'a HashMap<String, Version>>,
}

impl<'a> FeatureTreeWalker<'a> {
    /// Start configuring a walk over a feature universe
    pub fn walk_over(source: &'a dyn FeatureSource) -> Self {
        Self {
            source,
            visit: None,
            on_missing: None,
            autofeature_edges: true,
            preferred: None,
        }
    }

    /// Callback for every visited feature and the parent it was reached from
    pub fn for_each<F>(mut self, visit: F) -> Self
    where
        F: FnMut(Option<&Node>, &Node) -> WalkDecision + 'a,
    {
        self.visit = Some(Box::new(visit));
        self
    }

    /// Callback for a dependency with no resolvable candidate
    pub fn on_missing_dependency<F>(mut self, on_missing: F) -> Self
    where
        F: FnMut(&FeatureDefinition, &FeatureDependency) + 'a,
    {
        self.on_missing = Some(Box::new(on_missing));
        self
    }

    /// Treat auto-features provisioned by a feature as its children
    pub fn use_autofeature_provision_as_dependency(mut self, enabled: bool) -> Self {
        self.autofeature_edges = enabled;
        self
    }

    /// Versions to pick for exact-name lookups
    pub fn prefer_versions(mut self, preferred: &'a HashMap<String, Version>) -> Self {
        self.preferred = Some(preferred);
        self
    }

    /// Walk breadth-first from several roots
    pub fn walk_breadth_first<I>(self, roots: I)
    where
        I: IntoIterator<Item = Node>,
    {
        let (expansion, mut visit, mut on_missing) = self.into_parts();
        walker::walk_breadth_first(
            roots,
            |feature: &Node| feature.symbolic_name.clone(),
            |parent, node| visit(parent, node),
            |node| expansion.children(node, &mut *on_missing),
        );
    }

    /// Walk depth-first from one root
    pub fn walk_depth_first(self, root: Node) {
        let (expansion, mut visit, mut on_missing) = self.into_parts();
        walker::walk_depth_first(
            root,
            |feature: &Node| feature.symbolic_name.clone(),
            |parent, node| visit(parent, node),
            |node| expansion.children(node, &mut *on_missing),
        );
    }

    fn into_parts(self) -> (Expansion<'a>, VisitFn<'a>, MissingFn<'a>) {
        let visit: VisitFn<'a> = match self.visit {
            Some(visit) => visit,
            None => Box::new(|_, _| WalkDecision::WalkChildren),
        };
        let on_missing: MissingFn<'a> = match self.on_missing {
            Some(on_missing) => on_missing,
            None => Box::new(|_, _| {}),
        };
        let autos = if self.autofeature_edges {
            self.source.auto_features()
        } else {
            Vec::new()
        };

        let expansion = Expansion {
            source: self.source,
            preferred: self.preferred,
            autos,
        };
        (expansion, visit, on_missing)
    }
}

struct Expansion<'a> {
    source: &'a dyn FeatureSource,
    preferred: Option<&'a HashMap<String, Version>>,
    autos: Vec<Node>,
}

impl Expansion<'_> {
    fn children(
        &self,
        feature: &Node,
        on_missing: &mut dyn FnMut(&FeatureDefinition, &FeatureDependency),
    ) -> Vec<Node> {
        let mut children: Vec<Node> = Vec::new();

        for dependency in feature.dependencies() {
            let candidates = dependency_candidates(self.source, self.preferred, dependency);
            if candidates.is_empty() {
                on_missing(feature, dependency);
            }
            push_unique(&mut children, candidates);
        }

        let provisioned = self.autos.iter().filter(|auto| {
            auto.symbolic_name != feature.symbolic_name
                && auto.is_capability_satisfied(|name| name == feature.symbolic_name)
        });
        push_unique(&mut children, provisioned.cloned());

        children
    }
}

/// Every resolvable candidate for a dependency, exact name first.
///
/// A preferred version applies to the exact name only; tolerated alternates
/// always resolve to their highest version.
pub fn dependency_candidates(
    source: &dyn FeatureSource,
    preferred: Option<&HashMap<String, Version>>,
    dependency: &FeatureDependency,
) -> Vec<Node> {
    let name = dependency.symbolic_name();
    let exact = match preferred.and_then(|preferred| preferred.get(name)) {
        Some(version) => source
            .feature_version(name, version)
            .or_else(|| source.feature(name)),
        None => source.feature(name),
    };

    let tolerated = dependency
        .tolerated_names()
        .filter_map(|alternate| source.feature(&alternate));

    let mut candidates = Vec::new();
    push_unique(&mut candidates, exact.into_iter().chain(tolerated));
    candidates
}

fn push_unique(target: &mut Vec<Node>, features: impl IntoIterator<Item = Node>) {
    for feature in features {
        if !target
            .iter()
            .any(|existing| existing.symbolic_name == feature.symbolic_name)
        {
            target.push(feature);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use provision_catalog::Catalog;
    use std::cell::RefCell;

    fn names_depth_first(catalog: &Catalog, root: &str, autos: bool) -> Vec<String> {
        let visited = RefCell::new(Vec::new());
        FeatureTreeWalker::walk_over(catalog)
            .use_autofeature_provision_as_dependency(autos)
            .for_each(|_, feature| {
                visited.borrow_mut().push(feature.symbolic_name.clone());
                WalkDecision::WalkChildren
            })
            .walk_depth_first(catalog.feature(root).unwrap());
        visited.into_inner()
    }

    #[test]
    fn test_exact_and_tolerated_children() {
        let catalog = Catalog::builder()
            .feature(
                FeatureDefinition::new("A")
                    .with_dependency(FeatureDependency::new("B-1.0").tolerating("2.0")),
            )
            .feature(FeatureDefinition::new("B-1.0"))
            .feature(FeatureDefinition::new("B-2.0"))
            .build()
            .unwrap();

        assert_eq!(names_depth_first(&catalog, "A", true), vec!["A", "B-1.0", "B-2.0"]);
    }

    #[test]
    fn test_tolerated_alternate_stands_in() {
        let catalog = Catalog::builder()
            .feature(
                FeatureDefinition::new("A")
                    .with_dependency(FeatureDependency::new("B-1.0").tolerating("2.0")),
            )
            .feature(FeatureDefinition::new("B-2.0"))
            .build()
            .unwrap();

        let missing = RefCell::new(Vec::new());
        FeatureTreeWalker::walk_over(&catalog)
            .on_missing_dependency(|owner, dep| {
                missing
                    .borrow_mut()
                    .push((owner.symbolic_name.clone(), dep.symbolic_name.clone()))
            })
            .walk_depth_first(catalog.feature("A").unwrap());

        assert!(missing.into_inner().is_empty());
        assert_eq!(names_depth_first(&catalog, "A", true), vec!["A", "B-2.0"]);
    }

    #[test]
    fn test_missing_dependency_reported() {
        let catalog = Catalog::builder()
            .feature(FeatureDefinition::new("A").depends_on("G"))
            .build()
            .unwrap();

        let missing = RefCell::new(Vec::new());
        FeatureTreeWalker::walk_over(&catalog)
            .on_missing_dependency(|owner, dep| {
                missing
                    .borrow_mut()
                    .push((owner.symbolic_name.clone(), dep.symbolic_name.clone()))
            })
            .walk_breadth_first(catalog.feature("A"));

        assert_eq!(
            missing.into_inner(),
            vec![("A".to_string(), "G".to_string())]
        );
    }

    #[test]
    fn test_autofeature_edges() {
        let catalog = Catalog::builder()
            .feature(FeatureDefinition::new("P"))
            .feature(FeatureDefinition::new("X").provisioned_by(["P"]))
            .feature(FeatureDefinition::new("Y").provisioned_by(["P", "Q"]))
            .build()
            .unwrap();

        assert_eq!(names_depth_first(&catalog, "P", true), vec!["P", "X"]);
        assert_eq!(names_depth_first(&catalog, "P", false), vec!["P"]);
    }

    #[test]
    fn test_preferred_version_for_exact_lookup() {
        let catalog = Catalog::builder()
            .feature(FeatureDefinition::new("A").depends_on("B"))
            .feature(FeatureDefinition::new("B").with_version("1.0".parse().unwrap()))
            .feature(FeatureDefinition::new("B").with_version("2.0".parse().unwrap()))
            .build()
            .unwrap();

        let mut preferred = HashMap::new();
        preferred.insert("B".to_string(), "1.0".parse().unwrap());

        let versions = RefCell::new(Vec::new());
        FeatureTreeWalker::walk_over(&catalog)
            .prefer_versions(&preferred)
            .for_each(|_, feature| {
                versions.borrow_mut().push(feature.version.to_string());
                WalkDecision::WalkChildren
            })
            .walk_depth_first(catalog.feature("A").unwrap());

        assert_eq!(versions.into_inner(), vec!["1.0.0.0", "1.0.0.0"]);
    }

    #[test]
    fn test_breadth_first_parents() {
        let catalog = Catalog::builder()
            .feature(FeatureDefinition::new("A").depends_on("B"))
            .feature(FeatureDefinition::new("B"))
            .build()
            .unwrap();

        let edges = RefCell::new(Vec::new());
        FeatureTreeWalker::walk_over(&catalog)
            .for_each(|parent, feature| {
                edges.borrow_mut().push((
                    parent.map(|p| p.symbolic_name.clone()),
                    feature.symbolic_name.clone(),
                ));
                WalkDecision::WalkChildren
            })
            .walk_breadth_first(catalog.feature("A"));

        assert_eq!(
            edges.into_inner(),
            vec![(None, "A".to_string()), (Some("A".to_string()), "B".to_string())]
        );
    }
}

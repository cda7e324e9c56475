//! Feature definitions and their dependency declarations.
//!
//! A feature is an installable unit identified by a unique symbolic name. It
//! never changes once loaded; resolution only reads it.

use serde::{Deserialize, Serialize};

use super::Version;

/// Separator between a feature's base name and its version suffix
pub const VERSION_SEPARATOR: char = '-';

/// Kind of feature
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FeatureKind {
    /// Installed on request or as a dependency
    #[default]
    Standard,
    /// Activated once its provision capability is satisfied
    Auto,
    /// Always present in the runtime, never installed
    Kernel,
}

/// Declared dependency on another feature
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct FeatureDependency {
    /// Preferred target symbolic name
    pub symbolic_name: String,
    /// Version suffixes that may stand in for the preferred target
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tolerates: Vec<String>,
}

/// Installable feature
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct FeatureDefinition {
    pub symbolic_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub short_name: Option<String>,
    #[serde(default)]
    pub version: Version,
    #[serde(default)]
    pub kind: FeatureKind,
    #[serde(default)]
    pub singleton: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub dependencies: Vec<FeatureDependency>,
    /// Features that must all be present for an auto-feature to activate
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub provision_capability: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub applies_to: Option<String>,
}

impl FeatureDependency {
    /// Create a dependency with no tolerated alternates
    pub fn new(symbolic_name: impl Into<String>) -> Self {
        Self {
            symbolic_name: symbolic_name.into(),
            tolerates: Vec::new(),
        }
    }

    /// Tolerate an additional version suffix
    pub fn tolerating(mut self, version: impl Into<String>) -> Self {
        self.tolerates.push(version.into());
        self
    }

    pub fn symbolic_name(&self) -> &str {
        &self.symbolic_name
    }

    pub fn tolerated_versions(&self) -> &[String] {
        &self.tolerates
    }

    /// Symbolic names of the tolerated alternates, in declaration order
    pub fn tolerated_names(&self) -> impl Iterator<Item = String> + '_ {
        let base = base_name(&self.symbolic_name);
        self.tolerates
            .iter()
            .map(move |version| format!("{base}{VERSION_SEPARATOR}{version}"))
    }
}

impl FeatureDefinition {
    /// Create a standard feature at version 1.0
    pub fn new(symbolic_name: impl Into<String>) -> Self {
        Self {
            symbolic_name: symbolic_name.into(),
            short_name: None,
            version: Version::new(1, 0, 0, 0),
            kind: FeatureKind::Standard,
            singleton: false,
            dependencies: Vec::new(),
            provision_capability: Vec::new(),
            applies_to: None,
        }
    }

    pub fn with_short_name(mut self, short_name: impl Into<String>) -> Self {
        self.short_name = Some(short_name.into());
        self
    }

    pub fn with_version(mut self, version: Version) -> Self {
        self.version = version;
        self
    }

    pub fn with_kind(mut self, kind: FeatureKind) -> Self {
        self.kind = kind;
        self
    }

    pub fn singleton(mut self) -> Self {
        self.singleton = true;
        self
    }

    pub fn with_dependency(mut self, dependency: FeatureDependency) -> Self {
        self.dependencies.push(dependency);
        self
    }

    /// Add a plain dependency on another feature
    pub fn depends_on(self, symbolic_name: impl Into<String>) -> Self {
        self.with_dependency(FeatureDependency::new(symbolic_name))
    }

    /// Turn this feature into an auto-feature provisioned by the given features
    pub fn provisioned_by<I, S>(mut self, capability: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.kind = FeatureKind::Auto;
        self.provision_capability = capability.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_applies_to(mut self, applies_to: impl Into<String>) -> Self {
        self.applies_to = Some(applies_to.into());
        self
    }

    pub fn symbolic_name(&self) -> &str {
        &self.symbolic_name
    }

    pub fn dependencies(&self) -> &[FeatureDependency] {
        &self.dependencies
    }

    pub fn is_kernel(&self) -> bool {
        self.kind == FeatureKind::Kernel
    }

    pub fn is_auto_feature(&self) -> bool {
        self.kind == FeatureKind::Auto
    }

    /// Check whether every feature in the provision capability is present.
    ///
    /// `contains` answers membership by symbolic name. A feature without a
    /// capability is never satisfied.
    pub fn is_capability_satisfied<F>(&self, contains: F) -> bool
    where
        F: Fn(&str) -> bool,
    {
        !self.provision_capability.is_empty()
            && self
                .provision_capability
                .iter()
                .all(|name| contains(name.as_str()))
    }

    /// Symbolic name without its version suffix
    pub fn base_name(&self) -> &str {
        base_name(&self.symbolic_name)
    }
}

/// Strip everything from the last version separator onward.
///
/// `com.example.servlet-3.1` becomes `com.example.servlet`. Names without a
/// separator are returned unchanged.
pub fn base_name(symbolic_name: &str) -> &str {
    match symbolic_name.rfind(VERSION_SEPARATOR) {
        Some(index) => &symbolic_name[..index],
        None => symbolic_name,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_name() {
        assert_eq!(base_name("servlet-3.1"), "servlet");
        assert_eq!(base_name("com.example.jax-rs-2.0"), "com.example.jax-rs");
        assert_eq!(base_name("plain"), "plain");
    }

    #[test]
    fn test_tolerated_names() {
        let dep = FeatureDependency::new("B-1.0").tolerating("2.0").tolerating("3.0");
        let names: Vec<String> = dep.tolerated_names().collect();
        assert_eq!(names, vec!["B-2.0", "B-3.0"]);
    }

    #[test]
    fn test_capability_requires_all_names() {
        let auto = FeatureDefinition::new("X").provisioned_by(["P", "Q"]);
        assert!(auto.is_auto_feature());
        assert!(auto.is_capability_satisfied(|n| n == "P" || n == "Q"));
        assert!(!auto.is_capability_satisfied(|n| n == "P"));
    }

    #[test]
    fn test_empty_capability_never_satisfied() {
        let plain = FeatureDefinition::new("A");
        assert!(!plain.is_capability_satisfied(|_| true));
    }

    #[test]
    fn test_kind_predicates() {
        let kernel = FeatureDefinition::new("kernel").with_kind(FeatureKind::Kernel);
        assert!(kernel.is_kernel());
        assert!(!kernel.is_auto_feature());
    }
}

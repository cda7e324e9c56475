//! Catalog manifest parsing, validation and serialization
//!
//! A manifest lists installed products, installed features, repository
//! features and samples:
//!
//! ```toml
//! [[product]]
//! id = "com.example.server"
//! version = "8.5.5.2"
//! edition = "BASE"
//!
//! [[feature]]
//! symbolic-name = "com.example.servlet-3.1"
//! short-name = "servlet-3.1"
//! dependencies = ["com.example.http-1.0", { name = "com.example.json-1.0", tolerates = ["1.1"] }]
//! ```

use std::collections::HashSet;
use std::ops::Range;

use camino::{Utf8Path, Utf8PathBuf};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::debug;

use provision_catalog::Catalog;
use provision_core::error::ProvisionError;
use provision_core::types::{
    FeatureDefinition, FeatureDependency, FeatureKind, ProductDefinition,
    ProductRequirementInformation, SampleDefinition, SampleKind, Version,
};

use crate::ConfigResult;

/// Complete catalog manifest
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CatalogManifest {
    /// Installed products resources are filtered against
    #[serde(default, rename = "product", skip_serializing_if = "Vec::is_empty")]
    pub products: Vec<ProductEntry>,

    /// Features already present on the system
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub installed: Vec<FeatureEntry>,

    /// Repository features available for installation
    #[serde(default, rename = "feature", skip_serializing_if = "Vec::is_empty")]
    pub features: Vec<FeatureEntry>,

    /// Repository samples
    #[serde(default, rename = "sample", skip_serializing_if = "Vec::is_empty")]
    pub samples: Vec<SampleEntry>,
}

/// Installed product
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ProductEntry {
    pub id: String,
    pub version: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub edition: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub install_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub license_type: Option<String>,
}

/// Installed or repository feature
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct FeatureEntry {
    pub symbolic_name: String,

    /// Case-insensitive name users may request
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub short_name: Option<String>,

    /// Resource version, 1.0 when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,

    #[serde(default, skip_serializing_if = "is_standard")]
    pub kind: FeatureKind,

    #[serde(default, skip_serializing_if = "is_false")]
    pub singleton: bool,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub dependencies: Vec<DependencyEntry>,

    /// Features that must all be present for an auto-feature to activate
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub provision_capability: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub applies_to: Option<String>,
}

/// Dependency declaration (plain name or name with tolerated versions)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DependencyEntry {
    /// Dependency on exactly this symbolic name
    Simple(String),

    /// Dependency that also accepts other version suffixes
    Detailed {
        name: String,
        #[serde(default)]
        tolerates: Vec<String>,
    },
}

/// Repository sample
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct SampleEntry {
    pub name: String,
    pub short_name: String,
    #[serde(default)]
    pub kind: SampleKind,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub required_features: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub applies_to: Option<String>,
}

fn is_standard(kind: &FeatureKind) -> bool {
    *kind == FeatureKind::Standard
}

fn is_false(value: &bool) -> bool {
    !*value
}

impl DependencyEntry {
    pub fn name(&self) -> &str {
        match self {
            DependencyEntry::Simple(name) => name,
            DependencyEntry::Detailed { name, .. } => name,
        }
    }

    pub fn to_dependency(&self) -> FeatureDependency {
        match self {
            DependencyEntry::Simple(name) => FeatureDependency::new(name.clone()),
            DependencyEntry::Detailed { name, tolerates } => FeatureDependency {
                symbolic_name: name.clone(),
                tolerates: tolerates.clone(),
            }
        }
    }
}

impl ProductEntry {
    pub fn to_definition(&self) -> ConfigResult<ProductDefinition> {
        let version = parse_version(format!("product.{}.version", self.id), &self.version)?;
        Ok(ProductDefinition {
            id: self.id.clone(),
            version,
            edition: self.edition.clone(),
            install_type: self.install_type.clone(),
            license_type: self.license_type.clone(),
        })
    }
}

impl FeatureEntry {
    /// Convert to a feature definition.
    ///
    /// A standard feature that declares a provision capability becomes an
    /// auto-feature.
    pub fn to_definition(&self) -> ConfigResult<FeatureDefinition> {
        let version = match &self.version {
            Some(version) => {
                parse_version(format!("{}.version", self.symbolic_name), version)?
            }
            None => Version::new(1, 0, 0, 0),
        };

        let kind = if self.kind == FeatureKind::Standard && !self.provision_capability.is_empty() {
            FeatureKind::Auto
        } else {
            self.kind
        };

        Ok(FeatureDefinition {
            symbolic_name: self.symbolic_name.clone(),
            short_name: self.short_name.clone(),
            version,
            kind,
            singleton: self.singleton,
            dependencies: self
                .dependencies
                .iter()
                .map(DependencyEntry::to_dependency)
                .collect(),
            provision_capability: self.provision_capability.clone(),
            applies_to: self.applies_to.clone(),
        })
    }
}

impl SampleEntry {
    pub fn to_definition(&self) -> SampleDefinition {
        SampleDefinition {
            name: self.name.clone(),
            short_name: self.short_name.clone(),
            kind: self.kind,
            required_features: self.required_features.clone(),
            applies_to: self.applies_to.clone(),
        }
    }
}

impl CatalogManifest {
    /// Append every resource of another manifest
    pub fn merge(&mut self, other: CatalogManifest) {
        self.products.extend(other.products);
        self.installed.extend(other.installed);
        self.features.extend(other.features);
        self.samples.extend(other.samples);
    }

    /// Total number of declared resources
    pub fn resource_count(&self) -> usize {
        self.products.len() + self.installed.len() + self.features.len() + self.samples.len()
    }

    /// Build the catalog described by this manifest
    pub fn to_catalog(&self) -> ConfigResult<Catalog> {
        let products = self
            .products
            .iter()
            .map(ProductEntry::to_definition)
            .collect::<ConfigResult<Vec<_>>>()?;
        let installed = self
            .installed
            .iter()
            .map(FeatureEntry::to_definition)
            .collect::<ConfigResult<Vec<_>>>()?;
        let features = self
            .features
            .iter()
            .map(FeatureEntry::to_definition)
            .collect::<ConfigResult<Vec<_>>>()?;

        Catalog::builder()
            .products(products)
            .installed_features(installed)
            .features(features)
            .samples(self.samples.iter().map(SampleEntry::to_definition))
            .build()
    }
}

/// Parse TOML string to a catalog manifest
pub fn parse_manifest(content: &str) -> ConfigResult<CatalogManifest> {
    let manifest: CatalogManifest = parse_toml(content)?;
    validate_manifest(&manifest)?;
    Ok(manifest)
}

/// Serialize a catalog manifest to a TOML string
pub fn serialize_manifest(manifest: &CatalogManifest) -> ConfigResult<String> {
    toml::to_string_pretty(manifest).map_err(|e| ProvisionError::TomlParse {
        message: format!("TOML serialization error: {e}"),
        line: 0,
        column: 0,
    })
}

/// Parse TOML into any deserializable type, reporting error locations
pub(crate) fn parse_toml<T: DeserializeOwned>(content: &str) -> ConfigResult<T> {
    // Syntax first with toml_edit, it reports the most precise span
    content
        .parse::<toml_edit::DocumentMut>()
        .map_err(|e| toml_error(content, e.message(), e.span()))?;

    toml::from_str(content).map_err(|e| toml_error(content, e.message(), e.span()))
}

fn toml_error(content: &str, message: &str, span: Option<Range<usize>>) -> ProvisionError {
    let (line, column) = span.map_or((0, 0), |span| line_column(content, span.start));
    ProvisionError::TomlParse {
        message: message.trim().to_string(),
        line,
        column,
    }
}

/// One-based line and column of a byte offset
fn line_column(content: &str, offset: usize) -> (usize, usize) {
    let before = content.get(..offset).unwrap_or(content);
    let line = before.matches('\n').count() + 1;
    let column = before
        .rsplit('\n')
        .next()
        .map_or(0, |current| current.chars().count())
        + 1;
    (line, column)
}

/// Validate manifest completeness
pub fn validate_manifest(manifest: &CatalogManifest) -> ConfigResult<()> {
    for product in &manifest.products {
        if product.id.trim().is_empty() {
            return Err(invalid("product.id", "Product id must not be empty"));
        }
        product.to_definition()?;
    }

    let mut installed = HashSet::new();
    for feature in &manifest.installed {
        validate_feature("installed", feature)?;
        if !installed.insert(feature.symbolic_name.as_str()) {
            return Err(invalid(
                format!("installed.{}", feature.symbolic_name),
                "Feature is installed more than once",
            ));
        }
    }

    let mut available = HashSet::new();
    for feature in &manifest.features {
        let definition = validate_feature("feature", feature)?;
        if !available.insert((feature.symbolic_name.as_str(), definition.version)) {
            return Err(invalid(
                format!("feature.{}", feature.symbolic_name),
                format!("Version {} is declared more than once", definition.version),
            ));
        }
    }

    let mut short_names = HashSet::new();
    for sample in &manifest.samples {
        if sample.name.trim().is_empty() || sample.short_name.trim().is_empty() {
            return Err(invalid(
                "sample",
                "Samples need both a name and a short name",
            ));
        }
        if !short_names.insert(sample.short_name.to_lowercase()) {
            return Err(invalid(
                format!("sample.{}", sample.name),
                format!("Short name '{}' is used by another sample", sample.short_name),
            ));
        }
        if let Some(applies_to) = &sample.applies_to {
            validate_applies_to(format!("sample.{}.applies-to", sample.name), applies_to)?;
        }
    }

    Ok(())
}

/// Load and parse a TOML manifest from file path
pub fn load_from_file(path: &Utf8Path) -> ConfigResult<CatalogManifest> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| ProvisionError::io(format!("Failed to read {path}"), e))?;

    parse_manifest(&content).map_err(|e| in_file(path, e))
}

/// Load several manifests into one, JSON files by extension.
///
/// Later files add resources to earlier ones; the merged result is validated
/// as a whole.
pub fn load_manifests(paths: &[Utf8PathBuf]) -> ConfigResult<CatalogManifest> {
    let mut merged = CatalogManifest::default();

    for path in paths {
        let manifest = if path.extension() == Some("json") {
            let resources = crate::json::load_from_file(path)?;
            crate::json::import_to_manifest(&resources)
        } else {
            load_from_file(path)?
        };
        debug!("Loaded {} resources from {}", manifest.resource_count(), path);
        merged.merge(manifest);
    }

    validate_manifest(&merged)?;
    Ok(merged)
}

/// Prefix an error with the file it came from
pub(crate) fn in_file(path: &Utf8Path, error: ProvisionError) -> ProvisionError {
    match error {
        ProvisionError::TomlParse {
            message,
            line,
            column,
        } => ProvisionError::TomlParse {
            message: format!("In file {path}: {message}"),
            line,
            column,
        },
        ProvisionError::ConfigValidation { field, reason } => ProvisionError::ConfigValidation {
            field,
            reason: format!("{reason} (in {path})"),
        },
        ProvisionError::JsonParse { message } => ProvisionError::JsonParse {
            message: format!("In file {path}: {message}"),
        },
        other => other,
    }
}

/// Validate a feature entry, returning its definition
fn validate_feature(section: &str, feature: &FeatureEntry) -> ConfigResult<FeatureDefinition> {
    let name = &feature.symbolic_name;
    if !is_valid_symbolic_name(name) {
        return Err(invalid(
            format!("{section}.symbolic-name"),
            format!(
                "Invalid symbolic name '{name}'. Names must be non-empty and may not contain whitespace or '/'"
            ),
        ));
    }

    for dependency in &feature.dependencies {
        if !is_valid_symbolic_name(dependency.name()) {
            return Err(invalid(
                format!("{section}.{name}.dependencies"),
                format!("Invalid dependency name '{}'", dependency.name()),
            ));
        }
    }

    if feature.kind == FeatureKind::Auto && feature.provision_capability.is_empty() {
        return Err(invalid(
            format!("{section}.{name}.provision-capability"),
            "Auto-features must declare the features that provision them",
        ));
    }

    if let Some(applies_to) = &feature.applies_to {
        validate_applies_to(format!("{section}.{name}.applies-to"), applies_to)?;
    }

    feature.to_definition()
}

fn validate_applies_to(field: String, applies_to: &str) -> ConfigResult<()> {
    ProductRequirementInformation::parse_applies_to(applies_to)
        .map(|_| ())
        .map_err(|e| invalid(field, e.to_string()))
}

fn parse_version(field: String, value: &str) -> ConfigResult<Version> {
    value
        .parse()
        .map_err(|e: provision_core::types::VersionError| invalid(field, e.to_string()))
}

fn invalid(field: impl Into<String>, reason: impl Into<String>) -> ProvisionError {
    ProvisionError::ConfigValidation {
        field: field.into(),
        reason: reason.into(),
    }
}

/// Check if a symbolic name can be requested
fn is_valid_symbolic_name(name: &str) -> bool {
    !name.is_empty() && !name.chars().any(|c| c.is_whitespace() || c == '/')
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const SERVER_MANIFEST: &str = r#"
[[product]]
id = "com.example.server"
version = "8.5.5.2"
edition = "BASE"

[[installed]]
symbolic-name = "com.example.kernel"
kind = "kernel"

[[feature]]
symbolic-name = "com.example.servlet-3.1"
short-name = "servlet-3.1"
version = "1.0.2"
dependencies = ["com.example.http-1.0", { name = "com.example.json-1.0", tolerates = ["1.1"] }]

[[feature]]
symbolic-name = "com.example.http-1.0"

[[feature]]
symbolic-name = "com.example.json-1.1"
singleton = true

[[feature]]
symbolic-name = "com.example.servlet-json"
provision-capability = ["com.example.servlet-3.1", "com.example.json-1.1"]

[[feature]]
symbolic-name = "com.example.future"
applies-to = "com.example.server; productVersion=9.0.0.0+"

[[sample]]
name = "com.example.sample.hello"
short-name = "HelloSample"
required-features = ["servlet-3.1"]
"#;

    #[test]
    fn test_parse_minimal_manifest() {
        let toml = r#"
[[feature]]
symbolic-name = "a"
"#;

        let manifest = parse_manifest(toml).unwrap();
        assert_eq!(manifest.features.len(), 1);
        assert!(manifest.products.is_empty());

        let definition = manifest.features[0].to_definition().unwrap();
        assert_eq!(definition.version, Version::new(1, 0, 0, 0));
        assert_eq!(definition.kind, FeatureKind::Standard);
    }

    #[test]
    fn test_parse_full_manifest() {
        let manifest = parse_manifest(SERVER_MANIFEST).unwrap();
        assert_eq!(manifest.products.len(), 1);
        assert_eq!(manifest.installed.len(), 1);
        assert_eq!(manifest.features.len(), 5);
        assert_eq!(manifest.samples.len(), 1);
        assert_eq!(manifest.resource_count(), 8);

        let servlet = manifest.features[0].to_definition().unwrap();
        assert_eq!(servlet.version, Version::new(1, 0, 2, 0));
        assert_eq!(servlet.dependencies.len(), 2);
        assert_eq!(servlet.dependencies[1].tolerates, vec!["1.1"]);

        // A capability turns a standard feature into an auto-feature
        let auto = manifest.features[3].to_definition().unwrap();
        assert!(auto.is_auto_feature());
    }

    #[test]
    fn test_manifest_builds_catalog() {
        let catalog = parse_manifest(SERVER_MANIFEST)
            .unwrap()
            .to_catalog()
            .unwrap();

        assert!(catalog.is_installed("com.example.kernel"));
        assert!(catalog.feature("SERVLET-3.1").is_some());
        assert!(catalog.feature("com.example.future").is_none());
        assert_eq!(catalog.non_applicable_resources("com.example.future").len(), 1);
        assert!(catalog.sample("hellosample").is_some());
    }

    #[test]
    fn test_syntax_error_location() {
        let toml = "[[feature]]\nsymbolic-name = \"a\"\nversion = ";

        match parse_manifest(toml) {
            Err(ProvisionError::TomlParse { line, column, .. }) => {
                assert_eq!(line, 3);
                assert!(column > 0);
            }
            other => panic!("expected a TOML error, got {other:?}"),
        }
    }

    #[test]
    fn test_invalid_version() {
        let toml = r#"
[[feature]]
symbolic-name = "a"
version = "1.x"
"#;

        match parse_manifest(toml) {
            Err(ProvisionError::ConfigValidation { field, .. }) => assert_eq!(field, "a.version"),
            other => panic!("expected a validation error, got {other:?}"),
        }
    }

    #[test]
    fn test_duplicate_feature_version() {
        let toml = r#"
[[feature]]
symbolic-name = "a"
version = "1.0"

[[feature]]
symbolic-name = "a"
version = "1.0.0.0"

[[feature]]
symbolic-name = "b"
"#;

        assert!(parse_manifest(toml).is_err());
    }

    #[test]
    fn test_several_versions_allowed() {
        let toml = r#"
[[feature]]
symbolic-name = "a"
version = "1.0"

[[feature]]
symbolic-name = "a"
version = "1.1"
"#;

        assert_eq!(parse_manifest(toml).unwrap().features.len(), 2);
    }

    #[test]
    fn test_auto_feature_needs_capability() {
        let toml = r#"
[[feature]]
symbolic-name = "a"
kind = "auto"
"#;

        assert!(parse_manifest(toml).is_err());
    }

    #[test]
    fn test_invalid_applies_to() {
        let toml = r#"
[[feature]]
symbolic-name = "a"
applies-to = "productVersion=1.0"
"#;

        match parse_manifest(toml) {
            Err(ProvisionError::ConfigValidation { field, .. }) => {
                assert_eq!(field, "feature.a.applies-to")
            }
            other => panic!("expected a validation error, got {other:?}"),
        }
    }

    #[test]
    fn test_invalid_symbolic_names() {
        assert!(is_valid_symbolic_name("com.example.servlet-3.1"));
        assert!(!is_valid_symbolic_name(""));
        assert!(!is_valid_symbolic_name("a/1.0"));
        assert!(!is_valid_symbolic_name("a b"));
    }

    #[test]
    fn test_duplicate_sample_short_name() {
        let toml = r#"
[[sample]]
name = "one"
short-name = "Hello"

[[sample]]
name = "two"
short-name = "hello"
"#;

        assert!(parse_manifest(toml).is_err());
    }

    #[test]
    fn test_serialized_manifest_parses_back() {
        let manifest = parse_manifest(SERVER_MANIFEST).unwrap();
        let serialized = serialize_manifest(&manifest).unwrap();
        assert_eq!(parse_manifest(&serialized).unwrap(), manifest);
    }

    #[test]
    fn test_load_manifests_merges_files() {
        let temp_dir = TempDir::new().unwrap();
        let root = Utf8PathBuf::try_from(temp_dir.path().to_path_buf()).unwrap();

        let base = root.join("base.toml");
        std::fs::write(&base, "[[feature]]\nsymbolic-name = \"a\"\ndependencies = [\"b\"]\n")
            .unwrap();
        let extra = root.join("extra.json");
        std::fs::write(&extra, r#"[{"type": "feature", "symbolicName": "b"}]"#).unwrap();

        let manifest = load_manifests(&[base, extra]).unwrap();
        assert_eq!(manifest.features.len(), 2);

        let catalog = manifest.to_catalog().unwrap();
        assert!(catalog.feature("b").is_some());
    }

    #[test]
    fn test_load_reports_file() {
        let temp_dir = TempDir::new().unwrap();
        let root = Utf8PathBuf::try_from(temp_dir.path().to_path_buf()).unwrap();
        let path = root.join("broken.toml");
        std::fs::write(&path, "[[feature]").unwrap();

        match load_from_file(&path) {
            Err(ProvisionError::TomlParse { message, line, .. }) => {
                assert!(message.contains("broken.toml"));
                assert_eq!(line, 1);
            }
            other => panic!("expected a TOML error, got {other:?}"),
        }

        assert!(matches!(
            load_from_file(&root.join("missing.toml")),
            Err(ProvisionError::Io { .. })
        ));
    }
}

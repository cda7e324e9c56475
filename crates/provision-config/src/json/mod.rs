//! JSON catalog parsing and import
//!
//! A JSON catalog is an array of resources tagged by `type`:
//!
//! ```json
//! [
//!   { "type": "feature", "symbolicName": "com.example.http-1.0", "shortName": "http-1.0" },
//!   { "type": "sample", "name": "com.example.sample.hello", "shortName": "HelloSample",
//!     "requiredFeatures": ["http-1.0"] }
//! ]
//! ```

use camino::Utf8Path;
use serde::{Deserialize, Serialize};

use provision_core::error::ProvisionError;
use provision_core::types::{FeatureKind, SampleKind};

use crate::manifest::{in_file, CatalogManifest, DependencyEntry, FeatureEntry, SampleEntry};
use crate::ConfigResult;

/// Complete JSON catalog
pub type JsonCatalog = Vec<JsonResource>;

/// One resource of a JSON catalog
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum JsonResource {
    Feature(JsonFeature),
    Sample(JsonSample),
}

/// Feature entry of a JSON catalog
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JsonFeature {
    pub symbolic_name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub short_name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,

    #[serde(default)]
    pub kind: FeatureKind,

    #[serde(default)]
    pub singleton: bool,

    /// Already present on the system
    #[serde(default)]
    pub installed: bool,

    #[serde(default)]
    pub dependencies: Vec<JsonDependency>,

    #[serde(default)]
    pub provision_capability: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub applies_to: Option<String>,
}

/// Dependency of a JSON feature
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JsonDependency {
    pub symbolic_name: String,
    #[serde(default)]
    pub tolerates: Vec<String>,
}

/// Sample entry of a JSON catalog
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JsonSample {
    pub name: String,
    pub short_name: String,
    #[serde(default)]
    pub kind: SampleKind,
    #[serde(default)]
    pub required_features: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub applies_to: Option<String>,
}

/// Parse JSON string to a resource array
pub fn parse_json_catalog(content: &str) -> ConfigResult<JsonCatalog> {
    serde_json::from_str(content).map_err(|e| ProvisionError::JsonParse {
        message: format!("JSON parsing error: {e}"),
    })
}

/// Serialize a resource array to a JSON string
pub fn serialize_json_catalog(catalog: &[JsonResource]) -> ConfigResult<String> {
    serde_json::to_string_pretty(catalog).map_err(|e| ProvisionError::JsonParse {
        message: format!("JSON serialization error: {e}"),
    })
}

/// Convert JSON resources to a catalog manifest
pub fn import_to_manifest(resources: &[JsonResource]) -> CatalogManifest {
    let mut manifest = CatalogManifest::default();

    for resource in resources {
        match resource {
            JsonResource::Feature(feature) => {
                let entry = convert_feature(feature);
                if feature.installed {
                    manifest.installed.push(entry);
                } else {
                    manifest.features.push(entry);
                }
            }
            JsonResource::Sample(sample) => manifest.samples.push(SampleEntry {
                name: sample.name.clone(),
                short_name: sample.short_name.clone(),
                kind: sample.kind,
                required_features: sample.required_features.clone(),
                applies_to: sample.applies_to.clone(),
            }),
        }
    }

    manifest
}

/// Load and parse a JSON catalog from file path
pub fn load_from_file(path: &Utf8Path) -> ConfigResult<JsonCatalog> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| ProvisionError::io(format!("Failed to read {path}"), e))?;

    parse_json_catalog(&content).map_err(|e| in_file(path, e))
}

fn convert_feature(feature: &JsonFeature) -> FeatureEntry {
    FeatureEntry {
        symbolic_name: feature.symbolic_name.clone(),
        short_name: feature.short_name.clone(),
        version: feature.version.clone(),
        kind: feature.kind,
        singleton: feature.singleton,
        dependencies: feature.dependencies.iter().map(convert_dependency).collect(),
        provision_capability: feature.provision_capability.clone(),
        applies_to: feature.applies_to.clone(),
    }
}

/// Plain names stay plain so the TOML form of an import reads naturally
fn convert_dependency(dependency: &JsonDependency) -> DependencyEntry {
    if dependency.tolerates.is_empty() {
        DependencyEntry::Simple(dependency.symbolic_name.clone())
    } else {
        DependencyEntry::Detailed {
            name: dependency.symbolic_name.clone(),
            tolerates: dependency.tolerates.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_minimal_catalog() {
        let json = r#"[{ "type": "feature", "symbolicName": "a" }]"#;

        let catalog = parse_json_catalog(json).unwrap();
        assert_eq!(catalog.len(), 1);
        match &catalog[0] {
            JsonResource::Feature(feature) => {
                assert_eq!(feature.symbolic_name, "a");
                assert!(!feature.installed);
                assert_eq!(feature.kind, FeatureKind::Standard);
            }
            other => panic!("expected a feature, got {other:?}"),
        }
    }

    #[test]
    fn test_unknown_type_rejected() {
        let json = r#"[{ "type": "addon", "symbolicName": "a" }]"#;
        assert!(matches!(
            parse_json_catalog(json),
            Err(ProvisionError::JsonParse { .. })
        ));
    }

    #[test]
    fn test_import_to_manifest() {
        let json = r#"
[
  { "type": "feature", "symbolicName": "kernel", "kind": "kernel", "installed": true },
  {
    "type": "feature",
    "symbolicName": "com.example.servlet-3.1",
    "shortName": "servlet-3.1",
    "version": "1.0.2",
    "dependencies": [
      { "symbolicName": "com.example.http-1.0" },
      { "symbolicName": "com.example.json-1.0", "tolerates": ["1.1"] }
    ]
  },
  { "type": "feature", "symbolicName": "glue", "provisionCapability": ["a", "b"] },
  {
    "type": "sample",
    "name": "com.example.sample.hello",
    "shortName": "HelloSample",
    "kind": "open-source",
    "requiredFeatures": ["servlet-3.1"]
  }
]
"#;

        let manifest = import_to_manifest(&parse_json_catalog(json).unwrap());
        assert_eq!(manifest.installed.len(), 1);
        assert_eq!(manifest.features.len(), 2);
        assert_eq!(manifest.samples.len(), 1);
        assert_eq!(manifest.samples[0].kind, SampleKind::OpenSource);

        let servlet = &manifest.features[0];
        assert_eq!(
            servlet.dependencies,
            vec![
                DependencyEntry::Simple("com.example.http-1.0".to_string()),
                DependencyEntry::Detailed {
                    name: "com.example.json-1.0".to_string(),
                    tolerates: vec!["1.1".to_string()],
                },
            ]
        );

        assert!(manifest.features[1].to_definition().unwrap().is_auto_feature());
    }

    #[test]
    fn test_serialized_catalog_parses_back() {
        let json = r#"[{ "type": "sample", "name": "s", "shortName": "S" }]"#;

        let catalog = parse_json_catalog(json).unwrap();
        let serialized = serialize_json_catalog(&catalog).unwrap();
        assert!(serialized.contains("\"shortName\""));
        assert_eq!(parse_json_catalog(&serialized).unwrap(), catalog);
    }
}

#[cfg(test)]
mod property_tests {
    use super::*;
    use proptest::prelude::*;

    prop_compose! {
        fn arb_feature()(
            symbolic_name in "[a-z][a-z0-9.]{0,12}",
            installed in any::<bool>(),
            dependencies in prop::collection::vec("[a-z][a-z0-9.]{0,12}", 0..4),
        ) -> JsonResource {
            JsonResource::Feature(JsonFeature {
                symbolic_name,
                short_name: None,
                version: None,
                kind: FeatureKind::Standard,
                singleton: false,
                installed,
                dependencies: dependencies
                    .into_iter()
                    .map(|symbolic_name| JsonDependency { symbolic_name, tolerates: Vec::new() })
                    .collect(),
                provision_capability: Vec::new(),
                applies_to: None,
            })
        }
    }

    proptest! {
        /// Every JSON feature lands in exactly one manifest section
        #[test]
        fn import_keeps_every_feature(resources in prop::collection::vec(arb_feature(), 0..10)) {
            let manifest = import_to_manifest(&resources);
            prop_assert_eq!(manifest.installed.len() + manifest.features.len(), resources.len());

            let installed = resources
                .iter()
                .filter(|r| matches!(r, JsonResource::Feature(f) if f.installed))
                .count();
            prop_assert_eq!(manifest.installed.len(), installed);
        }
    }
}

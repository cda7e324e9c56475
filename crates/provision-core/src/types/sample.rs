//! Sample definitions.

use serde::{Deserialize, Serialize};

/// Kind of sample
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SampleKind {
    #[default]
    Product,
    OpenSource,
}

/// Installable sample with the features it needs
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct SampleDefinition {
    pub name: String,
    pub short_name: String,
    #[serde(default)]
    pub kind: SampleKind,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub required_features: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub applies_to: Option<String>,
}

impl SampleDefinition {
    pub fn new(name: impl Into<String>, short_name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            short_name: short_name.into(),
            kind: SampleKind::Product,
            required_features: Vec::new(),
            applies_to: None,
        }
    }

    pub fn requiring(mut self, feature: impl Into<String>) -> Self {
        self.required_features.push(feature.into());
        self
    }

    pub fn with_kind(mut self, kind: SampleKind) -> Self {
        self.kind = kind;
        self
    }

    pub fn with_applies_to(mut self, applies_to: impl Into<String>) -> Self {
        self.applies_to = Some(applies_to.into());
        self
    }
}

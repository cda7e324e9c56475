//! Installed products and applies-to constraints.
//!
//! An applies-to expression restricts a resource to certain products, e.g.
//!
//! ```text
//! com.example.server; productVersion=8.5.5.2+; productEdition="BASE,ND"
//! ```
//!
//! Several clauses may be joined with commas; a resource applies when any
//! clause matches any installed product.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::{Version, VersionRange};
use crate::error::{ProvisionError, ProvisionResult};

/// Product installed on the target system
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ProductDefinition {
    pub id: String,
    pub version: Version,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub edition: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub install_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub license_type: Option<String>,
}

/// One parsed clause of an applies-to expression
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ProductRequirementInformation {
    pub version_range: Option<VersionRange>,
    pub product_id: String,
    pub install_type: Option<String>,
    pub license_type: Option<String>,
    pub editions: Vec<String>,
}

/// Resource present in the catalog but not applicable to the installed products
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NonApplicableResource {
    /// Symbolic name of the feature or name of the sample
    pub name: String,
    /// Raw applies-to expression
    pub applies_to: String,
    pub requirements: Vec<ProductRequirementInformation>,
}

impl ProductDefinition {
    pub fn new(id: impl Into<String>, version: Version) -> Self {
        Self {
            id: id.into(),
            version,
            edition: None,
            install_type: None,
            license_type: None,
        }
    }

    pub fn with_edition(mut self, edition: impl Into<String>) -> Self {
        self.edition = Some(edition.into());
        self
    }

    pub fn with_install_type(mut self, install_type: impl Into<String>) -> Self {
        self.install_type = Some(install_type.into());
        self
    }

    pub fn with_license_type(mut self, license_type: impl Into<String>) -> Self {
        self.license_type = Some(license_type.into());
        self
    }
}

impl ProductRequirementInformation {
    /// Parse a full applies-to expression into its clauses.
    ///
    /// An empty expression yields no clauses.
    pub fn parse_applies_to(applies_to: &str) -> ProvisionResult<Vec<Self>> {
        split_outside_quotes(applies_to, ',')
            .into_iter()
            .map(str::trim)
            .filter(|clause| !clause.is_empty())
            .map(|clause| Self::parse_clause(applies_to, clause))
            .collect()
    }

    fn parse_clause(applies_to: &str, clause: &str) -> ProvisionResult<Self> {
        let mut parts = split_outside_quotes(clause, ';').into_iter().map(str::trim);
        let product_id = parts.next().unwrap_or_default();
        if product_id.is_empty() || product_id.contains('=') {
            return Err(ProvisionError::InvalidAppliesTo {
                input: applies_to.to_string(),
                reason: "missing product id".to_string(),
            });
        }

        let mut info = Self {
            version_range: None,
            product_id: product_id.to_string(),
            install_type: None,
            license_type: None,
            editions: Vec::new(),
        };

        for attribute in parts.filter(|part| !part.is_empty()) {
            let (key, value) =
                attribute
                    .split_once('=')
                    .ok_or_else(|| ProvisionError::InvalidAppliesTo {
                        input: applies_to.to_string(),
                        reason: format!("expected key=value, found '{attribute}'"),
                    })?;
            let value = unquote(value.trim());

            match key.trim() {
                "productVersion" => {
                    let range = VersionRange::parse_applies_to(value).map_err(|e| {
                        ProvisionError::InvalidAppliesTo {
                            input: applies_to.to_string(),
                            reason: e.to_string(),
                        }
                    })?;
                    info.version_range = Some(range);
                }
                "productEdition" => {
                    info.editions = value
                        .split(',')
                        .map(str::trim)
                        .filter(|edition| !edition.is_empty())
                        .map(str::to_string)
                        .collect();
                }
                "productInstallType" => info.install_type = Some(value.to_string()),
                "productLicenseType" => info.license_type = Some(value.to_string()),
                // Unknown attributes do not restrict applicability
                _ => {}
            }
        }

        Ok(info)
    }

    /// Check whether an installed product satisfies this clause
    pub fn matches(&self, product: &ProductDefinition) -> bool {
        if self.product_id != product.id {
            return false;
        }

        if let Some(range) = &self.version_range {
            if !range.contains(&product.version) {
                return false;
            }
        }

        if !self.editions.is_empty() {
            let edition_listed = product.edition.as_deref().is_some_and(|edition| {
                self.editions
                    .iter()
                    .any(|candidate| candidate.eq_ignore_ascii_case(edition))
            });
            if !edition_listed {
                return false;
            }
        }

        optional_matches(&self.install_type, &product.install_type)
            && optional_matches(&self.license_type, &product.license_type)
    }

    /// Whether this clause accepts the given edition
    pub fn has_edition(&self, edition: &str) -> bool {
        self.editions
            .iter()
            .any(|candidate| candidate.eq_ignore_ascii_case(edition))
    }
}

impl fmt::Display for ProductRequirementInformation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.product_id)?;
        if let Some(range) = &self.version_range {
            write!(f, " {range}")?;
        }
        if !self.editions.is_empty() {
            write!(f, " ({})", self.editions.join(","))?;
        }
        Ok(())
    }
}

impl NonApplicableResource {
    /// Build from a raw applies-to expression
    pub fn new(name: impl Into<String>, applies_to: impl Into<String>) -> ProvisionResult<Self> {
        let applies_to = applies_to.into();
        let requirements = ProductRequirementInformation::parse_applies_to(&applies_to)?;
        Ok(Self {
            name: name.into(),
            applies_to,
            requirements,
        })
    }
}

/// Whether a resource with this applies-to expression may be installed.
///
/// With no installed products every resource applies, as does a resource
/// with an empty expression.
pub fn is_applicable(
    requirements: &[ProductRequirementInformation],
    products: &[ProductDefinition],
) -> bool {
    if products.is_empty() || requirements.is_empty() {
        return true;
    }
    requirements
        .iter()
        .any(|requirement| products.iter().any(|product| requirement.matches(product)))
}

fn optional_matches(required: &Option<String>, actual: &Option<String>) -> bool {
    match (required, actual) {
        (None, _) => true,
        (Some(required), Some(actual)) => required.eq_ignore_ascii_case(actual),
        (Some(_), None) => false,
    }
}

fn unquote(value: &str) -> &str {
    value
        .strip_prefix('"')
        .and_then(|v| v.strip_suffix('"'))
        .unwrap_or(value)
}

fn split_outside_quotes(input: &str, separator: char) -> Vec<&str> {
    let mut pieces = Vec::new();
    let mut in_quotes = false;
    let mut start = 0;

    for (index, ch) in input.char_indices() {
        if ch == '"' {
            in_quotes = !in_quotes;
        } else if ch == separator && !in_quotes {
            pieces.push(&input[start..index]);
            start = index + ch.len_utf8();
        }
    }
    pieces.push(&input[start..]);
    pieces
}

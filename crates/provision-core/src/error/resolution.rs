//! Structured report of everything that went wrong in a resolution pass.

use std::collections::BTreeMap;
use std::fmt;

use crate::types::{InstallList, ProductRequirementInformation, Version};

/// Requirement that could not be satisfied
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MissingRequirement {
    /// Unmet feature name, or the applies-to text of a wrong-product resource
    pub requirement: String,
    /// Resource that declared the requirement, none for requested roots
    pub owner: Option<String>,
}

/// Path through the dependency tree that selects one singleton version
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConflictChain {
    /// Symbolic names from the root down to the dependent feature
    pub chain: Vec<String>,
    /// Versions acceptable along this path, preferred first
    pub candidates: Vec<String>,
    /// Candidate the solver would select for this path
    pub preferred: Option<String>,
}

/// Aggregated resolution failure
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolutionError {
    /// Requested names that could not be resolved completely
    pub top_level_not_resolved: Vec<String>,
    pub missing_requirements: Vec<MissingRequirement>,
    /// Product constraints of resources found only for other products
    pub missing_products: Vec<ProductRequirementInformation>,
    /// Conflict chains keyed by the base name of the singleton feature
    pub conflicts: BTreeMap<String, Vec<ConflictChain>>,
    /// Install lists computed before the failure was detected
    pub install_lists: Vec<InstallList>,
}

impl MissingRequirement {
    pub fn new(requirement: impl Into<String>, owner: Option<String>) -> Self {
        Self {
            requirement: requirement.into(),
            owner,
        }
    }
}

impl fmt::Display for MissingRequirement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.owner {
            Some(owner) => write!(f, "{} (required by {})", self.requirement, owner),
            None => write!(f, "{}", self.requirement),
        }
    }
}

impl fmt::Display for ConflictChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.chain.is_empty() {
            write!(f, "{} -> ", self.chain.join(" -> "))?;
        }
        write!(f, "[{}]", self.candidates.join(", "))
    }
}

impl ResolutionError {
    /// Whether any failure was recorded
    pub fn has_failures(&self) -> bool {
        !self.top_level_not_resolved.is_empty()
            || !self.missing_requirements.is_empty()
            || !self.missing_products.is_empty()
            || !self.conflicts.is_empty()
    }

    /// Record a missing requirement once
    pub fn add_missing_requirement(&mut self, requirement: MissingRequirement) {
        if !self.missing_requirements.contains(&requirement) {
            self.missing_requirements.push(requirement);
        }
    }

    /// Record a product constraint once
    pub fn add_missing_product(&mut self, info: ProductRequirementInformation) {
        if !self.missing_products.contains(&info) {
            self.missing_products.push(info);
        }
    }

    /// Names of every unmet requirement
    pub fn all_requirements_not_found(&self) -> Vec<&str> {
        self.missing_requirements
            .iter()
            .map(|missing| missing.requirement.as_str())
            .collect()
    }

    /// Lowest product version that would satisfy a wrong-product resource.
    ///
    /// Only constraints for `product_id`, listing `edition`, and whose
    /// minimum shares `major.minor.micro` with `version` are considered;
    /// each filter is skipped when `None`.
    pub fn minimum_version_for_missing_product(
        &self,
        product_id: Option<&str>,
        version: Option<&Version>,
        edition: Option<&str>,
    ) -> Option<Version> {
        self.matching_products(product_id, version, edition)
            .filter_map(|info| info.version_range.map(|range| range.min))
            .min()
    }

    /// Highest product version that would satisfy a wrong-product resource.
    ///
    /// Returns `None` when any matching constraint is unbounded.
    pub fn maximum_version_for_missing_product(
        &self,
        product_id: Option<&str>,
        version: Option<&Version>,
        edition: Option<&str>,
    ) -> Option<Version> {
        let mut highest: Option<Version> = None;
        for info in self.matching_products(product_id, version, edition) {
            let max = info.version_range.and_then(|range| range.max)?;
            highest = Some(highest.map_or(max, |current| current.max(max)));
        }
        highest
    }

    fn matching_products<'a>(
        &'a self,
        product_id: Option<&'a str>,
        version: Option<&'a Version>,
        edition: Option<&'a str>,
    ) -> impl Iterator<Item = &'a ProductRequirementInformation> + 'a {
        self.missing_products.iter().filter(move |info| {
            product_id.map_or(true, |id| info.product_id == id)
                && edition.map_or(true, |edition| info.has_edition(edition))
                && version.map_or(true, |version| {
                    info.version_range
                        .is_some_and(|range| range.min.same_release(version))
                })
        })
    }

    /// Get a user-friendly suggestion for fixing this failure
    pub fn suggestion(&self) -> Option<&'static str> {
        if !self.conflicts.is_empty() {
            Some("Request compatible versions or resolve without conflict detection")
        } else if !self.missing_products.is_empty() {
            Some("Some resources only apply to other products, editions or versions")
        } else if !self.missing_requirements.is_empty() {
            Some("Check the resource names or add the catalog that provides them")
        } else {
            None
        }
    }
}

impl fmt::Display for ResolutionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Unable to resolve")?;
        let roots: Vec<String> = self
            .top_level_not_resolved
            .iter()
            .map(|name| format!("resource={name}"))
            .collect();
        if !roots.is_empty() {
            write!(f, " {}", roots.join(", "))?;
        }

        if !self.missing_requirements.is_empty() {
            let missing: Vec<String> = self
                .missing_requirements
                .iter()
                .map(ToString::to_string)
                .collect();
            write!(f, "; missing: {}", missing.join(", "))?;
        }

        if !self.missing_products.is_empty() {
            let products: Vec<String> =
                self.missing_products.iter().map(ToString::to_string).collect();
            write!(f, "; requires product: {}", products.join(", "))?;
        }

        if !self.conflicts.is_empty() {
            let names: Vec<&str> = self.conflicts.keys().map(String::as_str).collect();
            write!(f, "; conflicting versions of: {}", names.join(", "))?;
        }

        Ok(())
    }
}

impl std::error::Error for ResolutionError {}
